//! Lexicon-based sentiment scoring.
//!
//! Each opinion word carries a polarity in [-1, 1] and a subjectivity in
//! [0, 1]. A preceding intensifier scales the polarity, a negation within the
//! two previous words flips and halves it. A text's score is the mean over the
//! opinion words it contains; text without any is neutral and objective.

use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::textclean::{TextEntry, trim_to_words};

/// Scores above this are positive, below its negation negative.
pub const NEUTRAL_BAND: f64 = 0.1;

const NEGATION_FACTOR: f64 = -0.5;

#[rustfmt::skip]
const LEXICON: &[(&str, f64, f64)] = &[
    // positive
    ("amazing", 0.6, 0.9), ("awesome", 1.0, 1.0), ("beautiful", 0.85, 1.0),
    ("best", 1.0, 0.3), ("better", 0.5, 0.5), ("brilliant", 0.9, 1.0),
    ("comfortable", 0.4, 0.6), ("decent", 0.17, 0.5), ("delighted", 0.7, 1.0),
    ("easy", 0.43, 0.83), ("excellent", 1.0, 1.0), ("exceptional", 0.67, 1.0),
    ("fantastic", 0.4, 0.9), ("fast", 0.2, 0.6), ("fine", 0.42, 0.5),
    ("good", 0.7, 0.6), ("great", 0.8, 0.75), ("happy", 0.8, 1.0),
    ("helpful", 0.5, 0.5), ("impressive", 1.0, 1.0), ("incredible", 0.9, 0.9),
    ("love", 0.5, 0.6), ("loved", 0.7, 0.8), ("lovely", 0.5, 0.75),
    ("nice", 0.6, 1.0), ("outstanding", 0.5, 0.67), ("perfect", 1.0, 1.0),
    ("perfectly", 1.0, 1.0), ("pleased", 0.5, 0.5), ("recommend", 0.4, 0.5),
    ("reliable", 0.4, 0.6), ("sharp", 0.3, 0.6), ("smooth", 0.4, 0.6),
    ("solid", 0.3, 0.4), ("superb", 1.0, 1.0), ("vibrant", 0.4, 0.7),
    ("wonderful", 1.0, 1.0), ("worth", 0.3, 0.1),
    // negative
    ("annoying", -0.8, 0.9), ("awful", -1.0, 1.0), ("bad", -0.7, 0.67),
    ("broke", -0.4, 0.4), ("broken", -0.4, 0.4), ("cheap", -0.1, 0.5),
    ("difficult", -0.5, 1.0), ("disappointed", -0.75, 0.75), ("disappointing", -0.6, 0.7),
    ("expensive", -0.5, 0.7), ("faulty", -0.6, 0.6), ("hate", -0.8, 0.9),
    ("horrible", -1.0, 1.0), ("mediocre", -0.3, 0.6), ("poor", -0.4, 0.6),
    ("regret", -0.6, 0.8), ("slow", -0.3, 0.4), ("terrible", -1.0, 1.0),
    ("unhelpful", -0.5, 0.5), ("unreliable", -0.5, 0.6), ("useless", -0.5, 0.2),
    ("waste", -0.6, 0.6), ("worse", -0.4, 0.6), ("worst", -1.0, 1.0),
    ("wrong", -0.5, 0.9),
];

const INTENSIFIERS: &[(&str, f64)] = &[
    ("absolutely", 1.5),
    ("extremely", 1.5),
    ("highly", 1.3),
    ("incredibly", 1.4),
    ("really", 1.3),
    ("so", 1.2),
    ("super", 1.3),
    ("totally", 1.3),
    ("very", 1.3),
];

const NEGATIONS: &[&str] = &["not", "no", "never", "don't", "doesn't", "isn't", "wasn't", "can't", "won't", "nothing"];

static LEXICON_MAP: LazyLock<HashMap<&'static str, (f64, f64)>> =
    LazyLock::new(|| LEXICON.iter().map(|&(w, p, s)| (w, (p, s))).collect());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl SentimentLabel {
    pub fn of(polarity: f64) -> Self {
        if polarity > NEUTRAL_BAND {
            SentimentLabel::Positive
        } else if polarity < -NEUTRAL_BAND {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Neutral => "neutral",
            SentimentLabel::Negative => "negative",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentScore {
    pub row: Option<usize>,
    pub polarity: f64,
    pub subjectivity: f64,
    pub label: SentimentLabel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentSummary {
    pub sentiments: Vec<SentimentScore>,
    pub avg_polarity: f64,
    pub avg_subjectivity: f64,
    pub positive_count: usize,
    pub neutral_count: usize,
    pub negative_count: usize,
    pub total: usize,
}

/// `(polarity, subjectivity)` of a single text.
pub fn score_text(text: &str) -> (f64, f64) {
    let words = trim_to_words(text);
    let mut polarities = Vec::new();
    let mut subjectivities = Vec::new();

    for (i, word) in words.iter().enumerate() {
        let Some(&(mut polarity, subjectivity)) = LEXICON_MAP.get(word.as_str()) else {
            continue;
        };
        if i > 0 {
            if let Some(&(_, factor)) = INTENSIFIERS.iter().find(|(w, _)| *w == words[i - 1]) {
                polarity *= factor;
            }
        }
        let window = &words[i.saturating_sub(2)..i];
        if window.iter().any(|w| NEGATIONS.contains(&w.as_str())) {
            polarity *= NEGATION_FACTOR;
        }
        polarities.push(polarity.clamp(-1.0, 1.0));
        subjectivities.push(subjectivity);
    }

    if polarities.is_empty() {
        return (0.0, 0.0);
    }
    let n = polarities.len() as f64;
    (
        (polarities.iter().sum::<f64>() / n).clamp(-1.0, 1.0),
        (subjectivities.iter().sum::<f64>() / n).clamp(0.0, 1.0),
    )
}

pub fn analyze(entries: &[TextEntry]) -> SentimentSummary {
    let sentiments: Vec<SentimentScore> = entries
        .iter()
        .map(|entry| {
            let (polarity, subjectivity) = score_text(&entry.text);
            SentimentScore {
                row: entry.row,
                polarity,
                subjectivity,
                label: SentimentLabel::of(polarity),
            }
        })
        .collect();

    let total = sentiments.len();
    let count = |label: SentimentLabel| sentiments.iter().filter(|s| s.label == label).count();
    let avg = |f: fn(&SentimentScore) -> f64| {
        if total == 0 {
            0.0
        } else {
            sentiments.iter().map(f).sum::<f64>() / total as f64
        }
    };

    SentimentSummary {
        avg_polarity: avg(|s| s.polarity),
        avg_subjectivity: avg(|s| s.subjectivity),
        positive_count: count(SentimentLabel::Positive),
        neutral_count: count(SentimentLabel::Neutral),
        negative_count: count(SentimentLabel::Negative),
        total,
        sentiments,
    }
}
