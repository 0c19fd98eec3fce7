//! Descriptive statistics for numeric columns and text collections, plus
//! Pearson correlation.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::textclean::{TextEntry, count_words, sort_map_to_vec, trim_to_words};

/// How many of the most frequent words `text_statistics` keeps.
pub const TOP_WORDS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnStats {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    /// Sample standard deviation (n - 1); `0.0` for a single value.
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

/// Column name to its statistics, ordered by column name.
pub type DataStatistics = BTreeMap<String, ColumnStats>;

/// `None` for an empty slice.
pub fn describe(values: &[f64]) -> Option<ColumnStats> {
    if values.is_empty() {
        return None;
    }
    let count = values.len();
    let mean = mean(values);
    let std = if count > 1 {
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (count - 1) as f64;
        var.sqrt()
    } else {
        0.0
    };
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let median = if count % 2 == 1 {
        sorted[count / 2]
    } else {
        (sorted[count / 2 - 1] + sorted[count / 2]) / 2.0
    };
    Some(ColumnStats {
        count,
        mean,
        median,
        std,
        min: sorted[0],
        max: sorted[count - 1],
    })
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextStatistics {
    pub total_entries: usize,
    pub total_words: usize,
    pub unique_words: usize,
    pub avg_words_per_entry: f64,
    pub top_words: Vec<(String, u32)>,
    /// English name of the detected language, when detection succeeds.
    pub language: Option<String>,
    pub language_confidence: Option<f64>,
}

pub fn text_statistics(entries: &[TextEntry]) -> TextStatistics {
    let mut words = Vec::new();
    for entry in entries {
        words.extend(trim_to_words(&entry.text));
    }
    let unique_words = words.iter().collect::<HashSet<_>>().len();
    let total_words = words.len();
    let mut top_words = sort_map_to_vec(count_words(&words));
    top_words.truncate(TOP_WORDS);

    let joined = entries
        .iter()
        .map(|e| e.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    let detected = whatlang::detect(&joined);

    TextStatistics {
        total_entries: entries.len(),
        total_words,
        unique_words,
        avg_words_per_entry: if entries.is_empty() {
            0.0
        } else {
            total_words as f64 / entries.len() as f64
        },
        top_words,
        language: detected.as_ref().map(|info| info.lang().eng_name().to_string()),
        language_confidence: detected.as_ref().map(|info| info.confidence()),
    }
}

/// Pearson's r. `None` with fewer than two pairs or when either side is constant.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return None;
    }
    let (xs, ys) = (&xs[..n], &ys[..n]);
    let (mx, my) = (mean(xs), mean(ys));
    let mut cov = 0.0;
    let mut vx = 0.0;
    let mut vy = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        cov += (x - mx) * (y - my);
        vx += (x - mx).powi(2);
        vy += (y - my).powi(2);
    }
    if vx == 0.0 || vy == 0.0 {
        return None;
    }
    Some((cov / (vx.sqrt() * vy.sqrt())).clamp(-1.0, 1.0))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationStrength {
    Strong,
    Moderate,
    Weak,
    VeryWeak,
}

impl CorrelationStrength {
    pub fn of(r: f64) -> Self {
        let r = r.abs();
        if r > 0.7 {
            CorrelationStrength::Strong
        } else if r > 0.4 {
            CorrelationStrength::Moderate
        } else if r > 0.2 {
            CorrelationStrength::Weak
        } else {
            CorrelationStrength::VeryWeak
        }
    }
}

impl fmt::Display for CorrelationStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CorrelationStrength::Strong => "strong",
            CorrelationStrength::Moderate => "moderate",
            CorrelationStrength::Weak => "weak",
            CorrelationStrength::VeryWeak => "very weak",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Correlation {
    /// Numeric table column.
    pub column: String,
    /// What it was correlated with, e.g. `text_length` or `sentiment_polarity`.
    pub against: String,
    pub coefficient: f64,
    /// Number of paired observations.
    pub pairs: usize,
    pub strength: CorrelationStrength,
}
