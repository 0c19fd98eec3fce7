//! Keyword extraction (RAKE and TF-IDF) and topic bucketing.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use clap::ValueEnum;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::textclean::{TextEntry, is_stopword};

/// Vocabulary cap for TF-IDF, by corpus frequency.
pub const MAX_FEATURES: usize = 100;

/// How many TF-IDF terms feed topic detection.
pub const TOPIC_TERMS: usize = 20;

static PHRASE_DELIMITERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[.!?,;:()\[\]"“”\n\t]|\s-\s"#).expect("valid delimiter regex"));

static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\w\w+\b").expect("valid token regex"));

static STEMMER: LazyLock<Stemmer> = LazyLock::new(|| Stemmer::create(Algorithm::English));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum KeywordMethod {
    /// Rapid Automatic Keyword Extraction.
    #[default]
    Rake,
    /// Mean TF-IDF weight over unigrams and bigrams.
    Tfidf,
}

impl KeywordMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeywordMethod::Rake => "rake",
            KeywordMethod::Tfidf => "tfidf",
        }
    }
}

impl fmt::Display for KeywordMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeywordMethod {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rake" => Ok(KeywordMethod::Rake),
            "tfidf" | "tf-idf" => Ok(KeywordMethod::Tfidf),
            other => Err(PipelineError::InvalidStrategy {
                kind: "keyword method",
                value: other.to_string(),
                expected: "rake, tfidf",
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyword {
    pub phrase: String,
    pub score: f64,
}

pub fn extract(entries: &[TextEntry], method: KeywordMethod, top_n: usize) -> Vec<Keyword> {
    match method {
        KeywordMethod::Rake => rake(entries, top_n),
        KeywordMethod::Tfidf => tfidf(entries, top_n),
    }
}

/// Candidate phrases are runs of non-stopwords between punctuation.
/// A word scores degree / frequency; a phrase scores the sum of its words.
pub fn rake(entries: &[TextEntry], top_n: usize) -> Vec<Keyword> {
    let mut phrases: Vec<Vec<String>> = Vec::new();
    for entry in entries {
        let lower = entry.text.to_lowercase();
        for fragment in PHRASE_DELIMITERS.split(&lower) {
            let mut current = Vec::new();
            for raw in fragment.split_whitespace() {
                let word = raw.trim_matches(|c: char| !c.is_alphanumeric() && c != '\'');
                if word.is_empty() || is_stopword(word) {
                    if !current.is_empty() {
                        phrases.push(std::mem::take(&mut current));
                    }
                } else {
                    current.push(word.to_string());
                }
            }
            if !current.is_empty() {
                phrases.push(current);
            }
        }
    }

    let mut frequency: HashMap<&str, f64> = HashMap::new();
    let mut degree: HashMap<&str, f64> = HashMap::new();
    for phrase in &phrases {
        for word in phrase {
            *frequency.entry(word).or_insert(0.0) += 1.0;
            *degree.entry(word).or_insert(0.0) += phrase.len() as f64;
        }
    }

    let mut seen = HashSet::new();
    let mut scored: Vec<Keyword> = phrases
        .iter()
        .filter_map(|phrase| {
            let text = phrase.join(" ");
            if !seen.insert(text.clone()) {
                return None;
            }
            let score = phrase
                .iter()
                .map(|w| degree[w.as_str()] / frequency[w.as_str()])
                .sum::<f64>();
            Some(Keyword { phrase: text, score })
        })
        .filter(|k| k.score > 0.0)
        .collect();
    rank(&mut scored, top_n);
    scored
}

/// Mean TF-IDF weight of every unigram and bigram across the entries.
///
/// Stopwords are removed before bigrams are formed. Term frequencies are raw
/// counts, idf is `ln((1 + n) / (1 + df)) + 1`, and each document vector is
/// L2-normalised before averaging.
pub fn tfidf(entries: &[TextEntry], top_n: usize) -> Vec<Keyword> {
    let docs: Vec<Vec<String>> = entries.iter().map(|e| terms(&e.text)).collect();
    if docs.iter().all(Vec::is_empty) {
        return Vec::new();
    }

    let mut corpus_counts: HashMap<&str, usize> = HashMap::new();
    let mut document_frequency: HashMap<&str, usize> = HashMap::new();
    for doc in &docs {
        for term in doc {
            *corpus_counts.entry(term).or_insert(0) += 1;
        }
        for term in doc.iter().map(String::as_str).collect::<HashSet<_>>() {
            *document_frequency.entry(term).or_insert(0) += 1;
        }
    }

    let mut vocabulary: Vec<(&str, usize)> = corpus_counts.into_iter().collect();
    vocabulary.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    vocabulary.truncate(MAX_FEATURES);
    let vocabulary: HashSet<&str> = vocabulary.into_iter().map(|(t, _)| t).collect();

    let n = docs.len() as f64;
    let mut totals: HashMap<&str, f64> = HashMap::new();
    for doc in &docs {
        let mut weights: HashMap<&str, f64> = HashMap::new();
        for term in doc.iter().map(String::as_str).filter(|t| vocabulary.contains(t)) {
            *weights.entry(term).or_insert(0.0) += 1.0;
        }
        for (term, weight) in weights.iter_mut() {
            let df = document_frequency[term] as f64;
            *weight *= ((1.0 + n) / (1.0 + df)).ln() + 1.0;
        }
        let norm = weights.values().map(|w| w * w).sum::<f64>().sqrt();
        if norm == 0.0 {
            continue;
        }
        for (term, weight) in weights {
            *totals.entry(term).or_insert(0.0) += weight / norm;
        }
    }

    let mut scored: Vec<Keyword> = totals
        .into_iter()
        .map(|(term, total)| Keyword {
            phrase: term.to_string(),
            score: total / n,
        })
        .collect();
    rank(&mut scored, top_n);
    scored
}

/// Unigrams and bigrams of a text with stopwords removed.
fn terms(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    let words: Vec<&str> = TOKEN_RE
        .find_iter(&lower)
        .map(|m| m.as_str())
        .filter(|w| !is_stopword(w))
        .collect();
    let mut out: Vec<String> = words.iter().map(|w| w.to_string()).collect();
    out.extend(words.windows(2).map(|pair| format!("{} {}", pair[0], pair[1])));
    out
}

fn rank(keywords: &mut Vec<Keyword>, top_n: usize) {
    keywords.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.phrase.cmp(&b.phrase))
    });
    keywords.truncate(top_n);
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    Quality,
    Price,
    Service,
    Features,
    Experience,
    Other,
}

impl Topic {
    fn terms(&self) -> &'static [&'static str] {
        match self {
            Topic::Quality => &[
                "quality", "good", "excellent", "poor", "bad", "great", "terrible", "amazing",
            ],
            Topic::Price => &["price", "expensive", "cheap", "cost", "value", "worth", "money"],
            Topic::Service => &["service", "support", "customer", "help", "response", "staff"],
            Topic::Features => &["feature", "function", "work", "performance", "speed", "design"],
            Topic::Experience => &[
                "use", "easy", "difficult", "simple", "experience", "recommend",
            ],
            Topic::Other => &[],
        }
    }

    const MATCHED: [Topic; 5] = [
        Topic::Quality,
        Topic::Price,
        Topic::Service,
        Topic::Features,
        Topic::Experience,
    ];
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Topic::Quality => "quality",
            Topic::Price => "price",
            Topic::Service => "service",
            Topic::Features => "features",
            Topic::Experience => "experience",
            Topic::Other => "other",
        })
    }
}

/// Topic to the keywords filed under it. Empty topics are absent.
pub type Topics = BTreeMap<Topic, Vec<String>>;

/// File the top TF-IDF terms under the first topic sharing a word stem.
pub fn detect_topics(entries: &[TextEntry]) -> Topics {
    let mut topics = Topics::new();
    for keyword in tfidf(entries, TOPIC_TERMS) {
        let topic = topic_of(&keyword.phrase);
        topics.entry(topic).or_default().push(keyword.phrase);
    }
    topics
}

fn topic_of(phrase: &str) -> Topic {
    let stems: Vec<String> = phrase
        .split_whitespace()
        .map(|w| STEMMER.stem(w).into_owned())
        .collect();
    Topic::MATCHED
        .into_iter()
        .find(|topic| {
            topic
                .terms()
                .iter()
                .any(|term| stems.iter().any(|s| *s == STEMMER.stem(term)))
        })
        .unwrap_or(Topic::Other)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(texts: &[&str]) -> Vec<TextEntry> {
        texts.iter().map(|t| TextEntry::new(*t)).collect()
    }

    #[test]
    fn rake_prefers_longer_phrases() {
        let docs = entries(&["The battery life is excellent, and the screen quality is great."]);
        let keywords = rake(&docs, 10);
        assert_eq!(keywords[0].phrase, "battery life");
        assert_eq!(keywords[0].score, 4.0);
        assert!(keywords.iter().any(|k| k.phrase == "excellent"));
        assert!(keywords.iter().all(|k| k.score > 0.0));
        assert!(rake(&docs, 1).len() == 1);
    }

    #[test]
    fn rake_on_stopwords_only_is_empty() {
        assert!(rake(&entries(&["it is what it is", ""]), 5).is_empty());
    }

    #[test]
    fn tfidf_ranks_distinctive_terms() {
        let docs = entries(&[
            "battery battery battery screen",
            "screen keyboard",
            "screen trackpad",
        ]);
        assert_eq!(tfidf(&docs, 3).len(), 3);
        let all = tfidf(&docs, 100);
        for pair in all.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        let position = |phrase: &str| all.iter().position(|k| k.phrase == phrase).unwrap();
        assert!(position("battery") < position("keyboard"));
        assert!(position("keyboard") < position("battery screen"));
        assert!(all.iter().all(|k| k.score > 0.0 && k.score <= 1.0));
    }

    #[test]
    fn tfidf_of_empty_corpus() {
        assert!(tfidf(&entries(&["", "a the"]), 5).is_empty());
        assert!(tfidf(&[], 5).is_empty());
    }

    #[test]
    fn topics_match_by_stem() {
        assert_eq!(topic_of("prices"), Topic::Price);
        assert_eq!(topic_of("customer support"), Topic::Service);
        assert_eq!(topic_of("working"), Topic::Features);
        assert_eq!(topic_of("laptop"), Topic::Other);

        let topics = detect_topics(&entries(&[
            "Great quality laptop",
            "The price is too expensive",
            "Customer service was slow",
        ]));
        assert!(topics[&Topic::Quality].contains(&"quality".to_string()));
        assert!(topics[&Topic::Price].contains(&"expensive".to_string()));
        assert!(topics.values().all(|v| !v.is_empty()));
    }

    #[test]
    fn method_parsing() {
        assert_eq!("TF-IDF".parse::<KeywordMethod>().unwrap(), KeywordMethod::Tfidf);
        assert!("lda".parse::<KeywordMethod>().is_err());
    }
}
