//! Flesch reading ease and Flesch-Kincaid grade level.

use serde::{Deserialize, Serialize};

use crate::textclean::{TextEntry, split_sentences};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Readability {
    /// Source row of the scored text, when it came from a table.
    pub row: Option<usize>,
    /// 0 (hardest) to 100 (easiest).
    pub flesch_reading_ease: f64,
    /// US school grade, never below 0.
    pub flesch_kincaid_grade: f64,
    pub avg_words_per_sentence: f64,
    pub avg_syllables_per_word: f64,
    pub interpretation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplexityReport {
    pub texts: Vec<Readability>,
    pub avg_reading_ease: f64,
    pub avg_grade_level: f64,
    pub interpretation: String,
}

pub fn readability(text: &str) -> Readability {
    let sentences = split_sentences(text);
    let words: Vec<&str> = sentences
        .iter()
        .flat_map(|s| s.split_whitespace())
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| !w.is_empty())
        .collect();
    if sentences.is_empty() || words.is_empty() {
        return Readability {
            row: None,
            flesch_reading_ease: 0.0,
            flesch_kincaid_grade: 0.0,
            avg_words_per_sentence: 0.0,
            avg_syllables_per_word: 0.0,
            interpretation: interpret(0.0).to_string(),
        };
    }

    let syllables: usize = words.iter().map(|w| count_syllables(w)).sum();
    let wps = words.len() as f64 / sentences.len() as f64;
    let spw = syllables as f64 / words.len() as f64;
    let ease = (206.835 - 1.015 * wps - 84.6 * spw).clamp(0.0, 100.0);
    let grade = (0.39 * wps + 11.8 * spw - 15.59).max(0.0);

    Readability {
        row: None,
        flesch_reading_ease: round2(ease),
        flesch_kincaid_grade: round2(grade),
        avg_words_per_sentence: round2(wps),
        avg_syllables_per_word: round2(spw),
        interpretation: interpret(ease).to_string(),
    }
}

/// Per-text scores and their averages.
pub fn complexity(entries: &[TextEntry]) -> ComplexityReport {
    let texts: Vec<Readability> = entries
        .iter()
        .map(|e| Readability {
            row: e.row,
            ..readability(&e.text)
        })
        .collect();
    let n = texts.len().max(1) as f64;
    let avg_reading_ease = round2(texts.iter().map(|r| r.flesch_reading_ease).sum::<f64>() / n);
    let avg_grade_level = round2(texts.iter().map(|r| r.flesch_kincaid_grade).sum::<f64>() / n);
    ComplexityReport {
        interpretation: interpret(avg_reading_ease).to_string(),
        texts,
        avg_reading_ease,
        avg_grade_level,
    }
}

/// Vowel groups, minus a silent trailing `e`, at least one.
pub fn count_syllables(word: &str) -> usize {
    let word = word.to_lowercase();
    let mut count = 0;
    let mut previous_vowel = false;
    for c in word.chars() {
        let vowel = matches!(c, 'a' | 'e' | 'i' | 'o' | 'u');
        if vowel && !previous_vowel {
            count += 1;
        }
        previous_vowel = vowel;
    }
    if word.ends_with('e') && count > 0 {
        count -= 1;
    }
    count.max(1)
}

pub fn interpret(ease: f64) -> &'static str {
    match ease {
        s if s >= 90.0 => "Very easy (5th grade)",
        s if s >= 80.0 => "Easy (6th grade)",
        s if s >= 70.0 => "Fairly easy (7th grade)",
        s if s >= 60.0 => "Standard (8th-9th grade)",
        s if s >= 50.0 => "Fairly difficult (10th-12th grade)",
        s if s >= 30.0 => "Difficult (College)",
        _ => "Very difficult (College graduate)",
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
