//! Heuristic named-entity recognition.
//!
//! Money amounts and dates are matched by pattern first and cut out of the
//! text. The rest is scanned for runs of capitalised words ("spans"), which
//! are typed by small gazetteers, organisation / location / event suffixes,
//! a preceding title (`Mr.`, `CEO`, ...) and span length. A lone capitalised
//! word that opens a sentence and matches nothing is ignored, since it is
//! usually just the first word of the sentence.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::textclean::TextEntry;

/// How many of the most frequent mentions are kept per entity type.
pub const TOP_PER_TYPE: usize = 5;

static MONEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:[$€£]\s?\d[\d,]*(?:\.\d+)?(?:\s?(?:million|billion|trillion|thousand|bn|[kKmM])\b)?)|(?:\b\d[\d,]*(?:\.\d+)?\s?(?:dollars|euros|pounds|USD|EUR|GBP)\b)",
    )
    .expect("valid money regex")
});

static DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:(?:January|February|March|April|May|June|July|August|September|October|November|December)(?:\s+\d{1,2}(?:st|nd|rd|th)?)?(?:,?\s+\d{4})?|Monday|Tuesday|Wednesday|Thursday|Friday|Saturday|Sunday|today|yesterday|tomorrow|1[89]\d{2}|20\d{2})\b",
    )
    .expect("valid date regex")
});

const FUNCTION_WORDS: &[&str] = &[
    "a", "an", "and", "as", "at", "but", "for", "from", "he", "her", "his", "i", "if", "in",
    "it", "its", "my", "no", "of", "on", "or", "our", "she", "so", "that", "the", "their",
    "there", "these", "they", "this", "those", "to", "we", "what", "when", "where", "which",
    "who", "why", "with", "yes", "you", "your",
];

const TITLES: &[&str] = &[
    "mr", "mrs", "ms", "dr", "prof", "sir", "ceo", "cto", "cfo", "president", "senator",
    "governor", "mayor", "minister", "chairman", "founder",
];

/// Abbreviations whose trailing period does not end a sentence.
const ABBREVIATIONS: &[&str] = &[
    "inc", "corp", "ltd", "co", "mr", "mrs", "ms", "dr", "prof", "st", "jr", "sr", "vs",
];

const CONNECTORS: &[&str] = &["of", "de", "and", "&"];

const ORG_SUFFIXES: &[&str] = &[
    "inc", "inc.", "corp", "corp.", "corporation", "ltd", "ltd.", "llc", "co.", "company",
    "group", "university", "bank", "agency", "institute", "foundation", "association",
    "airlines", "technologies", "labs",
];

const LOC_SUFFIXES: &[&str] = &[
    "mountain", "mountains", "river", "lake", "ocean", "sea", "valley", "island", "islands",
    "desert", "forest", "park", "bay", "coast",
];

const EVENT_SUFFIXES: &[&str] = &[
    "conference", "festival", "olympics", "summit", "expo", "war", "cup", "championship",
    "awards", "week",
];

const KNOWN_ORGS: &[&str] = &[
    "Amazon", "Apple", "Facebook", "Google", "IBM", "Intel", "Meta", "Microsoft", "NASA",
    "Netflix", "Nvidia", "OpenAI", "Samsung", "Sony", "Tesla", "Twitter", "Uber",
];

const GAZETTEER_GPE: &[&str] = &[
    "America", "Australia", "Berlin", "Boston", "California", "Canada", "Chicago", "China",
    "Cupertino", "England", "France", "Germany", "India", "Italy", "Japan", "LA", "London",
    "Los Angeles", "Madrid", "Mexico", "New York", "NYC", "Paris", "Rome", "San Francisco",
    "Seattle", "Spain", "Texas", "Tokyo", "UK", "US", "USA", "United Kingdom", "United States",
    "Washington",
];

const GAZETTEER_LOC: &[&str] = &["Africa", "Asia", "Europe", "Silicon Valley", "Antarctica"];

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntityType {
    Person,
    Org,
    Gpe,
    Product,
    Date,
    Money,
    Loc,
    Event,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Person => "PERSON",
            EntityType::Org => "ORG",
            EntityType::Gpe => "GPE",
            EntityType::Product => "PRODUCT",
            EntityType::Date => "DATE",
            EntityType::Money => "MONEY",
            EntityType::Loc => "LOC",
            EntityType::Event => "EVENT",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub text: String,
    pub kind: EntityType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityCounts {
    pub total: usize,
    pub unique: usize,
    pub top: Vec<(String, usize)>,
}

/// Only types with at least one mention appear.
pub type EntitySummary = BTreeMap<EntityType, EntityCounts>;

struct Token {
    word: String,
    sentence_start: bool,
    break_before: bool,
}

/// All entity mentions in one text, in order of discovery.
pub fn extract(text: &str) -> Vec<Entity> {
    let mut found = Vec::new();

    let text = MONEY_RE.replace_all(text, |caps: &Captures| {
        found.push(Entity {
            text: caps[0].trim().to_string(),
            kind: EntityType::Money,
        });
        " ; "
    });
    let text = DATE_RE.replace_all(&text, |caps: &Captures| {
        found.push(Entity {
            text: caps[0].trim().to_string(),
            kind: EntityType::Date,
        });
        " ; "
    });

    let tokens = tokenize(&text);
    let mut person_hint = false;
    let mut i = 0;
    while i < tokens.len() {
        let token = &tokens[i];
        let lower = token.word.trim_end_matches('.').to_lowercase();
        if TITLES.contains(&lower.as_str()) {
            person_hint = true;
            i += 1;
            continue;
        }
        if !is_capitalized(&token.word) || FUNCTION_WORDS.contains(&lower.as_str()) {
            person_hint = false;
            i += 1;
            continue;
        }

        let mut parts = vec![token.word.as_str()];
        let mut j = i + 1;
        while j < tokens.len() {
            let next = &tokens[j];
            if next.break_before
                || is_title(&next.word)
                || next.word.chars().any(|c| c.is_ascii_digit())
            {
                break;
            }
            if is_capitalized(&next.word) {
                parts.push(&next.word);
                j += 1;
                continue;
            }
            let joins = CONNECTORS.contains(&next.word.as_str())
                && tokens
                    .get(j + 1)
                    .map(|t| !t.break_before && is_capitalized(&t.word) && !is_title(&t.word))
                    .unwrap_or(false);
            if joins {
                parts.push(&next.word);
                j += 1;
                continue;
            }
            break;
        }

        let versioned = tokens
            .get(j)
            .filter(|t| !t.break_before && t.word.chars().any(|c| c.is_ascii_digit()));
        if let Some(version) = versioned {
            let mut name = parts.join(" ");
            name.push(' ');
            name.push_str(&version.word);
            found.push(Entity {
                text: name,
                kind: EntityType::Product,
            });
            j += 1;
        } else if let Some(kind) = classify(&parts, token.sentence_start, person_hint) {
            found.push(Entity {
                text: parts.join(" "),
                kind,
            });
        }
        person_hint = false;
        i = j;
    }
    found
}

/// Mentions across all entries, counted per type.
pub fn summarize(entries: &[TextEntry]) -> EntitySummary {
    let mut mentions: BTreeMap<EntityType, Vec<String>> = BTreeMap::new();
    for entry in entries {
        for entity in extract(&entry.text) {
            mentions.entry(entity.kind).or_default().push(entity.text);
        }
    }
    mentions
        .into_iter()
        .map(|(kind, names)| {
            let total = names.len();
            let ranked = rank(names);
            let unique = ranked.len();
            let top = ranked.into_iter().take(TOP_PER_TYPE).collect();
            (kind, EntityCounts { total, unique, top })
        })
        .collect()
}

fn rank(names: Vec<String>) -> Vec<(String, usize)> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for name in names {
        *counts.entry(name).or_insert(0) += 1;
    }
    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked
}

fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut sentence_start = true;
    let mut pending_break = true;

    for raw in text.split_whitespace() {
        let lead = raw.trim_start_matches(|c: char| !c.is_alphanumeric() && c != '&');
        let core = lead.trim_end_matches(|c: char| !c.is_alphanumeric() && c != '&');
        let trailing = &lead[core.len()..];
        if core.is_empty() {
            if raw.contains(['.', '!', '?']) {
                sentence_start = true;
            }
            pending_break = true;
            continue;
        }

        let abbreviation =
            trailing.starts_with('.') && ABBREVIATIONS.contains(&core.to_lowercase().as_str());
        let mut word = if abbreviation {
            format!("{core}.")
        } else {
            core.to_string()
        };
        for possessive in ["'s", "’s"] {
            if let Some(stripped) = word.strip_suffix(possessive) {
                word = stripped.to_string();
            }
        }

        tokens.push(Token {
            word,
            sentence_start,
            break_before: pending_break || raw.starts_with(['(', '"', '“']),
        });
        sentence_start = !abbreviation && trailing.contains(['.', '!', '?']);
        pending_break = sentence_start || trailing.contains([',', ';', ':', ')', '"', '”']);
    }
    tokens
}

fn is_capitalized(word: &str) -> bool {
    word.chars().next().map(char::is_uppercase).unwrap_or(false)
}

fn is_title(word: &str) -> bool {
    TITLES.contains(&word.trim_end_matches('.').to_lowercase().as_str())
}

fn is_acronym(word: &str) -> bool {
    (2..=5).contains(&word.len()) && word.chars().all(|c| c.is_ascii_uppercase())
}

fn classify(parts: &[&str], sentence_start: bool, person_hint: bool) -> Option<EntityType> {
    let name = parts.join(" ");
    let last = parts.last().map(|p| p.to_lowercase()).unwrap_or_default();

    if person_hint {
        return Some(EntityType::Person);
    }
    if GAZETTEER_GPE.contains(&name.as_str()) {
        return Some(EntityType::Gpe);
    }
    if GAZETTEER_LOC.contains(&name.as_str()) {
        return Some(EntityType::Loc);
    }
    if KNOWN_ORGS.contains(&parts[0]) || (parts.len() > 1 && ORG_SUFFIXES.contains(&last.as_str()))
    {
        return Some(EntityType::Org);
    }
    if parts.len() > 1 && LOC_SUFFIXES.contains(&last.as_str()) {
        return Some(EntityType::Loc);
    }
    if parts.len() > 1 && EVENT_SUFFIXES.contains(&last.as_str()) {
        return Some(EntityType::Event);
    }
    if parts.len() == 1 && is_acronym(parts[0]) {
        return Some(EntityType::Org);
    }
    if parts.len() > 1 && parts.len() <= 3 && !parts.iter().any(|p| CONNECTORS.contains(p)) {
        return Some(EntityType::Person);
    }
    if parts.len() > 3 {
        return Some(EntityType::Org);
    }
    if sentence_start {
        None
    } else {
        Some(EntityType::Org)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(text: &str) -> Vec<(String, EntityType)> {
        extract(text).into_iter().map(|e| (e.text, e.kind)).collect()
    }

    fn has(text: &str, name: &str, kind: EntityType) -> bool {
        kinds(text).iter().any(|(n, k)| n == name && *k == kind)
    }

    #[test]
    fn organisations_and_places() {
        let t = "Apple Inc. is located in Cupertino, California.";
        assert!(has(t, "Apple Inc.", EntityType::Org));
        assert!(has(t, "Cupertino", EntityType::Gpe));
        assert!(has(t, "California", EntityType::Gpe));
    }

    #[test]
    fn titles_mark_people() {
        let t = "Microsoft CEO Satya Nadella spoke at the conference.";
        assert!(has(t, "Microsoft", EntityType::Org));
        assert!(has(t, "Satya Nadella", EntityType::Person));
        assert!(has("Yesterday Dr. Smith arrived.", "Smith", EntityType::Person));
    }

    #[test]
    fn money_and_dates() {
        assert!(has(
            "The company earned $50 million in revenue.",
            "$50 million",
            EntityType::Money
        ));
        let t = "Amazon opened a new office in Seattle on Monday.";
        assert!(has(t, "Amazon", EntityType::Org));
        assert!(has(t, "Seattle", EntityType::Gpe));
        assert!(has(t, "Monday", EntityType::Date));
        assert!(has("Launched on March 3, 2021 in Tokyo.", "March 3, 2021", EntityType::Date));
    }

    #[test]
    fn sentence_initial_words_are_not_entities() {
        assert!(kinds("This product is excellent! Great quality and value.").is_empty());
        assert!(kinds("The dog sleeps.").is_empty());
    }

    #[test]
    fn possessives_and_products() {
        assert!(has("Google's new product launch was successful.", "Google", EntityType::Org));
        assert!(has("I bought an Galaxy S23 yesterday.", "Galaxy S23", EntityType::Product));
    }

    #[test]
    fn summary_counts_types() {
        let entries = vec![
            TextEntry::new("Apple Inc. announced profits. CEO Tim Cook spoke in Cupertino, California."),
            TextEntry::new("Microsoft is expanding in Seattle. The company plans to invest $500 million."),
            TextEntry::new("Seattle is rainy."),
        ];
        let summary = summarize(&entries);
        let gpe = &summary[&EntityType::Gpe];
        assert_eq!(gpe.total, 4);
        assert_eq!(gpe.unique, 3);
        assert_eq!(gpe.top[0], ("Seattle".to_string(), 2));
        assert_eq!(summary[&EntityType::Person].top[0].0, "Tim Cook");
        assert_eq!(summary[&EntityType::Money].total, 1);
        assert!(!summary.contains_key(&EntityType::Event));
    }
}
