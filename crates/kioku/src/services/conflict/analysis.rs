//! Pairwise content analysis behind the conflict type cascade

use std::collections::{BTreeSet, HashSet};
use std::sync::LazyLock;

use regex::Regex;

use crate::domain::{ConflictType, MemoryRecord, MemoryType};
use crate::services::text::{extract_numbers, find_dates, jaccard, split_sentences, words};

static PREFER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:prefers?|preferred|would rather have)\s+(?P<object>.+?)(?:\s+(?:over|to|rather than|instead of)\s+.+)?$",
    )
    .unwrap()
});

static FAVORITE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bfavou?rite\s+(?P<kind>[\w ]+?)\s+(?:is|are|was|were)\s+(?P<object>.+)$")
        .unwrap()
});

static POLAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?P<verb>(?:do not|don't|does not|doesn't|did not|didn't|never)\s+(?:like|enjoy|want|eat|drink)|dislikes?|disliked|hates?|hated|can't stand|cannot stand|likes?|liked|loves?|loved|enjoys?|enjoyed|adores?)\s+(?P<object>.+)$",
    )
    .unwrap()
});

static NEGATIVE_VERB: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:do not|don't|does not|doesn't|did not|didn't|never|dislike|disliked|hate|hated|can't|cannot)")
        .unwrap()
});

static TIME_OF_DAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b\d{1,2}(?::\d{2})?\s*(?:am|pm)\b|\b\d{1,2}:\d{2}\b").unwrap()
});

static RELATIVE_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:today|tonight|tomorrow|yesterday|monday|tuesday|wednesday|thursday|friday|saturday|sunday|morning|afternoon|evening|noon|midnight|weekend|(?:next|this|last) (?:week|month|year))\b",
    )
    .unwrap()
});

const NEGATIONS: &[&str] = &[
    "not", "no", "never", "don't", "doesn't", "didn't", "isn't", "aren't", "wasn't", "weren't",
    "won't", "can't", "cannot", "shouldn't", "haven't", "hasn't", "nobody", "nothing",
];

const ARTICLES: &[&str] = &["a", "an", "the", "some", "my"];

/// Minimum overlap of the non-negation words for two statements to contradict
const CONTRADICTION_CORE_OVERLAP: f64 = 0.5;

/// A stated preference: `subject` is what the preference is about
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Preference {
    pub subject: String,
    pub object: String,
    pub positive: bool,
}

fn normalize_apostrophes(text: &str) -> String {
    text.replace(['\u{2019}', '\u{2018}'], "'")
}

fn normalize_object(raw: &str) -> String {
    let cleaned = raw
        .trim()
        .trim_end_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase();
    let mut tokens: Vec<&str> = cleaned.split_whitespace().collect();
    while tokens.first().is_some_and(|t| ARTICLES.contains(t)) {
        tokens.remove(0);
    }
    for tail in [["very", "much"], ["a", "lot"]] {
        if tokens.ends_with(&tail) {
            tokens.truncate(tokens.len() - 2);
        }
    }
    tokens.join(" ")
}

/// Preferences stated in the text, one per matching sentence
pub fn preferences(text: &str) -> Vec<Preference> {
    let text = normalize_apostrophes(text);
    let mut found = Vec::new();

    for sentence in split_sentences(&text) {
        if let Some(caps) = FAVORITE.captures(&sentence) {
            let object = normalize_object(&caps["object"]);
            if !object.is_empty() {
                found.push(Preference {
                    subject: format!("favorite {}", normalize_object(&caps["kind"])),
                    object,
                    positive: true,
                });
            }
        } else if let Some(caps) = PREFER.captures(&sentence) {
            let object = normalize_object(&caps["object"]);
            if !object.is_empty() {
                found.push(Preference {
                    subject: "prefers".to_string(),
                    object,
                    positive: true,
                });
            }
        } else if let Some(caps) = POLAR.captures(&sentence) {
            let object = normalize_object(&caps["object"]);
            if !object.is_empty() {
                found.push(Preference {
                    subject: object.clone(),
                    object,
                    positive: !NEGATIVE_VERB.is_match(&caps["verb"]),
                });
            }
        }
    }
    found
}

/// Same subject with a different object, or same object with opposite polarity
pub fn preferences_oppose(a: &[Preference], b: &[Preference]) -> bool {
    a.iter().any(|x| {
        b.iter().any(|y| {
            (x.subject == y.subject && x.object != y.object)
                || (x.object == y.object && x.positive != y.positive)
        })
    })
}

fn is_negated(text: &str) -> bool {
    words(&normalize_apostrophes(text))
        .iter()
        .any(|w| NEGATIONS.contains(&w.as_str()))
}

fn without_negations(text: &str) -> String {
    words(&normalize_apostrophes(text))
        .into_iter()
        .filter(|w| !NEGATIONS.contains(&w.as_str()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// One side asserts what the other denies about the same thing
pub fn contradicts(a: &str, b: &str) -> bool {
    is_negated(a) != is_negated(b)
        && jaccard(&without_negations(a), &without_negations(b)) >= CONTRADICTION_CORE_OVERLAP
}

/// Both memories carry numbers, and not the same ones
pub fn numbers_differ(a: &str, b: &str) -> bool {
    let (na, nb) = (extract_numbers(a), extract_numbers(b));
    !na.is_empty() && !nb.is_empty() && na != nb
}

fn without_numbers(text: &str) -> String {
    words(text)
        .into_iter()
        .filter(|w| !w.chars().any(|c| c.is_ascii_digit()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Sentences of `text` carrying a number that `other` lacks
fn sentences_with_new_numbers(text: &str, other: &BTreeSet<String>) -> Vec<String> {
    split_sentences(text)
        .into_iter()
        .filter(|s| extract_numbers(s).iter().any(|n| !other.contains(n)))
        .map(|s| without_numbers(&s))
        .collect()
}

/// The number sets can be combined without stating two values for one fact:
/// one side holds every number of the other, or the numbers only one side
/// has sit in sentences about different things.
pub fn numbers_compatible(a: &str, b: &str) -> bool {
    let (na, nb) = (extract_numbers(a), extract_numbers(b));
    if na.is_subset(&nb) || nb.is_subset(&na) {
        return true;
    }
    let (sa, sb) = (sentences_with_new_numbers(a, &nb), sentences_with_new_numbers(b, &na));
    !sa.iter().any(|x| sb.iter().any(|y| jaccard(x, y) >= CONTRADICTION_CORE_OVERLAP))
}

/// Dates, clock times and relative day words, normalized
pub fn temporal_entities(text: &str) -> BTreeSet<String> {
    let mut entities: BTreeSet<String> = find_dates(text)
        .into_iter()
        .map(|d| d.to_lowercase())
        .collect();
    entities.extend(
        TIME_OF_DAY
            .find_iter(text)
            .map(|m| m.as_str().to_lowercase().replace(' ', "")),
    );
    entities.extend(RELATIVE_TIME.find_iter(text).map(|m| m.as_str().to_lowercase()));
    entities
}

/// At least one shared point in time, but not the same set of them
pub fn temporal_mismatch(a: &str, b: &str) -> bool {
    let (ta, tb) = (temporal_entities(a), temporal_entities(b));
    let shared: HashSet<_> = ta.intersection(&tb).collect();
    !shared.is_empty() && ta != tb
}

/// Classify the overlap between two memories. The checks run in fixed
/// precedence; the first that matches decides.
pub fn conflict_type(
    new_memory: &MemoryRecord,
    existing: &MemoryRecord,
    similarity: f64,
    redundancy_threshold: f64,
) -> (ConflictType, String) {
    let (a, b) = (new_memory.content(), existing.content());
    let (ta, tb) = (new_memory.memory_type(), existing.memory_type());

    if ta == MemoryType::Preference
        && tb == MemoryType::Preference
        && preferences_oppose(&preferences(a), &preferences(b))
    {
        return (
            ConflictType::PreferenceConflict,
            "opposing preferences about the same subject".to_string(),
        );
    }
    if contradicts(a, b) {
        return (
            ConflictType::Contradiction,
            "one memory negates the other".to_string(),
        );
    }
    if ta == tb
        && matches!(ta, MemoryType::Factual | MemoryType::Semantic)
        && numbers_differ(a, b)
    {
        return (
            ConflictType::FactualConflict,
            "same fact with different values".to_string(),
        );
    }
    if ta == MemoryType::Temporal && tb == MemoryType::Temporal && temporal_mismatch(a, b) {
        return (
            ConflictType::TemporalConflict,
            "different times for the same event".to_string(),
        );
    }
    if similarity >= redundancy_threshold {
        return (
            ConflictType::Redundancy,
            format!("near-duplicate (similarity {:.2})", similarity),
        );
    }
    (ConflictType::None, String::new())
}
