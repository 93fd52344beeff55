//! Text helpers shared by the rule engines

use std::collections::{BTreeSet, HashSet};
use std::sync::LazyLock;

use regex::Regex;

static SENTENCE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]+(\s+|$)|\n+").unwrap());

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:[.,]\d+)*").unwrap());

static DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b\d{4}-\d{2}-\d{2}\b|\b\d{1,2}/\d{1,2}/\d{2,4}\b|\b(jan|feb|mar|apr|may|jun|jul|aug|sep|sept|oct|nov|dec)[a-z]*\.?\s+\d{1,2}(st|nd|rd|th)?(,\s*\d{4})?\b",
    )
    .unwrap()
});

/// Lowercase alphanumeric tokens
pub fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

/// Jaccard overlap of the word sets. Blank input never overlaps.
pub fn jaccard(a: &str, b: &str) -> f64 {
    let a: HashSet<String> = words(a).into_iter().collect();
    let b: HashSet<String> = words(b).into_iter().collect();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(&b).count() as f64;
    let union = a.union(&b).count() as f64;
    intersection / union
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0)
}

/// Split into trimmed sentences, keeping terminal punctuation
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;
    for m in SENTENCE_END.find_iter(text) {
        // "1. Unplug it" is one sentence
        let body = text[start..m.start()].trim();
        if !body.is_empty() && body.len() <= 3 && body.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }
        let sentence = text[start..m.end()].trim();
        if !sentence.is_empty() {
            sentences.push(sentence.to_string());
        }
        start = m.end();
    }
    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail.to_string());
    }
    sentences
}

/// Comparison key for a sentence: lowercase, single-spaced, no trailing punctuation
pub fn sentence_key(sentence: &str) -> String {
    sentence
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches(|c: char| matches!(c, '.' | '!' | '?' | ',' | ';' | ':'))
        .to_lowercase()
}

/// Ensure a statement ends with terminal punctuation
pub fn ensure_terminal(statement: &str) -> String {
    let trimmed = statement.trim();
    if trimmed.ends_with(['.', '!', '?']) {
        trimmed.to_string()
    } else {
        format!("{}.", trimmed)
    }
}

/// Join statements into one paragraph
pub fn join_statements<I, S>(statements: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    statements
        .into_iter()
        .map(|s| ensure_terminal(s.as_ref()))
        .filter(|s| s != ".")
        .collect::<Vec<_>>()
        .join(" ")
}

/// Unique sentences across texts, first occurrence wins, in order
pub fn sentence_union<'a, I>(texts: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    let mut sentences = Vec::new();
    for text in texts {
        for sentence in split_sentences(text) {
            if seen.insert(sentence_key(&sentence)) {
                sentences.push(sentence);
            }
        }
    }
    sentences
}

/// Numbers mentioned in the text, with thousands separators removed
pub fn extract_numbers(text: &str) -> BTreeSet<String> {
    NUMBER
        .find_iter(text)
        .map(|m| {
            let raw = m.as_str();
            // "1,200" is a thousands separator, "3,5" stays as written
            if raw.contains(',') && raw.split(',').skip(1).all(|g| g.len() == 3) {
                raw.replace(',', "")
            } else {
                raw.to_string()
            }
        })
        .collect()
}

/// Dates written as ISO, slashed or month-name forms
pub fn find_dates(text: &str) -> Vec<String> {
    DATE.find_iter(text).map(|m| m.as_str().to_string()).collect()
}

/// Whether any of the keywords appears as a whole word or phrase
pub fn contains_any(text: &str, keywords: &[&str]) -> bool {
    count_matches(text, keywords) > 0
}

/// Number of keywords that appear as whole words or phrases
pub fn count_matches(text: &str, keywords: &[&str]) -> usize {
    let padded = padded_words(text);
    keywords
        .iter()
        .filter(|kw| padded.contains(&format!(" {} ", kw)))
        .count()
}

fn padded_words(text: &str) -> String {
    format!(" {} ", words(text).join(" "))
}

/// Pull the JSON object out of a model reply (code fences, prose around it)
pub fn extract_json_object(reply: &str) -> Option<&str> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&reply[start..=end])
}

/// Truncate by char count (UTF-8 safe), for prompts and logs
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        let head: String = s.chars().take(max_chars).collect();
        format!("{}...", head)
    } else {
        s.to_string()
    }
}
