// ABOUTME: Registry of named post-processors applied to raw field text after extraction.
// ABOUTME: Covers name cleanup, size-token extraction, color-vocabulary matching and identification cleanup.

//! Post-processors.
//!
//! Each processor is a pure `&str -> String` transform. The set is closed:
//! a schema names a processor by its registered name and the loader resolves
//! it to a [`PostProcessor`] variant once.

use std::collections::HashSet;
use std::fmt;

use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::select::normalize_whitespace;

/// A registered text transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PostProcessor {
    CleanName,
    Size,
    Color,
    Identification,
}

impl PostProcessor {
    /// Every registered processor.
    pub const ALL: [PostProcessor; 4] = [
        PostProcessor::CleanName,
        PostProcessor::Size,
        PostProcessor::Color,
        PostProcessor::Identification,
    ];

    /// The name a schema uses to reference this processor.
    pub fn name(self) -> &'static str {
        match self {
            PostProcessor::CleanName => "clean_medicine_name",
            PostProcessor::Size => "extract_size",
            PostProcessor::Color => "extract_color",
            PostProcessor::Identification => "extract_identification",
        }
    }

    /// Resolves a registered name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name.trim())
    }

    /// Applies the transform.
    pub fn apply(self, text: &str) -> String {
        match self {
            PostProcessor::CleanName => clean_name(text),
            PostProcessor::Size => extract_size(text),
            PostProcessor::Color => extract_color(text),
            PostProcessor::Identification => clean_identification(text),
        }
    }
}

impl fmt::Display for PostProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// Numeric token with an optional axis label prefix and mm/cm unit.
static SIZE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\((?:장축|단축|두께)\))?\s*\d+(?:\.\d+)?\s*(?:mm|cm)?").unwrap()
});

// Korean terms first, then English; English terms match whole words only.
const COLOR_TERMS: &[&str] = &[
    "흰", "하양", "백색", "검정", "검은", "흑색", "빨강", "적색", "노랑", "황색", "파랑", "청색",
    "초록", "녹색", "분홍", "핑크색", "보라", "자색", "갈색", "회색", "투명", "반투명", "무색",
    "white", "black", "red", "yellow", "blue", "green", "pink", "purple", "brown", "gray", "grey",
    "transparent", "translucent", "colorless",
];

static COLOR_MATCHER: Lazy<AhoCorasick> = Lazy::new(|| {
    AhoCorasickBuilder::new()
        .ascii_case_insensitive(true)
        .match_kind(MatchKind::LeftmostLongest)
        .build(COLOR_TERMS)
        .unwrap()
});

/// Collapses whitespace runs and trims a product name.
pub fn clean_name(text: &str) -> String {
    normalize_whitespace(text)
}

/// Collapses whitespace runs and trims an identification mark.
pub fn clean_identification(text: &str) -> String {
    normalize_whitespace(text)
}

/// Extracts size tokens such as `(장축)10.5mm`, joined with ", ".
///
/// Falls back to the trimmed input when nothing numeric is found.
pub fn extract_size(text: &str) -> String {
    let sizes: Vec<String> = SIZE_RE
        .find_iter(text)
        .map(|m| normalize_whitespace(m.as_str()))
        .filter(|s| !s.is_empty())
        .collect();
    if sizes.is_empty() {
        return text.trim().to_string();
    }
    sizes.join(", ")
}

fn is_word_char(c: Option<char>) -> bool {
    c.is_some_and(|c| c.is_ascii_alphabetic())
}

/// Extracts color terms in the order they appear, joined with ", ".
///
/// Falls back to the trimmed input when no known color is mentioned.
pub fn extract_color(text: &str) -> String {
    let mut seen = HashSet::new();
    let mut found = Vec::new();
    for m in COLOR_MATCHER.find_iter(text) {
        let term = COLOR_TERMS[m.pattern().as_usize()];
        if term.is_ascii() {
            let before = text[..m.start()].chars().next_back();
            let after = text[m.end()..].chars().next();
            if is_word_char(before) || is_word_char(after) {
                continue;
            }
        }
        if seen.insert(term) {
            found.push(term);
        }
    }
    if found.is_empty() {
        return text.trim().to_string();
    }
    found.join(", ")
}
