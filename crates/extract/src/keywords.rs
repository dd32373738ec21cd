// ABOUTME: Mines search keywords from an extracted record's category, company and ingredient fields.
// ABOUTME: Keywords are returned as a sorted, deduplicated set for feeding later searches.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::normalize::split_category;
use crate::record::ExtractedRecord;

static HANGUL_WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[가-힣]+").unwrap());
static COMPANY_SUFFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(주\)|\(유\)|주식회사|약품|제약").unwrap());
// Ingredient name, optionally followed by a dose which is swallowed.
static INGREDIENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([가-힣a-zA-Z\-]+)(?:\s*[\d.]+\s*(?:mg|g|ml|IU|mcg))?").unwrap()
});

/// Collects keywords worth searching for from a record.
pub fn mine_keywords(record: &ExtractedRecord) -> BTreeSet<String> {
    let mut keywords = BTreeSet::new();
    if let Some(category) = record.summary("category") {
        from_category(category, &mut keywords);
    }
    if let Some(company) = record.summary("company") {
        from_company(company, &mut keywords);
    }
    if let Some(ingredients) = record.summary("ingredient_info") {
        from_ingredients(ingredients, &mut keywords);
    }
    keywords
}

fn from_category(category: &str, out: &mut BTreeSet<String>) {
    let (_, name) = split_category(category);
    if name.is_empty() {
        return;
    }
    for word in HANGUL_WORD_RE.find_iter(&name) {
        if word.as_str().chars().count() >= 2 {
            out.insert(word.as_str().to_string());
        }
    }
    out.insert(name);
}

fn from_company(company: &str, out: &mut BTreeSet<String>) {
    let cleaned = COMPANY_SUFFIX_RE.replace_all(company, "");
    let cleaned = cleaned.trim();
    if !cleaned.is_empty() {
        out.insert(cleaned.to_string());
    }
}

fn from_ingredients(text: &str, out: &mut BTreeSet<String>) {
    for caps in INGREDIENT_RE.captures_iter(text) {
        let token = caps[1].trim_matches('-');
        if token.chars().count() > 1 {
            out.insert(token.to_string());
        }
    }
}
