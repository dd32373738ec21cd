// ABOUTME: Selector engine resolving compiled CSS selectors against a parsed page and reading text or attributes.
// ABOUTME: Fails soft: malformed selectors and misses yield empty results, never errors.

//! Selector-driven node lookup and value extraction.
//!
//! Key behaviors:
//! - Selectors are compiled once, when the schema loads, and passed around
//!   as [`Selector`] values; a selector that fails to compile is reported
//!   then and reads as absent afterwards.
//! - `select_one` returns the first match; `select_all` returns every match
//!   in document order (possibly empty).
//! - Text extraction concatenates descendant text, collapses whitespace runs
//!   to a single space and trims.
//! - Attribute extraction returns the trimmed value, or an empty string.
//! - A missing node always reads as an empty string.

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Node, Selector};

use crate::schema::{PROFILE_TABLE_SELECTOR, SECTION_HEADING_SELECTOR};

static PROFILE_TABLE: Lazy<Selector> = Lazy::new(|| Selector::parse(PROFILE_TABLE_SELECTOR).unwrap());
static SECTION_HEADING: Lazy<Selector> = Lazy::new(|| Selector::parse(SECTION_HEADING_SELECTOR).unwrap());
static ROW: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").unwrap());
static HEADER_CELL: Lazy<Selector> = Lazy::new(|| Selector::parse("th").unwrap());
static DATA_CELL: Lazy<Selector> = Lazy::new(|| Selector::parse("td").unwrap());

/// Normalizes whitespace in a string by collapsing runs of whitespace into single spaces.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Compiles a CSS selector, logging a warning and returning `None` if it is malformed.
pub fn parse_selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(selector) => Some(selector),
        Err(err) => {
            tracing::warn!(selector = %css, error = %err, "malformed selector; field will be treated as absent");
            None
        }
    }
}

/// Returns the first element matching `selector`, or `None`.
pub fn select_one<'a>(doc: &'a Html, selector: &Selector) -> Option<ElementRef<'a>> {
    doc.select(selector).next()
}

/// Returns every element matching `selector` in document order.
pub fn select_all<'a>(doc: &'a Html, selector: &Selector) -> Vec<ElementRef<'a>> {
    doc.select(selector).collect()
}

/// Returns the first descendant of `scope` matching `selector`.
pub fn select_one_in<'a>(scope: ElementRef<'a>, selector: &Selector) -> Option<ElementRef<'a>> {
    scope.select(selector).next()
}

/// Returns every descendant of `scope` matching `selector`.
pub fn select_all_in<'a>(scope: ElementRef<'a>, selector: &Selector) -> Vec<ElementRef<'a>> {
    scope.select(selector).collect()
}

// Elements whose text is code, not content.
const NON_TEXT_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Extracts whitespace-normalized text content, empty for a missing node.
///
/// Text inside script and style elements is skipped.
pub fn extract_text(node: Option<ElementRef<'_>>) -> String {
    let Some(el) = node else {
        return String::new();
    };
    let mut text = String::new();
    for descendant in el.descendants() {
        let Node::Text(t) = descendant.value() else {
            continue;
        };
        let in_code = descendant
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(|a| NON_TEXT_ELEMENTS.contains(&a.value().name()));
        if !in_code {
            text.push_str(t);
        }
    }
    normalize_whitespace(&text)
}

/// Extracts a trimmed attribute value, empty if the node or attribute is missing.
pub fn extract_attribute(node: Option<ElementRef<'_>>, name: &str) -> String {
    node.and_then(|el| el.value().attr(name))
        .map(|v| v.trim().to_string())
        .unwrap_or_default()
}

/// Extracts the first non-empty attribute from a priority list.
pub fn extract_first_attribute<S: AsRef<str>>(node: Option<ElementRef<'_>>, names: &[S]) -> String {
    names
        .iter()
        .map(|name| extract_attribute(node, name.as_ref()))
        .find(|v| !v.is_empty())
        .unwrap_or_default()
}

/// Returns the next sibling that is an element, skipping text and comments.
pub fn next_element_sibling(node: ElementRef<'_>) -> Option<ElementRef<'_>> {
    node.next_siblings().find_map(ElementRef::wrap)
}

/// Returns true if the element opens a long-form section.
pub fn is_section_heading(node: ElementRef<'_>) -> bool {
    SECTION_HEADING.matches(&node)
}

/// Reads the profile table into header text and value cell pairs, in document order.
///
/// Rows lacking a header cell, a data cell or header text are skipped.
pub fn profile_table(doc: &Html) -> Vec<(String, ElementRef<'_>)> {
    let Some(table) = select_one(doc, &PROFILE_TABLE) else {
        tracing::debug!("profile table not found");
        return Vec::new();
    };
    select_all_in(table, &ROW)
        .into_iter()
        .filter_map(|row| {
            let header = select_one_in(row, &HEADER_CELL)?;
            let value = select_one_in(row, &DATA_CELL)?;
            let header = extract_text(Some(header));
            if header.is_empty() {
                return None;
            }
            Some((header, value))
        })
        .collect()
}

/// Finds the section whose heading text is `title` and returns its first content element.
///
/// Headings are compared after whitespace normalization. Returns `None` when
/// no heading carries the title or the heading has nothing after it.
pub fn find_section<'a>(doc: &'a Html, title: &str) -> Option<ElementRef<'a>> {
    let title = normalize_whitespace(title);
    let heading = doc
        .select(&SECTION_HEADING)
        .find(|h| extract_text(Some(*h)) == title)?;
    let content = next_element_sibling(heading).filter(|el| !is_section_heading(*el));
    if content.is_none() {
        tracing::debug!(section = %title, "section has no content element");
    }
    content
}
