// ABOUTME: Normalization of extracted values into the shape persisted downstream.
// ABOUTME: Cleans text, trims product and company names and splits category codes into NormalizedRecord.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::record::{ExtractedRecord, Status, NAME_KEY};

const COMPANY_KEY: &str = "company";
const CATEGORY_KEY: &str = "category";

static PAREN_GROUP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\([^)]*\)\s*").unwrap());
static CORPORATION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"주식회사\s*").unwrap());
static BRACKET_CODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[(.*?)\]").unwrap());

/// Strips control characters, replaces literal `&nbsp;`, collapses whitespace and trims.
pub fn clean_text(text: &str) -> String {
    let without_controls: String = text
        .chars()
        .filter(|c| !(c.is_ascii_control() && !c.is_ascii_whitespace()))
        .collect();
    without_controls
        .replace("&nbsp;", " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Cuts a product name at its first parenthesised group.
///
/// `"케이캡정50mg(테고프라잔)"` becomes `"케이캡정50mg"`.
pub fn normalize_medicine_name(name: &str) -> String {
    PAREN_GROUP_RE
        .split(name)
        .next()
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// Drops "주식회사" and writes "(주)" and "(유)" as "㈜".
pub fn normalize_company_name(company: &str) -> String {
    CORPORATION_RE
        .replace_all(company, "")
        .replace("(주)", "㈜")
        .replace("(유)", "㈜")
        .trim()
        .to_string()
}

/// Splits `"[02320]소화성궤양용제"` into `("02320", "소화성궤양용제")`.
///
/// Without a bracketed code the code is empty and the whole text is the name.
pub fn split_category(category: &str) -> (String, String) {
    let code = BRACKET_CODE_RE
        .captures(category)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default();
    let name = BRACKET_CODE_RE.replace_all(category, "").trim().to_string();
    (code, name)
}

/// An extracted record cleaned up for storage.
///
/// Summary and detail maps become the two rows of the stored record, both
/// keyed by `identifier`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub identifier: String,
    pub summary: BTreeMap<String, String>,
    pub detail: BTreeMap<String, String>,
    pub detail_markup: BTreeMap<String, String>,
    pub category_code: String,
    pub category_name: String,
    pub status: Status,
}

impl From<&ExtractedRecord> for NormalizedRecord {
    fn from(record: &ExtractedRecord) -> Self {
        let summary: BTreeMap<String, String> = record
            .summary_fields
            .iter()
            .map(|(key, value)| {
                let value = match key.as_str() {
                    NAME_KEY => normalize_medicine_name(value),
                    COMPANY_KEY => normalize_company_name(value),
                    _ => value.clone(),
                };
                (key.clone(), clean_text(&value))
            })
            .filter(|(_, value)| !value.is_empty())
            .collect();

        let detail = record
            .detail_fields
            .iter()
            .map(|(key, value)| (key.clone(), clean_text(value)))
            .filter(|(_, value)| !value.is_empty())
            .collect();

        let (category_code, category_name) = summary
            .get(CATEGORY_KEY)
            .map(|c| split_category(c))
            .unwrap_or_default();

        Self {
            identifier: record.identifier.clone(),
            summary,
            detail,
            detail_markup: record.detail_fields_markup.clone(),
            category_code,
            category_name,
            status: record.status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text(" a\u{0}b&nbsp;c \n\t d "), "ab c d");
        assert_eq!(clean_text(""), "");
    }

    #[test]
    fn test_normalize_medicine_name() {
        assert_eq!(normalize_medicine_name("케이캡정50mg(테고프라잔)"), "케이캡정50mg");
        assert_eq!(normalize_medicine_name("타이레놀정 (아세트아미노펜) 500mg"), "타이레놀정");
        assert_eq!(normalize_medicine_name("아스피린"), "아스피린");
    }

    #[test]
    fn test_normalize_company_name() {
        assert_eq!(normalize_company_name("주식회사 종근당"), "종근당");
        assert_eq!(normalize_company_name("(주)한국얀센"), "㈜한국얀센");
        assert_eq!(normalize_company_name("한독(유)"), "한독㈜");
    }

    #[test]
    fn test_split_category() {
        assert_eq!(
            split_category("[02320]소화성궤양용제"),
            ("02320".to_string(), "소화성궤양용제".to_string())
        );
        assert_eq!(split_category("해열제"), (String::new(), "해열제".to_string()));
    }

    #[test]
    fn test_normalized_record_from_extracted() {
        let mut record = ExtractedRecord::new("123456789");
        record.summary_fields.insert("name_ko".into(), "케이캡정50mg(테고프라잔)".into());
        record.summary_fields.insert("company".into(), "주식회사 에이치케이이노엔".into());
        record.summary_fields.insert("category".into(), "[02320]소화성궤양용제".into());
        record.detail_fields.insert("dosage".into(), " 1일  1회 ".into());
        record.detail_fields_markup.insert("dosage".into(), "<p>1일 1회</p>".into());

        let normalized = NormalizedRecord::from(&record);
        assert_eq!(normalized.summary["name_ko"], "케이캡정50mg");
        assert_eq!(normalized.summary["company"], "에이치케이이노엔");
        assert_eq!(normalized.summary["medicine_id"], "123456789");
        assert_eq!(normalized.category_code, "02320");
        assert_eq!(normalized.category_name, "소화성궤양용제");
        assert_eq!(normalized.detail["dosage"], "1일 1회");
        assert_eq!(normalized.detail_markup["dosage"], "<p>1일 1회</p>");
    }
}
