// ABOUTME: Parses encyclopedia search results into previews of candidate detail pages.
// ABOUTME: Filters items that look like medicine pages and pulls the page identifier out of each link.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Prefix of every detail-page URL; the identifier is appended.
pub const DETAIL_URL_PREFIX: &str = "https://terms.naver.com/entry.naver?docId=";

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^<]+?>").unwrap());
static IDENTIFIER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]{9}").unwrap());

const DOSAGE_FORM_SUFFIXES: &[&str] = &[
    "정", "캡슐", "연고", "주사", "시럽", "액", "산", "주", "정제", "과립", "크림", "로션", "패치",
    "스프레이",
];

const MEDICINE_KEYWORDS: &[&str] = &[
    "전문의약품",
    "일반의약품",
    "소화성궤양용제",
    "항생제",
    "진통제",
    "효능효과",
    "용법용량",
    "사용상주의사항",
    "분류",
    "성상",
    "제형",
];

/// One item of a search API response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchItem {
    pub title: String,
    pub description: String,
    pub link: String,
}

/// The subset of a search API response that carries results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchResponse {
    pub items: Vec<SearchItem>,
}

/// A search hit that points at a medicine detail page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preview {
    pub identifier: String,
    pub title: String,
    pub description: String,
    pub link: String,
}

impl Preview {
    /// Builds a preview, or `None` if the link carries no identifier.
    pub fn from_item(item: &SearchItem) -> Option<Self> {
        let title = strip_tags(&item.title);
        let Some(identifier) = find_identifier(&item.link) else {
            tracing::warn!(title = %title, link = %item.link, "no identifier in search result link");
            return None;
        };
        Some(Self {
            identifier: identifier.to_string(),
            title,
            description: item.description.clone(),
            link: item.link.clone(),
        })
    }

    pub fn detail_url(&self) -> String {
        detail_url(&self.identifier)
    }
}

/// Removes markup tags such as the `<b>` highlights around matched terms.
pub fn strip_tags(text: &str) -> String {
    TAG_RE.replace_all(text, "").trim().to_string()
}

/// Returns the first run of nine digits in `text`.
pub fn find_identifier(text: &str) -> Option<&str> {
    IDENTIFIER_RE.find(text).map(|m| m.as_str())
}

/// Returns true if the item looks like a medicine detail page.
pub fn is_medicine_page(item: &SearchItem) -> bool {
    let title = strip_tags(&item.title);
    DOSAGE_FORM_SUFFIXES.iter().any(|s| title.ends_with(s))
        || MEDICINE_KEYWORDS.iter().any(|k| item.description.contains(k))
}

/// Parses a search API response body into medicine page previews.
pub fn parse_search_response(json: &str) -> Result<Vec<Preview>, serde_json::Error> {
    let response: SearchResponse = serde_json::from_str(json)?;
    let previews: Vec<Preview> = response
        .items
        .iter()
        .filter(|item| is_medicine_page(item))
        .filter_map(Preview::from_item)
        .collect();
    tracing::debug!(items = response.items.len(), previews = previews.len(), "parsed search response");
    Ok(previews)
}

/// Builds the detail-page URL for an identifier.
pub fn detail_url(identifier: &str) -> String {
    format!("{}{}", DETAIL_URL_PREFIX, identifier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn item(title: &str, description: &str, link: &str) -> SearchItem {
        SearchItem {
            title: title.into(),
            description: description.into(),
            link: link.into(),
        }
    }

    #[test]
    fn title_suffix_marks_medicine_page() {
        assert!(is_medicine_page(&item("<b>타이레놀</b>정", "", "")));
        assert!(is_medicine_page(&item("후시딘연고", "", "")));
        assert!(!is_medicine_page(&item("타이레놀 역사", "", "")));
    }

    #[test]
    fn description_keyword_marks_medicine_page() {
        assert!(is_medicine_page(&item("아무개", "일반의약품 해열제", "")));
    }

    #[test]
    fn preview_extracts_identifier_and_strips_tags() {
        let p = Preview::from_item(&item(
            "<b>케이캡</b>정50mg",
            "desc",
            "https://terms.naver.com/entry.naver?docId=2134567890&cid=51000",
        ))
        .unwrap();
        assert_eq!(p.identifier, "213456789");
        assert_eq!(p.title, "케이캡정50mg");
        assert_eq!(
            p.detail_url(),
            "https://terms.naver.com/entry.naver?docId=213456789"
        );
    }

    #[test]
    fn preview_without_identifier_is_dropped() {
        assert!(Preview::from_item(&item("후시딘연고", "", "https://example.com/x")).is_none());
    }

    #[test]
    fn parse_response_filters_items() {
        let json = r#"{
            "total": 3,
            "items": [
                {"title": "후시딘연고", "description": "", "link": "https://terms.naver.com/entry.naver?docId=123456789"},
                {"title": "연고의 역사", "description": "", "link": "https://terms.naver.com/entry.naver?docId=987654321"},
                {"title": "베아제정", "description": "", "link": "https://terms.naver.com/entry.naver"}
            ]
        }"#;
        let previews = parse_search_response(json).unwrap();
        assert_eq!(previews.len(), 1);
        assert_eq!(previews[0].identifier, "123456789");
    }

    #[test]
    fn parse_response_without_items() {
        assert!(parse_search_response("{}").unwrap().is_empty());
        assert!(parse_search_response("not json").is_err());
    }
}
