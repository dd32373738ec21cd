// ABOUTME: Validator deciding whether an ExtractedRecord is well-formed enough to persist.
// ABOUTME: Checks identifier shape, required name, insurance code, image URL and markup shape.

use thiserror::Error;

use crate::record::{ExtractedRecord, IDENTIFIER_KEY, NAME_KEY};

/// Number of ASCII digits in a page identifier.
pub const IDENTIFIER_LEN: usize = 9;

const INSURANCE_CODE_KEY: &str = "insurance_code";
const IMAGE_URL_KEY: &str = "image_url";
const IMAGE_URL_SCHEMES: &[&str] = &["http://", "https://"];

/// Why a record was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("record is empty")]
    Empty,
    #[error("missing required field: {0}")]
    MissingField(String),
    #[error("invalid identifier: {0:?}")]
    InvalidIdentifier(String),
    #[error("identifier mismatch: summary has {summary:?}, detail has {detail:?}")]
    IdentifierMismatch { summary: String, detail: String },
    #[error("invalid insurance code: {0:?}")]
    InvalidInsuranceCode(String),
    #[error("invalid image url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("markup for {0} does not look like markup")]
    InvalidMarkup(String),
}

/// Returns true if `s` is exactly nine ASCII digits.
pub fn is_identifier(s: &str) -> bool {
    s.len() == IDENTIFIER_LEN && s.bytes().all(|b| b.is_ascii_digit())
}

/// Checks that a record is fit for persistence.
///
/// Validation is independent of status: a `Failed` record with a valid
/// identifier and name still passes.
pub fn validate(record: &ExtractedRecord) -> Result<(), ValidationError> {
    if record.is_empty() {
        return Err(ValidationError::Empty);
    }
    if !is_identifier(&record.identifier) {
        return Err(ValidationError::InvalidIdentifier(record.identifier.clone()));
    }

    let summary_id = record.summary_fields.get(IDENTIFIER_KEY).map(String::as_str).unwrap_or("");
    let detail_id = record.detail_fields.get(IDENTIFIER_KEY).map(String::as_str).unwrap_or("");
    if summary_id != record.identifier || detail_id != record.identifier {
        return Err(ValidationError::IdentifierMismatch {
            summary: summary_id.to_string(),
            detail: detail_id.to_string(),
        });
    }

    if record.summary(NAME_KEY).is_none() {
        return Err(ValidationError::MissingField(NAME_KEY.to_string()));
    }

    if let Some(code) = record.summary(INSURANCE_CODE_KEY) {
        if !is_identifier(code.trim()) {
            return Err(ValidationError::InvalidInsuranceCode(code.to_string()));
        }
    }

    if let Some(raw) = record.summary(IMAGE_URL_KEY) {
        check_image_url(raw)?;
    }

    for (key, markup) in &record.detail_fields_markup {
        let trimmed = markup.trim();
        if !trimmed.is_empty() && !trimmed.starts_with('<') {
            return Err(ValidationError::InvalidMarkup(key.clone()));
        }
    }

    Ok(())
}

fn check_image_url(raw: &str) -> Result<(), ValidationError> {
    let url = raw.trim();
    if IMAGE_URL_SCHEMES.iter().any(|scheme| url.starts_with(scheme)) {
        return Ok(());
    }
    Err(ValidationError::InvalidUrl {
        url: raw.to_string(),
        reason: "does not start with http:// or https://".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record() -> ExtractedRecord {
        let mut r = ExtractedRecord::new("123456789");
        r.summary_fields.insert(NAME_KEY.into(), "타이레놀정".into());
        r
    }

    #[test]
    fn identifier_shape() {
        assert!(is_identifier("000000001"));
        assert!(!is_identifier("12345678"));
        assert!(!is_identifier("1234567890"));
        assert!(!is_identifier("１２３４５６７８９"));
        assert!(!is_identifier(""));
    }

    #[test]
    fn minimal_record_passes() {
        assert_eq!(validate(&record()), Ok(()));
    }

    #[test]
    fn empty_record_is_rejected() {
        assert_eq!(validate(&ExtractedRecord::new("")), Err(ValidationError::Empty));
    }

    #[test]
    fn missing_name_is_rejected() {
        let r = ExtractedRecord::new("123456789");
        assert_eq!(validate(&r), Err(ValidationError::MissingField(NAME_KEY.into())));
    }

    #[test]
    fn blank_name_counts_as_missing() {
        let mut r = record();
        r.summary_fields.insert(NAME_KEY.into(), "   ".into());
        assert!(matches!(validate(&r), Err(ValidationError::MissingField(_))));
    }

    #[test]
    fn bad_identifier_is_rejected() {
        let mut r = record();
        r.identifier = "abc".into();
        assert!(matches!(validate(&r), Err(ValidationError::InvalidIdentifier(_))));
    }

    #[test]
    fn mismatched_identifiers_are_rejected() {
        let mut r = record();
        r.detail_fields.insert(IDENTIFIER_KEY.into(), "987654321".into());
        assert!(matches!(validate(&r), Err(ValidationError::IdentifierMismatch { .. })));
    }

    #[test]
    fn insurance_code_must_be_nine_digits() {
        let mut r = record();
        r.summary_fields.insert(INSURANCE_CODE_KEY.into(), "645102060".into());
        assert_eq!(validate(&r), Ok(()));
        r.summary_fields.insert(INSURANCE_CODE_KEY.into(), "6451-0206".into());
        assert!(matches!(validate(&r), Err(ValidationError::InvalidInsuranceCode(_))));
    }

    #[test]
    fn image_url_must_be_absolute_http() {
        let mut r = record();
        r.summary_fields.insert(IMAGE_URL_KEY.into(), "https://img.example.com/a.jpg".into());
        assert_eq!(validate(&r), Ok(()));
        r.summary_fields.insert(IMAGE_URL_KEY.into(), "/relative.jpg".into());
        assert!(matches!(validate(&r), Err(ValidationError::InvalidUrl { .. })));
        r.summary_fields.insert(IMAGE_URL_KEY.into(), "javascript:alert(1)".into());
        assert!(matches!(validate(&r), Err(ValidationError::InvalidUrl { .. })));
        r.summary_fields.insert(IMAGE_URL_KEY.into(), "ftp://img.example.com/a.jpg".into());
        assert!(matches!(validate(&r), Err(ValidationError::InvalidUrl { .. })));
    }

    #[test]
    fn image_url_scheme_prefix_is_enough() {
        // Only the scheme prefix is checked; the host is not parsed.
        let mut r = record();
        r.summary_fields.insert(IMAGE_URL_KEY.into(), "http://".into());
        assert_eq!(validate(&r), Ok(()));
        r.summary_fields.insert(IMAGE_URL_KEY.into(), "https://img host/a b.jpg".into());
        assert_eq!(validate(&r), Ok(()));
    }

    #[test]
    fn markup_must_start_with_a_tag() {
        let mut r = record();
        r.detail_fields_markup.insert("dosage".into(), "<p>1회</p>".into());
        assert_eq!(validate(&r), Ok(()));
        r.detail_fields_markup.insert("dosage".into(), "plain text".into());
        assert_eq!(validate(&r), Err(ValidationError::InvalidMarkup("dosage".into())));
    }
}
