// ABOUTME: ExtractedRecord holding one page's summary fields, detail fields and sanitized markup.
// ABOUTME: Status is the tri-state completeness verdict assigned once after extraction.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Key under which the identifier is stored in both field maps.
pub const IDENTIFIER_KEY: &str = "medicine_id";

/// Key of the core name field that every usable record must carry.
pub const NAME_KEY: &str = "name_ko";

/// Completeness verdict for an extracted record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Success,
    Partial,
    Failed,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Success => "success",
            Status::Partial => "partial",
            Status::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// The structured result of extracting one detail page.
///
/// Empty values are never stored: a key is either present with a non-empty
/// value or absent. Both `summary_fields` and `detail_fields` carry the
/// identifier under [`IDENTIFIER_KEY`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedRecord {
    pub identifier: String,
    pub summary_fields: BTreeMap<String, String>,
    pub detail_fields: BTreeMap<String, String>,
    pub detail_fields_markup: BTreeMap<String, String>,
    pub status: Status,
}

impl ExtractedRecord {
    /// Creates a record with only the identifier filled in and a `Failed` status.
    pub fn new(identifier: impl Into<String>) -> Self {
        let identifier = identifier.into();
        let mut summary_fields = BTreeMap::new();
        let mut detail_fields = BTreeMap::new();
        if !identifier.is_empty() {
            summary_fields.insert(IDENTIFIER_KEY.to_string(), identifier.clone());
            detail_fields.insert(IDENTIFIER_KEY.to_string(), identifier.clone());
        }
        Self {
            identifier,
            summary_fields,
            detail_fields,
            detail_fields_markup: BTreeMap::new(),
            status: Status::Failed,
        }
    }

    /// Returns a non-empty summary value.
    pub fn summary(&self, key: &str) -> Option<&str> {
        non_empty(self.summary_fields.get(key))
    }

    /// Returns a non-empty detail text value.
    pub fn detail(&self, key: &str) -> Option<&str> {
        non_empty(self.detail_fields.get(key))
    }

    /// Returns a non-empty sanitized markup value.
    pub fn markup(&self, key: &str) -> Option<&str> {
        non_empty(self.detail_fields_markup.get(key))
    }

    /// Count of non-empty summary fields, identifier excluded.
    pub fn summary_count(&self) -> usize {
        count_filled(&self.summary_fields)
    }

    /// Count of non-empty detail text fields, identifier excluded.
    pub fn detail_count(&self) -> usize {
        count_filled(&self.detail_fields)
    }

    /// Count of all filled fields; markup variants are not counted.
    pub fn filled_count(&self) -> usize {
        self.summary_count() + self.detail_count()
    }

    /// Returns true if the record carries no identifier and no fields at all.
    pub fn is_empty(&self) -> bool {
        self.identifier.is_empty()
            && self.summary_count() == 0
            && self.detail_count() == 0
            && self.detail_fields_markup.is_empty()
    }
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|v| !v.trim().is_empty())
}

fn count_filled(fields: &BTreeMap<String, String>) -> usize {
    fields
        .iter()
        .filter(|(key, value)| key.as_str() != IDENTIFIER_KEY && !value.trim().is_empty())
        .count()
}
