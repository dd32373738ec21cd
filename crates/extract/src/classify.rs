// ABOUTME: Completeness classifier grading a record as success, partial or failed from field-fill counts.
// ABOUTME: Also reports missing field labels and the completion percentage of a record.

//! Completeness classification.
//!
//! Rules, in order:
//! 1. No identifier or no core name field: `Failed`.
//! 2. Enough summary fields, enough detail fields and at least
//!    `success_ratio` of the whole schema filled: `Success`.
//! 3. Enough summary fields and at least `partial_ratio` of the whole schema
//!    filled: `Partial`.
//! 4. Otherwise `Failed`.
//!
//! Ratios are taken over every field in the schema, summary and detail
//! together. With the default thresholds a record can clear the summary
//! minimum yet fall short of both ratios, which makes `Partial` hard to reach.

use tracing::instrument;

use crate::options::Thresholds;
use crate::record::{ExtractedRecord, Status, IDENTIFIER_KEY, NAME_KEY};
use crate::schema::{FieldGroup, FieldSchema};

/// The counts a classification is computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldCounts {
    pub has_identifier: bool,
    pub has_name: bool,
    pub summary: usize,
    pub detail: usize,
    pub total_expected: usize,
}

impl FieldCounts {
    /// Counts the filled fields of a record against a schema.
    pub fn of(record: &ExtractedRecord, schema: &FieldSchema) -> Self {
        Self {
            has_identifier: record.summary(IDENTIFIER_KEY).is_some(),
            has_name: record.summary(NAME_KEY).is_some(),
            summary: record.summary_count(),
            detail: record.detail_count(),
            total_expected: schema.len(),
        }
    }

    pub fn total(&self) -> usize {
        self.summary + self.detail
    }
}

/// Classifies precomputed counts.
pub fn classify_counts(counts: FieldCounts, thresholds: &Thresholds) -> Status {
    if !counts.has_identifier || !counts.has_name {
        return Status::Failed;
    }

    let total = counts.total() as f64;
    let expected = counts.total_expected as f64;
    let enough_summary = counts.summary >= thresholds.min_summary;

    if enough_summary
        && counts.detail >= thresholds.min_detail
        && total >= expected * thresholds.success_ratio
    {
        Status::Success
    } else if enough_summary && total >= expected * thresholds.partial_ratio {
        Status::Partial
    } else {
        Status::Failed
    }
}

/// Classifies a record against the thresholds and the schema it was extracted with.
#[instrument(level = "debug", skip_all, fields(identifier = %record.identifier))]
pub fn classify(record: &ExtractedRecord, thresholds: &Thresholds, schema: &FieldSchema) -> Status {
    let counts = FieldCounts::of(record, schema);
    let status = classify_counts(counts, thresholds);
    tracing::debug!(
        summary = counts.summary,
        detail = counts.detail,
        expected = counts.total_expected,
        %status,
        "classified record"
    );
    status
}

/// Labels of schema fields the record lacks, in declaration order.
pub fn missing_fields(record: &ExtractedRecord, schema: &FieldSchema) -> Vec<String> {
    schema
        .fields()
        .iter()
        .filter(|field| {
            let value = match field.group {
                FieldGroup::Summary => record.summary(&field.key),
                FieldGroup::Detail => record.detail(&field.key),
            };
            value.is_none()
        })
        .map(|field| field.label.clone())
        .collect()
}

/// Percentage of schema fields the record fills, rounded to two decimals.
pub fn completion_percentage(record: &ExtractedRecord, schema: &FieldSchema) -> f64 {
    if schema.is_empty() {
        return 0.0;
    }
    let filled = schema.len() - missing_fields(record, schema).len();
    let pct = filled as f64 / schema.len() as f64 * 100.0;
    (pct * 100.0).round() / 100.0
}
