// ABOUTME: The Extractor that walks a parsed detail page with the field schema and builds an ExtractedRecord.
// ABOUTME: Provides extract() for a parsed document and extract_html() for raw markup.

use std::collections::HashMap;

use scraper::{ElementRef, Html};
use tracing::instrument;

use crate::classify::classify;
use crate::options::{ExtractorBuilder, Thresholds};
use crate::preserve::{extract_range_from, preserve, SanitizationPolicy};
use crate::processors::PostProcessor;
use crate::record::ExtractedRecord;
use crate::schema::{FieldGroup, FieldSchema, FieldSpec, Locator};
use crate::select::{
    extract_first_attribute, extract_text, find_section, is_section_heading, next_element_sibling,
    profile_table, select_one,
};
use crate::validate::is_identifier;

/// Extracts structured records from detail pages.
///
/// An `Extractor` owns its schema, sanitization policy and thresholds. It
/// holds no per-page state, so one instance can be shared across threads and
/// reused for every page.
#[derive(Debug, Clone)]
pub struct Extractor {
    schema: FieldSchema,
    policy: SanitizationPolicy,
    thresholds: Thresholds,
}

impl Extractor {
    /// Creates an extractor from already validated parts.
    ///
    /// Prefer [`Extractor::builder`], which validates thresholds against the schema.
    pub fn new(schema: FieldSchema, policy: SanitizationPolicy, thresholds: Thresholds) -> Self {
        Self {
            schema,
            policy,
            thresholds,
        }
    }

    pub fn builder() -> ExtractorBuilder {
        ExtractorBuilder::new()
    }

    pub fn schema(&self) -> &FieldSchema {
        &self.schema
    }

    pub fn policy(&self) -> &SanitizationPolicy {
        &self.policy
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Parses `html` and extracts it.
    pub fn extract_html(&self, html: &str, identifier: &str) -> Option<ExtractedRecord> {
        let doc = Html::parse_document(html);
        self.extract(&doc, identifier)
    }

    /// Extracts every schema field from `doc` and classifies the result.
    ///
    /// Returns `None` when `identifier` is not a nine-digit identifier; no
    /// record is materialized in that case. Missing fields never abort
    /// extraction, they are simply absent from the record.
    #[instrument(skip(self, doc), fields(identifier = %identifier))]
    pub fn extract(&self, doc: &Html, identifier: &str) -> Option<ExtractedRecord> {
        if !is_identifier(identifier) {
            tracing::warn!("refusing to extract page with malformed identifier");
            return None;
        }

        let mut record = ExtractedRecord::new(identifier);
        let profile = self.profile_rows(doc);

        for field in self.schema.fields() {
            let node = self.locate(doc, field, &profile);
            let mut value = read_value(field, node);

            // The profile table backs up summary fields whose own locator missed.
            if value.is_empty() && field.group == FieldGroup::Summary {
                if let Some(cell) = profile.get(field.key.as_str()) {
                    value = apply(field.post_processor, &extract_text(Some(*cell)));
                }
            }

            if value.is_empty() {
                tracing::debug!(field = %field.key, "field not found");
                continue;
            }

            match field.group {
                FieldGroup::Summary => {
                    record.summary_fields.insert(field.key.clone(), value);
                }
                FieldGroup::Detail => {
                    let markup = node.map(|n| self.markup_for(field, n)).unwrap_or_default();
                    record.detail_fields.insert(field.key.clone(), value);
                    if !markup.is_empty() {
                        record.detail_fields_markup.insert(field.key.clone(), markup);
                    }
                }
            }
        }

        record.status = classify(&record, &self.thresholds, &self.schema);
        tracing::info!(
            status = %record.status,
            summary = record.summary_count(),
            detail = record.detail_count(),
            "extracted record"
        );
        Some(record)
    }

    /// Maps field keys to the value cells of the profile table.
    ///
    /// A later row with the same label replaces an earlier one.
    fn profile_rows<'a>(&self, doc: &'a Html) -> HashMap<&str, ElementRef<'a>> {
        let mut rows = HashMap::new();
        for (label, cell) in profile_table(doc) {
            match self.schema.field_for_label(&label) {
                Some(field) => {
                    rows.insert(field.key.as_str(), cell);
                }
                None => tracing::trace!(label = %label, "unmapped profile row"),
            }
        }
        rows
    }

    fn locate<'a>(
        &self,
        doc: &'a Html,
        field: &FieldSpec,
        profile: &HashMap<&str, ElementRef<'a>>,
    ) -> Option<ElementRef<'a>> {
        if field.selector.is_none() && !matches!(field.locator, Locator::ProfileRow) {
            tracing::warn!(field = %field.key, "malformed selector; field read as absent");
        }
        match &field.locator {
            Locator::Css { .. } => select_one(doc, field.selector.as_ref()?),
            Locator::ProfileRow => profile.get(field.key.as_str()).copied(),
            Locator::Section { .. } => {
                let heading = field.selector.as_ref().and_then(|sel| select_one(doc, sel));
                match heading {
                    Some(heading) => next_element_sibling(heading).filter(|el| !is_section_heading(*el)),
                    // Anchors are renumbered between page revisions; the heading text is stable.
                    None => find_section(doc, &field.label),
                }
            }
        }
    }

    fn markup_for(&self, field: &FieldSpec, node: ElementRef<'_>) -> String {
        match field.locator {
            Locator::Section { .. } => extract_range_from(node, &self.policy, is_section_heading),
            _ => preserve(node, &self.policy),
        }
    }
}

fn read_value(field: &FieldSpec, node: Option<ElementRef<'_>>) -> String {
    let raw = if field.reads_attribute() {
        extract_first_attribute(node, &field.attributes)
    } else {
        extract_text(node)
    };
    apply(field.post_processor, &raw)
}

fn apply(processor: Option<PostProcessor>, raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }
    match processor {
        Some(p) => p.apply(raw),
        None => raw.to_string(),
    }
}
