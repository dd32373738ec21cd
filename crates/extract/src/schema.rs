// ABOUTME: Field schema data models: FieldGroup, Locator, FieldDefinition, FieldSpec and FieldSchema.
// ABOUTME: Definitions are deserialized once at startup and validated into an immutable, ordered schema.

//! Declarative field schema.
//!
//! A [`FieldSchema`] is an ordered list of [`FieldSpec`]s. Each spec says
//! where a field lives on the detail page ([`Locator`]), whether its value is
//! read from text or from an attribute priority list, and which
//! [`PostProcessor`] cleans it up. The schema is read-only after loading and
//! is shared by every extraction.

use std::collections::HashMap;
use std::fmt;

use scraper::Selector;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::processors::PostProcessor;
use crate::select::parse_selector;

/// Selector of the generic label/value table on the detail page.
pub const PROFILE_TABLE_SELECTOR: &str = "table.tmp_profile_tb";

/// Selector of the headings that open each long-form section.
pub const SECTION_HEADING_SELECTOR: &str = "h3.stress";

/// Which record a field's value lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldGroup {
    /// Compact single-value attributes.
    Summary,
    /// Long-form sections; also captured as sanitized markup.
    Detail,
}

impl fmt::Display for FieldGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FieldGroup::Summary => "summary",
            FieldGroup::Detail => "detail",
        };
        write!(f, "{}", s)
    }
}

/// Specifies where a field is found on the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Locator {
    /// A CSS selector resolved directly against the document.
    Css { selector: String },
    /// The profile-table row whose header cell equals the field label.
    ProfileRow,
    /// The element right after the section heading carrying this id.
    Section { anchor: String },
}

impl Locator {
    /// CSS selector of the section heading for a `Section` locator.
    pub fn heading_selector(&self) -> Option<String> {
        match self {
            Locator::Section { anchor } => {
                Some(format!("{}[id=\"{}\"]", SECTION_HEADING_SELECTOR, anchor))
            }
            _ => None,
        }
    }
}

/// Serialized form of a field, as stored in the schema JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub key: String,
    pub label: String,
    pub group: FieldGroup,
    pub locator: Locator,
    /// Attribute names tried in order; empty means text extraction.
    #[serde(default)]
    pub attributes: Vec<String>,
    /// Registered post-processor name.
    #[serde(default)]
    pub post_processor: Option<String>,
}

/// A validated, immutable field entry.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub key: String,
    pub label: String,
    pub group: FieldGroup,
    pub locator: Locator,
    pub attributes: Vec<String>,
    pub post_processor: Option<PostProcessor>,
    /// Compiled form of a `Css` selector or a `Section` heading selector.
    /// `None` for profile rows and for selectors that failed to compile.
    pub selector: Option<Selector>,
}

impl FieldSpec {
    /// Returns true if the value is read from an attribute rather than text.
    pub fn reads_attribute(&self) -> bool {
        !self.attributes.is_empty()
    }
}

/// Ordered, read-only collection of field specs.
#[derive(Debug, Clone)]
pub struct FieldSchema {
    fields: Vec<FieldSpec>,
    by_key: HashMap<String, usize>,
    by_label: HashMap<String, usize>,
}

impl FieldSchema {
    /// Validates definitions into a schema.
    ///
    /// Duplicate keys, an empty definition list, and empty selectors or
    /// anchors are rejected. Selectors are compiled here; a malformed one is
    /// reported and its field reads as absent. An unknown post-processor name
    /// is reported once and the field keeps its raw value at extraction time.
    pub fn from_definitions(definitions: Vec<FieldDefinition>) -> Result<Self, ConfigError> {
        if definitions.is_empty() {
            return Err(ConfigError::schema(
                "load schema",
                Some(anyhow::anyhow!("schema has no fields")),
            ));
        }

        let mut fields = Vec::with_capacity(definitions.len());
        let mut by_key = HashMap::new();
        let mut by_label = HashMap::new();

        for (idx, def) in definitions.into_iter().enumerate() {
            let key = def.key.trim().to_string();
            if key.is_empty() {
                return Err(ConfigError::schema(
                    "load schema",
                    Some(anyhow::anyhow!("field #{} has an empty key", idx)),
                ));
            }
            if by_key.insert(key.clone(), idx).is_some() {
                return Err(ConfigError::schema(
                    "load schema",
                    Some(anyhow::anyhow!("duplicate key: {}", key)),
                ));
            }
            match &def.locator {
                Locator::Css { selector } if selector.trim().is_empty() => {
                    return Err(ConfigError::schema(
                        "load schema",
                        Some(anyhow::anyhow!("field {} has an empty selector", key)),
                    ));
                }
                Locator::Section { anchor } if anchor.trim().is_empty() => {
                    return Err(ConfigError::schema(
                        "load schema",
                        Some(anyhow::anyhow!("field {} has an empty section anchor", key)),
                    ));
                }
                _ => {}
            }

            let post_processor = def.post_processor.as_deref().and_then(|name| {
                let found = PostProcessor::from_name(name);
                if found.is_none() {
                    tracing::warn!(field = %key, processor = %name, "unregistered post-processor; values pass through unmodified");
                }
                found
            });

            let selector = match &def.locator {
                Locator::Css { selector } => parse_selector(selector),
                Locator::Section { .. } => def
                    .locator
                    .heading_selector()
                    .and_then(|css| parse_selector(&css)),
                Locator::ProfileRow => None,
            };

            // First declared label wins the reverse lookup.
            by_label.entry(def.label.trim().to_string()).or_insert(idx);

            fields.push(FieldSpec {
                key,
                label: def.label.trim().to_string(),
                group: def.group,
                locator: def.locator,
                attributes: def.attributes,
                post_processor,
                selector,
            });
        }

        Ok(Self {
            fields,
            by_key,
            by_label,
        })
    }

    /// Parses a JSON array of [`FieldDefinition`]s into a schema.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let definitions: Vec<FieldDefinition> = serde_json::from_str(json)
            .map_err(|e| ConfigError::schema("parse schema", Some(e.into())))?;
        Self::from_definitions(definitions)
    }

    /// All fields in declaration order.
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Fields of one group in declaration order.
    pub fn group(&self, group: FieldGroup) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(move |f| f.group == group)
    }

    /// Looks up a field by key.
    pub fn get(&self, key: &str) -> Option<&FieldSpec> {
        self.by_key.get(key).map(|&idx| &self.fields[idx])
    }

    /// Reverse-maps a header text to the first field declared with that label.
    pub fn field_for_label(&self, label: &str) -> Option<&FieldSpec> {
        self.by_label.get(label.trim()).map(|&idx| &self.fields[idx])
    }

    /// Returns the label of a field, or the key itself when unknown.
    pub fn label_for<'a>(&'a self, key: &'a str) -> &'a str {
        self.get(key).map(|f| f.label.as_str()).unwrap_or(key)
    }

    /// Total number of fields across both groups.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the schema has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
