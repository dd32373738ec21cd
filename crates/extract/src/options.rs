// ABOUTME: Configuration for extraction: completeness Thresholds and the ExtractorBuilder.
// ABOUTME: ExtractorBuilder assembles schema, sanitization policy and thresholds into an Extractor.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::extractor::Extractor;
use crate::loader::load_builtin_schema;
use crate::preserve::SanitizationPolicy;
use crate::schema::FieldSchema;

/// Process-wide completeness thresholds.
///
/// Ratios are fractions of the total number of fields in the schema, both
/// groups combined.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Minimum non-empty summary fields, identifier excluded.
    pub min_summary: usize,
    /// Minimum non-empty detail fields, identifier excluded.
    pub min_detail: usize,
    pub success_ratio: f64,
    pub partial_ratio: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_summary: 5,
            min_detail: 1,
            success_ratio: 0.8,
            partial_ratio: 0.5,
        }
    }
}

impl Thresholds {
    /// Parses thresholds from JSON; missing keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::thresholds("parse thresholds", Some(e.into())))
    }

    /// Checks `success_ratio > partial_ratio > 0` and that both minimums fit the schema.
    pub fn validate(&self, schema: &FieldSchema) -> Result<(), ConfigError> {
        let op = "validate thresholds";
        if !self.partial_ratio.is_finite() || self.partial_ratio <= 0.0 {
            return Err(ConfigError::thresholds(
                op,
                Some(anyhow::anyhow!("partial_ratio must be positive, got {}", self.partial_ratio)),
            ));
        }
        if !self.success_ratio.is_finite() || self.success_ratio <= self.partial_ratio {
            return Err(ConfigError::thresholds(
                op,
                Some(anyhow::anyhow!(
                    "success_ratio ({}) must exceed partial_ratio ({})",
                    self.success_ratio,
                    self.partial_ratio
                )),
            ));
        }
        if self.min_summary > schema.len() || self.min_detail > schema.len() {
            return Err(ConfigError::thresholds(
                op,
                Some(anyhow::anyhow!(
                    "minimum field counts ({}, {}) exceed schema size {}",
                    self.min_summary,
                    self.min_detail,
                    schema.len()
                )),
            ));
        }
        Ok(())
    }
}

/// Builder for constructing Extractor instances with custom configuration.
#[derive(Debug, Clone, Default)]
pub struct ExtractorBuilder {
    schema: Option<FieldSchema>,
    policy: SanitizationPolicy,
    thresholds: Thresholds,
}

impl ExtractorBuilder {
    /// Create a new ExtractorBuilder using the builtin schema and default policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom field schema.
    pub fn schema(mut self, schema: FieldSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Use a custom sanitization policy.
    pub fn policy(mut self, policy: SanitizationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the completeness thresholds.
    pub fn thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Build the Extractor, validating the policy and the thresholds against the schema.
    pub fn build(self) -> Result<Extractor, ConfigError> {
        let schema = match self.schema {
            Some(schema) => schema,
            None => load_builtin_schema()?,
        };
        self.policy.validate()?;
        self.thresholds.validate(&schema)?;
        Ok(Extractor::new(schema, self.policy, self.thresholds))
    }
}
