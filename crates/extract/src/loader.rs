// ABOUTME: Loader for the builtin field schema from embedded JSON data.
// ABOUTME: Provides load_builtin_schema() to initialize the default FieldSchema.

//! Builtin schema loader.

use crate::error::ConfigError;
use crate::schema::FieldSchema;

/// Embedded JSON containing the detail-page field definitions.
const BUILTIN_SCHEMA_JSON: &str = include_str!("../data/field_schema.json");

/// Loads the builtin field schema from embedded JSON.
pub fn load_builtin_schema() -> Result<FieldSchema, ConfigError> {
    FieldSchema::from_json(BUILTIN_SCHEMA_JSON)
}
