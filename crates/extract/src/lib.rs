// ABOUTME: Main library entry point for the medicollect extraction core.
// ABOUTME: Re-exports the public API: Extractor, FieldSchema, ExtractedRecord, Status, Thresholds, validate.

//! medicollect-extract - field extraction for drug-encyclopedia detail pages.
//!
//! This crate turns an already-fetched detail page into a structured
//! [`ExtractedRecord`]: a set of summary attributes, a set of long-form
//! attributes (plain text plus sanitized markup), and a graded
//! success/partial/failed [`Status`].
//!
//! Nothing here performs I/O. Fetching pages, persisting records and
//! bookkeeping of processed identifiers belong to the caller.
//!
//! # Example
//!
//! ```no_run
//! use medicollect_extract::{validate, Extractor};
//!
//! # fn main() -> Result<(), medicollect_extract::ConfigError> {
//! let extractor = Extractor::builder().build()?;
//! let html = std::fs::read_to_string("page.html").unwrap_or_default();
//! if let Some(record) = extractor.extract_html(&html, "123456789") {
//!     println!("{} -> {}", record.identifier, record.status);
//!     if let Err(reason) = validate(&record) {
//!         eprintln!("not persistable: {reason}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod classify;
pub mod error;
pub mod extractor;
pub mod keywords;
pub mod loader;
pub mod normalize;
pub mod options;
pub mod preserve;
pub mod preview;
pub mod processors;
pub mod record;
pub mod schema;
pub mod select;
pub mod stats;
pub mod validate;

pub use crate::classify::{classify, classify_counts, completion_percentage, missing_fields, FieldCounts};
pub use crate::error::{ConfigError, ErrorCode};
pub use crate::extractor::Extractor;
pub use crate::keywords::mine_keywords;
pub use crate::loader::load_builtin_schema;
pub use crate::normalize::NormalizedRecord;
pub use crate::options::{ExtractorBuilder, Thresholds};
pub use crate::preserve::SanitizationPolicy;
pub use crate::preview::{detail_url, find_identifier, parse_search_response, Preview, SearchItem};
pub use crate::processors::PostProcessor;
pub use crate::record::{ExtractedRecord, Status, IDENTIFIER_KEY, NAME_KEY};
pub use crate::schema::{FieldDefinition, FieldGroup, FieldSchema, FieldSpec, Locator};
pub use crate::stats::ExtractionStats;
pub use crate::validate::{is_identifier, validate, ValidationError};
