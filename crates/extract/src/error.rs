// ABOUTME: Error types for the extraction core including ErrorCode enum and ConfigError struct.
// ABOUTME: Only startup-time configuration problems are errors; per-document misses never are.

use std::fmt;

/// Error codes representing the configuration area that was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Schema,
    Thresholds,
    Policy,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::Schema => "invalid field schema",
            ErrorCode::Thresholds => "invalid thresholds",
            ErrorCode::Policy => "invalid sanitization policy",
        };
        write!(f, "{}", s)
    }
}

/// Error raised while loading or assembling extraction configuration.
///
/// Extraction itself never fails with this type: a missing field degrades
/// to an absent value and a malformed page degrades to a `Failed` status.
#[derive(Debug, thiserror::Error)]
pub struct ConfigError {
    pub code: ErrorCode,
    pub op: String,
    #[source]
    pub source: Option<anyhow::Error>,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "medicollect: {}: {}", self.op, self.code)?;
        if let Some(ref src) = self.source {
            write!(f, ": {}", src)?;
        }
        Ok(())
    }
}

impl ConfigError {
    /// Create a Schema error.
    pub fn schema(op: impl Into<String>, source: Option<anyhow::Error>) -> Self {
        Self {
            code: ErrorCode::Schema,
            op: op.into(),
            source,
        }
    }

    /// Create a Thresholds error.
    pub fn thresholds(op: impl Into<String>, source: Option<anyhow::Error>) -> Self {
        Self {
            code: ErrorCode::Thresholds,
            op: op.into(),
            source,
        }
    }

    /// Create a Policy error.
    pub fn policy(op: impl Into<String>, source: Option<anyhow::Error>) -> Self {
        Self {
            code: ErrorCode::Policy,
            op: op.into(),
            source,
        }
    }

    /// Returns true if this is a Schema error.
    pub fn is_schema(&self) -> bool {
        self.code == ErrorCode::Schema
    }

    /// Returns true if this is a Thresholds error.
    pub fn is_thresholds(&self) -> bool {
        self.code == ErrorCode::Thresholds
    }

    /// Returns true if this is a Policy error.
    pub fn is_policy(&self) -> bool {
        self.code == ErrorCode::Policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_op_code_and_source() {
        let err = ConfigError::schema("load schema", Some(anyhow::anyhow!("duplicate key: name_ko")));
        assert_eq!(
            err.to_string(),
            "medicollect: load schema: invalid field schema: duplicate key: name_ko"
        );
        assert!(err.is_schema());
        assert!(!err.is_thresholds());
    }

    #[test]
    fn display_without_source() {
        let err = ConfigError::thresholds("validate thresholds", None);
        assert_eq!(err.to_string(), "medicollect: validate thresholds: invalid thresholds");
        assert!(err.is_thresholds());
    }
}
