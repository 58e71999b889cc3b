//! Shared validation errors.
//!
//! Validation failures are rejected before any side effect; these errors
//! map to client-error responses at the API boundary.

use thiserror::Error;

/// An input failed validation before any state was touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required text field was empty or whitespace.
    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    /// A string could not be parsed as a UUID identifier.
    #[error("invalid {field}: {reason}")]
    InvalidId {
        /// The field that failed to parse.
        field: &'static str,
        /// Parser diagnostic.
        reason: String,
    },

    /// A fee rate exceeded 100%.
    #[error("invalid fee rate: {0} basis points exceeds 10000")]
    InvalidBasisPoints(u16),

    /// An enum-valued field carried an unknown string.
    #[error("unknown {field}: '{value}'")]
    UnknownVariant {
        /// The field carrying the unknown value.
        field: &'static str,
        /// The offending value.
        value: String,
    },

    /// A numeric field violated its allowed range.
    #[error("invalid {field}: {reason}")]
    OutOfRange {
        /// The field out of range.
        field: &'static str,
        /// What was violated.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(
            ValidationError::EmptyField("game").to_string(),
            "game must not be empty"
        );
        assert!(ValidationError::InvalidBasisPoints(10_001)
            .to_string()
            .contains("10001"));
        assert!(ValidationError::UnknownVariant {
            field: "evidence_kind",
            value: "hologram".into()
        }
        .to_string()
        .contains("hologram"));
    }
}
