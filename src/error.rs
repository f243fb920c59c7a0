// In: src/error.rs

//! This module defines the single, unified error type for the entire tuplegroup library.
//! It uses the `thiserror` crate to provide ergonomic, context-aware error handling.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TupleError {
    // =========================================================================
    // === Configuration Errors (raised at setup, before any tuple is seen)
    // =========================================================================
    #[error("Invalid sort criteria format: {0}")]
    InvalidSortCriteria(String),

    #[error("Invalid sort criteria: repeated field '{0}'")]
    DuplicateSortField(String),

    #[error("Comparator not found: '{0}'")]
    ComparatorNotFound(String),

    #[error("Comparator '{comparator}' cannot be used on field '{field}': {reason}")]
    UnsupportedComparator {
        comparator: String,
        field: String,
        reason: String,
    },

    #[error("Invalid group-by configuration: {0}")]
    InvalidGroupBy(String),

    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // =========================================================================
    // === Per-Record Errors
    // =========================================================================
    /// A byte buffer was truncated or malformed while decoding a field.
    #[error("Tuple decoding error: {0}")]
    Decode(String),

    /// A tuple could not be written in the binary layout.
    #[error("Tuple encoding error: {0}")]
    Encode(String),

    #[error("Invalid field: {0}")]
    InvalidField(String),

    #[error("Type mismatch for field '{field}': expected {expected}, got {found}")]
    TypeMismatch {
        field: String,
        expected: String,
        found: String,
    },

    /// An error returned by a caller-supplied `GroupHandler`.
    #[error("Group handler failed: {0}")]
    Handler(String),

    // =========================================================================
    // === External Error Wrappers (Using #[from] for automatic conversion)
    // =========================================================================
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An error from the Serde JSON library, typically while loading a job config.
    #[error("Serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("Internal logic error (this is a bug): {0}")]
    InternalError(String),
}

impl TupleError {
    /// Returns `true` for errors that describe a bad sort/group setup rather
    /// than a bad record. These are never retried.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            TupleError::InvalidSortCriteria(_)
                | TupleError::DuplicateSortField(_)
                | TupleError::ComparatorNotFound(_)
                | TupleError::UnsupportedComparator { .. }
                | TupleError::InvalidGroupBy(_)
                | TupleError::InvalidSchema(_)
                | TupleError::InvalidConfig(_)
        )
    }

    /// Returns `true` when a serialized buffer could not be decoded.
    pub fn is_decode_error(&self) -> bool {
        matches!(self, TupleError::Decode(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_taxonomy_classification() {
        assert!(TupleError::InvalidSortCriteria("x".into()).is_configuration_error());
        assert!(TupleError::DuplicateSortField("a".into()).is_configuration_error());
        assert!(TupleError::ComparatorNotFound("nope".into()).is_configuration_error());
        assert!(TupleError::InvalidGroupBy("x".into()).is_configuration_error());

        assert!(!TupleError::Decode("eof".into()).is_configuration_error());
        assert!(TupleError::Decode("eof".into()).is_decode_error());
        assert!(!TupleError::InvalidField("a".into()).is_configuration_error());
    }

    #[test]
    fn test_error_messages_carry_context() {
        let err = TupleError::TypeMismatch {
            field: "age".into(),
            expected: "VarInt32".into(),
            found: "String".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("age"));
        assert!(msg.contains("VarInt32"));
    }
}
