//! Error types for ontology construction, queries and persistence.

use std::path::PathBuf;

use thiserror::Error;

use crate::handle::CodeHandle;

/// Errors that can occur while building, querying or loading an ontology.
#[derive(Error, Debug)]
pub enum OntologyError {
    /// Identifier is not registered.
    #[error("Unknown code: {0}")]
    UnknownCode(String),

    /// Handle is outside the registered range.
    #[error("Invalid code handle: {0}")]
    InvalidHandle(CodeHandle),

    /// Edge whose parent and child are the same code.
    #[error("Self-loop on code {code}")]
    SelfLoop {
        /// The offending code. A bare [`EdgeStore`](crate::EdgeStore) only
        /// knows handles and reports `#<handle>`; the builder reports the
        /// identifier.
        code: String,
    },

    /// Two different descriptions registered for one identifier.
    #[error("Conflicting descriptions for {code}: {existing:?} vs {incoming:?}")]
    DuplicateConflict {
        /// The identifier.
        code: String,
        /// Description already stored.
        existing: String,
        /// Description that was rejected.
        incoming: String,
    },

    /// A vocabulary record could not be ingested.
    #[error("Invalid vocabulary record {identifier}: {source}")]
    InvalidRecord {
        /// Identifier of the record being ingested.
        identifier: String,
        /// Underlying failure.
        #[source]
        source: Box<OntologyError>,
    },

    /// Persisted artifact failed structural validation.
    #[error("Corrupt ontology data: {message}")]
    CorruptData {
        /// What was wrong.
        message: String,
    },

    /// I/O error while reading or writing an artifact.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Encoding a snapshot or manifest failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl OntologyError {
    /// Creates a corrupt data error.
    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::CorruptData {
            message: message.into(),
        }
    }

    /// Creates an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Wraps an error with the identifier of the record that caused it.
    pub fn in_record(self, identifier: impl Into<String>) -> Self {
        Self::InvalidRecord {
            identifier: identifier.into(),
            source: Box::new(self),
        }
    }
}

/// Result type for ontology operations.
pub type OntologyResult<T> = std::result::Result<T, OntologyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_unknown_code() {
        let err = OntologyError::UnknownCode("NOT/REAL".to_string());
        assert_eq!(err.to_string(), "Unknown code: NOT/REAL");
    }

    #[test]
    fn test_error_display_invalid_handle() {
        let err = OntologyError::InvalidHandle(CodeHandle::new(42));
        assert_eq!(err.to_string(), "Invalid code handle: #42");
    }

    #[test]
    fn test_error_display_duplicate_conflict() {
        let err = OntologyError::DuplicateConflict {
            code: "ATC/A02B".to_string(),
            existing: "Drugs for peptic ulcer".to_string(),
            incoming: "Antacids".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Conflicting descriptions for ATC/A02B: \"Drugs for peptic ulcer\" vs \"Antacids\""
        );
    }

    #[test]
    fn test_in_record_keeps_source() {
        let err = OntologyError::SelfLoop {
            code: "ICD10CM/E11".to_string(),
        }
        .in_record("ICD10CM/E11");

        assert_eq!(
            err.to_string(),
            "Invalid vocabulary record ICD10CM/E11: Self-loop on code ICD10CM/E11"
        );
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_corrupt_helper() {
        let err = OntologyError::corrupt("bad magic");
        assert!(matches!(err, OntologyError::CorruptData { .. }));
        assert_eq!(err.to_string(), "Corrupt ontology data: bad magic");
    }
}
