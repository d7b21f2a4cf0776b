//! Error types for the optimizer crate.

use medcode_ontology::OntologyError;

/// Result type for optimizer operations.
pub type OptimizerResult<T> = Result<T, OptimizerError>;

/// Errors that can occur during optimizer operations.
#[derive(Debug, thiserror::Error)]
pub enum OptimizerError {
    /// Error from the underlying ontology.
    #[error("Ontology error: {0}")]
    Ontology(#[from] OntologyError),

    /// Code sets built over different graphs were combined.
    #[error("Graph mismatch: code sets belong to different ontology graphs")]
    GraphMismatch,

    /// A serialized code set could not be read.
    #[cfg(feature = "bitset")]
    #[error("Invalid code set: {0}")]
    InvalidCodeSet(String),
}
