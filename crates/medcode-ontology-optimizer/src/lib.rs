//! # medcode-ontology-optimizer
//!
//! Performance optimizations for the `medcode-ontology` crate.
//!
//! This crate provides optional, feature-gated accelerators for query-heavy
//! workloads on top of an immutable [`OntologyGraph`](medcode_ontology::OntologyGraph).
//!
//! ## Features
//!
//! Each optimization is independently feature-gated:
//!
//! - **`closure`**: Precomputed transitive closure for O(1) ancestor/descendant lookups
//! - **`bitset`**: Roaring bitmap-based code sets for compact used-code tracking
//! - **`query-service`**: Shared query service with an LRU closure cache
//! - **`parallel`**: Build the closure on the rayon thread pool
//! - **`full`**: Enable `closure`, `bitset` and `query-service`
//!
//! ## Quick Start
//!
//! ### Using TransitiveClosure (feature: `closure`)
//!
//! ```ignore
//! use medcode_ontology_optimizer::closure::TransitiveClosure;
//!
//! // Build closure from the graph (one-time operation)
//! let closure = TransitiveClosure::build(&graph);
//!
//! let e11 = graph.handle_of("ICD10CM/E11")?;
//! let e119 = graph.handle_of("ICD10CM/E11.9")?;
//! assert!(closure.is_ancestor_of(e11, e119));
//! ```
//!
//! ### Using CodeBitSet (feature: `bitset`)
//!
//! ```ignore
//! use medcode_ontology_optimizer::bitset::CodeBitSet;
//!
//! // Accumulate the codes seen while scanning a dataset
//! let mut used = CodeBitSet::new(graph.clone());
//! for code in patient_codes {
//!     used.insert(code);
//! }
//!
//! let pruned = graph.prune(used.identifiers()).graph;
//! ```
//!
//! ### Using OntologyQueryService (feature: `query-service`)
//!
//! ```ignore
//! use medcode_ontology_optimizer::service::OntologyQueryService;
//!
//! let service = OntologyQueryService::new(graph.clone());
//!
//! if service.is_a("ICD10CM/E11.9", "ICD10CM/E08-E13")? {
//!     // Code is a kind of diabetes mellitus
//! }
//! ```

pub mod error;

// Feature-gated modules
#[cfg(feature = "closure")]
pub mod closure;

#[cfg(feature = "bitset")]
pub mod bitset;

#[cfg(feature = "query-service")]
pub mod service;

// Re-export commonly used types
pub use error::{OptimizerError, OptimizerResult};

#[cfg(feature = "closure")]
pub use closure::{ClosureStats, TransitiveClosure};

#[cfg(feature = "bitset")]
pub use bitset::CodeBitSet;

#[cfg(feature = "query-service")]
pub use service::{OntologyQueryService, QueryServiceConfig};

// Re-export from medcode-ontology for convenience
pub use medcode_ontology::{CodeHandle, SharedOntology};
