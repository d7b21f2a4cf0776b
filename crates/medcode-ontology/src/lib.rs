//! # medcode-ontology
//!
//! In-memory hierarchy of medical codes (ICD, ATC, RxNorm, LOINC and
//! friends) with transitive closure queries, dataset-aware pruning and a
//! portable binary artifact.
//!
//! ## Key Features
//!
//! - **Dense handles** - Codes live in an arena indexed by [`CodeHandle`]
//! - **Dual-indexed edges** - O(degree) parent and child enumeration
//! - **Cycle tolerant** - Closure queries terminate on malformed input
//! - **Pruning** - Keep only the codes a dataset uses, plus their ancestors
//! - **Persistence** - Checksummed, deterministic save/load
//!
//! ## Quick Start
//!
//! ```rust
//! use medcode_ontology::{OntologyBuilder, VocabularyRecord};
//!
//! let mut builder = OntologyBuilder::new();
//! builder.add_records(vec![
//!     VocabularyRecord::new("ATC/A", Some("Alimentary tract and metabolism"), &[]),
//!     VocabularyRecord::new("ATC/A02", None, &["ATC/A"]),
//!     VocabularyRecord::new("ATC/A02B", None, &["ATC/A02"]),
//!     VocabularyRecord::new("ATC/A02BX71", None, &["ATC/A02B"]),
//!     VocabularyRecord::new("ATC/B", None, &[]),
//! ])?;
//! let graph = builder.build().into_shared();
//!
//! let ancestors = graph.all_parents("ATC/A02BX71")?;
//! assert!(ancestors.contains("ATC/A"));
//!
//! let pruned = graph.prune(["ATC/A02BX71"]).graph;
//! assert_eq!(pruned.code_count(), 4);
//! assert_eq!(pruned.all_parents("ATC/A02BX71")?, ancestors);
//! # Ok::<(), medcode_ontology::OntologyError>(())
//! ```
//!
//! ## Lifecycle
//!
//! ```text
//! VocabularyRecord* ──► OntologyBuilder ──build()──► OntologyGraph ──► Arc (SharedOntology)
//!                            ▲                            │
//!                   merge_metadata()             prune(used) / persistence::save
//!                                                         ▼
//!                                               OntologyGraph (new, smaller)
//! ```
//!
//! ## Feature Flags
//!
//! - `parallel` - Collects prune ancestors on the rayon thread pool when
//!   [`OntologyConfig::parallel`] is set

#![warn(missing_docs)]

pub mod builder;
pub mod config;
pub mod edges;
pub mod error;
pub mod graph;
pub mod handle;
pub mod persistence;
pub mod pruner;
pub mod registry;
pub mod stats;
pub mod traits;
pub mod traverser;

// Re-exports for convenience
pub use builder::{OntologyBuilder, VocabularyRecord};
pub use config::{DescriptionPolicy, OntologyConfig, OntologyConfigBuilder, PruneOptions};
pub use edges::EdgeStore;
pub use error::{OntologyError, OntologyResult};
pub use graph::{OntologyGraph, SharedOntology};
pub use handle::{vocabulary_of, CodeHandle};
pub use persistence::OntologyManifest;
pub use pruner::{PruneOutcome, PruneStats, Pruner};
pub use registry::CodeRegistry;
pub use stats::{CycleReport, GraphStats};
pub use traits::HierarchyQueryable;
pub use traverser::{Direction, HierarchyTraverser, Traversal};
