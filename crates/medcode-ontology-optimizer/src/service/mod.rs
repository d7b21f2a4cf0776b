//! Shared hierarchy query service with caching.
//!
//! This module provides a high-level service that answers identifier-level
//! hierarchy questions against a shared graph and memoizes closure results
//! for repeated queries. The service is `Send + Sync`; wrap it in an `Arc`
//! to share it between worker threads.
//!
//! # Example
//!
//! ```rust
//! use medcode_ontology::{OntologyGraph, VocabularyRecord};
//! use medcode_ontology_optimizer::service::OntologyQueryService;
//!
//! let graph = OntologyGraph::from_records(vec![
//!     VocabularyRecord::new("ICD10CM/E11", None, &["ICD10CM/E08-E13"]),
//!     VocabularyRecord::new("ICD10CM/E11.9", None, &["ICD10CM/E11"]),
//! ])?
//! .into_shared();
//! let service = OntologyQueryService::new(graph);
//!
//! service.warm_cache(&["ICD10CM/E08-E13"]);
//! assert_eq!(
//!     service.ancestor_identifiers("ICD10CM/E11.9")?,
//!     vec!["ICD10CM/E08-E13", "ICD10CM/E11"]
//! );
//! assert!(service.is_a("ICD10CM/E11.9", "ICD10CM/E08-E13")?);
//! # Ok::<(), medcode_ontology_optimizer::OptimizerError>(())
//! ```

mod stats;

pub use stats::QueryStats;

use lru::LruCache;
use medcode_ontology::{CodeHandle, Direction, SharedOntology};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Instant;

use crate::error::OptimizerResult;

/// Cached closure of one code in one direction.
type ClosureSet = Arc<HashSet<CodeHandle>>;

/// Configuration for the query service.
#[derive(Debug, Clone)]
pub struct QueryServiceConfig {
    /// Maximum number of cached closures.
    pub cache_size: usize,
    /// Whether to cache closures at all.
    pub enable_cache: bool,
}

impl Default for QueryServiceConfig {
    fn default() -> Self {
        Self {
            cache_size: 10_000,
            enable_cache: true,
        }
    }
}

impl QueryServiceConfig {
    /// Creates a config with no caching.
    pub fn no_cache() -> Self {
        Self {
            cache_size: 0,
            enable_cache: false,
        }
    }

    /// Creates a config with custom cache size.
    pub fn with_cache_size(size: usize) -> Self {
        Self {
            cache_size: size,
            enable_cache: size > 0,
        }
    }
}

/// A high-level, cached query service over a shared ontology graph.
pub struct OntologyQueryService {
    graph: SharedOntology,
    config: QueryServiceConfig,
    cache: Option<RwLock<LruCache<(Direction, CodeHandle), ClosureSet>>>,
    stats: RwLock<QueryStats>,
}

impl OntologyQueryService {
    /// Creates a new query service with default configuration.
    pub fn new(graph: SharedOntology) -> Self {
        Self::with_config(graph, QueryServiceConfig::default())
    }

    /// Creates a new query service with custom configuration.
    pub fn with_config(graph: SharedOntology, config: QueryServiceConfig) -> Self {
        let cache = if config.enable_cache {
            NonZeroUsize::new(config.cache_size).map(|size| RwLock::new(LruCache::new(size)))
        } else {
            None
        };

        Self {
            graph,
            config,
            cache,
            stats: RwLock::new(QueryStats::default()),
        }
    }

    /// Gets all ancestors of a code, excluding the code itself.
    pub fn ancestors(&self, identifier: &str) -> OptimizerResult<ClosureSet> {
        let handle = self.graph.handle_of(identifier)?;
        Ok(self.closure_of(handle, Direction::Ancestors))
    }

    /// Gets all descendants of a code, excluding the code itself.
    pub fn descendants(&self, identifier: &str) -> OptimizerResult<ClosureSet> {
        let handle = self.graph.handle_of(identifier)?;
        Ok(self.closure_of(handle, Direction::Descendants))
    }

    /// Gets the identifiers of all ancestors of a code, sorted.
    pub fn ancestor_identifiers(&self, identifier: &str) -> OptimizerResult<Vec<&str>> {
        let ancestors = self.ancestors(identifier)?;
        Ok(self.sorted_identifiers(&ancestors))
    }

    /// Gets the identifiers of all descendants of a code, sorted.
    pub fn descendant_identifiers(&self, identifier: &str) -> OptimizerResult<Vec<&str>> {
        let descendants = self.descendants(identifier)?;
        Ok(self.sorted_identifiers(&descendants))
    }

    /// Checks if `code` is `ancestor` or one of its descendants.
    ///
    /// # Errors
    ///
    /// Fails if either identifier is unknown.
    pub fn is_a(&self, code: &str, ancestor: &str) -> OptimizerResult<bool> {
        let code = self.graph.handle_of(code)?;
        let ancestor = self.graph.handle_of(ancestor)?;
        if code == ancestor {
            return Ok(true);
        }
        Ok(self.closure_of(code, Direction::Ancestors).contains(&ancestor))
    }

    /// Computes a closure, using the cache if available.
    fn closure_of(&self, handle: CodeHandle, direction: Direction) -> ClosureSet {
        let key = (direction, handle);

        if let Some(ref cache) = self.cache {
            let cache_read = cache.read();
            if let Some(cached) = cache_read.peek(&key) {
                let cached = Arc::clone(cached);
                drop(cache_read);
                self.stats.write().record_hit();
                return cached;
            }
        }

        let start = Instant::now();
        let members: ClosureSet = Arc::new(self.graph.traverser().walk(handle, direction).members);
        let walk_ms = start.elapsed().as_secs_f64() * 1000.0;

        if let Some(ref cache) = self.cache {
            cache.write().put(key, Arc::clone(&members));
        }

        self.stats.write().record_miss(walk_ms);

        members
    }

    fn sorted_identifiers(&self, handles: &HashSet<CodeHandle>) -> Vec<&str> {
        let mut identifiers: Vec<&str> = handles
            .iter()
            .filter_map(|&h| self.graph.identifier_of(h).ok())
            .collect();
        identifiers.sort_unstable();
        identifiers
    }

    /// Warms the cache with both closures of each given code.
    ///
    /// Unknown identifiers are skipped. Returns how many codes were warmed.
    pub fn warm_cache(&self, identifiers: &[&str]) -> usize {
        let mut warmed = 0;
        for identifier in identifiers {
            match self.graph.registry().get_handle(identifier) {
                Some(handle) => {
                    self.closure_of(handle, Direction::Ancestors);
                    self.closure_of(handle, Direction::Descendants);
                    warmed += 1;
                }
                None => tracing::debug!(code = identifier, "skipping unknown code while warming cache"),
            }
        }
        warmed
    }

    /// Clears the cache.
    pub fn clear_cache(&self) {
        if let Some(ref cache) = self.cache {
            cache.write().clear();
        }
    }

    /// Returns the current number of cached closures.
    pub fn cache_len(&self) -> usize {
        self.cache.as_ref().map(|c| c.read().len()).unwrap_or(0)
    }

    /// Returns query statistics.
    pub fn stats(&self) -> QueryStats {
        self.stats.read().clone()
    }

    /// Resets statistics.
    pub fn reset_stats(&self) {
        *self.stats.write() = QueryStats::default();
    }

    /// Returns the underlying graph.
    pub fn graph(&self) -> &SharedOntology {
        &self.graph
    }

    /// Returns a reference to the configuration.
    pub fn config(&self) -> &QueryServiceConfig {
        &self.config
    }
}
