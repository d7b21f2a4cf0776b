//! The immutable ontology graph.

use std::collections::HashSet;
use std::sync::Arc;

use crate::builder::{OntologyBuilder, VocabularyRecord};
use crate::config::{OntologyConfig, PruneOptions};
use crate::edges::EdgeStore;
use crate::error::OntologyResult;
use crate::handle::CodeHandle;
use crate::pruner::{PruneOutcome, Pruner};
use crate::registry::CodeRegistry;
use crate::stats::{CycleReport, GraphStats};
use crate::traits::HierarchyQueryable;
use crate::traverser::HierarchyTraverser;

/// A graph handle shared between query clients.
pub type SharedOntology = Arc<OntologyGraph>;

/// Code hierarchy: a registry of codes plus their parent/child edges.
///
/// A graph is published once by [`OntologyBuilder::build`], by pruning,
/// or by loading an artifact, and is read-only afterwards. All queries take
/// `&self`, so one instance can serve any number of threads.
///
/// # Example
///
/// ```rust
/// use medcode_ontology::{OntologyGraph, VocabularyRecord};
///
/// let graph = OntologyGraph::from_records(vec![
///     VocabularyRecord::new("A", None, &[]),
///     VocabularyRecord::new("B", None, &["A"]),
///     VocabularyRecord::new("C", None, &["A"]),
///     VocabularyRecord::new("D", Some("leaf"), &["B", "C"]),
/// ])
/// .unwrap();
///
/// let ancestors = graph.all_parents("D").unwrap();
/// assert_eq!(ancestors.len(), 3);
/// assert_eq!(graph.description("D").unwrap(), Some("leaf"));
/// ```
#[derive(Clone)]
pub struct OntologyGraph {
    registry: CodeRegistry,
    edges: EdgeStore,
    config: OntologyConfig,
    stats: GraphStats,
}

impl OntologyGraph {
    /// Publishes a graph from fully built parts, computing its statistics
    /// and cycle diagnostic.
    pub(crate) fn from_parts(
        registry: CodeRegistry,
        mut edges: EdgeStore,
        config: OntologyConfig,
    ) -> Self {
        edges.ensure_nodes(registry.len());
        let stats = Self::compute_stats(&registry, &edges);

        if !stats.cycles.is_acyclic() {
            let sample: Vec<&str> = stats
                .cycles
                .sample
                .iter()
                .filter_map(|&h| registry.identifier_of(h).ok())
                .collect();
            tracing::warn!(
                cyclic_codes = stats.cycles.cyclic_codes,
                ?sample,
                "ontology contains cycles; closures will include cyclic codes"
            );
        }

        Self {
            registry,
            edges,
            config,
            stats,
        }
    }

    fn compute_stats(registry: &CodeRegistry, edges: &EdgeStore) -> GraphStats {
        let mut stats = GraphStats {
            code_count: registry.len(),
            edge_count: edges.edge_count(),
            cycles: CycleReport::detect(edges),
            ..Default::default()
        };
        for handle in registry.handles() {
            let parents = edges.parents_of(handle).len();
            if parents == 0 {
                stats.root_count += 1;
            }
            if edges.children_of(handle).is_empty() {
                stats.leaf_count += 1;
            }
            if registry.description_of(handle).is_some() {
                stats.described_count += 1;
            }
            stats.max_parents = stats.max_parents.max(parents);
        }
        stats
    }

    /// Builds a graph from vocabulary records with the default configuration.
    pub fn from_records<I>(records: I) -> OntologyResult<Self>
    where
        I: IntoIterator<Item = VocabularyRecord>,
    {
        Self::from_records_with_config(records, OntologyConfig::default())
    }

    /// Builds a graph from vocabulary records.
    pub fn from_records_with_config<I>(records: I, config: OntologyConfig) -> OntologyResult<Self>
    where
        I: IntoIterator<Item = VocabularyRecord>,
    {
        let mut builder = OntologyBuilder::with_config(config);
        builder.add_records(records)?;
        Ok(builder.build())
    }

    /// Wraps the graph for sharing between collaborators.
    pub fn into_shared(self) -> SharedOntology {
        Arc::new(self)
    }

    // =========================================================================
    // Handle-level queries
    // =========================================================================

    /// Gets the handle for an identifier.
    #[inline]
    pub fn handle_of(&self, identifier: &str) -> OntologyResult<CodeHandle> {
        self.registry.handle_of(identifier)
    }

    /// Gets the identifier for a handle.
    #[inline]
    pub fn identifier_of(&self, handle: CodeHandle) -> OntologyResult<&str> {
        self.registry.identifier_of(handle)
    }

    /// Gets the description of a code.
    #[inline]
    pub fn description_of(&self, handle: CodeHandle) -> Option<&str> {
        self.registry.description_of(handle)
    }

    /// Gets direct parents of a code.
    #[inline]
    pub fn parents_of(&self, handle: CodeHandle) -> &[CodeHandle] {
        self.edges.parents_of(handle)
    }

    /// Gets direct children of a code.
    #[inline]
    pub fn children_of(&self, handle: CodeHandle) -> &[CodeHandle] {
        self.edges.children_of(handle)
    }

    /// Gets all ancestors of a code, excluding the code itself.
    pub fn all_ancestors(&self, handle: CodeHandle) -> HashSet<CodeHandle> {
        self.traverser().ancestors(handle)
    }

    /// Gets all descendants of a code, excluding the code itself.
    ///
    /// On a pruned graph this is narrowed to the retained codes.
    pub fn all_descendants(&self, handle: CodeHandle) -> HashSet<CodeHandle> {
        self.traverser().descendants(handle)
    }

    /// Returns a traverser over this graph.
    pub fn traverser(&self) -> HierarchyTraverser<'_> {
        HierarchyTraverser::new(self)
    }

    // =========================================================================
    // Identifier-level queries
    // =========================================================================

    /// Gets the description of a code by identifier.
    pub fn description(&self, identifier: &str) -> OntologyResult<Option<&str>> {
        let handle = self.handle_of(identifier)?;
        Ok(self.description_of(handle))
    }

    /// Gets the identifiers of the direct parents of a code.
    pub fn parents(&self, identifier: &str) -> OntologyResult<Vec<&str>> {
        let handle = self.handle_of(identifier)?;
        self.identifiers(self.parents_of(handle).iter().copied())
    }

    /// Gets the identifiers of the direct children of a code.
    pub fn children(&self, identifier: &str) -> OntologyResult<Vec<&str>> {
        let handle = self.handle_of(identifier)?;
        self.identifiers(self.children_of(handle).iter().copied())
    }

    /// Gets the identifiers of every ancestor of a code, excluding itself.
    pub fn all_parents(&self, identifier: &str) -> OntologyResult<HashSet<&str>> {
        let handle = self.handle_of(identifier)?;
        self.identifiers(self.all_ancestors(handle))
    }

    /// Gets the identifiers of every descendant of a code, excluding itself.
    pub fn all_children(&self, identifier: &str) -> OntologyResult<HashSet<&str>> {
        let handle = self.handle_of(identifier)?;
        self.identifiers(self.all_descendants(handle))
    }

    /// Gets the identifiers of a code and all of its ancestors.
    ///
    /// This is the expansion a count featurizer applies to each observed code.
    pub fn all_parents_or_self(&self, identifier: &str) -> OntologyResult<HashSet<&str>> {
        let handle = self.handle_of(identifier)?;
        self.identifiers(self.traverser().ancestors_or_self(handle))
    }

    fn identifiers<'a, C>(
        &'a self,
        handles: impl IntoIterator<Item = CodeHandle>,
    ) -> OntologyResult<C>
    where
        C: FromIterator<&'a str>,
    {
        handles
            .into_iter()
            .map(|h| self.identifier_of(h))
            .collect()
    }

    // =========================================================================
    // Pruning
    // =========================================================================

    /// Reduces the graph to the used codes and all of their ancestors.
    ///
    /// Unknown identifiers are skipped. The original graph is left untouched.
    pub fn prune<I, S>(&self, used: I) -> PruneOutcome
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Pruner::new(self).prune(used)
    }

    /// Prunes with explicit options.
    pub fn prune_with<I, S>(&self, used: I, options: &PruneOptions) -> PruneOutcome
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Pruner::with_options(self, options.clone()).prune(used)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Returns the code registry.
    pub fn registry(&self) -> &CodeRegistry {
        &self.registry
    }

    /// Returns the edge store.
    pub fn edges(&self) -> &EdgeStore {
        &self.edges
    }

    /// Returns the configuration the graph was built with.
    pub fn config(&self) -> &OntologyConfig {
        &self.config
    }

    /// Returns statistics computed at publication.
    pub fn stats(&self) -> &GraphStats {
        &self.stats
    }

    /// Returns the cycle diagnostic.
    pub fn cycle_report(&self) -> &CycleReport {
        &self.stats.cycles
    }

    /// Returns the number of codes.
    #[inline]
    pub fn code_count(&self) -> usize {
        self.registry.len()
    }

    /// Returns the number of edges.
    #[inline]
    pub fn edge_count(&self) -> usize {
        self.edges.edge_count()
    }

    /// Returns true if the graph has no codes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Returns true if the identifier is registered.
    #[inline]
    pub fn contains_code(&self, identifier: &str) -> bool {
        self.registry.contains(identifier)
    }

    /// Returns estimated memory usage in bytes.
    pub fn memory_usage(&self) -> usize {
        self.registry.memory_size() + self.edges.memory_size()
    }
}

/// Graphs compare by content: identifiers, descriptions and adjacency in
/// handle order.
impl PartialEq for OntologyGraph {
    fn eq(&self, other: &Self) -> bool {
        self.registry == other.registry && self.edges == other.edges
    }
}

impl Eq for OntologyGraph {}

impl std::fmt::Debug for OntologyGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OntologyGraph")
            .field("codes", &self.code_count())
            .field("edges", &self.edge_count())
            .field("cyclic_codes", &self.stats.cycles.cyclic_codes)
            .finish()
    }
}

impl HierarchyQueryable for OntologyGraph {
    fn parents_of(&self, handle: CodeHandle) -> &[CodeHandle] {
        self.edges.parents_of(handle)
    }

    fn children_of(&self, handle: CodeHandle) -> &[CodeHandle] {
        self.edges.children_of(handle)
    }

    fn code_count(&self) -> usize {
        self.registry.len()
    }

    fn description_of(&self, handle: CodeHandle) -> Option<&str> {
        self.registry.description_of(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OntologyError;

    /// A -> B, A -> C, B -> D, C -> D
    fn diamond() -> OntologyGraph {
        OntologyGraph::from_records(vec![
            VocabularyRecord::new("A", Some("root"), &[]),
            VocabularyRecord::new("B", None, &["A"]),
            VocabularyRecord::new("C", None, &["A"]),
            VocabularyRecord::new("D", Some("leaf"), &["B", "C"]),
        ])
        .unwrap()
    }

    fn ids<'a>(set: impl IntoIterator<Item = &'a str>) -> HashSet<&'a str> {
        set.into_iter().collect()
    }

    #[test]
    fn test_diamond_closures() {
        let graph = diamond();

        assert_eq!(graph.all_parents("D").unwrap(), ids(["A", "B", "C"]));
        assert_eq!(graph.all_children("A").unwrap(), ids(["B", "C", "D"]));
        assert!(graph.all_parents("A").unwrap().is_empty());
        assert_eq!(graph.all_parents_or_self("B").unwrap(), ids(["A", "B"]));
    }

    #[test]
    fn test_direct_relations() {
        let graph = diamond();

        assert_eq!(graph.parents("D").unwrap(), vec!["B", "C"]);
        assert_eq!(graph.children("A").unwrap(), vec!["B", "C"]);
        assert!(graph.children("D").unwrap().is_empty());
    }

    #[test]
    fn test_dual_index_consistency() {
        let graph = diamond();

        for child in graph.registry().handles() {
            for &parent in graph.parents_of(child) {
                assert!(graph.children_of(parent).contains(&child));
            }
            for &grandchild in graph.children_of(child) {
                assert!(graph.parents_of(grandchild).contains(&child));
            }
        }
    }

    #[test]
    fn test_descriptions() {
        let graph = diamond();

        assert_eq!(graph.description("A").unwrap(), Some("root"));
        assert_eq!(graph.description("B").unwrap(), None);
        assert!(matches!(
            graph.description("NOT/REAL"),
            Err(OntologyError::UnknownCode(_))
        ));
    }

    #[test]
    fn test_unknown_code_queries() {
        let graph = diamond();

        assert!(graph.parents("NOT/REAL").is_err());
        assert!(graph.all_children("NOT/REAL").is_err());
        assert!(!graph.contains_code("NOT/REAL"));
    }

    #[test]
    fn test_stats() {
        let graph = diamond();
        let stats = graph.stats();

        assert_eq!(stats.code_count, 4);
        assert_eq!(stats.edge_count, 4);
        assert_eq!(stats.root_count, 1);
        assert_eq!(stats.leaf_count, 1);
        assert_eq!(stats.max_parents, 2);
        assert_eq!(stats.described_count, 2);
        assert!(graph.cycle_report().is_acyclic());
    }

    #[test]
    fn test_cyclic_graph_is_published_with_report() {
        let graph = OntologyGraph::from_records(vec![
            VocabularyRecord::new("X", None, &["Z"]),
            VocabularyRecord::new("Y", None, &["X"]),
            VocabularyRecord::new("Z", None, &["Y"]),
        ])
        .unwrap();

        assert_eq!(graph.cycle_report().cyclic_codes, 3);
        assert_eq!(graph.all_parents("X").unwrap(), ids(["Y", "Z"]));
    }

    #[test]
    fn test_shared_across_threads() {
        let graph = diamond().into_shared();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let graph = Arc::clone(&graph);
                std::thread::spawn(move || graph.all_parents("D").unwrap().len())
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), 3);
        }
    }
}
