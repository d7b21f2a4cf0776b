//! Precomputed transitive closure for O(1) hierarchy lookups.
//!
//! The transitive closure precomputes all ancestor/descendant relationships,
//! trading memory for speed. After building, hierarchy queries are O(1).
//!
//! # Example
//!
//! ```ignore
//! use medcode_ontology_optimizer::closure::TransitiveClosure;
//! use medcode_ontology::HierarchyTraverser;
//!
//! // Build closure from the graph (one-time operation)
//! let closure = TransitiveClosure::build(&graph);
//!
//! // Check ancestry in O(1)
//! if closure.is_ancestor_of(diabetes, type_2_diabetes) {
//!     println!("E11 is a kind of diabetes");
//! }
//!
//! // Get all descendants in O(1) - returns reference to pre-built set
//! let descendants = closure.get_descendants(diabetes);
//!
//! // Closure implements HierarchyQueryable, so traversers accept it
//! let depth = HierarchyTraverser::new(&closure).ancestor_depth(type_2_diabetes);
//! ```

mod stats;

pub use stats::ClosureStats;

use medcode_ontology::{CodeHandle, HierarchyQueryable, HierarchyTraverser, Traversal};
use std::collections::HashSet;
use std::time::Instant;

/// Precomputed transitive closure of the code hierarchy.
///
/// Provides O(1) lookup for:
/// - Is `A` an ancestor of `B`?
/// - Is `A` a descendant of `B`?
/// - Get all ancestors of `A`
/// - Get all descendants of `A`
///
/// Closure sets follow the same rules as
/// [`HierarchyTraverser`]: a code is never its own ancestor, even when
/// malformed input places it on a cycle.
///
/// This implements [`HierarchyQueryable`], so it can stand in for the
/// graph anywhere a hierarchy store is expected.
pub struct TransitiveClosure {
    /// For each handle, the set of all ancestors.
    ancestors: Vec<HashSet<CodeHandle>>,
    /// For each handle, the set of all descendants.
    descendants: Vec<HashSet<CodeHandle>>,
    /// Direct parents for each handle.
    parents: Vec<Vec<CodeHandle>>,
    /// Direct children for each handle.
    children: Vec<Vec<CodeHandle>>,
    /// Build statistics.
    stats: ClosureStats,
}

impl TransitiveClosure {
    /// Builds the transitive closure from a hierarchy store.
    ///
    /// This is a one-time O(n * d) operation where n is the code count and
    /// d is the average number of ancestors.
    #[cfg(not(feature = "parallel"))]
    pub fn build<T: HierarchyQueryable>(store: &T) -> Self {
        Self::build_with_progress(store, |_, _| {})
    }

    /// Builds the transitive closure from a hierarchy store.
    ///
    /// Per-code walks run on the rayon thread pool.
    #[cfg(feature = "parallel")]
    pub fn build<T: HierarchyQueryable>(store: &T) -> Self {
        use rayon::prelude::*;

        let start = Instant::now();
        let walks: Vec<(Traversal, usize)> = (0..store.code_count() as u32)
            .into_par_iter()
            .map(|raw| walk_up(store, CodeHandle::new(raw)))
            .collect();
        Self::assemble(store, walks, start)
    }

    /// Builds the closure with a progress callback.
    ///
    /// The callback receives (current_code_index, total_codes).
    ///
    /// # Example
    ///
    /// ```ignore
    /// let closure = TransitiveClosure::build_with_progress(&graph, |current, total| {
    ///     println!("Progress: {}/{}", current, total);
    /// });
    /// ```
    pub fn build_with_progress<T, F>(store: &T, mut progress: F) -> Self
    where
        T: HierarchyQueryable,
        F: FnMut(usize, usize),
    {
        let start = Instant::now();
        let code_count = store.code_count();
        let walks = (0..code_count)
            .map(|index| {
                progress(index, code_count);
                walk_up(store, CodeHandle::new(index as u32))
            })
            .collect();
        Self::assemble(store, walks, start)
    }

    fn assemble<T: HierarchyQueryable>(
        store: &T,
        walks: Vec<(Traversal, usize)>,
        start: Instant,
    ) -> Self {
        let code_count = store.code_count();

        let parents: Vec<Vec<CodeHandle>> = store
            .all_handles()
            .map(|h| store.parents_of(h).to_vec())
            .collect();
        let children: Vec<Vec<CodeHandle>> = store
            .all_handles()
            .map(|h| store.children_of(h).to_vec())
            .collect();
        let edge_count = parents.iter().map(Vec::len).sum();

        let mut ancestors = Vec::with_capacity(code_count);
        let mut max_depth = 0;
        let mut cyclic_codes = 0;
        for (walk, depth) in walks {
            max_depth = max_depth.max(depth);
            if walk.start_on_cycle() {
                cyclic_codes += 1;
            }
            ancestors.push(walk.members);
        }

        // Descendant sets are the inverse of the ancestor sets
        let mut descendants = vec![HashSet::new(); code_count];
        for (index, concept_ancestors) in ancestors.iter().enumerate() {
            let handle = CodeHandle::new(index as u32);
            for ancestor in concept_ancestors {
                if let Some(set) = descendants.get_mut(ancestor.index()) {
                    set.insert(handle);
                }
            }
        }

        let total_ancestors: usize = ancestors.iter().map(HashSet::len).sum();
        let total_descendants: usize = descendants.iter().map(HashSet::len).sum();

        let stats = ClosureStats {
            code_count,
            edge_count,
            max_hierarchy_depth: max_depth,
            avg_ancestors: average(total_ancestors, code_count),
            avg_descendants: average(total_descendants, code_count),
            cyclic_codes,
            build_time_ms: start.elapsed().as_millis() as u64,
            memory_estimate_bytes: Self::estimate_memory(
                code_count,
                edge_count,
                total_ancestors,
                total_descendants,
            ),
        };

        tracing::info!(
            codes = stats.code_count,
            max_depth = stats.max_hierarchy_depth,
            cyclic_codes = stats.cyclic_codes,
            build_time_ms = stats.build_time_ms,
            "built transitive closure"
        );

        Self {
            ancestors,
            descendants,
            parents,
            children,
            stats,
        }
    }

    /// Estimates memory usage in bytes.
    fn estimate_memory(
        code_count: usize,
        edge_count: usize,
        total_ancestors: usize,
        total_descendants: usize,
    ) -> usize {
        // HashSet header per code and direction, plus ~8 bytes per handle entry
        let set_overhead = code_count * 2 * 48;
        let closure_storage = (total_ancestors + total_descendants) * 8;
        let adjacency_storage = code_count * 2 * 24 + edge_count * 2 * 4;

        set_overhead + closure_storage + adjacency_storage
    }

    /// Returns true if `ancestor` is an ancestor of `descendant` (O(1)).
    #[inline]
    pub fn is_ancestor_of(&self, ancestor: CodeHandle, descendant: CodeHandle) -> bool {
        self.ancestors
            .get(descendant.index())
            .is_some_and(|anc| anc.contains(&ancestor))
    }

    /// Returns true if `descendant` is a descendant of `ancestor` (O(1)).
    #[inline]
    pub fn is_descendant_of(&self, descendant: CodeHandle, ancestor: CodeHandle) -> bool {
        self.descendants
            .get(ancestor.index())
            .is_some_and(|desc| desc.contains(&descendant))
    }

    /// Gets all ancestors of a code (O(1) - returns reference).
    ///
    /// Returns `None` if the code has no ancestors (root code) or is
    /// unknown.
    #[inline]
    pub fn get_ancestors(&self, handle: CodeHandle) -> Option<&HashSet<CodeHandle>> {
        self.ancestors
            .get(handle.index())
            .filter(|set| !set.is_empty())
    }

    /// Gets all ancestors of a code, including self.
    pub fn get_ancestors_or_self(&self, handle: CodeHandle) -> HashSet<CodeHandle> {
        let mut result = self.get_ancestors(handle).cloned().unwrap_or_default();
        result.insert(handle);
        result
    }

    /// Gets all descendants of a code (O(1) - returns reference).
    ///
    /// Returns `None` if the code has no descendants (leaf code) or is
    /// unknown.
    #[inline]
    pub fn get_descendants(&self, handle: CodeHandle) -> Option<&HashSet<CodeHandle>> {
        self.descendants
            .get(handle.index())
            .filter(|set| !set.is_empty())
    }

    /// Gets all descendants of a code, including self.
    pub fn get_descendants_or_self(&self, handle: CodeHandle) -> HashSet<CodeHandle> {
        let mut result = self.get_descendants(handle).cloned().unwrap_or_default();
        result.insert(handle);
        result
    }

    /// Returns build statistics.
    pub fn stats(&self) -> &ClosureStats {
        &self.stats
    }

    /// Returns estimated memory usage in bytes.
    pub fn memory_usage(&self) -> usize {
        self.stats.memory_estimate_bytes
    }
}

/// Implement `HierarchyQueryable` so the closure can replace the graph in
/// traversers.
impl HierarchyQueryable for TransitiveClosure {
    fn parents_of(&self, handle: CodeHandle) -> &[CodeHandle] {
        self.parents
            .get(handle.index())
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    fn children_of(&self, handle: CodeHandle) -> &[CodeHandle] {
        self.children
            .get(handle.index())
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    fn code_count(&self) -> usize {
        self.parents.len()
    }
}

fn walk_up<T: HierarchyQueryable>(store: &T, handle: CodeHandle) -> (Traversal, usize) {
    let traverser = HierarchyTraverser::new(store);
    (
        traverser.ancestors_with_report(handle),
        traverser.ancestor_depth(handle),
    )
}

fn average(total: usize, count: usize) -> f64 {
    if count > 0 {
        total as f64 / count as f64
    } else {
        0.0
    }
}
