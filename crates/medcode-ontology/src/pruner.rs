//! Dataset-aware pruning.
//!
//! Pruning keeps every code observed in a dataset plus all of its ancestors
//! and discards everything else, which typically shrinks a full vocabulary
//! by orders of magnitude. It never edits a graph in place: the retained
//! codes are renumbered densely (in their original relative order) and a
//! fresh graph is rebuilt from them.
//!
//! Only ancestor queries are guaranteed to match the original graph for the
//! retained codes. Descendant queries are narrowed to whatever descendants
//! happened to be retained as well.
//!
//! # Example
//!
//! ```rust
//! use medcode_ontology::{OntologyGraph, VocabularyRecord};
//!
//! let graph = OntologyGraph::from_records(vec![
//!     VocabularyRecord::new("A", None, &[]),
//!     VocabularyRecord::new("B", None, &["A"]),
//!     VocabularyRecord::new("C", None, &["A"]),
//! ])
//! .unwrap();
//!
//! let outcome = graph.prune(["B", "NOT/REAL"]);
//! assert_eq!(outcome.stats.retained_codes, 2);
//! assert_eq!(outcome.stats.unknown_codes, 1);
//! assert!(!outcome.graph.contains_code("C"));
//! ```

use std::collections::VecDeque;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::config::PruneOptions;
use crate::edges::EdgeStore;
use crate::graph::OntologyGraph;
use crate::handle::{vocabulary_of, CodeHandle};
use crate::registry::CodeRegistry;

/// Statistics about a pruning pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PruneStats {
    /// Entries in the used-code input (duplicates included).
    pub used_codes: usize,
    /// Distinct used codes found in the registry.
    pub known_used_codes: usize,
    /// Used entries that are not in the registry.
    pub unknown_codes: usize,
    /// Codes in the original graph.
    pub original_codes: usize,
    /// Edges in the original graph.
    pub original_edges: usize,
    /// Codes in the pruned graph.
    pub retained_codes: usize,
    /// Edges in the pruned graph.
    pub retained_edges: usize,
    /// Time taken in milliseconds.
    pub elapsed_ms: u64,
}

impl PruneStats {
    /// Returns the fraction of codes that were discarded, in `[0, 1]`.
    pub fn reduction_ratio(&self) -> f64 {
        if self.original_codes == 0 {
            0.0
        } else {
            1.0 - self.retained_codes as f64 / self.original_codes as f64
        }
    }
}

impl std::fmt::Display for PruneStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Prune Statistics:")?;
        writeln!(f, "  Used entries:   {}", self.used_codes)?;
        writeln!(f, "  Known used:     {}", self.known_used_codes)?;
        writeln!(f, "  Unknown:        {}", self.unknown_codes)?;
        writeln!(
            f,
            "  Codes:          {} -> {}",
            self.original_codes, self.retained_codes
        )?;
        writeln!(
            f,
            "  Edges:          {} -> {}",
            self.original_edges, self.retained_edges
        )?;
        writeln!(f, "  Reduction:      {:.1}%", self.reduction_ratio() * 100.0)?;
        writeln!(f, "  Time:           {}ms", self.elapsed_ms)?;
        Ok(())
    }
}

/// A pruned graph together with the statistics of the pass.
#[derive(Debug, Clone)]
pub struct PruneOutcome {
    /// The new, smaller graph.
    pub graph: OntologyGraph,
    /// What the pass did.
    pub stats: PruneStats,
}

/// Reduces a graph to the codes needed for a given used-code set.
pub struct Pruner<'g> {
    graph: &'g OntologyGraph,
    options: PruneOptions,
}

impl<'g> Pruner<'g> {
    /// Creates a pruner with default options.
    pub fn new(graph: &'g OntologyGraph) -> Self {
        Self::with_options(graph, PruneOptions::default())
    }

    /// Creates a pruner with explicit options.
    pub fn with_options(graph: &'g OntologyGraph, options: PruneOptions) -> Self {
        Self { graph, options }
    }

    /// Computes which handles survive, without building a new graph.
    ///
    /// Returns one flag per handle of the original graph.
    pub fn retained<I, S>(&self, used: I) -> (Vec<bool>, PruneStats)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let registry = self.graph.registry();
        let mut stats = PruneStats {
            original_codes: self.graph.code_count(),
            original_edges: self.graph.edge_count(),
            ..Default::default()
        };

        let mut is_used = vec![false; registry.len()];
        let mut seeds = Vec::new();
        for identifier in used {
            stats.used_codes += 1;
            match registry.get_handle(identifier.as_ref()) {
                Some(handle) => {
                    if !is_used[handle.index()] {
                        is_used[handle.index()] = true;
                        seeds.push(handle);
                    }
                }
                None => {
                    stats.unknown_codes += 1;
                    tracing::debug!(code = identifier.as_ref(), "skipping unknown used code");
                }
            }
        }
        stats.known_used_codes = seeds.len();

        let reached = self.reach(&seeds);
        let keep = (0..registry.len())
            .map(|index| {
                is_used[index] || (reached[index] && self.ancestor_allowed(index))
            })
            .collect();

        (keep, stats)
    }

    fn ancestor_allowed(&self, index: usize) -> bool {
        if self.options.remove_vocabularies.is_empty() {
            return true;
        }
        self.graph
            .identifier_of(CodeHandle::new(index as u32))
            .map(|id| !self.options.remove_vocabularies.contains(vocabulary_of(id)))
            .unwrap_or(false)
    }

    /// Marks every code reachable upwards from the seeds, seeds included.
    #[cfg(feature = "parallel")]
    fn reach(&self, seeds: &[CodeHandle]) -> Vec<bool> {
        use rayon::prelude::*;

        let node_count = self.graph.code_count();
        if !self.graph.config().parallel || seeds.len() < 2 {
            return reach_from(self.graph, seeds, node_count);
        }

        let chunk_size = seeds.len().div_ceil(rayon::current_num_threads()).max(1);
        seeds
            .par_chunks(chunk_size)
            .map(|chunk| reach_from(self.graph, chunk, node_count))
            .reduce(
                || vec![false; node_count],
                |mut acc, part| {
                    for (a, p) in acc.iter_mut().zip(part) {
                        *a |= p;
                    }
                    acc
                },
            )
    }

    /// Marks every code reachable upwards from the seeds, seeds included.
    #[cfg(not(feature = "parallel"))]
    fn reach(&self, seeds: &[CodeHandle]) -> Vec<bool> {
        reach_from(self.graph, seeds, self.graph.code_count())
    }

    /// Prunes the graph to the used codes and their ancestors.
    pub fn prune<I, S>(&self, used: I) -> PruneOutcome
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let _span = tracing::info_span!("prune", codes = self.graph.code_count()).entered();
        let started = Instant::now();

        let (keep, mut stats) = self.retained(used);
        let graph = self.rebuild(&keep);

        stats.retained_codes = graph.code_count();
        stats.retained_edges = graph.edge_count();
        stats.elapsed_ms = started.elapsed().as_millis() as u64;

        tracing::info!(
            original_codes = stats.original_codes,
            retained_codes = stats.retained_codes,
            retained_edges = stats.retained_edges,
            unknown_codes = stats.unknown_codes,
            elapsed_ms = stats.elapsed_ms,
            "pruned ontology graph"
        );

        PruneOutcome { graph, stats }
    }

    /// Filter-and-renumber pass over the arena.
    fn rebuild(&self, keep: &[bool]) -> OntologyGraph {
        let old = self.graph;
        let retained_count = keep.iter().filter(|&&k| k).count();

        let mut remap: Vec<Option<CodeHandle>> = vec![None; keep.len()];
        let mut registry = CodeRegistry::with_capacity(retained_count);
        for (old_handle, identifier) in old.registry().iter() {
            if keep[old_handle.index()] {
                let new_handle =
                    registry.push_unchecked(identifier, old.description_of(old_handle));
                remap[old_handle.index()] = Some(new_handle);
            }
        }

        let mut edges = EdgeStore::with_nodes(retained_count);
        for old_child in old.registry().handles() {
            let Some(child) = remap[old_child.index()] else {
                continue;
            };
            for &old_parent in old.parents_of(old_child) {
                if let Some(parent) = remap[old_parent.index()] {
                    edges.push_unchecked(parent, child);
                }
            }
        }

        OntologyGraph::from_parts(registry, edges, old.config().clone())
    }
}

/// Multi-source BFS over parent links with one shared visited marker.
fn reach_from(graph: &OntologyGraph, seeds: &[CodeHandle], node_count: usize) -> Vec<bool> {
    let mut reached = vec![false; node_count];
    let mut queue: VecDeque<CodeHandle> = VecDeque::with_capacity(seeds.len());

    for &seed in seeds {
        if !reached[seed.index()] {
            reached[seed.index()] = true;
            queue.push_back(seed);
        }
    }

    while let Some(current) = queue.pop_front() {
        for &parent in graph.parents_of(current) {
            if !reached[parent.index()] {
                reached[parent.index()] = true;
                queue.push_back(parent);
            }
        }
    }

    reached
}
