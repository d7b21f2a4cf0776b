//! Graph statistics and cycle diagnostics.

use serde::{Deserialize, Serialize};

use crate::edges::EdgeStore;
use crate::handle::CodeHandle;

/// Cycle diagnostic computed once when a graph is published.
///
/// Cycles are a tolerated vocabulary defect: closures still terminate and
/// include the cyclic codes. The report exists so data-quality tooling can
/// flag them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleReport {
    /// Number of codes lying on a cycle or on a path between two cycles.
    pub cyclic_codes: usize,
    /// Up to [`CycleReport::SAMPLE_LIMIT`] of those codes, in handle order.
    pub sample: Vec<CodeHandle>,
}

impl CycleReport {
    /// Maximum number of handles kept in [`sample`](Self::sample).
    pub const SAMPLE_LIMIT: usize = 16;

    /// Returns true if the graph is acyclic.
    pub fn is_acyclic(&self) -> bool {
        self.cyclic_codes == 0
    }

    /// Detects cyclic codes by trimming sources and sinks (Kahn's algorithm
    /// in both directions). Whatever survives both trims cannot be ordered.
    pub fn detect(edges: &EdgeStore) -> Self {
        let node_count = edges.node_count();
        let forward = Self::trim(
            node_count,
            move |h| edges.parents_of(h),
            move |h| edges.children_of(h),
        );
        let backward = Self::trim(
            node_count,
            move |h| edges.children_of(h),
            move |h| edges.parents_of(h),
        );

        let mut cyclic_codes = 0;
        let mut sample = Vec::new();
        for index in 0..node_count {
            if forward[index] && backward[index] {
                cyclic_codes += 1;
                if sample.len() < Self::SAMPLE_LIMIT {
                    sample.push(CodeHandle::new(index as u32));
                }
            }
        }

        Self {
            cyclic_codes,
            sample,
        }
    }

    /// Repeatedly removes nodes with no remaining incoming links.
    /// Returns a survival flag per node.
    fn trim<'e, I, O>(node_count: usize, incoming: I, outgoing: O) -> Vec<bool>
    where
        I: Fn(CodeHandle) -> &'e [CodeHandle],
        O: Fn(CodeHandle) -> &'e [CodeHandle],
    {
        let mut remaining: Vec<usize> = (0..node_count)
            .map(|i| incoming(CodeHandle::new(i as u32)).len())
            .collect();
        let mut stack: Vec<CodeHandle> = (0..node_count)
            .filter(|&i| remaining[i] == 0)
            .map(|i| CodeHandle::new(i as u32))
            .collect();
        let mut alive = vec![true; node_count];

        while let Some(handle) = stack.pop() {
            alive[handle.index()] = false;
            for &next in outgoing(handle) {
                remaining[next.index()] -= 1;
                if remaining[next.index()] == 0 {
                    stack.push(next);
                }
            }
        }

        alive
    }
}

/// Summary statistics about a published graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    /// Number of registered codes.
    pub code_count: usize,
    /// Number of distinct parent -> child edges.
    pub edge_count: usize,
    /// Codes without parents.
    pub root_count: usize,
    /// Codes without children.
    pub leaf_count: usize,
    /// Largest number of direct parents on any code.
    pub max_parents: usize,
    /// Codes that carry a description.
    pub described_count: usize,
    /// Cycle diagnostic.
    pub cycles: CycleReport,
}

impl std::fmt::Display for GraphStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Ontology Statistics:")?;
        writeln!(f, "  Codes:        {}", self.code_count)?;
        writeln!(f, "  Edges:        {}", self.edge_count)?;
        writeln!(f, "  Roots:        {}", self.root_count)?;
        writeln!(f, "  Leaves:       {}", self.leaf_count)?;
        writeln!(f, "  Max parents:  {}", self.max_parents)?;
        writeln!(f, "  Described:    {}", self.described_count)?;
        writeln!(f, "  Cyclic codes: {}", self.cycles.cyclic_codes)?;
        Ok(())
    }
}
