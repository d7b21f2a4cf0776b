//! Transitive closure over the code hierarchy.
//!
//! This module provides the `HierarchyTraverser` struct for walking parents
//! or children breadth-first. Every call keeps its own visited set, so each
//! code is expanded at most once per call: diamond-shaped reconvergence costs
//! nothing extra and cycles cannot cause non-termination.

use std::collections::{HashSet, VecDeque};

use crate::handle::CodeHandle;
use crate::traits::HierarchyQueryable;

/// Direction of a closure walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Follow parent links (more general codes).
    Ancestors,
    /// Follow child links (more specific codes).
    Descendants,
}

/// Result of a closure walk with its cycle diagnostic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Traversal {
    /// Every reachable code, excluding the start.
    pub members: HashSet<CodeHandle>,
    /// How many times the walk reached the start code again.
    ///
    /// Non-zero means the start code lies on a cycle. This is a data
    /// defect that is tolerated, not an error.
    pub revisits_of_start: usize,
}

impl Traversal {
    /// Returns true if the start code was found on a cycle.
    pub fn start_on_cycle(&self) -> bool {
        self.revisits_of_start > 0
    }
}

/// Traverses code hierarchies using BFS.
///
/// # Example
///
/// ```ignore
/// use medcode_ontology::HierarchyTraverser;
///
/// let traverser = HierarchyTraverser::new(&graph);
/// let ancestors = traverser.ancestors(handle);
/// ```
pub struct HierarchyTraverser<'a> {
    store: &'a dyn HierarchyQueryable,
}

impl<'a> HierarchyTraverser<'a> {
    /// Creates a new hierarchy traverser over the given store.
    pub fn new(store: &'a dyn HierarchyQueryable) -> Self {
        Self { store }
    }

    /// Gets all ancestors of a code. Does NOT include the code itself.
    pub fn ancestors(&self, handle: CodeHandle) -> HashSet<CodeHandle> {
        self.walk(handle, Direction::Ancestors).members
    }

    /// Gets all descendants of a code. Does NOT include the code itself.
    pub fn descendants(&self, handle: CodeHandle) -> HashSet<CodeHandle> {
        self.walk(handle, Direction::Descendants).members
    }

    /// Gets all ancestors of a code, including the code itself.
    pub fn ancestors_or_self(&self, handle: CodeHandle) -> HashSet<CodeHandle> {
        let mut result = self.ancestors(handle);
        result.insert(handle);
        result
    }

    /// Gets all descendants of a code, including the code itself.
    pub fn descendants_or_self(&self, handle: CodeHandle) -> HashSet<CodeHandle> {
        let mut result = self.descendants(handle);
        result.insert(handle);
        result
    }

    /// Gets all ancestors along with the cycle diagnostic.
    pub fn ancestors_with_report(&self, handle: CodeHandle) -> Traversal {
        self.walk(handle, Direction::Ancestors)
    }

    /// Gets all descendants along with the cycle diagnostic.
    pub fn descendants_with_report(&self, handle: CodeHandle) -> Traversal {
        self.walk(handle, Direction::Descendants)
    }

    /// Breadth-first closure in the given direction.
    ///
    /// O(V + E) over the reachable subgraph.
    pub fn walk(&self, start: CodeHandle, direction: Direction) -> Traversal {
        let mut members = HashSet::new();
        let mut queue = VecDeque::new();
        let mut revisits_of_start = 0;

        queue.push_back(start);
        while let Some(current) = queue.pop_front() {
            for &next in self.neighbors(current, direction) {
                if next == start {
                    revisits_of_start += 1;
                    continue;
                }
                if members.insert(next) {
                    queue.push_back(next);
                }
            }
        }

        Traversal {
            members,
            revisits_of_start,
        }
    }

    /// Returns the number of BFS levels above a code (0 for roots).
    pub fn ancestor_depth(&self, handle: CodeHandle) -> usize {
        let mut visited = HashSet::new();
        visited.insert(handle);
        let mut frontier = vec![handle];
        let mut depth = 0;

        loop {
            let mut next_level = Vec::new();
            for &current in &frontier {
                for &parent in self.store.parents_of(current) {
                    if visited.insert(parent) {
                        next_level.push(parent);
                    }
                }
            }
            if next_level.is_empty() {
                return depth;
            }
            depth += 1;
            frontier = next_level;
        }
    }

    #[inline]
    fn neighbors(&self, handle: CodeHandle, direction: Direction) -> &'a [CodeHandle] {
        match direction {
            Direction::Ancestors => self.store.parents_of(handle),
            Direction::Descendants => self.store.children_of(handle),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edges::EdgeStore;

    /// Minimal store over an `EdgeStore`.
    struct TestStore {
        edges: EdgeStore,
    }

    impl TestStore {
        fn new(count: usize, edges: &[(u32, u32)]) -> Self {
            let mut store = EdgeStore::with_nodes(count);
            for &(parent, child) in edges {
                store
                    .add_edge(CodeHandle::new(parent), CodeHandle::new(child))
                    .unwrap();
            }
            Self { edges: store }
        }
    }

    impl HierarchyQueryable for TestStore {
        fn parents_of(&self, handle: CodeHandle) -> &[CodeHandle] {
            self.edges.parents_of(handle)
        }

        fn children_of(&self, handle: CodeHandle) -> &[CodeHandle] {
            self.edges.children_of(handle)
        }

        fn code_count(&self) -> usize {
            self.edges.node_count()
        }
    }

    fn set(raw: &[u32]) -> HashSet<CodeHandle> {
        raw.iter().copied().map(CodeHandle::new).collect()
    }

    /// Creates a test hierarchy:
    /// ```text
    /// 0 (root)
    ///  |-- 1
    ///  |    |-- 3
    ///  |    |-- 4
    ///  |-- 2
    ///       |-- 5
    /// ```
    fn create_tree() -> TestStore {
        TestStore::new(6, &[(0, 1), (0, 2), (1, 3), (1, 4), (2, 5)])
    }

    /// Diamond: 0 -> {1, 2} -> 3
    fn create_diamond() -> TestStore {
        TestStore::new(4, &[(0, 1), (0, 2), (1, 3), (2, 3)])
    }

    #[test]
    fn test_ancestors() {
        let store = create_tree();
        let traverser = HierarchyTraverser::new(&store);

        assert_eq!(traverser.ancestors(CodeHandle::new(3)), set(&[1, 0]));
        assert!(traverser.ancestors(CodeHandle::new(0)).is_empty());
    }

    #[test]
    fn test_descendants() {
        let store = create_tree();
        let traverser = HierarchyTraverser::new(&store);

        assert_eq!(traverser.descendants(CodeHandle::new(0)), set(&[1, 2, 3, 4, 5]));
        assert_eq!(traverser.descendants(CodeHandle::new(1)), set(&[3, 4]));
        assert!(traverser.descendants(CodeHandle::new(5)).is_empty());
    }

    #[test]
    fn test_or_self_variants() {
        let store = create_tree();
        let traverser = HierarchyTraverser::new(&store);

        assert_eq!(traverser.ancestors_or_self(CodeHandle::new(4)), set(&[4, 1, 0]));
        assert_eq!(traverser.descendants_or_self(CodeHandle::new(2)), set(&[2, 5]));
    }

    #[test]
    fn test_diamond_reconvergence() {
        let store = create_diamond();
        let traverser = HierarchyTraverser::new(&store);

        let report = traverser.ancestors_with_report(CodeHandle::new(3));
        assert_eq!(report.members, set(&[0, 1, 2]));
        assert!(!report.start_on_cycle());

        assert_eq!(traverser.descendants(CodeHandle::new(0)), set(&[1, 2, 3]));
    }

    #[test]
    fn test_cycle_terminates_and_is_reported() {
        // 0 -> 1 -> 2 -> 0, plus 2 -> 3
        let store = TestStore::new(4, &[(0, 1), (1, 2), (2, 0), (2, 3)]);
        let traverser = HierarchyTraverser::new(&store);

        let report = traverser.ancestors_with_report(CodeHandle::new(1));
        assert_eq!(report.members, set(&[0, 2]));
        assert_eq!(report.revisits_of_start, 1);

        // 3 hangs below the cycle but is not on it
        let report = traverser.ancestors_with_report(CodeHandle::new(3));
        assert_eq!(report.members, set(&[0, 1, 2]));
        assert!(!report.start_on_cycle());

        let report = traverser.descendants_with_report(CodeHandle::new(0));
        assert_eq!(report.members, set(&[1, 2, 3]));
        assert!(report.start_on_cycle());
    }

    #[test]
    fn test_ancestor_depth() {
        let store = create_tree();
        let traverser = HierarchyTraverser::new(&store);

        assert_eq!(traverser.ancestor_depth(CodeHandle::new(0)), 0);
        assert_eq!(traverser.ancestor_depth(CodeHandle::new(1)), 1);
        assert_eq!(traverser.ancestor_depth(CodeHandle::new(5)), 2);

        let diamond = create_diamond();
        assert_eq!(
            HierarchyTraverser::new(&diamond).ancestor_depth(CodeHandle::new(3)),
            2
        );
    }

    #[test]
    fn test_unknown_handle_is_empty() {
        let store = create_tree();
        let traverser = HierarchyTraverser::new(&store);
        assert!(traverser.ancestors(CodeHandle::new(99)).is_empty());
    }
}
