//! Dual-indexed parent/child adjacency.

use hashbrown::HashSet;

use crate::error::{OntologyError, OntologyResult};
use crate::handle::CodeHandle;

/// Adjacency structure holding direct parents and children per handle.
///
/// Both directions are always updated together, so if `p` is listed as a
/// parent of `c` then `c` is listed as a child of `p`. A hashed edge index
/// keeps insertion idempotent in O(1) amortized time while the neighbor
/// lists stay plain vectors for O(degree) enumeration.
#[derive(Clone, Default)]
pub struct EdgeStore {
    parents: Vec<Vec<CodeHandle>>,
    children: Vec<Vec<CodeHandle>>,
    /// (parent, child) pairs already present.
    index: HashSet<(CodeHandle, CodeHandle)>,
}

impl EdgeStore {
    /// Creates an empty store with no nodes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store with room for `node_count` nodes.
    pub fn with_nodes(node_count: usize) -> Self {
        Self {
            parents: vec![Vec::new(); node_count],
            children: vec![Vec::new(); node_count],
            index: HashSet::new(),
        }
    }

    /// Grows the node range to at least `node_count`.
    pub fn ensure_nodes(&mut self, node_count: usize) {
        if self.parents.len() < node_count {
            self.parents.resize_with(node_count, Vec::new);
            self.children.resize_with(node_count, Vec::new);
        }
    }

    /// Adds a parent -> child edge.
    ///
    /// Returns `true` if the edge is new and `false` if it was already
    /// present.
    ///
    /// # Errors
    ///
    /// - [`OntologyError::InvalidHandle`] if either endpoint is out of range
    /// - [`OntologyError::SelfLoop`] if `parent == child`, naming the handle
    ///   as `#<handle>` since the store has no identifiers
    pub fn add_edge(&mut self, parent: CodeHandle, child: CodeHandle) -> OntologyResult<bool> {
        for handle in [parent, child] {
            if handle.index() >= self.parents.len() {
                return Err(OntologyError::InvalidHandle(handle));
            }
        }
        if parent == child {
            return Err(OntologyError::SelfLoop {
                code: parent.to_string(),
            });
        }
        if !self.index.insert((parent, child)) {
            return Ok(false);
        }

        self.parents[child.index()].push(parent);
        self.children[parent.index()].push(child);
        Ok(true)
    }

    /// Appends an edge between in-range, distinct endpoints that is known
    /// to be new.
    pub(crate) fn push_unchecked(&mut self, parent: CodeHandle, child: CodeHandle) {
        self.index.insert((parent, child));
        self.parents[child.index()].push(parent);
        self.children[parent.index()].push(child);
    }

    /// Gets direct parents of a node.
    ///
    /// Returns an empty slice for roots and out-of-range handles.
    #[inline]
    pub fn parents_of(&self, handle: CodeHandle) -> &[CodeHandle] {
        self.parents
            .get(handle.index())
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Gets direct children of a node.
    ///
    /// Returns an empty slice for leaves and out-of-range handles.
    #[inline]
    pub fn children_of(&self, handle: CodeHandle) -> &[CodeHandle] {
        self.children
            .get(handle.index())
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Returns true if the exact edge is present.
    #[inline]
    pub fn has_edge(&self, parent: CodeHandle, child: CodeHandle) -> bool {
        self.index.contains(&(parent, child))
    }

    /// Returns the number of nodes the store has room for.
    #[inline]
    pub fn node_count(&self) -> usize {
        self.parents.len()
    }

    /// Returns the number of distinct edges.
    #[inline]
    pub fn edge_count(&self) -> usize {
        self.index.len()
    }

    /// Iterates every (parent, child) edge, grouped by child in handle order.
    pub fn edges(&self) -> impl Iterator<Item = (CodeHandle, CodeHandle)> + '_ {
        self.parents.iter().enumerate().flat_map(|(child, parents)| {
            let child = CodeHandle::new(child as u32);
            parents.iter().map(move |&parent| (parent, child))
        })
    }

    /// Returns estimated memory usage in bytes.
    pub fn memory_size(&self) -> usize {
        let lists: usize = self
            .parents
            .iter()
            .chain(self.children.iter())
            .map(|v| v.capacity() * 4 + 24)
            .sum();
        lists + self.index.capacity() * (8 + 8)
    }
}

/// Stores compare by adjacency lists; the edge index is derived data.
impl PartialEq for EdgeStore {
    fn eq(&self, other: &Self) -> bool {
        self.parents == other.parents && self.children == other.children
    }
}

impl Eq for EdgeStore {}

impl std::fmt::Debug for EdgeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EdgeStore")
            .field("nodes", &self.node_count())
            .field("edges", &self.edge_count())
            .finish()
    }
}
