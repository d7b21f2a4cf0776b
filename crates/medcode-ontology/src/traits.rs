//! Read-only hierarchy access.
//!
//! [`HierarchyQueryable`] is the seam between hierarchy storage and the
//! algorithms that walk it. [`OntologyGraph`](crate::OntologyGraph)
//! implements it directly; accelerators such as a precomputed closure can
//! implement it too and be handed to the same traverser.
//!
//! # Example
//!
//! ```rust
//! use medcode_ontology::{
//!     CodeHandle, HierarchyQueryable, HierarchyTraverser, OntologyBuilder, VocabularyRecord,
//! };
//!
//! fn depth_hint(store: &dyn HierarchyQueryable, handle: CodeHandle) -> usize {
//!     HierarchyTraverser::new(store).ancestor_depth(handle)
//! }
//!
//! let mut builder = OntologyBuilder::new();
//! builder.add_record(VocabularyRecord::new("ATC/A02B", None, &["ATC/A02"]))?;
//! builder.add_record(VocabularyRecord::new("ATC/A02BX", None, &["ATC/A02B"]))?;
//! let graph = builder.build();
//!
//! let leaf = graph.handle_of("ATC/A02BX")?;
//! assert_eq!(depth_hint(&graph, leaf), 2);
//! # Ok::<(), medcode_ontology::OntologyError>(())
//! ```

use crate::handle::CodeHandle;

/// Trait for stores that expose a code hierarchy by handle.
///
/// Implementations must be safe to share between threads: queries take
/// `&self` and never mutate.
///
/// # Required Methods
///
/// - [`parents_of`](Self::parents_of) - Direct parents
/// - [`children_of`](Self::children_of) - Direct children
/// - [`code_count`](Self::code_count) - Size of the dense handle range
pub trait HierarchyQueryable: Send + Sync {
    /// Gets direct parents of a code.
    ///
    /// Returns an empty slice if the code has no parents or doesn't exist.
    fn parents_of(&self, handle: CodeHandle) -> &[CodeHandle];

    /// Gets direct children of a code.
    ///
    /// Returns an empty slice if the code has no children or doesn't exist.
    fn children_of(&self, handle: CodeHandle) -> &[CodeHandle];

    /// Returns the number of codes; valid handles are `0..code_count()`.
    fn code_count(&self) -> usize;

    /// Checks if a handle is valid for this store.
    fn contains(&self, handle: CodeHandle) -> bool {
        handle.index() < self.code_count()
    }

    /// Returns an iterator over all handles.
    fn all_handles(&self) -> Box<dyn Iterator<Item = CodeHandle> + '_> {
        Box::new((0..self.code_count() as u32).map(CodeHandle::new))
    }

    /// Gets the description of a code.
    fn description_of(&self, handle: CodeHandle) -> Option<&str> {
        let _ = handle;
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Mock store for testing the trait defaults.
    struct MockStore {
        count: usize,
        children: HashMap<CodeHandle, Vec<CodeHandle>>,
        parents: HashMap<CodeHandle, Vec<CodeHandle>>,
    }

    impl MockStore {
        fn new(count: usize) -> Self {
            Self {
                count,
                children: HashMap::new(),
                parents: HashMap::new(),
            }
        }

        fn add_is_a(&mut self, child: u32, parent: u32) {
            let (child, parent) = (CodeHandle::new(child), CodeHandle::new(parent));
            self.children.entry(parent).or_default().push(child);
            self.parents.entry(child).or_default().push(parent);
        }
    }

    impl HierarchyQueryable for MockStore {
        fn parents_of(&self, handle: CodeHandle) -> &[CodeHandle] {
            self.parents.get(&handle).map(|v| v.as_slice()).unwrap_or(&[])
        }

        fn children_of(&self, handle: CodeHandle) -> &[CodeHandle] {
            self.children.get(&handle).map(|v| v.as_slice()).unwrap_or(&[])
        }

        fn code_count(&self) -> usize {
            self.count
        }
    }

    #[test]
    fn test_default_contains_and_handles() {
        let store = MockStore::new(3);

        assert!(store.contains(CodeHandle::new(2)));
        assert!(!store.contains(CodeHandle::new(3)));
        assert_eq!(store.all_handles().count(), 3);
        assert_eq!(store.description_of(CodeHandle::new(0)), None);
    }

    #[test]
    fn test_mock_store_hierarchy() {
        let mut store = MockStore::new(3);
        store.add_is_a(1, 0);
        store.add_is_a(2, 0);

        assert_eq!(store.children_of(CodeHandle::new(0)).len(), 2);
        assert_eq!(store.parents_of(CodeHandle::new(1)), &[CodeHandle::new(0)]);
        assert!(store.parents_of(CodeHandle::new(0)).is_empty());
    }
}
