//! Roaring bitmap-based code sets for memory-efficient storage.
//!
//! A [`CodeBitSet`] stores code handles of one shared graph in a Roaring
//! Bitmap. The handle space is already dense `u32`, so no extra index
//! registry is needed. A typical use is accumulating the codes observed
//! while scanning a dataset and feeding the result to pruning.
//!
//! # Example
//!
//! ```ignore
//! use medcode_ontology_optimizer::bitset::CodeBitSet;
//!
//! let mut used = CodeBitSet::new(graph.clone());
//! for event in patient_events {
//!     used.insert(&event.code);
//! }
//!
//! // Efficient set operations
//! let both = used.intersection(&other_cohort)?;   // AND
//! let either = used.union(&other_cohort)?;        // OR
//! let only = used.difference(&other_cohort)?;     // MINUS
//!
//! let pruned = graph.prune(used.identifiers()).graph;
//! ```

use medcode_ontology::{CodeHandle, HierarchyTraverser, SharedOntology};
use roaring::RoaringBitmap;
use std::sync::Arc;

use crate::error::{OptimizerError, OptimizerResult};

/// A set of codes stored as a Roaring Bitmap over graph handles.
///
/// Membership is by identifier; identifiers unknown to the graph are never
/// members.
#[derive(Clone)]
pub struct CodeBitSet {
    bitmap: RoaringBitmap,
    graph: SharedOntology,
}

impl CodeBitSet {
    /// Creates a new empty set over a graph.
    pub fn new(graph: SharedOntology) -> Self {
        Self {
            bitmap: RoaringBitmap::new(),
            graph,
        }
    }

    /// Creates a set from an iterator of identifiers.
    ///
    /// Identifiers not in the graph are silently ignored.
    pub fn from_identifiers<I, S>(identifiers: I, graph: SharedOntology) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::new(graph);
        for identifier in identifiers {
            set.insert(identifier.as_ref());
        }
        set
    }

    /// Creates a set from handles, ignoring any outside the graph.
    pub fn from_handles<I>(handles: I, graph: SharedOntology) -> Self
    where
        I: IntoIterator<Item = CodeHandle>,
    {
        let count = graph.code_count();
        let bitmap = handles
            .into_iter()
            .filter(|h| h.index() < count)
            .map(CodeHandle::raw)
            .collect();
        Self { bitmap, graph }
    }

    /// Returns the graph this set indexes into.
    pub fn graph(&self) -> &SharedOntology {
        &self.graph
    }

    /// Inserts a code by identifier.
    ///
    /// Returns `true` if the code was newly inserted, `false` if it was
    /// already present or is not in the graph.
    pub fn insert(&mut self, identifier: &str) -> bool {
        match self.graph.registry().get_handle(identifier) {
            Some(handle) => self.bitmap.insert(handle.raw()),
            None => false,
        }
    }

    /// Removes a code by identifier.
    ///
    /// Returns `true` if the code was present, `false` otherwise.
    pub fn remove(&mut self, identifier: &str) -> bool {
        match self.graph.registry().get_handle(identifier) {
            Some(handle) => self.bitmap.remove(handle.raw()),
            None => false,
        }
    }

    /// Checks if a code is in the set.
    #[inline]
    pub fn contains(&self, identifier: &str) -> bool {
        self.graph
            .registry()
            .get_handle(identifier)
            .is_some_and(|handle| self.bitmap.contains(handle.raw()))
    }

    /// Checks if a handle is in the set.
    #[inline]
    pub fn contains_handle(&self, handle: CodeHandle) -> bool {
        self.bitmap.contains(handle.raw())
    }

    /// Returns the number of codes in the set.
    #[inline]
    pub fn len(&self) -> usize {
        self.bitmap.len() as usize
    }

    /// Returns true if the set is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bitmap.is_empty()
    }

    fn check_same_graph(&self, other: &Self) -> OptimizerResult<()> {
        if Arc::ptr_eq(&self.graph, &other.graph) {
            Ok(())
        } else {
            Err(OptimizerError::GraphMismatch)
        }
    }

    /// Computes intersection (AND) - returns a new set.
    ///
    /// # Errors
    ///
    /// [`OptimizerError::GraphMismatch`] if the sets index different graphs.
    pub fn intersection(&self, other: &Self) -> OptimizerResult<Self> {
        self.check_same_graph(other)?;
        Ok(Self {
            bitmap: &self.bitmap & &other.bitmap,
            graph: self.graph.clone(),
        })
    }

    /// Computes union (OR) - returns a new set.
    ///
    /// # Errors
    ///
    /// [`OptimizerError::GraphMismatch`] if the sets index different graphs.
    pub fn union(&self, other: &Self) -> OptimizerResult<Self> {
        self.check_same_graph(other)?;
        Ok(Self {
            bitmap: &self.bitmap | &other.bitmap,
            graph: self.graph.clone(),
        })
    }

    /// Computes difference (MINUS) - returns a new set.
    ///
    /// # Errors
    ///
    /// [`OptimizerError::GraphMismatch`] if the sets index different graphs.
    pub fn difference(&self, other: &Self) -> OptimizerResult<Self> {
        self.check_same_graph(other)?;
        Ok(Self {
            bitmap: &self.bitmap - &other.bitmap,
            graph: self.graph.clone(),
        })
    }

    /// Computes union in-place (modifies self).
    pub fn or_inplace(&mut self, other: &Self) -> OptimizerResult<()> {
        self.check_same_graph(other)?;
        self.bitmap |= &other.bitmap;
        Ok(())
    }

    /// Returns this set together with every ancestor of its members.
    ///
    /// This is exactly the set of codes that pruning to this set retains.
    pub fn with_ancestors(&self) -> Self {
        let traverser = HierarchyTraverser::new(&*self.graph);
        let mut bitmap = self.bitmap.clone();
        for raw in &self.bitmap {
            bitmap.extend(
                traverser
                    .ancestors(CodeHandle::new(raw))
                    .into_iter()
                    .map(CodeHandle::raw),
            );
        }
        Self {
            bitmap,
            graph: self.graph.clone(),
        }
    }

    /// Returns an iterator over handles in ascending order.
    pub fn handles(&self) -> impl Iterator<Item = CodeHandle> + '_ {
        self.bitmap.iter().map(CodeHandle::new)
    }

    /// Returns an iterator over identifiers in handle order.
    pub fn identifiers(&self) -> impl Iterator<Item = &str> + '_ {
        self.bitmap
            .iter()
            .filter_map(|raw| self.graph.identifier_of(CodeHandle::new(raw)).ok())
    }

    /// Returns the serialized size in bytes.
    pub fn serialized_size(&self) -> usize {
        self.bitmap.serialized_size()
    }

    /// Returns approximate memory usage in bytes.
    pub fn memory_size(&self) -> usize {
        self.serialized_size() + std::mem::size_of::<Self>()
    }

    /// Serializes the bitmap to a byte vector.
    ///
    /// Handles are only meaningful against the same graph, so the bytes
    /// should be stored next to the graph's artifact.
    pub fn serialize(&self) -> OptimizerResult<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.serialized_size());
        self.bitmap
            .serialize_into(&mut buf)
            .map_err(|e| OptimizerError::InvalidCodeSet(e.to_string()))?;
        Ok(buf)
    }

    /// Deserializes a set from bytes.
    ///
    /// # Errors
    ///
    /// [`OptimizerError::InvalidCodeSet`] if the bytes are not a valid
    /// bitmap or reference handles outside the graph.
    pub fn deserialize(bytes: &[u8], graph: SharedOntology) -> OptimizerResult<Self> {
        let bitmap = RoaringBitmap::deserialize_from(bytes)
            .map_err(|e| OptimizerError::InvalidCodeSet(format!("failed to read bitmap: {e}")))?;
        if let Some(max) = bitmap.max() {
            if max as usize >= graph.code_count() {
                return Err(OptimizerError::InvalidCodeSet(format!(
                    "handle {} is outside a graph of {} codes",
                    max,
                    graph.code_count()
                )));
            }
        }
        Ok(Self { bitmap, graph })
    }

    /// Returns a reference to the underlying bitmap (for advanced use).
    pub fn as_bitmap(&self) -> &RoaringBitmap {
        &self.bitmap
    }
}

impl std::fmt::Debug for CodeBitSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodeBitSet")
            .field("len", &self.len())
            .field("serialized_size", &self.serialized_size())
            .finish()
    }
}
