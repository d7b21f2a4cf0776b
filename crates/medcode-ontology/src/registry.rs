//! Code registry mapping identifiers to dense handles.

use hashbrown::HashMap;

use crate::config::DescriptionPolicy;
use crate::error::{OntologyError, OntologyResult};
use crate::handle::CodeHandle;

/// Registry that maps between string identifiers and compact handles.
///
/// Vocabulary identifiers such as `"ATC/A02B"` are long strings; the graph
/// indexes everything by a dense `u32` handle instead. The registry holds
/// both directions of the mapping and each code's description.
///
/// # Example
///
/// ```rust
/// use medcode_ontology::{CodeRegistry, DescriptionPolicy};
///
/// let mut registry = CodeRegistry::new();
/// let handle = registry
///     .register("ATC/A02B", Some("Drugs for peptic ulcer"), DescriptionPolicy::Reject)
///     .unwrap();
///
/// assert_eq!(registry.identifier_of(handle).unwrap(), "ATC/A02B");
/// assert_eq!(registry.description_of(handle), Some("Drugs for peptic ulcer"));
/// ```
#[derive(Clone, Default)]
pub struct CodeRegistry {
    /// Identifier -> handle mapping.
    handles: HashMap<String, CodeHandle>,
    /// Handle -> identifier mapping.
    identifiers: Vec<String>,
    /// Handle -> description.
    descriptions: Vec<Option<String>>,
}

impl CodeRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            handles: HashMap::with_capacity(capacity),
            identifiers: Vec::with_capacity(capacity),
            descriptions: Vec::with_capacity(capacity),
        }
    }

    /// Registers an identifier and returns its handle.
    ///
    /// If the identifier is already registered the existing handle is
    /// returned, after reconciling the description under `policy`.
    pub fn register(
        &mut self,
        identifier: &str,
        description: Option<&str>,
        policy: DescriptionPolicy,
    ) -> OntologyResult<CodeHandle> {
        if let Some(&handle) = self.handles.get(identifier) {
            if let Some(incoming) = description {
                self.reconcile(handle, incoming, policy)?;
            }
            return Ok(handle);
        }

        self.check_capacity(1)?;
        let handle = CodeHandle::new(self.identifiers.len() as u32);
        self.handles.insert(identifier.to_string(), handle);
        self.identifiers.push(identifier.to_string());
        self.descriptions.push(description.map(str::to_string));
        Ok(handle)
    }

    /// Checks whether [`register`](Self::register) would accept a
    /// description without changing anything.
    pub fn check_description(
        &self,
        identifier: &str,
        description: Option<&str>,
        policy: DescriptionPolicy,
    ) -> OntologyResult<()> {
        let (Some(&handle), Some(incoming)) = (self.handles.get(identifier), description) else {
            return Ok(());
        };
        match self.descriptions[handle.index()].as_deref() {
            Some(existing) if existing != incoming && policy == DescriptionPolicy::Reject => {
                Err(OntologyError::DuplicateConflict {
                    code: identifier.to_string(),
                    existing: existing.to_string(),
                    incoming: incoming.to_string(),
                })
            }
            _ => Ok(()),
        }
    }

    /// Checks that `additional` new codes still fit in the handle space.
    pub fn check_capacity(&self, additional: usize) -> OntologyResult<()> {
        let limit = u32::MAX as usize + 1;
        match self.identifiers.len().checked_add(additional) {
            Some(total) if total <= limit => Ok(()),
            _ => Err(OntologyError::corrupt(
                "code registry exceeds u32 handle space",
            )),
        }
    }

    /// Overlays an externally supplied description onto a code.
    ///
    /// Codes that only exist in the metadata source are created.
    pub fn merge_metadata(
        &mut self,
        identifier: &str,
        description: &str,
        policy: DescriptionPolicy,
    ) -> OntologyResult<CodeHandle> {
        self.register(identifier, Some(description), policy)
    }

    fn reconcile(
        &mut self,
        handle: CodeHandle,
        incoming: &str,
        policy: DescriptionPolicy,
    ) -> OntologyResult<()> {
        let slot = &mut self.descriptions[handle.index()];
        match slot {
            None => *slot = Some(incoming.to_string()),
            Some(existing) if existing == incoming => {}
            Some(existing) => match policy {
                DescriptionPolicy::Overwrite => *existing = incoming.to_string(),
                DescriptionPolicy::KeepFirst => {
                    tracing::debug!(
                        code = %self.identifiers[handle.index()],
                        "keeping first description, dropping {:?}",
                        incoming
                    );
                }
                DescriptionPolicy::Reject => {
                    return Err(OntologyError::DuplicateConflict {
                        code: self.identifiers[handle.index()].clone(),
                        existing: existing.clone(),
                        incoming: incoming.to_string(),
                    });
                }
            },
        }
        Ok(())
    }

    /// Appends a code that is known not to be registered yet.
    ///
    /// Used when rebuilding from an already consistent registry.
    pub(crate) fn push_unchecked(
        &mut self,
        identifier: &str,
        description: Option<&str>,
    ) -> CodeHandle {
        let handle = CodeHandle::new(self.identifiers.len() as u32);
        self.handles.insert(identifier.to_string(), handle);
        self.identifiers.push(identifier.to_string());
        self.descriptions.push(description.map(str::to_string));
        handle
    }

    /// Gets the handle for an identifier.
    pub fn handle_of(&self, identifier: &str) -> OntologyResult<CodeHandle> {
        self.get_handle(identifier)
            .ok_or_else(|| OntologyError::UnknownCode(identifier.to_string()))
    }

    /// Gets the handle for an identifier, or `None` if unregistered.
    #[inline]
    pub fn get_handle(&self, identifier: &str) -> Option<CodeHandle> {
        self.handles.get(identifier).copied()
    }

    /// Gets the identifier for a handle.
    pub fn identifier_of(&self, handle: CodeHandle) -> OntologyResult<&str> {
        self.identifiers
            .get(handle.index())
            .map(String::as_str)
            .ok_or(OntologyError::InvalidHandle(handle))
    }

    /// Gets the description of a code, if it has one.
    ///
    /// Returns `None` for codes without a description and for handles
    /// outside the registry.
    #[inline]
    pub fn description_of(&self, handle: CodeHandle) -> Option<&str> {
        self.descriptions
            .get(handle.index())
            .and_then(|d| d.as_deref())
    }

    /// Returns the number of registered codes.
    #[inline]
    pub fn len(&self) -> usize {
        self.identifiers.len()
    }

    /// Returns true if the registry is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.identifiers.is_empty()
    }

    /// Returns true if the identifier is registered.
    #[inline]
    pub fn contains(&self, identifier: &str) -> bool {
        self.handles.contains_key(identifier)
    }

    /// Returns true if the handle is within the registered range.
    #[inline]
    pub fn is_valid(&self, handle: CodeHandle) -> bool {
        handle.index() < self.identifiers.len()
    }

    /// Returns an iterator over all handles in ascending order.
    pub fn handles(&self) -> impl Iterator<Item = CodeHandle> + '_ {
        (0..self.identifiers.len() as u32).map(CodeHandle::new)
    }

    /// Returns an iterator over (handle, identifier) pairs in handle order.
    pub fn iter(&self) -> impl Iterator<Item = (CodeHandle, &str)> + '_ {
        self.identifiers
            .iter()
            .enumerate()
            .map(|(i, id)| (CodeHandle::new(i as u32), id.as_str()))
    }

    /// Returns estimated memory usage in bytes.
    pub fn memory_size(&self) -> usize {
        let text: usize = self.identifiers.iter().map(|id| id.len() * 2).sum::<usize>()
            + self
                .descriptions
                .iter()
                .flatten()
                .map(String::len)
                .sum::<usize>();
        let hashmap_size = self.handles.capacity() * (24 + 4 + 8);
        let vec_size = self.identifiers.capacity() * 24 + self.descriptions.capacity() * 24;
        text + hashmap_size + vec_size + std::mem::size_of::<Self>()
    }
}

impl PartialEq for CodeRegistry {
    fn eq(&self, other: &Self) -> bool {
        self.identifiers == other.identifiers && self.descriptions == other.descriptions
    }
}

impl Eq for CodeRegistry {}

impl std::fmt::Debug for CodeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodeRegistry")
            .field("len", &self.len())
            .field("memory_size", &self.memory_size())
            .finish()
    }
}
