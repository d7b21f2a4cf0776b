//! Dense integer handles for registered codes.

use serde::{Deserialize, Serialize};

/// Compact surrogate for a registered code identifier.
///
/// Handles are assigned densely from zero in registration order, so they
/// double as indices into the registry and edge store. They are only
/// meaningful for the graph that issued them: pruning and reloading both
/// renumber, and the string identifier is the stable public key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CodeHandle(u32);

impl CodeHandle {
    /// Creates a handle from a raw index.
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw value.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Returns the handle as a slice index.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for CodeHandle {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl std::fmt::Display for CodeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Returns the vocabulary prefix of an identifier (text before the first `/`).
///
/// Identifiers without a separator are their own vocabulary.
///
/// ```rust
/// use medcode_ontology::vocabulary_of;
///
/// assert_eq!(vocabulary_of("ATC/A02BX71"), "ATC");
/// assert_eq!(vocabulary_of("Visit"), "Visit");
/// ```
pub fn vocabulary_of(identifier: &str) -> &str {
    identifier
        .split_once('/')
        .map(|(vocabulary, _)| vocabulary)
        .unwrap_or(identifier)
}
