//! Configuration types for ontology construction and pruning.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// What to do when a code that already has a description is offered a
/// different one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DescriptionPolicy {
    /// Last write wins.
    #[default]
    Overwrite,
    /// The first description is kept and later ones are dropped.
    KeepFirst,
    /// Fail with [`DuplicateConflict`](crate::OntologyError::DuplicateConflict).
    Reject,
}

/// Configuration for building an ontology.
///
/// # Example
///
/// ```rust
/// use medcode_ontology::{DescriptionPolicy, OntologyConfig};
///
/// let config = OntologyConfig::builder()
///     .with_registration_policy(DescriptionPolicy::KeepFirst)
///     .with_overlay_policy(DescriptionPolicy::Overwrite)
///     .with_parallel(true)
///     .with_expected_codes(500_000)
///     .build();
///
/// assert_eq!(config.expected_codes, Some(500_000));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OntologyConfig {
    /// Policy for conflicting descriptions within the vocabulary source.
    pub registration_policy: DescriptionPolicy,
    /// Policy for metadata overlay descriptions that disagree with the vocabulary.
    pub overlay_policy: DescriptionPolicy,
    /// Collect ancestor closures in parallel while pruning (requires `parallel` feature).
    pub parallel: bool,
    /// Capacity hint for the number of codes.
    pub expected_codes: Option<usize>,
}

impl Default for OntologyConfig {
    fn default() -> Self {
        Self {
            registration_policy: DescriptionPolicy::Reject,
            overlay_policy: DescriptionPolicy::Overwrite,
            parallel: false,
            expected_codes: None,
        }
    }
}

impl OntologyConfig {
    /// Creates a new builder for OntologyConfig.
    pub fn builder() -> OntologyConfigBuilder {
        OntologyConfigBuilder::default()
    }
}

/// Builder for OntologyConfig.
#[derive(Debug, Clone, Default)]
pub struct OntologyConfigBuilder {
    config: OntologyConfig,
}

impl OntologyConfigBuilder {
    /// Sets the policy for conflicting vocabulary descriptions.
    pub fn with_registration_policy(mut self, policy: DescriptionPolicy) -> Self {
        self.config.registration_policy = policy;
        self
    }

    /// Sets the policy for metadata overlay conflicts.
    pub fn with_overlay_policy(mut self, policy: DescriptionPolicy) -> Self {
        self.config.overlay_policy = policy;
        self
    }

    /// Enables or disables parallel pruning.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.config.parallel = parallel;
        self
    }

    /// Sets the expected number of codes.
    pub fn with_expected_codes(mut self, expected_codes: usize) -> Self {
        self.config.expected_codes = Some(expected_codes);
        self
    }

    /// Builds the OntologyConfig.
    pub fn build(self) -> OntologyConfig {
        self.config
    }
}

/// Options for a pruning pass.
///
/// The default retains every used code and all of its ancestors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneOptions {
    /// Vocabularies whose codes survive only when used directly, never as
    /// mere ancestors of a used code.
    pub remove_vocabularies: HashSet<String>,
}

impl PruneOptions {
    /// Creates the default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops ancestor-only codes from the given vocabulary.
    pub fn remove_vocabulary(mut self, vocabulary: impl Into<String>) -> Self {
        self.remove_vocabularies.insert(vocabulary.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = OntologyConfig::default();
        assert_eq!(config.registration_policy, DescriptionPolicy::Reject);
        assert_eq!(config.overlay_policy, DescriptionPolicy::Overwrite);
        assert!(!config.parallel);
        assert!(config.expected_codes.is_none());
    }

    #[test]
    fn test_config_builder() {
        let config = OntologyConfig::builder()
            .with_registration_policy(DescriptionPolicy::Overwrite)
            .with_overlay_policy(DescriptionPolicy::Reject)
            .with_parallel(true)
            .build();

        assert_eq!(config.registration_policy, DescriptionPolicy::Overwrite);
        assert_eq!(config.overlay_policy, DescriptionPolicy::Reject);
        assert!(config.parallel);
    }

    #[test]
    fn test_policy_serde_names() {
        let json = serde_json::to_string(&DescriptionPolicy::KeepFirst).unwrap();
        assert_eq!(json, "\"keep_first\"");
    }

    #[test]
    fn test_prune_options() {
        let options = PruneOptions::new()
            .remove_vocabulary("Medicare Specialty")
            .remove_vocabulary("CMS Place of Service");
        assert_eq!(options.remove_vocabularies.len(), 2);
        assert!(PruneOptions::default().remove_vocabularies.is_empty());
    }
}
