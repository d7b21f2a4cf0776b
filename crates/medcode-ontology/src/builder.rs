//! Single-writer construction of an ontology graph.
//!
//! A vocabulary loader feeds [`VocabularyRecord`]s into an
//! [`OntologyBuilder`], an optional metadata source overlays descriptions,
//! and [`OntologyBuilder::build`] publishes the immutable graph. Each record
//! is ingested whole or not at all. Any error returned while feeding the
//! builder should still abort the load: drop the builder rather than build.
//!
//! # Example
//!
//! ```rust
//! use medcode_ontology::{OntologyBuilder, VocabularyRecord};
//!
//! let mut builder = OntologyBuilder::new();
//! builder.add_record(VocabularyRecord::new("ATC/A02", Some("Drugs for acid disorders"), &[]))?;
//! builder.add_record(VocabularyRecord::new("ATC/A02B", None, &["ATC/A02"]))?;
//! builder.merge_metadata("ATC/A02B", "Drugs for peptic ulcer and GORD")?;
//!
//! let graph = builder.build();
//! assert_eq!(graph.code_count(), 2);
//! # Ok::<(), medcode_ontology::OntologyError>(())
//! ```

use std::collections::HashSet;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::config::OntologyConfig;
use crate::edges::EdgeStore;
use crate::error::{OntologyError, OntologyResult};
use crate::graph::OntologyGraph;
use crate::handle::CodeHandle;
use crate::registry::CodeRegistry;

/// One entry supplied by a vocabulary source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabularyRecord {
    /// Stable code identifier, e.g. `"ICD10CM/E11.9"`.
    pub identifier: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: Option<String>,
    /// Identifiers of the direct parents.
    #[serde(default)]
    pub parents: Vec<String>,
}

impl VocabularyRecord {
    /// Creates a record from borrowed parts.
    pub fn new(identifier: &str, description: Option<&str>, parents: &[&str]) -> Self {
        Self {
            identifier: identifier.to_string(),
            description: description.map(str::to_string),
            parents: parents.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// Mutable construction phase of an [`OntologyGraph`].
pub struct OntologyBuilder {
    registry: CodeRegistry,
    edges: EdgeStore,
    config: OntologyConfig,
    started: Instant,
}

impl Default for OntologyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl OntologyBuilder {
    /// Creates a builder with the default configuration.
    pub fn new() -> Self {
        Self::with_config(OntologyConfig::default())
    }

    /// Creates a builder with a custom configuration.
    pub fn with_config(config: OntologyConfig) -> Self {
        let capacity = config.expected_codes.unwrap_or(0);
        Self {
            registry: CodeRegistry::with_capacity(capacity),
            edges: EdgeStore::with_nodes(0),
            config,
            started: Instant::now(),
        }
    }

    /// Registers a code, returning the existing handle for known identifiers.
    ///
    /// Conflicting descriptions follow `registration_policy`.
    pub fn register(
        &mut self,
        identifier: &str,
        description: Option<&str>,
    ) -> OntologyResult<CodeHandle> {
        let handle =
            self.registry
                .register(identifier, description, self.config.registration_policy)?;
        self.edges.ensure_nodes(self.registry.len());
        Ok(handle)
    }

    /// Overlays a metadata description, creating the code if needed.
    ///
    /// Conflicts with the vocabulary description follow `overlay_policy`.
    pub fn merge_metadata(
        &mut self,
        identifier: &str,
        description: &str,
    ) -> OntologyResult<CodeHandle> {
        let handle =
            self.registry
                .merge_metadata(identifier, description, self.config.overlay_policy)?;
        self.edges.ensure_nodes(self.registry.len());
        Ok(handle)
    }

    /// Overlays every (identifier, description) pair from a metadata source.
    pub fn merge_metadata_all<I, K, V>(&mut self, entries: I) -> OntologyResult<usize>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut merged = 0;
        for (identifier, description) in entries {
            self.merge_metadata(identifier.as_ref(), description.as_ref())?;
            merged += 1;
        }
        tracing::debug!(merged, "merged metadata overlay");
        Ok(merged)
    }

    /// Adds a parent -> child edge between registered handles.
    pub fn add_edge(&mut self, parent: CodeHandle, child: CodeHandle) -> OntologyResult<bool> {
        self.edges.add_edge(parent, child).map_err(|err| match err {
            OntologyError::SelfLoop { .. } => OntologyError::SelfLoop {
                code: self
                    .registry
                    .identifier_of(parent)
                    .map(str::to_string)
                    .unwrap_or_else(|_| parent.to_string()),
            },
            other => other,
        })
    }

    /// Adds a parent -> child edge between registered identifiers.
    pub fn add_edge_by_id(&mut self, parent: &str, child: &str) -> OntologyResult<bool> {
        let parent = self.registry.handle_of(parent)?;
        let child = self.registry.handle_of(child)?;
        self.add_edge(parent, child)
    }

    /// Ingests one vocabulary record.
    ///
    /// Parents that have not been seen yet are registered without a
    /// description; a later record for them fills it in. A rejected record
    /// leaves the builder exactly as it was.
    pub fn add_record(&mut self, record: VocabularyRecord) -> OntologyResult<CodeHandle> {
        self.ingest(&record)
            .map_err(|err| err.in_record(record.identifier.as_str()))
    }

    fn ingest(&mut self, record: &VocabularyRecord) -> OntologyResult<CodeHandle> {
        self.validate(record)?;

        let child = self.register(&record.identifier, record.description.as_deref())?;
        for parent in &record.parents {
            let parent = self.register(parent, None)?;
            self.add_edge(parent, child)?;
        }
        Ok(child)
    }

    /// Rejects a record before any of it is written.
    fn validate(&self, record: &VocabularyRecord) -> OntologyResult<()> {
        if record.parents.iter().any(|p| *p == record.identifier) {
            return Err(OntologyError::SelfLoop {
                code: record.identifier.clone(),
            });
        }
        self.registry.check_description(
            &record.identifier,
            record.description.as_deref(),
            self.config.registration_policy,
        )?;

        let mut unseen: HashSet<&str> = HashSet::new();
        for identifier in std::iter::once(&record.identifier).chain(&record.parents) {
            if !self.registry.contains(identifier) {
                unseen.insert(identifier.as_str());
            }
        }
        self.registry.check_capacity(unseen.len())
    }

    /// Ingests every record, stopping at the first failure.
    pub fn add_records<I>(&mut self, records: I) -> OntologyResult<usize>
    where
        I: IntoIterator<Item = VocabularyRecord>,
    {
        let mut count = 0;
        for record in records {
            self.add_record(record)?;
            count += 1;
        }
        Ok(count)
    }

    /// Returns the number of codes registered so far.
    pub fn code_count(&self) -> usize {
        self.registry.len()
    }

    /// Returns the number of edges added so far.
    pub fn edge_count(&self) -> usize {
        self.edges.edge_count()
    }

    /// Publishes the immutable graph.
    pub fn build(self) -> OntologyGraph {
        let graph = OntologyGraph::from_parts(self.registry, self.edges, self.config);
        tracing::info!(
            codes = graph.code_count(),
            edges = graph.edge_count(),
            elapsed_ms = self.started.elapsed().as_millis() as u64,
            "built ontology graph"
        );
        graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DescriptionPolicy;

    #[test]
    fn test_add_record_registers_parents() {
        let mut builder = OntologyBuilder::new();
        builder
            .add_record(VocabularyRecord::new("ATC/A02B", None, &["ATC/A02"]))
            .unwrap();
        assert_eq!(builder.code_count(), 2);
        assert_eq!(builder.edge_count(), 1);

        // The parent's own record fills in its description later
        builder
            .add_record(VocabularyRecord::new("ATC/A02", Some("Acid disorders"), &[]))
            .unwrap();

        let graph = builder.build();
        assert_eq!(graph.description("ATC/A02").unwrap(), Some("Acid disorders"));
        assert_eq!(graph.parents("ATC/A02B").unwrap(), vec!["ATC/A02"]);
    }

    #[test]
    fn test_self_loop_aborts_with_context() {
        let mut builder = OntologyBuilder::new();
        let err = builder
            .add_record(VocabularyRecord::new("ICD10CM/E11", None, &["ICD10CM/E11"]))
            .unwrap_err();

        match err {
            OntologyError::InvalidRecord { identifier, source } => {
                assert_eq!(identifier, "ICD10CM/E11");
                assert!(matches!(*source, OntologyError::SelfLoop { ref code } if code == "ICD10CM/E11"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_rejected_record_leaves_no_trace() {
        let mut builder = OntologyBuilder::new();
        builder
            .add_record(VocabularyRecord::new("ROOT", None, &[]))
            .unwrap();

        let err = builder
            .add_record(VocabularyRecord::new("X", None, &["ROOT", "X"]))
            .unwrap_err();
        assert!(matches!(err, OntologyError::InvalidRecord { .. }));
        assert_eq!(builder.code_count(), 1);
        assert_eq!(builder.edge_count(), 0);

        let graph = builder.build();
        assert_eq!(graph.code_count(), 1);
        assert_eq!(graph.edge_count(), 0);
        assert!(!graph.contains_code("X"));
        assert!(graph.children("ROOT").unwrap().is_empty());
    }

    #[test]
    fn test_conflicting_record_keeps_new_parents_out() {
        let mut builder = OntologyBuilder::new();
        builder
            .add_record(VocabularyRecord::new("ICD10CM/E11", Some("Type 2 diabetes"), &[]))
            .unwrap();

        let err = builder
            .add_record(VocabularyRecord::new(
                "ICD10CM/E11",
                Some("Diabetes mellitus type 2"),
                &["ICD10CM/E08-E13"],
            ))
            .unwrap_err();
        assert!(matches!(
            err,
            OntologyError::InvalidRecord { ref source, .. }
                if matches!(**source, OntologyError::DuplicateConflict { .. })
        ));

        let graph = builder.build();
        assert_eq!(graph.code_count(), 1);
        assert!(!graph.contains_code("ICD10CM/E08-E13"));
        assert_eq!(
            graph.description("ICD10CM/E11").unwrap(),
            Some("Type 2 diabetes")
        );
    }

    #[test]
    fn test_add_edge_invalid_handle() {
        let mut builder = OntologyBuilder::new();
        let a = builder.register("A", None).unwrap();

        assert!(matches!(
            builder.add_edge(a, CodeHandle::new(7)),
            Err(OntologyError::InvalidHandle(_))
        ));
        assert!(matches!(
            builder.add_edge_by_id("A", "B"),
            Err(OntologyError::UnknownCode(_))
        ));
        assert!(matches!(
            builder.add_edge(a, a),
            Err(OntologyError::SelfLoop { ref code }) if code == "A"
        ));
    }

    #[test]
    fn test_duplicate_edge_is_idempotent() {
        let mut builder = OntologyBuilder::new();
        builder
            .add_records(vec![
                VocabularyRecord::new("B", None, &["A", "A"]),
                VocabularyRecord::new("B", None, &["A"]),
            ])
            .unwrap();

        let graph = builder.build();
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.parents("B").unwrap(), vec!["A"]);
    }

    #[test]
    fn test_registration_conflict_rejected_by_default() {
        let mut builder = OntologyBuilder::new();
        builder
            .add_record(VocabularyRecord::new("A", Some("one"), &[]))
            .unwrap();
        let err = builder
            .add_record(VocabularyRecord::new("A", Some("two"), &[]))
            .unwrap_err();
        assert!(matches!(err, OntologyError::InvalidRecord { .. }));
    }

    #[test]
    fn test_metadata_overlay() {
        let config = OntologyConfig::builder()
            .with_overlay_policy(DescriptionPolicy::Overwrite)
            .build();
        let mut builder = OntologyBuilder::with_config(config);
        builder
            .add_record(VocabularyRecord::new("A", Some("vocab"), &[]))
            .unwrap();

        let merged = builder
            .merge_metadata_all([("A", "overlay"), ("LOCAL/X", "metadata only")])
            .unwrap();
        assert_eq!(merged, 2);

        let graph = builder.build();
        assert_eq!(graph.description("A").unwrap(), Some("overlay"));
        assert_eq!(graph.description("LOCAL/X").unwrap(), Some("metadata only"));
        assert!(graph.parents("LOCAL/X").unwrap().is_empty());
    }

    #[test]
    fn test_metadata_overlay_reject_policy() {
        let config = OntologyConfig::builder()
            .with_overlay_policy(DescriptionPolicy::Reject)
            .build();
        let mut builder = OntologyBuilder::with_config(config);
        builder
            .add_record(VocabularyRecord::new("A", Some("vocab"), &[]))
            .unwrap();

        assert!(matches!(
            builder.merge_metadata("A", "overlay"),
            Err(OntologyError::DuplicateConflict { .. })
        ));
    }

    #[test]
    fn test_record_deserializes_with_defaults() {
        let record: VocabularyRecord =
            serde_json::from_str(r#"{"identifier": "ATC/A02"}"#).unwrap();
        assert_eq!(record.description, None);
        assert!(record.parents.is_empty());
    }
}
