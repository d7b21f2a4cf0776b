//! JSON sidecar describing a saved ontology artifact.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use crate::error::{OntologyError, OntologyResult};
use crate::graph::OntologyGraph;
use crate::pruner::PruneStats;

/// Manifest for a saved ontology artifact.
///
/// Records where the graph came from, when it was written, and the
/// checksum of its payload so a deployment can check that an artifact
/// matches the manifest shipped next to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OntologyManifest {
    /// Vocabulary release label, e.g. `"athena-2024-02"`.
    pub source_release: String,
    /// Timestamp when the artifact was written.
    pub saved_at: DateTime<Utc>,
    /// Version of the crate that wrote the artifact.
    pub writer_version: String,
    /// Number of codes in the graph.
    pub code_count: usize,
    /// Number of edges in the graph.
    pub edge_count: usize,
    /// Hex SHA-256 of the artifact payload.
    pub payload_sha256: String,
    /// Pruning summary, when the graph is a pruned view.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prune_stats: Option<PruneStats>,
}

impl OntologyManifest {
    /// Creates a manifest for a graph and its serialized artifact.
    pub fn new(source_release: &str, graph: &OntologyGraph, artifact: &[u8]) -> OntologyResult<Self> {
        Ok(Self {
            source_release: source_release.to_string(),
            saved_at: Utc::now(),
            writer_version: env!("CARGO_PKG_VERSION").to_string(),
            code_count: graph.code_count(),
            edge_count: graph.edge_count(),
            payload_sha256: super::artifact_checksum(artifact)?,
            prune_stats: None,
        })
    }

    /// Attaches the stats of the prune that produced the graph.
    pub fn with_prune_stats(mut self, stats: PruneStats) -> Self {
        self.prune_stats = Some(stats);
        self
    }

    /// Checks that an artifact matches this manifest.
    ///
    /// # Errors
    ///
    /// [`OntologyError::CorruptData`] if the artifact is damaged or its
    /// checksum differs from the recorded one.
    pub fn verify(&self, artifact: &[u8]) -> OntologyResult<()> {
        let actual = super::artifact_checksum(artifact)?;
        if actual != self.payload_sha256 {
            return Err(OntologyError::corrupt(format!(
                "artifact checksum {} does not match manifest {}",
                actual, self.payload_sha256
            )));
        }
        Ok(())
    }

    /// Saves the manifest to a JSON file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> OntologyResult<()> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| OntologyError::io(path, e))?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)
            .map_err(|e| OntologyError::Serialization(e.to_string()))?;
        Ok(())
    }

    /// Loads a manifest from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> OntologyResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| OntologyError::io(path, e))?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader)
            .map_err(|e| OntologyError::corrupt(format!("invalid manifest: {e}")))
    }
}

impl std::fmt::Display for OntologyManifest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Ontology Manifest")?;
        writeln!(f, "  Source Release:  {}", self.source_release)?;
        writeln!(f, "  Saved:           {}", self.saved_at)?;
        writeln!(f, "  Writer:          {}", self.writer_version)?;
        writeln!(f, "  Codes:           {}", self.code_count)?;
        writeln!(f, "  Edges:           {}", self.edge_count)?;
        writeln!(f, "  SHA-256:         {}", self.payload_sha256)?;
        if let Some(stats) = &self.prune_stats {
            writeln!(f, "  Pruned:          {} -> {} codes", stats.original_codes, stats.retained_codes)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::VocabularyRecord;
    use crate::persistence::serialize;
    use tempfile::tempdir;

    fn create_graph() -> OntologyGraph {
        OntologyGraph::from_records(vec![
            VocabularyRecord::new("ICD10CM/E11", Some("Type 2 diabetes mellitus"), &[]),
            VocabularyRecord::new("ICD10CM/E11.9", None, &["ICD10CM/E11"]),
        ])
        .unwrap()
    }

    #[test]
    fn test_manifest_creation() {
        let graph = create_graph();
        let bytes = serialize(&graph).unwrap();
        let manifest = OntologyManifest::new("athena-2024-02", &graph, &bytes).unwrap();

        assert_eq!(manifest.source_release, "athena-2024-02");
        assert_eq!(manifest.code_count, 2);
        assert_eq!(manifest.edge_count, 1);
        assert_eq!(manifest.payload_sha256.len(), 64);
        assert!(manifest.prune_stats.is_none());
        manifest.verify(&bytes).unwrap();
    }

    #[test]
    fn test_verify_detects_other_artifact() {
        let graph = create_graph();
        let bytes = serialize(&graph).unwrap();
        let manifest = OntologyManifest::new("athena-2024-02", &graph, &bytes).unwrap();

        let pruned = graph.prune(["ICD10CM/E11"]).graph;
        let other = serialize(&pruned).unwrap();
        assert!(matches!(
            manifest.verify(&other),
            Err(OntologyError::CorruptData { .. })
        ));
    }

    #[test]
    fn test_save_and_load() {
        let graph = create_graph();
        let outcome = graph.prune(["ICD10CM/E11.9"]);
        let bytes = serialize(&outcome.graph).unwrap();
        let manifest = OntologyManifest::new("athena-2024-02", &outcome.graph, &bytes)
            .unwrap()
            .with_prune_stats(outcome.stats);

        let dir = tempdir().unwrap();
        let path = dir.path().join("manifest.json");

        manifest.save(&path).unwrap();
        let loaded = OntologyManifest::load(&path).unwrap();

        assert_eq!(loaded, manifest);
        assert_eq!(loaded.prune_stats.as_ref().unwrap().retained_codes, 2);
        assert!(loaded.to_string().contains("athena-2024-02"));
    }
}
