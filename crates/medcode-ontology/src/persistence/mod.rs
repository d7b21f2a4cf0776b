//! Save/load ontology graphs to/from a single portable artifact.
//!
//! A full vocabulary takes a while to build and a pruned one is tied to a
//! dataset, so both are worth keeping on disk. The artifact is read as one
//! unit: any inconsistency rejects the whole file and no partially loaded
//! graph is ever returned.
//!
//! # File Format
//!
//! The ontology file format (`.mcog`) is a binary format:
//!
//! ```text
//! [4 bytes]  Magic: "MCOG"
//! [4 bytes]  Version (u32 LE)
//! [32 bytes] SHA-256 hash of the payload
//! [8 bytes]  Payload length (u64 LE)
//! [var]      Payload: bincode-encoded snapshot
//! ```
//!
//! The snapshot lists codes in handle order and, per code, the handles of
//! its direct parents. Child lists are rebuilt on load.
//!
//! # Example
//!
//! ```ignore
//! use medcode_ontology::persistence;
//!
//! let pruned = graph.prune(&used_codes).graph;
//! persistence::save(&pruned, "ontology.mcog")?;
//!
//! let loaded = persistence::load("ontology.mcog")?;
//! assert_eq!(loaded.all_parents("ATC/A02BX71")?, pruned.all_parents("ATC/A02BX71")?);
//! ```

mod manifest;

pub use manifest::OntologyManifest;

use std::borrow::Cow;
use std::path::Path;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::OntologyConfig;
use crate::edges::EdgeStore;
use crate::error::{OntologyError, OntologyResult};
use crate::graph::OntologyGraph;
use crate::handle::CodeHandle;
use crate::registry::CodeRegistry;

/// Magic bytes for ontology files.
const ONTOLOGY_MAGIC: &[u8; 4] = b"MCOG";

/// Current ontology file format version.
const ONTOLOGY_VERSION: u32 = 1;

/// Bytes before the payload.
const HEADER_LEN: usize = 4 + 4 + 32 + 8;

#[derive(Serialize, Deserialize)]
struct GraphSnapshot<'a> {
    codes: Vec<SnapshotCode<'a>>,
    parents: Vec<Vec<u32>>,
}

#[derive(Serialize, Deserialize)]
struct SnapshotCode<'a> {
    identifier: Cow<'a, str>,
    description: Option<Cow<'a, str>>,
}

impl<'a> GraphSnapshot<'a> {
    fn capture(graph: &'a OntologyGraph) -> Self {
        let codes = graph
            .registry()
            .iter()
            .map(|(handle, identifier)| SnapshotCode {
                identifier: Cow::Borrowed(identifier),
                description: graph.description_of(handle).map(Cow::Borrowed),
            })
            .collect();
        let parents = graph
            .registry()
            .handles()
            .map(|h| graph.parents_of(h).iter().map(|p| p.raw()).collect())
            .collect();
        Self { codes, parents }
    }

    /// Rebuilds a graph, validating every structural invariant.
    fn restore(self, config: OntologyConfig) -> OntologyResult<OntologyGraph> {
        if self.codes.len() != self.parents.len() {
            return Err(OntologyError::corrupt(format!(
                "{} codes but {} parent lists",
                self.codes.len(),
                self.parents.len()
            )));
        }
        let node_count = self.codes.len();
        if u32::try_from(node_count).is_err() {
            return Err(OntologyError::corrupt("code count exceeds handle space"));
        }

        let mut registry = CodeRegistry::with_capacity(node_count);
        for code in &self.codes {
            if registry.contains(&code.identifier) {
                return Err(OntologyError::corrupt(format!(
                    "duplicate identifier {}",
                    code.identifier
                )));
            }
            registry.push_unchecked(&code.identifier, code.description.as_deref());
        }

        let mut edges = EdgeStore::with_nodes(node_count);
        for (child, parents) in self.parents.iter().enumerate() {
            let child = CodeHandle::new(child as u32);
            for &parent in parents {
                match edges.add_edge(CodeHandle::new(parent), child) {
                    Ok(true) => {}
                    Ok(false) => {
                        return Err(OntologyError::corrupt(format!(
                            "duplicate edge {parent} -> {child}"
                        )))
                    }
                    Err(err) => {
                        return Err(OntologyError::corrupt(format!(
                            "invalid edge {parent} -> {child}: {err}"
                        )))
                    }
                }
            }
        }

        Ok(OntologyGraph::from_parts(registry, edges, config))
    }
}

/// Serializes a graph into a self-validating byte sequence.
///
/// The encoding is deterministic: equal graphs produce equal bytes.
pub fn serialize(graph: &OntologyGraph) -> OntologyResult<Vec<u8>> {
    let snapshot = GraphSnapshot::capture(graph);
    let payload = bincode::serde::encode_to_vec(&snapshot, bincode::config::standard())
        .map_err(|e| OntologyError::Serialization(e.to_string()))?;

    let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len());
    bytes.extend_from_slice(ONTOLOGY_MAGIC);
    bytes.extend_from_slice(&ONTOLOGY_VERSION.to_le_bytes());
    bytes.extend_from_slice(&payload_hash(&payload));
    bytes.extend_from_slice(&(payload.len() as u64).to_le_bytes());
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

/// Deserializes a graph with the default configuration.
pub fn deserialize(bytes: &[u8]) -> OntologyResult<OntologyGraph> {
    deserialize_with_config(bytes, OntologyConfig::default())
}

/// Deserializes a graph, attaching the given configuration.
///
/// # Errors
///
/// [`OntologyError::CorruptData`] if the header, checksum, payload or any
/// structural invariant is invalid.
pub fn deserialize_with_config(
    bytes: &[u8],
    config: OntologyConfig,
) -> OntologyResult<OntologyGraph> {
    let payload = verified_payload(bytes)?;

    let (snapshot, consumed): (GraphSnapshot<'static>, usize) =
        bincode::serde::decode_from_slice(payload, bincode::config::standard())
            .map_err(|e| OntologyError::corrupt(format!("payload decode failed: {e}")))?;
    if consumed != payload.len() {
        return Err(OntologyError::corrupt(format!(
            "{} trailing payload bytes",
            payload.len() - consumed
        )));
    }

    snapshot.restore(config)
}

/// Checks the header and checksum, returning the payload slice.
fn verified_payload(bytes: &[u8]) -> OntologyResult<&[u8]> {
    if bytes.len() < HEADER_LEN {
        return Err(OntologyError::corrupt(format!(
            "artifact is {} bytes, shorter than the {} byte header",
            bytes.len(),
            HEADER_LEN
        )));
    }
    let (header, payload) = bytes.split_at(HEADER_LEN);

    if &header[0..4] != ONTOLOGY_MAGIC {
        return Err(OntologyError::corrupt("invalid magic bytes"));
    }

    let mut version_bytes = [0u8; 4];
    version_bytes.copy_from_slice(&header[4..8]);
    let version = u32::from_le_bytes(version_bytes);
    if version != ONTOLOGY_VERSION {
        return Err(OntologyError::corrupt(format!(
            "unsupported version: {} (expected {})",
            version, ONTOLOGY_VERSION
        )));
    }

    let mut len_bytes = [0u8; 8];
    len_bytes.copy_from_slice(&header[40..48]);
    let declared = u64::from_le_bytes(len_bytes);
    if declared != payload.len() as u64 {
        return Err(OntologyError::corrupt(format!(
            "payload length mismatch: header says {}, found {}",
            declared,
            payload.len()
        )));
    }

    let actual = payload_hash(payload);
    if header[8..40] != actual {
        return Err(OntologyError::corrupt(format!(
            "checksum mismatch: expected {}, got {}",
            hex::encode(&header[8..40]),
            hex::encode(&actual)
        )));
    }

    Ok(payload)
}

/// Computes the SHA-256 of a payload.
fn payload_hash(payload: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(payload);
    hasher.finalize().into()
}

/// Returns the hex checksum stored in a serialized artifact's header.
pub fn artifact_checksum(bytes: &[u8]) -> OntologyResult<String> {
    let payload = verified_payload(bytes)?;
    Ok(hex::encode(&payload_hash(payload)))
}

/// Saves a graph to a file.
///
/// The artifact is written next to the target and renamed into place, so
/// readers see either the previous file or the complete new one.
pub fn save<P: AsRef<Path>>(graph: &OntologyGraph, path: P) -> OntologyResult<()> {
    let path = path.as_ref();
    let _span = tracing::info_span!("save", path = %path.display()).entered();
    let started = Instant::now();

    let bytes = serialize(graph)?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = std::path::PathBuf::from(tmp);

    std::fs::write(&tmp, &bytes).map_err(|e| OntologyError::io(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| OntologyError::io(path, e))?;

    tracing::info!(
        codes = graph.code_count(),
        edges = graph.edge_count(),
        bytes = bytes.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "saved ontology artifact"
    );
    Ok(())
}

/// Loads a graph from a file.
pub fn load<P: AsRef<Path>>(path: P) -> OntologyResult<OntologyGraph> {
    load_with_config(path, OntologyConfig::default())
}

/// Loads a graph from a file, attaching the given configuration.
pub fn load_with_config<P: AsRef<Path>>(
    path: P,
    config: OntologyConfig,
) -> OntologyResult<OntologyGraph> {
    let path = path.as_ref();
    let _span = tracing::info_span!("load", path = %path.display()).entered();
    let started = Instant::now();

    let bytes = std::fs::read(path).map_err(|e| OntologyError::io(path, e))?;
    let graph = deserialize_with_config(&bytes, config)?;

    tracing::info!(
        codes = graph.code_count(),
        edges = graph.edge_count(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "loaded ontology artifact"
    );
    Ok(graph)
}

/// Helper module for hex encoding.
mod hex {
    pub fn encode(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }
}
