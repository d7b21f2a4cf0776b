//! Integration tests for saving and loading ontology artifacts.

use medcode_ontology::persistence::{self, OntologyManifest};
use medcode_ontology::{OntologyBuilder, OntologyError, OntologyGraph, VocabularyRecord};
use tempfile::tempdir;

/// Graph whose children are registered out of handle order, so child
/// lists differ from a rebuilt graph's ordering.
fn create_graph() -> OntologyGraph {
    let mut builder = OntologyBuilder::new();
    builder
        .add_records(vec![
            VocabularyRecord::new("RxNorm/197361", Some("amlodipine 5 MG Oral Tablet"), &["RxNorm/17767"]),
            VocabularyRecord::new("RxNorm/17767", Some("amlodipine"), &["ATC/C08CA01"]),
            VocabularyRecord::new("ATC/C08CA01", Some("amlodipine"), &["ATC/C08CA"]),
            VocabularyRecord::new("ATC/C08CA", None, &["ATC/C08C"]),
            VocabularyRecord::new("ATC/C08C", None, &[]),
            VocabularyRecord::new("ATC/C08CA02", Some("felodipine"), &["ATC/C08CA"]),
        ])
        .unwrap();
    builder
        .merge_metadata("ATC/C08C", "Selective calcium channel blockers with mainly vascular effects")
        .unwrap();
    builder.build()
}

#[test]
fn test_round_trip_query_equivalence() {
    let graph = create_graph();
    let loaded = persistence::deserialize(&persistence::serialize(&graph).unwrap()).unwrap();

    assert_eq!(loaded.code_count(), graph.code_count());
    assert_eq!(loaded.edge_count(), graph.edge_count());
    for (_, identifier) in graph.registry().iter() {
        assert_eq!(loaded.description(identifier).unwrap(), graph.description(identifier).unwrap());
        assert_eq!(loaded.all_parents(identifier).unwrap(), graph.all_parents(identifier).unwrap());
        assert_eq!(loaded.all_children(identifier).unwrap(), graph.all_children(identifier).unwrap());
        assert_eq!(loaded.handle_of(identifier).unwrap(), graph.handle_of(identifier).unwrap());
    }
}

#[test]
fn test_pruned_graph_round_trips_exactly() {
    let graph = create_graph();
    let pruned = graph.prune(["RxNorm/197361"]).graph;

    let dir = tempdir().unwrap();
    let path = dir.path().join("pruned.mcog");
    persistence::save(&pruned, &path).unwrap();
    let loaded = persistence::load(&path).unwrap();

    assert_eq!(loaded, pruned);
    assert!(!loaded.contains_code("ATC/C08CA02"));
    assert_eq!(loaded.all_parents("RxNorm/197361").unwrap().len(), 4);
}

#[test]
fn test_manifest_alongside_artifact() {
    let graph = create_graph();
    let outcome = graph.prune(["ATC/C08CA02"]);

    let dir = tempdir().unwrap();
    let artifact = dir.path().join("ontology.mcog");
    let manifest_path = dir.path().join("ontology.json");

    persistence::save(&outcome.graph, &artifact).unwrap();
    let bytes = std::fs::read(&artifact).unwrap();
    OntologyManifest::new("test-release", &outcome.graph, &bytes)
        .unwrap()
        .with_prune_stats(outcome.stats)
        .save(&manifest_path)
        .unwrap();

    let manifest = OntologyManifest::load(&manifest_path).unwrap();
    manifest.verify(&std::fs::read(&artifact).unwrap()).unwrap();
    assert_eq!(manifest.code_count, 3);
}

#[test]
fn test_corrupt_file_on_disk() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("garbage.mcog");
    std::fs::write(&path, b"not an ontology artifact at all, just some text").unwrap();

    assert!(matches!(
        persistence::load(&path),
        Err(OntologyError::CorruptData { .. })
    ));
}

#[test]
fn test_save_overwrites_previous_artifact() {
    let graph = create_graph();
    let dir = tempdir().unwrap();
    let path = dir.path().join("ontology.mcog");

    persistence::save(&graph, &path).unwrap();
    let pruned = graph.prune(["ATC/C08C"]).graph;
    persistence::save(&pruned, &path).unwrap();

    let loaded = persistence::load(&path).unwrap();
    assert_eq!(loaded.code_count(), 1);
    assert_eq!(
        loaded.description("ATC/C08C").unwrap(),
        Some("Selective calcium channel blockers with mainly vascular effects")
    );
}
