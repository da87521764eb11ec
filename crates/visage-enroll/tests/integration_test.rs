//! End-to-end tests for registration and recognition against an on-disk
//! store.

use std::fs;
use tempfile::TempDir;
use visage_core::{EncodingVector, IdentityStore};
use visage_enroll::{
    discover_inputs, ImageInput, JsonEncoder, Recognizer, Registrar, RegistrationAction,
};
use visage_search::MatchEngine;

fn open_store(dir: &TempDir) -> IdentityStore {
    IdentityStore::open(dir.path().join("visage.db")).expect("Failed to open store")
}

/// Alice owns A1, Bob owns B1 and B2; probe B2 matches Bob exactly.
#[test]
fn test_alice_and_bob() {
    let temp_dir = TempDir::new().unwrap();
    let mut store = open_store(&temp_dir);

    {
        let mut registrar = Registrar::new(&mut store);
        registrar
            .register("Alice", vec![vec![0.0, 0.0, 0.0]])
            .unwrap();
        registrar
            .register("Bob", vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]])
            .unwrap();
    }

    let corpus = store.export_all().unwrap();
    assert_eq!(corpus.owners, vec!["Alice", "Bob", "Bob"]);

    let engine = MatchEngine::new(0.5).unwrap();
    let probe = EncodingVector::validate(vec![0.0, 1.0, 0.0]).unwrap();
    let result = engine.best_match(&probe, &corpus);
    assert_eq!(result.name.as_deref(), Some("Bob"));
    assert_eq!(result.distance, Some(0.0));

    // 0.6 from every stored vector.
    let mut far = CorpusFixture::default();
    far.add("Alice", &[0.6, 0.0]);
    far.add("Bob", &[-0.6, 0.0]);
    let probe = EncodingVector::validate(vec![0.0, 0.0]).unwrap();
    let result = engine.best_match(&probe, &far.corpus);
    assert!(result.name.is_none());
    assert!(result.distance.is_none());
}

#[derive(Default)]
struct CorpusFixture {
    corpus: visage_core::CorpusExport,
}

impl CorpusFixture {
    fn add(&mut self, owner: &str, raw: &[f64]) {
        let vector = EncodingVector::validate(raw.to_vec()).unwrap();
        self.corpus.push(vector, owner);
    }
}

/// Registering twice under one name augments, and the data survives a
/// reopen with exact values.
#[test]
fn test_register_then_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let precise = vec![0.123_456_789_012_345_6, -1.0e-12, 42.0];

    {
        let mut store = open_store(&temp_dir);
        let mut registrar = Registrar::new(&mut store);
        let first = registrar.register("Carol", vec![precise.clone()]).unwrap();
        assert_eq!(first.action, RegistrationAction::Created);

        let second = registrar.register("Carol", vec![vec![1.0, 2.0, 3.0]]).unwrap();
        assert_eq!(second.action, RegistrationAction::Augmented);
        assert_eq!(second.outcome.record.encoding_count(), 2);
    }

    let store = open_store(&temp_dir);
    let record = store.find_by_name("Carol").unwrap();
    let first = record.vectors().next().unwrap();
    for (stored, original) in first.as_slice().iter().zip(&precise) {
        assert!((stored - original).abs() < 1e-15);
    }
}

/// Deleting an identity removes it from the corpus and from lookups.
#[test]
fn test_delete_then_export() {
    let temp_dir = TempDir::new().unwrap();
    let mut store = open_store(&temp_dir);
    let dave = store
        .create("Dave", vec![vec![1.0, 1.0], vec![2.0, 2.0]])
        .unwrap()
        .record
        .id;
    store.create("Erin", vec![vec![3.0, 3.0]]).unwrap();

    assert!(store.delete(dave).unwrap());

    let corpus = store.export_all().unwrap();
    assert_eq!(corpus.len(), 1);
    assert!(corpus.iter().all(|(_, owner)| owner != "Dave"));
    assert!(store.find_by_id(dave).unwrap_err().is_not_found());
    assert_eq!(store.count_encodings().unwrap(), 1);
}

/// Sidecar files on disk drive a full register-then-recognize cycle.
#[test]
fn test_sidecar_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let faces = temp_dir.path().join("faces");
    fs::create_dir(&faces).unwrap();
    fs::write(faces.join("frank-1.json"), "[0.1, 0.2, 0.3]").unwrap();
    fs::write(faces.join("frank-2.json"), "[[0.1, 0.25, 0.3]]").unwrap();
    fs::write(faces.join("nobody.json"), "[]").unwrap();

    let images: Vec<ImageInput> = discover_inputs(&faces)
        .iter()
        .map(|path| ImageInput::read(path).unwrap())
        .collect();
    assert_eq!(images.len(), 3);

    let mut store = open_store(&temp_dir);
    let registration = Registrar::new(&mut store)
        .register_images("Frank", &images, &JsonEncoder)
        .unwrap();
    let summary = registration.images.unwrap();
    assert_eq!(summary.used, 2);
    assert_eq!(summary.failed.len(), 1);

    let recognizer = Recognizer::new(&store, MatchEngine::default());
    let probe = br#"[{"region": [5, 50, 60, 2], "encoding": [0.1, 0.2, 0.31]}]"#;
    let report = recognizer.recognize(probe, &JsonEncoder).unwrap();
    assert_eq!(report.faces.len(), 1);
    assert_eq!(report.faces[0].name, "Frank");
    assert_eq!(report.message, "Processed 1 detected face(s).");
}
