//! Recognition: match every face in an image against the stored corpus.

use serde::Serialize;
use visage_core::{EncodingVector, IdentityStore};
use visage_search::MatchEngine;

use crate::encoder::{FaceDetection, FaceEncoder, FaceRegion};
use crate::error::EnrollResult;

pub const UNKNOWN: &str = "Unknown";
pub const UNKNOWN_NO_KNOWN_FACES: &str = "Unknown (no known faces)";
pub const UNKNOWN_ENCODING_ERROR: &str = "Unknown (encoding error)";

/// One detected face and who it was matched to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecognizedFace {
    /// The matched identity name, or one of the `Unknown` labels.
    pub name: String,
    pub distance: Option<f64>,
    pub region: Option<FaceRegion>,
}

impl RecognizedFace {
    fn unknown(label: &str, region: Option<FaceRegion>) -> Self {
        Self {
            name: label.to_string(),
            distance: None,
            region,
        }
    }

    /// Returns `true` if this face was matched to a stored identity.
    pub fn is_known(&self) -> bool {
        self.distance.is_some()
    }
}

/// Result of recognizing one image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecognitionReport {
    /// One entry per detected face, in detection order.
    pub faces: Vec<RecognizedFace>,
    pub message: String,
}

impl RecognitionReport {
    pub fn known_count(&self) -> usize {
        self.faces.iter().filter(|f| f.is_known()).count()
    }
}

/// Read-only recognition over one store.
#[derive(Debug)]
pub struct Recognizer<'a> {
    store: &'a IdentityStore,
    engine: MatchEngine,
}

impl<'a> Recognizer<'a> {
    pub const fn new(store: &'a IdentityStore, engine: MatchEngine) -> Self {
        Self { store, engine }
    }

    /// # Errors
    /// Returns an error for a negative or non-finite tolerance.
    pub fn with_tolerance(store: &'a IdentityStore, tolerance: f64) -> EnrollResult<Self> {
        Ok(Self::new(store, MatchEngine::new(tolerance)?))
    }

    /// Encode `image` and recognize every face in it.
    ///
    /// Finding nothing is not an error: the report says so.
    ///
    /// # Errors
    /// Returns an error if the encoder cannot process the image or the
    /// corpus cannot be read.
    pub fn recognize<E>(&self, image: &[u8], encoder: &E) -> EnrollResult<RecognitionReport>
    where
        E: FaceEncoder + ?Sized,
    {
        let detections = encoder.encode(image)?;
        self.recognize_detections(detections)
    }

    /// Recognize faces that were already encoded.
    ///
    /// The corpus is exported once per call.
    pub fn recognize_detections(
        &self,
        detections: Vec<FaceDetection>,
    ) -> EnrollResult<RecognitionReport> {
        if detections.is_empty() {
            return Ok(RecognitionReport {
                faces: Vec::new(),
                message: "No faces found in the image.".to_string(),
            });
        }

        let total = detections.len();
        let corpus = self.store.export_all()?;
        if corpus.is_empty() {
            let faces = detections
                .into_iter()
                .map(|d| RecognizedFace::unknown(UNKNOWN_NO_KNOWN_FACES, d.region))
                .collect();
            return Ok(RecognitionReport {
                faces,
                message: format!(
                    "Found {} face(s), but no known faces are stored to compare against.",
                    total
                ),
            });
        }

        let faces: Vec<RecognizedFace> = detections
            .into_iter()
            .map(|detection| {
                let probe = match EncodingVector::validate(detection.encoding) {
                    Ok(probe) => probe,
                    Err(e) => {
                        log::warn!("Skipping unusable probe encoding: {}", e);
                        return RecognizedFace::unknown(UNKNOWN_ENCODING_ERROR, detection.region);
                    }
                };
                let result = self.engine.best_match(&probe, &corpus);
                match (result.name, result.distance) {
                    (Some(name), Some(distance)) => RecognizedFace {
                        name,
                        distance: Some(distance),
                        region: detection.region,
                    },
                    _ => RecognizedFace::unknown(UNKNOWN, detection.region),
                }
            })
            .collect();

        let mut message = format!("Processed {} detected face(s).", total);
        if !faces.iter().any(RecognizedFace::is_known) {
            message.push_str(" No known faces recognized.");
        }

        Ok(RecognitionReport { faces, message })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::JsonEncoder;

    fn alice_and_bob() -> IdentityStore {
        let mut store = IdentityStore::open_in_memory().unwrap();
        store.create("Alice", vec![vec![0.0, 0.0, 0.0]]).unwrap();
        store
            .create("Bob", vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]])
            .unwrap();
        store
    }

    #[test]
    fn test_no_faces() {
        let store = alice_and_bob();
        let recognizer = Recognizer::new(&store, MatchEngine::default());
        let report = recognizer.recognize(b"[]", &JsonEncoder).unwrap();
        assert!(report.faces.is_empty());
        assert_eq!(report.message, "No faces found in the image.");
    }

    #[test]
    fn test_empty_store() {
        let store = IdentityStore::open_in_memory().unwrap();
        let recognizer = Recognizer::new(&store, MatchEngine::default());
        let report = recognizer
            .recognize(b"[[0.0, 0.0], [1.0, 1.0]]", &JsonEncoder)
            .unwrap();
        assert_eq!(report.faces.len(), 2);
        assert!(report
            .faces
            .iter()
            .all(|f| f.name == UNKNOWN_NO_KNOWN_FACES && f.distance.is_none()));
        assert!(report.message.starts_with("Found 2 face(s)"));
    }

    #[test]
    fn test_known_and_unknown_faces() {
        let store = alice_and_bob();
        let recognizer = Recognizer::new(&store, MatchEngine::default());
        let json = br#"[
            {"region": [0, 10, 10, 0], "encoding": [0.0, 1.0, 0.0]},
            {"encoding": [5.0, 5.0, 5.0]}
        ]"#;
        let report = recognizer.recognize(json, &JsonEncoder).unwrap();

        assert_eq!(report.faces[0].name, "Bob");
        assert_eq!(report.faces[0].distance, Some(0.0));
        assert_eq!(report.faces[0].region.unwrap().right, 10);
        assert_eq!(report.faces[1].name, UNKNOWN);
        assert_eq!(report.known_count(), 1);
        assert_eq!(report.message, "Processed 2 detected face(s).");
    }

    #[test]
    fn test_nothing_recognized_message() {
        let store = alice_and_bob();
        let recognizer = Recognizer::with_tolerance(&store, 0.5).unwrap();
        let report = recognizer
            .recognize_detections(vec![
                FaceDetection::new(vec![9.0, 9.0, 9.0]),
                FaceDetection::new(vec![f64::NAN, 0.0, 0.0]),
            ])
            .unwrap();

        assert_eq!(report.faces[0].name, UNKNOWN);
        assert_eq!(report.faces[1].name, UNKNOWN_ENCODING_ERROR);
        assert_eq!(
            report.message,
            "Processed 2 detected face(s). No known faces recognized."
        );
    }

    #[test]
    fn test_invalid_tolerance() {
        let store = alice_and_bob();
        assert!(Recognizer::with_tolerance(&store, -1.0).is_err());
    }
}
