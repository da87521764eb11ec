//! The encoder collaborator: turns one image into zero or more face
//! detections, each with an encoding vector and where it was found.
//!
//! Pixel decoding and the face model live outside this workspace. The
//! bundled [`JsonEncoder`] reads detections precomputed by such a model
//! from JSON sidecar documents.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Errors an encoder reports for a single image.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("could not read image: {0}")]
    Unreadable(String),

    #[error("malformed detection data: {0}")]
    Malformed(String),
}

/// Bounding box of a detected face, in source-image pixels.
///
/// Deserializes from either a map or a `[top, right, bottom, left]` list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceRegion {
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub left: u32,
}

/// One face found in an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceDetection {
    #[serde(default)]
    pub region: Option<FaceRegion>,

    /// Raw encoder output; validated downstream.
    pub encoding: Vec<f64>,
}

impl FaceDetection {
    #[must_use]
    pub fn new(encoding: Vec<f64>) -> Self {
        Self {
            region: None,
            encoding,
        }
    }
}

/// Produces face encodings from image bytes.
pub trait FaceEncoder {
    /// Detect and encode every face in `image`, in detection order.
    ///
    /// # Errors
    /// Returns an [`EncodeError`] when the image cannot be processed.
    /// Finding no face is not an error.
    fn encode(&self, image: &[u8]) -> Result<Vec<FaceDetection>, EncodeError>;
}

/// An image submitted to a workflow, with a label for diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageInput {
    pub label: String,
    pub bytes: Vec<u8>,
}

impl ImageInput {
    #[must_use]
    pub fn new(label: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            label: label.into(),
            bytes,
        }
    }

    /// Read an input from disk, labelled with its path.
    pub fn read(path: &Path) -> std::io::Result<Self> {
        Ok(Self::new(path.display().to_string(), std::fs::read(path)?))
    }
}

/// Accepted sidecar layouts, tried in order.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Sidecar {
    Detections(Vec<FaceDetection>),
    Vectors(Vec<Vec<f64>>),
    Single(Vec<f64>),
}

/// Reads precomputed detections from JSON.
///
/// Accepts a list of `{ "region": [t, r, b, l], "encoding": [...] }`
/// objects, a list of bare vectors, or a single bare vector.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonEncoder;

impl FaceEncoder for JsonEncoder {
    fn encode(&self, image: &[u8]) -> Result<Vec<FaceDetection>, EncodeError> {
        let text =
            std::str::from_utf8(image).map_err(|e| EncodeError::Unreadable(e.to_string()))?;
        let sidecar: Sidecar =
            serde_json::from_str(text).map_err(|e| EncodeError::Malformed(e.to_string()))?;

        Ok(match sidecar {
            Sidecar::Detections(detections) => detections,
            Sidecar::Vectors(vectors) => vectors.into_iter().map(FaceDetection::new).collect(),
            Sidecar::Single(vector) => vec![FaceDetection::new(vector)],
        })
    }
}

fn is_sidecar(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case("json"))
}

/// Find sidecar files under `dir`, sorted by path.
pub fn discover_inputs(dir: &Path) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
        .map(walkdir::DirEntry::into_path)
        .filter(|path| path.is_file() && is_sidecar(path))
        .collect();
    paths.sort();
    log::debug!("Found {} sidecar files in {}", paths.len(), dir.display());
    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_detections_with_regions() {
        let json = br#"[{"region": [10, 60, 70, 5], "encoding": [0.1, 0.2]}]"#;
        let detections = JsonEncoder.encode(json).unwrap();
        assert_eq!(detections.len(), 1);
        assert_eq!(
            detections[0].region,
            Some(FaceRegion {
                top: 10,
                right: 60,
                bottom: 70,
                left: 5
            })
        );
        assert_eq!(detections[0].encoding, vec![0.1, 0.2]);
    }

    #[test]
    fn test_region_as_map_and_missing() {
        let json = br#"[
            {"region": {"top": 1, "right": 2, "bottom": 3, "left": 4}, "encoding": [1.0]},
            {"encoding": [2.0]}
        ]"#;
        let detections = JsonEncoder.encode(json).unwrap();
        assert_eq!(detections[0].region.unwrap().left, 4);
        assert!(detections[1].region.is_none());
    }

    #[test]
    fn test_bare_vectors() {
        let detections = JsonEncoder.encode(b"[[1.0, 2.0], [3.0, 4.0]]").unwrap();
        assert_eq!(detections.len(), 2);
        assert!(detections.iter().all(|d| d.region.is_none()));
        assert_eq!(detections[1].encoding, vec![3.0, 4.0]);
    }

    #[test]
    fn test_single_vector() {
        let detections = JsonEncoder.encode(b"[0.5, -0.5]").unwrap();
        assert_eq!(detections, vec![FaceDetection::new(vec![0.5, -0.5])]);
    }

    #[test]
    fn test_empty_list_is_no_faces() {
        assert!(JsonEncoder.encode(b"[]").unwrap().is_empty());
    }

    #[test]
    fn test_malformed_input() {
        assert!(matches!(
            JsonEncoder.encode(b"{\"faces\": 1}"),
            Err(EncodeError::Malformed(_))
        ));
        assert!(matches!(
            JsonEncoder.encode(&[0xff, 0xfe, 0x00]),
            Err(EncodeError::Unreadable(_))
        ));
    }

    #[test]
    fn test_discover_inputs() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir(root.join("nested")).unwrap();
        fs::write(root.join("b.json"), "[]").unwrap();
        fs::write(root.join("a.JSON"), "[]").unwrap();
        fs::write(root.join("nested").join("c.json"), "[]").unwrap();
        fs::write(root.join("notes.txt"), "skip me").unwrap();

        let found = discover_inputs(root);
        let names: Vec<String> = found
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().display().to_string())
            .collect();
        assert_eq!(names.len(), 3);
        assert_eq!(names[0], "a.JSON");
        assert!(!names.iter().any(|n| n.ends_with(".txt")));
    }

    #[test]
    fn test_image_input_read() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("face.json");
        fs::write(&path, "[1.0]").unwrap();
        let input = ImageInput::read(&path).unwrap();
        assert_eq!(input.bytes, b"[1.0]");
        assert!(input.label.ends_with("face.json"));
    }
}
