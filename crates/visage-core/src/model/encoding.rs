use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Dimension emitted by the reference face encoder.
pub const DEFAULT_DIMENSION: usize = 128;

/// A validated face encoding: non-empty, every component finite.
///
/// Immutable once constructed. Deserialization goes through the same
/// validation, so a decoded vector upholds the same invariants as one
/// built with [`EncodingVector::validate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct EncodingVector(Vec<f64>);

impl EncodingVector {
    /// Validate raw encoder output.
    ///
    /// # Errors
    /// Returns [`Error::InvalidVector`] if `raw` is empty or contains a
    /// NaN or infinite component.
    pub fn validate(raw: Vec<f64>) -> Result<Self> {
        if raw.is_empty() {
            return Err(Error::InvalidVector("vector is empty".to_string()));
        }
        if let Some(pos) = raw.iter().position(|v| !v.is_finite()) {
            return Err(Error::InvalidVector(format!(
                "component {pos} is not finite"
            )));
        }
        Ok(Self(raw))
    }

    /// Validate raw encoder output and additionally require `dimension`
    /// components.
    ///
    /// # Errors
    /// Returns [`Error::InvalidVector`] on any validation failure.
    pub fn validate_with_dimension(raw: Vec<f64>, dimension: usize) -> Result<Self> {
        let vector = Self::validate(raw)?;
        if vector.dimension() != dimension {
            return Err(Error::InvalidVector(format!(
                "expected {dimension} dimensions, got {}",
                vector.dimension()
            )));
        }
        Ok(vector)
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> Vec<f64> {
        self.0
    }

    /// Text form used for persistence: a JSON list of floats.
    ///
    /// # Errors
    /// Only fails if `serde_json` cannot write the buffer.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.0)?)
    }

    /// Decode the persisted text form, re-validating the result.
    ///
    /// # Errors
    /// Returns [`Error::Serialization`] for malformed JSON and
    /// [`Error::InvalidVector`] for a well-formed but invalid vector.
    pub fn from_json(text: &str) -> Result<Self> {
        let raw: Vec<f64> = serde_json::from_str(text)?;
        Self::validate(raw)
    }
}

impl TryFrom<Vec<f64>> for EncodingVector {
    type Error = Error;

    fn try_from(raw: Vec<f64>) -> Result<Self> {
        Self::validate(raw)
    }
}

impl From<EncodingVector> for Vec<f64> {
    fn from(vector: EncodingVector) -> Self {
        vector.0
    }
}

impl AsRef<[f64]> for EncodingVector {
    fn as_ref(&self) -> &[f64] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: &[f64], b: &[f64]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-12)
    }

    #[test]
    fn test_validate_accepts_finite_vector() {
        let v = EncodingVector::validate(vec![0.1, -0.2, 0.3]).unwrap();
        assert_eq!(v.dimension(), 3);
        assert_eq!(v.as_slice(), &[0.1, -0.2, 0.3]);
    }

    #[test]
    fn test_validate_rejects_empty() {
        let err = EncodingVector::validate(Vec::new()).unwrap_err();
        assert!(matches!(err, Error::InvalidVector(_)));
    }

    #[test]
    fn test_validate_rejects_non_finite() {
        assert!(EncodingVector::validate(vec![0.1, f64::NAN]).is_err());
        assert!(EncodingVector::validate(vec![f64::INFINITY]).is_err());
        assert!(EncodingVector::validate(vec![0.0, f64::NEG_INFINITY, 1.0]).is_err());
    }

    #[test]
    fn test_validate_with_dimension() {
        assert!(EncodingVector::validate_with_dimension(vec![0.0; 128], DEFAULT_DIMENSION).is_ok());
        let err = EncodingVector::validate_with_dimension(vec![0.0; 3], 128).unwrap_err();
        assert!(err.to_string().contains("expected 128 dimensions, got 3"));
    }

    #[test]
    fn test_json_round_trip() {
        let raw: Vec<f64> = (0..128).map(|i| (f64::from(i) * 0.37).sin() / 3.0).collect();
        let v = EncodingVector::validate(raw.clone()).unwrap();
        let decoded = EncodingVector::from_json(&v.to_json().unwrap()).unwrap();
        assert!(close(decoded.as_slice(), &raw));
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(matches!(
            EncodingVector::from_json("not json"),
            Err(Error::Serialization(_))
        ));
        assert!(matches!(
            EncodingVector::from_json("[]"),
            Err(Error::InvalidVector(_))
        ));
        assert!(EncodingVector::from_json("{\"a\": 1}").is_err());
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: EncodingVector = serde_json::from_str("[1.0, 2.0]").unwrap();
        assert_eq!(ok.dimension(), 2);
        assert!(serde_json::from_str::<EncodingVector>("[]").is_err());
    }
}
