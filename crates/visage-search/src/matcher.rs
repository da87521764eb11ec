use serde::Serialize;
use visage_core::{CorpusExport, EncodingVector};

use crate::distance::face_distances;
use crate::error::{SearchError, SearchResult};

/// Default maximum distance for a probe to count as a match.
///
/// Stricter than the 0.6 commonly used with 128-d face encodings.
pub const DEFAULT_TOLERANCE: f64 = 0.5;

/// The outcome of matching one probe against a corpus.
///
/// Either both fields are set (a match within tolerance) or neither is.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MatchResult {
    pub name: Option<String>,
    pub distance: Option<f64>,
}

impl MatchResult {
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_match(&self) -> bool {
        self.name.is_some()
    }
}

/// Stateless nearest-identity matcher with a fixed tolerance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchEngine {
    tolerance: f64,
}

impl MatchEngine {
    /// # Errors
    /// Returns [`SearchError::InvalidTolerance`] for a negative or
    /// non-finite tolerance.
    pub fn new(tolerance: f64) -> SearchResult<Self> {
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(SearchError::InvalidTolerance(tolerance));
        }
        Ok(Self { tolerance })
    }

    #[must_use]
    pub const fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Find the corpus vector closest to `probe`.
    ///
    /// Returns its owner and distance if that distance is within
    /// tolerance, otherwise [`MatchResult::none`]. On equal distances the
    /// vector earliest in export order wins. Corpus vectors whose
    /// dimension differs from the probe's are ignored.
    #[must_use]
    pub fn best_match(&self, probe: &EncodingVector, corpus: &CorpusExport) -> MatchResult {
        if corpus.is_empty() {
            return MatchResult::none();
        }

        let distances = face_distances(&corpus.vectors, probe);
        let mut best: Option<(&str, f64)> = None;
        let mut mismatched = 0usize;
        for (distance, owner) in distances.into_iter().zip(&corpus.owners) {
            let Some(distance) = distance else {
                mismatched += 1;
                continue;
            };
            if best.is_none_or(|(_, min)| distance < min) {
                best = Some((owner.as_str(), distance));
            }
        }

        if mismatched > 0 {
            log::warn!(
                "Ignored {} corpus vectors with a dimension other than {}",
                mismatched,
                probe.dimension()
            );
        }

        match best {
            Some((owner, distance)) if distance <= self.tolerance => {
                log::debug!("Matched '{}' at distance {:.4}", owner, distance);
                MatchResult {
                    name: Some(owner.to_string()),
                    distance: Some(distance),
                }
            }
            Some((owner, distance)) => {
                log::debug!(
                    "Nearest is '{}' at {:.4}, outside tolerance {}",
                    owner,
                    distance,
                    self.tolerance
                );
                MatchResult::none()
            }
            None => MatchResult::none(),
        }
    }
}

impl Default for MatchEngine {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

/// Convenience wrapper over [`MatchEngine::best_match`].
///
/// # Errors
/// Returns [`SearchError::InvalidTolerance`] for an unusable tolerance.
pub fn best_match(
    probe: &EncodingVector,
    corpus: &CorpusExport,
    tolerance: f64,
) -> SearchResult<MatchResult> {
    Ok(MatchEngine::new(tolerance)?.best_match(probe, corpus))
}
