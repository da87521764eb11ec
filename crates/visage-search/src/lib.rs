//! Nearest-identity matching for visage.
//!
//! A brute-force linear scan over an exported corpus: exact tolerance
//! semantics matter more here than throughput.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod distance;
pub mod error;
pub mod matcher;

pub use distance::{euclidean_distance, face_distances};
pub use error::{SearchError, SearchResult};
pub use matcher::{best_match, MatchEngine, MatchResult, DEFAULT_TOLERANCE};
