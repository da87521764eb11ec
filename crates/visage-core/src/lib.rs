//! Core domain model and identity store for visage.
//!
//! This crate defines face encodings and the identities that own them,
//! the SQLite schema, and the [`store::IdentityStore`] that enforces
//! unique names and per-identity capacity.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod error;
pub mod model;
pub mod schema;
pub mod store;

pub use error::{Error, Result};
pub use model::{
    CorpusExport, EncodingId, EncodingRecord, EncodingSet, EncodingVector, IdentityId,
    IdentityRecord, StoredEncoding, DEFAULT_DIMENSION, MAX_ENCODINGS_PER_IDENTITY,
};
pub use store::{IdentityStore, MutationOutcome, SkippedVector};
