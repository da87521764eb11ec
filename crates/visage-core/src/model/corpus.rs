use serde::Serialize;

use crate::model::encoding::EncodingVector;
use crate::model::ids::{EncodingId, IdentityId};

/// A stored encoding that could not be decoded during a read.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorruptEncoding {
    pub encoding_id: EncodingId,
    pub identity_id: IdentityId,
    pub reason: String,
}

/// Read-only snapshot of every decodable encoding paired with its owner.
///
/// `vectors[i]` belongs to `owners[i]`. Order is identity id, then
/// encoding insertion order, so matching over an export is deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CorpusExport {
    pub vectors: Vec<EncodingVector>,
    pub owners: Vec<String>,

    /// Rows skipped because their stored data was undecodable.
    pub skipped: Vec<CorruptEncoding>,
}

impl CorpusExport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, vector: EncodingVector, owner: impl Into<String>) {
        self.vectors.push(vector);
        self.owners.push(owner.into());
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// `(vector, owner)` pairs in export order.
    pub fn iter(&self) -> impl Iterator<Item = (&EncodingVector, &str)> {
        self.vectors
            .iter()
            .zip(self.owners.iter().map(String::as_str))
    }
}
