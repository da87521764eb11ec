use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::encoding::EncodingVector;
use crate::model::ids::{EncodingId, IdentityId};
use crate::model::set::EncodingSet;

/// A face encoding as persisted, with its row id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredEncoding {
    pub id: EncodingId,
    pub vector: EncodingVector,
}

/// A named identity and the encodings it owns, in insertion order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdentityRecord {
    pub id: IdentityId,

    /// Unique, case-sensitive display name.
    pub name: String,

    /// Bounded by [`crate::model::MAX_ENCODINGS_PER_IDENTITY`].
    pub encodings: EncodingSet<StoredEncoding>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IdentityRecord {
    #[must_use]
    pub fn encoding_count(&self) -> usize {
        self.encodings.len()
    }

    /// The vectors alone, in insertion order.
    pub fn vectors(&self) -> impl Iterator<Item = &EncodingVector> {
        self.encodings.iter().map(|e| &e.vector)
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.encodings.is_full()
    }
}

/// A single encoding row fetched by id.
///
/// `vector` is `None` when the stored text could not be decoded; the
/// reason is kept in `decode_error` instead of failing the fetch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EncodingRecord {
    pub id: EncodingId,
    pub identity_id: IdentityId,
    pub vector: Option<EncodingVector>,
    pub decode_error: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(n: usize) -> IdentityRecord {
        let mut encodings = EncodingSet::new();
        for i in 0..n {
            let raw = i64::try_from(i).unwrap();
            encodings
                .try_push(StoredEncoding {
                    id: EncodingId::from_raw(raw),
                    vector: EncodingVector::validate(vec![0.5, 0.25]).unwrap(),
                })
                .unwrap();
        }
        let now = Utc::now();
        IdentityRecord {
            id: IdentityId::from_raw(1),
            name: "Alice".to_string(),
            encodings,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_encoding_count_and_vectors() {
        let r = record(3);
        assert_eq!(r.encoding_count(), 3);
        assert_eq!(r.vectors().count(), 3);
        assert!(!r.is_full());
    }

    #[test]
    fn test_full_record() {
        assert!(record(10).is_full());
    }

    #[test]
    fn test_record_serializes_encodings_as_list() {
        let json = serde_json::to_value(record(2)).unwrap();
        assert_eq!(json["name"], "Alice");
        assert_eq!(json["encodings"].as_array().unwrap().len(), 2);
        assert_eq!(json["encodings"][0]["vector"][1], 0.25);
    }
}
