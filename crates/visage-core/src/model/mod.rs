pub mod corpus;
pub mod encoding;
pub mod identity;
pub mod ids;
pub mod set;

pub use corpus::{CorpusExport, CorruptEncoding};
pub use encoding::{EncodingVector, DEFAULT_DIMENSION};
pub use identity::{EncodingRecord, IdentityRecord, StoredEncoding};
pub use ids::{EncodingId, IdentityId};
pub use set::{EncodingSet, MAX_ENCODINGS_PER_IDENTITY};
