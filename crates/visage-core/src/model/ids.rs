use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! define_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        ///
        /// Backed by the SQLite rowid, so ordering by id is creation order.
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            #[must_use]
            pub const fn from_raw(raw: i64) -> Self {
                Self(raw)
            }

            #[must_use]
            pub const fn as_raw(&self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse().map(Self)
            }
        }

        impl rusqlite::ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
                self.0.to_sql()
            }
        }
    };
}

define_id!(IdentityId, "Unique identifier for a named identity.");
define_id!(EncodingId, "Unique identifier for a stored face encoding.");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_id_round_trip() {
        let id = IdentityId::from_raw(7);
        assert_eq!(id.as_raw(), 7);
        assert_eq!(id.to_string(), "7");
        assert_eq!("7".parse::<IdentityId>().unwrap(), id);
    }

    #[test]
    fn test_id_parse_rejects_garbage() {
        assert!("abc".parse::<EncodingId>().is_err());
    }

    #[test]
    fn test_ids_order_by_creation() {
        assert!(IdentityId::from_raw(1) < IdentityId::from_raw(2));
    }

    #[test]
    fn test_id_serializes_as_number() {
        let json = serde_json::to_string(&EncodingId::from_raw(3)).unwrap();
        assert_eq!(json, "3");
    }
}
