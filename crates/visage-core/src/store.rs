//! The identity store: create, augment, delete, and export identities and
//! their face encodings with per-identity capacity and unique names.
//!
//! Every mutation runs in a single `BEGIN IMMEDIATE` transaction. SQLite
//! allows one such writer at a time, so the capacity check and the inserts
//! it guards can never interleave with another writer. Readers run in WAL
//! mode and see the last committed state.

use rusqlite::{Connection, OptionalExtension, TransactionBehavior};
use serde::Serialize;
use std::path::Path;

use crate::error::{Error, Result};
use crate::model::{
    CorpusExport, CorruptEncoding, EncodingId, EncodingRecord, EncodingSet, EncodingVector,
    IdentityId, IdentityRecord, StoredEncoding, MAX_ENCODINGS_PER_IDENTITY,
};
use crate::schema::db::{decode_encoding, now_rfc3339, read_timestamp};
use crate::schema::Database;

/// A candidate vector that was rejected and left out of a mutation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedVector {
    /// Index in the caller's input.
    pub position: usize,
    pub reason: String,
}

/// The result of [`IdentityStore::create`] or [`IdentityStore::augment`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MutationOutcome {
    /// The identity as committed.
    pub record: IdentityRecord,

    /// Number of vectors persisted by this call.
    pub accepted: usize,

    /// Vectors that failed validation.
    pub skipped: Vec<SkippedVector>,

    /// Vectors dropped from the tail of the input for lack of capacity.
    pub truncated: usize,
}

/// Durable collection of identities.
#[derive(Debug)]
pub struct IdentityStore {
    db: Database,
    expected_dimension: Option<usize>,
}

impl IdentityStore {
    #[must_use]
    pub const fn new(db: Database) -> Self {
        Self {
            db,
            expected_dimension: None,
        }
    }

    /// Open (or create) a store backed by the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(Database::open(path)?))
    }

    /// Open an in-memory store (for tests).
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::new(Database::open_in_memory()?))
    }

    /// Reject vectors whose dimension differs from `dimension`.
    ///
    /// Off by default: the encoder is trusted to emit a fixed dimension.
    #[must_use]
    pub const fn with_expected_dimension(mut self, dimension: Option<usize>) -> Self {
        self.expected_dimension = dimension;
        self
    }

    #[must_use]
    pub const fn database(&self) -> &Database {
        &self.db
    }
}

// Reads
impl IdentityStore {
    /// Find an identity by exact, case-sensitive name.
    pub fn find_by_name(&self, name: &str) -> Result<IdentityRecord> {
        let tx = self.db.conn().unchecked_transaction()?;
        let header = tx
            .query_row(
                "SELECT id, name, created_at, updated_at FROM identities WHERE name = ?1",
                [name],
                header_from_row,
            )
            .optional()?
            .ok_or_else(|| Error::not_found("identity", name))?;
        let record = load_record(&tx, header)?;
        tx.commit()?;
        Ok(record)
    }

    pub fn find_by_id(&self, id: IdentityId) -> Result<IdentityRecord> {
        let tx = self.db.conn().unchecked_transaction()?;
        let record = find_record(&tx, id)?.ok_or_else(|| Error::not_found("identity", id))?;
        tx.commit()?;
        Ok(record)
    }

    /// Page through identities in creation order.
    pub fn list(&self, offset: usize, limit: usize) -> Result<Vec<IdentityRecord>> {
        let tx = self.db.conn().unchecked_transaction()?;
        let headers = {
            let mut stmt = tx.prepare(
                "SELECT id, name, created_at, updated_at
                 FROM identities
                 ORDER BY id
                 LIMIT ?1 OFFSET ?2",
            )?;
            let rows = stmt
                .query_map(
                    rusqlite::params![to_sql_count(limit), to_sql_count(offset)],
                    header_from_row,
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        };

        let records = headers
            .into_iter()
            .map(|header| load_record(&tx, header))
            .collect::<Result<Vec<_>>>()?;
        tx.commit()?;
        Ok(records)
    }

    /// Snapshot every decodable encoding with its owner's name.
    ///
    /// Runs in one read transaction, so an identity appears with its full
    /// encoding set as of a single commit or not at all. Undecodable rows
    /// are logged, listed in [`CorpusExport::skipped`], and left out.
    pub fn export_all(&self) -> Result<CorpusExport> {
        let tx = self.db.conn().unchecked_transaction()?;
        let mut corpus = CorpusExport::new();
        {
            let mut stmt = tx.prepare(
                "SELECT e.id, e.identity_id, i.name, e.encoding_data
                 FROM face_encodings e
                 JOIN identities i ON i.id = e.identity_id
                 ORDER BY i.id, e.id",
            )?;
            let mut rows = stmt.query([])?;
            while let Some(row) = rows.next()? {
                let encoding_id = EncodingId::from_raw(row.get(0)?);
                let identity_id = IdentityId::from_raw(row.get(1)?);
                let name: String = row.get(2)?;

                match decode_encoding(row.get_ref(3)?) {
                    Ok(vector) => corpus.push(vector, name),
                    Err(e) => {
                        log::warn!(
                            "Skipping encoding {} of identity '{}': {}",
                            encoding_id,
                            name,
                            e
                        );
                        corpus.skipped.push(CorruptEncoding {
                            encoding_id,
                            identity_id,
                            reason: e.to_string(),
                        });
                    }
                }
            }
        }
        tx.commit()?;

        log::debug!(
            "Exported {} encodings ({} skipped)",
            corpus.len(),
            corpus.skipped.len()
        );
        Ok(corpus)
    }

    /// Fetch a single encoding row; see [`Database::get_encoding`].
    pub fn get_encoding(&self, id: EncodingId) -> Result<EncodingRecord> {
        self.db
            .get_encoding(id)?
            .ok_or_else(|| Error::not_found("encoding", id))
    }

    pub fn count_identities(&self) -> Result<usize> {
        self.db.count_identities()
    }

    pub fn count_encodings(&self) -> Result<usize> {
        self.db.count_encodings()
    }
}

// Mutations
impl IdentityStore {
    /// Create a new identity with its initial encodings.
    ///
    /// Invalid vectors are skipped and reported; the identity is created
    /// even if none survive. The name is checked up front, and a
    /// concurrent create that commits first is caught by the UNIQUE
    /// constraint, both surfacing as [`Error::DuplicateName`].
    pub fn create(&mut self, name: &str, vectors: Vec<Vec<f64>>) -> Result<MutationOutcome> {
        if name.trim().is_empty() {
            return Err(Error::EmptyName);
        }
        if vectors.len() > MAX_ENCODINGS_PER_IDENTITY {
            return Err(Error::CapacityExceeded {
                given: vectors.len(),
                max: MAX_ENCODINGS_PER_IDENTITY,
            });
        }

        // Optimistic check, outside the write lock.
        if identity_id_by_name(self.db.conn(), name)?.is_some() {
            return Err(Error::DuplicateName {
                name: name.to_string(),
            });
        }

        let (valid, skipped) = partition(self.expected_dimension, name, vectors);

        let tx = self
            .db
            .conn_mut()
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let now = now_rfc3339();
        tx.execute(
            "INSERT INTO identities (name, created_at, updated_at) VALUES (?1, ?2, ?2)",
            rusqlite::params![name, now],
        )
        .map_err(|e| map_constraint(e, name))?;
        let id = IdentityId::from_raw(tx.last_insert_rowid());

        insert_encodings(&tx, id, &valid, &now).map_err(|e| map_constraint(e, name))?;

        let record = find_record(&tx, id)?.ok_or_else(|| Error::not_found("identity", id))?;
        tx.commit()?;

        log::info!(
            "Created identity '{}' (id {}) with {} encodings",
            name,
            id,
            valid.len()
        );

        Ok(MutationOutcome {
            record,
            accepted: valid.len(),
            skipped,
            truncated: 0,
        })
    }

    /// Append encodings to an existing identity.
    ///
    /// At most `MAX_ENCODINGS_PER_IDENTITY - current` vectors are taken
    /// from the head of `vectors`; the rest are dropped and counted in
    /// [`MutationOutcome::truncated`]. Fails with
    /// [`Error::CapacityReached`] if the identity is already full.
    pub fn augment(&mut self, id: IdentityId, vectors: Vec<Vec<f64>>) -> Result<MutationOutcome> {
        let expected_dimension = self.expected_dimension;
        let tx = self
            .db
            .conn_mut()
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let current = find_record(&tx, id)?.ok_or_else(|| Error::not_found("identity", id))?;
        let stored = count_stored(&tx, id)?;
        let remaining = MAX_ENCODINGS_PER_IDENTITY.saturating_sub(stored);
        if remaining == 0 {
            return Err(Error::CapacityReached {
                name: current.name,
                max: MAX_ENCODINGS_PER_IDENTITY,
            });
        }

        let given = vectors.len();
        let head: Vec<Vec<f64>> = vectors.into_iter().take(remaining).collect();
        let truncated = given - head.len();
        if truncated > 0 {
            log::info!(
                "Identity '{}' has room for {} more encodings; dropping {} of {}",
                current.name,
                remaining,
                truncated,
                given
            );
        }

        let (valid, skipped) = partition(expected_dimension, &current.name, head);

        let now = now_rfc3339();
        insert_encodings(&tx, id, &valid, &now).map_err(|e| map_constraint(e, &current.name))?;
        if !valid.is_empty() {
            tx.execute(
                "UPDATE identities SET updated_at = ?2 WHERE id = ?1",
                rusqlite::params![id, now],
            )?;
        }

        let record = find_record(&tx, id)?.ok_or_else(|| Error::not_found("identity", id))?;
        tx.commit()?;

        log::info!(
            "Added {} encodings to identity '{}' (now {})",
            valid.len(),
            record.name,
            record.encoding_count()
        );

        Ok(MutationOutcome {
            record,
            accepted: valid.len(),
            skipped,
            truncated,
        })
    }

    /// Delete an identity and all of its encodings.
    ///
    /// Children go first, then the parent, in one transaction. Returns
    /// whether the identity existed.
    pub fn delete(&mut self, id: IdentityId) -> Result<bool> {
        let tx = self
            .db
            .conn_mut()
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let encodings = tx.execute("DELETE FROM face_encodings WHERE identity_id = ?1", [id])?;
        let identities = tx.execute("DELETE FROM identities WHERE id = ?1", [id])?;
        tx.commit()?;

        if identities > 0 {
            log::info!("Deleted identity {} and {} encodings", id, encodings);
        }
        Ok(identities > 0)
    }

    /// Delete a single encoding. Returns whether it existed.
    pub fn delete_encoding(&mut self, id: EncodingId) -> Result<bool> {
        self.db.delete_encoding(id)
    }
}

fn validate(raw: Vec<f64>, expected_dimension: Option<usize>) -> Result<EncodingVector> {
    match expected_dimension {
        Some(dimension) => EncodingVector::validate_with_dimension(raw, dimension),
        None => EncodingVector::validate(raw),
    }
}

/// Validate each candidate, keeping the valid ones in input order and
/// recording the rest.
fn partition(
    expected_dimension: Option<usize>,
    name: &str,
    vectors: Vec<Vec<f64>>,
) -> (Vec<EncodingVector>, Vec<SkippedVector>) {
    let mut valid = Vec::with_capacity(vectors.len());
    let mut skipped = Vec::new();
    for (position, raw) in vectors.into_iter().enumerate() {
        match validate(raw, expected_dimension) {
            Ok(vector) => valid.push(vector),
            Err(e) => {
                log::warn!(
                    "Skipping encoding {} for identity '{}': {}",
                    position,
                    name,
                    e
                );
                skipped.push(SkippedVector {
                    position,
                    reason: e.to_string(),
                });
            }
        }
    }
    (valid, skipped)
}

/// Columns of an `identities` row, before its encodings are attached.
struct Header {
    id: IdentityId,
    name: String,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

fn header_from_row(row: &rusqlite::Row) -> rusqlite::Result<Header> {
    Ok(Header {
        id: IdentityId::from_raw(row.get(0)?),
        name: row.get(1)?,
        created_at: read_timestamp(row, 2)?,
        updated_at: read_timestamp(row, 3)?,
    })
}

fn find_record(conn: &Connection, id: IdentityId) -> Result<Option<IdentityRecord>> {
    let header = conn
        .query_row(
            "SELECT id, name, created_at, updated_at FROM identities WHERE id = ?1",
            [id],
            header_from_row,
        )
        .optional()?;
    header.map(|h| load_record(conn, h)).transpose()
}

/// Attach encodings to a header, skipping rows that fail to decode.
fn load_record(conn: &Connection, header: Header) -> Result<IdentityRecord> {
    let mut stmt = conn.prepare(
        "SELECT id, encoding_data FROM face_encodings WHERE identity_id = ?1 ORDER BY id",
    )?;
    let rows = stmt
        .query_map([header.id], |row| {
            Ok((EncodingId::from_raw(row.get(0)?), decode_encoding(row.get_ref(1)?)))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let decoded = rows
        .into_iter()
        .filter_map(|(id, decoded)| match decoded {
            Ok(vector) => Some(StoredEncoding { id, vector }),
            Err(e) => {
                log::warn!(
                    "Skipping encoding {} of identity '{}': {}",
                    id,
                    header.name,
                    e
                );
                None
            }
        });

    let mut encodings = EncodingSet::new();
    let dropped = encodings.extend_truncating(decoded);
    if dropped > 0 {
        log::warn!(
            "Identity '{}' holds {} encodings past capacity; ignoring them",
            header.name,
            dropped
        );
    }

    Ok(IdentityRecord {
        id: header.id,
        name: header.name,
        encodings,
        created_at: header.created_at,
        updated_at: header.updated_at,
    })
}

fn identity_id_by_name(conn: &Connection, name: &str) -> Result<Option<IdentityId>> {
    Ok(conn
        .query_row("SELECT id FROM identities WHERE name = ?1", [name], |row| {
            row.get(0).map(IdentityId::from_raw)
        })
        .optional()?)
}

/// Raw row count, including rows that would fail to decode.
fn count_stored(conn: &Connection, id: IdentityId) -> Result<usize> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM face_encodings WHERE identity_id = ?1",
        [id],
        |row| row.get(0),
    )?;
    Ok(usize::try_from(count).unwrap_or(0))
}

fn insert_encodings(
    conn: &Connection,
    id: IdentityId,
    vectors: &[EncodingVector],
    now: &str,
) -> Result<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO face_encodings (identity_id, encoding_data, created_at) VALUES (?1, ?2, ?3)",
    )?;
    for vector in vectors {
        stmt.execute(rusqlite::params![id, vector.to_json()?, now])?;
    }
    Ok(())
}

/// Translate constraint failures into the policy errors they represent.
fn map_constraint(err: impl Into<Error>, name: &str) -> Error {
    let err = err.into();
    if let Error::Database(rusqlite::Error::SqliteFailure(ffi, _)) = &err {
        if ffi.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE {
            return Error::DuplicateName {
                name: name.to_string(),
            };
        }
        if ffi.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_TRIGGER {
            return Error::CapacityReached {
                name: name.to_string(),
                max: MAX_ENCODINGS_PER_IDENTITY,
            };
        }
    }
    err
}

fn to_sql_count(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}
