use chrono::{DateTime, Utc};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OptionalExtension, Row};
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::model::{EncodingId, EncodingRecord, EncodingVector, IdentityId};

use super::migrations::MIGRATIONS;

/// How long a writer waits for another writer's lock before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// A database connection holding identities and their face encodings.
#[derive(Debug)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) a database at the given path and apply migrations.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// Open an in-memory database (for tests).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        // Foreign keys are per-connection in SQLite.
        conn.pragma_update(None, "foreign_keys", true)?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        log::debug!("SQLite journal mode: {}", mode);

        let mut db = Self { conn };
        db.apply_migrations()?;
        Ok(db)
    }

    /// Get a reference to the underlying connection (for advanced queries).
    #[must_use]
    pub const fn conn(&self) -> &Connection {
        &self.conn
    }

    pub(crate) fn conn_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    fn apply_migrations(&mut self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            )",
            [],
        )?;

        let applied: Vec<u32> = {
            let mut stmt = self
                .conn
                .prepare("SELECT version FROM schema_migrations ORDER BY version")?;
            let rows = stmt
                .query_map([], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        };

        for migration in MIGRATIONS {
            if applied.contains(&migration.version) {
                continue;
            }
            log::info!(
                "Applying migration {} ({})",
                migration.version,
                migration.name
            );
            let tx = self.conn.transaction()?;
            tx.execute_batch(migration.sql)?;
            tx.execute(
                "INSERT OR IGNORE INTO schema_migrations (version, name) VALUES (?1, ?2)",
                rusqlite::params![migration.version, migration.name],
            )?;
            tx.commit()?;
        }

        Ok(())
    }
}

// Counts
impl Database {
    pub fn count_identities(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM identities", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    pub fn count_encodings(&self) -> Result<usize> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM face_encodings", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

// Single-encoding access
impl Database {
    /// Fetch one encoding row. Undecodable data does not fail the fetch;
    /// it comes back as `vector: None` with the reason attached.
    pub fn get_encoding(&self, id: EncodingId) -> Result<Option<EncodingRecord>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, identity_id, encoding_data, created_at
                 FROM face_encodings
                 WHERE id = ?1",
                [id],
                |row| {
                    Ok((
                        EncodingId::from_raw(row.get(0)?),
                        IdentityId::from_raw(row.get(1)?),
                        decode_encoding(row.get_ref(2)?),
                        read_timestamp(row, 3)?,
                    ))
                },
            )
            .optional()?;

        Ok(row.map(|(id, identity_id, decoded, created_at)| {
            let (vector, decode_error) = match decoded {
                Ok(v) => (Some(v), None),
                Err(e) => {
                    log::warn!("Encoding {} has undecodable data: {}", id, e);
                    (None, Some(e.to_string()))
                }
            };
            EncodingRecord {
                id,
                identity_id,
                vector,
                decode_error,
                created_at,
            }
        }))
    }

    /// Delete one encoding. Returns whether a row existed.
    pub fn delete_encoding(&self, id: EncodingId) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM face_encodings WHERE id = ?1", [id])?;
        Ok(deleted > 0)
    }
}

pub(crate) fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

/// Decode a stored `encoding_data` value.
///
/// Anything but UTF-8 JSON text of a valid vector is an error, which
/// readers treat as a corrupt row rather than a failed read.
pub(crate) fn decode_encoding(value: ValueRef<'_>) -> Result<EncodingVector> {
    match value {
        ValueRef::Text(bytes) => {
            let text = std::str::from_utf8(bytes)
                .map_err(|e| Error::InvalidData(format!("encoding data is not UTF-8: {e}")))?;
            EncodingVector::from_json(text)
        }
        other => Err(Error::InvalidData(format!(
            "encoding data stored as {}, expected JSON text",
            other.data_type()
        ))),
    }
}

/// Read an RFC 3339 timestamp column.
///
/// An unreadable value logs a warning and reads as the Unix epoch, so a
/// bad timestamp never hides the row it belongs to.
pub(crate) fn read_timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let parsed = match row.get_ref(idx)? {
        ValueRef::Text(bytes) => std::str::from_utf8(bytes)
            .ok()
            .and_then(|text| DateTime::parse_from_rfc3339(text).ok()),
        _ => None,
    };
    Ok(parsed.map_or_else(
        || {
            log::warn!("Unreadable timestamp in column {}; using the epoch", idx);
            DateTime::<Utc>::UNIX_EPOCH
        },
        Into::into,
    ))
}
