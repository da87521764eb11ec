/// A schema migration.
#[derive(Debug)]
pub struct Migration {
    pub version: u32,
    pub name: &'static str,
    pub sql: &'static str,
}

const MIGRATION_001: &str = r#"
-- Named identities
CREATE TABLE IF NOT EXISTS identities (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_identities_name ON identities(name);

-- Face encodings, stored as a JSON list of floats.
-- No ON DELETE CASCADE: deleting an identity removes its encodings first,
-- inside the same transaction, so a parent delete with children left over
-- fails the foreign key instead of orphaning rows.
CREATE TABLE IF NOT EXISTS face_encodings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    identity_id INTEGER NOT NULL REFERENCES identities(id),
    encoding_data TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_face_encodings_identity_id ON face_encodings(identity_id);
"#;

const MIGRATION_002: &str = r#"
-- Per-identity capacity, enforced below the application as well
CREATE TRIGGER IF NOT EXISTS trg_face_encodings_capacity
BEFORE INSERT ON face_encodings
WHEN (SELECT COUNT(*) FROM face_encodings WHERE identity_id = NEW.identity_id) >= 10
BEGIN
    SELECT RAISE(ABORT, 'identity encoding capacity reached');
END;
"#;

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "initial_schema",
        sql: MIGRATION_001,
    },
    Migration {
        version: 2,
        name: "encoding_capacity_guard",
        sql: MIGRATION_002,
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MAX_ENCODINGS_PER_IDENTITY;

    #[test]
    fn test_versions_are_ascending() {
        let versions: Vec<u32> = MIGRATIONS.iter().map(|m| m.version).collect();
        let mut sorted = versions.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(versions, sorted);
    }

    #[test]
    fn test_capacity_trigger_matches_constant() {
        assert!(MIGRATION_002.contains(&format!(">= {MAX_ENCODINGS_PER_IDENTITY}")));
    }
}
