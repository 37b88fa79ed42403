//! Database schema and migrations
//!
//! Uses SQLite with embedded migrations managed via PRAGMA user_version.

use rusqlite::Connection;

use crate::error::KbResult;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 2;

/// SQL migrations, indexed by version number
const MIGRATIONS: &[&str] = &[
    // Version 1: incidents and sessions
    r#"
    CREATE TABLE IF NOT EXISTS incidents (
        id               INTEGER PRIMARY KEY AUTOINCREMENT,
        signature        TEXT NOT NULL UNIQUE,
        raw_log          TEXT NOT NULL,
        fix_context      JSON NOT NULL,
        patch            JSON NOT NULL,
        agent            TEXT NOT NULL,
        attempts         INTEGER NOT NULL DEFAULT 1,
        confidence       REAL NOT NULL DEFAULT 1.0 CHECK (confidence > 0),
        created_at       DATETIME NOT NULL,
        updated_at       DATETIME NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_incidents_confidence ON incidents(confidence DESC);

    CREATE TABLE IF NOT EXISTS sessions (
        session_id       TEXT PRIMARY KEY,
        spec             JSON NOT NULL,
        status           TEXT NOT NULL CHECK (status IN ('in_progress', 'success', 'failed')),
        started_at       DATETIME NOT NULL,
        ended_at         DATETIME,
        output_location  TEXT
    );

    CREATE INDEX IF NOT EXISTS idx_sessions_started ON sessions(started_at DESC);
    "#,
    // Version 2: per-role prompt overrides
    r#"
    CREATE TABLE IF NOT EXISTS agent_prompts (
        id               INTEGER PRIMARY KEY AUTOINCREMENT,
        role             TEXT NOT NULL,
        prompt_text      TEXT NOT NULL,
        version          INTEGER NOT NULL DEFAULT 1,
        is_active        INTEGER NOT NULL DEFAULT 1,
        created_at       DATETIME NOT NULL,
        UNIQUE(role, version)
    );

    CREATE INDEX IF NOT EXISTS idx_agent_prompts_active ON agent_prompts(role, is_active);
    "#,
];

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> KbResult<()> {
    let current_version: i32 = conn
        .query_row("PRAGMA user_version", [], |r| r.get(0))
        .unwrap_or(0);

    tracing::debug!(
        current_version,
        target_version = SCHEMA_VERSION,
        "Checking knowledge base migrations"
    );

    for (i, migration) in MIGRATIONS.iter().enumerate() {
        let version = (i + 1) as i32;
        if version > current_version {
            tracing::info!(version, "Running knowledge base migration");
            conn.execute_batch(migration)?;
            conn.execute_batch(&format!("PRAGMA user_version = {}", version))?;
        }
    }

    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> KbResult<i32> {
    let version: i32 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_tables_created() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        for table in ["incidents", "sessions", "agent_prompts"] {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                    [table],
                    |r| r.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "table {} missing", table);
        }
    }

    #[test]
    fn test_confidence_must_be_positive() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let result = conn.execute(
            "INSERT INTO incidents (signature, raw_log, fix_context, patch, agent, confidence, created_at, updated_at)
             VALUES ('s', '', '{}', '{}', 'a', 0.0, '2024-01-01', '2024-01-01')",
            [],
        );
        assert!(result.is_err());
    }
}
