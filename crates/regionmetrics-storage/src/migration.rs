//! Schema migrations.
//!
//! Version-based SQLite schema management.

use rusqlite::Connection;
use tracing::{debug, info};

/// Current schema version
const CURRENT_VERSION: u32 = 2;

/// Run pending migrations
pub fn run_migrations(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )?;

    let current = get_version(conn)?;
    info!("schema version: {current}, target: {CURRENT_VERSION}");

    if current < 1 {
        migrate_v1(conn)?;
    }

    if current < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

/// Current schema version
pub fn get_version(conn: &Connection) -> Result<u32, rusqlite::Error> {
    let result: Result<u32, _> = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    );
    result.or(Ok(0))
}

/// V1: series metadata + points
fn migrate_v1(conn: &Connection) -> Result<(), rusqlite::Error> {
    debug!("running migration V1: statistics_meta + statistics");

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS statistics_meta (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            statistic_id TEXT NOT NULL UNIQUE,
            source TEXT NOT NULL,
            name TEXT NOT NULL,
            unit TEXT NOT NULL,
            has_mean INTEGER NOT NULL DEFAULT 1,
            has_sum INTEGER NOT NULL DEFAULT 0
        );

        -- one point per (series, start)
        CREATE TABLE IF NOT EXISTS statistics (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            metadata_id INTEGER NOT NULL REFERENCES statistics_meta(id) ON DELETE CASCADE,
            start_ts INTEGER NOT NULL,
            start TEXT NOT NULL,
            mean REAL NOT NULL,
            state REAL NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(metadata_id, start_ts)
        );

        INSERT INTO schema_version (version) VALUES (1);
        ",
    )?;

    info!("migration V1 complete");
    Ok(())
}

/// V2: index for newest-first series scans
fn migrate_v2(conn: &Connection) -> Result<(), rusqlite::Error> {
    debug!("running migration V2: statistics start index");

    conn.execute_batch(
        "
        CREATE INDEX IF NOT EXISTS idx_statistics_meta_start
            ON statistics(metadata_id, start_ts DESC);

        INSERT INTO schema_version (version) VALUES (2);
        ",
    )?;

    info!("migration V2 complete");
    Ok(())
}
