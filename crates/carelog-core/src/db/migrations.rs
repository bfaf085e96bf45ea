//! Database migrations

use rusqlite::Connection;

use crate::error::Result;

/// Run all pending migrations
pub fn run(conn: &Connection) -> Result<()> {
    let version = get_version(conn)?;

    if version < 1 {
        migrate_v1(conn)?;
    }

    Ok(())
}

/// Get the current schema version
fn get_version(conn: &Connection) -> Result<i32> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
        [],
        |row| row.get::<_, i32>(0).map(|flag| flag != 0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )?;

    Ok(version)
}

/// Migration to version 1: initial schema.
///
/// All entity types share one `records` table: sync metadata lives in real
/// columns (they drive collection and merging), the domain fields live in the
/// serialized `payload` exactly as it goes on the wire.
fn migrate_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "BEGIN;
         CREATE TABLE IF NOT EXISTS schema_version (
             version INTEGER PRIMARY KEY
         );
         CREATE TABLE IF NOT EXISTS records (
             local_id    INTEGER PRIMARY KEY AUTOINCREMENT,
             entity_type TEXT NOT NULL,
             remote_id   TEXT,
             version     INTEGER NOT NULL DEFAULT 1,
             created_at  INTEGER NOT NULL,
             updated_at  INTEGER NOT NULL,
             deleted_at  INTEGER,
             sync_status TEXT NOT NULL DEFAULT 'PENDING',
             payload     TEXT NOT NULL
         );
         CREATE INDEX IF NOT EXISTS idx_records_type_status
             ON records(entity_type, sync_status);
         CREATE UNIQUE INDEX IF NOT EXISTS idx_records_type_remote
             ON records(entity_type, remote_id) WHERE remote_id IS NOT NULL;
         CREATE INDEX IF NOT EXISTS idx_records_type_updated
             ON records(entity_type, updated_at DESC);
         CREATE TABLE IF NOT EXISTS sync_meta (
             key   TEXT PRIMARY KEY,
             value TEXT NOT NULL
         );
         INSERT INTO schema_version (version) VALUES (1);
         COMMIT;",
    )?;

    Ok(())
}
