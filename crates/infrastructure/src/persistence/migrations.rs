//! Database migrations
//!
//! Schema versioning via `PRAGMA user_version`. Rollbacks are manual: fix
//! the underlying issue, repair the database if needed, re-run migrations.
//!
//! Adding a migration: increment `SCHEMA_VERSION`, add a `migrate_vX`
//! function, and call it from `run_migrations`.

use rusqlite::Connection;
use tracing::{error, info};

use super::connection::DatabaseError;

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    let current_version = get_schema_version(conn)?;

    if current_version < SCHEMA_VERSION {
        info!(
            from_version = current_version,
            to_version = SCHEMA_VERSION,
            "Running database migrations"
        );

        if current_version < 1 {
            if let Err(e) = migrate_v1(conn) {
                error!(version = 1, error = %e, "Migration V001 (initial schema) failed");
                return Err(e);
            }
        }

        set_schema_version(conn, SCHEMA_VERSION)?;
        info!(version = SCHEMA_VERSION, "Migrations finished");
    }

    Ok(())
}

fn get_schema_version(conn: &Connection) -> Result<i32, DatabaseError> {
    let version: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    Ok(version)
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<(), DatabaseError> {
    conn.pragma_update(None, "user_version", version)?;
    Ok(())
}

/// V001: delivery test records
///
/// The results array and history log are JSON documents: they are read and
/// written as a whole with the record, never queried relationally.
fn migrate_v1(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS delivery_tests (
            id TEXT PRIMARY KEY,
            code TEXT NOT NULL UNIQUE,
            user_email TEXT NOT NULL,
            user_name TEXT,
            status TEXT NOT NULL,
            overall_score INTEGER NOT NULL DEFAULT 0,
            delivered_count INTEGER NOT NULL DEFAULT 0,
            spam_count INTEGER NOT NULL DEFAULT 0,
            inbox_count INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            started_at TEXT,
            completed_at TEXT,
            shareable_link TEXT,
            results TEXT NOT NULL,
            history TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_delivery_tests_status
            ON delivery_tests(status);
        CREATE INDEX IF NOT EXISTS idx_delivery_tests_user_created
            ON delivery_tests(user_email, created_at DESC);
        CREATE INDEX IF NOT EXISTS idx_delivery_tests_created
            ON delivery_tests(created_at);
        ",
    )?;
    Ok(())
}
