/*!
 * Database schema definitions.
 *
 * Both deployments share the `source` and `observation` tables. They differ
 * only in how observation identifiers are produced: the Librarian stores ids
 * handed to it, M&C generates them.
 */

use log::{debug, info};
use rusqlite::{Connection, OptionalExtension};

use super::models::{Database, IdPolicy};
use crate::errors::{DatabaseError, DatabaseResult};

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Apply per-connection settings that SQLite does not persist
pub fn configure_connection(conn: &Connection) -> DatabaseResult<()> {
    conn.pragma_update(None, "foreign_keys", true)?;
    Ok(())
}

/// Initialize the database schema for `database`
pub fn initialize_schema(conn: &Connection, database: Database) -> DatabaseResult<()> {
    match get_schema_info(conn)? {
        None => {
            info!(
                "Initializing {} database schema v{}",
                database, SCHEMA_VERSION
            );
            create_all_tables(conn, database)?;
            set_schema_version(conn, database, SCHEMA_VERSION)?;
        }
        Some((_, stored)) if stored != database.name() => {
            return Err(DatabaseError::Connection {
                database,
                message: format!("file holds the {} schema", stored),
            });
        }
        Some((version, _)) if version != SCHEMA_VERSION => {
            return Err(DatabaseError::Connection {
                database,
                message: format!(
                    "schema version {} is not supported (expected {})",
                    version, SCHEMA_VERSION
                ),
            });
        }
        Some((version, _)) => {
            debug!("{} database schema is up to date (v{})", database, version);
        }
    }

    Ok(())
}

/// Stored schema version and database name, or `None` for a fresh file
fn get_schema_info(conn: &Connection) -> DatabaseResult<Option<(i32, String)>> {
    let table_exists: bool = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='schema_version'",
        [],
        |row| row.get(0),
    )?;

    if !table_exists {
        return Ok(None);
    }

    let info = conn
        .query_row(
            "SELECT version, deployment FROM schema_version WHERE id = 1",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    Ok(info)
}

fn set_schema_version(conn: &Connection, database: Database, version: i32) -> DatabaseResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_version (id, version, deployment, updated_at) VALUES (1, ?1, ?2, datetime('now'))",
        rusqlite::params![version, database.name()],
    )?;
    Ok(())
}

/// Primary key declaration for observation ids under `policy`
fn observation_id_column(policy: IdPolicy) -> &'static str {
    match policy {
        IdPolicy::Assigned => "id INTEGER PRIMARY KEY",
        IdPolicy::Generated => "id INTEGER PRIMARY KEY AUTOINCREMENT",
    }
}

/// Create all database tables
fn create_all_tables(conn: &Connection, database: Database) -> DatabaseResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            version INTEGER NOT NULL,
            deployment TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS source (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            authenticator TEXT NOT NULL,
            create_time TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_source_authenticator ON source(authenticator);
        "#,
    )?;

    let observation_sql = format!(
        r#"
        CREATE TABLE IF NOT EXISTS observation (
            {},
            source_id INTEGER NOT NULL REFERENCES source(id),
            julian_date REAL NOT NULL,
            polarization TEXT NOT NULL,
            length_days REAL NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_observation_source ON observation(source_id);
        "#,
        observation_id_column(database.observation_id_policy())
    );
    conn.execute_batch(&observation_sql)?;

    info!("{} database schema created successfully", database);
    Ok(())
}
