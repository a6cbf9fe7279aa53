/*!
 * Database connection management.
 *
 * A `DatabaseConnection` is the explicit handle every operation goes
 * through. It owns one SQLite connection for one logical database and
 * remembers the text of the most recent failure on that connection.
 */

use log::{debug, error, info};
use rusqlite::{Connection, OpenFlags};
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use super::models::Database;
use super::schema;
use crate::app_config::DatabaseConfig;
use crate::errors::{DatabaseError, DatabaseResult};

/// Path reported for in-memory databases
const IN_MEMORY_PATH: &str = ":memory:";

/// Database connection wrapper with thread-safe access
#[derive(Clone)]
pub struct DatabaseConnection {
    /// Which deployment this handle talks to
    database: Database,
    /// Path to the database file
    db_path: PathBuf,
    /// Thread-safe connection wrapped in Arc<Mutex>
    connection: Arc<Mutex<Connection>>,
    /// Text of the most recent failed operation, empty after a success
    last_error: Arc<Mutex<String>>,
}

impl DatabaseConnection {
    /// Open the file configured for `database`
    ///
    /// Failure is logged with the database name and returned as
    /// `DatabaseError::Connection`. There is no retry.
    pub fn open(database: Database, config: &DatabaseConfig) -> DatabaseResult<Self> {
        let db_path = config
            .database_path(database)
            .map_err(|e| connection_failure(database, e))?;

        let flags = if config.create_if_missing {
            if let Some(parent) = db_path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    connection_failure(
                        database,
                        format!("cannot create directory {:?}: {}", parent, e),
                    )
                })?;
            }
            OpenFlags::default()
        } else {
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX
        };

        info!("Opening {} database at: {:?}", database, db_path);

        let conn = Connection::open_with_flags(&db_path, flags)
            .map_err(|e| connection_failure(database, e))?;

        Self::from_connection(database, db_path, conn)
    }

    /// Create an in-memory database (for testing)
    pub fn new_in_memory(database: Database) -> DatabaseResult<Self> {
        debug!("Creating in-memory {} database", database);

        let conn = Connection::open_in_memory().map_err(|e| connection_failure(database, e))?;

        Self::from_connection(database, PathBuf::from(IN_MEMORY_PATH), conn)
    }

    fn from_connection(database: Database, db_path: PathBuf, conn: Connection) -> DatabaseResult<Self> {
        // A file that is not a database only fails here, on first read.
        schema::configure_connection(&conn)
            .and_then(|_| schema::initialize_schema(&conn, database))
            .map_err(|e| match e {
                DatabaseError::Connection { message, .. } => connection_failure(database, message),
                other => connection_failure(database, other),
            })?;

        Ok(Self {
            database,
            db_path,
            connection: Arc::new(Mutex::new(conn)),
            last_error: Arc::new(Mutex::new(String::new())),
        })
    }

    /// Which deployment this handle is connected to
    pub fn database(&self) -> Database {
        self.database
    }

    /// Get the database file path
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Whether this handle holds an in-memory database
    pub fn is_in_memory(&self) -> bool {
        self.db_path.as_os_str() == IN_MEMORY_PATH
    }

    /// Execute a database operation with the connection
    ///
    /// The lock is held for the whole closure. A failure is recorded as this
    /// connection's last error; a success clears it.
    pub fn execute<F, T>(&self, f: F) -> DatabaseResult<T>
    where
        F: FnOnce(&Connection) -> DatabaseResult<T>,
    {
        let result = {
            let conn = self
                .connection
                .lock()
                .map_err(|e| DatabaseError::Lock(e.to_string()))?;

            f(&conn)
        };

        self.record_outcome(&result);
        result
    }

    fn record_outcome<T>(&self, result: &DatabaseResult<T>) {
        let mut last_error = self.last_error.lock().unwrap_or_else(PoisonError::into_inner);
        match result {
            Ok(_) => last_error.clear(),
            Err(DatabaseError::Query(e)) => {
                debug!("{} query failed: {}", self.database, e);
                *last_error = e.to_string();
            }
            Err(e) => {
                debug!("{} operation failed: {}", self.database, e);
                *last_error = e.to_string();
            }
        }
    }

    /// Most recent error text on this connection, or an empty string
    pub fn last_error(&self) -> String {
        self.last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Most recently generated row id on this connection
    ///
    /// Shared by every clone of this handle. Prefer the id returned by the
    /// insert call itself.
    pub fn last_insert_id(&self) -> i64 {
        self.connection
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last_insert_rowid()
    }

    /// Get database statistics
    pub fn stats(&self) -> DatabaseResult<DatabaseStats> {
        self.execute(|conn| {
            let source_count: i64 =
                conn.query_row("SELECT COUNT(*) FROM source", [], |row| row.get(0))?;

            let observation_count: i64 =
                conn.query_row("SELECT COUNT(*) FROM observation", [], |row| row.get(0))?;

            // Get file size if not in-memory
            let file_size = if self.is_in_memory() {
                0
            } else {
                match std::fs::metadata(&self.db_path) {
                    Ok(metadata) => metadata.len(),
                    Err(e) => {
                        debug!(
                            "Cannot read the size of {}: {}",
                            self.db_path.display(),
                            e
                        );
                        0
                    }
                }
            };

            Ok(DatabaseStats {
                database: self.database,
                source_count,
                observation_count,
                file_size_bytes: file_size,
            })
        })
    }
}

/// Log a connection failure and build the matching error
fn connection_failure(database: Database, message: impl Display) -> DatabaseError {
    let message = message.to_string();
    error!("Cannot connect to the {} database: {}", database, message);
    DatabaseError::Connection { database, message }
}

/// Database statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct DatabaseStats {
    /// Deployment the numbers belong to
    pub database: Database,
    /// Rows in `source`
    pub source_count: i64,
    /// Rows in `observation`
    pub observation_count: i64,
    /// Database file size in bytes
    pub file_size_bytes: u64,
}

impl std::fmt::Display for DatabaseStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Database: {}, Sources: {}, Observations: {}, Size: {} KB",
            self.database,
            self.source_count,
            self.observation_count,
            self.file_size_bytes / 1024
        )
    }
}
