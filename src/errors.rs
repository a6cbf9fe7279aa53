/*!
 * Error types for the hera-db data-access layer.
 *
 * Connection failures, query failures and row-mapping problems each get
 * their own variant so callers can tell them apart without string matching.
 * "Not found" is never an error: lookups return `Ok(None)`.
 */

use thiserror::Error;

use crate::database::models::Database;

/// Convenience alias for results returned by database operations
pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Errors that can occur when talking to a Librarian or M&C database
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// The database could not be opened
    #[error("Failed to connect to the {database} database: {message}")]
    Connection {
        /// Which logical database was being opened
        database: Database,
        /// Underlying driver message
        message: String,
    },

    /// A statement failed inside SQLite
    #[error("Query failed: {0}")]
    Query(#[from] rusqlite::Error),

    /// A filter could not be built from the given column or clause
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    /// A row could not be mapped onto a typed record
    #[error("Cannot map column '{column}' of table '{table}': {message}")]
    RowMapping {
        table: String,
        column: String,
        message: String,
    },

    /// An insert that requires a caller-supplied identifier did not get one
    #[error("An explicit identifier is required for this insert")]
    MissingId,

    /// The connection mutex was poisoned by a panicking holder
    #[error("Failed to acquire database lock: {0}")]
    Lock(String),

    /// An observation id could not be derived or interpreted
    #[error(transparent)]
    Obsid(#[from] ObsidError),
}

/// Errors from converting between Julian dates, file names and obsids
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ObsidError {
    /// The file name does not follow the `zen.<JD>.<pol>...` convention
    #[error("Cannot infer an observation from file name '{name}': {reason}")]
    UnrecognizedName { name: String, reason: String },

    /// The time is not representable as a positive GPS-second obsid
    #[error("Time out of range for an obsid: {0}")]
    OutOfRange(String),

    /// A built-in file name pattern failed to compile
    #[error("Invalid file name pattern: {0}")]
    Pattern(String),
}

impl DatabaseError {
    /// Whether this error came from opening the database
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }
}
