/*!
 * Database module for the Librarian and M&C deployments.
 *
 * This module provides SQLite-based access to the shared schema fragment:
 * - Connection handles, one per logical database
 * - Generic row enumeration and lookup by id
 * - Typed insert/lookup/enumerate for `source` and `observation`
 */

pub mod schema;
pub mod connection;
pub mod rows;
pub mod repository;
pub mod models;

// Re-export main types
pub use connection::{DatabaseConnection, DatabaseStats};
pub use models::{
    Database, IdPolicy, ObservationRecord, Row, SourceRecord, Table, Value, TIMESTAMP_FORMAT,
};
pub use repository::Repository;
pub use rows::Filter;
