/*!
 * # hera-db - data access for the HERA Librarian and M&C databases
 *
 * A small Rust library over the `source` and `observation` tables that the
 * Librarian and Monitor & Control databases share.
 *
 * ## Features
 *
 * - Explicit connection handles, one per logical database
 * - Generic row enumeration with bound filter values
 * - Lookup of any row by integer id
 * - Typed records for sources and observations
 * - Caller-assigned or database-generated observation ids
 * - Obsid (GPS seconds) conversions and HERA file name parsing
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `database`: SQLite access:
 *   - `database::connection`: Connection handle, last error, last insert id
 *   - `database::rows`: Generic row accessor and filters
 *   - `database::repository`: Per-table wrappers
 *   - `database::schema`: Table creation
 *   - `database::models`: Rows, values and typed records
 * - `errors`: Custom error types for the library
 * - `obsid_utils`: Julian date, obsid and file name helpers
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]

// Public modules
pub mod app_config;
pub mod database;
pub mod errors;
pub mod obsid_utils;

// Re-export main types for easier usage
pub use app_config::{Config, DatabaseConfig, LogLevel};
pub use database::{
    Database, DatabaseConnection, Filter, IdPolicy, ObservationRecord, Repository, Row,
    SourceRecord, Table, Value,
};
pub use errors::{DatabaseError, DatabaseResult, ObsidError};
