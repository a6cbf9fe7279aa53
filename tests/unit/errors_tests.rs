/*!
 * Tests for error types and conversions
 */

use hera_db::database::Database;
use hera_db::errors::DatabaseError;

#[test]
fn test_connectionError_shouldDisplayDatabaseAndMessage() {
    let error = DatabaseError::Connection {
        database: Database::Librarian,
        message: "unable to open database file".to_string(),
    };
    let display = format!("{}", error);
    assert!(display.contains("librarian"));
    assert!(display.contains("unable to open database file"));
}

#[test]
fn test_invalidFilter_shouldDisplayCorrectly() {
    let error = DatabaseError::InvalidFilter("'1x' is not a column name".to_string());
    let display = format!("{}", error);
    assert!(display.contains("Invalid filter"));
    assert!(display.contains("1x"));
}

#[test]
fn test_rowMapping_shouldDisplayTableAndColumn() {
    let error = DatabaseError::RowMapping {
        table: "observation".to_string(),
        column: "julian_date".to_string(),
        message: "expected real, found text".to_string(),
    };
    let display = format!("{}", error);
    assert!(display.contains("observation"));
    assert!(display.contains("julian_date"));
    assert!(display.contains("expected real"));
}

#[test]
fn test_databaseError_intoAnyhow_shouldKeepMessage() {
    let error: anyhow::Error = DatabaseError::MissingId.into();
    assert!(error.to_string().contains("explicit identifier"));
}
