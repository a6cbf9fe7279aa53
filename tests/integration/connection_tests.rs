/*!
 * Connection handling against database files on disk
 */

use hera_db::app_config::DatabaseConfig;
use hera_db::database::{Database, DatabaseConnection, Repository, SourceRecord};
use hera_db::errors::DatabaseError;

use crate::common;

#[test]
fn test_open_withReachableDatabase_shouldCreateFileAndSchema() {
    let dir = common::create_temp_dir().unwrap();

    let repo = common::open_repo(&dir, Database::MonitorControl).expect("open should succeed");

    assert!(dir.path().join("mc.db").exists());
    assert_eq!(repo.database(), Database::MonitorControl);
    assert!(repo.list_sources(None).unwrap().is_empty());
}

#[test]
fn test_open_withUnreachableDatabase_shouldReturnConnectionError() {
    let dir = common::create_temp_dir().unwrap();
    let mut config = DatabaseConfig::in_dir(dir.path().join("missing"));
    config.create_if_missing = false;

    let result = DatabaseConnection::open(Database::Librarian, &config);

    match result {
        Err(error @ DatabaseError::Connection { .. }) => {
            let message = error.to_string();
            assert!(message.contains("librarian"));
            assert!(!message.is_empty());
        }
        Err(other) => panic!("expected a connection error, got {:?}", other),
        Ok(_) => panic!("opening a missing database should fail"),
    }
}

#[test]
fn test_reopen_shouldSeePreviouslyInsertedRows() {
    let dir = common::create_temp_dir().unwrap();

    let id = {
        let repo = common::open_repo(&dir, Database::Librarian).unwrap();
        repo.insert_source(&SourceRecord::new("rtp", "tok")).unwrap()
    };

    let repo = common::open_repo(&dir, Database::Librarian).unwrap();
    let source = repo.get_source(id).unwrap().expect("row should persist");

    assert_eq!(source.name, "rtp");
}

#[test]
fn test_open_withOtherDeploymentsFile_shouldRefuse() {
    let dir = common::create_temp_dir().unwrap();
    common::open_repo(&dir, Database::Librarian).unwrap();

    let mut config = DatabaseConfig::in_dir(dir.path());
    config.mc_file = config.librarian_file.clone();

    let result = Repository::open(Database::MonitorControl, &config);

    assert!(result.err().is_some_and(|e| e.is_connection()));
}

#[test]
fn test_stats_onDisk_shouldReportFileSize() {
    let dir = common::create_temp_dir().unwrap();
    let repo = common::open_repo(&dir, Database::MonitorControl).unwrap();
    repo.insert_source(&SourceRecord::new("a", "b")).unwrap();

    let stats = repo.connection().stats().unwrap();

    assert_eq!(stats.database, Database::MonitorControl);
    assert_eq!(stats.source_count, 1);
    assert!(stats.file_size_bytes > 0);
}

#[test]
fn test_clonedHandles_shouldShareConnectionState() {
    let dir = common::create_temp_dir().unwrap();
    let repo = common::open_repo(&dir, Database::MonitorControl).unwrap();
    let other = repo.clone();

    let id = other.insert_source(&SourceRecord::new("a", "b")).unwrap();

    assert_eq!(repo.last_insert_id(), id);
    assert!(repo.get_source(id).unwrap().is_some());
}
