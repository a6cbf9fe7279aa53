/*!
 * Tests for application configuration functionality
 */

use hera_db::app_config::{Config, DatabaseConfig, LogLevel};
use hera_db::database::Database;
use log::LevelFilter;

use crate::common;

/// Test default configuration values
#[test]
fn test_default_config_withNoParameters_shouldHaveCorrectDefaults() {
    let config = Config::default();

    assert_eq!(config.database.librarian_file, "librarian.db");
    assert_eq!(config.database.mc_file, "mc.db");
    assert!(config.database.create_if_missing);
    assert!(config.database.data_dir.is_none());
    assert_eq!(config.log_level, LogLevel::Info);
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_validation_withBadFileNames_shouldFail() {
    let mut config = Config::default();

    config.database.librarian_file = "".to_string();
    assert!(config.validate().is_err());

    config.database.librarian_file = "sub/dir.db".to_string();
    assert!(config.validate().is_err());

    config.database.librarian_file = "mc.db".to_string();
    assert!(config.validate().is_err(), "both deployments on one file must be rejected");

    config.database.librarian_file = "hl.db".to_string();
    assert!(config.validate().is_ok());
}

#[test]
fn test_databasePath_withExplicitDir_shouldJoinFileName() {
    let config = DatabaseConfig::in_dir("/data/hera");

    assert_eq!(
        config.database_path(Database::Librarian).unwrap(),
        std::path::PathBuf::from("/data/hera/librarian.db")
    );
    assert_eq!(
        config.database_path(Database::MonitorControl).unwrap(),
        std::path::PathBuf::from("/data/hera/mc.db")
    );
}

#[test]
fn test_config_fromPartialJson_shouldFillDefaults() {
    let config: Config =
        serde_json::from_str(r#"{ "database": { "mc_file": "monitor.db" }, "log_level": "debug" }"#)
            .expect("partial config should parse");

    assert_eq!(config.database.mc_file, "monitor.db");
    assert_eq!(config.database.librarian_file, "librarian.db");
    assert!(config.database.create_if_missing);
    assert_eq!(config.log_level, LogLevel::Debug);
}

#[test]
fn test_loadOrDefault_withMissingFile_shouldWriteDefaults() {
    let dir = common::create_temp_dir().unwrap();
    let path = dir.path().join("conf.json");

    let config = Config::load_or_default(&path).expect("default config should load");

    assert!(path.exists());
    assert_eq!(config, Config::default());
    assert_eq!(Config::from_file(&path).unwrap(), config);
}

#[test]
fn test_save_thenFromFile_shouldPreserveSettings() {
    let dir = common::create_temp_dir().unwrap();
    let path = dir.path().join("conf.json");
    let mut config = Config::default();
    config.database = DatabaseConfig::in_dir(dir.path());
    config.database.create_if_missing = false;
    config.log_level = LogLevel::Trace;

    config.save(&path).unwrap();
    let loaded = Config::from_file(&path).unwrap();

    assert_eq!(loaded, config);
}

#[test]
fn test_fromFile_withInvalidJson_shouldFail() {
    let dir = common::create_temp_dir().unwrap();
    let path = dir.path().join("conf.json");
    std::fs::write(&path, "{ not json").unwrap();

    let error = Config::from_file(&path).unwrap_err();

    assert!(error.to_string().contains("Failed to parse config file"));
}

#[test]
fn test_logLevel_toLevelFilter_shouldMapEachLevel() {
    assert_eq!(LogLevel::Error.to_level_filter(), LevelFilter::Error);
    assert_eq!(LogLevel::Warn.to_level_filter(), LevelFilter::Warn);
    assert_eq!(LogLevel::Info.to_level_filter(), LevelFilter::Info);
    assert_eq!(LogLevel::Debug.to_level_filter(), LevelFilter::Debug);
    assert_eq!(LogLevel::Trace.to_level_filter(), LevelFilter::Trace);
}
