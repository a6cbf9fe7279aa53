/*!
 * Common test utilities for the hera-db test suite
 */

use anyhow::Result;
use tempfile::TempDir;

use hera_db::app_config::DatabaseConfig;
use hera_db::database::{Database, Repository};

/// Creates a temporary directory for test databases
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Route library logs through env_logger when RUST_LOG is set
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Opens a file-backed repository for `database` inside `dir`
pub fn open_repo(dir: &TempDir, database: Database) -> Result<Repository> {
    init_logging();
    let config = DatabaseConfig::in_dir(dir.path());
    Ok(Repository::open(database, &config)?)
}
