use anyhow::{anyhow, Context, Result};
use log::{warn, LevelFilter};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::database::models::Database;

/// Application configuration module
/// This module handles loading, validating and saving the settings that
/// locate the Librarian and M&C database files.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// Database location settings
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Where the database files live and how they are opened
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DatabaseConfig {
    // @field: Directory holding both files; platform data dir when unset
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    // @field: Librarian database file name
    #[serde(default = "default_librarian_file")]
    pub librarian_file: String,

    // @field: M&C database file name
    #[serde(default = "default_mc_file")]
    pub mc_file: String,

    // @field: Create missing files instead of failing to connect
    #[serde(default = "default_true")]
    pub create_if_missing: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            librarian_file: default_librarian_file(),
            mc_file: default_mc_file(),
            create_if_missing: default_true(),
        }
    }
}

impl DatabaseConfig {
    /// Config rooted at an explicit directory
    pub fn in_dir<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: Some(data_dir.as_ref().to_path_buf()),
            ..Self::default()
        }
    }

    // @returns: File name configured for the database
    pub fn file_name(&self, database: Database) -> &str {
        match database {
            Database::Librarian => &self.librarian_file,
            Database::MonitorControl => &self.mc_file,
        }
    }

    /// Resolve the directory holding the database files
    pub fn resolve_data_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }

        let base_dir = dirs::data_local_dir()
            .or_else(dirs::data_dir)
            .or_else(|| dirs::home_dir().map(|h| h.join(".local").join("share")))
            .ok_or_else(|| anyhow!("Could not determine data directory"))?;

        Ok(base_dir.join(DEFAULT_DATA_DIRNAME))
    }

    /// Full path of the file backing `database`
    pub fn database_path(&self, database: Database) -> Result<PathBuf> {
        Ok(self.resolve_data_dir()?.join(self.file_name(database)))
    }

    pub fn validate(&self) -> Result<()> {
        for database in Database::ALL {
            let name = self.file_name(database);
            if name.trim().is_empty() {
                return Err(anyhow!("Database file name for {} must not be empty", database));
            }
            if name.contains('/') || name.contains('\\') {
                return Err(anyhow!(
                    "Database file name for {} must not contain a path separator: {}",
                    database,
                    name
                ));
            }
        }

        if self.librarian_file == self.mc_file {
            return Err(anyhow!(
                "Librarian and M&C databases must use different files, both are '{}'",
                self.mc_file
            ));
        }

        Ok(())
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

/// Directory name under the user's data directory
const DEFAULT_DATA_DIRNAME: &str = "hera-db";

fn default_librarian_file() -> String {
    "librarian.db".to_string()
}

fn default_mc_file() -> String {
    "mc.db".to_string()
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        self.database.validate()
    }

    /// Load a configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open config file: {}", path.display()))?;

        let reader = BufReader::new(file);
        let config: Config = serde_json::from_reader(reader)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Write the configuration as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let config_json =
            serde_json::to_string_pretty(self).context("Failed to serialize config to JSON")?;

        std::fs::write(path, config_json)
            .with_context(|| format!("Failed to write config to file: {}", path.display()))?;

        Ok(())
    }

    /// Load the file at `path`, or write and return the default config
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            return Self::from_file(path);
        }

        warn!(
            "Config file not found at '{}', creating default config.",
            path.display()
        );
        let config = Config::default();
        config.save(path)?;
        Ok(config)
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            database: DatabaseConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}
