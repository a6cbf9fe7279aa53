// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{info, warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;

use hera_db::app_config::{Config, LogLevel};
use hera_db::database::{
    Database, Filter, IdPolicy, ObservationRecord, Repository, SourceRecord, TIMESTAMP_FORMAT,
};
use hera_db::obsid_utils;

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => LogLevel::Error,
            CliLogLevel::Warn => LogLevel::Warn,
            CliLogLevel::Info => LogLevel::Info,
            CliLogLevel::Debug => LogLevel::Debug,
            CliLogLevel::Trace => LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the database file and schema if needed
    Init,

    /// Insert a source
    AddSource {
        /// Source name
        #[arg(long)]
        name: String,

        /// Token used to look the source up later
        #[arg(long)]
        authenticator: String,
    },

    /// Insert an observation
    AddObservation {
        /// Owning source id
        #[arg(long)]
        source_id: i64,

        /// Start time as a Julian date
        #[arg(long)]
        jd: f64,

        /// Polarization label (e.g. xx)
        #[arg(long)]
        pol: String,

        /// Duration in days
        #[arg(long)]
        length: f64,

        /// Explicit observation id (required on the Librarian)
        #[arg(long)]
        id: Option<i64>,
    },

    /// Insert an observation described by a HERA file name
    ///
    /// The start date and polarization are read from the name
    /// (e.g. zen.2457754.50000.xx.HH.uv) and the id is its obsid.
    AddFileObservation {
        /// Owning source id
        #[arg(long)]
        source_id: i64,

        /// HERA file name or path
        #[arg(long)]
        file: String,

        /// Duration in days
        #[arg(long)]
        length: f64,
    },

    /// Show the UTC date and time an obsid stands for
    ObsidInfo { obsid: i64 },

    /// Show a source by id
    GetSource { id: i64 },

    /// Show the source holding an authenticator
    FindSource { authenticator: String },

    /// List sources
    ListSources {
        /// Only sources with this name
        #[arg(long)]
        name: Option<String>,
    },

    /// Show an observation by id
    GetObservation { id: i64 },

    /// List observations
    ListObservations {
        /// Only observations of this source
        #[arg(long)]
        source_id: Option<i64>,

        /// Only observations with this polarization
        #[arg(long)]
        pol: Option<String>,
    },

    /// Show row counts and file size
    Stats,

    /// Generate shell completions for hera-db
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// hera-db - access the Librarian and M&C source/observation tables
#[derive(Parser, Debug)]
#[command(name = "hera-db")]
#[command(version)]
#[command(about = "Data access for the HERA Librarian and M&C databases")]
#[command(long_about = "hera-db reads and writes the source and observation tables shared by the
Librarian and Monitor & Control databases. Results are printed as JSON.

EXAMPLES:
    hera-db --db mc init
    hera-db --db mc add-source --name rtp --authenticator 5f1c
    hera-db --db mc add-observation --source-id 1 --jd 2457458.1 --pol xx --length 0.007
    hera-db --db librarian add-observation --id 1172794666 --source-id 1 --jd 2457813.9 --pol xy --length 0.0069
    hera-db --db mc list-observations --source-id 1
    hera-db --db hl add-file-observation --source-id 1 --file zen.2457754.50000.xx.HH.uv --length 0.007
    hera-db obsid-info 1167264018
    hera-db completions bash > hera-db.bash

CONFIGURATION:
    Configuration is stored in conf.json by default. If the file doesn't exist,
    a default one is created. --data-dir (or HERA_DB_DIR) overrides the
    directory holding the database files.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Database to operate on: librarian (hl) or mc (m&c)
    #[arg(short, long, default_value = "librarian")]
    db: Database,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: PathBuf,

    /// Directory holding the database files
    #[arg(long, env = "HERA_DB_DIR")]
    data_dir: Option<PathBuf>,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color and tag for log level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("1;31", "ERROR"),
            Level::Warn => ("1;33", "WARN "),
            Level::Info => ("1;32", "INFO "),
            Level::Debug => ("1;36", "DEBUG"),
            Level::Trace => ("1;35", "TRACE"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (color, tag) = Self::style_for_level(record.level());

            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "\x1B[{}m{} {} {}\x1B[0m",
                color,
                now,
                tag,
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

fn main() -> Result<()> {
    // The logger accepts everything; the effective level is set below
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    match &cli.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(*shell, &mut cmd, "hera-db", &mut std::io::stdout());
            return Ok(());
        }
        Commands::ObsidInfo { obsid } => return print_obsid_info(*obsid),
        _ => {}
    }

    let mut config = Config::load_or_default(&cli.config_path)?;

    if let Some(data_dir) = cli.data_dir {
        config.database.data_dir = Some(data_dir);
    }

    if let Some(log_level) = cli.log_level {
        config.log_level = log_level.into();
    }

    config.validate().context("Configuration validation failed")?;
    log::set_max_level(config.log_level.to_level_filter());

    let repo = Repository::open(cli.db, &config.database)?;

    run_command(&repo, cli.command)
}

fn run_command(repo: &Repository, command: Commands) -> Result<()> {
    match command {
        Commands::Init => {
            info!(
                "{} database ready at {:?}",
                repo.database(),
                repo.connection().path()
            );
        }
        Commands::AddSource {
            name,
            authenticator,
        } => {
            let mut source = SourceRecord::new(name, authenticator);
            source.id = repo.insert_source(&source)?;
            print_json(&source)?;
        }
        Commands::AddObservation {
            source_id,
            jd,
            pol,
            length,
            id,
        } => {
            let mut observation = ObservationRecord::new(source_id, jd, pol, length);
            let policy = match id {
                Some(id) => {
                    observation.id = id;
                    IdPolicy::Assigned
                }
                None => repo.database().observation_id_policy(),
            };
            observation.id = repo.insert_observation(&observation, policy)?;
            print_json(&observation)?;
        }
        Commands::AddFileObservation {
            source_id,
            file,
            length,
        } => {
            let mut observation = ObservationRecord::from_file_name(source_id, &file, length)
                .with_context(|| format!("Cannot read an observation from '{}'", file))?;
            let policy = repo.database().observation_id_policy();
            observation.id = repo.insert_observation(&observation, policy)?;
            print_json(&observation)?;
        }
        Commands::GetSource { id } => match repo.get_source(id)? {
            Some(source) => print_json(&source)?,
            None => warn!("No source with id {}", id),
        },
        Commands::FindSource { authenticator } => {
            match repo.find_source_by_authenticator(&authenticator)? {
                Some(source) => print_json(&source)?,
                None => warn!("No source with that authenticator"),
            }
        }
        Commands::ListSources { name } => {
            let filter = name.map(|n| Filter::eq("name", n)).transpose()?;
            print_json(&repo.list_sources(filter.as_ref())?)?;
        }
        Commands::GetObservation { id } => match repo.get_observation(id)? {
            Some(observation) => print_json(&observation)?,
            None => warn!("No observation with id {}", id),
        },
        Commands::ListObservations { source_id, pol } => {
            let filter = combine_filters(vec![
                source_id.map(|id| Filter::eq("source_id", id)).transpose()?,
                pol.map(|p| Filter::eq("polarization", p)).transpose()?,
            ])?;
            print_json(&repo.list_observations(filter.as_ref())?)?;
        }
        Commands::Stats => {
            let stats = repo.connection().stats()?;
            info!("{}", stats);
            print_json(&stats)?;
        }
        // Handled in main before the database is opened
        Commands::Completions { .. } | Commands::ObsidInfo { .. } => {}
    }

    Ok(())
}

// @returns: Conjunction of the present filters, if any
fn combine_filters(filters: Vec<Option<Filter>>) -> Result<Option<Filter>> {
    let mut combined: Option<Filter> = None;
    for filter in filters.into_iter().flatten() {
        combined = Some(match combined {
            Some(acc) => acc.and(filter)?,
            None => filter,
        });
    }
    Ok(combined)
}

#[derive(Serialize)]
struct ObsidInfo {
    obsid: i64,
    date: String,
    utc: String,
}

fn print_obsid_info(obsid: i64) -> Result<()> {
    let utc = obsid_utils::obsid_to_utc(obsid)?;
    print_json(&ObsidInfo {
        obsid,
        date: obsid_utils::format_obsid_as_calendar_date(obsid)?,
        utc: utc.format(TIMESTAMP_FORMAT).to_string(),
    })
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}
