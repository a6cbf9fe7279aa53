/*!
 * Repository layer for database operations.
 *
 * Typed insert/lookup/enumerate operations for the `source` and
 * `observation` tables, built on the generic row accessor.
 */

use log::debug;
use rusqlite::params;

use super::connection::DatabaseConnection;
use super::models::{
    format_timestamp, Database, IdPolicy, ObservationRecord, Row, SourceRecord, Table, Value,
};
use super::rows::{self, Filter};
use crate::app_config::DatabaseConfig;
use crate::errors::{DatabaseError, DatabaseResult};

/// Repository for database operations
#[derive(Clone)]
pub struct Repository {
    /// Database connection
    db: DatabaseConnection,
}

impl Repository {
    /// Create a new repository with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Open the configured file for `database`
    pub fn open(database: Database, config: &DatabaseConfig) -> DatabaseResult<Self> {
        Ok(Self::new(DatabaseConnection::open(database, config)?))
    }

    /// Create a repository with an in-memory database (for testing)
    pub fn new_in_memory(database: Database) -> DatabaseResult<Self> {
        Ok(Self::new(DatabaseConnection::new_in_memory(database)?))
    }

    /// The underlying connection handle
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Which deployment this repository talks to
    pub fn database(&self) -> Database {
        self.db.database()
    }

    /// Most recent error text on the underlying connection
    pub fn last_error(&self) -> String {
        self.db.last_error()
    }

    /// Most recently generated row id on the underlying connection
    pub fn last_insert_id(&self) -> i64 {
        self.db.last_insert_id()
    }

    // =========================================================================
    // Source Operations
    // =========================================================================

    /// Insert a source and return its generated id
    pub fn insert_source(&self, source: &SourceRecord) -> DatabaseResult<i64> {
        self.db.execute(|conn| {
            conn.execute(
                "INSERT INTO source (name, authenticator, create_time) VALUES (?1, ?2, ?3)",
                params![
                    source.name,
                    source.authenticator,
                    format_timestamp(&source.create_time),
                ],
            )?;
            let id = conn.last_insert_rowid();
            debug!("Inserted source '{}' with id {}", source.name, id);
            Ok(id)
        })
    }

    /// Get a source by ID
    pub fn get_source(&self, id: i64) -> DatabaseResult<Option<SourceRecord>> {
        rows::lookup_by_id(&self.db, Table::Source, id)?
            .as_ref()
            .map(SourceRecord::try_from)
            .transpose()
    }

    /// List sources, optionally restricted by `filter`
    pub fn list_sources(&self, filter: Option<&Filter>) -> DatabaseResult<Vec<SourceRecord>> {
        map_rows(rows::enumerate(&self.db, Table::Source, filter)?)
    }

    /// Find the source holding `authenticator`
    ///
    /// The column is not unique; the oldest matching source wins.
    pub fn find_source_by_authenticator(
        &self,
        authenticator: &str,
    ) -> DatabaseResult<Option<SourceRecord>> {
        let found = self.db.execute(|conn| {
            rows::query(
                conn,
                Table::Source,
                "SELECT * FROM source WHERE authenticator = ?1 ORDER BY id LIMIT 1",
                &[Value::from(authenticator)],
            )
        })?;

        found.first().map(SourceRecord::try_from).transpose()
    }

    // =========================================================================
    // Observation Operations
    // =========================================================================

    /// Insert an observation and return its id
    ///
    /// With `IdPolicy::Assigned` the record's own positive `id` is stored;
    /// with `IdPolicy::Generated` the record's `id` is ignored.
    pub fn insert_observation(
        &self,
        observation: &ObservationRecord,
        policy: IdPolicy,
    ) -> DatabaseResult<i64> {
        self.db.execute(|conn| {
            let id = match policy {
                IdPolicy::Assigned => {
                    if observation.id <= 0 {
                        return Err(DatabaseError::MissingId);
                    }
                    conn.execute(
                        r#"
                        INSERT INTO observation (id, source_id, julian_date, polarization, length_days)
                        VALUES (?1, ?2, ?3, ?4, ?5)
                        "#,
                        params![
                            observation.id,
                            observation.source_id,
                            observation.julian_date,
                            observation.polarization,
                            observation.length_days,
                        ],
                    )?;
                    observation.id
                }
                IdPolicy::Generated => {
                    conn.execute(
                        r#"
                        INSERT INTO observation (source_id, julian_date, polarization, length_days)
                        VALUES (?1, ?2, ?3, ?4)
                        "#,
                        params![
                            observation.source_id,
                            observation.julian_date,
                            observation.polarization,
                            observation.length_days,
                        ],
                    )?;
                    conn.last_insert_rowid()
                }
            };

            debug!(
                "Inserted observation {} for source {}",
                id, observation.source_id
            );
            Ok(id)
        })
    }

    /// Librarian insert: the caller supplies the observation id
    pub fn insert_observation_hl(&self, observation: &ObservationRecord) -> DatabaseResult<i64> {
        self.insert_observation(observation, IdPolicy::Assigned)
    }

    /// M&C insert: the database generates the observation id
    pub fn insert_observation_mc(&self, observation: &ObservationRecord) -> DatabaseResult<i64> {
        self.insert_observation(observation, IdPolicy::Generated)
    }

    /// Get an observation by ID
    pub fn get_observation(&self, id: i64) -> DatabaseResult<Option<ObservationRecord>> {
        rows::lookup_by_id(&self.db, Table::Observation, id)?
            .as_ref()
            .map(ObservationRecord::try_from)
            .transpose()
    }

    /// List observations, optionally restricted by `filter`
    pub fn list_observations(
        &self,
        filter: Option<&Filter>,
    ) -> DatabaseResult<Vec<ObservationRecord>> {
        map_rows(rows::enumerate(&self.db, Table::Observation, filter)?)
    }
}

fn map_rows<T>(rows: Vec<Row>) -> DatabaseResult<Vec<T>>
where
    T: for<'a> TryFrom<&'a Row, Error = DatabaseError>,
{
    rows.iter().map(T::try_from).collect()
}
