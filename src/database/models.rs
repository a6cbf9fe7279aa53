/*!
 * Database entity models.
 *
 * `Row` is the loosely-typed record returned by the generic accessor;
 * `SourceRecord` and `ObservationRecord` are the typed records built from
 * it by explicit field mapping.
 */

use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};
use rusqlite::ToSql;
use rusqlite::types::{ToSqlOutput, ValueRef};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::sync::Arc;

use crate::errors::{DatabaseError, DatabaseResult, ObsidError};
use crate::obsid_utils;

/// Storage format of `create_time` columns (UTC, whole seconds)
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// The two logical deployments sharing the source/observation schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Database {
    /// The Librarian database
    #[serde(rename = "librarian")]
    Librarian,
    /// The Monitor & Control database
    #[serde(rename = "mc")]
    MonitorControl,
}

impl Database {
    /// Both deployments, in a stable order
    pub const ALL: [Database; 2] = [Database::Librarian, Database::MonitorControl];

    /// Short identifier used in file names, logs and the CLI
    pub fn name(&self) -> &'static str {
        match self {
            Database::Librarian => "librarian",
            Database::MonitorControl => "mc",
        }
    }

    /// How this deployment assigns observation identifiers
    pub fn observation_id_policy(&self) -> IdPolicy {
        match self {
            Database::Librarian => IdPolicy::Assigned,
            Database::MonitorControl => IdPolicy::Generated,
        }
    }
}

impl fmt::Display for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for Database {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "librarian" | "hl" => Ok(Database::Librarian),
            "mc" | "m&c" => Ok(Database::MonitorControl),
            _ => Err(anyhow::anyhow!("Invalid database name: {}", s)),
        }
    }
}

/// Tables reachable through the generic accessor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Source,
    Observation,
}

impl Table {
    /// SQL name of the table
    pub fn name(&self) -> &'static str {
        match self {
            Table::Source => "source",
            Table::Observation => "observation",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Whether an inserted observation carries its own identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdPolicy {
    /// The caller supplies `id` (Librarian)
    Assigned,
    /// The database generates `id` (M&C)
    Generated,
}

/// A single SQLite column value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    /// Short name of the stored type, used in mapping errors
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Integer(_) => "integer",
            Value::Real(_) => "real",
            Value::Text(_) => "text",
            Value::Blob(_) => "blob",
        }
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Borrowed(ValueRef::Null),
            Value::Integer(i) => ToSqlOutput::Borrowed(ValueRef::Integer(*i)),
            Value::Real(r) => ToSqlOutput::Borrowed(ValueRef::Real(*r)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Blob(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
        })
    }
}

impl From<ValueRef<'_>> for Value {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Integer(i),
            ValueRef::Real(r) => Value::Real(r),
            ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => Value::Blob(b.to_vec()),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Real(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// Loosely-typed row: column names paired with values, in select order
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    table: Table,
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    pub(crate) fn new(table: Table, columns: Arc<[String]>, values: Vec<Value>) -> Self {
        Self {
            table,
            columns,
            values,
        }
    }

    /// Table this row was read from
    pub fn table(&self) -> Table {
        self.table
    }

    /// Column names in select order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Values aligned with `columns()`
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Value of the named column, if the row has it
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| self.values.get(i))
    }

    /// Integer value of a non-null column
    pub fn integer(&self, column: &str) -> DatabaseResult<i64> {
        match self.require(column)? {
            Value::Integer(i) => Ok(*i),
            other => Err(self.mismatch(column, "integer", other)),
        }
    }

    /// Real value of a non-null column; integers are widened
    pub fn real(&self, column: &str) -> DatabaseResult<f64> {
        match self.require(column)? {
            Value::Real(r) => Ok(*r),
            Value::Integer(i) => Ok(*i as f64),
            other => Err(self.mismatch(column, "real", other)),
        }
    }

    /// Text value of a non-null column
    pub fn text(&self, column: &str) -> DatabaseResult<&str> {
        match self.require(column)? {
            Value::Text(s) => Ok(s.as_str()),
            other => Err(self.mismatch(column, "text", other)),
        }
    }

    /// Timestamp stored as `TIMESTAMP_FORMAT` text
    pub fn timestamp(&self, column: &str) -> DatabaseResult<DateTime<Utc>> {
        let text = self.text(column)?;
        parse_timestamp(text).map_err(|e| self.mapping_error(column, e.to_string()))
    }

    fn require(&self, column: &str) -> DatabaseResult<&Value> {
        self.get(column)
            .ok_or_else(|| self.mapping_error(column, "column missing from row".to_string()))
    }

    fn mismatch(&self, column: &str, expected: &str, found: &Value) -> DatabaseError {
        self.mapping_error(
            column,
            format!("expected {}, found {}", expected, found.type_name()),
        )
    }

    fn mapping_error(&self, column: &str, message: String) -> DatabaseError {
        DatabaseError::RowMapping {
            table: self.table.to_string(),
            column: column.to_string(),
            message,
        }
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (column, value) in self.columns.iter().zip(&self.values) {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

/// Format a timestamp the way `create_time` columns store it
pub fn format_timestamp(time: &DateTime<Utc>) -> String {
    time.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a stored `create_time` value
pub fn parse_timestamp(text: &str) -> chrono::ParseResult<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT).map(|t| t.and_utc())
}

/// A row of the `source` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    /// Database ID (assigned on insert)
    pub id: i64,
    /// Human-readable source name
    pub name: String,
    /// Opaque token used to look the source up
    pub authenticator: String,
    /// Creation time, whole seconds
    pub create_time: DateTime<Utc>,
}

impl SourceRecord {
    /// Create a new source record stamped with the current time
    pub fn new(name: impl Into<String>, authenticator: impl Into<String>) -> Self {
        Self {
            id: 0, // Will be assigned by database
            name: name.into(),
            authenticator: authenticator.into(),
            create_time: Utc::now().trunc_subsecs(0),
        }
    }

    /// Replace the creation time, dropping sub-second precision
    pub fn with_create_time(mut self, create_time: DateTime<Utc>) -> Self {
        self.create_time = create_time.trunc_subsecs(0);
        self
    }
}

impl TryFrom<&Row> for SourceRecord {
    type Error = DatabaseError;

    fn try_from(row: &Row) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.integer("id")?,
            name: row.text("name")?.to_string(),
            authenticator: row.text("authenticator")?.to_string(),
            create_time: row.timestamp("create_time")?,
        })
    }
}

/// A row of the `observation` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationRecord {
    /// Observation ID; caller-supplied on the Librarian, generated on M&C
    pub id: i64,
    /// Source this observation came from
    pub source_id: i64,
    /// Start of the observation as a Julian date
    pub julian_date: f64,
    /// Polarization label, e.g. "xx"
    pub polarization: String,
    /// Duration in days
    pub length_days: f64,
}

impl ObservationRecord {
    /// Create a new observation record without an identifier
    pub fn new(
        source_id: i64,
        julian_date: f64,
        polarization: impl Into<String>,
        length_days: f64,
    ) -> Self {
        Self {
            id: 0,
            source_id,
            julian_date,
            polarization: polarization.into(),
            length_days,
        }
    }

    /// Set a caller-chosen identifier
    pub fn with_id(mut self, id: i64) -> Self {
        self.id = id;
        self
    }

    /// Build a Librarian observation from a HERA file name
    ///
    /// `zen.2457754.50000.xx.HH.uv` yields Julian date 2457754.5,
    /// polarization `xx` and, as `id`, the obsid of that start time.
    pub fn from_file_name(
        source_id: i64,
        name: &str,
        length_days: f64,
    ) -> Result<Self, ObsidError> {
        let julian_date = obsid_utils::start_jd_from_path(name)?;
        let polarization = obsid_utils::pol_from_path(name)?;
        let obsid = obsid_utils::obsid_from_julian_date(julian_date)?;

        Ok(Self::new(source_id, julian_date, polarization, length_days).with_id(obsid))
    }

    /// Start of the observation in UTC
    pub fn start_time(&self) -> Result<DateTime<Utc>, ObsidError> {
        obsid_utils::julian_date_to_utc(self.julian_date)
    }

    /// UTC calendar date of `id` read as an obsid, e.g. `2017-01-01`
    pub fn obsid_calendar_date(&self) -> Result<String, ObsidError> {
        obsid_utils::format_obsid_as_calendar_date(self.id)
    }
}

impl TryFrom<&Row> for ObservationRecord {
    type Error = DatabaseError;

    fn try_from(row: &Row) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.integer("id")?,
            source_id: row.integer("source_id")?,
            julian_date: row.real("julian_date")?,
            polarization: row.text("polarization")?.to_string(),
            length_days: row.real("length_days")?,
        })
    }
}
