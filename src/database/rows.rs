/*!
 * Generic row access.
 *
 * `enumerate` and `lookup_by_id` work on any table and return loosely-typed
 * `Row` records. Table names come from the `Table` enum and filter values
 * are always bound as parameters, never spliced into the SQL text.
 */

use log::debug;
use rusqlite::{params_from_iter, Connection};
use std::sync::Arc;

use super::connection::DatabaseConnection;
use super::models::{Row, Table, Value};
use crate::errors::{DatabaseError, DatabaseResult};

/// A `WHERE` condition with `?` placeholders and the values bound to them
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    clause: String,
    params: Vec<Value>,
}

impl Filter {
    /// Build a filter from a condition fragment and its bound values
    ///
    /// The fragment is SQL text and must come from trusted code. Every value
    /// it compares against belongs in `params`, one per `?`, in order. Only
    /// anonymous `?` placeholders can be combined with `and`; numbered
    /// (`?1`) and named (`:name`) ones are bound by position within this
    /// filter alone.
    pub fn new(clause: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            clause: clause.into(),
            params,
        }
    }

    /// `column = ?`
    pub fn eq(column: &str, value: impl Into<Value>) -> DatabaseResult<Self> {
        validate_column(column)?;
        Ok(Self::new(format!("{} = ?", column), vec![value.into()]))
    }

    /// Both this filter and `other` must hold
    ///
    /// Fails with `InvalidFilter` if either side uses numbered or named
    /// placeholders, whose positions would no longer line up.
    pub fn and(self, other: Filter) -> DatabaseResult<Self> {
        for clause in [&self.clause, &other.clause] {
            if has_positional_placeholder(clause) {
                return Err(DatabaseError::InvalidFilter(format!(
                    "cannot combine '{}': only anonymous '?' placeholders can be joined",
                    clause
                )));
            }
        }

        let mut params = self.params;
        params.extend(other.params);
        Ok(Self {
            clause: format!("({}) AND ({})", self.clause, other.clause),
            params,
        })
    }

    /// Condition text placed after `WHERE`
    pub fn clause(&self) -> &str {
        &self.clause
    }

    /// Values bound to the clause's placeholders, in order
    pub fn params(&self) -> &[Value] {
        &self.params
    }
}

/// Whether `clause` has a `?NNN`, `:name`, `@name` or `$name` placeholder
/// outside quoted text
fn has_positional_placeholder(clause: &str) -> bool {
    let mut quote: Option<char> = None;
    let mut chars = clause.chars().peekable();

    while let Some(c) = chars.next() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '\'' | '"' => quote = Some(c),
                '?' if chars.peek().is_some_and(|n| n.is_ascii_digit()) => return true,
                ':' | '@' | '$'
                    if chars
                        .peek()
                        .is_some_and(|n| n.is_ascii_alphabetic() || *n == '_') =>
                {
                    return true;
                }
                _ => {}
            },
        }
    }

    false
}

fn validate_column(column: &str) -> DatabaseResult<()> {
    let mut chars = column.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };

    if valid {
        Ok(())
    } else {
        Err(DatabaseError::InvalidFilter(format!(
            "'{}' is not a column name",
            column
        )))
    }
}

/// All rows of `table` matching `filter`, in the order the database returns them
pub fn enumerate(
    db: &DatabaseConnection,
    table: Table,
    filter: Option<&Filter>,
) -> DatabaseResult<Vec<Row>> {
    let (sql, params) = match filter {
        Some(filter) => (
            format!("SELECT * FROM {} WHERE {}", table, filter.clause()),
            filter.params(),
        ),
        None => (format!("SELECT * FROM {}", table), &[][..]),
    };

    db.execute(|conn| query(conn, table, &sql, params))
}

/// The row of `table` whose `id` equals `id`, if any
pub fn lookup_by_id(db: &DatabaseConnection, table: Table, id: i64) -> DatabaseResult<Option<Row>> {
    let sql = format!("SELECT * FROM {} WHERE id = ?1 LIMIT 1", table);
    let rows = db.execute(|conn| query(conn, table, &sql, &[Value::Integer(id)]))?;
    Ok(rows.into_iter().next())
}

/// Run a select against `table` and materialize every row
pub(crate) fn query(
    conn: &Connection,
    table: Table,
    sql: &str,
    params: &[Value],
) -> DatabaseResult<Vec<Row>> {
    debug!("{} with {} bound value(s)", sql, params.len());

    let mut stmt = conn.prepare(sql)?;
    let columns: Arc<[String]> = stmt
        .column_names()
        .into_iter()
        .map(String::from)
        .collect();
    let width = columns.len();

    let mapped = stmt.query_map(params_from_iter(params.iter()), |row| {
        (0..width)
            .map(|i| row.get_ref(i).map(Value::from))
            .collect::<rusqlite::Result<Vec<Value>>>()
    })?;

    let mut rows = Vec::new();
    for values in mapped {
        rows.push(Row::new(table, Arc::clone(&columns), values?));
    }

    Ok(rows)
}
