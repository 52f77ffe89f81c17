//! The row source: the query-execution collaborator behind the repository.
//!
//! [`RowSource`] is the seam between the repository and the store. The
//! repository only ever asks it to run a statement with positional (`?N`)
//! parameters and hand back owned [`Row`]s or an affected-row count, which
//! keeps the hydration and write logic testable without a database.
//!
//! [`rusqlite::Connection`] implements the trait directly, so a connection
//! (or a transaction, via `&*tx`) can be injected as-is.

use std::path::Path;

use rusqlite::{Connection, params_from_iter};
use tracing::debug;

use crate::error::Result;
use crate::row::{Row, Value};

/// Runs SQL statements and returns their results as owned rows.
///
/// Implementations perform one blocking round-trip per call. They hold no
/// locks of their own: sharing one source across threads must be serialized
/// by the caller.
pub trait RowSource {
    /// Runs a read with positional parameters and collects every row.
    fn query_with(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>>;

    /// Runs a write with positional parameters and returns the number of
    /// rows it affected.
    fn execute(&self, sql: &str, params: &[Value]) -> Result<usize>;

    /// Row id assigned by the most recent successful insert.
    fn last_insert_id(&self) -> i64;

    /// Runs a parameterless read.
    fn query(&self, sql: &str) -> Result<Vec<Row>> {
        self.query_with(sql, &[])
    }
}

impl RowSource for Connection {
    fn query_with(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        debug!(sql, params = params.len(), "query");
        let mut stmt = self.prepare(sql)?;
        let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let mut rows = stmt.query(params_from_iter(params.iter()))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut owned = Row::new();
            for (idx, name) in names.iter().enumerate() {
                owned.push(name.as_str(), Value::from(row.get_ref(idx)?));
            }
            out.push(owned);
        }
        debug!(rows = out.len(), "query complete");
        Ok(out)
    }

    fn execute(&self, sql: &str, params: &[Value]) -> Result<usize> {
        debug!(sql, params = params.len(), "execute");
        let affected = Connection::execute(self, sql, params_from_iter(params.iter()))?;
        Ok(affected)
    }

    fn last_insert_id(&self) -> i64 {
        self.last_insert_rowid()
    }
}

/// Opens (or creates) a database file with foreign key enforcement on.
pub fn open_database(path: impl AsRef<Path>) -> Result<Connection> {
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    Ok(conn)
}

/// Opens a private in-memory database with foreign key enforcement on.
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    Ok(conn)
}
