//! SQLite executor over `rusqlite`.

use std::path::Path;

use parking_lot::Mutex;
use rusqlite::types::{Value as SqlValue, ValueRef};
use tracing::debug;

use crate::core::{Connection, Row, Value};
use crate::error::{Result, SchemaError};

/// Blocking SQLite connection.
///
/// The inner `rusqlite::Connection` is not `Sync`; a mutex serialises access.
pub struct SqliteConnection {
    conn: Mutex<rusqlite::Connection>,
}

impl SqliteConnection {
    /// Open (or create) a database file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = rusqlite::Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = rusqlite::Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Int(i) => SqlValue::Integer(*i),
        Value::Float(f) => SqlValue::Real(*f),
        Value::Text(s) => SqlValue::Text(s.clone()),
        Value::Bytes(b) => SqlValue::Blob(b.clone()),
        Value::Expression(e) => SqlValue::Text(e.expression.clone()),
    }
}

fn from_sql(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Int(i),
        ValueRef::Real(f) => Value::Float(f),
        ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::Bytes(b.to_vec()),
    }
}

/// Wrap a driver error, keeping the extended result code.
fn db_error(err: rusqlite::Error) -> SchemaError {
    let code = match &err {
        rusqlite::Error::SqliteFailure(e, _) => Some(e.extended_code.to_string()),
        _ => None,
    };
    SchemaError::database(err.to_string(), code)
}

impl Connection for SqliteConnection {
    fn driver_name(&self) -> &str {
        "sqlite"
    }

    fn select(&self, sql: &str, bindings: &[Value]) -> Result<Vec<Row>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(sql).map_err(db_error)?;
        let names: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
        let params = rusqlite::params_from_iter(bindings.iter().map(to_sql));
        let mut rows = stmt.query(params).map_err(db_error)?;

        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(db_error)? {
            let mut r = Row::new();
            for (i, name) in names.iter().enumerate() {
                r.push(name.clone(), from_sql(row.get_ref(i).map_err(db_error)?));
            }
            out.push(r);
        }
        Ok(out)
    }

    fn statement(&self, sql: &str, bindings: &[Value]) -> Result<bool> {
        debug!("sqlite statement: {}", sql);
        let conn = self.conn.lock();
        if bindings.is_empty() {
            conn.execute_batch(sql).map_err(db_error)?;
        } else {
            conn.execute(sql, rusqlite::params_from_iter(bindings.iter().map(to_sql)))
                .map_err(db_error)?;
        }
        Ok(true)
    }

    fn begin_transaction(&self) -> Result<()> {
        self.conn.lock().execute_batch("BEGIN").map_err(db_error)
    }

    fn commit(&self) -> Result<()> {
        self.conn.lock().execute_batch("COMMIT").map_err(db_error)
    }

    fn rollback(&self) -> Result<()> {
        self.conn.lock().execute_batch("ROLLBACK").map_err(db_error)
    }
}
