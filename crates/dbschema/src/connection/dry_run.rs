//! Recording connection with canned query responses.

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::core::{Connection, Row, Value};
use crate::error::{Result, SchemaError};

struct Response {
    fragment: String,
    sets: Vec<Vec<Row>>,
}

/// Connection that never talks to a database.
///
/// Every statement is recorded and reported as successful. Queries are
/// recorded and answered from responses registered with [`respond`]: the
/// most recently registered response whose fragment occurs in the SQL wins;
/// unmatched queries return no rows. [`fail_on`] turns a matching
/// statement or query into a database error.
///
/// [`respond`]: DryRunConnection::respond
/// [`fail_on`]: DryRunConnection::fail_on
pub struct DryRunConnection {
    driver: String,
    responses: RwLock<Vec<Response>>,
    failures: RwLock<Vec<(String, String)>>,
    statements: Mutex<Vec<String>>,
    queries: Mutex<Vec<String>>,
}

impl DryRunConnection {
    /// Create a connection reporting `driver` as its driver name.
    pub fn new(driver: impl Into<String>) -> Self {
        Self {
            driver: driver.into(),
            responses: RwLock::new(Vec::new()),
            failures: RwLock::new(Vec::new()),
            statements: Mutex::new(Vec::new()),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Answer queries containing `fragment` with `rows`.
    pub fn respond(&self, fragment: impl Into<String>, rows: Vec<Row>) {
        self.respond_sets(fragment, vec![rows]);
    }

    /// Answer queries containing `fragment` with several result sets.
    pub fn respond_sets(&self, fragment: impl Into<String>, sets: Vec<Vec<Row>>) {
        self.responses.write().push(Response {
            fragment: fragment.into(),
            sets,
        });
    }

    /// Builder form of [`respond`](Self::respond).
    pub fn with_response(self, fragment: impl Into<String>, rows: Vec<Row>) -> Self {
        self.respond(fragment, rows);
        self
    }

    /// Fail statements and queries containing `fragment` with `message`.
    pub fn fail_on(&self, fragment: impl Into<String>, message: impl Into<String>) {
        self.failures.write().push((fragment.into(), message.into()));
    }

    /// Drop all registered responses and failures.
    pub fn clear_responses(&self) {
        self.responses.write().clear();
        self.failures.write().clear();
    }

    /// Statements executed so far, in order.
    pub fn statements(&self) -> Vec<String> {
        self.statements.lock().clone()
    }

    /// Queries run so far, in order.
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().clone()
    }

    /// Number of recorded queries containing `fragment`.
    pub fn query_count(&self, fragment: &str) -> usize {
        self.queries
            .lock()
            .iter()
            .filter(|q| q.contains(fragment))
            .count()
    }

    /// Forget recorded statements and queries.
    pub fn clear_log(&self) {
        self.statements.lock().clear();
        self.queries.lock().clear();
    }

    fn check_failure(&self, sql: &str) -> Result<()> {
        match self
            .failures
            .read()
            .iter()
            .rev()
            .find(|(fragment, _)| sql.contains(fragment.as_str()))
        {
            Some((_, message)) => Err(SchemaError::database(message.clone(), None)),
            None => Ok(()),
        }
    }

    fn lookup(&self, sql: &str) -> Vec<Vec<Row>> {
        self.responses
            .read()
            .iter()
            .rev()
            .find(|r| sql.contains(r.fragment.as_str()))
            .map(|r| r.sets.clone())
            .unwrap_or_else(|| vec![Vec::new()])
    }
}

impl Connection for DryRunConnection {
    fn driver_name(&self) -> &str {
        &self.driver
    }

    fn select(&self, sql: &str, bindings: &[Value]) -> Result<Vec<Row>> {
        Ok(self
            .select_sets(sql, bindings)?
            .into_iter()
            .next()
            .unwrap_or_default())
    }

    fn select_sets(&self, sql: &str, _bindings: &[Value]) -> Result<Vec<Vec<Row>>> {
        self.queries.lock().push(sql.to_string());
        self.check_failure(sql)?;
        Ok(self.lookup(sql))
    }

    fn statement(&self, sql: &str, _bindings: &[Value]) -> Result<bool> {
        debug!(driver = %self.driver, "dry-run statement: {}", sql);
        self.check_failure(sql)?;
        self.statements.lock().push(sql.to_string());
        Ok(true)
    }
}
