//! The database boundary.
//!
//! The reconciler only needs three capabilities from a database: run a
//! statement, read rows, and know which dialect to speak. [`Connection`]
//! captures exactly that, and [`Database`] provides it over an sqlx
//! [`AnyPool`] for SQLite and PostgreSQL.
//!
//! The connection is an explicit context object owned by the caller:
//! open it before reconciling, pass it to every operation, drop it after.

use std::sync::{Mutex, PoisonError};

use sqlx::any::{AnyArguments, AnyPoolOptions, AnyRow};
use sqlx::query::Query;
use sqlx::{Any, AnyPool, Column, Row as _, ValueRef};
use tracing::debug;

use crate::dialect::{dialect_for_url, SchemaDialect};
use crate::error::Result;
use crate::value::{Row, Value};

/// Statement execution and row reads against one database.
///
/// Every statement commits on its own; nothing here opens a transaction.
#[allow(async_fn_in_trait)]
pub trait Connection {
    /// The dialect used to render SQL for this database.
    fn dialect(&self) -> &dyn SchemaDialect;

    /// Runs a statement with bind parameters. No result rows.
    async fn execute_with(&self, sql: &str, params: &[Value]) -> Result<()>;

    /// Runs a read query and returns every row, columns keyed by name.
    async fn fetch_rows(&self, sql: &str) -> Result<Vec<Row>>;

    /// Runs a statement without parameters.
    async fn execute(&self, sql: &str) -> Result<()> {
        self.execute_with(sql, &[]).await
    }

    /// Inserts one row into `table`.
    async fn insert(&self, table: &str, row: &Row) -> Result<()> {
        let (sql, params) = self.dialect().insert_sql(table, row);
        self.execute_with(&sql, &params).await
    }
}

/// An sqlx-backed [`Connection`].
///
/// Write statements are recorded in a journal, in execution order, so that
/// callers can see exactly which DDL and DML a reconciliation issued.
pub struct Database {
    pool: AnyPool,
    dialect: Box<dyn SchemaDialect>,
    journal: Mutex<Vec<String>>,
}

impl Database {
    /// Connects to `url`, picking the dialect from the URL scheme.
    ///
    /// The pool holds a single connection: reconciliation is sequential, and
    /// an in-memory SQLite database only exists on the connection that
    /// created it.
    ///
    /// # Errors
    ///
    /// Fails for an unknown URL scheme or when the connection cannot be
    /// opened.
    pub async fn connect(url: &str) -> Result<Self> {
        sqlx::any::install_default_drivers();
        let dialect = dialect_for_url(url)?;
        let pool = AnyPoolOptions::new()
            .max_connections(1)
            .connect(url)
            .await?;
        Ok(Self::new(pool, dialect))
    }

    /// Wraps an existing pool.
    pub fn new(pool: AnyPool, dialect: Box<dyn SchemaDialect>) -> Self {
        Self {
            pool,
            dialect,
            journal: Mutex::new(Vec::new()),
        }
    }

    /// Returns the underlying pool.
    #[must_use]
    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    /// Returns the write statements executed so far.
    #[must_use]
    pub fn journal(&self) -> Vec<String> {
        self.journal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Clears the statement journal.
    pub fn clear_journal(&self) {
        self.journal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Closes the pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("dialect", &self.dialect.name())
            .finish_non_exhaustive()
    }
}

impl Connection for Database {
    fn dialect(&self) -> &dyn SchemaDialect {
        self.dialect.as_ref()
    }

    async fn execute_with(&self, sql: &str, params: &[Value]) -> Result<()> {
        debug!(sql = %sql, params = params.len(), "Executing SQL");
        let mut query = sqlx::query(sql);
        for value in params {
            query = bind_value(query, value);
        }
        query.execute(&self.pool).await?;
        self.journal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(sql.to_string());
        Ok(())
    }

    async fn fetch_rows(&self, sql: &str) -> Result<Vec<Row>> {
        debug!(sql = %sql, "Fetching rows");
        let rows = sqlx::query(sql).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(decode_row).collect())
    }
}

/// Binds a [`Value`] parameter to a query.
fn bind_value<'q>(
    query: Query<'q, Any, AnyArguments<'q>>,
    value: &Value,
) -> Query<'q, Any, AnyArguments<'q>> {
    match value {
        Value::Null => query.bind(Option::<String>::None),
        Value::Bool(b) => query.bind(*b),
        Value::Int(i) => query.bind(*i),
        Value::Float(f) => query.bind(*f),
        Value::Text(s) => query.bind(s.clone()),
        Value::Blob(b) => query.bind(b.clone()),
    }
}

/// Converts a driver row into a [`Row`], keeping every live column.
fn decode_row(row: &AnyRow) -> Row {
    let mut out = Row::new();
    for (index, column) in row.columns().iter().enumerate() {
        out.push(column.name(), decode_value(row, index));
    }
    out
}

/// Decodes one column by trying each supported kind in turn.
fn decode_value(row: &AnyRow, index: usize) -> Value {
    let is_null = row
        .try_get_raw(index)
        .map(|raw| raw.is_null())
        .unwrap_or(true);
    if is_null {
        return Value::Null;
    }
    if let Ok(v) = row.try_get::<i64, _>(index) {
        return Value::Int(v);
    }
    if let Ok(v) = row.try_get::<f64, _>(index) {
        return Value::Float(v);
    }
    if let Ok(v) = row.try_get::<bool, _>(index) {
        return Value::Bool(v);
    }
    if let Ok(v) = row.try_get::<String, _>(index) {
        return Value::Text(v);
    }
    if let Ok(v) = row.try_get::<Vec<u8>, _>(index) {
        return Value::Blob(v);
    }
    Value::Null
}
