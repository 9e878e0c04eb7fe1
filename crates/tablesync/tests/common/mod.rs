#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};

use tablesync::dialect::{fk_columns, SchemaDialect, NAME_COLUMN};
use tablesync::{ColumnDef, Connection, Database, ForeignKeyConstraint, Result, Row, SqlType, SyncError, Value};

pub async fn sqlite() -> Database {
    Database::connect("sqlite::memory:")
        .await
        .unwrap_or_else(|e| panic!("Failed to open in-memory SQLite: {e}"))
}

/// Returns the value of env var `TABLESYNC_POSTGRES_URL`, if set.
pub fn postgres_url() -> Option<String> {
    std::env::var("TABLESYNC_POSTGRES_URL").ok()
}

/// Renders every schema operation as a short command the scripted
/// connection interprets.
#[derive(Debug, Default)]
pub struct ScriptDialect {
    pub composite_keys: bool,
}

impl SchemaDialect for ScriptDialect {
    fn name(&self) -> &'static str {
        "script"
    }

    fn type_name(&self, sql_type: &SqlType) -> String {
        sql_type.postgres_name()
    }

    fn placeholder(&self, index: usize) -> String {
        format!("${index}")
    }

    fn list_columns_sql(&self, table: &str) -> String {
        format!("columns {table}")
    }

    fn list_foreign_keys_sql(&self, table: &str) -> String {
        format!("fks {table}")
    }

    fn list_constraints_sql(&self, table: &str) -> String {
        format!("constraints {table}")
    }

    fn add_foreign_key_sql(&self, pairs: &[&ForeignKeyConstraint]) -> Option<String> {
        let fk = pairs.first()?;
        let source: Vec<&str> = pairs.iter().map(|p| p.source_column.as_str()).collect();
        let target: Vec<&str> = pairs.iter().map(|p| p.target_column.as_str()).collect();
        Some(format!(
            "add_fk {} {} {} {} {}",
            fk.constraint_name,
            fk.source_table,
            source.join(","),
            fk.target_table,
            target.join(",")
        ))
    }

    fn drop_foreign_key_sql(&self, fk: &ForeignKeyConstraint) -> Option<String> {
        Some(format!("drop_fk {}", fk.constraint_name))
    }

    fn widen_column_sql(&self, table: &str, column: &str) -> Option<Vec<String>> {
        Some(vec![format!("widen {table} {column}")])
    }

    fn add_primary_key_sql(&self, table: &str, name: &str, columns: &[&str]) -> Option<String> {
        self.composite_keys
            .then(|| format!("add_pk {table} {name} {}", columns.join(",")))
    }

    fn create_table_sql(&self, table: &str, columns: &[ColumnDef]) -> String {
        let names: Vec<&str> = columns.iter().map(|c| c.name).collect();
        format!("create {table} {}", names.join(","))
    }

    fn drop_table_sql(&self, table: &str) -> String {
        format!("drop {table}")
    }

    fn select_all_sql(&self, table: &str) -> String {
        format!("select {table}")
    }
}

#[derive(Debug, Default)]
struct State {
    tables: BTreeMap<String, Vec<String>>,
    rows: BTreeMap<String, Vec<Row>>,
    foreign_keys: BTreeSet<ForeignKeyConstraint>,
    log: Vec<String>,
    fail_on: Option<String>,
}

/// An in-memory database driven by [`ScriptDialect`] commands.
///
/// Dropping a table that a foreign key still references fails, like a
/// server with enforced constraints would.
#[derive(Debug, Default)]
pub struct ScriptConnection {
    dialect: ScriptDialect,
    state: RefCell<State>,
}

impl ScriptConnection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_composite_keys() -> Self {
        Self {
            dialect: ScriptDialect {
                composite_keys: true,
            },
            ..Self::default()
        }
    }

    pub fn table(self, name: &str, columns: &[&str], rows: Vec<Row>) -> Self {
        {
            let mut state = self.state.borrow_mut();
            state
                .tables
                .insert(name.to_string(), columns.iter().map(ToString::to_string).collect());
            state.rows.insert(name.to_string(), rows);
        }
        self
    }

    pub fn foreign_key(self, fk: ForeignKeyConstraint) -> Self {
        self.state.borrow_mut().foreign_keys.insert(fk);
        self
    }

    /// Makes the first statement starting with `prefix` fail.
    pub fn fail_on(&self, prefix: &str) {
        self.state.borrow_mut().fail_on = Some(prefix.to_string());
    }

    /// Write statements executed so far, in order.
    pub fn log(&self) -> Vec<String> {
        self.state.borrow().log.clone()
    }

    pub fn clear_log(&self) {
        self.state.borrow_mut().log.clear();
    }

    pub fn columns(&self, table: &str) -> Option<Vec<String>> {
        self.state.borrow().tables.get(table).cloned()
    }

    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.state.borrow().rows.get(table).cloned().unwrap_or_default()
    }

    pub fn foreign_keys(&self) -> BTreeSet<ForeignKeyConstraint> {
        self.state.borrow().foreign_keys.clone()
    }

    fn fail(message: impl Into<String>) -> SyncError {
        SyncError::Database(sqlx::Error::Protocol(message.into()))
    }

    fn check_failure(state: &mut State, sql: &str) -> Result<()> {
        if state.fail_on.as_deref().is_some_and(|p| sql.starts_with(p)) {
            state.fail_on = None;
            return Err(Self::fail(format!("injected failure: {sql}")));
        }
        Ok(())
    }
}

impl Connection for ScriptConnection {
    fn dialect(&self) -> &dyn SchemaDialect {
        &self.dialect
    }

    async fn execute_with(&self, sql: &str, _params: &[Value]) -> Result<()> {
        let mut state = self.state.borrow_mut();
        Self::check_failure(&mut state, sql)?;

        let parts: Vec<&str> = sql.split(' ').collect();
        match parts.as_slice() {
            ["create", table, columns] => {
                if state.tables.contains_key(*table) {
                    return Err(Self::fail(format!("table {table} already exists")));
                }
                let columns = columns.split(',').map(ToString::to_string).collect();
                state.tables.insert((*table).to_string(), columns);
                state.rows.insert((*table).to_string(), Vec::new());
            }
            ["drop", table] => {
                if let Some(fk) = state
                    .foreign_keys
                    .iter()
                    .find(|fk| fk.touches(table))
                {
                    return Err(Self::fail(format!("cannot drop {table}: {fk} still exists")));
                }
                state.tables.remove(*table);
                state.rows.remove(*table);
            }
            ["drop_fk", name] => {
                let before = state.foreign_keys.len();
                state.foreign_keys.retain(|fk| fk.constraint_name != *name);
                if state.foreign_keys.len() == before {
                    return Err(Self::fail(format!("no constraint {name}")));
                }
            }
            ["add_fk", name, src, src_cols, tgt, tgt_cols] => {
                for table in [src, tgt] {
                    if !state.tables.contains_key(*table) {
                        return Err(Self::fail(format!("no table {table}")));
                    }
                }
                if state.foreign_keys.iter().any(|fk| fk.constraint_name == *name) {
                    return Err(Self::fail(format!("constraint {name} already exists")));
                }
                for (src_col, tgt_col) in src_cols.split(',').zip(tgt_cols.split(',')) {
                    state
                        .foreign_keys
                        .insert(ForeignKeyConstraint::new(*name, *src, src_col, *tgt, tgt_col));
                }
            }
            ["widen", table, _] | ["add_pk", table, _, _] => {
                if !state.tables.contains_key(*table) {
                    return Err(Self::fail(format!("no table {table}")));
                }
            }
            _ => return Err(Self::fail(format!("unknown statement: {sql}"))),
        }
        state.log.push(sql.to_string());
        Ok(())
    }

    async fn fetch_rows(&self, sql: &str) -> Result<Vec<Row>> {
        let state = self.state.borrow();
        let parts: Vec<&str> = sql.split(' ').collect();
        let rows = match parts.as_slice() {
            ["columns", table] => state
                .tables
                .get(*table)
                .map(|columns| {
                    columns
                        .iter()
                        .map(|c| Row::new().with(NAME_COLUMN, c.as_str()))
                        .collect()
                })
                .unwrap_or_default(),
            ["fks", table] => state
                .foreign_keys
                .iter()
                .filter(|fk| fk.touches(table))
                .map(|fk| {
                    Row::new()
                        .with(fk_columns::CONSTRAINT_NAME, fk.constraint_name.as_str())
                        .with(fk_columns::SOURCE_TABLE, fk.source_table.as_str())
                        .with(fk_columns::SOURCE_COLUMN, fk.source_column.as_str())
                        .with(fk_columns::TARGET_TABLE, fk.target_table.as_str())
                        .with(fk_columns::TARGET_COLUMN, fk.target_column.as_str())
                })
                .collect(),
            ["constraints", _] => Vec::new(),
            ["select", table] => state.rows.get(*table).cloned().unwrap_or_default(),
            _ => return Err(Self::fail(format!("unknown query: {sql}"))),
        };
        Ok(rows)
    }

    async fn insert(&self, table: &str, row: &Row) -> Result<()> {
        let sql = format!("insert {table}");
        let mut state = self.state.borrow_mut();
        Self::check_failure(&mut state, &sql)?;
        let Some(columns) = state.tables.get(table) else {
            return Err(Self::fail(format!("no table {table}")));
        };
        if let Some(unknown) = row.column_names().find(|c| !columns.iter().any(|k| k == c)) {
            return Err(Self::fail(format!("no column {unknown} in {table}")));
        }
        state.rows.entry(table.to_string()).or_default().push(row.clone());
        state.log.push(sql);
        Ok(())
    }
}
