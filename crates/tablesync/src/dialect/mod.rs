//! Database dialect implementations.
//!
//! Each dialect knows the SQL text for catalog queries, table DDL, row
//! reads and writes, foreign-key teardown and the extension directives of
//! one database system. Nothing here talks to a database.

mod postgres;
mod sqlite;

pub use postgres::PostgresDialect;
pub use sqlite::SqliteDialect;

use crate::error::{Result, SyncError};
use crate::schema::{ColumnDef, ForeignKeyConstraint, SqlType};
use crate::value::{Row, Value};

/// Column aliases every foreign-key catalog query must produce.
pub mod fk_columns {
    /// Constraint name.
    pub const CONSTRAINT_NAME: &str = "constraint_name";
    /// Referencing table.
    pub const SOURCE_TABLE: &str = "source_table";
    /// Referencing column.
    pub const SOURCE_COLUMN: &str = "source_column";
    /// Referenced table.
    pub const TARGET_TABLE: &str = "target_table";
    /// Referenced column.
    pub const TARGET_COLUMN: &str = "target_column";
}

/// Column alias produced by the column and constraint catalog queries.
pub const NAME_COLUMN: &str = "name";

/// Trait for database-specific SQL generation.
pub trait SchemaDialect: Send + Sync {
    /// Returns the dialect name.
    fn name(&self) -> &'static str;

    /// Returns the SQL type name for the given type.
    fn type_name(&self, sql_type: &SqlType) -> String;

    /// Returns the bind placeholder for the 1-based parameter `index`.
    fn placeholder(&self, index: usize) -> String;

    /// Query listing the columns of `table` in storage order, one row per
    /// column with a [`NAME_COLUMN`] field. Yields no rows for a missing
    /// table.
    fn list_columns_sql(&self, table: &str) -> String;

    /// Query listing every foreign key where `table` is the referencing or
    /// the referenced side, with the [`fk_columns`] aliases.
    fn list_foreign_keys_sql(&self, table: &str) -> String;

    /// Query listing the named constraints of `table` ([`NAME_COLUMN`]).
    fn list_constraints_sql(&self, table: &str) -> String;

    /// Statement re-adding one foreign-key constraint from its column
    /// pairs, or `None` when the dialect cannot alter constraints after
    /// table creation. Every pair shares the constraint name and both tables.
    fn add_foreign_key_sql(&self, pairs: &[&ForeignKeyConstraint]) -> Option<String>;

    /// Statement dropping a foreign-key constraint, or `None` when the
    /// dialect cannot alter constraints after table creation.
    fn drop_foreign_key_sql(&self, fk: &ForeignKeyConstraint) -> Option<String>;

    /// Statement switching off foreign-key enforcement on the connection
    /// while a table is dropped and recreated in place.
    fn suspend_foreign_key_checks_sql(&self) -> Option<&'static str> {
        None
    }

    /// Statement switching foreign-key enforcement back on.
    fn resume_foreign_key_checks_sql(&self) -> Option<&'static str> {
        None
    }

    /// Statements widening `column` to unbounded text, or `None` when
    /// unsupported. An empty list means the column is already unbounded.
    fn widen_column_sql(&self, table: &str, column: &str) -> Option<Vec<String>>;

    /// Statement adding a named primary key over `columns`, or `None` when
    /// unsupported.
    fn add_primary_key_sql(&self, table: &str, name: &str, columns: &[&str]) -> Option<String>;

    /// Quote an identifier (table name, column name, etc.).
    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    /// Quote a string literal.
    fn quote_literal(&self, value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }

    /// Generates column definition SQL.
    fn column_definition(&self, column: &ColumnDef) -> String {
        let mut parts = vec![
            self.quote_identifier(column.name),
            self.type_name(&column.sql_type),
        ];

        if column.primary_key {
            parts.push("PRIMARY KEY".to_string());
        } else if !column.nullable {
            parts.push("NOT NULL".to_string());
        }

        parts.join(" ")
    }

    /// Generates `CREATE TABLE` for a declared column shape.
    fn create_table_sql(&self, table: &str, columns: &[ColumnDef]) -> String {
        let definitions: Vec<String> = columns
            .iter()
            .map(|c| format!("    {}", self.column_definition(c)))
            .collect();
        format!(
            "CREATE TABLE {} (\n{}\n)",
            self.quote_identifier(table),
            definitions.join(",\n")
        )
    }

    /// Generates a drop that tolerates a missing table.
    fn drop_table_sql(&self, table: &str) -> String {
        format!("DROP TABLE IF EXISTS {}", self.quote_identifier(table))
    }

    /// Reads every row of `table` with all of its live columns.
    fn select_all_sql(&self, table: &str) -> String {
        format!("SELECT * FROM {}", self.quote_identifier(table))
    }

    /// Generates a single-row insert and its bind parameters.
    ///
    /// NULL values are written as literals rather than bound, so that no
    /// parameter type has to be guessed for them.
    fn insert_sql(&self, table: &str, row: &Row) -> (String, Vec<Value>) {
        if row.is_empty() {
            return (
                format!("INSERT INTO {} DEFAULT VALUES", self.quote_identifier(table)),
                Vec::new(),
            );
        }

        let mut columns = Vec::with_capacity(row.len());
        let mut values = Vec::with_capacity(row.len());
        let mut params = Vec::new();
        for (column, value) in row.iter() {
            columns.push(self.quote_identifier(column));
            if value.is_null() {
                values.push("NULL".to_string());
            } else {
                params.push(value.clone());
                values.push(self.placeholder(params.len()));
            }
        }

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.quote_identifier(table),
            columns.join(", "),
            values.join(", ")
        );
        (sql, params)
    }
}

/// Picks a dialect from a connection URL scheme.
///
/// # Errors
///
/// Returns [`SyncError::UnsupportedUrl`] for schemes other than `sqlite:`,
/// `postgres:` and `postgresql:`.
pub fn dialect_for_url(url: &str) -> Result<Box<dyn SchemaDialect>> {
    let scheme = url.split(':').next().unwrap_or_default();
    match scheme {
        "sqlite" => Ok(Box::new(SqliteDialect::new())),
        "postgres" | "postgresql" => Ok(Box::new(PostgresDialect::new())),
        _ => Err(SyncError::UnsupportedUrl(url.to_string())),
    }
}
