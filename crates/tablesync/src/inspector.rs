//! Live schema introspection.
//!
//! The inspector reads what the database reports right now: every call goes
//! to the catalog, nothing is cached.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::connection::Connection;
use crate::dialect::{fk_columns, NAME_COLUMN};
use crate::error::Result;
use crate::schema::{group_foreign_keys, ForeignKeyConstraint};
use crate::value::Row;

/// Reads and alters the live schema through a caller-owned connection.
#[derive(Debug)]
pub struct SchemaInspector<'c, C> {
    conn: &'c C,
}

impl<'c, C: Connection> SchemaInspector<'c, C> {
    /// Creates an inspector over `conn`.
    pub const fn new(conn: &'c C) -> Self {
        Self { conn }
    }

    /// Column names of `table` in storage order.
    ///
    /// A missing table yields an empty list, not an error.
    pub async fn list_columns(&self, table: &str) -> Result<Vec<String>> {
        let sql = self.conn.dialect().list_columns_sql(table);
        let rows = self.conn.fetch_rows(&sql).await?;
        Ok(names(&rows))
    }

    /// Whether `table` exists, judged by whether it has any column.
    pub async fn table_exists(&self, table: &str) -> Result<bool> {
        Ok(!self.list_columns(table).await?.is_empty())
    }

    /// Every foreign key where `table` is the referencing or the referenced
    /// side.
    pub async fn list_foreign_keys(&self, table: &str) -> Result<BTreeSet<ForeignKeyConstraint>> {
        let sql = self.conn.dialect().list_foreign_keys_sql(table);
        let rows = self.conn.fetch_rows(&sql).await?;
        let keys: BTreeSet<_> = rows.iter().filter_map(foreign_key_from_row).collect();
        debug!(table, count = keys.len(), "Listed foreign keys");
        Ok(keys)
    }

    /// Named constraints (keys, uniques, indexes) declared on `table`.
    pub async fn list_constraints(&self, table: &str) -> Result<Vec<String>> {
        let sql = self.conn.dialect().list_constraints_sql(table);
        let rows = self.conn.fetch_rows(&sql).await?;
        Ok(names(&rows))
    }

    /// Drops each constraint with one statement, stopping at the first
    /// failure. Column pairs of a composite key share a single drop.
    ///
    /// Keys the dialect cannot drop are skipped with a warning.
    pub async fn drop_foreign_keys<'k>(
        &self,
        keys: impl IntoIterator<Item = &'k ForeignKeyConstraint>,
    ) -> Result<()> {
        for group in group_foreign_keys(keys) {
            let fk = group[0];
            match self.conn.dialect().drop_foreign_key_sql(fk) {
                Some(sql) => self.conn.execute(&sql).await?,
                None => warn!(
                    dialect = self.conn.dialect().name(),
                    constraint = %fk,
                    "Dialect cannot drop foreign keys, skipping"
                ),
            }
        }
        Ok(())
    }

    /// Re-adds each constraint with one statement, stopping at the first
    /// failure. Column pairs sharing a constraint name are re-added as one
    /// multi-column key.
    ///
    /// Keys the dialect cannot add are skipped with a warning.
    pub async fn add_foreign_keys<'k>(
        &self,
        keys: impl IntoIterator<Item = &'k ForeignKeyConstraint>,
    ) -> Result<()> {
        for group in group_foreign_keys(keys) {
            match self.conn.dialect().add_foreign_key_sql(&group) {
                Some(sql) => self.conn.execute(&sql).await?,
                None => warn!(
                    dialect = self.conn.dialect().name(),
                    constraint = %group[0],
                    columns = group.len(),
                    "Dialect cannot add foreign keys, skipping"
                ),
            }
        }
        Ok(())
    }
}

fn names(rows: &[Row]) -> Vec<String> {
    rows.iter().filter_map(|row| row.text(NAME_COLUMN)).collect()
}

fn foreign_key_from_row(row: &Row) -> Option<ForeignKeyConstraint> {
    Some(ForeignKeyConstraint {
        constraint_name: row.text(fk_columns::CONSTRAINT_NAME)?,
        source_table: row.text(fk_columns::SOURCE_TABLE)?,
        source_column: row.text(fk_columns::SOURCE_COLUMN)?,
        target_table: row.text(fk_columns::TARGET_TABLE)?,
        target_column: row.text(fk_columns::TARGET_COLUMN)?,
    })
}
