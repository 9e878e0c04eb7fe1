//! Reconciliation engine.
//!
//! The [`Reconciler`] compares each record type with its live table and
//! brings the table in line with the declaration:
//!
//! | table          | action                                            |
//! |----------------|---------------------------------------------------|
//! | missing        | create, apply directives, seed startup records    |
//! | in sync        | nothing, no statement is issued                   |
//! | stale          | preserve rows, drop foreign keys and table,       |
//! |                | recreate, apply directives, reinsert, re-add keys |
//!
//! Dialects that enforce references during a drop (SQLite) have their
//! enforcement switched off for the length of a rebuild or uninstall.
//!
//! Every statement commits on its own. A failure part way through a
//! rebuild leaves the database in whatever state the completed statements
//! produced; nothing is rolled back.

use std::collections::BTreeSet;
use std::future::Future;

use serde::Serialize;
use tracing::{debug, info};

use crate::connection::Connection;
use crate::descriptor::{SyncAction, TableDescriptor};
use crate::directive::plan_directives;
use crate::error::Result;
use crate::inspector::SchemaInspector;
use crate::record::Record;
use crate::schema::{group_foreign_keys, ForeignKeyConstraint};
use crate::table::{create_table, drop_table};

/// What a sync did to one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SyncOutcome {
    /// The table already matched; nothing was executed.
    Unchanged,
    /// The table was missing and has been created.
    Created {
        /// Startup records inserted.
        seeded: usize,
    },
    /// The table was stale and has been rebuilt.
    Migrated {
        /// Existing rows read back and reinserted.
        preserved: usize,
        /// Foreign keys dropped and re-added around the rebuild.
        foreign_keys: usize,
    },
}

/// Reconciles record types against the database behind a caller-owned
/// connection.
#[derive(Debug)]
pub struct Reconciler<'c, C> {
    conn: &'c C,
}

impl<'c, C: Connection> Reconciler<'c, C> {
    /// Creates a reconciler borrowing `conn`.
    pub const fn new(conn: &'c C) -> Self {
        Self { conn }
    }

    /// Returns the connection.
    #[must_use]
    pub const fn connection(&self) -> &'c C {
        self.conn
    }

    /// Returns a schema inspector over the same connection.
    #[must_use]
    pub const fn inspector(&self) -> SchemaInspector<'c, C> {
        SchemaInspector::new(self.conn)
    }

    /// Describes `R` against its live table.
    pub async fn describe<R: Record>(&self) -> Result<TableDescriptor> {
        TableDescriptor::describe::<R, C>(self.conn).await
    }

    /// Describes a table by name against an explicit column list.
    pub async fn describe_table(&self, table: &str, expected: &[&str]) -> Result<TableDescriptor> {
        TableDescriptor::describe_table(self.conn, table, expected.iter().copied()).await
    }

    /// Brings the table of `R` in line with its declaration.
    ///
    /// `startup` records are inserted only when the table is created; a
    /// rebuild restores the existing rows instead. Directives are resolved
    /// before anything is dropped, so a directive the dialect cannot express
    /// fails without touching the database.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an unusable directive, or the first
    /// failing statement's error. Statements already executed stay applied.
    pub async fn sync<R: Record>(&self, startup: Vec<R>) -> Result<SyncOutcome> {
        let descriptor = self.describe::<R>().await?;
        let action = descriptor.action();
        if action == SyncAction::Nothing {
            info!(table = R::TABLE, "Table in sync, nothing to do");
            return Ok(SyncOutcome::Unchanged);
        }

        let directives = plan_directives::<R>(self.conn.dialect())?;

        let outcome = if action == SyncAction::Rebuild {
            info!(
                table = R::TABLE,
                extra = ?descriptor.extra_columns,
                missing = ?descriptor.missing_columns,
                "Table out of sync, rebuilding"
            );
            self.with_foreign_key_checks_suspended(self.rebuild::<R>(&directives))
                .await?
        } else {
            info!(table = R::TABLE, seed = startup.len(), "Table missing, creating");
            self.build::<R>(&directives, &startup).await?;
            SyncOutcome::Created {
                seeded: startup.len(),
            }
        };
        info!(table = R::TABLE, ?outcome, "Table synced");
        Ok(outcome)
    }

    /// Like [`sync`](Self::sync), but with caller-supplied drop and create
    /// statements.
    ///
    /// Foreign keys are neither captured nor restored, and no directive is
    /// applied: the create statement is expected to produce the final shape.
    pub async fn sync_raw<R: Record>(
        &self,
        drop_sql: &str,
        create_sql: &str,
        startup: Vec<R>,
    ) -> Result<SyncOutcome> {
        let descriptor = self.describe::<R>().await?;
        let action = descriptor.action();
        if action == SyncAction::Nothing {
            info!(table = R::TABLE, "Table in sync, nothing to do");
            return Ok(SyncOutcome::Unchanged);
        }

        let records = if action == SyncAction::Rebuild {
            info!(table = R::TABLE, "Table out of sync, rebuilding from raw SQL");
            let records = self.preserve_rows::<R>().await?;
            self.conn.execute(drop_sql).await?;
            records
        } else {
            info!(table = R::TABLE, seed = startup.len(), "Table missing, creating from raw SQL");
            startup
        };

        self.conn.execute(create_sql).await?;
        self.restore_rows(&records).await?;

        Ok(if action == SyncAction::Rebuild {
            SyncOutcome::Migrated {
                preserved: records.len(),
                foreign_keys: 0,
            }
        } else {
            SyncOutcome::Created {
                seeded: records.len(),
            }
        })
    }

    /// Drops every foreign key touching the table of `R`, then the table.
    pub async fn uninstall<R: Record>(&self) -> Result<()> {
        self.uninstall_table(R::TABLE).await
    }

    /// Drops every foreign key touching `table`, then the table. A missing
    /// table is not an error.
    pub async fn uninstall_table(&self, table: &str) -> Result<()> {
        let keys = self
            .with_foreign_key_checks_suspended(self.detach_and_drop(table))
            .await?;
        info!(
            table,
            foreign_keys = group_foreign_keys(&keys).len(),
            "Table uninstalled"
        );
        Ok(())
    }

    /// Preserves the rows of a stale table, drops it with its foreign keys
    /// and builds it again from the declaration.
    async fn rebuild<R: Record>(&self, directives: &[String]) -> Result<SyncOutcome> {
        let records = self.preserve_rows::<R>().await?;
        let keys = self.detach_and_drop(R::TABLE).await?;
        self.build::<R>(directives, &records).await?;
        self.inspector().add_foreign_keys(&keys).await?;
        Ok(SyncOutcome::Migrated {
            preserved: records.len(),
            foreign_keys: group_foreign_keys(&keys).len(),
        })
    }

    async fn detach_and_drop(&self, table: &str) -> Result<BTreeSet<ForeignKeyConstraint>> {
        let keys = self.detach_foreign_keys(table).await?;
        drop_table(self.conn, table).await?;
        Ok(keys)
    }

    /// Creates the table of `R`, applies its directives and inserts `records`.
    async fn build<R: Record>(&self, directives: &[String], records: &[R]) -> Result<()> {
        create_table::<R, C>(self.conn, false).await?;
        for sql in directives {
            self.conn.execute(sql).await?;
        }
        self.restore_rows(records).await
    }

    /// Runs `body` with foreign-key enforcement off, for dialects that
    /// enforce references while a table is dropped. Enforcement is switched
    /// back on even when `body` fails.
    async fn with_foreign_key_checks_suspended<T>(
        &self,
        body: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        let dialect = self.conn.dialect();
        let Some(resume) = dialect.resume_foreign_key_checks_sql() else {
            return body.await;
        };
        if let Some(suspend) = dialect.suspend_foreign_key_checks_sql() {
            self.conn.execute(suspend).await?;
        }
        let result = body.await;
        let resumed = self.conn.execute(resume).await;
        let value = result?;
        resumed?;
        Ok(value)
    }

    /// Reads every existing row of `R`'s table into records, in read order.
    async fn preserve_rows<R: Record>(&self) -> Result<Vec<R>> {
        let sql = self.conn.dialect().select_all_sql(R::TABLE);
        let rows = self.conn.fetch_rows(&sql).await?;
        debug!(table = R::TABLE, rows = rows.len(), "Preserved rows");
        Ok(rows.iter().map(R::from_row).collect())
    }

    async fn restore_rows<R: Record>(&self, records: &[R]) -> Result<()> {
        for record in records {
            self.conn.insert(R::TABLE, &record.to_row()).await?;
        }
        Ok(())
    }

    /// Captures and drops the foreign keys touching `table`.
    async fn detach_foreign_keys(&self, table: &str) -> Result<BTreeSet<ForeignKeyConstraint>> {
        let inspector = self.inspector();
        let keys = inspector.list_foreign_keys(table).await?;
        inspector.drop_foreign_keys(&keys).await?;
        Ok(keys)
    }
}
