//! Declared-schema reconciliation for SQL databases.
//!
//! `tablesync` keeps the tables of an application in line with the record
//! types the application declares:
//! - A missing table is created from its declaration and seeded
//! - A table whose columns match is left alone, without a single statement
//! - A stale table is rebuilt, with its rows read back and reinserted and
//!   the foreign keys touching it dropped and re-added around the rebuild
//!
//! # Architecture
//!
//! - **Record** - The declared shape of a table, usually derived
//! - **Inspector** - Reads columns, foreign keys and constraints from the catalog
//! - **Descriptor** - Diffs expected columns against live ones
//! - **Directive** - Per-column DDL applied after a table is (re)created
//! - **Engine** - Decides and performs create / nothing / rebuild
//! - **Registry** - Runs sync and uninstall over every registered table
//! - **Dialect** - Database-specific SQL generation (SQLite, PostgreSQL)
//!
//! # Example
//!
//! ```rust,ignore
//! use tablesync::prelude::*;
//!
//! #[derive(Debug, Clone, Default, Record)]
//! #[record(table = "widget")]
//! pub struct Widget {
//!     #[column(primary_key)]
//!     pub id: i64,
//!     pub name: String,
//!     #[column(unbounded)]
//!     pub notes: Option<String>,
//! }
//!
//! let db = Database::connect("sqlite::memory:").await?;
//! let mut registry = Registry::new();
//! registry.register(RecordRepository::<Widget>::new());
//! registry.sync_all(&db).await?;
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! # Live columns of a table, in storage order
//! tablesync columns widget
//!
//! # Foreign keys where the table is either side
//! tablesync --json foreign-keys widget
//! ```

// Lets the derive's `::tablesync::` paths resolve inside this crate's tests.
extern crate self as tablesync;

pub mod connection;
pub mod descriptor;
pub mod dialect;
pub mod directive;
pub mod engine;
pub mod error;
pub mod inspector;
pub mod record;
pub mod registry;
pub mod schema;
pub mod table;
pub mod value;

pub use connection::{Connection, Database};
pub use descriptor::{SyncAction, TableDescriptor};
pub use directive::{ExtensionDirective, FieldDirective};
pub use engine::{Reconciler, SyncOutcome};
pub use error::{Result, SyncError};
pub use inspector::SchemaInspector;
pub use record::Record;
pub use registry::{RecordRepository, Registry, Repository};
pub use schema::{group_foreign_keys, ColumnDef, ForeignKeyConstraint, SqlType};
pub use value::{FromValue, Row, ToValue, Value};

/// Derives [`Record`] for a struct with named fields.
pub use tablesync_derive::Record;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::connection::{Connection, Database};
    pub use crate::descriptor::{SyncAction, TableDescriptor};
    pub use crate::dialect::{PostgresDialect, SchemaDialect, SqliteDialect};
    pub use crate::directive::{ExtensionDirective, FieldDirective};
    pub use crate::engine::{Reconciler, SyncOutcome};
    pub use crate::error::{Result, SyncError};
    pub use crate::inspector::SchemaInspector;
    pub use crate::record::Record;
    pub use crate::registry::{RecordRepository, Registry, Repository};
    pub use crate::schema::{ColumnDef, ForeignKeyConstraint, SqlType};
    pub use crate::value::{FromValue, Row, ToValue, Value};
    pub use tablesync_derive::Record;
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;

    #[derive(Debug, Clone, Default, PartialEq, Record)]
    #[record(table = "gadget")]
    struct Gadget {
        #[column(primary_key)]
        id: i64,
        #[column(length = 80)]
        label: String,
        #[column(unbounded)]
        notes: Option<String>,
        #[column(ignore)]
        scratch: u32,
    }

    #[test]
    fn test_derived_record_inside_crate() {
        assert_eq!(Gadget::TABLE, "gadget");
        assert_eq!(Gadget::column_names(), vec!["id", "label", "notes"]);
        assert_eq!(Gadget::PRIMARY_KEY, Some("id"));
        assert_eq!(
            Gadget::DIRECTIVES,
            &[FieldDirective::new(
                "notes",
                ExtensionDirective::WidenColumnToUnbounded { column: "notes" }
            )]
        );
    }

    #[tokio::test]
    async fn test_prelude_round_trip() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        let gadget = Gadget {
            id: 1,
            label: "lamp".into(),
            notes: None,
            scratch: 9,
        };
        let outcome = Reconciler::new(&db).sync(vec![gadget]).await.unwrap();
        assert_eq!(outcome, SyncOutcome::Created { seeded: 1 });

        let rows = db.fetch_rows("SELECT * FROM gadget").await.unwrap();
        let read: Vec<Gadget> = rows.iter().map(Gadget::from_row).collect();
        assert_eq!(
            read,
            vec![Gadget {
                id: 1,
                label: "lamp".into(),
                notes: None,
                scratch: 0,
            }]
        );
    }
}
