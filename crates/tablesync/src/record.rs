//! Record types: the declared shape of one table.
//!
//! A record type is usually declared with `#[derive(Record)]`, which fills
//! in every constant and the row codec:
//!
//! ```rust,ignore
//! use tablesync::Record;
//!
//! #[derive(Debug, Clone, Default, Record)]
//! #[record(table = "widget")]
//! pub struct Widget {
//!     #[column(primary_key)]
//!     pub id: i64,
//!     pub name: String,
//!     #[column(unbounded)]
//!     pub notes: String,
//!     #[column(ignore)]
//!     pub cached_label: String,
//! }
//! ```

use crate::directive::FieldDirective;
use crate::schema::ColumnDef;
use crate::value::Row;

/// The declared shape of a table and the codec between rows and values.
pub trait Record: Sized {
    /// The SQL table name.
    const TABLE: &'static str;

    /// Declared columns in field order, excluding ignored fields.
    const COLUMNS: &'static [ColumnDef];

    /// The declared primary key column, if any.
    const PRIMARY_KEY: Option<&'static str>;

    /// Extension directives in field declaration order, at most one per
    /// field.
    const DIRECTIVES: &'static [FieldDirective] = &[];

    /// Converts the record into a row of its declared columns.
    fn to_row(&self) -> Row;

    /// Binds a row into a record by column name.
    ///
    /// Columns the record does not declare are ignored, and declared columns
    /// missing from the row (or holding values that do not convert) keep
    /// their default value.
    fn from_row(row: &Row) -> Self;

    /// The expected column names, in declaration order.
    #[must_use]
    fn column_names() -> Vec<&'static str> {
        Self::COLUMNS.iter().map(|c| c.name).collect()
    }
}
