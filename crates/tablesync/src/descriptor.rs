//! Table descriptors: expected columns compared against the live table.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::connection::Connection;
use crate::error::Result;
use crate::inspector::SchemaInspector;
use crate::record::Record;

/// What reconciliation has to do for one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SyncAction {
    /// The table does not exist: create it and seed it.
    Create,
    /// The table matches its declaration.
    Nothing,
    /// The table exists with the wrong columns: preserve, rebuild, restore.
    Rebuild,
}

/// A snapshot of how one table differs from its declaration.
///
/// Built fresh on every call and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableDescriptor {
    /// Table name.
    pub table_name: String,
    /// Whether the table has at least one column in the database.
    pub exists: bool,
    /// Columns present in the database but not declared.
    pub extra_columns: BTreeSet<String>,
    /// Columns declared but absent from the database. Always empty for a
    /// missing table.
    pub missing_columns: BTreeSet<String>,
}

impl TableDescriptor {
    /// Compares the live columns of `table` with the expected ones.
    ///
    /// Names compare exactly. An empty `actual` means the table does not
    /// exist, in which case nothing is reported missing. An empty `expected`
    /// declares nothing to compare, so an existing table is in sync.
    #[must_use]
    pub fn diff<A, E>(table: &str, actual: A, expected: E) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        E: IntoIterator,
        E::Item: Into<String>,
    {
        let actual: BTreeSet<String> = actual.into_iter().map(Into::into).collect();
        let expected: BTreeSet<String> = expected.into_iter().map(Into::into).collect();
        let exists = !actual.is_empty();

        let extra_columns = if expected.is_empty() {
            BTreeSet::new()
        } else {
            actual.difference(&expected).cloned().collect()
        };
        let missing_columns = if exists {
            expected.difference(&actual).cloned().collect()
        } else {
            BTreeSet::new()
        };

        Self {
            table_name: table.to_string(),
            exists,
            extra_columns,
            missing_columns,
        }
    }

    /// Describes the record type `R` against the live database.
    pub async fn describe<R: Record, C: Connection>(conn: &C) -> Result<Self> {
        Self::describe_table(conn, R::TABLE, R::column_names()).await
    }

    /// Describes a table by name against an explicit expected column list.
    pub async fn describe_table<C, E>(conn: &C, table: &str, expected: E) -> Result<Self>
    where
        C: Connection,
        E: IntoIterator,
        E::Item: Into<String>,
    {
        let actual = SchemaInspector::new(conn).list_columns(table).await?;
        Ok(Self::diff(table, actual, expected))
    }

    /// No extra and no missing columns.
    #[must_use]
    pub fn is_in_sync(&self) -> bool {
        self.extra_columns.is_empty() && self.missing_columns.is_empty()
    }

    /// The decision-table entry for this descriptor.
    #[must_use]
    pub fn action(&self) -> SyncAction {
        if !self.exists {
            SyncAction::Create
        } else if self.is_in_sync() {
            SyncAction::Nothing
        } else {
            SyncAction::Rebuild
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_missing_table_reports_nothing_missing() {
        let d = TableDescriptor::diff("widget", Vec::<String>::new(), ["id", "name"]);
        assert!(!d.exists);
        assert!(d.missing_columns.is_empty());
        assert!(d.extra_columns.is_empty());
        assert!(d.is_in_sync());
        assert_eq!(d.action(), SyncAction::Create);
    }

    #[test]
    fn test_matching_table_is_in_sync() {
        let d = TableDescriptor::diff("widget", ["name", "id"], ["id", "name"]);
        assert!(d.exists);
        assert_eq!(d.action(), SyncAction::Nothing);
    }

    #[test]
    fn test_stale_table_reports_both_sides() {
        let d = TableDescriptor::diff("widget", ["id", "name", "legacy"], ["id", "name", "notes"]);
        assert_eq!(d.extra_columns, set(&["legacy"]));
        assert_eq!(d.missing_columns, set(&["notes"]));
        assert!(!d.is_in_sync());
        assert_eq!(d.action(), SyncAction::Rebuild);
    }

    #[test]
    fn test_no_expected_columns_is_vacuously_in_sync() {
        let d = TableDescriptor::diff("widget", ["id"], Vec::<&str>::new());
        assert!(d.exists);
        assert!(d.extra_columns.is_empty());
        assert_eq!(d.action(), SyncAction::Nothing);

        let empty = TableDescriptor::diff("widget", Vec::<&str>::new(), Vec::<&str>::new());
        assert!(empty.is_in_sync());
    }

    #[test]
    fn test_names_compare_exactly() {
        let d = TableDescriptor::diff("widget", ["ID"], ["id"]);
        assert_eq!(d.extra_columns, set(&["ID"]));
        assert_eq!(d.missing_columns, set(&["id"]));
    }
}
