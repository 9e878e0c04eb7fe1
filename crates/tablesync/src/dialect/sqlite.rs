//! SQLite dialect.
//!
//! SQLite keeps foreign keys inside each table's own `CREATE TABLE` text,
//! so they cannot be dropped or re-added with `ALTER TABLE`. References
//! from other tables name their target table, and resolve again once a
//! table of that name is recreated. The drop itself is only safe with
//! `PRAGMA foreign_keys` off: with enforcement on, dropping a referenced
//! table deletes its rows first and fails on any child row. Constraint
//! names are synthesized, SQLite does not keep them.
//!
//! A composite primary key cannot be added to an existing SQLite table.
//! It is rendered as a unique index of the same name over the same
//! columns, which enforces the same uniqueness.

use crate::schema::{ForeignKeyConstraint, SqlType};

use super::SchemaDialect;

/// SQLite schema dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl SqliteDialect {
    /// Creates a new SQLite dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl SchemaDialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn type_name(&self, sql_type: &SqlType) -> String {
        sql_type.sqlite_name().to_string()
    }

    fn placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn list_columns_sql(&self, table: &str) -> String {
        format!(
            "SELECT name AS name FROM pragma_table_info({}) ORDER BY cid",
            self.quote_literal(table)
        )
    }

    fn list_foreign_keys_sql(&self, table: &str) -> String {
        let table = self.quote_literal(table);
        format!(
            "SELECT 'fk_' || m.name || '_' || p.\"from\" AS constraint_name, \
             m.name AS source_table, \
             p.\"from\" AS source_column, \
             p.\"table\" AS target_table, \
             COALESCE(p.\"to\", '') AS target_column \
             FROM sqlite_master AS m \
             JOIN pragma_foreign_key_list(m.name) AS p \
             WHERE m.type = 'table' AND (m.name = {table} OR p.\"table\" = {table}) \
             ORDER BY m.name, p.id, p.seq"
        )
    }

    fn list_constraints_sql(&self, table: &str) -> String {
        format!(
            "SELECT name AS name FROM pragma_index_list({}) ORDER BY seq",
            self.quote_literal(table)
        )
    }

    fn add_foreign_key_sql(&self, _pairs: &[&ForeignKeyConstraint]) -> Option<String> {
        None
    }

    fn drop_foreign_key_sql(&self, _fk: &ForeignKeyConstraint) -> Option<String> {
        None
    }

    fn suspend_foreign_key_checks_sql(&self) -> Option<&'static str> {
        Some("PRAGMA foreign_keys = OFF")
    }

    fn resume_foreign_key_checks_sql(&self) -> Option<&'static str> {
        Some("PRAGMA foreign_keys = ON")
    }

    fn widen_column_sql(&self, _table: &str, _column: &str) -> Option<Vec<String>> {
        // TEXT affinity carries no length bound.
        Some(Vec::new())
    }

    fn add_primary_key_sql(&self, table: &str, name: &str, columns: &[&str]) -> Option<String> {
        let columns: Vec<String> = columns.iter().map(|c| self.quote_identifier(c)).collect();
        Some(format!(
            "CREATE UNIQUE INDEX {} ON {} ({})",
            self.quote_identifier(name),
            self.quote_identifier(table),
            columns.join(", ")
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnDef;

    #[test]
    fn test_create_table() {
        let dialect = SqliteDialect::new();
        let sql = dialect.create_table_sql(
            "widget",
            &[
                ColumnDef::new("id", SqlType::BigInt).primary_key(),
                ColumnDef::new("name", SqlType::Varchar(255)),
                ColumnDef::new("notes", SqlType::Varchar(255)).nullable(),
            ],
        );
        assert_eq!(
            sql,
            "CREATE TABLE \"widget\" (\n    \"id\" INTEGER PRIMARY KEY,\n    \"name\" TEXT NOT NULL,\n    \"notes\" TEXT\n)"
        );
    }

    #[test]
    fn test_catalog_queries_quote_table_literal() {
        let dialect = SqliteDialect::new();
        assert_eq!(
            dialect.list_columns_sql("o'brien"),
            "SELECT name AS name FROM pragma_table_info('o''brien') ORDER BY cid"
        );
        assert!(dialect
            .list_foreign_keys_sql("widget")
            .contains("(m.name = 'widget' OR p.\"table\" = 'widget')"));
    }

    #[test]
    fn test_constraint_alteration_is_unsupported() {
        let dialect = SqliteDialect::new();
        let fk = ForeignKeyConstraint::new("fk", "order", "widget_id", "widget", "id");
        assert!(dialect.add_foreign_key_sql(&[&fk]).is_none());
        assert!(dialect.drop_foreign_key_sql(&fk).is_none());
        assert_eq!(dialect.widen_column_sql("t", "notes"), Some(Vec::new()));
    }

    #[test]
    fn test_foreign_key_checks_toggle() {
        let dialect = SqliteDialect::new();
        assert_eq!(
            dialect.suspend_foreign_key_checks_sql(),
            Some("PRAGMA foreign_keys = OFF")
        );
        assert_eq!(
            dialect.resume_foreign_key_checks_sql(),
            Some("PRAGMA foreign_keys = ON")
        );
    }

    #[test]
    fn test_composite_key_as_unique_index() {
        assert_eq!(
            SqliteDialect::new()
                .add_primary_key_sql("pair", "pk_x", &["a", "b"])
                .unwrap(),
            "CREATE UNIQUE INDEX \"pk_x\" ON \"pair\" (\"a\", \"b\")"
        );
    }
}
