//! PostgreSQL dialect.
//!
//! Catalog reads cast identifier columns to `text` so every driver can
//! decode them. Lookups are scoped to `current_schema()`.

use crate::schema::{ForeignKeyConstraint, SqlType};

use super::SchemaDialect;

/// PostgreSQL schema dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    /// Creates a new PostgreSQL dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl SchemaDialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgresql"
    }

    fn type_name(&self, sql_type: &SqlType) -> String {
        sql_type.postgres_name()
    }

    fn placeholder(&self, index: usize) -> String {
        format!("${index}")
    }

    fn list_columns_sql(&self, table: &str) -> String {
        format!(
            "SELECT column_name::text AS name \
             FROM information_schema.columns \
             WHERE table_schema = current_schema() AND table_name = {} \
             ORDER BY ordinal_position",
            self.quote_literal(table)
        )
    }

    fn list_foreign_keys_sql(&self, table: &str) -> String {
        let table = self.quote_literal(table);
        format!(
            "SELECT con.conname::text AS constraint_name, \
             src.relname::text AS source_table, \
             sa.attname::text AS source_column, \
             tgt.relname::text AS target_table, \
             ta.attname::text AS target_column \
             FROM pg_constraint AS con \
             JOIN pg_class AS src ON src.oid = con.conrelid \
             JOIN pg_class AS tgt ON tgt.oid = con.confrelid \
             JOIN pg_namespace AS ns ON ns.oid = con.connamespace \
             CROSS JOIN LATERAL unnest(con.conkey, con.confkey) WITH ORDINALITY AS k(src_attnum, tgt_attnum, pos) \
             JOIN pg_attribute AS sa ON sa.attrelid = con.conrelid AND sa.attnum = k.src_attnum \
             JOIN pg_attribute AS ta ON ta.attrelid = con.confrelid AND ta.attnum = k.tgt_attnum \
             WHERE con.contype = 'f' AND ns.nspname = current_schema() \
             AND (src.relname = {table} OR tgt.relname = {table}) \
             ORDER BY con.conname, k.pos"
        )
    }

    fn list_constraints_sql(&self, table: &str) -> String {
        format!(
            "SELECT constraint_name::text AS name \
             FROM information_schema.table_constraints \
             WHERE table_schema = current_schema() AND table_name = {} \
             ORDER BY constraint_name",
            self.quote_literal(table)
        )
    }

    fn add_foreign_key_sql(&self, pairs: &[&ForeignKeyConstraint]) -> Option<String> {
        let fk = pairs.first()?;
        let source: Vec<String> = pairs
            .iter()
            .map(|p| self.quote_identifier(&p.source_column))
            .collect();
        let target: Vec<String> = pairs
            .iter()
            .map(|p| self.quote_identifier(&p.target_column))
            .collect();
        Some(format!(
            "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
            self.quote_identifier(&fk.source_table),
            self.quote_identifier(&fk.constraint_name),
            source.join(", "),
            self.quote_identifier(&fk.target_table),
            target.join(", ")
        ))
    }

    fn drop_foreign_key_sql(&self, fk: &ForeignKeyConstraint) -> Option<String> {
        Some(format!(
            "ALTER TABLE {} DROP CONSTRAINT {}",
            self.quote_identifier(&fk.source_table),
            self.quote_identifier(&fk.constraint_name)
        ))
    }

    fn widen_column_sql(&self, table: &str, column: &str) -> Option<Vec<String>> {
        Some(vec![format!(
            "ALTER TABLE {} ALTER COLUMN {} TYPE TEXT",
            self.quote_identifier(table),
            self.quote_identifier(column)
        )])
    }

    fn add_primary_key_sql(&self, table: &str, name: &str, columns: &[&str]) -> Option<String> {
        let columns: Vec<String> = columns.iter().map(|c| self.quote_identifier(c)).collect();
        Some(format!(
            "ALTER TABLE {} ADD CONSTRAINT {} PRIMARY KEY ({})",
            self.quote_identifier(table),
            self.quote_identifier(name),
            columns.join(", ")
        ))
    }
}
