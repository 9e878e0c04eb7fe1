//! Schema representation types.
//!
//! These types describe what a record type declares (its columns and their
//! SQL types) and what the live database reports (foreign keys). They are
//! shared by the dialects, the inspector and the reconciler.

use std::fmt;

use serde::{Deserialize, Serialize};

/// SQL data types a record column can map to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SqlType {
    /// Small integer (16-bit).
    SmallInt,
    /// Integer (32-bit).
    Integer,
    /// Big integer (64-bit).
    BigInt,
    /// Floating point (single precision).
    Real,
    /// Floating point (double precision).
    Double,
    /// Boolean.
    Boolean,
    /// Variable-length character string with a maximum length.
    Varchar(usize),
    /// Unbounded text.
    Text,
    /// Binary large object.
    Blob,
    /// A type spelled out verbatim by the record declaration.
    Custom(&'static str),
}

impl SqlType {
    /// Returns the SQL type name for SQLite.
    #[must_use]
    pub const fn sqlite_name(&self) -> &'static str {
        match self {
            Self::SmallInt | Self::Integer | Self::BigInt | Self::Boolean => "INTEGER",
            Self::Real | Self::Double => "REAL",
            Self::Varchar(_) | Self::Text => "TEXT",
            Self::Blob => "BLOB",
            Self::Custom(name) => *name,
        }
    }

    /// Returns the SQL type name for PostgreSQL.
    #[must_use]
    pub fn postgres_name(&self) -> String {
        match self {
            Self::SmallInt => "SMALLINT".to_string(),
            Self::Integer => "INTEGER".to_string(),
            Self::BigInt => "BIGINT".to_string(),
            Self::Real => "REAL".to_string(),
            Self::Double => "DOUBLE PRECISION".to_string(),
            Self::Boolean => "BOOLEAN".to_string(),
            Self::Varchar(len) => format!("VARCHAR({len})"),
            Self::Text => "TEXT".to_string(),
            Self::Blob => "BYTEA".to_string(),
            Self::Custom(name) => (*name).to_string(),
        }
    }
}

/// A column declared by a record type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColumnDef {
    /// Column name.
    pub name: &'static str,
    /// SQL data type.
    pub sql_type: SqlType,
    /// Whether the column allows NULL values.
    pub nullable: bool,
    /// Whether this column is the declared primary key.
    pub primary_key: bool,
}

impl ColumnDef {
    /// Creates a non-null, non-key column.
    #[must_use]
    pub const fn new(name: &'static str, sql_type: SqlType) -> Self {
        Self {
            name,
            sql_type,
            nullable: false,
            primary_key: false,
        }
    }

    /// Sets the column as nullable.
    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Sets the column as the primary key.
    #[must_use]
    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }
}

/// One column pair of a foreign-key relationship reported by the database.
///
/// A composite key is reported as several pairs sharing one constraint
/// name; [`group_foreign_keys`] puts them back together. Tables are
/// referenced by name only. A constraint is captured before a destructive
/// rebuild and replayed verbatim afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ForeignKeyConstraint {
    /// Constraint name.
    pub constraint_name: String,
    /// Referencing table.
    pub source_table: String,
    /// Referencing column.
    pub source_column: String,
    /// Referenced table.
    pub target_table: String,
    /// Referenced column.
    pub target_column: String,
}

impl ForeignKeyConstraint {
    /// Creates a foreign-key description.
    #[must_use]
    pub fn new(
        constraint_name: impl Into<String>,
        source_table: impl Into<String>,
        source_column: impl Into<String>,
        target_table: impl Into<String>,
        target_column: impl Into<String>,
    ) -> Self {
        Self {
            constraint_name: constraint_name.into(),
            source_table: source_table.into(),
            source_column: source_column.into(),
            target_table: target_table.into(),
            target_column: target_column.into(),
        }
    }

    /// Whether `table` is the referencing or the referenced side.
    #[must_use]
    pub fn touches(&self, table: &str) -> bool {
        self.source_table == table || self.target_table == table
    }
}

impl fmt::Display for ForeignKeyConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}.{} -> {}.{}",
            self.constraint_name,
            self.source_table,
            self.source_column,
            self.target_table,
            self.target_column
        )
    }
}

/// Groups column pairs into whole constraints, keyed by referencing table
/// and constraint name, in first-seen order. Pairs keep their input order
/// within a group.
pub fn group_foreign_keys<'k>(
    keys: impl IntoIterator<Item = &'k ForeignKeyConstraint>,
) -> Vec<Vec<&'k ForeignKeyConstraint>> {
    let mut groups: Vec<Vec<&ForeignKeyConstraint>> = Vec::new();
    for fk in keys {
        let existing = groups.iter_mut().find(|group| {
            group[0].constraint_name == fk.constraint_name
                && group[0].source_table == fk.source_table
        });
        match existing {
            Some(group) => group.push(fk),
            None => groups.push(vec![fk]),
        }
    }
    groups
}
