//! Extension directives: per-column DDL that a plain column declaration
//! cannot express.
//!
//! Directives are attached to record fields at declaration time through a
//! static registration table ([`Record::DIRECTIVES`](crate::Record::DIRECTIVES)).
//! After a table is (re)created, the dispatcher turns each directive into
//! dialect statements. A directive the active dialect cannot express is a
//! configuration error, raised before anything is dropped.

use serde::Serialize;
use tracing::debug;

use crate::dialect::SchemaDialect;
use crate::error::{Result, SyncError};
use crate::record::Record;

/// A DDL operation applied to a freshly created table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[non_exhaustive]
pub enum ExtensionDirective {
    /// Alter the column to the database's unbounded text type.
    WidenColumnToUnbounded {
        /// Column to widen.
        column: &'static str,
    },
    /// Add a named primary key spanning `columns`, in order.
    AddCompositePrimaryKey {
        /// Constraint name.
        name: &'static str,
        /// Key columns.
        columns: &'static [&'static str],
    },
}

impl ExtensionDirective {
    /// Short name used in logs and errors.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::WidenColumnToUnbounded { .. } => "WidenColumnToUnbounded",
            Self::AddCompositePrimaryKey { .. } => "AddCompositePrimaryKey",
        }
    }
}

/// A directive registered against one record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldDirective {
    /// The field (column) the directive is declared on.
    pub field: &'static str,
    /// The directive.
    pub directive: ExtensionDirective,
}

impl FieldDirective {
    /// Registers `directive` on `field`.
    #[must_use]
    pub const fn new(field: &'static str, directive: ExtensionDirective) -> Self {
        Self { field, directive }
    }
}

/// Checks that a directive is declared with a usable shape.
///
/// Column existence for composite keys is not checked here; a wrong column
/// surfaces as a database error when the key is added.
fn validate(table: &str, declared: &FieldDirective, columns: &[&str]) -> Result<()> {
    let invalid = |reason: &str| SyncError::InvalidDirective {
        table: table.to_string(),
        field: declared.field.to_string(),
        reason: reason.to_string(),
    };

    match declared.directive {
        ExtensionDirective::WidenColumnToUnbounded { column } => {
            if !columns.contains(&column) {
                return Err(invalid(&format!(
                    "column `{column}` is not a declared column"
                )));
            }
        }
        ExtensionDirective::AddCompositePrimaryKey { name, columns } => {
            if name.trim().is_empty() {
                return Err(invalid("primary key name is empty"));
            }
            if columns.is_empty() {
                return Err(invalid("primary key has no columns"));
            }
        }
    }
    Ok(())
}

/// Maps one directive to its DDL statements for `table`.
///
/// # Errors
///
/// Returns [`SyncError::UnsupportedDirective`] when the dialect has no
/// mapping for the directive.
pub fn directive_sql(
    dialect: &dyn SchemaDialect,
    table: &str,
    declared: &FieldDirective,
) -> Result<Vec<String>> {
    let statements = match declared.directive {
        ExtensionDirective::WidenColumnToUnbounded { column } => {
            dialect.widen_column_sql(table, column)
        }
        ExtensionDirective::AddCompositePrimaryKey { name, columns } => dialect
            .add_primary_key_sql(table, name, columns)
            .map(|sql| vec![sql]),
    };

    statements.ok_or_else(|| SyncError::UnsupportedDirective {
        dialect: dialect.name(),
        table: table.to_string(),
        field: declared.field.to_string(),
        directive: declared.directive.kind(),
    })
}

/// Resolves every directive of `R`, in field declaration order, into the
/// statements to run after the table is created.
///
/// # Errors
///
/// Returns a configuration error for the first directive that is malformed
/// or that the dialect cannot express.
pub fn plan_directives<R: Record>(dialect: &dyn SchemaDialect) -> Result<Vec<String>> {
    let columns = R::column_names();
    let mut statements = Vec::new();
    for declared in R::DIRECTIVES {
        validate(R::TABLE, declared, &columns)?;
        let sql = directive_sql(dialect, R::TABLE, declared)?;
        debug!(
            table = R::TABLE,
            field = declared.field,
            directive = declared.directive.kind(),
            statements = sql.len(),
            "Planned directive"
        );
        statements.extend(sql);
    }
    Ok(statements)
}
