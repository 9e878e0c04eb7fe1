//! Error types for reconciliation.

/// Errors that can occur while reconciling tables.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// A statement against the database failed. Propagated unchanged; no
    /// compensating action is taken.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The active dialect has no DDL mapping for a declared directive.
    #[error("Directive {directive} on {table}.{field} is not supported by the {dialect} dialect")]
    UnsupportedDirective {
        /// Dialect name.
        dialect: &'static str,
        /// Table the directive belongs to.
        table: String,
        /// Field carrying the directive.
        field: String,
        /// Directive name.
        directive: &'static str,
    },

    /// A directive is declared with an unusable shape.
    #[error("Invalid directive on {table}.{field}: {reason}")]
    InvalidDirective {
        /// Table the directive belongs to.
        table: String,
        /// Field carrying the directive.
        field: String,
        /// What is wrong with it.
        reason: String,
    },

    /// No dialect is known for a connection URL.
    #[error("Unsupported database URL: {0}")]
    UnsupportedUrl(String),
}

impl SyncError {
    /// Whether this is a configuration error (as opposed to a statement
    /// failure).
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedDirective { .. } | Self::InvalidDirective { .. } | Self::UnsupportedUrl(_)
        )
    }
}

/// Result type for reconciliation operations.
pub type Result<T> = std::result::Result<T, SyncError>;
