//! Create and drop primitives for record tables.

use tracing::debug;

use crate::connection::Connection;
use crate::error::Result;
use crate::record::Record;

/// Creates the table for `R` from its declared columns.
///
/// With `overwrite`, an existing table is dropped first. Without it, the
/// create statement fails if the table already exists.
pub async fn create_table<R: Record, C: Connection>(conn: &C, overwrite: bool) -> Result<()> {
    let dialect = conn.dialect();
    if overwrite {
        conn.execute(&dialect.drop_table_sql(R::TABLE)).await?;
    }
    debug!(table = R::TABLE, columns = R::COLUMNS.len(), "Creating table");
    conn.execute(&dialect.create_table_sql(R::TABLE, R::COLUMNS))
        .await
}

/// Drops `table`. A missing table is not an error.
pub async fn drop_table<C: Connection>(conn: &C, table: &str) -> Result<()> {
    debug!(table, "Dropping table");
    conn.execute(&conn.dialect().drop_table_sql(table)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Database;
    use crate::inspector::SchemaInspector;
    use crate::schema::{ColumnDef, SqlType};
    use crate::value::Row;

    struct Note;

    impl Record for Note {
        const TABLE: &'static str = "note";
        const COLUMNS: &'static [ColumnDef] = &[
            ColumnDef::new("id", SqlType::BigInt).primary_key(),
            ColumnDef::new("body", SqlType::Text).nullable(),
        ];
        const PRIMARY_KEY: Option<&'static str> = Some("id");

        fn to_row(&self) -> Row {
            Row::new()
        }

        fn from_row(_row: &Row) -> Self {
            Self
        }
    }

    #[tokio::test]
    async fn test_create_and_drop() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        let inspector = SchemaInspector::new(&db);

        create_table::<Note, _>(&db, false).await.unwrap();
        assert_eq!(inspector.list_columns("note").await.unwrap(), vec!["id", "body"]);

        assert!(create_table::<Note, _>(&db, false).await.is_err());
        create_table::<Note, _>(&db, true).await.unwrap();

        drop_table(&db, "note").await.unwrap();
        assert!(!inspector.table_exists("note").await.unwrap());
        drop_table(&db, "note").await.unwrap();
    }
}
