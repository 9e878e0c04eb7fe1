//! tablesync CLI
//!
//! Read-only inspection of a live schema, the way the reconciler sees it.

use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use tablesync::prelude::*;

/// Inspect the live schema of a database.
#[derive(Parser)]
#[command(name = "tablesync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database URL (`sqlite:` or `postgres://`).
    #[arg(short, long, env = "DATABASE_URL", default_value = "sqlite:db.sqlite3")]
    database: String,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    /// Print results as JSON.
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the columns of a table in storage order.
    Columns {
        /// Table name.
        table: String,
    },

    /// List every foreign key where the table is either side.
    ForeignKeys {
        /// Table name.
        table: String,
    },

    /// List the named constraints of a table.
    Constraints {
        /// Table name.
        table: String,
    },

    /// Compare a table against an expected column list.
    Describe {
        /// Table name.
        table: String,

        /// Expected column names.
        #[arg(required = true)]
        columns: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let db = Database::connect(&cli.database).await?;
    info!(dialect = db.dialect().name(), "Connected");
    let inspector = SchemaInspector::new(&db);

    match cli.command {
        Commands::Columns { table } => {
            let columns = inspector.list_columns(&table).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&columns)?);
            } else if columns.is_empty() {
                println!("Table {table} does not exist.");
            } else {
                for column in columns {
                    println!("{column}");
                }
            }
        }
        Commands::ForeignKeys { table } => {
            let keys = inspector.list_foreign_keys(&table).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&keys)?);
            } else if keys.is_empty() {
                println!("No foreign keys touch {table}.");
            } else {
                for key in keys {
                    println!("{key}");
                }
            }
        }
        Commands::Constraints { table } => {
            let constraints = inspector.list_constraints(&table).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&constraints)?);
            } else {
                for constraint in constraints {
                    println!("{constraint}");
                }
            }
        }
        Commands::Describe { table, columns } => {
            let descriptor = TableDescriptor::describe_table(&db, &table, columns).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&descriptor)?);
            } else {
                println!("Table: {}", descriptor.table_name);
                println!("Exists: {}", descriptor.exists);
                println!("Action: {:?}", descriptor.action());
                for column in &descriptor.extra_columns {
                    println!("  - {column} (extra)");
                }
                for column in &descriptor.missing_columns {
                    println!("  + {column} (missing)");
                }
            }
        }
    }

    db.close().await;
    Ok(())
}
