//! dbschema CLI - DDL preview, type maps and SQLite introspection.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use dbschema::{
    DialectCatalog, DryRunConnection, FieldDescriptor, Schema, SchemaConfig, SchemaError,
    SimpleType, TableDescriptor, UpdateResult,
};
use tracing::{debug, info, Level};

#[derive(Parser)]
#[command(name = "dbschema")]
#[command(about = "Cross-RDBMS schema introspection and DDL generation")]
#[command(version)]
struct Cli {
    /// Path to YAML schema configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Database dialect (overrides the configuration file)
    #[arg(short, long)]
    dialect: Option<String>,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "warn")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the DDL a schema document would execute against an empty database
    Ddl {
        /// Table descriptor document (JSON, or YAML by extension)
        file: PathBuf,
    },

    /// Show the native column definition of every simple type
    Types,

    /// List the supported dialects
    Dialects,

    /// Describe the tables of a SQLite database file
    #[cfg(feature = "sqlite")]
    Inspect {
        /// SQLite database file
        database: PathBuf,

        /// Describe one table in full
        #[arg(long)]
        table: Option<String>,
    },
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

fn run() -> Result<(), SchemaError> {
    let cli = Cli::parse();
    setup_logging(&cli.verbosity, &cli.log_format);

    let catalog = DialectCatalog::with_builtins();

    match &cli.command {
        Commands::Dialects => {
            let names = catalog.dialect_names();
            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&names)?);
            } else {
                for name in names {
                    println!("{}", name);
                }
            }
        }

        Commands::Types => {
            let config = load_config(&cli)?;
            let dialect = catalog.require_dialect(&config.dialect)?;
            let mut rows = Vec::new();
            for simple in SimpleType::ALL {
                if simple == SimpleType::Virtual {
                    continue;
                }
                let field = FieldDescriptor::new("c", simple.as_str());
                let definition = match dialect.column_definition(&field, None) {
                    Ok(def) => def,
                    Err(e) => {
                        debug!("No definition for {}: {}", simple.as_str(), e);
                        "-".to_string()
                    }
                };
                rows.push((simple.as_str(), definition));
            }

            if cli.output_json {
                let map: serde_json::Map<String, serde_json::Value> = rows
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), serde_json::Value::String(v)))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&map)?);
            } else {
                println!("Type map for {}:", dialect.name());
                for (simple, definition) in rows {
                    println!("  {:<22} {}", simple, definition);
                }
            }
        }

        Commands::Ddl { file } => {
            let config = load_config(&cli)?;
            let tables = load_descriptors(file)?;
            info!("Loaded {} table descriptor(s) from {:?}", tables.len(), file);

            let conn = Arc::new(DryRunConnection::new(config.dialect.clone()));
            let schema = Schema::from_config(config, &catalog, conn.clone())?;
            let results = schema.update_schema(&tables, false, false, false)?;
            let statements = conn.statements();

            if cli.output_json {
                let doc = serde_json::json!({
                    "statements": statements,
                    "results": results,
                });
                println!("{}", serde_json::to_string_pretty(&doc)?);
            } else {
                for sql in &statements {
                    println!("{};\n", sql);
                }
            }

            let failed: Vec<String> = tables
                .iter()
                .zip(&results)
                .filter_map(|(table, result)| match result {
                    UpdateResult::Failed { error } => {
                        Some(format!("{}: {}", table.name, error.message))
                    }
                    UpdateResult::Updated { .. } => None,
                })
                .collect();
            if !failed.is_empty() {
                return Err(SchemaError::invalid(format!(
                    "{} table(s) failed:\n  {}",
                    failed.len(),
                    failed.join("\n  ")
                )));
            }
        }

        #[cfg(feature = "sqlite")]
        Commands::Inspect { database, table } => {
            if !database.exists() {
                return Err(SchemaError::NotFound(format!("Database file {:?}", database)));
            }
            let mut config = load_config(&cli)?;
            config.dialect = "sqlite".to_string();
            let conn = Arc::new(dbschema::SqliteConnection::open(database)?);
            let schema = Schema::from_config(config, &catalog, conn)?;
            inspect(&schema, table.as_deref(), cli.output_json)?;
        }
    }

    Ok(())
}

/// Configuration from `--config`, with `--dialect` applied on top.
fn load_config(cli: &Cli) -> Result<SchemaConfig, SchemaError> {
    let mut config = match &cli.config {
        Some(path) => {
            let config = SchemaConfig::load(path)?;
            info!("Loaded configuration from {:?}", path);
            config
        }
        None => SchemaConfig::for_dialect("mysql"),
    };
    if let Some(dialect) = &cli.dialect {
        config.dialect = dialect.clone();
    }
    Ok(config)
}

/// Parse a descriptor document; `.yaml` and `.yml` files are read as YAML.
fn load_descriptors(path: &Path) -> Result<Vec<TableDescriptor>, SchemaError> {
    let content = std::fs::read_to_string(path)?;
    let is_yaml = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"))
        .unwrap_or(false);
    let doc: serde_json::Value = if is_yaml {
        serde_yaml::from_str(&content)?
    } else {
        serde_json::from_str(&content)?
    };
    TableDescriptor::list_from_json(doc)
}

#[cfg(feature = "sqlite")]
fn inspect(schema: &Schema, table: Option<&str>, output_json: bool) -> Result<(), SchemaError> {
    if let Some(name) = table {
        let table = schema
            .get_table(name, false)?
            .ok_or_else(|| SchemaError::NotFound(format!("Table '{}'", name)))?;
        let doc = table.to_array(true, true);
        if output_json {
            println!("{}", serde_json::to_string_pretty(&doc)?);
        } else {
            println!("{}", serde_yaml::to_string(&doc)?);
        }
        return Ok(());
    }

    let tables = schema.get_tables(None, schema.config().include_views, false)?;
    if output_json {
        let docs: Vec<serde_json::Value> =
            tables.values().map(|t| t.to_array(false, false)).collect();
        println!("{}", serde_json::to_string_pretty(&docs)?);
        return Ok(());
    }

    println!("Tables: {}", tables.len());
    for table in tables.values() {
        println!(
            "  {}{} ({} columns, {} relations)",
            table.name,
            if table.is_view { " [view]" } else { "" },
            table.columns.len(),
            table.relations.len()
        );
    }
    Ok(())
}

/// Logs go to stderr so generated DDL on stdout stays pipeable.
fn setup_logging(verbosity: &str, format: &str) {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
