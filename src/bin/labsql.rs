//! labsql — port laboratory MySQL queries to the portable SQLite database
//!
//! # Usage
//!
//! ```bash
//! # Show the SQLite form of a query
//! labsql translate "select std(v) from hte_data.runs where id = %s"
//!
//! # Check every statement of a script against the embedded database
//! labsql verify queries.sql
//!
//! # Run a query against the embedded database
//! labsql query "select * from hte_data.runs where id = %s" --bind 42
//! ```

use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use labsql::prelude::*;
use labsql::transpiler::scanner::split_top_level;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "labsql")]
#[command(version)]
#[command(about = "Port laboratory MySQL queries and views to SQLite", long_about = None)]
#[command(after_help = "EXAMPLES:
    labsql translate 'select (t + interval 30 second) from hte_data.runs'
    labsql view v_runs.sql --apply
    labsql query 'select * from hte_data.runs where id = %s' --bind 42 --format json
    labsql port-views v_runs v_samples --database-url mysql://lab@db/hte_data")]
struct Cli {
    /// Configuration file (default: ./labsql.toml, then the user config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Schema qualifier to strip (overrides the configuration)
    #[arg(long, global = true)]
    schema: Option<String>,

    /// Embedded database file (overrides the configuration)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Networked database URL (overrides the configuration)
    #[arg(long, global = true, env = "LABSQL_DATABASE_URL")]
    database_url: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the SQLite form of a MySQL query
    Translate {
        /// The query to translate
        query: Option<String>,

        /// Read the query from a file instead
        #[arg(short, long, conflicts_with = "query")]
        file: Option<PathBuf>,
    },
    /// Translate a CREATE VIEW definition
    View {
        /// File holding the MySQL view definition
        file: PathBuf,

        /// Create the view in the embedded database
        #[arg(long)]
        apply: bool,
    },
    /// Translate every statement of a script and check it against the embedded database
    Verify {
        /// Script with `;`-separated statements
        file: PathBuf,

        /// Execute statements instead of only compiling them
        #[arg(long)]
        execute: bool,
    },
    /// Run a MySQL-dialect query against the embedded database
    Query {
        /// The query to run
        query: String,

        /// Parameter bindings for the `%s` markers, in order
        #[arg(short, long, value_delimiter = ',')]
        bind: Vec<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,

        /// Run against the networked database instead
        #[arg(long)]
        network: bool,
    },
    /// Copy view definitions from the networked database into the embedded one
    PortViews {
        /// View names
        #[arg(required = true)]
        names: Vec<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(&cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "labsql=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<LabConfig> {
    let mut config = match &cli.config {
        Some(path) => LabConfig::load(path)?,
        None => LabConfig::discover()?,
    };
    if let Some(schema) = &cli.schema {
        config.schema_name = schema.clone();
    }
    if let Some(db) = &cli.db {
        config.embedded_db_path = db.clone();
    }
    if let Some(url) = &cli.database_url {
        config.database_url = Some(url.clone());
    }
    Ok(config)
}

async fn run(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;

    match &cli.command {
        Commands::Translate { query, file } => {
            let query = match (query, file) {
                (Some(q), _) => q.clone(),
                (None, Some(path)) => read(path)?,
                (None, None) => anyhow::bail!("Give a query or --file"),
            };
            translate_query(&query, &config, cli.verbose)
        }
        Commands::View { file, apply } => port_view_file(file, *apply, &config),
        Commands::Verify { file, execute } => verify_script(file, *execute, &config),
        Commands::Query {
            query,
            bind,
            format,
            network,
        } => {
            let params: Vec<LabValue> = bind.iter().map(|b| LabValue::parse_arg(b)).collect();
            let results = if *network {
                network_query(query, params, &config).await?
            } else {
                EmbeddedDb::from_config(&config)?.query(query, &params)?
            };
            format_output(&results, format);
            Ok(())
        }
        Commands::PortViews { names } => port_views(names, &config).await,
    }
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Cannot read {}", path.display()))
}

fn translate_query(query: &str, config: &LabConfig, verbose: bool) -> Result<()> {
    if verbose {
        println!("{} {}", "Input:".dimmed(), query.yellow());
    }
    let sql = Translator::from_config(config).translate(query)?;
    println!("{}", "SQLite:".green().bold());
    println!("{}", sql.white());
    Ok(())
}

fn port_view_file(file: &Path, apply: bool, config: &LabConfig) -> Result<()> {
    let definition = read(file)?;
    if !apply {
        let sql = Translator::from_config(config).translate_view(&definition)?;
        println!("{}", sql);
        return Ok(());
    }

    let db = EmbeddedDb::from_config(config)?;
    let sql = db.create_view(&definition)?;
    println!("{}", sql.dimmed());
    println!(
        "{} Created view in {}",
        "✓".green(),
        config.embedded_db_path.display().to_string().cyan()
    );
    Ok(())
}

/// Outcome of one statement of a verified script.
struct Checked<'a> {
    index: usize,
    statement: &'a str,
    result: Result<String, LabError>,
}

fn verify_script(file: &Path, execute: bool, config: &LabConfig) -> Result<()> {
    let script = read(file)?;
    let db = EmbeddedDb::from_config(config)?;

    let statements: Vec<&str> = split_top_level(&script, b';')
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    println!(
        "{} Checking {} statement(s) from {}",
        "📋".cyan(),
        statements.len().to_string().green(),
        file.display()
    );

    // each statement stands alone: one failure never stops the batch
    let mut checked = Vec::with_capacity(statements.len());
    for (i, &statement) in statements.iter().enumerate() {
        let result = if execute {
            db.translator().translate(statement).and_then(|sql| {
                db.connection()
                    .execute_batch(&sql)
                    .map(|_| sql.clone())
                    .map_err(|e| LabError::Execution(format!("{}: {}", e, sql)))
            })
        } else {
            db.verify(statement)
        };
        match &result {
            Ok(_) => println!("  {} Statement {}", "✓".green(), i + 1),
            Err(e) => println!("  {} Statement {}: {}", "✗".red(), i + 1, e.to_string().red()),
        }
        checked.push(Checked {
            index: i + 1,
            statement,
            result,
        });
    }

    let failed = checked.iter().filter(|c| c.result.is_err()).count();
    let report = write_report(&checked, file, config)?;
    println!();
    println!(
        "{} passed, {} failed. Report: {}",
        (checked.len() - failed).to_string().green(),
        failed.to_string().red(),
        report.display().to_string().cyan()
    );

    if failed > 0 {
        anyhow::bail!("{} statement(s) could not be ported", failed);
    }
    Ok(())
}

fn write_report(checked: &[Checked<'_>], source: &Path, config: &LabConfig) -> Result<PathBuf> {
    let now = chrono::Local::now();
    std::fs::create_dir_all(&config.reports_dir)
        .with_context(|| format!("Cannot create {}", config.reports_dir.display()))?;
    let path = config
        .reports_dir
        .join(format!("verify-{}.txt", now.format("%Y%m%d-%H%M%S")));

    let mut report = String::new();
    writeln!(report, "labsql verification of {}", source.display())?;
    writeln!(report, "run at {}", now.to_rfc3339())?;
    writeln!(report, "schema qualifier: {}", config.schema_name)?;
    writeln!(report)?;
    for c in checked {
        match &c.result {
            Ok(sql) => {
                writeln!(report, "[ok] statement {}", c.index)?;
                writeln!(report, "{}", sql)?;
            }
            Err(e) => {
                writeln!(report, "[failed] statement {}: {}", c.index, e)?;
                writeln!(report, "{}", c.statement)?;
            }
        }
        writeln!(report)?;
    }

    std::fs::write(&path, report).with_context(|| format!("Cannot write {}", path.display()))?;
    Ok(path)
}

async fn network_query(
    query: &str,
    params: Vec<LabValue>,
    config: &LabConfig,
) -> Result<Vec<HashMap<String, serde_json::Value>>> {
    let url = config
        .database_url
        .as_deref()
        .context("No database URL. Use --database-url or set LABSQL_DATABASE_URL")?;
    let db = NetworkDb::connect(url).await?;
    let mut qry = db.query(query);
    for p in params {
        qry = qry.bind(p);
    }
    Ok(qry.fetch_all().await?)
}

async fn port_views(names: &[String], config: &LabConfig) -> Result<()> {
    let url = config
        .database_url
        .as_deref()
        .context("No database URL. Use --database-url or set LABSQL_DATABASE_URL")?;
    let network = NetworkDb::connect(url).await?;
    let embedded = EmbeddedDb::from_config(config)?;

    let mut failed = 0;
    for name in names {
        let ported = match network.show_create_view(name).await {
            Ok(definition) => embedded.create_view(&definition),
            Err(e) => Err(e),
        };
        match ported {
            Ok(_) => println!("  {} {}", "✓".green(), name.cyan()),
            Err(e) => {
                failed += 1;
                println!("  {} {}: {}", "✗".red(), name.cyan(), e.to_string().red());
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} view(s) could not be ported", failed, names.len());
    }
    Ok(())
}

fn format_output(results: &[HashMap<String, serde_json::Value>], format: &OutputFormat) {
    if results.is_empty() {
        println!("{}", "(no results)".dimmed());
        return;
    }

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(results).unwrap_or_default());
        }
        OutputFormat::Table => {
            // Get column names from first row
            let mut columns: Vec<&String> = results[0].keys().collect();
            columns.sort();

            // Calculate column widths
            let mut widths: HashMap<&String, usize> = columns.iter().map(|c| (*c, c.len())).collect();
            for row in results {
                for (col, val) in row {
                    let len = val_to_string(val).len();
                    if let Some(w) = widths.get_mut(col) {
                        *w = (*w).max(len);
                    }
                }
            }

            let header: Vec<String> = columns
                .iter()
                .map(|c| format!("{:width$}", c, width = widths[*c]))
                .collect();
            println!("{}", header.join(" │ ").white().bold());

            let sep: Vec<String> = columns.iter().map(|c| "─".repeat(widths[*c])).collect();
            println!("{}", sep.join("─┼─").dimmed());

            for row in results {
                let cells: Vec<String> = columns
                    .iter()
                    .map(|c| {
                        let val = row.get(*c).map(val_to_string).unwrap_or_default();
                        format!("{:width$}", val, width = widths[*c])
                    })
                    .collect();
                println!("{}", cells.join(" │ "));
            }

            println!();
            println!("{} row(s) returned", results.len().to_string().cyan());
        }
    }
}

fn val_to_string(val: &serde_json::Value) -> String {
    match val {
        serde_json::Value::Null => "NULL".to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s.clone(),
        _ => val.to_string(),
    }
}
