use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use clap::{Args, Parser, Subcommand};
use serde_json::json;
use sqlhelper_core::{Criterion, Filter, Params, Value};
use sqlhelper_sqlite::{ConnectionConfig, SqlDb};
use tracing::Level;

#[derive(Debug, Parser)]
#[command(name = "sqlhelper")]
#[command(about = "Run query helpers against a SQLite database")]
struct Cli {
    /// Database file path (overrides the config file's path).
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// YAML connection config.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Open the database read-only.
    #[arg(long, global = true)]
    read_only: bool,
    /// Log generated SQL and connection events.
    #[arg(long, global = true)]
    debug: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a query and print every row.
    All(QueryArgs),
    /// Run a query and print the first row.
    One(QueryArgs),
    /// Run a statement and print the number of affected rows.
    Exec(QueryArgs),
    /// Run several `;`-separated statements.
    Multi(QueryArgs),
    /// Run a query and print one column of the first row.
    Value(ValueArgs),
    /// Run a query and print rows indexed or grouped by a column.
    Index(IndexArgs),
    /// Count rows of a table.
    Count(CountArgs),
    /// Select rows of a table by column equality.
    Select(SelectArgs),
    /// Insert one row.
    Insert(InsertArgs),
    /// Update rows matching WHERE / WHERE-NOT conditions.
    Update(UpdateArgs),
}

#[derive(Debug, Args)]
struct QueryArgs {
    /// SQL text.
    query: String,
}

#[derive(Debug, Args)]
struct ValueArgs {
    /// SQL text.
    query: String,
    /// Column to print.
    #[arg(long)]
    key: String,
}

#[derive(Debug, Args)]
struct IndexArgs {
    /// SQL text.
    query: String,
    /// Column whose value becomes the map key.
    #[arg(long, default_value = "id")]
    key: String,
    /// Keep every row per key instead of the last one.
    #[arg(long)]
    group: bool,
}

#[derive(Debug, Args)]
struct CountArgs {
    /// Table name.
    table: String,
    /// Condition `column=value`; repeat a column to match any of several values.
    #[arg(long = "where", value_name = "COLUMN=VALUE")]
    conditions: Vec<String>,
    /// Column matched with LIKE %value% instead of equality.
    #[arg(long)]
    like: Vec<String>,
    /// Raw WHERE body, used verbatim instead of --where.
    #[arg(long, conflicts_with_all = ["conditions", "like"])]
    raw: Option<String>,
}

#[derive(Debug, Args)]
struct SelectArgs {
    /// Table name.
    table: String,
    /// Condition `column=value`; repeat a column to match any of several values.
    #[arg(long = "where", value_name = "COLUMN=VALUE")]
    conditions: Vec<String>,
    /// Comma-separated columns to return (default: all).
    #[arg(long)]
    columns: Option<String>,
    /// Maximum rows (0 = no limit).
    #[arg(long, default_value_t = 0)]
    limit: u32,
}

#[derive(Debug, Args)]
struct InsertArgs {
    /// Table name.
    table: String,
    /// Column values as `column=value`.
    #[arg(required = true, value_name = "COLUMN=VALUE")]
    values: Vec<String>,
}

#[derive(Debug, Args)]
struct UpdateArgs {
    /// Table name.
    table: String,
    /// Assignment `column=value`.
    #[arg(long = "set", required = true, value_name = "COLUMN=VALUE")]
    assignments: Vec<String>,
    /// Equality condition `column=value`.
    #[arg(long = "where", value_name = "COLUMN=VALUE")]
    conditions: Vec<String>,
    /// Inequality condition `column=value`.
    #[arg(long = "where-not", value_name = "COLUMN=VALUE")]
    exclusions: Vec<String>,
    /// Maximum rows to update (0 = no limit).
    #[arg(long, default_value_t = 1)]
    limit: u32,
}

fn main() {
    let cli = Cli::parse();

    let result = load_config(&cli).and_then(|config| {
        init_logging(cli.debug, &config)?;
        let db = SqlDb::open(config).map_err(|e| format!("Failed to open database: {e}"))?;
        run(&db, cli.command)
    });

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn load_config(cli: &Cli) -> Result<ConnectionConfig, String> {
    let mut config = match &cli.config {
        Some(path) => ConnectionConfig::load(path)
            .map_err(|e| format!("Failed to load config '{}': {e}", path.display()))?,
        None => ConnectionConfig::default(),
    };
    if let Some(db) = &cli.db {
        config.path = db.clone();
    }
    if cli.read_only {
        config.read_only = true;
    }
    if cli.config.is_none() && cli.db.is_none() {
        return Err("Specify a database with --db or --config".to_string());
    }
    Ok(config)
}

fn init_logging(debug: bool, config: &ConnectionConfig) -> Result<(), String> {
    let level = if debug { Level::DEBUG } else { Level::WARN };
    match &config.log_file {
        Some(path) => {
            let file = fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| format!("Failed to open log file '{}': {e}", path.display()))?;
            tracing_subscriber::fmt()
                .with_max_level(level)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_max_level(level)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

fn run(db: &SqlDb, command: Command) -> Result<(), String> {
    match command {
        Command::All(args) => print_json(&db.do_all(&args.query).map_err(|e| e.to_string())?),
        Command::One(args) => print_json(&db.do_one(&args.query).map_err(|e| e.to_string())?),
        Command::Exec(args) => {
            let affected = db.do_only(&args.query).map_err(|e| e.to_string())?;
            println!("{affected} row(s) affected.");
            Ok(())
        }
        Command::Multi(args) => {
            db.do_multi(&args.query).map_err(|e| e.to_string())?;
            println!("Batch executed.");
            Ok(())
        }
        Command::Value(args) => print_json(
            &db.do_from_array(&args.query, &args.key)
                .map_err(|e| e.to_string())?,
        ),
        Command::Index(args) => {
            if args.group {
                print_json(
                    &db.do_all_by_key(&args.query, &args.key)
                        .map_err(|e| e.to_string())?,
                )
            } else {
                print_json(
                    &db.do_all_by_id(&args.query, &args.key)
                        .map_err(|e| e.to_string())?,
                )
            }
        }
        Command::Count(args) => run_count(db, args),
        Command::Select(args) => run_select(db, args),
        Command::Insert(args) => run_insert(db, args),
        Command::Update(args) => run_update(db, args),
    }
}

fn run_count(db: &SqlDb, args: CountArgs) -> Result<(), String> {
    let count = match args.raw {
        Some(raw) => db.do_count_where(&args.table, &raw),
        None => {
            let filter = parse_filter(&args.conditions)?;
            let like: Vec<&str> = args.like.iter().map(String::as_str).collect();
            db.do_count(&args.table, &filter, &like)
        }
    }
    .map_err(|e| e.to_string())?;
    println!("{count}");
    Ok(())
}

fn run_select(db: &SqlDb, args: SelectArgs) -> Result<(), String> {
    let filter = parse_filter(&args.conditions)?;
    let columns = parse_csv_list(args.columns);
    let columns: Vec<&str> = columns.iter().map(String::as_str).collect();
    let rows = db
        .prepare_and_select(&args.table, &filter, &columns, args.limit)
        .map_err(|e| e.to_string())?;
    print_json(&rows)
}

fn run_insert(db: &SqlDb, args: InsertArgs) -> Result<(), String> {
    let data = parse_params(&args.values)?;
    db.prepare_and_insert(&args.table, &data)
        .map_err(|e| e.to_string())?;
    let id = db.last_insert_id().map_err(|e| e.to_string())?;
    print_json(&json!({ "inserted": 1, "last_insert_id": id }))
}

fn run_update(db: &SqlDb, args: UpdateArgs) -> Result<(), String> {
    let data = parse_params(&args.assignments)?;
    let where_eq = parse_filter(&args.conditions)?;
    let where_not = parse_filter(&args.exclusions)?;
    let affected = db
        .prepare_and_update(&args.table, &data, &where_eq, &where_not, args.limit)
        .map_err(|e| e.to_string())?;
    println!("{affected} row(s) affected.");
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<(), String> {
    let raw = serde_json::to_string_pretty(value)
        .map_err(|e| format!("JSON serialization failed: {e}"))?;
    println!("{raw}");
    Ok(())
}

fn parse_csv_list(raw: Option<String>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// Splits `column=value` at the first `=`.
fn split_pair(raw: &str) -> Result<(&str, Value), String> {
    let (column, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("Expected COLUMN=VALUE, got '{raw}'"))?;
    let column = column.trim();
    if column.is_empty() {
        return Err(format!("Missing column name in '{raw}'"));
    }
    Ok((column, parse_value(value)))
}

/// `null` → NULL, integers and floats → numbers, `"quoted"` → text verbatim,
/// anything else → text.
fn parse_value(raw: &str) -> Value {
    if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
        return Value::Text(raw[1..raw.len() - 1].to_string());
    }
    if raw.eq_ignore_ascii_case("null") {
        return Value::Null;
    }
    if let Ok(v) = raw.parse::<i64>() {
        return Value::Integer(v);
    }
    if let Ok(v) = raw.parse::<f64>() {
        if v.is_finite() {
            return Value::Real(v);
        }
    }
    Value::Text(raw.to_string())
}

fn parse_params(raw: &[String]) -> Result<Params, String> {
    let mut params = Params::new();
    for pair in raw {
        let (column, value) = split_pair(pair)?;
        params.insert(column, value);
    }
    Ok(params)
}

/// Repeating a column turns its criterion into a list.
fn parse_filter(raw: &[String]) -> Result<Filter, String> {
    let mut filter = Filter::new();
    for pair in raw {
        let (column, value) = split_pair(pair)?;
        let criterion = match filter.get(column) {
            None => Criterion::Eq(value),
            Some(Criterion::Eq(existing)) => Criterion::AnyOf(vec![existing.clone(), value]),
            Some(Criterion::AnyOf(existing)) => {
                let mut values = existing.clone();
                values.push(value);
                Criterion::AnyOf(values)
            }
        };
        filter.insert(column, criterion);
    }
    Ok(filter)
}
