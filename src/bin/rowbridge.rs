//! rowbridge — inspect and materialize result-set fixtures
//!
//! # Usage
//!
//! ```bash
//! # Materialize every row as a table
//! rowbridge rows users.json
//!
//! # As JSON, with labels and type codes
//! rowbridge rows users.json --format json --object
//!
//! # Column catalog and the type table in effect
//! rowbridge columns users.json --dialect openedge
//! rowbridge types
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use futures::StreamExt;
use rowbridge::prelude::*;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rowbridge")]
#[command(version)]
#[command(about = "Typed, labeled rows from result-set cursors", long_about = None)]
#[command(after_help = "EXAMPLES:
    rowbridge rows users.json
    rowbridge rows users.json --format json --object
    rowbridge columns users.json --dialect openedge")]
struct Cli {
    /// Config file (default: ./rowbridge.toml, then the user config dir)
    #[arg(short, long, global = true, env = "ROWBRIDGE_CONFIG")]
    config: Option<PathBuf>,

    /// Type table to use, overriding the config file
    #[arg(short, long, global = true, value_enum)]
    dialect: Option<DialectArg>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum DialectArg {
    Standard,
    Openedge,
}

impl From<DialectArg> for Dialect {
    fn from(arg: DialectArg) -> Self {
        match arg {
            DialectArg::Standard => Dialect::Standard,
            DialectArg::Openedge => Dialect::OpenEdge,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Materialize every row of a fixture
    Rows {
        /// JSON fixture file
        fixture: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,

        /// Emit {labels, types, rows} instead of bare rows (JSON only)
        #[arg(long)]
        object: bool,
    },
    /// Show the column catalog of a fixture
    Columns {
        /// JSON fixture file
        fixture: PathBuf,
    },
    /// Show the type table in effect
    Types,
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
    let filter = if verbose {
        EnvFilter::new("rowbridge=debug")
    } else {
        EnvFilter::try_from_env("ROWBRIDGE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> anyhow::Result<BridgeConfig> {
    let mut config = match &cli.config {
        Some(path) => BridgeConfig::load(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => {
            let (config, path) = BridgeConfig::discover()?;
            if cli.verbose {
                match path {
                    Some(p) => eprintln!("{} {}", "Config:".dimmed(), p.display()),
                    None => eprintln!("{} {}", "Config:".dimmed(), "defaults".dimmed()),
                }
            }
            config
        }
    };
    if let Some(dialect) = cli.dialect {
        config.dialect = dialect.into();
    }
    Ok(config)
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = load_config(cli)?;
    let types = config.type_map()?;

    match &cli.command {
        Commands::Rows {
            fixture,
            format,
            object,
        } => show_rows(fixture, &types, *format, *object).await,
        Commands::Columns { fixture } => show_columns(fixture, &types),
        Commands::Types => {
            show_types(&types);
            Ok(())
        }
    }
}

fn open(fixture: &Path, types: &TypeMap) -> anyhow::Result<RowMaterializer<MemoryCursor>> {
    let cursor = MemoryCursor::from_path(fixture)
        .with_context(|| format!("Failed to read fixture {}", fixture.display()))?;
    Ok(RowMaterializer::open(cursor, types)?)
}

async fn show_rows(
    fixture: &Path,
    types: &TypeMap,
    format: OutputFormat,
    object: bool,
) -> anyhow::Result<()> {
    let materializer = open(fixture, types)?;
    let catalog = materializer.catalog().clone();
    let mut rows = AsyncRows::new(materializer);

    if object {
        let result = rows.to_object().await;
        rows.close().await?;
        println!("{}", serde_json::to_string_pretty(&result?)?);
        return Ok(());
    }

    let collected: Vec<BridgeResult<Row>> = rows.into_stream().collect().await;
    let results = collected.into_iter().collect::<BridgeResult<Vec<Row>>>()?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&results)?),
        OutputFormat::Table => print_table(&catalog.labels(), &results),
    }
    Ok(())
}

fn print_table(labels: &[String], results: &[Row]) {
    if results.is_empty() {
        println!("{}", "(no results)".dimmed());
        return;
    }

    let mut widths: Vec<usize> = labels.iter().map(|l| l.chars().count()).collect();
    let rendered: Vec<Vec<String>> = results
        .iter()
        .map(|row| {
            labels
                .iter()
                .map(|l| row.get(l).map(|v| v.to_string()).unwrap_or_default())
                .collect()
        })
        .collect();
    for cells in &rendered {
        for (w, cell) in widths.iter_mut().zip(cells) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let header: Vec<String> = labels
        .iter()
        .zip(&widths)
        .map(|(l, w)| format!("{:width$}", l, width = *w))
        .collect();
    println!("{}", header.join(" │ ").white().bold());

    let sep: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();
    println!("{}", sep.join("─┼─").dimmed());

    for cells in &rendered {
        let line: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{:width$}", c, width = *w))
            .collect();
        println!("{}", line.join(" │ "));
    }

    println!();
    println!("{} row(s) returned", results.len().to_string().cyan());
}

fn show_columns(fixture: &Path, types: &TypeMap) -> anyhow::Result<()> {
    let mut materializer = open(fixture, types)?;
    let semantic = materializer.semantic_types();

    println!(
        "{:4} {:20} {:20} {:>6} {:>6}  {}",
        "#".white().bold(),
        "Label".white().bold(),
        "Name".white().bold(),
        "Type".white().bold(),
        "Size".white().bold(),
        "Read as".white().bold()
    );
    println!("{}", "─".repeat(72).dimmed());

    for (column, semantic) in materializer.catalog().iter().zip(&semantic) {
        let known = types.get(column.type_code).is_some();
        let read_as = if known {
            semantic.to_string().cyan()
        } else {
            format!("{} (unmapped)", semantic).yellow()
        };
        println!(
            "{:4} {:20} {:20} {:>6} {:>6}  {}",
            column.position,
            column.label.white(),
            column.name.dimmed(),
            column.type_code,
            column.display_size,
            read_as
        );
    }

    materializer.close()?;
    Ok(())
}

fn show_types(types: &TypeMap) {
    println!(
        "{} {} (v{})",
        "Type table:".cyan().bold(),
        types.dialect().to_string().white(),
        types.version()
    );
    println!();
    println!("{:>6}  {}", "Code".white().bold(), "Semantic type".white().bold());
    println!("{}", "─".repeat(32).dimmed());

    for (code, semantic) in types.entries() {
        let marker = if types.overridden().contains(&code) {
            " (override)".yellow().to_string()
        } else {
            String::new()
        };
        println!("{:>6}  {}{}", code, semantic.to_string().cyan(), marker);
    }
    println!();
    println!("{}", "Unlisted codes are read as string.".dimmed());
}
