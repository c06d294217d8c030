//! yfkit - inspect Yahoo Finance payloads as tables

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use yfkit::config::{Config, InputFormat, OutputFormat, View};
use yfkit::model::Table;
use yfkit::output::render_to_stdout;
use yfkit::parser::ParserFactory;
use yfkit::pipeline::HistoryOptions;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliInputFormat {
    Auto,
    Json,
    Wire,
    WireBase64,
}

impl From<CliInputFormat> for InputFormat {
    fn from(f: CliInputFormat) -> Self {
        match f {
            CliInputFormat::Auto => InputFormat::Auto,
            CliInputFormat::Json => InputFormat::Json,
            CliInputFormat::Wire => InputFormat::Wire,
            CliInputFormat::WireBase64 => InputFormat::WireBase64,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliOutputFormat {
    Terminal,
    Json,
    Csv,
}

impl From<CliOutputFormat> for OutputFormat {
    fn from(f: CliOutputFormat) -> Self {
        match f {
            CliOutputFormat::Terminal => OutputFormat::Terminal,
            CliOutputFormat::Json => OutputFormat::Json,
            CliOutputFormat::Csv => OutputFormat::Csv,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliView {
    Raw,
    History,
    Bars,
    Events,
    FundOperations,
    TopHoldings,
    EquityHoldings,
    BondHoldings,
    Calendar,
}

impl From<CliView> for View {
    fn from(v: CliView) -> Self {
        match v {
            CliView::Raw => View::Raw,
            CliView::History => View::History,
            CliView::Bars => View::Bars,
            CliView::Events => View::Events,
            CliView::FundOperations => View::FundOperations,
            CliView::TopHoldings => View::TopHoldings,
            CliView::EquityHoldings => View::EquityHoldings,
            CliView::BondHoldings => View::BondHoldings,
            CliView::Calendar => View::Calendar,
        }
    }
}

/// Inspect Yahoo Finance payloads (JSON responses, streaming quote frames) as tables
#[derive(Parser, Debug)]
#[command(name = "yfkit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Payload file to read
    file: PathBuf,

    /// Input format
    #[arg(short, long, value_enum, default_value = "auto")]
    input: CliInputFormat,

    /// Projection to tabulate
    #[arg(long, value_enum, default_value = "raw")]
    view: CliView,

    /// Symbol for chart and fund views (defaults to the file stem)
    #[arg(long)]
    symbol: Option<String>,

    /// Dotted path to project out of a JSON payload (e.g. finance.result.0.quotes)
    #[arg(short = 'p', long)]
    path: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "terminal")]
    format: CliOutputFormat,

    /// Column(s) to keep (comma-separated)
    #[arg(short, long, value_delimiter = ',')]
    columns: Vec<String>,

    /// Column to sort by
    #[arg(long)]
    sort_by: Option<String>,

    /// Sort descending
    #[arg(long, requires = "sort_by")]
    desc: bool,

    /// Keep the first N rows
    #[arg(long)]
    head: Option<usize>,

    /// Keep the last N rows
    #[arg(long)]
    tail: Option<usize>,

    /// Collapse rows by this column, last row per key winning
    #[arg(long)]
    index_by: Option<String>,

    /// Pivot rows into columns
    #[arg(short, long)]
    transpose: bool,

    /// History view: leave out dividend/split/capital gain columns
    #[arg(long)]
    no_actions: bool,

    /// History view: render dates as text instead of epoch seconds
    #[arg(long)]
    ignore_tz: bool,

    /// History view: add the Repaired? column
    #[arg(long)]
    repair: bool,

    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn config_from(cli: Cli) -> Config {
    Config {
        input: cli.file,
        input_format: cli.input.into(),
        view: cli.view.into(),
        symbol: cli.symbol,
        json_path: cli.path,
        output_format: cli.format.into(),
        columns: cli.columns,
        sort_by: cli.sort_by,
        descending: cli.desc,
        head: cli.head,
        tail: cli.tail,
        transpose: cli.transpose,
        index_by: cli.index_by,
        history: HistoryOptions::default()
            .with_actions(!cli.no_actions)
            .with_ignore_tz(cli.ignore_tz),
        repair: cli.repair,
    }
}

/// Apply index, selection, sort, head/tail and transpose in that order
fn shape(mut table: Table, config: &Config) -> Table {
    if let Some(column) = &config.index_by {
        table = table.index(column).to_table();
    }
    if !config.columns.is_empty() {
        table = table.select(config.columns.as_slice());
    }
    if let Some(column) = &config.sort_by {
        table = table.sorted(column, !config.descending);
    }
    if let Some(n) = config.head {
        table = table.head(n);
    }
    if let Some(n) = config.tail {
        table = table.tail(n);
    }
    if config.transpose {
        table = table.transposed();
    }
    table
}

fn run(cli: Cli) -> Result<()> {
    let config = config_from(cli);

    let factory = ParserFactory::new();
    let table = factory
        .parse(&config.input, &config)
        .with_context(|| format!("Failed to read {}", config.input.display()))?;
    debug!(
        rows = table.row_count(),
        columns = table.column_count(),
        "parsed input"
    );

    let table = shape(table, &config);
    render_to_stdout(&table, &config.input, config.output_format)?;
    Ok(())
}
