//! Configuration handling for yfkit

use std::path::PathBuf;
use std::str::FromStr;

use crate::pipeline::HistoryOptions;

/// How to read the input file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InputFormat {
    /// Pick by extension, then by content
    #[default]
    Auto,
    Json,
    /// Raw streaming message bytes
    Wire,
    /// One base64 streaming message (or JSON envelope) per line
    WireBase64,
}

impl FromStr for InputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(InputFormat::Auto),
            "json" => Ok(InputFormat::Json),
            "wire" | "pb" => Ok(InputFormat::Wire),
            "wire-base64" | "base64" | "b64" => Ok(InputFormat::WireBase64),
            _ => Err(format!("Unknown input format: {}", s)),
        }
    }
}

/// Output format for rendered tables
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Terminal,
    Json,
    Csv,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "terminal" => Ok(OutputFormat::Terminal),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

/// Which projection of a JSON payload to tabulate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum View {
    /// The (projected) value itself
    #[default]
    Raw,
    /// Chart payload through the history pipeline
    History,
    Bars,
    Events,
    /// Quote-summary payload through the funds pipeline
    FundOperations,
    TopHoldings,
    EquityHoldings,
    BondHoldings,
    /// Visualization payload flattened into records
    Calendar,
}

impl FromStr for View {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "raw" => Ok(View::Raw),
            "history" => Ok(View::History),
            "bars" => Ok(View::Bars),
            "events" => Ok(View::Events),
            "fund-operations" => Ok(View::FundOperations),
            "top-holdings" => Ok(View::TopHoldings),
            "equity-holdings" => Ok(View::EquityHoldings),
            "bond-holdings" => Ok(View::BondHoldings),
            "calendar" => Ok(View::Calendar),
            _ => Err(format!("Unknown view: {}", s)),
        }
    }
}

/// Configuration for one inspection run
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Path to the payload file
    pub input: PathBuf,
    pub input_format: InputFormat,
    pub view: View,
    /// Symbol used by the pipelines; defaults to the file stem
    pub symbol: Option<String>,
    /// Dotted path projected out of a JSON payload before tabulating
    pub json_path: Option<String>,
    pub output_format: OutputFormat,
    /// Columns to keep, in order
    pub columns: Vec<String>,
    pub sort_by: Option<String>,
    pub descending: bool,
    pub head: Option<usize>,
    pub tail: Option<usize>,
    pub transpose: bool,
    /// Collapse rows by this column, last row per key winning
    pub index_by: Option<String>,
    pub history: HistoryOptions,
    pub repair: bool,
}

impl Config {
    pub fn new(input: PathBuf) -> Self {
        Self {
            input,
            ..Default::default()
        }
    }

    pub fn with_input_format(mut self, format: InputFormat) -> Self {
        self.input_format = format;
        self
    }

    pub fn with_view(mut self, view: View) -> Self {
        self.view = view;
        self
    }

    pub fn with_symbol(mut self, symbol: String) -> Self {
        self.symbol = Some(symbol);
        self
    }

    pub fn with_json_path(mut self, path: String) -> Self {
        self.json_path = Some(path);
        self
    }

    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    pub fn with_columns(mut self, columns: Vec<String>) -> Self {
        self.columns = columns;
        self
    }

    pub fn with_sort_by(mut self, column: String, descending: bool) -> Self {
        self.sort_by = Some(column);
        self.descending = descending;
        self
    }

    pub fn with_head(mut self, n: usize) -> Self {
        self.head = Some(n);
        self
    }

    pub fn with_tail(mut self, n: usize) -> Self {
        self.tail = Some(n);
        self
    }

    pub fn with_transpose(mut self, transpose: bool) -> Self {
        self.transpose = transpose;
        self
    }

    pub fn with_index_by(mut self, column: String) -> Self {
        self.index_by = Some(column);
        self
    }

    pub fn with_history(mut self, options: HistoryOptions) -> Self {
        self.history = options;
        self
    }

    pub fn with_repair(mut self, repair: bool) -> Self {
        self.repair = repair;
        self
    }

    /// Symbol for the pipelines: explicit, else the upper-cased file stem
    pub fn symbol(&self) -> String {
        self.symbol.clone().unwrap_or_else(|| {
            self.input
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("SYMBOL")
                .to_uppercase()
        })
    }
}
