//! JSON payload parser

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::config::{Config, InputFormat, View};
use crate::model::{DynamicValue, Table};
use crate::pipeline::{flatten_visualization, FundsData, HistorySeries};

use super::Parser;

/// Parser for JSON documents and newline-delimited JSON
pub struct JsonParser;

impl Parser for JsonParser {
    fn parse(&self, path: &Path, config: &Config) -> Result<Table> {
        let bytes = fs::read(path)
            .with_context(|| format!("Failed to open JSON file: {}", path.display()))?;

        let lines = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| matches!(e.to_lowercase().as_str(), "jsonl" | "ndjson"));
        let value = if lines {
            decode_lines(&bytes)?
        } else {
            DynamicValue::decode(&bytes).context("Failed to parse JSON file")?
        };

        let value = match config.json_path.as_deref() {
            Some(path) => value
                .lookup(path)
                .cloned()
                .with_context(|| format!("JSON path not found: {}", path))?,
            None => value,
        };

        tabulate(&value, config)
    }

    fn supports_extension(&self, ext: &str) -> bool {
        matches!(ext.to_lowercase().as_str(), "json" | "jsonl" | "ndjson")
    }

    fn format(&self) -> InputFormat {
        InputFormat::Json
    }
}

fn decode_lines(bytes: &[u8]) -> Result<DynamicValue> {
    let items = bytes
        .split(|b| *b == b'\n')
        .enumerate()
        .filter(|(_, line)| !line.iter().all(u8::is_ascii_whitespace))
        .map(|(i, line)| {
            DynamicValue::decode(line)
                .with_context(|| format!("Failed to parse JSON line {}", i + 1))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(items.into())
}

/// Run the configured view over a decoded payload
pub fn tabulate(value: &DynamicValue, config: &Config) -> Result<Table> {
    let symbol = config.symbol();
    let table = match config.view {
        View::Raw => value.to_table(),
        View::History | View::Bars | View::Events => {
            let series = HistorySeries::from_chart(&symbol, value, config.repair)
                .with_context(|| format!("Failed to read chart payload for {}", symbol))?;
            match config.view {
                View::Bars => series.bars_table(),
                View::Events => series.events_table(),
                _ => series.history_table(&config.history),
            }
        }
        View::FundOperations | View::TopHoldings | View::EquityHoldings | View::BondHoldings => {
            let funds = FundsData::from_quote_summary(symbol, value);
            match config.view {
                View::FundOperations => funds.fund_operations(),
                View::TopHoldings => funds.top_holdings(),
                View::EquityHoldings => funds.equity_holdings(),
                _ => funds.bond_holdings(),
            }
        }
        View::Calendar => flatten_visualization(value).to_table(),
    };
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    fn parse_str(suffix: &str, content: &str, config: &Config) -> Result<Table> {
        let mut file = Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        JsonParser.parse(file.path(), config)
    }

    #[test]
    fn test_array_union_of_keys() {
        let content = r#"[{"a": 1, "b": 2}, {"a": 3, "c": 4}]"#;
        let table = parse_str(".json", content, &Config::default()).unwrap();
        assert_eq!(table.column_names(), ["a", "b", "c"]);
        assert!(table.cell(1, "b").is_null());
    }

    #[test]
    fn test_json_path_projection() {
        let config = Config::default().with_json_path("finance.result.0.quotes".into());
        let table = parse_str(
            ".json",
            r#"{"finance":{"result":[{"quotes":[{"symbol":"AAPL"},{"symbol":"MSFT"}]}]}}"#,
            &config,
        )
        .unwrap();
        assert_eq!(table.column("symbol"), vec![DynamicValue::from("AAPL"), "MSFT".into()]);

        let missing = Config::default().with_json_path("finance.nope".into());
        assert!(parse_str(".json", r#"{"finance":{}}"#, &missing).is_err());
    }

    #[test]
    fn test_ndjson() {
        let table = parse_str(".ndjson", "{\"x\": 1}\n\n{\"x\": 2}\n", &Config::default()).unwrap();
        assert_eq!(table.row_count(), 2);
    }

    #[test]
    fn test_malformed_json_is_error() {
        assert!(parse_str(".json", "{not json", &Config::default()).is_err());
    }
}
