//! JSON output format

use std::path::Path;

use anyhow::Result;
use indexmap::IndexMap;
use serde::Serialize;
use termcolor::WriteColor;

use crate::model::{DynamicValue, Table};

use super::OutputFormatter;

/// JSON output formatter
pub struct JsonOutput {
    pretty: bool,
}

impl JsonOutput {
    pub fn new() -> Self {
        Self { pretty: true }
    }

    pub fn compact() -> Self {
        Self { pretty: false }
    }
}

impl Default for JsonOutput {
    fn default() -> Self {
        Self::new()
    }
}

/// Rows are dense: every column is present, absent cells as null
#[derive(Serialize)]
struct JsonTable<'a> {
    source: String,
    columns: Vec<&'a str>,
    rows: Vec<IndexMap<&'a str, &'a DynamicValue>>,
}

impl OutputFormatter for JsonOutput {
    fn render(&self, table: &Table, source: &Path, writer: &mut dyn WriteColor) -> Result<()> {
        let columns: Vec<&str> = table.columns().collect();
        let rows = (0..table.row_count())
            .map(|i| columns.iter().map(|c| (*c, table.cell(i, c))).collect())
            .collect();

        let output = JsonTable {
            source: source.display().to_string(),
            columns,
            rows,
        };

        if self.pretty {
            serde_json::to_writer_pretty(&mut *writer, &output)?;
        } else {
            serde_json::to_writer(&mut *writer, &output)?;
        }
        writeln!(writer)?;

        Ok(())
    }
}
