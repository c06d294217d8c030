//! CSV output format

use std::path::Path;

use anyhow::{Context, Result};
use termcolor::WriteColor;

use crate::model::{DynamicValue, Table};

use super::OutputFormatter;

/// CSV output formatter; nulls become empty fields
pub struct CsvOutput {
    delimiter: u8,
}

impl CsvOutput {
    pub fn new() -> Self {
        Self { delimiter: b',' }
    }

    pub fn with_delimiter(delimiter: u8) -> Self {
        Self { delimiter }
    }
}

impl Default for CsvOutput {
    fn default() -> Self {
        Self::new()
    }
}

fn field(value: &DynamicValue) -> String {
    match value {
        DynamicValue::Null => String::new(),
        other => other.display().into_owned(),
    }
}

impl OutputFormatter for CsvOutput {
    fn render(&self, table: &Table, _source: &Path, writer: &mut dyn WriteColor) -> Result<()> {
        let mut csv_writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_writer(writer);

        csv_writer
            .write_record(table.columns())
            .context("Failed to write CSV header")?;
        for i in 0..table.row_count() {
            csv_writer
                .write_record(table.columns().map(|c| field(table.cell(i, c))))
                .context("Failed to write CSV row")?;
        }
        csv_writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use termcolor::NoColor;

    #[test]
    fn test_quotes_and_nulls() {
        let value = DynamicValue::decode(br#"[{"name": "Apple, Inc.", "pe": 29.5}, {"name": "X"}]"#)
            .unwrap();
        let mut out = NoColor::new(Vec::new());
        CsvOutput::new()
            .render(&value.to_table(), Path::new("in.json"), &mut out)
            .unwrap();
        let text = String::from_utf8(out.into_inner()).unwrap();
        assert_eq!(text, "name,pe\n\"Apple, Inc.\",29.5\nX,\n");
    }
}
