//! Boxed terminal tables

use std::path::Path;

use anyhow::Result;
use tabled::builder::Builder;
use tabled::settings::Style;
use termcolor::{Color, ColorSpec, WriteColor};

use crate::model::Table;

use super::OutputFormatter;

/// Terminal output: a coloured source header, then the table
pub struct TerminalOutput {
    /// Cells longer than this are cut with an ellipsis
    max_width: usize,
}

impl TerminalOutput {
    pub fn new() -> Self {
        Self { max_width: 48 }
    }

    pub fn with_max_width(max_width: usize) -> Self {
        Self { max_width }
    }

    fn clip(&self, text: &str) -> String {
        if text.chars().count() <= self.max_width {
            return text.to_string();
        }
        let mut clipped: String = text.chars().take(self.max_width.saturating_sub(1)).collect();
        clipped.push('…');
        clipped
    }

    fn write_header(
        &self,
        table: &Table,
        source: &Path,
        writer: &mut dyn WriteColor,
    ) -> Result<()> {
        writer.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)).set_bold(true))?;
        write!(writer, "{}", source.display())?;
        writer.reset()?;
        writeln!(
            writer,
            " ({} rows × {} columns)",
            table.row_count(),
            table.column_count()
        )?;
        Ok(())
    }
}

impl Default for TerminalOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputFormatter for TerminalOutput {
    fn render(&self, table: &Table, source: &Path, writer: &mut dyn WriteColor) -> Result<()> {
        self.write_header(table, source, writer)?;

        if table.column_count() == 0 {
            writeln!(writer, "(empty)")?;
            return Ok(());
        }

        let mut builder = Builder::default();
        builder.push_record(table.columns().map(|c| self.clip(c)));
        for i in 0..table.row_count() {
            builder.push_record(table.columns().map(|c| self.clip(&table.cell(i, c).display())));
        }

        let mut rendered = builder.build();
        rendered.with(Style::modern());
        writeln!(writer, "{}", rendered)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DynamicValue;
    use termcolor::NoColor;

    #[test]
    fn test_renders_cells_and_header() {
        let value =
            DynamicValue::decode(br#"[{"symbol": "AAPL", "price": 189.5}, {"symbol": "MSFT"}]"#)
                .unwrap();
        let mut out = NoColor::new(Vec::new());
        TerminalOutput::new()
            .render(&value.to_table(), Path::new("quotes.json"), &mut out)
            .unwrap();
        let text = String::from_utf8(out.into_inner()).unwrap();
        assert!(text.starts_with("quotes.json (2 rows × 2 columns)"));
        assert!(text.contains("AAPL"));
        assert!(text.contains("189.5"));
        assert!(text.contains("null"));
    }

    #[test]
    fn test_clip_long_cells() {
        let output = TerminalOutput::with_max_width(5);
        assert_eq!(output.clip("abcdefgh"), "abcd…");
        assert_eq!(output.clip("abc"), "abc");
    }
}
