//! Parser layer for reading provider payload files into tables

mod json;
mod wire;

use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{bail, Result};

use crate::config::{Config, InputFormat};
use crate::model::Table;

pub use self::json::JsonParser;
pub use self::wire::{WireParser, WireTextParser};

/// Trait for parsing payload files
pub trait Parser: Send + Sync {
    /// Parse a file and return a Table
    fn parse(&self, path: &Path, config: &Config) -> Result<Table>;

    /// Check if this parser can handle the given file extension
    fn supports_extension(&self, ext: &str) -> bool;

    /// Input format this parser reads
    fn format(&self) -> InputFormat;
}

/// Factory for choosing a parser by explicit format, extension or content
pub struct ParserFactory {
    parsers: Vec<Box<dyn Parser>>,
}

impl Default for ParserFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl ParserFactory {
    pub fn new() -> Self {
        Self {
            parsers: vec![
                Box::new(JsonParser),
                Box::new(WireParser),
                Box::new(WireTextParser),
            ],
        }
    }

    fn by_format(&self, format: InputFormat) -> Option<&dyn Parser> {
        self.parsers
            .iter()
            .find(|p| p.format() == format)
            .map(|p| p.as_ref())
    }

    /// Get a parser for the given file path
    pub fn get_parser(&self, path: &Path, format: InputFormat) -> Result<&dyn Parser> {
        if format != InputFormat::Auto {
            if let Some(parser) = self.by_format(format) {
                return Ok(parser);
            }
        }

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        for parser in &self.parsers {
            if parser.supports_extension(&ext) {
                return Ok(parser.as_ref());
            }
        }

        if let Some(parser) = detect_format(path).and_then(|f| self.by_format(f)) {
            return Ok(parser);
        }

        bail!("Unsupported input: {}", path.display())
    }

    /// Parse a file using the appropriate parser
    pub fn parse(&self, path: &Path, config: &Config) -> Result<Table> {
        let parser = self.get_parser(path, config.input_format)?;
        parser.parse(path, config)
    }
}

fn is_base64_text(bytes: &[u8]) -> bool {
    bytes.iter().all(|&b| {
        b.is_ascii_alphanumeric()
            || b.is_ascii_whitespace()
            || matches!(b, b'+' | b'/' | b'=')
    })
}

/// Detect input format from content (for files without a known extension)
pub fn detect_format(path: &Path) -> Option<InputFormat> {
    let mut file = File::open(path).ok()?;
    let mut buffer = [0u8; 512];
    let bytes_read = file.read(&mut buffer).ok()?;
    let head = &buffer[..bytes_read];

    let first = head.iter().find(|b| !b.is_ascii_whitespace())?;
    if matches!(*first, b'{' | b'[') {
        return Some(InputFormat::Json);
    }
    if is_base64_text(head) {
        return Some(InputFormat::WireBase64);
    }
    Some(InputFormat::Wire)
}
