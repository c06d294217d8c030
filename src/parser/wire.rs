//! Streaming quote parsers: raw message bytes and base64 text frames

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use base64::Engine;

use crate::config::{Config, InputFormat};
use crate::model::Table;
use crate::wire::{self, StreamingRecord};

use super::Parser;

fn records_table(records: &[StreamingRecord]) -> Table {
    let mut table = Table::empty();
    for record in records {
        table.push_row(record.to_row());
    }
    table
}

/// Parser for a single raw streaming message
pub struct WireParser;

impl Parser for WireParser {
    fn parse(&self, path: &Path, _config: &Config) -> Result<Table> {
        let bytes = fs::read(path)
            .with_context(|| format!("Failed to open wire file: {}", path.display()))?;
        let record = wire::decode(&bytes).context("Failed to decode wire message")?;
        Ok(record.to_table())
    }

    fn supports_extension(&self, ext: &str) -> bool {
        matches!(ext.to_lowercase().as_str(), "pb" | "bin" | "wire")
    }

    fn format(&self) -> InputFormat {
        InputFormat::Wire
    }
}

/// Parser for captured text frames, one per line
///
/// Lines are either bare base64 messages or JSON envelopes carrying the
/// message under `message`. Bare lines are decoded in parallel.
pub struct WireTextParser;

impl Parser for WireTextParser {
    fn parse(&self, path: &Path, _config: &Config) -> Result<Table> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to open frame file: {}", path.display()))?;
        let lines: Vec<(usize, &str)> = text
            .lines()
            .enumerate()
            .map(|(i, line)| (i + 1, line.trim()))
            .filter(|(_, line)| !line.is_empty())
            .collect();

        // Envelopes decode in place; bare lines are batched and slotted back by position
        let engine = base64::engine::general_purpose::STANDARD;
        let mut slots: Vec<Option<StreamingRecord>> = Vec::with_capacity(lines.len());
        let mut pending: Vec<(usize, usize)> = Vec::new();
        let mut buffers: Vec<Vec<u8>> = Vec::new();
        for (slot, (n, line)) in lines.iter().enumerate() {
            if line.starts_with('{') {
                let message = wire::decode_envelope(line.as_bytes())
                    .with_context(|| format!("Failed to decode frame on line {}", n))?;
                slots.push(Some(message.record));
            } else {
                let buffer = engine
                    .decode(line)
                    .with_context(|| format!("Invalid base64 on line {}", n))?;
                pending.push((slot, *n));
                buffers.push(buffer);
                slots.push(None);
            }
        }

        for (result, (slot, n)) in wire::decode_batch(&buffers).into_iter().zip(pending) {
            let record =
                result.with_context(|| format!("Failed to decode message on line {}", n))?;
            slots[slot] = Some(record);
        }

        let records: Vec<StreamingRecord> = slots.into_iter().flatten().collect();
        Ok(records_table(&records))
    }

    fn supports_extension(&self, ext: &str) -> bool {
        matches!(ext.to_lowercase().as_str(), "b64" | "base64" | "frames")
    }

    fn format(&self) -> InputFormat {
        InputFormat::WireBase64
    }
}
