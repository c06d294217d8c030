//! yfkit - Normalization core for Yahoo Finance payloads
//!
//! Decodes structured-text responses into [`DynamicValue`] trees, projects them
//! into [`Table`]s, decodes binary streaming quotes into [`wire::StreamingRecord`]s,
//! builds and validates screener queries, and normalizes chart and fund payloads.

pub mod config;
pub mod error;
pub mod model;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod query;
pub mod wire;

pub use config::Config;
pub use error::{Error, Result};
pub use model::{DynamicValue, Table};
