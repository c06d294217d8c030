//! Normalization pipelines from provider payloads into tables

mod funds;
mod history;
mod visualization;

pub use funds::FundsData;
pub use history::{
    EventKind, HistoryBar, HistoryEvent, HistoryMeta, HistoryOptions, HistorySeries,
};
pub use visualization::flatten_visualization;
