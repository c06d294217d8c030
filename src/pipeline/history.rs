//! Price history normalization
//!
//! Chart payloads arrive as parallel arrays (`timestamp`, `indicators.quote[0].open`, ...)
//! plus per-kind event maps keyed by timestamp. [`HistorySeries`] holds them as bars
//! and events; [`HistorySeries::history_table`] renders the familiar
//! Date/Open/High/Low/Close/Adj Close/Volume frame with optional action columns.

use std::fmt;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, warn};

use crate::error::PipelineError;
use crate::model::{DynamicValue, Row, Table};

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One OHLCV bar
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryBar {
    pub date: DateTime<Utc>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub adjusted_close: Option<f64>,
    pub volume: Option<i64>,
    pub repaired: bool,
}

impl HistoryBar {
    pub fn new(date: DateTime<Utc>) -> Self {
        Self {
            date,
            open: None,
            high: None,
            low: None,
            close: None,
            adjusted_close: None,
            volume: None,
            repaired: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    Dividend,
    Split,
    CapitalGain,
}

impl EventKind {
    pub const ALL: [EventKind; 3] = [EventKind::Dividend, EventKind::Split, EventKind::CapitalGain];

    /// Column written by [`HistorySeries::history_table`]
    pub fn column(self) -> &'static str {
        match self {
            EventKind::Dividend => "Dividends",
            EventKind::Split => "Stock Splits",
            EventKind::CapitalGain => "Capital Gains",
        }
    }

    /// Key under `events` in a chart result
    fn payload_key(self) -> &'static str {
        match self {
            EventKind::Dividend => "dividends",
            EventKind::Split => "splits",
            EventKind::CapitalGain => "capitalGains",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Dividend => f.write_str("dividend"),
            EventKind::Split => f.write_str("split"),
            EventKind::CapitalGain => f.write_str("capitalGain"),
        }
    }
}

/// Corporate action attached to a date
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEvent {
    pub kind: EventKind,
    pub date: DateTime<Utc>,
    pub value: Option<f64>,
    pub ratio: Option<f64>,
    pub raw: DynamicValue,
}

impl HistoryEvent {
    /// Amount written into the action column: ratio for splits, value otherwise
    pub fn amount(&self) -> Option<f64> {
        match self.kind {
            EventKind::Split => self.ratio,
            EventKind::Dividend | EventKind::CapitalGain => self.value,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryMeta {
    pub currency: Option<String>,
    pub exchange: Option<String>,
    pub timezone: Option<String>,
    pub interval: Option<String>,
    pub instrument_type: Option<String>,
}

impl HistoryMeta {
    fn from_value(meta: &DynamicValue) -> Self {
        let text = |key: &str| meta.get(key).and_then(DynamicValue::as_str).map(str::to_string);
        Self {
            currency: text("currency"),
            exchange: text("exchangeName"),
            timezone: text("exchangeTimezoneName").or_else(|| text("timezone")),
            interval: text("dataGranularity"),
            instrument_type: text("instrumentType"),
        }
    }
}

/// Rendering options for [`HistorySeries::history_table`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryOptions {
    pub include_actions: bool,
    /// Render `Date` as wall-clock text instead of epoch seconds
    pub ignore_tz: bool,
}

impl Default for HistoryOptions {
    fn default() -> Self {
        Self {
            include_actions: true,
            ignore_tz: false,
        }
    }
}

impl HistoryOptions {
    pub fn with_actions(mut self, include: bool) -> Self {
        self.include_actions = include;
        self
    }

    pub fn with_ignore_tz(mut self, ignore: bool) -> Self {
        self.ignore_tz = ignore;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistorySeries {
    pub symbol: String,
    pub meta: HistoryMeta,
    pub bars: Vec<HistoryBar>,
    pub events: Vec<HistoryEvent>,
    pub repair_enabled: bool,
}

fn timestamp(secs: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0).single()
}

fn series_f64(series: Option<&DynamicValue>, index: usize) -> Option<f64> {
    series?.get_index(index)?.as_f64()
}

fn split_ratio(event: &DynamicValue) -> Option<f64> {
    let numerator = event.get("numerator").and_then(DynamicValue::as_f64);
    let denominator = event.get("denominator").and_then(DynamicValue::as_f64);
    if let (Some(n), Some(d)) = (numerator, denominator) {
        if d != 0.0 {
            return Some(n / d);
        }
    }

    let text = event.get("splitRatio")?.as_str()?;
    let (lhs, rhs) = text.split_once('/')?;
    let lhs: f64 = lhs.trim().parse().ok()?;
    let rhs: f64 = rhs.trim().parse().ok()?;
    (rhs != 0.0).then(|| lhs / rhs)
}

fn parse_events(events: Option<&DynamicValue>) -> Vec<HistoryEvent> {
    let Some(events) = events else {
        return Vec::new();
    };

    let mut output = Vec::new();
    for kind in EventKind::ALL {
        let Some(entries) = events.get(kind.payload_key()).and_then(DynamicValue::as_object) else {
            continue;
        };
        for (key, entry) in entries {
            let secs = entry
                .get("date")
                .and_then(DynamicValue::as_i64)
                .or_else(|| key.parse().ok());
            let Some(date) = secs.and_then(timestamp) else {
                debug!(kind = %kind, key = %key, "skipping event without a usable date");
                continue;
            };
            output.push(HistoryEvent {
                kind,
                date,
                value: entry.get("amount").and_then(DynamicValue::as_f64),
                ratio: match kind {
                    EventKind::Split => split_ratio(entry),
                    _ => None,
                },
                raw: entry.clone(),
            });
        }
    }
    output.sort_by_key(|event| event.date);
    output
}

/// Insert unless the row already holds a non-null value under `key`
fn merge(row: &mut Row, key: &str, value: DynamicValue) {
    match row.get(key) {
        Some(existing) if !existing.is_null() => {}
        Some(_) if value.is_null() => {}
        _ => {
            row.insert(key.to_string(), value);
        }
    }
}

impl HistorySeries {
    pub fn new(
        symbol: impl Into<String>,
        meta: HistoryMeta,
        bars: Vec<HistoryBar>,
        events: Vec<HistoryEvent>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            meta,
            bars,
            events,
            repair_enabled: false,
        }
    }

    pub fn with_repair(mut self, enabled: bool) -> Self {
        self.repair_enabled = enabled;
        self
    }

    /// Build a series from a chart endpoint payload (`{"chart": {"result": [..], "error": ..}}`)
    pub fn from_chart(
        symbol: &str,
        payload: &DynamicValue,
        repair: bool,
    ) -> Result<Self, PipelineError> {
        let chart = payload
            .get("chart")
            .ok_or_else(|| PipelineError::MissingData("chart".to_string()))?;

        if let Some(error) = chart.get("error").filter(|e| !e.is_null()) {
            let code = error
                .get("code")
                .and_then(DynamicValue::as_str)
                .unwrap_or("chart_error")
                .to_string();
            let description = error
                .get("description")
                .and_then(DynamicValue::as_str)
                .unwrap_or("Unknown chart error")
                .to_string();
            warn!(symbol, code = %code, "chart payload carries an error");
            return Err(PipelineError::Chart { code, description });
        }

        let result = chart
            .value_at(&["result", "0"])
            .ok_or_else(|| PipelineError::MissingData("chart.result".to_string()))?;

        let meta = result
            .get("meta")
            .map(HistoryMeta::from_value)
            .unwrap_or_default();

        let quote = result.value_at(&["indicators", "quote", "0"]);
        let column = |name: &str| quote.and_then(|q| q.get(name));
        let (opens, highs, lows, closes, volumes) = (
            column("open"),
            column("high"),
            column("low"),
            column("close"),
            column("volume"),
        );
        let adjusted = result.value_at(&["indicators", "adjclose", "0", "adjclose"]);

        let stamps = result
            .get("timestamp")
            .and_then(DynamicValue::as_array)
            .unwrap_or_default();

        let mut bars = Vec::with_capacity(stamps.len());
        for (i, stamp) in stamps.iter().enumerate() {
            let Some(date) = stamp.as_i64().and_then(timestamp) else {
                debug!(symbol, index = i, "skipping bar with unusable timestamp");
                continue;
            };
            bars.push(HistoryBar {
                open: series_f64(opens, i),
                high: series_f64(highs, i),
                low: series_f64(lows, i),
                close: series_f64(closes, i),
                adjusted_close: series_f64(adjusted, i),
                volume: volumes.and_then(|v| v.get_index(i)).and_then(DynamicValue::as_i64),
                ..HistoryBar::new(date)
            });
        }

        let events = parse_events(result.get("events"));
        Ok(HistorySeries::new(symbol, meta, bars, events).with_repair(repair))
    }

    /// Bars as stored, one row each
    pub fn bars_table(&self) -> Table {
        let rows = self
            .bars
            .iter()
            .map(|bar| {
                let mut row = Row::new();
                row.insert("date".into(), bar.date.timestamp().into());
                row.insert("open".into(), bar.open.into());
                row.insert("high".into(), bar.high.into());
                row.insert("low".into(), bar.low.into());
                row.insert("close".into(), bar.close.into());
                row.insert("adjustedClose".into(), bar.adjusted_close.into());
                row.insert("volume".into(), bar.volume.into());
                row.insert("repaired".into(), bar.repaired.into());
                row
            })
            .collect();
        Table::new(
            [
                "date",
                "open",
                "high",
                "low",
                "close",
                "adjustedClose",
                "volume",
                "repaired",
            ],
            rows,
        )
    }

    /// Events as stored, one row each
    pub fn events_table(&self) -> Table {
        let rows = self
            .events
            .iter()
            .map(|event| {
                let mut row = Row::new();
                row.insert("kind".into(), event.kind.to_string().into());
                row.insert("date".into(), event.date.timestamp().into());
                row.insert("value".into(), event.value.into());
                row.insert("ratio".into(), event.ratio.into());
                row.insert("raw".into(), event.raw.clone());
                row
            })
            .collect();
        Table::new(["kind", "date", "value", "ratio", "raw"], rows)
    }

    fn render_date(date: &DateTime<Utc>, options: &HistoryOptions) -> DynamicValue {
        if options.ignore_tz {
            DynamicValue::String(date.format(DATE_FORMAT).to_string())
        } else {
            date.timestamp().into()
        }
    }

    /// Normalized history frame
    ///
    /// Bars are sorted by date and bars sharing a date are merged, first non-null
    /// value per column winning. `Adj Close` appears only when every bar carries
    /// one. With actions enabled, each event kind that occurs gets a column
    /// defaulting to 0; an event lands on the first row of its calendar day.
    pub fn history_table(&self, options: &HistoryOptions) -> Table {
        let mut bars: Vec<&HistoryBar> = self.bars.iter().collect();
        bars.sort_by_key(|bar| bar.date);

        let include_adj_close =
            !bars.is_empty() && bars.iter().all(|bar| bar.adjusted_close.is_some());
        let action_kinds: Vec<EventKind> = if options.include_actions {
            EventKind::ALL
                .into_iter()
                .filter(|kind| self.events.iter().any(|e| e.kind == *kind))
                .collect()
        } else {
            Vec::new()
        };

        let mut columns = vec!["Date", "Open", "High", "Low", "Close"];
        if include_adj_close {
            columns.push("Adj Close");
        }
        columns.push("Volume");
        columns.extend(action_kinds.iter().map(|kind| kind.column()));
        if self.repair_enabled {
            columns.push("Repaired?");
        }

        let mut rows: IndexMap<i64, Row> = IndexMap::with_capacity(bars.len());
        let mut days: FxHashMap<NaiveDate, i64> = FxHashMap::default();
        for bar in &bars {
            let key = bar.date.timestamp();
            days.entry(bar.date.date_naive()).or_insert(key);

            let row = rows.entry(key).or_insert_with(|| {
                let mut row = Row::new();
                row.insert("Date".into(), Self::render_date(&bar.date, options));
                for kind in &action_kinds {
                    row.insert(kind.column().into(), 0i64.into());
                }
                row
            });
            merge(row, "Open", bar.open.into());
            merge(row, "High", bar.high.into());
            merge(row, "Low", bar.low.into());
            merge(row, "Close", bar.close.into());
            if include_adj_close {
                merge(row, "Adj Close", bar.adjusted_close.into());
            }
            merge(row, "Volume", bar.volume.into());
            if self.repair_enabled {
                let prior = row.get("Repaired?").and_then(DynamicValue::as_bool).unwrap_or(false);
                row.insert("Repaired?".into(), (prior || bar.repaired).into());
            }
        }

        if !action_kinds.is_empty() {
            let mut written: FxHashSet<(i64, EventKind)> = FxHashSet::default();
            for event in &self.events {
                let Some(key) = days.get(&event.date.date_naive()).copied() else {
                    debug!(
                        symbol = %self.symbol,
                        kind = %event.kind,
                        date = %event.date,
                        "event does not match any bar date"
                    );
                    continue;
                };
                let Some(amount) = event.amount() else {
                    continue;
                };
                if !written.insert((key, event.kind)) {
                    continue;
                }
                if let Some(row) = rows.get_mut(&key) {
                    row.insert(event.kind.column().into(), amount.into());
                }
            }
        }

        Table::new(columns, rows.into_values().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(secs: i64) -> DateTime<Utc> {
        timestamp(secs).unwrap()
    }

    fn bar(secs: i64, close: f64, adj: Option<f64>) -> HistoryBar {
        HistoryBar {
            open: Some(close - 1.0),
            high: Some(close + 1.0),
            low: Some(close - 2.0),
            close: Some(close),
            adjusted_close: adj,
            volume: Some(1000),
            ..HistoryBar::new(day(secs))
        }
    }

    fn dividend(secs: i64, value: f64) -> HistoryEvent {
        HistoryEvent {
            kind: EventKind::Dividend,
            date: day(secs),
            value: Some(value),
            ratio: None,
            raw: DynamicValue::Null,
        }
    }

    const D1: i64 = 1_700_000_000;
    const D2: i64 = D1 + 86_400;
    const D3: i64 = D2 + 86_400;

    #[test]
    fn test_adj_close_requires_every_bar() {
        let full = HistorySeries::new(
            "X",
            HistoryMeta::default(),
            vec![bar(D1, 10.0, Some(9.5)), bar(D2, 11.0, Some(10.5))],
            vec![],
        );
        assert!(full.history_table(&HistoryOptions::default()).has_column("Adj Close"));

        let partial = HistorySeries::new(
            "X",
            HistoryMeta::default(),
            vec![bar(D1, 10.0, Some(9.5)), bar(D2, 11.0, None)],
            vec![],
        );
        assert!(!partial.history_table(&HistoryOptions::default()).has_column("Adj Close"));
    }

    #[test]
    fn test_dividend_column() {
        let series = HistorySeries::new(
            "X",
            HistoryMeta::default(),
            vec![bar(D3, 12.0, None), bar(D1, 10.0, None), bar(D2, 11.0, None)],
            vec![dividend(D2 + 3600, 0.24)],
        );
        let table = series.history_table(&HistoryOptions::default());
        assert_eq!(
            table.column_names(),
            ["Date", "Open", "High", "Low", "Close", "Volume", "Dividends"]
        );
        assert_eq!(table.column("Date"), vec![DynamicValue::from(D1), D2.into(), D3.into()]);
        assert_eq!(
            table.column("Dividends"),
            vec![DynamicValue::from(0i64), 0.24.into(), 0i64.into()]
        );
        assert!(!table.has_column("Stock Splits"));
    }

    #[test]
    fn test_actions_disabled() {
        let series = HistorySeries::new(
            "X",
            HistoryMeta::default(),
            vec![bar(D1, 10.0, None)],
            vec![dividend(D1, 0.24)],
        );
        let table = series.history_table(&HistoryOptions::default().with_actions(false));
        assert!(!table.has_column("Dividends"));
    }

    #[test]
    fn test_duplicate_dates_first_non_null_wins() {
        let mut first = bar(D1, 10.0, None);
        first.volume = None;
        let second = bar(D1, 20.0, None);
        let series = HistorySeries::new("X", HistoryMeta::default(), vec![first, second], vec![]);
        let table = series.history_table(&HistoryOptions::default());
        assert_eq!(table.row_count(), 1);
        assert_eq!(table.cell(0, "Close"), &DynamicValue::from(10.0));
        assert_eq!(table.cell(0, "Volume"), &DynamicValue::from(1000i64));
    }

    #[test]
    fn test_ignore_tz_renders_text() {
        let bars = vec![bar(0, 1.0, None)];
        let series = HistorySeries::new("X", HistoryMeta::default(), bars, vec![]);
        let table = series.history_table(&HistoryOptions::default().with_ignore_tz(true));
        assert_eq!(table.cell(0, "Date").as_str(), Some("1970-01-01 00:00:00"));
    }

    #[test]
    fn test_repaired_column() {
        let mut repaired = bar(D2, 11.0, None);
        repaired.repaired = true;
        let series = HistorySeries::new(
            "X",
            HistoryMeta::default(),
            vec![bar(D1, 10.0, None), repaired],
            vec![],
        )
        .with_repair(true);
        let table = series.history_table(&HistoryOptions::default());
        assert_eq!(table.column("Repaired?"), vec![DynamicValue::from(false), true.into()]);
    }

    #[test]
    fn test_split_ratio_sources() {
        let value = DynamicValue::decode(br#"{"numerator": 4, "denominator": 1}"#).unwrap();
        assert_eq!(split_ratio(&value), Some(4.0));
        let value = DynamicValue::decode(br#"{"splitRatio": "3/2"}"#).unwrap();
        assert_eq!(split_ratio(&value), Some(1.5));
        let value = DynamicValue::decode(br#"{"splitRatio": "1/0"}"#).unwrap();
        assert_eq!(split_ratio(&value), None);
    }

    #[test]
    fn test_from_chart() {
        let payload = DynamicValue::decode(
            br#"{"chart":{"result":[{
                "meta":{"currency":"USD","exchangeName":"NMS","exchangeTimezoneName":"America/New_York","dataGranularity":"1d","instrumentType":"EQUITY"},
                "timestamp":[1700000000,1700086400],
                "events":{"splits":{"1700086400":{"date":1700086400,"numerator":2,"denominator":1,"splitRatio":"2:1"}}},
                "indicators":{"quote":[{"open":[1,2],"high":[1.5,2.5],"low":[0.5,null],"close":[1.2,2.2],"volume":[100,200]}],
                              "adjclose":[{"adjclose":[1.1,2.1]}]}
            }],"error":null}}"#,
        )
        .unwrap();
        let series = HistorySeries::from_chart("AAPL", &payload, false).unwrap();
        assert_eq!(series.meta.exchange.as_deref(), Some("NMS"));
        assert_eq!(series.bars.len(), 2);
        assert_eq!(series.bars[1].low, None);
        assert_eq!(series.events[0].kind, EventKind::Split);
        assert_eq!(series.events[0].ratio, Some(2.0));

        let table = series.history_table(&HistoryOptions::default());
        assert!(table.has_column("Adj Close"));
        assert_eq!(table.column("Stock Splits"), vec![DynamicValue::from(0i64), 2.0.into()]);
    }

    #[test]
    fn test_from_chart_errors() {
        let payload = DynamicValue::decode(
            br#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found"}}}"#,
        )
        .unwrap();
        assert_eq!(
            HistorySeries::from_chart("NOPE", &payload, false),
            Err(PipelineError::Chart {
                code: "Not Found".into(),
                description: "No data found".into()
            })
        );

        let empty = DynamicValue::decode(br#"{"chart":{"result":[],"error":null}}"#).unwrap();
        assert!(matches!(
            HistorySeries::from_chart("NOPE", &empty, false),
            Err(PipelineError::MissingData(_))
        ));
    }
}
