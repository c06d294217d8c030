//! Fund profile normalization over a quote-summary payload

use crate::model::{DynamicValue, Object, Row, Table};

const CATEGORY_AVERAGE: &str = "Category Average";

const OPERATIONS: &[(&str, &str)] = &[
    ("Annual Report Expense Ratio", "annualReportExpenseRatio"),
    ("Annual Holdings Turnover", "annualHoldingsTurnover"),
    ("Total Net Assets", "totalNetAssets"),
];

const EQUITY_METRICS: &[(&str, &str)] = &[
    ("Price/Earnings", "priceToEarnings"),
    ("Price/Book", "priceToBook"),
    ("Price/Sales", "priceToSales"),
    ("Price/Cashflow", "priceToCashflow"),
    ("Median Market Cap", "medianMarketCap"),
    ("3 Year Earnings Growth", "threeYearEarningsGrowth"),
];

const BOND_METRICS: &[(&str, &str)] = &[
    ("Duration", "duration"),
    ("Maturity", "maturity"),
    ("Credit Quality", "creditQuality"),
];

const ASSET_CLASSES: &[&str] = &[
    "cashPosition",
    "stockPosition",
    "bondPosition",
    "preferredPosition",
    "convertiblePosition",
    "otherPosition",
];

/// Fund views derived from one quote-summary result
///
/// `raw` is the module map (`{"quoteType": .., "fundProfile": .., "topHoldings": ..}`);
/// every view is computed on access and missing sections degrade to nulls or
/// empty tables.
#[derive(Debug, Clone, PartialEq)]
pub struct FundsData {
    symbol: String,
    raw: DynamicValue,
}

fn numeric(value: Option<&DynamicValue>) -> DynamicValue {
    value.and_then(DynamicValue::as_f64).into()
}

fn unwrapped(value: Option<&DynamicValue>) -> DynamicValue {
    value.map(|v| v.unwrap_raw().clone()).unwrap_or_default()
}

/// Merge every object in `items` into one map; on key collision the first non-null wins
fn merge_objects(items: Option<&DynamicValue>) -> Object {
    let mut merged = Object::new();
    let objects = items
        .and_then(DynamicValue::as_array)
        .unwrap_or_default()
        .iter()
        .filter_map(DynamicValue::as_object);
    for object in objects {
        for (key, value) in object {
            let value = value.unwrap_raw();
            match merged.get(key) {
                Some(existing) if !existing.is_null() => {}
                _ => {
                    merged.insert(key.clone(), value.clone());
                }
            }
        }
    }
    merged
}

impl FundsData {
    pub fn new(symbol: impl Into<String>, raw: DynamicValue) -> Self {
        Self {
            symbol: symbol.into(),
            raw,
        }
    }

    /// Accepts either the module map or a full `{"quoteSummary": {"result": [..]}}` envelope
    pub fn from_quote_summary(symbol: impl Into<String>, payload: &DynamicValue) -> Self {
        let raw = payload
            .value_at(&["quoteSummary", "result", "0"])
            .unwrap_or(payload)
            .clone();
        Self::new(symbol, raw)
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn raw(&self) -> &DynamicValue {
        &self.raw
    }

    fn section(&self, name: &str) -> Option<&DynamicValue> {
        self.raw.get(name)
    }

    pub fn quote_type(&self) -> Option<&str> {
        self.raw.value_at(&["quoteType", "quoteType"])?.unwrap_raw().as_str()
    }

    /// Long business summary, empty when absent
    pub fn description(&self) -> &str {
        self.raw
            .value_at(&["summaryProfile", "longBusinessSummary"])
            .and_then(DynamicValue::as_str)
            .unwrap_or_default()
    }

    pub fn fund_overview(&self) -> Object {
        let profile = self.section("fundProfile");
        ["categoryName", "family", "legalType"]
            .into_iter()
            .map(|key| (key.to_string(), unwrapped(profile.and_then(|p| p.get(key)))))
            .collect()
    }

    /// Expense ratio, turnover and net assets for the fund against its category
    pub fn fund_operations(&self) -> Table {
        let profile = self.section("fundProfile");
        let fees = profile.and_then(|p| p.get("feesExpensesInvestment"));
        let category = profile.and_then(|p| p.get("feesExpensesInvestmentCat"));

        let rows = OPERATIONS
            .iter()
            .map(|(label, key)| {
                let mut row = Row::new();
                row.insert("Attributes".into(), (*label).into());
                row.insert(self.symbol.clone(), numeric(fees.and_then(|f| f.get(key))));
                row.insert(
                    CATEGORY_AVERAGE.into(),
                    numeric(category.and_then(|c| c.get(key))),
                );
                row
            })
            .collect();
        Table::new(["Attributes", self.symbol.as_str(), CATEGORY_AVERAGE], rows)
    }

    pub fn asset_classes(&self) -> Object {
        let holdings = self.section("topHoldings");
        ASSET_CLASSES
            .iter()
            .map(|key| (key.to_string(), numeric(holdings.and_then(|h| h.get(key)))))
            .collect()
    }

    /// One row per holding with Symbol/Name/Percent
    pub fn top_holdings(&self) -> Table {
        let rows = self
            .section("topHoldings")
            .and_then(|h| h.get("holdings"))
            .and_then(DynamicValue::as_array)
            .unwrap_or_default()
            .iter()
            .map(|item| {
                let mut row = Row::new();
                row.insert("Symbol".into(), unwrapped(item.get("symbol")));
                row.insert("Name".into(), unwrapped(item.get("holdingName")));
                row.insert("Percent".into(), numeric(item.get("holdingPercent")));
                row
            })
            .collect();
        Table::new(["Symbol", "Name", "Percent"], rows)
    }

    fn metric_table(&self, section: &str, metrics: &[(&str, &str)]) -> Table {
        let source = self.section("topHoldings").and_then(|h| h.get(section));
        let rows = metrics
            .iter()
            .map(|(label, key)| {
                let mut row = Row::new();
                row.insert("Average".into(), (*label).into());
                row.insert(self.symbol.clone(), numeric(source.and_then(|s| s.get(key))));
                let category_key = format!("{}Cat", key);
                row.insert(
                    CATEGORY_AVERAGE.into(),
                    numeric(source.and_then(|s| s.get(&category_key))),
                );
                row
            })
            .collect();
        Table::new(["Average", self.symbol.as_str(), CATEGORY_AVERAGE], rows)
    }

    pub fn equity_holdings(&self) -> Table {
        self.metric_table("equityHoldings", EQUITY_METRICS)
    }

    pub fn bond_holdings(&self) -> Table {
        self.metric_table("bondHoldings", BOND_METRICS)
    }

    /// Rating bucket to weight, merged from the one-key objects upstream sends
    pub fn bond_ratings(&self) -> Object {
        merge_objects(self.section("topHoldings").and_then(|h| h.get("bondRatings")))
    }

    pub fn sector_weightings(&self) -> Object {
        merge_objects(self.section("topHoldings").and_then(|h| h.get("sectorWeightings")))
    }

    pub fn raw_table(&self) -> Table {
        self.raw.to_table()
    }
}
