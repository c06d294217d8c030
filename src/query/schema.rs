//! Permitted screener fields per instrument type

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use rustc_hash::{FxHashMap, FxHashSet};

/// Instrument classes the screener accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstrumentType {
    Equity,
    MutualFund,
}

impl InstrumentType {
    /// Upstream name used in request bodies
    pub fn as_str(self) -> &'static str {
        match self {
            InstrumentType::Equity => "EQUITY",
            InstrumentType::MutualFund => "MUTUALFUND",
        }
    }
}

impl fmt::Display for InstrumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InstrumentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "equity" => Ok(InstrumentType::Equity),
            "mutualfund" | "fund" => Ok(InstrumentType::MutualFund),
            _ => Err(format!("Unknown instrument type: {}", s)),
        }
    }
}

const EQUITY_FIELDS: &[&str] = &[
    // categorical
    "region",
    "sector",
    "peer_group",
    "industry",
    "exchange",
    // price
    "lastclosemarketcap.lasttwelvemonths",
    "percentchange",
    "lastclose52weekhigh.lasttwelvemonths",
    "fiftytwowkpercentchange",
    "intradayprice",
    "lastclose52weeklow.lasttwelvemonths",
    "intradaymarketcap",
    // trading
    "beta",
    "avgdailyvol3m",
    "pctheldinsider",
    "pctheldinst",
    "dayvolume",
    "eodvolume",
    // short interest
    "short_percentage_of_shares_outstanding.value",
    "short_interest.value",
    "short_percentage_of_float.value",
    "days_to_cover_short.value",
    "short_interest_percentage_change.value",
    // valuation
    "bookvalueshare.lasttwelvemonths",
    "lastclosemarketcaptotalrevenue.lasttwelvemonths",
    "lastclosetevtotalrevenue.lasttwelvemonths",
    "pricebookratio.quarterly",
    "peratio.lasttwelvemonths",
    "lastclosepricetangiblebookvalue.lasttwelvemonths",
    "lastclosepriceearnings.lasttwelvemonths",
    "pegratio_5y",
    // profitability
    "consecutive_years_of_dividend_growth_count",
    "returnonassets.lasttwelvemonths",
    "returnonequity.lasttwelvemonths",
    "forward_dividend_per_share",
    "forward_dividend_yield",
    "returnontotalcapital.lasttwelvemonths",
    // leverage
    "lastclosetevebit.lasttwelvemonths",
    "netdebtebitda.lasttwelvemonths",
    "totaldebtequity.lasttwelvemonths",
    "ltdebtequity.lasttwelvemonths",
    "ebitinterestexpense.lasttwelvemonths",
    "ebitdainterestexpense.lasttwelvemonths",
    "lastclosetevebitda.lasttwelvemonths",
    "totaldebtebitda.lasttwelvemonths",
    // liquidity
    "quickratio.lasttwelvemonths",
    "altmanzscoreusingtheaveragestockinformationforaperiod.lasttwelvemonths",
    "currentratio.lasttwelvemonths",
    "operatingcashflowtocurrentliabilities.lasttwelvemonths",
    // income statement
    "totalrevenues.lasttwelvemonths",
    "netincomemargin.lasttwelvemonths",
    "grossprofit.lasttwelvemonths",
    "ebitda1yrgrowth.lasttwelvemonths",
    "dilutedepscontinuingoperations.lasttwelvemonths",
    "quarterlyrevenuegrowth.quarterly",
    "epsgrowth.lasttwelvemonths",
    "netincomeis.lasttwelvemonths",
    "ebitda.lasttwelvemonths",
    "dilutedeps1yrgrowth.lasttwelvemonths",
    "totalrevenues1yrgrowth.lasttwelvemonths",
    "operatingincome.lasttwelvemonths",
    "netincome1yrgrowth.lasttwelvemonths",
    "grossprofitmargin.lasttwelvemonths",
    "ebitdamargin.lasttwelvemonths",
    "ebit.lasttwelvemonths",
    "basicepscontinuingoperations.lasttwelvemonths",
    "netepsbasic.lasttwelvemonths",
    "netepsdiluted.lasttwelvemonths",
    // balance sheet
    "totalassets.lasttwelvemonths",
    "totalcommonsharesoutstanding.lasttwelvemonths",
    "totaldebt.lasttwelvemonths",
    "totalequity.lasttwelvemonths",
    "totalcurrentassets.lasttwelvemonths",
    "totalcashandshortterminvestments.lasttwelvemonths",
    "totalcommonequity.lasttwelvemonths",
    "totalcurrentliabilities.lasttwelvemonths",
    "totalsharesoutstanding",
    // cash flow
    "leveredfreecashflow.lasttwelvemonths",
    "capitalexpenditure.lasttwelvemonths",
    "cashfromoperations.lasttwelvemonths",
    "leveredfreecashflow1yrgrowth.lasttwelvemonths",
    "unleveredfreecashflow.lasttwelvemonths",
    "cashfromoperations1yrgrowth.lasttwelvemonths",
    // esg
    "esg_score",
    "environmental_score",
    "governance_score",
    "social_score",
    "highest_controversy",
];

const FUND_FIELDS: &[&str] = &[
    "categoryname",
    "performanceratingoverall",
    "initialinvestment",
    "annualreturnnavy1categoryrank",
    "riskratingoverall",
    "exchange",
    "eodprice",
    "intradaypricechange",
    "intradayprice",
];

const REGIONS: &[&str] = &[
    "ar", "at", "au", "be", "br", "ca", "ch", "cl", "cn", "cz", "de", "dk", "ee", "eg", "es",
    "fi", "fr", "gb", "gr", "hk", "hu", "id", "ie", "il", "in", "is", "it", "jp", "kr", "kw",
    "lk", "lt", "lv", "mx", "my", "nl", "no", "nz", "pe", "ph", "pk", "pl", "pt", "qa", "ro",
    "ru", "sa", "se", "sg", "sr", "th", "tr", "tw", "us", "ve", "vn", "za",
];

const SECTORS: &[&str] = &[
    "Basic Materials",
    "Communication Services",
    "Consumer Cyclical",
    "Consumer Defensive",
    "Energy",
    "Financial Services",
    "Healthcare",
    "Industrials",
    "Real Estate",
    "Technology",
    "Utilities",
];

#[derive(Debug, Default)]
struct Fields {
    names: FxHashSet<&'static str>,
    values: FxHashMap<&'static str, FxHashSet<&'static str>>,
}

impl Fields {
    fn new(names: &[&'static str]) -> Self {
        Self {
            names: names.iter().copied().collect(),
            values: FxHashMap::default(),
        }
    }

    fn with_values(mut self, field: &'static str, values: &[&'static str]) -> Self {
        self.values.insert(field, values.iter().copied().collect());
        self
    }
}

/// Read-only registry of field names permitted per instrument type
#[derive(Debug)]
pub struct FieldSchema {
    by_type: FxHashMap<InstrumentType, Fields>,
}

static SCHEMA: Lazy<FieldSchema> = Lazy::new(FieldSchema::embedded);

impl FieldSchema {
    /// The process-wide schema built from the embedded tables
    pub fn global() -> &'static FieldSchema {
        &SCHEMA
    }

    fn embedded() -> Self {
        let mut by_type = FxHashMap::default();
        by_type.insert(
            InstrumentType::Equity,
            Fields::new(EQUITY_FIELDS)
                .with_values("region", REGIONS)
                .with_values("sector", SECTORS),
        );
        by_type.insert(InstrumentType::MutualFund, Fields::new(FUND_FIELDS));
        Self { by_type }
    }

    /// Exact, case-sensitive membership test
    pub fn contains(&self, instrument: InstrumentType, field: &str) -> bool {
        self.by_type
            .get(&instrument)
            .is_some_and(|fields| fields.names.contains(field))
    }

    /// Enumerated values for a categorical field, if the field has a closed set
    pub fn allowed_values(
        &self,
        instrument: InstrumentType,
        field: &str,
    ) -> Option<&FxHashSet<&'static str>> {
        self.by_type.get(&instrument)?.values.get(field)
    }

    /// All field names for an instrument type, sorted
    pub fn fields(&self, instrument: InstrumentType) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self
            .by_type
            .get(&instrument)
            .map(|fields| fields.names.iter().copied().collect())
            .unwrap_or_default();
        names.sort_unstable();
        names
    }
}
