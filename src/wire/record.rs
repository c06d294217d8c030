//! Decoded streaming quote record and its derived codes

use std::fmt;

use crate::model::{DynamicValue, Row, Table};

/// Instrument classification carried by a streaming update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuoteType {
    None,
    AltSymbol,
    Heartbeat,
    Equity,
    Index,
    MutualFund,
    MoneyMarket,
    Option,
    Currency,
    Warrant,
    Bond,
    Future,
    Etf,
    Commodity,
    EcnQuote,
    Cryptocurrency,
    Indicator,
    CulIdx,
    CulSubIdx,
    CulAsset,
    PrivateCompany,
    Industry,
    Unknown(i32),
}

impl QuoteType {
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => QuoteType::None,
            5 => QuoteType::AltSymbol,
            7 => QuoteType::Heartbeat,
            8 => QuoteType::Equity,
            9 => QuoteType::Index,
            11 => QuoteType::MutualFund,
            12 => QuoteType::MoneyMarket,
            13 => QuoteType::Option,
            14 => QuoteType::Currency,
            15 => QuoteType::Warrant,
            17 => QuoteType::Bond,
            18 => QuoteType::Future,
            20 => QuoteType::Etf,
            23 => QuoteType::Commodity,
            28 => QuoteType::EcnQuote,
            41 => QuoteType::Cryptocurrency,
            42 => QuoteType::Indicator,
            43 => QuoteType::CulIdx,
            44 => QuoteType::CulSubIdx,
            45 => QuoteType::CulAsset,
            46 => QuoteType::PrivateCompany,
            1000 => QuoteType::Industry,
            other => QuoteType::Unknown(other),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            QuoteType::None => 0,
            QuoteType::AltSymbol => 5,
            QuoteType::Heartbeat => 7,
            QuoteType::Equity => 8,
            QuoteType::Index => 9,
            QuoteType::MutualFund => 11,
            QuoteType::MoneyMarket => 12,
            QuoteType::Option => 13,
            QuoteType::Currency => 14,
            QuoteType::Warrant => 15,
            QuoteType::Bond => 17,
            QuoteType::Future => 18,
            QuoteType::Etf => 20,
            QuoteType::Commodity => 23,
            QuoteType::EcnQuote => 28,
            QuoteType::Cryptocurrency => 41,
            QuoteType::Indicator => 42,
            QuoteType::CulIdx => 43,
            QuoteType::CulSubIdx => 44,
            QuoteType::CulAsset => 45,
            QuoteType::PrivateCompany => 46,
            QuoteType::Industry => 1000,
            QuoteType::Unknown(code) => code,
        }
    }
}

impl fmt::Display for QuoteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QuoteType::None => "none",
            QuoteType::AltSymbol => "altSymbol",
            QuoteType::Heartbeat => "heartbeat",
            QuoteType::Equity => "equity",
            QuoteType::Index => "index",
            QuoteType::MutualFund => "mutualFund",
            QuoteType::MoneyMarket => "moneyMarket",
            QuoteType::Option => "option",
            QuoteType::Currency => "currency",
            QuoteType::Warrant => "warrant",
            QuoteType::Bond => "bond",
            QuoteType::Future => "future",
            QuoteType::Etf => "etf",
            QuoteType::Commodity => "commodity",
            QuoteType::EcnQuote => "ecnQuote",
            QuoteType::Cryptocurrency => "cryptocurrency",
            QuoteType::Indicator => "indicator",
            QuoteType::CulIdx => "culIdx",
            QuoteType::CulSubIdx => "culSubIdx",
            QuoteType::CulAsset => "culAsset",
            QuoteType::PrivateCompany => "privateCompany",
            QuoteType::Industry => "industry",
            QuoteType::Unknown(code) => return write!(f, "unknown({})", code),
        };
        f.write_str(name)
    }
}

/// Trading session a streaming update belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarketHours {
    PreMarket,
    RegularMarket,
    PostMarket,
    ExtendedHoursMarket,
    OvernightMarket,
    Unknown(i32),
}

impl MarketHours {
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => MarketHours::PreMarket,
            1 => MarketHours::RegularMarket,
            2 => MarketHours::PostMarket,
            3 => MarketHours::ExtendedHoursMarket,
            4 => MarketHours::OvernightMarket,
            other => MarketHours::Unknown(other),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            MarketHours::PreMarket => 0,
            MarketHours::RegularMarket => 1,
            MarketHours::PostMarket => 2,
            MarketHours::ExtendedHoursMarket => 3,
            MarketHours::OvernightMarket => 4,
            MarketHours::Unknown(code) => code,
        }
    }
}

impl fmt::Display for MarketHours {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarketHours::PreMarket => f.write_str("preMarket"),
            MarketHours::RegularMarket => f.write_str("regularMarket"),
            MarketHours::PostMarket => f.write_str("postMarket"),
            MarketHours::ExtendedHoursMarket => f.write_str("extendedHoursMarket"),
            MarketHours::OvernightMarket => f.write_str("overnightMarket"),
            MarketHours::Unknown(code) => write!(f, "unknown({})", code),
        }
    }
}

/// One decoded real-time quote update; every field is optional
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamingRecord {
    pub id: Option<String>,
    pub price: Option<f32>,
    /// Epoch time of the update as signed seconds
    pub time: Option<i64>,
    pub currency: Option<String>,
    pub exchange: Option<String>,
    /// Raw quote-type code, see [`StreamingRecord::quote_type_value`]
    pub quote_type: Option<i32>,
    /// Raw market-hours code, see [`StreamingRecord::market_hours_value`]
    pub market_hours: Option<i32>,
    pub change_percent: Option<f32>,
    pub day_volume: Option<i64>,
    pub day_high: Option<f32>,
    pub day_low: Option<f32>,
    pub change: Option<f32>,
    pub short_name: Option<String>,
    pub expire_date: Option<i64>,
    pub open_price: Option<f32>,
    pub previous_close: Option<f32>,
    pub strike_price: Option<f32>,
    pub underlying_symbol: Option<String>,
    pub open_interest: Option<i64>,
    pub options_type: Option<i64>,
    pub mini_option: Option<i64>,
    pub last_size: Option<i64>,
    pub bid: Option<f32>,
    pub bid_size: Option<i64>,
    pub ask: Option<f32>,
    pub ask_size: Option<i64>,
    pub price_hint: Option<i64>,
    pub vol_24hr: Option<i64>,
    pub vol_all_currencies: Option<i64>,
    pub from_currency: Option<String>,
    pub last_market: Option<String>,
    pub circulating_supply: Option<f64>,
    pub market_cap: Option<f64>,
}

impl StreamingRecord {
    /// Ticker symbol of the update
    pub fn symbol(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn quote_type_value(&self) -> Option<QuoteType> {
        self.quote_type.map(QuoteType::from_code)
    }

    pub fn market_hours_value(&self) -> Option<MarketHours> {
        self.market_hours.map(MarketHours::from_code)
    }

    /// True when no field was recognized in the buffer
    pub fn is_empty(&self) -> bool {
        *self == StreamingRecord::default()
    }

    /// Populated fields keyed by their upstream names, with derived code names appended
    pub fn to_row(&self) -> Row {
        let mut row = Row::new();
        let mut put = |name: &str, value: DynamicValue| {
            if !value.is_null() {
                row.insert(name.to_string(), value);
            }
        };

        put("id", self.id.clone().into());
        put("price", self.price.into());
        put("time", self.time.into());
        put("currency", self.currency.clone().into());
        put("exchange", self.exchange.clone().into());
        put("quoteType", self.quote_type.into());
        put("marketHours", self.market_hours.into());
        put("changePercent", self.change_percent.into());
        put("dayVolume", self.day_volume.into());
        put("dayHigh", self.day_high.into());
        put("dayLow", self.day_low.into());
        put("change", self.change.into());
        put("shortName", self.short_name.clone().into());
        put("expireDate", self.expire_date.into());
        put("openPrice", self.open_price.into());
        put("previousClose", self.previous_close.into());
        put("strikePrice", self.strike_price.into());
        put("underlyingSymbol", self.underlying_symbol.clone().into());
        put("openInterest", self.open_interest.into());
        put("optionsType", self.options_type.into());
        put("miniOption", self.mini_option.into());
        put("lastSize", self.last_size.into());
        put("bid", self.bid.into());
        put("bidSize", self.bid_size.into());
        put("ask", self.ask.into());
        put("askSize", self.ask_size.into());
        put("priceHint", self.price_hint.into());
        put("vol_24hr", self.vol_24hr.into());
        put("volAllCurrencies", self.vol_all_currencies.into());
        put("fromcurrency", self.from_currency.clone().into());
        put("lastMarket", self.last_market.clone().into());
        put("circulatingSupply", self.circulating_supply.into());
        put("marketcap", self.market_cap.into());
        put(
            "quoteTypeName",
            self.quote_type_value().map(|q| q.to_string()).into(),
        );
        put(
            "marketHoursName",
            self.market_hours_value().map(|m| m.to_string()).into(),
        );

        row
    }

    /// One-row table of [`StreamingRecord::to_row`]
    pub fn to_table(&self) -> Table {
        let row = self.to_row();
        let columns: Vec<String> = row.keys().cloned().collect();
        Table::new(columns, vec![row])
    }
}
