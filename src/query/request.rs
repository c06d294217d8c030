use std::fmt;
use std::str::FromStr;

use super::{InstrumentType, QueryExpr};
use crate::error::QueryError;
use crate::model::{DynamicValue, Object};

/// Upper bound the screener accepts for `count` and `size`
pub const MAX_COUNT: usize = 250;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortType {
    Asc,
    #[default]
    Desc,
}

impl SortType {
    pub fn as_str(self) -> &'static str {
        match self {
            SortType::Asc => "ASC",
            SortType::Desc => "DESC",
        }
    }
}

impl fmt::Display for SortType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortType::Asc),
            "desc" | "descending" => Ok(SortType::Desc),
            _ => Err(format!("Unknown sort type: {}", s)),
        }
    }
}

/// Outbound screener request body
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenerRequest {
    pub offset: usize,
    pub count: usize,
    pub size: Option<usize>,
    pub sort_field: String,
    pub sort_type: SortType,
    pub user_id: String,
    pub user_id_type: String,
    pub quote_type: Option<InstrumentType>,
    pub query: QueryExpr,
}

impl ScreenerRequest {
    pub fn new(query: QueryExpr) -> Self {
        Self {
            offset: 0,
            count: 25,
            size: None,
            sort_field: "ticker".to_string(),
            sort_type: SortType::Desc,
            user_id: String::new(),
            user_id_type: "guid".to_string(),
            quote_type: None,
            query,
        }
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    pub fn with_size(mut self, size: usize) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_sort(mut self, field: impl Into<String>, sort_type: SortType) -> Self {
        self.sort_field = field.into();
        self.sort_type = sort_type;
        self
    }

    pub fn with_quote_type(mut self, quote_type: InstrumentType) -> Self {
        self.quote_type = Some(quote_type);
        self
    }

    /// Check limits, then the query against `quote_type` when one is set
    pub fn validate(&self) -> Result<(), QueryError> {
        check_limit("count", self.count)?;
        if let Some(size) = self.size {
            check_limit("size", size)?;
        }
        match self.quote_type {
            Some(instrument) => self.query.validate(instrument),
            None => Ok(()),
        }
    }

    pub fn to_canonical_value(&self) -> DynamicValue {
        let mut body = Object::new();
        body.insert("offset".into(), (self.offset as i64).into());
        body.insert("count".into(), (self.count as i64).into());
        if let Some(size) = self.size {
            body.insert("size".into(), (size as i64).into());
        }
        body.insert("sortField".into(), self.sort_field.as_str().into());
        body.insert("sortType".into(), self.sort_type.as_str().into());
        body.insert("userId".into(), self.user_id.as_str().into());
        body.insert("userIdType".into(), self.user_id_type.as_str().into());
        if let Some(quote_type) = self.quote_type {
            body.insert("quoteType".into(), quote_type.as_str().into());
        }
        body.insert("query".into(), self.query.to_canonical_value());
        DynamicValue::Object(body)
    }
}

fn check_limit(name: &'static str, value: usize) -> Result<(), QueryError> {
    if value > MAX_COUNT {
        return Err(QueryError::LimitExceeded {
            name,
            value,
            limit: MAX_COUNT,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{eq, gt};

    #[test]
    fn test_default_body() {
        let body = ScreenerRequest::new(eq("region", "us")).to_canonical_value();
        assert_eq!(
            body.encode(),
            r#"{"offset":0,"count":25,"sortField":"ticker","sortType":"DESC","userId":"","userIdType":"guid","query":{"operator":"EQ","operands":["region","us"]}}"#
        );
    }

    #[test]
    fn test_optional_keys() {
        let body = ScreenerRequest::new(eq("region", "us"))
            .with_size(50)
            .with_sort("intradaymarketcap", SortType::Asc)
            .with_quote_type(InstrumentType::Equity)
            .to_canonical_value();
        assert_eq!(body.get("size").and_then(DynamicValue::as_i64), Some(50));
        assert_eq!(body.get("sortType").and_then(DynamicValue::as_str), Some("ASC"));
        assert_eq!(body.get("quoteType").and_then(DynamicValue::as_str), Some("EQUITY"));
    }

    #[test]
    fn test_validate_limits_and_query() {
        let request = ScreenerRequest::new(gt("bogus", 1)).with_count(300);
        assert!(matches!(
            request.validate(),
            Err(QueryError::LimitExceeded { name: "count", .. })
        ));

        // no quote type, no schema check
        let request = ScreenerRequest::new(gt("bogus", 1));
        assert!(request.validate().is_ok());
        assert!(matches!(
            request.with_quote_type(InstrumentType::Equity).validate(),
            Err(QueryError::UnknownField { .. })
        ));
    }
}
