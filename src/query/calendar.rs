use super::{eq, or, QueryExpr};
use crate::model::DynamicValue;

/// OR of symbol equalities used by the calendar endpoints
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarQuery {
    field: String,
    symbols: Vec<String>,
}

impl Default for CalendarQuery {
    fn default() -> Self {
        Self::new()
    }
}

impl CalendarQuery {
    pub fn new() -> Self {
        Self::for_field("ticker")
    }

    pub fn for_field(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            symbols: Vec::new(),
        }
    }

    /// Add a symbol; returns false when it was already present
    pub fn append(&mut self, symbol: impl Into<String>) -> bool {
        let symbol = symbol.into();
        if self.symbols.contains(&symbol) {
            return false;
        }
        self.symbols.push(symbol);
        true
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn to_expr(&self) -> QueryExpr {
        or(self
            .symbols
            .iter()
            .map(|s| eq(self.field.as_str(), s.as_str()))
            .collect())
    }

    /// Always an OR node, even for zero or one symbol
    pub fn to_canonical_value(&self) -> DynamicValue {
        self.to_expr().to_canonical_value()
    }
}

impl<S: Into<String>> FromIterator<S> for CalendarQuery {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut query = CalendarQuery::new();
        for symbol in iter {
            query.append(symbol);
        }
        query
    }
}
