//! Screener query expressions
//!
//! A query is a tree of comparisons joined by AND/OR. Its canonical form is the
//! exact fragment placed in outbound request bodies, so key names and operator
//! casing must stay as rendered here:
//!
//! ```text
//! {"operator": "AND", "operands": [
//!     {"operator": "EQ", "operands": ["region", "us"]},
//!     {"operator": "GT", "operands": ["intradaymarketcap", 2000000000]}
//! ]}
//! ```

mod calendar;
mod request;
mod schema;

pub use calendar::CalendarQuery;
pub use request::{ScreenerRequest, SortType, MAX_COUNT};
pub use schema::{FieldSchema, InstrumentType};

use std::fmt;
use std::str::FromStr;

use tracing::trace;

use crate::error::QueryError;
use crate::model::{DynamicValue, Object};

/// Scalar operand of a comparison
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    Number(f64),
    Bool(bool),
}

impl Literal {
    pub fn is_number(&self) -> bool {
        matches!(self, Literal::Number(_))
    }

    fn to_value(&self) -> DynamicValue {
        match self {
            Literal::String(s) => DynamicValue::String(s.clone()),
            Literal::Number(n) => DynamicValue::Number(*n),
            Literal::Bool(b) => DynamicValue::Bool(*b),
        }
    }

    fn from_value(value: &DynamicValue) -> Option<Self> {
        match value {
            DynamicValue::String(s) => Some(Literal::String(s.clone())),
            DynamicValue::Number(n) => Some(Literal::Number(*n)),
            DynamicValue::Bool(b) => Some(Literal::Bool(*b)),
            _ => None,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::String(s) => f.write_str(s),
            other => write!(f, "{}", other.to_value()),
        }
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::String(value.to_string())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Literal::String(value)
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Literal::Number(value)
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Literal::Number(value as f64)
    }
}

impl From<i32> for Literal {
    fn from(value: i32) -> Self {
        Literal::Number(f64::from(value))
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Literal::Bool(value)
    }
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparison {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
    /// Inclusive range, two numeric bounds
    Btwn,
    /// Membership; rendered as an OR of EQ
    IsIn,
}

impl Comparison {
    pub fn as_str(self) -> &'static str {
        match self {
            Comparison::Eq => "EQ",
            Comparison::Gt => "GT",
            Comparison::Gte => "GTE",
            Comparison::Lt => "LT",
            Comparison::Lte => "LTE",
            Comparison::Btwn => "BTWN",
            Comparison::IsIn => "IS-IN",
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Boolean connectives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Connective {
    And,
    Or,
}

impl Connective {
    pub fn as_str(self) -> &'static str {
        match self {
            Connective::And => "AND",
            Connective::Or => "OR",
        }
    }
}

impl fmt::Display for Connective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Either kind of operator, as named in canonical form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Comparison(Comparison),
    Connective(Connective),
}

impl FromStr for Operator {
    type Err = QueryError;

    /// Case-insensitive; names are normalized to upper case
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let op = match s.trim().to_uppercase().as_str() {
            "AND" => Operator::Connective(Connective::And),
            "OR" => Operator::Connective(Connective::Or),
            "EQ" => Operator::Comparison(Comparison::Eq),
            "GT" => Operator::Comparison(Comparison::Gt),
            "GTE" => Operator::Comparison(Comparison::Gte),
            "LT" => Operator::Comparison(Comparison::Lt),
            "LTE" => Operator::Comparison(Comparison::Lte),
            "BTWN" => Operator::Comparison(Comparison::Btwn),
            "IS-IN" | "ISIN" => Operator::Comparison(Comparison::IsIn),
            _ => return Err(QueryError::UnknownOperator(s.to_string())),
        };
        Ok(op)
    }
}

/// Screener query tree
#[derive(Debug, Clone, PartialEq)]
pub enum QueryExpr {
    Comparison {
        field: String,
        operator: Comparison,
        values: Vec<Literal>,
    },
    Boolean {
        operator: Connective,
        operands: Vec<QueryExpr>,
    },
}

fn comparison(field: impl Into<String>, operator: Comparison, values: Vec<Literal>) -> QueryExpr {
    QueryExpr::Comparison {
        field: field.into().trim().to_string(),
        operator,
        values,
    }
}

pub fn and(operands: Vec<QueryExpr>) -> QueryExpr {
    QueryExpr::Boolean {
        operator: Connective::And,
        operands,
    }
}

pub fn or(operands: Vec<QueryExpr>) -> QueryExpr {
    QueryExpr::Boolean {
        operator: Connective::Or,
        operands,
    }
}

pub fn eq(field: impl Into<String>, value: impl Into<Literal>) -> QueryExpr {
    comparison(field, Comparison::Eq, vec![value.into()])
}

pub fn gt(field: impl Into<String>, value: impl Into<Literal>) -> QueryExpr {
    comparison(field, Comparison::Gt, vec![value.into()])
}

pub fn gte(field: impl Into<String>, value: impl Into<Literal>) -> QueryExpr {
    comparison(field, Comparison::Gte, vec![value.into()])
}

pub fn lt(field: impl Into<String>, value: impl Into<Literal>) -> QueryExpr {
    comparison(field, Comparison::Lt, vec![value.into()])
}

pub fn lte(field: impl Into<String>, value: impl Into<Literal>) -> QueryExpr {
    comparison(field, Comparison::Lte, vec![value.into()])
}

pub fn btwn(
    field: impl Into<String>,
    low: impl Into<Literal>,
    high: impl Into<Literal>,
) -> QueryExpr {
    comparison(field, Comparison::Btwn, vec![low.into(), high.into()])
}

pub fn is_in<I, L>(field: impl Into<String>, values: I) -> QueryExpr
where
    I: IntoIterator<Item = L>,
    L: Into<Literal>,
{
    comparison(
        field,
        Comparison::IsIn,
        values.into_iter().map(Into::into).collect(),
    )
}

fn node(operator: &str, operands: Vec<DynamicValue>) -> DynamicValue {
    let mut object = Object::new();
    object.insert("operator".to_string(), operator.into());
    object.insert("operands".to_string(), operands.into());
    DynamicValue::Object(object)
}

fn invalid(operator: impl fmt::Display, reason: impl Into<String>) -> QueryError {
    QueryError::InvalidOperands {
        operator: operator.to_string(),
        reason: reason.into(),
    }
}

impl QueryExpr {
    /// Canonical request-body fragment
    pub fn to_canonical_value(&self) -> DynamicValue {
        match self {
            QueryExpr::Boolean { operator, operands } => node(
                operator.as_str(),
                operands.iter().map(QueryExpr::to_canonical_value).collect(),
            ),
            QueryExpr::Comparison {
                field,
                operator: Comparison::IsIn,
                values,
            } => {
                let mut branches: Vec<DynamicValue> = values
                    .iter()
                    .map(|v| {
                        node(Comparison::Eq.as_str(), vec![field.as_str().into(), v.to_value()])
                    })
                    .collect();
                if branches.len() == 1 {
                    branches.remove(0)
                } else {
                    node(Connective::Or.as_str(), branches)
                }
            }
            QueryExpr::Comparison {
                field,
                operator,
                values,
            } => {
                let mut operands = Vec::with_capacity(values.len() + 1);
                operands.push(DynamicValue::from(field.as_str()));
                operands.extend(values.iter().map(Literal::to_value));
                node(operator.as_str(), operands)
            }
        }
    }

    /// Canonical form rendered as compact JSON text
    pub fn to_json(&self) -> String {
        self.to_canonical_value().encode()
    }

    /// Parse a canonical (or hand-written) query object back into a tree
    pub fn from_canonical(value: &DynamicValue) -> Result<Self, QueryError> {
        let operator_name = value
            .get("operator")
            .and_then(DynamicValue::as_str)
            .ok_or_else(|| invalid("query", "missing operator"))?;
        let operator: Operator = operator_name.parse()?;
        let operands = value
            .get("operands")
            .and_then(DynamicValue::as_array)
            .ok_or_else(|| invalid(operator_name, "missing operands"))?;

        match operator {
            Operator::Connective(connective) => Ok(QueryExpr::Boolean {
                operator: connective,
                operands: operands
                    .iter()
                    .map(QueryExpr::from_canonical)
                    .collect::<Result<_, _>>()?,
            }),
            Operator::Comparison(op) => {
                let (field, rest) = operands
                    .split_first()
                    .ok_or_else(|| invalid(op, "missing field"))?;
                let field = field
                    .as_str()
                    .ok_or_else(|| invalid(op, "field must be a string"))?;
                let values = rest
                    .iter()
                    .map(|v| {
                        Literal::from_value(v)
                            .ok_or_else(|| invalid(op, format!("unsupported operand {}", v)))
                    })
                    .collect::<Result<_, _>>()?;
                Ok(comparison(field, op, values))
            }
        }
    }

    /// Check every node against the field schema for `instrument`
    pub fn validate(&self, instrument: InstrumentType) -> Result<(), QueryError> {
        let schema = FieldSchema::global();
        self.validate_node(schema, instrument)?;
        trace!(instrument = %instrument, "query validated");
        Ok(())
    }

    fn validate_node(
        &self,
        schema: &FieldSchema,
        instrument: InstrumentType,
    ) -> Result<(), QueryError> {
        match self {
            QueryExpr::Boolean { operator, operands } => {
                if operands.len() < 2 {
                    return Err(invalid(
                        operator,
                        format!("requires at least 2 operands, got {}", operands.len()),
                    ));
                }
                operands
                    .iter()
                    .try_for_each(|child| child.validate_node(schema, instrument))
            }
            QueryExpr::Comparison {
                field,
                operator,
                values,
            } => {
                let field = field.trim();
                if field.is_empty() {
                    return Err(QueryError::EmptyField);
                }
                if !schema.contains(instrument, field) {
                    return Err(QueryError::UnknownField {
                        field: field.to_string(),
                        instrument: instrument.to_string(),
                    });
                }

                match operator {
                    Comparison::Eq if values.len() != 1 => {
                        Err(invalid(operator, "requires exactly 1 value"))
                    }
                    Comparison::Gt | Comparison::Gte | Comparison::Lt | Comparison::Lte
                        if values.len() != 1 || !values[0].is_number() =>
                    {
                        Err(invalid(operator, "requires a single numeric value"))
                    }
                    Comparison::Btwn
                        if values.len() != 2 || !values.iter().all(Literal::is_number) =>
                    {
                        Err(invalid(operator, "requires numeric lower and upper bounds"))
                    }
                    Comparison::IsIn if values.is_empty() => {
                        Err(invalid(operator, "requires at least 1 value"))
                    }
                    Comparison::Eq | Comparison::IsIn => {
                        check_enumerated(schema, instrument, field, values)
                    }
                    _ => Ok(()),
                }
            }
        }
    }
}

fn check_enumerated(
    schema: &FieldSchema,
    instrument: InstrumentType,
    field: &str,
    values: &[Literal],
) -> Result<(), QueryError> {
    let Some(allowed) = schema.allowed_values(instrument, field) else {
        return Ok(());
    };
    for value in values {
        let ok = matches!(value, Literal::String(s) if allowed.contains(s.as_str()));
        if !ok {
            return Err(QueryError::UnknownValue {
                field: field.to_string(),
                value: value.to_string(),
            });
        }
    }
    Ok(())
}

impl fmt::Display for QueryExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_json())
    }
}
