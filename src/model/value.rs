//! Self-describing dynamic value decoded from provider payloads

use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;

use indexmap::IndexMap;
use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

use crate::error::DecodeError;

use super::table::Table;

/// Object payload, keys kept in insertion order
pub type Object = IndexMap<String, DynamicValue>;

/// A structured-text value of any kind
///
/// Every projection out of a `DynamicValue` is an explicit accessor returning
/// `Option`; a shape mismatch yields `None` rather than an error because the
/// provider reshapes the same field differently across endpoints.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum DynamicValue {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<DynamicValue>),
    Object(Object),
}

/// Shared null returned by reference for absent cells and missed lookups
pub(crate) static NULL: DynamicValue = DynamicValue::Null;

impl DynamicValue {
    /// Decode a structured-text buffer
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Encode as compact structured text
    pub fn encode(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "null".to_string())
    }

    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, DynamicValue::Null)
    }

    /// Structural emptiness: null, "", [] and {} are empty
    pub fn is_empty(&self) -> bool {
        match self {
            DynamicValue::Null => true,
            DynamicValue::String(s) => s.is_empty(),
            DynamicValue::Array(items) => items.is_empty(),
            DynamicValue::Object(map) => map.is_empty(),
            DynamicValue::Bool(_) | DynamicValue::Number(_) => false,
        }
    }

    /// Object member lookup
    pub fn get(&self, key: &str) -> Option<&DynamicValue> {
        self.as_object()?.get(key)
    }

    /// Array element lookup
    pub fn get_index(&self, index: usize) -> Option<&DynamicValue> {
        self.as_array()?.get(index)
    }

    /// Walk nested objects and arrays; array steps use numeric-string keys
    pub fn value_at<S: AsRef<str>>(&self, path: &[S]) -> Option<&DynamicValue> {
        let mut current = self;
        for key in path {
            let key = key.as_ref();
            current = match current {
                DynamicValue::Object(map) => map.get(key)?,
                DynamicValue::Array(items) => items.get(key.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Dotted-path shorthand for [`value_at`](Self::value_at), e.g. `"chart.result.0.meta"`
    pub fn lookup(&self, dotted: &str) -> Option<&DynamicValue> {
        if dotted.is_empty() {
            return Some(self);
        }
        let path: Vec<&str> = dotted.split('.').collect();
        self.value_at(&path)
    }

    /// Numeric projection
    ///
    /// Accepts numbers, numeric strings, and `{"raw": .., "fmt": ..}` wrappers
    /// (tried in that order).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DynamicValue::Number(n) => Some(*n),
            DynamicValue::String(s) => parse_numeric(s),
            DynamicValue::Object(map) => map
                .get("raw")
                .and_then(DynamicValue::as_f64)
                .or_else(|| map.get("fmt").and_then(DynamicValue::as_f64)),
            _ => None,
        }
    }

    /// Integer projection, truncating toward zero
    pub fn as_i64(&self) -> Option<i64> {
        let n = self.as_f64()?;
        if !n.is_finite() || n < i64::MIN as f64 || n >= i64::MAX as f64 {
            return None;
        }
        Some(n.trunc() as i64)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            DynamicValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            DynamicValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[DynamicValue]> {
        match self {
            DynamicValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            DynamicValue::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Replace a `{"raw": ..}` wrapper with its raw member, leaving other values as they are
    pub fn unwrap_raw(&self) -> &DynamicValue {
        self.get("raw").unwrap_or(self)
    }

    /// Project into a table
    ///
    /// Arrays yield one row per object element (non-objects skipped) with the
    /// union of their keys as columns; an object yields a single row; any
    /// scalar yields a one-cell `value` table.
    pub fn to_table(&self) -> Table {
        match self {
            DynamicValue::Array(items) => Table::from_objects(items),
            DynamicValue::Object(map) => Table::new(map.keys().cloned(), vec![map.clone()]),
            other => {
                let mut row = Object::new();
                row.insert("value".to_string(), other.clone());
                Table::new(["value"], vec![row])
            }
        }
    }

    fn kind_rank(&self) -> u8 {
        match self {
            DynamicValue::Null => 0,
            DynamicValue::Bool(_) => 1,
            DynamicValue::Number(_) => 2,
            DynamicValue::String(_) => 3,
            DynamicValue::Array(_) => 4,
            DynamicValue::Object(_) => 5,
        }
    }

    /// Total order across kinds: null < bool < number < string < array < object
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (DynamicValue::Bool(a), DynamicValue::Bool(b)) => a.cmp(b),
            (DynamicValue::Number(a), DynamicValue::Number(b)) => a.total_cmp(b),
            (DynamicValue::String(a), DynamicValue::String(b)) => a.cmp(b),
            (DynamicValue::Array(a), DynamicValue::Array(b)) => {
                for (x, y) in a.iter().zip(b) {
                    let ord = x.total_cmp(y);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.len().cmp(&b.len())
            }
            (DynamicValue::Object(a), DynamicValue::Object(b)) => {
                for ((ka, va), (kb, vb)) in a.iter().zip(b) {
                    let ord = ka.cmp(kb).then_with(|| va.total_cmp(vb));
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.len().cmp(&b.len())
            }
            _ => self.kind_rank().cmp(&other.kind_rank()),
        }
    }

    /// String rendering used as an index key; null has none
    pub fn render_key(&self) -> Option<String> {
        match self {
            DynamicValue::Null => None,
            DynamicValue::String(s) => Some(s.clone()),
            other => Some(other.display().into_owned()),
        }
    }

    /// Convert to a display string
    pub fn display(&self) -> Cow<'_, str> {
        match self {
            DynamicValue::Null => Cow::Borrowed("null"),
            DynamicValue::Bool(b) => Cow::Owned(b.to_string()),
            DynamicValue::Number(n) => Cow::Owned(n.to_string()),
            DynamicValue::String(s) => Cow::Borrowed(s.as_str()),
            DynamicValue::Array(_) | DynamicValue::Object(_) => Cow::Owned(self.encode()),
        }
    }
}

/// Parse a numeric string, tolerating surrounding whitespace and thousands separators
fn parse_numeric(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(n) = trimmed.parse::<f64>() {
        return Some(n);
    }
    if trimmed.contains(',') {
        return trimmed.replace(',', "").parse::<f64>().ok();
    }
    None
}

impl fmt::Display for DynamicValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display())
    }
}

impl From<&str> for DynamicValue {
    fn from(s: &str) -> Self {
        DynamicValue::String(s.to_string())
    }
}

impl From<String> for DynamicValue {
    fn from(s: String) -> Self {
        DynamicValue::String(s)
    }
}

impl From<f64> for DynamicValue {
    fn from(n: f64) -> Self {
        DynamicValue::Number(n)
    }
}

impl From<f32> for DynamicValue {
    fn from(n: f32) -> Self {
        DynamicValue::Number(f64::from(n))
    }
}

impl From<i64> for DynamicValue {
    fn from(n: i64) -> Self {
        DynamicValue::Number(n as f64)
    }
}

impl From<i32> for DynamicValue {
    fn from(n: i32) -> Self {
        DynamicValue::Number(f64::from(n))
    }
}

impl From<bool> for DynamicValue {
    fn from(b: bool) -> Self {
        DynamicValue::Bool(b)
    }
}

impl From<Vec<DynamicValue>> for DynamicValue {
    fn from(items: Vec<DynamicValue>) -> Self {
        DynamicValue::Array(items)
    }
}

impl From<Object> for DynamicValue {
    fn from(map: Object) -> Self {
        DynamicValue::Object(map)
    }
}

impl<T> From<Option<T>> for DynamicValue
where
    T: Into<DynamicValue>,
{
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => v.into(),
            None => DynamicValue::Null,
        }
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = DynamicValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("any structured-text value")
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(DynamicValue::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(DynamicValue::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        Deserialize::deserialize(deserializer)
    }

    fn visit_bool<E: de::Error>(self, b: bool) -> Result<Self::Value, E> {
        Ok(DynamicValue::Bool(b))
    }

    fn visit_i64<E: de::Error>(self, n: i64) -> Result<Self::Value, E> {
        Ok(DynamicValue::Number(n as f64))
    }

    fn visit_u64<E: de::Error>(self, n: u64) -> Result<Self::Value, E> {
        Ok(DynamicValue::Number(n as f64))
    }

    fn visit_f64<E: de::Error>(self, n: f64) -> Result<Self::Value, E> {
        Ok(DynamicValue::Number(n))
    }

    fn visit_str<E: de::Error>(self, s: &str) -> Result<Self::Value, E> {
        Ok(DynamicValue::String(s.to_string()))
    }

    fn visit_string<E: de::Error>(self, s: String) -> Result<Self::Value, E> {
        Ok(DynamicValue::String(s))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(DynamicValue::Array(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut map = Object::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((key, value)) = access.next_entry::<String, DynamicValue>()? {
            map.insert(key, value);
        }
        Ok(DynamicValue::Object(map))
    }
}

impl<'de> Deserialize<'de> for DynamicValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

impl Serialize for DynamicValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            DynamicValue::Null => serializer.serialize_unit(),
            DynamicValue::Bool(b) => serializer.serialize_bool(*b),
            // Integral values go out without a fractional part
            DynamicValue::Number(n) if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 => {
                serializer.serialize_i64(*n as i64)
            }
            DynamicValue::Number(n) => serializer.serialize_f64(*n),
            DynamicValue::String(s) => serializer.serialize_str(s),
            DynamicValue::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            DynamicValue::Object(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (key, value) in map {
                    out.serialize_entry(key, value)?;
                }
                out.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(text: &str) -> DynamicValue {
        DynamicValue::decode(text.as_bytes()).unwrap()
    }

    #[test]
    fn test_decode_preserves_key_order() {
        let value = decode(r#"{"zeta": 1, "alpha": 2, "mid": 3}"#);
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_decode_malformed() {
        assert!(DynamicValue::decode(b"{\"open\": ").is_err());
        assert!(DynamicValue::decode(b"not json").is_err());
    }

    #[test]
    fn test_value_at_walks_arrays_and_objects() {
        let value = decode(r#"{"chart": {"result": [{"meta": {"currency": "USD"}}]}}"#);
        assert_eq!(
            value
                .value_at(&["chart", "result", "0", "meta", "currency"])
                .and_then(DynamicValue::as_str),
            Some("USD")
        );
        assert!(value.value_at(&["chart", "result", "1"]).is_none());
        assert!(value.value_at(&["chart", "result", "x"]).is_none());
        assert!(value
            .value_at(&["chart", "result", "0", "meta", "currency", "deeper"])
            .is_none());
        assert_eq!(
            value.lookup("chart.result.0.meta.currency"),
            value.value_at(&["chart", "result", "0", "meta", "currency"])
        );
    }

    #[test]
    fn test_numeric_unwrap_rules() {
        assert_eq!(decode("12.5").as_f64(), Some(12.5));
        assert_eq!(decode(r#"" 42 ""#).as_f64(), Some(42.0));
        assert_eq!(decode(r#""1,234.5""#).as_f64(), Some(1234.5));
        assert_eq!(decode(r#"{"raw": 0.0052, "fmt": "0.52%"}"#).as_f64(), Some(0.0052));
        assert_eq!(decode(r#"{"fmt": "17.3"}"#).as_f64(), Some(17.3));
        assert_eq!(decode(r#"{"raw": {"raw": 3}}"#).as_f64(), Some(3.0));
        assert_eq!(decode(r#"{"fmt": "n/a"}"#).as_f64(), None);
        assert_eq!(decode("true").as_f64(), None);
        assert_eq!(decode("[1]").as_f64(), None);
    }

    #[test]
    fn test_as_i64_truncates() {
        assert_eq!(decode("1700000000").as_i64(), Some(1_700_000_000));
        assert_eq!(decode("-2.9").as_i64(), Some(-2));
        assert_eq!(decode(r#"{"raw": 7.8}"#).as_i64(), Some(7));
        assert_eq!(DynamicValue::Number(f64::NAN).as_i64(), None);
    }

    #[test]
    fn test_typed_accessors_mismatch() {
        let value = decode(r#"{"a": "x"}"#);
        assert!(value.as_array().is_none());
        assert!(value.as_str().is_none());
        assert!(value.as_bool().is_none());
        assert_eq!(value.get("a").and_then(DynamicValue::as_bool), None);
    }

    #[test]
    fn test_total_order_across_kinds() {
        let ordered = [
            DynamicValue::Null,
            DynamicValue::Bool(false),
            DynamicValue::Bool(true),
            DynamicValue::Number(-1.0),
            DynamicValue::Number(3.0),
            DynamicValue::from("a"),
            DynamicValue::from("b"),
            DynamicValue::Array(vec![]),
            DynamicValue::Object(Object::new()),
        ];
        for pair in ordered.windows(2) {
            assert_eq!(pair[0].total_cmp(&pair[1]), Ordering::Less, "{:?}", pair);
        }
    }

    #[test]
    fn test_emptiness_is_structural() {
        assert!(decode("null").is_empty());
        assert!(decode(r#""""#).is_empty());
        assert!(decode("[]").is_empty());
        assert!(decode("{}").is_empty());
        assert!(!decode("0").is_empty());
        assert!(!decode("false").is_empty());
    }

    #[test]
    fn test_encode_integral_numbers() {
        let value = decode(r#"{"count": 25, "ratio": 0.5, "tags": [true, null]}"#);
        assert_eq!(value.encode(), r#"{"count":25,"ratio":0.5,"tags":[true,null]}"#);
    }

    #[test]
    fn test_render_key() {
        assert_eq!(
            DynamicValue::Number(1_700_000_000.0).render_key().as_deref(),
            Some("1700000000")
        );
        assert_eq!(DynamicValue::Number(1.5).render_key().as_deref(), Some("1.5"));
        assert_eq!(DynamicValue::Bool(true).render_key().as_deref(), Some("true"));
        assert_eq!(DynamicValue::Null.render_key(), None);
    }
}
