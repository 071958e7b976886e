//! Generic, language-neutral output values.
use std::collections::BTreeMap;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use ordered_float::OrderedFloat;

/// Output of a conversion. Totally ordered so that any value can key a map.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GenericValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(OrderedFloat<f64>),
    Text(String),
    Bytes(Vec<u8>),
    List(Vec<GenericValue>),
    Map(BTreeMap<GenericValue, GenericValue>),
}

impl GenericValue {
    pub fn float(f: f64) -> Self {
        GenericValue::Float(OrderedFloat(f))
    }

    pub fn text(s: impl Into<String>) -> Self {
        GenericValue::Text(s.into())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            GenericValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<GenericValue, GenericValue>> {
        match self {
            GenericValue::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Looks up a text key; handy for maps produced from structs.
    pub fn get(&self, key: &str) -> Option<&GenericValue> {
        self.as_map()?.get(&GenericValue::text(key))
    }

    /// JSON rendering: bytes become base64 strings, non-text map keys are
    /// rendered as their own JSON text.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;
        match self {
            GenericValue::Null => Value::Null,
            GenericValue::Boolean(b) => Value::Bool(*b),
            GenericValue::Integer(i) => Value::from(*i),
            // NaN and infinities have no JSON number form
            GenericValue::Float(f) => serde_json::Number::from_f64(f.0).map(Value::Number).unwrap_or(Value::Null),
            GenericValue::Text(s) => Value::String(s.clone()),
            GenericValue::Bytes(b) => Value::String(BASE64.encode(b)),
            GenericValue::List(xs) => Value::Array(xs.iter().map(GenericValue::to_json).collect()),
            GenericValue::Map(m) => {
                let mut out = serde_json::Map::with_capacity(m.len());
                for (k, v) in m {
                    let key = match k {
                        GenericValue::Text(s) => s.clone(),
                        other => other.to_json().to_string(),
                    };
                    out.insert(key, v.to_json());
                }
                Value::Object(out)
            }
        }
    }
}

impl From<bool> for GenericValue {
    fn from(b: bool) -> Self {
        GenericValue::Boolean(b)
    }
}

impl From<i64> for GenericValue {
    fn from(i: i64) -> Self {
        GenericValue::Integer(i)
    }
}

impl From<f64> for GenericValue {
    fn from(f: f64) -> Self {
        GenericValue::float(f)
    }
}

impl From<&str> for GenericValue {
    fn from(s: &str) -> Self {
        GenericValue::text(s)
    }
}

impl From<String> for GenericValue {
    fn from(s: String) -> Self {
        GenericValue::Text(s)
    }
}
