//! `JsonData`: the payload carried in a job's `data` field.
//!
//! Wraps a decoded JSON tree, or nothing at all when the caller sent no
//! `data`. A value is never mutated once built: `merge` and the parse
//! constructors always hand back a fresh `JsonData`.
//!
//! An absent value serializes as `{}` so an envelope always carries a
//! well-formed `data` field, even when a bridge fails before producing
//! output.

use crate::error::{BridgeError, Result};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct JsonData(Option<Value>);

impl JsonData {
    /// Parse raw bytes. An empty input is read as `{}`.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Ok(Self(Some(Value::Object(Map::new()))));
        }
        serde_json::from_slice::<Value>(bytes)
            .map(|v| Self(Some(v)))
            .map_err(|e| BridgeError::Parse(e.to_string()))
    }

    /// Serialize any value to JSON text, then parse it back. Used to bring
    /// bridge output into the same shape as request payloads.
    pub fn from_serialize<T: Serialize + ?Sized>(obj: &T) -> Result<Self> {
        let bytes = serde_json::to_vec(obj)?;
        Self::parse(&bytes)
    }

    pub fn exists(&self) -> bool {
        self.0.is_some()
    }

    pub fn value(&self) -> Option<&Value> {
        self.0.as_ref()
    }

    /// True when absent, null or `{}`.
    pub fn is_empty(&self) -> bool {
        match &self.0 {
            None | Some(Value::Null) => true,
            Some(Value::Object(m)) => m.is_empty(),
            Some(_) => false,
        }
    }

    /// Look up a dotted path (`a.b.0`). Never fails; a missing path yields a
    /// field whose conversions return zero values.
    pub fn get(&self, path: &str) -> Field<'_> {
        Field(self.0.as_ref()).get(path)
    }

    /// Top-level key/value pairs. Empty unless the value is an object.
    pub fn map(&self) -> BTreeMap<String, Value> {
        match &self.0 {
            Some(Value::Object(m)) => m.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            _ => BTreeMap::new(),
        }
    }

    /// Combine `other` over `self`: keys of `self` form the base and keys of
    /// `other` win on conflict. Fails when `self` holds something other than
    /// an object or null. A non-object `other` contributes no keys.
    pub fn merge(&self, other: &JsonData) -> Result<JsonData> {
        let mut body = match &self.0 {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(m)) => m.clone(),
            Some(_) => return Err(BridgeError::Merge),
        };
        if let Some(Value::Object(m)) = &other.0 {
            for (k, v) in m {
                body.insert(k.clone(), v.clone());
            }
        }
        Ok(JsonData(Some(Value::Object(body))))
    }
}

impl From<Value> for JsonData {
    fn from(v: Value) -> Self {
        Self(Some(v))
    }
}

impl Serialize for JsonData {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match &self.0 {
            Some(v) => v.serialize(serializer),
            None => serializer.serialize_map(Some(0))?.end(),
        }
    }
}

/// A decoded `null` is stored as absent, so it goes back out as `{}`.
impl<'de> Deserialize<'de> for JsonData {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Value::deserialize(deserializer).map(|v| match v {
            Value::Null => Self(None),
            v => Self(Some(v)),
        })
    }
}

impl fmt::Display for JsonData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(v) => write!(f, "{v}"),
            None => f.write_str("{}"),
        }
    }
}

/// A typed view over one location in a `JsonData` tree.
#[derive(Debug, Clone, Copy)]
pub struct Field<'a>(Option<&'a Value>);

impl<'a> Field<'a> {
    pub fn get(self, path: &str) -> Field<'a> {
        if path.is_empty() {
            return Field(None);
        }
        let mut cur = self.0;
        for seg in path.split('.') {
            cur = match cur {
                Some(Value::Object(m)) => m.get(seg),
                Some(Value::Array(a)) => seg.parse::<usize>().ok().and_then(|i| a.get(i)),
                _ => None,
            };
        }
        Field(cur)
    }

    pub fn exists(&self) -> bool {
        self.0.is_some()
    }

    pub fn raw(&self) -> Option<&'a Value> {
        self.0
    }

    /// String form: strings unquoted, scalars as JSON text, containers as
    /// raw JSON, null/missing as `""`.
    pub fn string(&self) -> String {
        match self.0 {
            None | Some(Value::Null) => String::new(),
            Some(v) => param_string(v),
        }
    }

    pub fn int(&self) -> i64 {
        match self.0 {
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .unwrap_or(0),
            Some(Value::String(s)) => s
                .trim()
                .parse::<i64>()
                .ok()
                .or_else(|| s.trim().parse::<f64>().ok().map(|f| f as i64))
                .unwrap_or(0),
            Some(Value::Bool(true)) => 1,
            _ => 0,
        }
    }

    pub fn float(&self) -> f64 {
        match self.0 {
            Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
            Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
            Some(Value::Bool(true)) => 1.0,
            _ => 0.0,
        }
    }

    pub fn array(&self) -> Vec<Field<'a>> {
        match self.0 {
            Some(Value::Array(a)) => a.iter().map(|v| Field(Some(v))).collect(),
            _ => Vec::new(),
        }
    }
}

/// Render a JSON value the way it is sent as a query parameter.
pub fn param_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
