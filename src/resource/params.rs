//! Parameter values and bags
//!
//! The control plane exchanges asset parameters as a loosely typed JSON object.
//! [`ParamValue`] is the tagged form of one value and [`ParameterBag`] the
//! string-keyed object. Reads go through [`ParamAccess`], which is total: the
//! lenient accessors fall back to a default, the `require_*` accessors return a
//! [`DecodeError`] instead of panicking.

use crate::error::DecodeError;
use serde::{Deserialize, Serialize};
use serde_json::Number;
use std::collections::BTreeMap;

/// One parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    List(Vec<ParamValue>),
    Map(BTreeMap<String, ParamValue>),
}

impl ParamValue {
    /// Name of the variant, used in decode errors and logs
    pub fn type_name(&self) -> &'static str {
        match self {
            ParamValue::Null => "null",
            ParamValue::Bool(_) => "bool",
            ParamValue::Number(_) => "number",
            ParamValue::String(_) => "string",
            ParamValue::List(_) => "list",
            ParamValue::Map(_) => "map",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ParamValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    /// Integer view; whole-valued floats (`8080.0`) are accepted since the
    /// control plane does not preserve the distinction.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParamValue::Number(n) => n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                    .map(|f| f as i64)
            }),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ParamValue]> {
        match self {
            ParamValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// A list whose every element is a string.
    pub fn as_string_list(&self) -> Option<Vec<String>> {
        self.as_list()?
            .iter()
            .map(|item| item.as_str().map(str::to_string))
            .collect()
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, ParamValue>> {
        match self {
            ParamValue::Map(map) => Some(map),
            _ => None,
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::String(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::String(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Number(value.into())
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(values: Vec<String>) -> Self {
        ParamValue::List(values.into_iter().map(ParamValue::String).collect())
    }
}

impl From<BTreeMap<String, ParamValue>> for ParamValue {
    fn from(map: BTreeMap<String, ParamValue>) -> Self {
        ParamValue::Map(map)
    }
}

impl From<serde_json::Value> for ParamValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => ParamValue::Null,
            serde_json::Value::Bool(b) => ParamValue::Bool(b),
            serde_json::Value::Number(n) => ParamValue::Number(n),
            serde_json::Value::String(s) => ParamValue::String(s),
            serde_json::Value::Array(items) => {
                ParamValue::List(items.into_iter().map(ParamValue::from).collect())
            }
            serde_json::Value::Object(map) => ParamValue::Map(
                map.into_iter()
                    .map(|(k, v)| (k, ParamValue::from(v)))
                    .collect(),
            ),
        }
    }
}

/// Read access shared by anything that stores named parameter values.
pub trait ParamAccess {
    fn lookup(&self, key: &str) -> Option<&ParamValue>;

    /// String value, `""` when absent or not a string
    fn string(&self, key: &str) -> String {
        self.lookup(key)
            .and_then(ParamValue::as_str)
            .unwrap_or_default()
            .to_string()
    }

    /// Bool value, `false` when absent or not a bool
    fn bool(&self, key: &str) -> bool {
        self.lookup(key)
            .and_then(ParamValue::as_bool)
            .unwrap_or(false)
    }

    /// Number value, `0.0` when absent or not a number
    fn number(&self, key: &str) -> f64 {
        self.lookup(key).and_then(ParamValue::as_f64).unwrap_or(0.0)
    }

    /// Integer value, `0` when absent or not a whole number
    fn integer(&self, key: &str) -> i64 {
        self.lookup(key).and_then(ParamValue::as_i64).unwrap_or(0)
    }

    /// List of strings, empty when absent or not a list of strings
    fn string_list(&self, key: &str) -> Vec<String> {
        self.lookup(key)
            .and_then(ParamValue::as_string_list)
            .unwrap_or_default()
    }

    /// Nested map, empty when absent or not a map
    fn map(&self, key: &str) -> BTreeMap<String, ParamValue> {
        self.lookup(key)
            .and_then(ParamValue::as_map)
            .cloned()
            .unwrap_or_default()
    }

    fn require(&self, key: &str) -> Result<&ParamValue, DecodeError> {
        match self.lookup(key) {
            None | Some(ParamValue::Null) => Err(DecodeError::missing(key)),
            Some(value) => Ok(value),
        }
    }

    fn require_string(&self, key: &str) -> Result<String, DecodeError> {
        let value = self.require(key)?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| DecodeError::wrong_type(key, "string", value.type_name()))
    }

    fn require_bool(&self, key: &str) -> Result<bool, DecodeError> {
        let value = self.require(key)?;
        value
            .as_bool()
            .ok_or_else(|| DecodeError::wrong_type(key, "bool", value.type_name()))
    }

    fn require_number(&self, key: &str) -> Result<f64, DecodeError> {
        let value = self.require(key)?;
        value
            .as_f64()
            .ok_or_else(|| DecodeError::wrong_type(key, "number", value.type_name()))
    }

    fn require_string_list(&self, key: &str) -> Result<Vec<String>, DecodeError> {
        let value = self.require(key)?;
        value
            .as_string_list()
            .ok_or_else(|| DecodeError::wrong_type(key, "list of strings", value.type_name()))
    }

    fn require_map(&self, key: &str) -> Result<BTreeMap<String, ParamValue>, DecodeError> {
        let value = self.require(key)?;
        value
            .as_map()
            .cloned()
            .ok_or_else(|| DecodeError::wrong_type(key, "map", value.type_name()))
    }
}

/// String-keyed parameter object as sent to and received from the control plane.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterBag(BTreeMap<String, ParamValue>);

impl ParameterBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<ParamValue> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Insert `value` under `key` unless the key is already present.
    pub fn insert_missing(&mut self, key: &str, value: &ParamValue) {
        self.0
            .entry(key.to_string())
            .or_insert_with(|| value.clone());
    }

    pub fn into_inner(self) -> BTreeMap<String, ParamValue> {
        self.0
    }
}

impl ParamAccess for ParameterBag {
    fn lookup(&self, key: &str) -> Option<&ParamValue> {
        self.0.get(key)
    }
}

impl From<BTreeMap<String, ParamValue>> for ParameterBag {
    fn from(map: BTreeMap<String, ParamValue>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for ParameterBag {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
