//! Nested request parameters and their flattening into bracket-notation pairs.
//!
//! # Design
//! A [`ParamMap`] keeps its entries in insertion order, so the pairs produced
//! by [`flatten`] (and therefore the query text of a prepared request) are
//! stable from run to run. Values the flattener cannot express are modelled
//! as [`ParamValue::Unsupported`] and dropped without complaint: a fixture
//! with one odd entry still yields a usable request.

use std::fmt;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Bytes left as-is in query keys and values. Brackets are kept so nested
/// keys read `a[b]=c` on the wire.
const QUERY_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'[')
    .remove(b']');

/// A parameter value: a single string, a list of strings, or a nested map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Text(String),
    List(Vec<String>),
    Map(ParamMap),
    /// A value with no string form. Skipped when flattening.
    Unsupported,
}

impl ParamValue {
    /// Capture anything printable as a single text value.
    pub fn display(value: impl fmt::Display) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(values: Vec<String>) -> Self {
        ParamValue::List(values)
    }
}

impl From<Vec<&str>> for ParamValue {
    fn from(values: Vec<&str>) -> Self {
        ParamValue::List(values.into_iter().map(str::to_string).collect())
    }
}

impl<const N: usize> From<[&str; N]> for ParamValue {
    fn from(values: [&str; N]) -> Self {
        ParamValue::List(values.iter().map(|v| v.to_string()).collect())
    }
}

impl From<ParamMap> for ParamValue {
    fn from(map: ParamMap) -> Self {
        ParamValue::Map(map)
    }
}

/// Numbers and booleans keep their JSON rendering; `null` and arrays holding
/// anything but strings become [`ParamValue::Unsupported`].
impl From<&Value> for ParamValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::String(s) => ParamValue::Text(s.clone()),
            Value::Number(n) => ParamValue::Text(n.to_string()),
            Value::Bool(b) => ParamValue::Text(b.to_string()),
            Value::Array(items) => items
                .iter()
                .map(|item| item.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>()
                .map_or(ParamValue::Unsupported, ParamValue::List),
            Value::Object(map) => ParamValue::Map(
                map.iter()
                    .map(|(key, value)| (key.clone(), ParamValue::from(value)))
                    .collect(),
            ),
            Value::Null => ParamValue::Unsupported,
        }
    }
}

/// Ordered string-keyed map of parameter values. Keys are unique.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamMap {
    entries: Vec<(String, ParamValue)>,
}

impl ParamMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `value` under `key`. An existing key keeps its position and
    /// has its old value returned.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<ParamValue>,
    ) -> Option<ParamValue> {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Chaining form of [`insert`](Self::insert).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K, V> FromIterator<(K, V)> for ParamMap
where
    K: Into<String>,
    V: Into<ParamValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = ParamMap::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

/// One flattened `key=value` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatParam {
    pub key: String,
    pub value: String,
}

impl FlatParam {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Flatten `params` into ordered pairs, nesting keys as `prefix[key]`.
///
/// Top-level callers pass an empty prefix, which makes the entry's own key
/// the pair key.
pub fn flatten(params: &ParamMap, prefix: &str) -> Vec<FlatParam> {
    let mut out = Vec::new();
    flatten_into(params, prefix, &mut out);
    out
}

fn flatten_into(params: &ParamMap, prefix: &str, out: &mut Vec<FlatParam>) {
    for (key, value) in params.iter() {
        let key = if prefix.is_empty() {
            key.to_string()
        } else {
            format!("{prefix}[{key}]")
        };

        match value {
            ParamValue::Text(text) => out.push(FlatParam::new(key, text.clone())),
            ParamValue::List(items) => {
                out.extend(items.iter().map(|item| FlatParam::new(key.clone(), item.clone())));
            }
            ParamValue::Map(nested) => flatten_into(nested, &key, out),
            ParamValue::Unsupported => {
                tracing::trace!(%key, "dropping unsupported parameter value");
            }
        }
    }
}

/// Path-parameter bindings: one per text value, one per list element.
///
/// Duplicate keys are kept in order. Nested maps have no meaning in a route
/// path and are skipped along with unsupported values.
pub fn path_bindings(params: &ParamMap) -> Vec<FlatParam> {
    let mut out = Vec::new();
    for (key, value) in params.iter() {
        match value {
            ParamValue::Text(text) => out.push(FlatParam::new(key, text.clone())),
            ParamValue::List(items) => {
                out.extend(items.iter().map(|item| FlatParam::new(key, item.clone())));
            }
            ParamValue::Map(_) | ParamValue::Unsupported => {
                tracing::trace!(%key, "dropping path parameter without a string form");
            }
        }
    }
    out
}

/// Render pairs as query text, keeping their order.
pub fn encode_query(pairs: &[FlatParam]) -> String {
    pairs
        .iter()
        .map(|pair| {
            format!(
                "{}={}",
                utf8_percent_encode(&pair.key, QUERY_COMPONENT),
                utf8_percent_encode(&pair.value, QUERY_COMPONENT)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}
