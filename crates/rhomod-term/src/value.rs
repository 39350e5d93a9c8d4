//! Dynamic values accepted by the codec.

use crate::codec::CodecOptions;
use crate::error::CodecError;
use serde_json::{Map as JsonMap, Number};
use std::collections::BTreeMap;

/// Structured data handed to the codec.
///
/// Maps are keyed by `String` in a `BTreeMap`, so iteration is always in
/// byte order of the keys regardless of how the map was filled.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Short name of the variant, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Str(_) => "string",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }

    /// Build a map value from key/value pairs.
    ///
    /// Later duplicates replace earlier ones.
    pub fn map<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Self::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Convert JSON data into a codec value.
    ///
    /// Fractional numbers and integers outside the `i64` range are rejected
    /// with [`CodecError::UnsupportedValueKind`].
    pub fn from_json(json: &serde_json::Value) -> Result<Self, CodecError> {
        Self::from_json_with(json, CodecOptions::default())
    }

    /// Convert JSON data, following at most `options.max_depth` levels.
    pub fn from_json_with(
        json: &serde_json::Value,
        options: CodecOptions,
    ) -> Result<Self, CodecError> {
        from_json_at(json, 0, options.max_depth)
    }

    /// Render the value back as JSON data.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Int(n) => serde_json::Value::Number(Number::from(*n)),
            Self::Str(s) => serde_json::Value::String(s.clone()),
            Self::List(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Self::Map(entries) => {
                let mut object = JsonMap::new();
                for (key, value) in entries {
                    object.insert(key.clone(), value.to_json());
                }
                serde_json::Value::Object(object)
            }
        }
    }
}

fn from_json_at(
    json: &serde_json::Value,
    depth: usize,
    limit: usize,
) -> Result<Value, CodecError> {
    if depth > limit {
        return Err(CodecError::unsupported(format!(
            "data nested deeper than {limit} levels"
        )));
    }
    match json {
        serde_json::Value::Null => Ok(Value::Null),
        serde_json::Value::Bool(b) => Ok(Value::Bool(*b)),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(int) => Ok(Value::Int(int)),
            None if n.is_f64() => Err(CodecError::unsupported(format!("fractional number {n}"))),
            None => Err(CodecError::unsupported(format!(
                "integer {n} outside the signed 64-bit range"
            ))),
        },
        serde_json::Value::String(s) => Ok(Value::Str(s.clone())),
        serde_json::Value::Array(items) => items
            .iter()
            .map(|item| from_json_at(item, depth + 1, limit))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        serde_json::Value::Object(object) => {
            let mut entries = BTreeMap::new();
            for (key, value) in object {
                entries.insert(key.clone(), from_json_at(value, depth + 1, limit)?);
            }
            Ok(Value::Map(entries))
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Self::List(value)
    }
}

impl TryFrom<&serde_json::Value> for Value {
    type Error = CodecError;

    fn try_from(value: &serde_json::Value) -> Result<Self, Self::Error> {
        Self::from_json(value)
    }
}
