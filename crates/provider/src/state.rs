//! Resource configuration and state values
//!
//! Configuration and state are exchanged as JSON-encoded dynamic values.
//! Attribute helpers accept dotted paths (`target.path`) for nested blocks.

use std::collections::HashMap;
use serde::{Deserialize, Serialize};

use libvirt_pool_common::Result;

/// Dynamic value that can be encoded/decoded from resource state
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DynamicValue {
    #[default]
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    List(Vec<DynamicValue>),
    Map(HashMap<String, DynamicValue>),
}

impl DynamicValue {
    pub fn as_string(&self) -> Option<&str> {
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

    pub fn as_map(&self) -> Option<&HashMap<String, DynamicValue>> {
        match self {
            DynamicValue::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, DynamicValue::Null)
    }

    /// Look up an attribute by key or dotted path.
    ///
    /// A literal key containing dots wins over the nested interpretation.
    pub fn get(&self, path: &str) -> Option<&DynamicValue> {
        let map = self.as_map()?;
        if let Some(value) = map.get(path) {
            return Some(value);
        }
        let (head, rest) = path.split_once('.')?;
        map.get(head)?.get(rest)
    }

    /// Set a top-level attribute, turning a null value into a map first.
    pub fn set(&mut self, key: &str, value: DynamicValue) {
        if self.is_null() {
            *self = DynamicValue::Map(HashMap::new());
        }
        if let DynamicValue::Map(map) = self {
            map.insert(key.to_string(), value);
        }
    }
}

/// Decode a dynamic value from JSON bytes
pub fn decode_dynamic_value(data: &[u8]) -> Result<DynamicValue> {
    if data.is_empty() {
        return Ok(DynamicValue::Null);
    }
    Ok(serde_json::from_slice(data)?)
}

/// Encode a dynamic value to JSON bytes
pub fn encode_dynamic_value(value: &DynamicValue) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(value)?)
}

/// Helper to extract a string attribute from a DynamicValue
pub fn get_string_attr(value: &DynamicValue, key: &str) -> String {
    value.get(key)
        .and_then(|v| v.as_string())
        .unwrap_or("")
        .to_string()
}

/// Helper to extract an optional string attribute from a DynamicValue
pub fn get_optional_string_attr(value: &DynamicValue, key: &str) -> Option<String> {
    value.get(key)
        .and_then(|v| match v {
            DynamicValue::String(s) if !s.is_empty() => Some(s.clone()),
            _ => None,
        })
}

/// Helper to extract a bool attribute from a DynamicValue
pub fn get_bool_attr(value: &DynamicValue, key: &str, default: bool) -> bool {
    value.get(key)
        .and_then(|v| v.as_bool())
        .unwrap_or(default)
}

/// Create a DynamicValue map with the given attributes
pub fn make_state(attrs: Vec<(&str, DynamicValue)>) -> DynamicValue {
    let mut map = HashMap::new();
    for (key, value) in attrs {
        map.insert(key.to_string(), value);
    }
    DynamicValue::Map(map)
}

/// Create a string DynamicValue
pub fn string_value(s: impl Into<String>) -> DynamicValue {
    DynamicValue::String(s.into())
}

/// Create a bool DynamicValue
pub fn bool_value(b: bool) -> DynamicValue {
    DynamicValue::Bool(b)
}
