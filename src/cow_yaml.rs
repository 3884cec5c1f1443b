// Copyright (c) Chris Gunn.
// Licensed under the MIT license.

// Provides copy-on-write variant of a YAML object.

mod loader;


use std::sync::Arc;

use hashlink::LinkedHashMap;

pub use loader::parse_yaml_str;

pub type YamlHash = LinkedHashMap<Yaml, Yaml>;

#[derive(Clone, PartialEq, PartialOrd, Debug, Eq, Ord, Hash)]
pub enum Yaml {
    // Numbers that don't fit in an i64 (e.g. floating point).
    Real(Arc<String>),
    Integer(i64),
    String(Arc<String>),
    Boolean(bool),
    Array(Arc<Vec<Yaml>>),
    Hash(Arc<YamlHash>),
    Null,
}

impl Yaml {
    pub fn string(value: impl Into<String>) -> Yaml {
        Yaml::String(Arc::new(value.into()))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Yaml::String(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Yaml::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Yaml::Integer(value) => Some(*value as f64),
            Yaml::Real(value) => value.parse().ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Yaml::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_hash(&self) -> Option<&YamlHash> {
        match self {
            Yaml::Hash(value) => Some(value.as_ref()),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Yaml]> {
        match self {
            Yaml::Array(value) => Some(value.as_slice()),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Yaml::Null)
    }

    /// Textual form of a mapping key. Collections have no key form.
    pub fn key_string(&self) -> Option<String> {
        match self {
            Yaml::String(value) => Some(value.as_ref().clone()),
            Yaml::Integer(value) => Some(value.to_string()),
            Yaml::Real(value) => Some(value.as_ref().clone()),
            Yaml::Boolean(value) => Some(value.to_string()),
            Yaml::Null => Some("null".to_string()),
            Yaml::Array(_) | Yaml::Hash(_) => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Yaml::Real(_) => "number",
            Yaml::Integer(_) => "integer",
            Yaml::String(_) => "string",
            Yaml::Boolean(_) => "bool",
            Yaml::Array(_) => "list",
            Yaml::Hash(_) => "map",
            Yaml::Null => "null",
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Yaml::Real(value) => match value.parse::<f64>().ok().and_then(serde_json::Number::from_f64) {
                Some(number) => serde_json::Value::Number(number),
                None => serde_json::Value::String(value.as_ref().clone()),
            },
            Yaml::Integer(value) => serde_json::Value::from(*value),
            Yaml::String(value) => serde_json::Value::String(value.as_ref().clone()),
            Yaml::Boolean(value) => serde_json::Value::Bool(*value),
            Yaml::Array(values) => serde_json::Value::Array(values.iter().map(Yaml::to_json).collect()),
            Yaml::Hash(map) => {
                let mut object = serde_json::Map::new();
                for (key, value) in map.iter() {
                    let key = key.key_string().unwrap_or_else(|| format!("{:?}", key));
                    object.insert(key, value.to_json());
                }
                serde_json::Value::Object(object)
            }
            Yaml::Null => serde_json::Value::Null,
        }
    }

    /// Short human readable form used in error messages and outlines.
    pub fn debug_string(&self) -> String {
        match self {
            Yaml::Real(value) => value.as_ref().clone(),
            Yaml::Integer(value) => value.to_string(),
            Yaml::String(value) => format!("{:?}", value),
            Yaml::Boolean(value) => value.to_string(),
            Yaml::Array(_) => "<list>".to_string(),
            Yaml::Hash(_) => "<map>".to_string(),
            Yaml::Null => "<null>".to_string(),
        }
    }
}

impl From<&str> for Yaml {
    fn from(value: &str) -> Self {
        Yaml::string(value)
    }
}

impl From<i64> for Yaml {
    fn from(value: i64) -> Self {
        Yaml::Integer(value)
    }
}

impl From<bool> for Yaml {
    fn from(value: bool) -> Self {
        Yaml::Boolean(value)
    }
}
