// Copyright (c) Chris Gunn.
// Licensed under the MIT license.

use thiserror::Error;

use crate::cow_yaml::Yaml;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// The key matched no scalar name, non-scalar name or pattern rule of the node's type.
    #[error("unknown property '{key}' (value: {})", .value.debug_string())]
    UnknownProperty { key: String, value: Yaml },

    /// A validation hook rejected a value, or an optional marker was used outside a template.
    #[error("invalid property: {0}")]
    InvalidProperty(String),

    #[error("template error: {0}")]
    Template(String),

    #[error("documentation template error: {0}")]
    DocTemplate(String),

    #[error("invalid key pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl Error {
    pub fn invalid(reason: impl Into<String>) -> Error {
        Error::InvalidProperty(reason.into())
    }

    pub fn unknown(key: impl Into<String>, value: Yaml) -> Error {
        Error::UnknownProperty {
            key: key.into(),
            value,
        }
    }
}
