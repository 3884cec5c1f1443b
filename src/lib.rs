// Copyright (c) Chris Gunn.
// Licensed under the MIT license.

// Typed property trees built from decoded YAML through per-type schemas.

pub mod ancestry;
pub mod builder;
pub mod cow_yaml;
pub mod docs;
pub mod error;
pub mod grammar;
pub mod naming;
pub mod process_document;
pub mod resolver;
pub mod schema;
pub mod tree;

pub use error::{Error, Result};
