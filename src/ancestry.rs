// Copyright (c) Chris Gunn.
// Licensed under the MIT license.

use crate::{
    error::{Error, Result},
    schema::TypeRegistry,
    tree::{NodeId, Tree},
};

/// Checks that a node placed under `parent` may carry the optional marker:
/// some ancestor, searching from `parent` upward, must be a template context,
/// and the search gives up at the document root or at an unparented node.
pub fn validate_optional_context(registry: &TypeRegistry, tree: &Tree, parent: Option<NodeId>) -> Result<()> {
    let mut current = parent;
    while let Some(id) = current {
        let type_key = tree.node(id).type_key;
        if registry.is_document_root(type_key) {
            break;
        }
        if registry.is_template_context(type_key) {
            return Ok(());
        }
        current = tree.parent(id);
    }

    Err(Error::invalid("optional properties are only allowed within a template"))
}
