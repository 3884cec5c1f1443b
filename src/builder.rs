// Copyright (c) Chris Gunn.
// Licensed under the MIT license.

// Builds typed nodes from raw property mappings, classifying every key against
// the node type's schema.

#[cfg(test)]
mod tests;

use tracing::{debug, trace};

use crate::{
    ancestry::validate_optional_context,
    cow_yaml::{Yaml, YamlHash},
    error::{Error, Result},
    naming,
    schema::{TypeKey, TypeKind, TypeRegistry},
    tree::{Node, NodeData, NodeId, NodeName, PropertiesData, Tree},
};

pub struct Builder<'a> {
    registry: &'a TypeRegistry,
    tree: &'a mut Tree,
}

impl<'a> Builder<'a> {
    pub fn new(registry: &'a TypeRegistry, tree: &'a mut Tree) -> Builder<'a> {
        Builder { registry, tree }
    }

    pub fn registry(&self) -> &'a TypeRegistry {
        self.registry
    }

    pub fn tree(&self) -> &Tree {
        &*self.tree
    }

    /// Builds a node of any kind from a raw value. Properties types accept a
    /// map (or null, read as an empty map); value types accept anything.
    pub fn build(&mut self, type_key: TypeKey, name: impl Into<NodeName>, value: &Yaml, parent: Option<NodeId>) -> Result<NodeId> {
        let name = name.into();
        match self.registry.get(type_key).kind() {
            TypeKind::Value => self.build_value(type_key, name, value, parent),
            TypeKind::Properties => match value {
                Yaml::Hash(map) => self.build_properties(type_key, name, map, parent),
                Yaml::Null => self.build_properties(type_key, name, &YamlHash::new(), parent),
                _ => Err(Error::invalid(format!(
                    "'{}' must be a map, found {}",
                    name,
                    value.type_name()
                ))),
            },
        }
    }

    /// Builds one node per entry of a map, named by the entry key. A list of
    /// maps is read as the concatenation of its entries; null yields nothing.
    pub fn build_named(&mut self, type_key: TypeKey, value: &Yaml, parent: NodeId) -> Result<Vec<NodeId>> {
        let mut ids = Vec::new();
        match value {
            Yaml::Hash(map) => {
                for (key, item) in map.iter() {
                    let name = NodeName::from_key(key)
                        .ok_or_else(|| Error::invalid(format!("names must be scalars, found {}", key.type_name())))?;
                    ids.push(self.build(type_key, name, item, Some(parent))?);
                }
            }
            Yaml::Array(items) => {
                for item in items.iter() {
                    match item {
                        Yaml::Hash(_) => ids.extend(self.build_named(type_key, item, parent)?),
                        _ => {
                            return Err(Error::invalid(format!(
                                "list items must be maps, found {}",
                                item.type_name()
                            )))
                        }
                    }
                }
            }
            Yaml::Null => {}
            _ => {
                return Err(Error::invalid(format!(
                    "expected a map or a list of maps, found {}",
                    value.type_name()
                )))
            }
        }
        Ok(ids)
    }

    /// Constructs a properties node. Nothing is left in the tree when this fails.
    pub fn build_properties(
        &mut self,
        type_key: TypeKey,
        name: impl Into<NodeName>,
        properties: &YamlHash,
        parent: Option<NodeId>,
    ) -> Result<NodeId> {
        let mark = self.tree.len();
        let res = self.run_build_properties(type_key, name.into(), properties, parent);
        if let Err(err) = &res {
            debug!(
                type_name = self.registry.type_name(type_key),
                error = %err,
                "discarding partially built node"
            );
            self.tree.truncate(mark);
        }
        res
    }

    fn run_build_properties(
        &mut self,
        type_key: TypeKey,
        name: NodeName,
        properties: &YamlHash,
        parent: Option<NodeId>,
    ) -> Result<NodeId> {
        let registry = self.registry;
        let def = registry.get(type_key);
        debug_assert_eq!(def.kind(), TypeKind::Properties);

        let (name, optional) = match name.strip_optional() {
            Some(stripped) => {
                validate_optional_context(registry, self.tree, parent)?;
                (stripped, true)
            }
            None => (name, false),
        };

        let id = self.tree.alloc(Node {
            type_key,
            name,
            parent,
            data: NodeData::Properties(PropertiesData {
                optional,
                ..PropertiesData::default()
            }),
        });

        let hooks = def.hooks();
        hooks.validate_name(self.tree.name(id))?;
        hooks.validate_parent(self.tree, parent)?;

        let schema = def.schema();
        for (raw_key, value) in properties.iter() {
            let key = raw_key
                .key_string()
                .ok_or_else(|| Error::invalid(format!("property names must be scalars, found {}", raw_key.type_name())))?;
            let property = naming::underscore(&key);

            if schema.is_scalar(&property) {
                trace!(type_name = def.name(), key = %key, "scalar property");
                self.tree.set_scalar(id, &property, value.clone());
                hooks.validate_property(&property, value)?;
            } else if let Some(parser) = schema.parser(&property) {
                trace!(type_name = def.name(), key = %key, "non-scalar property");
                let children = parser(self, id, &property, value)?;
                self.adopt(id, children);
            } else if let Some(rule) = schema.pattern_rule().filter(|rule| rule.matches(&key)) {
                trace!(type_name = def.name(), key = %key, "pattern property");
                let children = (rule.handler())(self, id, &key, value)?;
                self.adopt(id, children);
            } else {
                return Err(Error::unknown(key, value.clone()));
            }
        }

        hooks.validate_node(self.tree, id)?;

        debug!(type_name = def.name(), name = %self.tree.name(id), optional, "built node");
        Ok(id)
    }

    /// Constructs a value node and runs its value check. A failing check
    /// removes the node and its error is returned as is.
    pub fn build_value(&mut self, type_key: TypeKey, name: impl Into<NodeName>, value: &Yaml, parent: Option<NodeId>) -> Result<NodeId> {
        let def = self.registry.get(type_key);
        debug_assert_eq!(def.kind(), TypeKind::Value);

        let id = self.tree.alloc(Node {
            type_key,
            name: name.into(),
            parent,
            data: NodeData::Value(value.clone()),
        });

        if let Err(err) = def.hooks().validate_value(value) {
            self.tree.truncate(id.index());
            return Err(err);
        }

        debug!(type_name = def.name(), name = %self.tree.name(id), "built value node");
        Ok(id)
    }

    fn adopt(&mut self, id: NodeId, children: Vec<NodeId>) {
        for child in children {
            self.tree.append_child(id, child);
        }
    }
}

/// Builds a whole document into a fresh tree, returning the tree and its root.
pub fn build_document(registry: &TypeRegistry, type_key: TypeKey, name: impl Into<NodeName>, value: &Yaml) -> Result<(Tree, NodeId)> {
    let mut tree = Tree::new();
    let root = Builder::new(registry, &mut tree).build(type_key, name, value, None)?;
    Ok((tree, root))
}
