// Copyright (c) Chris Gunn.
// Licensed under the MIT license.

// Applies template subtrees (resource types, traits) to the nodes that use
// them: missing parts are cloned from the template with parameters
// substituted, parts the target already has are merged with the target's
// values winning.

mod param_expr;


use std::{collections::HashMap, sync::Arc};

use hashlink::LinkedHashMap;
use tracing::debug;

use crate::{
    cow_yaml::Yaml,
    error::{Error, Result},
    tree::{NodeData, NodeId, NodeName, Tree},
};

pub use param_expr::{ParamExprParser, ParamFunction, ParamRef, ParamSegment};

pub type Params = HashMap<String, String>;

/// Template scalars describing the template itself; never copied to targets.
pub const TEMPLATE_ONLY_SCALARS: &[&str] = &["usage"];

pub struct TemplateResolver {
    parser: ParamExprParser,
}

impl TemplateResolver {
    pub fn new() -> TemplateResolver {
        TemplateResolver {
            parser: ParamExprParser::new(),
        }
    }

    /// Replaces every `<<param>>` reference in `input`.
    pub fn substitute(&self, input: &str, params: &Params) -> Result<String> {
        let segments = self.parser.parse(input)?;
        let mut out = String::with_capacity(input.len());
        for segment in segments {
            match segment {
                ParamSegment::Text(text) => out.push_str(&text),
                ParamSegment::Param(param) => {
                    let value = params
                        .get(&param.name)
                        .ok_or_else(|| Error::Template(format!("unknown template parameter '{}'", param.name)))?;
                    let value = param
                        .functions
                        .iter()
                        .fold(value.clone(), |value, function| function.apply(&value));
                    out.push_str(&value);
                }
            }
        }
        Ok(out)
    }

    /// Substitutes parameters in every string inside `value`, map keys included.
    pub fn substitute_yaml(&self, value: &Yaml, params: &Params) -> Result<Yaml> {
        match value {
            Yaml::String(string) => Ok(Yaml::string(self.substitute(string, params)?)),
            Yaml::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items.iter() {
                    out.push(self.substitute_yaml(item, params)?);
                }
                Ok(Yaml::Array(Arc::new(out)))
            }
            Yaml::Hash(map) => {
                let mut out = LinkedHashMap::new();
                for (key, item) in map.iter() {
                    out.insert(self.substitute_yaml(key, params)?, self.substitute_yaml(item, params)?);
                }
                Ok(Yaml::Hash(Arc::new(out)))
            }
            Yaml::Real(_) | Yaml::Integer(_) | Yaml::Boolean(_) | Yaml::Null => Ok(value.clone()),
        }
    }

    fn substitute_name(&self, name: &NodeName, params: &Params) -> Result<NodeName> {
        match name {
            NodeName::Str(name) => Ok(NodeName::Str(self.substitute(name, params)?)),
            NodeName::Int(_) => Ok(name.clone()),
        }
    }

    /// Applies `template` to `target`. The template subtree is left untouched.
    pub fn apply_template(&self, tree: &mut Tree, template: NodeId, target: NodeId, params: &Params) -> Result<()> {
        if let NodeData::Value(_) = tree.node(target).data {
            return Err(Error::Template(format!(
                "cannot apply template '{}' to value node '{}'",
                tree.name(template),
                tree.name(target)
            )));
        }
        debug!(
            template = %tree.name(template),
            target = %tree.name(target),
            "applying template"
        );

        self.fill_scalars(tree, template, target, params, TEMPLATE_ONLY_SCALARS)?;
        for child in tree.children(template).to_vec() {
            self.merge_child(tree, child, target, params)?;
        }
        Ok(())
    }

    fn merge_child(&self, tree: &mut Tree, source: NodeId, target: NodeId, params: &Params) -> Result<()> {
        let name = self.substitute_name(tree.name(source), params)?;
        let type_key = tree.node(source).type_key;
        let existing = tree
            .children(target)
            .iter()
            .copied()
            .find(|child| tree.name(*child).same_identity(&name) && tree.node(*child).type_key == type_key);

        match existing {
            Some(existing) => {
                if let NodeData::Value(_) = tree.node(existing).data {
                    return Ok(());
                }
                self.fill_scalars(tree, source, existing, params, &[])?;
                for child in tree.children(source).to_vec() {
                    self.merge_child(tree, child, existing, params)?;
                }
                Ok(())
            }
            // Optional parts only apply where the target already has them.
            None if tree.is_optional(source) => Ok(()),
            None => {
                let copy = tree.clone_subtree(source, Some(target));
                self.instantiate(tree, copy, params)?;
                tree.append_child(target, copy);
                Ok(())
            }
        }
    }

    fn fill_scalars(&self, tree: &mut Tree, source: NodeId, target: NodeId, params: &Params, skip: &[&str]) -> Result<()> {
        let scalars: Vec<(String, Yaml)> = match &tree.node(source).data {
            NodeData::Properties(props) => props
                .scalars
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
            NodeData::Value(_) => return Ok(()),
        };

        for (key, value) in scalars {
            if skip.contains(&key.as_str()) || tree.scalar(target, &key).is_some() {
                continue;
            }
            let value = self.substitute_yaml(&value, params)?;
            tree.set_scalar(target, &key, value);
        }
        Ok(())
    }

    /// Turns a fresh copy of template nodes into concrete nodes: parameters
    /// substituted, optional descendants dropped.
    fn instantiate(&self, tree: &mut Tree, id: NodeId, params: &Params) -> Result<()> {
        let name = self.substitute_name(tree.name(id), params)?;
        tree.node_mut(id).name = name;

        let children = match &tree.node(id).data {
            NodeData::Value(value) => {
                let value = self.substitute_yaml(value, params)?;
                tree.node_mut(id).data = NodeData::Value(value);
                return Ok(());
            }
            NodeData::Properties(props) => props.children.clone(),
        };

        let mut kept = Vec::with_capacity(children.len());
        for child in children {
            if tree.is_optional(child) {
                continue;
            }
            self.instantiate(tree, child, params)?;
            kept.push(child);
        }

        let mut scalars = LinkedHashMap::new();
        if let NodeData::Properties(props) = &tree.node(id).data {
            for (key, value) in props.scalars.iter() {
                scalars.insert(key.clone(), self.substitute_yaml(value, params)?);
            }
        }

        if let NodeData::Properties(props) = &mut tree.node_mut(id).data {
            props.optional = false;
            props.children = kept;
            props.scalars = scalars;
        }
        Ok(())
    }
}

impl Default for TemplateResolver {
    fn default() -> Self {
        Self::new()
    }
}
