// Copyright (c) Chris Gunn.
// Licensed under the MIT license.

// Arena holding every node of a parsed document. Parent and child links are
// indices into the arena.

#[cfg(test)]
mod tests;

use std::fmt;

use hashlink::LinkedHashMap;

use crate::{cow_yaml::Yaml, schema::TypeKey};

/// Suffix marking a property as optional inside a template.
pub const OPTIONAL_MARKER: char = '?';

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum NodeName {
    Str(String),
    Int(i64),
}

impl NodeName {
    /// Name for a node built from a mapping key. Integer keys keep their
    /// numeric identity; other scalars use their textual form.
    pub fn from_key(key: &Yaml) -> Option<NodeName> {
        match key {
            Yaml::Integer(value) => Some(NodeName::Int(*value)),
            _ => key.key_string().map(NodeName::Str),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            NodeName::Str(name) => Some(name),
            NodeName::Int(_) => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            NodeName::Int(value) => Some(*value),
            NodeName::Str(name) => name.parse().ok(),
        }
    }

    /// Equal names, or names with the same textual form (`200` and `"200"`).
    pub fn same_identity(&self, other: &NodeName) -> bool {
        self == other || self.to_string() == other.to_string()
    }

    /// Splits off a trailing optional marker.
    pub fn strip_optional(&self) -> Option<NodeName> {
        match self {
            NodeName::Str(name) => name
                .strip_suffix(OPTIONAL_MARKER)
                .map(|stripped| NodeName::Str(stripped.to_string())),
            NodeName::Int(_) => None,
        }
    }
}

impl fmt::Display for NodeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeName::Str(name) => f.write_str(name),
            NodeName::Int(value) => write!(f, "{}", value),
        }
    }
}

impl From<&str> for NodeName {
    fn from(value: &str) -> Self {
        NodeName::Str(value.to_string())
    }
}

impl From<String> for NodeName {
    fn from(value: String) -> Self {
        NodeName::Str(value)
    }
}

impl From<i64> for NodeName {
    fn from(value: i64) -> Self {
        NodeName::Int(value)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PropertiesData {
    pub optional: bool,
    pub children: Vec<NodeId>,
    pub scalars: LinkedHashMap<String, Yaml>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum NodeData {
    Properties(PropertiesData),
    Value(Yaml),
}

#[derive(Clone, Debug)]
pub struct Node {
    pub type_key: TypeKey,
    pub name: NodeName,
    pub parent: Option<NodeId>,
    pub data: NodeData,
}

impl Node {
    pub fn properties(&self) -> Option<&PropertiesData> {
        match &self.data {
            NodeData::Properties(props) => Some(props),
            NodeData::Value(_) => None,
        }
    }

    pub fn value(&self) -> Option<&Yaml> {
        match &self.data {
            NodeData::Value(value) => Some(value),
            NodeData::Properties(_) => None,
        }
    }

    pub fn children(&self) -> &[NodeId] {
        match &self.data {
            NodeData::Properties(props) => &props.children,
            NodeData::Value(_) => &[],
        }
    }

    pub fn is_optional(&self) -> bool {
        self.properties().is_some_and(|props| props.optional)
    }

    pub fn scalar(&self, name: &str) -> Option<&Yaml> {
        self.properties().and_then(|props| props.scalars.get(name))
    }
}

#[derive(Clone, Debug, Default)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    pub fn new() -> Tree {
        Tree::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub(crate) fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    /// Drops every node allocated at or after `len`.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.nodes.truncate(len);
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).children()
    }

    pub fn name(&self, id: NodeId) -> &NodeName {
        &self.node(id).name
    }

    pub fn scalar(&self, id: NodeId, name: &str) -> Option<&Yaml> {
        self.node(id).scalar(name)
    }

    pub fn value(&self, id: NodeId) -> Option<&Yaml> {
        self.node(id).value()
    }

    pub fn is_optional(&self, id: NodeId) -> bool {
        self.node(id).is_optional()
    }

    /// Strict ancestors, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.parent(id),
        }
    }

    /// `id` and everything below it, depth first, parents before children.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).iter().rev());
        }
        out
    }

    pub fn find_child(&self, id: NodeId, name: &NodeName) -> Option<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .find(|child| self.name(*child) == name)
    }

    pub fn children_of_type(&self, id: NodeId, type_key: TypeKey) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(move |child| self.node(*child).type_key == type_key)
    }

    /// Appends `child` to the children of `parent` and points it back at `parent`.
    ///
    /// Panics if `parent` is a value node.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.node_mut(child).parent = Some(parent);
        match &mut self.node_mut(parent).data {
            NodeData::Properties(props) => props.children.push(child),
            NodeData::Value(_) => panic!("value node {:?} cannot own children", parent),
        }
    }

    pub fn set_scalar(&mut self, id: NodeId, name: &str, value: Yaml) {
        if let NodeData::Properties(props) = &mut self.node_mut(id).data {
            props.scalars.insert(name.to_string(), value);
        }
    }

    /// Deep-copies the subtree rooted at `id` into fresh arena slots. The copy
    /// hangs under `new_parent` (it is not added to that node's children);
    /// every copied child points at its enclosing copy.
    pub fn clone_subtree(&mut self, id: NodeId, new_parent: Option<NodeId>) -> NodeId {
        let source = self.node(id);
        let data = match &source.data {
            NodeData::Properties(props) => NodeData::Properties(PropertiesData {
                optional: props.optional,
                children: Vec::with_capacity(props.children.len()),
                scalars: props.scalars.clone(),
            }),
            NodeData::Value(value) => NodeData::Value(value.clone()),
        };
        let copy = Node {
            type_key: source.type_key,
            name: source.name.clone(),
            parent: new_parent,
            data,
        };
        let source_children = source.children().to_vec();

        let copy_id = self.alloc(copy);
        for child in source_children {
            let child_copy = self.clone_subtree(child, Some(copy_id));
            if let NodeData::Properties(props) = &mut self.node_mut(copy_id).data {
                props.children.push(child_copy);
            }
        }

        copy_id
    }
}

pub struct Ancestors<'a> {
    tree: &'a Tree,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.parent(current);
        Some(current)
    }
}
