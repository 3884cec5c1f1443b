// Copyright (c) Chris Gunn.
// Licensed under the MIT license.


use std::{fs, path::Path};

use anyhow::{anyhow, Context, Error};
use tracing::debug;

use crate::{
    builder::build_document,
    cow_yaml::{parse_yaml_str, Yaml},
    docs::document_tree,
    grammar::{build_grammar, resolve, Grammar},
    resolver::Params,
    schema::TypeRegistry,
    tree::{NodeData, NodeId, Tree},
};

#[derive(Clone, Debug)]
pub struct ProcessOptions {
    /// Apply resource types and traits after building.
    pub resolve: bool,
    /// Parameters available to every template.
    pub params: Params,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        ProcessOptions {
            resolve: true,
            params: Params::new(),
        }
    }
}

pub struct Document {
    pub grammar: Grammar,
    pub tree: Tree,
    pub root: NodeId,
}

impl Document {
    pub fn outline(&self) -> String {
        outline(&self.grammar.registry, &self.tree, self.root)
    }

    pub fn render_docs(&self) -> Result<String, Error> {
        let out = document_tree(&self.grammar.registry, &self.tree, self.root)?;
        Ok(out)
    }
}

pub fn process_document_file(filename: &Path, options: &ProcessOptions) -> Result<Document, Error> {
    let input = fs::read_to_string(filename).with_context(|| format!("{}: cannot read file", filename.display()))?;
    process_document_str(&filename.display().to_string(), &input, options)
}

/// Loads, builds and (unless disabled) resolves a single API document. The
/// root node is named after `filename`.
pub fn process_document_str(filename: &str, input: &str, options: &ProcessOptions) -> Result<Document, Error> {
    let docs = parse_yaml_str(input).with_context(|| format!("{}: cannot parse yaml", filename))?;
    let doc = match &docs[..] {
        [] => Yaml::Null,
        [doc] => doc.clone(),
        _ => return Err(anyhow!("{}: expected a single yaml document, found {}", filename, docs.len())),
    };

    let grammar = build_grammar()?;
    let (mut tree, root) = build_document(&grammar.registry, grammar.types.root, filename, &doc)
        .with_context(|| format!("{}: invalid document", filename))?;
    debug!(filename, nodes = tree.len(), "document built");

    if options.resolve {
        resolve(&grammar, &mut tree, root, &options.params)
            .with_context(|| format!("{}: cannot apply templates", filename))?;
        debug!(filename, nodes = tree.len(), "templates applied");
    }

    Ok(Document { grammar, tree, root })
}

/// An indented listing of a subtree: one line per node with its type and
/// name, followed by its scalar properties and then its children.
pub fn outline(registry: &TypeRegistry, tree: &Tree, root: NodeId) -> String {
    let mut out = String::new();
    outline_into(registry, tree, root, 0, &mut out);
    out
}

fn outline_into(registry: &TypeRegistry, tree: &Tree, id: NodeId, depth: usize, out: &mut String) {
    let node = tree.node(id);
    let indent = "  ".repeat(depth);
    let type_name = registry.type_name(node.type_key);

    match &node.data {
        NodeData::Value(value) => {
            out.push_str(&format!("{}{} {} = {}\n", indent, type_name, node.name, value.to_json()));
        }
        NodeData::Properties(props) => {
            let optional = if props.optional { " (optional)" } else { "" };
            out.push_str(&format!("{}{} {}{}\n", indent, type_name, node.name, optional));
            for (key, value) in props.scalars.iter() {
                out.push_str(&format!("{}  {}: {}\n", indent, key, value.to_json()));
            }
            for child in props.children.iter() {
                outline_into(registry, tree, *child, depth + 1, out);
            }
        }
    }
}
