// Copyright (c) Chris Gunn.
// Licensed under the MIT license.

// Renders nodes through per-type documentation templates. Each type's
// template is compiled the first time any node of that type is documented and
// the compiled form is reused for every later node of the type.


use handlebars::Handlebars;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::{
    error::{Error, Result},
    schema::{TypeKey, TypeRegistry},
    tree::{NodeData, NodeId, NodeName, Tree},
};

/// Position of the node being rendered, passed down the render walk.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderContext {
    pub depth: usize,
    pub index: usize,
}

impl RenderContext {
    pub fn child(self, index: usize) -> RenderContext {
        RenderContext {
            depth: self.depth + 1,
            index,
        }
    }
}

impl TypeRegistry {
    /// The compiled documentation template of a type, compiling it on first
    /// use. `None` when the type declares no template.
    pub fn compiled_doc(&self, key: TypeKey) -> Result<Option<&Handlebars<'static>>> {
        let def = self.get(key);
        let Some(source) = def.doc_template() else {
            return Ok(None);
        };

        let compiled = def.compiled_doc.get_or_try_init(|| {
            debug!(type_name = def.name(), "compiling documentation template");
            let mut handlebars = Handlebars::new();
            handlebars
                .register_template_string(def.name(), source)
                .map_err(|err| Error::DocTemplate(format!("{}: {}", def.name(), err)))?;
            Ok::<_, Error>(handlebars)
        })?;
        Ok(Some(compiled))
    }

    /// Whether the type's template has been compiled already.
    pub fn is_doc_compiled(&self, key: TypeKey) -> bool {
        self.get(key).compiled_doc.get().is_some()
    }
}

/// Renders a single node with its type's template.
pub fn document(registry: &TypeRegistry, tree: &Tree, id: NodeId, ctx: RenderContext) -> Result<Option<String>> {
    let node = tree.node(id);
    let Some(handlebars) = registry.compiled_doc(node.type_key)? else {
        return Ok(None);
    };

    let type_name = registry.type_name(node.type_key);
    let data = render_data(type_name, tree, id, ctx);
    let out = handlebars
        .render(type_name, &data)
        .map_err(|err| Error::DocTemplate(format!("{}: {}", type_name, err)))?;
    Ok(Some(out))
}

/// Renders `id` and its subtree depth first, concatenating every node's output.
pub fn document_tree(registry: &TypeRegistry, tree: &Tree, id: NodeId) -> Result<String> {
    let mut out = String::new();
    document_into(registry, tree, id, RenderContext::default(), &mut out)?;
    Ok(out)
}

fn document_into(registry: &TypeRegistry, tree: &Tree, id: NodeId, ctx: RenderContext, out: &mut String) -> Result<()> {
    if let Some(rendered) = document(registry, tree, id, ctx)? {
        out.push_str(&rendered);
    }
    for (index, child) in tree.children(id).iter().enumerate() {
        document_into(registry, tree, *child, ctx.child(index), out)?;
    }
    Ok(())
}

fn render_data(type_name: &str, tree: &Tree, id: NodeId, ctx: RenderContext) -> Value {
    let node = tree.node(id);

    let name = match &node.name {
        NodeName::Str(name) => Value::String(name.clone()),
        NodeName::Int(value) => Value::from(*value),
    };

    let mut properties = Map::new();
    let mut value = Value::Null;
    let mut optional = false;
    match &node.data {
        NodeData::Properties(props) => {
            optional = props.optional;
            for (key, scalar) in props.scalars.iter() {
                properties.insert(key.clone(), scalar.to_json());
            }
        }
        NodeData::Value(raw) => value = raw.to_json(),
    }

    json!({
        "name": name,
        "type": type_name,
        "optional": optional,
        "depth": ctx.depth,
        "index": ctx.index,
        "properties": properties,
        "value": value,
        "child_count": node.children().len(),
    })
}
