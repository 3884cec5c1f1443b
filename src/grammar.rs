// Copyright (c) Chris Gunn.
// Licensed under the MIT license.

// A compact REST API description language built on the schema registry:
// resources nest under `/path` keys, methods under verb keys, and resource
// types and traits act as templates that `resolve` applies to the resources
// and methods referencing them.


use std::collections::{HashMap, HashSet};

use regex::Regex;
use tracing::debug;

use crate::{
    cow_yaml::Yaml,
    error::{Error, Result},
    resolver::{Params, TemplateResolver},
    schema::{NodeHooks, NoHooks, PatternRule, TypeKey, TypeKind, TypeRegistry},
    tree::{NodeId, NodeName, Tree},
};

pub const METHOD_NAMES: &[&str] = &["get", "post", "put", "patch", "delete", "head", "options"];

pub const PARAMETER_TYPES: &[&str] = &["string", "number", "integer", "date", "boolean", "file"];

const PROTOCOLS: &[&str] = &["HTTP", "HTTPS"];

const MAX_RESOURCE_TYPE_ROUNDS: usize = 16;

const RESOURCE_KEY: &str = r"^/";
const RESOURCE_OR_METHOD_KEY: &str = r"^(/|(get|post|put|patch|delete|head|options)\??$)";

#[derive(Clone, Copy, Debug)]
pub struct GrammarTypes {
    pub root: TypeKey,
    pub resource: TypeKey,
    pub resource_type: TypeKey,
    pub method: TypeKey,
    pub trait_: TypeKey,
    pub parameter: TypeKey,
    pub header: TypeKey,
    pub query_parameter: TypeKey,
    pub uri_parameter: TypeKey,
    pub form_parameter: TypeKey,
    pub response: TypeKey,
    pub body: TypeKey,
    pub doc_item: TypeKey,
    pub schema_def: TypeKey,
}

pub struct Grammar {
    pub registry: TypeRegistry,
    pub types: GrammarTypes,
}

pub fn build_grammar() -> Result<Grammar> {
    let mut registry = TypeRegistry::new();

    let parameter = registry
        .define("Parameter", TypeKind::Properties, None)
        .declare_scalar(&[
            "display_name",
            "description",
            "type",
            "enum",
            "pattern",
            "min_length",
            "max_length",
            "minimum",
            "maximum",
            "example",
            "repeat",
            "required",
            "default",
        ])
        .hooks(ParameterHooks)
        .doc_template(
            "<li><code>{{name}}</code>{{#if properties.type}} ({{properties.type}}){{/if}}\
             {{#if properties.description}}: {{properties.description}}{{/if}}</li>\n",
        )
        .key();
    let header = registry.define("Header", TypeKind::Properties, Some(parameter)).key();
    let query_parameter = registry.define("QueryParameter", TypeKind::Properties, Some(parameter)).key();
    let uri_parameter = registry.define("UriParameter", TypeKind::Properties, Some(parameter)).key();
    let form_parameter = registry.define("FormParameter", TypeKind::Properties, Some(parameter)).key();

    let schema_def = registry
        .define("SchemaDef", TypeKind::Value, None)
        .hooks(SchemaHooks)
        .doc_template("<pre>{{value}}</pre>\n")
        .key();

    let doc_item = registry
        .define("DocItem", TypeKind::Properties, None)
        .declare_scalar(&["title", "content"])
        .hooks(DocItemHooks)
        .doc_template("<h2>{{properties.title}}</h2><div>{{properties.content}}</div>\n")
        .key();

    let body = registry
        .define("Body", TypeKind::Properties, None)
        .declare_scalar(&["schema", "example"])
        .declare_non_scalar(&["form_parameters"], move |builder, id, _name, value| {
            builder.build_named(form_parameter, value, id)
        })
        .doc_template("<h5>{{name}}</h5>\n")
        .key();

    let response = registry
        .define("Response", TypeKind::Properties, None)
        .declare_scalar(&["description"])
        .declare_non_scalar(&["headers"], move |builder, id, _name, value| {
            builder.build_named(header, value, id)
        })
        .declare_non_scalar(&["body"], move |builder, id, _name, value| builder.build_named(body, value, id))
        .hooks(ResponseHooks)
        .doc_template("<h4>{{name}}</h4>{{#if properties.description}}<p>{{properties.description}}</p>{{/if}}\n")
        .key();

    let method = registry
        .define("Method", TypeKind::Properties, None)
        .declare_scalar(&["display_name", "description", "is", "protocols"])
        .declare_non_scalar(&["headers"], move |builder, id, _name, value| {
            builder.build_named(header, value, id)
        })
        .declare_non_scalar(&["query_parameters"], move |builder, id, _name, value| {
            builder.build_named(query_parameter, value, id)
        })
        .declare_non_scalar(&["body"], move |builder, id, _name, value| builder.build_named(body, value, id))
        .declare_non_scalar(&["responses"], move |builder, id, _name, value| {
            builder.build_named(response, value, id)
        })
        .hooks(MethodHooks { check_name: true })
        .key();

    // Traits are named freely, so they drop the verb check.
    let trait_ = registry
        .define("Trait", TypeKind::Properties, Some(method))
        .declare_scalar(&["usage"])
        .template_context()
        .hooks(MethodHooks { check_name: false })
        .key();

    // Defined after Trait so that traits are not documented as methods.
    registry.definer(method).doc_template(
        "<h3>{{name}}</h3>{{#if properties.description}}<p>{{properties.description}}</p>{{/if}}\n",
    );

    let resource = registry
        .define("Resource", TypeKind::Properties, None)
        .declare_scalar(&["display_name", "description", "type", "is"])
        .declare_non_scalar(&["uri_parameters"], move |builder, id, _name, value| {
            builder.build_named(uri_parameter, value, id)
        })
        .hooks(ResourceHooks)
        .key();
    registry
        .definer(resource)
        .declare_pattern(PatternRule::regex(Regex::new(RESOURCE_OR_METHOD_KEY)?, move |builder, id, key, value| {
            let child = if key.starts_with('/') {
                builder.build(resource, key, value, Some(id))?
            } else {
                builder.build(method, key, value, Some(id))?
            };
            Ok(vec![child])
        }));

    let resource_type = registry
        .define("ResourceType", TypeKind::Properties, Some(resource))
        .declare_scalar(&["usage"])
        .template_context()
        .hooks(NoHooks)
        .key();

    registry.definer(resource).doc_template(
        "<h2>{{name}}</h2>{{#if properties.description}}<p>{{properties.description}}</p>{{/if}}\n",
    );

    let root = registry
        .define("Root", TypeKind::Properties, None)
        .declare_scalar(&["title", "version", "base_uri", "media_type", "protocols"])
        .declare_non_scalar(&["base_uri_parameters"], move |builder, id, _name, value| {
            builder.build_named(uri_parameter, value, id)
        })
        .declare_non_scalar(&["documentation"], move |builder, id, _name, value| match value {
            Yaml::Array(items) => items
                .iter()
                .enumerate()
                .map(|(index, item)| builder.build(doc_item, index as i64, item, Some(id)))
                .collect(),
            Yaml::Null => Ok(Vec::new()),
            _ => Err(Error::invalid(format!(
                "documentation must be a list, found {}",
                value.type_name()
            ))),
        })
        .declare_non_scalar(&["schemas"], move |builder, id, _name, value| {
            builder.build_named(schema_def, value, id)
        })
        .declare_non_scalar(&["resource_types"], move |builder, id, _name, value| {
            builder.build_named(resource_type, value, id)
        })
        .declare_non_scalar(&["traits"], move |builder, id, _name, value| {
            builder.build_named(trait_, value, id)
        })
        .declare_pattern(PatternRule::regex(Regex::new(RESOURCE_KEY)?, move |builder, id, key, value| {
            Ok(vec![builder.build(resource, key, value, Some(id))?])
        }))
        .document_root()
        .hooks(RootHooks)
        .doc_template(
            "<h1>{{properties.title}}</h1>{{#if properties.version}}<p>Version {{properties.version}}</p>{{/if}}\
             {{#if properties.base_uri}}<p><code>{{properties.base_uri}}</code></p>{{/if}}\n",
        )
        .key();

    let types = GrammarTypes {
        root,
        resource,
        resource_type,
        method,
        trait_,
        parameter,
        header,
        query_parameter,
        uri_parameter,
        form_parameter,
        response,
        body,
        doc_item,
        schema_def,
    };
    debug!(types = registry.len(), "grammar defined");
    Ok(Grammar { registry, types })
}

fn check_protocols(value: &Yaml) -> Result<()> {
    let items = value
        .as_array()
        .ok_or_else(|| Error::invalid(format!("protocols must be a list, found {}", value.type_name())))?;
    for item in items {
        match item.as_str() {
            Some(protocol) if PROTOCOLS.contains(&protocol) => {}
            _ => {
                return Err(Error::invalid(format!(
                    "unsupported protocol {}, expected HTTP or HTTPS",
                    item.debug_string()
                )))
            }
        }
    }
    Ok(())
}

fn require_scalars(tree: &Tree, id: NodeId, what: &str, names: &[&str]) -> Result<()> {
    for name in names {
        if tree.scalar(id, name).is_none() {
            return Err(Error::invalid(format!(
                "{} '{}' is missing required property '{}'",
                what,
                tree.name(id),
                name
            )));
        }
    }
    Ok(())
}

struct RootHooks;

impl NodeHooks for RootHooks {
    fn validate_property(&self, property: &str, value: &Yaml) -> Result<()> {
        match property {
            "protocols" => check_protocols(value),
            "title" | "version" | "base_uri" | "media_type" => match value.key_string() {
                Some(_) => Ok(()),
                None => Err(Error::invalid(format!("{} must be a scalar, found {}", property, value.type_name()))),
            },
            _ => Ok(()),
        }
    }

    fn validate_node(&self, tree: &Tree, id: NodeId) -> Result<()> {
        require_scalars(tree, id, "document", &["title"])?;

        let uses_version = tree
            .scalar(id, "base_uri")
            .and_then(Yaml::as_str)
            .is_some_and(|uri| uri.contains("{version}"));
        if uses_version && tree.scalar(id, "version").is_none() {
            return Err(Error::invalid("base_uri uses {version} but no version is given"));
        }
        Ok(())
    }
}

struct ResourceHooks;

impl NodeHooks for ResourceHooks {
    fn validate_name(&self, name: &NodeName) -> Result<()> {
        match name.as_str() {
            Some(path) if path.starts_with('/') => Ok(()),
            _ => Err(Error::invalid(format!("resource '{}' must start with '/'", name))),
        }
    }
}

struct MethodHooks {
    check_name: bool,
}

impl NodeHooks for MethodHooks {
    fn validate_name(&self, name: &NodeName) -> Result<()> {
        if !self.check_name {
            return Ok(());
        }
        match name.as_str() {
            Some(verb) if METHOD_NAMES.contains(&verb) => Ok(()),
            _ => Err(Error::invalid(format!("'{}' is not an http method", name))),
        }
    }

    fn validate_property(&self, property: &str, value: &Yaml) -> Result<()> {
        match property {
            "protocols" => check_protocols(value),
            _ => Ok(()),
        }
    }
}

struct ResponseHooks;

impl NodeHooks for ResponseHooks {
    fn validate_name(&self, name: &NodeName) -> Result<()> {
        match name.as_int() {
            Some(code) if (100..=599).contains(&code) => Ok(()),
            _ => Err(Error::invalid(format!("'{}' is not an http status code", name))),
        }
    }
}

struct ParameterHooks;

impl NodeHooks for ParameterHooks {
    fn validate_property(&self, property: &str, value: &Yaml) -> Result<()> {
        match property {
            "type" => match value.as_str() {
                Some(kind) if PARAMETER_TYPES.contains(&kind) => Ok(()),
                _ => Err(Error::invalid(format!(
                    "parameter type must be one of {}, found {}",
                    PARAMETER_TYPES.join(", "),
                    value.debug_string()
                ))),
            },
            "min_length" | "max_length" => match value.as_i64() {
                Some(length) if length >= 0 => Ok(()),
                _ => Err(Error::invalid(format!(
                    "{} must be a non-negative integer, found {}",
                    property,
                    value.debug_string()
                ))),
            },
            "minimum" | "maximum" => match value.as_f64() {
                Some(_) => Ok(()),
                None => Err(Error::invalid(format!("{} must be a number, found {}", property, value.debug_string()))),
            },
            "repeat" | "required" => match value.as_bool() {
                Some(_) => Ok(()),
                None => Err(Error::invalid(format!("{} must be a boolean, found {}", property, value.debug_string()))),
            },
            "enum" => match value.as_array() {
                Some(items) if !items.is_empty() => Ok(()),
                _ => Err(Error::invalid("enum must be a non-empty list")),
            },
            _ => Ok(()),
        }
    }

    fn validate_node(&self, tree: &Tree, id: NodeId) -> Result<()> {
        let bound = |name: &str| tree.scalar(id, name).and_then(Yaml::as_f64);
        if let (Some(min), Some(max)) = (bound("min_length"), bound("max_length")) {
            if min > max {
                return Err(Error::invalid(format!(
                    "parameter '{}' has min_length greater than max_length",
                    tree.name(id)
                )));
            }
        }
        if let (Some(min), Some(max)) = (bound("minimum"), bound("maximum")) {
            if min > max {
                return Err(Error::invalid(format!(
                    "parameter '{}' has minimum greater than maximum",
                    tree.name(id)
                )));
            }
        }
        Ok(())
    }
}

struct DocItemHooks;

impl NodeHooks for DocItemHooks {
    fn validate_node(&self, tree: &Tree, id: NodeId) -> Result<()> {
        require_scalars(tree, id, "documentation item", &["title", "content"])
    }
}

struct SchemaHooks;

impl NodeHooks for SchemaHooks {
    fn validate_value(&self, value: &Yaml) -> Result<()> {
        match value {
            Yaml::String(_) => Ok(()),
            _ => Err(Error::invalid(format!("schema must be a string, found {}", value.type_name()))),
        }
    }
}

/// Applies every resource type (`type`) and trait (`is`) reference in the
/// document. `params` are available to every template alongside the
/// reserved `resourcePath`, `resourcePathName` and `methodName`.
pub fn resolve(grammar: &Grammar, tree: &mut Tree, root: NodeId, params: &Params) -> Result<()> {
    let types = grammar.types;
    let resolver = TemplateResolver::new();
    let resource_types = templates_by_name(tree, root, types.resource_type);
    let traits = templates_by_name(tree, root, types.trait_);

    // Nested resources copied in by a resource type get their own `type`
    // applied in the next round.
    let mut typed = HashSet::new();
    for round in 0.. {
        let pending: Vec<NodeId> = concrete_resources(grammar, tree, root)
            .into_iter()
            .filter(|id| !typed.contains(id))
            .collect();
        if pending.is_empty() {
            break;
        }
        if round == MAX_RESOURCE_TYPE_ROUNDS {
            return Err(Error::Template(format!(
                "resource types nest more than {} levels deep",
                MAX_RESOURCE_TYPE_ROUNDS
            )));
        }

        for resource in pending {
            typed.insert(resource);
            let Some(reference) = tree.scalar(resource, "type").cloned() else {
                continue;
            };
            for (name, args) in template_refs(&reference)? {
                let template = *resource_types
                    .get(&name)
                    .ok_or_else(|| Error::Template(format!("unknown resource type '{}'", name)))?;
                let params = template_params(tree, types.resource, resource, None, params, args);
                resolver.apply_template(tree, template, resource, &params)?;
            }
        }
    }

    // Resource types may have added methods and nested resources.
    for resource in concrete_resources(grammar, tree, root) {
        let resource_refs = match tree.scalar(resource, "is") {
            Some(reference) => template_refs(reference)?,
            None => Vec::new(),
        };

        let methods: Vec<NodeId> = tree.children_of_type(resource, types.method).collect();
        for method in methods {
            let mut refs = match tree.scalar(method, "is") {
                Some(reference) => template_refs(reference)?,
                None => Vec::new(),
            };
            refs.extend(resource_refs.iter().cloned());

            for (name, args) in refs {
                let template = *traits
                    .get(&name)
                    .ok_or_else(|| Error::Template(format!("unknown trait '{}'", name)))?;
                let params = template_params(tree, types.resource, resource, Some(method), params, args);
                resolver.apply_template(tree, template, method, &params)?;
            }
        }
    }
    Ok(())
}

fn templates_by_name(tree: &Tree, root: NodeId, type_key: TypeKey) -> HashMap<String, NodeId> {
    tree.children_of_type(root, type_key)
        .map(|id| (tree.name(id).to_string(), id))
        .collect()
}

/// Resources outside any template, parents before children.
fn concrete_resources(grammar: &Grammar, tree: &Tree, root: NodeId) -> Vec<NodeId> {
    tree.descendants(root)
        .into_iter()
        .filter(|id| tree.node(*id).type_key == grammar.types.resource)
        .filter(|id| {
            !tree
                .ancestors(*id)
                .any(|ancestor| grammar.registry.is_template_context(tree.node(ancestor).type_key))
        })
        .collect()
}

/// Reads a `type` or `is` value: a name, a `{name: {param: value}}` map, or
/// a list of either.
pub fn template_refs(value: &Yaml) -> Result<Vec<(String, Params)>> {
    match value {
        Yaml::Null => Ok(Vec::new()),
        Yaml::Array(items) => {
            let mut refs = Vec::new();
            for item in items.iter() {
                refs.extend(template_refs(item)?);
            }
            Ok(refs)
        }
        Yaml::Hash(map) => {
            let mut refs = Vec::new();
            for (key, args) in map.iter() {
                let name = key
                    .key_string()
                    .ok_or_else(|| Error::Template(format!("template names must be scalars, found {}", key.type_name())))?;
                refs.push((name, template_args(args)?));
            }
            Ok(refs)
        }
        _ => match value.key_string() {
            Some(name) => Ok(vec![(name, Params::new())]),
            None => Err(Error::Template(format!("invalid template reference {}", value.debug_string()))),
        },
    }
}

fn template_args(value: &Yaml) -> Result<Params> {
    let mut params = Params::new();
    match value {
        Yaml::Null => {}
        Yaml::Hash(map) => {
            for (key, arg) in map.iter() {
                match (key.key_string(), arg.key_string()) {
                    (Some(key), Some(arg)) => {
                        params.insert(key, arg);
                    }
                    _ => {
                        return Err(Error::Template(format!(
                            "template parameter {} must have a scalar value",
                            key.debug_string()
                        )))
                    }
                }
            }
        }
        _ => {
            return Err(Error::Template(format!(
                "template parameters must be a map, found {}",
                value.type_name()
            )))
        }
    }
    Ok(params)
}

/// The full path of a resource: its own name prefixed by every enclosing resource.
pub fn resource_path(tree: &Tree, resource_key: TypeKey, id: NodeId) -> String {
    let mut segments = vec![tree.name(id).to_string()];
    segments.extend(
        tree.ancestors(id)
            .take_while(|ancestor| tree.node(*ancestor).type_key == resource_key)
            .map(|ancestor| tree.name(ancestor).to_string()),
    );
    segments.reverse();
    segments.concat()
}

/// The rightmost path segment that is not a uri parameter.
pub fn resource_path_name(path: &str) -> &str {
    path.split('/')
        .rev()
        .find(|segment| !segment.is_empty() && !segment.contains('{'))
        .unwrap_or("")
}

// Reserved parameters override explicit arguments, which override `extra`.
fn template_params(
    tree: &Tree,
    resource_key: TypeKey,
    resource: NodeId,
    method: Option<NodeId>,
    extra: &Params,
    args: Params,
) -> Params {
    let mut params = extra.clone();
    params.extend(args);

    let path = resource_path(tree, resource_key, resource);
    params.insert("resourcePathName".to_string(), resource_path_name(&path).to_string());
    params.insert("resourcePath".to_string(), path);
    if let Some(method) = method {
        params.insert("methodName".to_string(), tree.name(method).to_string());
    }
    params
}
