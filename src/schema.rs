// Copyright (c) Chris Gunn.
// Licensed under the MIT license.

// Per-type schemas: which property keys a node type accepts and how each is consumed.


use std::{collections::HashMap, fmt, sync::Arc};

use handlebars::Handlebars;
use hashlink::LinkedHashMap;
use once_cell::sync::OnceCell;
use regex::Regex;

use crate::{
    builder::Builder,
    cow_yaml::Yaml,
    error::Result,
    tree::{NodeId, NodeName, Tree},
};

/// Builds the child nodes of a non-scalar property. Receives the node under
/// construction, the property name and its raw value.
pub type PropertyParser = Arc<dyn Fn(&mut Builder<'_>, NodeId, &str, &Yaml) -> Result<Vec<NodeId>> + Send + Sync>;

/// Consumes a key that matched a pattern rule. Receives the node under
/// construction, the original key and its raw value.
pub type PatternHandler = PropertyParser;

pub type KeyPredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeKey(usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypeKind {
    Properties,
    Value,
}

#[derive(Clone)]
pub struct PatternRule {
    predicate: KeyPredicate,
    handler: PatternHandler,
}

impl PatternRule {
    pub fn new(
        predicate: impl Fn(&str) -> bool + Send + Sync + 'static,
        handler: impl Fn(&mut Builder<'_>, NodeId, &str, &Yaml) -> Result<Vec<NodeId>> + Send + Sync + 'static,
    ) -> PatternRule {
        PatternRule {
            predicate: Arc::new(predicate),
            handler: Arc::new(handler),
        }
    }

    pub fn regex(
        regex: Regex,
        handler: impl Fn(&mut Builder<'_>, NodeId, &str, &Yaml) -> Result<Vec<NodeId>> + Send + Sync + 'static,
    ) -> PatternRule {
        Self::new(move |key| regex.is_match(key), handler)
    }

    pub fn matches(&self, key: &str) -> bool {
        (self.predicate)(key)
    }

    pub fn handler(&self) -> &PatternHandler {
        &self.handler
    }
}

impl fmt::Debug for PatternRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PatternRule")
    }
}

#[derive(Clone, Default)]
pub struct Schema {
    scalar_names: Vec<String>,
    non_scalars: LinkedHashMap<String, PropertyParser>,
    pattern_rule: Option<PatternRule>,
}

impl Schema {
    pub fn declare_scalar<S: AsRef<str>>(&mut self, names: &[S]) {
        for name in names {
            let name = name.as_ref();
            if !self.is_scalar(name) {
                self.scalar_names.push(name.to_string());
            }
        }
    }

    /// Redeclaring a name replaces its parser; the name keeps its position.
    pub fn declare_non_scalar<S: AsRef<str>>(&mut self, names: &[S], parser: PropertyParser) {
        for name in names {
            let name = name.as_ref();
            match self.non_scalars.get_mut(name) {
                Some(existing) => *existing = parser.clone(),
                None => {
                    self.non_scalars.insert(name.to_string(), parser.clone());
                }
            }
        }
    }

    /// A type has at most one pattern rule; a later declaration replaces it.
    pub fn declare_pattern(&mut self, rule: PatternRule) {
        self.pattern_rule = Some(rule);
    }

    pub fn is_scalar(&self, name: &str) -> bool {
        self.scalar_names.iter().any(|scalar| scalar == name)
    }

    pub fn is_non_scalar(&self, name: &str) -> bool {
        self.non_scalars.contains_key(name)
    }

    pub fn scalar_names(&self) -> impl Iterator<Item = &str> {
        self.scalar_names.iter().map(String::as_str)
    }

    pub fn non_scalar_names(&self) -> impl Iterator<Item = &str> {
        self.non_scalars.keys().map(String::as_str)
    }

    pub fn parser(&self, name: &str) -> Option<&PropertyParser> {
        self.non_scalars.get(name)
    }

    pub fn pattern_rule(&self) -> Option<&PatternRule> {
        self.pattern_rule.as_ref()
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("scalar_names", &self.scalar_names)
            .field("non_scalar_names", &self.non_scalars.keys().collect::<Vec<_>>())
            .field("pattern_rule", &self.pattern_rule.is_some())
            .finish()
    }
}

/// Optional per-type validation hooks. Every method defaults to accepting.
pub trait NodeHooks: Send + Sync {
    fn validate_name(&self, _name: &NodeName) -> Result<()> {
        Ok(())
    }

    fn validate_parent(&self, _tree: &Tree, _parent: Option<NodeId>) -> Result<()> {
        Ok(())
    }

    /// Runs after the scalar `property` has been stored on the node.
    fn validate_property(&self, _property: &str, _value: &Yaml) -> Result<()> {
        Ok(())
    }

    /// Runs once every property of a properties node has been consumed.
    fn validate_node(&self, _tree: &Tree, _id: NodeId) -> Result<()> {
        Ok(())
    }

    /// Runs right after a value node stores its value.
    fn validate_value(&self, _value: &Yaml) -> Result<()> {
        Ok(())
    }
}

pub struct NoHooks;

impl NodeHooks for NoHooks {}

pub struct TypeDef {
    name: String,
    kind: TypeKind,
    supertype: Option<TypeKey>,
    schema: Schema,
    hooks: Arc<dyn NodeHooks>,
    template_context: bool,
    document_root: bool,
    doc_template: Option<String>,
    pub(crate) compiled_doc: OnceCell<Handlebars<'static>>,
}

impl TypeDef {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    pub fn supertype(&self) -> Option<TypeKey> {
        self.supertype
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn hooks(&self) -> &Arc<dyn NodeHooks> {
        &self.hooks
    }

    pub fn is_template_context(&self) -> bool {
        self.template_context
    }

    pub fn is_document_root(&self) -> bool {
        self.document_root
    }

    pub fn doc_template(&self) -> Option<&str> {
        self.doc_template.as_deref()
    }
}

impl fmt::Debug for TypeDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDef")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("supertype", &self.supertype)
            .field("schema", &self.schema)
            .field("template_context", &self.template_context)
            .field("document_root", &self.document_root)
            .finish()
    }
}

/// The type-to-schema table. Filled in once while a grammar is defined and
/// read-only afterwards.
#[derive(Default, Debug)]
pub struct TypeRegistry {
    types: Vec<TypeDef>,
    by_name: HashMap<String, TypeKey>,
}

impl TypeRegistry {
    pub fn new() -> TypeRegistry {
        TypeRegistry::default()
    }

    /// Registers a type. A subtype starts from its own copy of the
    /// supertype's schema, hooks, flags and documentation template.
    pub fn define(&mut self, name: &str, kind: TypeKind, supertype: Option<TypeKey>) -> TypeDefiner<'_> {
        let def = match supertype {
            Some(supertype) => {
                let parent = &self.types[supertype.0];
                TypeDef {
                    name: name.to_string(),
                    kind,
                    supertype: Some(supertype),
                    schema: parent.schema.clone(),
                    hooks: parent.hooks.clone(),
                    template_context: parent.template_context,
                    document_root: parent.document_root,
                    doc_template: parent.doc_template.clone(),
                    compiled_doc: OnceCell::new(),
                }
            }
            None => TypeDef {
                name: name.to_string(),
                kind,
                supertype: None,
                schema: Schema::default(),
                hooks: Arc::new(NoHooks),
                template_context: false,
                document_root: false,
                doc_template: None,
                compiled_doc: OnceCell::new(),
            },
        };

        debug_assert!(!self.by_name.contains_key(name), "type '{}' defined twice", name);

        let key = TypeKey(self.types.len());
        self.types.push(def);
        self.by_name.insert(name.to_string(), key);
        TypeDefiner { registry: self, key }
    }

    /// Reopens a type for further declarations.
    pub fn definer(&mut self, key: TypeKey) -> TypeDefiner<'_> {
        TypeDefiner { registry: self, key }
    }

    pub fn get(&self, key: TypeKey) -> &TypeDef {
        &self.types[key.0]
    }

    pub fn lookup(&self, name: &str) -> Option<TypeKey> {
        self.by_name.get(name).copied()
    }

    pub fn schema(&self, key: TypeKey) -> &Schema {
        &self.get(key).schema
    }

    pub fn type_name(&self, key: TypeKey) -> &str {
        &self.get(key).name
    }

    pub fn is_template_context(&self, key: TypeKey) -> bool {
        self.get(key).template_context
    }

    pub fn is_document_root(&self, key: TypeKey) -> bool {
        self.get(key).document_root
    }

    /// True when `key` is `ancestor` or was defined from it, directly or not.
    pub fn is_subtype_of(&self, key: TypeKey, ancestor: TypeKey) -> bool {
        let mut current = Some(key);
        while let Some(key) = current {
            if key == ancestor {
                return true;
            }
            current = self.get(key).supertype;
        }
        false
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

pub struct TypeDefiner<'a> {
    registry: &'a mut TypeRegistry,
    key: TypeKey,
}

impl TypeDefiner<'_> {
    fn def(&mut self) -> &mut TypeDef {
        &mut self.registry.types[self.key.0]
    }

    pub fn declare_scalar<S: AsRef<str>>(mut self, names: &[S]) -> Self {
        self.def().schema.declare_scalar(names);
        self
    }

    pub fn declare_non_scalar<S: AsRef<str>>(
        mut self,
        names: &[S],
        parser: impl Fn(&mut Builder<'_>, NodeId, &str, &Yaml) -> Result<Vec<NodeId>> + Send + Sync + 'static,
    ) -> Self {
        self.def().schema.declare_non_scalar(names, Arc::new(parser));
        self
    }

    pub fn declare_pattern(mut self, rule: PatternRule) -> Self {
        self.def().schema.declare_pattern(rule);
        self
    }

    pub fn hooks(mut self, hooks: impl NodeHooks + 'static) -> Self {
        self.def().hooks = Arc::new(hooks);
        self
    }

    pub fn template_context(mut self) -> Self {
        self.def().template_context = true;
        self
    }

    pub fn document_root(mut self) -> Self {
        self.def().document_root = true;
        self
    }

    pub fn doc_template(mut self, template: &str) -> Self {
        let def = self.def();
        def.doc_template = Some(template.to_string());
        def.compiled_doc = OnceCell::new();
        self
    }

    pub fn key(&self) -> TypeKey {
        self.key
    }
}
