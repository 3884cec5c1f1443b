use regex::Regex;

use super::*;
use crate::{
    cow_yaml::parse_yaml_str,
    schema::{NodeHooks, PatternRule},
};

struct Types {
    t: TypeKey,
    header: TypeKey,
    extension: TypeKey,
    template: TypeKey,
    root: TypeKey,
    plain: TypeKey,
}

struct LimitHooks;

impl NodeHooks for LimitHooks {
    fn validate_property(&self, property: &str, value: &Yaml) -> Result<()> {
        match (property, value) {
            ("max_length", Yaml::Integer(len)) if *len >= 0 => Ok(()),
            ("max_length", _) => Err(Error::invalid("maxLength must be a non-negative integer")),
            _ => Ok(()),
        }
    }

    fn validate_node(&self, tree: &Tree, id: NodeId) -> Result<()> {
        match tree.scalar(id, "required") {
            Some(Yaml::Boolean(true)) if tree.scalar(id, "default").is_some() => {
                Err(Error::invalid("a required property cannot have a default"))
            }
            _ => Ok(()),
        }
    }
}

struct HeaderHooks;

impl NodeHooks for HeaderHooks {
    fn validate_value(&self, value: &Yaml) -> Result<()> {
        match value {
            Yaml::Integer(_) => Ok(()),
            _ => Err(Error::invalid(format!("header value must be an integer, found {}", value.type_name()))),
        }
    }
}

struct NoDigitsHooks;

impl NodeHooks for NoDigitsHooks {
    fn validate_name(&self, name: &NodeName) -> Result<()> {
        match name {
            NodeName::Str(name) if name.chars().any(|c| c.is_ascii_digit()) => {
                Err(Error::invalid(format!("name '{}' must not contain digits", name)))
            }
            _ => Ok(()),
        }
    }
}

fn registry() -> (TypeRegistry, Types) {
    let mut registry = TypeRegistry::new();

    let header = registry.define("Header", TypeKind::Value, None).hooks(HeaderHooks).key();
    let extension = registry.define("Extension", TypeKind::Value, None).key();

    let t = registry
        .define("T", TypeKind::Properties, None)
        .declare_scalar(&["max_length", "required", "default"])
        .declare_non_scalar(&["headers"], move |builder, id, _name, value| {
            builder.build_named(header, value, id)
        })
        .declare_pattern(PatternRule::regex(
            Regex::new("^x-").unwrap(),
            move |builder, id, key, value| Ok(vec![builder.build_value(extension, key, value, Some(id))?]),
        ))
        .hooks(LimitHooks)
        .key();

    let template = registry
        .define("Template", TypeKind::Properties, None)
        .template_context()
        .key();
    let root = registry.define("Root", TypeKind::Properties, None).document_root().key();
    let plain = registry
        .define("Plain", TypeKind::Properties, None)
        .hooks(NoDigitsHooks)
        .key();

    let types = Types {
        t,
        header,
        extension,
        template,
        root,
        plain,
    };
    (registry, types)
}

fn yaml(src: &str) -> Yaml {
    parse_yaml_str(src).unwrap().remove(0)
}

fn hash(src: &str) -> YamlHash {
    yaml(src).as_hash().unwrap().clone()
}

#[test]
fn scalar_property_assigned() {
    let (registry, types) = registry();
    let (tree, id) = build_document(&registry, types.t, "t", &yaml("maxLength: 10")).unwrap();
    assert_eq!(tree.scalar(id, "max_length"), Some(&Yaml::Integer(10)));
    assert_eq!(tree.scalar(id, "required"), None);
    assert!(!tree.is_optional(id));
    assert!(tree.children(id).is_empty());
}

#[test]
fn scalar_property_accepts_identifier_form() {
    let (registry, types) = registry();
    let (tree, id) = build_document(&registry, types.t, "t", &yaml("max_length: 3")).unwrap();
    assert_eq!(tree.scalar(id, "max_length"), Some(&Yaml::Integer(3)));
}

#[test]
fn classifies_scalar_non_scalar_and_pattern_keys() {
    let (registry, types) = registry();
    let value = yaml("maxLength: 10\nx-custom: v\nheaders:\n  A: 1\n  B: 2\n");
    let (tree, id) = build_document(&registry, types.t, "t", &value).unwrap();

    assert_eq!(tree.scalar(id, "max_length"), Some(&Yaml::Integer(10)));

    let children = tree.children(id);
    assert_eq!(children.len(), 3);

    let custom = tree.node(children[0]);
    assert_eq!(custom.type_key, types.extension);
    assert_eq!(custom.name, NodeName::from("x-custom"));
    assert_eq!(custom.value(), Some(&Yaml::from("v")));

    let names: Vec<String> = children[1..].iter().map(|child| tree.name(*child).to_string()).collect();
    assert_eq!(names, vec!["A", "B"]);
    assert_eq!(tree.value(children[2]), Some(&Yaml::Integer(2)));

    for child in children {
        assert_eq!(tree.parent(*child), Some(id));
        assert_eq!(tree.node(*child).parent, Some(id));
    }
    assert_eq!(tree.node(children[1]).type_key, types.header);
}

#[test]
fn unknown_property_fails() {
    let (registry, types) = registry();
    let err = build_document(&registry, types.t, "t", &yaml("bogus: 1")).unwrap_err();
    assert_eq!(err, Error::unknown("bogus", Yaml::Integer(1)));
}

#[test]
fn pattern_matches_original_key_only() {
    let (registry, types) = registry();
    // "X-Custom" normalizes to "x_custom", but the rule sees the original key.
    let err = build_document(&registry, types.t, "t", &yaml("X-Custom: v")).unwrap_err();
    assert!(matches!(err, Error::UnknownProperty { ref key, .. } if key == "X-Custom"));
}

#[test]
fn failure_discards_partial_node() {
    let (registry, types) = registry();
    let mut tree = Tree::new();
    let mut builder = Builder::new(&registry, &mut tree);

    let props = hash("headers:\n  A: 1\nmaxLength: 2\nbogus: true\n");
    let err = builder.build_properties(types.t, "t", &props, None).unwrap_err();
    assert!(matches!(err, Error::UnknownProperty { .. }));
    assert!(tree.is_empty());
}

#[test]
fn nested_failure_propagates_unchanged() {
    let (registry, types) = registry();
    let err = build_document(&registry, types.t, "t", &yaml("headers:\n  A: one\n")).unwrap_err();
    assert_eq!(err, Error::invalid("header value must be an integer, found string"));
}

#[test]
fn property_validation_runs_after_assignment() {
    let (registry, types) = registry();
    let err = build_document(&registry, types.t, "t", &yaml("maxLength: -1")).unwrap_err();
    assert_eq!(err, Error::invalid("maxLength must be a non-negative integer"));
}

#[test]
fn node_validation_sees_all_properties() {
    let (registry, types) = registry();
    let err = build_document(&registry, types.t, "t", &yaml("required: true\ndefault: 1\n")).unwrap_err();
    assert_eq!(err, Error::invalid("a required property cannot have a default"));

    let ok = build_document(&registry, types.t, "t", &yaml("required: true\n"));
    assert!(ok.is_ok());
}

#[test]
fn name_validation() {
    let (registry, types) = registry();
    let err = build_document(&registry, types.plain, "v2", &Yaml::Null).unwrap_err();
    assert_eq!(err, Error::invalid("name 'v2' must not contain digits"));

    let (tree, id) = build_document(&registry, types.plain, "v", &Yaml::Null).unwrap();
    assert_eq!(tree.name(id), &NodeName::from("v"));
}

#[test]
fn properties_type_rejects_non_map() {
    let (registry, types) = registry();
    let err = build_document(&registry, types.t, "t", &yaml("[1, 2]")).unwrap_err();
    assert_eq!(err, Error::invalid("'t' must be a map, found list"));
}

#[test]
fn optional_marker_inside_template() {
    let (registry, types) = registry();
    let mut tree = Tree::new();
    let mut builder = Builder::new(&registry, &mut tree);

    let template = builder.build_properties(types.template, "tmpl", &YamlHash::new(), None).unwrap();
    let middle = builder.build_properties(types.plain, "middle", &YamlHash::new(), Some(template)).unwrap();
    let child = builder
        .build_properties(types.t, "size?", &hash("maxLength: 1"), Some(middle))
        .unwrap();

    assert!(tree.is_optional(child));
    assert_eq!(tree.name(child), &NodeName::from("size"));
    assert_eq!(tree.scalar(child, "max_length"), Some(&Yaml::Integer(1)));
}

#[test]
fn optional_marker_outside_template() {
    let (registry, types) = registry();
    let mut tree = Tree::new();
    let mut builder = Builder::new(&registry, &mut tree);

    let root = builder.build_properties(types.root, "root", &YamlHash::new(), None).unwrap();
    let middle = builder.build_properties(types.plain, "middle", &YamlHash::new(), Some(root)).unwrap();
    let err = builder
        .build_properties(types.t, "size?", &YamlHash::new(), Some(middle))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidProperty(_)));
    assert_eq!(tree.len(), 2);
}

#[test]
fn optional_marker_stops_at_document_root() {
    let (registry, types) = registry();
    let mut tree = Tree::new();
    let mut builder = Builder::new(&registry, &mut tree);

    // A template above the document root does not count.
    let template = builder.build_properties(types.template, "tmpl", &YamlHash::new(), None).unwrap();
    let root = builder.build_properties(types.root, "root", &YamlHash::new(), Some(template)).unwrap();
    let err = builder.build_properties(types.t, "a?", &YamlHash::new(), Some(root)).unwrap_err();
    assert!(matches!(err, Error::InvalidProperty(_)));
}

#[test]
fn optional_marker_without_parent() {
    let (registry, types) = registry();
    let err = build_document(&registry, types.t, "a?", &Yaml::Null).unwrap_err();
    assert!(matches!(err, Error::InvalidProperty(_)));
}

#[test]
fn integer_names_are_never_optional() {
    let (registry, types) = registry();
    let (tree, id) = build_document(&registry, types.plain, 404i64, &Yaml::Null).unwrap();
    assert_eq!(tree.name(id), &NodeName::Int(404));
    assert!(!tree.is_optional(id));
}

#[test]
fn value_node_validation_failure_leaves_nothing() {
    let (registry, types) = registry();
    let mut tree = Tree::new();
    let mut builder = Builder::new(&registry, &mut tree);

    let err = builder.build_value(types.header, "A", &Yaml::from("x"), None).unwrap_err();
    assert_eq!(err, Error::invalid("header value must be an integer, found string"));
    assert!(tree.is_empty());
}

#[test]
fn build_named_reads_list_of_maps() {
    let (registry, types) = registry();
    let mut tree = Tree::new();
    let mut builder = Builder::new(&registry, &mut tree);

    let parent = builder.build_properties(types.plain, "p", &YamlHash::new(), None).unwrap();
    let ids = builder
        .build_named(types.header, &yaml("- A: 1\n- B: 2\n  C: 3\n"), parent)
        .unwrap();
    let names: Vec<String> = ids.iter().map(|id| tree.name(*id).to_string()).collect();
    assert_eq!(names, vec!["A", "B", "C"]);
}

struct NeedsParentHooks;

impl NodeHooks for NeedsParentHooks {
    fn validate_parent(&self, _tree: &Tree, parent: Option<NodeId>) -> Result<()> {
        match parent {
            Some(_) => Ok(()),
            None => Err(Error::invalid("needs a parent")),
        }
    }
}

#[test]
fn parent_check_failure_leaves_nothing() {
    let mut registry = TypeRegistry::new();
    let member = registry
        .define("Member", TypeKind::Properties, None)
        .declare_scalar(&["label"])
        .hooks(NeedsParentHooks)
        .key();
    let group = registry
        .define("Group", TypeKind::Properties, None)
        .declare_non_scalar(&["members"], move |builder, id, _name, value| {
            builder.build_named(member, value, id)
        })
        .key();

    let mut tree = Tree::new();
    let mut builder = Builder::new(&registry, &mut tree);
    let err = builder
        .build_properties(member, "k", &yaml("label: x\n").as_hash().unwrap().clone(), None)
        .unwrap_err();
    assert_eq!(err, Error::invalid("needs a parent"));
    assert!(tree.is_empty());

    let (tree, root) = build_document(&registry, group, "g", &yaml("members:\n  a: {label: x}\n")).unwrap();
    let a = tree.find_child(root, &NodeName::from("a")).unwrap();
    assert_eq!(tree.parent(a), Some(root));
    assert_eq!(tree.scalar(a, "label"), Some(&Yaml::from("x")));
}
