use std::collections::HashSet;

use super::*;
use crate::{
    builder::build_document,
    cow_yaml::parse_yaml_str,
    schema::{TypeKind, TypeRegistry},
};

// Node types: every key of a map becomes a child "Item"; scalars named "label".
fn registry() -> (TypeRegistry, TypeKey) {
    let mut registry = TypeRegistry::new();
    let leaf = registry.define("Leaf", TypeKind::Value, None).key();
    let item = registry
        .define("Item", TypeKind::Properties, None)
        .declare_scalar(&["label"])
        .key();
    registry.definer(item).declare_pattern(crate::schema::PatternRule::new(
        |key| key.starts_with('/'),
        move |builder, id, key, value| Ok(vec![builder.build(item, key, value, Some(id))?]),
    ));
    registry.definer(item).declare_non_scalar(&["leaves"], move |builder, id, _name, value| {
        builder.build_named(leaf, value, id)
    });
    (registry, item)
}

fn build(src: &str) -> (Tree, NodeId) {
    let (registry, item) = registry();
    let value = parse_yaml_str(src).unwrap().remove(0);
    build_document(&registry, item, "root", &value).unwrap()
}

const DEEP: &str = "
label: root
/a:
  label: a
  /b:
    label: b
    /c:
      leaves:
        x: 1
/d: {}
";

#[test]
fn node_name_from_key() {
    assert_eq!(NodeName::from_key(&Yaml::Integer(200)), Some(NodeName::Int(200)));
    assert_eq!(NodeName::from_key(&Yaml::from("get")), Some(NodeName::from("get")));
    assert_eq!(NodeName::from_key(&Yaml::Boolean(true)), Some(NodeName::from("true")));
    assert_eq!(NodeName::Int(7).to_string(), "7");
    assert_eq!(NodeName::from("201").as_int(), Some(201));
}

#[test]
fn strip_optional_marker() {
    assert_eq!(NodeName::from("get?").strip_optional(), Some(NodeName::from("get")));
    assert_eq!(NodeName::from("get").strip_optional(), None);
    assert_eq!(NodeName::Int(1).strip_optional(), None);
}

#[test]
fn ancestors_nearest_first() {
    let (tree, root) = build(DEEP);
    let a = tree.find_child(root, &NodeName::from("/a")).unwrap();
    let b = tree.find_child(a, &NodeName::from("/b")).unwrap();
    let c = tree.find_child(b, &NodeName::from("/c")).unwrap();

    assert_eq!(tree.ancestors(c).collect::<Vec<_>>(), vec![b, a, root]);
    assert_eq!(tree.ancestors(root).count(), 0);
}

#[test]
fn descendants_depth_first() {
    let (tree, root) = build(DEEP);
    let names: Vec<String> = tree
        .descendants(root)
        .into_iter()
        .map(|id| tree.name(id).to_string())
        .collect();
    assert_eq!(names, vec!["root", "/a", "/b", "/c", "x", "/d"]);
}

#[test]
fn clone_subtree_is_isomorphic_and_disjoint() {
    let (mut tree, root) = build(DEEP);
    let a = tree.find_child(root, &NodeName::from("/a")).unwrap();
    let before = tree.len();

    let copy = tree.clone_subtree(a, Some(root));

    let originals = tree.descendants(a);
    let copies = tree.descendants(copy);

    // "/a", "/b", "/c" and the leaf "x".
    assert_eq!(originals.len(), 4);
    assert_eq!(copies.len(), originals.len());
    assert_eq!(tree.len(), before + copies.len());

    let original_set: HashSet<NodeId> = originals.iter().copied().collect();
    assert!(copies.iter().all(|id| !original_set.contains(id)));

    for (original, copied) in originals.iter().zip(copies.iter()) {
        let original = tree.node(*original);
        let copied_node = tree.node(*copied);
        assert_eq!(original.name, copied_node.name);
        assert_eq!(original.type_key, copied_node.type_key);
        assert_eq!(original.children().len(), copied_node.children().len());
        assert_eq!(original.scalar("label"), copied_node.scalar("label"));
        assert_eq!(original.value(), copied_node.value());

        for child in copied_node.children() {
            assert_eq!(tree.parent(*child), Some(*copied));
        }
    }

    assert_eq!(tree.parent(copy), Some(root));
    // Cloning does not attach the copy.
    assert_eq!(tree.children(root).len(), 2);
}

#[test]
fn clone_leaves_source_untouched() {
    let (mut tree, root) = build(DEEP);
    let a = tree.find_child(root, &NodeName::from("/a")).unwrap();
    let snapshot: Vec<Node> = tree.descendants(a).into_iter().map(|id| tree.node(id).clone()).collect();

    let copy = tree.clone_subtree(a, None);
    tree.set_scalar(copy, "label", Yaml::from("changed"));

    let after: Vec<Node> = tree.descendants(a).into_iter().map(|id| tree.node(id).clone()).collect();
    assert_eq!(snapshot.len(), after.len());
    for (left, right) in snapshot.iter().zip(after.iter()) {
        assert_eq!(left.name, right.name);
        assert_eq!(left.parent, right.parent);
        assert_eq!(left.data, right.data);
    }
    assert_eq!(tree.scalar(a, "label"), Some(&Yaml::from("a")));
    assert_eq!(tree.parent(copy), None);
}

#[test]
fn append_child_reparents() {
    let (mut tree, root) = build(DEEP);
    let a = tree.find_child(root, &NodeName::from("/a")).unwrap();
    let d = tree.find_child(root, &NodeName::from("/d")).unwrap();

    let copy = tree.clone_subtree(a, None);
    tree.append_child(d, copy);

    assert_eq!(tree.parent(copy), Some(d));
    assert_eq!(tree.children(d), &[copy]);
}
