//! Java adapter over tree-sitter.
//!
//! Lowers the tree-sitter-java syntax tree into [`SourceUnit`]. A tree that
//! contains any error node is rejected as a whole so the dispatcher can
//! degrade the file instead of emitting half-recovered declarations.

use tree_sitter::{Node, Parser};

use super::helpers::{
    erase_type, find_child_by_type, first_named_child_except, get_end_line, get_node_text,
    get_start_line,
};
use super::tree::{
    FieldDecl, ImportDecl, MethodDecl, ParamDecl, SourceUnit, SyntaxNode, TypeDecl, TypeKind,
};

const MODIFIER_KEYWORDS: &[&str] = &[
    "public",
    "protected",
    "private",
    "abstract",
    "static",
    "final",
    "strictfp",
    "default",
    "synchronized",
    "native",
    "transient",
    "volatile",
    "sealed",
    "non-sealed",
];

/// Parse Java source code.
pub fn parse(source: &str) -> Result<SourceUnit, String> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_java::LANGUAGE.into())
        .map_err(|e| format!("Failed to set Java language: {}", e))?;

    let tree = parser
        .parse(source, None)
        .ok_or("Failed to parse Java source")?;
    let root = tree.root_node();

    if root.has_error() {
        let line = first_error_line(&root).unwrap_or(1);
        return Err(format!("syntax error at line {}", line));
    }

    let mut unit = SourceUnit::default();
    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        match child.kind() {
            "package_declaration" => {
                unit.package = extract_package(&child, source);
            }
            "import_declaration" => {
                if let Some(import) = extract_import(&child, source) {
                    unit.imports.push(import);
                }
            }
            kind if type_kind(kind).is_some() => {
                unit.nodes.push(SyntaxNode::TypeDecl(extract_type(&child, source)));
            }
            _ => {}
        }
    }

    Ok(unit)
}

fn first_error_line(node: &Node) -> Option<u32> {
    if node.is_error() || node.is_missing() {
        return Some(get_start_line(node));
    }
    let mut cursor = node.walk();
    let children: Vec<Node> = node.children(&mut cursor).collect();
    children
        .iter()
        .filter(|child| child.has_error())
        .find_map(first_error_line)
}

fn type_kind(kind: &str) -> Option<TypeKind> {
    match kind {
        "class_declaration" => Some(TypeKind::Class),
        "interface_declaration" => Some(TypeKind::Interface),
        "enum_declaration" => Some(TypeKind::Enum),
        "record_declaration" => Some(TypeKind::Record),
        "annotation_type_declaration" => Some(TypeKind::Annotation),
        _ => None,
    }
}

fn extract_package(node: &Node, source: &str) -> Option<String> {
    find_child_by_type(node, "scoped_identifier")
        .or_else(|| find_child_by_type(node, "identifier"))
        .map(|id| get_node_text(&id, source).to_string())
}

fn extract_import(node: &Node, source: &str) -> Option<ImportDecl> {
    let mut path = String::new();
    let mut is_static = false;
    let mut is_wildcard = false;

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "scoped_identifier" | "identifier" => {
                path = get_node_text(&child, source).to_string();
            }
            "asterisk" => is_wildcard = true,
            "static" => is_static = true,
            _ => {}
        }
    }

    if path.is_empty() {
        None
    } else {
        Some(ImportDecl::new(path, is_static, is_wildcard))
    }
}

/// Keyword modifiers, sorted and de-duplicated. Annotations are skipped.
fn extract_modifiers(node: &Node) -> Vec<String> {
    let mut modifiers = Vec::new();
    if let Some(mods) = find_child_by_type(node, "modifiers") {
        let mut cursor = mods.walk();
        for child in mods.children(&mut cursor) {
            if MODIFIER_KEYWORDS.contains(&child.kind()) {
                modifiers.push(child.kind().to_string());
            }
        }
    }
    modifiers.sort();
    modifiers.dedup();
    modifiers
}

fn type_list(node: &Node, source: &str) -> Vec<String> {
    let mut refs = Vec::new();
    if let Some(list) = find_child_by_type(node, "type_list") {
        let mut cursor = list.walk();
        for ty in list.named_children(&mut cursor) {
            refs.push(erase_type(get_node_text(&ty, source)));
        }
    }
    refs
}

fn extract_type(node: &Node, source: &str) -> TypeDecl {
    let kind = type_kind(node.kind()).unwrap_or_default();
    let mut decl = TypeDecl {
        name: node
            .child_by_field_name("name")
            .map(|n| get_node_text(&n, source).to_string())
            .unwrap_or_default(),
        kind,
        modifiers: extract_modifiers(node),
        start_line: get_start_line(node),
        end_line: get_end_line(node),
        ..Default::default()
    };

    if let Some(superclass) = node
        .child_by_field_name("superclass")
        .or_else(|| find_child_by_type(node, "superclass"))
    {
        if let Some(ty) = first_named_child_except(&superclass, &[]) {
            decl.extends.push(erase_type(get_node_text(&ty, source)));
        }
    }
    if let Some(extends) = find_child_by_type(node, "extends_interfaces") {
        decl.extends.extend(type_list(&extends, source));
    }
    if let Some(interfaces) = node
        .child_by_field_name("interfaces")
        .or_else(|| find_child_by_type(node, "super_interfaces"))
    {
        decl.implements.extend(type_list(&interfaces, source));
    }

    let mut record_params = Vec::new();
    if kind == TypeKind::Record {
        if let Some(params) = node
            .child_by_field_name("parameters")
            .or_else(|| find_child_by_type(node, "formal_parameters"))
        {
            record_params = extract_parameters(&params, source);
            for param in &record_params {
                decl.members.push(SyntaxNode::FieldDecl(FieldDecl {
                    type_name: Some(param.type_name.clone()),
                    names: vec![param.name.clone()],
                    modifiers: vec!["final".to_string(), "private".to_string()],
                }));
            }
        }
    }

    if let Some(body) = node.child_by_field_name("body") {
        decl.members
            .extend(extract_members(&body, source, &decl.name, &record_params));
    }

    decl
}

fn extract_members(
    body: &Node,
    source: &str,
    type_name: &str,
    record_params: &[ParamDecl],
) -> Vec<SyntaxNode> {
    let mut members = Vec::new();
    let mut cursor = body.walk();
    for child in body.named_children(&mut cursor) {
        match child.kind() {
            "method_declaration" | "annotation_type_element_declaration" => {
                members.push(SyntaxNode::MethodDecl(extract_method(&child, source)));
            }
            "constructor_declaration" => {
                members.push(SyntaxNode::MethodDecl(extract_constructor(
                    &child, source, type_name, None,
                )));
            }
            "compact_constructor_declaration" => {
                members.push(SyntaxNode::MethodDecl(extract_constructor(
                    &child,
                    source,
                    type_name,
                    Some(record_params),
                )));
            }
            "field_declaration" | "constant_declaration" => {
                members.push(SyntaxNode::FieldDecl(extract_field(&child, source)));
            }
            "enum_body_declarations" => {
                members.extend(extract_members(&child, source, type_name, record_params));
            }
            "block" | "static_initializer" => {
                let children = local_types(&child, source);
                if !children.is_empty() {
                    members.push(SyntaxNode::Generic { children });
                }
            }
            kind if type_kind(kind).is_some() => {
                members.push(SyntaxNode::TypeDecl(extract_type(&child, source)));
            }
            _ => {}
        }
    }
    members
}

/// Type declarations inside an initializer block, at any statement depth.
fn local_types(node: &Node, source: &str) -> Vec<SyntaxNode> {
    let mut found = Vec::new();
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if type_kind(child.kind()).is_some() {
            found.push(SyntaxNode::TypeDecl(extract_type(&child, source)));
        } else {
            found.extend(local_types(&child, source));
        }
    }
    found
}

fn extract_method(node: &Node, source: &str) -> MethodDecl {
    MethodDecl {
        name: node
            .child_by_field_name("name")
            .map(|n| get_node_text(&n, source).to_string())
            .unwrap_or_default(),
        is_constructor: false,
        params: node
            .child_by_field_name("parameters")
            .map(|p| extract_parameters(&p, source))
            .unwrap_or_default(),
        return_type: node
            .child_by_field_name("type")
            .map(|t| declared_type(get_node_text(&t, source))),
        modifiers: extract_modifiers(node),
        body: node
            .child_by_field_name("body")
            .map(|b| get_node_text(&b, source).to_string()),
        start_line: get_start_line(node),
        end_line: get_end_line(node),
    }
}

fn extract_constructor(
    node: &Node,
    source: &str,
    type_name: &str,
    record_params: Option<&[ParamDecl]>,
) -> MethodDecl {
    let params = match record_params {
        Some(params) => params.to_vec(),
        None => node
            .child_by_field_name("parameters")
            .map(|p| extract_parameters(&p, source))
            .unwrap_or_default(),
    };

    MethodDecl {
        name: type_name.to_string(),
        is_constructor: true,
        params,
        return_type: None,
        modifiers: extract_modifiers(node),
        body: node
            .child_by_field_name("body")
            .map(|b| get_node_text(&b, source).to_string()),
        start_line: get_start_line(node),
        end_line: get_end_line(node),
    }
}

fn extract_parameters(node: &Node, source: &str) -> Vec<ParamDecl> {
    let mut params = Vec::new();
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "formal_parameter" => {
                let mut type_name = child
                    .child_by_field_name("type")
                    .map(|t| erase_type(get_node_text(&t, source)))
                    .unwrap_or_else(|| "?".to_string());
                // `String args[]`
                if let Some(dims) = child.child_by_field_name("dimensions") {
                    type_name.push_str(&erase_type(get_node_text(&dims, source)));
                }
                let name = child
                    .child_by_field_name("name")
                    .map(|n| get_node_text(&n, source).to_string())
                    .unwrap_or_default();
                params.push(ParamDecl { name, type_name });
            }
            "spread_parameter" => {
                let type_name = first_named_child_except(
                    &child,
                    &["modifiers", "variable_declarator", "marker_annotation", "annotation"],
                )
                .map(|t| format!("{}...", erase_type(get_node_text(&t, source))))
                .unwrap_or_else(|| "?...".to_string());
                let name = find_child_by_type(&child, "variable_declarator")
                    .and_then(|d| d.child_by_field_name("name"))
                    .map(|n| get_node_text(&n, source).to_string())
                    .unwrap_or_default();
                params.push(ParamDecl { name, type_name });
            }
            _ => {}
        }
    }
    params
}

fn extract_field(node: &Node, source: &str) -> FieldDecl {
    let mut names = Vec::new();
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind() == "variable_declarator" {
            if let Some(name) = child.child_by_field_name("name") {
                names.push(get_node_text(&name, source).to_string());
            }
        }
    }

    FieldDecl {
        type_name: node
            .child_by_field_name("type")
            .map(|t| declared_type(get_node_text(&t, source))),
        names,
        modifiers: extract_modifiers(node),
    }
}

/// Declared type as written, with whitespace inside type arguments collapsed.
fn declared_type(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace(", ", ",")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn only_type(unit: &SourceUnit) -> &TypeDecl {
        match &unit.nodes[..] {
            [SyntaxNode::TypeDecl(decl)] => decl,
            other => panic!("expected one type, got {:?}", other),
        }
    }

    fn methods(decl: &TypeDecl) -> Vec<&MethodDecl> {
        decl.members
            .iter()
            .filter_map(|m| match m {
                SyntaxNode::MethodDecl(method) => Some(method),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_parse_class() {
        let source = r#"
package com.example;

import java.util.List;
import static java.lang.Math.*;

public class Hello extends Base<String> implements Runnable, Comparable<Hello> {
    private final List<String> names, aliases;

    public Hello(int size) { }

    public String greet(String name, int... times) {
        return "Hello, " + name;
    }

    public abstract void run();
}
"#;
        let unit = parse(source).unwrap();
        assert_eq!(unit.package.as_deref(), Some("com.example"));
        assert_eq!(unit.imports.len(), 2);
        assert!(unit.imports[1].is_static);
        assert!(unit.imports[1].is_wildcard);
        assert_eq!(unit.imports[1].path, "java.lang.Math");

        let decl = only_type(&unit);
        assert_eq!(decl.name, "Hello");
        assert_eq!(decl.kind, TypeKind::Class);
        assert_eq!(decl.extends, vec!["Base"]);
        assert_eq!(decl.implements, vec!["Runnable", "Comparable"]);
        assert_eq!(decl.modifiers, vec!["public"]);

        let field = decl
            .members
            .iter()
            .find_map(|m| match m {
                SyntaxNode::FieldDecl(f) => Some(f),
                _ => None,
            })
            .unwrap();
        assert_eq!(field.names, vec!["names", "aliases"]);
        assert_eq!(field.type_name.as_deref(), Some("List<String>"));
        assert_eq!(field.modifiers, vec!["final", "private"]);

        let methods = methods(decl);
        assert_eq!(methods.len(), 3);
        assert!(methods[0].is_constructor);
        assert_eq!(methods[0].name, "Hello");
        assert_eq!(methods[0].params[0].type_name, "int");

        assert_eq!(methods[1].name, "greet");
        assert_eq!(methods[1].return_type.as_deref(), Some("String"));
        let types: Vec<&str> = methods[1]
            .params
            .iter()
            .map(|p| p.type_name.as_str())
            .collect();
        assert_eq!(types, vec!["String", "int..."]);
        assert_eq!(methods[1].params[1].name, "times");
        assert!(methods[1].body.is_some());
        assert_eq!(methods[1].start_line, 12);
        assert_eq!(methods[1].end_line, 14);

        assert!(methods[2].body.is_none());
        assert_eq!(methods[2].return_type.as_deref(), Some("void"));
    }

    #[test]
    fn test_parse_nested_and_interface() {
        let source = r#"
interface Shape extends Comparable<Shape>, java.io.Serializable {
    double area();
    enum Unit { CM, MM; int scale() { return 1; } }
}
"#;
        let unit = parse(source).unwrap();
        let decl = only_type(&unit);
        assert_eq!(decl.kind, TypeKind::Interface);
        assert_eq!(decl.extends, vec!["Comparable", "java.io.Serializable"]);

        let nested: Vec<&TypeDecl> = SyntaxNode::type_decls(&decl.members);
        assert_eq!(nested.len(), 1);
        assert_eq!(nested[0].name, "Unit");
        assert_eq!(nested[0].kind, TypeKind::Enum);
        assert_eq!(methods(nested[0])[0].name, "scale");
    }

    #[test]
    fn test_parse_record() {
        let source = "record Point(int x, int y) { Point { } }";
        let unit = parse(source).unwrap();
        let decl = only_type(&unit);
        assert_eq!(decl.kind, TypeKind::Record);

        let fields = decl
            .members
            .iter()
            .filter(|m| matches!(m, SyntaxNode::FieldDecl(_)))
            .count();
        assert_eq!(fields, 2);

        let ctor = methods(decl)[0];
        assert!(ctor.is_constructor);
        assert_eq!(ctor.params.len(), 2);
    }

    #[test]
    fn test_parse_local_class_in_initializer() {
        let source = "class Outer { static { class Helper { } } }";
        let unit = parse(source).unwrap();
        let decl = only_type(&unit);
        match &decl.members[..] {
            [SyntaxNode::Generic { children }] => {
                assert_eq!(SyntaxNode::type_decls(children)[0].name, "Helper");
            }
            other => panic!("unexpected members {:?}", other),
        }
    }

    #[test]
    fn test_syntax_error_is_rejected() {
        let err = parse("package a;\nclass Broken {\n  void f( {\n}\n").unwrap_err();
        assert!(err.contains("syntax error"));
    }

    #[test]
    fn test_empty_source() {
        let unit = parse("").unwrap();
        assert!(unit.package.is_none());
        assert!(unit.nodes.is_empty());
    }
}
