//! Helper functions for tree-sitter navigation and type-name erasure.

use tree_sitter::Node;

/// Get the text content of a node.
pub fn get_node_text<'a>(node: &Node, source: &'a str) -> &'a str {
    let start = node.start_byte();
    let end = node.end_byte();
    if start < source.len() && end <= source.len() && start < end {
        &source[start..end]
    } else {
        ""
    }
}

/// Find the first child of a specific kind.
#[allow(clippy::manual_find)]
pub fn find_child_by_type<'a>(node: &Node<'a>, type_name: &str) -> Option<Node<'a>> {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == type_name {
            return Some(child);
        }
    }
    None
}

/// First named child that is not one of `skip`.
pub fn first_named_child_except<'a>(node: &Node<'a>, skip: &[&str]) -> Option<Node<'a>> {
    let mut cursor = node.walk();
    let found = node
        .named_children(&mut cursor)
        .find(|child| !skip.contains(&child.kind()));
    found
}

/// Get line number (1-indexed) from a node.
pub fn get_start_line(node: &Node) -> u32 {
    node.start_position().row as u32 + 1
}

/// Get end line number (1-indexed) from a node.
pub fn get_end_line(node: &Node) -> u32 {
    node.end_position().row as u32 + 1
}

/// Remove every balanced `<...>` group from a type name.
pub fn strip_type_arguments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut depth = 0usize;
    for c in text.chars() {
        match c {
            '<' => depth += 1,
            '>' if depth > 0 => depth -= 1,
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

/// Erase a declared type the way signatures spell it: type arguments and
/// annotations dropped, whitespace removed, array suffixes kept.
///
/// `@NonNull List<String> []` becomes `List[]`.
pub fn erase_type(text: &str) -> String {
    let stripped = strip_type_arguments(text);
    let mut parts = Vec::new();
    let mut tokens = stripped.split_whitespace().peekable();
    while let Some(token) = tokens.next() {
        if let Some(rest) = token.strip_prefix('@') {
            // annotation arguments: `@Size(max = 3)`
            if rest.contains('(') && !rest.contains(')') {
                for next in tokens.by_ref() {
                    if next.contains(')') {
                        break;
                    }
                }
            }
            continue;
        }
        parts.push(token);
    }
    let erased = parts.concat();
    if erased.is_empty() {
        "?".to_string()
    } else {
        erased
    }
}

/// Collapse whitespace runs so formatting-only edits keep the same hash.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
