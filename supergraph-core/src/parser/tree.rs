//! Backend-neutral syntax tree.
//!
//! Every in-process backend lowers its native tree into these nodes, so the
//! extractor only ever walks one shape.

use serde::{Deserialize, Serialize};

/// Kind of a type declaration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    #[default]
    Class,
    Interface,
    Enum,
    Record,
    Annotation,
}

/// An import declaration as written.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportDecl {
    /// Dotted path without the trailing `.*`.
    pub path: String,
    pub is_static: bool,
    pub is_wildcard: bool,
}

impl ImportDecl {
    pub fn new(path: impl Into<String>, is_static: bool, is_wildcard: bool) -> Self {
        Self {
            path: path.into(),
            is_static,
            is_wildcard,
        }
    }
}

/// A method or constructor parameter.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamDecl {
    pub name: String,
    /// Declared type with type arguments and annotations erased.
    pub type_name: String,
}

/// A type declaration with its members in source order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDecl {
    pub name: String,
    pub kind: TypeKind,
    pub extends: Vec<String>,
    pub implements: Vec<String>,
    pub modifiers: Vec<String>,
    pub members: Vec<SyntaxNode>,
    pub start_line: u32,
    pub end_line: u32,
}

/// A method or constructor declaration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDecl {
    pub name: String,
    pub is_constructor: bool,
    pub params: Vec<ParamDecl>,
    /// `None` for constructors, or when the backend could not tell.
    pub return_type: Option<String>,
    pub modifiers: Vec<String>,
    /// Body text, absent for abstract and native methods.
    pub body: Option<String>,
    pub start_line: u32,
    pub end_line: u32,
}

/// A field declaration; one declaration may introduce several names.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDecl {
    /// Declared type as written, type arguments included.
    pub type_name: Option<String>,
    pub names: Vec<String>,
    pub modifiers: Vec<String>,
}

/// One node of the neutral tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyntaxNode {
    TypeDecl(TypeDecl),
    MethodDecl(MethodDecl),
    FieldDecl(FieldDecl),
    /// A container with no structural meaning of its own, such as an
    /// initializer block that declares a local class.
    Generic { children: Vec<SyntaxNode> },
}

impl SyntaxNode {
    /// Visit every type declaration reachable without entering another
    /// type's members. Nested types are reported by recursing on `TypeDecl`.
    pub fn type_decls(nodes: &[SyntaxNode]) -> Vec<&TypeDecl> {
        let mut out = Vec::new();
        for node in nodes {
            match node {
                SyntaxNode::TypeDecl(decl) => out.push(decl),
                SyntaxNode::Generic { children } => out.extend(Self::type_decls(children)),
                SyntaxNode::MethodDecl(_) | SyntaxNode::FieldDecl(_) => {}
            }
        }
        out
    }
}

/// Everything a backend recovered from one file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceUnit {
    pub package: Option<String>,
    pub imports: Vec<ImportDecl>,
    pub nodes: Vec<SyntaxNode>,
}

impl SourceUnit {
    /// Prefix used to build fully qualified names in this file.
    pub fn package_prefix(&self) -> &str {
        self.package.as_deref().unwrap_or("")
    }
}
