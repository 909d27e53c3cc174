//! Last-resort backend: recover package and imports with regular expressions.
//!
//! Used when the syntax parser rejects a file. It never yields declarations,
//! only the file-level context that can still be read line by line.

use once_cell::sync::Lazy;
use regex::Regex;

use super::tree::{ImportDecl, SourceUnit};

static PACKAGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*package\s+([a-zA-Z0-9_.]+)\s*;").expect("valid package regex")
});

static IMPORT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*import\s+(static\s+)?([a-zA-Z0-9_.*]+)\s*;").expect("valid import regex")
});

/// Salvage package and import declarations from raw text.
pub fn salvage(source: &str) -> SourceUnit {
    let package = PACKAGE_RE
        .captures(source)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());

    let imports = IMPORT_RE
        .captures_iter(source)
        .filter_map(|caps| {
            let raw = caps.get(2)?.as_str();
            let is_static = caps.get(1).is_some();
            Some(match raw.strip_suffix(".*") {
                Some(path) => ImportDecl::new(path, is_static, true),
                None => ImportDecl::new(raw, is_static, false),
            })
        })
        .collect();

    SourceUnit {
        package,
        imports,
        nodes: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_salvage_package_and_imports() {
        let source = "package com.x.svc;\n\nimport com.x.model.Bar;\nimport java.util.*;\n  import static com.x.Util.helper;\n\nclass Broken { void f( {\n";
        let unit = salvage(source);

        assert_eq!(unit.package.as_deref(), Some("com.x.svc"));
        assert_eq!(unit.imports.len(), 3);
        assert_eq!(unit.imports[0], ImportDecl::new("com.x.model.Bar", false, false));
        assert_eq!(unit.imports[1], ImportDecl::new("java.util", false, true));
        assert_eq!(unit.imports[2], ImportDecl::new("com.x.Util.helper", true, false));
        assert!(unit.nodes.is_empty());
    }

    #[test]
    fn test_salvage_nothing() {
        let unit = salvage("this is not java");
        assert!(unit.package.is_none());
        assert!(unit.imports.is_empty());
    }
}
