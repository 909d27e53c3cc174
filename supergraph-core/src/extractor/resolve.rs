//! Best-effort reference resolution against the internal type set.
//!
//! Nothing here fails: every lookup returns a [`Resolution`], and callers
//! drop the unresolved ones after counting them.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::parser::helpers::strip_type_arguments;
use crate::parser::ImportDecl;
use crate::types::TypeRecord;

/// Why a reference did not resolve.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnresolvedReason {
    /// `import a.b.*;` is never expanded.
    Wildcard,
    /// No internal type matches; the reference is external or unknown.
    External,
    /// Nothing usable was written (`?`, empty).
    Empty,
}

/// Outcome of matching a raw reference.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    Resolved(String),
    Unresolved(UnresolvedReason),
}

impl Resolution {
    pub fn fqn(&self) -> Option<&str> {
        match self {
            Resolution::Resolved(fqn) => Some(fqn),
            Resolution::Unresolved(_) => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::Resolved(_))
    }
}

/// The two discovery indexes: every internal fqn, and simple name to fqns in
/// discovery order.
#[derive(Clone, Debug, Default)]
pub struct TypeIndex {
    fqns: HashSet<String>,
    by_simple: HashMap<String, Vec<String>>,
}

impl TypeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a discovered type. Re-inserting an fqn is a no-op.
    pub fn insert(&mut self, fqn: &str, simple_name: &str) {
        if self.fqns.insert(fqn.to_string()) {
            self.by_simple
                .entry(simple_name.to_string())
                .or_default()
                .push(fqn.to_string());
        }
    }

    pub fn contains(&self, fqn: &str) -> bool {
        self.fqns.contains(fqn)
    }

    pub fn len(&self) -> usize {
        self.fqns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fqns.is_empty()
    }

    /// Fqns sharing a simple name, first discovered first.
    pub fn candidates(&self, simple_name: &str) -> &[String] {
        self.by_simple
            .get(simple_name)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    fn first_candidate(&self, simple_name: &str) -> Resolution {
        match self.candidates(simple_name).first() {
            Some(fqn) => Resolution::Resolved(fqn.clone()),
            None => Resolution::Unresolved(UnresolvedReason::External),
        }
    }

    /// Exact internal fqn, else the last path segment as a simple name.
    pub fn resolve_import(&self, import: &ImportDecl) -> Resolution {
        if import.is_wildcard {
            return Resolution::Unresolved(UnresolvedReason::Wildcard);
        }
        if import.path.is_empty() {
            return Resolution::Unresolved(UnresolvedReason::Empty);
        }
        if self.contains(&import.path) {
            return Resolution::Resolved(import.path.clone());
        }
        let simple = import.path.rsplit('.').next().unwrap_or(&import.path);
        self.first_candidate(simple)
    }

    /// Match a declared field type by its simple name.
    pub fn resolve_field_type(&self, declared: &str) -> Resolution {
        match simple_type_name(declared) {
            Some(simple) => self.first_candidate(&simple),
            None => Resolution::Unresolved(UnresolvedReason::Empty),
        }
    }
}

/// `java.util.List<User>[]` becomes `List`.
pub fn simple_type_name(declared: &str) -> Option<String> {
    let base = strip_type_arguments(declared);
    let base = base
        .trim()
        .trim_end_matches("...")
        .trim_end_matches(|c: char| c == '[' || c == ']' || c.is_whitespace());
    let simple = base.rsplit('.').next().unwrap_or(base).trim();
    if simple.is_empty() || simple == "?" {
        None
    } else {
        Some(simple.to_string())
    }
}

/// Resolve an extends/implements reference against a snapshot's types.
///
/// Fallback order: exact fqn, exact simple name, fqn ending in `.ref`,
/// fqn ending in `$ref`. Candidates are tried in fqn order.
pub fn resolve_type_reference(types: &BTreeMap<String, TypeRecord>, reference: &str) -> Resolution {
    let reference = reference.trim();
    if reference.is_empty() {
        return Resolution::Unresolved(UnresolvedReason::Empty);
    }
    if types.contains_key(reference) {
        return Resolution::Resolved(reference.to_string());
    }

    let dotted = format!(".{}", reference);
    let nested = format!("${}", reference);
    let strategies: [&dyn Fn(&TypeRecord) -> bool; 3] = [
        &|t: &TypeRecord| t.name == reference,
        &|t: &TypeRecord| t.fqn.ends_with(&dotted),
        &|t: &TypeRecord| t.fqn.ends_with(&nested),
    ];

    for strategy in strategies {
        if let Some(found) = types.values().find(|t| strategy(t)) {
            return Resolution::Resolved(found.fqn.clone());
        }
    }
    Resolution::Unresolved(UnresolvedReason::External)
}
