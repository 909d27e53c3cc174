//! Alignment and classification of two project graphs.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;
use tracing::{debug, info};

use super::markers::{
    Alignment, DiffMarker, DiffStatus, DiffSummary, EntityKind, LineRange, Supergraph,
};
use super::patch::{attach_patches, PatchOptions};
use crate::types::{FieldRecord, MethodRecord, ProjectGraph, TypeRecord};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

/// Where an entity lives on one side.
struct Location {
    file: Option<String>,
    range: Option<LineRange>,
}

#[derive(Default)]
struct KindDiff {
    alignments: Vec<Alignment>,
    markers: Vec<DiffMarker>,
}

/// Type fingerprint: the whole-file content hash.
pub fn same_type(left: &TypeRecord, right: &TypeRecord) -> bool {
    left.file_hash == right.file_hash
}

/// Method fingerprint: return type, parameter types, modifier set, and body
/// hash when both sides have one.
pub fn same_method(left: &MethodRecord, right: &MethodRecord) -> bool {
    let bodies_match = match (&left.body_hash, &right.body_hash) {
        (Some(l), Some(r)) => l == r,
        _ => true,
    };
    left.return_type == right.return_type
        && left.param_types() == right.param_types()
        && modifier_set(&left.modifiers) == modifier_set(&right.modifiers)
        && bodies_match
}

/// Field fingerprint: declared type and modifier set.
pub fn same_field(left: &FieldRecord, right: &FieldRecord) -> bool {
    left.type_name == right.type_name
        && modifier_set(&left.modifiers) == modifier_set(&right.modifiers)
}

fn modifier_set(modifiers: &[String]) -> BTreeSet<&str> {
    modifiers.iter().map(|m| m.as_str()).collect()
}

/// Index records by key; the first record for a key wins.
fn by_key<T, K>(records: impl IntoIterator<Item = T>, key: K) -> BTreeMap<String, T>
where
    K: Fn(&T) -> String,
{
    let mut map = BTreeMap::new();
    for record in records {
        map.entry(key(&record)).or_insert(record);
    }
    map
}

fn align_kind<T, S, L>(
    supergraph_id: &str,
    kind: EntityKind,
    left: &BTreeMap<String, &T>,
    right: &BTreeMap<String, &T>,
    same: S,
    locate: L,
) -> KindDiff
where
    S: Fn(&T, &T) -> bool,
    L: Fn(Side, &T) -> Location,
{
    let keys: BTreeSet<&String> = left.keys().chain(right.keys()).collect();
    let mut out = KindDiff::default();

    for key in keys {
        let marker = match (left.get(key).copied(), right.get(key).copied()) {
            (Some(l), Some(r)) => {
                out.alignments.push(Alignment {
                    kind,
                    key: key.clone(),
                });
                let status = if same(l, r) {
                    DiffStatus::Unchanged
                } else {
                    DiffStatus::Changed
                };
                let (l, r) = (locate(Side::Left, l), locate(Side::Right, r));
                let (left_range, right_range) = match (l.range, r.range) {
                    (Some(lr), Some(rr)) => (Some(lr), Some(rr)),
                    _ => (None, None),
                };
                DiffMarker::new(supergraph_id, kind, key.clone(), status)
                    .with_files(l.file, r.file)
                    .with_ranges(left_range, right_range)
            }
            (Some(l), None) => DiffMarker::new(supergraph_id, kind, key.clone(), DiffStatus::Removed)
                .with_files(locate(Side::Left, l).file, None),
            (None, Some(r)) => DiffMarker::new(supergraph_id, kind, key.clone(), DiffStatus::Added)
                .with_files(None, locate(Side::Right, r).file),
            (None, None) => continue,
        };
        out.markers.push(marker);
    }

    debug!(
        "Aligned {} {} pairs, {} markers",
        out.alignments.len(),
        kind.as_str(),
        out.markers.len()
    );
    out
}

/// Superimpose two graphs under `supergraph_id`.
///
/// Every entity of either side gets exactly one marker. Patches are read from
/// disk for CHANGED markers only, and only when `patches` is given.
pub fn superimpose(
    left: &ProjectGraph,
    right: &ProjectGraph,
    supergraph_id: &str,
    patches: Option<&PatchOptions>,
) -> Supergraph {
    let start = Instant::now();

    let side = |s: Side| if s == Side::Left { left } else { right };
    let owner_file = |s: Side, owner: &str| side(s).owner(owner).map(|t| t.file.clone());

    let diff_types = || {
        let l = by_key(left.types.values(), |t| t.fqn.clone());
        let r = by_key(right.types.values(), |t| t.fqn.clone());
        align_kind(supergraph_id, EntityKind::Type, &l, &r, same_type, |_, t| Location {
            file: Some(t.file.clone()),
            range: None,
        })
    };

    let diff_methods = || {
        let l = by_key(left.methods.iter(), |m| m.key());
        let r = by_key(right.methods.iter(), |m| m.key());
        align_kind(supergraph_id, EntityKind::Method, &l, &r, same_method, |s, m| {
            Location {
                file: m.file.clone().or_else(|| owner_file(s, &m.owner_fqn)),
                range: m.line_range().map(LineRange::from),
            }
        })
    };

    let diff_fields = || {
        let l = by_key(left.fields.iter(), |f| f.key());
        let r = by_key(right.fields.iter(), |f| f.key());
        align_kind(supergraph_id, EntityKind::Field, &l, &r, same_field, |s, f| Location {
            file: owner_file(s, &f.owner_fqn),
            range: None,
        })
    };

    let (types, (methods, fields)) =
        rayon::join(diff_types, || rayon::join(diff_methods, diff_fields));

    let mut alignments = Vec::new();
    let mut markers = Vec::new();
    for part in [types, methods, fields] {
        alignments.extend(part.alignments);
        markers.extend(part.markers);
    }

    if let Some(options) = patches {
        attach_patches(&mut markers, options);
    }

    let mut summary = DiffSummary::new(supergraph_id, &left.project, &left.repo, &right.repo);
    for marker in &markers {
        summary.record(marker);
    }
    summary.duration_ms = start.elapsed().as_secs_f64() * 1000.0;

    info!("Superimposed {} vs {}: {}", left.repo, right.repo, summary.text());

    Supergraph {
        id: supergraph_id.to_string(),
        alignments,
        markers,
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ParamDef;
    use std::fs;
    use tempfile::TempDir;

    fn make_type(fqn: &str, hash: &str) -> TypeRecord {
        TypeRecord {
            fqn: fqn.to_string(),
            name: fqn.rsplit('.').next().unwrap().to_string(),
            file: format!("{}.java", fqn.replace('.', "/")),
            file_hash: hash.to_string(),
        }
    }

    fn make_method(owner: &str, name: &str, params: &[&str], ret: &str) -> MethodRecord {
        let params: Vec<ParamDef> = params
            .iter()
            .enumerate()
            .map(|(i, t)| ParamDef::new(format!("p{}", i), *t))
            .collect();
        let types: Vec<&str> = params.iter().map(|p| p.type_name.as_str()).collect();
        MethodRecord {
            owner_fqn: owner.to_string(),
            name: name.to_string(),
            signature: crate::types::method_signature(name, &types),
            return_type: ret.to_string(),
            params,
            ..Default::default()
        }
    }

    fn make_field(owner: &str, name: &str, ty: &str) -> FieldRecord {
        FieldRecord {
            owner_fqn: owner.to_string(),
            name: name.to_string(),
            type_name: ty.to_string(),
            modifiers: vec![],
        }
    }

    fn make_graph(repo: &str, types: Vec<TypeRecord>) -> ProjectGraph {
        let mut graph = ProjectGraph::new("shop", repo);
        for t in types {
            graph.types.insert(t.fqn.clone(), t);
        }
        graph
    }

    #[test]
    fn test_same_method_fingerprint() {
        let base = make_method("a.A", "f", &["int"], "void");

        let mut other = base.clone();
        other.modifiers = vec!["static".to_string(), "public".to_string()];
        let mut with_mods = base.clone();
        with_mods.modifiers = vec!["public".to_string(), "static".to_string()];
        assert!(same_method(&other, &with_mods));
        assert!(!same_method(&base, &with_mods));

        // body hash only counts when both sides carry one
        let mut hashed = base.clone();
        hashed.body_hash = Some("xxh3:1".to_string());
        assert!(same_method(&base, &hashed));
        let mut rehashed = base.clone();
        rehashed.body_hash = Some("xxh3:2".to_string());
        assert!(!same_method(&hashed, &rehashed));

        let returns_int = make_method("a.A", "f", &["int"], "int");
        assert!(!same_method(&base, &returns_int));
    }

    #[test]
    fn test_unchanged() {
        let mut left = make_graph("left", vec![make_type("a.A", "h1")]);
        left.methods.push(make_method("a.A", "f", &["int"], "void"));
        left.fields.push(make_field("a.A", "n", "int"));
        let right = ProjectGraph {
            repo: "right".to_string(),
            ..left.clone()
        };

        let result = superimpose(&left, &right, "cmp", None);
        assert_eq!(result.markers.len(), 3);
        assert!(result.markers.iter().all(|m| m.status == DiffStatus::Unchanged));
        assert_eq!(result.alignments.len(), 3);
        assert!(!result.summary.has_changes());
        assert_eq!(result.summary.left_repo, "left");
        assert_eq!(result.summary.right_repo, "right");
    }

    #[test]
    fn test_changed_added_removed() {
        let mut left = make_graph("left", vec![make_type("a.A", "h1"), make_type("a.Old", "h2")]);
        left.methods.push(make_method("a.A", "f", &[], "void"));
        left.methods.push(make_method("a.A", "g", &["int"], "void"));
        left.fields.push(make_field("a.A", "n", "int"));

        let mut right = make_graph("right", vec![make_type("a.A", "h9"), make_type("a.New", "h3")]);
        right.methods.push(make_method("a.A", "f", &[], "int"));
        right.methods.push(make_method("a.A", "g", &["String"], "void"));
        right.fields.push(make_field("a.A", "n", "long"));

        let result = superimpose(&left, &right, "cmp", None);
        let status = |kind, key: &str| result.marker(kind, key).map(|m| m.status);

        assert_eq!(status(EntityKind::Type, "a.A"), Some(DiffStatus::Changed));
        assert_eq!(status(EntityKind::Type, "a.Old"), Some(DiffStatus::Removed));
        assert_eq!(status(EntityKind::Type, "a.New"), Some(DiffStatus::Added));
        assert_eq!(status(EntityKind::Method, "a.A::f()"), Some(DiffStatus::Changed));
        // overloads differ by signature, so a parameter change is remove + add
        assert_eq!(status(EntityKind::Method, "a.A::g(int)"), Some(DiffStatus::Removed));
        assert_eq!(status(EntityKind::Method, "a.A::g(String)"), Some(DiffStatus::Added));
        assert_eq!(status(EntityKind::Field, "a.A::n"), Some(DiffStatus::Changed));

        let removed = result.marker(EntityKind::Type, "a.Old").unwrap();
        assert_eq!(removed.left_file.as_deref(), Some("a/Old.java"));
        assert!(removed.right_file.is_none());

        // no alignment between the removed and the added type
        assert!(!result.alignments.iter().any(|a| a.key == "a.Old" || a.key == "a.New"));
        assert_eq!(result.summary.sample_changed.len(), 3);
    }

    #[test]
    fn test_partition_completeness() {
        let left = make_graph(
            "left",
            (0..30).map(|i| make_type(&format!("p.T{}", i), "h")).collect(),
        );
        let right = make_graph(
            "right",
            (10..40)
                .map(|i| make_type(&format!("p.T{}", i), if i % 2 == 0 { "h" } else { "x" }))
                .collect(),
        );

        let result = superimpose(&left, &right, "cmp", None);
        let union: BTreeSet<&String> = left.types.keys().chain(right.types.keys()).collect();
        assert_eq!(result.markers.len(), union.len());
        assert_eq!(result.summary.total(EntityKind::Type), 40);
        assert_eq!(result.summary.count(EntityKind::Type, DiffStatus::Removed), 10);
        assert_eq!(result.summary.count(EntityKind::Type, DiffStatus::Added), 10);
        assert_eq!(result.summary.count(EntityKind::Type, DiffStatus::Changed), 10);

        let keys: Vec<(EntityKind, &str)> =
            result.markers.iter().map(|m| (m.kind, m.key.as_str())).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn test_idempotent_markers() {
        let mut left = make_graph("left", vec![make_type("a.A", "h1")]);
        left.methods.push(make_method("a.A", "f", &[], "void"));
        let mut right = make_graph("right", vec![make_type("a.A", "h2")]);
        right.methods.push(make_method("a.A", "f", &[], "int"));

        let first = superimpose(&left, &right, "cmp", None);
        let second = superimpose(&left, &right, "cmp", None);
        assert_eq!(first.markers, second.markers);
        assert_eq!(first.alignments, second.alignments);
    }

    #[test]
    fn test_method_patch_uses_line_range() {
        let left_dir = TempDir::new().unwrap();
        let right_dir = TempDir::new().unwrap();
        let source = |ret: &str| {
            format!(
                "package a;\nclass A {{\n  int untouched = 0;\n  {} f() {{\n    return;\n  }}\n}}\n",
                ret
            )
        };
        fs::create_dir_all(left_dir.path().join("a")).unwrap();
        fs::create_dir_all(right_dir.path().join("a")).unwrap();
        fs::write(left_dir.path().join("a/A.java"), source("void")).unwrap();
        fs::write(right_dir.path().join("a/A.java"), source("int")).unwrap();

        let with_lines = |ret: &str| MethodRecord {
            begin_line: Some(4),
            end_line: Some(6),
            ..make_method("a.A", "f", &[], ret)
        };
        let mut left = make_graph("left", vec![make_type("a.A", "h1")]);
        left.methods.push(with_lines("void"));
        let mut right = make_graph("right", vec![make_type("a.A", "h2")]);
        right.methods.push(with_lines("int"));

        let options = PatchOptions::new(left_dir.path(), right_dir.path());
        let result = superimpose(&left, &right, "cmp", Some(&options));

        let method = result.marker(EntityKind::Method, "a.A::f()").unwrap();
        assert_eq!(method.left_range, Some(LineRange { begin: 4, end: 6 }));
        let patch = method.diff.as_deref().unwrap();
        assert!(patch.starts_with("--- a/a/A.java:4-6\n"));
        assert!(!patch.contains("untouched"));

        let owner = result.marker(EntityKind::Type, "a.A").unwrap();
        assert!(owner.diff.as_deref().unwrap().contains("untouched"));
    }
}
