//! Canonical project graph contract.
//!
//! These types are what every backend produces and what the superimposition
//! engine consumes. The JSON shape is the boundary contract shared with the
//! external semantic backend, so deserialization also accepts the legacy
//! spellings that tool emits (`project_name`, `repo_id`, list-shaped `types`,
//! object-shaped relation rows).

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// A method parameter.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamDef {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

impl ParamDef {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

/// A class, interface, enum, record or annotation type.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeRecord {
    pub fqn: String,
    pub name: String,
    /// Path relative to the scan root, `/`-separated.
    pub file: String,
    pub file_hash: String,
}

/// A method or constructor.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodRecord {
    pub owner_fqn: String,
    pub name: String,
    /// `name(type1,type2)` over erased parameter types.
    pub signature: String,
    #[serde(rename = "returnType", alias = "return_type", default = "default_return_type")]
    pub return_type: String,
    #[serde(default)]
    pub params: Vec<ParamDef>,
    #[serde(default)]
    pub modifiers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(
        rename = "beginLine",
        alias = "begin_line",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub begin_line: Option<u32>,
    #[serde(
        rename = "endLine",
        alias = "end_line",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub end_line: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_hash: Option<String>,
}

fn default_return_type() -> String {
    "void".to_string()
}

impl MethodRecord {
    /// Marker key: `owner_fqn::signature`.
    pub fn key(&self) -> String {
        format!("{}::{}", self.owner_fqn, self.signature)
    }

    pub fn param_types(&self) -> Vec<&str> {
        self.params.iter().map(|p| p.type_name.as_str()).collect()
    }

    /// Line range when both ends are known and well ordered.
    pub fn line_range(&self) -> Option<(u32, u32)> {
        match (self.begin_line, self.end_line) {
            (Some(begin), Some(end)) if begin > 0 && end >= begin => Some((begin, end)),
            _ => None,
        }
    }
}

/// Build a method signature from its name and erased parameter types.
pub fn method_signature<S: AsRef<str>>(name: &str, param_types: &[S]) -> String {
    let params: Vec<&str> = param_types.iter().map(|p| p.as_ref()).collect();
    format!("{}({})", name, params.join(","))
}

/// A field, one record per declared variable.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRecord {
    pub owner_fqn: String,
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub modifiers: Vec<String>,
}

impl FieldRecord {
    /// Marker key: `owner_fqn::name`.
    pub fn key(&self) -> String {
        format!("{}::{}", self.owner_fqn, self.name)
    }
}

/// How a dependency edge was discovered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyVia {
    Import,
    Field,
    Param,
    Return,
    Call,
}

impl DependencyVia {
    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyVia::Import => "import",
            DependencyVia::Field => "field",
            DependencyVia::Param => "param",
            DependencyVia::Return => "return",
            DependencyVia::Call => "call",
        }
    }
}

/// A resolved dependency between two internal types.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub from_fqn: String,
    pub to_fqn: String,
    pub via: DependencyVia,
    #[serde(default)]
    pub file: String,
}

/// A resolved method call, produced only by the semantic backend.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallEdge {
    pub from_owner_fqn: String,
    pub from_signature: String,
    pub to_owner_fqn: String,
    pub to_signature: String,
    #[serde(default)]
    pub file: String,
}

/// Counts of resolved and unresolved references seen by the extractor.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolutionStats {
    pub imports_resolved: usize,
    pub imports_unresolved: usize,
    pub field_types_resolved: usize,
    pub field_types_unresolved: usize,
}

impl ResolutionStats {
    pub fn merge(&mut self, other: &ResolutionStats) {
        self.imports_resolved += other.imports_resolved;
        self.imports_unresolved += other.imports_unresolved;
        self.field_types_resolved += other.field_types_resolved;
        self.field_types_unresolved += other.field_types_unresolved;
    }
}

/// Extraction statistics.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphStats {
    #[serde(alias = "java_files")]
    pub file_count: usize,
    #[serde(alias = "parse_errors")]
    pub parse_error_count: usize,
    #[serde(alias = "parser")]
    pub backend_used: String,
    /// Files handled per backend name.
    pub backend_files: BTreeMap<String, usize>,
    /// Records dropped because their identity key was already taken.
    pub duplicate_count: usize,
    pub resolution: ResolutionStats,
}

/// The canonical graph for one ingested (project, repo) snapshot.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectGraph {
    #[serde(alias = "project_name", default)]
    pub project: String,
    #[serde(alias = "repo_id", default)]
    pub repo: String,
    #[serde(default, deserialize_with = "deserialize_types")]
    pub types: BTreeMap<String, TypeRecord>,
    #[serde(default)]
    pub methods: Vec<MethodRecord>,
    #[serde(default)]
    pub fields: Vec<FieldRecord>,
    #[serde(default)]
    pub dependencies: Vec<DependencyEdge>,
    #[serde(default, deserialize_with = "deserialize_relations")]
    pub extends: Vec<(String, String)>,
    #[serde(default, deserialize_with = "deserialize_relations")]
    pub implements: Vec<(String, String)>,
    #[serde(default)]
    pub calls: Vec<CallEdge>,
    #[serde(default)]
    pub stats: GraphStats,
}

/// Entity counts for one snapshot.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoStats {
    pub project: String,
    pub repo: String,
    pub types: usize,
    pub methods: usize,
    pub fields: usize,
    pub dependencies: usize,
    pub extends: usize,
    pub implements: usize,
    pub calls: usize,
}

impl ProjectGraph {
    pub fn new(project: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            repo: repo.into(),
            ..Default::default()
        }
    }

    /// Owning type of a method or field, if present.
    pub fn owner(&self, owner_fqn: &str) -> Option<&TypeRecord> {
        self.types.get(owner_fqn)
    }

    pub fn repo_stats(&self) -> RepoStats {
        RepoStats {
            project: self.project.clone(),
            repo: self.repo.clone(),
            types: self.types.len(),
            methods: self.methods.len(),
            fields: self.fields.len(),
            dependencies: self.dependencies.len(),
            extends: self.extends.len(),
            implements: self.implements.len(),
            calls: self.calls.len(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TypesRepr {
    Map(BTreeMap<String, TypeRecord>),
    List(Vec<TypeRecord>),
}

fn deserialize_types<'de, D>(deserializer: D) -> Result<BTreeMap<String, TypeRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    let records: Vec<TypeRecord> = match TypesRepr::deserialize(deserializer)? {
        TypesRepr::Map(map) => map.into_values().collect(),
        TypesRepr::List(list) => list,
    };
    let mut types = BTreeMap::new();
    for record in records {
        types.entry(record.fqn.clone()).or_insert(record);
    }
    Ok(types)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RelationRow {
    Pair(String, String),
    Object {
        child_fqn: String,
        #[serde(alias = "iface_ref", alias = "raw_ref", alias = "reference")]
        parent_ref: String,
    },
}

fn deserialize_relations<'de, D>(deserializer: D) -> Result<Vec<(String, String)>, D::Error>
where
    D: Deserializer<'de>,
{
    let rows = Vec::<RelationRow>::deserialize(deserializer)?;
    Ok(rows
        .into_iter()
        .map(|row| match row {
            RelationRow::Pair(child, reference) => (child, reference),
            RelationRow::Object {
                child_fqn,
                parent_ref,
            } => (child_fqn, parent_ref),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_signature() {
        assert_eq!(method_signature("foo", &["int", "String"]), "foo(int,String)");
        assert_eq!(method_signature::<&str>("run", &[]), "run()");
    }

    #[test]
    fn test_marker_keys() {
        let method = MethodRecord {
            owner_fqn: "com.x.Foo".to_string(),
            signature: "foo(int)".to_string(),
            ..Default::default()
        };
        assert_eq!(method.key(), "com.x.Foo::foo(int)");

        let field = FieldRecord {
            owner_fqn: "com.x.Foo".to_string(),
            name: "bar".to_string(),
            ..Default::default()
        };
        assert_eq!(field.key(), "com.x.Foo::bar");
    }

    #[test]
    fn test_line_range_requires_ordered_bounds() {
        let mut method = MethodRecord {
            begin_line: Some(4),
            end_line: Some(9),
            ..Default::default()
        };
        assert_eq!(method.line_range(), Some((4, 9)));

        method.end_line = Some(3);
        assert_eq!(method.line_range(), None);

        method.begin_line = Some(0);
        method.end_line = Some(3);
        assert_eq!(method.line_range(), None);
    }

    #[test]
    fn test_deserialize_legacy_backend_shape() {
        let json = r#"{
            "project_name": "shop",
            "repo_id": "left",
            "types": [
                {"project_name": "shop", "repo_id": "left", "fqn": "com.x.Foo",
                 "name": "Foo", "file": "com/x/Foo.java", "file_hash": "abc"}
            ],
            "methods": [
                {"owner_fqn": "com.x.Foo", "name": "run", "signature": "run()",
                 "returnType": "void", "params": [], "beginLine": 3, "endLine": 5}
            ],
            "fields": [{"owner_fqn": "com.x.Foo", "name": "bar", "type": "Bar"}],
            "dependencies": [
                {"from_fqn": "com.x.Foo", "to_fqn": "com.x.Bar", "to_simple": "Bar",
                 "via": "param", "file": "com/x/Foo.java"}
            ],
            "extends": [{"child_fqn": "com.x.Foo", "parent_ref": "Base"}],
            "implements": [{"child_fqn": "com.x.Foo", "iface_ref": "Runnable"}],
            "calls": []
        }"#;

        let graph: ProjectGraph = serde_json::from_str(json).unwrap();
        assert_eq!(graph.project, "shop");
        assert_eq!(graph.repo, "left");
        assert!(graph.types.contains_key("com.x.Foo"));
        assert_eq!(graph.methods[0].begin_line, Some(3));
        assert_eq!(graph.dependencies[0].via, DependencyVia::Param);
        assert_eq!(
            graph.extends,
            vec![("com.x.Foo".to_string(), "Base".to_string())]
        );
        assert_eq!(
            graph.implements,
            vec![("com.x.Foo".to_string(), "Runnable".to_string())]
        );
        assert_eq!(graph.stats, GraphStats::default());
    }

    #[test]
    fn test_serialized_shape_uses_contract_names() {
        let mut graph = ProjectGraph::new("shop", "right");
        graph.methods.push(MethodRecord {
            owner_fqn: "com.x.Foo".to_string(),
            name: "run".to_string(),
            signature: "run()".to_string(),
            return_type: "int".to_string(),
            ..Default::default()
        });
        graph
            .extends
            .push(("com.x.Foo".to_string(), "Base".to_string()));

        let value = serde_json::to_value(&graph).unwrap();
        assert_eq!(value["methods"][0]["returnType"], "int");
        assert!(value["methods"][0].get("beginLine").is_none());
        assert_eq!(value["extends"][0][1], "Base");

        let back: ProjectGraph = serde_json::from_value(value).unwrap();
        assert_eq!(back, graph);
    }
}
