//! Merge per-file extraction output into one project graph.

use std::collections::HashSet;
use tracing::debug;

use crate::extractor::FileExtraction;
use crate::parser::Backend;
use crate::types::{DependencyVia, ProjectGraph};

/// Accumulates [`FileExtraction`]s in scan order.
///
/// The first record to claim an identity key keeps it; later duplicates are
/// dropped and counted in `stats.duplicate_count`. Edges and supertype pairs
/// declared by a dropped duplicate type are dropped with it.
pub struct GraphAssembler {
    graph: ProjectGraph,
    method_keys: HashSet<(String, String)>,
    field_keys: HashSet<(String, String)>,
    edges: HashSet<(String, String, DependencyVia, String)>,
    extends: HashSet<(String, String)>,
    implements: HashSet<(String, String)>,
}

impl GraphAssembler {
    pub fn new(project: &str, repo: &str, backend: Backend) -> Self {
        let mut graph = ProjectGraph::new(project, repo);
        graph.stats.backend_used = backend.as_str().to_string();
        Self {
            graph,
            method_keys: HashSet::new(),
            field_keys: HashSet::new(),
            edges: HashSet::new(),
            extends: HashSet::new(),
            implements: HashSet::new(),
        }
    }

    /// Whether `fqn` was claimed by the type declared in `path`.
    fn declared_in(&self, fqn: &str, path: &str) -> bool {
        self.graph.types.get(fqn).map_or(true, |t| t.file == path)
    }

    pub fn add(&mut self, file: FileExtraction) {
        let stats = &mut self.graph.stats;
        stats.file_count += 1;
        if file.degraded {
            stats.parse_error_count += 1;
        }
        if let Some(backend) = file.backend {
            *stats
                .backend_files
                .entry(backend.as_str().to_string())
                .or_default() += 1;
        }
        stats.resolution.merge(&file.resolution);

        for record in file.types {
            if self.graph.types.contains_key(&record.fqn) {
                debug!("Duplicate type {} in {}", record.fqn, file.path);
                self.graph.stats.duplicate_count += 1;
                continue;
            }
            self.graph.types.insert(record.fqn.clone(), record);
        }

        for method in file.methods {
            if !self
                .method_keys
                .insert((method.owner_fqn.clone(), method.signature.clone()))
            {
                debug!("Duplicate method {} in {}", method.key(), file.path);
                self.graph.stats.duplicate_count += 1;
                continue;
            }
            self.graph.methods.push(method);
        }

        for field in file.fields {
            if !self
                .field_keys
                .insert((field.owner_fqn.clone(), field.name.clone()))
            {
                debug!("Duplicate field {} in {}", field.key(), file.path);
                self.graph.stats.duplicate_count += 1;
                continue;
            }
            self.graph.fields.push(field);
        }

        for edge in file.dependencies {
            if !self.declared_in(&edge.from_fqn, &edge.file) {
                continue;
            }
            let key = (
                edge.from_fqn.clone(),
                edge.to_fqn.clone(),
                edge.via,
                edge.file.clone(),
            );
            if self.edges.insert(key) {
                self.graph.dependencies.push(edge);
            }
        }

        for pair in file.extends {
            if self.declared_in(&pair.0, &file.path) && self.extends.insert(pair.clone()) {
                self.graph.extends.push(pair);
            }
        }
        for pair in file.implements {
            if self.declared_in(&pair.0, &file.path) && self.implements.insert(pair.clone()) {
                self.graph.implements.push(pair);
            }
        }
    }

    pub fn finish(self) -> ProjectGraph {
        self.graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DependencyEdge, FieldRecord, MethodRecord, ResolutionStats, TypeRecord};

    fn extraction(path: &str, fqn: &str) -> FileExtraction {
        FileExtraction {
            path: path.to_string(),
            backend: Some(Backend::TreeSitter),
            types: vec![TypeRecord {
                fqn: fqn.to_string(),
                name: fqn.rsplit('.').next().unwrap().to_string(),
                file: path.to_string(),
                file_hash: format!("xxh3:{}", path),
            }],
            methods: vec![MethodRecord {
                owner_fqn: fqn.to_string(),
                name: "run".to_string(),
                signature: "run()".to_string(),
                ..Default::default()
            }],
            fields: vec![FieldRecord {
                owner_fqn: fqn.to_string(),
                name: "n".to_string(),
                type_name: "int".to_string(),
                ..Default::default()
            }],
            dependencies: vec![DependencyEdge {
                from_fqn: fqn.to_string(),
                to_fqn: "p.Other".to_string(),
                via: DependencyVia::Import,
                file: path.to_string(),
            }],
            resolution: ResolutionStats {
                imports_resolved: 1,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_first_record_wins() {
        let mut assembler = GraphAssembler::new("shop", "left", Backend::TreeSitter);
        assembler.add(extraction("a/Foo.java", "p.Foo"));
        assembler.add(extraction("b/Foo.java", "p.Foo"));
        let graph = assembler.finish();

        assert_eq!(graph.types["p.Foo"].file, "a/Foo.java");
        assert_eq!(graph.methods.len(), 1);
        assert_eq!(graph.fields.len(), 1);
        assert_eq!(graph.stats.duplicate_count, 3);
        assert_eq!(graph.dependencies.len(), 1);
        assert_eq!(graph.dependencies[0].file, "a/Foo.java");
        assert_eq!(graph.stats.resolution.imports_resolved, 2);
    }

    #[test]
    fn test_duplicate_edges_and_relations_collapse() {
        let mut file = extraction("a/Foo.java", "p.Foo");
        let edge = file.dependencies[0].clone();
        file.dependencies.push(edge.clone());
        file.dependencies.push(DependencyEdge {
            via: DependencyVia::Field,
            ..edge
        });
        let pair = ("p.Foo".to_string(), "Runnable".to_string());
        file.implements = vec![pair.clone(), pair.clone()];
        file.extends = vec![("p.Foo".to_string(), "Base".to_string()); 2];

        let mut dup = extraction("b/Foo.java", "p.Foo");
        dup.extends = vec![("p.Foo".to_string(), "Other".to_string())];

        let mut assembler = GraphAssembler::new("shop", "left", Backend::TreeSitter);
        assembler.add(file);
        assembler.add(dup);
        let graph = assembler.finish();

        let vias: Vec<DependencyVia> = graph.dependencies.iter().map(|d| d.via).collect();
        assert_eq!(vias, vec![DependencyVia::Import, DependencyVia::Field]);
        assert_eq!(graph.implements, vec![pair]);
        assert_eq!(
            graph.extends,
            vec![("p.Foo".to_string(), "Base".to_string())]
        );
    }

    #[test]
    fn test_stats_per_backend() {
        let mut assembler = GraphAssembler::new("shop", "left", Backend::TreeSitter);
        assembler.add(extraction("a/Foo.java", "p.Foo"));
        assembler.add(FileExtraction {
            path: "a/Broken.java".to_string(),
            backend: Some(Backend::Regex),
            degraded: true,
            ..Default::default()
        });
        let graph = assembler.finish();

        assert_eq!(graph.stats.file_count, 2);
        assert_eq!(graph.stats.parse_error_count, 1);
        assert_eq!(graph.stats.backend_used, "tree-sitter");
        assert_eq!(graph.stats.backend_files["tree-sitter"], 1);
        assert_eq!(graph.stats.backend_files["regex"], 1);
    }
}
