//! Ingestion pipeline: scan, pick a backend, extract.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, SupergraphError};
use crate::extractor;
use crate::parser::{with_thread_pool, Backend, SemanticBackend};
use crate::scanner::{scan_directory, ScanOptions};
use crate::types::ProjectGraph;

/// Cooperative cancellation shared between a caller and a running ingest.
#[derive(Clone, Debug, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once [`cancel`](Self::cancel) has been called.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(SupergraphError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Options for one project ingest.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IngestOptions {
    pub project: String,
    pub repo: String,
    pub scan: ScanOptions,
    /// External whole-project backend, tried before the in-process parser.
    pub semantic: Option<SemanticBackend>,
    /// Worker threads for parsing; `None` uses the global pool.
    pub threads: Option<usize>,
    #[serde(skip)]
    pub cancel: CancellationFlag,
}

impl IngestOptions {
    pub fn new(project: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            repo: repo.into(),
            scan: ScanOptions::default(),
            semantic: None,
            threads: None,
            cancel: CancellationFlag::new(),
        }
    }

    pub fn with_semantic(mut self, backend: SemanticBackend) -> Self {
        self.semantic = Some(backend);
        self
    }
}

/// Build the project graph for one source root.
///
/// The semantic backend wins when configured and successful; any failure
/// there is logged and the in-process two-pass extractor runs instead.
pub fn build_project_graph(root: &Path, options: &IngestOptions) -> Result<ProjectGraph> {
    let start = Instant::now();
    options.cancel.check()?;

    let scan = scan_directory(root, &options.scan)?;
    info!("Scanned {} Java files under {}", scan.len(), root.display());

    if let Some(backend) = &options.semantic {
        options.cancel.check()?;
        match backend.invoke(root, &options.project, &options.repo) {
            Ok(mut graph) => {
                graph.stats.file_count = scan.len();
                graph
                    .stats
                    .backend_files
                    .insert(Backend::Semantic.as_str().to_string(), scan.len());
                info!(
                    "Semantic backend produced {} types in {:?}",
                    graph.types.len(),
                    start.elapsed()
                );
                return Ok(graph);
            }
            Err(e) => warn!("{}; falling back to in-process parsing", e),
        }
    }

    let graph = with_thread_pool(options.threads, || {
        extractor::extract_project(
            root,
            &scan,
            &options.project,
            &options.repo,
            &options.cancel,
        )
    })?;

    info!("Built graph for {} in {:?}", options.repo, start.elapsed());
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, rel: &str, body: &str) {
        let path = dir.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, body).unwrap();
    }

    #[test]
    fn test_cancellation_flag() {
        let flag = CancellationFlag::new();
        assert!(flag.check().is_ok());

        let shared = flag.clone();
        shared.cancel();
        assert!(flag.is_cancelled());
        assert!(matches!(flag.check(), Err(SupergraphError::Cancelled)));
    }

    #[test]
    fn test_build_in_process() {
        let dir = TempDir::new().unwrap();
        write(&dir, "com/x/Foo.java", "package com.x;\npublic class Foo { int n; }\n");
        write(&dir, "com/x/Broken.java", "package com.x;\nclass Broken { void f( }\n");

        let options = IngestOptions::new("shop", "left");
        let graph = build_project_graph(dir.path(), &options).unwrap();

        assert_eq!(graph.project, "shop");
        assert_eq!(graph.stats.file_count, 2);
        assert_eq!(graph.stats.parse_error_count, 1);
        assert_eq!(graph.stats.backend_used, "tree-sitter");
        assert!(graph.types.contains_key("com.x.Foo"));
        assert!(!graph.types.contains_key("com.x.Broken"));
    }

    #[test]
    fn test_build_cancelled_before_start() {
        let dir = TempDir::new().unwrap();
        write(&dir, "A.java", "class A {}\n");

        let options = IngestOptions::new("shop", "left");
        options.cancel.cancel();
        assert!(matches!(
            build_project_graph(dir.path(), &options),
            Err(SupergraphError::Cancelled)
        ));
    }

    #[test]
    fn test_build_missing_root() {
        let options = IngestOptions::new("shop", "left");
        let err = build_project_graph(Path::new("/nonexistent/supergraph/root"), &options)
            .unwrap_err();
        assert!(matches!(err, SupergraphError::RootNotFound { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_semantic_failure_falls_back() {
        let dir = TempDir::new().unwrap();
        write(&dir, "A.java", "class A {}\n");

        let options = IngestOptions::new("shop", "left").with_semantic(SemanticBackend::new(vec![
            "sh".to_string(),
            "-c".to_string(),
            "exit 1".to_string(),
        ]));
        let graph = build_project_graph(dir.path(), &options).unwrap();
        assert_eq!(graph.stats.backend_used, "tree-sitter");
        assert!(graph.types.contains_key("A"));
    }

    #[cfg(unix)]
    #[test]
    fn test_semantic_success_wins() {
        let dir = TempDir::new().unwrap();
        write(&dir, "A.java", "class A {}\n");

        let options = IngestOptions::new("shop", "left").with_semantic(SemanticBackend::new(vec![
            "sh".to_string(),
            "-c".to_string(),
            r#"echo '{"types": {"x.Resolved": {"fqn": "x.Resolved", "name": "Resolved", "file": "A.java", "file_hash": "h"}}}'"#.to_string(),
        ]));
        let graph = build_project_graph(dir.path(), &options).unwrap();
        assert_eq!(graph.stats.backend_used, "semantic");
        assert_eq!(graph.stats.file_count, 1);
        assert!(graph.types.contains_key("x.Resolved"));
    }
}
