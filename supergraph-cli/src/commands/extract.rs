//! Extract command - build one project graph from a source root
//!
//! Writes the graph as JSON with `--out`, and always reports what was found:
//! entity counts, backend usage, and how many references resolved.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use colored::Colorize;
use serde::Serialize;

use supergraph_core::{build_project_graph, IngestOptions, ProjectGraph, TypeGraph};

use crate::config::SgConfig;
use crate::output::{Output, OutputConfig, OutputFormat, TableDisplay, TableOutput};

/// Stats for one extracted snapshot.
#[derive(Debug, Serialize)]
pub struct ExtractResult {
    pub project: String,
    pub repo: String,
    pub root: String,
    pub backend: String,
    pub files: usize,
    pub parse_errors: usize,
    pub types: usize,
    pub methods: usize,
    pub fields: usize,
    pub dependencies: usize,
    pub duplicates: usize,
    pub imports_resolved: usize,
    pub imports_unresolved: usize,
    pub relations_resolved: usize,
    pub relations_unresolved: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    pub duration_ms: u64,
}

impl ExtractResult {
    fn new(root: &Path, graph: &ProjectGraph, duration_ms: u64) -> Self {
        let relations = TypeGraph::from_project(graph).relation_stats();
        let stats = &graph.stats;
        Self {
            project: graph.project.clone(),
            repo: graph.repo.clone(),
            root: root.display().to_string(),
            backend: stats.backend_used.clone(),
            files: stats.file_count,
            parse_errors: stats.parse_error_count,
            types: graph.types.len(),
            methods: graph.methods.len(),
            fields: graph.fields.len(),
            dependencies: graph.dependencies.len(),
            duplicates: stats.duplicate_count,
            imports_resolved: stats.resolution.imports_resolved,
            imports_unresolved: stats.resolution.imports_unresolved,
            relations_resolved: relations.resolved,
            relations_unresolved: relations.unresolved,
            output: None,
            duration_ms,
        }
    }
}

impl TableDisplay for ExtractResult {
    fn to_table(&self) -> String {
        let mut output = format!(
            "{} {}/{} ({})\n",
            "EXTRACT:".cyan().bold(),
            self.project,
            self.repo.green(),
            self.root.dimmed()
        );

        let pairs = [
            ("backend", self.backend.clone()),
            ("files", self.files.to_string()),
            ("parse errors", self.parse_errors.to_string()),
            ("types", self.types.to_string()),
            ("methods", self.methods.to_string()),
            ("fields", self.fields.to_string()),
            ("dependencies", self.dependencies.to_string()),
            ("duplicates", self.duplicates.to_string()),
            (
                "imports",
                format!(
                    "{} resolved, {} external",
                    self.imports_resolved, self.imports_unresolved
                ),
            ),
            (
                "supertypes",
                format!(
                    "{} resolved, {} unresolved",
                    self.relations_resolved, self.relations_unresolved
                ),
            ),
            ("duration", format!("{}ms", self.duration_ms)),
        ];
        output.push_str(&TableOutput::format_key_value(
            &pairs,
            &OutputConfig::new(OutputFormat::Table),
        ));
        output.push('\n');

        if self.parse_errors > 0 {
            output.push_str(&format!(
                "{} {} files parsed with errors; regex fallback used\n",
                "warning:".yellow().bold(),
                self.parse_errors
            ));
        }
        if let Some(path) = &self.output {
            output.push_str(&format!("Graph written to {}\n", path.dimmed()));
        }
        output
    }
}

/// Ingest options for one root from config plus flag overrides.
pub fn ingest_options(
    config: &SgConfig,
    project: Option<&str>,
    repo: &str,
    no_semantic: bool,
) -> IngestOptions {
    let project = project.unwrap_or_else(|| config.project_name());
    let mut options = IngestOptions::new(project, repo);
    options.scan = config.scan_options();
    options.threads = config.threads();
    if !no_semantic {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        options.semantic = config.semantic_backend(&cwd);
    }
    options
}

/// Run the extract command
pub fn run(
    path: &str,
    repo: &str,
    project: Option<&str>,
    out: Option<&str>,
    no_semantic: bool,
    config: &SgConfig,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let start = Instant::now();
    let root = Path::new(path);

    let options = ingest_options(config, project, repo, no_semantic);
    let graph = build_project_graph(root, &options)
        .with_context(|| format!("Failed to extract {}", root.display()))?;

    let mut result = ExtractResult::new(root, &graph, start.elapsed().as_millis() as u64);

    if let Some(out) = out {
        let json = serde_json::to_string_pretty(&graph)?;
        fs::write(out, json).with_context(|| format!("Failed to write {}", out))?;
        result.output = Some(out.to_string());
    }

    Output::new(result, format).render()
}
