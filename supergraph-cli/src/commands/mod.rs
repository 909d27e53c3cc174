//! Command implementations for the supergraph CLI
//!
//! Each command module provides a `run` function that executes the command logic.

pub mod diff;
pub mod extract;
pub mod superimpose;

use std::fs;
use std::path::Path;

use anyhow::Context;
use colored::Colorize;
use serde::Serialize;

use supergraph_core::{
    DiffMarker, DiffStatus, DiffSummary, EntityKind, PatchOptions, ProjectGraph, Supergraph,
    TypeGraph,
};

use crate::config::SgConfig;
use crate::output::{truncate, OutputConfig, OutputFormat, TableDisplay, TableOutput};

const KINDS: [EntityKind; 3] = [EntityKind::Type, EntityKind::Method, EntityKind::Field];
const STATUSES: [DiffStatus; 4] = [
    DiffStatus::Unchanged,
    DiffStatus::Changed,
    DiffStatus::Added,
    DiffStatus::Removed,
];

/// Everything a diff command reports.
#[derive(Debug, Serialize)]
pub struct DiffReport {
    pub summary: DiffSummary,
    /// Types reachable from CHANGED or REMOVED types in the left graph.
    pub impacted: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub markers_out: Option<String>,
}

impl TableDisplay for DiffReport {
    fn to_table(&self) -> String {
        let summary = &self.summary;
        let mut output = String::new();

        output.push_str(&format!(
            "{} {} {} -> {}\n",
            "SUPERGRAPH:".cyan().bold(),
            summary.supergraph_id.bold(),
            summary.left_repo.yellow(),
            summary.right_repo.green()
        ));
        output.push_str(&format!(
            "{} ({:.0}ms)\n\n",
            summary.text(),
            summary.duration_ms
        ));

        let rows: Vec<Vec<String>> = KINDS
            .iter()
            .map(|&kind| {
                let mut row = vec![kind.as_str().to_string()];
                row.extend(STATUSES.iter().map(|&s| summary.count(kind, s).to_string()));
                row
            })
            .collect();
        let config = OutputConfig::new(OutputFormat::Table);
        output.push_str(&TableOutput::from_rows(
            &["KIND", "UNCHANGED", "CHANGED", "ADDED", "REMOVED"],
            &rows,
            &config,
        ));
        output.push('\n');

        if !summary.sample_changed.is_empty() {
            output.push_str(&format!("\n{}\n", "CHANGED:".yellow().bold()));
            for entry in &summary.sample_changed {
                output.push_str(&format!(
                    "  {:<7} {}\n",
                    entry.kind.as_str(),
                    truncate(&entry.key, 100)
                ));
            }
        }

        if !self.impacted.is_empty() {
            output.push_str(&format!(
                "\n{} {}\n",
                "IMPACTED:".red().bold(),
                self.impacted.len()
            ));
            for fqn in &self.impacted {
                output.push_str(&format!("  {}\n", fqn));
            }
        }

        if let Some(path) = &self.markers_out {
            output.push_str(&format!("\nMarkers written to {}\n", path.dimmed()));
        }

        output
    }
}

#[derive(Serialize)]
struct MarkerFile<'a> {
    generated_at: String,
    summary: &'a DiffSummary,
    markers: &'a [DiffMarker],
}

/// Write the summary and full marker list as pretty JSON.
pub fn write_markers(path: &Path, summary: &DiffSummary, markers: &[DiffMarker]) -> anyhow::Result<()> {
    let file = MarkerFile {
        generated_at: chrono::Utc::now().to_rfc3339(),
        summary,
        markers,
    };
    let json = serde_json::to_string_pretty(&file)?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!("Wrote {} markers to {}", markers.len(), path.display());
    Ok(())
}

/// Patch options for two source roots, honoring `[diff]` settings.
pub fn patch_options(config: &SgConfig, left: &Path, right: &Path) -> PatchOptions {
    let options = PatchOptions::new(left, right);
    match config.diff.max_patch_chars {
        Some(max) => options.with_max_chars(max),
        None => options,
    }
}

/// Types in `left` that transitively depend on a CHANGED or REMOVED type.
pub fn impacted_types(left: &ProjectGraph, result: &Supergraph) -> Vec<String> {
    let seeds: Vec<&str> = result
        .markers
        .iter()
        .filter(|m| m.kind == EntityKind::Type)
        .filter(|m| matches!(m.status, DiffStatus::Changed | DiffStatus::Removed))
        .map(|m| m.key.as_str())
        .collect();
    if seeds.is_empty() {
        return Vec::new();
    }
    TypeGraph::from_project(left).impact(&seeds, None)
}
