//! Diff command - superimpose two previously extracted graphs
//!
//! Reads two graph JSON files (as written by `extract --out`). Patch text is
//! only attached when both source roots are given.

use std::fs;
use std::path::Path;

use anyhow::Context;

use supergraph_core::{superimpose, ProjectGraph};

use super::{impacted_types, patch_options, write_markers, DiffReport};
use crate::config::SgConfig;
use crate::output::{Output, OutputFormat};

fn load_graph(path: &str) -> anyhow::Result<ProjectGraph> {
    let content = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid graph JSON in {}", path))
}

/// Run the diff command
#[allow(clippy::too_many_arguments)]
pub fn run(
    left: &str,
    right: &str,
    supergraph_id: &str,
    left_root: Option<&str>,
    right_root: Option<&str>,
    markers_out: Option<&str>,
    config: &SgConfig,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let left_graph = load_graph(left)?;
    let right_graph = load_graph(right)?;

    let patches = match (left_root, right_root) {
        (Some(l), Some(r)) if config.diff.attach_patches => {
            Some(patch_options(config, Path::new(l), Path::new(r)))
        }
        (Some(_), None) | (None, Some(_)) => {
            tracing::warn!("Patches need both --left-root and --right-root; skipping");
            None
        }
        _ => None,
    };

    let result = superimpose(&left_graph, &right_graph, supergraph_id, patches.as_ref());

    if let Some(out) = markers_out {
        write_markers(Path::new(out), &result.summary, &result.markers)?;
    }

    let report = DiffReport {
        impacted: impacted_types(&left_graph, &result),
        summary: result.summary,
        markers_out: markers_out.map(str::to_string),
    };
    Output::new(report, format).render()
}
