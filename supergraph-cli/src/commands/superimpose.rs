//! Superimpose command - ingest two source roots and diff them
//!
//! Both snapshots are ingested with overwrite semantics, aligned by identity
//! key, and classified. CHANGED markers carry unified-diff patches unless
//! disabled.

use std::path::Path;

use anyhow::Context;

use supergraph_core::{build_project_graph, GraphStore};

use super::extract::ingest_options;
use super::{impacted_types, patch_options, write_markers, DiffReport};
use crate::config::SgConfig;
use crate::output::{Output, OutputFormat};

/// Flags for one superimpose run.
pub struct SuperimposeArgs<'a> {
    pub left: &'a str,
    pub right: &'a str,
    pub left_repo: &'a str,
    pub right_repo: &'a str,
    pub supergraph: Option<&'a str>,
    pub project: Option<&'a str>,
    pub no_patches: bool,
    pub no_semantic: bool,
    pub markers_out: Option<&'a str>,
}

/// Run the superimpose command
pub fn run(args: SuperimposeArgs<'_>, config: &SgConfig, format: OutputFormat) -> anyhow::Result<()> {
    if args.left_repo == args.right_repo {
        anyhow::bail!(
            "--left-repo and --right-repo must differ (both are '{}')",
            args.left_repo
        );
    }

    let left_root = Path::new(args.left);
    let right_root = Path::new(args.right);

    let mut store = GraphStore::new();
    for (root, repo) in [(left_root, args.left_repo), (right_root, args.right_repo)] {
        let options = ingest_options(config, args.project, repo, args.no_semantic);
        let graph = build_project_graph(root, &options)
            .with_context(|| format!("Failed to extract {}", root.display()))?;
        store.replace_graph(graph);
    }

    let project = args.project.unwrap_or_else(|| config.project_name());
    let supergraph_id = args
        .supergraph
        .map(str::to_string)
        .unwrap_or_else(|| format!("{}..{}", args.left_repo, args.right_repo));

    let patches = (!args.no_patches && config.diff.attach_patches)
        .then(|| patch_options(config, left_root, right_root));

    let summary = store.superimpose_and_diff(
        project,
        args.left_repo,
        args.right_repo,
        &supergraph_id,
        patches.as_ref(),
    )?;

    let left = store.graph(project, args.left_repo)?;
    let impacted = store
        .supergraph(&supergraph_id)
        .map(|result| impacted_types(left, result))
        .unwrap_or_default();

    if let Some(out) = args.markers_out {
        write_markers(Path::new(out), &summary, store.markers(&supergraph_id))?;
    }

    let report = DiffReport {
        summary,
        impacted,
        markers_out: args.markers_out.map(str::to_string),
    };
    Output::new(report, format).render()
}
