//! In-memory store of project snapshots and superimposition results.
//!
//! Snapshots are keyed by (project, repo); results by supergraph id. Both are
//! immutable once stored: every write replaces whole entries.

use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info};

use crate::differ::{superimpose, DiffMarker, DiffSummary, PatchOptions, Supergraph};
use crate::error::{Result, SupergraphError};
use crate::types::{ProjectGraph, RepoStats};

/// Snapshots and diff results for any number of projects.
#[derive(Debug, Default)]
pub struct GraphStore {
    graphs: BTreeMap<(String, String), ProjectGraph>,
    supergraphs: BTreeMap<String, Supergraph>,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `graph` into the stored snapshot for its (project, repo).
    /// Records with an identity key already present are replaced in place.
    pub fn upsert_graph(&mut self, graph: ProjectGraph) {
        let key = (graph.project.clone(), graph.repo.clone());
        match self.graphs.get_mut(&key) {
            Some(existing) => {
                merge_into(existing, graph);
                debug!("Upserted snapshot {}/{}", key.0, key.1);
            }
            None => {
                self.graphs.insert(key, graph);
            }
        }
    }

    /// Drop everything stored under the graph's (project, repo), then store it.
    pub fn replace_graph(&mut self, graph: ProjectGraph) {
        let key = (graph.project.clone(), graph.repo.clone());
        if self.graphs.insert(key, graph).is_some() {
            debug!("Replaced existing snapshot");
        }
    }

    /// Remove a snapshot. Returns whether one existed.
    pub fn delete_repo(&mut self, project: &str, repo: &str) -> bool {
        self.graphs
            .remove(&(project.to_string(), repo.to_string()))
            .is_some()
    }

    pub fn graph(&self, project: &str, repo: &str) -> Result<&ProjectGraph> {
        self.graphs
            .get(&(project.to_string(), repo.to_string()))
            .ok_or_else(|| SupergraphError::RepoNotFound {
                project: project.to_string(),
                repo: repo.to_string(),
            })
    }

    pub fn repo_stats(&self, project: &str, repo: &str) -> Result<RepoStats> {
        self.graph(project, repo).map(|g| g.repo_stats())
    }

    /// Repos stored for a project, in name order.
    pub fn repos(&self, project: &str) -> Vec<&str> {
        self.graphs
            .keys()
            .filter(|(p, _)| p == project)
            .map(|(_, r)| r.as_str())
            .collect()
    }

    /// Diff two stored snapshots and store the result under `supergraph_id`,
    /// discarding whatever that id held before.
    pub fn superimpose_and_diff(
        &mut self,
        project: &str,
        left_repo: &str,
        right_repo: &str,
        supergraph_id: &str,
        patches: Option<&PatchOptions>,
    ) -> Result<DiffSummary> {
        self.delete_supergraph(supergraph_id);

        let left = self.graph(project, left_repo)?;
        let right = self.graph(project, right_repo)?;
        let mut result = superimpose(left, right, supergraph_id, patches);
        result.summary.project = project.to_string();

        let summary = result.summary.clone();
        info!(
            "Stored supergraph '{}' with {} markers",
            supergraph_id,
            result.markers.len()
        );
        self.supergraphs.insert(supergraph_id.to_string(), result);
        Ok(summary)
    }

    /// Remove a stored result. Returns whether one existed.
    pub fn delete_supergraph(&mut self, supergraph_id: &str) -> bool {
        self.supergraphs.remove(supergraph_id).is_some()
    }

    pub fn supergraph(&self, supergraph_id: &str) -> Option<&Supergraph> {
        self.supergraphs.get(supergraph_id)
    }

    pub fn diff_summary(&self, supergraph_id: &str) -> Option<&DiffSummary> {
        self.supergraph(supergraph_id).map(|s| &s.summary)
    }

    pub fn markers(&self, supergraph_id: &str) -> &[DiffMarker] {
        self.supergraph(supergraph_id)
            .map(|s| s.markers.as_slice())
            .unwrap_or(&[])
    }
}

fn merge_into(existing: &mut ProjectGraph, incoming: ProjectGraph) {
    existing.types.extend(incoming.types);

    for method in incoming.methods {
        match existing
            .methods
            .iter_mut()
            .find(|m| m.owner_fqn == method.owner_fqn && m.signature == method.signature)
        {
            Some(slot) => *slot = method,
            None => existing.methods.push(method),
        }
    }

    for field in incoming.fields {
        match existing
            .fields
            .iter_mut()
            .find(|f| f.owner_fqn == field.owner_fqn && f.name == field.name)
        {
            Some(slot) => *slot = field,
            None => existing.fields.push(field),
        }
    }

    let seen: HashSet<_> = existing
        .dependencies
        .iter()
        .map(|d| (d.from_fqn.clone(), d.to_fqn.clone(), d.via, d.file.clone()))
        .collect();
    existing.dependencies.extend(
        incoming
            .dependencies
            .into_iter()
            .filter(|d| {
                !seen.contains(&(d.from_fqn.clone(), d.to_fqn.clone(), d.via, d.file.clone()))
            }),
    );

    extend_unique(&mut existing.extends, incoming.extends);
    extend_unique(&mut existing.implements, incoming.implements);
    extend_unique(&mut existing.calls, incoming.calls);
    existing.stats = incoming.stats;
}

fn extend_unique<T: PartialEq>(target: &mut Vec<T>, items: Vec<T>) {
    for item in items {
        if !target.contains(&item) {
            target.push(item);
        }
    }
}
