//! Marker and result types for superimposition.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Maximum number of changed keys kept in [`DiffSummary::sample_changed`].
pub const SAMPLE_LIMIT: usize = 50;

/// Kind of entity a marker classifies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    Type,
    Method,
    Field,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Type => "Type",
            EntityKind::Method => "Method",
            EntityKind::Field => "Field",
        }
    }

    /// Lowercase plural used in summary text.
    pub fn plural(&self) -> &'static str {
        match self {
            EntityKind::Type => "types",
            EntityKind::Method => "methods",
            EntityKind::Field => "fields",
        }
    }

    /// Name of the alignment relationship for this kind.
    pub fn alignment_relation(&self) -> &'static str {
        match self {
            EntityKind::Type => "SAME_FQN",
            EntityKind::Method => "SAME_SIGNATURE",
            EntityKind::Field => "SAME_FIELD",
        }
    }
}

/// Classification of one entity across the two sides.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DiffStatus {
    Unchanged,
    Changed,
    Added,
    Removed,
}

impl DiffStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiffStatus::Unchanged => "UNCHANGED",
            DiffStatus::Changed => "CHANGED",
            DiffStatus::Added => "ADDED",
            DiffStatus::Removed => "REMOVED",
        }
    }
}

/// 1-indexed inclusive line range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRange {
    pub begin: u32,
    pub end: u32,
}

impl From<(u32, u32)> for LineRange {
    fn from((begin, end): (u32, u32)) -> Self {
        Self { begin, end }
    }
}

/// The classification record for one entity within a supergraph.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffMarker {
    pub supergraph_id: String,
    pub kind: EntityKind,
    pub key: String,
    pub status: DiffStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left_range: Option<LineRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right_range: Option<LineRange>,
    /// Unified diff text, only ever set on CHANGED markers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub truncated: bool,
}

impl DiffMarker {
    pub fn new(supergraph_id: &str, kind: EntityKind, key: String, status: DiffStatus) -> Self {
        Self {
            supergraph_id: supergraph_id.to_string(),
            kind,
            key,
            status,
            left_file: None,
            right_file: None,
            left_range: None,
            right_range: None,
            diff: None,
            truncated: false,
        }
    }

    pub fn with_files(mut self, left: Option<String>, right: Option<String>) -> Self {
        self.left_file = left;
        self.right_file = right;
        self
    }

    pub fn with_ranges(mut self, left: Option<LineRange>, right: Option<LineRange>) -> Self {
        self.left_range = left;
        self.right_range = right;
        self
    }
}

/// A 1:1 correspondence between a left and a right entity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alignment {
    pub kind: EntityKind,
    pub key: String,
}

/// One entry of the changed-key sample.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleEntry {
    pub kind: EntityKind,
    pub key: String,
}

/// Aggregate view of a diff run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DiffSummary {
    pub supergraph_id: String,
    pub project: String,
    pub left_repo: String,
    pub right_repo: String,
    /// kind -> status -> count, only for combinations that occur.
    pub counts: BTreeMap<String, BTreeMap<String, usize>>,
    /// First changed keys in marker order.
    pub sample_changed: Vec<SampleEntry>,
    pub duration_ms: f64,
}

impl DiffSummary {
    pub fn new(supergraph_id: &str, project: &str, left_repo: &str, right_repo: &str) -> Self {
        Self {
            supergraph_id: supergraph_id.to_string(),
            project: project.to_string(),
            left_repo: left_repo.to_string(),
            right_repo: right_repo.to_string(),
            ..Default::default()
        }
    }

    /// Count one marker.
    pub fn record(&mut self, marker: &DiffMarker) {
        *self
            .counts
            .entry(marker.kind.as_str().to_string())
            .or_default()
            .entry(marker.status.as_str().to_string())
            .or_default() += 1;

        if marker.status == DiffStatus::Changed && self.sample_changed.len() < SAMPLE_LIMIT {
            self.sample_changed.push(SampleEntry {
                kind: marker.kind,
                key: marker.key.clone(),
            });
        }
    }

    pub fn count(&self, kind: EntityKind, status: DiffStatus) -> usize {
        self.counts
            .get(kind.as_str())
            .and_then(|by_status| by_status.get(status.as_str()))
            .copied()
            .unwrap_or(0)
    }

    pub fn total(&self, kind: EntityKind) -> usize {
        self.counts
            .get(kind.as_str())
            .map(|by_status| by_status.values().sum())
            .unwrap_or(0)
    }

    pub fn has_changes(&self) -> bool {
        self.counts.values().any(|by_status| {
            by_status
                .iter()
                .any(|(status, n)| status != DiffStatus::Unchanged.as_str() && *n > 0)
        })
    }

    /// Generate human-readable summary string.
    pub fn text(&self) -> String {
        let mut parts = Vec::new();

        for kind in [EntityKind::Type, EntityKind::Method, EntityKind::Field] {
            let mut kind_parts = Vec::new();
            for (status, label) in [
                (DiffStatus::Added, "added"),
                (DiffStatus::Removed, "removed"),
                (DiffStatus::Changed, "changed"),
            ] {
                let n = self.count(kind, status);
                if n > 0 {
                    kind_parts.push(format!("{} {}", n, label));
                }
            }
            if !kind_parts.is_empty() {
                parts.push(format!("{}: {}", kind.plural(), kind_parts.join(", ")));
            }
        }

        if parts.is_empty() {
            "No changes".to_string()
        } else {
            parts.join("; ")
        }
    }
}

/// Complete stored result of one superimposition run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Supergraph {
    pub id: String,
    pub alignments: Vec<Alignment>,
    /// Sorted by (kind, key).
    pub markers: Vec<DiffMarker>,
    pub summary: DiffSummary,
}

impl Supergraph {
    pub fn marker(&self, kind: EntityKind, key: &str) -> Option<&DiffMarker> {
        self.markers
            .binary_search_by(|m| (m.kind, m.key.as_str()).cmp(&(kind, key)))
            .ok()
            .map(|idx| &self.markers[idx])
    }

    pub fn markers_with_status(&self, status: DiffStatus) -> impl Iterator<Item = &DiffMarker> {
        self.markers.iter().filter(move |m| m.status == status)
    }
}
