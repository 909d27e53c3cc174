//! Supergraph core: structural graph extraction and superimposition for Java
//! codebases.
//!
//! This crate turns a source tree into a canonical [`ProjectGraph`] (types,
//! methods, fields, and resolved dependencies) and aligns two such graphs to
//! classify every entity as unchanged, changed, added or removed.
//!
//! # Features
//!
//! - **Parallel parsing**: two-pass extraction over files concurrently using Rayon
//! - **Backend fallback**: external semantic resolver, tree-sitter, regex salvage
//! - **Type graph**: dependency and inheritance reachability via petgraph
//! - **Superimposition**: identity alignment with scoped unified-diff patches
//!
//! # Usage
//!
//! ```no_run
//! use std::path::Path;
//! use supergraph_core::{build_project_graph, GraphStore, IngestOptions, PatchOptions};
//!
//! let mut store = GraphStore::new();
//! let left = build_project_graph(Path::new("v1"), &IngestOptions::new("shop", "v1"))?;
//! let right = build_project_graph(Path::new("v2"), &IngestOptions::new("shop", "v2"))?;
//! store.replace_graph(left);
//! store.replace_graph(right);
//!
//! let patches = PatchOptions::new("v1", "v2");
//! let summary = store.superimpose_and_diff("shop", "v1", "v2", "release", Some(&patches))?;
//! println!("{}", summary.text());
//! # Ok::<(), supergraph_core::SupergraphError>(())
//! ```

pub mod assembler;
pub mod differ;
pub mod error;
pub mod extractor;
pub mod graph;
pub mod parser;
pub mod pipeline;
pub mod scanner;
pub mod store;
pub mod types;

pub use differ::{
    superimpose, DiffMarker, DiffStatus, DiffSummary, EntityKind, PatchOptions, Supergraph,
};
pub use error::{Result, SupergraphError};
pub use graph::{EdgeKind, RelationStats, TypeGraph};
pub use parser::{Backend, SemanticBackend};
pub use pipeline::{build_project_graph, CancellationFlag, IngestOptions};
pub use scanner::{scan_directory, ScanOptions, ScanResult};
pub use store::GraphStore;
pub use types::{
    DependencyEdge, DependencyVia, FieldRecord, MethodRecord, ProjectGraph, RepoStats, TypeRecord,
};

/// Library version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
