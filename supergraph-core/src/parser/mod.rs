//! Multi-backend parser dispatch.
//!
//! Backends are tried in priority order:
//!
//! 1. [`semantic`]: an external whole-project resolver. When it succeeds its
//!    graph replaces the in-process pipeline entirely.
//! 2. [`java`]: tree-sitter, per file.
//! 3. [`regex_fallback`]: package and import salvage for files the syntax
//!    parser rejects.
//!
//! Per-file backends never fail a project: a rejected file is downgraded and
//! reported through [`ParseOutcome::error`].

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SupergraphError;

pub mod helpers;
pub mod java;
pub mod regex_fallback;
pub mod semantic;
pub mod tree;

pub use semantic::SemanticBackend;
pub use tree::{
    FieldDecl, ImportDecl, MethodDecl, ParamDecl, SourceUnit, SyntaxNode, TypeDecl, TypeKind,
};

/// Identifier of the backend that produced a result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Backend {
    #[serde(rename = "semantic")]
    Semantic,
    #[serde(rename = "tree-sitter")]
    TreeSitter,
    #[serde(rename = "regex")]
    Regex,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Semantic => "semantic",
            Backend::TreeSitter => "tree-sitter",
            Backend::Regex => "regex",
        }
    }
}

/// Source text of one file handed to the per-file backends.
#[derive(Clone, Debug, Default)]
pub struct FileInfo {
    /// Path relative to the project root.
    pub path: String,
    pub source: String,
}

/// What the per-file dispatcher recovered for one file.
#[derive(Clone, Debug)]
pub struct ParseOutcome {
    pub unit: SourceUnit,
    pub backend: Backend,
    /// Set when the preferred backend rejected the file.
    pub error: Option<String>,
}

impl ParseOutcome {
    /// A file no backend could look at, such as one that failed to read.
    pub fn failed(error: String) -> Self {
        Self {
            unit: SourceUnit::default(),
            backend: Backend::Regex,
            error: Some(error),
        }
    }

    /// True when the file only yielded regex-salvaged context.
    pub fn is_degraded(&self) -> bool {
        self.backend == Backend::Regex
    }
}

/// Parse one file, degrading to regex salvage if the syntax parser fails.
pub fn parse_source(source: &str, path: &str) -> ParseOutcome {
    match java::parse(source) {
        Ok(unit) => ParseOutcome {
            unit,
            backend: Backend::TreeSitter,
            error: None,
        },
        Err(message) => {
            let err = SupergraphError::FileParse {
                path: path.to_string(),
                message,
            };
            debug!("{}; falling back to regex salvage", err);
            ParseOutcome {
                unit: regex_fallback::salvage(source),
                backend: Backend::Regex,
                error: Some(err.to_string()),
            }
        }
    }
}

/// Parse multiple files in parallel using rayon. Output order matches input.
pub fn parse_files_parallel(file_infos: &[FileInfo]) -> Vec<ParseOutcome> {
    file_infos
        .par_iter()
        .map(|info| parse_source(&info.source, &info.path))
        .collect()
}

/// Run `op` on a dedicated pool when a thread count is given, otherwise on
/// the global rayon pool.
pub fn with_thread_pool<R, F>(num_threads: Option<usize>, op: F) -> R
where
    R: Send,
    F: FnOnce() -> R + Send,
{
    let pool = match num_threads {
        Some(n) if n > 0 => rayon::ThreadPoolBuilder::new().num_threads(n).build().ok(),
        _ => None,
    };

    match pool {
        Some(pool) => pool.install(op),
        None => op(),
    }
}
