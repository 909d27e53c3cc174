//! Source scanner built on the `ignore` crate.
//!
//! Walks a project root, keeps `.java` files (or whatever extensions the
//! caller asks for), and hashes every file in parallel. Results come back
//! sorted by relative path so that every later stage sees the same order
//! on every run.
//!
//! `.gitignore` rules and a project-local `.sgignore` file are honoured.

use ignore::WalkBuilder;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Instant;
use tracing::{debug, warn};
use xxhash_rust::xxh3::xxh3_64;

use crate::error::{Result, SupergraphError};

/// Name of the project-local ignore file.
pub const IGNORE_FILENAME: &str = ".sgignore";

/// Options controlling a scan.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanOptions {
    /// Extensions to keep, without the leading dot. Matched case-insensitively.
    pub extensions: Vec<String>,
    /// Extra glob patterns to exclude.
    pub ignore_patterns: Vec<String>,
    pub follow_symlinks: bool,
    pub respect_gitignore: bool,
    pub compute_hashes: bool,
    pub count_lines: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            extensions: vec!["java".to_string()],
            ignore_patterns: Vec::new(),
            follow_symlinks: false,
            respect_gitignore: true,
            compute_hashes: true,
            count_lines: false,
        }
    }
}

/// Information about a scanned file.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ScannedFile {
    /// Relative path from scan root, `/`-separated.
    pub path: String,

    /// File size in bytes.
    pub size_bytes: u64,

    /// Content hash (`xxh3:<hex>`), when hashing was requested.
    pub hash: Option<String>,

    /// Number of lines in the file.
    pub lines: u32,
}

/// Result of scanning a directory.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ScanResult {
    /// Discovered files, sorted by path.
    pub files: Vec<ScannedFile>,

    /// Number of files skipped by the extension filter.
    pub skipped_count: usize,

    /// Number of files that could not be read.
    pub error_count: usize,

    /// Time taken for the scan in milliseconds.
    pub duration_ms: f64,
}

impl ScanResult {
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Hash arbitrary content the way file hashes are rendered.
pub fn content_hash(content: &[u8]) -> String {
    format!("xxh3:{:016x}", xxh3_64(content))
}

fn compute_file_hash(path: &Path) -> Option<String> {
    let content = fs::read(path).ok()?;
    Some(content_hash(&content))
}

fn count_lines(path: &Path) -> u32 {
    fs::read(path)
        .map(|content| bytecount::count(&content, b'\n') as u32)
        .unwrap_or(0)
}

/// Render a path relative to `root` with `/` separators.
pub fn relative_path(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Scan a directory for source files.
pub fn scan_directory(root: &Path, options: &ScanOptions) -> Result<ScanResult> {
    let start = Instant::now();

    if !root.exists() {
        return Err(SupergraphError::RootNotFound {
            path: root.display().to_string(),
        });
    }

    let ext_filter: HashSet<String> = options
        .extensions
        .iter()
        .map(|e| e.trim_start_matches('.').to_lowercase())
        .collect();

    let mut builder = WalkBuilder::new(root);
    builder
        .hidden(false)
        .git_ignore(options.respect_gitignore)
        .git_global(options.respect_gitignore)
        .git_exclude(options.respect_gitignore)
        .require_git(false)
        .follow_links(options.follow_symlinks)
        .add_custom_ignore_filename(IGNORE_FILENAME);

    if !options.ignore_patterns.is_empty() {
        let mut override_builder = ignore::overrides::OverrideBuilder::new(root);
        for pattern in &options.ignore_patterns {
            // `!` turns an override into an exclusion
            if let Err(e) = override_builder.add(&format!("!{}", pattern)) {
                warn!("Invalid ignore pattern '{}': {}", pattern, e);
            }
        }
        match override_builder.build() {
            Ok(overrides) => {
                builder.overrides(overrides);
            }
            Err(e) => warn!("Ignoring scanner overrides: {}", e),
        }
    }

    let paths: Vec<_> = builder
        .build()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|ft| ft.is_file()).unwrap_or(false))
        .map(|entry| entry.into_path())
        .collect();

    let skipped = AtomicUsize::new(0);
    let errors = AtomicUsize::new(0);
    let result_files = Mutex::new(Vec::with_capacity(paths.len()));

    paths.par_iter().for_each(|path| {
        let keep = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|ext| ext_filter.is_empty() || ext_filter.contains(&ext.to_lowercase()))
            .unwrap_or(false);
        if !keep {
            skipped.fetch_add(1, Ordering::Relaxed);
            return;
        }

        let metadata = match fs::metadata(path) {
            Ok(m) => m,
            Err(e) => {
                debug!("Cannot stat {}: {}", path.display(), e);
                errors.fetch_add(1, Ordering::Relaxed);
                return;
            }
        };

        let hash = if options.compute_hashes {
            match compute_file_hash(path) {
                Some(hash) => Some(hash),
                None => {
                    errors.fetch_add(1, Ordering::Relaxed);
                    return;
                }
            }
        } else {
            None
        };

        let lines = if options.count_lines {
            count_lines(path)
        } else {
            0
        };

        let file_info = ScannedFile {
            path: relative_path(root, path),
            size_bytes: metadata.len(),
            hash,
            lines,
        };

        if let Ok(mut files) = result_files.lock() {
            files.push(file_info);
        }
    });

    let mut files = result_files.into_inner().unwrap_or_default();
    files.sort_by(|a, b| a.path.cmp(&b.path));

    let result = ScanResult {
        files,
        skipped_count: skipped.load(Ordering::Relaxed),
        error_count: errors.load(Ordering::Relaxed),
        duration_ms: start.elapsed().as_secs_f64() * 1000.0,
    };
    debug!(
        "Scanned {}: {} files, {} skipped, {} errors",
        root.display(),
        result.files.len(),
        result.skipped_count,
        result.error_count
    );
    Ok(result)
}
