//! Configuration loading from `.sgrc.toml`.
//!
//! The file is optional. Anything missing or unparsable falls back to
//! defaults, with a warning in the log.
//!
//! # Example Configuration
//!
//! ```toml
//! [project]
//! name = "shop"
//!
//! [scanner]
//! ignore = ["generated/", "**/*Test.java"]
//! respect_gitignore = true
//! threads = 8
//!
//! [backend]
//! semantic_command = ["java", "-jar", "tools/semantic-parser.jar"]
//! timeout_secs = 300
//!
//! [diff]
//! attach_patches = true
//! max_patch_chars = 50000
//!
//! [output]
//! format = "table"
//! color = true
//! ```

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use supergraph_core::{ScanOptions, SemanticBackend};

pub const CONFIG_FILE: &str = ".sgrc.toml";

/// Root configuration structure loaded from `.sgrc.toml`.
#[derive(Debug, Deserialize, Default)]
pub struct SgConfig {
    #[serde(default)]
    pub project: ProjectSection,

    #[serde(default)]
    pub scanner: ScannerConfig,

    /// External semantic backend settings.
    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub diff: DiffConfig,

    #[serde(default)]
    pub output: OutputSettings,
}

#[derive(Debug, Deserialize, Default)]
pub struct ProjectSection {
    /// Project name recorded in every graph; falls back to `java-project`.
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ScannerConfig {
    /// Extra glob patterns to exclude, on top of `.gitignore`.
    #[serde(default)]
    pub ignore: Vec<String>,

    #[serde(default = "default_true")]
    pub respect_gitignore: bool,

    /// Parser worker threads (default: one per core).
    #[serde(default)]
    pub threads: Option<usize>,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            ignore: Vec::new(),
            respect_gitignore: true,
            threads: None,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct BackendConfig {
    /// Program and fixed arguments of the semantic backend. Each run appends
    /// `--root <abs root> --projectName <project> --repoId <repo>`.
    #[serde(default)]
    pub semantic_command: Option<Vec<String>>,

    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Look for a packaged backend jar under the working directory.
    #[serde(default)]
    pub auto_discover: bool,
}

#[derive(Debug, Deserialize)]
pub struct DiffConfig {
    #[serde(default = "default_true")]
    pub attach_patches: bool,

    #[serde(default)]
    pub max_patch_chars: Option<usize>,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            attach_patches: true,
            max_patch_chars: None,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct OutputSettings {
    /// "table" or "json"
    #[serde(default)]
    pub format: Option<String>,

    #[serde(default)]
    pub color: Option<bool>,
}

fn default_true() -> bool {
    true
}

impl SgConfig {
    /// Load `.sgrc.toml` from `root`, or defaults if absent or broken.
    pub fn load(root: &Path) -> Self {
        let config_path = root.join(CONFIG_FILE);
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse {}: {}", CONFIG_FILE, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read {}: {}", CONFIG_FILE, e);
                }
            }
        }
        Self::default()
    }

    pub fn project_name(&self) -> &str {
        self.project.name.as_deref().unwrap_or("java-project")
    }

    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            ignore_patterns: self.scanner.ignore.clone(),
            respect_gitignore: self.scanner.respect_gitignore,
            ..ScanOptions::default()
        }
    }

    pub fn threads(&self) -> Option<usize> {
        self.scanner.threads.filter(|&n| n > 0)
    }

    /// The configured semantic backend, or a discovered jar when
    /// `auto_discover` is on.
    pub fn semantic_backend(&self, cwd: &Path) -> Option<SemanticBackend> {
        let backend = match &self.backend.semantic_command {
            Some(command) if !command.is_empty() => Some(SemanticBackend::new(command.clone())),
            _ if self.backend.auto_discover => SemanticBackend::discover_jar(cwd),
            _ => None,
        }?;

        Some(match self.backend.timeout_secs {
            Some(secs) => backend.with_timeout(Duration::from_secs(secs)),
            None => backend,
        })
    }

    pub fn default_format(&self) -> Option<&str> {
        self.output.format.as_deref()
    }

    pub fn use_color(&self) -> Option<bool> {
        self.output.color
    }
}
