//! Out-of-process semantic backend.
//!
//! A whole-project resolver (typically a JVM tool) is launched once per
//! project as
//!
//! ```text
//! <command...> --root <abs root> --projectName <project> --repoId <repo>
//! ```
//!
//! and must print a [`ProjectGraph`] as JSON on stdout. The call is
//! synchronous and bounded by a timeout; on expiry the child is killed.

use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, SupergraphError};
use crate::types::ProjectGraph;

use super::Backend;

/// Default time budget for one invocation.
pub const DEFAULT_TIMEOUT_SECS: u64 = 600;

const POLL_INTERVAL: Duration = Duration::from_millis(25);
const MAX_STDERR_CHARS: usize = 2000;

/// Configuration of the external semantic backend.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SemanticBackend {
    /// Program followed by its fixed arguments.
    pub command: Vec<String>,
    pub timeout_secs: u64,
}

impl SemanticBackend {
    pub fn new(command: Vec<String>) -> Self {
        Self {
            command,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = timeout.as_secs().max(1);
        self
    }

    /// Conventional `java -jar` command for a jar under `root`, if one exists.
    ///
    /// Looks for `semantic-parser/target/semantic-parser.jar`, then the shaded
    /// jar, then any jar in that directory whose name mentions the tool.
    pub fn discover_jar(root: &Path) -> Option<Self> {
        let target = root.join("semantic-parser").join("target");
        let preferred = [
            target.join("semantic-parser.jar"),
            target.join("semantic-parser-shaded.jar"),
        ];
        let jar = preferred
            .into_iter()
            .find(|p| p.is_file())
            .or_else(|| {
                let mut jars: Vec<_> = std::fs::read_dir(&target)
                    .ok()?
                    .filter_map(|e| e.ok())
                    .map(|e| e.path())
                    .filter(|p| {
                        p.extension().map(|e| e == "jar").unwrap_or(false)
                            && p.file_name()
                                .map(|n| n.to_string_lossy().contains("semantic-parser"))
                                .unwrap_or(false)
                    })
                    .collect();
                jars.sort();
                jars.into_iter().next()
            })?;

        Some(Self::new(vec![
            "java".to_string(),
            "-jar".to_string(),
            jar.to_string_lossy().to_string(),
        ]))
    }

    /// Run the backend for one project root.
    pub fn invoke(&self, root: &Path, project: &str, repo: &str) -> Result<ProjectGraph> {
        let (program, fixed_args) = self.command.split_first().ok_or_else(|| {
            SupergraphError::BackendInvocation {
                status: "no command configured".to_string(),
                stderr: String::new(),
            }
        })?;

        let abs_root = root.canonicalize()?;
        let start = Instant::now();
        info!("Invoking semantic backend '{}' on {}", program, abs_root.display());

        let mut child = Command::new(program)
            .args(fixed_args)
            .arg("--root")
            .arg(&abs_root)
            .arg("--projectName")
            .arg(project)
            .arg("--repoId")
            .arg(repo)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| SupergraphError::BackendInvocation {
                status: format!("failed to start: {}", e),
                stderr: String::new(),
            })?;

        let stdout_reader = spawn_reader(child.stdout.take());
        let stderr_reader = spawn_reader(child.stderr.take());

        // On timeout the reader threads are left to finish on their own; a
        // grandchild may still hold the pipes open.
        let status = match wait_with_timeout(&mut child, Duration::from_secs(self.timeout_secs))? {
            Some(status) => status,
            None => {
                return Err(SupergraphError::BackendTimeout {
                    seconds: self.timeout_secs,
                })
            }
        };
        let stdout = stdout_reader.join().unwrap_or_default();
        let stderr = stderr_reader.join().unwrap_or_default();

        if !status.success() {
            return Err(SupergraphError::BackendInvocation {
                status: status.to_string(),
                stderr: truncate_chars(stderr.trim(), MAX_STDERR_CHARS),
            });
        }

        let mut graph = parse_output(&stdout)?;
        if graph.project.is_empty() {
            graph.project = project.to_string();
        }
        if graph.repo.is_empty() {
            graph.repo = repo.to_string();
        }
        graph.stats.backend_used = Backend::Semantic.as_str().to_string();

        debug!(
            "Semantic backend finished in {:?}: {} types, {} methods",
            start.elapsed(),
            graph.types.len(),
            graph.methods.len()
        );
        Ok(graph)
    }
}

/// Decode backend stdout into a graph.
pub fn parse_output(stdout: &str) -> Result<ProjectGraph> {
    serde_json::from_str(stdout).map_err(|e| SupergraphError::BackendOutput {
        message: e.to_string(),
    })
}

fn spawn_reader<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}

/// Poll until the child exits. `Ok(None)` means the budget ran out and the
/// child was killed.
fn wait_with_timeout(
    child: &mut Child,
    timeout: Duration,
) -> Result<Option<std::process::ExitStatus>> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
