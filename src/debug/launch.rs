//! Launch configuration and debuggee process startup.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::DebugError;
use super::transport::{ChildProcessTransport, DebugTransport};
use crate::project::WorkspaceConfig;
use crate::syntax::variable_base_name;

/// Everything needed to start one debuggee.
///
/// Values are passed to the interpreter unmodified; `env` is the complete
/// environment of the child process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LaunchConfig {
    /// Suite or directory to run.
    pub target: PathBuf,
    /// Extra arguments placed before the target.
    pub args: Vec<String>,
    pub search_paths: Vec<PathBuf>,
    pub variables: IndexMap<String, String>,
    pub interpreter: Option<PathBuf>,
    pub env: IndexMap<String, String>,
    pub cwd: Option<PathBuf>,
    /// Interpreter arguments selecting the runner.
    pub runner: Vec<String>,
    /// How long the process must stay alive to count as started.
    pub grace_ms: u64,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            target: PathBuf::new(),
            args: Vec::new(),
            search_paths: Vec::new(),
            variables: IndexMap::new(),
            interpreter: None,
            env: IndexMap::new(),
            cwd: None,
            runner: vec!["-m".to_string(), "robot".to_string()],
            grace_ms: 300,
        }
    }
}

impl LaunchConfig {
    pub fn new(target: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
            ..Self::default()
        }
    }

    /// Launch settings derived from the workspace configuration.
    pub fn from_workspace(target: impl Into<PathBuf>, config: &WorkspaceConfig, root: Option<&Path>) -> Self {
        Self {
            target: target.into(),
            search_paths: config.resolved_search_paths(root),
            variables: config.variables.clone(),
            interpreter: config.interpreter.clone(),
            cwd: root.map(Path::to_path_buf),
            grace_ms: config.launch_grace_ms,
            ..Self::default()
        }
    }

    /// Interpreter arguments: runner, `--pythonpath` per search path,
    /// `--variable NAME:VALUE` per variable, extra args, target.
    pub fn arguments(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = self.runner.iter().map(OsString::from).collect();
        for entry in &self.search_paths {
            args.push("--pythonpath".into());
            args.push(entry.into());
        }
        for (name, value) in &self.variables {
            let name = variable_base_name(name).unwrap_or(name);
            args.push("--variable".into());
            args.push(format!("{name}:{value}").into());
        }
        args.extend(self.args.iter().map(OsString::from));
        args.push(self.target.clone().into());
        args
    }

    /// The interpreter to run, resolved to an absolute path.
    pub fn resolve_interpreter(&self) -> Result<PathBuf, DebugError> {
        let candidate = match &self.interpreter {
            Some(path) if path.is_absolute() => {
                return if path.exists() {
                    Ok(path.clone())
                } else {
                    Err(DebugError::Launch(format!("interpreter not found: {}", path.display())))
                };
            }
            Some(path) => which::which(path),
            None => which::which("python3").or_else(|_| which::which("python")),
        };
        candidate.map_err(|e| DebugError::Launch(format!("no interpreter available: {e}")))
    }

    /// The process command. Only `env` reaches the child.
    pub fn command(&self) -> Result<Command, DebugError> {
        let mut command = Command::new(self.resolve_interpreter()?);
        command
            .args(self.arguments())
            .env_clear()
            .envs(&self.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(cwd) = &self.cwd {
            command.current_dir(cwd);
        }
        Ok(command)
    }
}

/// Start the debuggee. Fails when the process cannot be spawned or exits
/// within the grace period; nothing is left running on failure.
pub fn spawn(config: &LaunchConfig) -> Result<ChildProcessTransport, DebugError> {
    let mut command = config.command()?;
    tracing::info!(suite = %config.target.display(), ?command, "launching debuggee");
    let child = command
        .spawn()
        .map_err(|e| DebugError::Launch(format!("failed to start interpreter: {e}")))?;
    let mut transport = ChildProcessTransport::new(child)?;

    let grace = Duration::from_millis(config.grace_ms);
    match transport.exit_within(grace) {
        Ok(None) => Ok(transport),
        Ok(Some(status)) => {
            let stderr = transport.collect_stderr();
            let mut message = format!("interpreter exited immediately ({status})");
            let stderr = stderr.trim();
            if !stderr.is_empty() {
                message.push_str(": ");
                message.push_str(stderr);
            }
            Err(DebugError::Launch(message))
        }
        Err(e) => {
            transport.terminate(Duration::ZERO);
            Err(DebugError::Launch(format!("failed to watch interpreter: {e}")))
        }
    }
}
