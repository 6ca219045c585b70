//! Workspace configuration.
//!
//! Loading settings from the editor is the embedder's job; this module only
//! defines the shape and its defaults.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while reading a configuration document.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid workspace configuration: {0}")]
    Json(#[from] serde_json::Error),
    #[error("interpreter not found: {}", .0.display())]
    InterpreterNotFound(PathBuf),
}

/// Where workspace-configured variables sit relative to resource-imported
/// variable tables in variable lookup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VariablePrecedence {
    /// local > document table > resources > workspace > built-ins
    #[default]
    WorkspaceAfterResources,
    /// local > document table > workspace > resources > built-ins
    WorkspaceBeforeResources,
}

/// Settings that influence import resolution, analysis and launching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkspaceConfig {
    /// Extra roots searched for resources and libraries, after the
    /// importing document's directory. Relative entries are taken relative
    /// to the workspace root.
    pub search_paths: Vec<PathBuf>,
    /// Workspace variables, `NAME` or `${NAME}` → value.
    pub variables: IndexMap<String, String>,
    /// Python interpreter used for library introspection and debugging.
    pub interpreter: Option<PathBuf>,
    /// Directory for persisted library specs.
    pub cache_dir: Option<PathBuf>,
    pub analysis_debounce_ms: u64,
    pub variable_precedence: VariablePrecedence,
    /// How long a launched interpreter must survive to count as started.
    pub launch_grace_ms: u64,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            search_paths: Vec::new(),
            variables: IndexMap::new(),
            interpreter: None,
            cache_dir: None,
            analysis_debounce_ms: 300,
            variable_precedence: VariablePrecedence::default(),
            launch_grace_ms: 300,
        }
    }
}

impl WorkspaceConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        Ok(serde_json::from_value(value)?)
    }

    /// Search paths made absolute against `root`.
    pub fn resolved_search_paths(&self, root: Option<&Path>) -> Vec<PathBuf> {
        self.search_paths
            .iter()
            .map(|p| match root {
                Some(root) if p.is_relative() => crate::base::paths::normalize(&root.join(p)),
                _ => crate::base::paths::normalize(p),
            })
            .collect()
    }

    /// Workspace variables keyed by their decorated name (`${NAME}`).
    pub fn decorated_variables(&self) -> impl Iterator<Item = (String, &str)> {
        self.variables.iter().map(|(name, value)| {
            let decorated = if crate::syntax::is_variable_text(name) {
                name.clone()
            } else {
                format!("${{{name}}}")
            };
            (decorated, value.as_str())
        })
    }

    /// The configured interpreter, or the first `python3`/`python` on `PATH`.
    ///
    /// `None` disables interpreter introspection; bundled specs and static
    /// source scanning still work.
    pub fn discover_interpreter(&self) -> Option<PathBuf> {
        if let Some(explicit) = &self.interpreter {
            return Some(explicit.clone());
        }
        ["python3", "python"]
            .iter()
            .find_map(|name| which::which(name).ok())
    }

    /// The configured interpreter, checked to exist.
    pub fn require_interpreter(&self) -> Result<PathBuf, ConfigError> {
        match self.discover_interpreter() {
            Some(path) if path.exists() || which::which(&path).is_ok() => Ok(path),
            Some(path) => Err(ConfigError::InterpreterNotFound(path)),
            None => Err(ConfigError::InterpreterNotFound(PathBuf::from("python3"))),
        }
    }
}
