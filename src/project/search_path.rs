//! File-level import resolution.
//!
//! Path-based imports try, in order: the literal as an absolute path, the
//! importing document's directory, then each configured search root. The
//! first existing candidate wins. Name-based library imports look for a
//! Python module of that name under the same roots.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::base::paths;

/// Roots and tools available to one import resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchContext {
    /// Directory of the importing document.
    pub importer_dir: Option<PathBuf>,
    /// Absolute search roots, in priority order.
    pub search_paths: Arc<[PathBuf]>,
    /// Interpreter used to introspect name-based libraries.
    pub interpreter: Option<PathBuf>,
}

impl SearchContext {
    pub fn new(search_paths: Vec<PathBuf>, interpreter: Option<PathBuf>) -> Self {
        Self {
            importer_dir: None,
            search_paths: search_paths.into(),
            interpreter,
        }
    }

    /// The same context seen from a document in `dir`.
    pub fn for_importer(&self, dir: Option<&Path>) -> Self {
        Self {
            importer_dir: dir.map(Path::to_path_buf),
            ..self.clone()
        }
    }

    /// Importer directory followed by the search roots, deduplicated.
    pub fn roots(&self) -> Vec<&Path> {
        let mut roots: Vec<&Path> = Vec::with_capacity(self.search_paths.len() + 1);
        for root in self.importer_dir.iter().chain(self.search_paths.iter()) {
            if !roots.contains(&root.as_path()) {
                roots.push(root);
            }
        }
        roots
    }
}

/// Outcome of resolving an import to a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ImportStatus {
    Resolved,
    NotFound,
    Ambiguous,
}

/// Result of looking up a path-valued import literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathLookup {
    File(PathBuf),
    Directory(PathBuf),
    NotFound { checked: Vec<PathBuf> },
}

/// Resolve a path-valued import literal (quotes and `${CURDIR}`/`${/}`
/// handled) against the context.
pub fn resolve_path(literal: &str, ctx: &SearchContext) -> PathLookup {
    let cleaned = paths::clean_import_literal(literal, ctx.importer_dir.as_deref());
    let relative = Path::new(&cleaned);

    let candidates: Vec<PathBuf> = if relative.is_absolute() {
        vec![paths::normalize(relative)]
    } else {
        ctx.roots()
            .into_iter()
            .map(|root| paths::normalize(&root.join(relative)))
            .collect()
    };

    for candidate in &candidates {
        if candidate.is_file() {
            return PathLookup::File(candidate.clone());
        }
        if candidate.is_dir() {
            return PathLookup::Directory(candidate.clone());
        }
    }
    tracing::debug!(
        literal,
        checked = ?candidates,
        "import target not found"
    );
    PathLookup::NotFound {
        checked: candidates,
    }
}

/// Python module files for a dotted module name (`pkg.mod` → `pkg/mod.py`
/// or `pkg/mod/__init__.py`) under every root. More than one hit means the
/// import is ambiguous.
pub fn find_python_modules(name: &str, ctx: &SearchContext) -> Vec<PathBuf> {
    let relative: PathBuf = name.split('.').collect();
    let mut found = Vec::new();
    for root in ctx.roots() {
        let base = root.join(&relative);
        let module = base.with_extension("py");
        let package = base.join("__init__.py");
        for candidate in [module, package] {
            if candidate.is_file() {
                let candidate = paths::normalize(&candidate);
                if !found.contains(&candidate) {
                    found.push(candidate);
                }
            }
        }
    }
    found
}
