use std::path::Path;

use rayon::prelude::*;

use super::document_store::DocumentStore;
use super::file_loader;
use crate::base::paths;
use crate::parser;

/// Loads workspace files from disk into a [`DocumentStore`].
#[derive(Debug, Default)]
pub struct WorkspaceLoader;

impl WorkspaceLoader {
    pub fn new() -> Self {
        Self
    }

    /// Read and parse every Robot file under `root` in parallel, then insert
    /// them in path order. Documents already open in the store (editor
    /// buffers) are left untouched. Returns the number of files loaded.
    pub fn load_directory(&self, root: &Path, store: &mut DocumentStore) -> Result<usize, String> {
        let paths = file_loader::collect_file_paths(root)?;
        let parsed: Vec<_> = paths
            .par_iter()
            .filter(|path| !store.contains(path))
            .filter_map(|path| match file_loader::load_file(path) {
                Ok(text) => {
                    let path = paths::normalize(path);
                    let tree = parser::parse(&text, &path);
                    Some((path, text, tree))
                }
                Err(e) => {
                    tracing::warn!("{e}");
                    None
                }
            })
            .collect();

        let count = parsed.len();
        for (path, text, tree) in parsed {
            store.insert_parsed(path, &text, tree);
        }
        tracing::info!(root = %root.display(), files = count, "workspace loaded");
        Ok(count)
    }

    /// Load a single file if it is not already in the store.
    pub fn load_file(&self, path: &Path, store: &mut DocumentStore) -> Result<bool, String> {
        if store.contains(path) {
            return Ok(false);
        }
        let text = file_loader::load_file(path)?;
        store.upsert(path, &text);
        Ok(true)
    }
}
