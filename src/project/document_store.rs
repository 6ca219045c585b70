//! In-memory documents keyed by path.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::base::Fingerprint;
use crate::base::paths;
use crate::parser;
use crate::syntax::SyntaxFile;

/// One workspace file: text, fingerprint and parsed tree.
///
/// Replaced wholesale on every edit, never patched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub path: PathBuf,
    pub text: Arc<str>,
    pub fingerprint: Fingerprint,
    pub tree: Arc<SyntaxFile>,
    pub version: u64,
}

impl Document {
    fn parse(path: PathBuf, text: &str, version: u64) -> Self {
        let tree = parser::parse(text, &path);
        Self {
            fingerprint: Fingerprint::of_text(text),
            text: Arc::from(text),
            tree: Arc::new(tree),
            version,
            path,
        }
    }

    /// Directory containing the document.
    pub fn dir(&self) -> Option<&Path> {
        self.path.parent()
    }

    /// File stem used as the source label of resource keywords.
    pub fn stem(&self) -> &str {
        self.path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
    }
}

/// Document storage with a store-wide monotonic version counter, so a path
/// that is removed and re-added still gets a strictly newer version.
#[derive(Debug, Default, Clone)]
pub struct DocumentStore {
    documents: FxHashMap<PathBuf, Arc<Document>>,
    last_version: u64,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `text` and make it the current document for `path`.
    /// Returns the new version.
    pub fn upsert(&mut self, path: impl AsRef<Path>, text: &str) -> u64 {
        let path = paths::normalize(path.as_ref());
        self.last_version += 1;
        let version = self.last_version;
        let document = Document::parse(path.clone(), text, version);
        tracing::debug!(
            path = %path.display(),
            version,
            fingerprint = %document.fingerprint.short(),
            errors = document.tree.errors.len(),
            "document upserted"
        );
        self.documents.insert(path, Arc::new(document));
        version
    }

    /// Insert an already parsed document (parallel workspace loading),
    /// assigning it a fresh version.
    pub(crate) fn insert_parsed(&mut self, path: PathBuf, text: &str, tree: SyntaxFile) -> u64 {
        self.last_version += 1;
        let version = self.last_version;
        let document = Document {
            fingerprint: Fingerprint::of_text(text),
            text: Arc::from(text),
            tree: Arc::new(tree),
            version,
            path: path.clone(),
        };
        self.documents.insert(path, Arc::new(document));
        version
    }

    pub fn remove(&mut self, path: impl AsRef<Path>) -> Option<Arc<Document>> {
        let path = paths::normalize(path.as_ref());
        let removed = self.documents.remove(&path);
        if removed.is_some() {
            tracing::debug!(path = %path.display(), "document removed");
        }
        removed
    }

    pub fn get(&self, path: impl AsRef<Path>) -> Option<Arc<Document>> {
        self.documents.get(&paths::normalize(path.as_ref())).cloned()
    }

    pub fn contains(&self, path: impl AsRef<Path>) -> bool {
        self.documents.contains_key(&paths::normalize(path.as_ref()))
    }

    pub fn version(&self, path: impl AsRef<Path>) -> Option<u64> {
        self.documents
            .get(&paths::normalize(path.as_ref()))
            .map(|d| d.version)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Document>> {
        self.documents.values()
    }

    pub fn clear(&mut self) {
        self.documents.clear();
    }
}
