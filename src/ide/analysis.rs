//! AnalysisHost and Analysis: owned workspace state and query snapshots.
//!
//! The `AnalysisHost` owns the document store and the workspace index and is
//! the only thing that mutates them. `Analysis` wraps one immutable index
//! snapshot, so every query made through it sees the same workspace state
//! even while the host keeps applying edits.
//!
//! ## Usage
//!
//! ```ignore
//! let mut host = AnalysisHost::new();
//! host.init(Some(root), config);
//!
//! // Apply file changes
//! host.set_file_content(path, text);
//!
//! // Get a snapshot for queries
//! let analysis = host.analysis();
//! let items = analysis.completions(path, Position::new(4, 8));
//! let targets = analysis.definition_of(path, Position::new(4, 6));
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use rustc_hash::FxHashSet;

use super::{CompletionItem, HoverResult, Reference, completion, goto, hover, references};
use crate::base::{Position, paths};
use crate::hir::{
    Diagnostic, IndexSnapshot, KeywordCandidate, Location, VariableCandidate, WorkspaceIndex,
    check_document,
};
use crate::pipeline::{AnalysisPipeline, DiagnosticSink};
use crate::project::{Document, DocumentStore, LibrarySpecCache, WorkspaceConfig, WorkspaceLoader};

/// Owns all mutable state for the IDE layer.
///
/// Apply changes via `set_file_content()` and `remove_file()`,
/// then get a consistent snapshot via `analysis()`.
pub struct AnalysisHost {
    root: Option<PathBuf>,
    config: WorkspaceConfig,
    documents: DocumentStore,
    index: Arc<WorkspaceIndex>,
    pipeline: Option<(Arc<AnalysisPipeline>, usize)>,
}

impl Default for AnalysisHost {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AnalysisHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisHost")
            .field("root", &self.root)
            .field("documents", &self.documents.len())
            .field("pipeline", &self.pipeline.is_some())
            .finish()
    }
}

impl AnalysisHost {
    /// Create a host with no workspace, using the default library cache.
    pub fn new() -> Self {
        Self::with_libraries(Arc::new(LibrarySpecCache::default()))
    }

    /// Create a host sharing an existing library spec cache.
    pub fn with_libraries(libraries: Arc<LibrarySpecCache>) -> Self {
        Self {
            root: None,
            config: WorkspaceConfig::default(),
            documents: DocumentStore::new(),
            index: Arc::new(WorkspaceIndex::new(libraries)),
            pipeline: None,
        }
    }

    /// Open a workspace: reset the index, load every Robot file under
    /// `root`, and index them. Returns the number of indexed documents.
    pub fn init(&mut self, root: Option<&Path>, config: WorkspaceConfig) -> usize {
        self.root = root.map(paths::normalize);
        self.config = config.clone();
        self.documents.clear();
        self.index.init(self.root.as_deref(), config);

        if let Some(root) = &self.root {
            if let Err(err) = WorkspaceLoader::new().load_directory(root, &mut self.documents) {
                tracing::warn!(root = %root.display(), error = %err, "workspace scan failed");
            }
        }
        let all: Vec<Arc<Document>> = self.documents.iter().cloned().collect();
        self.index.on_documents_changed(all);
        self.load_external_resources();
        tracing::info!(documents = self.documents.len(), "workspace indexed");
        self.documents.len()
    }

    /// Replace the configuration; every import is re-resolved.
    pub fn set_config(&mut self, config: WorkspaceConfig) {
        self.config = config.clone();
        self.index.set_config(self.root.as_deref(), config);
        self.load_external_resources();
    }

    pub fn config(&self) -> &WorkspaceConfig {
        &self.config
    }

    /// Set the content of a file, re-index it and its dependents, and
    /// schedule analysis. Returns the new document version.
    pub fn set_file_content(&mut self, path: impl AsRef<Path>, text: &str) -> u64 {
        let version = self.documents.upsert(path.as_ref(), text);
        if let Some(document) = self.documents.get(path.as_ref()) {
            self.index.on_document_changed(document);
            self.load_external_resources();
        }
        version
    }

    /// Remove a file from the workspace.
    pub fn remove_file(&mut self, path: impl AsRef<Path>) -> bool {
        let Some(removed) = self.documents.remove(path.as_ref()) else {
            return false;
        };
        self.index.on_document_removed(&removed.path);
        true
    }

    /// A library or variable file changed on disk.
    pub fn library_source_changed(&mut self, path: impl AsRef<Path>) {
        let path = paths::normalize(path.as_ref());
        self.index.libraries().invalidate_file(&path);
        self.index.on_library_source_changed(&path);
    }

    /// Start background analysis publishing into `sink`. Every document the
    /// index rebuilds from now on is validated.
    pub fn attach_pipeline(&mut self, sink: Arc<dyn DiagnosticSink>) {
        self.detach_pipeline();
        let debounce = Duration::from_millis(self.config.analysis_debounce_ms);
        let pipeline = Arc::new(AnalysisPipeline::semantic(sink, debounce));
        let notify = pipeline.clone();
        let id = self.index.subscribe(move |change, snapshot| {
            for path in &change.changed {
                if let Some(entry) = snapshot.document(path) {
                    notify.notify(path, entry.version(), snapshot.clone());
                }
            }
            for path in &change.removed {
                notify.document_removed(path);
            }
        });
        self.pipeline = Some((pipeline, id));
    }

    /// Stop background analysis.
    pub fn detach_pipeline(&mut self) {
        if let Some((pipeline, id)) = self.pipeline.take() {
            self.index.unsubscribe(id);
            pipeline.shutdown();
        }
    }

    pub fn pipeline(&self) -> Option<&Arc<AnalysisPipeline>> {
        self.pipeline.as_ref().map(|(pipeline, _)| pipeline)
    }

    /// Get an immutable snapshot for querying.
    pub fn analysis(&self) -> Analysis {
        Analysis {
            snapshot: self.index.snapshot(),
        }
    }

    pub fn index(&self) -> &Arc<WorkspaceIndex> {
        &self.index
    }

    pub fn documents(&self) -> &DocumentStore {
        &self.documents
    }

    /// Close the workspace: stop analysis and drop all state.
    pub fn teardown(&mut self) {
        self.detach_pipeline();
        self.index.teardown();
        self.documents.clear();
        self.root = None;
    }

    /// Resources imported from outside the workspace root are loaded on
    /// demand until no resolved resource target is missing from the store.
    fn load_external_resources(&mut self) {
        let loader = WorkspaceLoader::new();
        loop {
            let snapshot = self.index.snapshot();
            let missing: FxHashSet<PathBuf> = snapshot
                .documents()
                .flat_map(|entry| entry.resource_targets())
                .filter(|target| !self.documents.contains(target))
                .map(Path::to_path_buf)
                .collect();
            let mut loaded = Vec::new();
            for path in missing {
                match loader.load_file(&path, &mut self.documents) {
                    Ok(true) => loaded.extend(self.documents.get(&path)),
                    Ok(false) => {}
                    Err(err) => tracing::warn!(path = %path.display(), error = %err, "resource not loadable"),
                }
            }
            if loaded.is_empty() {
                return;
            }
            tracing::debug!(count = loaded.len(), "loaded external resources");
            self.index.on_documents_changed(loaded);
        }
    }
}

impl Drop for AnalysisHost {
    fn drop(&mut self) {
        self.detach_pipeline();
    }
}

/// Immutable snapshot for IDE queries.
///
/// Cheap to clone; never blocks on the host, the pipeline or any process.
#[derive(Clone, Debug)]
pub struct Analysis {
    snapshot: Arc<IndexSnapshot>,
}

impl Analysis {
    pub fn snapshot(&self) -> &Arc<IndexSnapshot> {
        &self.snapshot
    }

    /// Completion candidates at `position`, best first.
    pub fn completions(&self, path: impl AsRef<Path>, position: Position) -> Vec<CompletionItem> {
        completion::completions(&self.snapshot, &paths::normalize(path.as_ref()), position)
    }

    /// Definition locations of the reference at `position`.
    pub fn definition_of(&self, path: impl AsRef<Path>, position: Position) -> Vec<Location> {
        goto::definition_of(&self.snapshot, &paths::normalize(path.as_ref()), position)
    }

    pub fn hover(&self, path: impl AsRef<Path>, position: Position) -> Option<HoverResult> {
        hover::hover(&self.snapshot, &paths::normalize(path.as_ref()), position)
    }

    /// Call sites of the keyword at `position`, optionally with its
    /// definition.
    pub fn references(
        &self,
        path: impl AsRef<Path>,
        position: Position,
        include_declaration: bool,
    ) -> Vec<Reference> {
        references::find_references(
            &self.snapshot,
            &paths::normalize(path.as_ref()),
            position,
            include_declaration,
        )
    }

    pub fn lookup_keyword(&self, name: &str, from: impl AsRef<Path>) -> Vec<KeywordCandidate> {
        self.snapshot.lookup_keyword(name, &paths::normalize(from.as_ref()))
    }

    pub fn lookup_variable(&self, name: &str, from: impl AsRef<Path>) -> Vec<VariableCandidate> {
        self.snapshot
            .lookup_variable(name, &paths::normalize(from.as_ref()), None)
    }

    /// Run the semantic checks synchronously against this snapshot.
    pub fn diagnostics(&self, path: impl AsRef<Path>) -> Vec<Diagnostic> {
        check_document(&self.snapshot, &paths::normalize(path.as_ref()))
    }

    /// Whether `line` lies within an executable statement.
    pub fn is_executable_line(&self, path: impl AsRef<Path>, line: u32) -> bool {
        self.snapshot
            .document(&paths::normalize(path.as_ref()))
            .is_some_and(|entry| entry.document.tree.executable_step_at(line).is_some())
    }
}
