//! Workspace index and name resolution.
//!
//! The index is a copy-on-write [`IndexSnapshot`] behind an `Arc`. The single
//! writer (document changes) clones the current snapshot, patches only the
//! rows of the affected documents and swaps the `Arc`; readers holding an
//! older snapshot keep a consistent view and never see a partial patch.
//!
//! Keyword precedence: local definitions, then resources (transitively,
//! depth-first), then library imports, then `BuiltIn`. Variable precedence:
//! local assignments, the document's variable table, then resource variable
//! tables and workspace variables (order configurable), then built-ins.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;

use super::name::{KeywordName, normalize_name, normalize_variable};
use super::symbols::{DocumentSymbols, extract_symbols, local_variables};
use crate::base::constants::{BUILTIN_LIBRARY, BUILTIN_VARIABLES};
use crate::base::{Position, Span};
use crate::project::libspec::{ArgSpec, LibraryImport};
use crate::project::search_path::{PathLookup, resolve_path};
use crate::project::variable_file::load_variable_file;
use crate::project::{
    Document, ImportStatus, LibrarySpecCache, ResolvedLibrary, SearchContext, VariablePrecedence,
    WorkspaceConfig,
};
use crate::syntax::ImportKind;

// ============================================================================
// INDEX ROWS
// ============================================================================

/// A source location.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    pub path: PathBuf,
    pub span: Span,
}

/// One import of a document, resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportEntry {
    pub kind: ImportKind,
    /// The import argument as written.
    pub literal: SmolStr,
    /// Span of the name cell.
    pub span: Span,
    pub status: ImportStatus,
    /// Resolved absolute target (file or directory).
    pub target: Option<PathBuf>,
    pub library: Option<ResolvedLibrary>,
    pub is_directory: bool,
    pub message: Option<String>,
    /// Variables contributed by a `Variables` import.
    pub variables: Vec<(SmolStr, String)>,
}

/// Index row for one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentEntry {
    pub document: Arc<Document>,
    pub symbols: DocumentSymbols,
    pub imports: Vec<ImportEntry>,
}

impl DocumentEntry {
    pub fn path(&self) -> &Path {
        &self.document.path
    }

    pub fn version(&self) -> u64 {
        self.document.version
    }

    /// Resolved resource files imported directly by this document.
    pub fn resource_targets(&self) -> impl Iterator<Item = &Path> {
        self.imports
            .iter()
            .filter(|i| {
                i.kind == ImportKind::Resource
                    && i.status == ImportStatus::Resolved
                    && !i.is_directory
            })
            .filter_map(|i| i.target.as_deref())
    }

    fn has_unresolved_imports(&self) -> bool {
        self.imports.iter().any(|i| i.status == ImportStatus::NotFound)
    }
}

/// Keyword precedence tiers, highest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeywordTier {
    Local,
    Resource,
    Library,
    BuiltIn,
}

/// A keyword definition visible from some document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordCandidate {
    pub name: SmolStr,
    pub tier: KeywordTier,
    /// Library name (alias when given) or resource file stem.
    pub source: SmolStr,
    pub args: Vec<ArgSpec>,
    pub doc: String,
    pub location: Option<Location>,
    pub embedded: bool,
}

impl KeywordCandidate {
    /// `arg1, arg2=default, *rest`
    pub fn args_display(&self) -> String {
        self.args
            .iter()
            .map(ArgSpec::display)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Variable precedence tiers in their default order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VariableTier {
    Local,
    Document,
    Resource,
    Workspace,
    BuiltIn,
}

/// A variable definition visible from some position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableCandidate {
    pub name: SmolStr,
    pub normalized: String,
    pub value: String,
    pub tier: VariableTier,
    pub source: SmolStr,
    pub location: Option<Location>,
}

// ============================================================================
// SNAPSHOT
// ============================================================================

/// Immutable view of the whole workspace.
#[derive(Debug, Clone, Default)]
pub struct IndexSnapshot {
    generation: u64,
    documents: FxHashMap<PathBuf, Arc<DocumentEntry>>,
    /// Normalised keyword name → documents defining it.
    keyword_sites: FxHashMap<String, Vec<PathBuf>>,
    /// Normalised variable name → documents declaring it in a table.
    variable_sites: FxHashMap<String, Vec<PathBuf>>,
    /// Resolved import target → importing documents.
    dependents: FxHashMap<PathBuf, FxHashSet<PathBuf>>,
    /// Documents with at least one not-found import.
    unresolved: FxHashSet<PathBuf>,
    context: SearchContext,
    config: Arc<WorkspaceConfig>,
    builtin: Option<ResolvedLibrary>,
}

impl IndexSnapshot {
    /// Incremented on every published patch.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn config(&self) -> &WorkspaceConfig {
        &self.config
    }

    pub fn context(&self) -> &SearchContext {
        &self.context
    }

    pub fn document(&self, path: &Path) -> Option<&Arc<DocumentEntry>> {
        self.documents.get(path)
    }

    pub fn documents(&self) -> impl Iterator<Item = &Arc<DocumentEntry>> {
        self.documents.values()
    }

    pub fn builtin(&self) -> Option<&ResolvedLibrary> {
        self.builtin.as_ref()
    }

    /// Documents that define a keyword with this (normalised) name anywhere
    /// in the workspace, regardless of imports.
    pub fn keyword_sites(&self, name: &str) -> &[PathBuf] {
        self.keyword_sites
            .get(&normalize_name(name))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Documents declaring a variable with this name in a variable table.
    pub fn variable_sites(&self, name: &str) -> &[PathBuf] {
        let key = normalize_variable(name).unwrap_or_else(|| normalize_name(name));
        self.variable_sites
            .get(&key)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Documents that import `target`.
    pub fn importers_of(&self, target: &Path) -> Vec<&Path> {
        self.dependents
            .get(target)
            .map(|set| set.iter().map(PathBuf::as_path).collect())
            .unwrap_or_default()
    }

    /// Every document that imports one of `paths`, directly or through
    /// other importers. `paths` themselves are excluded.
    pub fn transitive_importers(&self, paths: &[PathBuf]) -> Vec<PathBuf> {
        let mut seen: FxHashSet<&Path> = paths.iter().map(PathBuf::as_path).collect();
        let mut queue: Vec<&Path> = paths.iter().map(PathBuf::as_path).collect();
        let mut out = Vec::new();
        while let Some(target) = queue.pop() {
            let Some(importers) = self.dependents.get(target) else {
                continue;
            };
            for importer in importers {
                if seen.insert(importer) {
                    out.push(importer.clone());
                    queue.push(importer);
                }
            }
        }
        out.sort();
        out
    }

    /// Resource documents reachable from `from`, depth-first in import
    /// order. Cycles are broken by a visited set; `from` is excluded.
    pub fn resource_closure(&self, from: &Path) -> Vec<Arc<DocumentEntry>> {
        let mut visited = FxHashSet::default();
        visited.insert(from.to_path_buf());
        let mut out = Vec::new();
        self.visit_resources(from, &mut visited, &mut out);
        out
    }

    fn visit_resources(
        &self,
        path: &Path,
        visited: &mut FxHashSet<PathBuf>,
        out: &mut Vec<Arc<DocumentEntry>>,
    ) {
        let Some(entry) = self.documents.get(path) else {
            return;
        };
        for target in entry.resource_targets() {
            if !visited.insert(target.to_path_buf()) {
                continue;
            }
            if let Some(child) = self.documents.get(target) {
                out.push(child.clone());
                self.visit_resources(target, visited, out);
            }
        }
    }

    /// Libraries visible from `from`: its own imports first, then those of
    /// its resources. `BuiltIn` is not included.
    pub fn libraries_in_scope(&self, from: &Path) -> Vec<ResolvedLibrary> {
        let mut libraries: Vec<ResolvedLibrary> = Vec::new();
        let own = self.documents.get(from).into_iter().cloned();
        for entry in own.chain(self.resource_closure(from)) {
            for import in &entry.imports {
                let Some(library) = &import.library else {
                    continue;
                };
                if library.spec.name == BUILTIN_LIBRARY {
                    continue;
                }
                let seen = libraries
                    .iter()
                    .any(|l| Arc::ptr_eq(&l.spec, &library.spec) && l.alias == library.alias);
                if !seen {
                    libraries.push(library.clone());
                }
            }
        }
        libraries
    }

    // ------------------------------------------------------------------
    // Keywords
    // ------------------------------------------------------------------

    /// Every keyword visible from `from`, in precedence order.
    pub fn keywords_in_scope(&self, from: &Path) -> Vec<KeywordCandidate> {
        self.collect_keywords(from, |_, _| true)
    }

    /// Keyword definitions a call `name` in `from` may refer to, ordered by
    /// precedence; exact names before embedded patterns within a tier.
    /// Unknown names yield an empty list.
    pub fn lookup_keyword(&self, name: &str, from: &Path) -> Vec<KeywordCandidate> {
        let forms = KeywordName::call_forms(name);
        if forms.is_empty() {
            return Vec::new();
        }
        let mut found = self.collect_keywords(from, |def, source| {
            let source = normalize_name(source);
            forms.iter().any(|form| def.matches(form, &source))
        });
        found.sort_by_key(|c| (c.tier, c.embedded));
        found
    }

    fn collect_keywords(
        &self,
        from: &Path,
        accept: impl Fn(&KeywordName, &str) -> bool,
    ) -> Vec<KeywordCandidate> {
        let mut out = Vec::new();

        if let Some(entry) = self.documents.get(from) {
            push_document_keywords(entry, KeywordTier::Local, &accept, &mut out);
        }
        for resource in self.resource_closure(from) {
            push_document_keywords(&resource, KeywordTier::Resource, &accept, &mut out);
        }
        for library in self.libraries_in_scope(from) {
            push_library_keywords(&library, KeywordTier::Library, &accept, &mut out);
        }
        if let Some(builtin) = &self.builtin {
            push_library_keywords(builtin, KeywordTier::BuiltIn, &accept, &mut out);
        }
        out
    }

    // ------------------------------------------------------------------
    // Variables
    // ------------------------------------------------------------------

    /// Definitions of variable `name` visible from `from` (at `at`, when
    /// given, for local assignments), highest precedence first.
    pub fn lookup_variable(
        &self,
        name: &str,
        from: &Path,
        at: Option<Position>,
    ) -> Vec<VariableCandidate> {
        let key = normalize_variable(name).unwrap_or_else(|| normalize_name(name));
        self.variables_in_scope(from, at)
            .into_iter()
            .filter(|v| v.normalized == key)
            .collect()
    }

    /// Every variable visible from `from`, highest precedence first.
    /// Shadowed definitions are kept; callers wanting one entry per name
    /// take the first.
    pub fn variables_in_scope(&self, from: &Path, at: Option<Position>) -> Vec<VariableCandidate> {
        let mut out = Vec::new();
        let entry = self.documents.get(from);

        if let (Some(entry), Some(at)) = (entry, at) {
            if let Some(block) = entry.document.tree.block_at(at.line) {
                let source = SmolStr::new(block.name.text.as_str());
                for local in local_variables(block, at.line).into_iter().rev() {
                    out.push(VariableCandidate {
                        location: Some(Location {
                            path: from.to_path_buf(),
                            span: local.span,
                        }),
                        name: local.name,
                        normalized: local.normalized,
                        value: local.value,
                        tier: VariableTier::Local,
                        source: source.clone(),
                    });
                }
            }
        }

        if let Some(entry) = entry {
            push_document_variables(entry, VariableTier::Document, &mut out);
            push_import_variables(entry, &mut out);
        }

        let mut resources = Vec::new();
        for resource in self.resource_closure(from) {
            push_document_variables(&resource, VariableTier::Resource, &mut resources);
            push_import_variables(&resource, &mut resources);
        }
        let workspace: Vec<_> = self
            .config
            .decorated_variables()
            .filter_map(|(name, value)| {
                Some(VariableCandidate {
                    normalized: normalize_variable(&name)?,
                    name: SmolStr::new(name),
                    value: value.to_string(),
                    tier: VariableTier::Workspace,
                    source: SmolStr::new_static("workspace"),
                    location: None,
                })
            })
            .collect();

        match self.config.variable_precedence {
            VariablePrecedence::WorkspaceAfterResources => {
                out.extend(resources);
                out.extend(workspace);
            }
            VariablePrecedence::WorkspaceBeforeResources => {
                out.extend(workspace);
                out.extend(resources);
            }
        }

        out.extend(BUILTIN_VARIABLES.iter().filter_map(|(name, doc)| {
            Some(VariableCandidate {
                normalized: normalize_variable(name)?,
                name: SmolStr::new_static(name),
                value: (*doc).to_string(),
                tier: VariableTier::BuiltIn,
                source: SmolStr::new_static(BUILTIN_LIBRARY),
                location: None,
            })
        }));
        out
    }

    // ------------------------------------------------------------------
    // Patching
    // ------------------------------------------------------------------

    fn remove_rows(&mut self, path: &Path) -> Option<Arc<DocumentEntry>> {
        let old = self.documents.remove(path)?;
        for def in &old.symbols.keywords {
            remove_site(&mut self.keyword_sites, &def.name.normalized(), path);
        }
        for var in &old.symbols.variables {
            remove_site(&mut self.variable_sites, &var.normalized, path);
        }
        for import in &old.imports {
            if let Some(target) = &import.target {
                if let Some(importers) = self.dependents.get_mut(target) {
                    importers.remove(path);
                    if importers.is_empty() {
                        self.dependents.remove(target);
                    }
                }
            }
        }
        self.unresolved.remove(path);
        Some(old)
    }

    fn insert_rows(&mut self, entry: DocumentEntry) {
        let path = entry.document.path.clone();
        self.remove_rows(&path);
        for def in &entry.symbols.keywords {
            add_site(&mut self.keyword_sites, def.name.normalized(), &path);
        }
        for var in &entry.symbols.variables {
            add_site(&mut self.variable_sites, var.normalized.clone(), &path);
        }
        for import in &entry.imports {
            if let Some(target) = &import.target {
                self.dependents
                    .entry(target.clone())
                    .or_default()
                    .insert(path.clone());
            }
        }
        if entry.has_unresolved_imports() {
            self.unresolved.insert(path.clone());
        }
        self.documents.insert(path, Arc::new(entry));
    }
}

fn add_site(map: &mut FxHashMap<String, Vec<PathBuf>>, key: String, path: &Path) {
    let sites = map.entry(key).or_default();
    if !sites.iter().any(|p| p == path) {
        sites.push(path.to_path_buf());
    }
}

fn remove_site(map: &mut FxHashMap<String, Vec<PathBuf>>, key: &str, path: &Path) {
    if let Some(sites) = map.get_mut(key) {
        sites.retain(|p| p != path);
        if sites.is_empty() {
            map.remove(key);
        }
    }
}

fn push_document_keywords(
    entry: &DocumentEntry,
    tier: KeywordTier,
    accept: &impl Fn(&KeywordName, &str) -> bool,
    out: &mut Vec<KeywordCandidate>,
) {
    let source = entry.document.stem();
    for def in &entry.symbols.keywords {
        if !accept(&def.name, source) {
            continue;
        }
        out.push(KeywordCandidate {
            name: SmolStr::new(def.raw_name()),
            tier,
            source: SmolStr::new(source),
            args: def.args.clone(),
            doc: def.doc.clone(),
            location: Some(Location {
                path: entry.document.path.clone(),
                span: def.span,
            }),
            embedded: def.name.is_embedded(),
        });
    }
}

fn push_library_keywords(
    library: &ResolvedLibrary,
    tier: KeywordTier,
    accept: &impl Fn(&KeywordName, &str) -> bool,
    out: &mut Vec<KeywordCandidate>,
) {
    let source = library.name();
    for keyword in &library.spec.keywords {
        let name = KeywordName::definition(&keyword.name);
        // Both the alias and the real library name qualify calls.
        let accepted = accept(&name, source)
            || (library.alias.is_some() && accept(&name, &library.spec.name));
        if !accepted {
            continue;
        }
        let location = keyword
            .source
            .clone()
            .or_else(|| library.spec.source.clone())
            .map(|path| {
                let line = keyword.lineno.unwrap_or(1).saturating_sub(1);
                Location {
                    path,
                    span: Span::line_start(line),
                }
            });
        out.push(KeywordCandidate {
            name: keyword.name.clone(),
            tier,
            source: SmolStr::new(source),
            args: keyword.args.clone(),
            doc: keyword.doc.clone(),
            location,
            embedded: name.is_embedded(),
        });
    }
}

fn push_document_variables(entry: &DocumentEntry, tier: VariableTier, out: &mut Vec<VariableCandidate>) {
    let source = SmolStr::new(entry.document.stem());
    for var in &entry.symbols.variables {
        out.push(VariableCandidate {
            name: var.name.clone(),
            normalized: var.normalized.clone(),
            value: var.value.clone(),
            tier,
            source: source.clone(),
            location: Some(Location {
                path: entry.document.path.clone(),
                span: var.span,
            }),
        });
    }
}

/// Variables from `Variables` imports, ranked with resource tables.
fn push_import_variables(entry: &DocumentEntry, out: &mut Vec<VariableCandidate>) {
    for import in &entry.imports {
        let Some(target) = &import.target else {
            continue;
        };
        let source = target
            .file_stem()
            .and_then(|s| s.to_str())
            .map(SmolStr::new)
            .unwrap_or_default();
        for (name, value) in &import.variables {
            let Some(normalized) = normalize_variable(name) else {
                continue;
            };
            out.push(VariableCandidate {
                name: name.clone(),
                normalized,
                value: value.clone(),
                tier: VariableTier::Resource,
                source: source.clone(),
                location: Some(Location {
                    path: target.clone(),
                    span: Span::default(),
                }),
            });
        }
    }
}

// ============================================================================
// WRITER
// ============================================================================

/// What a published patch touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexChange {
    pub generation: u64,
    /// Documents whose rows were (re)built, including re-resolved importers.
    pub changed: Vec<PathBuf>,
    pub removed: Vec<PathBuf>,
}

type Subscriber = Arc<dyn Fn(&IndexChange, &Arc<IndexSnapshot>) + Send + Sync>;

/// Owner of the current [`IndexSnapshot`].
pub struct WorkspaceIndex {
    current: RwLock<Arc<IndexSnapshot>>,
    writer: Mutex<()>,
    libraries: Arc<LibrarySpecCache>,
    subscribers: RwLock<Vec<(usize, Subscriber)>>,
    next_subscriber: Mutex<usize>,
}

impl std::fmt::Debug for WorkspaceIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.snapshot();
        f.debug_struct("WorkspaceIndex")
            .field("generation", &snapshot.generation)
            .field("documents", &snapshot.documents.len())
            .finish()
    }
}

impl WorkspaceIndex {
    pub fn new(libraries: Arc<LibrarySpecCache>) -> Self {
        Self {
            current: RwLock::new(Arc::new(IndexSnapshot::default())),
            writer: Mutex::new(()),
            libraries,
            subscribers: RwLock::new(Vec::new()),
            next_subscriber: Mutex::new(0),
        }
    }

    pub fn libraries(&self) -> &Arc<LibrarySpecCache> {
        &self.libraries
    }

    /// The current snapshot. Cheap; never blocks on the writer.
    pub fn snapshot(&self) -> Arc<IndexSnapshot> {
        self.current.read().clone()
    }

    /// Call `callback` after every published patch. Returns an id for
    /// [`unsubscribe`](Self::unsubscribe).
    pub fn subscribe(
        &self,
        callback: impl Fn(&IndexChange, &Arc<IndexSnapshot>) + Send + Sync + 'static,
    ) -> usize {
        let mut next = self.next_subscriber.lock();
        let id = *next;
        *next += 1;
        self.subscribers.write().push((id, Arc::new(callback)));
        id
    }

    pub fn unsubscribe(&self, id: usize) {
        self.subscribers.write().retain(|(sid, _)| *sid != id);
    }

    /// Start over with a new root and configuration; every document row is
    /// dropped.
    pub fn init(&self, root: Option<&Path>, config: WorkspaceConfig) -> Arc<IndexSnapshot> {
        let _guard = self.writer.lock();
        let mut next = IndexSnapshot {
            generation: self.current.read().generation,
            ..IndexSnapshot::default()
        };
        self.configure(&mut next, root, config);
        let removed = self.current.read().documents.keys().cloned().collect();
        self.publish(next, Vec::new(), removed)
    }

    /// Replace the configuration and re-resolve every document.
    pub fn set_config(&self, root: Option<&Path>, config: WorkspaceConfig) -> Arc<IndexSnapshot> {
        let _guard = self.writer.lock();
        let mut next = (*self.snapshot()).clone();
        self.configure(&mut next, root, config);
        let docs: Vec<_> = next.documents.values().map(|e| e.document.clone()).collect();
        tracing::info!(documents = docs.len(), "configuration changed, re-resolving imports");
        let changed = self.rebuild(&mut next, docs);
        self.publish(next, changed, Vec::new())
    }

    fn configure(&self, next: &mut IndexSnapshot, root: Option<&Path>, config: WorkspaceConfig) {
        let search_paths = config.resolved_search_paths(root);
        next.context = SearchContext::new(search_paths, config.discover_interpreter());
        self.libraries.set_cache_dir(config.cache_dir.clone());
        next.builtin = self.libraries.builtin(&next.context);
        next.config = Arc::new(config);
    }

    /// Recompute the rows of a changed document, re-resolve documents whose
    /// imports may now resolve differently, and publish.
    pub fn on_document_changed(&self, document: Arc<Document>) -> Arc<IndexSnapshot> {
        self.on_documents_changed(vec![document])
    }

    /// Batch form of [`on_document_changed`](Self::on_document_changed);
    /// rows are built in parallel.
    pub fn on_documents_changed(&self, documents: Vec<Arc<Document>>) -> Arc<IndexSnapshot> {
        let _guard = self.writer.lock();
        let mut next = (*self.snapshot()).clone();
        let new_paths: Vec<PathBuf> = documents
            .iter()
            .filter(|d| !next.documents.contains_key(&d.path))
            .map(|d| d.path.clone())
            .collect();
        let mut changed = self.rebuild(&mut next, documents);

        // A file that appears may satisfy imports that failed before.
        if !new_paths.is_empty() {
            let retry: Vec<_> = next
                .unresolved
                .iter()
                .filter(|p| !changed.contains(p))
                .filter_map(|p| next.documents.get(p).map(|e| e.document.clone()))
                .collect();
            changed.extend(self.rebuild(&mut next, retry));
        }
        // Importers keep their rows but resolve against the new content.
        let dependents = next.transitive_importers(&changed);
        changed.extend(dependents);
        self.publish(next, changed, Vec::new())
    }

    /// Drop a document's rows and re-resolve its importers.
    pub fn on_document_removed(&self, path: &Path) -> Arc<IndexSnapshot> {
        let _guard = self.writer.lock();
        let mut next = (*self.snapshot()).clone();
        if next.remove_rows(path).is_none() {
            return self.snapshot();
        }
        let importers: Vec<_> = next
            .importers_of(path)
            .into_iter()
            .filter_map(|p| next.documents.get(p).map(|e| e.document.clone()))
            .collect();
        let mut changed = self.rebuild(&mut next, importers);
        let dependents = next.transitive_importers(&changed);
        changed.extend(dependents);
        self.publish(next, changed, vec![path.to_path_buf()])
    }

    /// A library or variable file on disk changed: re-resolve its importers.
    pub fn on_library_source_changed(&self, path: &Path) -> Arc<IndexSnapshot> {
        let _guard = self.writer.lock();
        let mut next = (*self.snapshot()).clone();
        let importers: Vec<_> = next
            .importers_of(path)
            .into_iter()
            .filter_map(|p| next.documents.get(p).map(|e| e.document.clone()))
            .collect();
        if importers.is_empty() {
            return self.snapshot();
        }
        let mut changed = self.rebuild(&mut next, importers);
        let dependents = next.transitive_importers(&changed);
        changed.extend(dependents);
        self.publish(next, changed, Vec::new())
    }

    /// Drop everything.
    pub fn teardown(&self) {
        let _guard = self.writer.lock();
        let removed = self.current.read().documents.keys().cloned().collect();
        let next = IndexSnapshot {
            generation: self.current.read().generation,
            ..IndexSnapshot::default()
        };
        self.publish(next, Vec::new(), removed);
    }

    fn rebuild(&self, next: &mut IndexSnapshot, documents: Vec<Arc<Document>>) -> Vec<PathBuf> {
        let context = next.context.clone();
        let entries: Vec<DocumentEntry> = documents
            .into_par_iter()
            .map(|doc| build_entry(doc, &context, &self.libraries))
            .collect();
        let mut changed = Vec::with_capacity(entries.len());
        for entry in entries {
            changed.push(entry.document.path.clone());
            next.insert_rows(entry);
        }
        changed
    }

    fn publish(
        &self,
        mut next: IndexSnapshot,
        changed: Vec<PathBuf>,
        removed: Vec<PathBuf>,
    ) -> Arc<IndexSnapshot> {
        next.generation += 1;
        let snapshot = Arc::new(next);
        *self.current.write() = snapshot.clone();

        let change = IndexChange {
            generation: snapshot.generation,
            changed,
            removed,
        };
        tracing::debug!(
            generation = change.generation,
            changed = change.changed.len(),
            removed = change.removed.len(),
            "index patched"
        );
        let subscribers: Vec<Subscriber> = self
            .subscribers
            .read()
            .iter()
            .map(|(_, s)| s.clone())
            .collect();
        for subscriber in subscribers {
            subscriber(&change, &snapshot);
        }
        snapshot
    }
}

/// Resolve the imports and extract the symbols of one document.
fn build_entry(document: Arc<Document>, context: &SearchContext, libraries: &LibrarySpecCache) -> DocumentEntry {
    let ctx = context.for_importer(document.dir());
    let symbols = extract_symbols(&document.tree);
    let imports = document
        .tree
        .imports
        .iter()
        .map(|import| {
            let literal = import.name.text.clone();
            let mut entry = ImportEntry {
                kind: import.kind,
                literal: literal.clone(),
                span: import.name.span,
                status: ImportStatus::Resolved,
                target: None,
                library: None,
                is_directory: false,
                message: None,
                variables: Vec::new(),
            };
            match import.kind {
                ImportKind::Library => {
                    let args: Vec<String> = import.args.iter().map(|c| c.text.to_string()).collect();
                    let resolution = libraries.resolve(
                        &LibraryImport {
                            literal: &literal,
                            args: &args,
                            alias: import.alias.as_ref().map(|c| c.text.as_str()),
                        },
                        &ctx,
                    );
                    entry.status = resolution.status;
                    entry.target = resolution.target;
                    entry.library = resolution.library;
                    entry.message = resolution.message;
                }
                ImportKind::Resource | ImportKind::Variables => match resolve_path(&literal, &ctx) {
                    PathLookup::File(path) => {
                        if import.kind == ImportKind::Variables {
                            entry.variables = load_variable_file(&path);
                        }
                        entry.target = Some(path);
                    }
                    PathLookup::Directory(path) if import.kind == ImportKind::Resource => {
                        entry.is_directory = true;
                        entry.target = Some(path);
                    }
                    PathLookup::Directory(_) => {
                        entry.status = ImportStatus::NotFound;
                        entry.message =
                            Some(format!("Variable file '{literal}' is a directory"));
                    }
                    PathLookup::NotFound { checked } => {
                        entry.status = ImportStatus::NotFound;
                        entry.message = Some(format!(
                            "{} file '{}' does not exist. Checked: {}",
                            import.kind.as_str(),
                            literal,
                            checked
                                .iter()
                                .map(|p| p.display().to_string())
                                .collect::<Vec<_>>()
                                .join(", ")
                        ));
                    }
                },
            }
            if entry.status != ImportStatus::Resolved {
                tracing::debug!(
                    document = %document.path.display(),
                    import = %literal,
                    status = ?entry.status,
                    "import unresolved"
                );
            }
            entry
        })
        .collect();

    DocumentEntry {
        document,
        symbols,
        imports,
    }
}
