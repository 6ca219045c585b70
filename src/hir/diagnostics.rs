//! Diagnostics: semantic error reporting.
//!
//! Diagnostics are plain data tagged with the document path and the
//! document version they were computed against.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};

use super::resolve::{DocumentEntry, IndexSnapshot, KeywordTier};
use super::symbols::KeywordDef;
use crate::base::Span;
use crate::project::ImportStatus;
use crate::syntax::{ImportKind, ParseError};

// ============================================================================
// DIAGNOSTIC TYPES
// ============================================================================

/// Severity level of a diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
    Hint,
}

impl Severity {
    /// Convert to LSP severity number.
    pub fn to_lsp(&self) -> u32 {
        match self {
            Severity::Error => 1,
            Severity::Warning => 2,
            Severity::Info => 3,
            Severity::Hint => 4,
        }
    }
}

/// A diagnostic message with location.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub path: PathBuf,
    pub span: Span,
    pub severity: Severity,
    /// Rule identifier (e.g. "E0001").
    pub code: Option<Arc<str>>,
    pub message: Arc<str>,
    pub related: Vec<RelatedInfo>,
}

/// Related information for a diagnostic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelatedInfo {
    pub path: PathBuf,
    pub span: Span,
    pub message: Arc<str>,
}

impl Diagnostic {
    pub fn new(
        path: impl Into<PathBuf>,
        span: Span,
        severity: Severity,
        message: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            path: path.into(),
            span,
            severity,
            code: None,
            message: message.into(),
            related: Vec::new(),
        }
    }

    pub fn error(path: impl Into<PathBuf>, span: Span, message: impl Into<Arc<str>>) -> Self {
        Self::new(path, span, Severity::Error, message)
    }

    pub fn warning(path: impl Into<PathBuf>, span: Span, message: impl Into<Arc<str>>) -> Self {
        Self::new(path, span, Severity::Warning, message)
    }

    pub fn with_code(mut self, code: impl Into<Arc<str>>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_related(mut self, info: RelatedInfo) -> Self {
        self.related.push(info);
        self
    }
}

// ============================================================================
// DIAGNOSTIC CODES
// ============================================================================

/// Rule identifiers.
///
/// Parse errors use `P0001`-`P0099` (see `ParseErrorKind::code`).
pub mod codes {
    pub const UNDEFINED_KEYWORD: &str = "E0001";
    pub const DUPLICATE_KEYWORD: &str = "E0002";
    pub const IMPORT_NOT_FOUND: &str = "E0003";
    /// The analysis worker failed; reported once per document.
    pub const ANALYSIS_UNAVAILABLE: &str = "E0099";

    pub const AMBIGUOUS_KEYWORD: &str = "W0001";
    pub const AMBIGUOUS_IMPORT: &str = "W0002";
    pub const DIRECTORY_IMPORT: &str = "W0003";
    pub const CONFLICTING_RESOURCES: &str = "W0004";
}

// ============================================================================
// DIAGNOSTIC COLLECTOR
// ============================================================================

/// Collects diagnostics for one document.
#[derive(Clone, Debug)]
pub struct DiagnosticCollector {
    path: PathBuf,
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticCollector {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            diagnostics: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn add(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn parse_error(&mut self, error: &ParseError) {
        let diag = Diagnostic::error(&self.path, error.span, error.message.as_str())
            .with_code(error.kind.code());
        self.add(diag);
    }

    pub fn undefined_keyword(&mut self, span: Span, name: &str) {
        let diag = Diagnostic::error(&self.path, span, format!("No keyword with name '{name}' found."))
            .with_code(codes::UNDEFINED_KEYWORD);
        self.add(diag);
    }

    pub fn duplicate_keyword(&mut self, span: Span, name: &str, previous: Span) {
        let diag = Diagnostic::error(
            &self.path,
            span,
            format!("Keyword '{name}' is defined multiple times."),
        )
        .with_code(codes::DUPLICATE_KEYWORD)
        .with_related(RelatedInfo {
            path: self.path.clone(),
            span: previous,
            message: Arc::from(format!("previous definition of '{name}'")),
        });
        self.add(diag);
    }

    pub fn ambiguous_keyword(&mut self, span: Span, name: &str, sources: &[String]) {
        let diag = Diagnostic::warning(
            &self.path,
            span,
            format!(
                "Multiple keywords with name '{name}' found: {}",
                sources.join(", ")
            ),
        )
        .with_code(codes::AMBIGUOUS_KEYWORD);
        self.add(diag);
    }

    /// A resource import bringing in a keyword another resource import
    /// already provides.
    pub fn conflicting_resource_keyword(
        &mut self,
        span: Span,
        name: &str,
        resource: &Path,
        previous: (&Path, Span),
    ) {
        let diag = Diagnostic::warning(
            &self.path,
            span,
            format!(
                "Keyword '{name}' from '{}' is also defined in '{}'.",
                file_label(resource),
                file_label(previous.0)
            ),
        )
        .with_code(codes::CONFLICTING_RESOURCES)
        .with_related(RelatedInfo {
            path: previous.0.to_path_buf(),
            span: previous.1,
            message: Arc::from(format!("other definition of '{name}'")),
        });
        self.add(diag);
    }

    pub fn import_not_found(&mut self, span: Span, message: &str) {
        let diag = Diagnostic::error(&self.path, span, message).with_code(codes::IMPORT_NOT_FOUND);
        self.add(diag);
    }

    pub fn ambiguous_import(&mut self, span: Span, message: &str) {
        let diag = Diagnostic::warning(&self.path, span, message).with_code(codes::AMBIGUOUS_IMPORT);
        self.add(diag);
    }

    pub fn directory_import(&mut self, span: Span, literal: &str) {
        let diag = Diagnostic::warning(
            &self.path,
            span,
            format!("Resource import '{literal}' points to a directory; no keywords imported."),
        )
        .with_code(codes::DIRECTORY_IMPORT);
        self.add(diag);
    }

    /// The single diagnostic reported when analysis itself failed.
    pub fn analysis_unavailable(path: impl Into<PathBuf>, reason: &str) -> Diagnostic {
        Diagnostic::error(path, Span::default(), format!("Analysis unavailable: {reason}"))
            .with_code(codes::ANALYSIS_UNAVAILABLE)
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .count()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Diagnostics in source order.
    pub fn finish(mut self) -> Vec<Diagnostic> {
        self.diagnostics
            .sort_by(|a, b| a.span.start.cmp(&b.span.start).then(a.severity.cmp(&b.severity)));
        self.diagnostics
    }
}

// ============================================================================
// SEMANTIC CHECKER
// ============================================================================

/// Runs the document checks against one index snapshot.
pub struct SemanticChecker<'a> {
    snapshot: &'a IndexSnapshot,
    collector: DiagnosticCollector,
}

impl<'a> SemanticChecker<'a> {
    pub fn new(snapshot: &'a IndexSnapshot, path: &Path) -> Self {
        Self {
            snapshot,
            collector: DiagnosticCollector::new(path),
        }
    }

    /// Check the document the checker was created for. A path missing from
    /// the snapshot yields no diagnostics.
    pub fn check_document(&mut self) {
        let Some(entry) = self.snapshot.document(self.collector.path()).cloned() else {
            return;
        };

        for error in &entry.document.tree.errors {
            self.collector.parse_error(error);
        }

        for import in &entry.imports {
            let message = import.message.as_deref().unwrap_or_default();
            match import.status {
                ImportStatus::NotFound => self.collector.import_not_found(import.span, message),
                ImportStatus::Ambiguous => self.collector.ambiguous_import(import.span, message),
                ImportStatus::Resolved if import.is_directory => {
                    self.collector.directory_import(import.span, &import.literal)
                }
                ImportStatus::Resolved => {}
            }
        }

        self.check_duplicates(&entry.symbols.keywords);
        self.check_resource_conflicts(&entry);

        for usage in &entry.symbols.usages {
            self.check_usage(&usage.text, usage.span, entry.path());
        }
    }

    /// Report every definition after the first with the same name.
    fn check_duplicates(&mut self, keywords: &[KeywordDef]) {
        let mut first_seen: FxHashMap<String, Span> = FxHashMap::default();
        for def in keywords {
            let key = def.name.normalized();
            match first_seen.get(&key) {
                Some(previous) => self
                    .collector
                    .duplicate_keyword(def.span, def.raw_name(), *previous),
                None => {
                    first_seen.insert(key, def.span);
                }
            }
        }
    }

    /// Report each resource import that contributes a keyword name an
    /// earlier resource import of the same document already contributes.
    /// Conflicts inside one import's own closure are reported on the
    /// resource that imports both.
    fn check_resource_conflicts(&mut self, entry: &DocumentEntry) {
        let mut first_seen: FxHashMap<String, (PathBuf, Span)> = FxHashMap::default();
        let mut reported: FxHashSet<String> = FxHashSet::default();
        let resources = entry
            .imports
            .iter()
            .filter(|i| i.kind == ImportKind::Resource && !i.is_directory);
        for import in resources {
            let Some(target) = import.target.as_deref() else {
                continue;
            };
            let contributed = self
                .snapshot
                .document(target)
                .cloned()
                .into_iter()
                .chain(self.snapshot.resource_closure(target));
            let mut this_import: FxHashMap<String, (PathBuf, Span, String)> =
                FxHashMap::default();
            for resource in contributed {
                for def in &resource.symbols.keywords {
                    this_import.entry(def.name.normalized()).or_insert_with(|| {
                        (resource.path().to_path_buf(), def.span, def.raw_name().to_string())
                    });
                }
            }
            let mut names: Vec<_> = this_import.into_iter().collect();
            names.sort_by(|a, b| a.0.cmp(&b.0));
            for (key, (path, span, raw)) in names {
                match first_seen.get(&key) {
                    Some((previous, previous_span)) if *previous != path => {
                        if reported.insert(key) {
                            self.collector.conflicting_resource_keyword(
                                import.span,
                                &raw,
                                &path,
                                (previous.as_path(), *previous_span),
                            );
                        }
                    }
                    Some(_) => {}
                    None => {
                        first_seen.insert(key, (path, span));
                    }
                }
            }
        }
    }

    fn check_usage(&mut self, text: &str, span: Span, from: &Path) {
        let text = text.trim();
        // Names built from variables are only known at run time.
        if text.is_empty() || has_variable(text) {
            return;
        }
        let candidates = self.snapshot.lookup_keyword(text, from);
        let Some(best) = candidates.first() else {
            self.collector.undefined_keyword(span, text);
            return;
        };
        // Local duplicates are already reported as duplicate definitions.
        if best.tier == KeywordTier::Local {
            return;
        }
        let mut sources: Vec<String> = Vec::new();
        for candidate in candidates
            .iter()
            .filter(|c| c.tier == best.tier && c.embedded == best.embedded)
        {
            let label = format!("{}.{}", candidate.source, candidate.name);
            if !sources.contains(&label) {
                sources.push(label);
            }
        }
        if sources.len() > 1 {
            self.collector.ambiguous_keyword(span, text, &sources);
        }
    }

    pub fn finish(self) -> Vec<Diagnostic> {
        self.collector.finish()
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn has_variable(text: &str) -> bool {
    ["${", "@{", "&{", "%{"].iter().any(|open| text.contains(open))
}

/// Check one document and return its diagnostics in source order.
pub fn check_document(snapshot: &IndexSnapshot, path: &Path) -> Vec<Diagnostic> {
    let mut checker = SemanticChecker::new(snapshot, path);
    checker.check_document();
    checker.finish()
}
