//! Completion suggestions implementation.

use std::path::Path;
use std::sync::Arc;

use rustc_hash::FxHashSet;

use super::cursor::{CursorCell, open_variable, typing_cell};
use crate::base::constants::{SECTION_HEADERS, SETTING_NAMES};
use crate::base::{Position, Span};
use crate::hir::{IndexSnapshot, KeywordCandidate, KeywordTier, normalize_name, strip_gherkin};
use crate::project::libspec::bundled_library_names;
use crate::syntax::{CellRole, ImportKind};

/// Kind of completion item.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompletionKind {
    Keyword,
    Variable,
    Library,
    Setting,
    Section,
}

impl CompletionKind {
    /// Convert to LSP completion item kind number.
    pub fn to_lsp(&self) -> u32 {
        match self {
            CompletionKind::Keyword => 3,  // Function
            CompletionKind::Variable => 6, // Variable
            CompletionKind::Library => 9,  // Module
            CompletionKind::Setting => 10, // Property
            CompletionKind::Section => 14, // Keyword
        }
    }
}

/// A completion suggestion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletionItem {
    /// Shown in the list, e.g. `Append To List (Col)`.
    pub label: Arc<str>,
    pub kind: CompletionKind,
    /// Argument list, e.g. `list_, *values`.
    pub detail: Option<Arc<str>>,
    pub documentation: Option<Arc<str>>,
    /// Text replacing `range`.
    pub insert_text: Arc<str>,
    /// The typed text this item replaces.
    pub range: Span,
    /// Sort priority (lower = higher priority).
    pub sort_priority: u32,
}

impl CompletionItem {
    pub fn new(label: impl Into<Arc<str>>, kind: CompletionKind, range: Span) -> Self {
        let label = label.into();
        Self {
            insert_text: label.clone(),
            label,
            kind,
            detail: None,
            documentation: None,
            range,
            sort_priority: 100,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<Arc<str>>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_documentation(mut self, doc: impl Into<Arc<str>>) -> Self {
        self.documentation = Some(doc.into());
        self
    }

    pub fn with_insert_text(mut self, text: impl Into<Arc<str>>) -> Self {
        self.insert_text = text.into();
        self
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.sort_priority = priority;
        self
    }
}

/// How well a candidate matches the typed text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum MatchTier {
    Prefix = 0,
    Fuzzy = 1,
}

fn match_tier(candidate: &str, typed: &str) -> Option<MatchTier> {
    if candidate.starts_with(typed) {
        return Some(MatchTier::Prefix);
    }
    let mut chars = candidate.chars();
    typed
        .chars()
        .all(|t| chars.any(|c| c == t))
        .then_some(MatchTier::Fuzzy)
}

/// Get completion suggestions at a position.
///
/// Works purely on `snapshot`; never waits for analysis or processes.
/// Ordered by match quality (exact prefix before fuzzy), then locality
/// (local before imported), then label.
pub fn completions(snapshot: &IndexSnapshot, path: &Path, position: Position) -> Vec<CompletionItem> {
    let Some(entry) = snapshot.document(path) else {
        return Vec::new();
    };
    let cursor = typing_cell(&entry.document, position);

    let mut items = if let Some((opener, sigil, partial)) = open_variable(&cursor.cell.text) {
        let opener = cursor.cell.text[..opener].chars().count() as u32;
        let start = Position::new(position.line, cursor.cell.span.start.column + opener);
        variable_completions(snapshot, path, position, sigil, partial, Span::new(start, position))
    } else {
        match cursor.role {
            CellRole::SectionHeader => section_completions(&cursor),
            CellRole::SettingName => setting_completions(&cursor),
            CellRole::ImportName(ImportKind::Library) => library_completions(&cursor),
            CellRole::KeywordName => keyword_completions(snapshot, path, &cursor),
            _ => Vec::new(),
        }
    };

    items.sort_by(|a, b| {
        a.sort_priority
            .cmp(&b.sort_priority)
            .then_with(|| a.label.cmp(&b.label))
    });
    let mut seen = FxHashSet::default();
    items.retain(|item| seen.insert(item.label.clone()));
    items
}

fn locality(tier: KeywordTier) -> u32 {
    match tier {
        KeywordTier::Local => 0,
        KeywordTier::Resource => 1,
        KeywordTier::Library => 2,
        KeywordTier::BuiltIn => 3,
    }
}

fn keyword_completions(snapshot: &IndexSnapshot, path: &Path, cursor: &CursorCell) -> Vec<CompletionItem> {
    let typed = cursor.cell.text.as_str();
    let (gherkin, rest) = match strip_gherkin(typed) {
        Some(stripped) => (&typed[..typed.len() - stripped.len()], stripped),
        None => ("", typed),
    };
    let candidates = snapshot.keywords_in_scope(path);

    // `Source.partial`: keep only that source's keywords when it exists.
    let qualified = rest.rfind('.').and_then(|dot| {
        let qualifier = &rest[..dot];
        let wanted = normalize_name(qualifier);
        let known = candidates
            .iter()
            .any(|c| normalize_name(&c.source) == wanted);
        known.then(|| (qualifier, wanted, &rest[dot + 1..]))
    });

    let typed_name = normalize_name(qualified.as_ref().map_or(rest, |(_, _, name)| *name));
    let mut items = Vec::new();
    for candidate in &candidates {
        if let Some((_, wanted, _)) = &qualified {
            if normalize_name(&candidate.source) != *wanted {
                continue;
            }
        }
        let Some(tier) = match_tier(&normalize_name(&candidate.name), &typed_name) else {
            continue;
        };
        let insert = match &qualified {
            Some((qualifier, _, _)) => format!("{gherkin}{qualifier}.{}", candidate.name),
            None => format!("{gherkin}{}", candidate.name),
        };
        items.push(keyword_item(candidate, tier, insert, cursor.cell.span));
    }
    items
}

fn keyword_item(candidate: &KeywordCandidate, tier: MatchTier, insert: String, range: Span) -> CompletionItem {
    let label = format!("{} ({})", candidate.name, candidate.source);
    let mut item = CompletionItem::new(label, CompletionKind::Keyword, range)
        .with_insert_text(insert)
        .with_detail(candidate.args_display())
        .with_priority(tier as u32 * 10 + locality(candidate.tier));
    let doc = candidate.doc.lines().next().unwrap_or_default();
    if !doc.is_empty() {
        item = item.with_documentation(doc);
    }
    item
}

fn variable_completions(
    snapshot: &IndexSnapshot,
    path: &Path,
    position: Position,
    sigil: char,
    partial: &str,
    range: Span,
) -> Vec<CompletionItem> {
    let typed = normalize_name(partial);
    let mut seen = FxHashSet::default();
    let mut items = Vec::new();
    for variable in snapshot.variables_in_scope(path, Some(position)) {
        if !seen.insert(variable.normalized.clone()) {
            continue;
        }
        let Some(tier) = match_tier(&variable.normalized, &typed) else {
            continue;
        };
        // The sigil the user typed wins: `${list}` is a valid scalar use.
        let inner = variable
            .name
            .get(2..variable.name.len().saturating_sub(1))
            .unwrap_or_default();
        let text = format!("{sigil}{{{inner}}}");
        let priority = tier as u32 * 10 + variable.tier as u32;
        items.push(
            CompletionItem::new(text.clone(), CompletionKind::Variable, range)
                .with_detail(variable.source.as_str())
                .with_documentation(variable.value.as_str())
                .with_priority(priority),
        );
    }
    items
}

fn section_completions(cursor: &CursorCell) -> Vec<CompletionItem> {
    let text = cursor.cell.text.as_str();
    if !text.is_empty() && !text.starts_with('*') {
        return Vec::new();
    }
    let typed = normalize_name(text.trim_matches('*'));
    SECTION_HEADERS
        .iter()
        .filter(|header| normalize_name(header.trim_matches('*')).starts_with(&typed))
        .enumerate()
        .map(|(i, header)| {
            CompletionItem::new(*header, CompletionKind::Section, cursor.cell.span)
                .with_priority(i as u32)
        })
        .collect()
}

fn setting_completions(cursor: &CursorCell) -> Vec<CompletionItem> {
    let typed = normalize_name(&cursor.cell.text);
    SETTING_NAMES
        .iter()
        .filter_map(|name| {
            let tier = match_tier(&normalize_name(name), &typed)?;
            Some(
                CompletionItem::new(*name, CompletionKind::Setting, cursor.cell.span)
                    .with_priority(tier as u32 * 10),
            )
        })
        .collect()
}

fn library_completions(cursor: &CursorCell) -> Vec<CompletionItem> {
    let typed = normalize_name(&cursor.cell.text);
    bundled_library_names()
        .filter_map(|name| {
            let tier = match_tier(&normalize_name(name), &typed)?;
            Some(
                CompletionItem::new(name, CompletionKind::Library, cursor.cell.span)
                    .with_priority(tier as u32 * 10),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hir::WorkspaceIndex;
    use crate::project::{DocumentStore, LibrarySpecCache, WorkspaceConfig};
    use std::fs;
    use std::path::PathBuf;

    struct Workspace {
        _dir: tempfile::TempDir,
        root: PathBuf,
        index: WorkspaceIndex,
        store: DocumentStore,
    }

    impl Workspace {
        fn new(files: &[(&str, &str)]) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let root = dir.path().to_path_buf();
            let index = WorkspaceIndex::new(Arc::new(LibrarySpecCache::default()));
            index.init(
                Some(&root),
                WorkspaceConfig {
                    interpreter: Some(PathBuf::from("/nonexistent/python")),
                    ..WorkspaceConfig::default()
                },
            );
            let mut store = DocumentStore::new();
            let mut docs = Vec::new();
            for (name, text) in files {
                let path = root.join(name);
                fs::write(&path, text).unwrap();
                store.upsert(&path, text);
                docs.push(store.get(&path).unwrap());
            }
            index.on_documents_changed(docs);
            Self {
                _dir: dir,
                root,
                index,
                store,
            }
        }

        fn complete(&self, file: &str, line: u32, column: u32) -> Vec<CompletionItem> {
            let path = self.root.join(file);
            assert!(self.store.contains(&path));
            completions(&self.index.snapshot(), &path, Position::new(line, column))
        }
    }

    fn labels(items: &[CompletionItem]) -> Vec<&str> {
        items.iter().map(|i| i.label.as_ref()).collect()
    }

    #[test]
    fn test_match_tier() {
        assert_eq!(match_tier("sayhello", "say"), Some(MatchTier::Prefix));
        assert_eq!(match_tier("sayhello", "shl"), Some(MatchTier::Fuzzy));
        assert_eq!(match_tier("sayhello", "xyz"), None);
    }

    #[test]
    fn test_alias_prefix_completion() {
        let ws = Workspace::new(&[(
            "suite.robot",
            "*** Settings ***\nLibrary    Collections    WITH NAME    Col\n\n*** Test Cases ***\nT\n    Col.\n",
        )]);
        let items = ws.complete("suite.robot", 5, 8);
        assert!(!items.is_empty());
        assert!(items.iter().all(|i| i.label.ends_with("(Col)")));
        let append = items
            .iter()
            .find(|i| i.label.as_ref() == "Append To List (Col)")
            .unwrap();
        assert_eq!(append.insert_text.as_ref(), "Col.Append To List");
        assert_eq!(append.detail.as_deref(), Some("list_, *values"));
        assert_eq!(append.range, Span::from_coords(5, 4, 5, 8));
    }

    #[test]
    fn test_prefix_before_fuzzy_and_local_first() {
        let ws = Workspace::new(&[
            (
                "shared.resource",
                "*** Keywords ***\nLog Everything\n    No Operation\n",
            ),
            (
                "suite.robot",
                "*** Settings ***\nResource    shared.resource\n*** Test Cases ***\nT\n    Lo\n*** Keywords ***\nLocal Thing\n    No Operation\nSlow Operation\n    No Operation\n",
            ),
        ]);
        let items = ws.complete("suite.robot", 4, 6);
        let labels = labels(&items);
        let local = labels.iter().position(|l| *l == "Local Thing (suite)").unwrap();
        let resource = labels.iter().position(|l| *l == "Log Everything (shared)").unwrap();
        let builtin = labels.iter().position(|l| *l == "Log (BuiltIn)").unwrap();
        let fuzzy = labels.iter().position(|l| *l == "Slow Operation (suite)").unwrap();
        assert!(local < resource && resource < builtin && builtin < fuzzy);
    }

    #[test]
    fn test_gherkin_prefix_kept_in_insert_text() {
        let ws = Workspace::new(&[(
            "suite.robot",
            "*** Test Cases ***\nT\n    Given Say\n*** Keywords ***\nSay Hello\n    No Operation\n",
        )]);
        let items = ws.complete("suite.robot", 2, 13);
        assert_eq!(items[0].label.as_ref(), "Say Hello (suite)");
        assert_eq!(items[0].insert_text.as_ref(), "Given Say Hello");
    }

    #[test]
    fn test_variable_completion() {
        let ws = Workspace::new(&[(
            "suite.robot",
            "*** Variables ***\n${HOST}    localhost\n*** Test Cases ***\nT\n    Log    ${ho\n",
        )]);
        let items = ws.complete("suite.robot", 4, 15);
        assert_eq!(items[0].label.as_ref(), "${HOST}");
        assert_eq!(items[0].kind, CompletionKind::Variable);
        assert_eq!(items[0].range, Span::from_coords(4, 11, 4, 15));
    }

    #[test]
    fn test_variable_range_counts_characters() {
        let ws = Workspace::new(&[(
            "suite.robot",
            "*** Variables ***\n${HOST}    localhost\n*** Test Cases ***\nT\n    Log    ü${ho\n",
        )]);
        let items = ws.complete("suite.robot", 4, 16);
        assert_eq!(items[0].label.as_ref(), "${HOST}");
        assert_eq!(items[0].range, Span::from_coords(4, 12, 4, 16));
    }

    #[test]
    fn test_section_and_setting_completion() {
        let ws = Workspace::new(&[("suite.robot", "*** Settings ***\nSuite Se\n*** Te\n")]);
        let settings = ws.complete("suite.robot", 1, 8);
        assert!(labels(&settings).contains(&"Suite Setup"));
        let headers = ws.complete("suite.robot", 2, 6);
        assert!(labels(&headers).contains(&"*** Test Cases ***"));
    }

    #[test]
    fn test_unknown_document_is_empty() {
        let ws = Workspace::new(&[]);
        assert!(ws.complete_missing().is_empty());
    }

    impl Workspace {
        fn complete_missing(&self) -> Vec<CompletionItem> {
            completions(&self.index.snapshot(), &self.root.join("nope.robot"), Position::new(0, 0))
        }
    }
}
