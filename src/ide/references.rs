//! Find references implementation.

use std::path::{Path, PathBuf};

use rustc_hash::FxHashSet;

use super::cursor::cell_at;
use super::goto::call_targets;
use crate::base::Position;
use crate::hir::{IndexSnapshot, Location};
use crate::syntax::{CellRole, SectionKind};

/// A reference to a keyword.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reference {
    pub location: Location,
    /// Whether this is the definition (vs a call site).
    pub is_definition: bool,
}

/// Find every call of the keyword at `position`.
///
/// The cursor may sit on a call or on the name of a keyword definition.
/// A call counts only when it binds to that definition under the normal
/// precedence rules, so a local keyword shadowing an imported one splits
/// their references. Results are ordered by path, then position.
pub fn find_references(
    snapshot: &IndexSnapshot,
    path: &Path,
    position: Position,
    include_declaration: bool,
) -> Vec<Reference> {
    let targets = targets_at(snapshot, path, position);
    if targets.is_empty() {
        return Vec::new();
    }

    let mut references = Vec::new();
    if include_declaration {
        references.extend(targets.iter().map(|location| Reference {
            location: location.clone(),
            is_definition: true,
        }));
    }
    for document in candidate_documents(snapshot, &targets) {
        let Some(entry) = snapshot.document(&document) else {
            continue;
        };
        for usage in &entry.symbols.usages {
            let binds = call_targets(snapshot, &document, &usage.text)
                .iter()
                .any(|location| targets.contains(location));
            if binds {
                references.push(Reference {
                    location: Location {
                        path: document.clone(),
                        span: usage.span,
                    },
                    is_definition: false,
                });
            }
        }
    }
    references.sort_by(|a, b| {
        a.location
            .path
            .cmp(&b.location.path)
            .then_with(|| a.location.span.start.cmp(&b.location.span.start))
    });
    references
}

/// Definitions named by the cell at `position`.
fn targets_at(snapshot: &IndexSnapshot, path: &Path, position: Position) -> Vec<Location> {
    let Some(entry) = snapshot.document(path) else {
        return Vec::new();
    };
    let Some(cursor) = cell_at(&entry.document, position) else {
        return Vec::new();
    };
    match cursor.role {
        CellRole::KeywordName => call_targets(snapshot, path, &cursor.cell.text),
        CellRole::BlockName if cursor.section == Some(SectionKind::Keywords) => entry
            .symbols
            .keywords
            .iter()
            .filter(|def| def.span == cursor.cell.span)
            .map(|def| Location {
                path: path.to_path_buf(),
                span: def.span,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Documents that can see the definitions: the defining documents and
/// their importers. Library keywords are visible anywhere.
fn candidate_documents(snapshot: &IndexSnapshot, targets: &[Location]) -> Vec<PathBuf> {
    let defining: Vec<PathBuf> = targets
        .iter()
        .map(|t| t.path.clone())
        .collect::<FxHashSet<_>>()
        .into_iter()
        .collect();
    if defining.iter().any(|p| snapshot.document(p).is_none()) {
        return snapshot.documents().map(|e| e.path().to_path_buf()).collect();
    }
    let mut documents = snapshot.transitive_importers(&defining);
    documents.extend(defining);
    documents
}
