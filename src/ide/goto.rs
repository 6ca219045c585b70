//! Go-to-definition implementation.

use std::path::Path;

use super::cursor::{cell_at, variable_at};
use crate::base::{Position, Span};
use crate::hir::{IndexSnapshot, Location};
use crate::project::ImportStatus;
use crate::syntax::{CellRole, ImportKind};

/// Find the definition(s) of the reference at `position`.
///
/// Keyword calls yield every definition at the winning precedence tier
/// (more than one only when the call is ambiguous); variables yield the
/// highest-precedence declaration; import names yield the imported file.
/// Anything else, including unresolved names, yields nothing.
pub fn definition_of(snapshot: &IndexSnapshot, path: &Path, position: Position) -> Vec<Location> {
    let Some(entry) = snapshot.document(path) else {
        return Vec::new();
    };
    let Some(cursor) = cell_at(&entry.document, position) else {
        return Vec::new();
    };

    if let Some(variable) = variable_at(&cursor.cell, position) {
        return snapshot
            .lookup_variable(&variable.text, path, Some(position))
            .into_iter()
            .find_map(|candidate| candidate.location)
            .into_iter()
            .collect();
    }

    match cursor.role {
        CellRole::KeywordName => call_targets(snapshot, path, &cursor.cell.text),
        CellRole::ImportName(kind) => entry
            .imports
            .iter()
            .filter(|import| import.span == cursor.cell.span && import.status != ImportStatus::NotFound)
            .filter_map(|import| {
                let target = match kind {
                    ImportKind::Library => import
                        .library
                        .as_ref()
                        .and_then(|l| l.spec.source.clone())
                        .or_else(|| import.target.clone()),
                    ImportKind::Resource | ImportKind::Variables => import.target.clone(),
                }?;
                (!import.is_directory).then(|| Location {
                    path: target,
                    span: Span::line_start(0),
                })
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Definitions a keyword call `text` in `path` binds to: every candidate at
/// the winning tier.
pub(crate) fn call_targets(snapshot: &IndexSnapshot, path: &Path, text: &str) -> Vec<Location> {
    let candidates = snapshot.lookup_keyword(text, path);
    let Some(best) = candidates.first() else {
        return Vec::new();
    };
    let (tier, embedded) = (best.tier, best.embedded);
    candidates
        .into_iter()
        .filter(|c| c.tier == tier && c.embedded == embedded)
        .filter_map(|c| c.location)
        .collect()
}
