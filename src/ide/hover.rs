//! Hover information implementation.

use std::path::Path;

use super::cursor::{cell_at, variable_at};
use crate::base::{Position, Span};
use crate::hir::{IndexSnapshot, KeywordCandidate};
use crate::syntax::{CellRole, ImportKind};

/// Result of a hover request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HoverResult {
    /// Markdown.
    pub contents: String,
    /// The hovered text.
    pub span: Span,
}

/// Hover for the keyword call, variable or library import at `position`.
pub fn hover(snapshot: &IndexSnapshot, path: &Path, position: Position) -> Option<HoverResult> {
    let entry = snapshot.document(path)?;
    let cursor = cell_at(&entry.document, position)?;

    if let Some(variable) = variable_at(&cursor.cell, position) {
        let candidate = snapshot
            .lookup_variable(&variable.text, path, Some(position))
            .into_iter()
            .next()?;
        let contents = format!(
            "```\n{} = {}\n```\n\nFrom *{}*",
            candidate.name, candidate.value, candidate.source
        );
        return Some(HoverResult {
            contents,
            span: variable.span,
        });
    }

    match cursor.role {
        CellRole::KeywordName => {
            let candidate = snapshot
                .lookup_keyword(&cursor.cell.text, path)
                .into_iter()
                .next()?;
            Some(HoverResult {
                contents: keyword_markdown(&candidate),
                span: cursor.cell.span,
            })
        }
        CellRole::ImportName(ImportKind::Library) => {
            let import = entry.imports.iter().find(|i| i.span == cursor.cell.span)?;
            let library = import.library.as_ref()?;
            let mut contents = format!("**{}**", library.spec.name);
            if !library.spec.version.is_empty() {
                contents.push_str(&format!(" {}", library.spec.version));
            }
            contents.push_str(&format!(" ({} keywords)", library.spec.keywords.len()));
            if !library.spec.doc.is_empty() {
                contents.push_str("\n\n");
                contents.push_str(&library.spec.doc);
            }
            Some(HoverResult {
                contents,
                span: cursor.cell.span,
            })
        }
        _ => None,
    }
}

fn keyword_markdown(candidate: &KeywordCandidate) -> String {
    let mut contents = format!(
        "**{}** ({})\n\n```\n{}    {}\n```",
        candidate.name,
        candidate.source,
        candidate.name,
        candidate.args.iter().map(|a| a.display()).collect::<Vec<_>>().join("    ")
    );
    if !candidate.doc.is_empty() {
        contents.push_str("\n\n");
        contents.push_str(&candidate.doc);
    }
    contents
}
