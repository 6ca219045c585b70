//! What the cursor is on.
//!
//! Queries re-split the document text around the cursor instead of walking
//! the tree, so they also work on rows the parser rejected and on a cell that
//! is only half typed.

use crate::base::{Position, Span};
use crate::parser::{LogicalRow, logical_rows};
use crate::project::Document;
use crate::syntax::{Cell, CellRole, SectionKind, classify_row};

/// The cell under (or being typed at) the cursor, with its role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorCell {
    pub cell: Cell,
    pub role: CellRole,
    pub section: Option<SectionKind>,
    /// Whether the row starts with a separator.
    pub indented: bool,
    /// Index of the cell in its logical row.
    pub index: usize,
}

/// A `${name}` style reference inside a cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableRef {
    /// Decorated name, e.g. `${user}`; item access is not included.
    pub text: String,
    pub span: Span,
}

fn section_kind(document: &Document, line: u32) -> Option<SectionKind> {
    document.tree.section_at(line).map(|s| s.kind)
}

fn row_at(document: &Document, line: u32) -> Option<LogicalRow> {
    logical_rows(&document.text)
        .into_iter()
        .find(|row| row.span.start.line <= line && line <= row.span.end.line)
}

/// The complete cell containing `position`, if any.
pub fn cell_at(document: &Document, position: Position) -> Option<CursorCell> {
    let row = row_at(document, position.line)?;
    let index = row.cells.iter().position(|c| c.span.contains(position))?;
    let section = section_kind(document, row.first_line())?;
    let classified = classify_row(section, row.indented, &row.cells);
    let role = classified.get(index)?.role;
    Some(CursorCell {
        cell: row.cells[index].clone(),
        role,
        section: Some(section),
        indented: row.indented,
        index,
    })
}

/// The cell being typed at `position`: the text from the cell start up to
/// the cursor, classified as if the row ended there. An empty cell is
/// returned when the cursor sits in a separator or on a blank line.
pub fn typing_cell(document: &Document, position: Position) -> CursorCell {
    let line_text = document.text.lines().nth(position.line as usize).unwrap_or_default();
    let before: String = line_text.chars().take(position.column as usize).collect();
    let section = document
        .tree
        .section_at(position.line)
        .filter(|s| s.span.start.line < position.line || !before.trim_start().starts_with('*'))
        .map(|s| s.kind);

    let (indented, mut cells) = match row_at(document, position.line) {
        Some(row) => {
            let cells: Vec<Cell> = row
                .cells
                .into_iter()
                .filter(|c| c.span.start < position)
                .collect();
            (row.indented, cells)
        }
        None => (before.starts_with([' ', '\t']), Vec::new()),
    };

    // Reuse the last cell when the cursor is still inside it (or one space
    // past it, which the lexer does not count as a separator).
    let partial = match cells.last() {
        Some(last)
            if last.span.start.line == position.line && {
                let gap = position.column.saturating_sub(last.span.end.column);
                last.span.end.column >= position.column
                    || (gap == 1 && before.ends_with(' ') && !before.ends_with("  "))
            } =>
        {
            cells.pop().map(|last| {
                let text: String = before.chars().skip(last.span.start.column as usize).collect();
                Cell::new(text, Span::new(last.span.start, position))
            })
        }
        _ => None,
    }
    .unwrap_or_else(|| Cell::new("", Span::new(position, position)));

    cells.push(partial);
    let index = cells.len() - 1;
    let role = match section {
        Some(section) => classify_row(section, indented, &cells)
            .get(index)
            .map(|c| c.role)
            .unwrap_or(CellRole::Other),
        None if !indented && index == 0 => CellRole::SectionHeader,
        None => CellRole::Other,
    };
    let cell = cells.swap_remove(index);
    CursorCell {
        cell,
        role,
        section,
        indented,
        index,
    }
}

/// The variable reference in `cell` covering `position`, innermost first
/// for nested references like `${a${b}}`.
pub fn variable_at(cell: &Cell, position: Position) -> Option<VariableRef> {
    if cell.span.start.line != cell.span.end.line || position.line != cell.span.start.line {
        return None;
    }
    let offset = position.column.checked_sub(cell.span.start.column)? as usize;
    let chars: Vec<char> = cell.text.chars().collect();
    let mut best: Option<(usize, usize)> = None;
    let mut stack: Vec<usize> = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        if i + 1 < chars.len() && matches!(chars[i], '$' | '@' | '&' | '%') && chars[i + 1] == '{' {
            stack.push(i);
            i += 2;
            continue;
        }
        if chars[i] == '}' {
            if let Some(start) = stack.pop() {
                let end = i + 1;
                let covers = start <= offset && offset <= end;
                let narrower = best.is_none_or(|(s, e)| end - start < e - s);
                if covers && narrower {
                    best = Some((start, end));
                }
            }
        }
        i += 1;
    }
    let (start, end) = best?;
    let line = cell.span.start.line;
    let column = cell.span.start.column;
    Some(VariableRef {
        text: chars[start..end].iter().collect(),
        span: Span::from_coords(line, column + start as u32, line, column + end as u32),
    })
}

/// An unclosed `${` before the cursor: the opener's byte index and the partial
/// name typed after it.
pub fn open_variable(prefix: &str) -> Option<(usize, char, &str)> {
    let bytes = prefix.as_bytes();
    let mut depth = 0i32;
    for i in (0..bytes.len()).rev() {
        match bytes[i] {
            b'}' => depth += 1,
            b'{' if i > 0 && matches!(bytes[i - 1], b'$' | b'@' | b'&' | b'%') => {
                if depth == 0 {
                    return Some((i - 1, bytes[i - 1] as char, &prefix[i + 1..]));
                }
                depth -= 1;
            }
            _ => {}
        }
    }
    None
}
