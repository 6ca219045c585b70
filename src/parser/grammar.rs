//! Row grammar: sections, settings, variables and blocks.

use std::path::Path;

use crate::base::{Position, Span};
use crate::syntax::{
    Block, BlockKind, BlockSetting, Cell, ControlKind, ControlStmt, FileKind, ImportKind,
    ImportStmt, KeywordCall, ParseError, ParseErrorKind, Section, SectionKind, SettingStmt, Step,
    SyntaxFile, VariableDecl, is_assign_text, is_variable_text, is_with_name_marker,
};

use super::lexer::{RawRow, split_rows};

/// A row after `...` continuation lines were folded into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalRow {
    pub indented: bool,
    pub cells: Vec<Cell>,
    pub span: Span,
}

impl LogicalRow {
    fn from_raw(raw: RawRow) -> Self {
        let span = match (raw.cells.first(), raw.cells.last()) {
            (Some(first), Some(last)) => first.span.cover(last.span),
            _ => Span::line_start(raw.line),
        };
        Self {
            indented: raw.indented,
            cells: raw.cells,
            span,
        }
    }

    pub fn first_line(&self) -> u32 {
        self.span.start.line
    }
}

fn is_continuation(raw: &RawRow) -> bool {
    raw.cells.first().is_some_and(|c| c.text == "...")
}

/// Fold physical rows into logical rows; empty rows are dropped.
pub fn logical_rows(text: &str) -> Vec<LogicalRow> {
    let mut rows: Vec<LogicalRow> = Vec::new();
    for raw in split_rows(text) {
        if raw.is_empty() {
            continue;
        }
        if is_continuation(&raw) {
            if let Some(prev) = rows.last_mut() {
                if !prev.cells[0].text.starts_with('*') || prev.indented {
                    let extra = raw.cells[1..].to_vec();
                    if let Some(last) = extra.last() {
                        prev.span = prev.span.cover(last.span);
                    } else {
                        prev.span = prev.span.cover(raw.cells[0].span);
                    }
                    prev.cells.extend(extra);
                    continue;
                }
            }
        }
        rows.push(LogicalRow::from_raw(raw));
    }
    rows
}

struct BlockBuilder {
    block: Block,
    open: Vec<ControlStmt>,
}

pub(super) struct Grammar {
    is_init: bool,
    sections: Vec<Section>,
    imports: Vec<ImportStmt>,
    settings: Vec<SettingStmt>,
    variables: Vec<VariableDecl>,
    test_cases: Vec<Block>,
    keywords: Vec<Block>,
    errors: Vec<ParseError>,
    current: Option<BlockBuilder>,
}

impl Grammar {
    pub(super) fn new(path: &Path) -> Self {
        let is_init = path
            .file_stem()
            .is_some_and(|stem| stem.eq_ignore_ascii_case("__init__"));
        Self {
            is_init,
            sections: Vec::new(),
            imports: Vec::new(),
            settings: Vec::new(),
            variables: Vec::new(),
            test_cases: Vec::new(),
            keywords: Vec::new(),
            errors: Vec::new(),
            current: None,
        }
    }

    pub(super) fn parse(mut self, text: &str) -> SyntaxFile {
        let last_line = text.lines().count().max(1) as u32 - 1;
        let mut section: Option<SectionKind> = None;

        for row in logical_rows(text) {
            let first = &row.cells[0];
            if !row.indented && first.text.starts_with('*') {
                self.finish_block(row.first_line().saturating_sub(1));
                self.close_section(row.first_line().saturating_sub(1));
                let kind = SectionKind::from_header(&first.text).unwrap_or_else(|| {
                    self.error(
                        ParseErrorKind::UnknownSection,
                        format!("Unrecognized section header '{}'", first.text),
                        first.span,
                    );
                    SectionKind::Invalid
                });
                self.sections.push(Section {
                    kind,
                    header: first.clone(),
                    span: row.span,
                });
                section = Some(kind);
                continue;
            }
            match section {
                Some(SectionKind::Settings) => self.setting_row(&row),
                Some(SectionKind::Variables) => self.variable_row(&row),
                Some(kind @ (SectionKind::TestCases | SectionKind::Tasks | SectionKind::Keywords)) => {
                    self.block_row(kind, row)
                }
                // Data before the first header and in comment sections is ignored.
                _ => {}
            }
        }
        self.finish_block(last_line);
        self.close_section(last_line);

        let kind = if self.is_init {
            FileKind::Init
        } else if self
            .sections
            .iter()
            .any(|s| matches!(s.kind, SectionKind::TestCases | SectionKind::Tasks))
        {
            FileKind::Suite
        } else {
            FileKind::Resource
        };

        SyntaxFile {
            kind,
            sections: self.sections,
            imports: self.imports,
            settings: self.settings,
            variables: self.variables,
            test_cases: self.test_cases,
            keywords: self.keywords,
            errors: self.errors,
        }
    }

    fn error(&mut self, kind: ParseErrorKind, message: impl Into<String>, span: Span) {
        self.errors.push(ParseError {
            kind,
            message: message.into(),
            span,
        });
    }

    fn close_section(&mut self, end_line: u32) {
        if let Some(section) = self.sections.last_mut() {
            section.span.end = Position::new(end_line.max(section.span.start.line), u32::MAX);
        }
    }

    // ------------------------------------------------------------------
    // Settings
    // ------------------------------------------------------------------

    fn setting_row(&mut self, row: &LogicalRow) {
        let name = &row.cells[0];
        let kind = if name.text.eq_ignore_ascii_case("library") {
            Some(ImportKind::Library)
        } else if name.text.eq_ignore_ascii_case("resource") {
            Some(ImportKind::Resource)
        } else if name.text.eq_ignore_ascii_case("variables") {
            Some(ImportKind::Variables)
        } else {
            None
        };

        let Some(kind) = kind else {
            self.settings.push(SettingStmt {
                name: name.clone(),
                values: row.cells[1..].to_vec(),
                span: row.span,
            });
            return;
        };

        let Some(import_name) = row.cells.get(1) else {
            self.error(
                ParseErrorKind::MissingImportName,
                format!("{} setting requires a value", kind.as_str()),
                name.span,
            );
            return;
        };

        let mut args = Vec::new();
        let mut alias = None;
        let mut rest = row.cells[2..].iter();
        while let Some(cell) = rest.next() {
            if kind == ImportKind::Library && is_with_name_marker(&cell.text) {
                alias = rest.next().cloned();
                break;
            }
            args.push(cell.clone());
        }

        self.imports.push(ImportStmt {
            kind,
            name: import_name.clone(),
            args,
            alias,
            span: row.span,
        });
    }

    // ------------------------------------------------------------------
    // Variables
    // ------------------------------------------------------------------

    fn variable_row(&mut self, row: &LogicalRow) {
        let cell = &row.cells[0];
        let name = cell.text.trim_end_matches('=').trim_end();
        if !is_variable_text(name) || name.starts_with('%') {
            self.error(
                ParseErrorKind::InvalidVariableName,
                format!("Invalid variable name '{}'", cell.text),
                cell.span,
            );
            return;
        }
        self.variables.push(VariableDecl {
            name: Cell::new(name, cell.span),
            values: row.cells[1..].to_vec(),
            span: row.span,
        });
    }

    // ------------------------------------------------------------------
    // Blocks
    // ------------------------------------------------------------------

    fn block_row(&mut self, section: SectionKind, row: LogicalRow) {
        if !row.indented {
            self.finish_block(row.first_line().saturating_sub(1));
            let kind = match section {
                SectionKind::Tasks => BlockKind::Task,
                SectionKind::Keywords => BlockKind::Keyword,
                _ => BlockKind::TestCase,
            };
            let name = row.cells[0].clone();
            if name.text.trim().is_empty() {
                self.error(ParseErrorKind::EmptyBlockName, "Empty name", name.span);
            }
            self.current = Some(BlockBuilder {
                block: Block {
                    kind,
                    name,
                    settings: Vec::new(),
                    steps: Vec::new(),
                    span: row.span,
                },
                open: Vec::new(),
            });
            if row.cells.len() > 1 {
                let body = row.cells[1..].to_vec();
                let span = Span::new(body[0].span.start, row.span.end);
                self.body_row(body, span);
            }
            return;
        }

        if self.current.is_none() {
            self.error(
                ParseErrorKind::StepOutsideBlock,
                "Statement is not inside a test case or keyword",
                row.span,
            );
            return;
        }
        let span = row.span;
        self.body_row(row.cells, span);
    }

    fn body_row(&mut self, cells: Vec<Cell>, span: Span) {
        let first = cells[0].text.clone();

        if first.starts_with('[') && first.ends_with(']') && first.len() >= 2 {
            let inner = &first[1..first.len() - 1];
            let mut name_span = cells[0].span;
            name_span.start.column += 1;
            name_span.end.column = name_span.end.column.saturating_sub(1);
            let setting = BlockSetting {
                name: Cell::new(inner, name_span),
                values: cells[1..].to_vec(),
                span,
            };
            if let Some(builder) = self.current.as_mut() {
                builder.block.settings.push(setting);
                builder.block.span = builder.block.span.cover(span);
            }
            return;
        }

        let step = if let Some(kind) = ControlKind::from_marker(&first) {
            let ctrl = ControlStmt {
                kind,
                marker: cells[0].clone(),
                cells: cells[1..].to_vec(),
                span,
            };
            self.track_control(&ctrl);
            Step::Control(ctrl)
        } else {
            let assigns = cells.iter().take_while(|c| is_assign_text(&c.text)).count();
            if assigns == cells.len() {
                self.error(
                    ParseErrorKind::AssignmentWithoutKeyword,
                    "Assignment is missing the keyword to call",
                    span,
                );
                return;
            }
            let mut iter = cells.into_iter();
            let assigns: Vec<Cell> = iter.by_ref().take(assigns).collect();
            let Some(keyword) = iter.next() else {
                return;
            };
            Step::Call(KeywordCall {
                assigns,
                keyword,
                args: iter.collect(),
                span,
            })
        };

        if let Some(builder) = self.current.as_mut() {
            builder.block.steps.push(step);
            builder.block.span = builder.block.span.cover(span);
        }
    }

    fn track_control(&mut self, ctrl: &ControlStmt) {
        let Some(builder) = self.current.as_mut() else {
            return;
        };
        if ctrl.kind.opens_block() {
            builder.open.push(ctrl.clone());
        } else if ctrl.kind == ControlKind::End && builder.open.pop().is_none() {
            self.errors.push(ParseError {
                kind: ParseErrorKind::UnmatchedEnd,
                message: "END without an opening FOR, WHILE, IF or TRY".to_string(),
                span: ctrl.marker.span,
            });
        }
    }

    /// Close the current block, extending its span to `end_line` so blank
    /// rows typed after the last statement still belong to it.
    fn finish_block(&mut self, end_line: u32) {
        let Some(mut builder) = self.current.take() else {
            return;
        };
        for open in builder.open.drain(..) {
            self.errors.push(ParseError {
                kind: ParseErrorKind::MissingEnd,
                message: format!("{} is missing END", open.marker.text),
                span: open.marker.span,
            });
        }
        let block = &mut builder.block;
        if end_line > block.span.end.line {
            block.span.end = Position::new(end_line, u32::MAX);
        }
        match block.kind {
            BlockKind::Keyword => self.keywords.push(builder.block),
            BlockKind::TestCase | BlockKind::Task => self.test_cases.push(builder.block),
        }
    }
}
