//! Logos-based lexer for Robot Framework data
//!
//! Robot data is line- and cell-oriented: a cell separator is a tab or two or
//! more spaces, a single space is part of the cell text. The lexer produces
//! raw tokens; [`split_rows`] folds them into rows of [`Cell`]s with
//! line/column spans.

use logos::Logos;
use smol_str::SmolStr;
use text_size::TextSize;

use crate::base::{Position, Span};
use crate::syntax::Cell;

/// A token with its kind, text, and byte offset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub offset: TextSize,
}

/// Token classification after lexing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Newline,
    Separator,
    Text,
    /// Input logos could not classify (a stray `\r`); treated as whitespace.
    Error,
}

/// Lexer wrapping the logos-generated tokenizer
pub struct Lexer<'a> {
    inner: logos::Lexer<'a, LogosToken>,
    offset: u32,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            inner: LogosToken::lexer(input),
            offset: 0,
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let logos_token = self.inner.next()?;
        let text = self.inner.slice();
        let offset = TextSize::new(self.offset);
        self.offset += text.len() as u32;

        let kind = match logos_token {
            Ok(LogosToken::Newline) => TokenKind::Newline,
            Ok(LogosToken::Separator) | Ok(LogosToken::Space) => TokenKind::Separator,
            Ok(LogosToken::Text) => TokenKind::Text,
            Err(()) => TokenKind::Error,
        };

        Some(Token { kind, text, offset })
    }
}

/// Tokenize an entire string into a Vec
pub fn tokenize(input: &str) -> Vec<Token<'_>> {
    Lexer::new(input).collect()
}

/// Logos token enum
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
pub enum LogosToken {
    #[regex(r"\r?\n")]
    Newline,

    /// Tab or two-plus spaces, plus any trailing blanks.
    #[regex(r"(\t|  )[ \t]*")]
    Separator,

    /// A lone space that does not sit between two words (leading or trailing).
    #[token(" ")]
    Space,

    /// Cell text; single spaces between words are part of the cell.
    #[regex(r"[^ \t\r\n]+( [^ \t\r\n]+)*")]
    Text,
}

/// One physical line split into cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    /// 0-indexed line number.
    pub line: u32,
    /// Whether the line starts with a separator (data rows inside blocks).
    pub indented: bool,
    /// Cells in order, comments removed.
    pub cells: Vec<Cell>,
}

impl RawRow {
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Split text into rows of cells. Comment cells (`#...`) and everything after
/// them on the line are dropped. Lines are produced even when empty so row
/// numbers stay aligned with the source.
pub fn split_rows(input: &str) -> Vec<RawRow> {
    let mut rows = Vec::new();
    let mut line = 0u32;
    let mut column = 0u32;
    let mut current = RawRow {
        line: 0,
        indented: false,
        cells: Vec::new(),
    };
    let mut in_comment = false;

    for token in Lexer::new(input) {
        match token.kind {
            TokenKind::Newline => {
                rows.push(std::mem::replace(
                    &mut current,
                    RawRow {
                        line: line + 1,
                        indented: false,
                        cells: Vec::new(),
                    },
                ));
                line += 1;
                column = 0;
                in_comment = false;
            }
            TokenKind::Separator | TokenKind::Error => {
                if column == 0 && token.kind == TokenKind::Separator {
                    current.indented = true;
                }
                column += token.text.chars().count() as u32;
            }
            TokenKind::Text => {
                let width = token.text.chars().count() as u32;
                if token.text.starts_with('#') {
                    in_comment = true;
                }
                if !in_comment {
                    current.cells.push(Cell {
                        text: SmolStr::new(token.text),
                        span: Span::new(
                            Position::new(line, column),
                            Position::new(line, column + width),
                        ),
                    });
                }
                column += width;
            }
        }
    }
    rows.push(current);
    rows
}
