//! Parser: logos lexer and the section/row grammar.
//!
//! ```text
//! text ──lexer──► RawRow* ──rows──► LogicalRow* ──grammar──► SyntaxFile
//! ```
//!
//! Parsing is total: every input yields a [`SyntaxFile`], malformed rows are
//! reported in [`SyntaxFile::errors`] and the rest of the file stays usable.

mod grammar;
pub mod lexer;

use std::path::Path;

pub use grammar::{LogicalRow, logical_rows};

use crate::syntax::SyntaxFile;

/// Parse Robot Framework source text.
///
/// `path` is only used to recognise `__init__` files.
pub fn parse(text: &str, path: &Path) -> SyntaxFile {
    grammar::Grammar::new(path).parse(text)
}
