//! Syntax tree types for Robot Framework files.
//!
//! The tree is deliberately shallow: a file is a list of sections, and the
//! interesting content (imports, variables, test cases, keywords) is exposed
//! through typed vectors on [`SyntaxFile`]. Parsing never fails; malformed
//! rows are recorded as [`ParseError`]s and skipped.

mod ast;
mod classify;

pub use ast::{
    Block, BlockKind, BlockSetting, Cell, ControlKind, ControlStmt, FileKind, ImportKind,
    ImportStmt, KeywordCall, ParseError, ParseErrorKind, Section, SectionKind, SettingStmt, Step,
    SyntaxFile, VariableDecl,
};
pub use classify::{
    CellRole, ClassifiedCell, classify_row, is_assign_text, is_variable_text,
    run_keyword_argument_index, variable_base_name,
};
pub(crate) use classify::is_with_name_marker;
