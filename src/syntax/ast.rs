//! AST node types.

use smol_str::SmolStr;

use crate::base::{Position, Span};

/// A single data cell with its location.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cell {
    pub text: SmolStr,
    pub span: Span,
}

impl Cell {
    pub fn new(text: impl Into<SmolStr>, span: Span) -> Self {
        Self {
            text: text.into(),
            span,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

/// Kind of a `*** ... ***` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKind {
    Settings,
    Variables,
    TestCases,
    Tasks,
    Keywords,
    Comments,
    /// Header that is not a known section; its rows are skipped.
    Invalid,
}

impl SectionKind {
    /// Recognise a header cell such as `*** Test Cases ***`.
    pub fn from_header(cell: &str) -> Option<SectionKind> {
        let name = cell.trim_matches(|c: char| c == '*' || c.is_whitespace());
        let normalized: String = name
            .chars()
            .filter(|c| !c.is_whitespace())
            .flat_map(char::to_lowercase)
            .collect();
        let kind = match normalized.as_str() {
            "settings" | "setting" => SectionKind::Settings,
            "variables" | "variable" => SectionKind::Variables,
            "testcases" | "testcase" => SectionKind::TestCases,
            "tasks" | "task" => SectionKind::Tasks,
            "keywords" | "keyword" => SectionKind::Keywords,
            "comments" | "comment" => SectionKind::Comments,
            _ => return None,
        };
        Some(kind)
    }

    /// Sections whose rows are executable blocks.
    pub fn has_blocks(self) -> bool {
        matches!(
            self,
            SectionKind::TestCases | SectionKind::Tasks | SectionKind::Keywords
        )
    }
}

/// A section header and the lines it covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub kind: SectionKind,
    pub header: Cell,
    /// From the header line to the line before the next header.
    pub span: Span,
}

/// What a file is, decided from its name and sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    /// Has test cases or tasks.
    Suite,
    /// `__init__.robot` directory suite initialisation file.
    Init,
    /// Keywords and variables only.
    Resource,
}

/// Kind of import setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ImportKind {
    Library,
    Resource,
    Variables,
}

impl ImportKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ImportKind::Library => "Library",
            ImportKind::Resource => "Resource",
            ImportKind::Variables => "Variables",
        }
    }
}

/// `Library`, `Resource` or `Variables` setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportStmt {
    pub kind: ImportKind,
    pub name: Cell,
    pub args: Vec<Cell>,
    /// `WITH NAME` / `AS` alias (libraries only).
    pub alias: Option<Cell>,
    pub span: Span,
}

/// Any other `*** Settings ***` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingStmt {
    pub name: Cell,
    pub values: Vec<Cell>,
    pub span: Span,
}

impl SettingStmt {
    /// Setup/teardown/template settings whose first value is a keyword name.
    pub fn takes_keyword(&self) -> bool {
        let name = self.name.text.to_ascii_lowercase();
        matches!(
            name.as_str(),
            "suite setup"
                | "suite teardown"
                | "test setup"
                | "test teardown"
                | "test template"
                | "task setup"
                | "task teardown"
                | "task template"
        )
    }
}

/// Row of the `*** Variables ***` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableDecl {
    /// Name cell without a trailing `=`.
    pub name: Cell,
    pub values: Vec<Cell>,
    pub span: Span,
}

/// Test case, task or user keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    TestCase,
    Task,
    Keyword,
}

/// `[Name]  values...` row inside a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockSetting {
    /// Name without brackets, as written.
    pub name: Cell,
    pub values: Vec<Cell>,
    pub span: Span,
}

impl BlockSetting {
    pub fn is(&self, name: &str) -> bool {
        self.name.text.eq_ignore_ascii_case(name)
    }
}

/// A keyword invocation, possibly assigning its return value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordCall {
    pub assigns: Vec<Cell>,
    pub keyword: Cell,
    pub args: Vec<Cell>,
    pub span: Span,
}

/// Control-structure markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlKind {
    For,
    While,
    If,
    ElseIf,
    Else,
    Try,
    Except,
    Finally,
    End,
    Break,
    Continue,
    Return,
    Var,
}

impl ControlKind {
    pub fn from_marker(cell: &str) -> Option<ControlKind> {
        let kind = match cell {
            "FOR" => ControlKind::For,
            "WHILE" => ControlKind::While,
            "IF" => ControlKind::If,
            "ELSE IF" => ControlKind::ElseIf,
            "ELSE" => ControlKind::Else,
            "TRY" => ControlKind::Try,
            "EXCEPT" => ControlKind::Except,
            "FINALLY" => ControlKind::Finally,
            "END" => ControlKind::End,
            "BREAK" => ControlKind::Break,
            "CONTINUE" => ControlKind::Continue,
            "RETURN" => ControlKind::Return,
            "VAR" => ControlKind::Var,
            _ => return None,
        };
        Some(kind)
    }

    /// Markers that open a construct closed by `END`.
    pub fn opens_block(self) -> bool {
        matches!(
            self,
            ControlKind::For | ControlKind::While | ControlKind::If | ControlKind::Try
        )
    }

    /// Whether the interpreter reports this row as a step of its own.
    pub fn is_executable(self) -> bool {
        !matches!(
            self,
            ControlKind::End
                | ControlKind::Else
                | ControlKind::ElseIf
                | ControlKind::Except
                | ControlKind::Finally
                | ControlKind::Try
        )
    }
}

/// A control row such as `FOR  ${i}  IN RANGE  3`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlStmt {
    pub kind: ControlKind,
    pub marker: Cell,
    pub cells: Vec<Cell>,
    pub span: Span,
}

impl ControlStmt {
    /// Variables this row binds: loop variables of `FOR` and the target of `VAR`.
    pub fn bound_variables(&self) -> impl Iterator<Item = &Cell> {
        let take = match self.kind {
            ControlKind::For => self
                .cells
                .iter()
                .take_while(|c| !c.text.starts_with("IN"))
                .count(),
            ControlKind::Var => 1.min(self.cells.len()),
            _ => 0,
        };
        self.cells[..take].iter()
    }
}

/// One statement in a block body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Call(KeywordCall),
    Control(ControlStmt),
}

impl Step {
    pub fn span(&self) -> Span {
        match self {
            Step::Call(call) => call.span,
            Step::Control(ctrl) => ctrl.span,
        }
    }

    pub fn is_executable(&self) -> bool {
        match self {
            Step::Call(_) => true,
            Step::Control(ctrl) => ctrl.kind.is_executable(),
        }
    }
}

/// A test case, task or keyword with its settings and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub kind: BlockKind,
    pub name: Cell,
    pub settings: Vec<BlockSetting>,
    pub steps: Vec<Step>,
    /// From the name row up to the next block or section header.
    pub span: Span,
}

impl Block {
    pub fn setting(&self, name: &str) -> Option<&BlockSetting> {
        self.settings.iter().find(|s| s.is(name))
    }

    /// `[Arguments]` cells of a keyword.
    pub fn arguments(&self) -> &[Cell] {
        self.setting("Arguments")
            .map(|s| s.values.as_slice())
            .unwrap_or(&[])
    }

    /// `[Documentation]` joined with newlines.
    pub fn documentation(&self) -> Option<String> {
        self.setting("Documentation").map(|s| {
            s.values
                .iter()
                .map(|c| c.text.as_str())
                .collect::<Vec<_>>()
                .join("\n")
        })
    }
}

/// Structural problem found while parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParseErrorKind {
    UnknownSection,
    InvalidVariableName,
    MissingImportName,
    StepOutsideBlock,
    AssignmentWithoutKeyword,
    UnmatchedEnd,
    MissingEnd,
    EmptyBlockName,
}

impl ParseErrorKind {
    /// Stable rule identifier used in diagnostics.
    pub fn code(self) -> &'static str {
        match self {
            ParseErrorKind::UnknownSection => "P0001",
            ParseErrorKind::InvalidVariableName => "P0002",
            ParseErrorKind::MissingImportName => "P0003",
            ParseErrorKind::StepOutsideBlock => "P0004",
            ParseErrorKind::AssignmentWithoutKeyword => "P0005",
            ParseErrorKind::UnmatchedEnd => "P0006",
            ParseErrorKind::MissingEnd => "P0007",
            ParseErrorKind::EmptyBlockName => "P0008",
        }
    }
}

/// Parse error recorded in the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    pub span: Span,
}

/// A parsed Robot Framework file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxFile {
    pub kind: FileKind,
    pub sections: Vec<Section>,
    pub imports: Vec<ImportStmt>,
    pub settings: Vec<SettingStmt>,
    pub variables: Vec<VariableDecl>,
    pub test_cases: Vec<Block>,
    pub keywords: Vec<Block>,
    pub errors: Vec<ParseError>,
}

impl SyntaxFile {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Section containing `line`, if any.
    pub fn section_at(&self, line: u32) -> Option<&Section> {
        self.sections.iter().find(|s| s.span.contains_line(line))
    }

    /// Test case, task or keyword containing `line`.
    pub fn block_at(&self, line: u32) -> Option<&Block> {
        self.test_cases
            .iter()
            .chain(self.keywords.iter())
            .find(|b| b.span.contains_line(line))
    }

    /// All blocks (tests and tasks first, then keywords).
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.test_cases.iter().chain(self.keywords.iter())
    }

    /// Executable statement covering `line`, if any. Multi-line statements
    /// (continued with `...`) cover all their lines.
    pub fn executable_step_at(&self, line: u32) -> Option<Span> {
        let block = self.block_at(line)?;
        let step = block
            .steps
            .iter()
            .filter(|s| s.is_executable())
            .map(Step::span)
            .find(|span| span.contains_line(line));
        step.or_else(|| {
            block
                .settings
                .iter()
                .filter(|s| s.is("Setup") || s.is("Teardown"))
                .map(|s| s.span)
                .find(|span| span.contains_line(line))
        })
    }

    /// Position just past the last character of the file.
    pub fn end_position(&self) -> Position {
        self.sections
            .last()
            .map(|s| s.span.end)
            .unwrap_or_default()
    }
}
