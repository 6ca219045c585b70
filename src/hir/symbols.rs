//! Symbol extraction from a parsed document.

use smol_str::SmolStr;

use super::name::{KeywordName, normalize_variable};
use crate::base::{Position, Span};
use crate::project::libspec::ArgSpec;
use crate::syntax::{
    Block, BlockKind, Cell, ControlKind, Step, SyntaxFile, run_keyword_argument_index,
};

/// A user keyword defined in a `*** Keywords ***` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordDef {
    pub name: KeywordName,
    /// Span of the name cell.
    pub span: Span,
    /// Span of the whole block.
    pub block_span: Span,
    pub args: Vec<ArgSpec>,
    pub doc: String,
}

impl KeywordDef {
    pub fn raw_name(&self) -> &str {
        self.name.raw()
    }
}

/// A variable declaration or assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableDef {
    /// As written, `${name}` / `@{name}` / `&{name}`, without a trailing `=`.
    pub name: SmolStr,
    pub normalized: String,
    pub value: String,
    pub span: Span,
}

impl VariableDef {
    fn from_cell(cell: &Cell, value: String) -> Option<Self> {
        let name = cell.text.trim_end_matches('=').trim_end();
        let normalized = normalize_variable(name)?;
        Some(Self {
            name: SmolStr::new(name),
            normalized,
            value,
            span: cell.span,
        })
    }
}

/// A cell that names a keyword to call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordUsage {
    pub text: SmolStr,
    pub span: Span,
}

/// Symbols a document defines and references.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentSymbols {
    pub keywords: Vec<KeywordDef>,
    pub variables: Vec<VariableDef>,
    pub usages: Vec<KeywordUsage>,
}

impl DocumentSymbols {
    pub fn usage_at(&self, position: Position) -> Option<&KeywordUsage> {
        self.usages.iter().find(|u| u.span.contains(position))
    }
}

/// Extract definitions and keyword usages from a tree.
pub fn extract_symbols(tree: &SyntaxFile) -> DocumentSymbols {
    let mut symbols = DocumentSymbols::default();

    for block in &tree.keywords {
        symbols.keywords.push(KeywordDef {
            name: KeywordName::definition(&block.name.text),
            span: block.name.span,
            block_span: block.span,
            args: block
                .arguments()
                .iter()
                .map(|cell| ArgSpec::parse(&cell.text))
                .collect(),
            doc: block.documentation().unwrap_or_default(),
        });
    }

    for decl in &tree.variables {
        let value = join_cells(&decl.values);
        if let Some(def) = VariableDef::from_cell(&decl.name, value) {
            symbols.variables.push(def);
        }
    }

    for setting in &tree.settings {
        if setting.takes_keyword() {
            collect_call(&setting.values, &mut symbols.usages);
        }
    }

    for block in tree.blocks() {
        let templated = block.kind != BlockKind::Keyword
            && (block.setting("Template").is_some()
                || tree.settings.iter().any(|s| {
                    let name = s.name.text.to_ascii_lowercase();
                    name == "test template" || name == "task template"
                }));
        for setting in &block.settings {
            if setting.is("Setup") || setting.is("Teardown") || setting.is("Template") {
                collect_call(&setting.values, &mut symbols.usages);
            }
        }
        if templated {
            // Template data rows are arguments, not keyword calls.
            continue;
        }
        for step in &block.steps {
            if let Step::Call(call) = step {
                symbols.usages.push(KeywordUsage {
                    text: call.keyword.text.clone(),
                    span: call.keyword.span,
                });
                collect_run_keyword(&call.keyword, &call.args, &mut symbols.usages);
            }
        }
    }

    symbols
}

fn join_cells(cells: &[Cell]) -> String {
    cells
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join("    ")
}

fn collect_call(cells: &[Cell], out: &mut Vec<KeywordUsage>) {
    let Some((keyword, args)) = cells.split_first() else {
        return;
    };
    if keyword.text.eq_ignore_ascii_case("NONE") {
        return;
    }
    out.push(KeywordUsage {
        text: keyword.text.clone(),
        span: keyword.span,
    });
    collect_run_keyword(keyword, args, out);
}

fn collect_run_keyword(keyword: &Cell, args: &[Cell], out: &mut Vec<KeywordUsage>) {
    if let Some(index) = run_keyword_argument_index(&keyword.text) {
        if index < args.len() {
            collect_call(&args[index..], out);
        }
    }
}

/// Variables visible at `line` inside `block`: `[Arguments]`, then loop
/// variables, `VAR` statements and assignments of steps that start before
/// `line`, latest last.
pub fn local_variables(block: &Block, line: u32) -> Vec<VariableDef> {
    let mut locals = Vec::new();
    for cell in block.arguments() {
        let text = cell.text.split_once('=').map_or(cell.text.as_str(), |(name, _)| {
            if name.ends_with('}') { name } else { cell.text.as_str() }
        });
        let arg_cell = Cell::new(text, cell.span);
        if let Some(def) = VariableDef::from_cell(&arg_cell, "argument".to_string()) {
            locals.push(def);
        }
    }
    for step in &block.steps {
        let span = step.span();
        if span.start.line >= line {
            break;
        }
        match step {
            Step::Call(call) => {
                for assign in &call.assigns {
                    if let Some(def) = VariableDef::from_cell(assign, call.keyword.text.to_string()) {
                        locals.push(def);
                    }
                }
            }
            Step::Control(ctrl) => match ctrl.kind {
                ControlKind::For => {
                    for var in ctrl.bound_variables() {
                        if let Some(def) = VariableDef::from_cell(var, "loop variable".to_string()) {
                            locals.push(def);
                        }
                    }
                }
                ControlKind::Var => {
                    if let Some(var) = ctrl.bound_variables().next() {
                        let value = join_cells(ctrl.cells.get(1..).unwrap_or_default());
                        if let Some(def) = VariableDef::from_cell(var, value) {
                            locals.push(def);
                        }
                    }
                }
                _ => {}
            },
        }
    }
    locals
}
