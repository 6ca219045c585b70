//! Cell roles.
//!
//! Classification of the cells of one logical row is shared by the parser
//! (building the tree) and the IDE layer (deciding what the cursor is on, or
//! what would be typed into an empty slot).

use crate::base::constants::RUN_KEYWORD_VARIANTS;

use super::ast::{Cell, ControlKind, ImportKind, SectionKind};

/// What a cell means in its row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellRole {
    SectionHeader,
    SettingName,
    SettingValue,
    ImportName(ImportKind),
    ImportArg,
    WithNameMarker,
    ImportAlias,
    VariableDecl,
    VariableValue,
    BlockName,
    BlockSettingName,
    ArgumentDecl,
    Assign,
    KeywordName,
    KeywordArg,
    ControlMarker,
    LoopVariable,
    ControlArg,
    Continuation,
    Other,
}

impl CellRole {
    /// Roles whose text is a keyword reference.
    pub fn is_keyword_reference(self) -> bool {
        self == CellRole::KeywordName
    }
}

/// A cell paired with its role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifiedCell<'a> {
    pub cell: &'a Cell,
    pub role: CellRole,
}

/// True for `${x}`, `@{x}`, `&{x}` and `%{x}` (whole-cell variables).
pub fn is_variable_text(text: &str) -> bool {
    let text = text.trim();
    text.len() >= 3
        && matches!(text.as_bytes()[0], b'$' | b'@' | b'&' | b'%')
        && text.as_bytes()[1] == b'{'
        && text.ends_with('}')
}

/// Assignment target: a whole-cell variable, optionally followed by `=`.
pub fn is_assign_text(text: &str) -> bool {
    let trimmed = text.trim_end_matches('=').trim_end();
    is_variable_text(trimmed) && !trimmed.starts_with('%')
}

/// Inner name of a variable cell: `${my var}=` → `my var`, `${x}[0]` → `x`.
pub fn variable_base_name(text: &str) -> Option<&str> {
    let text = text.trim().trim_end_matches('=').trim_end();
    let bytes = text.as_bytes();
    if bytes.len() < 3 || !matches!(bytes[0], b'$' | b'@' | b'&' | b'%') || bytes[1] != b'{' {
        return None;
    }
    let mut depth = 0usize;
    for (i, ch) in text.char_indices().skip(1) {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[2..i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Classify the cells of one logical row.
///
/// `indented` is whether the first physical line of the row starts with a
/// separator; in block sections that distinguishes names from body rows.
pub fn classify_row(section: SectionKind, indented: bool, cells: &[Cell]) -> Vec<ClassifiedCell<'_>> {
    let mut out = Vec::with_capacity(cells.len());
    if cells.is_empty() {
        return out;
    }
    if !indented && cells[0].text.starts_with('*') {
        out.push(ClassifiedCell {
            cell: &cells[0],
            role: CellRole::SectionHeader,
        });
        push_all(&mut out, &cells[1..], CellRole::Other);
        return out;
    }
    match section {
        SectionKind::Settings => classify_setting(&mut out, cells),
        SectionKind::Variables => {
            out.push(ClassifiedCell {
                cell: &cells[0],
                role: CellRole::VariableDecl,
            });
            push_all(&mut out, &cells[1..], CellRole::VariableValue);
        }
        SectionKind::TestCases | SectionKind::Tasks | SectionKind::Keywords => {
            if indented {
                classify_body(&mut out, cells);
            } else {
                out.push(ClassifiedCell {
                    cell: &cells[0],
                    role: CellRole::BlockName,
                });
                classify_body(&mut out, &cells[1..]);
            }
        }
        SectionKind::Comments | SectionKind::Invalid => push_all(&mut out, cells, CellRole::Other),
    }
    out
}

fn push_all<'a>(out: &mut Vec<ClassifiedCell<'a>>, cells: &'a [Cell], role: CellRole) {
    out.extend(cells.iter().map(|cell| ClassifiedCell { cell, role }));
}

fn import_kind(name: &str) -> Option<ImportKind> {
    if name.eq_ignore_ascii_case("library") {
        Some(ImportKind::Library)
    } else if name.eq_ignore_ascii_case("resource") {
        Some(ImportKind::Resource)
    } else if name.eq_ignore_ascii_case("variables") {
        Some(ImportKind::Variables)
    } else {
        None
    }
}

fn setting_takes_keyword(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    let lower = lower.trim_end_matches(':');
    matches!(
        lower,
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

fn classify_setting<'a>(out: &mut Vec<ClassifiedCell<'a>>, cells: &'a [Cell]) {
    out.push(ClassifiedCell {
        cell: &cells[0],
        role: CellRole::SettingName,
    });
    let rest = &cells[1..];
    if let Some(kind) = import_kind(&cells[0].text) {
        let mut iter = rest.iter().enumerate();
        if let Some((_, name)) = iter.next() {
            out.push(ClassifiedCell {
                cell: name,
                role: CellRole::ImportName(kind),
            });
        }
        let mut alias_next = false;
        for (_, cell) in iter {
            let role = if alias_next {
                alias_next = false;
                CellRole::ImportAlias
            } else if kind == ImportKind::Library && is_with_name_marker(&cell.text) {
                alias_next = true;
                CellRole::WithNameMarker
            } else {
                CellRole::ImportArg
            };
            out.push(ClassifiedCell { cell, role });
        }
    } else if setting_takes_keyword(&cells[0].text) {
        classify_call(out, rest);
    } else {
        push_all(out, rest, CellRole::SettingValue);
    }
}

/// `WITH NAME` (legacy) and `AS` (RF 6+) alias markers.
pub(crate) fn is_with_name_marker(text: &str) -> bool {
    text == "WITH NAME" || text == "AS"
}

fn classify_body<'a>(out: &mut Vec<ClassifiedCell<'a>>, cells: &'a [Cell]) {
    let Some(first) = cells.first() else {
        return;
    };
    let text = first.text.as_str();
    if text == "..." {
        out.push(ClassifiedCell {
            cell: first,
            role: CellRole::Continuation,
        });
        push_all(out, &cells[1..], CellRole::Other);
        return;
    }
    if text.starts_with('[') && text.ends_with(']') {
        out.push(ClassifiedCell {
            cell: first,
            role: CellRole::BlockSettingName,
        });
        let name = text[1..text.len() - 1].to_ascii_lowercase();
        match name.as_str() {
            "arguments" => push_all(out, &cells[1..], CellRole::ArgumentDecl),
            "setup" | "teardown" | "template" => classify_call(out, &cells[1..]),
            _ => push_all(out, &cells[1..], CellRole::SettingValue),
        }
        return;
    }
    if let Some(kind) = ControlKind::from_marker(text) {
        out.push(ClassifiedCell {
            cell: first,
            role: CellRole::ControlMarker,
        });
        let rest = &cells[1..];
        match kind {
            ControlKind::For => {
                let mut in_vars = true;
                for cell in rest {
                    let role = if in_vars && cell.text.starts_with("IN") {
                        in_vars = false;
                        CellRole::ControlMarker
                    } else if in_vars {
                        CellRole::LoopVariable
                    } else {
                        CellRole::ControlArg
                    };
                    out.push(ClassifiedCell { cell, role });
                }
            }
            ControlKind::Var => {
                if let Some((var, values)) = rest.split_first() {
                    out.push(ClassifiedCell {
                        cell: var,
                        role: CellRole::Assign,
                    });
                    push_all(out, values, CellRole::ControlArg);
                }
            }
            _ => push_all(out, rest, CellRole::ControlArg),
        }
        return;
    }
    let assigns = cells.iter().take_while(|c| is_assign_text(&c.text)).count();
    push_all(out, &cells[..assigns], CellRole::Assign);
    classify_call(out, &cells[assigns..]);
}

/// Keyword name followed by arguments; arguments of run-keyword variants that
/// name another keyword are classified recursively.
fn classify_call<'a>(out: &mut Vec<ClassifiedCell<'a>>, cells: &'a [Cell]) {
    let Some((keyword, args)) = cells.split_first() else {
        return;
    };
    out.push(ClassifiedCell {
        cell: keyword,
        role: CellRole::KeywordName,
    });
    match run_keyword_argument_index(&keyword.text) {
        Some(index) if index < args.len() => {
            push_all(out, &args[..index], CellRole::KeywordArg);
            classify_call(out, &args[index..]);
        }
        _ => push_all(out, args, CellRole::KeywordArg),
    }
}

/// Index of the argument naming a keyword, for run-keyword variants.
pub fn run_keyword_argument_index(keyword: &str) -> Option<usize> {
    let normalized = crate::hir::normalize_name(keyword);
    RUN_KEYWORD_VARIANTS
        .iter()
        .find(|(name, _)| crate::hir::normalize_name(name) == normalized)
        .map(|(_, index)| *index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::Span;

    fn cells(texts: &[&str]) -> Vec<Cell> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| Cell::new(*t, Span::from_coords(0, i as u32 * 10, 0, i as u32 * 10 + 5)))
            .collect()
    }

    fn roles(section: SectionKind, indented: bool, texts: &[&str]) -> Vec<CellRole> {
        let row = cells(texts);
        classify_row(section, indented, &row)
            .into_iter()
            .map(|c| c.role)
            .collect()
    }

    #[test]
    fn test_library_with_alias() {
        assert_eq!(
            roles(
                SectionKind::Settings,
                false,
                &["Library", "Collections", "WITH NAME", "Col"]
            ),
            vec![
                CellRole::SettingName,
                CellRole::ImportName(ImportKind::Library),
                CellRole::WithNameMarker,
                CellRole::ImportAlias
            ]
        );
    }

    #[test]
    fn test_assign_then_call() {
        assert_eq!(
            roles(
                SectionKind::TestCases,
                true,
                &["${a}", "${b} =", "Get Two", "x"]
            ),
            vec![
                CellRole::Assign,
                CellRole::Assign,
                CellRole::KeywordName,
                CellRole::KeywordArg
            ]
        );
    }

    #[test]
    fn test_run_keyword_argument_is_keyword() {
        assert_eq!(
            roles(
                SectionKind::Keywords,
                true,
                &["Wait Until Keyword Succeeds", "3x", "1s", "Say Hello", "arg"]
            ),
            vec![
                CellRole::KeywordName,
                CellRole::KeywordArg,
                CellRole::KeywordArg,
                CellRole::KeywordName,
                CellRole::KeywordArg
            ]
        );
    }

    #[test]
    fn test_for_loop_roles() {
        assert_eq!(
            roles(
                SectionKind::TestCases,
                true,
                &["FOR", "${i}", "IN RANGE", "3"]
            ),
            vec![
                CellRole::ControlMarker,
                CellRole::LoopVariable,
                CellRole::ControlMarker,
                CellRole::ControlArg
            ]
        );
    }

    #[test]
    fn test_suite_setup_is_keyword() {
        assert_eq!(
            roles(SectionKind::Settings, false, &["Suite Setup", "Open It"]),
            vec![CellRole::SettingName, CellRole::KeywordName]
        );
    }

    #[test]
    fn test_variable_base_name() {
        assert_eq!(variable_base_name("${my var}="), Some("my var"));
        assert_eq!(variable_base_name("@{items}[0]"), Some("items"));
        assert_eq!(variable_base_name("${outer${inner}}"), Some("outer${inner}"));
        assert_eq!(variable_base_name("plain"), None);
        assert!(is_assign_text("${x}="));
        assert!(!is_assign_text("Log"));
    }
}
