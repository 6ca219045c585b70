//! Static keyword discovery in Python library sources.
//!
//! Used for path-based libraries when no interpreter is available. Finds
//! module-level functions and the methods of the class named after the
//! module, honours `@keyword("Custom Name")` and skips private names. The
//! scan is line based and does not evaluate anything.

use std::path::Path;

use smol_str::SmolStr;

use super::{ArgSpec, KeywordSignature, LibrarySpec, SpecOrigin};
use crate::base::Fingerprint;

/// Build a spec from Python source text.
pub fn scan_python_source(path: &Path, source: &str, fingerprint: Fingerprint) -> LibrarySpec {
    let module = path
        .file_stem()
        .and_then(|s| s.to_str())
        .map(|stem| {
            if stem == "__init__" {
                path.parent()
                    .and_then(|p| p.file_name())
                    .and_then(|n| n.to_str())
                    .unwrap_or(stem)
            } else {
                stem
            }
        })
        .unwrap_or_default();

    let lines: Vec<&str> = source.lines().collect();
    let mut keywords = Vec::new();
    let mut library_class_indent: Option<usize> = None;
    let mut pending_name: Option<String> = None;
    let mut pending_ignore = false;
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        let trimmed = line.trim_start();
        let indent = line.len() - trimmed.len();

        if trimmed.is_empty() || trimmed.starts_with('#') {
            i += 1;
            continue;
        }

        if let Some(class_indent) = library_class_indent {
            if indent <= class_indent {
                library_class_indent = None;
            }
        }

        if let Some(rest) = trimmed.strip_prefix("class ") {
            let name: String = rest
                .chars()
                .take_while(|c| c.is_alphanumeric() || *c == '_')
                .collect();
            if name == module {
                library_class_indent = Some(indent);
            }
            pending_name = None;
            i += 1;
            continue;
        }

        if let Some(decorator) = trimmed.strip_prefix('@') {
            if decorator.starts_with("not_keyword") {
                pending_ignore = true;
            } else if let Some(args) = decorator.strip_prefix("keyword") {
                pending_name = decorator_name(args);
            }
            i += 1;
            continue;
        }

        let def = trimmed
            .strip_prefix("def ")
            .or_else(|| trimmed.strip_prefix("async def "));
        if let Some(def) = def {
            let at_module_level = indent == 0;
            let in_class = library_class_indent.is_some_and(|ci| indent > ci);
            let fn_name: String = def
                .chars()
                .take_while(|c| c.is_alphanumeric() || *c == '_')
                .collect();

            let (signature, consumed) = collect_signature(&lines, i);
            let custom = pending_name.take();
            let ignored = std::mem::take(&mut pending_ignore);

            if (at_module_level || in_class) && !fn_name.starts_with('_') && !ignored {
                let args = parse_params(&signature, in_class);
                let doc = docstring(&lines, i + consumed);
                keywords.push(KeywordSignature {
                    name: SmolStr::new(custom.unwrap_or_else(|| keyword_name(&fn_name))),
                    args,
                    doc,
                    tags: Vec::new(),
                    source: Some(path.to_path_buf()),
                    lineno: Some(i as u32 + 1),
                });
            }
            i += consumed.max(1);
            continue;
        }

        pending_name = None;
        pending_ignore = false;
        i += 1;
    }

    LibrarySpec {
        name: SmolStr::new(module),
        doc: String::new(),
        version: String::new(),
        scope: String::new(),
        keywords,
        source: Some(path.to_path_buf()),
        fingerprint,
        origin: SpecOrigin::StaticScan,
    }
}

/// `my_keyword` → `My Keyword`
fn keyword_name(function: &str) -> String {
    function
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Name given to `@keyword(...)`, positional or `name=`.
fn decorator_name(args: &str) -> Option<String> {
    let inner = args.trim().strip_prefix('(')?.rsplit_once(')')?.0.trim();
    let inner = inner.strip_prefix("name").map_or(inner, |rest| {
        rest.trim_start().strip_prefix('=').unwrap_or(rest).trim_start()
    });
    let quote = inner.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let body = &inner[1..];
    body.find(quote).map(|end| body[..end].to_string())
}

/// Text between the parentheses of a `def`, joined across lines. Returns the
/// text and the number of lines the header spans.
fn collect_signature(lines: &[&str], start: usize) -> (String, usize) {
    let mut text = String::new();
    let mut depth = 0i32;
    let mut started = false;
    for (offset, line) in lines[start..].iter().enumerate() {
        for ch in line.chars() {
            match ch {
                '(' => {
                    if started {
                        text.push(ch);
                    }
                    depth += 1;
                    started = true;
                }
                ')' => {
                    depth -= 1;
                    if started && depth == 0 {
                        return (text, offset + 1);
                    }
                    text.push(ch);
                }
                _ if started => text.push(ch),
                _ => {}
            }
        }
        text.push(' ');
    }
    (text, lines.len() - start)
}

fn parse_params(signature: &str, is_method: bool) -> Vec<ArgSpec> {
    let mut params = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();
    for ch in signature.chars() {
        match ch {
            '(' | '[' | '{' => {
                depth += 1;
                current.push(ch);
            }
            ')' | ']' | '}' => {
                depth -= 1;
                current.push(ch);
            }
            ',' if depth == 0 => params.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    params.push(current);

    let mut named_only = false;
    params
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty() && *p != "/")
        .enumerate()
        .filter(|(idx, p)| !(is_method && *idx == 0 && (*p == "self" || *p == "cls")))
        .filter_map(|(_, p)| {
            if p == "*" {
                named_only = true;
                return None;
            }
            let mut arg = ArgSpec::parse(p);
            if named_only && arg.kind == super::ArgKind::PositionalOrNamed {
                arg.kind = super::ArgKind::NamedOnly;
            }
            if arg.kind == super::ArgKind::VarPositional {
                named_only = true;
            }
            Some(arg)
        })
        .collect()
}

fn docstring(lines: &[&str], body_start: usize) -> String {
    let Some(first) = lines.get(body_start).map(|l| l.trim()) else {
        return String::new();
    };
    let quote = if first.starts_with("\"\"\"") {
        "\"\"\""
    } else if first.starts_with("'''") {
        "'''"
    } else {
        return String::new();
    };
    let rest = &first[3..];
    if let Some(end) = rest.find(quote) {
        return rest[..end].trim().to_string();
    }
    let mut doc = vec![rest.trim()];
    for line in &lines[body_start + 1..] {
        let line = line.trim();
        if let Some(end) = line.find(quote) {
            doc.push(&line[..end]);
            break;
        }
        doc.push(line);
    }
    doc.join("\n").trim().to_string()
}
