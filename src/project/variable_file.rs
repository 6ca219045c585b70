//! Variables imported through `Variables` settings.
//!
//! Python files contribute their public module-level assignments
//! (`LIST__name` and `DICT__name` become `@{name}` and `&{name}`). JSON files
//! contribute the keys of their top-level object. Other formats resolve but
//! contribute nothing.

use std::fs;
use std::path::Path;

use smol_str::SmolStr;

/// `(decorated name, value text)` pairs defined by a variable file.
pub fn load_variable_file(path: &Path) -> Vec<(SmolStr, String)> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            tracing::debug!(path = %path.display(), "unreadable variable file: {e}");
            return Vec::new();
        }
    };
    match ext.as_str() {
        "py" => python_variables(&text),
        "json" => json_variables(&text),
        _ => Vec::new(),
    }
}

fn decorate(name: &str) -> SmolStr {
    if let Some(rest) = name.strip_prefix("LIST__") {
        SmolStr::new(format!("@{{{rest}}}"))
    } else if let Some(rest) = name.strip_prefix("DICT__") {
        SmolStr::new(format!("&{{{rest}}}"))
    } else {
        SmolStr::new(format!("${{{name}}}"))
    }
}

fn python_variables(text: &str) -> Vec<(SmolStr, String)> {
    text.lines()
        .filter(|line| !line.starts_with([' ', '\t', '#']))
        .filter_map(|line| {
            let (name, value) = line.split_once('=')?;
            let name = name.trim();
            let value = value.trim();
            let is_ident = !name.is_empty()
                && name.chars().all(|c| c.is_alphanumeric() || c == '_')
                && !name.starts_with(|c: char| c.is_ascii_digit() || c == '_');
            (is_ident && !value.starts_with('=')).then(|| (decorate(name), value.to_string()))
        })
        .collect()
}

fn json_variables(text: &str) -> Vec<(SmolStr, String)> {
    match serde_json::from_str::<serde_json::Value>(text) {
        Ok(serde_json::Value::Object(map)) => map
            .into_iter()
            .map(|(name, value)| {
                let value = match value {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                (decorate(&name), value)
            })
            .collect(),
        Ok(_) => Vec::new(),
        Err(e) => {
            tracing::debug!("invalid json variable file: {e}");
            Vec::new()
        }
    }
}
