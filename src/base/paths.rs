//! Import-path normalisation.
//!
//! Import arguments are taken literally: spaces and non-ASCII characters are
//! valid path content and round-trip unchanged. The only rewrites are removal
//! of one layer of surrounding quotes, expansion of `${/}` and `${CURDIR}`,
//! and lexical folding of `.` / `..` components.

use std::path::{Component, Path, PathBuf};

/// Remove one pair of matching surrounding quotes, if present.
pub fn strip_quotes(literal: &str) -> &str {
    let trimmed = literal.trim();
    for quote in ['"', '\''] {
        if trimmed.len() >= 2 && trimmed.starts_with(quote) && trimmed.ends_with(quote) {
            return &trimmed[1..trimmed.len() - 1];
        }
    }
    trimmed
}

/// Expand the path-related built-in variables of an import literal.
///
/// `${/}` becomes the platform separator, `${CURDIR}` the importing
/// document's directory (left untouched when unknown).
pub fn expand_path_variables(literal: &str, importer_dir: Option<&Path>) -> String {
    let mut out = literal.replace("${/}", std::path::MAIN_SEPARATOR_STR);
    if let Some(dir) = importer_dir {
        out = out.replace("${CURDIR}", &dir.to_string_lossy());
    }
    out
}

/// Prepare an import literal for resolution: quotes stripped, variables
/// expanded.
pub fn clean_import_literal(literal: &str, importer_dir: Option<&Path>) -> String {
    expand_path_variables(strip_quotes(literal), importer_dir)
}

/// Lexically normalise a path: drop `.` components and fold `..` into the
/// preceding normal component. Does not touch the filesystem.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(
                    out.components().next_back(),
                    Some(Component::Normal(_))
                ) && out.pop();
                if !popped && !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// True when the literal names a path rather than a module name.
pub fn looks_like_path(literal: &str) -> bool {
    literal.contains('/')
        || literal.contains('\\')
        || literal.contains(std::path::MAIN_SEPARATOR)
        || has_extension(literal)
}

fn has_extension(literal: &str) -> bool {
    let lower = literal.to_ascii_lowercase();
    super::constants::PATH_LIBRARY_EXTENSIONS
        .iter()
        .chain(super::constants::RESOURCE_EXTENSIONS.iter())
        .chain(super::constants::VARIABLE_FILE_EXTENSIONS.iter())
        .any(|ext| lower.ends_with(ext))
}
