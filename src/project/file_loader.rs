//! Reading workspace files from disk.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::base::constants::{RESOURCE_EXTENSIONS, ROBOT_EXTENSIONS};

/// Lower-cased extension including the dot, e.g. `.robot`.
pub fn get_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
}

/// Whether the file is parsed into the document store by a workspace scan.
pub fn is_robot_file(path: &Path) -> bool {
    get_extension(path).is_some_and(|ext| ROBOT_EXTENSIONS.contains(&ext.as_str()))
}

/// Whether the file may be the target of a `Resource` import.
pub fn is_resource_file(path: &Path) -> bool {
    get_extension(path).is_some_and(|ext| RESOURCE_EXTENSIONS.contains(&ext.as_str()))
}

/// Collect every `.robot`/`.resource` file under `dir`, skipping hidden
/// directories, sorted for deterministic loading.
pub fn collect_file_paths(dir: &Path) -> Result<Vec<PathBuf>, String> {
    if !dir.is_dir() {
        return Err(format!("Directory not found: {}", dir.display()));
    }
    let mut paths = Vec::new();
    let walker = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || !entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| name.starts_with('.') || name == "__pycache__")
        });
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("skipping unreadable entry: {e}");
                continue;
            }
        };
        if entry.file_type().is_file() && is_robot_file(entry.path()) {
            paths.push(entry.into_path());
        }
    }
    paths.sort();
    Ok(paths)
}

/// Read a file as UTF-8, replacing invalid sequences.
pub fn load_file(path: &Path) -> Result<String, String> {
    let bytes =
        fs::read(path).map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    Ok(match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    })
}
