//! Breakpoint validation against parsed documents.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::syntax::SyntaxFile;

/// A breakpoint as reported back to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breakpoint {
    pub id: u64,
    pub path: PathBuf,
    /// 0-based line.
    pub line: u32,
    /// Whether the line is armed in the interpreter.
    pub verified: bool,
    /// Why the breakpoint is not verified.
    pub message: Option<String>,
}

/// Check `lines` of `path` against its parsed tree. Lines that do not lie
/// within an executable statement come back unverified; they are not
/// errors. `tree` is `None` when the file is not known to the workspace.
pub fn validate_breakpoints(
    path: &Path,
    tree: Option<&SyntaxFile>,
    lines: &[u32],
    next_id: &mut u64,
) -> Vec<Breakpoint> {
    lines
        .iter()
        .map(|&line| {
            let message = match tree {
                None => Some("File is not part of the workspace.".to_string()),
                Some(tree) if tree.executable_step_at(line).is_none() => {
                    Some(format!("Line {} is not an executable statement.", line + 1))
                }
                Some(_) => None,
            };
            *next_id += 1;
            Breakpoint {
                id: *next_id,
                path: path.to_path_buf(),
                line,
                verified: message.is_none(),
                message,
            }
        })
        .collect()
}
