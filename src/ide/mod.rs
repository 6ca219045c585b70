//! IDE features: the Resolution Engine behind editor requests.
//!
//! This module provides the interface between the workspace index (HIR)
//! and an editor protocol layer. Each function corresponds to one request.
//!
//! ## Design Principles
//!
//! 1. **Snapshot reads**: Every query runs against one `IndexSnapshot`
//! 2. **No protocol types**: Uses our own types, converted at the boundary
//! 3. **Never blocks**: No locks held across a query, no subprocesses
//!
//! ## Usage
//!
//! The recommended way to use this module is through `AnalysisHost`:
//!
//! ```ignore
//! use robotls::ide::AnalysisHost;
//!
//! let mut host = AnalysisHost::new();
//! host.set_file_content("/ws/suite.robot", "*** Test Cases ***\nT\n    Log    hi\n");
//!
//! let analysis = host.analysis();
//! let items = analysis.completions("/ws/suite.robot", Position::new(2, 6));
//! ```

mod analysis;
mod completion;
mod cursor;
mod goto;
mod hover;
mod references;

pub use analysis::{Analysis, AnalysisHost};
pub use completion::{CompletionItem, CompletionKind, completions};
pub use cursor::{CursorCell, VariableRef, cell_at, typing_cell, variable_at};
pub use goto::definition_of;
pub use hover::{HoverResult, hover};
pub use references::{Reference, find_references};
