//! Project layer: documents, configuration, file loading, import
//! resolution and library specs.

pub mod config;
mod document_store;
pub mod file_loader;
pub mod libspec;
pub mod search_path;
pub mod variable_file;
mod workspace_loader;

pub use config::{ConfigError, VariablePrecedence, WorkspaceConfig};
pub use document_store::{Document, DocumentStore};
pub use libspec::{LibraryImport, LibrarySpec, LibrarySpecCache, ResolvedLibrary};
pub use search_path::{ImportStatus, PathLookup, SearchContext};
pub use workspace_loader::WorkspaceLoader;
