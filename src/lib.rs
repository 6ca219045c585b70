//! # robotls-base
//!
//! Core library for Robot Framework language tooling: workspace indexing,
//! keyword and variable resolution, background analysis, and a debug
//! adapter for the interpreter.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! ide       → AnalysisHost/Analysis, completion, hover, goto-def
//!   ↓
//! pipeline  → Debounced analysis worker, version-checked publishing
//!   ↓
//! hir       → Keyword names, symbols, WorkspaceIndex, semantic checks
//!   ↓
//! project   → Documents, config, import resolution, library specs
//!   ↓
//! syntax    → AST types, cell roles, ParseError
//!   ↓
//! parser    → Logos row lexer, section parser
//!   ↓
//! base      → Primitives (Position, Span, Fingerprint, paths)
//!
//! debug     → Debug session state machine, interpreter transport
//! ```

// ============================================================================
// MODULES (dependency order: base → parser → syntax → project → hir → pipeline → ide)
// ============================================================================

/// Foundation types: positions, fingerprints, path normalisation
pub mod base;

/// Parser: Logos row lexer and section parser
pub mod parser;

/// Syntax: AST types and cell classification
pub mod syntax;

/// Project management: documents, configuration, imports, library specs
pub mod project;

/// Semantic model: names, symbols, workspace index, diagnostics
pub mod hir;

/// Background analysis worker and diagnostics publishing
pub mod pipeline;

/// IDE features: completion, hover, goto-definition
pub mod ide;

/// Debug adapter for the interpreter
pub mod debug;

// Re-export foundation types
pub use base::{Fingerprint, Position, Span};

// Re-export the main entry points
pub use debug::{DebugAdapter, DebugError, LaunchConfig};
pub use hir::{Diagnostic, Severity, WorkspaceIndex};
pub use ide::{Analysis, AnalysisHost};
pub use project::{DocumentStore, LibrarySpecCache, WorkspaceConfig};
