//! Semantic model: names, symbols, the workspace index and diagnostics.
//!
//! ## Key Types
//!
//! - [`KeywordName`] - Plain, `Source.`-prefixed and embedded-argument names
//! - [`DocumentSymbols`] - Definitions and keyword usages of one document
//! - [`WorkspaceIndex`] - Single-writer owner of the current [`IndexSnapshot`]
//! - [`IndexSnapshot`] - Immutable view answering keyword and variable lookups
//! - [`SemanticChecker`] - Per-document checks producing [`Diagnostic`]s
//!
//! ## Layers
//!
//! ```text
//! Document (text + tree)
//!     │
//!     ▼
//! extract_symbols(tree)          ← per-document definitions and usages
//!     │
//!     ▼
//! WorkspaceIndex::on_*           ← imports resolved, rows patched, swap
//!     │
//!     ▼
//! IndexSnapshot::lookup_*        ← precedence-ordered candidates
//!     │
//!     ▼
//! check_document(snapshot, path) ← diagnostics
//! ```

mod diagnostics;
mod name;
mod resolve;
mod symbols;

pub use diagnostics::{
    Diagnostic, DiagnosticCollector, RelatedInfo, SemanticChecker, Severity, check_document, codes,
};
pub use name::{EmbeddedPattern, KeywordName, normalize_name, normalize_variable, strip_gherkin};
pub use resolve::{
    DocumentEntry, ImportEntry, IndexChange, IndexSnapshot, KeywordCandidate, KeywordTier,
    Location, VariableCandidate, VariableTier, WorkspaceIndex,
};
pub use symbols::{
    DocumentSymbols, KeywordDef, KeywordUsage, VariableDef, extract_symbols, local_variables,
};
