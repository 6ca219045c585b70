//! Project layer tests
//!
//! Tests for:
//! - Document store versions and fingerprints
//! - Path-valued import resolution
//! - Library spec cache reuse

pub mod tests_document_store;
pub mod tests_imports;
