//! Workspace index tests
//!
//! Tests for:
//! - Keyword and variable precedence
//! - Resolution misses
//! - Snapshot isolation under concurrent readers

pub mod tests_precedence;
pub mod tests_snapshots;
