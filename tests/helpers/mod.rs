//! Shared fixtures for integration tests.

pub mod source_fixtures;
pub mod workspace;
