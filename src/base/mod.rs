//! Foundation types for the robotls toolchain.
//!
//! This module provides fundamental types used throughout the crate:
//! - [`Position`], [`Span`] - Line/column positions for syntax nodes
//! - [`Fingerprint`] - Content hashes used for cache validation
//! - [`paths`] - Import-path normalisation that preserves every segment
//! - Domain constants (file extensions, section names, built-in variables)
//!
//! This module has NO dependencies on other robotls modules.

pub mod constants;
mod fingerprint;
pub mod paths;
mod position;

pub use fingerprint::Fingerprint;
pub use position::{Position, Span};
