//! Library specifications: the keywords a library provides.
//!
//! Specs come from three places: bundled libdoc JSON for the standard
//! libraries, `python -m robot.libdoc` when an interpreter is available, and
//! a static scan of Python sources otherwise. All of them end up as an
//! immutable [`LibrarySpec`] shared through `Arc`.

mod builtin;
mod cache;
mod introspect;
mod libdoc;
mod python_scan;

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use thiserror::Error;

use crate::base::Fingerprint;

pub use builtin::{bundled_library_names, bundled_spec};
pub use cache::{CacheStats, LibraryImport, LibrarySpecCache, ResolvedLibrary, SpecResolution};
pub use introspect::{DefaultIntrospector, IntrospectRequest, LibraryIntrospector, LibraryTarget};
pub use libdoc::parse_libdoc_json;
pub use python_scan::scan_python_source;

/// Errors raised while producing a spec. Never escapes
/// [`LibrarySpecCache::resolve`]; it becomes a status and a message.
#[derive(Debug, Error)]
pub enum LibspecError {
    #[error("library '{0}' not found")]
    NotFound(String),
    #[error("libdoc failed for '{name}': {message}")]
    Libdoc { name: String, message: String },
    #[error("libdoc timed out for '{0}'")]
    Timeout(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid spec json: {0}")]
    Json(#[from] serde_json::Error),
}

/// How an argument binds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArgKind {
    PositionalOnly,
    #[default]
    PositionalOrNamed,
    VarPositional,
    NamedOnly,
    VarNamed,
}

/// One keyword argument.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArgSpec {
    pub name: SmolStr,
    pub kind: ArgKind,
    pub default: Option<String>,
    /// Type annotations as reported by the source; never displayed.
    #[serde(default)]
    pub types: Vec<String>,
}

impl ArgSpec {
    pub fn positional(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            kind: ArgKind::PositionalOrNamed,
            default: None,
            types: Vec::new(),
        }
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_kind(mut self, kind: ArgKind) -> Self {
        self.kind = kind;
        self
    }

    /// Parse the string form used by older libdoc output and by Robot
    /// `[Arguments]`: `name`, `name=default`, `name: int = 1`, `*args`,
    /// `**kwargs`, `${x}`, `${x}=1`, `@{list}`, `&{dict}`.
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        let (head, default) = match split_default(text) {
            Some((head, default)) => (head.trim(), Some(default.trim().to_string())),
            None => (text, None),
        };
        let (kind, name) = if let Some(rest) = head.strip_prefix("**") {
            (ArgKind::VarNamed, rest)
        } else if let Some(rest) = head.strip_prefix('*') {
            (ArgKind::VarPositional, rest)
        } else if let Some(inner) = strip_variable(head, '@') {
            (ArgKind::VarPositional, inner)
        } else if let Some(inner) = strip_variable(head, '&') {
            (ArgKind::VarNamed, inner)
        } else if let Some(inner) = strip_variable(head, '$') {
            (ArgKind::PositionalOrNamed, inner)
        } else {
            (ArgKind::PositionalOrNamed, head)
        };
        let (name, types) = match name.split_once(':') {
            Some((name, ty)) => (name.trim(), vec![ty.trim().to_string()]),
            None => (name, Vec::new()),
        };
        Self {
            name: SmolStr::new(name),
            kind,
            default,
            types,
        }
    }

    /// Display form with type annotations stripped.
    pub fn display(&self) -> String {
        let mut out = match self.kind {
            ArgKind::VarPositional => format!("*{}", self.name),
            ArgKind::VarNamed => format!("**{}", self.name),
            _ => self.name.to_string(),
        };
        if let Some(default) = &self.default {
            out.push('=');
            out.push_str(default);
        }
        out
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none()
            && matches!(self.kind, ArgKind::PositionalOnly | ArgKind::PositionalOrNamed)
    }
}

impl fmt::Display for ArgSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

fn split_default(text: &str) -> Option<(&str, &str)> {
    // `${x}=1`: the `=` after the closing brace.
    if text.starts_with(['$', '@', '&']) {
        let close = text.find('}')?;
        let rest = &text[close + 1..];
        return rest
            .strip_prefix('=')
            .map(|default| (&text[..=close], default));
    }
    text.split_once('=')
}

fn strip_variable(text: &str, sigil: char) -> Option<&str> {
    text.strip_prefix(sigil)?.strip_prefix('{')?.strip_suffix('}')
}

/// A keyword exported by a library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordSignature {
    pub name: SmolStr,
    #[serde(default)]
    pub args: Vec<ArgSpec>,
    #[serde(default)]
    pub doc: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub source: Option<PathBuf>,
    /// 1-based line in `source`.
    #[serde(default)]
    pub lineno: Option<u32>,
}

impl KeywordSignature {
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
            doc: String::new(),
            tags: Vec::new(),
            source: None,
            lineno: None,
        }
    }

    pub fn with_args(mut self, args: Vec<ArgSpec>) -> Self {
        self.args = args;
        self
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = doc.into();
        self
    }

    /// `arg1, arg2=default, *rest`
    pub fn args_display(&self) -> String {
        self.args
            .iter()
            .map(ArgSpec::display)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// First paragraph of the documentation.
    pub fn short_doc(&self) -> &str {
        self.doc.split("\n\n").next().unwrap_or_default().trim()
    }
}

/// Where a spec came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpecOrigin {
    Bundled,
    Libdoc,
    StaticScan,
    /// Directory-valued resource imports and failed lookups.
    Empty,
}

/// Structured description of a library.
///
/// Never mutated after construction; invalidation replaces the `Arc`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibrarySpec {
    pub name: SmolStr,
    #[serde(default)]
    pub doc: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub scope: String,
    pub keywords: Vec<KeywordSignature>,
    #[serde(default)]
    pub source: Option<PathBuf>,
    pub fingerprint: Fingerprint,
    pub origin: SpecOrigin,
}

impl LibrarySpec {
    pub fn empty(name: impl Into<SmolStr>, fingerprint: Fingerprint) -> Self {
        Self {
            name: name.into(),
            doc: String::new(),
            version: String::new(),
            scope: String::new(),
            keywords: Vec::new(),
            source: None,
            fingerprint,
            origin: SpecOrigin::Empty,
        }
    }

    pub fn keyword(&self, normalized: &str) -> Option<&KeywordSignature> {
        self.keywords
            .iter()
            .find(|k| crate::hir::normalize_name(&k.name) == normalized)
    }
}
