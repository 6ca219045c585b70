//! Bundled specs for the standard libraries.
//!
//! Parsed once on first access and shared for the process lifetime.

use std::sync::{Arc, LazyLock};

use rustc_hash::FxHashMap;

use super::libdoc::parse_libdoc_json;
use super::{LibrarySpec, SpecOrigin};
use crate::base::Fingerprint;
use crate::hir::normalize_name;

const BUNDLED: &[(&str, &str)] = &[
    ("BuiltIn", include_str!("data/BuiltIn.json")),
    ("Collections", include_str!("data/Collections.json")),
    ("String", include_str!("data/String.json")),
    ("OperatingSystem", include_str!("data/OperatingSystem.json")),
];

static SPECS: LazyLock<FxHashMap<String, Arc<LibrarySpec>>> = LazyLock::new(|| {
    let mut specs = FxHashMap::default();
    for (name, json) in BUNDLED {
        match parse_libdoc_json(json, Fingerprint::of_text(json), SpecOrigin::Bundled) {
            Ok(spec) => {
                specs.insert(normalize_name(name), Arc::new(spec));
            }
            Err(e) => tracing::error!(library = name, "bundled spec is invalid: {e}"),
        }
    }
    specs
});

/// Bundled spec for a standard library, matched with Robot name rules.
pub fn bundled_spec(name: &str) -> Option<Arc<LibrarySpec>> {
    SPECS.get(&normalize_name(name)).cloned()
}

/// Names of all bundled libraries.
pub fn bundled_library_names() -> impl Iterator<Item = &'static str> {
    BUNDLED.iter().map(|(name, _)| *name)
}
