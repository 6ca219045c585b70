//! Libdoc JSON (`python -m robot.libdoc --format JSON`).
//!
//! Accepts both argument encodings: plain strings (`"name=default"`, Robot
//! 3.x) and objects with `name`/`kind`/`defaultValue` (Robot 4+).

use std::path::PathBuf;

use serde::Deserialize;
use smol_str::SmolStr;

use super::{ArgKind, ArgSpec, KeywordSignature, LibrarySpec, LibspecError, SpecOrigin};
use crate::base::Fingerprint;

#[derive(Debug, Deserialize)]
struct LibdocJson {
    name: String,
    #[serde(default)]
    doc: String,
    #[serde(default)]
    version: String,
    #[serde(default)]
    scope: String,
    #[serde(default)]
    source: Option<PathBuf>,
    #[serde(default)]
    keywords: Vec<LibdocKeyword>,
}

#[derive(Debug, Deserialize)]
struct LibdocKeyword {
    name: String,
    #[serde(default)]
    args: Vec<LibdocArg>,
    #[serde(default)]
    doc: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    source: Option<PathBuf>,
    #[serde(default)]
    lineno: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LibdocArg {
    Text(String),
    Object(LibdocArgObject),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LibdocArgObject {
    name: String,
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    default_value: Option<String>,
    #[serde(default)]
    types: Vec<serde_json::Value>,
}

impl LibdocArg {
    fn into_arg(self) -> ArgSpec {
        match self {
            LibdocArg::Text(text) => ArgSpec::parse(&text),
            LibdocArg::Object(obj) => {
                let kind = match obj.kind.as_deref() {
                    Some("POSITIONAL_ONLY") => ArgKind::PositionalOnly,
                    Some("VAR_POSITIONAL") => ArgKind::VarPositional,
                    Some("NAMED_ONLY") => ArgKind::NamedOnly,
                    Some("VAR_NAMED") => ArgKind::VarNamed,
                    _ => ArgKind::PositionalOrNamed,
                };
                let types = obj
                    .types
                    .into_iter()
                    .filter_map(|t| match t {
                        serde_json::Value::String(s) => Some(s),
                        serde_json::Value::Object(map) => map
                            .get("name")
                            .and_then(|n| n.as_str())
                            .map(str::to_string),
                        _ => None,
                    })
                    .collect();
                ArgSpec {
                    name: SmolStr::new(obj.name),
                    kind,
                    default: obj.default_value,
                    types,
                }
            }
        }
    }
}

/// Parse libdoc JSON output into a spec stamped with `fingerprint`.
pub fn parse_libdoc_json(
    text: &str,
    fingerprint: Fingerprint,
    origin: SpecOrigin,
) -> Result<LibrarySpec, LibspecError> {
    let raw: LibdocJson = serde_json::from_str(text)?;
    let keywords = raw
        .keywords
        .into_iter()
        .map(|kw| KeywordSignature {
            name: SmolStr::new(kw.name),
            args: kw.args.into_iter().map(LibdocArg::into_arg).collect(),
            doc: kw.doc,
            tags: kw.tags,
            source: kw.source,
            lineno: kw.lineno,
        })
        .collect();
    Ok(LibrarySpec {
        name: SmolStr::new(raw.name),
        doc: raw.doc,
        version: raw.version,
        scope: raw.scope,
        keywords,
        source: raw.source,
        fingerprint,
        origin,
    })
}
