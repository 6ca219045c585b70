//! Keyword and variable name matching.
//!
//! Robot compares names case-insensitively, ignoring spaces and underscores.
//! A call site may carry a Gherkin prefix (`Given`, `When`, ...) and/or a
//! `Source.` qualifier, and a definition may contain embedded arguments
//! (`Open ${page} Page`). [`KeywordName`] captures each of these forms and
//! [`KeywordName::matches`] is the only place where they are compared.

use smol_str::SmolStr;

use crate::base::constants::GHERKIN_PREFIXES;

/// Robot name normalisation: lower case, spaces and underscores removed.
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace() && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Normalised base name of a variable reference: `${My Var}[0]` → `myvar`.
/// Sigils are ignored so `@{list}` and `${list}` compare equal.
pub fn normalize_variable(text: &str) -> Option<String> {
    crate::syntax::variable_base_name(text).map(normalize_name)
}

/// Strip one leading Gherkin prefix (`Given Login` → `Login`).
pub fn strip_gherkin(text: &str) -> Option<&str> {
    let (first, rest) = text.split_once(' ')?;
    let rest = rest.trim_start();
    if rest.is_empty() {
        return None;
    }
    GHERKIN_PREFIXES
        .iter()
        .any(|p| first.eq_ignore_ascii_case(p))
        .then_some(rest)
}

/// Literal text or placeholder in an embedded-argument name.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    /// Lower-cased literal with whitespace runs collapsed.
    Literal(String),
    Placeholder(SmolStr),
}

/// A keyword name containing `${arg}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedPattern {
    segments: Vec<Segment>,
}

impl EmbeddedPattern {
    /// Parse `Open ${page} Page`; `None` when the name has no placeholder.
    pub fn parse(name: &str) -> Option<Self> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = name;
        while let Some(start) = rest.find("${") {
            let after = &rest[start + 2..];
            let Some(len) = placeholder_len(after) else {
                break;
            };
            literal.push_str(&rest[..start]);
            if !literal.is_empty() {
                segments.push(Segment::Literal(fold(&literal)));
                literal.clear();
            }
            let inner = &after[..len];
            // `${count:\d+}`: the custom regex is ignored, any value matches.
            let arg = inner.split(':').next().unwrap_or(inner);
            segments.push(Segment::Placeholder(SmolStr::new(arg.trim())));
            rest = &after[len + 1..];
        }
        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(fold(&literal)));
        }
        segments
            .iter()
            .any(|s| matches!(s, Segment::Placeholder(_)))
            .then_some(Self { segments })
    }

    /// Placeholder names in order.
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Placeholder(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Whether a call text binds this pattern; every placeholder takes at
    /// least one character.
    pub fn matches(&self, text: &str) -> bool {
        let text = fold(text);
        match_segments(&self.segments, &text)
    }
}

/// Length of a `${...}` body up to its balanced closing brace.
fn placeholder_len(after_open: &str) -> Option<usize> {
    let mut depth = 1usize;
    for (i, ch) in after_open.char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Lower-case and collapse whitespace runs to one space.
fn fold(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_space = false;
    for ch in text.chars() {
        if ch.is_whitespace() {
            if !prev_space {
                out.push(' ');
            }
            prev_space = true;
        } else {
            out.extend(ch.to_lowercase());
            prev_space = false;
        }
    }
    out
}

fn match_segments(segments: &[Segment], text: &str) -> bool {
    let Some((first, rest)) = segments.split_first() else {
        return text.is_empty();
    };
    match first {
        Segment::Literal(lit) => text
            .strip_prefix(lit.as_str())
            .is_some_and(|remaining| match_segments(rest, remaining)),
        Segment::Placeholder(_) => text
            .char_indices()
            .map(|(i, _)| i)
            .skip(1)
            .chain(std::iter::once(text.len()))
            .filter(|&i| i > 0)
            .any(|i| match_segments(rest, &text[i..])),
    }
}

/// A keyword name in one of the forms Robot distinguishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeywordName {
    /// `Say Hello`
    Plain { raw: SmolStr, normalized: String },
    /// `Col.Append To List`; call sites only.
    Prefixed {
        prefix: String,
        raw: SmolStr,
        normalized: String,
    },
    /// `Open ${page} Page`; definitions only.
    Embedded { raw: SmolStr, pattern: EmbeddedPattern },
}

impl KeywordName {
    /// Name of a keyword definition.
    pub fn definition(name: &str) -> Self {
        match EmbeddedPattern::parse(name) {
            Some(pattern) => KeywordName::Embedded {
                raw: SmolStr::new(name),
                pattern,
            },
            None => KeywordName::plain(name),
        }
    }

    fn plain(name: &str) -> Self {
        KeywordName::Plain {
            raw: SmolStr::new(name),
            normalized: normalize_name(name),
        }
    }

    /// Every way a call site may be read, in the order Robot tries them:
    /// the full text, then without a Gherkin prefix, then each `Source.`
    /// split (leftmost dot first) of both.
    pub fn call_forms(text: &str) -> Vec<KeywordName> {
        let text = text.trim();
        if text.is_empty() {
            return Vec::new();
        }
        let mut bases = vec![text];
        if let Some(stripped) = strip_gherkin(text) {
            bases.push(stripped);
        }
        let mut forms: Vec<KeywordName> = bases.iter().map(|b| KeywordName::plain(b)).collect();
        for base in bases {
            for (dot, _) in base.match_indices('.') {
                let (prefix, name) = (&base[..dot], &base[dot + 1..]);
                if prefix.trim().is_empty() || name.trim().is_empty() {
                    continue;
                }
                forms.push(KeywordName::Prefixed {
                    prefix: normalize_name(prefix),
                    raw: SmolStr::new(name),
                    normalized: normalize_name(name),
                });
            }
        }
        forms
    }

    pub fn raw(&self) -> &str {
        match self {
            KeywordName::Plain { raw, .. }
            | KeywordName::Prefixed { raw, .. }
            | KeywordName::Embedded { raw, .. } => raw,
        }
    }

    /// Normalised name; embedded patterns normalise their raw text.
    pub fn normalized(&self) -> String {
        match self {
            KeywordName::Plain { normalized, .. } | KeywordName::Prefixed { normalized, .. } => {
                normalized.clone()
            }
            KeywordName::Embedded { raw, .. } => normalize_name(raw),
        }
    }

    /// Required source qualifier of a call form.
    pub fn prefix(&self) -> Option<&str> {
        match self {
            KeywordName::Prefixed { prefix, .. } => Some(prefix),
            _ => None,
        }
    }

    pub fn is_embedded(&self) -> bool {
        matches!(self, KeywordName::Embedded { .. })
    }

    /// Whether the definition `self`, provided by a source whose normalised
    /// name is `source`, is what the call form `call` refers to.
    pub fn matches(&self, call: &KeywordName, source: &str) -> bool {
        if let Some(prefix) = call.prefix() {
            if prefix != source {
                return false;
            }
        }
        match (self, call) {
            (KeywordName::Embedded { pattern, .. }, call) => pattern.matches(call.raw()),
            (KeywordName::Plain { normalized, .. }, call) => *normalized == call.normalized(),
            (KeywordName::Prefixed { .. }, _) => false,
        }
    }
}
