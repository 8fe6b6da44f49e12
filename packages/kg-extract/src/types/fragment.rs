//! Fragment type - model-produced graph text.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Text that purports to encode a graph in some serialization.
///
/// Nothing about the content is checked on construction; see
/// [`RdfGraph::parse`](crate::graph::RdfGraph::parse) for validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fragment(String);

impl Fragment {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

/// True for Turtle/SPARQL-style prefix and base declaration lines.
///
/// SPARQL-style keywords are case-insensitive, so `prefix ex: <..>` counts.
pub fn is_declaration(line: &str) -> bool {
    ["@prefix", "@base", "prefix", "base"]
        .iter()
        .any(|keyword| strip_keyword(line, keyword).is_some())
}

/// Prefix name declared on a line, if it is a prefix declaration.
pub fn prefix_name(line: &str) -> Option<&str> {
    let rest = strip_keyword(line, "@prefix").or_else(|| strip_keyword(line, "prefix"))?;
    Some(rest.trim_start().split(':').next()?.trim())
}

/// Text after a leading keyword, matched ignoring ASCII case and only when
/// followed by whitespace.
fn strip_keyword<'a>(line: &'a str, keyword: &str) -> Option<&'a str> {
    let line = line.trim_start();
    let head = line.get(..keyword.len())?;
    let rest = &line[keyword.len()..];
    (head.eq_ignore_ascii_case(keyword) && rest.starts_with(char::is_whitespace)).then_some(rest)
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Fragment {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Fragment {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for Fragment {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
