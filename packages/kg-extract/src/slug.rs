//! Identifier-safe names derived from free text.

use regex::Regex;
use std::sync::OnceLock;

fn non_alphanumeric() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-zA-Z0-9]+").expect("static regex"))
}

/// Convert a string to a node-reference slug.
///
/// Lowercases, collapses every run of non-alphanumeric characters into a
/// single `_`, and trims `_` from both ends.
///
/// ```
/// assert_eq!(kg_extract::slugify("AI Writing Tools!"), "ai_writing_tools");
/// ```
pub fn slugify(value: &str) -> String {
    let lowered = value.trim().to_lowercase();
    non_alphanumeric()
        .replace_all(&lowered, "_")
        .trim_matches('_')
        .to_string()
}

/// File-name stem for a domain (`"AI Writing Tools"` -> `"ai-writing-tools"`).
pub fn file_stem_for_domain(domain: &str) -> String {
    domain.trim().to_lowercase().replace(' ', "-")
}

/// Instance file name for a page URL.
///
/// `https://jasper.ai/pricing` becomes `jasper_ai_pricing.ttl`.
pub fn file_name_for_url(url: &str) -> String {
    let stripped = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);

    format!("{}.ttl", stripped.replace(['/', '.'], "_"))
}
