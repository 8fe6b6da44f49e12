//! Single-pass extraction: (theme, text) -> graph fragment.
//!
//! One completion call per extraction. The returned text is parsed as a
//! validity check; a parse failure is a normal outcome that travels with
//! the raw text, never a reason to drop it.

use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{GraphError, ServiceResult};
use crate::graph::{GraphFormat, RdfGraph};
use crate::pipeline::prompts::{DIRECT_RDF_EXTRACTION, FORMAT_RDF_EXTRACTION};
use crate::traits::completion::{CompletionRequest, CompletionService};
use crate::types::fragment::Fragment;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Result of one extraction call.
///
/// `parsed` holds either the graph or the reason the fragment did not
/// parse, so a caller always gets one of the two.
#[derive(Debug, Clone)]
pub struct Extraction {
    /// Raw model output
    pub fragment: Fragment,

    /// Format the fragment was requested (and parsed) in
    pub format: GraphFormat,

    /// Parsed graph, or the parse error
    pub parsed: Result<RdfGraph, GraphError>,
}

impl Extraction {
    /// Parse a fragment and wrap the outcome.
    pub fn from_fragment(fragment: Fragment, format: GraphFormat) -> Self {
        let parsed = RdfGraph::parse(fragment.as_str(), format);
        Self {
            fragment,
            format,
            parsed,
        }
    }

    /// The parsed graph, if parsing succeeded.
    pub fn graph(&self) -> Option<&RdfGraph> {
        self.parsed.as_ref().ok()
    }

    /// The parse error, if parsing failed.
    pub fn error(&self) -> Option<&GraphError> {
        self.parsed.as_ref().err()
    }

    /// Number of distinct triples, if the fragment parsed.
    pub fn triple_count(&self) -> Option<usize> {
        self.graph().map(RdfGraph::len)
    }

    /// Output text in the requested format.
    ///
    /// Re-serializes when the fragment parsed and a different format is
    /// wanted; otherwise returns the raw fragment.
    pub fn render(&self, format: GraphFormat) -> Result<String, GraphError> {
        match &self.parsed {
            Ok(graph) if format != self.format => graph.serialize(format),
            _ => Ok(self.fragment.to_string()),
        }
    }
}

/// Theme-contextualised single-pass extractor.
pub struct Extractor<A> {
    service: A,
    format: GraphFormat,
    timeout: Duration,
}

impl<A: CompletionService> Extractor<A> {
    /// Create an extractor producing Turtle.
    pub fn new(service: A) -> Self {
        Self {
            service,
            format: GraphFormat::Turtle,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Ask the model for a different serialization.
    pub fn with_format(mut self, format: GraphFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the per-call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Extract a graph fragment for `theme` from `text`.
    ///
    /// Empty text is allowed and yields whatever degenerate fragment the
    /// model returns. Service failures are returned as errors; parse
    /// failures are reported inside the [`Extraction`].
    pub async fn extract(&self, theme: &str, text: &str) -> ServiceResult<Extraction> {
        let (request, output) = match self.format {
            GraphFormat::Turtle => (
                CompletionRequest::new(&DIRECT_RDF_EXTRACTION)
                    .input("theme", theme)
                    .input("text", text),
                "rdf_turtle",
            ),
            other => (
                CompletionRequest::new(&FORMAT_RDF_EXTRACTION)
                    .input("theme", theme)
                    .input("text", text)
                    .input("format", other.display_name()),
                "rdf_output",
            ),
        };

        let mut response = self
            .service
            .complete_within(&request, self.timeout)
            .await?;
        let fragment = Fragment::new(strip_code_fence(&response.take(request.prompt, output)?));

        let extraction = Extraction::from_fragment(fragment, self.format);
        match &extraction.parsed {
            Ok(graph) => debug!(theme, triples = graph.len(), "Extracted graph"),
            Err(e) => warn!(theme, error = %e, "Extracted fragment did not parse"),
        }

        Ok(extraction)
    }
}

/// Remove a surrounding markdown code fence, if the model added one.
pub fn strip_code_fence(text: &str) -> String {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return text.to_string();
    };

    // Drop the info string (```turtle, ```json, ...) on the opening line.
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };

    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim_end()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockCompletion;

    const VALID: &str = "@prefix : <http://example.org/climate#> .\n\
                         :amazon_rainforest a :Location ;\n    :absorbs \"2 billion tons of CO2\" .";

    #[tokio::test]
    async fn test_valid_fragment_has_graph() {
        let ai = MockCompletion::new().with_fixed("DirectRdfExtraction", "rdf_turtle", VALID);
        let extractor = Extractor::new(ai);

        let extraction = extractor.extract("Climate Change", "The Amazon...").await.unwrap();

        assert_eq!(extraction.triple_count(), Some(2));
        assert!(extraction.error().is_none());
        assert_eq!(extraction.fragment.as_str(), VALID);
    }

    #[tokio::test]
    async fn test_invalid_fragment_keeps_raw_text_and_error() {
        let ai = MockCompletion::new().with_fixed("DirectRdfExtraction", "rdf_turtle", "not turtle at all");
        let extractor = Extractor::new(ai);

        let extraction = extractor.extract("Climate", "text").await.unwrap();

        assert!(extraction.graph().is_none());
        assert!(extraction.error().is_some());
        assert_eq!(extraction.fragment.as_str(), "not turtle at all");
        assert_eq!(extraction.render(GraphFormat::NTriples).unwrap(), "not turtle at all");
    }

    #[tokio::test]
    async fn test_exactly_one_call() {
        let ai = MockCompletion::new().with_fixed("DirectRdfExtraction", "rdf_turtle", VALID);
        let extractor = Extractor::new(ai.clone());

        extractor.extract("Climate", "").await.unwrap();

        assert_eq!(ai.calls().len(), 1);
        assert_eq!(ai.calls()[0].input("text"), Some(""));
    }

    #[tokio::test]
    async fn test_other_format_uses_format_prompt() {
        let ntriples = "<http://example.org/a> <http://example.org/b> \"c\" .\n";
        let ai = MockCompletion::new().with_fixed("FormatRdfExtraction", "rdf_output", ntriples);
        let extractor = Extractor::new(ai.clone()).with_format(GraphFormat::NTriples);

        let extraction = extractor.extract("Theme", "text").await.unwrap();

        assert_eq!(extraction.triple_count(), Some(1));
        assert_eq!(ai.calls()[0].input("format"), Some("N-Triples"));
    }

    #[tokio::test]
    async fn test_render_converts_format() {
        let ai = MockCompletion::new().with_fixed("DirectRdfExtraction", "rdf_turtle", VALID);
        let extraction = Extractor::new(ai).extract("Climate", "text").await.unwrap();

        let ntriples = extraction.render(GraphFormat::NTriples).unwrap();
        assert_eq!(ntriples.lines().count(), 2);
        assert_eq!(extraction.render(GraphFormat::Turtle).unwrap(), VALID);
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```turtle\n:a :b :c .\n```"), ":a :b :c .");
        assert_eq!(strip_code_fence("```\n[]\n```\n"), "[]");
        assert_eq!(strip_code_fence(":a :b :c ."), ":a :b :c .");
    }
}
