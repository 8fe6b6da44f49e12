//! Triple-based extraction: the model returns structured triples and the
//! graph is assembled locally with slugified node references.

use std::time::Duration;

use tracing::{debug, info};

use crate::error::{ExtractionError, ServiceError, ServiceResult};
use crate::graph::{literal, named_node, GraphFormat, RdfGraph};
use crate::pipeline::extract::strip_code_fence;
use crate::pipeline::prompts::EXTRACT_TRIPLES;
use crate::slug::slugify;
use crate::traits::completion::{strict_schema, CompletionRequest, CompletionService};
use crate::types::triple::{Triple, TripleList};

/// Default namespace for generated nodes.
pub const DEFAULT_BASE_NAMESPACE: &str = "http://example.org/";

const DC_TITLE: &str = "http://purl.org/dc/terms/title";

/// Extracts triples with the model and builds a Turtle graph from them.
pub struct TripleGraphBuilder<A> {
    service: A,
    base: String,
    timeout: Duration,
}

impl<A: CompletionService> TripleGraphBuilder<A> {
    /// Create a builder using [`DEFAULT_BASE_NAMESPACE`].
    pub fn new(service: A) -> Self {
        Self {
            service,
            base: DEFAULT_BASE_NAMESPACE.to_string(),
            timeout: Duration::from_secs(120),
        }
    }

    /// Set the namespace generated nodes live in.
    pub fn with_base_namespace(mut self, base: impl Into<String>) -> Self {
        self.base = base.into();
        self
    }

    /// Set the per-call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Ask the model for triples relevant to `theme`.
    pub async fn extract_triples(&self, theme: &str, text: &str) -> ServiceResult<Vec<Triple>> {
        let request = CompletionRequest::new(&EXTRACT_TRIPLES)
            .input("theme", theme)
            .input("text", text);

        let mut response = self
            .service
            .complete_within(&request, self.timeout)
            .await?;
        let raw = response.take(&EXTRACT_TRIPLES, "triples")?;

        let triples = parse_triples(&raw)?;
        debug!(theme, count = triples.len(), "Extracted triples");
        Ok(triples)
    }

    /// Extract triples and return the resulting graph as Turtle.
    pub async fn build(&self, theme: &str, text: &str) -> Result<String, ExtractionError> {
        let triples = self.extract_triples(theme, text).await?;
        let graph = self.assemble(theme, &triples)?;

        info!(theme, triples = graph.len(), "Built triple graph");
        Ok(graph.serialize(GraphFormat::Turtle)?)
    }

    /// Build the graph for a theme and a set of triples.
    ///
    /// The theme node carries a `dc:title`, each subject is linked from the
    /// theme with `relatesTo`, and objects containing whitespace become
    /// literals.
    pub fn assemble(&self, theme: &str, triples: &[Triple]) -> Result<RdfGraph, ExtractionError> {
        let node = |value: &str| named_node(format!("{}{}", self.base, slugify(value)));

        let mut graph = RdfGraph::new();
        let relates_to = named_node(format!("{}relatesTo", self.base))?;
        let theme_node = node(theme)?;
        graph.insert(theme_node.clone(), named_node(DC_TITLE)?, literal(theme));

        for triple in triples {
            let subject = node(&triple.subject)?;
            let predicate = node(&triple.predicate)?;

            if triple.object_is_literal() {
                graph.insert(subject.clone(), predicate, literal(triple.object.clone()));
            } else {
                graph.insert(subject.clone(), predicate, node(&triple.object)?);
            }
            graph.insert(theme_node.clone(), relates_to.clone(), subject);
        }

        Ok(graph)
    }
}

/// Parse the model's triple list.
///
/// Accepts a bare JSON array or an object wrapping one under `triples`,
/// optionally inside a code fence.
pub fn parse_triples(raw: &str) -> ServiceResult<Vec<Triple>> {
    #[derive(serde::Deserialize)]
    #[serde(untagged)]
    enum Payload {
        Bare(Vec<Triple>),
        Wrapped(TripleList),
    }

    let cleaned = strip_code_fence(raw);
    match serde_json::from_str::<Payload>(&cleaned) {
        Ok(Payload::Bare(triples)) | Ok(Payload::Wrapped(TripleList { triples })) => Ok(triples),
        Err(e) => Err(ServiceError::MalformedResponse {
            prompt: EXTRACT_TRIPLES.name.to_string(),
            reason: format!("triples are not a JSON list of subject/predicate/object: {}", e),
        }),
    }
}

/// Strict response schema for the triples prompt: `{"triples": [Triple]}`.
pub fn triples_response_schema() -> serde_json::Value {
    strict_schema::<TripleList>()
}
