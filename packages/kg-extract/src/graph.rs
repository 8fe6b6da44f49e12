//! RDF parse/serialize boundary.
//!
//! Model output is only ever checked syntactically: a fragment is "valid" if
//! `oxrdfio` can parse it. Parsed graphs are used for triple counts and for
//! converting between serializations.

use std::fmt;
use std::str::FromStr;

use oxrdf::{Dataset, GraphName, Literal, NamedNode, Quad, Subject, Term};
use oxrdfio::{JsonLdProfileSet, RdfFormat, RdfParser, RdfSerializer};

use crate::error::{GraphError, GraphResult};

/// Base IRI used to resolve relative references such as `<>` or
/// `<./schema.ttl>`.
pub const DEFAULT_BASE_IRI: &str = "http://example.org/";

/// Supported textual graph serializations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum GraphFormat {
    #[default]
    Turtle,
    NTriples,
    NQuads,
    TriG,
    RdfXml,
    N3,
    JsonLd,
}

impl GraphFormat {
    pub const ALL: [GraphFormat; 7] = [
        GraphFormat::Turtle,
        GraphFormat::NTriples,
        GraphFormat::NQuads,
        GraphFormat::TriG,
        GraphFormat::RdfXml,
        GraphFormat::N3,
        GraphFormat::JsonLd,
    ];

    /// Short name as accepted on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            GraphFormat::Turtle => "turtle",
            GraphFormat::NTriples => "ntriples",
            GraphFormat::NQuads => "nquads",
            GraphFormat::TriG => "trig",
            GraphFormat::RdfXml => "xml",
            GraphFormat::N3 => "n3",
            GraphFormat::JsonLd => "jsonld",
        }
    }

    /// Human-readable name used in prompts.
    pub fn display_name(&self) -> &'static str {
        match self {
            GraphFormat::Turtle => "Turtle",
            GraphFormat::NTriples => "N-Triples",
            GraphFormat::NQuads => "N-Quads",
            GraphFormat::TriG => "TriG",
            GraphFormat::RdfXml => "RDF/XML",
            GraphFormat::N3 => "N3",
            GraphFormat::JsonLd => "JSON-LD",
        }
    }

    fn rdf_format(&self) -> RdfFormat {
        match self {
            GraphFormat::Turtle => RdfFormat::Turtle,
            GraphFormat::NTriples => RdfFormat::NTriples,
            GraphFormat::NQuads => RdfFormat::NQuads,
            GraphFormat::TriG => RdfFormat::TriG,
            GraphFormat::RdfXml => RdfFormat::RdfXml,
            GraphFormat::N3 => RdfFormat::N3,
            GraphFormat::JsonLd => RdfFormat::JsonLd {
                profile: JsonLdProfileSet::empty(),
            },
        }
    }
}

impl fmt::Display for GraphFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for GraphFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "turtle" | "ttl" => Ok(GraphFormat::Turtle),
            "ntriples" | "nt" | "n-triples" => Ok(GraphFormat::NTriples),
            "nquads" | "nq" | "n-quads" => Ok(GraphFormat::NQuads),
            "trig" => Ok(GraphFormat::TriG),
            "xml" | "rdfxml" | "rdf/xml" | "rdf" => Ok(GraphFormat::RdfXml),
            "n3" => Ok(GraphFormat::N3),
            "jsonld" | "json-ld" => Ok(GraphFormat::JsonLd),
            other => Err(format!(
                "unsupported graph format `{}` (expected one of: {})",
                other,
                GraphFormat::ALL
                    .iter()
                    .map(GraphFormat::name)
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
        }
    }
}

/// An in-memory set of parsed statements.
///
/// Duplicate statements are stored once, so [`RdfGraph::len`] is the number
/// of distinct triples.
#[derive(Debug, Clone, Default)]
pub struct RdfGraph {
    dataset: Dataset,
}

impl RdfGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse text in the given format.
    pub fn parse(text: &str, format: GraphFormat) -> GraphResult<Self> {
        let parser = RdfParser::from_format(format.rdf_format())
            .with_base_iri(DEFAULT_BASE_IRI)
            .map_err(|e| GraphError::InvalidIri {
                iri: DEFAULT_BASE_IRI.to_string(),
                message: e.to_string(),
            })?;

        let mut dataset = Dataset::new();
        for quad in parser.for_reader(text.as_bytes()) {
            let quad = quad.map_err(|e| GraphError::Parse {
                format: format.display_name().to_string(),
                message: e.to_string(),
            })?;
            dataset.insert(&quad);
        }

        Ok(Self { dataset })
    }

    /// Number of distinct statements.
    pub fn len(&self) -> usize {
        self.dataset.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dataset.is_empty()
    }

    /// Add a statement to the default graph.
    pub fn insert(
        &mut self,
        subject: impl Into<Subject>,
        predicate: NamedNode,
        object: impl Into<Term>,
    ) -> bool {
        let quad = Quad::new(subject, predicate, object, GraphName::DefaultGraph);
        self.dataset.insert(&quad)
    }

    /// Serialize into the given format.
    ///
    /// Fails for triple-only formats when the graph holds named graphs.
    pub fn serialize(&self, format: GraphFormat) -> GraphResult<String> {
        let to_error = |e: std::io::Error| GraphError::Serialize {
            format: format.display_name().to_string(),
            message: e.to_string(),
        };

        let mut writer = RdfSerializer::from_format(format.rdf_format()).for_writer(Vec::new());
        for quad in self.dataset.iter() {
            writer.serialize_quad(quad).map_err(to_error)?;
        }
        let bytes = writer.finish().map_err(to_error)?;

        String::from_utf8(bytes).map_err(|e| GraphError::Serialize {
            format: format.display_name().to_string(),
            message: e.to_string(),
        })
    }
}

/// Build a named node, reporting invalid IRIs as a [`GraphError`].
pub fn named_node(iri: impl Into<String>) -> GraphResult<NamedNode> {
    let iri = iri.into();
    NamedNode::new(iri.clone()).map_err(|e| GraphError::InvalidIri {
        iri,
        message: e.to_string(),
    })
}

/// Build a plain string literal.
pub fn literal(value: impl Into<String>) -> Literal {
    Literal::new_simple_literal(value)
}
