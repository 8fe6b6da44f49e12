//! LLM prompts for the graph pipelines.
//!
//! Each prompt declares its named inputs and outputs; the completion service
//! is responsible for turning the declaration into provider-specific
//! messages.

use crate::pipeline::triples::triples_response_schema;
use crate::traits::completion::{FieldSpec, Prompt};

/// Single-pass extraction of a theme-contextualised Turtle graph.
pub static DIRECT_RDF_EXTRACTION: Prompt = Prompt {
    name: "DirectRdfExtraction",
    instructions: "Extract a knowledge graph from text as RDF Turtle format, contextualized by theme.",
    inputs: &[
        FieldSpec::new("theme", "The theme to contextualize extraction"),
        FieldSpec::new("text", "The text passage to analyze"),
    ],
    outputs: &[FieldSpec::new(
        "rdf_turtle",
        "Complete RDF graph in Turtle format with prefixes, entities as subjects with rdf:type \
         and rdfs:label, relationships as predicates, and properties as predicates with literal values",
    )],
    chain_of_thought: true,
    response_schema: None,
};

/// Single-pass extraction in a caller-chosen serialization.
pub static FORMAT_RDF_EXTRACTION: Prompt = Prompt {
    name: "FormatRdfExtraction",
    instructions: "Extract a knowledge graph from text, contextualized by theme, and serialize it \
                   in the requested RDF format.",
    inputs: &[
        FieldSpec::new("theme", "The theme to contextualize extraction"),
        FieldSpec::new("text", "The text passage to analyze"),
        FieldSpec::new("format", "The RDF serialization to produce (e.g. N-Triples with full IRIs)"),
    ],
    outputs: &[FieldSpec::new(
        "rdf_output",
        "The complete graph in the requested format, with entities, relationships and literal \
         properties relevant to the theme",
    )],
    chain_of_thought: true,
    response_schema: None,
};

/// Structured triple extraction (graph built locally from the triples).
pub static EXTRACT_TRIPLES: Prompt = Prompt {
    name: "ExtractTriples",
    instructions: "You are an expert ontologist. Your task is to extract factual triples \
                   (subject, predicate, object) from the given text that are relevant to the \
                   provided theme. Do not add commentary.",
    inputs: &[
        FieldSpec::new("theme", "The theme the triples must be relevant to"),
        FieldSpec::new("text", "The text to extract from"),
    ],
    outputs: &[FieldSpec::new(
        "triples",
        "JSON array of objects with string fields `subject`, `predicate` and `object`",
    )],
    chain_of_thought: false,
    response_schema: Some(triples_response_schema),
};

/// Graph extraction for one crawled page.
pub static EXTRACT_PAGE_RDF: Prompt = Prompt {
    name: "ExtractPageRdf",
    instructions: "Extract RDF from webpage content.",
    inputs: &[
        FieldSpec::new("domain", "The domain/landscape being analyzed"),
        FieldSpec::new("text", "The webpage content including metadata"),
        FieldSpec::new("url", "The URL of the webpage"),
    ],
    outputs: &[FieldSpec::new(
        "rdf",
        "RDF in Turtle format with entities, relationships, and properties relevant to the \
         domain. Include source URL as provenance and incorporate any relevant metadata.",
    )],
    chain_of_thought: true,
    response_schema: None,
};

/// Schema inference over the first few page graphs.
pub static INFER_SCHEMA: Prompt = Prompt {
    name: "InitialSchemaInference",
    instructions: "Infer initial schema/ontology from the first few pages.",
    inputs: &[
        FieldSpec::new("domain", "The domain/landscape being analyzed"),
        FieldSpec::new("sample_pages", "RDF from first few pages to identify patterns"),
    ],
    outputs: &[FieldSpec::new(
        "schema_rdf",
        "RDF Schema/OWL ontology in Turtle format with:\n\
         - Common classes and their hierarchy\n\
         - Properties with domains and ranges\n\
         - Canonical naming conventions\n\
         - Common equivalence patterns for the domain",
    )],
    chain_of_thought: true,
    response_schema: None,
};

/// Fold one page graph into the canonical graph.
pub static INCREMENTAL_MERGE: Prompt = Prompt {
    name: "IncrementalRdfMerge",
    instructions: "Merge new RDF content into an existing canonical graph, handling alignment \
                   and conflicts.",
    inputs: &[
        FieldSpec::new(
            "canonical_rdf",
            "Current canonical RDF graph in Turtle format (empty string if first page)",
        ),
        FieldSpec::new("new_page_rdf", "RDF extracted from a new webpage in Turtle format"),
        FieldSpec::new("source_url", "URL of the new page for provenance"),
        FieldSpec::new("domain", "Domain context to guide alignment decisions"),
    ],
    outputs: &[FieldSpec::new(
        "merged_rdf",
        "Updated canonical RDF in Turtle format that:\n\
         - Integrates new information from the page\n\
         - Identifies and merges equivalent entities (using owl:sameAs)\n\
         - Resolves naming variations to canonical forms\n\
         - Preserves provenance with prov:wasDerivedFrom\n\
         - Resolves conflicts by keeping the most specific/detailed information\n\
         - Maintains a clean ontology structure",
    )],
    chain_of_thought: true,
    response_schema: None,
};

/// Minimal merge used by the simple accumulator.
pub static SIMPLE_MERGE: Prompt = Prompt {
    name: "SimpleMergeRdf",
    instructions: "Merge new RDF into existing graph.",
    inputs: &[
        FieldSpec::new("current_graph", "The graph accumulated so far"),
        FieldSpec::new("new_content", "RDF extracted from the next page"),
        FieldSpec::new("domain", "The domain being analyzed"),
    ],
    outputs: &[FieldSpec::new(
        "merged_graph",
        "Merge new RDF into current graph, aligning entities and resolving conflicts intelligently",
    )],
    chain_of_thought: true,
    response_schema: None,
};

/// Shared schema for the schema/instance split.
pub static EXTRACT_COMMON_SCHEMA: Prompt = Prompt {
    name: "ExtractCommonSchema",
    instructions: "Extract a common RDF/OWL schema from multiple webpage contents.",
    inputs: &[
        FieldSpec::new("domain", "The domain/landscape being analyzed"),
        FieldSpec::new("pages_content", "Content from multiple webpages in the domain"),
    ],
    outputs: &[FieldSpec::new(
        "schema_rdf",
        "RDF/OWL schema in Turtle format defining:\n\
         - Common classes (e.g., :Product, :Feature, :PricingPlan, :Company)\n\
         - Properties with domains and ranges (e.g., :hasFeature, :monthlyPrice, :offers)\n\
         - Proper class hierarchy (no circular or nonsensical subclass relationships)\n\
         - Required prefixes: the domain namespace as the empty prefix, plus rdfs:, rdf:, xsd: and owl:\n\
         - Focus on properties that are common across all entities in the landscape\n\
         - Do NOT include instance data, only the schema/ontology\n\
         - Make sure classes form a sensible hierarchy",
    )],
    chain_of_thought: true,
    response_schema: None,
};

/// Per-page instance data constrained by the shared schema.
pub static EXTRACT_INSTANCES: Prompt = Prompt {
    name: "ExtractInstanceData",
    instructions: "Extract instance data from a webpage using a predefined schema.",
    inputs: &[
        FieldSpec::new("schema_rdf", "The RDF/OWL schema to follow"),
        FieldSpec::new("domain", "The domain context"),
        FieldSpec::new("page_content", "The webpage content to extract from"),
        FieldSpec::new("page_url", "The URL of the webpage"),
    ],
    outputs: &[FieldSpec::new(
        "instance_rdf",
        "RDF instance data in Turtle format that:\n\
         - Strictly follows the provided schema's classes and properties\n\
         - Creates instances of the schema classes\n\
         - Uses the schema's properties correctly\n\
         - Includes prov:wasDerivedFrom for provenance\n\
         - Uses meaningful URIs for instances",
    )],
    chain_of_thought: true,
    response_schema: None,
};

/// All prompts, for listing and tests.
pub fn all_prompts() -> [&'static Prompt; 9] {
    [
        &DIRECT_RDF_EXTRACTION,
        &FORMAT_RDF_EXTRACTION,
        &EXTRACT_TRIPLES,
        &EXTRACT_PAGE_RDF,
        &INFER_SCHEMA,
        &INCREMENTAL_MERGE,
        &SIMPLE_MERGE,
        &EXTRACT_COMMON_SCHEMA,
        &EXTRACT_INSTANCES,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_prompt_names_unique() {
        let names: HashSet<&str> = all_prompts().iter().map(|p| p.name).collect();
        assert_eq!(names.len(), all_prompts().len());
    }

    #[test]
    fn test_every_prompt_has_one_output() {
        for prompt in all_prompts() {
            assert_eq!(prompt.outputs.len(), 1, "{}", prompt.name);
            assert!(!prompt.inputs.is_empty(), "{}", prompt.name);
        }
    }

    #[test]
    fn test_only_triples_prompt_is_structured() {
        let structured: Vec<&str> = all_prompts()
            .iter()
            .filter(|p| p.response_schema.is_some())
            .map(|p| p.name)
            .collect();
        assert_eq!(structured, vec!["ExtractTriples"]);
    }

    #[test]
    fn test_merge_inputs_in_call_order() {
        let names: Vec<&str> = INCREMENTAL_MERGE.inputs.iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["canonical_rdf", "new_page_rdf", "source_url", "domain"]);
    }
}
