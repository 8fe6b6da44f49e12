//! Triple type - structured subject/predicate/object records.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A factual statement extracted by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Triple {
    /// The entity the statement is about
    pub subject: String,

    /// The relationship or property
    pub predicate: String,

    /// The related entity or value
    pub object: String,
}

impl Triple {
    pub fn new(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
        }
    }

    /// Objects containing whitespace are treated as literal values rather
    /// than references to other nodes.
    pub fn object_is_literal(&self) -> bool {
        self.object.chars().any(char::is_whitespace)
    }
}

/// The triples payload the model is asked to return.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TripleList {
    pub triples: Vec<Triple>,
}
