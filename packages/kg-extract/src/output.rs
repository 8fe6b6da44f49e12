//! Filesystem output for the schema/instance split.
//!
//! Layout under the output directory, for domain "AI Writing Tools":
//!
//! ```text
//! ai-writing-tools-schema.ttl          the shared schema
//! jasper_ai.ttl, copy_ai.ttl, ...      one file per page, importing the schema
//! ai-writing-tools-all-instances.ttl   every instance, one prefix block, one import
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tracing::{info, warn};

use crate::error::{ExtractionError, GraphError, Result};
use crate::graph::{GraphFormat, RdfGraph};
use crate::pipeline::schema_split::SchemaInstanceResult;
use crate::pipeline::strip_code_fence;
use crate::slug::{file_name_for_url, file_stem_for_domain};
use crate::types::fragment::{is_declaration, prefix_name, Fragment};

const STANDARD_PREFIXES: [(&str, &str); 5] = [
    ("rdfs", "http://www.w3.org/2000/01/rdf-schema#"),
    ("rdf", "http://www.w3.org/1999/02/22-rdf-syntax-ns#"),
    ("xsd", "http://www.w3.org/2001/XMLSchema#"),
    ("prov", "http://www.w3.org/ns/prov#"),
    ("owl", "http://www.w3.org/2002/07/owl#"),
];

const OWL: &str = "http://www.w3.org/2002/07/owl#";

/// Namespace bound to the empty prefix for a domain.
pub fn namespace_for(domain: &str) -> String {
    format!("http://example.org/{}#", file_stem_for_domain(domain))
}

/// One written instance file.
#[derive(Debug, Clone)]
pub struct InstanceFile {
    pub url: String,
    pub path: PathBuf,

    /// Triples in the written file, or why it did not parse
    pub triples: std::result::Result<usize, GraphError>,
}

/// Paths written by [`write_outputs`].
#[derive(Debug, Clone)]
pub struct OutputPaths {
    pub schema: PathBuf,
    pub instances: Vec<InstanceFile>,
    pub merged: PathBuf,
}

/// Prefix declarations keyed by prefix name; the first declaration wins.
#[derive(Debug, Default)]
struct PrefixBlock {
    lines: IndexMap<String, String>,
}

impl PrefixBlock {
    fn declare(&mut self, name: &str, iri: &str) {
        self.lines
            .entry(name.to_string())
            .or_insert_with(|| format!("@prefix {}: <{}> .", name, iri));
    }

    fn absorb(&mut self, fragment: &Fragment) {
        for line in fragment.as_str().lines() {
            if let Some(name) = prefix_name(line) {
                self.lines
                    .entry(name.to_string())
                    .or_insert_with(|| line.trim().to_string());
            }
        }
    }

    fn render(&self) -> String {
        self.lines.values().map(|l| format!("{}\n", l)).collect()
    }
}

fn import_line(schema_file: &str) -> String {
    format!("<> owl:imports <./{}> .\n", schema_file)
}

/// Fragment lines other than declarations and statements about the
/// document itself.
///
/// A statement with subject `<>` (ontology header, `owl:imports`) runs until
/// the line that ends it with `.`; all of its lines are dropped so the
/// single import written by the caller is the only one.
fn body(fragment: &Fragment) -> String {
    let mut out = String::new();
    let mut in_document_statement = false;

    for line in fragment.as_str().lines() {
        let trimmed = line.trim();
        if !in_document_statement && trimmed.starts_with("<>") {
            in_document_statement = true;
        }
        if in_document_statement {
            if trimmed.ends_with('.') {
                in_document_statement = false;
            }
            continue;
        }
        if !is_declaration(line) {
            out.push_str(line);
            out.push('\n');
        }
    }
    out
}

fn clean(fragment: &Fragment) -> Fragment {
    Fragment::new(strip_code_fence(fragment.as_str()))
}

/// Contents of one instance file.
pub fn instance_document(fragment: &Fragment, schema_file: &str, namespace: &str) -> String {
    let fragment = clean(fragment);
    let mut prefixes = PrefixBlock::default();
    prefixes.absorb(&fragment);
    prefixes.declare("", namespace);
    prefixes.declare("owl", OWL);

    format!(
        "{}\n# This instance file imports the schema\n{}\n# Instance data that conforms to the imported schema\n{}",
        prefixes.render(),
        import_line(schema_file),
        body(&fragment)
    )
}

/// Contents of the merged instances file.
pub fn merged_document<'a>(
    instances: impl IntoIterator<Item = (&'a String, &'a Fragment)>,
    schema_file: &str,
    namespace: &str,
) -> String {
    let cleaned: Vec<(&String, Fragment)> = instances
        .into_iter()
        .map(|(url, fragment)| (url, clean(fragment)))
        .collect();

    let mut prefixes = PrefixBlock::default();
    prefixes.declare("", namespace);
    for (name, iri) in STANDARD_PREFIXES {
        prefixes.declare(name, iri);
    }
    for (_, fragment) in &cleaned {
        prefixes.absorb(fragment);
    }

    let mut out = prefixes.render();
    out.push_str("\n# This file imports the schema\n");
    out.push_str(&import_line(schema_file));
    out.push_str("\n### All Instance Data ###\n");
    for (url, fragment) in &cleaned {
        out.push_str(&format!("\n### From {} ###\n", url));
        out.push_str(&body(fragment));
    }
    out
}

fn write(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).map_err(|source| ExtractionError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Write the schema, instance and merged files for a run.
///
/// Creates `dir` if needed. Instance files whose text does not parse are
/// still written; their parse error is reported in the returned paths.
pub fn write_outputs(dir: &Path, domain: &str, result: &SchemaInstanceResult) -> Result<OutputPaths> {
    fs::create_dir_all(dir).map_err(|source| ExtractionError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let stem = file_stem_for_domain(domain);
    let namespace = namespace_for(domain);
    let schema_file = format!("{}-schema.ttl", stem);

    let schema_path = dir.join(&schema_file);
    write(&schema_path, &strip_code_fence(result.schema.as_str()))?;
    info!(path = %schema_path.display(), "Schema saved");

    let mut instances = Vec::with_capacity(result.instances.len());
    for (url, fragment) in &result.instances {
        let path = dir.join(file_name_for_url(url));
        let document = instance_document(fragment, &schema_file, &namespace);
        write(&path, &document)?;

        let triples = RdfGraph::parse(&document, GraphFormat::Turtle).map(|g| g.len());
        match &triples {
            Ok(count) => info!(url = %url, path = %path.display(), triples = count, "Instance saved"),
            Err(e) => warn!(url = %url, path = %path.display(), error = %e, "Instance saved but does not parse"),
        }

        instances.push(InstanceFile {
            url: url.clone(),
            path,
            triples,
        });
    }

    let merged_path = dir.join(format!("{}-all-instances.ttl", stem));
    write(
        &merged_path,
        &merged_document(result.instances.iter(), &schema_file, &namespace),
    )?;
    info!(path = %merged_path.display(), "Merged instances saved");

    Ok(OutputPaths {
        schema: schema_path,
        instances,
        merged: merged_path,
    })
}
