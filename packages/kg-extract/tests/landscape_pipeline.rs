//! End-to-end pipeline tests with deterministic stubs for the model and the
//! scraping service.

use std::time::Duration;

use kg_extract::ingestors::MockFetcher;
use kg_extract::testing::{union_lines, MockCompletion};
use kg_extract::{
    crawl_pages, write_outputs, GraphFormat, GraphStats, IncrementalMerger, Page,
    PipelineConfig, RdfGraph, SchemaInstancePipeline,
};

const DOMAIN: &str = "AI Writing Tools";

fn tool_pages() -> Vec<Page> {
    vec![
        Page::new("https://grammarly.com", "Grammarly checks grammar and tone.")
            .with_metadata("title", "Grammarly"),
        Page::new("https://jasper.ai", "Jasper writes marketing copy."),
        Page::new("https://copy.ai", "Copy.ai automates sales workflows."),
        Page::new("https://writesonic.com", "Writesonic writes SEO articles."),
        Page::new("https://rytr.me", "Rytr is a budget writing assistant."),
    ]
}

/// Per-page graph: one statement naming the page.
fn page_rdf(url: &str) -> String {
    let slug = kg_extract::slugify(url);
    format!(":{} :source <{}> .", slug, url)
}

fn merge_stub() -> MockCompletion {
    MockCompletion::new()
        .with_output_fn("ExtractPageRdf", "rdf", |req| page_rdf(req.get("url").unwrap_or_default()))
        .with_fixed(
            "InitialSchemaInference",
            "schema_rdf",
            "@prefix : <http://example.org/ai-writing-tools#> .",
        )
        .with_output_fn("IncrementalRdfMerge", "merged_rdf", |req| {
            union_lines(
                req.get("canonical_rdf").unwrap_or_default(),
                req.get("new_page_rdf").unwrap_or_default(),
            )
        })
}

#[tokio::test]
async fn merge_equals_sequential_fold() {
    let ai = merge_stub();
    let pages = tool_pages();
    let merger = IncrementalMerger::new(ai.clone(), PipelineConfig::default());

    let outcome = merger.build(DOMAIN, &pages).await.unwrap();

    let expected = pages.iter().fold(
        "@prefix : <http://example.org/ai-writing-tools#> .".to_string(),
        |acc, page| union_lines(&acc, &page_rdf(&page.url)),
    );
    assert_eq!(outcome.canonical.as_str(), expected);
    assert_eq!(outcome.pages_processed, 5);

    let merged_urls: Vec<String> = ai
        .calls_for("IncrementalRdfMerge")
        .iter()
        .map(|c| c.input("source_url").unwrap().to_string())
        .collect();
    let input_urls: Vec<String> = pages.iter().map(|p| p.url.clone()).collect();
    assert_eq!(merged_urls, input_urls);
}

#[tokio::test]
async fn reordering_pages_changes_the_fold() {
    let mut pages = tool_pages();
    let merger = IncrementalMerger::new(merge_stub(), PipelineConfig::default());
    let forward = merger.build(DOMAIN, &pages).await.unwrap();

    pages.reverse();
    let backward = merger.build(DOMAIN, &pages).await.unwrap();

    assert_ne!(forward.canonical, backward.canonical);
}

#[tokio::test]
async fn landscape_graph_reports_triples() {
    let merger = IncrementalMerger::new(merge_stub(), PipelineConfig::default());
    let pages = tool_pages();

    let graph = kg_extract::build_landscape_graph(&merger, DOMAIN, &pages, GraphFormat::NTriples)
        .await
        .unwrap();

    assert_eq!(
        graph.stats,
        GraphStats::Parsed {
            total_triples: 5,
            pages_processed: 5
        }
    );
    assert_eq!(graph.canonical_graph.lines().count(), 5);
}

#[tokio::test]
async fn one_fetch_failure_does_not_stop_the_run() {
    let pages = tool_pages();
    let fetcher = MockFetcher::new()
        .with_pages(pages.clone())
        .fail_url("https://copy.ai");
    let urls: Vec<String> = pages.iter().map(|p| p.url.clone()).collect();

    let report = crawl_pages(&fetcher, &urls, Duration::from_secs(5)).await;
    assert_eq!(report.pages.len(), urls.len() - 1);
    assert_eq!(report.failures[0].url, "https://copy.ai");

    let merger = IncrementalMerger::new(merge_stub(), PipelineConfig::default());
    let outcome = merger.build(DOMAIN, &report.pages).await.unwrap();
    assert_eq!(outcome.pages_processed, urls.len() - 1);
    assert!(!outcome.canonical.as_str().contains("copy_ai"));
}

fn schema_stub() -> MockCompletion {
    MockCompletion::new()
        .with_fixed(
            "ExtractCommonSchema",
            "schema_rdf",
            "@prefix : <http://example.org/ai-writing-tools#> .\n\
             @prefix owl: <http://www.w3.org/2002/07/owl#> .\n\
             :AIWritingTool a owl:Class .",
        )
        .with_output_fn("ExtractInstanceData", "instance_rdf", |req| {
            let url = req.get("page_url").unwrap_or_default();
            format!(
                "@prefix : <http://example.org/ai-writing-tools#> .\n\
                 @prefix prov: <http://www.w3.org/ns/prov#> .\n\
                 :{} a :AIWritingTool ;\n    prov:wasDerivedFrom <{}> .",
                kg_extract::slugify(url),
                url
            )
        })
}

#[tokio::test]
async fn schema_pipeline_writes_expected_files() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("output");
    let pages: Vec<Page> = tool_pages().into_iter().take(3).collect();

    let pipeline = SchemaInstancePipeline::new(schema_stub(), PipelineConfig::default());
    let result = pipeline.run(DOMAIN, &pages).await.unwrap();
    let paths = write_outputs(&out, DOMAIN, &result).unwrap();

    let mut names: Vec<String> = std::fs::read_dir(&out)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(
        names,
        vec![
            "ai-writing-tools-all-instances.ttl",
            "ai-writing-tools-schema.ttl",
            "copy_ai.ttl",
            "grammarly_com.ttl",
            "jasper_ai.ttl",
        ]
    );

    let merged = std::fs::read_to_string(&paths.merged).unwrap();
    assert_eq!(merged.matches("owl:imports").count(), 1);
    let prefix_lines: Vec<&str> = merged.lines().filter(|l| l.starts_with("@prefix")).collect();
    let mut unique = prefix_lines.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), prefix_lines.len());

    // 3 instances x 2 statements + the import
    assert_eq!(RdfGraph::parse(&merged, GraphFormat::Turtle).unwrap().len(), 7);

    for instance in &paths.instances {
        assert_eq!(instance.triples, Ok(3));
        let text = std::fs::read_to_string(&instance.path).unwrap();
        assert!(text.contains("<> owl:imports <./ai-writing-tools-schema.ttl> ."));
    }
}

#[tokio::test]
async fn instance_results_independent_of_concurrency() {
    let pages = tool_pages();
    // later pages answer first
    let stub = || {
        schema_stub().with_delay("ExtractInstanceData", |req| {
            let url = req.get("page_url").unwrap_or_default();
            Duration::from_millis(if url.contains("grammarly") { 60 } else { 5 })
        })
    };

    let sequential = SchemaInstancePipeline::new(stub(), PipelineConfig::default().with_concurrency(1))
        .run(DOMAIN, &pages)
        .await
        .unwrap();
    let parallel = SchemaInstancePipeline::new(stub(), PipelineConfig::default().with_concurrency(4))
        .run(DOMAIN, &pages)
        .await
        .unwrap();

    assert_eq!(sequential.instances, parallel.instances);
    let urls: Vec<&str> = parallel.instances.keys().map(String::as_str).collect();
    let expected: Vec<&str> = pages.iter().map(|p| p.url.as_str()).collect();
    assert_eq!(urls, expected);
}
