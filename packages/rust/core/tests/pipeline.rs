//! Directory pipeline runs over temporary document trees.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde_json::{Value, json};
use wiremock::matchers::path;
use wiremock::{Mock, MockServer, ResponseTemplate};

use docenrich_core::{
    Enricher, OutputFormat, ProcessProgress, ProcessSummary, SilentProgress, collect_documents,
    process_directory,
};
use docenrich_shared::{CancelHandle, CancelSignal, EnrichConfig, SourceDescriptor};

/// Temporary directory removed on drop.
struct TempDir(PathBuf);

impl TempDir {
    fn new() -> Self {
        let dir = std::env::temp_dir().join(format!("docenrich-test-{}", uuid::Uuid::now_v7()));
        fs::create_dir_all(&dir).unwrap();
        Self(dir)
    }

    fn write(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.0.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.0);
    }
}

fn docs_tree() -> TempDir {
    let tmp = TempDir::new();
    tmp.write("input/b-guide.md", "# Borrowing\n\nGrace Hopper explains borrowing rules.");
    tmp.write(
        "input/nested/tutorial.html",
        "<html><head><title>Async Tutorial</title></head><body><p>Alan Turing computes.</p></body></html>",
    );
    tmp.write("input/a-notes.txt", "plain notes about ownership");
    tmp.write("input/skip.pdf", "binary-ish");
    tmp.write("input/.hidden/secret.md", "# Hidden");
    tmp.write("input/.draft.md", "# Draft");
    tmp
}

#[derive(Default)]
struct RecordingProgress {
    total: Mutex<Option<usize>>,
    done: Mutex<Vec<(PathBuf, bool)>>,
    finished: Mutex<Option<ProcessSummary>>,
}

impl ProcessProgress for RecordingProgress {
    fn start(&self, total: usize) {
        *self.total.lock().unwrap() = Some(total);
    }
    fn document_done(&self, path: &Path, ok: bool) {
        self.done.lock().unwrap().push((path.to_path_buf(), ok));
    }
    fn finish(&self, summary: &ProcessSummary) {
        *self.finished.lock().unwrap() = Some(summary.clone());
    }
}

#[test]
fn walk_is_sorted_and_skips_hidden_and_unsupported() {
    let tmp = docs_tree();
    let input = tmp.0.join("input");
    let found = collect_documents(&input, &EnrichConfig::default().pipeline.supported_extensions)
        .expect("walk");

    let relative: Vec<PathBuf> = found
        .iter()
        .map(|p| p.strip_prefix(&input).unwrap().to_path_buf())
        .collect();
    assert_eq!(
        relative,
        vec![
            PathBuf::from("a-notes.txt"),
            PathBuf::from("b-guide.md"),
            PathBuf::from("nested/tutorial.html"),
        ]
    );
}

#[tokio::test]
async fn writes_json_array_in_walk_order() {
    let tmp = docs_tree();
    let output = tmp.0.join("out/records.json");
    let enricher = Enricher::new(EnrichConfig::default()).expect("enricher");
    let progress = RecordingProgress::default();

    let summary = process_directory(
        &tmp.0.join("input"),
        &output,
        OutputFormat::Json,
        &enricher,
        &CancelSignal::never(),
        &progress,
    )
    .await
    .expect("run");

    assert_eq!(summary.documents, 3);
    assert_eq!(summary.enriched, 3);
    assert_eq!(summary.failed, 0);
    assert_eq!(*progress.total.lock().unwrap(), Some(3));
    assert_eq!(progress.done.lock().unwrap().len(), 3);
    assert_eq!(progress.finished.lock().unwrap().as_ref(), Some(&summary));

    let records: Vec<Value> = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(records.len(), 3);
    assert!(records[0]["metadata"]["file_path"].as_str().unwrap().ends_with("a-notes.txt"));
    assert_eq!(records[1]["metadata"]["title"], "Borrowing");
    assert_eq!(records[1]["context"]["named_entities"], json!(["Grace Hopper"]));
    assert!(records[1]["external_data"]["Grace Hopper"].is_object());
    assert_eq!(records[2]["metadata"]["title"], "Async Tutorial");
    assert_eq!(records[2]["metadata"]["content_type"], "Tutorial");
    assert!(records[2]["internal_data"]["Alan Turing"].is_object());
}

#[tokio::test]
async fn writes_json_lines_and_skips_unreadable_documents() {
    let tmp = docs_tree();
    fs::write(tmp.0.join("input/broken.md"), [0xff, 0xfe, 0x00]).unwrap();
    let output = tmp.0.join("records.jsonl");
    let enricher = Enricher::new(EnrichConfig::default()).expect("enricher");

    let summary = process_directory(
        &tmp.0.join("input"),
        &output,
        OutputFormat::Jsonl,
        &enricher,
        &CancelSignal::never(),
        &SilentProgress,
    )
    .await
    .expect("run");

    assert_eq!(summary.documents, 4);
    assert_eq!(summary.enriched, 3);
    assert_eq!(summary.failed, 1);

    let content = fs::read_to_string(&output).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 3);
    for line in lines {
        let record: Value = serde_json::from_str(line).expect("one record per line");
        assert!(record["metadata"].is_object());
    }
}

#[tokio::test]
async fn sources_are_shared_across_documents_through_the_cache() {
    let server = MockServer::start().await;
    Mock::given(path("/glossary"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"glossary": "v1"})))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = EnrichConfig::default();
    config.pipeline.document_concurrency = 1;
    config
        .internal_data_sources
        .api_calls
        .push(SourceDescriptor::new("generic").with_url(format!("{}/glossary", server.uri())));

    let tmp = docs_tree();
    let output = tmp.0.join("records.json");
    let enricher = Enricher::new(config).expect("enricher");

    let summary = process_directory(
        &tmp.0.join("input"),
        &output,
        OutputFormat::Json,
        &enricher,
        &CancelSignal::never(),
        &SilentProgress,
    )
    .await
    .expect("run");

    assert_eq!(summary.enriched, 3);
    assert_eq!(summary.cache_misses, 1);
    assert_eq!(summary.cache_hits, 2);

    let records: Vec<Value> = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    for record in &records {
        assert_eq!(record["internal_data"]["glossary"], "v1");
        assert!(record["external_data"].get("glossary").is_none());
    }
}

#[tokio::test]
async fn cancelled_run_skips_documents_but_still_writes_output() {
    let (handle, signal): (CancelHandle, CancelSignal) = CancelSignal::pair();
    handle.cancel();

    let tmp = docs_tree();
    let output = tmp.0.join("records.json");
    let enricher = Enricher::new(EnrichConfig::default()).expect("enricher");

    let summary = process_directory(
        &tmp.0.join("input"),
        &output,
        OutputFormat::Json,
        &enricher,
        &signal,
        &SilentProgress,
    )
    .await
    .expect("run");

    assert_eq!(summary.documents, 3);
    assert_eq!(summary.failed, 3);
    let records: Vec<Value> = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    assert!(records.is_empty());
}

#[tokio::test]
async fn missing_input_directory_is_an_error() {
    let tmp = TempDir::new();
    let enricher = Enricher::new(EnrichConfig::default()).expect("enricher");
    let result = process_directory(
        &tmp.0.join("does-not-exist"),
        &tmp.0.join("out.json"),
        OutputFormat::Json,
        &enricher,
        &CancelSignal::never(),
        &SilentProgress,
    )
    .await;
    assert!(result.is_err());
}
