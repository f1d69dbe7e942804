//! Directory pipeline: walk → read → enrich → write JSON or JSON Lines.

use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use tracing::{info, instrument, warn};

use docenrich_extract::read_document;
use docenrich_shared::{CancelSignal, EnrichError, EnrichedRecord, Result};

use crate::orchestrator::Enricher;

/// Serialization of the output file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// One pretty-printed JSON array.
    #[default]
    Json,
    /// One compact record per line.
    Jsonl,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Json => "json",
            Self::Jsonl => "jsonl",
        })
    }
}

impl FromStr for OutputFormat {
    type Err = EnrichError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "jsonl" | "ndjson" => Ok(Self::Jsonl),
            other => Err(EnrichError::config(format!("unknown output format: {other}"))),
        }
    }
}

/// Outcome of a [`process_directory`] run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessSummary {
    /// Supported files found under the input directory.
    pub documents: usize,
    /// Records written.
    pub enriched: usize,
    /// Documents skipped because they could not be read or extracted.
    pub failed: usize,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub elapsed: Duration,
}

/// Progress callback for directory runs.
pub trait ProcessProgress: Send + Sync {
    /// Called once the walk has found `total` documents.
    fn start(&self, total: usize);
    /// Called after each document, successful or not.
    fn document_done(&self, path: &Path, ok: bool);
    /// Called after the output is written.
    fn finish(&self, summary: &ProcessSummary);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProcessProgress for SilentProgress {
    fn start(&self, _total: usize) {}
    fn document_done(&self, _path: &Path, _ok: bool) {}
    fn finish(&self, _summary: &ProcessSummary) {}
}

/// Supported documents under `dir`, recursively, in sorted order.
/// Hidden files and directories are skipped.
pub fn collect_documents(dir: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    walk(dir, extensions, &mut found)?;
    Ok(found)
}

fn walk(dir: &Path, extensions: &[String], found: &mut Vec<PathBuf>) -> Result<()> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(|e| EnrichError::io(dir, e))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<_>>()
        .map_err(|e| EnrichError::io(dir, e))?;
    entries.sort();

    for path in entries {
        let hidden = path
            .file_name()
            .is_some_and(|n| n.to_string_lossy().starts_with('.'));
        if hidden {
            continue;
        }
        if path.is_dir() {
            walk(&path, extensions, found)?;
        } else if has_supported_extension(&path, extensions) {
            found.push(path);
        }
    }
    Ok(())
}

fn has_supported_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension().is_some_and(|ext| {
        let ext = ext.to_string_lossy();
        extensions
            .iter()
            .any(|wanted| wanted.trim_start_matches('.').eq_ignore_ascii_case(&ext))
    })
}

/// Enrich every supported document under `input_dir` and write the records
/// to `output`.
///
/// Documents are processed with bounded concurrency and written in walk
/// order. A document that cannot be read or extracted is logged and
/// skipped; the run itself fails only on walk or write errors.
#[instrument(skip_all, fields(input = %input_dir.display(), output = %output.display(), %format))]
pub async fn process_directory(
    input_dir: &Path,
    output: &Path,
    format: OutputFormat,
    enricher: &Enricher,
    cancel: &CancelSignal,
    progress: &dyn ProcessProgress,
) -> Result<ProcessSummary> {
    let start = Instant::now();
    let pipeline = &enricher.aggregator().config().pipeline;

    let paths = collect_documents(input_dir, &pipeline.supported_extensions)?;
    info!(documents = paths.len(), "starting directory run");
    progress.start(paths.len());

    let results: Vec<(PathBuf, Result<EnrichedRecord>)> = stream::iter(paths)
        .map(|path| async move {
            let result = enrich_file(enricher, &path, cancel).await;
            progress.document_done(&path, result.is_ok());
            (path, result)
        })
        .buffered(pipeline.document_concurrency.max(1))
        .collect()
        .await;

    let mut summary = ProcessSummary {
        documents: results.len(),
        ..Default::default()
    };
    let mut records = Vec::with_capacity(results.len());
    for (path, result) in results {
        match result {
            Ok(record) => records.push(record),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping document");
                summary.failed += 1;
            }
        }
    }

    write_records(output, format, &records)?;

    let stats = enricher.cache_stats();
    summary.enriched = records.len();
    summary.cache_hits = stats.hits;
    summary.cache_misses = stats.misses;
    summary.elapsed = start.elapsed();

    info!(
        enriched = summary.enriched,
        failed = summary.failed,
        cache_hits = summary.cache_hits,
        elapsed_ms = summary.elapsed.as_millis() as u64,
        "directory run complete"
    );
    progress.finish(&summary);
    Ok(summary)
}

async fn enrich_file(enricher: &Enricher, path: &Path, cancel: &CancelSignal) -> Result<EnrichedRecord> {
    if cancel.is_cancelled() {
        return Err(EnrichError::Cancelled(format!("{} not started", path.display())));
    }
    let text = read_document(path)?;
    enricher.enrich(path, &text, cancel).await
}

/// Write `records` as a JSON array or JSON Lines, creating parent directories.
pub fn write_records(output: &Path, format: OutputFormat, records: &[EnrichedRecord]) -> Result<()> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| EnrichError::io(parent, e))?;
    }

    let file = File::create(output).map_err(|e| EnrichError::io(output, e))?;
    let mut writer = BufWriter::new(file);

    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut writer, records)
                .map_err(|e| EnrichError::io(output, e.into()))?;
            writeln!(writer).map_err(|e| EnrichError::io(output, e))?;
        }
        OutputFormat::Jsonl => {
            for record in records {
                serde_json::to_writer(&mut writer, record)
                    .map_err(|e| EnrichError::io(output, e.into()))?;
                writeln!(writer).map_err(|e| EnrichError::io(output, e))?;
            }
        }
    }

    writer.flush().map_err(|e| EnrichError::io(output, e))
}
