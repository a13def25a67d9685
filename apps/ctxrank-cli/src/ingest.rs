//! Concurrent ingestion of files from disk.

use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::warn;

use ctxrank_core::data_processor::list_documents;
use ctxrank_core::traits::ChunkRepository;
use ctxrank_hybrid::HybridRetriever;

#[derive(Debug, Default)]
pub struct IngestReport {
    pub documents: usize,
    pub chunks: usize,
    pub failures: Vec<(PathBuf, String)>,
}

/// Expand directories into the documents they contain; plain files pass through.
pub fn collect_paths(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut out = Vec::new();
    for input in inputs {
        if input.is_dir() {
            out.extend(list_documents(input));
        } else {
            out.push(input.clone());
        }
    }
    out
}

fn document_name(path: &Path) -> String {
    path.file_name().map_or_else(|| path.to_string_lossy().to_string(), |n| n.to_string_lossy().to_string())
}

/// Read and ingest every path concurrently. One document failing does not
/// stop the others; failures are collected in the report.
pub async fn ingest_paths<R>(retriever: Arc<HybridRetriever<R>>, paths: Vec<PathBuf>, show_progress: bool) -> IngestReport
where
    R: ChunkRepository + 'static,
{
    let pb = if show_progress { ProgressBar::new(paths.len() as u64) } else { ProgressBar::hidden() };
    if let Ok(style) = ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} documents ({percent}%) {msg}") {
        pb.set_style(style.progress_chars("#>-"));
    }

    let mut set = JoinSet::new();
    for path in paths {
        let retriever = Arc::clone(&retriever);
        set.spawn(async move {
            let name = document_name(&path);
            let outcome = match tokio::fs::read(&path).await {
                Ok(bytes) => tokio::task::spawn_blocking(move || retriever.ingest_bytes(&name, &bytes))
                    .await
                    .map_err(|e| format!("ingest task failed: {e}"))
                    .and_then(|res| res.map_err(|e| e.to_string())),
                Err(e) => Err(format!("read failed: {e}")),
            };
            (path, outcome)
        });
    }

    let mut report = IngestReport::default();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((path, Ok(n))) => {
                report.documents += 1;
                report.chunks += n;
                pb.set_message(document_name(&path));
            }
            Ok((path, Err(reason))) => {
                warn!(path = %path.display(), %reason, "document skipped");
                report.failures.push((path, reason));
            }
            Err(e) => report.failures.push((PathBuf::new(), format!("ingest task failed: {e}"))),
        }
        pb.inc(1);
    }
    pb.finish_with_message("ingestion complete");
    report.failures.sort();
    report
}
