// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Batch export: render many independent files through a fixed-size
//! worker pool.
//!
//! Workers pull from a shared queue, so concurrency never exceeds the
//! configured limit regardless of how many files are queued. Remote
//! renders still pass through the shared rate limiter. There is no
//! ordering requirement between files; every outcome, success or
//! failure, is aggregated before completion is reported, and one file's
//! failure never aborts the rest of the batch.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use crate::backends::BackendRegistry;
use crate::cache::RenderCache;
use crate::classify::Classifier;
use crate::engine::{render_source, SessionContext};
use crate::observability::messages::engine::{BatchCompleted, BatchStarted};
use crate::observability::messages::StructuredLog;
use crate::render::{artifact_path, DiagramSource, OutputFormat, RenderResult, Theme};

/// What happened to one file of the batch.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FileOutcome {
    pub source: PathBuf,
    /// Where the rendered artifact was written, on success.
    pub artifact: Option<PathBuf>,
    pub error: Option<String>,
}

impl FileOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }

    fn failure(source: PathBuf, error: String) -> Self {
        Self {
            source,
            artifact: None,
            error: Some(error),
        }
    }
}

/// Aggregated result of a batch run.
#[derive(Debug, Clone, serde::Serialize)]
pub struct BatchReport {
    pub outcomes: Vec<FileOutcome>,
    pub duration: Duration,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.succeeded()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed() == 0
    }
}

pub struct BatchExporter {
    classifier: Classifier,
    registry: Arc<BackendRegistry>,
    cache: Arc<Mutex<RenderCache>>,
    concurrency: usize,
}

impl BatchExporter {
    pub fn new(context: &SessionContext) -> Self {
        Self {
            classifier: Classifier::from_config(&context.config),
            registry: Arc::clone(&context.registry),
            cache: Arc::clone(&context.cache),
            concurrency: context.config.batch_concurrency,
        }
    }

    /// Render every file, writing artifacts into `out_dir` when given and
    /// beside each source otherwise.
    pub async fn export(&self, files: Vec<PathBuf>, out_dir: Option<PathBuf>) -> BatchReport {
        let started = Instant::now();
        BatchStarted {
            file_count: files.len(),
            concurrency: self.concurrency,
        }
        .log();

        if let Some(dir) = &out_dir {
            if let Err(e) = tokio::fs::create_dir_all(dir).await {
                // Nothing can be written; every file fails the same way.
                let outcomes = files
                    .into_iter()
                    .map(|source| {
                        FileOutcome::failure(
                            source,
                            format!("could not create output directory '{}': {}", dir.display(), e),
                        )
                    })
                    .collect();
                return self.finish(outcomes, started);
            }
        }

        let queue = Arc::new(Mutex::new(VecDeque::from(files)));
        let outcomes = Arc::new(Mutex::new(Vec::new()));

        let workers = self.concurrency.max(1);
        let mut handles = Vec::with_capacity(workers);
        for _ in 0..workers {
            let queue = Arc::clone(&queue);
            let outcomes = Arc::clone(&outcomes);
            let classifier = self.classifier;
            let registry = Arc::clone(&self.registry);
            let cache = Arc::clone(&self.cache);
            let out_dir = out_dir.clone();

            handles.push(tokio::spawn(async move {
                loop {
                    let next = queue.lock().await.pop_front();
                    let Some(path) = next else { break };
                    let outcome =
                        export_one(classifier, &registry, &cache, path, out_dir.as_deref()).await;
                    outcomes.lock().await.push(outcome);
                }
            }));
        }
        for handle in handles {
            let _ = handle.await;
        }

        let mut outcomes = match Arc::try_unwrap(outcomes) {
            Ok(collected) => collected.into_inner(),
            Err(shared) => shared.lock().await.clone(),
        };
        outcomes.sort_by(|a, b| a.source.cmp(&b.source));
        self.finish(outcomes, started)
    }

    fn finish(&self, outcomes: Vec<FileOutcome>, started: Instant) -> BatchReport {
        let report = BatchReport {
            outcomes,
            duration: started.elapsed(),
        };
        BatchCompleted {
            succeeded: report.succeeded(),
            failed: report.failed(),
            duration: report.duration,
        }
        .log();
        report
    }
}

async fn export_one(
    classifier: Classifier,
    registry: &BackendRegistry,
    cache: &Mutex<RenderCache>,
    path: PathBuf,
    out_dir: Option<&Path>,
) -> FileOutcome {
    let text = match tokio::fs::read_to_string(&path).await {
        Ok(text) => text,
        Err(e) => {
            return FileOutcome::failure(path, format!("could not read source file: {}", e));
        }
    };
    let source = DiagramSource::new(path.clone(), text);

    let result = render_source(&classifier, registry, cache, &source, Theme::default(), None).await;
    let (format, bytes) = match result {
        RenderResult::Svg(svg) => (OutputFormat::Svg, svg.into_bytes()),
        RenderResult::Png(png) => (OutputFormat::Png, png),
        RenderResult::Error { message } => return FileOutcome::failure(path, message),
    };

    let artifact = artifact_path(&source.path, out_dir, format);
    match tokio::fs::write(&artifact, &bytes).await {
        Ok(()) => FileOutcome {
            source: path,
            artifact: Some(artifact),
            error: None,
        },
        Err(e) => FileOutcome::failure(
            path,
            format!("could not write artifact '{}': {}", artifact.display(), e),
        ),
    }
}
