//! Generic parallel batch engine: setup, fan out over a worker pool, teardown.

use anyhow::{bail, Context, Result};
use indicatif::ProgressBar;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{info, warn};

/// A per-file task with ordered lifecycle hooks.
///
/// `setup` runs once before any worker starts; its failure aborts the run
/// before any file is touched. `process` is called concurrently from the
/// worker pool, once per file; failures are logged and counted but do not
/// stop sibling workers. `teardown` runs once, after every worker has
/// finished every file.
pub trait FileProcessor: Sync {
    fn setup(&mut self) -> Result<()> {
        Ok(())
    }

    fn process(&self, path: &Path) -> Result<()>;

    fn teardown(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Outcome of a run: how many files were attempted and how many failed.
/// Failed files are not retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    pub files_processed: u64,
    pub files_failed: u64,
}

/// Drives `processor` over `files` with exactly `threads` workers.
///
/// A dedicated pool is built rather than using rayon's global one so the
/// degree of parallelism is the caller's number, not whatever the global
/// pool was sized to. Files are drained in no particular order across
/// workers; each file is owned by one worker end-to-end.
pub fn run<P: FileProcessor>(processor: &mut P, files: &[PathBuf], threads: usize) -> Result<RunReport> {
    if threads == 0 {
        bail!("thread count must be positive");
    }

    processor.setup().context("Setup failed, aborting run")?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("quadprof-worker-{}", i))
        .build()
        .context("Failed to build worker pool")?;

    info!(files = files.len(), threads, "Starting batch run");
    let progress = ProgressBar::new(files.len() as u64);
    let failed = AtomicU64::new(0);

    {
        let shared: &P = processor;
        pool.install(|| {
            files.par_iter().for_each(|path| {
                if let Err(e) = shared.process(path) {
                    warn!(file = %path.display(), error = %e, "File processing failed");
                    failed.fetch_add(1, Ordering::Relaxed);
                }
                progress.inc(1);
            });
        });
    }
    progress.finish_and_clear();

    processor.teardown().context("Teardown failed")?;

    let report = RunReport {
        files_processed: files.len() as u64,
        files_failed: failed.load(Ordering::Relaxed),
    };
    info!(
        files = report.files_processed,
        failed = report.files_failed,
        "Batch run complete"
    );
    Ok(report)
}
