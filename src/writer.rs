//! Asynchronous, queue-backed entity writer for subset export.
//!
//! Many producer threads append entities; a single background consumer
//! drains them into one gzip file. The queue is unbounded by design: a
//! producer never blocks beyond the enqueue itself, at the cost of unbounded
//! memory if the consumer falls behind.

use crate::config::{OUTPUT_BUF_SIZE, WRITER_POLL_INTERVAL};
use crate::model::Entity;
use anyhow::{bail, Context, Result};
use crossbeam_channel::{unbounded, RecvTimeoutError, Sender};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, warn};

/// Writes entities to one gzip file from a background thread.
///
/// Lifecycle: `Unopened -> Open -> Closed`. [`open`](Self::open) creates the
/// output file and starts the consumer; [`append`](Self::append) is valid
/// only while open and is safe from any number of threads;
/// [`close`](Self::close) signals the consumer to stop and returns once
/// teardown is initiated -- the consumer may still be draining, so callers
/// that need the file complete must [`join`](Self::join).
pub struct AsyncEntityWriter {
    path: PathBuf,
    started: AtomicBool,
    stopped: Arc<AtomicBool>,
    sender: Option<Sender<Entity>>,
    handle: Option<JoinHandle<()>>,
}

impl AsyncEntityWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        AsyncEntityWriter {
            path: path.into(),
            started: AtomicBool::new(false),
            stopped: Arc::new(AtomicBool::new(false)),
            sender: None,
            handle: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates the output file and starts the consumer thread. Fails if the
    /// file cannot be created or the writer was already opened.
    pub fn open(&mut self) -> Result<()> {
        if self.started.swap(true, Ordering::SeqCst) {
            bail!("open() called twice on writer for {}", self.path.display());
        }
        let file = File::create(&self.path)
            .with_context(|| format!("Failed to create output file: {}", self.path.display()))?;
        let out = BufWriter::with_capacity(
            OUTPUT_BUF_SIZE,
            GzEncoder::new(file, Compression::default()),
        );

        let (sender, receiver) = unbounded::<Entity>();
        let stopped = Arc::clone(&self.stopped);
        let path = self.path.clone();
        let handle = std::thread::Builder::new()
            .name(format!(
                "writer-{}",
                self.path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default()
            ))
            .spawn(move || consume(receiver, out, stopped, path))
            .context("Failed to spawn writer thread")?;

        self.sender = Some(sender);
        self.handle = Some(handle);
        Ok(())
    }

    /// Enqueues one entity. Invalid before [`open`](Self::open) or after
    /// [`close`](Self::close); never blocks beyond queue insertion.
    pub fn append(&self, entity: Entity) -> Result<()> {
        if !self.started.load(Ordering::SeqCst) {
            bail!("append() before open() on writer for {}", self.path.display());
        }
        if self.stopped.load(Ordering::SeqCst) {
            bail!("append() after close() on writer for {}", self.path.display());
        }
        match &self.sender {
            Some(sender) => sender
                .send(entity)
                .map_err(|_| anyhow::anyhow!("writer consumer for {} is gone", self.path.display())),
            None => bail!("append() before open() on writer for {}", self.path.display()),
        }
    }

    /// Appends every entity of a batch.
    pub fn append_all(&self, entities: &[Entity]) -> Result<()> {
        for entity in entities {
            self.append(entity.clone())?;
        }
        Ok(())
    }

    /// Signals the consumer to stop. Remaining queued entities are still
    /// drained and the gzip stream flushed before the thread exits; this
    /// call only guarantees teardown has been initiated.
    pub fn close(&mut self) {
        self.stopped.store(true, Ordering::SeqCst);
        // dropping the sender lets the consumer observe disconnection
        // immediately instead of waiting out a poll interval
        self.sender = None;
    }

    /// Waits for the consumer thread to finish draining and flushing.
    pub fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!(file = %self.path.display(), "Writer thread panicked");
            }
        }
    }
}

/// Consumer loop: drain the queue, observing the stop flag between short
/// poll timeouts. An I/O error drops the item and keeps draining so
/// producers never back up behind a broken output.
fn consume(
    receiver: crossbeam_channel::Receiver<Entity>,
    mut out: BufWriter<GzEncoder<File>>,
    stopped: Arc<AtomicBool>,
    path: PathBuf,
) {
    let mut written = 0u64;
    loop {
        match receiver.recv_timeout(WRITER_POLL_INTERVAL) {
            Ok(entity) => {
                if let Err(e) = out.write_all(entity.to_lines().as_bytes()) {
                    warn!(file = %path.display(), error = %e, "Dropping entity after write error");
                } else {
                    written += 1;
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                if stopped.load(Ordering::SeqCst) && receiver.is_empty() {
                    break;
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    match out.into_inner() {
        Ok(encoder) => {
            if let Err(e) = encoder.finish() {
                warn!(file = %path.display(), error = %e, "Failed to finish gzip stream");
            }
        }
        Err(e) => warn!(file = %path.display(), error = %e, "Failed to flush output"),
    }
    debug!(file = %path.display(), entities = written, "Writer finished");
}
