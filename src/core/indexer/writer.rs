//! Bounded producer/consumer index writer.
//!
//! ```text
//! producer --submit--> [bounded tasks] --> N workers (encode)
//!                                              |
//!                        [bounded encoded] <---+
//!                              |
//!                          committer --> DocumentSink
//! ```
//!
//! The producer blocks once the task queue is full, so memory stays bounded
//! when analysis is slower than fetching. Only the committer touches the
//! sink. The first error raised by a worker or the committer is kept and
//! returned from [`ConcurrentIndexWriter::flush`]; later errors are logged
//! and dropped.

use crossbeam_channel::{bounded, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tantivy::TantivyDocument;
use tracing::debug;

use super::encoder::DocumentEncoder;
use crate::core::error::{CatalogError, Result};
use crate::core::types::Document;

/// Destination of encoded documents, owned by the committer thread
pub trait DocumentSink: Send + 'static {
    fn add(&mut self, doc: TantivyDocument) -> Result<()>;

    /// Make everything added so far durable, returning the new opstamp
    fn commit(&mut self) -> Result<u64>;
}

/// Counters returned by a successful flush
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushStats {
    pub submitted: u64,
    pub committed: u64,
    pub opstamp: u64,
}

/// Resolve a configured worker count (`0` = one per available CPU)
pub fn resolve_workers(configured: usize) -> usize {
    if configured == 0 {
        num_cpus::get().max(1)
    } else {
        configured
    }
}

/// First error wins; the flag lets hot loops check without locking
#[derive(Debug, Default)]
struct FirstError {
    failed: AtomicBool,
    error: Mutex<Option<CatalogError>>,
}

impl FirstError {
    fn record(&self, err: CatalogError) {
        let mut slot = self.error.lock();
        if slot.is_none() {
            *slot = Some(err);
            self.failed.store(true, Ordering::Release);
        } else {
            debug!("Suppressing subsequent index writer error: {}", err);
        }
    }

    fn is_set(&self) -> bool {
        self.failed.load(Ordering::Acquire)
    }

    fn take(&self) -> Option<CatalogError> {
        self.error.lock().take()
    }

    fn describe(&self) -> String {
        self.error
            .lock()
            .as_ref()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown failure".to_string())
    }
}

/// Parallel-analysis, single-committer index writer
pub struct ConcurrentIndexWriter<S: DocumentSink> {
    entity: String,
    tasks: Option<Sender<Document>>,
    workers: Vec<JoinHandle<()>>,
    committer: Option<JoinHandle<S>>,
    failure: Arc<FirstError>,
    committed: Arc<AtomicU64>,
    submitted: u64,
}

impl<S: DocumentSink> ConcurrentIndexWriter<S> {
    /// Start the worker pool and the committer.
    ///
    /// # Arguments
    ///
    /// * `encoder` - Prototype encoder, cloned once per worker
    /// * `sink` - Moved to the committer thread, handed back by `flush`
    /// * `queue_bound` - Task queue capacity (one chunk of rows)
    /// * `workers` - Worker count, `0` for one per CPU
    pub fn new(
        encoder: DocumentEncoder,
        sink: S,
        queue_bound: usize,
        workers: usize,
    ) -> Result<Self> {
        let entity = encoder.entity().to_string();
        let bound = queue_bound.max(1);
        let worker_count = resolve_workers(workers);

        let (task_tx, task_rx) = bounded::<Document>(bound);
        let (encoded_tx, encoded_rx) = bounded::<TantivyDocument>(bound);
        let failure = Arc::new(FirstError::default());
        let committed = Arc::new(AtomicU64::new(0));

        debug!(
            "Starting {} index workers for '{}' (queue bound {})",
            worker_count, entity, bound
        );

        let mut handles = Vec::with_capacity(worker_count);
        for i in 0..worker_count {
            let rx = task_rx.clone();
            let tx = encoded_tx.clone();
            let failure = Arc::clone(&failure);
            let mut encoder = encoder.clone();

            let handle = std::thread::Builder::new()
                .name(format!("{entity}-worker-{i}"))
                .spawn(move || {
                    for doc in rx.iter() {
                        // Keep draining after a failure so the producer never blocks forever
                        if failure.is_set() {
                            continue;
                        }
                        match encoder.encode(doc) {
                            Ok(encoded) => {
                                if tx.send(encoded).is_err() {
                                    break;
                                }
                            }
                            Err(e) => failure.record(e),
                        }
                    }
                })?;
            handles.push(handle);
        }
        drop(encoded_tx);

        let committer = {
            let failure = Arc::clone(&failure);
            let committed = Arc::clone(&committed);
            let mut sink = sink;
            std::thread::Builder::new()
                .name(format!("{entity}-committer"))
                .spawn(move || {
                    for doc in encoded_rx.iter() {
                        if failure.is_set() {
                            continue;
                        }
                        match sink.add(doc) {
                            Ok(()) => {
                                committed.fetch_add(1, Ordering::Relaxed);
                            }
                            Err(e) => failure.record(e),
                        }
                    }
                    sink
                })?
        };

        Ok(Self {
            entity,
            tasks: Some(task_tx),
            workers: handles,
            committer: Some(committer),
            failure,
            committed,
            submitted: 0,
        })
    }

    /// Enqueue a document, blocking while the queue is full.
    ///
    /// Fails fast once any worker or the committer has failed, so the
    /// producer can stop scanning; the original error comes from `flush`.
    pub fn submit(&mut self, doc: Document) -> Result<()> {
        if self.failure.is_set() {
            return Err(CatalogError::IndexingFailed(format!(
                "index writer for '{}' has failed: {}",
                self.entity,
                self.failure.describe()
            )));
        }

        let tasks = self.tasks.as_ref().ok_or_else(|| {
            CatalogError::IndexingFailed(format!("index writer for '{}' is closed", self.entity))
        })?;
        tasks.send(doc).map_err(|_| {
            CatalogError::IndexingFailed(format!("index workers for '{}' exited", self.entity))
        })?;

        self.submitted += 1;
        Ok(())
    }

    pub fn submitted(&self) -> u64 {
        self.submitted
    }

    /// Documents handed to the sink so far
    pub fn committed(&self) -> u64 {
        self.committed.load(Ordering::Relaxed)
    }

    /// Drain the queue, wait for all in-flight work and commit.
    ///
    /// Returns the sink (for optimize/merge) with the final counters, or
    /// the first error captured by the pipeline. Nothing is committed when
    /// an error was captured.
    pub fn flush(mut self) -> Result<(S, FlushStats)> {
        self.tasks.take();

        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                self.failure.record(CatalogError::IndexingFailed(format!(
                    "an index worker for '{}' panicked",
                    self.entity
                )));
            }
        }

        let sink = match self.committer.take().map(JoinHandle::join) {
            Some(Ok(sink)) => Some(sink),
            _ => {
                self.failure.record(CatalogError::Commit(format!(
                    "committer for '{}' panicked",
                    self.entity
                )));
                None
            }
        };

        if let Some(err) = self.failure.take() {
            return Err(err);
        }
        let mut sink = sink.ok_or_else(|| {
            CatalogError::Commit(format!("committer for '{}' is gone", self.entity))
        })?;

        let opstamp = sink.commit()?;
        let stats = FlushStats {
            submitted: self.submitted,
            committed: self.committed.load(Ordering::Relaxed),
            opstamp,
        };
        debug!(
            "Flushed '{}': {} submitted, {} committed (opstamp {})",
            self.entity, stats.submitted, stats.committed, stats.opstamp
        );
        Ok((sink, stats))
    }
}

impl<S: DocumentSink> Drop for ConcurrentIndexWriter<S> {
    fn drop(&mut self) {
        // Abandoned without flush: close the queue and let threads wind down
        self.tasks.take();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
        if let Some(handle) = self.committer.take() {
            let _ = handle.join();
        }
    }
}
