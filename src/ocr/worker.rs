//! Bounded background pool for OCR jobs detached from the request that created them.
//!
//! Jobs wait in a bounded queue; a dispatcher hands each one to a task once a worker slot is
//! free. Job failures travel over a separate channel and are logged there, so the submitting
//! request never observes them. Callers poll the record the job updates.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{Semaphore, mpsc};
use uuid::Uuid;

/// One attachment waiting for OCR.
#[derive(Debug, Clone)]
pub struct OcrJob {
    /// Attachment record to update.
    pub attachment_id: Uuid,
    /// Owning tender.
    pub tender_id: Uuid,
    /// Raw PDF bytes.
    pub pdf: Vec<u8>,
}

/// Work performed for each job.
#[async_trait]
pub trait OcrJobHandler: Send + Sync + 'static {
    /// Process one job; an error is logged by the pool and otherwise dropped.
    async fn handle(&self, job: OcrJob) -> anyhow::Result<()>;
}

/// Reasons a job could not be queued.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    /// Every queue slot is taken.
    #[error("OCR queue is full")]
    QueueFull,
    /// The dispatcher has shut down.
    #[error("OCR worker pool is closed")]
    Closed,
}

/// Reserved place in the OCR queue.
pub struct JobSlot {
    permit: mpsc::OwnedPermit<OcrJob>,
}

impl JobSlot {
    /// Queue `job` in the reserved place; never blocks or fails.
    pub fn send(self, job: OcrJob) {
        tracing::debug!(attachment_id = %job.attachment_id, "OCR job queued");
        self.permit.send(job);
    }
}

struct JobFailure {
    attachment_id: Uuid,
    tender_id: Uuid,
    error: anyhow::Error,
}

/// Handle used to submit jobs; cloning shares the same pool.
#[derive(Clone)]
pub struct OcrWorkerPool {
    sender: mpsc::Sender<OcrJob>,
    failed: Arc<AtomicU64>,
}

impl OcrWorkerPool {
    /// Start the dispatcher and failure logger on the current runtime.
    pub fn spawn(handler: Arc<dyn OcrJobHandler>, workers: usize, capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let (failure_tx, failure_rx) = mpsc::unbounded_channel();
        let failed = Arc::new(AtomicU64::new(0));

        tokio::spawn(dispatch(handler, receiver, failure_tx, workers.max(1)));
        tokio::spawn(log_failures(failure_rx, Arc::clone(&failed)));

        tracing::debug!(workers, capacity, "OCR worker pool started");
        Self { sender, failed }
    }

    /// Claim a queue slot without waiting.
    ///
    /// Dropping the returned slot unused releases it, so callers can reserve before writing the
    /// record a job will update and only send once that write succeeded.
    pub fn reserve(&self) -> Result<JobSlot, SubmitError> {
        self.sender
            .clone()
            .try_reserve_owned()
            .map(|permit| JobSlot { permit })
            .map_err(|err| match err {
                mpsc::error::TrySendError::Full(_) => {
                    tracing::warn!("OCR queue full; job rejected");
                    SubmitError::QueueFull
                }
                mpsc::error::TrySendError::Closed(_) => SubmitError::Closed,
            })
    }

    /// Queue a job without waiting.
    pub fn submit(&self, job: OcrJob) -> Result<(), SubmitError> {
        self.reserve()?.send(job);
        Ok(())
    }

    /// Jobs whose handler returned an error since the pool started.
    pub fn failed_jobs(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}

async fn dispatch(
    handler: Arc<dyn OcrJobHandler>,
    mut receiver: mpsc::Receiver<OcrJob>,
    failures: mpsc::UnboundedSender<JobFailure>,
    workers: usize,
) {
    let slots = Arc::new(Semaphore::new(workers));
    while let Some(job) = receiver.recv().await {
        let Ok(permit) = Arc::clone(&slots).acquire_owned().await else {
            break;
        };
        let handler = Arc::clone(&handler);
        let failures = failures.clone();
        tokio::spawn(async move {
            let attachment_id = job.attachment_id;
            let tender_id = job.tender_id;
            if let Err(error) = handler.handle(job).await {
                let _ = failures.send(JobFailure {
                    attachment_id,
                    tender_id,
                    error,
                });
            }
            drop(permit);
        });
    }
    tracing::debug!("OCR dispatcher stopped");
}

async fn log_failures(mut failures: mpsc::UnboundedReceiver<JobFailure>, failed: Arc<AtomicU64>) {
    while let Some(failure) = failures.recv().await {
        failed.fetch_add(1, Ordering::Relaxed);
        tracing::error!(
            attachment_id = %failure.attachment_id,
            tender_id = %failure.tender_id,
            error = ?failure.error,
            "Background OCR job failed"
        );
    }
}
