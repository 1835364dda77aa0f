use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing ingestion and matching activity.
#[derive(Default)]
pub struct IngestionMetrics {
    notices_ingested: AtomicU64,
    scans_ingested: AtomicU64,
    ocr_pages_failed: AtomicU64,
    attachments_queued: AtomicU64,
    match_queries: AtomicU64,
}

impl IngestionMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a structured notice that reached the store.
    pub fn record_notice(&self) {
        self.notices_ingested.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a scanned document and the number of pages whose extraction failed.
    pub fn record_scan(&self, failed_pages: u64) {
        self.scans_ingested.fetch_add(1, Ordering::Relaxed);
        self.ocr_pages_failed
            .fetch_add(failed_pages, Ordering::Relaxed);
    }

    /// Record an attachment handed to the background OCR pool.
    pub fn record_attachment_queued(&self) {
        self.attachments_queued.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a served match query.
    pub fn record_match_query(&self) {
        self.match_queries.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            notices_ingested: self.notices_ingested.load(Ordering::Relaxed),
            scans_ingested: self.scans_ingested.load(Ordering::Relaxed),
            ocr_pages_failed: self.ocr_pages_failed.load(Ordering::Relaxed),
            attachments_queued: self.attachments_queued.load(Ordering::Relaxed),
            match_queries: self.match_queries.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of the counters used for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Structured notices persisted since startup.
    pub notices_ingested: u64,
    /// Scanned documents persisted since startup.
    pub scans_ingested: u64,
    /// Pages skipped because their extraction call failed.
    pub ocr_pages_failed: u64,
    /// Attachments submitted for background OCR.
    pub attachments_queued: u64,
    /// Match queries answered.
    pub match_queries: u64,
}
