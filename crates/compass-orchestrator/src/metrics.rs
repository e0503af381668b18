//! Progress counters for a batch
//!
//! [`BatchProgress`] is shared between the orchestrator and whoever reports
//! progress; counters update as each document reaches its terminal fate.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Live counters for one batch
#[derive(Debug)]
pub struct BatchProgress {
    total: AtomicUsize,
    processed: AtomicUsize,
    failed: AtomicUsize,
    started: Mutex<Option<Instant>>,
    finished_ms: AtomicU64,
}

impl Default for BatchProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchProgress {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self {
            total: AtomicUsize::new(0),
            processed: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            started: Mutex::new(None),
            finished_ms: AtomicU64::new(u64::MAX),
        }
    }

    /// Reset the counters and start the clock for a batch of `total` documents
    pub fn start(&self, total: usize) {
        self.total.store(total, Ordering::SeqCst);
        self.processed.store(0, Ordering::SeqCst);
        self.failed.store(0, Ordering::SeqCst);
        self.finished_ms.store(u64::MAX, Ordering::SeqCst);
        *self.started.lock().unwrap_or_else(|e| e.into_inner()) = Some(Instant::now());
    }

    /// Record a document that reached its terminal successful state
    pub fn record_success(&self) {
        self.processed.fetch_add(1, Ordering::SeqCst);
    }

    /// Record a document that failed terminally
    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::SeqCst);
        self.processed.fetch_add(1, Ordering::SeqCst);
    }

    /// Freeze the elapsed time
    pub fn finish(&self) {
        let elapsed = self.running_elapsed().as_millis() as u64;
        self.finished_ms.store(elapsed, Ordering::SeqCst);
    }

    /// Point-in-time view of the counters
    pub fn snapshot(&self) -> ProgressSnapshot {
        let finished = self.finished_ms.load(Ordering::SeqCst);
        let elapsed = if finished == u64::MAX {
            self.running_elapsed()
        } else {
            Duration::from_millis(finished)
        };

        ProgressSnapshot::new(
            self.total.load(Ordering::SeqCst),
            self.processed.load(Ordering::SeqCst),
            self.failed.load(Ordering::SeqCst),
            elapsed,
        )
    }

    fn running_elapsed(&self) -> Duration {
        let started = *self.started.lock().unwrap_or_else(|e| e.into_inner());
        started.map(|s| s.elapsed()).unwrap_or_default()
    }
}

/// Counters at one instant
///
/// `processed` counts every document that reached a terminal fate, failed
/// ones included.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    /// Documents in the batch
    pub total: usize,
    /// Documents finished, successfully or not
    pub processed: usize,
    /// Documents that failed terminally
    pub failed: usize,
    /// Share of processed documents that succeeded, in percent
    pub success_rate: f64,
    /// Wall-clock time since the batch started (milliseconds)
    pub elapsed_ms: u64,
}

impl ProgressSnapshot {
    /// Build a snapshot, deriving the success rate
    ///
    /// # Examples
    ///
    /// ```
    /// use compass_orchestrator::ProgressSnapshot;
    /// use std::time::Duration;
    ///
    /// let snapshot = ProgressSnapshot::new(5, 4, 1, Duration::from_secs(2));
    /// assert_eq!(snapshot.success_rate, 75.0);
    /// assert_eq!(snapshot.succeeded(), 3);
    /// ```
    pub fn new(total: usize, processed: usize, failed: usize, elapsed: Duration) -> Self {
        let success_rate = if processed == 0 {
            0.0
        } else {
            processed.saturating_sub(failed) as f64 / processed as f64 * 100.0
        };

        Self {
            total,
            processed,
            failed,
            success_rate,
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }

    /// Documents that succeeded
    pub fn succeeded(&self) -> usize {
        self.processed.saturating_sub(self.failed)
    }

    /// Elapsed time as a Duration
    pub fn elapsed(&self) -> Duration {
        Duration::from_millis(self.elapsed_ms)
    }

    /// One-line report for logs
    pub fn summary(&self) -> String {
        format!(
            "{}/{} processed, {} failed, {:.1}% success in {:.1}s",
            self.processed,
            self.total,
            self.failed,
            self.success_rate,
            self.elapsed().as_secs_f64()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let progress = BatchProgress::new();
        progress.start(3);
        progress.record_success();
        progress.record_failure();

        let snapshot = progress.snapshot();
        assert_eq!(snapshot.total, 3);
        assert_eq!(snapshot.processed, 2);
        assert_eq!(snapshot.failed, 1);
        assert_eq!(snapshot.success_rate, 50.0);
    }

    #[test]
    fn test_start_resets() {
        let progress = BatchProgress::new();
        progress.start(1);
        progress.record_failure();
        progress.finish();

        progress.start(2);
        let snapshot = progress.snapshot();
        assert_eq!(snapshot.processed, 0);
        assert_eq!(snapshot.failed, 0);
    }

    #[test]
    fn test_finish_freezes_elapsed() {
        let progress = BatchProgress::new();
        progress.start(0);
        progress.finish();
        let first = progress.snapshot().elapsed_ms;
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(progress.snapshot().elapsed_ms, first);
    }

    #[test]
    fn test_empty_batch_rate() {
        let snapshot = ProgressSnapshot::new(0, 0, 0, Duration::ZERO);
        assert_eq!(snapshot.success_rate, 0.0);
        assert!(snapshot.summary().contains("0/0 processed"));
    }
}
