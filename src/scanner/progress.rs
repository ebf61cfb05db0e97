use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::FileScan;

/// Per-run counters shared by the rayon workers of a parallel scan. Clones
/// count into the same run.
#[derive(Clone)]
pub struct ScanProgress {
    counters: Arc<Counters>,
    started: Instant,
}

#[derive(Default)]
struct Counters {
    scanned: AtomicUsize,
    skipped: AtomicUsize,
    failed: AtomicUsize,
    tags: AtomicUsize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSnapshot {
    /// Files handed to a parser, including the ones that failed to read
    pub files_scanned: usize,
    /// Files no enabled parser claimed
    pub files_skipped: usize,
    pub errors: usize,
    pub tags_emitted: usize,
    pub elapsed: Duration,
}

impl ScanProgress {
    pub fn new() -> Self {
        Self {
            counters: Arc::new(Counters::default()),
            started: Instant::now(),
        }
    }

    pub fn record(&self, result: &FileScan) {
        self.counters.scanned.fetch_add(1, Ordering::Relaxed);
        if result.error.is_some() {
            self.counters.failed.fetch_add(1, Ordering::Relaxed);
        }
        self.counters
            .tags
            .fetch_add(result.tags.len(), Ordering::Relaxed);
    }

    pub fn skip(&self) {
        self.counters.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            files_scanned: self.counters.scanned.load(Ordering::Relaxed),
            files_skipped: self.counters.skipped.load(Ordering::Relaxed),
            errors: self.counters.failed.load(Ordering::Relaxed),
            tags_emitted: self.counters.tags.load(Ordering::Relaxed),
            elapsed: self.started.elapsed(),
        }
    }
}

impl Default for ScanProgress {
    fn default() -> Self {
        Self::new()
    }
}
