//! Batch progress callbacks.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Progress information for one finished item.
#[derive(Debug, Clone)]
pub struct ItemProgress {
    /// Input path of the finished item.
    pub item: PathBuf,
    /// Whether the pipeline produced a volume.
    pub succeeded: bool,
    /// Items finished so far, this one included.
    pub completed: usize,
    pub total: usize,
    /// Time since the batch started.
    pub elapsed: Duration,
}

impl ItemProgress {
    pub fn progress_percent(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        self.completed as f64 / self.total as f64 * 100.0
    }
}

/// Receives a call whenever a worker finishes an item.
///
/// Called from worker threads in completion order, not input order.
pub trait BatchProgress: Send + Sync {
    fn on_item_finished(&self, progress: &ItemProgress);

    /// Called once before any item is dispatched.
    fn on_start(&self, _total: usize) {}
}

/// Counts finished items and builds [`ItemProgress`] values for a callback.
pub(crate) struct ProgressTracker<'a> {
    callback: Option<&'a dyn BatchProgress>,
    completed: AtomicUsize,
    total: usize,
    started: Instant,
}

impl<'a> ProgressTracker<'a> {
    pub(crate) fn new(callback: Option<&'a dyn BatchProgress>, total: usize) -> Self {
        if let Some(callback) = callback {
            callback.on_start(total);
        }
        Self {
            callback,
            completed: AtomicUsize::new(0),
            total,
            started: Instant::now(),
        }
    }

    pub(crate) fn finish(&self, item: &Path, succeeded: bool) {
        let completed = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(callback) = self.callback {
            callback.on_item_finished(&ItemProgress {
                item: item.to_path_buf(),
                succeeded,
                completed,
                total: self.total,
                elapsed: self.started.elapsed(),
            });
        }
    }
}

/// Callback that logs each finished item through tracing.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProgress;

impl BatchProgress for LogProgress {
    fn on_item_finished(&self, progress: &ItemProgress) {
        tracing::info!(
            "[{}/{}] ({:.1}%) {} {}",
            progress.completed,
            progress.total,
            progress.progress_percent(),
            progress.item.display(),
            if progress.succeeded { "done" } else { "failed" }
        );
    }
}

/// Callback that records every event.
#[derive(Debug, Default)]
pub struct HistoryProgress {
    history: Mutex<Vec<ItemProgress>>,
}

impl HistoryProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded events in completion order.
    pub fn history(&self) -> Vec<ItemProgress> {
        self.history.lock().map(|h| h.clone()).unwrap_or_default()
    }
}

impl BatchProgress for HistoryProgress {
    fn on_item_finished(&self, progress: &ItemProgress) {
        if let Ok(mut history) = self.history.lock() {
            history.push(progress.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_counts() {
        let history = HistoryProgress::new();
        let tracker = ProgressTracker::new(Some(&history), 2);
        tracker.finish(Path::new("a.nii"), true);
        tracker.finish(Path::new("b.nii"), false);

        let events = history.history();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].completed, 2);
        assert!(!events[1].succeeded);
        assert_eq!(events[1].progress_percent(), 100.0);
    }

    #[test]
    fn test_empty_batch_percent() {
        let progress = ItemProgress {
            item: PathBuf::new(),
            succeeded: true,
            completed: 0,
            total: 0,
            elapsed: Duration::ZERO,
        };
        assert_eq!(progress.progress_percent(), 100.0);
    }
}
