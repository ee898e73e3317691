//! Progress reporting and cancellation support.
//!
//! Scanning a long video decodes every frame, so callers get two hooks:
//! a [`ProgressCallback`] that observes the scan, and a
//! [`CancellationToken`] that stops it. The token is also how the web front
//! end enforces its request timeout.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use scenecut::{CancellationToken, ProgressCallback, ProgressInfo, ScanOptions};
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         println!("[{:?}] {} frames", info.operation, info.current);
//!     }
//! }
//!
//! let token = CancellationToken::new();
//! let options = ScanOptions::new()
//!     .with_progress(Arc::new(PrintProgress))
//!     .with_cancellation(token.clone());
//! let changes = scenecut::scan_changes_with_options("input.mp4", &options)?;
//! # Ok::<(), scenecut::SceneCutError>(())
//! ```

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::{Duration, Instant};

/// The kind of work currently in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum OperationType {
    /// Scanning frames for scene changes.
    SceneScan,
    /// Rendering preview stills.
    PreviewRendering,
}

/// A snapshot of progress.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// What kind of work is being performed.
    pub operation: OperationType,
    /// How many items (frames or previews) have been processed so far.
    pub current: u64,
    /// Total items expected, if known ahead of time.
    pub total: Option<u64>,
    /// Completion percentage (0.0 – 100.0), if `total` is known.
    pub percentage: Option<f32>,
    /// Wall-clock time elapsed since the operation started.
    pub elapsed: Duration,
    /// Number of scene changes found so far (scans only).
    pub changes_found: usize,
}

/// Receives progress updates.
///
/// Callbacks are infallible: they observe but cannot halt the operation.
/// Use [`CancellationToken`] to stop work.
pub trait ProgressCallback: Send + Sync {
    /// Called at regular intervals.
    fn on_progress(&self, info: &ProgressInfo);
}

/// Discards all notifications. The default callback.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Cooperative cancellation token backed by an [`AtomicBool`].
///
/// Clones share state; cancelling any clone cancels all of them. Work loops
/// check the token before each frame.
///
/// ```
/// use scenecut::CancellationToken;
///
/// let token = CancellationToken::new();
/// let observer = token.clone();
/// token.cancel();
/// assert!(observer.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a new, non-cancelled token.
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Tracks timing and emits callbacks every `batch_size` items.
pub(crate) struct ProgressTracker {
    callback: Arc<dyn ProgressCallback>,
    operation: OperationType,
    total: Option<u64>,
    current: u64,
    batch_size: u64,
    start_time: Instant,
    items_since_last_report: u64,
}

impl ProgressTracker {
    pub(crate) fn new(
        callback: Arc<dyn ProgressCallback>,
        operation: OperationType,
        total: Option<u64>,
        batch_size: u64,
    ) -> Self {
        Self {
            callback,
            operation,
            total: total.filter(|&t| t > 0),
            current: 0,
            batch_size: batch_size.max(1),
            start_time: Instant::now(),
            items_since_last_report: 0,
        }
    }

    /// Record one completed item.
    pub(crate) fn advance(&mut self, changes_found: usize) {
        self.current += 1;
        self.items_since_last_report += 1;

        if self.items_since_last_report >= self.batch_size {
            self.report(changes_found);
            self.items_since_last_report = 0;
        }
    }

    /// Overwrite the completed-item count, for work finished outside
    /// [`advance`](Self::advance).
    #[cfg_attr(not(feature = "rayon"), allow(dead_code))]
    pub(crate) fn set_current(&mut self, current: u64) {
        self.current = current;
        self.items_since_last_report = 0;
    }

    /// Emit a final report regardless of batching.
    pub(crate) fn finish(&mut self, changes_found: usize) {
        self.report(changes_found);
    }

    fn report(&self, changes_found: usize) {
        let percentage = self
            .total
            .map(|t| ((self.current as f32 / t as f32) * 100.0).min(100.0));

        self.callback.on_progress(&ProgressInfo {
            operation: self.operation,
            current: self.current,
            total: self.total,
            percentage,
            elapsed: self.start_time.elapsed(),
            changes_found,
        });
    }
}
