//! Scan and preview configuration.
//!
//! [`ScanOptions`] and [`PreviewOptions`] are builders that carry the
//! detection threshold, bounds, progress callbacks and cancellation through
//! the pipeline without widening every function signature.
//! [`AnalysisOptions`] bundles both for [`analyze`](crate::analyze).
//!
//! # Example
//!
//! ```
//! use scenecut::{AnalysisOptions, PreviewOptions, PreviewStrategy, ScanOptions};
//!
//! let options = AnalysisOptions::new()
//!     .with_scan(ScanOptions::new().with_threshold(25.0).with_max_frames(50_000))
//!     .with_preview(PreviewOptions::new().with_max_dimension(640))
//!     .with_strategy(PreviewStrategy::SinglePass);
//! assert_eq!(options.scan.threshold(), 25.0);
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;

use serde::Deserialize;

use crate::error::SceneCutError;
use crate::progress::{CancellationToken, NoOpProgress, ProgressCallback};

/// Threshold used when the caller does not supply one, on the 0–255 scale of
/// mean absolute grayscale difference.
pub const DEFAULT_THRESHOLD: f64 = 30.0;

/// Settings for the frame-difference scan.
#[derive(Clone)]
pub struct ScanOptions {
    pub(crate) threshold: f64,
    pub(crate) max_frames: Option<u64>,
    pub(crate) progress: Arc<dyn ProgressCallback>,
    pub(crate) cancellation: Option<CancellationToken>,
    pub(crate) batch_size: u64,
}

impl Debug for ScanOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ScanOptions")
            .field("threshold", &self.threshold)
            .field("max_frames", &self.max_frames)
            .field("has_cancellation", &self.cancellation.is_some())
            .field("batch_size", &self.batch_size)
            .finish()
    }
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanOptions {
    /// Defaults: threshold 30, no frame bound, no progress, no cancellation.
    pub fn new() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            max_frames: None,
            progress: Arc::new(NoOpProgress),
            cancellation: None,
            batch_size: 100,
        }
    }

    /// Set the change threshold. A frame is reported when its mean absolute
    /// difference from its predecessor strictly exceeds this value.
    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Stop reading after `max_frames` frames. The scan ends normally and
    /// keeps whatever it found up to that point. A bound of zero reads
    /// nothing.
    #[must_use]
    pub fn with_max_frames(mut self, max_frames: u64) -> Self {
        self.max_frames = Some(max_frames);
        self
    }

    /// Attach a progress callback.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Attach a cancellation token. A cancelled scan returns
    /// [`SceneCutError::Cancelled`].
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Fire the progress callback every `size` frames (minimum 1).
    #[must_use]
    pub fn with_batch_size(mut self, size: u64) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// The configured threshold.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// The configured frame bound, if any.
    pub fn max_frames(&self) -> Option<u64> {
        self.max_frames
    }

    pub(crate) fn validate(&self) -> Result<(), SceneCutError> {
        if self.threshold.is_finite() && self.threshold >= 0.0 {
            Ok(())
        } else {
            Err(SceneCutError::InvalidThreshold(self.threshold))
        }
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(|token| token.is_cancelled())
    }
}

/// Settings for rendering preview stills.
#[derive(Debug, Clone, Default)]
#[must_use]
pub struct PreviewOptions {
    /// Longest edge of the frame inside the preview, in pixels. `None`
    /// keeps the source resolution.
    pub max_dimension: Option<u32>,
    /// Integer scale of the caption font. `None` picks one from the frame
    /// width.
    pub caption_scale: Option<u32>,
}

impl PreviewOptions {
    /// Source resolution, automatic caption size.
    pub fn new() -> Self {
        Self::default()
    }

    /// Downscale frames so their longest edge is at most `max_dimension`.
    pub fn with_max_dimension(mut self, max_dimension: u32) -> Self {
        self.max_dimension = Some(max_dimension.max(1));
        self
    }

    /// Force a caption font scale (1 = 5x7 pixel glyphs).
    pub fn with_caption_scale(mut self, scale: u32) -> Self {
        self.caption_scale = Some(scale.max(1));
        self
    }
}

/// How previews obtain the flagged frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreviewStrategy {
    /// Seek back into the source once per change and decode that frame.
    #[default]
    Seek,
    /// Keep flagged frames in memory during the scan; no seeking. Uses one
    /// decoded frame of memory per change.
    SinglePass,
}

/// Scan plus preview settings for [`analyze`](crate::analyze).
#[derive(Debug, Clone, Default)]
pub struct AnalysisOptions {
    /// Scan settings.
    pub scan: ScanOptions,
    /// Preview settings.
    pub preview: PreviewOptions,
    /// Frame acquisition strategy for previews.
    pub strategy: PreviewStrategy,
}

impl AnalysisOptions {
    /// Default scan and preview settings, seek strategy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the scan settings.
    #[must_use]
    pub fn with_scan(mut self, scan: ScanOptions) -> Self {
        self.scan = scan;
        self
    }

    /// Replace the preview settings.
    #[must_use]
    pub fn with_preview(mut self, preview: PreviewOptions) -> Self {
        self.preview = preview;
        self
    }

    /// Choose how previews obtain their frames.
    #[must_use]
    pub fn with_strategy(mut self, strategy: PreviewStrategy) -> Self {
        self.strategy = strategy;
        self
    }
}
