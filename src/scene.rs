//! Scene change detection by consecutive frame differencing.
//!
//! Every frame is collapsed to 8-bit luma and compared with the frame
//! immediately before it. The change score is the mean absolute per-pixel
//! difference on the 0–255 scale; frames whose score strictly exceeds the
//! threshold are reported. Comparison is strictly pairwise: there is no
//! smoothing and no lookback, so frame 1 is never reported.
//!
//! # Example
//!
//! ```no_run
//! use scenecut::{FrameScanner, ScanOptions, VideoReader};
//!
//! let mut reader = VideoReader::open("input.mp4")?;
//! let changes = FrameScanner::new(&ScanOptions::new().with_threshold(30.0)).scan(&mut reader)?;
//! for change in &changes {
//!     println!(
//!         "frame {} at {:.2}s (score {:.1})",
//!         change.frame_index, change.timestamp_seconds, change.score
//!     );
//! }
//! # Ok::<(), scenecut::SceneCutError>(())
//! ```

use image::{GrayImage, RgbImage};
use serde::Serialize;

use crate::{
    configuration::ScanOptions,
    conversion::frame_index_to_seconds,
    error::SceneCutError,
    progress::{OperationType, ProgressTracker},
    source::VideoSource,
};

/// A detected scene change.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SceneChange {
    /// 1-based index of the first frame of the new scene. Always `>= 2`.
    pub frame_index: u64,
    /// `frame_index / fps`.
    pub timestamp_seconds: f64,
    /// Mean absolute grayscale difference from the previous frame (0–255).
    pub score: f64,
}

/// Single-pass frame-difference scanner.
#[derive(Debug, Clone, Copy)]
pub struct FrameScanner<'a> {
    options: &'a ScanOptions,
}

impl<'a> FrameScanner<'a> {
    /// Create a scanner with the given options.
    pub fn new(options: &'a ScanOptions) -> Self {
        Self { options }
    }

    /// Scan `source` from its current position to the end.
    ///
    /// An empty or single-frame source yields no changes. A frame that fails
    /// to decode ends the scan as if the stream had ended there; changes
    /// found before it are kept.
    ///
    /// # Errors
    ///
    /// - [`SceneCutError::InvalidThreshold`] for a negative or non-finite
    ///   threshold.
    /// - [`SceneCutError::FrameSizeMismatch`] if frame dimensions change.
    /// - [`SceneCutError::ZeroFrameRate`] if changes were found but the
    ///   source has no usable frame rate.
    /// - [`SceneCutError::Cancelled`] if the cancellation token fires.
    pub fn scan<S: VideoSource + ?Sized>(
        &self,
        source: &mut S,
    ) -> Result<Vec<SceneChange>, SceneCutError> {
        self.scan_frames(source, |_frame| {})
    }

    /// Like [`scan`](FrameScanner::scan), but also keeps the RGB frame of
    /// every reported change, so previews can be rendered without seeking.
    pub fn scan_capturing<S: VideoSource + ?Sized>(
        &self,
        source: &mut S,
    ) -> Result<Vec<(SceneChange, RgbImage)>, SceneCutError> {
        let mut frames = Vec::new();
        let changes = self.scan_frames(source, |frame| frames.push(frame))?;
        Ok(changes.into_iter().zip(frames).collect())
    }

    /// Drive the scan, handing each flagged frame to `on_flag` in order.
    fn scan_frames<S, F>(
        &self,
        source: &mut S,
        mut on_flag: F,
    ) -> Result<Vec<SceneChange>, SceneCutError>
    where
        S: VideoSource + ?Sized,
        F: FnMut(RgbImage),
    {
        self.options.validate()?;
        let threshold = self.options.threshold;

        log::debug!(
            "Scanning for scene changes (threshold={}, max_frames={:?})",
            threshold,
            self.options.max_frames
        );

        let mut tracker = ProgressTracker::new(
            self.options.progress.clone(),
            OperationType::SceneScan,
            source.frame_count_hint(),
            self.options.batch_size,
        );

        let mut changes: Vec<SceneChange> = Vec::new();

        if self.options.max_frames == Some(0) {
            log::debug!("Frame limit of 0, nothing to scan");
            tracker.finish(0);
            return Ok(changes);
        }

        let Some(first) = self.next_frame(source, 1)? else {
            log::debug!("Source has no decodable frames");
            tracker.finish(0);
            return Ok(changes);
        };
        tracker.advance(0);

        let mut previous_gray = to_grayscale(&first);
        let mut frame_index: u64 = 1;

        loop {
            if self
                .options
                .max_frames
                .is_some_and(|max_frames| frame_index >= max_frames)
            {
                log::debug!("Frame limit of {frame_index} reached, stopping scan");
                break;
            }

            let Some(current) = self.next_frame(source, frame_index + 1)? else {
                break;
            };
            frame_index += 1;

            let current_gray = to_grayscale(&current);
            let score = mean_absolute_difference(&previous_gray, &current_gray)
                .ok_or_else(|| SceneCutError::FrameSizeMismatch {
                    frame_index,
                    expected_width: previous_gray.width(),
                    expected_height: previous_gray.height(),
                    actual_width: current_gray.width(),
                    actual_height: current_gray.height(),
                })?;

            if score > threshold {
                log::debug!("Scene change at frame {frame_index} (score {score:.2})");
                changes.push(SceneChange {
                    frame_index,
                    timestamp_seconds: 0.0,
                    score,
                });
                on_flag(current);
            }

            previous_gray = current_gray;
            tracker.advance(changes.len());
        }

        tracker.finish(changes.len());

        log::info!(
            "Scan finished: {} frames read, {} scene changes",
            frame_index,
            changes.len()
        );

        let frames_per_second = source.frames_per_second();
        for change in &mut changes {
            change.timestamp_seconds =
                frame_index_to_seconds(change.frame_index, frames_per_second).ok_or(
                    SceneCutError::ZeroFrameRate {
                        frame_index: change.frame_index,
                    },
                )?;
        }

        Ok(changes)
    }

    /// Read the next frame, treating decode failures as end of stream.
    fn next_frame<S: VideoSource + ?Sized>(
        &self,
        source: &mut S,
        frame_index: u64,
    ) -> Result<Option<RgbImage>, SceneCutError> {
        if self.options.is_cancelled() {
            return Err(SceneCutError::Cancelled);
        }

        match source.read_frame() {
            Some(Ok(frame)) => Ok(Some(frame)),
            Some(Err(error)) => {
                log::warn!("Stopping scan at frame {frame_index}: {error}");
                Ok(None)
            }
            None => Ok(None),
        }
    }
}

/// Convert an RGB frame to 8-bit luma using ITU-R BT.601 weights.
///
/// Uses 14-bit fixed point with rounding:
/// `Y = (4899 R + 9617 G + 1868 B + 8192) >> 14`.
pub fn to_grayscale(frame: &RgbImage) -> GrayImage {
    let (width, height) = frame.dimensions();
    let luma = frame
        .as_raw()
        .chunks_exact(3)
        .map(|pixel| {
            let weighted =
                4899 * pixel[0] as u32 + 9617 * pixel[1] as u32 + 1868 * pixel[2] as u32;
            ((weighted + 8192) >> 14) as u8
        })
        .collect();
    // The buffer length is width * height by construction.
    GrayImage::from_raw(width, height, luma).unwrap_or_else(|| GrayImage::new(width, height))
}

/// Mean absolute per-pixel difference between two grayscale frames.
///
/// Returns `None` when the frames differ in size. Two empty frames score 0.
pub fn mean_absolute_difference(previous: &GrayImage, current: &GrayImage) -> Option<f64> {
    if previous.dimensions() != current.dimensions() {
        return None;
    }

    let pixel_count = previous.as_raw().len();
    if pixel_count == 0 {
        return Some(0.0);
    }

    let total: u64 = previous
        .as_raw()
        .iter()
        .zip(current.as_raw())
        .map(|(&a, &b)| a.abs_diff(b) as u64)
        .sum();

    Some(total as f64 / pixel_count as f64)
}
