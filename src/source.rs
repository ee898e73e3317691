//! Frame sources.
//!
//! The scanner and the preview renderer only need three things from a video:
//! its frame rate, the next decoded frame, and the ability to jump back to a
//! given frame. [`VideoSource`] captures exactly that, so detection logic runs
//! the same against an FFmpeg-backed [`VideoReader`](crate::VideoReader) and
//! against an in-memory [`FrameSequence`].

use image::{Rgb, RgbImage};

use crate::error::SceneCutError;

/// An ordered, finite, forward-readable sequence of RGB frames with a fixed
/// frame rate.
pub trait VideoSource {
    /// Frames per second used to convert frame indices to elapsed time.
    /// May be `0.0` when the container declares no rate.
    fn frames_per_second(&self) -> f64;

    /// Read the next frame.
    ///
    /// Returns `None` at end of stream and `Some(Err(_))` when a frame
    /// cannot be decoded. Callers decide whether a decode error ends the
    /// stream or fails the operation.
    fn read_frame(&mut self) -> Option<Result<RgbImage, SceneCutError>>;

    /// Position the source so the next [`read_frame`](VideoSource::read_frame)
    /// yields the frame at zero-based `position`.
    fn seek_to_frame(&mut self, position: u64) -> Result<(), SceneCutError>;

    /// Expected number of frames, when known. Only used for progress.
    fn frame_count_hint(&self) -> Option<u64> {
        None
    }
}

impl<S: VideoSource + ?Sized> VideoSource for &mut S {
    fn frames_per_second(&self) -> f64 {
        (**self).frames_per_second()
    }

    fn read_frame(&mut self) -> Option<Result<RgbImage, SceneCutError>> {
        (**self).read_frame()
    }

    fn seek_to_frame(&mut self, position: u64) -> Result<(), SceneCutError> {
        (**self).seek_to_frame(position)
    }

    fn frame_count_hint(&self) -> Option<u64> {
        (**self).frame_count_hint()
    }
}

/// A video held entirely in memory.
///
/// Handy for synthetic input and for frames that were already decoded
/// elsewhere.
///
/// # Example
///
/// ```
/// use scenecut::{FrameSequence, ScanOptions};
///
/// let black = [0, 0, 0];
/// let white = [255, 255, 255];
/// let mut video = FrameSequence::from_solid_colors(&[black, black, white], 8, 8, 10.0);
/// let changes = scenecut::FrameScanner::new(&ScanOptions::new()).scan(&mut video)?;
/// assert_eq!(changes[0].frame_index, 3);
/// # Ok::<(), scenecut::SceneCutError>(())
/// ```
#[derive(Debug, Clone)]
pub struct FrameSequence {
    frames: Vec<RgbImage>,
    frames_per_second: f64,
    position: usize,
}

impl FrameSequence {
    /// Wrap already decoded frames.
    pub fn new(frames: Vec<RgbImage>, frames_per_second: f64) -> Self {
        Self {
            frames,
            frames_per_second,
            position: 0,
        }
    }

    /// Build a sequence of `width`×`height` frames, each filled with one
    /// RGB colour.
    pub fn from_solid_colors(
        colors: &[[u8; 3]],
        width: u32,
        height: u32,
        frames_per_second: f64,
    ) -> Self {
        let frames = colors
            .iter()
            .map(|&color| RgbImage::from_pixel(width, height, Rgb(color)))
            .collect();
        Self::new(frames, frames_per_second)
    }

    /// Number of frames in the sequence.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether the sequence has no frames.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl VideoSource for FrameSequence {
    fn frames_per_second(&self) -> f64 {
        self.frames_per_second
    }

    fn read_frame(&mut self) -> Option<Result<RgbImage, SceneCutError>> {
        let frame = self.frames.get(self.position)?.clone();
        self.position += 1;
        Some(Ok(frame))
    }

    fn seek_to_frame(&mut self, position: u64) -> Result<(), SceneCutError> {
        let total_frames = self.frames.len() as u64;
        if position >= total_frames {
            return Err(SceneCutError::FrameOutOfRange {
                frame_number: position,
                total_frames,
            });
        }
        self.position = position as usize;
        Ok(())
    }

    fn frame_count_hint(&self) -> Option<u64> {
        Some(self.frames.len() as u64)
    }
}
