//! Error types for the `scenecut` crate.
//!
//! This module defines [`SceneCutError`], the unified error type returned by
//! all fallible library operations. Variants carry file paths, frame indices,
//! and upstream error messages so callers can report a failure without extra
//! logging at the call site.

use std::{io::Error as IoError, path::PathBuf};

use ffmpeg_next::Error as FfmpegError;
use image::ImageError;
use thiserror::Error;

/// The unified error type for all `scenecut` operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SceneCutError {
    /// The video file could not be opened (missing, corrupt header,
    /// unsupported container or codec).
    #[error("Failed to open video file at {path}: {reason}")]
    FileOpen {
        /// Path that was passed to [`crate::VideoReader::open`].
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The file does not contain a video stream.
    #[error("No video stream found in file")]
    NoVideoStream,

    /// A video frame could not be decoded.
    #[error("Failed to decode video frame: {0}")]
    VideoDecodeError(String),

    /// Two consecutive frames have different dimensions and cannot be
    /// compared pixel by pixel.
    #[error(
        "Frame {frame_index} is {actual_width}x{actual_height}, expected {expected_width}x{expected_height}"
    )]
    FrameSizeMismatch {
        /// 1-based index of the offending frame.
        frame_index: u64,
        /// Width of the previous frame.
        expected_width: u32,
        /// Height of the previous frame.
        expected_height: u32,
        /// Width of the offending frame.
        actual_width: u32,
        /// Height of the offending frame.
        actual_height: u32,
    },

    /// The source reports a frame rate of zero (or a non-finite rate), so
    /// the timestamp of a detected change cannot be computed.
    #[error("Video reports no usable frame rate; cannot timestamp frame {frame_index}")]
    ZeroFrameRate {
        /// The first change whose timestamp could not be computed.
        frame_index: u64,
    },

    /// The detection threshold is negative, NaN, or infinite.
    #[error("Invalid threshold {0}: must be a finite, non-negative number")]
    InvalidThreshold(f64),

    /// A seek targeted a frame past the end of the source.
    #[error("Frame {frame_number} is out of range (video has {total_frames} frames)")]
    FrameOutOfRange {
        /// The zero-based frame position that was requested.
        frame_number: u64,
        /// The total number of frames in the source.
        total_frames: u64,
    },

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    /// An error from the `image` crate during conversion or PNG encoding.
    #[error("Image processing error: {0}")]
    ImageError(#[from] ImageError),

    /// The operation was cancelled via a [`CancellationToken`](crate::CancellationToken).
    #[error("Operation cancelled")]
    Cancelled,
}

impl From<FfmpegError> for SceneCutError {
    fn from(error: FfmpegError) -> Self {
        SceneCutError::FfmpegError(error.to_string())
    }
}
