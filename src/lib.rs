//! # scenecut
//!
//! Find abrupt scene changes in video files and render a captioned preview
//! still for each one.
//!
//! Detection is a single pass of consecutive-frame differencing: every frame
//! is reduced to 8-bit luma, compared with the frame before it, and reported
//! when the mean absolute difference exceeds a threshold. Decoding goes
//! through FFmpeg via the [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next)
//! crate; any other frame producer can plug in through [`VideoSource`].
//!
//! ## Quick Start
//!
//! ### Detect Scene Changes
//!
//! ```no_run
//! let changes = scenecut::scan_changes("input.mp4", 30.0)?;
//! for change in &changes {
//!     println!("frame {} at {:.2}s", change.frame_index, change.timestamp_seconds);
//! }
//! # Ok::<(), scenecut::SceneCutError>(())
//! ```
//!
//! ### Render Previews
//!
//! ```no_run
//! let changes = scenecut::scan_changes("input.mp4", 30.0)?;
//! for preview in scenecut::render_previews("input.mp4", &changes)? {
//!     if let Some(image) = preview.image() {
//!         std::fs::write(format!("{}.png", image.frame_index), &image.png)?;
//!     }
//! }
//! # Ok::<(), scenecut::SceneCutError>(())
//! ```
//!
//! ### Both in One Pass
//!
//! ```no_run
//! use scenecut::{AnalysisOptions, PreviewStrategy, ScanOptions};
//!
//! let options = AnalysisOptions::new()
//!     .with_scan(ScanOptions::new().with_threshold(25.0))
//!     .with_strategy(PreviewStrategy::SinglePass);
//! let report = scenecut::analyze("input.mp4", &options)?;
//! println!("{} changes", report.changes.len());
//! # Ok::<(), scenecut::SceneCutError>(())
//! ```
//!
//! ## Features
//!
//! - **Frame-difference detection** with a configurable threshold, an
//!   optional frame bound, progress callbacks and cooperative cancellation
//! - **Captioned previews** as PNG bytes, base64 or data URIs, always
//!   index-aligned with the detected changes
//! - **Pluggable sources**: FFmpeg-backed [`VideoReader`] or in-memory
//!   [`FrameSequence`]
//!
//! ### Optional Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `server` | Upload web front end built on axum (enabled by default) |
//! | `rayon` | Parallel PNG encoding for single-pass previews |
//! | `full` | Enables all of the above |
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on your system.

pub mod analysis;
mod caption;
pub mod configuration;
mod conversion;
pub mod error;
pub mod ffmpeg;
pub mod metadata;
pub mod preview;
pub mod progress;
pub mod reader;
pub mod scene;
#[cfg(feature = "server")]
pub mod server;
pub mod source;

pub use analysis::{
    SceneReport, analyze, analyze_source, render_previews, render_previews_with_options,
    scan_changes, scan_changes_with_options,
};
pub use configuration::{
    AnalysisOptions, DEFAULT_THRESHOLD, PreviewOptions, PreviewStrategy, ScanOptions,
};
pub use error::SceneCutError;
pub use ffmpeg::{FfmpegLogLevel, set_ffmpeg_log_level};
pub use metadata::VideoMetadata;
pub use preview::{Preview, PreviewImage, PreviewRenderer, caption_for};
pub use progress::{CancellationToken, OperationType, ProgressCallback, ProgressInfo};
pub use reader::VideoReader;
pub use scene::{FrameScanner, SceneChange, mean_absolute_difference, to_grayscale};
pub use source::{FrameSequence, VideoSource};
