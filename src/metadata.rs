//! Video stream metadata.
//!
//! [`VideoMetadata`] is read once when a [`VideoReader`](crate::VideoReader)
//! opens a file and cached for the reader's lifetime.

use std::time::Duration;

use serde::Serialize;

/// Metadata for the selected video stream of a file.
///
/// # Example
///
/// ```no_run
/// use scenecut::VideoReader;
///
/// let reader = VideoReader::open("input.mp4")?;
/// let metadata = reader.metadata();
/// println!("{}x{} @ {:.2} fps", metadata.width, metadata.height, metadata.frames_per_second);
/// # Ok::<(), scenecut::SceneCutError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[must_use]
pub struct VideoMetadata {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Frames per second as reported by the container. `0.0` when the
    /// container does not declare a rate.
    pub frames_per_second: f64,
    /// Frame count declared by the container, or estimated from duration
    /// and frame rate. Zero when neither is known.
    pub frame_count: u64,
    /// Total container duration.
    #[serde(serialize_with = "serialize_seconds")]
    pub duration: Duration,
    /// Codec name (e.g. `"h264"`, `"vp9"`).
    pub codec: String,
    /// Container format name (e.g. `"mov,mp4,m4a,3gp,3g2,mj2"`, `"matroska,webm"`).
    pub format: String,
}

fn serialize_seconds<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_f64(duration.as_secs_f64())
}
