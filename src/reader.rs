//! FFmpeg-backed [`VideoSource`].
//!
//! [`VideoReader`] opens a file, selects the best video stream, and decodes
//! frames on demand, converting whatever pixel format the codec produces to
//! packed RGB24. Seeking jumps to the nearest keyframe before the target and
//! decodes forward, discarding frames until the target is reached.
//!
//! The demuxer and decoder are owned by the reader and released when it is
//! dropped, so every exit path (including `?` early returns) closes the file.

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    time::Duration,
};

use ffmpeg_next::{
    Error as FfmpegError, Packet, Rational,
    codec::context::Context as CodecContext,
    decoder::Video as VideoDecoder,
    format::{Pixel, context::Input},
    frame::Video as VideoFrame,
    media::Type,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};
use image::RgbImage;

use crate::{
    conversion::{
        frame_position_to_seek_timestamp, frame_to_buffer, pts_to_frame_position, pts_to_seconds,
        rational_to_fps,
    },
    error::SceneCutError,
    metadata::VideoMetadata,
    source::VideoSource,
};

/// Sentinel FFmpeg uses for "no timestamp".
const NO_PTS: i64 = i64::MIN;

/// Cached swscale context plus the input geometry it was built for.
struct Scaler {
    context: ScalingContext,
    format: Pixel,
    width: u32,
    height: u32,
}

/// An opened video file that yields decoded RGB frames.
///
/// # Example
///
/// ```no_run
/// use scenecut::{VideoReader, VideoSource};
///
/// let mut reader = VideoReader::open("input.mp4")?;
/// reader.seek_to_frame(120)?;
/// if let Some(frame) = reader.read_frame() {
///     frame?.save("frame_121.png")?;
/// }
/// # Ok::<(), scenecut::SceneCutError>(())
/// ```
pub struct VideoReader {
    input_context: Input,
    decoder: VideoDecoder,
    scaler: Option<Scaler>,
    video_stream_index: usize,
    time_base: Rational,
    /// Stream start time in stream time base; frame positions are relative to it.
    start_pts: i64,
    metadata: VideoMetadata,
    file_path: PathBuf,
    decoded_frame: VideoFrame,
    rgb_frame: VideoFrame,
    /// After a seek, decoded frames before this position are dropped.
    skip_before: Option<u64>,
    /// Position of the last frame dropped while seeking.
    last_skipped: Option<u64>,
    eof_sent: bool,
    done: bool,
}

impl Debug for VideoReader {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("VideoReader")
            .field("file_path", &self.file_path)
            .field("metadata", &self.metadata)
            .field("video_stream_index", &self.video_stream_index)
            .field("eof_sent", &self.eof_sent)
            .finish_non_exhaustive()
    }
}

impl VideoReader {
    /// Open a video file.
    ///
    /// Initialises FFmpeg (idempotent), opens the container, picks the best
    /// video stream and creates its decoder.
    ///
    /// # Errors
    ///
    /// - [`SceneCutError::FileOpen`] if the file is missing, unreadable, or
    ///   its codec has no decoder.
    /// - [`SceneCutError::NoVideoStream`] if the container has no video.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SceneCutError> {
        let path = path.as_ref();
        let file_path = path.to_path_buf();

        log::debug!("Opening video file: {}", file_path.display());

        crate::ffmpeg::initialize().map_err(|error| SceneCutError::FileOpen {
            path: file_path.clone(),
            reason: format!("FFmpeg initialisation failed: {error}"),
        })?;

        let input_context =
            ffmpeg_next::format::input(&path).map_err(|error| SceneCutError::FileOpen {
                path: file_path.clone(),
                reason: error.to_string(),
            })?;

        let duration_microseconds = input_context.duration();
        let duration = if duration_microseconds > 0 {
            Duration::from_micros(duration_microseconds as u64)
        } else {
            Duration::ZERO
        };
        let format = input_context.format().name().to_string();

        let (video_stream_index, time_base, start_pts, declared_frames, frames_per_second, decoder) = {
            let stream = input_context
                .streams()
                .best(Type::Video)
                .ok_or(SceneCutError::NoVideoStream)?;

            let frames_per_second = match rational_to_fps(stream.avg_frame_rate()) {
                fps if fps > 0.0 => fps,
                _ => rational_to_fps(stream.rate()),
            };

            let index = stream.index();
            let decoder_context = CodecContext::from_parameters(stream.parameters())
                .map_err(|error| SceneCutError::FileOpen {
                    path: file_path.clone(),
                    reason: format!("Failed to read codec parameters for stream {index}: {error}"),
                })?;
            let decoder =
                decoder_context
                    .decoder()
                    .video()
                    .map_err(|error| SceneCutError::FileOpen {
                        path: file_path.clone(),
                        reason: format!("Failed to create video decoder for stream {index}: {error}"),
                    })?;

            let start_pts = match stream.start_time() {
                NO_PTS => 0,
                value => value,
            };

            (
                index,
                stream.time_base(),
                start_pts,
                stream.frames(),
                frames_per_second,
                decoder,
            )
        };

        let frame_count = if declared_frames > 0 {
            declared_frames as u64
        } else if frames_per_second > 0.0 {
            (duration.as_secs_f64() * frames_per_second) as u64
        } else {
            0
        };

        let codec = decoder
            .codec()
            .map(|codec| codec.name().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        let metadata = VideoMetadata {
            width: decoder.width(),
            height: decoder.height(),
            frames_per_second,
            frame_count,
            duration,
            codec,
            format,
        };

        log::info!(
            "Opened video file: {} ({}x{}, {:.2} fps, ~{} frames, codec={}, format={})",
            file_path.display(),
            metadata.width,
            metadata.height,
            metadata.frames_per_second,
            metadata.frame_count,
            metadata.codec,
            metadata.format,
        );

        Ok(Self {
            input_context,
            decoder,
            scaler: None,
            video_stream_index,
            time_base,
            start_pts,
            metadata,
            file_path,
            decoded_frame: VideoFrame::empty(),
            rgb_frame: VideoFrame::empty(),
            skip_before: None,
            last_skipped: None,
            eof_sent: false,
            done: false,
        })
    }

    /// Metadata of the selected video stream.
    pub fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    /// Path the reader was opened from.
    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Zero-based position of the frame currently in `decoded_frame`,
    /// from its timestamp.
    fn timestamp_position(&self) -> Option<u64> {
        let pts = self
            .decoded_frame
            .timestamp()
            .or_else(|| self.decoded_frame.pts())?;
        Some(pts_to_frame_position(
            pts.saturating_sub(self.start_pts),
            self.time_base,
            self.metadata.frames_per_second,
        ))
    }

    /// Convert the current `decoded_frame` to an RGB image at the stream's
    /// nominal resolution.
    fn convert_current_frame(&mut self) -> Result<RgbImage, SceneCutError> {
        let format = self.decoded_frame.format();
        let width = self.decoded_frame.width();
        let height = self.decoded_frame.height();

        if width == 0 || height == 0 {
            return Err(SceneCutError::VideoDecodeError(
                "Decoder produced an empty frame".to_string(),
            ));
        }

        // Some codecs only report their dimensions once the first frame is out.
        if self.metadata.width == 0 || self.metadata.height == 0 {
            self.metadata.width = width;
            self.metadata.height = height;
        }
        let output_width = self.metadata.width;
        let output_height = self.metadata.height;

        let stale = self.scaler.as_ref().is_none_or(|scaler| {
            scaler.format != format || scaler.width != width || scaler.height != height
        });
        if stale {
            let context = ScalingContext::get(
                format,
                width,
                height,
                Pixel::RGB24,
                output_width,
                output_height,
                ScalingFlags::BILINEAR,
            )?;
            self.scaler = Some(Scaler {
                context,
                format,
                width,
                height,
            });
        }

        if let Some(scaler) = self.scaler.as_mut() {
            scaler.context.run(&self.decoded_frame, &mut self.rgb_frame)?;
        }

        let buffer = frame_to_buffer(&self.rgb_frame, output_width, output_height, 3);
        RgbImage::from_raw(output_width, output_height, buffer).ok_or_else(|| {
            SceneCutError::VideoDecodeError(
                "Failed to construct RGB image from decoded frame data".to_string(),
            )
        })
    }
}

impl VideoSource for VideoReader {
    fn frames_per_second(&self) -> f64 {
        self.metadata.frames_per_second
    }

    fn read_frame(&mut self) -> Option<Result<RgbImage, SceneCutError>> {
        if self.done {
            return None;
        }

        loop {
            if self.decoder.receive_frame(&mut self.decoded_frame).is_ok() {
                if let Some(target) = self.skip_before {
                    let position = self.timestamp_position();
                    match seek_step(position, self.last_skipped, target) {
                        SeekStep::Skip(position) => {
                            self.last_skipped = Some(position);
                            continue;
                        }
                        SeekStep::Deliver => {
                            self.skip_before = None;
                            self.last_skipped = None;
                        }
                        SeekStep::Lost => {
                            self.skip_before = None;
                            self.last_skipped = None;
                            log::warn!(
                                "Cannot locate frame position {} in {}: decoded frame has no timestamp",
                                target,
                                self.file_path.display()
                            );
                            return Some(Err(SceneCutError::VideoDecodeError(format!(
                                "cannot locate frame position {target}: decoded frame has no timestamp"
                            ))));
                        }
                    }
                }
                return Some(self.convert_current_frame());
            }

            if self.eof_sent {
                self.done = true;
                return None;
            }

            let mut packet = Packet::empty();
            match packet.read(&mut self.input_context) {
                Ok(()) => {
                    if packet.stream() != self.video_stream_index {
                        continue;
                    }
                    if let Err(error) = self.decoder.send_packet(&packet) {
                        return Some(Err(SceneCutError::VideoDecodeError(error.to_string())));
                    }
                }
                Err(FfmpegError::Eof) => {
                    if let Err(error) = self.decoder.send_eof() {
                        self.done = true;
                        return Some(Err(SceneCutError::from(error)));
                    }
                    self.eof_sent = true;
                }
                Err(error) => {
                    self.done = true;
                    return Some(Err(SceneCutError::VideoDecodeError(format!(
                        "Failed to read packet: {error}"
                    ))));
                }
            }
        }
    }

    fn seek_to_frame(&mut self, position: u64) -> Result<(), SceneCutError> {
        let frames_per_second = self.metadata.frames_per_second;
        if !(frames_per_second.is_finite() && frames_per_second > 0.0) {
            return Err(SceneCutError::ZeroFrameRate {
                frame_index: position + 1,
            });
        }

        let start_offset =
            (pts_to_seconds(self.start_pts, self.time_base) * 1_000_000.0) as i64;
        let target = frame_position_to_seek_timestamp(position, frames_per_second) + start_offset;

        log::debug!(
            "Seeking {} to frame position {} (t={}us)",
            self.file_path.display(),
            position,
            target
        );

        self.input_context.seek(target, ..target)?;
        self.decoder.flush();
        self.skip_before = Some(position);
        self.last_skipped = None;
        self.eof_sent = false;
        self.done = false;
        Ok(())
    }

    fn frame_count_hint(&self) -> Option<u64> {
        Some(self.metadata.frame_count).filter(|&count| count > 0)
    }
}

impl Drop for VideoReader {
    fn drop(&mut self) {
        log::debug!("Closing video file: {}", self.file_path.display());
    }
}

/// What to do with a frame decoded while seeking.
#[derive(Debug, PartialEq, Eq)]
enum SeekStep {
    /// Before the target; drop it. Carries its position.
    Skip(u64),
    /// At or past the target.
    Deliver,
    /// Position unknown, so the target cannot be found.
    Lost,
}

/// Decide on a decoded frame while seeking to `target`.
///
/// A frame without a timestamp is placed one past the previously dropped
/// frame. The first frame after the seek must carry a timestamp, since the
/// keyframe the demuxer landed on is otherwise unknown.
fn seek_step(
    timestamp_position: Option<u64>,
    last_skipped: Option<u64>,
    target: u64,
) -> SeekStep {
    match timestamp_position.or_else(|| last_skipped.map(|position| position + 1)) {
        Some(position) if position < target => SeekStep::Skip(position),
        Some(_) => SeekStep::Deliver,
        None => SeekStep::Lost,
    }
}
