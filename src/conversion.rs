//! Internal conversion helpers.
//!
//! Pixel-plane copying and the arithmetic between presentation timestamps,
//! frame positions, and FFmpeg seek targets.

use ffmpeg_next::{Rational, frame::Video as VideoFrame};

/// Copy the first plane of a packed video frame into a tightly-packed buffer.
///
/// FFmpeg rows often carry padding (stride > width × bytes per pixel); the
/// padding is dropped so the result can go straight into
/// [`image::RgbImage::from_raw`].
pub(crate) fn frame_to_buffer(
    video_frame: &VideoFrame,
    width: u32,
    height: u32,
    bytes_per_pixel: usize,
) -> Vec<u8> {
    let stride = video_frame.stride(0);
    let row_length = (width as usize) * bytes_per_pixel;
    let data = video_frame.data(0);

    if stride == row_length {
        data[..row_length * (height as usize)].to_vec()
    } else {
        let mut buffer = Vec::with_capacity(row_length * (height as usize));
        for row in 0..(height as usize) {
            let row_start = row * stride;
            buffer.extend_from_slice(&data[row_start..row_start + row_length]);
        }
        buffer
    }
}

/// Rescale a PTS value from the stream time base to seconds.
pub(crate) fn pts_to_seconds(pts: i64, time_base: Rational) -> f64 {
    pts as f64 * time_base.numerator() as f64 / time_base.denominator() as f64
}

/// Map a PTS value to a zero-based frame position.
///
/// Rounds to the nearest frame so that rational time bases which do not
/// divide evenly (e.g. 1/90000 at 29.97 fps) still land on whole frames.
pub(crate) fn pts_to_frame_position(pts: i64, time_base: Rational, frames_per_second: f64) -> u64 {
    let position = pts_to_seconds(pts, time_base) * frames_per_second;
    if position.is_finite() && position > 0.0 {
        position.round() as u64
    } else {
        0
    }
}

/// Convert a zero-based frame position to a container seek target in
/// `AV_TIME_BASE` units (microseconds), as expected by `Input::seek`.
pub(crate) fn frame_position_to_seek_timestamp(position: u64, frames_per_second: f64) -> i64 {
    let seconds = position as f64 / frames_per_second;
    (seconds * 1_000_000.0) as i64
}

/// Elapsed time in seconds for a 1-based frame index.
///
/// Returns `None` when the frame rate is zero, negative, or not finite.
pub(crate) fn frame_index_to_seconds(frame_index: u64, frames_per_second: f64) -> Option<f64> {
    if frames_per_second.is_finite() && frames_per_second > 0.0 {
        Some(frame_index as f64 / frames_per_second)
    } else {
        None
    }
}

/// Frame rate of a stream as a float, or `0.0` when the rational is undefined.
pub(crate) fn rational_to_fps(rate: Rational) -> f64 {
    if rate.denominator() != 0 && rate.numerator() > 0 {
        rate.numerator() as f64 / rate.denominator() as f64
    } else {
        0.0
    }
}
