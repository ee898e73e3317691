//! Preview stills for detected scene changes.
//!
//! Each [`SceneChange`] becomes one PNG: the flagged frame with a white title
//! band above it carrying `Scene Change at Frame N (T.TT seconds)`. No border
//! or other decoration is added around the frame itself.
//!
//! The renderer always returns one [`Preview`] per change, in input order. A
//! frame that cannot be read or encoded is represented by
//! [`Preview::Unavailable`] so the two lists stay index-aligned.
//!
//! # Example
//!
//! ```no_run
//! use scenecut::{FrameScanner, PreviewOptions, PreviewRenderer, ScanOptions, VideoReader};
//!
//! let mut reader = VideoReader::open("input.mp4")?;
//! let changes = FrameScanner::new(&ScanOptions::new()).scan(&mut reader)?;
//!
//! let options = PreviewOptions::new().with_max_dimension(480);
//! for preview in PreviewRenderer::new(&options).render(&mut reader, &changes)? {
//!     if let Some(image) = preview.image() {
//!         std::fs::write(format!("change_{}.png", image.frame_index), &image.png)?;
//!     }
//! }
//! # Ok::<(), scenecut::SceneCutError>(())
//! ```

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    io::Cursor,
    sync::Arc,
};

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use image::{
    ImageFormat, Rgb, RgbImage,
    imageops::{self, FilterType},
};

use crate::{
    caption,
    configuration::PreviewOptions,
    error::SceneCutError,
    progress::{CancellationToken, NoOpProgress, OperationType, ProgressCallback, ProgressTracker},
    scene::SceneChange,
    source::VideoSource,
};

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
/// Space around the caption, in glyph pixels.
const CAPTION_MARGIN: u32 = 3;

/// An encoded preview still.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewImage {
    /// Frame index of the change this preview belongs to.
    pub frame_index: u64,
    /// Timestamp of that change in seconds.
    pub timestamp_seconds: f64,
    /// The caption burned into the image.
    pub caption: String,
    /// Width of the encoded image in pixels.
    pub width: u32,
    /// Height of the encoded image in pixels, caption band included.
    pub height: u32,
    /// PNG bytes.
    pub png: Vec<u8>,
}

impl PreviewImage {
    /// The PNG bytes as standard base64.
    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.png)
    }

    /// A `data:image/png;base64,...` URI for inline embedding.
    pub fn data_uri(&self) -> String {
        format!("data:image/png;base64,{}", self.to_base64())
    }
}

/// The preview slot for one scene change.
#[derive(Debug, Clone, PartialEq)]
pub enum Preview {
    /// The frame was decoded and encoded.
    Rendered(PreviewImage),
    /// The frame could not be produced.
    Unavailable {
        /// Frame index of the change.
        frame_index: u64,
        /// Timestamp of the change in seconds.
        timestamp_seconds: f64,
        /// Why no image is available.
        reason: String,
    },
}

impl Preview {
    /// The image, if one was rendered.
    pub fn image(&self) -> Option<&PreviewImage> {
        match self {
            Preview::Rendered(image) => Some(image),
            Preview::Unavailable { .. } => None,
        }
    }

    /// Frame index of the change this slot belongs to.
    pub fn frame_index(&self) -> u64 {
        match self {
            Preview::Rendered(image) => image.frame_index,
            Preview::Unavailable { frame_index, .. } => *frame_index,
        }
    }

    /// Whether an image was rendered.
    pub fn is_rendered(&self) -> bool {
        matches!(self, Preview::Rendered(_))
    }

    fn unavailable(change: &SceneChange, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        log::warn!("No preview for frame {}: {}", change.frame_index, reason);
        Preview::Unavailable {
            frame_index: change.frame_index,
            timestamp_seconds: change.timestamp_seconds,
            reason,
        }
    }
}

/// Caption text for a change: `Scene Change at Frame N (T.TT seconds)`.
pub fn caption_for(change: &SceneChange) -> String {
    format!(
        "Scene Change at Frame {} ({:.2} seconds)",
        change.frame_index, change.timestamp_seconds
    )
}

/// Renders preview stills for a list of scene changes.
#[derive(Clone)]
pub struct PreviewRenderer<'a> {
    options: &'a PreviewOptions,
    progress: Arc<dyn ProgressCallback>,
    cancellation: Option<CancellationToken>,
}

impl Debug for PreviewRenderer<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("PreviewRenderer")
            .field("options", self.options)
            .field("has_cancellation", &self.cancellation.is_some())
            .finish_non_exhaustive()
    }
}

impl<'a> PreviewRenderer<'a> {
    /// Create a renderer with the given options.
    pub fn new(options: &'a PreviewOptions) -> Self {
        Self {
            options,
            progress: Arc::new(NoOpProgress),
            cancellation: None,
        }
    }

    /// Report one progress step per rendered preview.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Stop between previews once `token` is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Seek to each change in `source`, decode its frame and render it.
    ///
    /// The result has exactly one entry per change, in the same order.
    ///
    /// # Errors
    ///
    /// Only [`SceneCutError::Cancelled`]. Per-frame failures become
    /// [`Preview::Unavailable`].
    pub fn render<S: VideoSource + ?Sized>(
        &self,
        source: &mut S,
        changes: &[SceneChange],
    ) -> Result<Vec<Preview>, SceneCutError> {
        let mut tracker = self.tracker(changes.len());
        let mut previews = Vec::with_capacity(changes.len());

        for change in changes {
            self.check_cancelled()?;

            let preview = match read_frame_at(source, change.frame_index) {
                Ok(frame) => self.render_or_placeholder(&frame, change),
                Err(reason) => Preview::unavailable(change, reason),
            };
            previews.push(preview);
            tracker.advance(changes.len());
        }

        tracker.finish(changes.len());
        Ok(previews)
    }

    /// Render frames that were captured during the scan, in order.
    ///
    /// # Errors
    ///
    /// Only [`SceneCutError::Cancelled`].
    pub fn render_captured(
        &self,
        captured: Vec<(SceneChange, RgbImage)>,
    ) -> Result<Vec<Preview>, SceneCutError> {
        self.check_cancelled()?;
        let total = captured.len();
        let mut tracker = self.tracker(total);

        #[cfg(feature = "rayon")]
        let previews = {
            use std::sync::atomic::{AtomicU64, Ordering};

            use rayon::iter::{IntoParallelIterator, ParallelIterator};

            let completed = AtomicU64::new(0);
            let previews: Result<Vec<Preview>, SceneCutError> = captured
                .into_par_iter()
                .map(|(change, frame)| {
                    self.check_cancelled()?;
                    let preview = self.render_or_placeholder(&frame, &change);
                    completed.fetch_add(1, Ordering::Relaxed);
                    Ok(preview)
                })
                .collect();
            tracker.set_current(completed.into_inner());
            previews?
        };

        #[cfg(not(feature = "rayon"))]
        let previews = {
            let mut previews = Vec::with_capacity(total);
            for (change, frame) in captured {
                self.check_cancelled()?;
                previews.push(self.render_or_placeholder(&frame, &change));
                tracker.advance(total);
            }
            previews
        };

        tracker.finish(total);
        Ok(previews)
    }

    /// Annotate and encode a single frame.
    ///
    /// # Errors
    ///
    /// [`SceneCutError::ImageError`] if PNG encoding fails.
    pub fn render_frame(
        &self,
        frame: &RgbImage,
        change: &SceneChange,
    ) -> Result<PreviewImage, SceneCutError> {
        let caption = caption_for(change);

        let resized;
        let frame = match self.options.max_dimension {
            Some(max_dimension) if frame.width().max(frame.height()) > max_dimension => {
                let (width, height) =
                    fit_dimensions(frame.width(), frame.height(), max_dimension);
                resized = imageops::resize(frame, width, height, FilterType::Triangle);
                &resized
            }
            _ => frame,
        };

        let canvas = compose(frame, &caption, self.options.caption_scale);
        let png = encode_png(&canvas)?;

        Ok(PreviewImage {
            frame_index: change.frame_index,
            timestamp_seconds: change.timestamp_seconds,
            caption,
            width: canvas.width(),
            height: canvas.height(),
            png,
        })
    }

    fn render_or_placeholder(&self, frame: &RgbImage, change: &SceneChange) -> Preview {
        match self.render_frame(frame, change) {
            Ok(image) => Preview::Rendered(image),
            Err(error) => Preview::unavailable(change, error.to_string()),
        }
    }

    fn tracker(&self, total: usize) -> ProgressTracker {
        ProgressTracker::new(
            self.progress.clone(),
            OperationType::PreviewRendering,
            Some(total as u64),
            1,
        )
    }

    fn check_cancelled(&self) -> Result<(), SceneCutError> {
        match &self.cancellation {
            Some(token) if token.is_cancelled() => Err(SceneCutError::Cancelled),
            _ => Ok(()),
        }
    }
}

/// Seek to a 1-based frame index and decode it.
fn read_frame_at<S: VideoSource + ?Sized>(
    source: &mut S,
    frame_index: u64,
) -> Result<RgbImage, String> {
    let position = frame_index
        .checked_sub(1)
        .ok_or_else(|| "frame indices start at 1".to_string())?;
    source
        .seek_to_frame(position)
        .map_err(|error| error.to_string())?;
    match source.read_frame() {
        Some(Ok(frame)) => Ok(frame),
        Some(Err(error)) => Err(error.to_string()),
        None => Err(format!("frame {frame_index} is past the end of the video")),
    }
}

/// Put `caption` in a white band above `frame`.
///
/// The canvas is widened when the caption does not fit the frame width.
fn compose(frame: &RgbImage, caption: &str, caption_scale: Option<u32>) -> RgbImage {
    let scale = caption_scale
        .unwrap_or_else(|| caption::fit_scale(caption, frame.width(), CAPTION_MARGIN));
    let padding = CAPTION_MARGIN * scale;
    let text_width = caption::text_width(caption, scale);
    let band_height = caption::text_height(scale) + 2 * padding;

    let width = frame.width().max(text_width + 2 * padding);
    let mut canvas = RgbImage::from_pixel(width, frame.height() + band_height, WHITE);

    let text_x = (width - text_width) / 2;
    caption::draw_text(&mut canvas, text_x as i32, padding as i32, caption, scale, BLACK);

    let frame_x = (width - frame.width()) / 2;
    imageops::replace(&mut canvas, frame, frame_x as i64, band_height as i64);
    canvas
}

fn encode_png(image: &RgbImage) -> Result<Vec<u8>, SceneCutError> {
    let mut png = Vec::new();
    image.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    Ok(png)
}

/// Dimensions that fit within `max_dimension`, preserving aspect ratio.
fn fit_dimensions(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    let scale = max_dimension as f64 / width.max(height).max(1) as f64;
    let new_width = (width as f64 * scale).round() as u32;
    let new_height = (height as f64 * scale).round() as u32;
    (new_width.max(1), new_height.max(1))
}
