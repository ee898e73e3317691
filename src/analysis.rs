//! Path-based entry points.
//!
//! Each function opens its own [`VideoReader`], runs to completion, and drops
//! the reader before returning, so the file handle never outlives the call.

use std::path::Path;

use crate::{
    configuration::{AnalysisOptions, PreviewOptions, PreviewStrategy, ScanOptions},
    error::SceneCutError,
    metadata::VideoMetadata,
    preview::{Preview, PreviewRenderer},
    reader::VideoReader,
    scene::{FrameScanner, SceneChange},
    source::VideoSource,
};

/// Scene changes plus previews for one video.
#[derive(Debug, Clone)]
pub struct SceneReport {
    /// Metadata of the analysed stream.
    pub metadata: VideoMetadata,
    /// Detected changes in frame order.
    pub changes: Vec<SceneChange>,
    /// One preview per change, same order.
    pub previews: Vec<Preview>,
}

impl SceneReport {
    /// Frame indices of all changes.
    pub fn frames(&self) -> Vec<u64> {
        self.changes.iter().map(|change| change.frame_index).collect()
    }

    /// Timestamps of all changes, in seconds.
    pub fn timestamps(&self) -> Vec<f64> {
        self.changes
            .iter()
            .map(|change| change.timestamp_seconds)
            .collect()
    }

    /// Changes paired with their previews.
    pub fn entries(&self) -> impl Iterator<Item = (&SceneChange, &Preview)> {
        self.changes.iter().zip(&self.previews)
    }
}

/// Detect scene changes in the video at `path`.
///
/// # Errors
///
/// [`SceneCutError::FileOpen`] or [`SceneCutError::NoVideoStream`] when the
/// file cannot be read as video, plus everything
/// [`FrameScanner::scan`] returns. A video with zero or one decodable frame
/// yields `Ok` with no changes.
///
/// # Example
///
/// ```no_run
/// let changes = scenecut::scan_changes("input.mp4", 30.0)?;
/// println!("{} scene changes", changes.len());
/// # Ok::<(), scenecut::SceneCutError>(())
/// ```
pub fn scan_changes<P: AsRef<Path>>(
    path: P,
    threshold: f64,
) -> Result<Vec<SceneChange>, SceneCutError> {
    scan_changes_with_options(path, &ScanOptions::new().with_threshold(threshold))
}

/// Like [`scan_changes`], with full [`ScanOptions`].
pub fn scan_changes_with_options<P: AsRef<Path>>(
    path: P,
    options: &ScanOptions,
) -> Result<Vec<SceneChange>, SceneCutError> {
    options.validate()?;
    let mut reader = VideoReader::open(path)?;
    FrameScanner::new(options).scan(&mut reader)
}

/// Render one preview per change from the video at `path`.
///
/// Returns an empty list without touching the file when `changes` is empty.
///
/// # Errors
///
/// [`SceneCutError::FileOpen`] or [`SceneCutError::NoVideoStream`] when the
/// file cannot be opened. Per-frame failures become
/// [`Preview::Unavailable`].
pub fn render_previews<P: AsRef<Path>>(
    path: P,
    changes: &[SceneChange],
) -> Result<Vec<Preview>, SceneCutError> {
    render_previews_with_options(path, changes, &PreviewOptions::new())
}

/// Like [`render_previews`], with [`PreviewOptions`].
pub fn render_previews_with_options<P: AsRef<Path>>(
    path: P,
    changes: &[SceneChange],
    options: &PreviewOptions,
) -> Result<Vec<Preview>, SceneCutError> {
    if changes.is_empty() {
        return Ok(Vec::new());
    }
    let mut reader = VideoReader::open(path)?;
    PreviewRenderer::new(options).render(&mut reader, changes)
}

/// Scan the video at `path` and render previews, opening the file once.
///
/// # Example
///
/// ```no_run
/// use scenecut::AnalysisOptions;
///
/// let report = scenecut::analyze("input.mp4", &AnalysisOptions::new())?;
/// for (change, preview) in report.entries() {
///     println!("{:.2}s rendered={}", change.timestamp_seconds, preview.is_rendered());
/// }
/// # Ok::<(), scenecut::SceneCutError>(())
/// ```
pub fn analyze<P: AsRef<Path>>(
    path: P,
    options: &AnalysisOptions,
) -> Result<SceneReport, SceneCutError> {
    options.scan.validate()?;
    let mut reader = VideoReader::open(path)?;
    let (changes, previews) = analyze_source(&mut reader, options)?;

    Ok(SceneReport {
        metadata: reader.metadata().clone(),
        changes,
        previews,
    })
}

/// Scan any [`VideoSource`] and render previews for what was found.
///
/// With [`PreviewStrategy::Seek`] the source is rewound once per change;
/// with [`PreviewStrategy::SinglePass`] flagged frames are kept during the
/// scan instead.
pub fn analyze_source<S: VideoSource + ?Sized>(
    source: &mut S,
    options: &AnalysisOptions,
) -> Result<(Vec<SceneChange>, Vec<Preview>), SceneCutError> {
    let scanner = FrameScanner::new(&options.scan);

    let mut renderer =
        PreviewRenderer::new(&options.preview).with_progress(options.scan.progress.clone());
    if let Some(token) = &options.scan.cancellation {
        renderer = renderer.with_cancellation(token.clone());
    }

    match options.strategy {
        PreviewStrategy::Seek => {
            let changes = scanner.scan(source)?;
            let previews = renderer.render(source, &changes)?;
            Ok((changes, previews))
        }
        PreviewStrategy::SinglePass => {
            let captured = scanner.scan_capturing(source)?;
            let changes = captured.iter().map(|(change, _)| *change).collect();
            let previews = renderer.render_captured(captured)?;
            Ok((changes, previews))
        }
    }
}
