//! Preview rendering integration tests.

use std::sync::{Arc, Mutex};

use image::{ImageFormat, Rgb, RgbImage};
use scenecut::{
    AnalysisOptions, CancellationToken, FrameScanner, FrameSequence, OperationType, Preview,
    PreviewOptions, PreviewRenderer, PreviewStrategy, ProgressCallback, ProgressInfo,
    ScanOptions, SceneChange, SceneCutError, caption_for,
};

const RED: [u8; 3] = [220, 20, 20];
const GREEN: [u8; 3] = [20, 220, 20];
const BLUE: [u8; 3] = [20, 20, 220];
const BLACK: [u8; 3] = [0, 0, 0];

fn video() -> FrameSequence {
    FrameSequence::from_solid_colors(&[BLACK, RED, RED, GREEN, BLUE, BLUE], 64, 36, 10.0)
}

fn changes_of(source: &mut FrameSequence) -> Vec<SceneChange> {
    FrameScanner::new(&ScanOptions::new()).scan(source).unwrap()
}

fn decode(png: &[u8]) -> RgbImage {
    image::load_from_memory_with_format(png, ImageFormat::Png)
        .expect("valid PNG")
        .to_rgb8()
}

/// Colour at the bottom centre of a preview, which lies inside the frame.
fn frame_color(png: &[u8]) -> [u8; 3] {
    let image = decode(png);
    image.get_pixel(image.width() / 2, image.height() - 1).0
}

fn fake_change(frame_index: u64) -> SceneChange {
    SceneChange {
        frame_index,
        timestamp_seconds: frame_index as f64 / 10.0,
        score: 99.0,
    }
}

#[test]
fn one_preview_per_change_in_order() {
    let mut source = video();
    let changes = changes_of(&mut source);
    assert_eq!(
        changes.iter().map(|c| c.frame_index).collect::<Vec<_>>(),
        vec![2, 4, 5]
    );

    let options = PreviewOptions::new();
    let previews = PreviewRenderer::new(&options)
        .render(&mut source, &changes)
        .unwrap();

    assert_eq!(previews.len(), changes.len());
    for (change, preview) in changes.iter().zip(&previews) {
        assert_eq!(preview.frame_index(), change.frame_index);
        assert!(preview.is_rendered());
    }
}

#[test]
fn previews_show_the_flagged_frame() {
    let mut source = video();
    let changes = changes_of(&mut source);
    let options = PreviewOptions::new();
    let previews = PreviewRenderer::new(&options)
        .render(&mut source, &changes)
        .unwrap();

    let colors: Vec<[u8; 3]> = previews
        .iter()
        .map(|preview| frame_color(&preview.image().unwrap().png))
        .collect();
    assert_eq!(colors, vec![RED, GREEN, BLUE]);
}

#[test]
fn preview_carries_caption_and_dimensions() {
    let mut source = video();
    let changes = changes_of(&mut source);
    let options = PreviewOptions::new();
    let previews = PreviewRenderer::new(&options)
        .render(&mut source, &changes[..1])
        .unwrap();

    let image = previews[0].image().unwrap();
    assert_eq!(image.caption, "Scene Change at Frame 2 (0.20 seconds)");
    assert_eq!(image.caption, caption_for(&changes[0]));
    assert_eq!(image.timestamp_seconds, changes[0].timestamp_seconds);

    let decoded = decode(&image.png);
    assert_eq!((decoded.width(), decoded.height()), (image.width, image.height));
    assert!(image.width >= 64);
    assert!(image.height > 36);
    assert_eq!(decoded.get_pixel(0, 0), &Rgb([255, 255, 255]));
}

#[test]
fn base64_and_data_uri_encode_the_png() {
    let mut source = video();
    let changes = changes_of(&mut source);
    let options = PreviewOptions::new();
    let previews = PreviewRenderer::new(&options)
        .render(&mut source, &changes[..1])
        .unwrap();
    let image = previews[0].image().unwrap();

    let encoded = image.to_base64();
    assert!(encoded.starts_with("iVBORw0KGgo"));
    assert_eq!(image.data_uri(), format!("data:image/png;base64,{encoded}"));
}

#[test]
fn max_dimension_downscales_the_frame() {
    let mut source = FrameSequence::from_solid_colors(&[BLACK, RED], 64, 32, 10.0);
    let changes = changes_of(&mut source);

    let full = PreviewOptions::new().with_caption_scale(1);
    let small = PreviewOptions::new().with_max_dimension(16).with_caption_scale(1);

    let full_preview = PreviewRenderer::new(&full)
        .render(&mut source, &changes)
        .unwrap();
    let small_preview = PreviewRenderer::new(&small)
        .render(&mut source, &changes)
        .unwrap();

    let full_height = full_preview[0].image().unwrap().height;
    let small_height = small_preview[0].image().unwrap().height;
    // Same caption band, frame height 32 vs 8.
    assert_eq!(full_height - small_height, 24);
    assert_eq!(frame_color(&small_preview[0].image().unwrap().png), RED);
}

#[test]
fn unreadable_frames_become_placeholders_without_shifting_others() {
    let mut source = video();
    let changes = vec![fake_change(2), fake_change(99), fake_change(0), fake_change(4)];

    let options = PreviewOptions::new();
    let previews = PreviewRenderer::new(&options)
        .render(&mut source, &changes)
        .unwrap();

    assert_eq!(previews.len(), 4);
    assert!(previews[0].is_rendered());
    assert!(previews[3].is_rendered());
    assert_eq!(frame_color(&previews[3].image().unwrap().png), GREEN);

    match &previews[1] {
        Preview::Unavailable {
            frame_index,
            timestamp_seconds,
            reason,
        } => {
            assert_eq!(*frame_index, 99);
            assert!((timestamp_seconds - 9.9).abs() < 1e-9);
            assert!(!reason.is_empty());
        }
        other => panic!("expected placeholder, got {other:?}"),
    }
    assert_eq!(previews[2].frame_index(), 0);
    assert!(previews[2].image().is_none());
}

#[test]
fn no_changes_means_no_previews() {
    let mut source = video();
    let options = PreviewOptions::new();
    let previews = PreviewRenderer::new(&options)
        .render(&mut source, &[])
        .unwrap();
    assert!(previews.is_empty());
}

#[test]
fn render_previews_with_no_changes_does_not_open_the_file() {
    let previews = scenecut::render_previews("does/not/exist.mp4", &[]).unwrap();
    assert!(previews.is_empty());
}

#[test]
fn single_pass_matches_seeking() {
    let seek = AnalysisOptions::new().with_strategy(PreviewStrategy::Seek);
    let single = AnalysisOptions::new().with_strategy(PreviewStrategy::SinglePass);

    let (seek_changes, seek_previews) = scenecut::analyze_source(&mut video(), &seek).unwrap();
    let (single_changes, single_previews) =
        scenecut::analyze_source(&mut video(), &single).unwrap();

    assert_eq!(seek_changes, single_changes);
    assert_eq!(seek_previews, single_previews);
    assert_eq!(seek_previews.len(), 3);
}

#[test]
fn single_frame_source_yields_empty_report() {
    let mut source = FrameSequence::from_solid_colors(&[RED], 8, 8, 10.0);
    let (changes, previews) =
        scenecut::analyze_source(&mut source, &AnalysisOptions::new()).unwrap();
    assert!(changes.is_empty());
    assert!(previews.is_empty());
}

#[test]
fn cancelled_renderer_returns_error() {
    let mut source = video();
    let changes = changes_of(&mut source);
    let token = CancellationToken::new();
    token.cancel();

    let options = PreviewOptions::new();
    let result = PreviewRenderer::new(&options)
        .with_cancellation(token)
        .render(&mut source, &changes);
    assert!(matches!(result, Err(SceneCutError::Cancelled)));
}

#[derive(Default)]
struct RecordingProgress {
    reports: Mutex<Vec<ProgressInfo>>,
}

impl ProgressCallback for RecordingProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        self.reports.lock().unwrap().push(info.clone());
    }
}

#[test]
fn analysis_reports_scan_then_render_progress() {
    let progress = Arc::new(RecordingProgress::default());
    let options = AnalysisOptions::new().with_scan(ScanOptions::new().with_progress(progress.clone()));

    scenecut::analyze_source(&mut video(), &options).unwrap();

    let reports = progress.reports.lock().unwrap();
    let first_render = reports
        .iter()
        .position(|info| info.operation == OperationType::PreviewRendering)
        .expect("render progress");
    assert!(
        reports[..first_render]
            .iter()
            .all(|info| info.operation == OperationType::SceneScan)
    );
    let last = reports.last().unwrap();
    assert_eq!(last.operation, OperationType::PreviewRendering);
    assert_eq!(last.current, 3);
    assert_eq!(last.total, Some(3));
}

fn captured_frames() -> Vec<(SceneChange, RgbImage)> {
    FrameScanner::new(&ScanOptions::new())
        .scan_capturing(&mut video())
        .unwrap()
}

#[test]
fn captured_render_reports_every_preview() {
    let progress = Arc::new(RecordingProgress::default());
    let options = PreviewOptions::new();
    let previews = PreviewRenderer::new(&options)
        .with_progress(progress.clone())
        .render_captured(captured_frames())
        .unwrap();
    assert_eq!(previews.len(), 3);

    let reports = progress.reports.lock().unwrap();
    let last = reports.last().expect("final report");
    assert_eq!(last.operation, OperationType::PreviewRendering);
    assert_eq!(last.current, 3);
    assert_eq!(last.total, Some(3));
    assert_eq!(last.percentage, Some(100.0));
}

#[test]
fn cancelled_captured_render_encodes_nothing() {
    let progress = Arc::new(RecordingProgress::default());
    let token = CancellationToken::new();
    token.cancel();

    let options = PreviewOptions::new();
    let result = PreviewRenderer::new(&options)
        .with_progress(progress.clone())
        .with_cancellation(token)
        .render_captured(captured_frames());

    assert!(matches!(result, Err(SceneCutError::Cancelled)));
    assert!(progress.reports.lock().unwrap().is_empty());
}

#[cfg(feature = "rayon")]
#[test]
fn parallel_single_pass_honours_cancellation() {
    let token = CancellationToken::new();
    token.cancel();
    let options = AnalysisOptions::new()
        .with_scan(ScanOptions::new())
        .with_strategy(PreviewStrategy::SinglePass);
    let renderer_options = options.preview.clone();

    let captured = FrameScanner::new(&options.scan)
        .scan_capturing(&mut video())
        .unwrap();
    let result = PreviewRenderer::new(&renderer_options)
        .with_cancellation(token)
        .render_captured(captured);
    assert!(matches!(result, Err(SceneCutError::Cancelled)));
}
