//! Scene detection integration tests.
//!
//! These run against in-memory frame sequences, so no media fixtures are
//! needed.

use std::sync::{Arc, Mutex};

use image::{Rgb, RgbImage};
use scenecut::{
    CancellationToken, FrameScanner, FrameSequence, OperationType, ProgressCallback, ProgressInfo,
    ScanOptions, SceneChange, SceneCutError, VideoSource,
};

const BLACK: [u8; 3] = [0, 0, 0];
const WHITE: [u8; 3] = [255, 255, 255];

fn solid(colors: &[[u8; 3]], frames_per_second: f64) -> FrameSequence {
    FrameSequence::from_solid_colors(colors, 16, 12, frames_per_second)
}

fn gray(level: u8) -> [u8; 3] {
    [level, level, level]
}

fn scan(source: &mut FrameSequence, threshold: f64) -> Result<Vec<SceneChange>, SceneCutError> {
    FrameScanner::new(&ScanOptions::new().with_threshold(threshold)).scan(source)
}

fn frame_indices(changes: &[SceneChange]) -> Vec<u64> {
    changes.iter().map(|change| change.frame_index).collect()
}

/// Yields the wrapped frames, then a decode error instead of end of stream.
struct FailingSource {
    inner: FrameSequence,
    remaining: usize,
}

impl VideoSource for FailingSource {
    fn frames_per_second(&self) -> f64 {
        self.inner.frames_per_second()
    }

    fn read_frame(&mut self) -> Option<Result<RgbImage, SceneCutError>> {
        if self.remaining == 0 {
            return Some(Err(SceneCutError::VideoDecodeError(
                "corrupt packet".to_string(),
            )));
        }
        self.remaining -= 1;
        self.inner.read_frame()
    }

    fn seek_to_frame(&mut self, position: u64) -> Result<(), SceneCutError> {
        self.inner.seek_to_frame(position)
    }
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

struct CancelOnFirstReport {
    token: CancellationToken,
}

impl ProgressCallback for CancelOnFirstReport {
    fn on_progress(&self, _info: &ProgressInfo) {
        self.token.cancel();
    }
}

// ── Reference scenarios ────────────────────────────────────────────

#[test]
fn black_white_cuts_are_found_at_frames_3_and_5() {
    let mut video = solid(&[BLACK, BLACK, WHITE, WHITE, BLACK], 10.0);
    let changes = scan(&mut video, 30.0).unwrap();

    assert_eq!(frame_indices(&changes), vec![3, 5]);
    assert!((changes[0].timestamp_seconds - 0.30).abs() < 1e-6);
    assert!((changes[1].timestamp_seconds - 0.50).abs() < 1e-6);
    assert_eq!(changes[0].score, 255.0);
    assert_eq!(changes[1].score, 255.0);
}

#[test]
fn threshold_above_maximum_difference_finds_nothing() {
    let mut video = solid(&[BLACK, WHITE, BLACK, WHITE], 25.0);
    assert!(scan(&mut video, 300.0).unwrap().is_empty());
}

#[test]
fn empty_source_has_no_changes() {
    let mut video = solid(&[], 25.0);
    assert!(scan(&mut video, 30.0).unwrap().is_empty());
}

#[test]
fn single_frame_source_has_no_changes() {
    let mut video = solid(&[WHITE], 25.0);
    assert!(scan(&mut video, 0.0).unwrap().is_empty());
}

#[test]
fn default_threshold_is_30() {
    assert_eq!(ScanOptions::new().threshold(), 30.0);
    assert_eq!(ScanOptions::default().threshold(), scenecut::DEFAULT_THRESHOLD);
}

// ── Threshold semantics ────────────────────────────────────────────

#[test]
fn score_equal_to_threshold_is_not_reported() {
    let mut video = solid(&[gray(0), gray(30)], 10.0);
    assert!(scan(&mut video, 30.0).unwrap().is_empty());

    let mut video = solid(&[gray(0), gray(30)], 10.0);
    let changes = scan(&mut video, 29.5).unwrap();
    assert_eq!(frame_indices(&changes), vec![2]);
    assert_eq!(changes[0].score, 30.0);
}

#[test]
fn gradual_fade_stays_below_threshold() {
    let levels: Vec<[u8; 3]> = (0..20).map(|step| gray(step * 10)).collect();
    let mut video = solid(&levels, 30.0);
    assert!(scan(&mut video, 30.0).unwrap().is_empty());

    let mut video = solid(&levels, 30.0);
    let changes = scan(&mut video, 5.0).unwrap();
    assert_eq!(frame_indices(&changes), (2..=20).collect::<Vec<u64>>());
}

#[test]
fn comparison_is_pairwise_not_against_scene_start() {
    // Each step is small, the total drift is large.
    let levels = [gray(0), gray(20), gray(40), gray(60), gray(80)];
    let mut video = solid(&levels, 10.0);
    assert!(scan(&mut video, 30.0).unwrap().is_empty());
}

#[test]
fn partial_frame_change_is_averaged_over_all_pixels() {
    let base = RgbImage::from_pixel(10, 10, Rgb(BLACK));
    let mut half = base.clone();
    for y in 0..5 {
        for x in 0..10 {
            half.put_pixel(x, y, Rgb(WHITE));
        }
    }
    let mut video = FrameSequence::new(vec![base, half], 10.0);
    let changes = scan(&mut video, 100.0).unwrap();
    assert_eq!(changes.len(), 1);
    assert!((changes[0].score - 127.5).abs() < 1e-9);
}

#[test]
fn invalid_thresholds_are_rejected() {
    for threshold in [-1.0, f64::NAN, f64::INFINITY] {
        let mut video = solid(&[BLACK, WHITE], 10.0);
        let result = scan(&mut video, threshold);
        assert!(
            matches!(result, Err(SceneCutError::InvalidThreshold(_))),
            "threshold {threshold} was accepted"
        );
    }
}

// ── Ordering properties ────────────────────────────────────────────

#[test]
fn reported_frames_are_strictly_increasing_and_never_frame_1() {
    // Deterministic pseudo-random brightness sequence.
    let mut state: u32 = 0x2545_f491;
    let levels: Vec<[u8; 3]> = (0..200)
        .map(|_| {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            gray((state >> 24) as u8)
        })
        .collect();
    let frame_count = levels.len() as u64;
    let mut video = solid(&levels, 24.0);

    let changes = scan(&mut video, 40.0).unwrap();
    assert!(!changes.is_empty());
    assert!(changes.iter().all(|change| change.frame_index >= 2));
    assert!(changes.iter().all(|change| change.frame_index <= frame_count));
    assert!(
        changes
            .windows(2)
            .all(|pair| pair[0].frame_index < pair[1].frame_index)
    );
    for change in &changes {
        assert!((change.timestamp_seconds - change.frame_index as f64 / 24.0).abs() < 1e-6);
        assert!(change.score > 40.0);
    }
}

#[test]
fn scanning_twice_gives_identical_results() {
    let video = solid(&[BLACK, WHITE, WHITE, gray(90), BLACK], 12.0);
    let first = scan(&mut video.clone(), 30.0).unwrap();
    let second = scan(&mut video.clone(), 30.0).unwrap();
    assert_eq!(first, second);
}

// ── Failure handling ───────────────────────────────────────────────

#[test]
fn decode_error_mid_stream_keeps_earlier_changes() {
    let mut source = FailingSource {
        inner: solid(&[BLACK, WHITE, BLACK, WHITE], 10.0),
        remaining: 3,
    };
    let changes = FrameScanner::new(&ScanOptions::new())
        .scan(&mut source)
        .unwrap();
    assert_eq!(frame_indices(&changes), vec![2, 3]);
}

#[test]
fn decode_error_on_first_frame_behaves_like_empty_source() {
    let mut source = FailingSource {
        inner: solid(&[BLACK, WHITE], 10.0),
        remaining: 0,
    };
    let changes = FrameScanner::new(&ScanOptions::new())
        .scan(&mut source)
        .unwrap();
    assert!(changes.is_empty());
}

#[test]
fn zero_frame_rate_fails_only_when_changes_exist() {
    let mut video = solid(&[BLACK, WHITE], 0.0);
    let result = scan(&mut video, 30.0);
    assert!(matches!(
        result,
        Err(SceneCutError::ZeroFrameRate { frame_index: 2 })
    ));

    let mut video = solid(&[BLACK, BLACK], 0.0);
    assert!(scan(&mut video, 30.0).unwrap().is_empty());
}

#[test]
fn changing_frame_size_is_an_error() {
    let frames = vec![
        RgbImage::from_pixel(8, 8, Rgb(BLACK)),
        RgbImage::from_pixel(8, 8, Rgb(BLACK)),
        RgbImage::from_pixel(4, 8, Rgb(BLACK)),
    ];
    let mut video = FrameSequence::new(frames, 10.0);
    match scan(&mut video, 30.0) {
        Err(SceneCutError::FrameSizeMismatch {
            frame_index,
            expected_width,
            actual_width,
            ..
        }) => {
            assert_eq!(frame_index, 3);
            assert_eq!(expected_width, 8);
            assert_eq!(actual_width, 4);
        }
        other => panic!("expected FrameSizeMismatch, got {other:?}"),
    }
}

// ── Bounds, progress and cancellation ──────────────────────────────

#[test]
fn max_frames_stops_scan_early() {
    let mut video = solid(&[BLACK, WHITE, BLACK, WHITE, BLACK], 10.0);
    let options = ScanOptions::new().with_max_frames(3);
    let changes = FrameScanner::new(&options).scan(&mut video).unwrap();
    assert_eq!(frame_indices(&changes), vec![2, 3]);
}

#[test]
fn zero_frame_bound_reads_nothing() {
    let mut video = solid(&[BLACK, WHITE, BLACK], 10.0);
    let options = ScanOptions::new().with_max_frames(0);
    let changes = FrameScanner::new(&options).scan(&mut video).unwrap();
    assert!(changes.is_empty());

    // The first frame is still unread.
    let next = video.read_frame().unwrap().unwrap();
    assert_eq!(next.get_pixel(0, 0), &Rgb(BLACK));
}

#[test]
fn cancelled_before_start_returns_error() {
    let token = CancellationToken::new();
    token.cancel();
    let options = ScanOptions::new().with_cancellation(token);

    let mut video = solid(&[BLACK, WHITE], 10.0);
    let result = FrameScanner::new(&options).scan(&mut video);
    assert!(matches!(result, Err(SceneCutError::Cancelled)));
}

#[test]
fn cancellation_during_scan_stops_it() {
    let token = CancellationToken::new();
    let options = ScanOptions::new()
        .with_cancellation(token.clone())
        .with_progress(Arc::new(CancelOnFirstReport { token }))
        .with_batch_size(1);

    let mut video = solid(&[BLACK, WHITE, BLACK, WHITE], 10.0);
    let result = FrameScanner::new(&options).scan(&mut video);
    assert!(matches!(result, Err(SceneCutError::Cancelled)));
}

#[test]
fn progress_reports_frames_and_changes() {
    let progress = Arc::new(RecordingProgress::default());
    let options = ScanOptions::new().with_progress(progress.clone());

    let mut video = solid(&[BLACK, BLACK, WHITE, WHITE, BLACK], 10.0);
    FrameScanner::new(&options).scan(&mut video).unwrap();

    let reports = progress.reports.lock().unwrap();
    let last = reports.last().expect("at least one progress report");
    assert_eq!(last.operation, OperationType::SceneScan);
    assert_eq!(last.current, 5);
    assert_eq!(last.total, Some(5));
    assert_eq!(last.changes_found, 2);
    assert_eq!(last.percentage, Some(100.0));
}

#[test]
fn capturing_scan_keeps_flagged_frames() {
    let colors = [BLACK, [200, 0, 0], [200, 0, 0], [0, 0, 200]];
    let mut video = solid(&colors, 10.0);
    let captured = FrameScanner::new(&ScanOptions::new())
        .scan_capturing(&mut video)
        .unwrap();

    let indices: Vec<u64> = captured.iter().map(|(change, _)| change.frame_index).collect();
    assert_eq!(indices, vec![2, 4]);
    assert_eq!(captured[0].1.get_pixel(0, 0), &Rgb([200, 0, 0]));
    assert_eq!(captured[1].1.get_pixel(0, 0), &Rgb([0, 0, 200]));
}

#[test]
fn scanner_accepts_trait_objects() {
    let mut video = solid(&[BLACK, WHITE], 10.0);
    let source: &mut dyn VideoSource = &mut video;
    let changes = FrameScanner::new(&ScanOptions::new()).scan(source).unwrap();
    assert_eq!(frame_indices(&changes), vec![2]);
}
