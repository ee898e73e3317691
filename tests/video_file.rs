//! FFmpeg-backed integration tests.
//!
//! Tests that read media require fixture files from
//! `tests/fixtures/generate_fixtures.sh` and return early when they are
//! missing.

use std::{io::Write, path::Path};

use scenecut::{
    AnalysisOptions, CancellationToken, FrameScanner, PreviewStrategy, ScanOptions, SceneChange,
    SceneCutError, VideoReader, VideoSource,
};

fn scene_cuts_path() -> &'static str {
    "tests/fixtures/scene_cuts.mp4"
}

fn static_path() -> &'static str {
    "tests/fixtures/static.mp4"
}

fn audio_only_path() -> &'static str {
    "tests/fixtures/audio_only.wav"
}

fn near(actual: u64, expected: u64) -> bool {
    actual.abs_diff(expected) <= 1
}

fn mean_brightness(png: &[u8]) -> f64 {
    let image = image::load_from_memory(png).unwrap().to_luma8();
    // Bottom row only, which belongs to the frame rather than the caption band.
    let y = image.height() - 1;
    let total: u64 = (0..image.width())
        .map(|x| image.get_pixel(x, y).0[0] as u64)
        .sum();
    total as f64 / image.width() as f64
}

// ── Opening ────────────────────────────────────────────────────────

#[test]
fn missing_file_is_an_open_error() {
    let result = scenecut::scan_changes("tests/fixtures/does_not_exist.mp4", 30.0);
    assert!(matches!(result, Err(SceneCutError::FileOpen { .. })));
}

#[test]
fn garbage_file_is_not_silently_empty() {
    let mut file = tempfile::Builder::new().suffix(".mp4").tempfile().unwrap();
    file.write_all(&[0x42; 4096]).unwrap();
    file.flush().unwrap();

    let result = scenecut::scan_changes(file.path(), 30.0);
    assert!(matches!(
        result,
        Err(SceneCutError::FileOpen { .. } | SceneCutError::NoVideoStream)
    ));
}

#[test]
fn invalid_threshold_is_rejected_before_opening() {
    let result = scenecut::scan_changes("tests/fixtures/does_not_exist.mp4", -3.0);
    assert!(matches!(result, Err(SceneCutError::InvalidThreshold(_))));
}

#[test]
fn previews_for_missing_file_fail_to_open() {
    let changes = [SceneChange {
        frame_index: 2,
        timestamp_seconds: 0.08,
        score: 100.0,
    }];
    let result = scenecut::render_previews("tests/fixtures/does_not_exist.mp4", &changes);
    assert!(matches!(result, Err(SceneCutError::FileOpen { .. })));
}

#[test]
fn audio_only_file_has_no_video_stream() {
    let path = audio_only_path();
    if !Path::new(path).exists() {
        return;
    }
    let result = scenecut::scan_changes(path, 30.0);
    assert!(matches!(result, Err(SceneCutError::NoVideoStream)));
}

#[test]
fn reader_exposes_metadata() {
    let path = scene_cuts_path();
    if !Path::new(path).exists() {
        return;
    }
    let reader = VideoReader::open(path).unwrap();
    let metadata = reader.metadata();
    assert_eq!((metadata.width, metadata.height), (160, 120));
    assert!((metadata.frames_per_second - 25.0).abs() < 0.01);
    assert!(near(metadata.frame_count, 75));
    assert_eq!(reader.path(), Path::new(path));
}

// ── Detection ──────────────────────────────────────────────────────

#[test]
fn hard_cuts_are_detected() {
    let path = scene_cuts_path();
    if !Path::new(path).exists() {
        return;
    }
    let changes = scenecut::scan_changes(path, 30.0).unwrap();
    assert_eq!(changes.len(), 2, "changes: {changes:?}");
    assert!(near(changes[0].frame_index, 26));
    assert!(near(changes[1].frame_index, 51));
    for change in &changes {
        assert!((change.timestamp_seconds - change.frame_index as f64 / 25.0).abs() < 1e-3);
        assert!(change.score > 200.0);
    }
}

#[test]
fn flat_video_has_no_changes() {
    let path = static_path();
    if !Path::new(path).exists() {
        return;
    }
    assert!(scenecut::scan_changes(path, 30.0).unwrap().is_empty());
}

#[test]
fn frame_bound_stops_before_second_cut() {
    let path = scene_cuts_path();
    if !Path::new(path).exists() {
        return;
    }
    let options = ScanOptions::new().with_max_frames(40);
    let changes = scenecut::scan_changes_with_options(path, &options).unwrap();
    assert_eq!(changes.len(), 1);
}

#[test]
fn cancelled_scan_of_file_returns_error() {
    let path = scene_cuts_path();
    if !Path::new(path).exists() {
        return;
    }
    let token = CancellationToken::new();
    token.cancel();
    let options = ScanOptions::new().with_cancellation(token);
    let result = scenecut::scan_changes_with_options(path, &options);
    assert!(matches!(result, Err(SceneCutError::Cancelled)));
}

#[test]
fn seeking_lands_on_requested_frame() {
    let path = scene_cuts_path();
    if !Path::new(path).exists() {
        return;
    }
    let mut reader = VideoReader::open(path).unwrap();

    reader.seek_to_frame(37).unwrap();
    let white = reader.read_frame().unwrap().unwrap();
    assert!(white.get_pixel(80, 60).0.iter().all(|&c| c > 200));

    reader.seek_to_frame(5).unwrap();
    let black = reader.read_frame().unwrap().unwrap();
    assert!(black.get_pixel(80, 60).0.iter().all(|&c| c < 50));
}

#[test]
fn reader_can_be_scanned_after_full_read() {
    let path = scene_cuts_path();
    if !Path::new(path).exists() {
        return;
    }
    let mut reader = VideoReader::open(path).unwrap();
    let first = FrameScanner::new(&ScanOptions::new())
        .scan(&mut reader)
        .unwrap();
    reader.seek_to_frame(0).unwrap();
    let second = FrameScanner::new(&ScanOptions::new())
        .scan(&mut reader)
        .unwrap();
    assert_eq!(
        first.iter().map(|c| c.frame_index).collect::<Vec<_>>(),
        second.iter().map(|c| c.frame_index).collect::<Vec<_>>()
    );
}

// ── Previews ───────────────────────────────────────────────────────

#[test]
fn previews_show_the_new_scene() {
    let path = scene_cuts_path();
    if !Path::new(path).exists() {
        return;
    }
    let changes = scenecut::scan_changes(path, 30.0).unwrap();
    let previews = scenecut::render_previews(path, &changes).unwrap();
    assert_eq!(previews.len(), changes.len());

    let first = previews[0].image().expect("first preview rendered");
    let second = previews[1].image().expect("second preview rendered");
    assert!(mean_brightness(&first.png) > 200.0);
    assert!(mean_brightness(&second.png) < 50.0);
    assert!(first.caption.starts_with("Scene Change at Frame "));
}

#[test]
fn analyze_with_both_strategies_agrees() {
    let path = scene_cuts_path();
    if !Path::new(path).exists() {
        return;
    }
    let seek = scenecut::analyze(path, &AnalysisOptions::new()).unwrap();
    let single = scenecut::analyze(
        path,
        &AnalysisOptions::new().with_strategy(PreviewStrategy::SinglePass),
    )
    .unwrap();

    assert_eq!(seek.frames(), single.frames());
    assert_eq!(seek.previews.len(), seek.changes.len());
    assert!(seek.previews.iter().all(|p| p.is_rendered()));
    assert!(single.previews.iter().all(|p| p.is_rendered()));
    assert_eq!(seek.metadata.width, 160);
}
