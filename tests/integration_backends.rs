//! Metric backends driven through real processes (fake tools).

#![cfg(unix)]

mod common;

use common::{fake_tools, frames};
use image_sequence_diff::core::crop::CropConfig;
use image_sequence_diff::core::metric::{BackendConfig, Metric};
use image_sequence_diff::core::pairing::ComparisonPair;
use image_sequence_diff::error::BackendError;
use std::path::Path;
use std::time::{Duration, Instant};

fn pair(dir: &Path, a: usize, b: usize) -> ComparisonPair {
    ComparisonPair::new(dir.join(format!("img{a}.png")), dir.join(format!("img{b}.png")))
}

#[test]
fn mse_of_identical_frames_is_zero() {
    let backend = BackendConfig::new(Metric::Mse)
        .magick_path(&fake_tools().magick)
        .build()
        .unwrap();
    let dir = frames(&["same", "same"]);

    assert_eq!(backend.compare(&pair(dir.path(), 0, 1), None).unwrap(), 0.0);
}

#[test]
fn mse_exit_code_one_is_a_normal_result() {
    let backend = BackendConfig::new(Metric::Mse)
        .magick_path(&fake_tools().magick)
        .build()
        .unwrap();
    let dir = frames(&["a", "b"]);
    let crop = CropConfig::new(10, 10, 0, 0);

    let difference = backend.compare(&pair(dir.path(), 0, 1), Some(&crop)).unwrap();
    assert!(difference > 0.0);
}

#[test]
fn ssim_of_identical_frames_is_one() {
    let backend = BackendConfig::new(Metric::Ssim)
        .ffmpeg_path(&fake_tools().ffmpeg)
        .build()
        .unwrap();
    let dir = frames(&["same", "same"]);

    assert_eq!(backend.compare(&pair(dir.path(), 0, 1), None).unwrap(), 1.0);
}

#[test]
fn missing_input_file_fails_with_exit_code() {
    let backend = BackendConfig::new(Metric::Mse)
        .magick_path(&fake_tools().magick)
        .build()
        .unwrap();
    let dir = frames(&["a"]);

    let err = backend.compare(&pair(dir.path(), 0, 1), None).unwrap_err();
    assert!(matches!(err, BackendError::ExitCode { code: 2, .. }));
}

#[test]
fn missing_executable_is_a_spawn_error() {
    fake_tools();
    let backend = BackendConfig::new(Metric::Ssim)
        .ffmpeg_path("/nonexistent/bin/ffmpeg")
        .build()
        .unwrap();
    let dir = frames(&["a", "b"]);

    let err = backend.compare(&pair(dir.path(), 0, 1), None).unwrap_err();
    assert!(matches!(err, BackendError::Spawn { .. }));
    assert!(err.to_string().contains("ffmpeg"));
}

#[test]
fn mse_unexpected_exit_code_is_an_error_even_with_output() {
    let backend = BackendConfig::new(Metric::Mse)
        .magick_path(&fake_tools().magick)
        .build()
        .unwrap();
    let dir = frames(&["exit3", "exit3"]);

    let err = backend.compare(&pair(dir.path(), 0, 1), None).unwrap_err();
    assert!(matches!(err, BackendError::ExitCode { code: 3, .. }), "{err:?}");
}

#[test]
fn hung_mse_tool_times_out_with_its_pair() {
    let backend = BackendConfig::new(Metric::Mse)
        .magick_path(&fake_tools().magick)
        .timeout(Some(Duration::from_millis(200)))
        .build()
        .unwrap();
    let dir = frames(&["hang", "a"]);

    let started = Instant::now();
    let err = backend.compare(&pair(dir.path(), 0, 1), None).unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(10));
    match err {
        BackendError::TimedOut {
            original,
            altered,
            timeout,
            ..
        } => {
            assert!(original.ends_with("img0.png"));
            assert!(altered.ends_with("img1.png"));
            assert_eq!(timeout, Duration::from_millis(200));
        }
        other => panic!("expected timeout, got {other:?}"),
    }
}

#[test]
fn hung_ssim_tool_times_out() {
    let backend = BackendConfig::new(Metric::Ssim)
        .ffmpeg_path(&fake_tools().ffmpeg)
        .timeout(Some(Duration::from_millis(200)))
        .build()
        .unwrap();
    let dir = frames(&["a", "hang"]);

    let err = backend.compare(&pair(dir.path(), 0, 1), None).unwrap_err();
    assert!(matches!(err, BackendError::TimedOut { .. }), "{err:?}");
}
