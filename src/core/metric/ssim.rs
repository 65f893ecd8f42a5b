//! Structural similarity via FFmpeg's `ssim` filter.

use super::process::run_tool;
use super::{failure_to_error, Metric, MetricBackend};
use crate::core::crop::CropConfig;
use crate::core::pairing::ComparisonPair;
use crate::error::BackendError;
use regex::Regex;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;
use tracing::debug;

/// FFmpeg exit code for a completed run
pub const SUCCESS_CODE: i32 = 0;

/// `[Parsed_ssim_2 @ 0x..] SSIM Y:0.99 U:0.98 V:0.98 All:0.987654 (19.08)`
static SSIM_ALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"All:\s*(\d+(?:\.\d+)?(?:[eE][-+]?\d+)?)").expect("ssim output pattern is valid")
});

/// SSIM backend; higher values mean more similar (1.0 = identical)
#[derive(Debug, Clone)]
pub struct SsimBackend {
    ffmpeg: PathBuf,
    timeout: Option<Duration>,
}

impl SsimBackend {
    pub fn new(ffmpeg: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            timeout: None,
        }
    }

    /// Kill and fail any ffmpeg call that runs longer than `timeout`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// The crop is applied to both inputs independently, ahead of `ssim`.
    pub fn filter_graph(crop: Option<&CropConfig>) -> String {
        match crop {
            Some(crop) => {
                let rect = crop.filter_args();
                format!("[0:v]crop={rect}[a];[1:v]crop={rect}[b];[a][b]ssim")
            }
            None => "[0:v][1:v]ssim".to_string(),
        }
    }

    pub fn arguments(pair: &ComparisonPair, crop: Option<&CropConfig>) -> Vec<OsString> {
        vec![
            "-hide_banner".into(),
            "-nostats".into(),
            "-i".into(),
            pair.original.clone().into(),
            "-i".into(),
            pair.altered.clone().into(),
            "-filter_complex".into(),
            Self::filter_graph(crop).into(),
            "-f".into(),
            "null".into(),
            "-".into(),
        ]
    }
}

/// Extract the overall SSIM from ffmpeg's diagnostic output.
///
/// The last `All:` match wins; the summary line comes after any
/// per-frame chatter.
pub fn parse_ssim_output(stderr: &str) -> Option<f64> {
    SSIM_ALL
        .captures_iter(stderr)
        .last()
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

impl MetricBackend for SsimBackend {
    fn metric(&self) -> Metric {
        Metric::Ssim
    }

    fn tool(&self) -> &Path {
        &self.ffmpeg
    }

    fn compare(
        &self,
        pair: &ComparisonPair,
        crop: Option<&CropConfig>,
    ) -> Result<f64, BackendError> {
        let args = Self::arguments(pair, crop);
        let output = run_tool(&self.ffmpeg, &args, self.timeout)
            .map_err(|failure| failure_to_error(failure, &self.ffmpeg, pair))?;

        match output.status.code() {
            Some(SUCCESS_CODE) => {}
            Some(code) => {
                return Err(BackendError::ExitCode {
                    tool: self.ffmpeg.clone(),
                    original: pair.original.clone(),
                    altered: pair.altered.clone(),
                    code,
                    stderr: last_lines(&output.stderr, 5),
                })
            }
            None => {
                return Err(BackendError::Signal {
                    tool: self.ffmpeg.clone(),
                    original: pair.original.clone(),
                    altered: pair.altered.clone(),
                })
            }
        }

        let similarity =
            parse_ssim_output(&output.stderr).ok_or_else(|| BackendError::UnparsableOutput {
                tool: self.ffmpeg.clone(),
                original: pair.original.clone(),
                altered: pair.altered.clone(),
                output: last_lines(&output.stderr, 5),
            })?;

        debug!(
            original = %pair.original.display(),
            altered = %pair.altered.display(),
            similarity,
            "ssim computed"
        );
        Ok(similarity)
    }
}

/// ffmpeg is verbose; keep error messages to the tail
fn last_lines(text: &str, count: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(count);
    lines[start..].join("\n")
}
