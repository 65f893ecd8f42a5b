//! Mean squared error via ImageMagick `compare`.

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

/// `compare` exits 0 for similar and 1 for dissimilar images. Anything
/// else (2 is "could not compare") is a failed run.
pub const NORMAL_EXIT_CODES: [i32; 2] = [0, 1];

/// Older builds only print `absolute (normalized)` on stderr.
static LEGACY_OUTPUT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d+\.?\d*(?:e[-+]?\d+)? \((\d+\.?\d*(?:e[-+]?\d+)?)\)")
        .expect("legacy compare output pattern is valid")
});

/// MSE backend; higher values mean more different
#[derive(Debug, Clone)]
pub struct MseBackend {
    magick: PathBuf,
    timeout: Option<Duration>,
}

impl MseBackend {
    pub fn new(magick: impl Into<PathBuf>) -> Self {
        Self {
            magick: magick.into(),
            timeout: None,
        }
    }

    /// Kill and fail any `compare` call that runs longer than `timeout`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// `compare -metric MSE -format %[distortion] <a> <b> [-crop WxH+X+Y] info:`
    pub fn arguments(pair: &ComparisonPair, crop: Option<&CropConfig>) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "compare".into(),
            "-metric".into(),
            "MSE".into(),
            "-format".into(),
            "%[distortion]".into(),
            pair.original.clone().into(),
            pair.altered.clone().into(),
        ];
        if let Some(crop) = crop {
            args.push("-crop".into());
            args.push(crop.geometry().into());
        }
        args.push("info:".into());
        args
    }
}

/// Extract the normalized MSE from `compare` output.
///
/// stdout carries a bare float; if it is empty the legacy stderr form
/// `123.4 (0.00188)` is accepted and the parenthesized value used.
pub fn parse_mse_output(stdout: &str, stderr: &str) -> Option<f64> {
    let stdout = stdout.trim();
    let value = if stdout.is_empty() {
        LEGACY_OUTPUT
            .captures(stderr)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok())
    } else {
        stdout.parse::<f64>().ok()
    };
    value.filter(|v| v.is_finite())
}

impl MetricBackend for MseBackend {
    fn metric(&self) -> Metric {
        Metric::Mse
    }

    fn tool(&self) -> &Path {
        &self.magick
    }

    fn compare(
        &self,
        pair: &ComparisonPair,
        crop: Option<&CropConfig>,
    ) -> Result<f64, BackendError> {
        let args = Self::arguments(pair, crop);
        let output = run_tool(&self.magick, &args, self.timeout)
            .map_err(|failure| failure_to_error(failure, &self.magick, pair))?;

        match output.status.code() {
            None => {
                return Err(BackendError::Signal {
                    tool: self.magick.clone(),
                    original: pair.original.clone(),
                    altered: pair.altered.clone(),
                })
            }
            Some(code) if NORMAL_EXIT_CODES.contains(&code) => {}
            Some(code) => {
                return Err(BackendError::ExitCode {
                    tool: self.magick.clone(),
                    original: pair.original.clone(),
                    altered: pair.altered.clone(),
                    code,
                    stderr: output.stderr.trim().to_string(),
                })
            }
        }

        let difference = parse_mse_output(&output.stdout, &output.stderr).ok_or_else(|| {
            BackendError::UnparsableOutput {
                tool: self.magick.clone(),
                original: pair.original.clone(),
                altered: pair.altered.clone(),
                output: format!("{}{}", output.stdout, output.stderr),
            }
        })?;

        debug!(
            original = %pair.original.display(),
            altered = %pair.altered.display(),
            difference,
            "mse computed"
        );
        Ok(difference)
    }
}
