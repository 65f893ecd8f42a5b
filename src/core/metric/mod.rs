//! # Metric Module
//!
//! Computes the difference between two frames by running an external tool.
//!
//! ## Supported Metrics
//! | Metric | Tool        | Meaning of a higher value |
//! |--------|-------------|---------------------------|
//! | MSE    | ImageMagick | more different            |
//! | SSIM   | FFmpeg      | more similar              |
//!
//! Each comparison runs in its own process so a failure names exactly
//! one pair.
//!
//! ## Example
//! ```rust,ignore
//! use image_sequence_diff::core::metric::{BackendConfig, Metric};
//!
//! let backend = BackendConfig::new(Metric::Mse)
//!     .magick_path("/usr/bin/magick")
//!     .build()?;
//!
//! let difference = backend.compare(&pair, None)?;
//! ```

mod mse;
pub mod process;
mod ssim;
mod traits;

pub use mse::{parse_mse_output, MseBackend, NORMAL_EXIT_CODES};
pub use ssim::{parse_ssim_output, SsimBackend};
pub use traits::MetricBackend;

use crate::core::pairing::ComparisonPair;
use crate::error::{BackendError, ConfigError};
use process::ProcessFailure;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Similarity metrics understood by the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Normalized mean squared error
    Mse,
    /// Structural similarity index
    Ssim,
}

impl Metric {
    pub const ALL: [Metric; 2] = [Metric::Mse, Metric::Ssim];

    /// Lower-case name as used in configuration
    pub fn name(&self) -> &'static str {
        match self {
            Metric::Mse => "mse",
            Metric::Ssim => "ssim",
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Metric::Mse => write!(f, "MSE"),
            Metric::Ssim => write!(f, "SSIM"),
        }
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Metric::ALL
            .into_iter()
            .find(|metric| metric.name() == wanted)
            .ok_or_else(|| format!("expected one of: mse, ssim (got {s:?})"))
    }
}

/// Configuration builder for metric backends
#[derive(Debug, Clone)]
pub struct BackendConfig {
    metric: Metric,
    magick_path: Option<PathBuf>,
    ffmpeg_path: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl BackendConfig {
    pub fn new(metric: Metric) -> Self {
        Self {
            metric,
            magick_path: None,
            ffmpeg_path: None,
            timeout: None,
        }
    }

    /// ImageMagick executable, required for MSE
    pub fn magick_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.magick_path = Some(path.into());
        self
    }

    /// FFmpeg executable, required for SSIM
    pub fn ffmpeg_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ffmpeg_path = Some(path.into());
        self
    }

    /// Per-call timeout; `None` waits forever
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the backend for the configured metric
    pub fn build(self) -> Result<Box<dyn MetricBackend>, ConfigError> {
        match self.metric {
            Metric::Mse => {
                let magick = self
                    .magick_path
                    .ok_or(ConfigError::Missing { key: "MAGICK_PATH" })?;
                Ok(Box::new(MseBackend::new(magick).with_timeout(self.timeout)))
            }
            Metric::Ssim => {
                let ffmpeg = self
                    .ffmpeg_path
                    .ok_or(ConfigError::Missing { key: "FFMPEG_PATH" })?;
                Ok(Box::new(SsimBackend::new(ffmpeg).with_timeout(self.timeout)))
            }
        }
    }
}

/// Attach pair and tool context to a process-level failure
fn failure_to_error(failure: ProcessFailure, tool: &Path, pair: &ComparisonPair) -> BackendError {
    let tool = tool.to_path_buf();
    let original = pair.original.clone();
    let altered = pair.altered.clone();
    match failure {
        ProcessFailure::Spawn(source) => BackendError::Spawn {
            tool,
            original,
            altered,
            source,
        },
        ProcessFailure::Io(source) => BackendError::Io {
            tool,
            original,
            altered,
            source,
        },
        ProcessFailure::TimedOut(timeout) => BackendError::TimedOut {
            tool,
            original,
            altered,
            timeout,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_parses_case_insensitively() {
        assert_eq!("mse".parse::<Metric>().unwrap(), Metric::Mse);
        assert_eq!("SSIM".parse::<Metric>().unwrap(), Metric::Ssim);
        assert_eq!(" Mse ".parse::<Metric>().unwrap(), Metric::Mse);
    }

    #[test]
    fn unknown_metric_is_rejected() {
        assert!("psnr".parse::<Metric>().is_err());
        assert!("".parse::<Metric>().is_err());
    }

    #[test]
    fn build_selects_backend_by_metric() {
        let mse = BackendConfig::new(Metric::Mse).magick_path("magick").build().unwrap();
        assert_eq!(mse.metric(), Metric::Mse);

        let ssim = BackendConfig::new(Metric::Ssim).ffmpeg_path("ffmpeg").build().unwrap();
        assert_eq!(ssim.metric(), Metric::Ssim);
        assert_eq!(ssim.tool(), Path::new("ffmpeg"));
    }

    #[test]
    fn build_requires_tool_for_metric() {
        let err = BackendConfig::new(Metric::Ssim)
            .magick_path("magick")
            .build()
            .err()
            .unwrap();
        assert_eq!(err, ConfigError::Missing { key: "FFMPEG_PATH" });
    }

    #[test]
    fn spawn_failure_keeps_context() {
        let pair = ComparisonPair::new("a.png", "b.png");
        let error = failure_to_error(
            ProcessFailure::Spawn(std::io::Error::from(std::io::ErrorKind::NotFound)),
            Path::new("/opt/magick"),
            &pair,
        );
        assert!(matches!(error, BackendError::Spawn { .. }));
        assert!(error.to_string().contains("/opt/magick"));
    }
}
