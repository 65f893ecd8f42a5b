//! # Reporter Module
//!
//! Human- and machine-readable views of a finished run.
//!
//! ## Line Format
//! ```text
//! img0.png, img1.png: 0 [OKAY]
//! img1.png, img2.png: 0.02 [WARN]
//! ```

mod export;

pub use export::export_csv;

use crate::core::metric::Metric;
use crate::core::scheduler::ComparisonResult;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// `WARN` for abnormal pairs, `OKAY` otherwise
pub fn status_label(is_abnormal: bool) -> &'static str {
    if is_abnormal {
        "WARN"
    } else {
        "OKAY"
    }
}

/// `<original>, <altered>: <difference> [OKAY|WARN]` using file names
pub fn format_result_line(result: &ComparisonResult) -> String {
    format!(
        "{}, {}: {} [{}]",
        display_name(&result.original),
        display_name(&result.altered),
        result.difference,
        status_label(result.is_abnormal)
    )
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Serializable summary of one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub metric: Metric,
    pub threshold: f64,
    pub total_images: usize,
    pub total_pairs: usize,
    pub abnormal_pairs: usize,
    pub abnormal_images: Vec<PathBuf>,
    pub archived: Vec<PathBuf>,
    pub duration_ms: u64,
    pub results: Vec<ComparisonResult>,
}
