//! # Core Module
//!
//! The UI-agnostic frame comparison engine.
//!
//! ## Modules
//! - `scanner` - Lists the frames of a directory
//! - `crop` - Region of interest, optional cropped copies
//! - `pairing` - Adjacent frame pairs
//! - `metric` - External-tool backends for MSE and SSIM
//! - `scheduler` - Worker pool driving the backend, fail-fast
//! - `classifier` - Threshold rule per metric
//! - `archive` - Copies frames of abnormal transitions
//! - `reporter` - Result lines, CSV and JSON summaries
//! - `pipeline` - Orchestrates the full workflow

pub mod archive;
pub mod classifier;
pub mod crop;
pub mod metric;
pub mod pairing;
pub mod pipeline;
pub mod reporter;
pub mod scanner;
pub mod scheduler;

// Re-export commonly used types
pub use crop::{CropConfig, CropMode};
pub use metric::{Metric, MetricBackend};
pub use pairing::ComparisonPair;
pub use scheduler::ComparisonResult;
