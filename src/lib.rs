//! # Image Sequence Diff
//!
//! Flags abnormal transitions in a sequence of captured frames.
//!
//! Adjacent frames are compared with an external tool (ImageMagick for MSE,
//! FFmpeg for SSIM). Pairs whose difference crosses a threshold are reported
//! and both frames can be copied aside for review.
//!
//! ## Architecture
//! - `core` - The comparison engine
//! - `config` - Settings from the environment or CLI flags
//! - `events` - Progress events for front-ends
//! - `error` - Error types

pub mod config;
pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use config::{AppConfig, Settings};
pub use error::{PipelineError, Result};

/// Initialize tracing for the library
///
/// This should be called by the application entry point. Filtering is
/// controlled by `RUST_LOG`; logs go to stderr so they never mix with
/// report output. Calling it twice is harmless.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}
