//! # seq-diff CLI
//!
//! Command-line interface for the image sequence checker.
//!
//! ## Usage
//! ```bash
//! seq-diff check ./captures --metric mse --threshold 0.005 --magick /usr/bin/magick
//! METRIC=ssim DIFF_THRESHOLD=0.9 FFMPEG_PATH=ffmpeg seq-diff check ./captures --output json
//! ```

mod cli;

use std::process::ExitCode;

fn main() -> ExitCode {
    image_sequence_diff::init_tracing();
    cli::run()
}
