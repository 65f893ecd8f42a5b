//! # Scanner Module
//!
//! Lists the frames of a capture directory in a stable order.
//!
//! ## Ordering
//! Frames are sorted by path. Capture tools usually number their output
//! (`img0001.png`, `img0002.png`, ...), so this is capture order as long
//! as the numbers are zero-padded.
//!
//! ## Example
//! ```rust,ignore
//! use image_sequence_diff::core::scanner::{DirectoryScanner, ScanConfig};
//!
//! let frames = DirectoryScanner::new(ScanConfig::default()).scan("/captures/run1".as_ref())?;
//! ```

mod filter;
mod walker;

pub use filter::{ImageFilter, DEFAULT_EXTENSIONS};
pub use walker::{DirectoryScanner, ScanConfig};
