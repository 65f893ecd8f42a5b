//! # Pipeline Module
//!
//! Orchestrates one check of a capture directory.
//!
//! ## Pipeline Stages
//! 1. **Scan** - List the frames of the input directory
//! 2. **Crop** - Optional cropped copies in a scratch directory
//! 3. **Compare** - One backend call per adjacent pair on the worker pool
//! 4. **Archive** - Copy frames of abnormal transitions for review
//!
//! ## Failure
//! Any stage error ends the run. The scratch directory is removed either way.

mod executor;

pub use executor::{Pipeline, PipelineBuilder, PipelineConfig, PipelineResult};
