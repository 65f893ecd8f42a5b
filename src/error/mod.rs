//! # Error Module
//!
//! Error types for the image sequence checker.
//!
//! ## Design Principles
//! - **Never panic** on user data - return errors instead
//! - **Include context** - which pair, which tool, which exit code
//! - **Fail fast** - a single backend failure aborts the whole batch
//! - **No retries** - errors travel up unchanged to the caller

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    InsufficientInput(#[from] InsufficientInputError),

    #[error("Scanning error: {0}")]
    Scan(#[from] ScanError),

    #[error("Cropping error: {0}")]
    Crop(#[from] CropError),

    #[error("Comparison error: {0}")]
    Backend(#[from] BackendError),

    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),
}

/// Missing or invalid settings, reported before the pipeline starts
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Missing required setting {key}")]
    Missing { key: &'static str },

    #[error("Invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("Incomplete crop settings: CROP_WIDTH, CROP_HEIGHT, CROP_OFFSET_X and CROP_OFFSET_Y must all be set")]
    IncompleteCrop,
}

/// Fewer than two images were supplied, so there is nothing to compare
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("At least 2 images are required for comparison, found {found}")]
pub struct InsufficientInputError {
    pub found: usize,
}

/// Errors that occur while enumerating the input directory
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("Permission denied accessing: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("Failed to read directory {path}: {source}")]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised by a metric backend for one comparison pair
///
/// Every variant names the pair and the tool so the failing call
/// can be reproduced by hand.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Failed to start {tool} for {original} -> {altered}: {source}")]
    Spawn {
        tool: PathBuf,
        original: PathBuf,
        altered: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} exited with code {code} comparing {original} -> {altered}: {stderr}")]
    ExitCode {
        tool: PathBuf,
        original: PathBuf,
        altered: PathBuf,
        code: i32,
        stderr: String,
    },

    #[error("{tool} was terminated by a signal comparing {original} -> {altered}")]
    Signal {
        tool: PathBuf,
        original: PathBuf,
        altered: PathBuf,
    },

    #[error("Unexpected output from {tool} comparing {original} -> {altered}: {output:?}")]
    UnparsableOutput {
        tool: PathBuf,
        original: PathBuf,
        altered: PathBuf,
        output: String,
    },

    #[error("{tool} timed out after {timeout:?} comparing {original} -> {altered}")]
    TimedOut {
        tool: PathBuf,
        original: PathBuf,
        altered: PathBuf,
        timeout: Duration,
    },

    #[error("Failed to collect output of {tool} for {original} -> {altered}: {source}")]
    Io {
        tool: PathBuf,
        original: PathBuf,
        altered: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BackendError {
    /// The pair this error belongs to, as `(original, altered)`
    pub fn pair(&self) -> (&PathBuf, &PathBuf) {
        match self {
            BackendError::Spawn { original, altered, .. }
            | BackendError::ExitCode { original, altered, .. }
            | BackendError::Signal { original, altered, .. }
            | BackendError::UnparsableOutput { original, altered, .. }
            | BackendError::TimedOut { original, altered, .. }
            | BackendError::Io { original, altered, .. } => (original, altered),
        }
    }
}

/// Errors that occur while producing cropped copies of the inputs
#[derive(Error, Debug)]
pub enum CropError {
    #[error("Failed to create temporary directory: {source}")]
    TempDir {
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to start {tool} to crop {path}: {source}")]
    Spawn {
        tool: PathBuf,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} failed to crop {path}: {reason}")]
    ToolFailed {
        tool: PathBuf,
        path: PathBuf,
        reason: String,
    },

    #[error("Image has no file name: {path}")]
    InvalidPath { path: PathBuf },

    #[error("Failed to build crop worker pool: {0}")]
    ThreadPool(String),
}

/// Errors that occur while copying anomalous images
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Failed to create archive directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to copy {source_path} to {destination}: {source}")]
    Copy {
        source_path: PathBuf,
        destination: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Image has no file name: {path}")]
    InvalidPath { path: PathBuf },

    #[error("{first} and {second} would both be archived as {destination}")]
    NameCollision {
        first: PathBuf,
        second: PathBuf,
        destination: PathBuf,
    },
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, PipelineError>;
