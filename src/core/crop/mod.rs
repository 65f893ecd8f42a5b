//! # Crop Module
//!
//! Region-of-interest handling.
//!
//! A [`CropConfig`] is either handed to the metric backend, which encodes it
//! for its own tool, or used up front by [`CropPreprocessor`] to write
//! cropped copies of every frame into a scratch directory.

use crate::core::metric::process::{run_tool, ProcessFailure};
use crate::error::CropError;
use crate::events::{CropEvent, Event, EventSender};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, info};

/// Rectangle to compare, in pixels from the top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropConfig {
    pub width: u32,
    pub height: u32,
    pub offset_x: u32,
    pub offset_y: u32,
}

impl CropConfig {
    pub fn new(width: u32, height: u32, offset_x: u32, offset_y: u32) -> Self {
        Self {
            width,
            height,
            offset_x,
            offset_y,
        }
    }

    /// ImageMagick geometry: `WxH+X+Y`
    pub fn geometry(&self) -> String {
        format!(
            "{}x{}+{}+{}",
            self.width, self.height, self.offset_x, self.offset_y
        )
    }

    /// FFmpeg crop filter arguments: `W:H:X:Y`
    pub fn filter_args(&self) -> String {
        format!(
            "{}:{}:{}:{}",
            self.width, self.height, self.offset_x, self.offset_y
        )
    }
}

/// Where cropping happens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CropMode {
    /// The metric backend crops as part of each comparison
    #[default]
    InBackend,
    /// Frames are cropped once into a scratch directory before comparing
    Preprocess,
}

impl FromStr for CropMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "in-backend" | "backend" => Ok(CropMode::InBackend),
            "preprocess" => Ok(CropMode::Preprocess),
            other => Err(format!("expected in-backend or preprocess (got {other:?})")),
        }
    }
}

/// Writes cropped copies of frames with ImageMagick
#[derive(Debug, Clone)]
pub struct CropPreprocessor {
    magick: PathBuf,
    crop: CropConfig,
    workers: usize,
    timeout: Option<Duration>,
}

impl CropPreprocessor {
    pub fn new(magick: impl Into<PathBuf>, crop: CropConfig) -> Self {
        Self {
            magick: magick.into(),
            crop,
            workers: 1,
            timeout: None,
        }
    }

    /// Number of concurrent `magick` processes
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// `<input> -crop WxH+X+Y +repage <output>`
    pub fn arguments(&self, input: &Path, output: &Path) -> Vec<OsString> {
        vec![
            input.as_os_str().to_owned(),
            "-crop".into(),
            self.crop.geometry().into(),
            "+repage".into(),
            output.as_os_str().to_owned(),
        ]
    }

    /// Crop every image into `out_dir`, keeping file names.
    ///
    /// The returned paths are in the same order as `images`. The first
    /// failure aborts the stage.
    pub fn crop_all(
        &self,
        images: &[PathBuf],
        out_dir: &Path,
        events: &EventSender,
    ) -> Result<Vec<PathBuf>, CropError> {
        info!(
            count = images.len(),
            geometry = %self.crop.geometry(),
            out_dir = %out_dir.display(),
            "cropping images"
        );
        events.send(Event::Crop(CropEvent::Started {
            total_images: images.len(),
        }));

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()
            .map_err(|e| CropError::ThreadPool(e.to_string()))?;

        let cropped = AtomicUsize::new(0);
        let outputs = pool.install(|| {
            images
                .par_iter()
                .map(|image| {
                    let output = self.crop_one(image, out_dir)?;
                    cropped.fetch_add(1, Ordering::SeqCst);
                    events.send(Event::Crop(CropEvent::ImageCropped {
                        path: image.clone(),
                    }));
                    Ok(output)
                })
                .collect::<Result<Vec<_>, CropError>>()
        })?;

        events.send(Event::Crop(CropEvent::Completed {
            total_cropped: cropped.load(Ordering::SeqCst),
        }));
        Ok(outputs)
    }

    fn crop_one(&self, image: &Path, out_dir: &Path) -> Result<PathBuf, CropError> {
        let file_name = image.file_name().ok_or_else(|| CropError::InvalidPath {
            path: image.to_path_buf(),
        })?;
        let output_path = out_dir.join(file_name);
        let args = self.arguments(image, &output_path);

        let output = run_tool(&self.magick, &args, self.timeout).map_err(|failure| match failure {
            ProcessFailure::Spawn(source) => CropError::Spawn {
                tool: self.magick.clone(),
                path: image.to_path_buf(),
                source,
            },
            ProcessFailure::Io(source) => CropError::ToolFailed {
                tool: self.magick.clone(),
                path: image.to_path_buf(),
                reason: source.to_string(),
            },
            ProcessFailure::TimedOut(limit) => CropError::ToolFailed {
                tool: self.magick.clone(),
                path: image.to_path_buf(),
                reason: format!("timed out after {limit:?}"),
            },
        })?;

        if !output.status.success() {
            return Err(CropError::ToolFailed {
                tool: self.magick.clone(),
                path: image.to_path_buf(),
                reason: format!("exit status {}: {}", output.status, output.stderr.trim()),
            });
        }

        debug!(input = %image.display(), output = %output_path.display(), "cropped");
        Ok(output_path)
    }
}
