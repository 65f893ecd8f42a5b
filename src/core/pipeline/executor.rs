//! Pipeline execution implementation.

use crate::config::AppConfig;
use crate::core::archive::{AnomalySet, ArchiveCoordinator, ArchiveReport};
use crate::core::classifier::ThresholdClassifier;
use crate::core::crop::{CropConfig, CropMode, CropPreprocessor};
use crate::core::metric::{BackendConfig, Metric, MetricBackend};
use crate::core::pairing::generate_pairs;
use crate::core::reporter::RunSummary;
use crate::core::scanner::{DirectoryScanner, ScanConfig};
use crate::core::scheduler::{BatchScheduler, ComparisonResult};
use crate::error::{ConfigError, CropError, InsufficientInputError, PipelineError};
use crate::events::{
    null_sender, Event, EventSender, PipelineEvent, PipelinePhase, PipelineSummary,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tracing::{debug, info, warn};

/// Result of pipeline execution
#[derive(Debug)]
pub struct PipelineResult {
    /// One result per adjacent pair, sorted by `original`
    pub results: Vec<ComparisonResult>,
    /// Images involved in abnormal pairs
    pub anomalies: AnomalySet,
    /// What the archive stage copied
    pub archived: ArchiveReport,
    /// Images found in the input directory
    pub total_images: usize,
    /// Metric and threshold the results were classified with
    pub metric: Metric,
    pub threshold: f64,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl PipelineResult {
    pub fn abnormal_pairs(&self) -> usize {
        self.results.iter().filter(|r| r.is_abnormal).count()
    }

    /// Serializable view for JSON output
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            metric: self.metric,
            threshold: self.threshold,
            total_images: self.total_images,
            total_pairs: self.results.len(),
            abnormal_pairs: self.abnormal_pairs(),
            abnormal_images: self.anomalies.iter().cloned().collect(),
            archived: self.archived.copied.clone(),
            duration_ms: self.duration_ms,
            results: self.results.clone(),
        }
    }
}

/// Configuration for the pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub metric: Metric,
    pub threshold: f64,
    pub magick_path: Option<PathBuf>,
    pub ffmpeg_path: Option<PathBuf>,
    pub crop: Option<CropConfig>,
    pub crop_mode: CropMode,
    /// Worker pool size (None = host parallelism)
    pub workers: Option<usize>,
    /// Per-call limit for external tools
    pub timeout: Option<Duration>,
    /// Archive sub-directory of the input directory
    pub abnormal_images_directory: Option<String>,
    pub scan_config: ScanConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            metric: Metric::Mse,
            threshold: 0.0,
            magick_path: None,
            ffmpeg_path: None,
            crop: None,
            crop_mode: CropMode::default(),
            workers: None,
            timeout: None,
            abnormal_images_directory: None,
            scan_config: ScanConfig::default(),
        }
    }
}

impl From<&AppConfig> for PipelineConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            metric: config.metric,
            threshold: config.threshold,
            magick_path: config.magick_path.clone(),
            ffmpeg_path: config.ffmpeg_path.clone(),
            crop: config.crop,
            crop_mode: config.crop_mode,
            workers: config.workers,
            timeout: config.compare_timeout,
            abnormal_images_directory: config.abnormal_images_directory.clone(),
            scan_config: ScanConfig::default(),
        }
    }
}

/// Builder for pipeline configuration
pub struct PipelineBuilder {
    config: PipelineConfig,
    backend: Option<Box<dyn MetricBackend>>,
}

impl PipelineBuilder {
    /// Create a new pipeline builder
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            backend: None,
        }
    }

    /// Start from a validated application config
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            config: PipelineConfig::from(config),
            backend: None,
        }
    }

    pub fn metric(mut self, metric: Metric) -> Self {
        self.config.metric = metric;
        self
    }

    pub fn threshold(mut self, threshold: f64) -> Self {
        self.config.threshold = threshold;
        self
    }

    pub fn magick_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.magick_path = Some(path.into());
        self
    }

    pub fn ffmpeg_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.ffmpeg_path = Some(path.into());
        self
    }

    pub fn crop(mut self, crop: Option<CropConfig>) -> Self {
        self.config.crop = crop;
        self
    }

    pub fn crop_mode(mut self, mode: CropMode) -> Self {
        self.config.crop_mode = mode;
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.config.workers = Some(workers);
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Archive abnormal images into `<input_dir>/<name>`
    pub fn abnormal_images_directory(mut self, name: impl Into<String>) -> Self {
        self.config.abnormal_images_directory = Some(name.into());
        self
    }

    /// Set scanner configuration
    pub fn scan_config(mut self, config: ScanConfig) -> Self {
        self.config.scan_config = config;
        self
    }

    /// Use a ready-made backend instead of building one from the tool paths.
    ///
    /// The backend's own metric decides the anomaly rule.
    pub fn backend(mut self, backend: Box<dyn MetricBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Build the pipeline
    pub fn build(self) -> Pipeline {
        Pipeline {
            config: self.config,
            backend: self.backend,
        }
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The frame comparison pipeline
pub struct Pipeline {
    config: PipelineConfig,
    backend: Option<Box<dyn MetricBackend>>,
}

impl Pipeline {
    /// Create a new pipeline builder
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    fn backend_config(&self) -> BackendConfig {
        let mut config = BackendConfig::new(self.config.metric).timeout(self.config.timeout);
        if let Some(magick) = &self.config.magick_path {
            config = config.magick_path(magick.clone());
        }
        if let Some(ffmpeg) = &self.config.ffmpeg_path {
            config = config.ffmpeg_path(ffmpeg.clone());
        }
        config
    }

    /// Run the pipeline without events
    pub fn run(&self, input_dir: &Path) -> Result<PipelineResult, PipelineError> {
        self.run_with_events(input_dir, &null_sender())
    }

    /// Run the pipeline with event reporting
    pub fn run_with_events(
        &self,
        input_dir: &Path,
        events: &EventSender,
    ) -> Result<PipelineResult, PipelineError> {
        events.send(Event::Pipeline(PipelineEvent::Started));

        let outcome = self.execute(input_dir, events);
        if let Err(error) = &outcome {
            warn!(%error, "pipeline failed");
            events.send(Event::Pipeline(PipelineEvent::Error {
                message: error.to_string(),
            }));
        }
        outcome
    }

    fn execute(
        &self,
        input_dir: &Path,
        events: &EventSender,
    ) -> Result<PipelineResult, PipelineError> {
        let start_time = Instant::now();

        let built;
        let backend: &dyn MetricBackend = match &self.backend {
            Some(backend) => backend.as_ref(),
            None => {
                built = self.backend_config().build()?;
                built.as_ref()
            }
        };
        let metric = backend.metric();
        let classifier = ThresholdClassifier::new(metric, self.config.threshold);
        let scheduler = match self.config.workers {
            Some(workers) => BatchScheduler::new(workers),
            None => BatchScheduler::with_available_parallelism(),
        };

        // Phase 1: Scanning
        events.send(Event::Pipeline(PipelineEvent::PhaseChanged {
            phase: PipelinePhase::Scanning,
        }));

        let scanner = DirectoryScanner::new(self.config.scan_config.clone());
        let images = scanner.scan_with_events(input_dir, events)?;
        let total_images = images.len();

        if total_images < 2 {
            return Err(InsufficientInputError {
                found: total_images,
            }
            .into());
        }

        // Phase 2: Cropping (preprocess mode only)
        let preprocess = self
            .config
            .crop
            .filter(|_| self.config.crop_mode == CropMode::Preprocess);

        // Kept alive until the comparisons are done; removed on drop.
        let mut scratch: Option<TempDir> = None;
        let mut cropped_to_source: HashMap<PathBuf, PathBuf> = HashMap::new();

        let compare_images = match preprocess {
            Some(crop) => {
                events.send(Event::Pipeline(PipelineEvent::PhaseChanged {
                    phase: PipelinePhase::Cropping,
                }));

                let magick = self
                    .config
                    .magick_path
                    .as_ref()
                    .ok_or(ConfigError::Missing { key: "MAGICK_PATH" })?;
                let dir = tempfile::Builder::new()
                    .prefix("seq-diff-crop-")
                    .tempdir()
                    .map_err(|source| CropError::TempDir { source })?;

                let cropped = CropPreprocessor::new(magick, crop)
                    .workers(scheduler.workers())
                    .timeout(self.config.timeout)
                    .crop_all(&images, dir.path(), events)?;

                cropped_to_source = cropped.iter().cloned().zip(images.iter().cloned()).collect();
                scratch = Some(dir);
                cropped
            }
            None => images,
        };
        let backend_crop = match preprocess {
            Some(_) => None,
            None => self.config.crop.as_ref(),
        };

        // Phase 3: Comparing
        events.send(Event::Pipeline(PipelineEvent::PhaseChanged {
            phase: PipelinePhase::Comparing,
        }));

        let pairs = generate_pairs(&compare_images)?;
        let total_pairs = pairs.len();
        let mut results = scheduler.run(pairs, backend, &classifier, backend_crop, events)?;

        if !cropped_to_source.is_empty() {
            for result in &mut results {
                restore_source(&mut result.original, &cropped_to_source);
                restore_source(&mut result.altered, &cropped_to_source);
            }
        }
        drop(scratch);

        let anomalies = AnomalySet::from_results(&results);
        let abnormal_pairs = results.iter().filter(|r| r.is_abnormal).count();
        info!(
            pairs = total_pairs,
            abnormal_pairs,
            abnormal_images = anomalies.len(),
            rule = %classifier.description(),
            "classification finished"
        );

        // Phase 4: Archiving
        let destination = self
            .config
            .abnormal_images_directory
            .as_ref()
            .map(|name| input_dir.join(name));
        let archived = if destination.is_some() && !anomalies.is_empty() {
            events.send(Event::Pipeline(PipelineEvent::PhaseChanged {
                phase: PipelinePhase::Archiving,
            }));
            ArchiveCoordinator::new(destination).archive(&anomalies, events)?
        } else {
            debug!("nothing to archive");
            ArchiveReport::default()
        };

        let duration_ms = start_time.elapsed().as_millis() as u64;

        events.send(Event::Pipeline(PipelineEvent::Completed {
            summary: PipelineSummary {
                total_images,
                total_pairs,
                abnormal_pairs,
                abnormal_images: anomalies.len(),
                archived_images: archived.copied.len(),
                duration_ms,
            },
        }));

        Ok(PipelineResult {
            results,
            anomalies,
            archived,
            total_images,
            metric,
            threshold: self.config.threshold,
            duration_ms,
        })
    }
}

fn restore_source(path: &mut PathBuf, cropped_to_source: &HashMap<PathBuf, PathBuf>) {
    if let Some(source) = cropped_to_source.get(path.as_path()) {
        *path = source.clone();
    }
}
