//! Event type definitions for progress reporting.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// All events emitted by the comparison pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Directory enumeration events
    Scan(ScanEvent),
    /// Crop preprocessing events
    Crop(CropEvent),
    /// Comparison phase events
    Compare(CompareEvent),
    /// Archive phase events
    Archive(ArchiveEvent),
    /// Pipeline-level events
    Pipeline(PipelineEvent),
}

/// Events during directory enumeration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScanEvent {
    /// Scanning has started
    Started { path: PathBuf },
    /// An image was found
    ImageFound { path: PathBuf },
    /// Scanning completed
    Completed { total_images: usize },
}

/// Events during crop preprocessing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CropEvent {
    /// Cropping has started
    Started { total_images: usize },
    /// One image was cropped
    ImageCropped { path: PathBuf },
    /// Cropping completed
    Completed { total_cropped: usize },
}

/// Events during the comparison phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CompareEvent {
    /// Comparison has started
    Started { total_pairs: usize, workers: usize },
    /// Progress update during comparison
    Progress(CompareProgress),
    /// A backend call failed; no further pairs will be dispatched
    Failed {
        original: PathBuf,
        altered: PathBuf,
        message: String,
    },
    /// Comparison completed
    Completed {
        total_compared: usize,
        total_abnormal: usize,
    },
}

/// Progress information during comparison
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareProgress {
    /// Number of pairs compared so far
    pub completed: usize,
    /// Total number of pairs
    pub total: usize,
    /// Pair that just finished
    pub original: PathBuf,
    pub altered: PathBuf,
    /// Difference reported by the backend
    pub difference: f64,
    /// Whether the pair crossed the threshold
    pub is_abnormal: bool,
}

/// Events during the archive phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ArchiveEvent {
    /// Copying has started
    Started { total_images: usize, destination: PathBuf },
    /// One image was copied
    ImageCopied { source: PathBuf, destination: PathBuf },
    /// Copying completed
    Completed { total_copied: usize },
}

/// Pipeline-level events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineEvent {
    /// Pipeline has started
    Started,
    /// Moving to a new phase
    PhaseChanged { phase: PipelinePhase },
    /// Pipeline completed successfully
    Completed { summary: PipelineSummary },
    /// Pipeline encountered a fatal error
    Error { message: String },
}

/// Phases of the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelinePhase {
    Scanning,
    Cropping,
    Comparing,
    Archiving,
}

/// Summary of pipeline results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Total images enumerated
    pub total_images: usize,
    /// Number of adjacent pairs compared
    pub total_pairs: usize,
    /// Number of pairs flagged as abnormal
    pub abnormal_pairs: usize,
    /// Number of distinct images involved in abnormal pairs
    pub abnormal_images: usize,
    /// Number of images copied to the archive directory
    pub archived_images: usize,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl std::fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelinePhase::Scanning => write!(f, "Scanning"),
            PipelinePhase::Cropping => write!(f, "Cropping"),
            PipelinePhase::Comparing => write!(f, "Comparing"),
            PipelinePhase::Archiving => write!(f, "Archiving"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_serializable() {
        let event = Event::Compare(CompareEvent::Progress(CompareProgress {
            completed: 3,
            total: 9,
            original: PathBuf::from("/frames/img2.png"),
            altered: PathBuf::from("/frames/img3.png"),
            difference: 0.02,
            is_abnormal: true,
        }));

        let json = serde_json::to_string(&event).unwrap();
        let deserialized: Event = serde_json::from_str(&json).unwrap();

        match deserialized {
            Event::Compare(CompareEvent::Progress(p)) => {
                assert_eq!(p.completed, 3);
                assert!(p.is_abnormal);
            }
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn pipeline_summary_is_serializable() {
        let summary = PipelineSummary {
            total_images: 4,
            total_pairs: 3,
            abnormal_pairs: 1,
            abnormal_images: 2,
            archived_images: 2,
            duration_ms: 1500,
        };

        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("\"abnormal_images\":2"));
    }

    #[test]
    fn phase_display_names() {
        assert_eq!(PipelinePhase::Cropping.to_string(), "Cropping");
        assert_eq!(PipelinePhase::Archiving.to_string(), "Archiving");
    }
}
