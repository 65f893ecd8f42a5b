//! # Archive Module
//!
//! Collects the images involved in abnormal transitions and copies them
//! into an output directory for review.
//!
//! An image flagged by two adjacent pairs (as `altered` of one and
//! `original` of the next) is collected and copied once.

use crate::core::scheduler::ComparisonResult;
use crate::error::ArchiveError;
use crate::events::{ArchiveEvent, Event, EventSender};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Deduplicated image paths from abnormal results, in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnomalySet {
    images: Vec<PathBuf>,
    #[serde(skip)]
    seen: HashSet<PathBuf>,
}

impl AnomalySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Both sides of every abnormal result
    pub fn from_results(results: &[ComparisonResult]) -> Self {
        let mut set = Self::new();
        for result in results.iter().filter(|r| r.is_abnormal) {
            set.insert(result.original.clone());
            set.insert(result.altered.clone());
        }
        set
    }

    /// Returns false if the path was already present
    pub fn insert(&mut self, path: PathBuf) -> bool {
        if self.seen.contains(&path) {
            return false;
        }
        self.seen.insert(path.clone());
        self.images.push(path);
        true
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathBuf> {
        self.images.iter()
    }
}

/// Outcome of an archive pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveReport {
    /// Directory the images went to, if archiving ran
    pub destination: Option<PathBuf>,
    /// Destination paths of the copies, in copy order
    pub copied: Vec<PathBuf>,
}

/// Copies anomalous images into an output directory
#[derive(Debug, Clone)]
pub struct ArchiveCoordinator {
    destination: Option<PathBuf>,
}

impl ArchiveCoordinator {
    pub fn new(destination: Option<PathBuf>) -> Self {
        Self { destination }
    }

    /// Copy each member of `anomalies` once.
    ///
    /// Does nothing when the set is empty or no destination is set. Two
    /// images sharing a file name are rejected before anything is copied.
    /// The first failed copy aborts the rest.
    pub fn archive(
        &self,
        anomalies: &AnomalySet,
        events: &EventSender,
    ) -> Result<ArchiveReport, ArchiveError> {
        let Some(destination) = self.destination.as_ref() else {
            debug!("no archive directory configured, skipping");
            return Ok(ArchiveReport::default());
        };
        if anomalies.is_empty() {
            debug!("no abnormal images, skipping archive");
            return Ok(ArchiveReport::default());
        }

        let targets = target_paths(anomalies, destination)?;

        fs::create_dir_all(destination).map_err(|source| ArchiveError::CreateDirectory {
            path: destination.clone(),
            source,
        })?;

        info!(
            count = anomalies.len(),
            destination = %destination.display(),
            "archiving abnormal images"
        );
        events.send(Event::Archive(ArchiveEvent::Started {
            total_images: anomalies.len(),
            destination: destination.clone(),
        }));

        let mut copied = Vec::with_capacity(targets.len());

        for (source_path, target) in targets {
            fs::copy(source_path, &target).map_err(|source| ArchiveError::Copy {
                source_path: source_path.clone(),
                destination: target.clone(),
                source,
            })?;

            debug!(source = %source_path.display(), target = %target.display(), "copied");
            events.send(Event::Archive(ArchiveEvent::ImageCopied {
                source: source_path.clone(),
                destination: target.clone(),
            }));
            copied.push(target);
        }

        events.send(Event::Archive(ArchiveEvent::Completed {
            total_copied: copied.len(),
        }));

        Ok(ArchiveReport {
            destination: Some(destination.clone()),
            copied,
        })
    }
}

/// Pair each image with its copy inside `destination`
fn target_paths<'a>(
    anomalies: &'a AnomalySet,
    destination: &Path,
) -> Result<Vec<(&'a PathBuf, PathBuf)>, ArchiveError> {
    let mut claimed: HashMap<&OsStr, &PathBuf> = HashMap::with_capacity(anomalies.len());
    let mut targets = Vec::with_capacity(anomalies.len());

    for source_path in anomalies.iter() {
        let file_name = source_path.file_name().ok_or_else(|| ArchiveError::InvalidPath {
            path: source_path.clone(),
        })?;
        if let Some(first) = claimed.insert(file_name, source_path) {
            return Err(ArchiveError::NameCollision {
                first: first.clone(),
                second: source_path.clone(),
                destination: destination.join(file_name),
            });
        }
        targets.push((source_path, destination.join(file_name)));
    }

    Ok(targets)
}
