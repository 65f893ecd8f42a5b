//! # Pairing Module
//!
//! Turns an ordered image list into adjacent comparison pairs.
//!
//! Given `img0, img1, img2, img3` the pairs are:
//!
//! | Pair | Original | Altered |
//! |------|----------|---------|
//! | 1    | img0     | img1    |
//! | 2    | img1     | img2    |
//! | 3    | img2     | img3    |
//!
//! The input order is taken as final; nothing here sorts.

use crate::error::InsufficientInputError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Two images adjacent in the capture sequence
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComparisonPair {
    /// The earlier frame (reference)
    pub original: PathBuf,
    /// The later frame
    pub altered: PathBuf,
}

impl ComparisonPair {
    pub fn new(original: impl Into<PathBuf>, altered: impl Into<PathBuf>) -> Self {
        Self {
            original: original.into(),
            altered: altered.into(),
        }
    }

    pub fn original(&self) -> &Path {
        &self.original
    }

    pub fn altered(&self) -> &Path {
        &self.altered
    }
}

/// Build the `N - 1` adjacent pairs of `images`.
///
/// Fails with [`InsufficientInputError`] for 0 or 1 images; whether
/// that is fatal is up to the caller.
pub fn generate_pairs(images: &[PathBuf]) -> Result<Vec<ComparisonPair>, InsufficientInputError> {
    if images.len() < 2 {
        return Err(InsufficientInputError {
            found: images.len(),
        });
    }

    Ok(images
        .windows(2)
        .map(|window| ComparisonPair::new(window[0].clone(), window[1].clone()))
        .collect())
}
