//! Trait definitions for metric backends.

use super::Metric;
use crate::core::crop::CropConfig;
use crate::core::pairing::ComparisonPair;
use crate::error::BackendError;
use std::path::Path;

/// A similarity metric computed by an external tool
///
/// One call compares one pair in its own process, so a failure is
/// always attributable to exactly that pair.
pub trait MetricBackend: Send + Sync {
    /// Which metric this backend computes
    fn metric(&self) -> Metric;

    /// Path of the external tool this backend runs
    fn tool(&self) -> &Path;

    /// Compare one pair, optionally restricted to a crop rectangle
    ///
    /// The backend encodes `crop` in whatever form its tool expects.
    fn compare(
        &self,
        pair: &ComparisonPair,
        crop: Option<&CropConfig>,
    ) -> Result<f64, BackendError>;
}
