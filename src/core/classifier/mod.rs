//! # Classifier Module
//!
//! Decides whether a computed difference is anomalous.
//!
//! ## Rule Table
//! | Metric | Rule        | Anomalous when         |
//! |--------|-------------|------------------------|
//! | MSE    | `AtOrAbove` | `difference >= threshold` |
//! | SSIM   | `Below`     | `difference < threshold`  |
//!
//! SSIM is a similarity, not a distance, so its direction is inverted.
//! A new metric adds a row to [`Metric::anomaly_rule`].

use crate::core::metric::Metric;
use serde::{Deserialize, Serialize};

/// Direction in which a value crosses the threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnomalyRule {
    /// Distances: at or above the threshold is anomalous
    AtOrAbove,
    /// Similarities: strictly below the threshold is anomalous
    Below,
}

impl AnomalyRule {
    pub fn is_anomalous(&self, difference: f64, threshold: f64) -> bool {
        match self {
            AnomalyRule::AtOrAbove => difference >= threshold,
            AnomalyRule::Below => difference < threshold,
        }
    }
}

impl Metric {
    /// Threshold direction for this metric
    pub fn anomaly_rule(&self) -> AnomalyRule {
        match self {
            Metric::Mse => AnomalyRule::AtOrAbove,
            Metric::Ssim => AnomalyRule::Below,
        }
    }
}

/// Whether `difference` is anomalous for `metric` at `threshold`
pub fn is_anomalous(difference: f64, threshold: f64, metric: Metric) -> bool {
    metric.anomaly_rule().is_anomalous(difference, threshold)
}

/// Threshold bound to a metric's rule, shared by all scheduler workers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdClassifier {
    threshold: f64,
    metric: Metric,
    rule: AnomalyRule,
}

impl ThresholdClassifier {
    pub fn new(metric: Metric, threshold: f64) -> Self {
        Self {
            threshold,
            metric,
            rule: metric.anomaly_rule(),
        }
    }

    pub fn classify(&self, difference: f64) -> bool {
        self.rule.is_anomalous(difference, self.threshold)
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    /// Human-readable description of the rule
    pub fn description(&self) -> String {
        match self.rule {
            AnomalyRule::AtOrAbove => format!(
                "{}: pairs with difference >= {} are abnormal",
                self.metric, self.threshold
            ),
            AnomalyRule::Below => format!(
                "{}: pairs with similarity < {} are abnormal",
                self.metric, self.threshold
            ),
        }
    }
}
