//! Adaptive traffic baseline.
//!
//! The baseline is plain owned state: callers hold it, lend it to the
//! analyzer, and adapt it after windows they consider normal traffic.

use serde::{Deserialize, Serialize};

use crate::core::window::WindowMetrics;

/// Weight of the newest window in the moving averages
pub const SMOOTHING_FACTOR: f64 = 0.1;

/// Reference statistics of normal traffic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Baseline {
    /// Average records per window
    pub average_request_rate: f64,
    /// Average distinct sources per window
    pub average_unique_sources: f64,
    /// Average source entropy (bits)
    pub average_source_entropy: f64,
    /// Standard deviation of the request rate. Not adapted.
    pub standard_deviation: f64,
    /// Average connection duration (ms)
    pub average_connection_duration: f64,
}

impl Default for Baseline {
    fn default() -> Self {
        Self {
            average_request_rate: 100.0,
            average_unique_sources: 50.0,
            average_source_entropy: 5.5,
            standard_deviation: 15.0,
            average_connection_duration: 150.0,
        }
    }
}

impl Baseline {
    /// Fold one window into the moving averages.
    ///
    /// The standard deviation keeps its seed value. Adapting on attack
    /// windows pollutes the baseline; the caller decides which windows qualify.
    pub fn adapt(&mut self, metrics: &WindowMetrics<'_>) {
        self.average_request_rate = smooth(self.average_request_rate, metrics.total_requests as f64);
        self.average_unique_sources = smooth(self.average_unique_sources, metrics.unique_sources as f64);
        self.average_source_entropy = smooth(self.average_source_entropy, metrics.source_entropy);
        self.average_connection_duration =
            smooth(self.average_connection_duration, metrics.avg_connection_duration);
    }

    /// Standard score of `request_count` against the average rate.
    ///
    /// `None` when the standard deviation is not a positive finite number.
    pub fn z_score(&self, request_count: f64) -> Option<f64> {
        if !self.standard_deviation.is_finite() || self.standard_deviation <= 0.0 {
            return None;
        }
        Some((request_count - self.average_request_rate) / self.standard_deviation)
    }
}

fn smooth(previous: f64, current: f64) -> f64 {
    SMOOTHING_FACTOR * current + (1.0 - SMOOTHING_FACTOR) * previous
}
