//! Confidence and severity scoring shared by every detector.

use crate::models::Severity;

/// Normalized confidence and its severity tier
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score {
    pub confidence: f64,
    pub severity: Severity,
}

impl Score {
    /// Score a detector's raw signal
    pub fn from_signal(raw_signal: f64) -> Self {
        let confidence = confidence(raw_signal);
        Self {
            confidence,
            severity: severity(confidence),
        }
    }
}

/// Clamp a raw signal into [0, 1]. NaN maps to 0.
pub fn confidence(raw_signal: f64) -> f64 {
    if raw_signal.is_nan() {
        return 0.0;
    }
    raw_signal.clamp(0.0, 1.0)
}

/// Severity step function of confidence
pub fn severity(confidence: f64) -> Severity {
    if confidence >= 0.9 {
        Severity::Critical
    } else if confidence >= 0.7 {
        Severity::High
    } else if confidence >= 0.5 {
        Severity::Medium
    } else {
        Severity::Low
    }
}
