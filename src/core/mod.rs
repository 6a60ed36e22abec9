//! Core functionality for the DDoS traffic analyzer.
//!
//! This module contains the statistical classifier (entropy estimation,
//! window aggregation, pattern detectors, scoring and the adaptive baseline)
//! together with the analysis pipeline that drives it.

pub mod entropy;
pub mod window;
pub mod scoring;
pub mod detectors;
pub mod baseline;
pub mod analyzer;
pub mod traffic_buffer;
pub mod pipeline;
pub mod telemetry;

#[cfg(test)]
pub(crate) mod fixtures;

use serde::{Deserialize, Serialize};

/// Detector thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Request rate ceiling (requests per second)
    pub requests_per_second: u32,
    /// Z-score above which the window rate is anomalous
    pub rate_z_score: f64,
    /// Source entropy below which traffic counts as concentrated (bits)
    pub source_entropy_min: f64,
    /// Maximum connections per source
    pub connections_per_source: usize,
    /// HTTP connections lasting longer than this are slow (ms)
    pub slow_connection_ms: u64,
    /// Minimum SYN count for a SYN flood
    pub syn_flood_floor: usize,
    /// Minimum HTTP count for an HTTP flood
    pub http_flood_floor: usize,
    /// Floods must come from fewer distinct sources than this
    pub concentration_limit: usize,
    /// Path entropy below which HTTP traffic is repetitive (bits)
    pub path_entropy_max: f64,
    /// Slow connections must exceed this count for Slowloris
    pub slowloris_min_connections: usize,
    /// Slow connection count mapping to full confidence
    pub slowloris_scale: f64,
    /// Minimum UDP count for a UDP flood
    pub udp_flood_floor: usize,
    /// UDP count mapping to full confidence
    pub udp_flood_scale: f64,
    /// Z-score mapping to full confidence
    pub rate_z_scale: f64,
    /// Number of sources listed on capped findings
    pub top_sources: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            requests_per_second: 500,
            rate_z_score: 3.0,
            source_entropy_min: 3.0,
            connections_per_source: 100,
            slow_connection_ms: 30_000,
            syn_flood_floor: 1000,
            http_flood_floor: 2000,
            concentration_limit: 10,
            path_entropy_max: 2.0,
            slowloris_min_connections: 100,
            slowloris_scale: 300.0,
            udp_flood_floor: 2000,
            udp_flood_scale: 5000.0,
            rate_z_scale: 6.0,
            top_sources: 20,
        }
    }
}

pub use analyzer::{TrafficAnalyzer, WindowAnalysis};
pub use baseline::Baseline;
pub use detectors::{DetectionContext, DetectorFn, DETECTORS};
pub use pipeline::{AnalysisPipeline, FindingSink, LogSink, SinkError, WindowReport};
pub use traffic_buffer::TrafficBuffer;
pub use window::WindowMetrics;
