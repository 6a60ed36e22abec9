//! DDoS Traffic Analyzer
//!
//! Statistical classifier for denial-of-service traffic patterns. A window of
//! request records is aggregated once, checked by a fixed battery of pattern
//! detectors, and scored against an adaptive baseline of normal traffic.

pub mod config;
pub mod core;
pub mod models;
pub mod simulator;
