//! Attack pattern detectors.
//!
//! Five independent rule evaluators share one [`DetectionContext`]. Each is a
//! pure function returning at most one finding; a window may trigger any
//! number of them. New detectors are added by appending to [`DETECTORS`].

use std::collections::HashMap;

use crate::core::baseline::Baseline;
use crate::core::scoring::Score;
use crate::core::window::{top_counts, WindowMetrics};
use crate::core::Thresholds;
use crate::models::{AttackFinding, AttackType, Protocol, RequestRecord};

/// Inputs shared by every detector for one window
#[derive(Debug, Clone, Copy)]
pub struct DetectionContext<'a> {
    /// Raw records of the window
    pub records: &'a [RequestRecord],
    /// Aggregated metrics of `records`
    pub metrics: &'a WindowMetrics<'a>,
    /// Current baseline
    pub baseline: &'a Baseline,
    /// Detector thresholds
    pub thresholds: &'a Thresholds,
}

/// A pattern detector
pub type DetectorFn = fn(&DetectionContext<'_>) -> Option<AttackFinding>;

/// Registry of detectors, evaluated in this order
pub const DETECTORS: &[(AttackType, DetectorFn)] = &[
    (AttackType::SynFlood, detect_syn_flood),
    (AttackType::HttpFlood, detect_http_flood),
    (AttackType::Slowloris, detect_slowloris),
    (AttackType::UdpFlood, detect_udp_flood),
    (AttackType::RateAnomaly, detect_rate_anomaly),
];

/// Many SYN packets from few hosts
pub fn detect_syn_flood(ctx: &DetectionContext<'_>) -> Option<AttackFinding> {
    let thresholds = ctx.thresholds;
    let syn_count = ctx.metrics.syn_count;
    if syn_count < thresholds.syn_flood_floor {
        return None;
    }

    let sources = ctx.metrics.sources_for(&Protocol::TcpSyn)?;
    if sources.len() >= thresholds.concentration_limit {
        return None;
    }

    let raw_signal = syn_count as f64 / (2 * thresholds.syn_flood_floor) as f64;
    Some(finding(
        ctx,
        AttackType::SynFlood,
        raw_signal,
        all_sources(sources),
        format!("SYN flood detected: {} SYN packets from {} IPs", syn_count, sources.len()),
    ))
}

/// High HTTP volume hitting few distinct paths.
///
/// Implicated sources tied on request count are listed by address, like
/// every other capped source list.
pub fn detect_http_flood(ctx: &DetectionContext<'_>) -> Option<AttackFinding> {
    let thresholds = ctx.thresholds;
    let http_count = ctx.metrics.protocol_count(&Protocol::Http) as usize;
    if http_count < thresholds.http_flood_floor {
        return None;
    }

    // repetitive, scripted requests
    let path_entropy = ctx.metrics.path_entropy;
    if path_entropy >= thresholds.path_entropy_max {
        return None;
    }

    let sources = ctx.metrics.sources_for(&Protocol::Http)?;
    let raw_signal = http_count as f64 / (2 * thresholds.http_flood_floor) as f64;
    Some(finding(
        ctx,
        AttackType::HttpFlood,
        raw_signal,
        top_sources(sources, thresholds.top_sources),
        format!(
            "HTTP flood detected: {} requests with low path diversity (entropy: {:.2})",
            http_count, path_entropy
        ),
    ))
}

/// Many long-held HTTP connections from few hosts
pub fn detect_slowloris(ctx: &DetectionContext<'_>) -> Option<AttackFinding> {
    let thresholds = ctx.thresholds;
    let mut slow_sources: HashMap<&str, u64> = HashMap::new();
    let mut slow_count = 0usize;

    for record in ctx.records {
        if record.protocol == Protocol::Http && record.duration_ms > thresholds.slow_connection_ms {
            slow_count += 1;
            *slow_sources.entry(record.source_ip.as_str()).or_default() += 1;
        }
    }

    if slow_count <= thresholds.slowloris_min_connections || slow_sources.len() >= thresholds.concentration_limit {
        return None;
    }

    let raw_signal = slow_count as f64 / thresholds.slowloris_scale;
    Some(finding(
        ctx,
        AttackType::Slowloris,
        raw_signal,
        all_sources(&slow_sources),
        format!(
            "Slowloris detected: {} slow connections from {} IPs",
            slow_count,
            slow_sources.len()
        ),
    ))
}

/// Raw UDP volume
pub fn detect_udp_flood(ctx: &DetectionContext<'_>) -> Option<AttackFinding> {
    let thresholds = ctx.thresholds;
    let udp_count = ctx.metrics.protocol_count(&Protocol::Udp) as usize;
    if udp_count < thresholds.udp_flood_floor {
        return None;
    }

    let sources = ctx.metrics.sources_for(&Protocol::Udp)?;
    let raw_signal = udp_count as f64 / thresholds.udp_flood_scale;
    Some(finding(
        ctx,
        AttackType::UdpFlood,
        raw_signal,
        top_sources(sources, thresholds.top_sources),
        format!("UDP flood detected: {} UDP packets from {} IPs", udp_count, sources.len()),
    ))
}

/// Request count far above baseline, concentrated on few sources.
///
/// A spike with high source entropy is treated as a flash crowd and ignored.
pub fn detect_rate_anomaly(ctx: &DetectionContext<'_>) -> Option<AttackFinding> {
    let thresholds = ctx.thresholds;
    let metrics = ctx.metrics;
    let request_count = metrics.total_requests as f64;

    let z_score = ctx.baseline.z_score(request_count)?;
    if z_score <= thresholds.rate_z_score || metrics.source_entropy >= thresholds.source_entropy_min {
        return None;
    }

    let raw_signal = z_score / thresholds.rate_z_scale;
    Some(finding(
        ctx,
        AttackType::RateAnomaly,
        raw_signal,
        top_sources(&metrics.source_counts, thresholds.top_sources),
        format!(
            "Rate anomaly detected: {:.0} requests in window (Z-score: {:.2}), low IP entropy: {:.2}",
            request_count, z_score, metrics.source_entropy
        ),
    ))
}

fn finding(
    ctx: &DetectionContext<'_>,
    attack_type: AttackType,
    raw_signal: f64,
    source_ips: Vec<String>,
    description: String,
) -> AttackFinding {
    let score = Score::from_signal(raw_signal);
    AttackFinding {
        attack_type,
        severity: score.severity,
        confidence: score.confidence,
        start_time: ctx.metrics.window_start,
        source_ips,
        description,
        mitigated: false,
    }
}

fn top_sources(counts: &HashMap<&str, u64>, n: usize) -> Vec<String> {
    top_counts(counts, n).into_iter().map(|(ip, _)| ip.to_string()).collect()
}

fn all_sources(counts: &HashMap<&str, u64>) -> Vec<String> {
    top_sources(counts, counts.len())
}
