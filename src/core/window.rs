//! Window aggregation.
//!
//! Reduces one batch of request records into the counters and derived
//! signals every detector reads. [`WindowMetrics`] borrows the batch it was
//! built from, so it cannot outlive the analysis of that batch.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::core::entropy::shannon_entropy;
use crate::models::{PathCount, Protocol, RequestRecord, SourceCount, TrafficSnapshot};

/// Aggregated metrics of one analysis window
#[derive(Debug, Clone)]
pub struct WindowMetrics<'a> {
    /// Number of records in the window
    pub total_requests: usize,
    /// Number of distinct source addresses
    pub unique_sources: usize,
    /// Records per source address
    pub source_counts: HashMap<&'a str, u64>,
    /// Records per protocol tag
    pub protocol_counts: HashMap<&'a Protocol, u64>,
    /// Records per source address, split by protocol tag
    pub protocol_sources: HashMap<&'a Protocol, HashMap<&'a str, u64>>,
    /// Records per request path
    pub path_counts: HashMap<&'a str, u64>,
    /// Records per status code
    pub status_counts: HashMap<u16, u64>,
    /// Entropy of the source address distribution (bits)
    pub source_entropy: f64,
    /// Entropy of the request path distribution (bits)
    pub path_entropy: f64,
    /// Mean connection duration (ms)
    pub avg_connection_duration: f64,
    /// Records per distinct source
    pub requests_per_source: f64,
    /// Number of `TCP_SYN` records
    pub syn_count: usize,
    /// Total bytes sent by sources
    pub total_bytes_sent: u64,
    /// Earliest record timestamp
    pub window_start: DateTime<Utc>,
    /// Latest record timestamp
    pub window_end: DateTime<Utc>,
}

impl<'a> WindowMetrics<'a> {
    /// Aggregate a batch in a single pass.
    ///
    /// Returns `None` for an empty batch.
    pub fn from_records(records: &'a [RequestRecord]) -> Option<Self> {
        let first = records.first()?;

        let mut source_counts: HashMap<&'a str, u64> = HashMap::new();
        let mut protocol_counts: HashMap<&'a Protocol, u64> = HashMap::new();
        let mut protocol_sources: HashMap<&'a Protocol, HashMap<&'a str, u64>> = HashMap::new();
        let mut path_counts: HashMap<&'a str, u64> = HashMap::new();
        let mut status_counts: HashMap<u16, u64> = HashMap::new();
        let mut total_duration: u64 = 0;
        let mut total_bytes_sent: u64 = 0;
        let mut syn_count = 0;
        let mut window_start = first.timestamp;
        let mut window_end = first.timestamp;

        for record in records {
            *source_counts.entry(record.source_ip.as_str()).or_default() += 1;
            *protocol_counts.entry(&record.protocol).or_default() += 1;
            *protocol_sources
                .entry(&record.protocol)
                .or_default()
                .entry(record.source_ip.as_str())
                .or_default() += 1;
            *path_counts.entry(record.request_path.as_str()).or_default() += 1;
            *status_counts.entry(record.status_code).or_default() += 1;
            total_duration = total_duration.saturating_add(record.duration_ms);
            total_bytes_sent = total_bytes_sent.saturating_add(record.bytes_sent);

            if record.protocol == Protocol::TcpSyn {
                syn_count += 1;
            }
            window_start = window_start.min(record.timestamp);
            window_end = window_end.max(record.timestamp);
        }

        let total_requests = records.len();
        let unique_sources = source_counts.len();
        let requests_per_source = if unique_sources > 0 {
            total_requests as f64 / unique_sources as f64
        } else {
            0.0
        };

        Some(Self {
            total_requests,
            unique_sources,
            source_entropy: shannon_entropy(&source_counts),
            path_entropy: shannon_entropy(&path_counts),
            source_counts,
            protocol_counts,
            protocol_sources,
            path_counts,
            status_counts,
            avg_connection_duration: total_duration as f64 / total_requests as f64,
            requests_per_source,
            syn_count,
            total_bytes_sent,
            window_start,
            window_end,
        })
    }

    /// Number of records carrying `protocol`
    pub fn protocol_count(&self, protocol: &Protocol) -> u64 {
        self.protocol_counts.get(protocol).copied().unwrap_or(0)
    }

    /// Per-source tally of the records carrying `protocol`
    pub fn sources_for(&self, protocol: &Protocol) -> Option<&HashMap<&'a str, u64>> {
        self.protocol_sources.get(protocol)
    }

    /// Build an owned report of this window.
    ///
    /// # Arguments
    ///
    /// * `window_seconds` - Length of the window the records were taken from
    /// * `timestamp` - Time the report is produced
    /// * `top_n` - Number of sources and paths to list
    pub fn snapshot(&self, window_seconds: u64, timestamp: DateTime<Utc>, top_n: usize) -> TrafficSnapshot {
        let seconds = window_seconds.max(1) as f64;
        let total = self.total_requests as f64;

        let top_ips = top_counts(&self.source_counts, top_n)
            .into_iter()
            .map(|(ip, count)| SourceCount {
                ip: ip.to_string(),
                count,
                percentage: count as f64 / total * 100.0,
            })
            .collect();

        let top_paths = top_counts(&self.path_counts, top_n)
            .into_iter()
            .map(|(path, count)| PathCount {
                path: path.to_string(),
                count,
            })
            .collect();

        TrafficSnapshot {
            timestamp,
            window_duration_sec: window_seconds,
            total_requests: self.total_requests,
            unique_ips: self.unique_sources,
            requests_per_sec: total / seconds,
            bytes_per_sec: self.total_bytes_sent as f64 / seconds,
            ip_entropy: self.source_entropy,
            path_entropy: self.path_entropy,
            top_ips,
            top_paths,
            protocol_breakdown: self
                .protocol_counts
                .iter()
                .map(|(protocol, &count)| (protocol.to_string(), count))
                .collect(),
            status_code_dist: self.status_counts.clone(),
            avg_connection_duration: self.avg_connection_duration,
        }
    }
}

fn by_count_then_key(a: &(&str, u64), b: &(&str, u64)) -> Ordering {
    b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0))
}

/// The `n` keys with the highest counts, highest first.
///
/// Equal counts are ordered by key ascending. Fewer than `n` keys are all
/// returned.
pub fn top_counts<'a>(counts: &HashMap<&'a str, u64>, n: usize) -> Vec<(&'a str, u64)> {
    let mut ranked: Vec<(&'a str, u64)> = counts.iter().map(|(&key, &count)| (key, count)).collect();

    if n == 0 {
        return Vec::new();
    }
    if ranked.len() > n {
        ranked.select_nth_unstable_by(n - 1, by_count_then_key);
        ranked.truncate(n);
    }
    ranked.sort_unstable_by(by_count_then_key);
    ranked
}
