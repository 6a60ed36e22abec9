//! Request record builders for unit tests.

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::models::{Protocol, RequestRecord};

pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
}

pub fn record(source_ip: &str, protocol: Protocol, path: &str, duration_ms: u64) -> RequestRecord {
    RequestRecord {
        id: format!("{}-{}-{}", source_ip, protocol, path),
        timestamp: epoch(),
        source_ip: source_ip.to_string(),
        dest_ip: "192.168.1.100".to_string(),
        source_port: 40000,
        dest_port: if protocol == Protocol::Http { 443 } else { 80 },
        protocol,
        request_path: path.to_string(),
        user_agent: "curl/7.68.0".to_string(),
        bytes_sent: 64,
        bytes_recv: 0,
        status_code: 0,
        duration_ms,
    }
}

/// `count` records spread round-robin over `sources` addresses `10.0.x.y`
pub fn batch(count: usize, sources: usize, protocol: Protocol, paths: &[&str], duration_ms: u64) -> Vec<RequestRecord> {
    (0..count)
        .map(|i| {
            let source = i % sources;
            let mut r = record(
                &format!("10.0.{}.{}", source / 256, source % 256),
                protocol.clone(),
                paths[i % paths.len()],
                duration_ms,
            );
            r.id = format!("r{}", i);
            r.timestamp = epoch() + Duration::milliseconds(i as i64);
            r
        })
        .collect()
}
