use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::{Baseline, Thresholds};

/// Protocol tag carried by a request record.
///
/// Serialized as its plain text tag (`"TCP_SYN"`, `"HTTP"`, ...). Unknown tags are
/// kept verbatim in [`Protocol::Other`] and ignored by the detectors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Protocol {
    /// Bare TCP SYN segment
    TcpSyn,
    /// HTTP request
    Http,
    /// UDP datagram
    Udp,
    /// Established TCP exchange
    Tcp,
    /// Any other tag
    Other(String),
}

impl Protocol {
    pub fn as_str(&self) -> &str {
        match self {
            Protocol::TcpSyn => "TCP_SYN",
            Protocol::Http => "HTTP",
            Protocol::Udp => "UDP",
            Protocol::Tcp => "TCP",
            Protocol::Other(tag) => tag.as_str(),
        }
    }
}

impl From<String> for Protocol {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "TCP_SYN" => Protocol::TcpSyn,
            "HTTP" => Protocol::Http,
            "UDP" => Protocol::Udp,
            "TCP" => Protocol::Tcp,
            _ => Protocol::Other(tag),
        }
    }
}

impl From<&str> for Protocol {
    fn from(tag: &str) -> Self {
        Protocol::from(tag.to_string())
    }
}

impl From<Protocol> for String {
    fn from(protocol: Protocol) -> Self {
        match protocol {
            Protocol::Other(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One observed network exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestRecord {
    /// Unique record ID
    pub id: String,
    /// Observation time
    pub timestamp: DateTime<Utc>,
    /// Source address
    pub source_ip: String,
    /// Destination address
    pub dest_ip: String,
    /// Source port
    pub source_port: u16,
    /// Destination port
    pub dest_port: u16,
    /// Protocol tag
    pub protocol: Protocol,
    /// Request path (HTTP only, empty otherwise)
    #[serde(default)]
    pub request_path: String,
    /// User agent
    #[serde(default)]
    pub user_agent: String,
    /// Bytes sent by the source
    pub bytes_sent: u64,
    /// Bytes received by the source
    pub bytes_recv: u64,
    /// Response status code (0 when not applicable)
    #[serde(default)]
    pub status_code: u16,
    /// Connection duration in milliseconds
    pub duration_ms: u64,
}

/// Attack pattern a finding classifies a window as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttackType {
    SynFlood,
    HttpFlood,
    Slowloris,
    UdpFlood,
    RateAnomaly,
}

impl AttackType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttackType::SynFlood => "SYN_FLOOD",
            AttackType::HttpFlood => "HTTP_FLOOD",
            AttackType::Slowloris => "SLOWLORIS",
            AttackType::UdpFlood => "UDP_FLOOD",
            AttackType::RateAnomaly => "RATE_ANOMALY",
        }
    }
}

impl fmt::Display for AttackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity tier derived from confidence
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A detector's positive output for one window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackFinding {
    /// Attack pattern
    #[serde(rename = "type")]
    pub attack_type: AttackType,
    /// Severity tier
    pub severity: Severity,
    /// Confidence in [0, 1]
    pub confidence: f64,
    /// Start of the window the finding was raised on
    pub start_time: DateTime<Utc>,
    /// Implicated source addresses, most active first
    pub source_ips: Vec<String>,
    /// Human-readable description with the measured values
    pub description: String,
    /// Whether a mitigation has been applied
    pub mitigated: bool,
}

/// Alert level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertLevel {
    Info,
    Warning,
    Critical,
}

impl From<Severity> for AlertLevel {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Low => AlertLevel::Info,
            Severity::Medium => AlertLevel::Warning,
            Severity::High | Severity::Critical => AlertLevel::Critical,
        }
    }
}

/// Notification raised for a finding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    /// Alert ID
    pub id: String,
    /// Alert level
    pub level: AlertLevel,
    /// Alert title
    pub title: String,
    /// Alert message
    pub message: String,
    /// Attack pattern that raised the alert
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attack_type: Option<AttackType>,
    /// Most active implicated source
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_ip: Option<String>,
    /// Alert creation timestamp
    pub timestamp: DateTime<Utc>,
    /// Whether an operator acknowledged the alert
    pub acknowledged: bool,
}

impl Alert {
    /// Build the alert announcing a finding
    pub fn from_finding(finding: &AttackFinding, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            level: finding.severity.into(),
            title: format!("{} Attack Detected", finding.attack_type),
            message: finding.description.clone(),
            attack_type: Some(finding.attack_type),
            source_ip: finding.source_ips.first().cloned(),
            timestamp,
            acknowledged: false,
        }
    }
}

/// Source address with its share of the window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceCount {
    pub ip: String,
    pub count: u64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathCount {
    pub path: String,
    pub count: u64,
}

/// Owned per-window report handed to dashboards and logs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrafficSnapshot {
    pub timestamp: DateTime<Utc>,
    pub window_duration_sec: u64,
    pub total_requests: usize,
    pub unique_ips: usize,
    pub requests_per_sec: f64,
    pub bytes_per_sec: f64,
    pub ip_entropy: f64,
    pub path_entropy: f64,
    pub top_ips: Vec<SourceCount>,
    pub top_paths: Vec<PathCount>,
    pub protocol_breakdown: HashMap<String, u64>,
    pub status_code_dist: HashMap<u16, u64>,
    pub avg_connection_duration: f64,
}

/// Overall traffic status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrafficStatus {
    Normal,
    UnderAttack,
}

/// Summary of the latest analysed window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub status: TrafficStatus,
    pub active_attacks: usize,
    pub current_rps: f64,
    pub unique_ips: usize,
}

impl Default for SummaryStats {
    fn default() -> Self {
        Self {
            status: TrafficStatus::Normal,
            active_attacks: 0,
            current_rps: 0.0,
            unique_ips: 0,
        }
    }
}

/// Analysis engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Length of the analysed window in seconds
    pub window_seconds: u64,
    /// Delay between analysis cycles in seconds
    pub interval_seconds: u64,
    /// How long records stay buffered in seconds
    pub retention_seconds: u64,
    /// Adapt the baseline after windows that raised no finding
    pub adapt_on_quiet_windows: bool,
    /// Window snapshots kept in the pipeline history
    pub history_size: usize,
    /// Seconds an attack stays active after it was last detected
    pub attack_expiry_seconds: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window_seconds: 60,
            interval_seconds: 5,
            retention_seconds: 300,
            adapt_on_quiet_windows: true,
            history_size: 60,
            attack_expiry_seconds: 300,
        }
    }
}

/// Synthetic traffic configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Whether to feed synthetic traffic into the engine
    pub enabled: bool,
    /// RNG seed
    pub seed: u64,
    /// Normal requests generated per second
    pub normal_rate: usize,
    /// Attack scenario to inject (`none`, `syn_flood`, `http_flood`, `slowloris`, `udp_flood`)
    pub scenario: String,
    /// Seconds between attack injections
    pub attack_interval_seconds: u64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            seed: 42,
            normal_rate: 100,
            scenario: "none".to_string(),
            attack_interval_seconds: 30,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Analysis engine configuration
    pub engine: EngineConfig,
    /// Detector thresholds
    pub thresholds: Thresholds,
    /// Baseline seed values
    pub baseline: Baseline,
    /// Synthetic traffic configuration
    pub simulator: SimulatorConfig,
}
