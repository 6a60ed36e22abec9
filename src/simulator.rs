//! Synthetic traffic generator.
//!
//! Produces seeded, reproducible request records for demos and benchmarks:
//! background user traffic plus the attack shapes the detectors look for.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::info;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use thiserror::Error;
use tokio::sync::{watch, RwLock};
use tokio::time;
use uuid::Builder;

use crate::core::TrafficBuffer;
use crate::models::{Protocol, RequestRecord, SimulatorConfig};

const TARGET_IP: &str = "192.168.1.100";

const USER_AGENTS: [&str; 4] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 14_6 like Mac OS X)",
];

const PATHS: [&str; 10] = [
    "/", "/api/users", "/api/products", "/login", "/dashboard",
    "/profile", "/search", "/checkout", "/api/orders", "/help",
];

/// Errors that can occur while simulating traffic
#[derive(Error, Debug)]
pub enum SimulatorError {
    #[error("Unknown scenario: {0}")]
    UnknownScenario(String),
}

/// Traffic shape to generate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    /// Background traffic only
    None,
    SynFlood,
    HttpFlood,
    Slowloris,
    UdpFlood,
    /// Every attack in turn
    Cycle,
}

impl Scenario {
    const ATTACKS: [Scenario; 4] = [
        Scenario::HttpFlood,
        Scenario::SynFlood,
        Scenario::Slowloris,
        Scenario::UdpFlood,
    ];
}

impl FromStr for Scenario {
    type Err = SimulatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "normal" => Ok(Scenario::None),
            "syn_flood" => Ok(Scenario::SynFlood),
            "http_flood" => Ok(Scenario::HttpFlood),
            "slowloris" => Ok(Scenario::Slowloris),
            "udp_flood" => Ok(Scenario::UdpFlood),
            "cycle" => Ok(Scenario::Cycle),
            other => Err(SimulatorError::UnknownScenario(other.to_string())),
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Scenario::None => "none",
            Scenario::SynFlood => "syn_flood",
            Scenario::HttpFlood => "http_flood",
            Scenario::Slowloris => "slowloris",
            Scenario::UdpFlood => "udp_flood",
            Scenario::Cycle => "cycle",
        };
        f.write_str(name)
    }
}

/// Seeded request record generator
pub struct TrafficSimulator {
    rng: ChaCha8Rng,
}

impl TrafficSimulator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    fn id(&mut self) -> String {
        Builder::from_random_bytes(self.rng.gen()).into_uuid().to_string()
    }

    fn random_ip(&mut self) -> String {
        let octets: [u8; 4] = self.rng.gen();
        format!("{}.{}.{}.{}", octets[0], octets[1], octets[2], octets[3])
    }

    fn botnet(&mut self, size: usize) -> Vec<String> {
        (0..size).map(|_| self.random_ip()).collect()
    }

    fn pick<'a>(&mut self, items: &'a [String]) -> &'a str {
        items.choose(&mut self.rng).map(String::as_str).unwrap_or(TARGET_IP)
    }

    fn base(&mut self, at: DateTime<Utc>, source_ip: String, protocol: Protocol) -> RequestRecord {
        RequestRecord {
            id: self.id(),
            timestamp: at,
            source_ip,
            dest_ip: TARGET_IP.to_string(),
            source_port: self.rng.gen_range(1024..=u16::MAX),
            dest_port: 80,
            protocol,
            request_path: String::new(),
            user_agent: String::new(),
            bytes_sent: 0,
            bytes_recv: 0,
            status_code: 0,
            duration_ms: 0,
        }
    }

    /// One ordinary user request
    pub fn normal_request(&mut self, at: DateTime<Utc>) -> RequestRecord {
        let source_ip = self.random_ip();
        let mut record = self.base(at, source_ip, Protocol::Http);
        record.dest_port = 443;
        record.request_path = PATHS[self.rng.gen_range(0..PATHS.len())].to_string();
        record.user_agent = USER_AGENTS[self.rng.gen_range(0..USER_AGENTS.len())].to_string();
        record.bytes_sent = self.rng.gen_range(100..1100);
        record.bytes_recv = self.rng.gen_range(200..5200);
        record.status_code = 200;
        record.duration_ms = self.rng.gen_range(50..250);
        record
    }

    pub fn normal_traffic(&mut self, count: usize, at: DateTime<Utc>) -> Vec<RequestRecord> {
        (0..count).map(|_| self.normal_request(at)).collect()
    }

    /// SYN packets from three hosts
    pub fn syn_flood(&mut self, at: DateTime<Utc>) -> Vec<RequestRecord> {
        let attackers = vec!["203.0.113.10".to_string(), "203.0.113.11".to_string(), "203.0.113.12".to_string()];
        let count = self.rng.gen_range(1000..5000);

        (0..count)
            .map(|_| {
                let source_ip = self.pick(&attackers).to_string();
                let mut record = self.base(at, source_ip, Protocol::TcpSyn);
                record.bytes_sent = 64;
                record
            })
            .collect()
    }

    /// Scripted requests from a botnet against two paths
    pub fn http_flood(&mut self, at: DateTime<Utc>) -> Vec<RequestRecord> {
        let attackers = self.botnet(50);
        let targets = ["/api/search", "/login"];
        let count = self.rng.gen_range(2000..5000);

        (0..count)
            .map(|_| {
                let source_ip = self.pick(&attackers).to_string();
                let mut record = self.base(at, source_ip, Protocol::Http);
                record.dest_port = 443;
                record.request_path = targets[self.rng.gen_range(0..targets.len())].to_string();
                record.user_agent = "curl/7.68.0".to_string();
                record.bytes_sent = self.rng.gen_range(100..600);
                record.bytes_recv = self.rng.gen_range(200..1200);
                record.status_code = 200;
                record.duration_ms = self.rng.gen_range(20..120);
                record
            })
            .collect()
    }

    /// Long-held HTTP connections from three hosts
    pub fn slowloris(&mut self, at: DateTime<Utc>) -> Vec<RequestRecord> {
        let attackers = vec!["198.51.100.20".to_string(), "198.51.100.21".to_string(), "198.51.100.22".to_string()];
        let count = self.rng.gen_range(200..700);

        (0..count)
            .map(|_| {
                let source_ip = self.pick(&attackers).to_string();
                let mut record = self.base(at, source_ip, Protocol::Http);
                record.request_path = "/".to_string();
                record.bytes_sent = 10;
                record.duration_ms = self.rng.gen_range(60_000..90_000);
                record
            })
            .collect()
    }

    /// UDP datagrams from a botnet to random ports
    pub fn udp_flood(&mut self, at: DateTime<Utc>) -> Vec<RequestRecord> {
        let attackers = self.botnet(30);
        let count = self.rng.gen_range(3000..8000);

        (0..count)
            .map(|_| {
                let source_ip = self.pick(&attackers).to_string();
                let mut record = self.base(at, source_ip, Protocol::Udp);
                record.dest_port = self.rng.gen();
                record.bytes_sent = self.rng.gen_range(100..1500);
                record
            })
            .collect()
    }

    /// Attack records for one tick of `scenario`; `None` and `Cycle` yield nothing
    pub fn attack(&mut self, scenario: Scenario, at: DateTime<Utc>) -> Vec<RequestRecord> {
        match scenario {
            Scenario::SynFlood => self.syn_flood(at),
            Scenario::HttpFlood => self.http_flood(at),
            Scenario::Slowloris => self.slowloris(at),
            Scenario::UdpFlood => self.udp_flood(at),
            Scenario::None | Scenario::Cycle => Vec::new(),
        }
    }
}

/// Feed synthetic traffic into `buffer` once per second until shutdown.
///
/// Attacks run for `attack_interval_seconds`, then pause for as long. The
/// `cycle` scenario moves to the next attack after every pause.
pub async fn feed(
    buffer: Arc<RwLock<TrafficBuffer>>,
    config: SimulatorConfig,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), SimulatorError> {
    let scenario: Scenario = config.scenario.parse()?;
    let mut simulator = TrafficSimulator::new(config.seed);
    let phase_ticks = config.attack_interval_seconds.max(1);
    let mut ticker = time::interval(Duration::from_secs(1));
    let mut tick: u64 = 0;

    info!(
        "Traffic simulator started: {} normal req/s, scenario {}",
        config.normal_rate, scenario
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let now = Utc::now();
                let mut records = simulator.normal_traffic(config.normal_rate, now);

                let phase = tick / phase_ticks;
                let current = match scenario {
                    Scenario::Cycle => Scenario::ATTACKS[(phase / 2) as usize % Scenario::ATTACKS.len()],
                    other => other,
                };
                if phase % 2 == 0 && current != Scenario::None {
                    if tick % phase_ticks == 0 {
                        info!("Starting {} attack", current);
                    }
                    records.extend(simulator.attack(current, now));
                }

                buffer.write().await.extend(records);
                tick += 1;
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    info!("Traffic simulator stopped");
    Ok(())
}
