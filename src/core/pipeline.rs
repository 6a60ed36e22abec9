//! Analysis pipeline for the DDoS traffic analyzer.
//!
//! Periodically takes the most recent window from the traffic buffer,
//! classifies it, raises one alert per finding and, for quiet windows,
//! adapts the baseline. The baseline lives behind a single mutex that is
//! held for the whole analyze-and-adapt cycle, so concurrent callers never
//! observe a half-updated baseline.
//!
//! Besides the latest report the pipeline keeps a bounded history of window
//! snapshots and the attacks raised so far. An attack stays active until it
//! has not been detected for `attack_expiry_seconds`.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use thiserror::Error;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::time;

use crate::core::analyzer::TrafficAnalyzer;
use crate::core::baseline::Baseline;
use crate::core::telemetry;
use crate::core::traffic_buffer::{span_seconds, span_start, TrafficBuffer};
use crate::models::{
    Alert, AttackFinding, EngineConfig, RequestRecord, SummaryStats, TrafficSnapshot, TrafficStatus,
};

/// Errors that can occur while publishing alerts
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Sink unavailable: {0}")]
    Unavailable(String),
}

/// Destination for alerts raised by the pipeline
#[cfg_attr(test, mockall::automock)]
pub trait FindingSink: Send + Sync {
    fn publish(&self, alert: &Alert) -> Result<(), SinkError>;
}

/// Sink writing each alert to the log as JSON
#[derive(Debug, Default)]
pub struct LogSink;

impl FindingSink for LogSink {
    fn publish(&self, alert: &Alert) -> Result<(), SinkError> {
        let json = serde_json::to_string(alert)?;
        warn!("Alert: {}", json);
        Ok(())
    }
}

/// Outcome of one analysis cycle
#[derive(Debug, Clone)]
pub struct WindowReport {
    pub snapshot: TrafficSnapshot,
    pub findings: Vec<AttackFinding>,
    pub alerts: Vec<Alert>,
    pub baseline_adapted: bool,
}

#[derive(Debug)]
struct ActiveAttack {
    finding: AttackFinding,
    last_seen: DateTime<Utc>,
}

/// Reports, snapshots and attacks retained between cycles
#[derive(Debug, Default)]
struct PipelineState {
    latest: Option<WindowReport>,
    history: VecDeque<TrafficSnapshot>,
    active: Vec<ActiveAttack>,
    attacks: VecDeque<AttackFinding>,
}

impl PipelineState {
    fn record(&mut self, report: WindowReport, now: DateTime<Utc>, config: &EngineConfig) {
        push_bounded(&mut self.history, report.snapshot.clone(), config.history_size);

        for finding in &report.findings {
            match self
                .active
                .iter_mut()
                .find(|active| active.finding.attack_type == finding.attack_type)
            {
                Some(active) => {
                    let start_time = active.finding.start_time.min(finding.start_time);
                    active.finding = finding.clone();
                    active.finding.start_time = start_time;
                    active.last_seen = now;
                }
                None => {
                    info!("Attack started: {}", finding.attack_type);
                    self.active.push(ActiveAttack {
                        finding: finding.clone(),
                        last_seen: now,
                    });
                    push_bounded(&mut self.attacks, finding.clone(), config.history_size);
                }
            }
        }

        if let Some(cutoff) = span_start(now, span_seconds(config.attack_expiry_seconds)) {
            self.active.retain(|active| {
                let live = active.last_seen >= cutoff;
                if !live {
                    info!("Attack ended: {}", active.finding.attack_type);
                }
                live
            });
        }

        self.latest = Some(report);
    }
}

fn push_bounded<T>(queue: &mut VecDeque<T>, item: T, capacity: usize) {
    if capacity == 0 {
        return;
    }
    while queue.len() >= capacity {
        queue.pop_front();
    }
    queue.push_back(item);
}

/// Analysis pipeline owning the baseline
pub struct AnalysisPipeline {
    analyzer: TrafficAnalyzer,
    baseline: Mutex<Baseline>,
    buffer: Arc<RwLock<TrafficBuffer>>,
    sink: Box<dyn FindingSink>,
    config: EngineConfig,
    state: RwLock<PipelineState>,
}

impl AnalysisPipeline {
    /// Create a new analysis pipeline
    pub fn new(
        analyzer: TrafficAnalyzer,
        baseline: Baseline,
        buffer: Arc<RwLock<TrafficBuffer>>,
        sink: Box<dyn FindingSink>,
        config: EngineConfig,
    ) -> Self {
        Self {
            analyzer,
            baseline: Mutex::new(baseline),
            buffer,
            sink,
            config,
            state: RwLock::new(PipelineState::default()),
        }
    }

    /// Current baseline
    pub async fn baseline(&self) -> Baseline {
        self.baseline.lock().await.clone()
    }

    /// Analyze one batch of records.
    ///
    /// # Arguments
    ///
    /// * `records` - Records of the window
    /// * `now` - Time the window is analysed
    ///
    /// # Returns
    ///
    /// * `None` for an empty batch
    /// * `Some(WindowReport)` otherwise
    pub async fn analyze_batch(&self, records: &[RequestRecord], now: DateTime<Utc>) -> Option<WindowReport> {
        let mut baseline = self.baseline.lock().await;
        let analysis = self.analyzer.analyze_window(records, &baseline)?;
        telemetry::record_window(&analysis.findings);

        let mut alerts = Vec::with_capacity(analysis.findings.len());
        for finding in &analysis.findings {
            warn!(
                "Attack detected: {} (Confidence: {:.2}, Severity: {})",
                finding.attack_type, finding.confidence, finding.severity
            );
            let alert = Alert::from_finding(finding, now);
            if let Err(e) = self.sink.publish(&alert) {
                error!("Failed to publish alert {}: {}", alert.id, e);
            }
            alerts.push(alert);
        }

        let snapshot = analysis
            .metrics
            .snapshot(self.config.window_seconds, now, self.analyzer.thresholds().top_sources);

        let baseline_adapted = self.config.adapt_on_quiet_windows && analysis.findings.is_empty();
        if baseline_adapted {
            baseline.adapt(&analysis.metrics);
            telemetry::record_baseline(&baseline);
            debug!(
                "Baseline adapted: rate {:.1}, sources {:.1}, entropy {:.2}",
                baseline.average_request_rate, baseline.average_unique_sources, baseline.average_source_entropy
            );
        }
        drop(baseline);

        let report = WindowReport {
            snapshot,
            findings: analysis.findings,
            alerts,
            baseline_adapted,
        };
        self.state.write().await.record(report.clone(), now, &self.config);
        Some(report)
    }

    /// Evict expired records and analyze the latest window of the buffer
    pub async fn run_cycle(&self, now: DateTime<Utc>) -> Option<WindowReport> {
        let records = {
            let mut buffer = self.buffer.write().await;
            let evicted = buffer.evict(now);
            if evicted > 0 {
                debug!("Evicted {} expired records", evicted);
            }
            buffer.recent(now, self.config.window_seconds)
        };

        if records.is_empty() {
            debug!("No traffic in the current window");
            return None;
        }
        self.analyze_batch(&records, now).await
    }

    /// Run analysis cycles until `shutdown` flips to `true`
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!("Analysis engine started");
        let mut interval = time::interval(Duration::from_secs(self.config.interval_seconds.max(1)));

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Some(report) = self.run_cycle(Utc::now()).await {
                        info!(
                            "Window analysed: {} requests, {} unique IPs, {} findings",
                            report.snapshot.total_requests,
                            report.snapshot.unique_ips,
                            report.findings.len()
                        );
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("Analysis engine stopped");
    }

    /// Latest window report
    pub async fn latest(&self) -> Option<WindowReport> {
        self.state.read().await.latest.clone()
    }

    /// Snapshots of the retained windows, oldest first
    pub async fn history(&self) -> Vec<TrafficSnapshot> {
        self.state.read().await.history.iter().cloned().collect()
    }

    /// Attacks detected within the expiry period, in order of first detection.
    ///
    /// Each entry is the most recent finding of its type, with `start_time`
    /// set to the start of the first window that raised it.
    pub async fn active_findings(&self) -> Vec<AttackFinding> {
        self.state
            .read()
            .await
            .active
            .iter()
            .map(|active| active.finding.clone())
            .collect()
    }

    /// Attacks as first detected, oldest first
    pub async fn attack_history(&self) -> Vec<AttackFinding> {
        self.state.read().await.attacks.iter().cloned().collect()
    }

    /// Current status from the active attacks and the latest window
    pub async fn summary(&self) -> SummaryStats {
        let state = self.state.read().await;
        let Some(report) = state.latest.as_ref() else {
            return SummaryStats::default();
        };

        SummaryStats {
            status: if state.active.is_empty() {
                TrafficStatus::Normal
            } else {
                TrafficStatus::UnderAttack
            },
            active_attacks: state.active.len(),
            current_rps: report.snapshot.requests_per_sec,
            unique_ips: report.snapshot.unique_ips,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixtures::{batch, epoch};
    use crate::models::{AlertLevel, AttackType, Protocol};
    use chrono::Duration as ChronoDuration;

    fn pipeline(sink: Box<dyn FindingSink>, config: EngineConfig) -> (AnalysisPipeline, Arc<RwLock<TrafficBuffer>>) {
        let buffer = Arc::new(RwLock::new(TrafficBuffer::new(config.retention_seconds)));
        let pipeline = AnalysisPipeline::new(
            TrafficAnalyzer::default(),
            Baseline::default(),
            buffer.clone(),
            sink,
            config,
        );
        (pipeline, buffer)
    }

    #[tokio::test]
    async fn test_attack_window_publishes_alert_and_keeps_baseline() {
        let mut sink = MockFindingSink::new();
        sink.expect_publish()
            .withf(|alert| alert.attack_type == Some(AttackType::SynFlood) && alert.level == AlertLevel::Critical)
            .times(1)
            .returning(|_| Ok(()));
        // the SYN burst also registers as a rate anomaly
        sink.expect_publish()
            .withf(|alert| alert.attack_type == Some(AttackType::RateAnomaly))
            .times(1)
            .returning(|_| Ok(()));
        let (pipeline, _) = pipeline(Box::new(sink), EngineConfig::default());

        let records = batch(1900, 3, Protocol::TcpSyn, &[""], 0);
        let report = pipeline.analyze_batch(&records, epoch()).await.unwrap();

        let types: Vec<AttackType> = report.findings.iter().map(|f| f.attack_type).collect();
        assert_eq!(types, vec![AttackType::SynFlood, AttackType::RateAnomaly]);
        assert!(!report.baseline_adapted);
        assert_eq!(pipeline.baseline().await, Baseline::default());
    }

    #[tokio::test]
    async fn test_quiet_window_adapts_baseline() {
        let mut sink = MockFindingSink::new();
        sink.expect_publish().never();
        let (pipeline, _) = pipeline(Box::new(sink), EngineConfig::default());

        let records = batch(150, 150, Protocol::Http, &["/"], 100);
        let report = pipeline.analyze_batch(&records, epoch()).await.unwrap();

        assert!(report.findings.is_empty());
        assert!(report.baseline_adapted);
        let baseline = pipeline.baseline().await;
        assert!((baseline.average_request_rate - 105.0).abs() < 1e-9);
        assert_eq!(baseline.standard_deviation, 15.0);
    }

    #[tokio::test]
    async fn test_adaptation_can_be_disabled() {
        let mut sink = MockFindingSink::new();
        sink.expect_publish().never();
        let config = EngineConfig {
            adapt_on_quiet_windows: false,
            ..EngineConfig::default()
        };
        let (pipeline, _) = pipeline(Box::new(sink), config);

        let records = batch(150, 150, Protocol::Http, &["/"], 100);
        let report = pipeline.analyze_batch(&records, epoch()).await.unwrap();

        assert!(!report.baseline_adapted);
        assert_eq!(pipeline.baseline().await, Baseline::default());
    }

    #[tokio::test]
    async fn test_sink_failure_does_not_abort_cycle() {
        let mut sink = MockFindingSink::new();
        sink.expect_publish()
            .returning(|_| Err(SinkError::Unavailable("alert channel closed".to_string())));
        let (pipeline, _) = pipeline(Box::new(sink), EngineConfig::default());

        let records = batch(2600, 15, Protocol::Udp, &[""], 0);
        let report = pipeline.analyze_batch(&records, epoch()).await.unwrap();

        assert_eq!(report.alerts.len(), report.findings.len());
        assert_eq!(report.findings[0].attack_type, AttackType::UdpFlood);
    }

    #[tokio::test]
    async fn test_run_cycle_reads_recent_window() {
        let mut sink = MockFindingSink::new();
        sink.expect_publish().returning(|_| Ok(()));
        let (pipeline, buffer) = pipeline(Box::new(sink), EngineConfig::default());

        let mut stale = batch(2500, 3, Protocol::Udp, &[""], 0);
        for record in &mut stale {
            record.timestamp = epoch() - ChronoDuration::seconds(120);
        }
        let fresh = batch(120, 100, Protocol::Http, &["/", "/login", "/search"], 90);
        {
            let mut buffer = buffer.write().await;
            buffer.extend(stale);
            buffer.extend(fresh);
        }

        let report = pipeline.run_cycle(epoch() + ChronoDuration::seconds(1)).await.unwrap();
        assert_eq!(report.snapshot.total_requests, 120);
        assert!(report.findings.is_empty());
        assert_eq!(pipeline.summary().await.status, TrafficStatus::Normal);
        assert_eq!(buffer.read().await.len(), 2620);
    }

    #[tokio::test]
    async fn test_empty_buffer_skips_cycle() {
        let (pipeline, _) = pipeline(Box::new(LogSink), EngineConfig::default());
        assert!(pipeline.run_cycle(epoch()).await.is_none());
        assert!(pipeline.analyze_batch(&[], epoch()).await.is_none());
        assert!(pipeline.latest().await.is_none());
    }

    #[tokio::test]
    async fn test_summary_reports_attack_status() {
        let (pipeline, _) = pipeline(Box::new(LogSink), EngineConfig::default());
        assert_eq!(pipeline.summary().await, SummaryStats::default());

        let records = batch(3000, 20, Protocol::Http, &["/api/search"], 60);
        pipeline.analyze_batch(&records, epoch()).await.unwrap();

        let summary = pipeline.summary().await;
        assert_eq!(summary.status, TrafficStatus::UnderAttack);
        assert!(summary.active_attacks >= 1);
        assert_eq!(summary.current_rps, 50.0);
        assert_eq!(summary.unique_ips, 20);
    }

    #[tokio::test]
    async fn test_attack_outlives_following_quiet_window() {
        let (pipeline, _) = pipeline(Box::new(LogSink), EngineConfig::default());

        let attack = batch(2500, 4, Protocol::Udp, &[""], 0);
        pipeline.analyze_batch(&attack, epoch()).await.unwrap();
        let quiet = batch(120, 100, Protocol::Http, &["/", "/login", "/search"], 90);
        let report = pipeline
            .analyze_batch(&quiet, epoch() + ChronoDuration::seconds(5))
            .await
            .unwrap();
        assert!(report.findings.is_empty());

        let summary = pipeline.summary().await;
        assert_eq!(summary.status, TrafficStatus::UnderAttack);
        assert_eq!(summary.active_attacks, 2);
        assert_eq!(summary.unique_ips, 100);

        let active: Vec<AttackType> = pipeline.active_findings().await.iter().map(|f| f.attack_type).collect();
        assert_eq!(active, vec![AttackType::UdpFlood, AttackType::RateAnomaly]);

        // no detection for longer than the expiry period
        pipeline
            .analyze_batch(&quiet, epoch() + ChronoDuration::seconds(306))
            .await
            .unwrap();
        let summary = pipeline.summary().await;
        assert_eq!(summary.status, TrafficStatus::Normal);
        assert_eq!(summary.active_attacks, 0);
        assert!(pipeline.active_findings().await.is_empty());
        assert_eq!(pipeline.attack_history().await.len(), 2);
    }

    #[tokio::test]
    async fn test_repeated_attack_keeps_first_start_time() {
        let (pipeline, _) = pipeline(Box::new(LogSink), EngineConfig::default());

        let first = batch(1900, 3, Protocol::TcpSyn, &[""], 0);
        pipeline.analyze_batch(&first, epoch()).await.unwrap();
        let mut second = batch(3000, 3, Protocol::TcpSyn, &[""], 0);
        for record in &mut second {
            record.timestamp = record.timestamp + ChronoDuration::seconds(10);
        }
        pipeline
            .analyze_batch(&second, epoch() + ChronoDuration::seconds(10))
            .await
            .unwrap();

        let active = pipeline.active_findings().await;
        assert_eq!(active.len(), 2);
        assert_eq!(active[0].attack_type, AttackType::SynFlood);
        assert_eq!(active[0].start_time, epoch());
        assert_eq!(active[0].confidence, 1.0);
        assert_eq!(pipeline.attack_history().await.len(), 2);
    }

    #[tokio::test]
    async fn test_history_is_bounded() {
        let config = EngineConfig {
            history_size: 3,
            ..EngineConfig::default()
        };
        let (pipeline, _) = pipeline(Box::new(LogSink), config);
        assert!(pipeline.history().await.is_empty());

        let records = batch(120, 100, Protocol::Http, &["/", "/login", "/search"], 90);
        for minute in 0..5 {
            pipeline
                .analyze_batch(&records, epoch() + ChronoDuration::minutes(minute))
                .await
                .unwrap();
        }

        let timestamps: Vec<_> = pipeline.history().await.iter().map(|s| s.timestamp).collect();
        assert_eq!(
            timestamps,
            vec![
                epoch() + ChronoDuration::minutes(2),
                epoch() + ChronoDuration::minutes(3),
                epoch() + ChronoDuration::minutes(4),
            ]
        );
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let (pipeline, _) = pipeline(Box::new(LogSink), EngineConfig::default());
        let (tx, rx) = watch::channel(false);

        let stopper = async move {
            tx.send(true).unwrap();
        };
        tokio::join!(pipeline.run(rx), stopper);
    }

    #[test]
    fn test_log_sink_accepts_alerts() {
        let (pipeline, _) = pipeline(Box::new(LogSink), EngineConfig::default());
        let records = batch(2500, 4, Protocol::Udp, &[""], 0);

        let report = tokio_test::block_on(pipeline.analyze_batch(&records, epoch())).unwrap();
        assert!(!report.alerts.is_empty());
        assert!(LogSink.publish(&report.alerts[0]).is_ok());
    }
}
