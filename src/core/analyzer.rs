//! Traffic analyzer.
//!
//! Runs the window aggregator once per batch and evaluates every registered
//! detector against the shared metrics.

use log::debug;

use crate::core::baseline::Baseline;
use crate::core::detectors::{DetectionContext, DETECTORS};
use crate::core::window::WindowMetrics;
use crate::core::Thresholds;
use crate::models::{AttackFinding, RequestRecord};

/// Metrics and findings of one analysed window
#[derive(Debug)]
pub struct WindowAnalysis<'a> {
    pub metrics: WindowMetrics<'a>,
    pub findings: Vec<AttackFinding>,
}

/// Stateless classifier over request batches
#[derive(Debug, Clone, Default)]
pub struct TrafficAnalyzer {
    thresholds: Thresholds,
}

impl TrafficAnalyzer {
    /// Create a new analyzer instance
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Classify a batch of records.
    ///
    /// # Arguments
    ///
    /// * `records` - Records of one analysis window
    /// * `baseline` - Current normal-traffic baseline
    ///
    /// # Returns
    ///
    /// Findings in detector registry order; empty for an empty batch.
    pub fn analyze(&self, records: &[RequestRecord], baseline: &Baseline) -> Vec<AttackFinding> {
        self.analyze_window(records, baseline)
            .map(|analysis| analysis.findings)
            .unwrap_or_default()
    }

    /// Classify a batch and keep its metrics for the caller.
    ///
    /// Returns `None` for an empty batch; no detector runs in that case.
    pub fn analyze_window<'a>(&self, records: &'a [RequestRecord], baseline: &Baseline) -> Option<WindowAnalysis<'a>> {
        let metrics = WindowMetrics::from_records(records)?;
        debug!(
            "Window metrics: {} requests, {} sources, source entropy {:.2}, path entropy {:.2}, {} SYN",
            metrics.total_requests,
            metrics.unique_sources,
            metrics.source_entropy,
            metrics.path_entropy,
            metrics.syn_count
        );

        let ctx = DetectionContext {
            records,
            metrics: &metrics,
            baseline,
            thresholds: &self.thresholds,
        };
        let findings = DETECTORS.iter().filter_map(|(_, detect)| detect(&ctx)).collect();

        Some(WindowAnalysis { metrics, findings })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixtures::batch;
    use crate::models::{AttackType, Protocol};

    #[test]
    fn test_empty_batch_yields_no_findings() {
        let analyzer = TrafficAnalyzer::default();
        assert!(analyzer.analyze(&[], &Baseline::default()).is_empty());
        assert!(analyzer.analyze_window(&[], &Baseline::default()).is_none());
    }

    #[test]
    fn test_normal_traffic_is_quiet() {
        let analyzer = TrafficAnalyzer::default();
        let paths = ["/", "/api/users", "/api/products", "/login", "/dashboard", "/profile", "/search", "/checkout"];
        let records = batch(110, 90, Protocol::Http, &paths, 120);

        assert!(analyzer.analyze(&records, &Baseline::default()).is_empty());
    }

    #[test]
    fn test_detectors_are_not_exclusive() {
        let analyzer = TrafficAnalyzer::default();
        let mut records = batch(1500, 3, Protocol::TcpSyn, &[""], 0);
        records.extend(batch(2500, 5, Protocol::Udp, &[""], 0));

        let findings = analyzer.analyze(&records, &Baseline::default());
        let types: Vec<AttackType> = findings.iter().map(|f| f.attack_type).collect();
        assert_eq!(types, vec![AttackType::SynFlood, AttackType::UdpFlood, AttackType::RateAnomaly]);
    }

    #[test]
    fn test_reanalysis_is_bit_identical() {
        let analyzer = TrafficAnalyzer::default();
        let mut records = batch(2500, 12, Protocol::Http, &["/login"], 40_000);
        records.extend(batch(2200, 40, Protocol::Udp, &[""], 0));
        let baseline = Baseline::default();

        let first = analyzer.analyze(&records, &baseline);
        let second = analyzer.analyze(&records, &baseline);
        assert!(!first.is_empty());
        assert_eq!(first, second);
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.confidence.to_bits(), b.confidence.to_bits());
        }
    }

    #[test]
    fn test_custom_thresholds_are_honoured() {
        let analyzer = TrafficAnalyzer::new(Thresholds {
            udp_flood_floor: 100,
            udp_flood_scale: 200.0,
            ..Thresholds::default()
        });
        let records = batch(150, 50, Protocol::Udp, &[""], 0);

        let findings = analyzer.analyze(&records, &Baseline::default());
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].attack_type, AttackType::UdpFlood);
        assert_eq!(findings[0].confidence, 0.75);
    }
}
