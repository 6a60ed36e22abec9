//! Prometheus metrics for the analysis engine.

use metrics::{describe_counter, describe_gauge, gauge, increment_counter};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use thiserror::Error;

use crate::core::baseline::Baseline;
use crate::models::AttackFinding;

pub const WINDOWS_ANALYZED: &str = "ddos_windows_analyzed_total";
pub const FINDINGS_DETECTED: &str = "ddos_findings_total";
pub const BASELINE_REQUEST_RATE: &str = "ddos_baseline_request_rate";
pub const BASELINE_SOURCE_ENTROPY: &str = "ddos_baseline_source_entropy";

/// Errors that can occur while setting up telemetry
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Metrics recorder error: {0}")]
    RecorderError(#[from] BuildError),
}

/// Install the global Prometheus recorder and describe the engine metrics
pub fn install_recorder() -> Result<PrometheusHandle, TelemetryError> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    describe_counter!(WINDOWS_ANALYZED, "Analysis windows processed");
    describe_counter!(FINDINGS_DETECTED, "Attack findings raised, by type");
    describe_gauge!(BASELINE_REQUEST_RATE, "Baseline average requests per window");
    describe_gauge!(BASELINE_SOURCE_ENTROPY, "Baseline average source entropy in bits");

    Ok(handle)
}

pub fn record_window(findings: &[AttackFinding]) {
    increment_counter!(WINDOWS_ANALYZED);
    for finding in findings {
        increment_counter!(FINDINGS_DETECTED, "type" => finding.attack_type.as_str());
    }
}

pub fn record_baseline(baseline: &Baseline) {
    gauge!(BASELINE_REQUEST_RATE, baseline.average_request_rate);
    gauge!(BASELINE_SOURCE_ENTROPY, baseline.average_source_entropy);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AttackType, Severity};
    use chrono::Utc;

    // the recorder is process-global, so this is the only test installing it
    #[test]
    fn test_recorder_renders_engine_metrics() {
        let handle = install_recorder().unwrap();

        let finding = AttackFinding {
            attack_type: AttackType::UdpFlood,
            severity: Severity::Critical,
            confidence: 1.0,
            start_time: Utc::now(),
            source_ips: vec!["10.0.0.1".to_string()],
            description: "UDP flood detected".to_string(),
            mitigated: false,
        };
        record_window(&[finding]);
        record_baseline(&Baseline::default());

        let rendered = handle.render();
        assert!(rendered.contains(r#"ddos_findings_total{type="UDP_FLOOD"}"#));
        assert!(rendered.contains(WINDOWS_ANALYZED));
        assert!(rendered.contains(BASELINE_REQUEST_RATE));
        assert!(rendered.contains(BASELINE_SOURCE_ENTROPY));
    }
}
