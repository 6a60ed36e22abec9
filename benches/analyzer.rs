use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ddos_traffic_analyzer::core::{Baseline, TrafficAnalyzer};
use ddos_traffic_analyzer::simulator::TrafficSimulator;

fn analyzer_benchmark(c: &mut Criterion) {
    let mut simulator = TrafficSimulator::new(42);
    let now = Utc::now();
    let mut records = simulator.normal_traffic(6000, now);
    records.extend(simulator.http_flood(now));
    records.extend(simulator.udp_flood(now));

    let analyzer = TrafficAnalyzer::default();
    let baseline = Baseline::default();

    c.bench_function("analyze_mixed_window", |b| {
        b.iter(|| analyzer.analyze(black_box(&records), black_box(&baseline)))
    });

    let quiet = simulator.normal_traffic(6000, now);
    c.bench_function("analyze_quiet_window", |b| {
        b.iter(|| analyzer.analyze(black_box(&quiet), black_box(&baseline)))
    });
}

criterion_group!(benches, analyzer_benchmark);
criterion_main!(benches);
