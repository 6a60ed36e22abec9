//! DDoS Traffic Analyzer
//!
//! This is the main entry point for the analyzer service.
//! It initializes the application components and runs the analysis engine
//! until interrupted.

use std::sync::Arc;

use anyhow::Context;
use dotenv::dotenv;
use log::{error, info};
use tokio::sync::{watch, RwLock};

use ddos_traffic_analyzer::config;
use ddos_traffic_analyzer::core::telemetry;
use ddos_traffic_analyzer::core::{AnalysisPipeline, LogSink, TrafficAnalyzer, TrafficBuffer};
use ddos_traffic_analyzer::simulator;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    env_logger::init();

    info!("Starting DDoS Traffic Analyzer...");

    // Load configuration
    let config = config::load_config().context("Failed to load configuration")?;
    let metrics = telemetry::install_recorder()?;

    let buffer = Arc::new(RwLock::new(TrafficBuffer::new(config.engine.retention_seconds)));
    let pipeline = Arc::new(AnalysisPipeline::new(
        TrafficAnalyzer::new(config.thresholds.clone()),
        config.baseline.clone(),
        buffer.clone(),
        Box::new(LogSink),
        config.engine.clone(),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let feeder = if config.simulator.enabled {
        let buffer = buffer.clone();
        let simulator_config = config.simulator.clone();
        let shutdown = shutdown_rx.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = simulator::feed(buffer, simulator_config, shutdown).await {
                error!("Traffic simulator failed: {}", e);
            }
        }))
    } else {
        info!("Traffic simulator disabled; waiting for records from the embedding service");
        None
    };

    let engine = {
        let pipeline = pipeline.clone();
        tokio::spawn(async move { pipeline.run(shutdown_rx).await })
    };

    tokio::signal::ctrl_c().await.context("Failed to listen for shutdown signal")?;
    info!("Shutting down...");
    shutdown_tx.send(true).ok();

    engine.await?;
    if let Some(feeder) = feeder {
        feeder.await?;
    }

    let summary = pipeline.summary().await;
    info!(
        "Final status: {:?}, {} active attacks, {:.1} req/s from {} IPs",
        summary.status, summary.active_attacks, summary.current_rps, summary.unique_ips
    );
    info!("Metrics:\n{}", metrics.render());

    Ok(())
}
