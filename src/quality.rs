//! One-shot network quality evaluation run at startup

use crate::alert::{AlertSink, Severity};
use crate::logging::Logger;
use crate::models::{Config, DownloadSpeed};
use crate::probe::{describe_failure, packet_loss_or_total, Prober};
use crate::types::LatencyBand;
use serde::Serialize;

/// Outcome of a quality evaluation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityReport {
    pub latency_ms: Option<f64>,
    pub latency_band: LatencyBand,
    pub packet_loss_pct: u8,
    pub packet_loss_healthy: bool,
    pub download: Option<DownloadSpeed>,
}

impl QualityReport {
    pub fn latency_line(&self) -> String {
        match self.latency_ms {
            Some(ms) => format!("Latency: {:.1} ms ({})", ms, self.latency_band),
            None => "Latency test failed".to_string(),
        }
    }

    pub fn packet_loss_line(&self) -> String {
        let status = if self.packet_loss_healthy { "Good" } else { "Bad" };
        format!("Packet loss: {}% ({})", self.packet_loss_pct, status)
    }

    pub fn download_line(&self) -> String {
        match &self.download {
            Some(speed) => format!(
                "Download speed: {:.2} MB/s ({:.2} Mbps)",
                speed.mbytes_per_sec, speed.mbits_per_sec
            ),
            None => "Download test failed".to_string(),
        }
    }
}

/// Measure latency, packet loss and download speed once and report them
pub async fn evaluate(
    prober: &dyn Prober,
    config: &Config,
    logger: &Logger,
    alerts: &dyn AlertSink,
) -> QualityReport {
    let reference = config.quality_reference.as_str();

    let latency = prober.probe_latency(reference, config.probe_timeout()).await;
    let loss = prober
        .probe_packet_loss(reference, config.packet_loss_count, config.probe_timeout())
        .await;
    let download = prober
        .probe_download(&config.download_url, config.download_timeout())
        .await;

    let latency_ms = latency.as_ref().ok().copied();
    let packet_loss_pct = packet_loss_or_total(&loss);
    let report = QualityReport {
        latency_ms,
        latency_band: LatencyBand::classify(latency_ms, config.latency_cutoffs()),
        packet_loss_pct,
        packet_loss_healthy: packet_loss_pct < config.packet_loss_healthy_pct,
        download: download.as_ref().ok().copied(),
    };

    let latency_ok = matches!(report.latency_band, LatencyBand::Good | LatencyBand::Medium);
    let mut entry = logger.info(&report.latency_line()).field("reference", reference);
    if let Err(e) = &latency {
        entry = entry.field("reason", describe_failure(e));
    }
    entry.log().await;
    notify(alerts, latency_ok, &report.latency_line()).await;

    logger.info(&report.packet_loss_line())
        .field("reference", reference)
        .log()
        .await;
    notify(alerts, report.packet_loss_healthy, &report.packet_loss_line()).await;

    let mut entry = logger.info(&report.download_line()).field("url", &config.download_url);
    if let Err(e) = &download {
        entry = entry.field("reason", describe_failure(e));
    }
    entry.log().await;
    notify(alerts, report.download.is_some(), &report.download_line()).await;

    report
}

async fn notify(alerts: &dyn AlertSink, healthy: bool, message: &str) {
    let severity = if healthy { Severity::Info } else { Severity::Warning };
    alerts.notify(severity, message).await;
}
