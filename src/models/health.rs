//! Health measurements: the latency window, flush summaries and device readings

use crate::types::{LatencyBand, LatencyCutoffs};
use serde::{Deserialize, Serialize};

/// Successful latency samples collected since the last flush
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LatencyWindow {
    samples: Vec<f64>,
}

impl LatencyWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, latency_ms: f64) {
        self.samples.push(latency_ms);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    /// Arithmetic mean, or `None` when no sample succeeded
    pub fn average(&self) -> Option<f64> {
        if self.samples.is_empty() {
            None
        } else {
            Some(self.samples.iter().sum::<f64>() / self.samples.len() as f64)
        }
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

/// Health report produced on every flush
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthSummary {
    pub avg_latency_ms: Option<f64>,
    pub latency_band: LatencyBand,
    pub sample_count: usize,
    pub packet_loss_pct: u8,
    pub web_reachable: bool,
}

impl HealthSummary {
    /// Summarize a window together with the packet-loss and connectivity results
    pub fn from_window(
        window: &LatencyWindow,
        cutoffs: LatencyCutoffs,
        packet_loss_pct: u8,
        web_reachable: bool,
    ) -> Self {
        let avg_latency_ms = window.average();
        Self {
            avg_latency_ms,
            latency_band: LatencyBand::classify(avg_latency_ms, cutoffs),
            sample_count: window.len(),
            packet_loss_pct,
            web_reachable,
        }
    }

    /// Loss strictly above the alert threshold
    pub fn is_high_packet_loss(&self, alert_pct: u8) -> bool {
        self.packet_loss_pct > alert_pct
    }

    /// Loss strictly below the health cutoff
    pub fn is_packet_loss_healthy(&self, healthy_pct: u8) -> bool {
        self.packet_loss_pct < healthy_pct
    }

    /// One-line description of the latency part of the summary
    pub fn latency_line(&self) -> String {
        match self.avg_latency_ms {
            Some(avg) => format!("Ping summary: Average: {:.1} ms ({})", avg, self.latency_band),
            None => "Ping summary: no successful samples in this window (Unknown)".to_string(),
        }
    }
}

/// Measured download throughput
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DownloadSpeed {
    pub mbytes_per_sec: f64,
    pub mbits_per_sec: f64,
}

impl DownloadSpeed {
    /// Compute throughput from a byte count and elapsed seconds
    pub fn from_transfer(bytes: u64, elapsed_secs: f64) -> Option<Self> {
        if elapsed_secs <= 0.0 {
            return None;
        }
        let mbytes_per_sec = bytes as f64 / (elapsed_secs * 1024.0 * 1024.0);
        Some(Self {
            mbytes_per_sec,
            mbits_per_sec: mbytes_per_sec * 8.0,
        })
    }
}

/// Carrier and network state reported by the device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MobileInfo {
    #[serde(rename = "network_operator_name", default = "unknown")]
    pub operator: String,
    #[serde(default = "unknown")]
    pub network_type: String,
    #[serde(default = "unknown", deserialize_with = "string_or_display")]
    pub data_enabled: String,
    #[serde(default = "unknown")]
    pub sim_state: String,
}

impl MobileInfo {
    pub fn summary(&self) -> String {
        format!(
            "Operator: {}, Network: {}, Data: {}, SIM: {}",
            self.operator,
            self.network_type.to_uppercase(),
            self.data_enabled,
            self.sim_state
        )
    }
}

/// Battery state reported by the device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatteryStatus {
    pub percentage: u8,
    #[serde(default = "unknown")]
    pub status: String,
    #[serde(default = "unknown")]
    pub plugged: String,
}

fn unknown() -> String {
    "Unknown".to_string()
}

fn string_or_display<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    })
}
