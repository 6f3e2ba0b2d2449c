//! Probing capabilities used by the monitors
//!
//! Every probe is bounded by a timeout and reports failure as a
//! [`ProbeError`] kind instead of unwinding, so the monitors decide per kind
//! whether a failure is absorbed or whether they must stop.

pub mod parse;
pub mod scripted;
pub mod system;

use crate::error::ProbeError;
use crate::models::{BatteryStatus, DownloadSpeed, MobileInfo};
use crate::types::ProbeOutcome;
use async_trait::async_trait;
use std::net::IpAddr;
use std::time::Duration;

pub use scripted::ScriptedProber;
pub use system::SystemProber;

/// Network measurements against a target
#[async_trait]
pub trait Prober: Send + Sync {
    /// Round-trip time of a single echo request, in milliseconds
    async fn probe_latency(&self, target: &str, timeout: Duration) -> ProbeOutcome<f64>;

    /// Percentage of `count` echo requests that went unanswered
    async fn probe_packet_loss(&self, target: &str, count: u32, timeout: Duration) -> ProbeOutcome<u8>;

    /// Whether `url` answers an HTTP request
    async fn probe_connectivity(&self, url: &str, timeout: Duration) -> ProbeOutcome<()>;

    /// Throughput of downloading `url`
    async fn probe_download(&self, url: &str, timeout: Duration) -> ProbeOutcome<DownloadSpeed>;

    /// Externally-visible address as reported by `url`
    async fn probe_public_address(&self, url: &str, timeout: Duration) -> ProbeOutcome<IpAddr>;
}

/// Device-level readings
#[async_trait]
pub trait DeviceProber: Send + Sync {
    async fn mobile_info(&self, timeout: Duration) -> ProbeOutcome<MobileInfo>;

    async fn battery_status(&self, timeout: Duration) -> ProbeOutcome<BatteryStatus>;
}

/// Packet loss keeps its own failure convention: a probe that produced no
/// usable result counts as total loss rather than an absent value.
pub fn packet_loss_or_total(outcome: &ProbeOutcome<u8>) -> u8 {
    match outcome {
        Ok(pct) => *pct,
        Err(_) => 100,
    }
}

/// Short description of a failed probe for log lines
pub fn describe_failure(error: &ProbeError) -> String {
    match error {
        ProbeError::Timeout => "timed out".to_string(),
        other => other.to_string(),
    }
}
