//! Network Health Monitor
//!
//! Continuously probes reachability from a mobile device: picks the fastest
//! DNS resolver from a candidate pool, tracks its latency, aggregates the
//! samples into periodic health summaries, and raises threshold alerts.
//! Device-level signals (carrier info, battery) are watched alongside.

pub mod alert;
pub mod app;
pub mod cli;
pub mod config;
pub mod device;
pub mod error;
pub mod logging;
pub mod models;
pub mod monitor;
pub mod probe;
pub mod quality;
pub mod types;

// Re-export commonly used types
pub use alert::{AlertSink, ConsoleAlertSink, MemoryAlertSink, Severity};
pub use error::{AppError, ProbeError, Result};
pub use logging::{FileRecorder, LogEntry, LogFormat, LogLevel, Logger, MemoryRecorder, Recorder};
pub use models::{Config, HealthSummary, LatencyWindow};
pub use monitor::{CandidateRanker, LatencyMonitor, PublicAddress};
pub use probe::{DeviceProber, Prober, SystemProber};
pub use types::{DnsCandidate, LatencyBand, LatencyCutoffs, ProbeOutcome};

/// Application version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Build information stamped by build.rs
pub const BUILD_TIME: &str = env!("BUILD_TIME");
pub const GIT_COMMIT: &str = env!("GIT_COMMIT");
pub const TARGET_TRIPLE: &str = env!("TARGET_TRIPLE");

/// Default configuration values
pub mod defaults {
    pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;
    pub const DEFAULT_FLUSH_INTERVAL_SECS: u64 = 5;
    pub const DEFAULT_FAILURE_THRESHOLD: u32 = 5;
    pub const DEFAULT_NO_TARGET_BACKOFF_SECS: u64 = 10;
    pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 2;

    pub const DEFAULT_DNS_CANDIDATES: &[(&str, &str)] = &[
        ("Google DNS", "8.8.8.8"),
        ("Quad9", "9.9.9.9"),
        ("Cloudflare DNS", "1.1.1.1"),
        ("OpenDNS", "208.67.222.222"),
    ];
    pub const DEFAULT_EMERGENCY_CANDIDATES: &[(&str, &str)] = &[
        ("Emergency DNS 1", "198.142.0.51"),
        ("Emergency DNS 2", "198.142.0.52"),
    ];

    pub const DEFAULT_PACKET_LOSS_COUNT: u32 = 5;
    pub const DEFAULT_PACKET_LOSS_ALERT_PCT: u8 = 50;
    pub const DEFAULT_PACKET_LOSS_HEALTHY_PCT: u8 = 10;
    pub const DEFAULT_LATENCY_GOOD_MS: f64 = 50.0;
    pub const DEFAULT_LATENCY_BAD_MS: f64 = 100.0;

    pub const DEFAULT_CONNECTIVITY_URL: &str = "http://www.google.com";
    pub const DEFAULT_CONNECTIVITY_TIMEOUT_SECS: u64 = 5;
    pub const DEFAULT_DOWNLOAD_URL: &str = "http://ipv4.download.thinkbroadband.com/100KB.zip";
    pub const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 5;

    pub const DEFAULT_TRACK_PUBLIC_IP: bool = true;
    pub const DEFAULT_PUBLIC_IP_URL: &str = "https://api.ipify.org";
    pub const DEFAULT_PUBLIC_IP_RECHECK_SECS: u64 = 60;

    pub const DEFAULT_QUALITY_REFERENCE: &str = "8.8.8.8";
    pub const DEFAULT_QUALITY_ENABLED: bool = true;

    pub const DEFAULT_MOBILE_INFO_ENABLED: bool = true;
    pub const DEFAULT_MOBILE_INFO_INTERVAL_SECS: u64 = 60;
    pub const DEFAULT_BATTERY_ENABLED: bool = true;
    pub const DEFAULT_BATTERY_INTERVAL_SECS: u64 = 60;
    pub const DEFAULT_BATTERY_THRESHOLDS: &[u8] = &[20, 10, 5];
    pub const DEFAULT_DEVICE_TIMEOUT_SECS: u64 = 2;

    pub const DEFAULT_LOG_DIR: &str = "nhm_logs";
    pub const DEFAULT_ENABLE_COLOR: bool = true;
}
