//! Configuration data model and validation

use crate::logging::LogFormat;
use crate::types::{AppError, CandidatePool, DnsCandidate, LatencyCutoffs, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Cadence of the latency loop
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// How often the latency window is summarized
    #[serde(default = "default_flush_interval_secs")]
    pub flush_interval_secs: u64,

    /// Consecutive probe failures before the active DNS is re-evaluated
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// Wait before re-ranking when no candidate answered
    #[serde(default = "default_no_target_backoff_secs")]
    pub no_target_backoff_secs: u64,

    /// Timeout for single latency and packet-loss probes
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,

    /// Primary DNS pool, in declaration order
    #[serde(default = "default_dns_candidates")]
    pub dns_candidates: Vec<DnsCandidate>,

    /// Emergency DNS pool, appended after the primary pool
    #[serde(default = "default_emergency_candidates")]
    pub emergency_candidates: Vec<DnsCandidate>,

    /// Pings sent by each packet-loss probe
    #[serde(default = "default_packet_loss_count")]
    pub packet_loss_count: u32,

    /// Loss strictly above this percentage raises an alert
    #[serde(default = "default_packet_loss_alert_pct")]
    pub packet_loss_alert_pct: u8,

    /// Loss strictly below this percentage is reported as healthy
    #[serde(default = "default_packet_loss_healthy_pct")]
    pub packet_loss_healthy_pct: u8,

    #[serde(default = "default_latency_good_ms")]
    pub latency_good_ms: f64,

    #[serde(default = "default_latency_bad_ms")]
    pub latency_bad_ms: f64,

    /// Well-known web endpoint for the connectivity check
    #[serde(default = "default_connectivity_url")]
    pub connectivity_url: String,

    #[serde(default = "default_connectivity_timeout_secs")]
    pub connectivity_timeout_secs: u64,

    /// File fetched by the download speed test
    #[serde(default = "default_download_url")]
    pub download_url: String,

    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,

    /// Whether the externally-visible address is tracked
    #[serde(default = "default_track_public_ip")]
    pub track_public_ip: bool,

    #[serde(default = "default_public_ip_url")]
    pub public_ip_url: String,

    #[serde(default = "default_public_ip_recheck_secs")]
    pub public_ip_recheck_secs: u64,

    /// Target of the one-shot quality evaluation
    #[serde(default = "default_quality_reference")]
    pub quality_reference: String,

    /// Run the quality evaluation once at startup
    #[serde(default = "default_quality_enabled")]
    pub quality_enabled: bool,

    #[serde(default = "default_mobile_info_enabled")]
    pub mobile_info_enabled: bool,

    #[serde(default = "default_mobile_info_interval_secs")]
    pub mobile_info_interval_secs: u64,

    #[serde(default = "default_battery_enabled")]
    pub battery_enabled: bool,

    #[serde(default = "default_battery_interval_secs")]
    pub battery_interval_secs: u64,

    /// Battery percentages that raise a low-battery alert
    #[serde(default = "default_battery_thresholds")]
    pub battery_thresholds: Vec<u8>,

    /// Directory holding the general and sensitive log files
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Enable colored terminal output
    #[serde(default = "default_enable_color")]
    pub enable_color: bool,

    /// Enable verbose output
    #[serde(default)]
    pub verbose: bool,

    /// Enable debug output
    #[serde(default)]
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            flush_interval_secs: default_flush_interval_secs(),
            failure_threshold: default_failure_threshold(),
            no_target_backoff_secs: default_no_target_backoff_secs(),
            probe_timeout_secs: default_probe_timeout_secs(),
            dns_candidates: default_dns_candidates(),
            emergency_candidates: default_emergency_candidates(),
            packet_loss_count: default_packet_loss_count(),
            packet_loss_alert_pct: default_packet_loss_alert_pct(),
            packet_loss_healthy_pct: default_packet_loss_healthy_pct(),
            latency_good_ms: default_latency_good_ms(),
            latency_bad_ms: default_latency_bad_ms(),
            connectivity_url: default_connectivity_url(),
            connectivity_timeout_secs: default_connectivity_timeout_secs(),
            download_url: default_download_url(),
            download_timeout_secs: default_download_timeout_secs(),
            track_public_ip: default_track_public_ip(),
            public_ip_url: default_public_ip_url(),
            public_ip_recheck_secs: default_public_ip_recheck_secs(),
            quality_reference: default_quality_reference(),
            quality_enabled: default_quality_enabled(),
            mobile_info_enabled: default_mobile_info_enabled(),
            mobile_info_interval_secs: default_mobile_info_interval_secs(),
            battery_enabled: default_battery_enabled(),
            battery_interval_secs: default_battery_interval_secs(),
            battery_thresholds: default_battery_thresholds(),
            log_dir: default_log_dir(),
            log_format: LogFormat::default(),
            enable_color: default_enable_color(),
            verbose: false,
            debug: false,
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_secs)
    }

    pub fn no_target_backoff(&self) -> Duration {
        Duration::from_secs(self.no_target_backoff_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn connectivity_timeout(&self) -> Duration {
        Duration::from_secs(self.connectivity_timeout_secs)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    pub fn public_ip_recheck(&self) -> Duration {
        Duration::from_secs(self.public_ip_recheck_secs)
    }

    pub fn mobile_info_interval(&self) -> Duration {
        Duration::from_secs(self.mobile_info_interval_secs)
    }

    pub fn battery_interval(&self) -> Duration {
        Duration::from_secs(self.battery_interval_secs)
    }

    pub fn latency_cutoffs(&self) -> LatencyCutoffs {
        LatencyCutoffs {
            good_below_ms: self.latency_good_ms,
            bad_from_ms: self.latency_bad_ms,
        }
    }

    /// All candidates in ranking order: primary pool, then emergency pool
    pub fn candidates(&self) -> Vec<DnsCandidate> {
        self.dns_candidates
            .iter()
            .chain(self.emergency_candidates.iter())
            .cloned()
            .collect()
    }

    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(AppError::config("Poll interval must be greater than 0"));
        }

        for (name, secs) in [
            ("Flush interval", self.flush_interval_secs),
            ("No-target backoff", self.no_target_backoff_secs),
            ("Probe timeout", self.probe_timeout_secs),
            ("Connectivity timeout", self.connectivity_timeout_secs),
            ("Download timeout", self.download_timeout_secs),
            ("Public IP recheck interval", self.public_ip_recheck_secs),
            ("Mobile info interval", self.mobile_info_interval_secs),
            ("Battery interval", self.battery_interval_secs),
        ] {
            if secs == 0 {
                return Err(AppError::config(format!("{} must be greater than 0", name)));
            }
        }

        if self.failure_threshold == 0 {
            return Err(AppError::config("Failure threshold must be greater than 0"));
        }

        if self.candidates().is_empty() {
            return Err(AppError::config("At least one DNS candidate is required"));
        }

        if self.packet_loss_count == 0 {
            return Err(AppError::config("Packet loss count must be greater than 0"));
        }

        if self.packet_loss_alert_pct > 100 || self.packet_loss_healthy_pct > 100 {
            return Err(AppError::config("Packet loss percentages cannot exceed 100"));
        }

        if !(self.latency_good_ms > 0.0 && self.latency_good_ms < self.latency_bad_ms) {
            return Err(AppError::config(format!(
                "Latency cutoffs must satisfy 0 < good ({}) < bad ({})",
                self.latency_good_ms, self.latency_bad_ms
            )));
        }

        for (name, url) in [
            ("connectivity", &self.connectivity_url),
            ("download", &self.download_url),
            ("public IP", &self.public_ip_url),
        ] {
            let parsed = url::Url::parse(url)
                .map_err(|e| AppError::config(format!("Invalid {} URL '{}': {}", name, url, e)))?;
            if parsed.scheme() != "http" && parsed.scheme() != "https" {
                return Err(AppError::config(format!("The {} URL must use HTTP or HTTPS: {}", name, url)));
            }
        }

        if self.quality_reference.trim().is_empty() {
            return Err(AppError::config("Quality reference target cannot be empty"));
        }

        if self.battery_thresholds.iter().any(|&t| t > 100) {
            return Err(AppError::config("Battery thresholds cannot exceed 100"));
        }

        Ok(())
    }

    /// Merge environment variables into this configuration
    pub fn merge_from_env(&mut self) -> Result<()> {
        if let Some(value) = env_parse("POLL_INTERVAL_MS")? {
            self.poll_interval_ms = value;
        }
        if let Some(value) = env_parse("FLUSH_INTERVAL_SECS")? {
            self.flush_interval_secs = value;
        }
        if let Some(value) = env_parse("FAILURE_THRESHOLD")? {
            self.failure_threshold = value;
        }
        if let Some(value) = env_parse("NO_TARGET_BACKOFF_SECS")? {
            self.no_target_backoff_secs = value;
        }
        if let Some(value) = env_parse("PROBE_TIMEOUT_SECS")? {
            self.probe_timeout_secs = value;
        }

        if let Ok(value) = std::env::var("DNS_CANDIDATES") {
            self.dns_candidates = parse_candidate_list(&value, CandidatePool::Primary)?;
        }
        if let Ok(value) = std::env::var("EMERGENCY_DNS_CANDIDATES") {
            self.emergency_candidates = parse_candidate_list(&value, CandidatePool::Emergency)?;
        }

        if let Some(value) = env_parse("PACKET_LOSS_COUNT")? {
            self.packet_loss_count = value;
        }
        if let Some(value) = env_parse("PACKET_LOSS_ALERT_PCT")? {
            self.packet_loss_alert_pct = value;
        }
        if let Some(value) = env_parse("PACKET_LOSS_HEALTHY_PCT")? {
            self.packet_loss_healthy_pct = value;
        }
        if let Some(value) = env_parse("LATENCY_GOOD_MS")? {
            self.latency_good_ms = value;
        }
        if let Some(value) = env_parse("LATENCY_BAD_MS")? {
            self.latency_bad_ms = value;
        }

        if let Ok(value) = std::env::var("CONNECTIVITY_URL") {
            self.connectivity_url = value.trim().to_string();
        }
        if let Some(value) = env_parse("CONNECTIVITY_TIMEOUT_SECS")? {
            self.connectivity_timeout_secs = value;
        }
        if let Ok(value) = std::env::var("DOWNLOAD_URL") {
            self.download_url = value.trim().to_string();
        }
        if let Some(value) = env_parse("DOWNLOAD_TIMEOUT_SECS")? {
            self.download_timeout_secs = value;
        }

        if let Some(value) = env_parse("TRACK_PUBLIC_IP")? {
            self.track_public_ip = value;
        }
        if let Ok(value) = std::env::var("PUBLIC_IP_URL") {
            self.public_ip_url = value.trim().to_string();
        }
        if let Some(value) = env_parse("PUBLIC_IP_RECHECK_SECS")? {
            self.public_ip_recheck_secs = value;
        }
        if let Ok(value) = std::env::var("QUALITY_REFERENCE") {
            self.quality_reference = value.trim().to_string();
        }
        if let Some(value) = env_parse("QUALITY_ENABLED")? {
            self.quality_enabled = value;
        }

        if let Some(value) = env_parse("MOBILE_INFO_ENABLED")? {
            self.mobile_info_enabled = value;
        }
        if let Some(value) = env_parse("MOBILE_INFO_INTERVAL_SECS")? {
            self.mobile_info_interval_secs = value;
        }
        if let Some(value) = env_parse("BATTERY_ENABLED")? {
            self.battery_enabled = value;
        }
        if let Some(value) = env_parse("BATTERY_INTERVAL_SECS")? {
            self.battery_interval_secs = value;
        }
        if let Ok(value) = std::env::var("BATTERY_THRESHOLDS") {
            self.battery_thresholds = value
                .split(',')
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(|s| s.parse::<u8>()
                    .map_err(|e| AppError::config(format!("Invalid BATTERY_THRESHOLDS entry '{}': {}", s, e))))
                .collect::<Result<Vec<_>>>()?;
        }

        if let Ok(value) = std::env::var("LOG_DIR") {
            self.log_dir = PathBuf::from(value.trim());
        }
        if let Ok(value) = std::env::var("LOG_FORMAT") {
            self.log_format = value.parse()?;
        }
        if let Some(value) = env_parse("ENABLE_COLOR")? {
            self.enable_color = value;
        }

        Ok(())
    }
}

/// Parse a comma-separated `Name=address` list
pub fn parse_candidate_list(value: &str, pool: CandidatePool) -> Result<Vec<DnsCandidate>> {
    value
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|pair| DnsCandidate::parse_pair(pair, pool))
        .collect()
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(value) => value.trim().parse()
            .map(Some)
            .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e))),
        Err(_) => Ok(None),
    }
}

fn default_candidate_pool(pairs: &[(&str, &str)], pool: CandidatePool) -> Vec<DnsCandidate> {
    pairs
        .iter()
        .filter_map(|(name, address)| {
            address.parse().ok().map(|address| DnsCandidate {
                name: name.to_string(),
                address,
                pool,
            })
        })
        .collect()
}

// Default value functions for serde
fn default_poll_interval_ms() -> u64 {
    crate::defaults::DEFAULT_POLL_INTERVAL_MS
}

fn default_flush_interval_secs() -> u64 {
    crate::defaults::DEFAULT_FLUSH_INTERVAL_SECS
}

fn default_failure_threshold() -> u32 {
    crate::defaults::DEFAULT_FAILURE_THRESHOLD
}

fn default_no_target_backoff_secs() -> u64 {
    crate::defaults::DEFAULT_NO_TARGET_BACKOFF_SECS
}

fn default_probe_timeout_secs() -> u64 {
    crate::defaults::DEFAULT_PROBE_TIMEOUT_SECS
}

fn default_dns_candidates() -> Vec<DnsCandidate> {
    default_candidate_pool(crate::defaults::DEFAULT_DNS_CANDIDATES, CandidatePool::Primary)
}

fn default_emergency_candidates() -> Vec<DnsCandidate> {
    default_candidate_pool(crate::defaults::DEFAULT_EMERGENCY_CANDIDATES, CandidatePool::Emergency)
}

fn default_packet_loss_count() -> u32 {
    crate::defaults::DEFAULT_PACKET_LOSS_COUNT
}

fn default_packet_loss_alert_pct() -> u8 {
    crate::defaults::DEFAULT_PACKET_LOSS_ALERT_PCT
}

fn default_packet_loss_healthy_pct() -> u8 {
    crate::defaults::DEFAULT_PACKET_LOSS_HEALTHY_PCT
}

fn default_latency_good_ms() -> f64 {
    crate::defaults::DEFAULT_LATENCY_GOOD_MS
}

fn default_latency_bad_ms() -> f64 {
    crate::defaults::DEFAULT_LATENCY_BAD_MS
}

fn default_connectivity_url() -> String {
    crate::defaults::DEFAULT_CONNECTIVITY_URL.to_string()
}

fn default_connectivity_timeout_secs() -> u64 {
    crate::defaults::DEFAULT_CONNECTIVITY_TIMEOUT_SECS
}

fn default_download_url() -> String {
    crate::defaults::DEFAULT_DOWNLOAD_URL.to_string()
}

fn default_download_timeout_secs() -> u64 {
    crate::defaults::DEFAULT_DOWNLOAD_TIMEOUT_SECS
}

fn default_track_public_ip() -> bool {
    crate::defaults::DEFAULT_TRACK_PUBLIC_IP
}

fn default_public_ip_url() -> String {
    crate::defaults::DEFAULT_PUBLIC_IP_URL.to_string()
}

fn default_public_ip_recheck_secs() -> u64 {
    crate::defaults::DEFAULT_PUBLIC_IP_RECHECK_SECS
}

fn default_quality_reference() -> String {
    crate::defaults::DEFAULT_QUALITY_REFERENCE.to_string()
}

fn default_quality_enabled() -> bool {
    crate::defaults::DEFAULT_QUALITY_ENABLED
}

fn default_mobile_info_enabled() -> bool {
    crate::defaults::DEFAULT_MOBILE_INFO_ENABLED
}

fn default_mobile_info_interval_secs() -> u64 {
    crate::defaults::DEFAULT_MOBILE_INFO_INTERVAL_SECS
}

fn default_battery_enabled() -> bool {
    crate::defaults::DEFAULT_BATTERY_ENABLED
}

fn default_battery_interval_secs() -> u64 {
    crate::defaults::DEFAULT_BATTERY_INTERVAL_SECS
}

fn default_battery_thresholds() -> Vec<u8> {
    crate::defaults::DEFAULT_BATTERY_THRESHOLDS.to_vec()
}

fn default_log_dir() -> PathBuf {
    PathBuf::from(crate::defaults::DEFAULT_LOG_DIR)
}

fn default_enable_color() -> bool {
    crate::defaults::DEFAULT_ENABLE_COLOR
}
