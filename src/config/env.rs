//! Environment variable handling and .env file management

use crate::error::{AppError, Result};
use crate::logging::LogFormat;
use crate::models::config::parse_candidate_list;
use crate::types::CandidatePool;
use std::path::Path;

/// Environment variable configuration manager
pub struct EnvManager;

impl EnvManager {
    /// Load `path`, or `.env` from the current directory, if it exists
    pub fn load_env_file(path: Option<&Path>, debug: bool) -> Result<()> {
        let path = path.unwrap_or_else(|| Path::new(".env"));

        if path.exists() {
            dotenv::from_path(path)
                .map_err(|e| AppError::config(format!("Failed to load {}: {}", path.display(), e)))?;

            if debug {
                println!("Loaded configuration from {}", path.display());
            }
        } else if debug {
            println!("No {} file found, using defaults and CLI arguments", path.display());
        }

        Ok(())
    }

    /// Create example .env file content
    pub fn create_example_env_content() -> String {
        r#"# Network Health Monitor Configuration
#
# Values here are used as defaults and can be overridden by
# environment variables and command-line arguments.

# Latency loop cadence in milliseconds
# POLL_INTERVAL_MS=1000

# Seconds between health summaries
# FLUSH_INTERVAL_SECS=5

# Consecutive failed pings before the DNS target is re-evaluated
# FAILURE_THRESHOLD=5

# Seconds to wait when no DNS candidate answers
# NO_TARGET_BACKOFF_SECS=10

# Timeout of a single ping in seconds
# PROBE_TIMEOUT_SECS=2

# DNS candidates as Name=address, primary pool first
# DNS_CANDIDATES=Google DNS=8.8.8.8,Quad9=9.9.9.9,Cloudflare DNS=1.1.1.1,OpenDNS=208.67.222.222
# EMERGENCY_DNS_CANDIDATES=Emergency DNS 1=198.142.0.51,Emergency DNS 2=198.142.0.52

# Packet loss probe size and thresholds (percent)
# PACKET_LOSS_COUNT=5
# PACKET_LOSS_ALERT_PCT=50
# PACKET_LOSS_HEALTHY_PCT=10

# Latency band cutoffs in milliseconds
# LATENCY_GOOD_MS=50
# LATENCY_BAD_MS=100

# Connectivity and download probes
# CONNECTIVITY_URL=http://www.google.com
# CONNECTIVITY_TIMEOUT_SECS=5
# DOWNLOAD_URL=http://ipv4.download.thinkbroadband.com/100KB.zip
# DOWNLOAD_TIMEOUT_SECS=5

# Public IP tracking (written to the sensitive log only)
# TRACK_PUBLIC_IP=true
# PUBLIC_IP_URL=https://api.ipify.org
# PUBLIC_IP_RECHECK_SECS=60

# Target of the startup quality evaluation
# QUALITY_REFERENCE=8.8.8.8
# QUALITY_ENABLED=true

# Device watchers
# MOBILE_INFO_ENABLED=true
# MOBILE_INFO_INTERVAL_SECS=60
# BATTERY_ENABLED=true
# BATTERY_INTERVAL_SECS=60
# BATTERY_THRESHOLDS=20,10,5

# Output
# LOG_DIR=nhm_logs
# LOG_FORMAT=plain
# ENABLE_COLOR=true
"#.to_string()
    }

    /// Save example .env file to disk
    pub fn save_example_env_file(path: &Path) -> Result<()> {
        let content = Self::create_example_env_content();
        std::fs::write(path, content)
            .map_err(|e| AppError::config(format!("Failed to write example .env file: {}", e)))?;

        Ok(())
    }

    /// Validate environment variable format before parsing
    pub fn validate_env_var(key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        match key {
            "POLL_INTERVAL_MS" | "FLUSH_INTERVAL_SECS" | "NO_TARGET_BACKOFF_SECS"
            | "PROBE_TIMEOUT_SECS" | "CONNECTIVITY_TIMEOUT_SECS" | "DOWNLOAD_TIMEOUT_SECS"
            | "PUBLIC_IP_RECHECK_SECS" | "MOBILE_INFO_INTERVAL_SECS" | "BATTERY_INTERVAL_SECS"
            | "PACKET_LOSS_COUNT" | "FAILURE_THRESHOLD" => {
                let number: u64 = value.parse()
                    .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))?;
                if number == 0 {
                    return Err(AppError::config(format!("{} must be greater than 0", key)));
                }
            }
            "PACKET_LOSS_ALERT_PCT" | "PACKET_LOSS_HEALTHY_PCT" => {
                let pct: u8 = value.parse()
                    .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))?;
                if pct > 100 {
                    return Err(AppError::config(format!("{} must be between 0 and 100, got: {}", key, pct)));
                }
            }
            "LATENCY_GOOD_MS" | "LATENCY_BAD_MS" => {
                let ms: f64 = value.parse()
                    .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))?;
                if !(ms > 0.0) {
                    return Err(AppError::config(format!("{} must be positive, got: {}", key, ms)));
                }
            }
            "DNS_CANDIDATES" | "EMERGENCY_DNS_CANDIDATES" => {
                parse_candidate_list(value, CandidatePool::Primary)?;
            }
            "CONNECTIVITY_URL" | "DOWNLOAD_URL" | "PUBLIC_IP_URL" => {
                let parsed = url::Url::parse(value)
                    .map_err(|e| AppError::config(format!("Invalid {} '{}': {}", key, value, e)))?;
                if parsed.scheme() != "http" && parsed.scheme() != "https" {
                    return Err(AppError::config(format!("{} must use HTTP or HTTPS: {}", key, value)));
                }
            }
            "TRACK_PUBLIC_IP" | "QUALITY_ENABLED" | "MOBILE_INFO_ENABLED" | "BATTERY_ENABLED" | "ENABLE_COLOR" => {
                value.parse::<bool>()
                    .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))?;
            }
            "BATTERY_THRESHOLDS" => {
                for entry in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                    let threshold: u8 = entry.parse()
                        .map_err(|e| AppError::config(format!("Invalid BATTERY_THRESHOLDS entry '{}': {}", entry, e)))?;
                    if threshold > 100 {
                        return Err(AppError::config(format!("Battery threshold cannot exceed 100, got: {}", threshold)));
                    }
                }
            }
            "LOG_FORMAT" => {
                value.parse::<LogFormat>()?;
            }
            "LOG_DIR" | "QUALITY_REFERENCE" => {
                if value.is_empty() {
                    return Err(AppError::config(format!("{} cannot be empty", key)));
                }
            }
            _ => {
                // Unknown environment variable, ignore
            }
        }

        Ok(())
    }

    /// Get list of all supported environment variables with descriptions
    pub fn get_supported_env_vars() -> Vec<(&'static str, &'static str, &'static str)> {
        vec![
            ("POLL_INTERVAL_MS", "Latency loop cadence in milliseconds", "1000"),
            ("FLUSH_INTERVAL_SECS", "Seconds between health summaries", "5"),
            ("FAILURE_THRESHOLD", "Consecutive failures before DNS re-evaluation", "5"),
            ("NO_TARGET_BACKOFF_SECS", "Wait when no DNS candidate answers", "10"),
            ("PROBE_TIMEOUT_SECS", "Timeout of a single ping in seconds", "2"),
            ("DNS_CANDIDATES", "Primary DNS pool as Name=address list", "Google DNS=8.8.8.8,Quad9=9.9.9.9"),
            ("EMERGENCY_DNS_CANDIDATES", "Emergency DNS pool as Name=address list", "Emergency DNS 1=198.142.0.51"),
            ("PACKET_LOSS_COUNT", "Pings sent per packet-loss probe", "5"),
            ("PACKET_LOSS_ALERT_PCT", "Loss above this percentage raises an alert", "50"),
            ("PACKET_LOSS_HEALTHY_PCT", "Loss below this percentage is healthy", "10"),
            ("LATENCY_GOOD_MS", "Averages below this are Good", "50"),
            ("LATENCY_BAD_MS", "Averages at or above this are Bad", "100"),
            ("CONNECTIVITY_URL", "Web endpoint for the connectivity check", "http://www.google.com"),
            ("CONNECTIVITY_TIMEOUT_SECS", "Connectivity check timeout", "5"),
            ("DOWNLOAD_URL", "File fetched by the download test", "http://ipv4.download.thinkbroadband.com/100KB.zip"),
            ("DOWNLOAD_TIMEOUT_SECS", "Download test timeout", "5"),
            ("TRACK_PUBLIC_IP", "Track the public IP address", "true"),
            ("PUBLIC_IP_URL", "Service returning the public IP as text", "https://api.ipify.org"),
            ("PUBLIC_IP_RECHECK_SECS", "Seconds between public IP checks", "60"),
            ("QUALITY_REFERENCE", "Target of the startup quality evaluation", "8.8.8.8"),
            ("QUALITY_ENABLED", "Run the startup quality evaluation", "true"),
            ("MOBILE_INFO_ENABLED", "Watch carrier and network type", "true"),
            ("MOBILE_INFO_INTERVAL_SECS", "Seconds between mobile info checks", "60"),
            ("BATTERY_ENABLED", "Watch the battery level", "true"),
            ("BATTERY_INTERVAL_SECS", "Seconds between battery checks", "60"),
            ("BATTERY_THRESHOLDS", "Battery percentages that raise alerts", "20,10,5"),
            ("LOG_DIR", "Directory for the session log files", "nhm_logs"),
            ("LOG_FORMAT", "Log line format (plain or json)", "plain"),
            ("ENABLE_COLOR", "Enable colored output", "true"),
        ]
    }

    /// Display environment variable help
    pub fn display_env_help() -> String {
        let mut help = String::new();
        help.push_str("Supported Environment Variables:\n\n");

        for (var, description, example) in Self::get_supported_env_vars() {
            help.push_str(&format!("  {:<26} {}\n", var, description));
            help.push_str(&format!("  {:<26} Example: {}\n\n", "", example));
        }

        help.push_str("Configuration Priority (highest to lowest):\n");
        help.push_str("  1. Command-line arguments\n");
        help.push_str("  2. Environment variables\n");
        help.push_str("  3. .env file values\n");
        help.push_str("  4. Default values\n");

        help
    }

    /// Validate all currently set environment variables
    pub fn validate_current_env() -> Result<Vec<String>> {
        let mut warnings = Vec::new();

        for (var_name, _, _) in Self::get_supported_env_vars() {
            if let Ok(value) = std::env::var(var_name) {
                if let Err(e) = Self::validate_env_var(var_name, &value) {
                    warnings.push(format!("Warning: {}", e));
                }
            }
        }

        Ok(warnings)
    }

    /// Check if an env file exists and validate its contents
    pub fn check_env_file(path: &Path) -> Result<Option<Vec<String>>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::config(format!("Failed to read {}: {}", path.display(), e)))?;

        let mut warnings = Vec::new();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                if let Err(e) = Self::validate_env_var(key.trim(), value.trim()) {
                    warnings.push(format!("Line '{}': {}", line, e));
                }
            }
        }

        Ok(Some(warnings))
    }
}
