//! Configuration validation utilities and rules

use crate::{
    error::Result,
    models::Config,
    types::DnsCandidate,
};
use colored::Colorize;
use std::collections::HashSet;
use std::net::IpAddr;

/// Configuration validator with advisory checks on top of `Config::validate`
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate configuration and collect non-fatal warnings
    pub fn validate_comprehensive(config: &Config) -> Result<Vec<ValidationWarning>> {
        let mut warnings = Vec::new();

        config.validate()?;

        warnings.extend(Self::validate_candidates(&config.candidates()));
        warnings.extend(Self::validate_urls(config));
        warnings.extend(Self::validate_timing(config));
        warnings.extend(Self::validate_thresholds(config));

        Ok(warnings)
    }

    fn validate_candidates(candidates: &[DnsCandidate]) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();
        let mut seen = HashSet::new();

        for candidate in candidates {
            if !seen.insert(candidate.address) {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Warning,
                    format!("DNS address {} is listed more than once; only the first entry can win ties", candidate.address),
                ));
            }

            let (private, loopback) = match candidate.address {
                IpAddr::V4(ip) => (ip.is_private(), ip.is_loopback()),
                IpAddr::V6(ip) => (false, ip.is_loopback()),
            };

            if loopback {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Warning,
                    format!("DNS candidate {} is a loopback address and says nothing about the network", candidate),
                ));
            } else if private {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Info,
                    format!("DNS candidate {} is on a private network", candidate),
                ));
            }
        }

        warnings
    }

    fn validate_urls(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        for (name, url) in [
            ("Connectivity", &config.connectivity_url),
            ("Download", &config.download_url),
            ("Public IP", &config.public_ip_url),
        ] {
            if let Ok(parsed) = url::Url::parse(url) {
                if parsed.scheme() == "http" {
                    warnings.push(ValidationWarning::new(
                        ValidationLevel::Info,
                        format!("{} URL '{}' uses HTTP; captive portals may answer for it", name, url),
                    ));
                }
            }
        }

        warnings
    }

    fn validate_timing(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();
        let poll = config.poll_interval();

        if config.flush_interval() < poll {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!(
                    "Flush interval of {}s is shorter than the poll interval; most summaries will be Unknown",
                    config.flush_interval_secs
                ),
            ));
        }

        if config.probe_timeout() > poll {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!(
                    "Probe timeout of {}s exceeds the {}ms poll interval; slow probes will stretch the cadence",
                    config.probe_timeout_secs, config.poll_interval_ms
                ),
            ));
        }

        if config.poll_interval_ms < 100 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!("Poll interval of {}ms will spawn a ping process very frequently", config.poll_interval_ms),
            ));
        }

        if config.failure_threshold == 1 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                "Failure threshold of 1 re-evaluates DNS after any single lost probe".to_string(),
            ));
        }

        warnings
    }

    fn validate_thresholds(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        if config.packet_loss_healthy_pct > config.packet_loss_alert_pct {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!(
                    "Healthy packet loss cutoff ({}%) is above the alert cutoff ({}%)",
                    config.packet_loss_healthy_pct, config.packet_loss_alert_pct
                ),
            ));
        }

        if config.battery_enabled && config.battery_thresholds.is_empty() {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                "Battery watcher is enabled without thresholds and will never alert".to_string(),
            ));
        }

        warnings
    }
}

/// Validation warning levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationLevel {
    Info,
    Warning,
}

impl ValidationLevel {
    /// Get display string for level
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
        }
    }
}

/// Configuration validation warning
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub level: ValidationLevel,
    pub message: String,
}

impl ValidationWarning {
    /// Create a new validation warning
    pub fn new(level: ValidationLevel, message: String) -> Self {
        Self { level, message }
    }

    /// Format warning for display
    pub fn format(&self, use_color: bool) -> String {
        let tag = format!("[{}]", self.level.as_str());
        let tag = if use_color {
            match self.level {
                ValidationLevel::Info => tag.blue().to_string(),
                ValidationLevel::Warning => tag.yellow().to_string(),
            }
        } else {
            tag
        };
        format!("{} {}", tag, self.message)
    }
}

/// Convenience function for comprehensive configuration validation
pub fn validate_config(config: &Config) -> Result<Vec<ValidationWarning>> {
    ConfigValidator::validate_comprehensive(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_warning(warnings: &[ValidationWarning], needle: &str) -> bool {
        warnings.iter().any(|w| w.message.contains(needle))
    }

    #[test]
    fn test_default_config_has_only_info() {
        let warnings = validate_config(&Config::default()).unwrap();
        assert!(
            warnings.iter().all(|w| w.level == ValidationLevel::Info),
            "unexpected warnings: {:?}",
            warnings
        );
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let mut config = Config::default();
        config.failure_threshold = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_duplicate_and_loopback_candidates() {
        let mut config = Config::default();
        config.dns_candidates = vec![
            DnsCandidate::primary("Local", "127.0.0.1".parse().unwrap()),
            DnsCandidate::primary("Router", "192.168.1.1".parse().unwrap()),
            DnsCandidate::primary("Router again", "192.168.1.1".parse().unwrap()),
        ];

        let warnings = validate_config(&config).unwrap();
        assert!(has_warning(&warnings, "loopback"));
        assert!(has_warning(&warnings, "private network"));
        assert!(has_warning(&warnings, "listed more than once"));
    }

    #[test]
    fn test_timing_warnings() {
        let mut config = Config::default();
        config.poll_interval_ms = 50;
        config.flush_interval_secs = 1;
        config.failure_threshold = 1;

        let warnings = validate_config(&config).unwrap();
        assert!(has_warning(&warnings, "spawn a ping process"));
        assert!(has_warning(&warnings, "exceeds the 50ms poll interval"));
        assert!(has_warning(&warnings, "any single lost probe"));
    }

    #[test]
    fn test_flush_shorter_than_poll() {
        let mut config = Config::default();
        config.poll_interval_ms = 3000;
        config.flush_interval_secs = 2;

        let warnings = validate_config(&config).unwrap();
        assert!(has_warning(&warnings, "shorter than the poll interval"));
    }

    #[test]
    fn test_threshold_warnings() {
        let mut config = Config::default();
        config.packet_loss_healthy_pct = 30;
        config.packet_loss_alert_pct = 20;
        config.battery_thresholds.clear();
        config.connectivity_url = "http://example.com/".to_string();

        let warnings = validate_config(&config).unwrap();
        assert!(has_warning(&warnings, "above the alert cutoff"));
        assert!(has_warning(&warnings, "never alert"));
        assert!(has_warning(&warnings, "uses HTTP"));
    }

    #[test]
    fn test_warning_format() {
        let warning = ValidationWarning::new(ValidationLevel::Warning, "careful".to_string());
        assert_eq!(warning.format(false), "[WARNING] careful");
    }
}
