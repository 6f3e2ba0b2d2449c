//! Configuration parsing from CLI arguments and environment variables

use crate::{
    cli::Cli,
    config::env::EnvManager,
    error::Result,
    models::{config::parse_candidate_list, Config},
    types::CandidatePool,
};

/// Configuration parser that combines CLI arguments with environment variables
pub struct ConfigParser {
    cli: Cli,
}

impl ConfigParser {
    /// Create a new configuration parser with CLI arguments
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Parse and build the complete configuration
    pub fn parse(&self) -> Result<Config> {
        let mut config = Config::default();

        self.load_env_file()?;
        config.merge_from_env()?;
        self.apply_cli_overrides(&mut config)?;
        config.validate()?;

        Ok(config)
    }

    fn load_env_file(&self) -> Result<()> {
        EnvManager::load_env_file(self.cli.env_file.as_deref(), self.cli.debug)
    }

    /// Apply CLI argument overrides to configuration
    fn apply_cli_overrides(&self, config: &mut Config) -> Result<()> {
        if let Some(ms) = self.cli.poll_interval {
            config.poll_interval_ms = ms;
        }

        if let Some(secs) = self.cli.flush_interval {
            config.flush_interval_secs = secs;
        }

        if let Some(threshold) = self.cli.failure_threshold {
            config.failure_threshold = threshold;
        }

        if !self.cli.dns.is_empty() {
            config.dns_candidates = parse_candidate_list(&self.cli.dns.join(","), CandidatePool::Primary)?;
        }

        if let Some(ref dir) = self.cli.log_dir {
            config.log_dir = dir.clone();
        }

        if let Some(format) = self.cli.log_format {
            config.log_format = format;
        }

        if self.cli.no_public_ip {
            config.track_public_ip = false;
        }
        if self.cli.no_mobile_info {
            config.mobile_info_enabled = false;
        }
        if self.cli.no_battery {
            config.battery_enabled = false;
        }
        if self.cli.skip_quality {
            config.quality_enabled = false;
        }

        if self.cli.color {
            config.enable_color = true;
        } else if self.cli.no_color {
            config.enable_color = false;
        }

        // CLI-only flags
        config.verbose = self.cli.verbose;
        config.debug = self.cli.debug;

        if config.debug {
            println!("Applied CLI overrides to configuration");
            println!(
                "Final config: poll={}ms, flush={}s, threshold={}, candidates={}",
                config.poll_interval_ms,
                config.flush_interval_secs,
                config.failure_threshold,
                config.candidates().len()
            );
        }

        Ok(())
    }
}

/// Convenience function to load complete configuration from CLI arguments
pub fn load_config(cli: Cli) -> Result<Config> {
    let parser = ConfigParser::new(cli);
    parser.parse()
}

/// Display configuration summary
pub fn display_config_summary(config: &Config) -> String {
    let mut summary = Vec::new();

    let pool = |candidates: &[crate::types::DnsCandidate]| {
        candidates.iter().map(|c| c.to_string()).collect::<Vec<_>>().join(", ")
    };

    summary.push(format!("Poll Interval: {}ms", config.poll_interval_ms));
    summary.push(format!("Flush Interval: {}s", config.flush_interval_secs));
    summary.push(format!("Failure Threshold: {}", config.failure_threshold));
    summary.push(format!("No-Target Backoff: {}s", config.no_target_backoff_secs));
    summary.push(format!("Probe Timeout: {}s", config.probe_timeout_secs));
    summary.push(format!("DNS Candidates: {}", pool(&config.dns_candidates)));
    summary.push(format!("Emergency Candidates: {}", pool(&config.emergency_candidates)));
    summary.push(format!(
        "Packet Loss: {} pings, alert above {}%, healthy below {}%",
        config.packet_loss_count, config.packet_loss_alert_pct, config.packet_loss_healthy_pct
    ));
    summary.push(format!(
        "Latency Bands: Good < {}ms <= Medium < {}ms <= Bad",
        config.latency_good_ms, config.latency_bad_ms
    ));
    summary.push(format!("Connectivity URL: {}", config.connectivity_url));
    summary.push(format!("Download URL: {}", config.download_url));
    summary.push(format!(
        "Public IP Tracking: {} (every {}s)",
        config.track_public_ip, config.public_ip_recheck_secs
    ));
    summary.push(format!(
        "Quality Evaluation: {} (reference {})",
        config.quality_enabled, config.quality_reference
    ));
    summary.push(format!(
        "Mobile Info: {} (every {}s)",
        config.mobile_info_enabled, config.mobile_info_interval_secs
    ));
    summary.push(format!(
        "Battery: {} (every {}s, thresholds {:?})",
        config.battery_enabled, config.battery_interval_secs, config.battery_thresholds
    ));
    summary.push(format!("Log Directory: {}", config.log_dir.display()));
    summary.push(format!("Log Format: {:?}", config.log_format));
    summary.push(format!("Color Output: {}", config.enable_color));
    summary.push(format!("Verbose: {}", config.verbose));
    summary.push(format!("Debug: {}", config.debug));

    summary.join("\n")
}
