//! Command-line interface

use crate::logging::LogFormat;
use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// Network Health Monitor - continuous DNS latency, packet loss and connectivity monitoring
#[derive(Parser, Debug, Clone)]
#[command(name = "nhm")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Latency probe cadence in milliseconds
    #[arg(long, value_name = "MS", value_parser = parse_positive)]
    pub poll_interval: Option<u64>,

    /// Seconds between health summaries
    #[arg(long, value_name = "SECS", value_parser = parse_positive)]
    pub flush_interval: Option<u64>,

    /// Consecutive failures before the DNS target is re-evaluated
    #[arg(long, value_name = "N", value_parser = parse_threshold)]
    pub failure_threshold: Option<u32>,

    /// Primary DNS candidate as Name=address (can be used multiple times)
    #[arg(long = "dns", value_name = "NAME=IP", action = ArgAction::Append)]
    pub dns: Vec<String>,

    /// Directory for the session log files
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Log line format (plain or json)
    #[arg(long, value_name = "FORMAT", value_parser = parse_log_format)]
    pub log_format: Option<LogFormat>,

    /// Load environment variables from this file instead of .env
    #[arg(long, value_name = "FILE")]
    pub env_file: Option<PathBuf>,

    /// Do not track the public IP address
    #[arg(long)]
    pub no_public_ip: bool,

    /// Do not watch carrier and network type
    #[arg(long)]
    pub no_mobile_info: bool,

    /// Do not watch the battery level
    #[arg(long)]
    pub no_battery: bool,

    /// Skip the startup quality evaluation
    #[arg(long)]
    pub skip_quality: bool,

    /// Force colored output
    #[arg(long)]
    pub color: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Also print healthy summaries as alerts
    #[arg(long)]
    pub verbose: bool,

    /// Record debug-level entries
    #[arg(long)]
    pub debug: bool,

    /// Print the merged configuration and exit
    #[arg(long)]
    pub show_config: bool,

    /// Print the supported environment variables and exit
    #[arg(long)]
    pub env_help: bool,
}

impl Cli {
    /// Validate CLI arguments for conflicts
    pub fn validate(&self) -> Result<(), String> {
        if self.color && self.no_color {
            return Err("Cannot specify both --color and --no-color".to_string());
        }

        for pair in &self.dns {
            if !pair.contains('=') {
                return Err(format!("--dns expects Name=address, got '{}'", pair));
            }
        }

        Ok(())
    }

    /// Check if colors should be enabled
    pub fn use_colors(&self) -> bool {
        if self.color {
            true
        } else if self.no_color {
            false
        } else {
            supports_color()
        }
    }
}

fn parse_positive(s: &str) -> Result<u64, String> {
    if s.starts_with('+') {
        return Err(format!("Invalid value: {}", s));
    }

    match s.parse::<u64>() {
        Ok(0) => Err("Value must be greater than 0".to_string()),
        Ok(value) => Ok(value),
        Err(_) => Err(format!("Invalid value: {}", s)),
    }
}

fn parse_threshold(s: &str) -> Result<u32, String> {
    let value = parse_positive(s)?;
    u32::try_from(value).map_err(|_| format!("Threshold too large: {}", s))
}

fn parse_log_format(s: &str) -> Result<LogFormat, String> {
    s.parse().map_err(|e: crate::error::AppError| e.to_string())
}

/// Check if the terminal supports color output
fn supports_color() -> bool {
    if let Ok(term) = std::env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }

    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }

    #[cfg(unix)]
    {
        true
    }
    #[cfg(not(unix))]
    {
        false
    }
}
