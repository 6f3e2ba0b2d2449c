//! Data models and structures for the network health monitor

pub mod config;
pub mod health;

// Re-export main model types
pub use config::Config;
pub use health::{BatteryStatus, DownloadSpeed, HealthSummary, LatencyWindow, MobileInfo};
