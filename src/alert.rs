//! Human-facing alert notifications

use async_trait::async_trait;
use chrono::Local;
use colored::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Mutex;

/// Alert severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// Consumer of alert notifications
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn notify(&self, severity: Severity, message: &str);
}

/// Prints alerts to the terminal
#[derive(Debug, Clone)]
pub struct ConsoleAlertSink {
    use_color: bool,
}

impl ConsoleAlertSink {
    pub fn new(use_color: bool) -> Self {
        Self { use_color }
    }

    /// Format one alert line as it is printed
    pub fn format_alert(&self, severity: Severity, message: &str) -> String {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        let line = format!("[ALERT] [{}] {}", timestamp, message);

        if !self.use_color {
            return line;
        }

        match severity {
            Severity::Info => line.cyan().to_string(),
            Severity::Warning => line.yellow().bold().to_string(),
            Severity::Error => line.red().bold().to_string(),
        }
    }
}

#[async_trait]
impl AlertSink for ConsoleAlertSink {
    async fn notify(&self, severity: Severity, message: &str) {
        let line = self.format_alert(severity, message);
        match severity {
            Severity::Error => eprintln!("{}", line),
            _ => println!("{}", line),
        }
    }
}

/// Keeps every notification in memory
#[derive(Debug, Default)]
pub struct MemoryAlertSink {
    alerts: Mutex<Vec<(Severity, String)>>,
}

impl MemoryAlertSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alerts(&self) -> Vec<(Severity, String)> {
        self.alerts.lock().map(|a| a.clone()).unwrap_or_default()
    }

    /// Number of alerts whose message contains `needle`
    pub fn count_containing(&self, needle: &str) -> usize {
        self.alerts().iter().filter(|(_, m)| m.contains(needle)).count()
    }

    pub fn count_severity(&self, severity: Severity) -> usize {
        self.alerts().iter().filter(|(s, _)| *s == severity).count()
    }
}

#[async_trait]
impl AlertSink for MemoryAlertSink {
    async fn notify(&self, severity: Severity, message: &str) {
        if let Ok(mut alerts) = self.alerts.lock() {
            alerts.push((severity, message.to_string()));
        }
    }
}
