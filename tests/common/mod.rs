//! Shared fixtures for the integration tests

#![allow(dead_code)]

use network_health_monitor::{
    monitor::{LatencyMonitor, MonitorSettings},
    probe::ScriptedProber,
    Config, DnsCandidate, Logger, MemoryAlertSink, MemoryRecorder,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

pub struct Fixture {
    pub prober: Arc<ScriptedProber>,
    pub recorder: Arc<MemoryRecorder>,
    pub alerts: Arc<MemoryAlertSink>,
    pub start: Instant,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            prober: Arc::new(ScriptedProber::new()),
            recorder: Arc::new(MemoryRecorder::new()),
            alerts: Arc::new(MemoryAlertSink::new()),
            start: Instant::now(),
        }
    }

    pub fn monitor(&self, settings: MonitorSettings, candidates: Vec<DnsCandidate>) -> LatencyMonitor {
        LatencyMonitor::new(
            settings,
            candidates,
            self.prober.clone(),
            Logger::new("DNS", self.recorder.clone()),
            self.alerts.clone(),
            self.start,
        )
    }

    pub fn logger(&self, name: &str) -> Logger {
        Logger::new(name, self.recorder.clone())
    }

    pub fn at(&self, secs: u64) -> Instant {
        self.start + Duration::from_secs(secs)
    }

    pub fn general_containing(&self, needle: &str) -> usize {
        self.recorder
            .general_messages()
            .iter()
            .filter(|m| m.contains(needle))
            .count()
    }
}

/// Default settings without public address tracking
pub fn settings() -> MonitorSettings {
    MonitorSettings {
        public_ip: None,
        ..MonitorSettings::from_config(&Config::default())
    }
}

pub fn candidate(name: &str, address: &str) -> DnsCandidate {
    DnsCandidate::primary(name, address.parse().unwrap())
}

pub fn emergency(name: &str, address: &str) -> DnsCandidate {
    DnsCandidate::emergency(name, address.parse().unwrap())
}
