//! Low-battery watcher

use super::WatchOutcome;
use crate::alert::{AlertSink, Severity};
use crate::logging::Logger;
use crate::probe::{describe_failure, DeviceProber};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Thresholds already notified during the current discharge
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlertedLevels {
    levels: BTreeSet<u8>,
}

impl AlertedLevels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, threshold: u8) -> bool {
        self.levels.contains(&threshold)
    }

    pub fn mark(&mut self, threshold: u8) {
        self.levels.insert(threshold);
    }

    /// Forget every threshold the level has climbed back above
    pub fn rearm_below(&mut self, level: u8) {
        self.levels.retain(|&threshold| level <= threshold);
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

/// Alerts once per threshold crossed, re-arming when the battery recovers
pub struct BatteryWatcher {
    prober: Arc<dyn DeviceProber>,
    period: Duration,
    timeout: Duration,
    /// Descending
    thresholds: Vec<u8>,
    logger: Logger,
    alerts: Arc<dyn AlertSink>,
    alerted: AlertedLevels,
}

impl BatteryWatcher {
    pub fn new(
        prober: Arc<dyn DeviceProber>,
        period: Duration,
        timeout: Duration,
        thresholds: &[u8],
        logger: Logger,
        alerts: Arc<dyn AlertSink>,
    ) -> Self {
        let mut thresholds = thresholds.to_vec();
        thresholds.sort_unstable_by(|a, b| b.cmp(a));
        thresholds.dedup();

        Self {
            prober,
            period,
            timeout,
            thresholds,
            logger,
            alerts,
            alerted: AlertedLevels::new(),
        }
    }

    pub fn alerted(&self) -> &AlertedLevels {
        &self.alerted
    }

    /// Thresholds crossed by `level` that have not been alerted yet
    pub fn newly_crossed(&mut self, level: u8) -> Vec<u8> {
        self.alerted.rearm_below(level);

        let crossed: Vec<u8> = self.thresholds
            .iter()
            .copied()
            .filter(|&threshold| level <= threshold && !self.alerted.contains(threshold))
            .collect();

        for &threshold in &crossed {
            self.alerted.mark(threshold);
        }
        crossed
    }

    pub async fn check(&mut self) -> WatchOutcome {
        let status = match self.prober.battery_status(self.timeout).await {
            Ok(status) => status,
            Err(e) if e.is_unavailable() => {
                let message = format!("Battery status unavailable, watcher stopped: {}", e);
                self.logger.error(&message).log().await;
                self.alerts.notify(Severity::Error, &message).await;
                return WatchOutcome::Stop;
            }
            Err(e) => {
                let message = format!("Error retrieving battery status: {}", describe_failure(&e));
                self.logger.error(&message).field("reason", e.kind()).log().await;
                self.alerts.notify(Severity::Warning, &message).await;
                return WatchOutcome::Continue;
            }
        };

        self.logger.debug(&format!("Battery: {}% ({})", status.percentage, status.status))
            .field("plugged", &status.plugged)
            .log()
            .await;

        let lowest = self.thresholds.last().copied();
        // Only the most severe crossing is announced when several happen at once
        if let Some(threshold) = self.newly_crossed(status.percentage).last().copied() {
            let severity = if Some(threshold) == lowest { Severity::Error } else { Severity::Warning };
            let message = format!("Battery low: {}% (at or below {}%)", status.percentage, threshold);
            self.logger.warn(&message)
                .field("percentage", status.percentage)
                .field("threshold", threshold)
                .log()
                .await;
            self.alerts.notify(severity, &message).await;
        }

        WatchOutcome::Continue
    }

    pub async fn run(mut self, cancel: CancellationToken) {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            if self.check().await == WatchOutcome::Stop {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::MemoryAlertSink;
    use crate::logging::MemoryRecorder;
    use crate::models::BatteryStatus;
    use crate::probe::ScriptedProber;

    fn battery(percentage: u8) -> BatteryStatus {
        BatteryStatus {
            percentage,
            status: "DISCHARGING".to_string(),
            plugged: "UNPLUGGED".to_string(),
        }
    }

    fn watcher(prober: Arc<ScriptedProber>) -> (BatteryWatcher, Arc<MemoryAlertSink>) {
        let recorder = Arc::new(MemoryRecorder::new());
        let alerts = Arc::new(MemoryAlertSink::new());
        let watcher = BatteryWatcher::new(
            prober,
            Duration::from_secs(60),
            Duration::from_secs(2),
            &[5, 20, 10],
            Logger::new("BATTERY", recorder),
            alerts.clone(),
        );
        (watcher, alerts)
    }

    #[test]
    fn test_alerted_levels_rearm() {
        let mut levels = AlertedLevels::new();
        levels.mark(20);
        levels.mark(10);
        levels.rearm_below(15);
        assert!(levels.contains(20));
        assert!(!levels.contains(10));
        levels.rearm_below(50);
        assert!(levels.is_empty());
    }

    #[test]
    fn test_each_threshold_crossed_once() {
        let (mut watcher, _) = watcher(Arc::new(ScriptedProber::new()));
        assert_eq!(watcher.newly_crossed(50), Vec::<u8>::new());
        assert_eq!(watcher.newly_crossed(19), vec![20]);
        assert_eq!(watcher.newly_crossed(18), Vec::<u8>::new());
        assert_eq!(watcher.newly_crossed(4), vec![10, 5]);
        assert_eq!(watcher.newly_crossed(3), Vec::<u8>::new());
    }

    #[test]
    fn test_recovery_rearms_thresholds() {
        let (mut watcher, _) = watcher(Arc::new(ScriptedProber::new()));
        assert_eq!(watcher.newly_crossed(15), vec![20]);
        assert_eq!(watcher.newly_crossed(40), Vec::<u8>::new());
        assert!(watcher.alerted().is_empty());
        assert_eq!(watcher.newly_crossed(20), vec![20]);
    }

    #[tokio::test]
    async fn test_lowest_threshold_alerts_as_error() {
        let prober = Arc::new(ScriptedProber::new());
        prober.push_battery(Ok(battery(19)));
        prober.push_battery(Ok(battery(19)));
        prober.push_battery(Ok(battery(5)));
        let (mut watcher, alerts) = watcher(prober);

        for _ in 0..3 {
            assert_eq!(watcher.check().await, WatchOutcome::Continue);
        }

        assert_eq!(alerts.alerts(), vec![
            (Severity::Warning, "Battery low: 19% (at or below 20%)".to_string()),
            (Severity::Error, "Battery low: 5% (at or below 5%)".to_string()),
        ]);
    }

    #[tokio::test]
    async fn test_unavailable_stops_watcher() {
        let (mut watcher, alerts) = watcher(Arc::new(ScriptedProber::new()));
        assert_eq!(watcher.check().await, WatchOutcome::Stop);
        assert_eq!(alerts.count_severity(Severity::Error), 1);
    }
}
