//! Carrier and network-type watcher

use super::WatchOutcome;
use crate::alert::{AlertSink, Severity};
use crate::logging::Logger;
use crate::models::MobileInfo;
use crate::probe::{describe_failure, DeviceProber};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Reports the mobile network state whenever it differs from the last reading
pub struct MobileInfoWatcher {
    prober: Arc<dyn DeviceProber>,
    period: Duration,
    timeout: Duration,
    logger: Logger,
    alerts: Arc<dyn AlertSink>,
    previous: Option<MobileInfo>,
}

impl MobileInfoWatcher {
    pub fn new(
        prober: Arc<dyn DeviceProber>,
        period: Duration,
        timeout: Duration,
        logger: Logger,
        alerts: Arc<dyn AlertSink>,
    ) -> Self {
        Self { prober, period, timeout, logger, alerts, previous: None }
    }

    pub fn previous(&self) -> Option<&MobileInfo> {
        self.previous.as_ref()
    }

    pub async fn check(&mut self) -> WatchOutcome {
        match self.prober.mobile_info(self.timeout).await {
            Ok(info) => {
                if self.previous.as_ref() != Some(&info) {
                    let summary = info.summary();
                    self.logger.info(&summary)
                        .field("operator", &info.operator)
                        .field("network_type", &info.network_type)
                        .log()
                        .await;
                    self.alerts.notify(Severity::Info, &summary).await;
                    self.previous = Some(info);
                }
                WatchOutcome::Continue
            }
            Err(e) if e.is_unavailable() => {
                let message = format!("Mobile info unavailable, watcher stopped: {}", e);
                self.logger.error(&message).log().await;
                self.alerts.notify(Severity::Error, &message).await;
                WatchOutcome::Stop
            }
            Err(e) => {
                let message = format!("Error retrieving mobile info: {}", describe_failure(&e));
                self.logger.error(&message).field("reason", e.kind()).log().await;
                self.alerts.notify(Severity::Warning, &message).await;
                WatchOutcome::Continue
            }
        }
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
    use crate::error::ProbeError;
    use crate::logging::MemoryRecorder;
    use crate::probe::ScriptedProber;

    fn info(network_type: &str) -> MobileInfo {
        MobileInfo {
            operator: "Movistar".to_string(),
            network_type: network_type.to_string(),
            data_enabled: "true".to_string(),
            sim_state: "READY".to_string(),
        }
    }

    fn watcher(prober: Arc<ScriptedProber>) -> (MobileInfoWatcher, Arc<MemoryRecorder>, Arc<MemoryAlertSink>) {
        let recorder = Arc::new(MemoryRecorder::new());
        let alerts = Arc::new(MemoryAlertSink::new());
        let watcher = MobileInfoWatcher::new(
            prober,
            Duration::from_secs(60),
            Duration::from_secs(2),
            Logger::new("MOBILE", recorder.clone()),
            alerts.clone(),
        );
        (watcher, recorder, alerts)
    }

    #[tokio::test]
    async fn test_reports_only_changes() {
        let prober = Arc::new(ScriptedProber::new());
        prober.push_mobile_info(Ok(info("lte")));
        prober.push_mobile_info(Ok(info("lte")));
        prober.push_mobile_info(Ok(info("nr")));
        let (mut watcher, recorder, alerts) = watcher(prober);

        for _ in 0..3 {
            assert_eq!(watcher.check().await, WatchOutcome::Continue);
        }

        assert_eq!(recorder.general_messages(), vec![
            "Operator: Movistar, Network: LTE, Data: true, SIM: READY".to_string(),
            "Operator: Movistar, Network: NR, Data: true, SIM: READY".to_string(),
        ]);
        assert_eq!(alerts.alerts().len(), 2);
        assert_eq!(watcher.previous(), Some(&info("nr")));
    }

    #[tokio::test]
    async fn test_timeout_is_reported_and_loop_continues() {
        let prober = Arc::new(ScriptedProber::new());
        prober.push_mobile_info(Err(ProbeError::Timeout));
        prober.push_mobile_info(Ok(info("lte")));
        let (mut watcher, recorder, _alerts) = watcher(prober);

        assert_eq!(watcher.check().await, WatchOutcome::Continue);
        assert_eq!(watcher.check().await, WatchOutcome::Continue);
        assert!(recorder.general_messages()[0].contains("timed out"));
        assert!(watcher.previous().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unavailable_tool_stops_after_one_report() {
        let prober = Arc::new(ScriptedProber::new());
        let (watcher, recorder, alerts) = watcher(prober.clone());

        watcher.run(CancellationToken::new()).await;

        assert_eq!(recorder.general_messages().len(), 1);
        assert_eq!(alerts.count_severity(Severity::Error), 1);
    }
}
