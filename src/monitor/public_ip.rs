//! Externally-visible address tracking

use crate::alert::{AlertSink, Severity};
use crate::logging::Logger;
use crate::probe::Prober;
use std::net::IpAddr;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::time::Instant;

/// Last known public address, published by the latency loop and read by
/// everyone else as a whole value.
#[derive(Debug, Clone, Default)]
pub struct PublicAddress {
    inner: Arc<RwLock<Option<IpAddr>>>,
}

impl PublicAddress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value
    pub fn snapshot(&self) -> Option<IpAddr> {
        match self.inner.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn publish(&self, address: IpAddr) {
        match self.inner.write() {
            Ok(mut guard) => *guard = Some(address),
            Err(poisoned) => *poisoned.into_inner() = Some(address),
        }
    }
}

/// Result of one address check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressChange {
    /// No check was due
    NotDue,
    /// The lookup failed; the stored value is kept
    Unresolved,
    /// First address seen this session
    First(IpAddr),
    Unchanged(IpAddr),
    Changed { from: IpAddr, to: IpAddr },
}

/// Periodically re-resolves the public address and reports changes once
pub struct PublicIpTracker {
    address: PublicAddress,
    url: String,
    recheck: Duration,
    timeout: Duration,
    last_check: Option<Instant>,
}

impl PublicIpTracker {
    pub fn new(address: PublicAddress, url: String, recheck: Duration, timeout: Duration) -> Self {
        Self {
            address,
            url,
            recheck,
            timeout,
            last_check: None,
        }
    }

    pub fn address(&self) -> &PublicAddress {
        &self.address
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.last_check
            .map_or(true, |last| now.saturating_duration_since(last) >= self.recheck)
    }

    /// Re-resolve the address if the recheck interval has elapsed.
    ///
    /// The address itself only goes to the sensitive stream and the alert;
    /// the general stream learns that it changed, not what it is.
    pub async fn check(
        &mut self,
        now: Instant,
        prober: &dyn Prober,
        logger: &Logger,
        alerts: &dyn AlertSink,
    ) -> AddressChange {
        if !self.is_due(now) {
            return AddressChange::NotDue;
        }
        self.last_check = Some(now);

        let current = match prober.probe_public_address(&self.url, self.timeout).await {
            Ok(address) => address,
            Err(e) => {
                logger.debug("Public IP lookup failed").field("reason", e.kind()).log().await;
                return AddressChange::Unresolved;
            }
        };

        let change = match self.address.snapshot() {
            None => AddressChange::First(current),
            Some(previous) if previous == current => AddressChange::Unchanged(current),
            Some(previous) => AddressChange::Changed { from: previous, to: current },
        };

        match change {
            AddressChange::First(address) => {
                self.address.publish(address);
                logger.info(&format!("Public IP: {}", address)).sensitive().log().await;
                logger.info("Public IP recorded").log().await;
            }
            AddressChange::Changed { from, to } => {
                self.address.publish(to);
                logger.warn(&format!("Public IP changed from {} to {}", from, to)).sensitive().log().await;
                logger.warn("Public IP changed").log().await;
                alerts.notify(Severity::Warning, &format!("Public IP changed: {} -> {}", from, to)).await;
            }
            _ => {}
        }

        change
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::MemoryAlertSink;
    use crate::error::ProbeError;
    use crate::logging::MemoryRecorder;
    use crate::probe::ScriptedProber;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    struct Fixture {
        prober: ScriptedProber,
        recorder: Arc<MemoryRecorder>,
        logger: Logger,
        alerts: MemoryAlertSink,
        tracker: PublicIpTracker,
    }

    fn fixture() -> Fixture {
        let recorder = Arc::new(MemoryRecorder::new());
        Fixture {
            prober: ScriptedProber::new(),
            logger: Logger::new("DNS", recorder.clone()),
            recorder,
            alerts: MemoryAlertSink::new(),
            tracker: PublicIpTracker::new(
                PublicAddress::new(),
                "https://ip.example".to_string(),
                Duration::from_secs(60),
                Duration::from_secs(5),
            ),
        }
    }

    #[tokio::test]
    async fn test_same_address_twice_raises_no_alert() {
        let mut f = fixture();
        f.prober.set_public_address(Ok(ip("203.0.113.5")));
        let start = Instant::now();

        let first = f.tracker.check(start, &f.prober, &f.logger, &f.alerts).await;
        let second = f.tracker.check(start + Duration::from_secs(60), &f.prober, &f.logger, &f.alerts).await;

        assert_eq!(first, AddressChange::First(ip("203.0.113.5")));
        assert_eq!(second, AddressChange::Unchanged(ip("203.0.113.5")));
        assert!(f.alerts.alerts().is_empty());
        assert_eq!(f.tracker.address().snapshot(), Some(ip("203.0.113.5")));
    }

    #[tokio::test]
    async fn test_change_alerts_once_and_keeps_address_out_of_general_log() {
        let mut f = fixture();
        f.prober.push_public_address(Ok(ip("203.0.113.5")));
        f.prober.set_public_address(Ok(ip("198.51.100.7")));
        let start = Instant::now();

        f.tracker.check(start, &f.prober, &f.logger, &f.alerts).await;
        let change = f.tracker.check(start + Duration::from_secs(60), &f.prober, &f.logger, &f.alerts).await;
        f.tracker.check(start + Duration::from_secs(120), &f.prober, &f.logger, &f.alerts).await;

        assert_eq!(change, AddressChange::Changed { from: ip("203.0.113.5"), to: ip("198.51.100.7") });
        assert_eq!(f.alerts.count_containing("Public IP changed"), 1);
        assert!(f.recorder.general_messages().iter().all(|m| !m.contains("198.51.100.7") && !m.contains("203.0.113.5")));
        assert!(f.recorder.sensitive_messages().iter().any(|m| m.contains("198.51.100.7")));
        assert_eq!(f.tracker.address().snapshot(), Some(ip("198.51.100.7")));
    }

    #[tokio::test]
    async fn test_recheck_interval_is_respected() {
        let mut f = fixture();
        f.prober.set_public_address(Ok(ip("203.0.113.5")));
        let start = Instant::now();

        f.tracker.check(start, &f.prober, &f.logger, &f.alerts).await;
        let early = f.tracker.check(start + Duration::from_secs(59), &f.prober, &f.logger, &f.alerts).await;

        assert_eq!(early, AddressChange::NotDue);
        assert_eq!(f.prober.public_address_calls(), 1);
    }

    #[tokio::test]
    async fn test_lookup_failure_is_silent_and_keeps_value() {
        let mut f = fixture();
        f.prober.push_public_address(Ok(ip("203.0.113.5")));
        f.prober.set_public_address(Err(ProbeError::Timeout));
        let start = Instant::now();

        f.tracker.check(start, &f.prober, &f.logger, &f.alerts).await;
        let failed = f.tracker.check(start + Duration::from_secs(60), &f.prober, &f.logger, &f.alerts).await;

        assert_eq!(failed, AddressChange::Unresolved);
        assert!(f.alerts.alerts().is_empty());
        assert_eq!(f.tracker.address().snapshot(), Some(ip("203.0.113.5")));
    }
}
