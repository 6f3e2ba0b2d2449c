//! The latency monitoring loop
//!
//! One [`LatencyMonitor`] owns the active DNS target, the failure counter and
//! the latency window. Each cycle optionally re-checks the public address,
//! acquires a target if it has none, probes the target once, flushes the
//! window into a [`HealthSummary`] when the flush interval has elapsed, and
//! drops the target after too many consecutive failures.

use super::public_ip::{PublicAddress, PublicIpTracker};
use super::ranker::CandidateRanker;
use crate::alert::{AlertSink, Severity};
use crate::error::{AppError, ProbeError};
use crate::logging::Logger;
use crate::models::{Config, HealthSummary, LatencyWindow};
use crate::probe::{describe_failure, packet_loss_or_total, Prober};
use crate::types::{DnsCandidate, LatencyCutoffs};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, sleep, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Tunables of the latency loop
#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub poll_interval: Duration,
    pub flush_interval: Duration,
    pub failure_threshold: u32,
    pub no_target_backoff: Duration,
    pub probe_timeout: Duration,
    pub packet_loss_count: u32,
    pub packet_loss_alert_pct: u8,
    pub packet_loss_healthy_pct: u8,
    pub cutoffs: LatencyCutoffs,
    pub connectivity_url: String,
    pub connectivity_timeout: Duration,
    /// Public address lookup URL and recheck interval, when tracking is on
    pub public_ip: Option<(String, Duration)>,
    /// Also send healthy summaries to the alert sink
    pub verbose: bool,
}

impl MonitorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            flush_interval: config.flush_interval(),
            failure_threshold: config.failure_threshold,
            no_target_backoff: config.no_target_backoff(),
            probe_timeout: config.probe_timeout(),
            packet_loss_count: config.packet_loss_count,
            packet_loss_alert_pct: config.packet_loss_alert_pct,
            packet_loss_healthy_pct: config.packet_loss_healthy_pct,
            cutoffs: config.latency_cutoffs(),
            connectivity_url: config.connectivity_url.clone(),
            connectivity_timeout: config.connectivity_timeout(),
            public_ip: config
                .track_public_ip
                .then(|| (config.public_ip_url.clone(), config.public_ip_recheck())),
            verbose: config.verbose,
        }
    }
}

/// Whether the monitor currently has a DNS target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorState {
    NoTarget,
    HasTarget(DnsCandidate),
}

/// What the loop should do after a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Wait for the next tick
    Continue,
    /// No candidate answered; wait this long before trying again
    Backoff(Duration),
    /// Probing is impossible; the loop ends
    Stop,
}

pub struct LatencyMonitor {
    settings: MonitorSettings,
    candidates: Vec<DnsCandidate>,
    prober: Arc<dyn Prober>,
    ranker: CandidateRanker,
    logger: Logger,
    alerts: Arc<dyn AlertSink>,
    public_ip: Option<PublicIpTracker>,
    public_address: PublicAddress,
    state: MonitorState,
    consecutive_failures: u32,
    window: LatencyWindow,
    last_flush: Instant,
    flush_count: u64,
}

impl LatencyMonitor {
    pub fn new(
        settings: MonitorSettings,
        candidates: Vec<DnsCandidate>,
        prober: Arc<dyn Prober>,
        logger: Logger,
        alerts: Arc<dyn AlertSink>,
        started: Instant,
    ) -> Self {
        let ranker = CandidateRanker::new(
            prober.clone(),
            settings.probe_timeout,
            logger.clone(),
            alerts.clone(),
        );
        let public_address = PublicAddress::new();
        let public_ip = settings.public_ip.clone().map(|(url, recheck)| {
            PublicIpTracker::new(public_address.clone(), url, recheck, settings.connectivity_timeout)
        });

        Self {
            settings,
            candidates,
            prober,
            ranker,
            logger,
            alerts,
            public_ip,
            public_address,
            state: MonitorState::NoTarget,
            consecutive_failures: 0,
            window: LatencyWindow::new(),
            last_flush: started,
            flush_count: 0,
        }
    }

    /// Handle to the public address this monitor publishes
    pub fn public_address(&self) -> PublicAddress {
        self.public_address.clone()
    }

    pub fn state(&self) -> &MonitorState {
        &self.state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn window(&self) -> &LatencyWindow {
        &self.window
    }

    /// Number of flushes performed so far
    pub fn flush_count(&self) -> u64 {
        self.flush_count
    }

    /// Run one monitoring cycle as of `now`
    pub async fn run_cycle(&mut self, now: Instant) -> CycleOutcome {
        if let Some(tracker) = self.public_ip.as_mut() {
            tracker.check(now, self.prober.as_ref(), &self.logger, self.alerts.as_ref()).await;
        }

        let current = match &self.state {
            MonitorState::HasTarget(target) => Some(target.clone()),
            MonitorState::NoTarget => None,
        };

        let target = match current {
            Some(target) => target,
            None => match self.acquire_target().await {
                Ok(Some(target)) => target,
                Ok(None) => {
                    let message = format!(
                        "Waiting for coverage, retrying in {}s",
                        self.settings.no_target_backoff.as_secs()
                    );
                    self.logger.warn(&message)
                        .field("reason", AppError::no_reachable_candidate(format!(
                            "{} candidates silent",
                            self.candidates.len()
                        )).to_string())
                        .log()
                        .await;
                    self.alerts.notify(Severity::Warning, &message).await;
                    return CycleOutcome::Backoff(self.settings.no_target_backoff);
                }
                Err(e) => {
                    self.stop_unavailable(&e).await;
                    return CycleOutcome::Stop;
                }
            },
        };

        if let Err(e) = self.sample(&target).await {
            self.stop_unavailable(&e).await;
            return CycleOutcome::Stop;
        }

        if now.saturating_duration_since(self.last_flush) >= self.settings.flush_interval {
            self.flush(&target).await;
            self.last_flush = now;
        }

        if self.consecutive_failures >= self.settings.failure_threshold {
            self.state = MonitorState::NoTarget;
            self.consecutive_failures = 0;
            self.window.clear();

            let message = format!("Too many failures on {}, reevaluating DNS", target);
            let reason = AppError::excessive_failures(format!(
                "{} consecutive failures",
                self.settings.failure_threshold
            ));
            self.logger.warn(&message)
                .field("threshold", self.settings.failure_threshold)
                .field("reason", reason.to_string())
                .log()
                .await;
            self.alerts.notify(Severity::Warning, &message).await;
        }

        CycleOutcome::Continue
    }

    /// Drive cycles on the poll cadence until cancelled or stopped
    pub async fn run(mut self, cancel: CancellationToken) -> PublicAddress {
        let mut ticker = interval(self.settings.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        self.logger.info("Latency monitor started")
            .field("candidates", self.candidates.len())
            .log()
            .await;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            match self.run_cycle(Instant::now()).await {
                CycleOutcome::Continue => {}
                CycleOutcome::Backoff(delay) => {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break,
                        _ = sleep(delay) => {}
                    }
                    // the backoff replaces the poll wait, re-rank right away
                    ticker.reset_immediately();
                }
                CycleOutcome::Stop => break,
            }
        }

        self.logger.info("Latency monitor stopped").log().await;
        self.public_address
    }

    async fn acquire_target(&mut self) -> Result<Option<DnsCandidate>, ProbeError> {
        let selected = self.ranker.select_best(&self.candidates).await?;
        if let Some(target) = &selected {
            self.state = MonitorState::HasTarget(target.clone());
            self.consecutive_failures = 0;
        }
        Ok(selected)
    }

    /// One latency probe; only an unavailable prober is returned as an error
    async fn sample(&mut self, target: &DnsCandidate) -> Result<(), ProbeError> {
        let address = target.address.to_string();
        match self.prober.probe_latency(&address, self.settings.probe_timeout).await {
            Ok(latency_ms) => {
                self.consecutive_failures = 0;
                self.window.push(latency_ms);
                self.logger.info(&format!("Ping to {}: {:.1} ms", target, latency_ms))
                    .field("latency_ms", latency_ms)
                    .log()
                    .await;
                Ok(())
            }
            Err(e) if e.is_unavailable() => Err(e),
            Err(e) => {
                self.consecutive_failures += 1;
                self.logger.warn(&format!("Ping to {} failed", target))
                    .field("reason", describe_failure(&e))
                    .field("consecutive_failures", self.consecutive_failures)
                    .log()
                    .await;
                Ok(())
            }
        }
    }

    async fn flush(&mut self, target: &DnsCandidate) {
        let address = target.address.to_string();
        let settings = &self.settings;

        let loss = self.prober
            .probe_packet_loss(&address, settings.packet_loss_count, settings.probe_timeout)
            .await;
        let connectivity = self.prober
            .probe_connectivity(&settings.connectivity_url, settings.connectivity_timeout)
            .await;

        let summary = HealthSummary::from_window(
            &self.window,
            settings.cutoffs,
            packet_loss_or_total(&loss),
            connectivity.is_ok(),
        );
        self.flush_count += 1;

        let latency_line = summary.latency_line();
        let entry = if summary.latency_band.is_alerting() {
            self.logger.warn(&latency_line)
        } else {
            self.logger.info(&latency_line)
        };
        entry
            .field("dns", &target.name)
            .field("samples", summary.sample_count)
            .field("band", summary.latency_band)
            .log()
            .await;

        let loss_label = if summary.is_high_packet_loss(settings.packet_loss_alert_pct) {
            "High"
        } else if summary.is_packet_loss_healthy(settings.packet_loss_healthy_pct) {
            "Good"
        } else {
            "Degraded"
        };
        let loss_line = format!("Packet loss to {}: {}% ({})", target, summary.packet_loss_pct, loss_label);
        let entry = match &loss {
            Ok(_) => self.logger.info(&loss_line),
            Err(e) => self.logger.warn(&loss_line).field("reason", describe_failure(e)),
        };
        entry.field("packet_loss_pct", summary.packet_loss_pct).log().await;

        match &connectivity {
            Ok(()) => {
                self.logger.info("Web connectivity: OK")
                    .field("url", &settings.connectivity_url)
                    .log()
                    .await;
            }
            Err(e) => {
                self.logger.warn("Web connectivity: FAILED")
                    .field("url", &settings.connectivity_url)
                    .field("reason", describe_failure(e))
                    .log()
                    .await;
            }
        }

        if summary.latency_band.is_alerting() {
            self.alerts.notify(Severity::Warning, &latency_line).await;
        } else if settings.verbose {
            self.alerts.notify(Severity::Info, &latency_line).await;
        }

        if summary.is_high_packet_loss(settings.packet_loss_alert_pct) {
            self.alerts.notify(
                Severity::Warning,
                &format!("High packet loss ({}%) to {}", summary.packet_loss_pct, target),
            ).await;
        }

        if let Err(e) = &connectivity {
            self.alerts.notify(
                Severity::Warning,
                &format!("Web connectivity check failed: {}", describe_failure(e)),
            ).await;
        }

        self.window.clear();
    }

    async fn stop_unavailable(&self, error: &ProbeError) {
        let message = format!("Latency probing unavailable, monitor stopped: {}", error);
        self.logger.error(&message).field("reason", error.kind()).log().await;
        self.alerts.notify(Severity::Error, &message).await;
    }
}
