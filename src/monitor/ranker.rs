//! DNS candidate selection by measured latency

use crate::alert::{AlertSink, Severity};
use crate::error::ProbeError;
use crate::logging::Logger;
use crate::probe::{describe_failure, Prober};
use crate::types::DnsCandidate;
use std::sync::Arc;
use std::time::Duration;

/// Probes every candidate once and picks the fastest responder
#[derive(Clone)]
pub struct CandidateRanker {
    prober: Arc<dyn Prober>,
    probe_timeout: Duration,
    logger: Logger,
    alerts: Arc<dyn AlertSink>,
}

impl CandidateRanker {
    pub fn new(
        prober: Arc<dyn Prober>,
        probe_timeout: Duration,
        logger: Logger,
        alerts: Arc<dyn AlertSink>,
    ) -> Self {
        Self { prober, probe_timeout, logger, alerts }
    }

    /// Select the lowest-latency candidate.
    ///
    /// Candidates are probed sequentially in declaration order. `Ok(None)`
    /// means nobody answered; `Err` is returned only when the probing
    /// capability itself is unavailable.
    pub async fn select_best(&self, candidates: &[DnsCandidate]) -> Result<Option<DnsCandidate>, ProbeError> {
        let mut measured = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            let target = candidate.address.to_string();
            match self.prober.probe_latency(&target, self.probe_timeout).await {
                Ok(latency_ms) => {
                    self.logger.debug(&format!("Candidate {}: {:.1} ms", candidate, latency_ms))
                        .field("latency_ms", latency_ms)
                        .log()
                        .await;
                    measured.push((candidate, latency_ms));
                }
                Err(e) if e.is_unavailable() => return Err(e),
                Err(e) => {
                    self.logger.debug(&format!("Candidate {}: {}", candidate, describe_failure(&e)))
                        .field("reason", e.kind())
                        .log()
                        .await;
                }
            }
        }

        match lowest_latency(measured.iter().copied()) {
            Some((winner, latency_ms)) => {
                let message = format!("Best DNS: {} at {:.1} ms", winner, latency_ms);
                self.logger.info(&message)
                    .field("dns", &winner.name)
                    .field("latency_ms", latency_ms)
                    .field("responders", measured.len())
                    .log()
                    .await;
                self.alerts.notify(Severity::Info, &message).await;
                Ok(Some(winner.clone()))
            }
            None => {
                let message = "No functional DNS found";
                self.logger.error(message)
                    .field("candidates", candidates.len())
                    .log()
                    .await;
                self.alerts.notify(Severity::Warning, message).await;
                Ok(None)
            }
        }
    }
}

/// Strict minimum by latency; on ties the earliest entry wins
pub fn lowest_latency<'a, I>(measured: I) -> Option<(&'a DnsCandidate, f64)>
where
    I: IntoIterator<Item = (&'a DnsCandidate, f64)>,
{
    let mut best: Option<(&'a DnsCandidate, f64)> = None;
    for (candidate, latency_ms) in measured {
        match best {
            Some((_, best_ms)) if latency_ms >= best_ms => {}
            _ => best = Some((candidate, latency_ms)),
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::MemoryAlertSink;
    use crate::logging::MemoryRecorder;
    use crate::probe::ScriptedProber;
    use proptest::prelude::*;

    fn candidate(name: &str, address: &str) -> DnsCandidate {
        DnsCandidate::primary(name, address.parse().unwrap())
    }

    struct Fixture {
        prober: Arc<ScriptedProber>,
        recorder: Arc<MemoryRecorder>,
        alerts: Arc<MemoryAlertSink>,
        ranker: CandidateRanker,
    }

    fn fixture() -> Fixture {
        let prober = Arc::new(ScriptedProber::new());
        let recorder = Arc::new(MemoryRecorder::new());
        let alerts = Arc::new(MemoryAlertSink::new());
        let ranker = CandidateRanker::new(
            prober.clone(),
            Duration::from_secs(2),
            Logger::new("DNS", recorder.clone()),
            alerts.clone(),
        );
        Fixture { prober, recorder, alerts, ranker }
    }

    #[tokio::test]
    async fn test_emergency_candidate_wins_when_fastest() {
        let f = fixture();
        let candidates = vec![
            candidate("DNS-A", "1.1.1.1"),
            candidate("DNS-B", "8.8.8.8"),
            DnsCandidate::emergency("Emergency", "198.142.0.51".parse().unwrap()),
        ];
        f.prober.set_latency("1.1.1.1", Ok(30.0));
        f.prober.set_latency("8.8.8.8", Ok(20.0));
        f.prober.set_latency("198.142.0.51", Ok(10.0));

        let best = f.ranker.select_best(&candidates).await.unwrap().unwrap();
        assert_eq!(best.name, "Emergency");
        assert_eq!(f.alerts.alerts(), vec![(Severity::Info, "Best DNS: Emergency (198.142.0.51) at 10.0 ms".to_string())]);
        assert!(f.recorder.general_messages().iter().any(|m| m.starts_with("Best DNS: Emergency")));
    }

    #[tokio::test]
    async fn test_each_candidate_probed_once_in_order() {
        let f = fixture();
        let candidates = vec![candidate("A", "1.1.1.1"), candidate("B", "8.8.8.8")];
        f.prober.set_latency("1.1.1.1", Ok(5.0));

        f.ranker.select_best(&candidates).await.unwrap();
        assert_eq!(f.prober.latency_calls("1.1.1.1"), 1);
        assert_eq!(f.prober.latency_calls("8.8.8.8"), 1);
    }

    #[tokio::test]
    async fn test_no_responders_returns_none_with_error_record() {
        let f = fixture();
        let candidates = vec![candidate("A", "1.1.1.1"), candidate("B", "8.8.8.8")];
        f.prober.set_latency("8.8.8.8", Err(ProbeError::malformed("garbage")));

        let best = f.ranker.select_best(&candidates).await.unwrap();
        assert!(best.is_none());
        assert_eq!(f.alerts.count_containing("No functional DNS found"), 1);
        let errors: Vec<_> = f.recorder.general_entries().into_iter()
            .filter(|e| e.level == crate::logging::LogLevel::Error)
            .collect();
        assert_eq!(errors.len(), 1);
    }

    #[tokio::test]
    async fn test_unavailable_prober_is_an_error() {
        let f = fixture();
        f.prober.set_latency("1.1.1.1", Err(ProbeError::unavailable("ping not found")));

        let result = f.ranker.select_best(&[candidate("A", "1.1.1.1")]).await;
        assert!(matches!(result, Err(ProbeError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_empty_pool_selects_nothing() {
        let f = fixture();
        assert_eq!(f.ranker.select_best(&[]).await, Ok(None));
    }

    proptest! {
        #[test]
        fn prop_lowest_latency_is_minimum_with_first_declared_tie_break(
            latencies in prop::collection::vec(prop::option::of(0u32..500), 1..12)
        ) {
            let candidates: Vec<DnsCandidate> = (0..latencies.len())
                .map(|i| candidate(&format!("C{}", i), &format!("10.0.0.{}", i + 1)))
                .collect();
            let measured: Vec<(&DnsCandidate, f64)> = candidates.iter()
                .zip(&latencies)
                .filter_map(|(c, l)| l.map(|l| (c, l as f64)))
                .collect();

            let result = lowest_latency(measured.iter().copied());

            match latencies.iter().flatten().min() {
                None => prop_assert!(result.is_none()),
                Some(&min) => {
                    let first = latencies.iter().position(|l| *l == Some(min)).unwrap();
                    let (winner, ms) = result.unwrap();
                    prop_assert_eq!(ms, min as f64);
                    prop_assert_eq!(&winner.name, &format!("C{}", first));
                }
            }
        }
    }
}
