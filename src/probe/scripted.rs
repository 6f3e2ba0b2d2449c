//! Prober that replays scripted outcomes instead of touching the network

use super::{DeviceProber, Prober};
use crate::error::ProbeError;
use crate::models::{BatteryStatus, DownloadSpeed, MobileInfo};
use crate::types::ProbeOutcome;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;
use std::sync::Mutex;
use std::time::Duration;

/// A queue of one-shot outcomes in front of a sticky fallback
#[derive(Debug)]
struct Track<T> {
    queued: VecDeque<ProbeOutcome<T>>,
    fallback: ProbeOutcome<T>,
    calls: usize,
}

impl<T: Clone> Track<T> {
    fn new(fallback: ProbeOutcome<T>) -> Self {
        Self { queued: VecDeque::new(), fallback, calls: 0 }
    }

    fn next(&mut self) -> ProbeOutcome<T> {
        self.calls += 1;
        self.queued.pop_front().unwrap_or_else(|| self.fallback.clone())
    }
}

#[derive(Debug)]
struct Script {
    latency: HashMap<String, Track<f64>>,
    packet_loss: Track<u8>,
    connectivity: Track<()>,
    download: Track<DownloadSpeed>,
    public_address: Track<IpAddr>,
    mobile_info: Track<MobileInfo>,
    battery: Track<BatteryStatus>,
}

/// Replays configured outcomes; unknown latency targets time out
#[derive(Debug)]
pub struct ScriptedProber {
    script: Mutex<Script>,
}

impl Default for ScriptedProber {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedProber {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(Script {
                latency: HashMap::new(),
                packet_loss: Track::new(Ok(0)),
                connectivity: Track::new(Ok(())),
                download: Track::new(Err(ProbeError::unreachable("no download scripted"))),
                public_address: Track::new(Err(ProbeError::unreachable("no address scripted"))),
                mobile_info: Track::new(Err(ProbeError::unavailable("no mobile info scripted"))),
                battery: Track::new(Err(ProbeError::unavailable("no battery scripted"))),
            }),
        }
    }

    fn with_script<R>(&self, f: impl FnOnce(&mut Script) -> R) -> R {
        let mut guard = match self.script.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }

    fn latency_track<'a>(script: &'a mut Script, target: &str) -> &'a mut Track<f64> {
        script.latency
            .entry(target.to_string())
            .or_insert_with(|| Track::new(Err(ProbeError::Timeout)))
    }

    /// Outcome returned for `target` once the queue is drained
    pub fn set_latency(&self, target: &str, outcome: ProbeOutcome<f64>) {
        self.with_script(|s| Self::latency_track(s, target).fallback = outcome);
    }

    /// Outcome returned for the next latency probe of `target` only
    pub fn push_latency(&self, target: &str, outcome: ProbeOutcome<f64>) {
        self.with_script(|s| Self::latency_track(s, target).queued.push_back(outcome));
    }

    pub fn set_packet_loss(&self, outcome: ProbeOutcome<u8>) {
        self.with_script(|s| s.packet_loss.fallback = outcome);
    }

    pub fn push_packet_loss(&self, outcome: ProbeOutcome<u8>) {
        self.with_script(|s| s.packet_loss.queued.push_back(outcome));
    }

    pub fn set_connectivity(&self, outcome: ProbeOutcome<()>) {
        self.with_script(|s| s.connectivity.fallback = outcome);
    }

    pub fn set_download(&self, outcome: ProbeOutcome<DownloadSpeed>) {
        self.with_script(|s| s.download.fallback = outcome);
    }

    pub fn set_public_address(&self, outcome: ProbeOutcome<IpAddr>) {
        self.with_script(|s| s.public_address.fallback = outcome);
    }

    pub fn push_public_address(&self, outcome: ProbeOutcome<IpAddr>) {
        self.with_script(|s| s.public_address.queued.push_back(outcome));
    }

    pub fn set_mobile_info(&self, outcome: ProbeOutcome<MobileInfo>) {
        self.with_script(|s| s.mobile_info.fallback = outcome);
    }

    pub fn push_mobile_info(&self, outcome: ProbeOutcome<MobileInfo>) {
        self.with_script(|s| s.mobile_info.queued.push_back(outcome));
    }

    pub fn set_battery(&self, outcome: ProbeOutcome<BatteryStatus>) {
        self.with_script(|s| s.battery.fallback = outcome);
    }

    pub fn push_battery(&self, outcome: ProbeOutcome<BatteryStatus>) {
        self.with_script(|s| s.battery.queued.push_back(outcome));
    }

    pub fn latency_calls(&self, target: &str) -> usize {
        self.with_script(|s| s.latency.get(target).map_or(0, |t| t.calls))
    }

    pub fn total_latency_calls(&self) -> usize {
        self.with_script(|s| s.latency.values().map(|t| t.calls).sum())
    }

    pub fn packet_loss_calls(&self) -> usize {
        self.with_script(|s| s.packet_loss.calls)
    }

    pub fn connectivity_calls(&self) -> usize {
        self.with_script(|s| s.connectivity.calls)
    }

    pub fn public_address_calls(&self) -> usize {
        self.with_script(|s| s.public_address.calls)
    }
}

#[async_trait]
impl Prober for ScriptedProber {
    async fn probe_latency(&self, target: &str, _timeout: Duration) -> ProbeOutcome<f64> {
        self.with_script(|s| Self::latency_track(s, target).next())
    }

    async fn probe_packet_loss(&self, _target: &str, _count: u32, _timeout: Duration) -> ProbeOutcome<u8> {
        self.with_script(|s| s.packet_loss.next())
    }

    async fn probe_connectivity(&self, _url: &str, _timeout: Duration) -> ProbeOutcome<()> {
        self.with_script(|s| s.connectivity.next())
    }

    async fn probe_download(&self, _url: &str, _timeout: Duration) -> ProbeOutcome<DownloadSpeed> {
        self.with_script(|s| s.download.next())
    }

    async fn probe_public_address(&self, _url: &str, _timeout: Duration) -> ProbeOutcome<IpAddr> {
        self.with_script(|s| s.public_address.next())
    }
}

#[async_trait]
impl DeviceProber for ScriptedProber {
    async fn mobile_info(&self, _timeout: Duration) -> ProbeOutcome<MobileInfo> {
        self.with_script(|s| s.mobile_info.next())
    }

    async fn battery_status(&self, _timeout: Duration) -> ProbeOutcome<BatteryStatus> {
        self.with_script(|s| s.battery.next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_queue_drains_into_fallback() {
        let prober = ScriptedProber::new();
        prober.set_latency("8.8.8.8", Ok(20.0));
        prober.push_latency("8.8.8.8", Err(ProbeError::Timeout));

        let t = Duration::from_secs(1);
        assert_eq!(prober.probe_latency("8.8.8.8", t).await, Err(ProbeError::Timeout));
        assert_eq!(prober.probe_latency("8.8.8.8", t).await, Ok(20.0));
        assert_eq!(prober.probe_latency("8.8.8.8", t).await, Ok(20.0));
        assert_eq!(prober.latency_calls("8.8.8.8"), 3);
    }

    #[tokio::test]
    async fn test_unknown_target_times_out() {
        let prober = ScriptedProber::new();
        assert_eq!(prober.probe_latency("10.0.0.1", Duration::from_secs(1)).await, Err(ProbeError::Timeout));
        assert_eq!(prober.total_latency_calls(), 1);
    }
}
