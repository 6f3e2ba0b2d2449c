//! Device-level watchers: carrier/network state and battery level
//!
//! Both watchers poll a [`DeviceProber`](crate::probe::DeviceProber) on their
//! own cadence and report only what changed. Neither shares state with the
//! latency loop.

pub mod battery;
pub mod mobile;

pub use battery::{AlertedLevels, BatteryWatcher};
pub use mobile::MobileInfoWatcher;

/// What a watcher wants after one check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchOutcome {
    Continue,
    /// The device capability is missing; stop polling
    Stop,
}
