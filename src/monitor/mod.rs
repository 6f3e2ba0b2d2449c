//! DNS selection and latency monitoring

pub mod latency;
pub mod public_ip;
pub mod ranker;

pub use latency::{CycleOutcome, LatencyMonitor, MonitorSettings, MonitorState};
pub use public_ip::{AddressChange, PublicAddress, PublicIpTracker};
pub use ranker::{lowest_latency, CandidateRanker};
