//! Type definitions and aliases

use std::fmt;
use std::net::IpAddr;
use serde::{Deserialize, Serialize};

// Re-export commonly used types
pub use crate::error::{AppError, ProbeError, Result};

/// Result of a single probe: a value, or the kind of failure that occurred
pub type ProbeOutcome<T> = std::result::Result<T, ProbeError>;

/// Which pool a DNS candidate was declared in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CandidatePool {
    Primary,
    Emergency,
}

/// A named DNS resolver address eligible for selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsCandidate {
    pub name: String,
    pub address: IpAddr,
    pub pool: CandidatePool,
}

impl DnsCandidate {
    /// Create a candidate in the primary pool
    pub fn primary<S: Into<String>>(name: S, address: IpAddr) -> Self {
        Self { name: name.into(), address, pool: CandidatePool::Primary }
    }

    /// Create a candidate in the emergency pool
    pub fn emergency<S: Into<String>>(name: S, address: IpAddr) -> Self {
        Self { name: name.into(), address, pool: CandidatePool::Emergency }
    }

    /// Parse a `Name=address` pair as used in configuration lists
    pub fn parse_pair(pair: &str, pool: CandidatePool) -> Result<Self> {
        let (name, address) = pair
            .split_once('=')
            .ok_or_else(|| AppError::config(format!("Expected Name=address, got '{}'", pair)))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::config(format!("DNS candidate name cannot be empty in '{}'", pair)));
        }
        let address: IpAddr = address.trim().parse()?;
        Ok(Self { name: name.to_string(), address, pool })
    }
}

impl fmt::Display for DnsCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.address)
    }
}

/// Cutoffs separating the latency bands, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatencyCutoffs {
    /// Averages strictly below this are Good
    pub good_below_ms: f64,
    /// Averages at or above this are Bad
    pub bad_from_ms: f64,
}

impl Default for LatencyCutoffs {
    fn default() -> Self {
        Self {
            good_below_ms: crate::defaults::DEFAULT_LATENCY_GOOD_MS,
            bad_from_ms: crate::defaults::DEFAULT_LATENCY_BAD_MS,
        }
    }
}

/// Qualitative classification of an average latency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LatencyBand {
    Good,
    Medium,
    Bad,
    /// No successful sample during the whole period
    Unknown,
}

impl LatencyBand {
    /// Classify an optional average; `None` means the window was empty
    pub fn classify(avg_latency_ms: Option<f64>, cutoffs: LatencyCutoffs) -> Self {
        match avg_latency_ms {
            None => Self::Unknown,
            Some(avg) if avg < cutoffs.good_below_ms => Self::Good,
            Some(avg) if avg < cutoffs.bad_from_ms => Self::Medium,
            Some(_) => Self::Bad,
        }
    }

    /// Whether this band should reach the alert sink
    pub fn is_alerting(&self) -> bool {
        matches!(self, Self::Bad | Self::Unknown)
    }
}

impl fmt::Display for LatencyBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Good => write!(f, "Good"),
            Self::Medium => write!(f, "Medium"),
            Self::Bad => write!(f, "Bad"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}
