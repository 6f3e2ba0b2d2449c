//! Parsing of `ping` output

use crate::error::ProbeError;
use crate::types::ProbeOutcome;
use regex::Regex;
use std::sync::OnceLock;

fn rtt_regex() -> Option<&'static Regex> {
    static RTT: OnceLock<Option<Regex>> = OnceLock::new();
    RTT.get_or_init(|| Regex::new(r"time[=<]\s*(\d+(?:\.\d+)?)\s*ms").ok()).as_ref()
}

fn loss_regex() -> Option<&'static Regex> {
    static LOSS: OnceLock<Option<Regex>> = OnceLock::new();
    LOSS.get_or_init(|| Regex::new(r"(\d+(?:\.\d+)?)%\s+packet loss").ok()).as_ref()
}

/// Extract the round-trip time of the first reply, in milliseconds
pub fn parse_ping_latency(output: &str) -> ProbeOutcome<f64> {
    let captures = rtt_regex()
        .and_then(|re| re.captures(output))
        .ok_or_else(|| ProbeError::malformed("no round-trip time in ping output"))?;

    captures[1]
        .parse::<f64>()
        .map_err(|e| ProbeError::malformed(format!("invalid round-trip time '{}': {}", &captures[1], e)))
}

/// Extract the packet loss percentage from a ping summary, rounded to a whole percent
pub fn parse_packet_loss(output: &str) -> ProbeOutcome<u8> {
    let captures = loss_regex()
        .and_then(|re| re.captures(output))
        .ok_or_else(|| ProbeError::malformed("no packet loss summary in ping output"))?;

    let pct = captures[1]
        .parse::<f64>()
        .map_err(|e| ProbeError::malformed(format!("invalid packet loss '{}': {}", &captures[1], e)))?;

    if !(0.0..=100.0).contains(&pct) {
        return Err(ProbeError::malformed(format!("packet loss out of range: {}", pct)));
    }

    Ok(pct.round() as u8)
}
