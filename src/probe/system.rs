//! Prober backed by system tools and HTTP requests

use super::parse::{parse_packet_loss, parse_ping_latency};
use super::{DeviceProber, Prober};
use crate::error::{AppError, ProbeError, Result};
use crate::models::{BatteryStatus, DownloadSpeed, MobileInfo};
use crate::types::ProbeOutcome;
use async_trait::async_trait;
use reqwest::Client;
use std::net::IpAddr;
use std::process::Output;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::time::timeout;

/// Runs `ping` and the device query tools, and issues HTTP probes with reqwest
#[derive(Debug, Clone)]
pub struct SystemProber {
    client: Client,
    ping_program: String,
}

impl SystemProber {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(format!("{}/{}", crate::PKG_NAME, crate::VERSION))
            .build()
            .map_err(|e| AppError::internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            ping_program: "ping".to_string(),
        })
    }

    /// Use a different ping executable
    pub fn with_ping_program<S: Into<String>>(mut self, program: S) -> Self {
        self.ping_program = program.into();
        self
    }

    async fn ping(&self, target: &str, count: u32, per_reply_timeout: Duration, overall: Duration) -> ProbeOutcome<Output> {
        let wait_secs = per_reply_timeout.as_secs().max(1).to_string();
        let count = count.to_string();

        let mut command = Command::new(&self.ping_program);
        command
            .args(["-c", count.as_str(), "-W", wait_secs.as_str(), target])
            .kill_on_drop(true);

        run_bounded(command, &self.ping_program, overall).await
    }

    async fn run_json_tool<T>(&self, program: &str, limit: Duration) -> ProbeOutcome<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let mut command = Command::new(program);
        command.kill_on_drop(true);

        let output = run_bounded(command, program, limit).await?;
        if !output.status.success() {
            return Err(ProbeError::unreachable(format!("{} exited with {}", program, output.status)));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| ProbeError::malformed(format!("{} output: {}", program, e)))
    }
}

async fn run_bounded(mut command: Command, program: &str, limit: Duration) -> ProbeOutcome<Output> {
    match timeout(limit, command.output()).await {
        Err(_) => Err(ProbeError::Timeout),
        Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ProbeError::unavailable(format!("{} not found", program)))
        }
        Ok(Err(e)) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            Err(ProbeError::unavailable(format!("{} not permitted: {}", program, e)))
        }
        Ok(Err(e)) => Err(ProbeError::unreachable(format!("{} failed to run: {}", program, e))),
        Ok(Ok(output)) => Ok(output),
    }
}

fn map_http_error(error: reqwest::Error) -> ProbeError {
    if error.is_timeout() {
        ProbeError::Timeout
    } else if error.is_decode() || error.is_body() {
        ProbeError::malformed(error.to_string())
    } else {
        ProbeError::unreachable(error.to_string())
    }
}

#[async_trait]
impl Prober for SystemProber {
    async fn probe_latency(&self, target: &str, limit: Duration) -> ProbeOutcome<f64> {
        // One extra second lets ping report its own timeout before we cut it off
        let output = self.ping(target, 1, limit, limit + Duration::from_secs(1)).await?;
        let stdout = String::from_utf8_lossy(&output.stdout);

        if !output.status.success() {
            return Err(ProbeError::unreachable(format!("no reply from {}", target)));
        }

        parse_ping_latency(&stdout)
    }

    async fn probe_packet_loss(&self, target: &str, count: u32, limit: Duration) -> ProbeOutcome<u8> {
        let overall = limit * count + Duration::from_secs(1);
        let output = self.ping(target, count, limit, overall).await?;

        // ping exits non-zero on partial loss; the summary line is still printed
        parse_packet_loss(&String::from_utf8_lossy(&output.stdout))
    }

    async fn probe_connectivity(&self, url: &str, limit: Duration) -> ProbeOutcome<()> {
        let response = self.client
            .head(url)
            .timeout(limit)
            .send()
            .await
            .map_err(map_http_error)?;

        if response.status().is_server_error() {
            return Err(ProbeError::unreachable(format!("{} returned {}", url, response.status())));
        }
        Ok(())
    }

    async fn probe_download(&self, url: &str, limit: Duration) -> ProbeOutcome<DownloadSpeed> {
        let start = Instant::now();
        let transfer = async {
            let mut response = self.client
                .get(url)
                .send()
                .await
                .map_err(map_http_error)?;

            if !response.status().is_success() {
                return Err(ProbeError::unreachable(format!("{} returned {}", url, response.status())));
            }

            let mut bytes: u64 = 0;
            while let Some(chunk) = response.chunk().await.map_err(map_http_error)? {
                bytes += chunk.len() as u64;
            }
            Ok(bytes)
        };

        let bytes = timeout(limit, transfer).await.map_err(|_| ProbeError::Timeout)??;
        DownloadSpeed::from_transfer(bytes, start.elapsed().as_secs_f64())
            .ok_or_else(|| ProbeError::malformed("download finished in zero time"))
    }

    async fn probe_public_address(&self, url: &str, limit: Duration) -> ProbeOutcome<IpAddr> {
        let response = self.client
            .get(url)
            .timeout(limit)
            .send()
            .await
            .map_err(map_http_error)?;

        if !response.status().is_success() {
            return Err(ProbeError::unreachable(format!("{} returned {}", url, response.status())));
        }

        let body = response.text().await.map_err(map_http_error)?;
        body.trim()
            .parse::<IpAddr>()
            .map_err(|e| ProbeError::malformed(format!("'{}' is not an address: {}", body.trim(), e)))
    }
}

#[async_trait]
impl DeviceProber for SystemProber {
    async fn mobile_info(&self, limit: Duration) -> ProbeOutcome<MobileInfo> {
        self.run_json_tool("termux-telephony-deviceinfo", limit).await
    }

    async fn battery_status(&self, limit: Duration) -> ProbeOutcome<BatteryStatus> {
        self.run_json_tool("termux-battery-status", limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn prober() -> SystemProber {
        SystemProber::new().unwrap()
    }

    #[tokio::test]
    async fn test_connectivity_success() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let result = prober().probe_connectivity(&server.uri(), Duration::from_secs(2)).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_connectivity_redirect_and_client_errors_count_as_reachable() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        assert!(prober().probe_connectivity(&server.uri(), Duration::from_secs(2)).await.is_ok());
    }

    #[tokio::test]
    async fn test_connectivity_server_error_is_unreachable() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let result = prober().probe_connectivity(&server.uri(), Duration::from_secs(2)).await;
        assert!(matches!(result, Err(ProbeError::Unreachable(_))));
    }

    #[tokio::test]
    async fn test_connectivity_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let result = prober().probe_connectivity(&server.uri(), Duration::from_millis(100)).await;
        assert_eq!(result, Err(ProbeError::Timeout));
    }

    #[tokio::test]
    async fn test_download_counts_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/100KB.zip"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 100 * 1024]))
            .mount(&server)
            .await;

        let url = format!("{}/100KB.zip", server.uri());
        let speed = prober().probe_download(&url, Duration::from_secs(5)).await.unwrap();
        assert!(speed.mbytes_per_sec > 0.0);
        assert!((speed.mbits_per_sec - speed.mbytes_per_sec * 8.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_download_not_found_is_unreachable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let result = prober().probe_download(&server.uri(), Duration::from_secs(2)).await;
        assert!(matches!(result, Err(ProbeError::Unreachable(_))));
    }

    #[tokio::test]
    async fn test_public_address_parsing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("203.0.113.9\n"))
            .mount(&server)
            .await;

        let address = prober().probe_public_address(&server.uri(), Duration::from_secs(2)).await.unwrap();
        assert_eq!(address, "203.0.113.9".parse::<IpAddr>().unwrap());
    }

    #[tokio::test]
    async fn test_public_address_garbage_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>captive portal</html>"))
            .mount(&server)
            .await;

        let result = prober().probe_public_address(&server.uri(), Duration::from_secs(2)).await;
        assert!(matches!(result, Err(ProbeError::Malformed(_))));
    }

    #[tokio::test]
    async fn test_missing_ping_is_unavailable() {
        let prober = prober().with_ping_program("definitely-not-a-ping-binary");
        let result = prober.probe_latency("127.0.0.1", Duration::from_secs(1)).await;
        assert!(matches!(result, Err(ProbeError::Unavailable(_))));

        let loss = prober.probe_packet_loss("127.0.0.1", 2, Duration::from_secs(1)).await;
        assert!(matches!(loss, Err(ProbeError::Unavailable(_))));
    }
}
