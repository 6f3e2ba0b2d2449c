//! Main application orchestration and execution

use crate::{
    alert::{AlertSink, ConsoleAlertSink},
    config::{display_config_summary, validate_config},
    defaults,
    device::{BatteryWatcher, MobileInfoWatcher},
    error::Result,
    logging::{FileRecorder, LogLevel, Logger, Recorder},
    models::Config,
    monitor::{LatencyMonitor, MonitorSettings},
    probe::{DeviceProber, Prober, SystemProber},
    quality,
};
use futures::future::join_all;
use std::future::Future;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub const START_MARKER: &str = "--- STARTING MONITOR ---";
pub const STOP_MARKER: &str = "--- MONITOR STOPPED ---";

/// Capabilities a monitoring session runs against
#[derive(Clone)]
pub struct Services {
    pub prober: Arc<dyn Prober>,
    pub device: Arc<dyn DeviceProber>,
    pub recorder: Arc<dyn Recorder>,
    pub alerts: Arc<dyn AlertSink>,
}

/// Main application struct that coordinates all components
pub struct App {
    config: Config,
}

impl App {
    /// Create a new application instance from a loaded configuration
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run until `shutdown` resolves, against the real system
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let config = &self.config;
        println!("{} v{}", crate::PKG_NAME, crate::VERSION);

        let warnings = validate_config(config)?;
        if config.debug {
            println!("Built {} from {} for {}", crate::BUILD_TIME, crate::GIT_COMMIT, crate::TARGET_TRIPLE);
            println!("\nConfiguration Summary:");
            println!("{}", display_config_summary(config));
        }
        if !warnings.is_empty() {
            println!("\nConfiguration Warnings:");
            for warning in &warnings {
                println!("  {}", warning.format(config.enable_color));
            }
        }

        let min_level = if config.debug { LogLevel::Debug } else { LogLevel::Info };
        let recorder = Arc::new(FileRecorder::open(&config.log_dir, config.log_format, min_level).await?);
        println!("Logging to {}", recorder.general_path().display());

        let system = Arc::new(SystemProber::new()?);
        let services = Services {
            prober: system.clone(),
            device: system,
            recorder,
            alerts: Arc::new(ConsoleAlertSink::new(config.enable_color)),
        };

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let session = run_session(config, services, cancel);
        tokio::pin!(session);

        tokio::select! {
            result = &mut session => return result.map(|_| ()),
            _ = shutdown => {
                println!("\nStopping monitor...");
                trigger.cancel();
            }
        }

        session.await.map(|_| ())
    }
}

/// Run every enabled monitor until `cancel` fires, then close the recorder.
///
/// Returns the last public address the latency monitor saw.
pub async fn run_session(
    config: &Config,
    services: Services,
    cancel: CancellationToken,
) -> Result<Option<IpAddr>> {
    let session = Logger::new("SESSION", services.recorder.clone());
    session.info(START_MARKER).log().await;
    session.info(START_MARKER).sensitive().log().await;

    let monitor = LatencyMonitor::new(
        MonitorSettings::from_config(config),
        config.candidates(),
        services.prober.clone(),
        Logger::new("DNS", services.recorder.clone()),
        services.alerts.clone(),
        tokio::time::Instant::now(),
    );
    let public_address = monitor.public_address();
    let mut tasks: Vec<JoinHandle<()>> = Vec::new();

    let token = cancel.clone();
    tasks.push(tokio::spawn(async move {
        monitor.run(token).await;
    }));

    let device_timeout = Duration::from_secs(defaults::DEFAULT_DEVICE_TIMEOUT_SECS);

    if config.mobile_info_enabled {
        let watcher = MobileInfoWatcher::new(
            services.device.clone(),
            config.mobile_info_interval(),
            device_timeout,
            Logger::new("MOBILE", services.recorder.clone()),
            services.alerts.clone(),
        );
        tasks.push(tokio::spawn(watcher.run(cancel.clone())));
    }

    if config.battery_enabled {
        let watcher = BatteryWatcher::new(
            services.device.clone(),
            config.battery_interval(),
            device_timeout,
            &config.battery_thresholds,
            Logger::new("BATTERY", services.recorder.clone()),
            services.alerts.clone(),
        );
        tasks.push(tokio::spawn(watcher.run(cancel.clone())));
    }

    if config.quality_enabled {
        let prober = services.prober.clone();
        let logger = Logger::new("QUALITY", services.recorder.clone());
        let alerts = services.alerts.clone();
        let quality_config = config.clone();
        let token = cancel.clone();
        tasks.push(tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = quality::evaluate(prober.as_ref(), &quality_config, &logger, alerts.as_ref()) => {}
            }
        }));
    }

    cancel.cancelled().await;

    for result in join_all(tasks).await {
        if let Err(e) = result {
            session.error(&format!("Monitor task failed: {}", e)).log().await;
        }
    }

    let last_address = public_address.snapshot();
    session.info(STOP_MARKER).log().await;
    session.info(STOP_MARKER).sensitive().log().await;
    match last_address {
        Some(ip) => session.info(&format!("Last public IP: {}", ip)).sensitive().log().await,
        None => session.info("Last public IP: unknown").sensitive().log().await,
    }

    services.recorder.close().await?;
    Ok(last_address)
}
