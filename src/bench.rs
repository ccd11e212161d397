//! A single benchmark run, as executed inside a scenario's child process

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::codec::CodecRegistry;
use crate::connection::{BenchConnection, ConnectOptions};
use crate::driver::{DEFAULT_SNAPSHOT_EVERY, DriverOptions};
use crate::provider::Provider;
use crate::providers::ClientInfo;
use crate::scenario::{DEFAULT_FRAME_BUDGET, DEFAULT_TIMEOUT_MS, ScenarioResult};
use crate::{BenchError, ErrorCategory, Result};

/// Settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchConfig {
    /// `host:port` or `ws://` URL of the game server
    pub target: String,
    /// Codec the server is expected to announce; any known codec when `None`
    pub codec_version: Option<String>,
    pub frame_budget: usize,
    pub timeout: Duration,
    /// Server tick rate, recorded for the operator log
    pub tick_rate: Option<u32>,
    /// Server scale factor, recorded for the operator log
    pub scale_factor: Option<f64>,
    pub snapshot_every: usize,
    pub client_info: ClientInfo,
}

impl BenchConfig {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            codec_version: None,
            frame_budget: DEFAULT_FRAME_BUDGET,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            tick_rate: None,
            scale_factor: None,
            snapshot_every: DEFAULT_SNAPSHOT_EVERY,
            client_info: ClientInfo::default(),
        }
    }

    /// Codecs this run accepts.
    pub fn registry(&self) -> CodecRegistry {
        match &self.codec_version {
            Some(version) => CodecRegistry::with_versions([version.as_str()]),
            None => CodecRegistry::known(),
        }
    }

    fn driver_options(&self) -> DriverOptions {
        DriverOptions::default()
            .with_frame_budget(self.frame_budget)
            .with_snapshot_every(self.snapshot_every)
    }

    fn validate(&self) -> Result<()> {
        if self.frame_budget == 0 {
            return Err(BenchError::config("frame budget must be positive"));
        }
        if self.timeout.is_zero() {
            return Err(BenchError::config("timeout must be positive"));
        }
        Ok(())
    }
}

/// Connect to the configured server and collect one result.
pub async fn run_benchmark(config: &BenchConfig) -> Result<ScenarioResult> {
    config.validate()?;
    info!(
        target_addr = %config.target,
        codec = config.codec_version.as_deref().unwrap_or("any"),
        frames = config.frame_budget,
        tick_rate = ?config.tick_rate,
        scale_factor = ?config.scale_factor,
        "Starting benchmark run"
    );

    let options = ConnectOptions {
        registry: Arc::new(config.registry()),
        driver: config.driver_options(),
        client_info: config.client_info.clone(),
    };
    let connection = BenchConnection::connect(&config.target, options).await?;
    collect(connection, config).await
}

/// Collect one result from an arbitrary provider.
pub async fn run_with_provider<P>(provider: P, config: &BenchConfig) -> Result<ScenarioResult>
where
    P: Provider,
{
    config.validate()?;
    let connection = BenchConnection::from_provider(
        provider,
        Arc::new(config.registry()),
        config.driver_options(),
    );
    collect(connection, config).await
}

/// Wait for the frame budget or the timeout, whichever comes first.
///
/// Running out of time or losing the connection mid-run still yields a result
/// built from the frames received; the orchestrator's frame count assertion
/// decides whether that is a failure. Configuration errors fail the run.
async fn collect(mut connection: BenchConnection, config: &BenchConfig) -> Result<ScenarioResult> {
    match connection.wait_until_finished(config.timeout).await {
        Ok(reason) => info!(?reason, "Benchmark run finished"),
        Err(e) if e.category() == ErrorCategory::Timeout => {
            warn!(timeout = ?config.timeout, "Frame budget not reached before timeout");
        }
        Err(e) if e.category() == ErrorCategory::Transport => {
            warn!(error = %e, "Connection lost, reporting frames received so far");
        }
        Err(e) => return Err(e),
    }

    let snapshot = connection.close().await?.ok_or(BenchError::SessionClosed)?;
    let result = ScenarioResult::from_snapshot(&snapshot);
    info!(
        frames = result.total_frames,
        avg_fps = result.performance.all.average_fps,
        "Collected result"
    );
    Ok(result)
}
