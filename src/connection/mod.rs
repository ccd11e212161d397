//! Benchmark connection: a driver task plus the handles to observe it

use futures::{Stream, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::codec::CodecRegistry;
use crate::driver::{Driver, DriverOptions, StopReason};
use crate::provider::Provider;
use crate::providers::{ClientInfo, WebSocketProvider};
use crate::session::{SessionController, SessionSnapshot};
use crate::{BenchError, Result};

#[cfg(test)]
mod tests;

/// Settings for [`BenchConnection::connect`].
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub registry: Arc<CodecRegistry>,
    pub driver: DriverOptions,
    pub client_info: ClientInfo,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            registry: Arc::new(CodecRegistry::known()),
            driver: DriverOptions::default(),
            client_info: ClientInfo::default(),
        }
    }
}

/// One benchmark session against a message source
pub struct BenchConnection {
    /// Snapshot watch receiver
    snapshots: watch::Receiver<Option<Arc<SessionSnapshot>>>,

    /// Driver task, until it has been awaited
    task: Option<JoinHandle<Result<StopReason>>>,

    /// How the driver stopped, once known
    finished: Option<StopReason>,

    /// Source description
    target: String,

    /// Cancellation token for stopping the driver
    cancel: CancellationToken,
}

impl BenchConnection {
    /// Connect to a game server over WebSocket and start ingesting.
    pub async fn connect(target: &str, options: ConnectOptions) -> Result<Self> {
        let provider = WebSocketProvider::connect(target, options.client_info).await?;
        Ok(Self::from_provider(provider, options.registry, options.driver))
    }

    /// Start ingesting from any provider.
    pub fn from_provider<P>(
        provider: P,
        registry: Arc<CodecRegistry>,
        options: DriverOptions,
    ) -> Self
    where
        P: Provider,
    {
        let target = provider.target().to_string();
        let controller = SessionController::new(registry);
        let channels = Driver::spawn(provider, controller, options);

        info!(source = %target, "Benchmark connection started");

        Self {
            snapshots: channels.snapshots,
            task: Some(channels.task),
            finished: None,
            target,
            cancel: channels.cancel,
        }
    }

    /// Snapshots as they are published.
    ///
    /// Yields the current snapshot immediately when there is one.
    pub fn snapshots(&self) -> impl Stream<Item = Arc<SessionSnapshot>> + 'static {
        WatchStream::new(self.snapshots.clone()).filter_map(|opt| async move { opt })
    }

    /// The latest published snapshot (if any)
    pub fn current_snapshot(&self) -> Option<Arc<SessionSnapshot>> {
        self.snapshots.borrow().clone()
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Wait for the driver to stop, for at most `timeout`.
    ///
    /// On timeout the driver keeps running and this may be called again.
    pub async fn wait_until_finished(&mut self, timeout: Duration) -> Result<StopReason> {
        let Some(task) = self.task.as_mut() else {
            return self.finished.ok_or(BenchError::SessionClosed);
        };

        let joined = tokio::time::timeout(timeout, task)
            .await
            .map_err(|_| BenchError::timeout(self.target.clone(), timeout))?;
        self.task = None;

        let outcome = joined
            .map_err(|e| BenchError::transport("driver task failed", Box::new(e)))?;
        let reason = outcome?;
        self.finished = Some(reason);
        Ok(reason)
    }

    /// Stop the driver and return the final snapshot.
    pub async fn close(mut self) -> Result<Option<Arc<SessionSnapshot>>> {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            match task.await {
                Ok(Ok(reason)) => debug!(?reason, "Driver stopped"),
                Ok(Err(e)) => debug!(error = %e, "Driver had already failed"),
                Err(e) => return Err(BenchError::transport("driver task failed", Box::new(e))),
            }
        }
        Ok(self.current_snapshot())
    }
}

impl Drop for BenchConnection {
    fn drop(&mut self) {
        debug!("Dropping benchmark connection");
        // Cancel tasks on drop for clean shutdown
        self.cancel.cancel();
    }
}
