//! Driver spawns and manages the message processing task

use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::provider::Provider;
use crate::session::{Ingest, SessionController, SessionSnapshot};
use crate::Result;

/// Publish a snapshot every this many frames unless configured otherwise.
pub const DEFAULT_SNAPSHOT_EVERY: usize = 10;

/// Tuning for a driver task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverOptions {
    /// Stop after exactly this many game frames; `None` runs until the provider ends
    pub frame_budget: Option<usize>,
    /// Publish a snapshot every this many frames (0 disables periodic snapshots)
    pub snapshot_every: usize,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self { frame_budget: None, snapshot_every: DEFAULT_SNAPSHOT_EVERY }
    }
}

impl DriverOptions {
    pub fn with_frame_budget(mut self, frames: usize) -> Self {
        self.frame_budget = Some(frames);
        self
    }

    pub fn with_snapshot_every(mut self, frames: usize) -> Self {
        self.snapshot_every = frames;
        self
    }
}

/// Why a driver task stopped without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The frame budget was reached
    FrameBudget,
    /// The provider ended its stream
    ProviderEnded,
    /// Cancelled, or every snapshot receiver was dropped
    Cancelled,
}

/// Result of spawning a driver task
pub struct DriverChannels {
    /// Receiver for session snapshots
    pub snapshots: watch::Receiver<Option<Arc<SessionSnapshot>>>,
    /// Cancellation token for graceful shutdown
    pub cancel: CancellationToken,
    /// Completes when the task stops; transport and configuration failures are errors
    pub task: JoinHandle<Result<StopReason>>,
}

/// Driver spawns and manages the message processing task
///
/// The task owns both the provider and the session controller, so ingestion
/// never waits on readers. Readers get `Arc` snapshots through a watch channel.
pub struct Driver;

impl Driver {
    /// Spawn the driver task for the given provider
    pub fn spawn<P>(
        provider: P,
        controller: SessionController,
        options: DriverOptions,
    ) -> DriverChannels
    where
        P: Provider,
    {
        let (snapshot_tx, snapshot_rx) = watch::channel(None);
        let cancel = CancellationToken::new();
        let cancel_task = cancel.clone();

        // Arrival times are measured from here
        let origin = Instant::now();

        let task = tokio::spawn(async move {
            Self::message_reader_task(
                provider,
                controller,
                options,
                origin,
                snapshot_tx,
                cancel_task,
            )
            .await
        });

        DriverChannels { snapshots: snapshot_rx, cancel, task }
    }

    /// Message reader task - feeds the controller and publishes snapshots
    async fn message_reader_task<P>(
        mut provider: P,
        mut controller: SessionController,
        options: DriverOptions,
        origin: Instant,
        snapshot_tx: watch::Sender<Option<Arc<SessionSnapshot>>>,
        cancel: CancellationToken,
    ) -> Result<StopReason>
    where
        P: Provider,
    {
        info!(
            provider = provider.target(),
            budget = ?options.frame_budget,
            "Message reader task started"
        );
        let mut message_count = 0u64;

        let outcome = loop {
            if options.frame_budget.is_some_and(|budget| controller.total_frames() >= budget) {
                info!(frames = controller.total_frames(), "Frame budget reached");
                break Ok(StopReason::FrameBudget);
            }

            // Use select to allow cancellation during provider.next_message()
            let result = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Message reader cancelled during read");
                    break Ok(StopReason::Cancelled);
                }
                result = provider.next_message() => result,
            };

            let message = match result {
                Ok(Some(message)) => message,
                Ok(None) => {
                    info!(messages = message_count, "Provider stream ended");
                    break Ok(StopReason::ProviderEnded);
                }
                Err(e) => {
                    error!(error = %e, "Provider failed, ending session");
                    break Err(e);
                }
            };

            message_count += 1;
            let arrival_ms = origin.elapsed().as_millis() as u64;

            let publish = match controller.ingest(&message, arrival_ms) {
                Ok(Ingest::Frame { total }) => {
                    trace!(total, arrival_ms, "Frame ingested");
                    options.snapshot_every > 0 && total % options.snapshot_every == 0
                }
                Ok(Ingest::Handshake) | Ok(Ingest::Assets { .. }) => true,
                Ok(Ingest::Ignored) => false,
                Err(e) if !e.is_fatal_to_session() => {
                    warn!(error = %e, bytes = message.len(), "Dropping malformed message");
                    false
                }
                Err(e) => {
                    error!(error = %e, "Session cannot continue");
                    break Err(e);
                }
            };

            if publish && snapshot_tx.send(Some(Arc::new(controller.snapshot()))).is_err() {
                debug!("Snapshot receivers dropped, shutting down");
                break Ok(StopReason::Cancelled);
            }
        };

        controller.close();
        if let Err(e) = provider.close().await {
            warn!(error = %e, "Failed to close provider");
        }
        let _ = snapshot_tx.send(Some(Arc::new(controller.snapshot())));

        info!(
            frames = controller.total_frames(),
            messages = message_count,
            "Message reader task ended"
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorCategory;
    use crate::codec::CodecRegistry;
    use crate::providers::{ReplayEnd, ReplayProvider};
    use crate::session::SessionState;
    use crate::test_utils::{handshake_message, paced_session};
    use std::time::Duration;

    fn controller() -> SessionController {
        SessionController::new(Arc::new(CodecRegistry::known()))
    }

    #[tokio::test(start_paused = true)]
    async fn stops_exactly_at_frame_budget() {
        let replay = paced_session("1005", 50, Duration::from_millis(10));
        let channels =
            Driver::spawn(replay, controller(), DriverOptions::default().with_frame_budget(20));

        assert_eq!(channels.task.await.unwrap().unwrap(), StopReason::FrameBudget);
        let snapshot = channels.snapshots.borrow().clone().unwrap();
        assert_eq!(snapshot.total_frames, 20);
        assert_eq!(snapshot.state, SessionState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn arrival_times_follow_the_clock() {
        let replay = paced_session("1005", 5, Duration::from_millis(10));
        let channels = Driver::spawn(replay, controller(), DriverOptions::default());

        assert_eq!(channels.task.await.unwrap().unwrap(), StopReason::ProviderEnded);
        let snapshot = channels.snapshots.borrow().clone().unwrap();
        assert_eq!(snapshot.total_frames, 5);
        assert_eq!(snapshot.performance.all.average_frame_time_ms, 10.0);
        assert_eq!(snapshot.performance.all.average_fps, 100.0);
    }

    #[tokio::test(start_paused = true)]
    async fn publishes_periodic_snapshots() {
        let replay =
            paced_session("1005", 30, Duration::from_millis(10)).end_with(ReplayEnd::Stall);
        let channels = Driver::spawn(
            replay,
            controller(),
            DriverOptions::default().with_snapshot_every(10),
        );
        let mut snapshots = channels.snapshots.clone();

        let snapshot = snapshots
            .wait_for(|s| s.as_ref().is_some_and(|s| s.total_frames >= 10))
            .await
            .unwrap()
            .clone()
            .unwrap();
        assert_eq!(snapshot.total_frames % 10, 0);
        assert_eq!(snapshot.state, SessionState::Active);

        channels.cancel.cancel();
        assert_eq!(channels.task.await.unwrap().unwrap(), StopReason::Cancelled);
    }

    #[tokio::test]
    async fn unknown_codec_ends_the_session() {
        let replay = ReplayProvider::new("bad-codec")
            .push(Duration::ZERO, handshake_message("0000"))
            .end_with(ReplayEnd::Stall);
        let channels = Driver::spawn(replay, controller(), DriverOptions::default());

        let err = channels.task.await.unwrap().unwrap_err();
        assert!(matches!(err, crate::BenchError::CodecNotFound { .. }));
    }

    #[tokio::test]
    async fn malformed_messages_are_skipped() {
        let replay = ReplayProvider::new("noisy")
            .push(Duration::ZERO, handshake_message("1005"))
            .push(Duration::ZERO, vec![])
            .push(Duration::ZERO, vec![1, 9, 9])
            .push(Duration::ZERO, vec![77, 1, 2, 3])
            .push(Duration::ZERO, vec![3]);
        let channels = Driver::spawn(replay, controller(), DriverOptions::default());

        assert_eq!(channels.task.await.unwrap().unwrap(), StopReason::ProviderEnded);
        let snapshot = channels.snapshots.borrow().clone().unwrap();
        assert_eq!(snapshot.total_frames, 1);
        assert_eq!(snapshot.metadata.as_ref().unwrap().codec_version, "1005");
    }

    #[tokio::test]
    async fn transport_failure_is_not_retried() {
        let replay = paced_session("1005", 7, Duration::from_millis(10))
            .end_with(ReplayEnd::Fail("connection reset".into()));
        let channels = Driver::spawn(replay, controller(), DriverOptions::default());

        let err = channels.task.await.unwrap().unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Transport);

        // The final snapshot still holds every frame received before the failure
        let snapshot = channels.snapshots.borrow().clone().unwrap();
        assert_eq!(snapshot.state, SessionState::Closed);
        assert_eq!(snapshot.total_frames, 7);
        assert_eq!(snapshot.metadata.as_ref().unwrap().codec_version, "1005");
    }
}
