//! Tests for the connection layer
//!
//! These verify that snapshots propagate from the driver task to readers and
//! that the connection stops the way its callers expect.

use super::*;
use crate::providers::{ReplayEnd, ReplayProvider};
use crate::session::SessionState;
use crate::test_utils::{asset_bundle, handshake_message, paced_session};
use crate::types::AssetClass;
use tracing::info;

fn registry() -> Arc<CodecRegistry> {
    Arc::new(CodecRegistry::known())
}

#[tokio::test(start_paused = true)]
async fn replay_session_reaches_frame_budget() {
    let replay = paced_session("1005", 200, Duration::from_millis(16));
    let mut connection = BenchConnection::from_provider(
        replay,
        registry(),
        DriverOptions::default().with_frame_budget(100),
    );

    let reason = connection.wait_until_finished(Duration::from_secs(60)).await.unwrap();
    assert_eq!(reason, StopReason::FrameBudget);

    let snapshot = connection.current_snapshot().unwrap();
    info!(frames = snapshot.total_frames, "Replay finished");
    assert_eq!(snapshot.total_frames, 100);
    assert_eq!(snapshot.performance.last_100.average_frame_time_ms, 16.0);
    assert_eq!(snapshot.performance.last_100.min_frame_time_ms, Some(16.0));

    // A finished connection keeps reporting how it stopped
    assert_eq!(
        connection.wait_until_finished(Duration::from_secs(1)).await.unwrap(),
        StopReason::FrameBudget
    );
}

#[tokio::test(start_paused = true)]
async fn wait_times_out_while_server_is_silent() {
    let replay = paced_session("1005", 3, Duration::from_millis(10)).end_with(ReplayEnd::Stall);
    let mut connection = BenchConnection::from_provider(
        replay,
        registry(),
        DriverOptions::default().with_frame_budget(1000),
    );

    let err = connection.wait_until_finished(Duration::from_secs(5)).await.unwrap_err();
    assert_eq!(err.category(), crate::ErrorCategory::Timeout);

    // Still running; closing returns what was ingested so far
    let snapshot = connection.close().await.unwrap().unwrap();
    assert_eq!(snapshot.total_frames, 3);
    assert_eq!(snapshot.state, SessionState::Closed);
}

#[tokio::test(start_paused = true)]
async fn snapshot_stream_delivers_handshake_and_assets() {
    let replay = ReplayProvider::new("assets")
        .push(Duration::ZERO, handshake_message("1006"))
        .push(Duration::from_millis(5), asset_bundle(2, 8))
        .end_with(ReplayEnd::Stall);
    let connection = BenchConnection::from_provider(replay, registry(), DriverOptions::default());

    let mut stream = Box::pin(connection.snapshots());
    let snapshot = loop {
        let snapshot = stream.next().await.unwrap();
        if !snapshot.assets.is_empty() {
            break snapshot;
        }
    };

    assert_eq!(snapshot.metadata.as_ref().unwrap().codec_version, "1006");
    assert_eq!(snapshot.assets.counts().get(&AssetClass::Font), Some(&2));
    assert_eq!(snapshot.assets.len(), 6);
}

#[tokio::test]
async fn transport_failure_surfaces_from_wait() {
    let replay = ReplayProvider::new("flaky")
        .push(Duration::ZERO, handshake_message("1005"))
        .end_with(ReplayEnd::Fail("connection reset by peer".into()));
    let mut connection =
        BenchConnection::from_provider(replay, registry(), DriverOptions::default());

    let err = connection.wait_until_finished(Duration::from_secs(5)).await.unwrap_err();
    assert!(matches!(err, BenchError::Transport { .. }));

    // The error is reported once; afterwards the session is simply closed
    assert!(matches!(
        connection.wait_until_finished(Duration::from_secs(1)).await,
        Err(BenchError::SessionClosed)
    ));
}

#[tokio::test]
async fn dropping_the_connection_cancels_the_driver() {
    let replay = ReplayProvider::new("dropped").end_with(ReplayEnd::Stall);
    let connection = BenchConnection::from_provider(replay, registry(), DriverOptions::default());
    let mut snapshots = connection.snapshots.clone();
    drop(connection);

    let closed = tokio::time::timeout(
        Duration::from_secs(5),
        snapshots.wait_for(|s| s.as_ref().is_some_and(|s| s.state == SessionState::Closed)),
    )
    .await;
    assert!(closed.is_ok());
}

#[tokio::test]
async fn refused_websocket_is_reported() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = BenchConnection::connect(&addr.to_string(), ConnectOptions::default()).await;
    assert!(matches!(result, Err(BenchError::Connection { .. })));
}
