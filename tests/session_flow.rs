//! End-to-end runs against an in-process WebSocket game server.

use std::time::Duration;

use framebench::protocol::encode::{encode_asset_bundle, encode_game_frame, encode_handshake};
use framebench::providers::ReadyMessage;
use framebench::{
    AssetClass, BenchConfig, BenchError, ErrorCategory, Handshake, Ratio, run_benchmark,
};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

/// How the stand-in server behaves after the handshake.
struct Script {
    label: &'static str,
    frames: usize,
    interval: Duration,
    close_after_frames: bool,
}

fn handshake(label: &str) -> Vec<u8> {
    encode_handshake(&Handshake {
        confirmed_player_id: 3,
        aspect_ratio: Ratio::new(16, 9),
        bezel: Ratio::new(1, 2),
        codec_version_label: label.to_string(),
    })
    .unwrap()
}

fn assets() -> Vec<u8> {
    let payload = [0x42u8; 32];
    encode_asset_bundle([
        (AssetClass::Image, "background", payload.as_slice()),
        (AssetClass::Image, "sprite", payload.as_slice()),
        (AssetClass::Font, "title", payload.as_slice()),
    ])
    .unwrap()
}

fn frame() -> Vec<u8> {
    encode_game_frame([[1u8; 12].as_slice(), [2u8; 20].as_slice()]).unwrap()
}

/// Serve one client, returning the address and the ready message it sent.
async fn serve(script: Script) -> (String, oneshot::Receiver<ReadyMessage>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();
    let (ready_tx, ready_rx) = oneshot::channel();

    tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(socket).await.unwrap();

        let ready = loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => break text,
                Some(Ok(_)) => continue,
                _ => return,
            }
        };
        let _ = ready_tx.send(serde_json::from_str::<ReadyMessage>(ready.as_str()).unwrap());

        let preamble = [
            Message::binary(handshake(script.label)),
            Message::text("not for the benchmark"),
            Message::binary(assets()),
        ];
        for message in preamble {
            if ws.send(message).await.is_err() {
                return;
            }
        }
        for _ in 0..script.frames {
            if ws.send(Message::binary(frame())).await.is_err() {
                return;
            }
            tokio::time::sleep(script.interval).await;
        }

        if script.close_after_frames {
            let _ = ws.close(None).await;
        } else {
            // Hold the socket open until the client hangs up
            while let Some(Ok(_)) = ws.next().await {}
        }
    });

    (address, ready_rx)
}

fn config(address: String, frames: usize) -> BenchConfig {
    BenchConfig {
        codec_version: Some("1005".to_string()),
        frame_budget: frames,
        timeout: Duration::from_secs(10),
        ..BenchConfig::new(address)
    }
}

#[tokio::test]
async fn collects_frames_metadata_and_assets() {
    let (address, ready) = serve(Script {
        label: "1005",
        frames: 80,
        interval: Duration::from_millis(2),
        close_after_frames: false,
    })
    .await;

    let result = run_benchmark(&config(address, 50)).await.unwrap();

    let ready = ready.await.unwrap();
    assert_eq!(ready.client_info.device_type, "desktop");

    assert_eq!(result.total_frames, 50);
    let metadata = result.session_metadata.unwrap();
    assert_eq!(metadata.player_id, 3);
    assert_eq!(metadata.aspect_ratio, Ratio::new(16, 9));
    assert_eq!(metadata.bezel, Ratio::new(1, 2));
    assert_eq!(metadata.codec_version, "1005");

    assert_eq!(result.asset_counts.get(&AssetClass::Image), Some(&2));
    assert_eq!(result.asset_counts.get(&AssetClass::Font), Some(&1));
    assert_eq!(result.decode.unwrap().total_nodes, 2);

    let fps = result.performance.all.average_fps;
    assert!(fps.is_finite() && fps > 0.0, "fps was {fps}");
}

#[tokio::test]
async fn server_closing_early_yields_partial_result() {
    let (address, _ready) = serve(Script {
        label: "1005",
        frames: 5,
        interval: Duration::from_millis(1),
        close_after_frames: true,
    })
    .await;

    let result = run_benchmark(&config(address, 100)).await.unwrap();
    assert_eq!(result.total_frames, 5);
}

#[tokio::test]
async fn unexpected_codec_is_fatal() {
    let (address, _ready) = serve(Script {
        label: "0767",
        frames: 5,
        interval: Duration::from_millis(1),
        close_after_frames: false,
    })
    .await;

    let err = run_benchmark(&config(address, 5)).await.unwrap_err();
    assert!(matches!(err, BenchError::CodecNotFound { ref version } if version == "0767"));
    assert_eq!(err.category(), ErrorCategory::Configuration);
}

#[tokio::test]
async fn nothing_listening_is_a_connection_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();
    drop(listener);

    let err = run_benchmark(&config(address, 5)).await.unwrap_err();
    assert!(matches!(err, BenchError::Connection { .. }), "got {err:?}");
}
