//! Message providers: a live WebSocket and a scripted replay.

pub mod replay;
pub mod websocket;

pub use replay::{ReplayEnd, ReplayProvider};
pub use websocket::{ClientInfo, ReadyMessage, WebSocketProvider};
