//! Frame-rate benchmarking and conformance harness for remote game-rendering servers.
//!
//! A game server renders frames remotely and streams them to clients over a
//! WebSocket as binary messages. `framebench` speaks that client protocol,
//! measures how fast frames arrive, and checks the numbers against thresholds.
//!
//! # Layers
//!
//! - **Wire decoding** ([`protocol`]): binary envelopes, handshakes and asset
//!   bundles, decoded into the shared [`types`]
//! - **Measurement** ([`session`], [`stats`], [`codec`]): one
//!   [`SessionController`] per connection records arrival times and derives
//!   sliding-window frame-rate aggregates
//! - **Transport** ([`provider`], [`providers`], [`driver`], [`connection`]):
//!   a [`Provider`] yields raw messages; a background driver feeds them to the
//!   session and publishes snapshots on a watch channel
//! - **Orchestration** ([`bench`], [`scenario`]): each scenario runs in its own
//!   child process and reports one result line, which the suite checks
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use framebench::{BenchConfig, run_benchmark};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = BenchConfig::new("127.0.0.1:7001");
//!     let result = run_benchmark(&config).await?;
//!
//!     let fps = result.performance.all.average_fps;
//!     println!("{fps:.1} fps over {} frames", result.total_frames);
//!     Ok(())
//! }
//! ```

// Core types and error handling
mod error;
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Wire format and measurement
pub mod codec;
pub mod protocol;
pub mod session;
pub mod stats;

// Stream-based session architecture
pub mod connection;
pub mod driver;
pub mod provider;
pub mod providers;

// Runs and orchestration
pub mod bench;
pub mod logging;
pub mod scenario;

// Core exports
pub use error::*;
pub use types::*;

pub use bench::{BenchConfig, run_benchmark, run_with_provider};
pub use codec::{CodecRegistry, DecodeStats, FrameCodec};
pub use connection::{BenchConnection, ConnectOptions};
pub use provider::Provider;
pub use scenario::{ScenarioResult, ScenarioSpec, SuiteConfig, SuiteReport, SuiteRunner};
pub use session::{SessionController, SessionMetadata, SessionSnapshot};
