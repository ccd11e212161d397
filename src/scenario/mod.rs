//! Scenario orchestration
//!
//! A suite is a list of [`ScenarioSpec`]s run strictly one after another. Each
//! scenario runs in its own child process ([`IsolatedRun`]), which connects to
//! the server, collects frames and prints one [`RESULT_MARKER`] line. The
//! orchestrator parses that line into a [`ScenarioResult`] and checks it
//! against the scenario's thresholds.
//!
//! ```rust
//! use framebench::scenario::{ScenarioSpec, SuiteConfig, Threshold};
//!
//! let suite = SuiteConfig::new(vec![
//!     ScenarioSpec::new("baseline", "1005", 7001)
//!         .with_assertion("avgFps", Threshold::between(55.0, 65.0)),
//! ]);
//! suite.validate()?;
//! # Ok::<(), framebench::BenchError>(())
//! ```

pub mod assertions;
mod result;
mod runner;
mod spec;
mod suite;

pub use assertions::{Metric, MetricRef, Window, check, evaluate};
pub use result::{RESULT_MARKER, ScenarioResult, parse_marker_line};
pub use runner::{ExecutableLauncher, IsolatedRun, LaunchContext, Launcher};
pub use spec::{
    DEFAULT_FRAME_BUDGET, DEFAULT_TIMEOUT_MS, FailurePolicy, ScenarioSpec, SuiteConfig, Threshold,
};
pub use suite::{OutcomeSummary, ScenarioOutcome, ScenarioStatus, SuiteReport, SuiteRunner};
