//! Error types for the benchmark harness.
//!
//! Every fallible operation in the crate returns [`BenchError`]. Errors carry
//! structured context (scenario name, metric, bound, observed value, byte offset)
//! so that a failing scenario can be diagnosed from its report alone.
//!
//! ## Error Categories
//!
//! - **Protocol**: malformed or unrecognized wire data. Handled inside the session.
//! - **Configuration**: unknown codec version, invalid suite file. Fatal to a session.
//! - **Timeout**: a run did not produce its result in time. Fatal to a scenario.
//! - **Assertion**: a metric fell outside its declared bounds. Fatal to a scenario.
//! - **Transport**: socket-level failures. End the session, never reconnect.
//! - **Harness**: child process plumbing and result parsing.
//!
//! ```rust
//! use framebench::{BenchError, ErrorCategory};
//! use std::time::Duration;
//!
//! let timeout = BenchError::timeout("baseline", Duration::from_secs(30));
//! assert_eq!(timeout.category(), ErrorCategory::Timeout);
//! for suggestion in timeout.recovery_suggestions() {
//!     println!("  - {}", suggestion);
//! }
//! ```

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for harness operations.
pub type Result<T, E = BenchError> = std::result::Result<T, E>;

/// Which side of a threshold range an assertion checked.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bound {
    /// Observed value must be strictly greater.
    Min(f64),
    /// Observed value must be strictly less.
    Max(f64),
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bound::Min(min) => write!(f, "> {min}"),
            Bound::Max(max) => write!(f, "< {max}"),
        }
    }
}

/// Coarse classification used for reporting and propagation decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Protocol,
    Configuration,
    Timeout,
    Assertion,
    Transport,
    Harness,
}

/// Main error type for harness operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum BenchError {
    #[error("Protocol error in {context}: {details}")]
    Protocol { context: String, details: String },

    #[error("Unknown envelope tag {tag}")]
    UnknownEnvelope { tag: u8 },

    #[error("Unknown asset class {tag} at offset {offset}")]
    UnknownAssetClass { tag: u8, offset: usize },

    #[error("Truncated {context}: needed {needed} bytes, {available} available")]
    Truncated { context: String, needed: usize, available: usize },

    #[error("No codec registered for version '{version}'")]
    CodecNotFound { version: String },

    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    #[error("Failed to connect to {target}: {reason}")]
    Connection {
        target: String,
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Transport failure: {reason}")]
    Transport {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Session is closed")]
    SessionClosed,

    #[error("Scenario '{scenario}' timed out after {duration:?}")]
    Timeout { scenario: String, duration: Duration },

    #[error("Scenario '{scenario}': {metric} = {observed} violates bound {bound}")]
    Assertion { scenario: String, metric: String, observed: f64, bound: Bound },

    #[error("Scenario '{scenario}': metric {metric} is unavailable")]
    MetricUnavailable { scenario: String, metric: String },

    #[error("Scenario '{scenario}': expected {expected} frames, got {actual}")]
    FrameCountMismatch { scenario: String, expected: usize, actual: usize },

    #[error("Failed to spawn benchmark for scenario '{scenario}'")]
    Spawn {
        scenario: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Scenario '{scenario}' exited without a result (status: {status:?})")]
    NoResult { scenario: String, status: Option<i32> },

    #[error("Malformed result line: {details}")]
    ResultParse { details: String },

    #[error("File error: {path}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BenchError {
    /// Returns the error's category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            BenchError::Protocol { .. }
            | BenchError::UnknownEnvelope { .. }
            | BenchError::UnknownAssetClass { .. }
            | BenchError::Truncated { .. } => ErrorCategory::Protocol,
            BenchError::CodecNotFound { .. } | BenchError::Config { .. } => {
                ErrorCategory::Configuration
            }
            BenchError::Timeout { .. } => ErrorCategory::Timeout,
            BenchError::Assertion { .. }
            | BenchError::MetricUnavailable { .. }
            | BenchError::FrameCountMismatch { .. } => ErrorCategory::Assertion,
            BenchError::Connection { .. }
            | BenchError::Transport { .. }
            | BenchError::SessionClosed => ErrorCategory::Transport,
            BenchError::Spawn { .. }
            | BenchError::NoResult { .. }
            | BenchError::ResultParse { .. }
            | BenchError::File { .. } => ErrorCategory::Harness,
        }
    }

    /// Whether the error ends the session it occurred in.
    ///
    /// Protocol errors only poison the message that carried them.
    pub fn is_fatal_to_session(&self) -> bool {
        !matches!(self.category(), ErrorCategory::Protocol)
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self.category() {
            ErrorCategory::Protocol => vec![
                "Check that the server speaks the same wire protocol revision",
                "Capture the offending message and inspect its envelope tag",
            ],
            ErrorCategory::Configuration => vec![
                "Register a codec for the version the server declares",
                "Check the scenario's codec_version against the server build",
                "Validate the suite file",
            ],
            ErrorCategory::Timeout => vec![
                "Increase the scenario timeout",
                "Lower the expected frame count",
                "Verify the server is running and reachable",
            ],
            ErrorCategory::Assertion => vec![
                "Compare the observed value against recent baselines",
                "Check for contention on the benchmark host",
                "Revisit the threshold if the change is expected",
            ],
            ErrorCategory::Transport => vec![
                "Verify the target host and port",
                "Check the server logs for dropped connections",
            ],
            ErrorCategory::Harness => vec![
                "Run the benchmark subcommand by hand to see its output",
                "Check that the benchmark executable path is correct",
            ],
        }
    }

    /// Helper constructor for protocol errors.
    pub fn protocol(context: impl Into<String>, details: impl Into<String>) -> Self {
        BenchError::Protocol { context: context.into(), details: details.into() }
    }

    /// Helper constructor for truncated buffers.
    pub fn truncated(context: impl Into<String>, needed: usize, available: usize) -> Self {
        BenchError::Truncated { context: context.into(), needed, available }
    }

    /// Helper constructor for connection errors.
    pub fn connection_failed(target: impl Into<String>, reason: impl Into<String>) -> Self {
        BenchError::Connection { target: target.into(), reason: reason.into(), source: None }
    }

    /// Helper constructor for connection errors with source.
    pub fn connection_failed_with_source(
        target: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        BenchError::Connection {
            target: target.into(),
            reason: source.to_string(),
            source: Some(source),
        }
    }

    /// Helper constructor for transport errors with source.
    pub fn transport(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        BenchError::Transport { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for configuration errors.
    pub fn config(reason: impl Into<String>) -> Self {
        BenchError::Config { reason: reason.into() }
    }

    /// Helper constructor for scenario timeouts.
    pub fn timeout(scenario: impl Into<String>, duration: Duration) -> Self {
        BenchError::Timeout { scenario: scenario.into(), duration }
    }

    /// Helper constructor for file errors with path context.
    pub fn file_error(path: PathBuf, source: std::io::Error) -> Self {
        BenchError::File { path, source }
    }
}

impl From<serde_json::Error> for BenchError {
    fn from(err: serde_json::Error) -> Self {
        BenchError::ResultParse { details: err.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn assertion_messages_name_metric_and_bound(
            scenario in "[a-z][a-z0-9_-]{0,15}",
            metric in "[a-zA-Z.]{1,20}",
            observed in -1e6f64..1e6,
            limit in -1e6f64..1e6,
        ) {
            let err = BenchError::Assertion {
                scenario: scenario.clone(),
                metric: metric.clone(),
                observed,
                bound: Bound::Max(limit),
            };
            let msg = err.to_string();
            prop_assert!(msg.contains(&scenario));
            prop_assert!(msg.contains(&metric));
            prop_assert!(msg.contains(&limit.to_string()));
        }

        #[test]
        fn truncated_messages_carry_sizes(needed in 0usize..100_000, available in 0usize..100_000) {
            let err = BenchError::truncated("handshake", needed, available);
            let msg = err.to_string();
            prop_assert!(msg.contains(&needed.to_string()));
            prop_assert!(msg.contains(&available.to_string()));
            prop_assert!(!err.is_fatal_to_session());
        }
    }

    #[test]
    fn timeout_and_assertion_are_distinguishable() {
        let timeout = BenchError::timeout("baseline", Duration::from_millis(200));
        let assertion = BenchError::Assertion {
            scenario: "baseline".to_string(),
            metric: "avgFps".to_string(),
            observed: 200.0,
            bound: Bound::Max(110.0),
        };

        assert_eq!(timeout.category(), ErrorCategory::Timeout);
        assert_eq!(assertion.category(), ErrorCategory::Assertion);
        assert_ne!(timeout.category(), assertion.category());
    }

    #[test]
    fn categories_cover_taxonomy() {
        assert_eq!(BenchError::UnknownEnvelope { tag: 9 }.category(), ErrorCategory::Protocol);
        assert_eq!(
            BenchError::CodecNotFound { version: "0999".into() }.category(),
            ErrorCategory::Configuration
        );
        assert_eq!(BenchError::SessionClosed.category(), ErrorCategory::Transport);
        assert_eq!(
            BenchError::NoResult { scenario: "s".into(), status: Some(1) }.category(),
            ErrorCategory::Harness
        );
        assert!(BenchError::CodecNotFound { version: "x".into() }.is_fatal_to_session());
    }

    #[test]
    fn bound_display() {
        assert_eq!(Bound::Min(90.0).to_string(), "> 90");
        assert_eq!(Bound::Max(110.5).to_string(), "< 110.5");
    }

    #[test]
    fn error_traits_validation() {
        fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<BenchError>();

        let error = BenchError::connection_failed("localhost:3000", "refused");
        let _: &dyn std::error::Error = &error;
        assert!(!error.recovery_suggestions().is_empty());
    }

    #[test]
    fn source_chain_is_preserved() {
        let io = std::io::Error::other("reset by peer");
        let err = BenchError::transport("socket read", Box::new(io));
        let source = std::error::Error::source(&err).expect("source");
        assert_eq!(source.to_string(), "reset by peer");
    }
}
