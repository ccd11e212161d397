//! Scenario and suite configuration
//!
//! Suites are YAML documents:
//!
//! ```yaml
//! target_host: 127.0.0.1
//! failure_policy: continue
//! scenarios:
//!   - name: baseline
//!     tick_rate: 60
//!     codec_version: "1005"
//!     scale_factor: 1.0
//!     listen_port: 7001
//!     timeout_ms: 60000
//!     assertions:
//!       avgFps: { min: 55, max: 65 }
//!       100.maxFrameTime: { max: 50 }
//! ```

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::assertions::MetricRef;
use crate::{BenchError, Result};

/// Frames a run collects unless the suite or scenario says otherwise.
pub const DEFAULT_FRAME_BUDGET: usize = 1000;
/// Per-scenario time limit unless the suite or scenario says otherwise.
pub const DEFAULT_TIMEOUT_MS: u64 = 120_000;

/// Bounds on one metric. Both are exclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Threshold {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl Threshold {
    pub fn between(min: f64, max: f64) -> Self {
        Self { min: Some(min), max: Some(max) }
    }

    pub fn at_least(min: f64) -> Self {
        Self { min: Some(min), max: None }
    }

    pub fn at_most(max: f64) -> Self {
        Self { min: None, max: Some(max) }
    }
}

/// One benchmark configuration. Runs in its own process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSpec {
    pub name: String,
    pub tick_rate: u32,
    pub codec_version: String,
    #[serde(default = "default_scale_factor")]
    pub scale_factor: f64,
    pub listen_port: u16,
    /// Metric name to bounds, checked in name order
    #[serde(default)]
    pub assertions: BTreeMap<String, Threshold>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub expected_frame_count: Option<usize>,
    /// Frames to collect; falls back to `expected_frame_count`, then the
    /// suite's budget
    #[serde(default)]
    pub frame_budget: Option<usize>,
}

fn default_scale_factor() -> f64 {
    1.0
}

impl ScenarioSpec {
    pub fn new(
        name: impl Into<String>,
        codec_version: impl Into<String>,
        listen_port: u16,
    ) -> Self {
        Self {
            name: name.into(),
            tick_rate: 60,
            codec_version: codec_version.into(),
            scale_factor: default_scale_factor(),
            listen_port,
            assertions: BTreeMap::new(),
            timeout_ms: None,
            expected_frame_count: None,
            frame_budget: None,
        }
    }

    pub fn with_assertion(mut self, metric: impl Into<String>, threshold: Threshold) -> Self {
        self.assertions.insert(metric.into(), threshold);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    pub fn with_expected_frame_count(mut self, frames: usize) -> Self {
        self.expected_frame_count = Some(frames);
        self
    }

    pub fn with_frame_budget(mut self, frames: usize) -> Self {
        self.frame_budget = Some(frames);
        self
    }

    /// Check the scenario on its own.
    pub fn validate(&self) -> Result<()> {
        let fail = |reason: String| {
            Err(BenchError::config(format!("scenario '{}': {reason}", self.name)))
        };

        if self.name.trim().is_empty() {
            return Err(BenchError::config("scenario name must not be empty"));
        }
        if self.codec_version.is_empty() {
            return fail("codec_version must not be empty".into());
        }
        if self.tick_rate == 0 {
            return fail("tick_rate must be positive".into());
        }
        if !(self.scale_factor.is_finite() && self.scale_factor > 0.0) {
            return fail(format!("scale_factor {} must be positive", self.scale_factor));
        }
        if self.timeout_ms == Some(0) {
            return fail("timeout_ms must be positive".into());
        }
        if self.frame_budget == Some(0) {
            return fail("frame_budget must be positive".into());
        }
        if self.expected_frame_count == Some(0) {
            return fail("expected_frame_count must be positive".into());
        }

        for (metric, threshold) in &self.assertions {
            MetricRef::parse(metric)
                .map_err(|e| BenchError::config(format!("scenario '{}': {e}", self.name)))?;
            match (threshold.min, threshold.max) {
                (None, None) => return fail(format!("assertion {metric} has no bounds")),
                (Some(min), Some(max)) if min >= max => {
                    return fail(format!("assertion {metric} has min {min} >= max {max}"));
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// What the suite does after a scenario fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop at the first failure; later scenarios are skipped
    #[default]
    Abort,
    /// Run every scenario regardless
    Continue,
}

/// A whole suite file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteConfig {
    #[serde(default = "default_target_host")]
    pub target_host: String,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    #[serde(default = "default_timeout_ms")]
    pub default_timeout_ms: u64,
    #[serde(default = "default_frame_budget")]
    pub frame_budget: usize,
    pub scenarios: Vec<ScenarioSpec>,
}

fn default_target_host() -> String {
    "127.0.0.1".to_string()
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_frame_budget() -> usize {
    DEFAULT_FRAME_BUDGET
}

impl SuiteConfig {
    pub fn new(scenarios: Vec<ScenarioSpec>) -> Self {
        Self {
            target_host: default_target_host(),
            failure_policy: FailurePolicy::default(),
            default_timeout_ms: DEFAULT_TIMEOUT_MS,
            frame_budget: DEFAULT_FRAME_BUDGET,
            scenarios,
        }
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)
            .map_err(|e| BenchError::config(format!("invalid suite file: {e}")))?;
        config.validate()?;
        debug!(scenarios = config.scenarios.len(), "Loaded suite");
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| BenchError::file_error(path.to_path_buf(), e))?;
        Self::from_yaml_str(&yaml)
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_timeout_ms == 0 {
            return Err(BenchError::config("default_timeout_ms must be positive"));
        }
        if self.frame_budget == 0 {
            return Err(BenchError::config("frame_budget must be positive"));
        }

        let mut names = HashSet::new();
        for scenario in &self.scenarios {
            scenario.validate()?;
            if !names.insert(scenario.name.as_str()) {
                return Err(BenchError::config(format!(
                    "duplicate scenario name '{}'",
                    scenario.name
                )));
            }
        }
        Ok(())
    }

    /// Time limit for `scenario`.
    pub fn timeout_for(&self, scenario: &ScenarioSpec) -> Duration {
        Duration::from_millis(scenario.timeout_ms.unwrap_or(self.default_timeout_ms))
    }

    /// Frames `scenario` collects: its own budget, else the frame count it
    /// expects, else the suite's budget.
    pub fn frame_budget_for(&self, scenario: &ScenarioSpec) -> usize {
        scenario
            .frame_budget
            .or(scenario.expected_frame_count)
            .unwrap_or(self.frame_budget)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUITE: &str = r#"
target_host: 10.0.0.2
failure_policy: continue
frame_budget: 500
scenarios:
  - name: baseline
    tick_rate: 60
    codec_version: "1005"
    listen_port: 7001
    assertions:
      avgFps: { min: 55, max: 65 }
      100.maxFrameTime: { max: 50 }
  - name: scaled
    tick_rate: 30
    codec_version: "1006"
    scale_factor: 0.5
    listen_port: 7002
    timeout_ms: 5000
    expected_frame_count: 250
    frame_budget: 250
"#;

    #[test]
    fn parses_suite_yaml() {
        let suite = SuiteConfig::from_yaml_str(SUITE).unwrap();
        assert_eq!(suite.target_host, "10.0.0.2");
        assert_eq!(suite.failure_policy, FailurePolicy::Continue);
        assert_eq!(suite.scenarios.len(), 2);

        let baseline = &suite.scenarios[0];
        assert_eq!(baseline.scale_factor, 1.0);
        assert_eq!(baseline.assertions["avgFps"], Threshold::between(55.0, 65.0));
        assert_eq!(suite.timeout_for(baseline), Duration::from_millis(DEFAULT_TIMEOUT_MS));
        assert_eq!(suite.frame_budget_for(baseline), 500);

        let scaled = &suite.scenarios[1];
        assert_eq!(suite.timeout_for(scaled), Duration::from_secs(5));
        assert_eq!(suite.frame_budget_for(scaled), 250);
    }

    #[test]
    fn expected_frame_count_sets_the_budget() {
        let suite = SuiteConfig::new(Vec::new());

        let counted = ScenarioSpec::new("counted", "1005", 1).with_expected_frame_count(500);
        assert_eq!(suite.frame_budget_for(&counted), 500);

        let explicit = counted.clone().with_frame_budget(600);
        assert_eq!(suite.frame_budget_for(&explicit), 600);

        let plain = ScenarioSpec::new("plain", "1005", 1);
        assert_eq!(suite.frame_budget_for(&plain), DEFAULT_FRAME_BUDGET);
    }

    #[test]
    fn defaults_apply() {
        let suite = SuiteConfig::from_yaml_str(
            "scenarios:\n  - { name: a, tick_rate: 60, codec_version: '1000', listen_port: 1 }\n",
        )
        .unwrap();
        assert_eq!(suite.failure_policy, FailurePolicy::Abort);
        assert_eq!(suite.target_host, "127.0.0.1");
        assert_eq!(suite.frame_budget, DEFAULT_FRAME_BUDGET);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let suite = SuiteConfig::new(vec![
            ScenarioSpec::new("same", "1005", 1),
            ScenarioSpec::new("same", "1006", 2),
        ]);
        let err = suite.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        let spec = ScenarioSpec::new("inverted", "1005", 1)
            .with_assertion("avgFps", Threshold::between(110.0, 90.0));
        assert!(matches!(spec.validate(), Err(BenchError::Config { .. })));
    }

    #[test]
    fn unknown_metrics_are_rejected() {
        let spec = ScenarioSpec::new("typo", "1005", 1)
            .with_assertion("avgFpz", Threshold::at_least(1.0));
        let err = spec.validate().unwrap_err();
        assert!(err.to_string().contains("avgFpz"));
    }

    #[test]
    fn empty_threshold_is_rejected() {
        let spec =
            ScenarioSpec::new("empty", "1005", 1).with_assertion("avgFps", Threshold::default());
        assert!(spec.validate().is_err());
    }

    #[test]
    fn unknown_threshold_keys_are_rejected() {
        let yaml = r#"
scenarios:
  - name: a
    tick_rate: 60
    codec_version: '1'
    listen_port: 1
    assertions:
      avgFps: { minimum: 3 }
"#;
        assert!(SuiteConfig::from_yaml_str(yaml).is_err());
    }

    #[test]
    fn missing_file_is_file_error() {
        let err = SuiteConfig::load("/nonexistent/suite.yaml").unwrap_err();
        assert!(matches!(err, BenchError::File { .. }));
    }
}
