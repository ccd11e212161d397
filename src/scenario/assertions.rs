//! Threshold assertions over scenario results
//!
//! A metric name is an optional window prefix (`100.`, `1000.` or `all.`,
//! default `all`) followed by a metric: `avgFps`, `avgFrameTime`,
//! `minFrameTime`, `maxFrameTime`, or one of the whole-run metrics
//! `totalFrames`, `totalNodes`, `decodeTimeMs`.

use std::fmt;

use super::result::ScenarioResult;
use super::spec::ScenarioSpec;
use crate::error::Bound;
use crate::types::PerformanceAggregate;
use crate::{BenchError, Result};

/// Which aggregate window a frame-rate metric reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Window {
    Last100,
    Last1000,
    All,
}

impl Window {
    pub fn as_str(self) -> &'static str {
        match self {
            Window::Last100 => "100",
            Window::Last1000 => "1000",
            Window::All => "all",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    AverageFps,
    AverageFrameTime,
    MinFrameTime,
    MaxFrameTime,
    TotalFrames,
    TotalNodes,
    DecodeTime,
}

impl Metric {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "avgFps" | "averageFps" | "fps" => Metric::AverageFps,
            "avgFrameTime" | "averageFrameTime" | "averageFrameTimeMs" => Metric::AverageFrameTime,
            "minFrameTime" | "lowestFrameTime" | "minFrameTimeMs" => Metric::MinFrameTime,
            "maxFrameTime" | "highestFrameTime" | "maxFrameTimeMs" => Metric::MaxFrameTime,
            "totalFrames" => Metric::TotalFrames,
            "totalNodes" => Metric::TotalNodes,
            "decodeTimeMs" | "unsquishTime" => Metric::DecodeTime,
            _ => return None,
        })
    }

    /// Whether the metric is read from a performance window.
    pub fn is_windowed(self) -> bool {
        matches!(
            self,
            Metric::AverageFps
                | Metric::AverageFrameTime
                | Metric::MinFrameTime
                | Metric::MaxFrameTime
        )
    }

    fn read(self, aggregate: &PerformanceAggregate) -> Option<f64> {
        match self {
            Metric::AverageFps => Some(aggregate.average_fps),
            Metric::AverageFrameTime => Some(aggregate.average_frame_time_ms),
            Metric::MinFrameTime => aggregate.min_frame_time_ms,
            Metric::MaxFrameTime => aggregate.max_frame_time_ms,
            _ => None,
        }
    }
}

/// A parsed metric name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MetricRef {
    pub window: Window,
    pub metric: Metric,
}

impl MetricRef {
    pub fn parse(name: &str) -> Result<Self> {
        let (window, metric_name) = match name.split_once('.') {
            Some(("100", rest)) => (Some(Window::Last100), rest),
            Some(("1000", rest)) => (Some(Window::Last1000), rest),
            Some(("all", rest)) => (Some(Window::All), rest),
            Some(_) => return Err(BenchError::config(format!("unknown window in metric '{name}'"))),
            None => (None, name),
        };

        let metric = Metric::from_name(metric_name)
            .ok_or_else(|| BenchError::config(format!("unknown metric '{name}'")))?;
        if window.is_some() && !metric.is_windowed() {
            return Err(BenchError::config(format!("metric '{name}' does not take a window")));
        }

        Ok(Self { window: window.unwrap_or(Window::All), metric })
    }

    /// The observed value, or `None` when the run did not produce it.
    pub fn observe(&self, result: &ScenarioResult) -> Option<f64> {
        let value = match self.metric {
            Metric::TotalFrames => Some(result.total_frames as f64),
            Metric::TotalNodes => result.decode.map(|d| d.total_nodes as f64),
            Metric::DecodeTime => result.decode.map(|d| d.decode_time_ms),
            windowed => {
                let aggregate = result.performance.window(self.window.as_str())?;
                windowed.read(aggregate)
            }
        };
        value.filter(|v| !v.is_nan())
    }
}

impl fmt::Display for MetricRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:?}", self.window.as_str(), self.metric)
    }
}

/// Check one threshold. Bounds are exclusive.
pub fn check_bound(
    scenario: &str,
    metric: &str,
    observed: Option<f64>,
    min: Option<f64>,
    max: Option<f64>,
) -> Result<()> {
    let observed = observed.filter(|v| !v.is_nan()).ok_or_else(|| {
        BenchError::MetricUnavailable { scenario: scenario.to_string(), metric: metric.to_string() }
    })?;

    let violation = |bound| BenchError::Assertion {
        scenario: scenario.to_string(),
        metric: metric.to_string(),
        observed,
        bound,
    };

    if let Some(min) = min
        && observed <= min
    {
        return Err(violation(Bound::Min(min)));
    }
    if let Some(max) = max
        && observed >= max
    {
        return Err(violation(Bound::Max(max)));
    }
    Ok(())
}

/// Every failed check of `spec` against `result`, in metric-name order, with
/// the frame count check last.
pub fn evaluate(spec: &ScenarioSpec, result: &ScenarioResult) -> Vec<BenchError> {
    let mut failures = Vec::new();

    for (name, threshold) in &spec.assertions {
        let observed = match MetricRef::parse(name) {
            Ok(metric) => metric.observe(result),
            Err(e) => {
                failures.push(e);
                continue;
            }
        };
        if let Err(e) = check_bound(&spec.name, name, observed, threshold.min, threshold.max) {
            failures.push(e);
        }
    }

    if let Some(expected) = spec.expected_frame_count
        && result.total_frames != expected
    {
        failures.push(BenchError::FrameCountMismatch {
            scenario: spec.name.clone(),
            expected,
            actual: result.total_frames,
        });
    }

    failures
}

/// Check `spec` against `result`, failing on the first violation.
pub fn check(spec: &ScenarioSpec, result: &ScenarioResult) -> Result<()> {
    match evaluate(spec, result).into_iter().next() {
        Some(failure) => Err(failure),
        None => Ok(()),
    }
}
