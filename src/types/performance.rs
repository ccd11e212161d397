//! Frame-rate aggregates derived from a window of samples

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Frame-rate and frame-time figures for one window of samples.
///
/// Averages may be non-finite when the window holds fewer than two samples;
/// they serialize as `null` and come back as NaN.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceAggregate {
    #[serde(rename = "avgFps", with = "non_finite_as_null")]
    pub average_fps: f64,

    #[serde(rename = "avgFrameTime", with = "non_finite_as_null")]
    pub average_frame_time_ms: f64,

    /// Shortest inter-arrival gap, absent when the window has no gaps
    #[serde(rename = "lowestFrameTime")]
    pub min_frame_time_ms: Option<f64>,

    #[serde(rename = "highestFrameTime")]
    pub max_frame_time_ms: Option<f64>,
}

impl PerformanceAggregate {
    /// Aggregate of an empty sample sequence.
    pub fn empty() -> Self {
        Self {
            average_fps: f64::NAN,
            average_frame_time_ms: f64::NAN,
            min_frame_time_ms: None,
            max_frame_time_ms: None,
        }
    }

    /// Whether min/max are known.
    pub fn has_extrema(&self) -> bool {
        self.min_frame_time_ms.is_some() && self.max_frame_time_ms.is_some()
    }
}

/// The three windows that are always reported together.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    #[serde(rename = "100")]
    pub last_100: PerformanceAggregate,
    #[serde(rename = "1000")]
    pub last_1000: PerformanceAggregate,
    pub all: PerformanceAggregate,
}

impl PerformanceReport {
    pub fn empty() -> Self {
        Self {
            last_100: PerformanceAggregate::empty(),
            last_1000: PerformanceAggregate::empty(),
            all: PerformanceAggregate::empty(),
        }
    }

    /// Look up a window by its reported name (`"100"`, `"1000"`, `"all"`).
    pub fn window(&self, name: &str) -> Option<&PerformanceAggregate> {
        match name {
            "100" => Some(&self.last_100),
            "1000" => Some(&self.last_1000),
            "all" => Some(&self.all),
            _ => None,
        }
    }
}

mod non_finite_as_null {
    use super::*;

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_some(value)
        } else {
            serializer.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_finite_values_survive_json() {
        let aggregate = PerformanceAggregate {
            average_fps: f64::INFINITY,
            average_frame_time_ms: 0.0,
            min_frame_time_ms: None,
            max_frame_time_ms: None,
        };

        let json = serde_json::to_string(&aggregate).unwrap();
        assert!(json.contains("\"avgFps\":null"));

        let back: PerformanceAggregate = serde_json::from_str(&json).unwrap();
        assert!(back.average_fps.is_nan());
        assert_eq!(back.average_frame_time_ms, 0.0);
        assert_eq!(back.min_frame_time_ms, None);
    }

    #[test]
    fn report_uses_window_names() {
        let report = PerformanceReport::empty();
        let json = serde_json::to_value(report).unwrap();
        assert!(json.get("100").is_some());
        assert!(json.get("1000").is_some());
        assert!(json.get("all").is_some());
        assert!(report.window("all").is_some());
        assert!(report.window("10").is_none());
    }
}
