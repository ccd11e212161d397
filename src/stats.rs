//! Sample storage and the windowed frame-rate statistics engine
//!
//! A window counts samples (frames). For a window of `w` samples ending at the
//! newest sample, the per-step gaps between consecutive arrivals give the
//! minimum and maximum frame times, and the averages divide by `w - 1`, the
//! number of gaps a full window holds. With that divisor a full window's
//! average frame time is the mean gap, so it always lies between the minimum
//! and the maximum: arrivals at 0, 10, 20, 30 and 40 ms with a window of 4
//! average 10 ms, or 100 fps. The divisor comes from the requested window, so
//! a window larger than the data reports a proportionally smaller average.

use crate::types::{PerformanceAggregate, PerformanceReport, Sample};

/// Window sizes reported in every [`PerformanceReport`].
pub const SHORT_WINDOW: usize = 100;
pub const LONG_WINDOW: usize = 1000;

/// Append-only, arrival-ordered samples of one session.
#[derive(Debug, Clone, Default)]
pub struct SampleStore {
    samples: Vec<Sample>,
}

impl SampleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { samples: Vec::with_capacity(capacity) }
    }

    /// Append a sample.
    ///
    /// Arrival times never go backwards; an earlier timestamp is clamped to the
    /// newest one so the sequence stays ordered.
    pub fn push(&mut self, mut sample: Sample) {
        if let Some(last) = self.samples.last() {
            sample.arrival_ms = sample.arrival_ms.max(last.arrival_ms);
        }
        self.samples.push(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn last(&self) -> Option<&Sample> {
        self.samples.last()
    }

    pub fn as_slice(&self) -> &[Sample] {
        &self.samples
    }

    /// Aggregates for the 100, 1000 and all-time windows.
    pub fn report(&self) -> PerformanceReport {
        performance_report(&self.samples)
    }
}

/// Aggregate the trailing `window` samples; `None` or `Some(0)` means all of them.
///
/// Never panics. With fewer than two samples in range the extrema are `None`
/// and the averages are non-finite.
pub fn windowed_aggregate(samples: &[Sample], window: Option<usize>) -> PerformanceAggregate {
    let n = samples.len();
    if n == 0 {
        return PerformanceAggregate::empty();
    }

    let window = match window {
        Some(w) if w > 0 => w,
        _ => n,
    };
    let start = n.saturating_sub(window);
    let end = n - 1;

    let mut min: Option<f64> = None;
    let mut max: Option<f64> = None;
    let mut total = 0.0;
    for pair in samples[start..=end].windows(2) {
        let delta = pair[1].arrival_ms as f64 - pair[0].arrival_ms as f64;
        min = Some(min.map_or(delta, |m| m.min(delta)));
        max = Some(max.map_or(delta, |m| m.max(delta)));
        total += delta;
    }

    let divisor = (window - 1) as f64;
    let elapsed = samples[end].arrival_ms as f64 - samples[start].arrival_ms as f64;

    PerformanceAggregate {
        average_fps: 1000.0 / (elapsed / divisor),
        average_frame_time_ms: total / divisor,
        min_frame_time_ms: min,
        max_frame_time_ms: max,
    }
}

/// The three-way aggregate: last 100, last 1000 and all samples.
pub fn performance_report(samples: &[Sample]) -> PerformanceReport {
    PerformanceReport {
        last_100: windowed_aggregate(samples, Some(SHORT_WINDOW)),
        last_1000: windowed_aggregate(samples, Some(LONG_WINDOW)),
        all: windowed_aggregate(samples, None),
    }
}
