//! # Metrics Sink
//!
//! A minimal seam between the object manager and whatever profiler the
//! embedding server runs. The manager reports one sample per tick (the live
//! object count); the sink decides what to do with it.

use std::cell::RefCell;
use std::collections::HashMap;

/// Receiver for averaged per-tick samples.
pub trait MetricsSink {
    /// Records one sample of the named series.
    fn avg(&self, name: &str, value: f64);
}

/// A sink that discards every sample. The default when no profiler is wired.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullMetrics;

impl MetricsSink for NullMetrics {
    fn avg(&self, _name: &str, _value: f64) {}
}

/// A sink that keeps running averages per series name.
///
/// Useful in tests and in servers without a full profiler; queries against
/// it are cheap enough to log once per status interval.
#[derive(Debug, Default)]
pub struct AverageTracker {
    series: RefCell<HashMap<String, (f64, u64)>>,
}

impl AverageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// The running average of a series, if any samples were recorded.
    pub fn average(&self, name: &str) -> Option<f64> {
        let series = self.series.borrow();
        series.get(name).map(|&(sum, count)| sum / count as f64)
    }

    /// Number of samples recorded for a series.
    pub fn samples(&self, name: &str) -> u64 {
        let series = self.series.borrow();
        series.get(name).map_or(0, |&(_, count)| count)
    }
}

impl MetricsSink for AverageTracker {
    fn avg(&self, name: &str, value: f64) {
        let mut series = self.series.borrow_mut();
        let entry = series.entry(name.to_string()).or_insert((0.0, 0));
        entry.0 += value;
        entry.1 += 1;
    }
}
