//! Progress reporting.
//!
//! Callers pass a plain `FnMut(i32)` sink. [`ProgressReporter`] wraps it and
//! guarantees that reported percentages never decrease and stay within
//! `[0, 100]`, whatever estimates the scheduler produces along the way.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Upper end of the progress scale.
pub const PROGRESS_RANGE: i32 = 100;

/// Percentage bounds for one stage of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ProgressRange {
    /// Percentage at the start of the stage.
    pub min: i32,
    /// Percentage at the end of the stage.
    pub max: i32,
}

impl ProgressRange {
    /// Creates a range; bounds are clamped to the progress scale and ordered.
    pub fn new(min: i32, max: i32) -> Self {
        let min = min.clamp(0, PROGRESS_RANGE);
        let max = max.clamp(min, PROGRESS_RANGE);
        Self { min, max }
    }

    /// The whole scale.
    pub fn full() -> Self {
        Self::new(0, PROGRESS_RANGE)
    }

    /// Percentage after `done` of `total` steps within this range.
    pub fn at(&self, done: usize, total: usize) -> i32 {
        if total == 0 {
            return self.max;
        }
        let span = (self.max - self.min) as i64;
        let done = done.min(total) as i64;
        self.min + (span * done / total as i64) as i32
    }

    /// Sub-range covering steps `from..to` out of `total`.
    pub fn slice(&self, from: usize, to: usize, total: usize) -> Self {
        Self::new(self.at(from, total), self.at(to, total))
    }
}

impl Default for ProgressRange {
    fn default() -> Self {
        Self::full()
    }
}

/// Monotone front-end for a caller-supplied progress sink.
pub struct ProgressReporter<'a> {
    sink: &'a mut dyn FnMut(i32),
    last: i32,
}

impl<'a> ProgressReporter<'a> {
    /// Wraps a sink. Nothing is reported until the first call.
    pub fn new(sink: &'a mut dyn FnMut(i32)) -> Self {
        Self { sink, last: -1 }
    }

    /// Reports `percent`, clamped so the sequence never decreases.
    pub fn report(&mut self, percent: i32) {
        let percent = percent.clamp(0, PROGRESS_RANGE).max(self.last);
        if percent != self.last {
            self.last = percent;
            (self.sink)(percent);
        }
    }

    /// Reports the end of the scale.
    pub fn finish(&mut self) {
        self.report(PROGRESS_RANGE);
    }

    /// Last reported percentage, or `None` before the first report.
    pub fn last(&self) -> Option<i32> {
        (self.last >= 0).then_some(self.last)
    }
}

impl std::fmt::Debug for ProgressReporter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("last", &self.last)
            .finish()
    }
}
