//! Time axes of regularly sampled tide series.
//!
//! A [`TimeAxis`] maps sample indices to epoch millisecond timestamps and
//! inclusive [`TimeWindow`]s to element index ranges. Windowing is resolved
//! on the axis alone, so a query touches only the chunks its window needs.

use thiserror::Error;

use std::ops::Range;

/// A regularly sampled time axis.
///
/// Sample `i` carries the timestamp `start_time_ms + i * interval_ms`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TimeAxis {
    start_time_ms: i64,
    interval_ms: i64,
    count: u64,
}

/// An invalid sampling interval error.
#[derive(Debug, Error)]
#[error("invalid sampling interval {_0} ms, must be positive")]
pub struct InvalidIntervalError(i64);

/// An inclusive time window in epoch milliseconds.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TimeWindow {
    /// The window start (inclusive).
    pub start_ms: i64,
    /// The window end (inclusive).
    pub end_ms: i64,
}

impl TimeWindow {
    /// Create a window spanning `start_ms..=end_ms`.
    #[must_use]
    pub const fn new(start_ms: i64, end_ms: i64) -> Self {
        Self { start_ms, end_ms }
    }

    /// Returns true if `timestamp_ms` lies within the window.
    #[must_use]
    pub const fn contains(&self, timestamp_ms: i64) -> bool {
        self.start_ms <= timestamp_ms && timestamp_ms <= self.end_ms
    }
}

/// A timestamped sample of a tide series.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimeSeriesPoint {
    /// The sample timestamp in epoch milliseconds.
    pub timestamp_ms: i64,
    /// The sample value.
    pub value: f64,
}

impl TimeAxis {
    /// Create a time axis of `count` samples from `start_time_ms` spaced
    /// `interval_ms` apart.
    ///
    /// # Errors
    ///
    /// Returns an [`InvalidIntervalError`] if `interval_ms` is not positive.
    pub fn new(
        start_time_ms: i64,
        interval_ms: i64,
        count: u64,
    ) -> Result<Self, InvalidIntervalError> {
        if interval_ms <= 0 {
            return Err(InvalidIntervalError(interval_ms));
        }
        Ok(Self {
            start_time_ms,
            interval_ms,
            count,
        })
    }

    /// Returns the timestamp of the first sample in epoch milliseconds.
    #[must_use]
    pub const fn start_time_ms(&self) -> i64 {
        self.start_time_ms
    }

    /// Returns the sampling interval in milliseconds.
    #[must_use]
    pub const fn interval_ms(&self) -> i64 {
        self.interval_ms
    }

    /// Returns the number of samples on the axis.
    #[must_use]
    pub const fn count(&self) -> u64 {
        self.count
    }

    /// Returns the timestamp of the sample at `index` in epoch milliseconds.
    #[must_use]
    pub fn timestamp_at(&self, index: u64) -> i64 {
        let index = i64::try_from(index).unwrap_or(i64::MAX);
        self.start_time_ms
            .saturating_add(index.saturating_mul(self.interval_ms))
    }

    /// Returns the element index range to load for `window`, clamped to the
    /// axis.
    ///
    /// The range starts at the sample at or immediately before the window
    /// start, so it may include up to one sample ahead of the window; callers
    /// filter loaded samples against the window. A window lying entirely
    /// outside the axis resolves to an empty range.
    #[must_use]
    pub fn index_range(&self, window: &TimeWindow) -> Range<u64> {
        if self.count == 0 || window.end_ms < window.start_ms {
            return 0..0;
        }
        let offset_start = window.start_ms.saturating_sub(self.start_time_ms);
        let offset_end = window.end_ms.saturating_sub(self.start_time_ms);
        let start = num::integer::div_floor(offset_start, self.interval_ms).max(0);
        let end = num::integer::div_floor(offset_end, self.interval_ms).saturating_add(1);
        if end <= start {
            return 0..0;
        }
        let start = u64::try_from(start).unwrap_or(0).min(self.count);
        let end = u64::try_from(end).unwrap_or(0).min(self.count);
        if start >= end {
            0..0
        } else {
            start..end
        }
    }
}
