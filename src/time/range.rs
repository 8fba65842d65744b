//! Discretized time ranges.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tolerance (Ma) for snapping a query time onto a time slot.
pub const TIME_SLOT_EPSILON: f64 = 1e-6;

/// Errors raised when creating a [`TimeRange`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TimeRangeError {
    #[error("Time increment must be positive, got {0}")]
    NonPositiveIncrement(f64),
    #[error("Time range bounds must be finite: begin ({0}), end ({1})")]
    NonFiniteBounds(f64, f64),
    #[error("Begin time ({0}) must be older than end time ({1}) by at least one increment")]
    TooShort(f64, f64),
}

/// A time range split into equally spaced time slots.
///
/// Slot 0 is the begin (oldest) time; the last slot is the end (youngest)
/// time. The begin time is adjusted so that the range is an integer number
/// of increments.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    begin_time: f64,
    end_time: f64,
    time_increment: f64,
    num_time_slots: usize,
}

impl TimeRange {
    pub fn new(begin_time: f64, end_time: f64, time_increment: f64) -> Result<Self, TimeRangeError> {
        if !(time_increment > 0.0) || !time_increment.is_finite() {
            return Err(TimeRangeError::NonPositiveIncrement(time_increment));
        }
        if !begin_time.is_finite() || !end_time.is_finite() {
            return Err(TimeRangeError::NonFiniteBounds(begin_time, end_time));
        }

        let num_intervals = ((begin_time - end_time) / time_increment + TIME_SLOT_EPSILON).floor();
        if num_intervals < 1.0 {
            return Err(TimeRangeError::TooShort(begin_time, end_time));
        }
        let num_intervals = num_intervals as usize;

        Ok(Self {
            begin_time: end_time + num_intervals as f64 * time_increment,
            end_time,
            time_increment,
            num_time_slots: num_intervals + 1,
        })
    }

    pub fn begin_time(&self) -> f64 {
        self.begin_time
    }

    pub fn end_time(&self) -> f64 {
        self.end_time
    }

    pub fn time_increment(&self) -> f64 {
        self.time_increment
    }

    pub fn num_time_slots(&self) -> usize {
        self.num_time_slots
    }

    /// Time (Ma) of a slot.
    pub fn get_time(&self, time_slot: usize) -> f64 {
        self.begin_time - time_slot as f64 * self.time_increment
    }

    /// True if `time` lies within the range (with tolerance).
    pub fn contains(&self, time: f64) -> bool {
        time <= self.begin_time + TIME_SLOT_EPSILON && time >= self.end_time - TIME_SLOT_EPSILON
    }

    /// The slot whose time coincides with `time`, if any.
    pub fn get_time_slot(&self, time: f64) -> Option<usize> {
        let slot = self.get_nearest_time_slot(time)?;
        ((self.get_time(slot) - time).abs() <= TIME_SLOT_EPSILON).then_some(slot)
    }

    /// The slot nearest `time`, or `None` outside the range.
    pub fn get_nearest_time_slot(&self, time: f64) -> Option<usize> {
        self.contains(time).then(|| self.get_nearest_time_slot_clamped(time))
    }

    /// The slot nearest `time`, clamping times outside the range to the
    /// nearest end.
    pub fn get_nearest_time_slot_clamped(&self, time: f64) -> usize {
        let f = ((self.begin_time - time) / self.time_increment).round();
        if f <= 0.0 {
            0
        } else {
            (f as usize).min(self.num_time_slots - 1)
        }
    }

    /// The two slots bracketing `time` and the fraction of the way from the
    /// older slot to the younger one.
    ///
    /// Returns `None` outside the range.
    pub fn get_bounding_time_slots(&self, time: f64) -> Option<(usize, usize, f64)> {
        if !self.contains(time) {
            return None;
        }
        let f = ((self.begin_time - time) / self.time_increment).max(0.0);
        let older = (f.floor() as usize).min(self.num_time_slots - 2);
        let fraction = (f - older as f64).clamp(0.0, 1.0);
        Some((older, older + 1, fraction))
    }
}
