//! Geological time: instants, validity periods and discretized ranges.

mod instant;
mod range;

pub use instant::{GeoTimeInstant, TimePeriod, TIME_EPSILON};
pub use range::{TimeRange, TimeRangeError, TIME_SLOT_EPSILON};
