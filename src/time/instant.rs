//! Geological time instants and validity periods.

use serde::{Deserialize, Serialize};

/// Tolerance (Ma) within which two real times are considered coincident.
pub const TIME_EPSILON: f64 = 1e-9;

/// A geological time in millions of years ago (Ma).
///
/// Larger values lie further in the past. The distant past is positive
/// infinity and the distant future is negative infinity; both compare
/// correctly against real times.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTimeInstant(f64);

impl GeoTimeInstant {
    pub const DISTANT_PAST: Self = Self(f64::INFINITY);
    pub const DISTANT_FUTURE: Self = Self(f64::NEG_INFINITY);
    pub const PRESENT_DAY: Self = Self(0.0);

    pub fn new(ma: f64) -> Self {
        Self(ma)
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    pub fn is_real(&self) -> bool {
        self.0.is_finite()
    }

    pub fn is_distant_past(&self) -> bool {
        self.0 == f64::INFINITY
    }

    pub fn is_distant_future(&self) -> bool {
        self.0 == f64::NEG_INFINITY
    }

    /// Coincident within [`TIME_EPSILON`]; sentinels only match themselves.
    pub fn is_coincident_with(&self, other: GeoTimeInstant) -> bool {
        if self.is_real() && other.is_real() {
            (self.0 - other.0).abs() <= TIME_EPSILON
        } else {
            self.0 == other.0
        }
    }

    /// Strictly older than `other`.
    pub fn is_strictly_earlier_than(&self, other: GeoTimeInstant) -> bool {
        !self.is_coincident_with(other) && self.0 > other.0
    }

    /// Strictly younger than `other`.
    pub fn is_strictly_later_than(&self, other: GeoTimeInstant) -> bool {
        !self.is_coincident_with(other) && self.0 < other.0
    }

    pub fn is_earlier_than_or_coincident_with(&self, other: GeoTimeInstant) -> bool {
        !self.is_strictly_later_than(other)
    }

    pub fn is_later_than_or_coincident_with(&self, other: GeoTimeInstant) -> bool {
        !self.is_strictly_earlier_than(other)
    }
}

impl From<f64> for GeoTimeInstant {
    fn from(ma: f64) -> Self {
        Self(ma)
    }
}

/// A closed interval of geological time, `begin` being the older bound.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimePeriod {
    begin: GeoTimeInstant,
    end: GeoTimeInstant,
}

impl TimePeriod {
    /// Creates a period; the bounds are swapped if given youngest first.
    pub fn new(begin: GeoTimeInstant, end: GeoTimeInstant) -> Self {
        if begin.is_strictly_later_than(end) {
            Self { begin: end, end: begin }
        } else {
            Self { begin, end }
        }
    }

    /// All of time.
    pub fn eternity() -> Self {
        Self {
            begin: GeoTimeInstant::DISTANT_PAST,
            end: GeoTimeInstant::DISTANT_FUTURE,
        }
    }

    pub fn begin(&self) -> GeoTimeInstant {
        self.begin
    }

    pub fn end(&self) -> GeoTimeInstant {
        self.end
    }

    /// True if `time` lies in `[begin, end]`, bounds included.
    pub fn contains(&self, time: GeoTimeInstant) -> bool {
        time.is_later_than_or_coincident_with(self.begin)
            && time.is_earlier_than_or_coincident_with(self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_ordering() {
        let t = GeoTimeInstant::new(100.0);
        assert!(GeoTimeInstant::DISTANT_PAST.is_strictly_earlier_than(t));
        assert!(GeoTimeInstant::DISTANT_FUTURE.is_strictly_later_than(t));
        assert!(GeoTimeInstant::DISTANT_PAST.is_coincident_with(GeoTimeInstant::DISTANT_PAST));
        assert!(!GeoTimeInstant::DISTANT_PAST.is_coincident_with(GeoTimeInstant::DISTANT_FUTURE));
    }

    #[test]
    fn test_coincidence_tolerance() {
        let a = GeoTimeInstant::new(10.0);
        let b = GeoTimeInstant::new(10.0 + 1e-12);
        assert!(a.is_coincident_with(b));
        assert!(!a.is_strictly_earlier_than(b));
        assert!(!a.is_strictly_later_than(b));
    }

    #[test]
    fn test_period_contains_bounds() {
        let period = TimePeriod::new(GeoTimeInstant::new(100.0), GeoTimeInstant::new(0.0));
        assert!(period.contains(GeoTimeInstant::new(0.0)));
        assert!(period.contains(GeoTimeInstant::new(100.0)));
        assert!(period.contains(GeoTimeInstant::new(50.0)));
        assert!(!period.contains(GeoTimeInstant::new(100.5)));
        assert!(!period.contains(GeoTimeInstant::new(-1.0)));
    }

    #[test]
    fn test_period_with_sentinels() {
        let period = TimePeriod::new(GeoTimeInstant::DISTANT_PAST, GeoTimeInstant::new(10.0));
        assert!(period.contains(GeoTimeInstant::new(1e9)));
        assert!(!period.contains(GeoTimeInstant::new(5.0)));
        assert!(TimePeriod::eternity().contains(GeoTimeInstant::new(-50.0)));
    }

    #[test]
    fn test_period_swaps_reversed_bounds() {
        let period = TimePeriod::new(GeoTimeInstant::new(0.0), GeoTimeInstant::new(20.0));
        assert_eq!(period.begin().value(), 20.0);
    }
}
