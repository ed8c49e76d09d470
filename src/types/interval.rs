//! Half-open time intervals and query bounds.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::query::QueryError;
use super::time::TimePoint;

/// Error raised when an interval cannot be constructed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntervalError {
    /// `begin >= end`. Zero-length and inverted intervals are never stored.
    #[error("Invalid interval [{begin}, {end}): begin must be strictly less than end")]
    InvalidInterval {
        /// Debug rendering of the rejected begin.
        begin: String,
        /// Debug rendering of the rejected end.
        end: String,
    },
    /// A bound has no place in the total order (NaN float time).
    #[error("Time point is not comparable: {0}")]
    Incomparable(String),
}

/// A half-open interval `[begin, end)` with `begin < end`.
///
/// Orders by `begin`, then `end`. This is the key order of the interval
/// index and the canonical order of query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawInterval<T>", into = "RawInterval<T>")]
#[serde(bound(
    serialize = "T: TimePoint + Serialize",
    deserialize = "T: TimePoint + Deserialize<'de>"
))]
pub struct Interval<T> {
    begin: T,
    end: T,
}

/// Wire shape of an interval, validated on the way in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct RawInterval<T> {
    begin: T,
    end: T,
}

impl<T: TimePoint> TryFrom<RawInterval<T>> for Interval<T> {
    type Error = IntervalError;

    fn try_from(raw: RawInterval<T>) -> Result<Self, Self::Error> {
        Interval::new(raw.begin, raw.end)
    }
}

impl<T: TimePoint> From<Interval<T>> for RawInterval<T> {
    fn from(interval: Interval<T>) -> Self {
        RawInterval {
            begin: interval.begin,
            end: interval.end,
        }
    }
}

impl<T: TimePoint> Interval<T> {
    /// Create a new interval, rejecting `begin >= end`.
    pub fn new(begin: T, end: T) -> Result<Self, IntervalError> {
        if !begin.is_comparable() {
            return Err(IntervalError::Incomparable(format!("{begin:?}")));
        }
        if !end.is_comparable() {
            return Err(IntervalError::Incomparable(format!("{end:?}")));
        }
        if begin >= end {
            return Err(IntervalError::InvalidInterval {
                begin: format!("{begin:?}"),
                end: format!("{end:?}"),
            });
        }
        Ok(Self { begin, end })
    }

    /// Inclusive lower bound.
    pub fn begin(&self) -> T {
        self.begin
    }

    /// Exclusive upper bound.
    pub fn end(&self) -> T {
        self.end
    }

    /// Half-open overlap: `[b1, e1)` and `[b2, e2)` overlap iff `b1 < e2 && b2 < e1`.
    pub fn overlaps(&self, other: &Interval<T>) -> bool {
        self.begin < other.end && other.begin < self.end
    }

    /// Whether `t` lies inside `[begin, end)`.
    pub fn contains(&self, t: T) -> bool {
        self.begin <= t && t < self.end
    }

    /// Length of the interval on the `f64` axis.
    pub fn span(&self) -> f64 {
        self.end.as_f64() - self.begin.as_f64()
    }
}

impl<T: TimePoint> fmt::Display for Interval<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}, {:?})", self.begin, self.end)
    }
}

/// Optional query bounds. A missing `begin` is −∞, a missing `end` is +∞.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeBounds<T> {
    /// Lower bound, or unbounded.
    pub begin: Option<T>,
    /// Upper bound, or unbounded.
    pub end: Option<T>,
}

impl<T> Default for TimeBounds<T> {
    fn default() -> Self {
        Self {
            begin: None,
            end: None,
        }
    }
}

impl<T: TimePoint> TimeBounds<T> {
    /// Bounds from two optional endpoints.
    pub fn new(begin: Option<T>, end: Option<T>) -> Self {
        Self { begin, end }
    }

    /// `(−∞, +∞)`.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// `[begin, end)`.
    pub fn during(begin: T, end: T) -> Self {
        Self::new(Some(begin), Some(end))
    }

    /// True when neither endpoint is set.
    pub fn is_unbounded(&self) -> bool {
        self.begin.is_none() && self.end.is_none()
    }

    /// Reject `begin > end`.
    ///
    /// `begin == end` is accepted: it selects the intervals that strictly
    /// contain that instant on both sides, as the overlap formula dictates.
    pub fn validate(&self) -> Result<(), QueryError> {
        match (self.begin, self.end) {
            (Some(begin), Some(end)) if begin > end => Err(QueryError::InvertedBounds {
                begin: format!("{begin:?}"),
                end: format!("{end:?}"),
            }),
            _ => Ok(()),
        }
    }

    /// Whether `interval` overlaps these bounds.
    pub fn admits(&self, interval: &Interval<T>) -> bool {
        self.begin.map_or(true, |begin| begin < interval.end)
            && self.end.map_or(true, |end| interval.begin < end)
    }

    /// The bounds as a concrete interval, when both endpoints form a valid one.
    pub fn as_interval(&self) -> Option<Interval<T>> {
        match (self.begin, self.end) {
            (Some(begin), Some(end)) => Interval::new(begin, end).ok(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FloatTime;

    fn iv(begin: i64, end: i64) -> Interval<i64> {
        Interval::new(begin, end).unwrap()
    }

    #[test]
    fn test_rejects_zero_length_and_inverted() {
        assert!(matches!(
            Interval::new(3, 3),
            Err(IntervalError::InvalidInterval { .. })
        ));
        assert!(Interval::new(5, 2).is_err());
        assert!(Interval::new(FloatTime(f64::NAN), FloatTime(1.0)).is_err());
    }

    #[test]
    fn test_half_open_boundary() {
        let edge = iv(1, 4);
        assert!(!TimeBounds::new(Some(4), None).admits(&edge));
        assert!(TimeBounds::during(3, 4).admits(&edge));
        assert!(!TimeBounds::new(None, Some(1)).admits(&edge));
        assert!(TimeBounds::new(None, Some(2)).admits(&edge));
    }

    #[test]
    fn test_overlap_is_symmetric() {
        let pairs = [(iv(1, 4), iv(3, 6)), (iv(1, 4), iv(4, 6)), (iv(0, 10), iv(2, 3))];
        for (a, b) in pairs {
            assert_eq!(a.overlaps(&b), b.overlaps(&a));
        }
        assert!(!iv(1, 4).overlaps(&iv(4, 6)));
    }

    #[test]
    fn test_bounds_validation() {
        assert!(TimeBounds::during(5, 2).validate().is_err());
        assert!(TimeBounds::during(5, 5).validate().is_ok());
        assert!(TimeBounds::<i64>::unbounded().validate().is_ok());
    }

    #[test]
    fn test_ordering_by_begin_then_end() {
        let mut intervals = vec![iv(2, 6), iv(1, 4), iv(2, 3)];
        intervals.sort();
        assert_eq!(intervals, vec![iv(1, 4), iv(2, 3), iv(2, 6)]);
    }

    #[test]
    fn test_serde_validates_on_deserialize() {
        let ok: Interval<i64> = serde_json::from_str(r#"{"begin":1,"end":4}"#).unwrap();
        assert_eq!(ok, iv(1, 4));
        let bad: Result<Interval<i64>, _> = serde_json::from_str(r#"{"begin":4,"end":4}"#);
        assert!(bad.is_err());
    }
}
