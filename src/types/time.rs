//! Time domains for interval-tagged edges.
//!
//! A graph instance picks one time type and uses it consistently. Integer
//! types work out of the box; floating-point time goes through [`FloatTime`],
//! which supplies the total order the interval index needs.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// A point on a totally ordered time axis.
///
/// The index and the planner only compare time points. The `f64`
/// conversions are used by the strategy selector to express interval widths
/// as fractions of the graph's overall span, and by the trainer to draw
/// synthetic query windows.
pub trait TimePoint: Copy + Ord + fmt::Debug + Send + Sync + 'static {
    /// Lossy conversion used for span ratios.
    fn as_f64(self) -> f64;

    /// Inverse of [`TimePoint::as_f64`], rounding to the nearest representable point.
    fn from_f64(value: f64) -> Self;

    /// Whether the value may be stored in an interval.
    fn is_comparable(self) -> bool {
        true
    }
}

macro_rules! impl_integer_time {
    ($($ty:ty),* $(,)?) => {
        $(
            impl TimePoint for $ty {
                fn as_f64(self) -> f64 {
                    self as f64
                }

                fn from_f64(value: f64) -> Self {
                    value.round() as $ty
                }
            }
        )*
    };
}

impl_integer_time!(i16, i32, i64, u16, u32, u64, usize);

/// Floating-point time with a total order.
///
/// Ordering, equality and hashing all follow [`f64::total_cmp`] with the two
/// zeros identified, so the type can key the interval index. NaN is rejected when an interval is
/// created (see [`TimePoint::is_comparable`]); boundary epsilon handling is
/// the caller's concern.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FloatTime(pub f64);

impl FloatTime {
    /// Wrap a raw `f64`.
    pub fn new(value: f64) -> Self {
        Self(value)
    }

    /// The raw value.
    pub fn get(self) -> f64 {
        self.0
    }

    /// `-0.0` and `0.0` are the same instant.
    fn key(self) -> f64 {
        if self.0 == 0.0 {
            0.0
        } else {
            self.0
        }
    }
}

impl PartialEq for FloatTime {
    fn eq(&self, other: &Self) -> bool {
        self.key().total_cmp(&other.key()) == Ordering::Equal
    }
}

impl Eq for FloatTime {}

impl PartialOrd for FloatTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FloatTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().total_cmp(&other.key())
    }
}

impl Hash for FloatTime {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().to_bits().hash(state);
    }
}

impl From<f64> for FloatTime {
    fn from(value: f64) -> Self {
        Self(value)
    }
}

impl fmt::Display for FloatTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TimePoint for FloatTime {
    fn as_f64(self) -> f64 {
        self.0
    }

    fn from_f64(value: f64) -> Self {
        Self(value)
    }

    fn is_comparable(self) -> bool {
        !self.0.is_nan()
    }
}
