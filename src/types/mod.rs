//! Core types for the dynamic graph kernel.

pub mod time;
pub mod interval;
pub mod edge;
pub mod query;

pub use time::{TimePoint, FloatTime};
pub use interval::{Interval, IntervalError, TimeBounds};
pub use edge::{Attributes, Edge, NodeId, NodePair};
pub use query::{EdgeQuery, NodeConstraint, QueryError, QueryShape, SliceOrder};
