//! Edge queries and their classification.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::edge::{NodeId, NodePair};
use super::interval::{Interval, TimeBounds};
use super::time::TimePoint;

/// Error for structurally malformed queries.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    /// `exact_match` requires both bounds.
    #[error("Exact interval match requires both begin and end to be defined")]
    ExactMatchNeedsBounds,
    /// `begin > end`.
    #[error("Query end must be greater than or equal to begin: begin {begin}, end {end}")]
    InvertedBounds {
        /// Debug rendering of the begin bound.
        begin: String,
        /// Debug rendering of the end bound.
        end: String,
    },
}

/// Node restriction of a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[serde(bound(deserialize = "N: Deserialize<'de> + Ord"))]
pub enum NodeConstraint<N> {
    /// Edges with at least one endpoint in the set.
    Incident(BTreeSet<N>),
    /// Edges of exactly this pair.
    Between(N, N),
}

impl<N: NodeId> NodeConstraint<N> {
    /// Whether an edge of `pair` satisfies the constraint.
    pub fn admits(&self, pair: &NodePair<N>) -> bool {
        match self {
            Self::Incident(nodes) => nodes.contains(pair.low()) || nodes.contains(pair.high()),
            Self::Between(u, v) => pair.low() == u.min(v) && pair.high() == u.max(v),
        }
    }

    /// The distinct nodes named by the constraint.
    pub fn named_nodes(&self) -> BTreeSet<&N> {
        match self {
            Self::Incident(nodes) => nodes.iter().collect(),
            Self::Between(u, v) => [u, v].into_iter().collect(),
        }
    }
}

/// The two filter orderings for a compound slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SliceOrder {
    /// Restrict to edges incident on the node set, then filter by interval.
    #[default]
    NodeFirst,
    /// Restrict to edges overlapping the interval, then filter by node.
    IntervalFirst,
}

impl fmt::Display for SliceOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NodeFirst => write!(f, "node_first"),
            Self::IntervalFirst => write!(f, "interval_first"),
        }
    }
}

/// Which constraints a query carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryShape {
    /// No constraint at all.
    Unconstrained,
    /// Node constraint only.
    NodeOnly,
    /// Interval constraint only.
    IntervalOnly,
    /// Both: an ordering decision is needed.
    Compound,
}

/// An immutable edge query.
///
/// ```rust,ignore
/// let q = EdgeQuery::all().incident_to([1, 2]).during(3, 9);
/// assert_eq!(q.shape(), QueryShape::Compound);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(deserialize = "N: Deserialize<'de> + Ord, T: Deserialize<'de>"))]
pub struct EdgeQuery<N, T> {
    nodes: Option<NodeConstraint<N>>,
    bounds: TimeBounds<T>,
    exact_match: bool,
}

impl<N, T> Default for EdgeQuery<N, T> {
    fn default() -> Self {
        Self {
            nodes: None,
            bounds: TimeBounds::default(),
            exact_match: false,
        }
    }
}

impl<N: NodeId, T: TimePoint> EdgeQuery<N, T> {
    /// The unconstrained query.
    pub fn all() -> Self {
        Self::default()
    }

    /// Restrict to edges incident on any of `nodes`.
    pub fn incident_to<I: IntoIterator<Item = N>>(mut self, nodes: I) -> Self {
        self.nodes = Some(NodeConstraint::Incident(nodes.into_iter().collect()));
        self
    }

    /// Restrict to edges incident on `node`.
    pub fn node(self, node: N) -> Self {
        self.incident_to([node])
    }

    /// Restrict to edges between `u` and `v`.
    pub fn between(mut self, u: N, v: N) -> Self {
        self.nodes = Some(NodeConstraint::Between(u, v));
        self
    }

    /// Set the lower bound.
    pub fn begin(mut self, begin: T) -> Self {
        self.bounds.begin = Some(begin);
        self
    }

    /// Set the upper bound.
    pub fn end(mut self, end: T) -> Self {
        self.bounds.end = Some(end);
        self
    }

    /// Set both bounds.
    pub fn during(self, begin: T, end: T) -> Self {
        self.begin(begin).end(end)
    }

    /// Replace the bounds wholesale.
    pub fn with_bounds(mut self, bounds: TimeBounds<T>) -> Self {
        self.bounds = bounds;
        self
    }

    /// Require stored intervals to equal the bounds exactly.
    pub fn exact(mut self, exact_match: bool) -> Self {
        self.exact_match = exact_match;
        self
    }

    /// Node constraint, if any.
    pub fn nodes(&self) -> Option<&NodeConstraint<N>> {
        self.nodes.as_ref()
    }

    /// Time bounds.
    pub fn bounds(&self) -> &TimeBounds<T> {
        &self.bounds
    }

    /// Whether exact interval matching is requested.
    pub fn is_exact(&self) -> bool {
        self.exact_match
    }

    /// Classify the query.
    pub fn shape(&self) -> QueryShape {
        match (self.nodes.is_some(), !self.bounds.is_unbounded()) {
            (false, false) => QueryShape::Unconstrained,
            (true, false) => QueryShape::NodeOnly,
            (false, true) => QueryShape::IntervalOnly,
            (true, true) => QueryShape::Compound,
        }
    }

    /// Reject structurally malformed queries.
    pub fn validate(&self) -> Result<(), QueryError> {
        if self.exact_match && (self.bounds.begin.is_none() || self.bounds.end.is_none()) {
            return Err(QueryError::ExactMatchNeedsBounds);
        }
        self.bounds.validate()
    }

    /// Whether a stored `(pair, interval)` satisfies the whole query.
    pub fn admits(&self, pair: &NodePair<N>, interval: &Interval<T>) -> bool {
        let nodes_ok = self.nodes.as_ref().map_or(true, |c| c.admits(pair));
        nodes_ok && self.admits_interval(interval)
    }

    /// Whether `interval` satisfies the time part of the query.
    pub fn admits_interval(&self, interval: &Interval<T>) -> bool {
        if self.exact_match {
            self.bounds.begin == Some(interval.begin()) && self.bounds.end == Some(interval.end())
        } else {
            self.bounds.admits(interval)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Q = EdgeQuery<u32, i64>;

    #[test]
    fn test_shape_classification() {
        assert_eq!(Q::all().shape(), QueryShape::Unconstrained);
        assert_eq!(Q::all().node(1).shape(), QueryShape::NodeOnly);
        assert_eq!(Q::all().begin(5).shape(), QueryShape::IntervalOnly);
        assert_eq!(Q::all().between(1, 2).end(9).shape(), QueryShape::Compound);
    }

    #[test]
    fn test_exact_requires_both_bounds() {
        assert_eq!(
            Q::all().begin(6).exact(true).validate(),
            Err(QueryError::ExactMatchNeedsBounds)
        );
        assert!(Q::all().during(6, 9).exact(true).validate().is_ok());
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        assert!(matches!(
            Q::all().during(9, 6).validate(),
            Err(QueryError::InvertedBounds { .. })
        ));
    }

    #[test]
    fn test_between_is_unordered() {
        let constraint = NodeConstraint::Between(3_u32, 1);
        assert!(constraint.admits(&NodePair::new(1, 3)));
        assert!(!constraint.admits(&NodePair::new(1, 2)));
    }

    #[test]
    fn test_exact_admits_only_identical_interval() {
        let q = Q::all().during(6, 9).exact(true);
        assert!(q.admits_interval(&Interval::new(6, 9).unwrap()));
        assert!(!q.admits_interval(&Interval::new(6, 8).unwrap()));
        assert!(!q.admits_interval(&Interval::new(5, 9).unwrap()));
    }

    #[test]
    fn test_query_serde_round_trip() {
        let q = Q::all().incident_to([3, 1]).during(2, 7);
        let raw = serde_json::to_string(&q).unwrap();
        let back: Q = serde_json::from_str(&raw).unwrap();
        assert_eq!(back, q);
        assert_eq!(back.shape(), QueryShape::Compound);

        let exact = Q::all().between(4, 2).during(1, 5).exact(true);
        let back: Q = serde_json::from_str(&serde_json::to_string(&exact).unwrap()).unwrap();
        assert_eq!(back, exact);
    }
}
