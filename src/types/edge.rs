//! Node pairs and interval-tagged edges.

use std::collections::BTreeMap;
use std::fmt;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use super::interval::Interval;
use super::time::TimePoint;

/// Opaque attribute payload attached to graphs, nodes and edges.
///
/// The kernel stores and returns these verbatim and never inspects them.
pub type Attributes = BTreeMap<String, serde_json::Value>;

/// Requirements on node identifiers.
///
/// `Ord` keeps iteration deterministic (every map in the store is a
/// `BTreeMap`); `Hash` lets callers key their own side tables by node.
pub trait NodeId: Clone + Ord + Hash + fmt::Debug + Send + Sync + 'static {}

impl<N> NodeId for N where N: Clone + Ord + Hash + fmt::Debug + Send + Sync + 'static {}

/// Unordered pair of endpoints, stored as `(low, high)`.
///
/// `NodePair::new(2, 1) == NodePair::new(1, 2)`. Self-loops have
/// `low == high`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodePair<N> {
    low: N,
    high: N,
}

impl<N: NodeId> NodePair<N> {
    /// Canonicalize `(u, v)`.
    pub fn new(u: N, v: N) -> Self {
        if v < u {
            Self { low: v, high: u }
        } else {
            Self { low: u, high: v }
        }
    }

    /// Smaller endpoint.
    pub fn low(&self) -> &N {
        &self.low
    }

    /// Larger endpoint.
    pub fn high(&self) -> &N {
        &self.high
    }

    /// Whether `node` is one of the endpoints.
    pub fn contains(&self, node: &N) -> bool {
        &self.low == node || &self.high == node
    }

    /// The endpoint opposite `node`, if `node` is an endpoint.
    pub fn other(&self, node: &N) -> Option<&N> {
        if &self.low == node {
            Some(&self.high)
        } else if &self.high == node {
            Some(&self.low)
        } else {
            None
        }
    }

    /// `u == v`.
    pub fn is_self_loop(&self) -> bool {
        self.low == self.high
    }

    /// Consume into `(low, high)`.
    pub fn into_parts(self) -> (N, N) {
        (self.low, self.high)
    }
}

/// An edge present during one interval.
///
/// `u <= v` always holds because edges come out of the store in canonical
/// pair orientation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "N: Serialize, T: TimePoint + Serialize",
    deserialize = "N: Deserialize<'de>, T: TimePoint + Deserialize<'de>"
))]
pub struct Edge<N, T> {
    /// First (smaller) endpoint.
    pub u: N,
    /// Second (larger) endpoint.
    pub v: N,
    /// When the edge exists.
    pub interval: Interval<T>,
    /// Opaque edge data.
    pub attrs: Attributes,
}

impl<N: NodeId, T: TimePoint> Edge<N, T> {
    /// Assemble an edge from its stored key and payload.
    pub fn new(pair: NodePair<N>, interval: Interval<T>, attrs: Attributes) -> Self {
        let (u, v) = pair.into_parts();
        Self { u, v, interval, attrs }
    }

    /// The canonical pair.
    pub fn pair(&self) -> NodePair<N> {
        NodePair::new(self.u.clone(), self.v.clone())
    }

    /// Interval start.
    pub fn begin(&self) -> T {
        self.interval.begin()
    }

    /// Interval end.
    pub fn end(&self) -> T {
        self.interval.end()
    }

    /// `(u, v, begin, end)` without attributes.
    pub fn as_tuple(&self) -> (N, N, T, T) {
        (self.u.clone(), self.v.clone(), self.begin(), self.end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_is_unordered() {
        assert_eq!(NodePair::new(2, 1), NodePair::new(1, 2));
        let pair = NodePair::new(9, 3);
        assert_eq!(pair.low(), &3);
        assert_eq!(pair.high(), &9);
    }

    #[test]
    fn test_pair_other_endpoint() {
        let pair = NodePair::new("a", "b");
        assert_eq!(pair.other(&"a"), Some(&"b"));
        assert_eq!(pair.other(&"b"), Some(&"a"));
        assert_eq!(pair.other(&"c"), None);

        let looped = NodePair::new("a", "a");
        assert!(looped.is_self_loop());
        assert_eq!(looped.other(&"a"), Some(&"a"));
    }

    #[test]
    fn test_edge_tuple() {
        let edge = Edge::new(
            NodePair::new(3, 1),
            Interval::new(2_i64, 6).unwrap(),
            Attributes::new(),
        );
        assert_eq!(edge.as_tuple(), (1, 3, 2, 6));
    }
}
