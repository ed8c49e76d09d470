//! Edge storage.
//!
//! The planner reads storage only through [`EdgeSource`], so alternative
//! backends can be sliced the same way as [`InMemoryEdgeStore`].

pub mod memory;

use crate::index::IntervalIndex;
use crate::selector::SelectorError;
use crate::types::{Attributes, Edge, Interval, IntervalError, NodeId, NodePair, QueryError, TimePoint};

/// Error type for graph operations.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// Rejected interval.
    #[error(transparent)]
    Interval(#[from] IntervalError),
    /// Malformed query.
    #[error(transparent)]
    Query(#[from] QueryError),
    /// Selector training failure.
    #[error(transparent)]
    Selector(#[from] SelectorError),
    /// Canonical encoding failure while hashing.
    #[error("Encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Read access to stored edges.
///
/// Implementations must guarantee deterministic ordering of results.
pub trait EdgeSource<N: NodeId, T: TimePoint> {
    /// Number of nodes, isolated ones included.
    fn node_count(&self) -> usize;

    /// Whether `node` exists.
    fn contains_node(&self, node: &N) -> bool;

    /// Every node in order.
    fn node_ids(&self) -> Vec<N>;

    /// Pairs with at least one stored interval that have `node` as an endpoint,
    /// in pair order.
    fn incident_pairs(&self, node: &N) -> Vec<NodePair<N>>;

    /// The interval index over every stored `(pair, interval)`.
    fn interval_index(&self) -> &IntervalIndex<NodePair<N>, T>;

    /// Attributes of a stored edge.
    fn edge_attrs(&self, pair: &NodePair<N>, interval: &Interval<T>) -> Option<&Attributes>;

    /// Number of stored edges.
    fn edge_count(&self) -> usize {
        self.interval_index().len()
    }

    /// Build the public [`Edge`] for a stored key.
    fn materialize(&self, pair: &NodePair<N>, interval: &Interval<T>) -> Option<Edge<N, T>> {
        let attrs = self.edge_attrs(pair, interval)?;
        Some(Edge::new(pair.clone(), *interval, attrs.clone()))
    }
}

pub use memory::InMemoryEdgeStore;
