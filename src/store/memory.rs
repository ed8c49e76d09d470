//! In-memory edge store.

use std::collections::{BTreeMap, BTreeSet};

use crate::index::IntervalIndex;
use crate::types::{Attributes, Interval, NodeId, NodePair, TimeBounds, TimePoint};

use super::EdgeSource;

/// In-memory edge store.
///
/// Uses BTreeMap/BTreeSet for deterministic iteration order. Every mutation
/// updates the interval index before returning.
#[derive(Debug, Clone)]
pub struct InMemoryEdgeStore<N, T> {
    /// Node attributes by ID.
    nodes: BTreeMap<N, Attributes>,
    /// Node -> nodes it shares at least one stored interval with.
    neighbors: BTreeMap<N, BTreeSet<N>>,
    /// Edge attributes by pair and interval.
    edges: BTreeMap<NodePair<N>, BTreeMap<Interval<T>, Attributes>>,
    index: IntervalIndex<NodePair<N>, T>,
}

impl<N: NodeId, T: TimePoint> Default for InMemoryEdgeStore<N, T> {
    fn default() -> Self {
        Self::with_scan_limit(crate::index::DEFAULT_BUCKET_SCAN_LIMIT)
    }
}

impl<N: NodeId, T: TimePoint> InMemoryEdgeStore<N, T> {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store whose pair buckets switch to trees above `limit` intervals.
    pub fn with_scan_limit(limit: usize) -> Self {
        Self {
            nodes: BTreeMap::new(),
            neighbors: BTreeMap::new(),
            edges: BTreeMap::new(),
            index: IntervalIndex::with_scan_limit(limit),
        }
    }

    /// Add a node, merging `attrs` into any existing attributes.
    ///
    /// Returns true if the node was new.
    pub fn add_node(&mut self, node: N, attrs: Attributes) -> bool {
        match self.nodes.get_mut(&node) {
            Some(existing) => {
                existing.extend(attrs);
                false
            }
            None => {
                self.nodes.insert(node, attrs);
                true
            }
        }
    }

    /// Attributes of `node`.
    pub fn node_attrs(&self, node: &N) -> Option<&Attributes> {
        self.nodes.get(node)
    }

    /// Mutable attributes of `node`.
    pub fn node_attrs_mut(&mut self, node: &N) -> Option<&mut Attributes> {
        self.nodes.get_mut(node)
    }

    /// All nodes in order.
    pub fn nodes(&self) -> impl Iterator<Item = &N> {
        self.nodes.keys()
    }

    /// Store an edge, creating missing endpoints.
    ///
    /// Returns false, leaving the stored attributes untouched, if
    /// `(pair, interval)` is already present.
    pub fn add_edge(&mut self, pair: NodePair<N>, interval: Interval<T>, attrs: Attributes) -> bool {
        if !self.index.insert(pair.clone(), interval) {
            return false;
        }
        let (low, high) = (pair.low().clone(), pair.high().clone());
        self.nodes.entry(low.clone()).or_default();
        self.nodes.entry(high.clone()).or_default();
        self.neighbors.entry(low.clone()).or_default().insert(high.clone());
        self.neighbors.entry(high).or_default().insert(low);
        self.edges.entry(pair).or_default().insert(interval, attrs);
        true
    }

    /// Whether `(pair, interval)` is stored.
    pub fn contains_edge(&self, pair: &NodePair<N>, interval: &Interval<T>) -> bool {
        self.index.contains(pair, interval)
    }

    /// Mutable attributes of a stored edge.
    pub fn edge_attrs_mut(&mut self, pair: &NodePair<N>, interval: &Interval<T>) -> Option<&mut Attributes> {
        self.edges.get_mut(pair)?.get_mut(interval)
    }

    /// Remove the edge with exactly this interval.
    pub fn remove_exact(&mut self, pair: &NodePair<N>, interval: &Interval<T>) -> Option<Attributes> {
        if !self.index.remove(pair, interval) {
            return None;
        }
        let by_interval = self.edges.get_mut(pair)?;
        let attrs = by_interval.remove(interval);
        if by_interval.is_empty() {
            self.edges.remove(pair);
            self.unlink(pair);
        }
        attrs
    }

    /// Remove the earliest `(begin, end)` edge of `pair` overlapping `bounds`.
    pub fn remove_first_overlapping(
        &mut self,
        pair: &NodePair<N>,
        bounds: &TimeBounds<T>,
    ) -> Option<(Interval<T>, Attributes)> {
        let interval = self.index.first_overlapping(pair, bounds)?;
        let attrs = self.remove_exact(pair, &interval)?;
        Some((interval, attrs))
    }

    /// Remove every edge of `pair` overlapping `bounds`. Returns the count removed.
    pub fn remove_all_overlapping(&mut self, pair: &NodePair<N>, bounds: &TimeBounds<T>) -> usize {
        let mut removed = 0;
        for (pair, interval) in self.index.query_overlap(Some(pair), bounds) {
            if self.remove_exact(&pair, &interval).is_some() {
                removed += 1;
            }
        }
        removed
    }

    /// Remove every edge incident to `node` overlapping `bounds`.
    ///
    /// The node itself is removed when the bounds are unbounded, or when it
    /// has no edges left. Returns the number of edges removed.
    pub fn remove_node(&mut self, node: &N, bounds: &TimeBounds<T>) -> usize {
        if !self.nodes.contains_key(node) {
            return 0;
        }
        let mut removed = 0;
        for pair in self.incident_pairs(node) {
            removed += self.remove_all_overlapping(&pair, bounds);
        }
        if bounds.is_unbounded() || !self.neighbors.contains_key(node) {
            self.nodes.remove(node);
        }
        removed
    }

    /// Drop adjacency for a pair that no longer has any interval.
    fn unlink(&mut self, pair: &NodePair<N>) {
        for (from, to) in [(pair.low(), pair.high()), (pair.high(), pair.low())] {
            let now_empty = match self.neighbors.get_mut(from) {
                Some(set) => {
                    set.remove(to);
                    set.is_empty()
                }
                None => false,
            };
            if now_empty {
                self.neighbors.remove(from);
            }
        }
    }

    /// Get number of nodes.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Get number of edges.
    pub fn num_edges(&self) -> usize {
        self.index.len()
    }

    /// Intervals of `pair`, sorted.
    pub fn intervals_of(&self, pair: &NodePair<N>) -> Vec<Interval<T>> {
        self.index.intervals_of(pair)
    }

    /// Every stored edge key in `(pair, interval)` order.
    pub fn edge_keys(&self) -> impl Iterator<Item = (&NodePair<N>, &Interval<T>)> {
        self.edges
            .iter()
            .flat_map(|(pair, by_interval)| by_interval.keys().map(move |interval| (pair, interval)))
    }
}

impl<N: NodeId, T: TimePoint> EdgeSource<N, T> for InMemoryEdgeStore<N, T> {
    fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn contains_node(&self, node: &N) -> bool {
        self.nodes.contains_key(node)
    }

    fn node_ids(&self) -> Vec<N> {
        self.nodes.keys().cloned().collect()
    }

    fn incident_pairs(&self, node: &N) -> Vec<NodePair<N>> {
        self.neighbors
            .get(node)
            .map(|others| {
                others
                    .iter()
                    .map(|other| NodePair::new(node.clone(), other.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn interval_index(&self) -> &IntervalIndex<NodePair<N>, T> {
        &self.index
    }

    fn edge_attrs(&self, pair: &NodePair<N>, interval: &Interval<T>) -> Option<&Attributes> {
        self.edges.get(pair)?.get(interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn iv(begin: i64, end: i64) -> Interval<i64> {
        Interval::new(begin, end).unwrap()
    }

    fn pair(u: u32, v: u32) -> NodePair<u32> {
        NodePair::new(u, v)
    }

    fn scenario() -> InMemoryEdgeStore<u32, i64> {
        let mut store = InMemoryEdgeStore::new();
        store.add_edge(pair(1, 2), iv(1, 4), Attributes::new());
        store.add_edge(pair(1, 2), iv(2, 6), Attributes::new());
        store.add_edge(pair(1, 3), iv(6, 9), Attributes::new());
        store.add_edge(pair(2, 3), iv(2, 5), Attributes::new());
        store
    }

    #[test]
    fn test_implicit_nodes() {
        let store = scenario();
        assert_eq!(store.num_nodes(), 3);
        assert_eq!(store.num_edges(), 4);
        assert_eq!(store.incident_pairs(&1), vec![pair(1, 2), pair(1, 3)]);
    }

    #[test]
    fn test_duplicate_keeps_first_attrs() {
        let mut store = scenario();
        let mut attrs = Attributes::new();
        attrs.insert("weight".into(), json!(3));
        assert!(!store.add_edge(pair(2, 1), iv(1, 4), attrs));
        assert_eq!(store.edge_attrs(&pair(1, 2), &iv(1, 4)), Some(&Attributes::new()));
    }

    #[test]
    fn test_first_overlapping_is_earliest() {
        let mut store = scenario();
        let removed = store.remove_first_overlapping(&pair(1, 2), &TimeBounds::during(3, 4));
        assert_eq!(removed.map(|(interval, _)| interval), Some(iv(1, 4)));
        assert_eq!(store.intervals_of(&pair(1, 2)), vec![iv(2, 6)]);
    }

    #[test]
    fn test_adjacency_follows_last_interval() {
        let mut store = scenario();
        assert!(store.remove_exact(&pair(1, 3), &iv(6, 9)).is_some());
        assert_eq!(store.incident_pairs(&3), vec![pair(2, 3)]);
        assert!(store.contains_node(&3));
        assert!(store.remove_exact(&pair(1, 3), &iv(6, 9)).is_none());
    }

    #[test]
    fn test_remove_node_bounded_keeps_node_with_edges() {
        let mut store = scenario();
        assert_eq!(store.remove_node(&2, &TimeBounds::new(Some(5), None)), 1);
        assert!(store.contains_node(&2));
        assert_eq!(store.remove_node(&2, &TimeBounds::unbounded()), 2);
        assert!(!store.contains_node(&2));
        assert_eq!(store.num_edges(), 1);
    }

    #[test]
    fn test_remove_node_drops_isolated_leftover() {
        let mut store = scenario();
        assert_eq!(store.remove_node(&3, &TimeBounds::during(0, 10)), 2);
        assert!(!store.contains_node(&3));
    }

    #[test]
    fn test_add_node_merges_attrs() {
        let mut store: InMemoryEdgeStore<u32, i64> = InMemoryEdgeStore::new();
        let mut first = Attributes::new();
        first.insert("a".into(), json!(1));
        let mut second = Attributes::new();
        second.insert("b".into(), json!(2));
        assert!(store.add_node(7, first));
        assert!(!store.add_node(7, second));
        assert_eq!(store.node_attrs(&7).map(|attrs| attrs.len()), Some(2));
    }

    #[test]
    fn test_self_loop_adjacency() {
        let mut store: InMemoryEdgeStore<u32, i64> = InMemoryEdgeStore::new();
        store.add_edge(pair(4, 4), iv(0, 1), Attributes::new());
        assert_eq!(store.incident_pairs(&4), vec![pair(4, 4)]);
        store.remove_exact(&pair(4, 4), &iv(0, 1));
        assert!(store.incident_pairs(&4).is_empty());
    }
}
