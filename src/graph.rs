//! The dynamic graph facade.
//!
//! [`DynamicGraph`] owns an [`InMemoryEdgeStore`] and a [`SlicePlanner`],
//! turning raw `(u, v, begin, end)` arguments into validated intervals and
//! queries.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::canonical::canonical_hash_hex;
use crate::planner::{SlicePlan, SlicePlanner};
use crate::policy::{PlannerConfig, SelectorConfig};
use crate::selector::{collect_samples, share, LinearCostSelector, SharedSelector, TrainingReport};
use crate::store::{EdgeSource, InMemoryEdgeStore};
use crate::types::{Attributes, Edge, EdgeQuery, Interval, NodeId, NodePair, QueryError, TimeBounds, TimePoint};
use crate::{Result, KERNEL_SCHEMA_VERSION};

/// Deterministic fingerprint of a graph state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphFingerprint(pub String);

impl fmt::Display for GraphFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Canonical form hashed by [`DynamicGraph::fingerprint`].
#[derive(Serialize)]
struct GraphSnapshot<'a, N, T: TimePoint> {
    schema_version: &'a str,
    attrs: &'a Attributes,
    nodes: Vec<(&'a N, &'a Attributes)>,
    edges: Vec<(&'a NodePair<N>, &'a Interval<T>, &'a Attributes)>,
}

/// An undirected graph whose edges exist during half-open intervals.
///
/// ```rust,ignore
/// let mut g = DynamicGraph::new();
/// g.add_edge(1, 2, 1, 4, Attributes::new())?;
/// g.add_edge(1, 3, 6, 9, Attributes::new())?;
/// let late = g.edges(&EdgeQuery::all().begin(5))?;
/// ```
#[derive(Debug, Clone)]
pub struct DynamicGraph<N, T> {
    store: InMemoryEdgeStore<N, T>,
    planner: SlicePlanner,
    selector_config: SelectorConfig,
    attrs: Attributes,
}

impl<N: NodeId, T: TimePoint> Default for DynamicGraph<N, T> {
    fn default() -> Self {
        Self::with_config(PlannerConfig::default(), SelectorConfig::default())
    }
}

impl<N: NodeId, T: TimePoint> DynamicGraph<N, T> {
    /// Create an empty graph with default policies.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty graph with custom policies.
    pub fn with_config(planner: PlannerConfig, selector: SelectorConfig) -> Self {
        Self {
            store: InMemoryEdgeStore::with_scan_limit(planner.bucket_scan_limit),
            planner: SlicePlanner::new(planner),
            selector_config: selector,
            attrs: Attributes::new(),
        }
    }

    /// Graph attributes.
    pub fn attrs(&self) -> &Attributes {
        &self.attrs
    }

    /// Mutable graph attributes.
    pub fn attrs_mut(&mut self) -> &mut Attributes {
        &mut self.attrs
    }

    /// The underlying store.
    pub fn store(&self) -> &InMemoryEdgeStore<N, T> {
        &self.store
    }

    /// The planner.
    pub fn planner(&self) -> &SlicePlanner {
        &self.planner
    }

    /// Selector training settings.
    pub fn selector_config(&self) -> &SelectorConfig {
        &self.selector_config
    }

    // ------------------------------------------------------------------
    // Nodes
    // ------------------------------------------------------------------

    /// Add a node, merging `attrs` into existing attributes. Returns true if new.
    pub fn add_node(&mut self, node: N, attrs: Attributes) -> bool {
        self.store.add_node(node, attrs)
    }

    /// Add nodes without attributes. Returns how many were new.
    pub fn add_nodes_from<I: IntoIterator<Item = N>>(&mut self, nodes: I) -> usize {
        nodes
            .into_iter()
            .filter(|node| self.store.add_node(node.clone(), Attributes::new()))
            .count()
    }

    /// Whether `node` exists.
    pub fn has_node(&self, node: &N) -> bool {
        self.store.contains_node(node)
    }

    /// Whether `node` has an incident edge overlapping the bounds.
    ///
    /// With no bounds this is [`DynamicGraph::has_node`].
    pub fn has_node_in(&self, node: &N, begin: Option<T>, end: Option<T>) -> Result<bool> {
        let bounds = TimeBounds::new(begin, end);
        bounds.validate()?;
        if bounds.is_unbounded() {
            return Ok(self.has_node(node));
        }
        Ok(!self.edges(&EdgeQuery::all().node(node.clone()).with_bounds(bounds))?.is_empty())
    }

    /// Number of nodes, isolated ones included.
    pub fn number_of_nodes(&self) -> usize {
        self.store.num_nodes()
    }

    /// All nodes, in order.
    pub fn nodes(&self) -> Vec<N> {
        self.store.node_ids()
    }

    /// Nodes with an incident edge overlapping the bounds, in order.
    ///
    /// With no bounds every node is returned, isolated ones included.
    pub fn nodes_in(&self, begin: Option<T>, end: Option<T>) -> Result<Vec<N>> {
        let bounds = TimeBounds::new(begin, end);
        bounds.validate()?;
        if bounds.is_unbounded() {
            return Ok(self.nodes());
        }
        let present: BTreeSet<N> = self
            .edges(&EdgeQuery::all().with_bounds(bounds))?
            .into_iter()
            .flat_map(|edge| [edge.u, edge.v])
            .collect();
        Ok(present.into_iter().collect())
    }

    /// Node attributes.
    pub fn node_attrs(&self, node: &N) -> Option<&Attributes> {
        self.store.node_attrs(node)
    }

    /// Mutable node attributes.
    pub fn node_attrs_mut(&mut self, node: &N) -> Option<&mut Attributes> {
        self.store.node_attrs_mut(node)
    }

    /// Remove incident edges overlapping the bounds.
    ///
    /// With no bounds the node goes too; with bounds it goes once no edge is
    /// left. Returns the number of edges removed.
    pub fn remove_node(&mut self, node: &N, begin: Option<T>, end: Option<T>) -> Result<usize> {
        let bounds = TimeBounds::new(begin, end);
        bounds.validate()?;
        Ok(self.store.remove_node(node, &bounds))
    }

    // ------------------------------------------------------------------
    // Edges
    // ------------------------------------------------------------------

    /// Add an edge during `[begin, end)`, creating missing endpoints.
    ///
    /// Returns `Ok(false)` if the same pair and interval is already stored;
    /// the stored attributes are left as they were.
    pub fn add_edge(&mut self, u: N, v: N, begin: T, end: T, attrs: Attributes) -> Result<bool> {
        let interval = Interval::new(begin, end)?;
        Ok(self.store.add_edge(NodePair::new(u, v), interval, attrs))
    }

    /// Add many edges. Returns how many were new.
    ///
    /// Every interval is validated before anything is stored, so an invalid
    /// tuple leaves the graph unchanged.
    pub fn add_edges_from<I>(&mut self, edges: I) -> Result<usize>
    where
        I: IntoIterator<Item = (N, N, T, T, Attributes)>,
    {
        let validated = edges
            .into_iter()
            .map(|(u, v, begin, end, attrs)| -> Result<_> {
                Ok((NodePair::new(u, v), Interval::new(begin, end)?, attrs))
            })
            .collect::<Result<Vec<_>>>()?;
        let mut added = 0;
        for (pair, interval, attrs) in validated {
            if self.store.add_edge(pair, interval, attrs) {
                added += 1;
            }
        }
        Ok(added)
    }

    /// Whether an edge of `(u, v)` overlaps (or, with `exact_match`, equals) the bounds.
    ///
    /// `exact_match` with a missing bound is a [`QueryError::ExactMatchNeedsBounds`].
    pub fn has_edge(&self, u: N, v: N, begin: Option<T>, end: Option<T>, exact_match: bool) -> Result<bool> {
        let bounds = TimeBounds::new(begin, end);
        bounds.validate()?;
        let pair = NodePair::new(u, v);
        let index = self.store.interval_index();
        if exact_match {
            return Ok(exact_interval(&bounds)?.is_some_and(|interval| index.contains(&pair, &interval)));
        }
        Ok(index.first_overlapping(&pair, &bounds).is_some())
    }

    /// Remove one edge of `(u, v)`.
    ///
    /// Without `exact_match` the overlapping edge with the earliest
    /// `(begin, end)` is removed. With `exact_match` both bounds must be
    /// given ([`QueryError::ExactMatchNeedsBounds`] otherwise) and equal a
    /// stored interval. Returns whether an edge was removed.
    pub fn remove_edge(&mut self, u: N, v: N, begin: Option<T>, end: Option<T>, exact_match: bool) -> Result<bool> {
        let bounds = TimeBounds::new(begin, end);
        bounds.validate()?;
        let pair = NodePair::new(u, v);
        if exact_match {
            return Ok(match exact_interval(&bounds)? {
                Some(interval) => self.store.remove_exact(&pair, &interval).is_some(),
                None => false,
            });
        }
        Ok(self.store.remove_first_overlapping(&pair, &bounds).is_some())
    }

    /// Remove every edge of `(u, v)` overlapping the bounds. Returns the count removed.
    pub fn remove_edges_overlapping(&mut self, u: N, v: N, begin: Option<T>, end: Option<T>) -> Result<usize> {
        let bounds = TimeBounds::new(begin, end);
        bounds.validate()?;
        Ok(self.store.remove_all_overlapping(&NodePair::new(u, v), &bounds))
    }

    /// Number of stored edges.
    pub fn number_of_edges(&self) -> usize {
        self.store.num_edges()
    }

    /// Edges matching `query`, sorted by `(pair, begin, end)`.
    pub fn edges(&self, query: &EdgeQuery<N, T>) -> Result<Vec<Edge<N, T>>> {
        Ok(self.planner.execute(&self.store, query)?)
    }

    /// Every edge, sorted by `(pair, begin, end)`.
    pub fn all_edges(&self) -> Vec<Edge<N, T>> {
        self.store
            .edge_keys()
            .filter_map(|(pair, interval)| self.store.materialize(pair, interval))
            .collect()
    }

    /// How `query` would be executed.
    pub fn explain(&self, query: &EdgeQuery<N, T>) -> Result<SlicePlan> {
        Ok(self.planner.explain(&self.store, query)?)
    }

    /// Edge attributes for the edge with exactly `[begin, end)`.
    pub fn edge_attrs(&self, u: N, v: N, begin: T, end: T) -> Option<&Attributes> {
        let interval = Interval::new(begin, end).ok()?;
        self.store.edge_attrs(&NodePair::new(u, v), &interval)
    }

    /// Mutable edge attributes for the edge with exactly `[begin, end)`.
    pub fn edge_attrs_mut(&mut self, u: N, v: N, begin: T, end: T) -> Option<&mut Attributes> {
        let interval = Interval::new(begin, end).ok()?;
        self.store.edge_attrs_mut(&NodePair::new(u, v), &interval)
    }

    /// `(min begin, max end)` across all edges, `None` when there are none.
    pub fn interval(&self) -> Option<(T, T)> {
        self.store.interval_index().span()
    }

    // ------------------------------------------------------------------
    // Degree
    // ------------------------------------------------------------------

    /// Edges incident to `node` overlapping the bounds. Self-loops count once.
    pub fn degree(&self, node: &N, begin: Option<T>, end: Option<T>) -> Result<usize> {
        let query = EdgeQuery::all().node(node.clone()).with_bounds(TimeBounds::new(begin, end));
        Ok(self.edges(&query)?.len())
    }

    /// Mean degree over [`DynamicGraph::nodes_in`] the bounds, 0 when there are none.
    pub fn mean_degree(&self, begin: Option<T>, end: Option<T>) -> Result<f64> {
        let nodes = self.nodes_in(begin, end)?;
        if nodes.is_empty() {
            return Ok(0.0);
        }
        let mut degrees: BTreeMap<N, usize> = BTreeMap::new();
        for edge in self.edges(&EdgeQuery::all().with_bounds(TimeBounds::new(begin, end)))? {
            *degrees.entry(edge.u.clone()).or_default() += 1;
            if edge.u != edge.v {
                *degrees.entry(edge.v).or_default() += 1;
            }
        }
        Ok(degrees.values().sum::<usize>() as f64 / nodes.len() as f64)
    }

    /// Times inside the bounds at which the degree of `node` changes, each
    /// paired with the degree from that time on.
    ///
    /// Missing bounds default to the graph span. Coinciding begin and end
    /// events that cancel out are not reported.
    pub fn degree_changes(&self, node: &N, begin: Option<T>, end: Option<T>) -> Result<Vec<(T, usize)>> {
        TimeBounds::new(begin, end).validate()?;
        let Some((first, last)) = self.interval() else {
            return Ok(Vec::new());
        };
        let (begin, end) = (begin.unwrap_or(first), end.unwrap_or(last));
        if begin >= end {
            return Ok(Vec::new());
        }
        let query = EdgeQuery::all().node(node.clone()).during(begin, end);

        let mut current = 0usize;
        let mut deltas: BTreeMap<T, i64> = BTreeMap::new();
        for edge in self.edges(&query)? {
            if edge.begin() < begin {
                current += 1;
            } else {
                *deltas.entry(edge.begin()).or_default() += 1;
            }
            if edge.end() < end {
                *deltas.entry(edge.end()).or_default() -= 1;
            }
        }

        let mut changes = Vec::new();
        for (t, delta) in deltas {
            if delta == 0 {
                continue;
            }
            current = current.saturating_add_signed(delta as isize);
            changes.push((t, current));
        }
        Ok(changes)
    }

    // ------------------------------------------------------------------
    // Selector
    // ------------------------------------------------------------------

    /// Attach a selector, returning the previous one.
    pub fn attach_selector(&mut self, selector: SharedSelector) -> Option<SharedSelector> {
        self.planner.attach_selector(selector)
    }

    /// Detach the selector.
    pub fn detach_selector(&mut self) -> Option<SharedSelector> {
        self.planner.detach_selector()
    }

    /// The attached selector.
    pub fn selector(&self) -> Option<&SharedSelector> {
        self.planner.selector()
    }

    /// Train the attached selector on `sample_count` synthetic queries.
    ///
    /// Attaches a fresh [`LinearCostSelector`] first if none is attached.
    /// Edges and nodes are not modified.
    pub fn train_selector(&mut self, sample_count: usize) -> Result<TrainingReport> {
        let samples = collect_samples(&self.store, &self.selector_config, sample_count)?;
        let selector = match self.planner.selector() {
            Some(selector) => selector.clone(),
            None => {
                let selector = share(LinearCostSelector::new(self.selector_config.clone()));
                self.planner.attach_selector(selector.clone());
                selector
            }
        };
        selector.write().train(&samples)?;

        let report = TrainingReport::summarize(sample_count, &samples);
        tracing::info!(
            selector = selector.read().name(),
            samples = report.samples,
            node_first_wins = report.node_first_wins,
            mean_node_first_nanos = report.mean_node_first_nanos,
            mean_interval_first_nanos = report.mean_interval_first_nanos,
            edges = self.number_of_edges(),
            "Trained strategy selector"
        );
        Ok(report)
    }
}

impl<N, T> DynamicGraph<N, T>
where
    N: NodeId + Serialize,
    T: TimePoint + Serialize,
{
    /// Fingerprint of nodes, edges and all attributes.
    ///
    /// Equal graph states give equal fingerprints regardless of insertion order.
    pub fn fingerprint(&self) -> Result<GraphFingerprint> {
        let snapshot = GraphSnapshot {
            schema_version: KERNEL_SCHEMA_VERSION,
            attrs: &self.attrs,
            nodes: self
                .store
                .nodes()
                .filter_map(|node| self.store.node_attrs(node).map(|attrs| (node, attrs)))
                .collect(),
            edges: self
                .store
                .edge_keys()
                .filter_map(|(pair, interval)| {
                    self.store.edge_attrs(pair, interval).map(|attrs| (pair, interval, attrs))
                })
                .collect(),
        };
        Ok(GraphFingerprint(canonical_hash_hex(&snapshot)?))
    }
}

/// The interval an exact-match request names.
///
/// Both bounds are required. Equal bounds name no interval.
fn exact_interval<T: TimePoint>(bounds: &TimeBounds<T>) -> std::result::Result<Option<Interval<T>>, QueryError> {
    if bounds.begin.is_none() || bounds.end.is_none() {
        return Err(QueryError::ExactMatchNeedsBounds);
    }
    Ok(bounds.as_interval())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::GraphError;
    use crate::types::IntervalError;
    use serde_json::json;

    fn scenario() -> DynamicGraph<u32, i64> {
        let mut g = DynamicGraph::new();
        g.add_edges_from([
            (1, 2, 1, 4, Attributes::new()),
            (1, 2, 2, 6, Attributes::new()),
            (1, 3, 6, 9, Attributes::new()),
            (2, 3, 2, 5, Attributes::new()),
        ])
        .unwrap();
        g
    }

    #[test]
    fn test_invalid_interval_stores_nothing() {
        let mut g: DynamicGraph<u32, i64> = DynamicGraph::new();
        assert!(matches!(
            g.add_edge(1, 2, 4, 4, Attributes::new()),
            Err(GraphError::Interval(IntervalError::InvalidInterval { .. }))
        ));
        assert_eq!(g.number_of_nodes(), 0);

        let batch = g.add_edges_from([(1, 2, 0, 1, Attributes::new()), (2, 3, 5, 1, Attributes::new())]);
        assert!(batch.is_err());
        assert_eq!(g.number_of_edges(), 0);
    }

    #[test]
    fn test_has_edge_half_open() {
        let mut g: DynamicGraph<u32, i64> = DynamicGraph::new();
        g.add_edge(1, 2, 1, 4, Attributes::new()).unwrap();
        assert!(!g.has_edge(1, 2, Some(4), None, false).unwrap());
        assert!(g.has_edge(2, 1, Some(3), Some(4), false).unwrap());
        assert!(g.has_edge(1, 2, Some(1), Some(4), true).unwrap());
        assert!(matches!(
            g.has_edge(1, 2, Some(1), None, true),
            Err(GraphError::Query(QueryError::ExactMatchNeedsBounds))
        ));
    }

    #[test]
    fn test_remove_edge_exact_and_overlapping() {
        let mut g = scenario();
        assert!(!g.remove_edge(1, 2, Some(1), Some(5), true).unwrap());
        assert!(g.remove_edge(1, 2, Some(3), None, false).unwrap());
        assert_eq!(
            g.edges(&EdgeQuery::all().between(1, 2)).unwrap().iter().map(Edge::as_tuple).collect::<Vec<_>>(),
            vec![(1, 2, 2, 6)]
        );
        assert!(matches!(
            g.remove_edge(1, 2, Some(6), Some(2), false),
            Err(GraphError::Query(QueryError::InvertedBounds { .. }))
        ));
    }

    #[test]
    fn test_nodes_in_and_has_node_in() {
        let g = scenario();
        assert_eq!(g.nodes_in(Some(6), None).unwrap(), vec![1, 3]);
        assert!(g.has_node_in(&3, Some(0), Some(3)).unwrap());
        assert!(!g.has_node_in(&3, Some(5), Some(6)).unwrap());
        assert_eq!(g.nodes_in(None, None).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_degree_and_mean_degree() {
        let g = scenario();
        assert_eq!(g.degree(&1, None, None).unwrap(), 3);
        assert_eq!(g.degree(&2, Some(5), None).unwrap(), 1);
        // Edges overlapping [2, 5): (1,2,1,4), (1,2,2,6), (2,3,2,5) over nodes {1, 2, 3}.
        assert!((g.mean_degree(Some(2), Some(5)).unwrap() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_degree_changes() {
        let g = scenario();
        assert_eq!(g.degree_changes(&1, None, None).unwrap(), vec![(1, 1), (2, 2), (4, 1)]);
        assert_eq!(g.degree_changes(&1, Some(3), Some(7)).unwrap(), vec![(4, 1)]);
    }

    #[test]
    fn test_degree_changes_outside_span_is_empty() {
        let g = scenario();
        assert_eq!(g.degree_changes(&1, Some(100), None).unwrap(), vec![]);
        assert_eq!(g.degree_changes(&1, None, Some(0)).unwrap(), vec![]);
        assert_eq!(g.degree(&1, Some(100), None).unwrap(), 0);
    }

    #[test]
    fn test_remove_edges_overlapping() {
        let mut g = scenario();
        assert_eq!(g.remove_edges_overlapping(2, 1, Some(3), Some(4)).unwrap(), 2);
        assert_eq!(g.number_of_edges(), 2);
        assert_eq!(g.interval(), Some((2, 9)));
    }

    #[test]
    fn test_attribute_accessors() {
        let mut g = scenario();
        g.attrs_mut().insert("name".into(), json!("scenario"));
        if let Some(attrs) = g.edge_attrs_mut(2, 1, 1, 4) {
            attrs.insert("weight".into(), json!(0.5));
        }
        assert_eq!(g.edge_attrs(1, 2, 1, 4).and_then(|a| a.get("weight")), Some(&json!(0.5)));
        assert_eq!(g.edge_attrs(1, 2, 1, 5), None);
        assert!(g.node_attrs(&1).is_some());
        assert_eq!(g.attrs().len(), 1);
    }

    #[test]
    fn test_fingerprint_ignores_insertion_order() {
        let a = scenario();
        let mut b: DynamicGraph<u32, i64> = DynamicGraph::new();
        b.add_edge(2, 3, 2, 5, Attributes::new()).unwrap();
        b.add_edge(3, 1, 6, 9, Attributes::new()).unwrap();
        b.add_edge(2, 1, 2, 6, Attributes::new()).unwrap();
        b.add_edge(1, 2, 1, 4, Attributes::new()).unwrap();
        assert_eq!(a.fingerprint().unwrap(), b.fingerprint().unwrap());

        b.remove_edge(1, 2, Some(1), Some(4), true).unwrap();
        assert_ne!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
    }

    #[test]
    fn test_train_selector_attaches_and_preserves_edges() {
        let mut g: DynamicGraph<u32, i64> = DynamicGraph::new();
        for i in 0..40_u32 {
            g.add_edge(i, (i * 7) % 40, i64::from(i), i64::from(i) + 12, Attributes::new()).unwrap();
        }
        let before = g.fingerprint().unwrap();
        let report = g.train_selector(16).unwrap();
        assert_eq!(report.samples, 16);
        assert!(g.selector().is_some_and(|s| s.read().is_trained()));
        assert_eq!(g.fingerprint().unwrap(), before);
    }
}
