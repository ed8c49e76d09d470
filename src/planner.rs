//! Compound slice planner.
//!
//! Classifies a query, picks an ordering for compound slices and runs the
//! matching pipeline against an [`EdgeSource`].

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::policy::PlannerConfig;
use crate::selector::{FallbackReason, SharedSelector, SliceFeatures};
use crate::store::EdgeSource;
use crate::types::{Edge, EdgeQuery, Interval, NodeConstraint, NodeId, NodePair, QueryError, QueryShape, SliceOrder, TimePoint};

/// How a plan's ordering was decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionSource {
    /// Only one filter applies; no ordering decision was needed.
    SingleFilter,
    /// The configured default, with no selector consulted.
    Fixed,
    /// The attached selector's prediction.
    Selector,
    /// The configured default after the selector declined.
    Fallback(FallbackReason),
}

/// What the planner will do for a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlicePlan {
    /// Query classification.
    pub shape: QueryShape,
    /// Ordering for compound slices, `None` otherwise.
    pub order: Option<SliceOrder>,
    /// How the ordering was chosen.
    pub source: DecisionSource,
}

/// Compound slice planner.
///
/// ## Algorithm
///
/// 1. Validate and classify the query
/// 2. Unconstrained and node-only queries walk the pair buckets of the
///    candidate pairs; interval-only queries walk the global interval tree
/// 3. Compound queries ask the selector (if attached and enabled) for an
///    ordering, falling back to `default_order`
/// 4. Results are returned sorted by `(pair, begin, end)` whichever
///    pipeline ran
#[derive(Clone, Default)]
pub struct SlicePlanner {
    config: PlannerConfig,
    selector: Option<SharedSelector>,
}

impl std::fmt::Debug for SlicePlanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlicePlanner")
            .field("config", &self.config)
            .field("selector", &self.selector.as_ref().map(|s| s.read().name().to_string()))
            .finish()
    }
}

impl SlicePlanner {
    /// Create a planner without a selector.
    pub fn new(config: PlannerConfig) -> Self {
        Self { config, selector: None }
    }

    /// Attach a selector.
    pub fn with_selector(mut self, selector: SharedSelector) -> Self {
        self.selector = Some(selector);
        self
    }

    /// Planner configuration.
    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Replace the configuration.
    pub fn set_config(&mut self, config: PlannerConfig) {
        self.config = config;
    }

    /// The attached selector.
    pub fn selector(&self) -> Option<&SharedSelector> {
        self.selector.as_ref()
    }

    /// Attach `selector`, returning the one it replaces.
    pub fn attach_selector(&mut self, selector: SharedSelector) -> Option<SharedSelector> {
        self.selector.replace(selector)
    }

    /// Detach the selector.
    pub fn detach_selector(&mut self) -> Option<SharedSelector> {
        self.selector.take()
    }

    /// Plan `query` without running it.
    pub fn explain<N, T, S>(&self, source: &S, query: &EdgeQuery<N, T>) -> Result<SlicePlan, QueryError>
    where
        N: NodeId,
        T: TimePoint,
        S: EdgeSource<N, T> + ?Sized,
    {
        query.validate()?;
        let shape = query.shape();
        if shape != QueryShape::Compound {
            return Ok(SlicePlan {
                shape,
                order: None,
                source: DecisionSource::SingleFilter,
            });
        }

        let default_order = self.config.default_order;
        let (order, decided_by) = match (&self.selector, self.config.use_selector) {
            (Some(selector), true) => {
                let features = SliceFeatures::observe(source, query);
                let prediction = selector.read().predict_detailed(&features);
                match prediction.fallback {
                    None => (prediction.order, DecisionSource::Selector),
                    Some(reason) => {
                        tracing::debug!(
                            reason = ?reason,
                            node_fraction = features.node_fraction,
                            interval_fraction = features.interval_fraction,
                            edge_count = features.edge_count,
                            "Selector declined, using default order"
                        );
                        (default_order, DecisionSource::Fallback(reason))
                    }
                }
            }
            _ => (default_order, DecisionSource::Fixed),
        };

        Ok(SlicePlan {
            shape,
            order: Some(order),
            source: decided_by,
        })
    }

    /// Plan and run `query`.
    pub fn execute<N, T, S>(&self, source: &S, query: &EdgeQuery<N, T>) -> Result<Vec<Edge<N, T>>, QueryError>
    where
        N: NodeId,
        T: TimePoint,
        S: EdgeSource<N, T> + ?Sized,
    {
        let plan = self.explain(source, query)?;
        let edges = match plan.shape {
            QueryShape::Unconstrained | QueryShape::NodeOnly => node_first(source, query),
            QueryShape::IntervalOnly => interval_first(source, query),
            QueryShape::Compound => {
                execute_ordered(source, query, plan.order.unwrap_or(self.config.default_order))
            }
        };
        tracing::debug!(
            shape = ?plan.shape,
            order = ?plan.order,
            source = ?plan.source,
            results = edges.len(),
            "Executed slice"
        );
        Ok(edges)
    }
}

/// Run `query` through one ordering, skipping classification and validation.
///
/// Both orderings return the same edges in the same order.
pub fn execute_ordered<N, T, S>(source: &S, query: &EdgeQuery<N, T>, order: SliceOrder) -> Vec<Edge<N, T>>
where
    N: NodeId,
    T: TimePoint,
    S: EdgeSource<N, T> + ?Sized,
{
    match order {
        SliceOrder::NodeFirst => node_first(source, query),
        SliceOrder::IntervalFirst => interval_first(source, query),
    }
}

/// Pairs the node constraint can match, in pair order.
fn candidate_pairs<N, T, S>(source: &S, constraint: Option<&NodeConstraint<N>>) -> Vec<NodePair<N>>
where
    N: NodeId,
    T: TimePoint,
    S: EdgeSource<N, T> + ?Sized,
{
    match constraint {
        None => source.interval_index().keys().cloned().collect(),
        Some(NodeConstraint::Between(u, v)) => vec![NodePair::new(u.clone(), v.clone())],
        Some(NodeConstraint::Incident(nodes)) => {
            let pairs: BTreeSet<NodePair<N>> = nodes
                .iter()
                .flat_map(|node| source.incident_pairs(node))
                .collect();
            pairs.into_iter().collect()
        }
    }
}

/// Restrict to candidate pairs, then look up each pair's bucket.
fn node_first<N, T, S>(source: &S, query: &EdgeQuery<N, T>) -> Vec<Edge<N, T>>
where
    N: NodeId,
    T: TimePoint,
    S: EdgeSource<N, T> + ?Sized,
{
    let index = source.interval_index();
    let exact = exact_target(query);
    let mut hits = Vec::new();
    for pair in candidate_pairs::<N, T, S>(source, query.nodes()) {
        match (query.is_exact(), exact) {
            (true, Some(interval)) => hits.extend(index.exact(Some(&pair), &interval)),
            (true, None) => {}
            (false, _) => hits.extend(index.query_overlap(Some(&pair), query.bounds())),
        }
    }
    materialize(source, hits)
}

/// Restrict to intervals via the global tree, then filter by node.
fn interval_first<N, T, S>(source: &S, query: &EdgeQuery<N, T>) -> Vec<Edge<N, T>>
where
    N: NodeId,
    T: TimePoint,
    S: EdgeSource<N, T> + ?Sized,
{
    let index = source.interval_index();
    let mut hits = match (query.is_exact(), exact_target(query)) {
        (true, Some(interval)) => index.exact(None, &interval),
        (true, None) => Vec::new(),
        (false, _) => index.query_overlap(None, query.bounds()),
    };
    if let Some(constraint) = query.nodes() {
        hits.retain(|(pair, _)| constraint.admits(pair));
    }
    hits.sort();
    materialize(source, hits)
}

/// The interval an exact query matches. `None` when the bounds do not form one.
fn exact_target<N: NodeId, T: TimePoint>(query: &EdgeQuery<N, T>) -> Option<Interval<T>> {
    query.bounds().as_interval()
}

fn materialize<N, T, S>(source: &S, hits: Vec<(NodePair<N>, Interval<T>)>) -> Vec<Edge<N, T>>
where
    N: NodeId,
    T: TimePoint,
    S: EdgeSource<N, T> + ?Sized,
{
    hits.iter()
        .filter_map(|(pair, interval)| source.materialize(pair, interval))
        .collect()
}
