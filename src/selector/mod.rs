//! Predictive strategy selection for compound slices.
//!
//! A selector looks at the shape of the graph and of one query and predicts
//! which ordering answers it faster:
//!
//! ```text
//! SliceFeatures ──▶ StrategySelector::predict_detailed ──▶ Prediction
//!      ▲                                                    │
//!      │ observe(source, query)                             ▼
//!  EdgeSource + EdgeQuery                         SlicePlanner picks order
//! ```
//!
//! Selectors are trained on [`TrainingSample`]s, which [`training`] collects
//! by timing both orderings on synthetic queries. An untrained selector, or
//! one asked about a query unlike anything it was trained on, reports a
//! [`FallbackReason`] and the planner uses its configured default.

pub mod linear;
pub mod training;

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::store::EdgeSource;
use crate::types::{EdgeQuery, NodeId, SliceOrder, TimePoint};

pub use linear::LinearCostSelector;
pub use training::{collect_samples, TrainingReport};

/// Error type for selector training.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectorError {
    /// Training needs at least one edge.
    #[error("Cannot train a selector on a graph without edges")]
    EmptyGraph,
    /// The graph's time span has no usable width.
    #[error("Graph time span is degenerate: {0}")]
    DegenerateSpan(String),
    /// No usable training sample was collected or supplied.
    #[error("No training samples available")]
    NoSamples,
    /// The regression system could not be solved.
    #[error("Cost regression is singular for {0}")]
    Singular(SliceOrder),
}

/// Graph and query shape seen by a selector.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SliceFeatures {
    /// Stored edges in the graph.
    pub edge_count: usize,
    /// Mean edge interval length over the graph's time span.
    pub mean_span_fraction: f64,
    /// Share of the graph's nodes named by the query.
    pub node_fraction: f64,
    /// Width of the query window, clipped to the graph span, over that span.
    pub interval_fraction: f64,
}

impl SliceFeatures {
    /// Measure `query` against the current state of `source`.
    ///
    /// Fractions are 0 for an empty graph. Missing query bounds extend to
    /// the graph span.
    pub fn observe<N, T, S>(source: &S, query: &EdgeQuery<N, T>) -> Self
    where
        N: NodeId,
        T: TimePoint,
        S: EdgeSource<N, T> + ?Sized,
    {
        let index = source.interval_index();
        let node_count = source.node_count();
        let node_fraction = match query.nodes() {
            Some(constraint) if node_count > 0 => {
                let present = constraint
                    .named_nodes()
                    .into_iter()
                    .filter(|node| source.contains_node(node))
                    .count();
                present as f64 / node_count as f64
            }
            _ => 0.0,
        };

        let Some((first, last)) = index.span() else {
            return Self {
                edge_count: 0,
                node_fraction,
                ..Self::default()
            };
        };
        let (lo, hi) = (first.as_f64(), last.as_f64());
        let width = hi - lo;
        if !(width.is_finite() && width > 0.0) {
            return Self {
                edge_count: index.len(),
                node_fraction,
                ..Self::default()
            };
        }

        let bounds = query.bounds();
        let begin = bounds.begin.map_or(lo, |t| t.as_f64().max(lo));
        let end = bounds.end.map_or(hi, |t| t.as_f64().min(hi));

        Self {
            edge_count: index.len(),
            mean_span_fraction: index.mean_interval_span() / width,
            node_fraction,
            interval_fraction: ((end - begin) / width).clamp(0.0, 1.0),
        }
    }
}

/// Why a selector declined to predict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    /// The selector has never been trained.
    Untrained,
    /// The features lie outside what the selector was trained on.
    OutOfEnvelope,
}

/// A selector's answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prediction {
    /// Predicted cheaper ordering (`NodeFirst` when falling back).
    pub order: SliceOrder,
    /// Set when the prediction is a fallback rather than a model output.
    pub fallback: Option<FallbackReason>,
}

impl Prediction {
    /// A model-backed prediction.
    pub fn predicted(order: SliceOrder) -> Self {
        Self { order, fallback: None }
    }

    /// The default ordering, flagged with `reason`.
    pub fn fallback(reason: FallbackReason) -> Self {
        Self {
            order: SliceOrder::NodeFirst,
            fallback: Some(reason),
        }
    }
}

/// One measured synthetic query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainingSample {
    /// Features of the query.
    pub features: SliceFeatures,
    /// Wall-clock cost of the node-first pipeline.
    pub node_first_nanos: u64,
    /// Wall-clock cost of the interval-first pipeline.
    pub interval_first_nanos: u64,
}

impl TrainingSample {
    /// The ordering that was faster. Ties go to `NodeFirst`.
    pub fn winner(&self) -> SliceOrder {
        if self.interval_first_nanos < self.node_first_nanos {
            SliceOrder::IntervalFirst
        } else {
            SliceOrder::NodeFirst
        }
    }
}

/// Pluggable ordering predictor.
pub trait StrategySelector: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Whether `train` has succeeded at least once.
    fn is_trained(&self) -> bool;

    /// Predict, reporting when the answer is a fallback.
    fn predict_detailed(&self, features: &SliceFeatures) -> Prediction;

    /// Predict the cheaper ordering.
    fn predict(&self, features: &SliceFeatures) -> SliceOrder {
        self.predict_detailed(features).order
    }

    /// Replace the model with one fitted to `samples`.
    ///
    /// On error the previous model, if any, is kept.
    fn train(&mut self, samples: &[TrainingSample]) -> Result<(), SelectorError>;
}

/// A selector shared between planners.
pub type SharedSelector = Arc<RwLock<dyn StrategySelector>>;

/// Wrap a selector for sharing.
pub fn share<S: StrategySelector + 'static>(selector: S) -> SharedSelector {
    Arc::new(RwLock::new(selector))
}
