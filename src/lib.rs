//! # dyngraph-kernel
//!
//! Interval-indexed dynamic graphs with planned compound slicing.
//!
//! Edges exist during half-open time intervals `[begin, end)`. The kernel
//! answers one question:
//!
//! > Which edges touch these nodes during this window?
//!
//! ## Core Contract
//!
//! 1. Store undirected edges tagged with intervals, unique per `(pair, interval)`
//! 2. Answer node, interval and compound slices in canonical `(pair, begin, end)` order
//! 3. For compound slices, pick node-first or interval-first filtering,
//!    optionally guided by a trained selector
//!
//! ## Architecture
//!
//! ```text
//! EdgeQuery → SlicePlanner ──(compound?)──▶ StrategySelector
//!                  │                              │
//!                  ▼                              ▼
//!          InMemoryEdgeStore        NodeFirst | IntervalFirst
//!                  │
//!          IntervalIndex (global AVL tree + per-pair buckets)
//! ```
//!
//! ## Determinism Guarantees
//!
//! - Same graph state + same query → identical result vector
//! - Both compound orderings return the same edges in the same order
//! - Same graph state → identical fingerprint, whatever the insertion order

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod types;
pub mod index;
pub mod store;
pub mod policy;
pub mod planner;
pub mod selector;
pub mod graph;
pub mod shared;
pub mod canonical;

// Re-exports
pub use types::{
    Attributes, Edge, EdgeQuery, FloatTime, Interval, IntervalError, NodeConstraint, NodeId,
    NodePair, QueryError, QueryShape, SliceOrder, TimeBounds, TimePoint,
};
pub use index::{IntervalIndex, IntervalTree, DEFAULT_BUCKET_SCAN_LIMIT};
pub use store::{EdgeSource, GraphError, InMemoryEdgeStore};
pub use policy::{PlannerConfig, SelectorConfig};
pub use planner::{execute_ordered, DecisionSource, SlicePlan, SlicePlanner};
pub use selector::{
    collect_samples, share, FallbackReason, LinearCostSelector, Prediction, SelectorError,
    SharedSelector, SliceFeatures, StrategySelector, TrainingReport, TrainingSample,
};
pub use graph::{DynamicGraph, GraphFingerprint};
pub use shared::SharedGraph;
pub use canonical::{to_canonical_bytes, canonical_hash, canonical_hash_hex};

/// Result type for graph operations.
pub type Result<T> = std::result::Result<T, GraphError>;

/// Schema version for fingerprinted graph snapshots.
/// Increment on breaking changes to any hashed type.
pub const KERNEL_SCHEMA_VERSION: &str = "1.0.0";

/// Default planner policy version identifier.
pub const DEFAULT_PLANNER_VERSION: &str = "slice_planner_v1";
