//! Golden tests for the dynamic graph kernel.
//!
//! These tests verify determinism and correctness of slicing through the
//! public API.

use dyngraph_kernel::{
    share, Attributes, DecisionSource, DynamicGraph, Edge, EdgeQuery, FallbackReason,
    FloatTime, GraphError, IntervalError, LinearCostSelector, NodeId, PlannerConfig, Prediction,
    QueryError, SelectorConfig, SelectorError, SharedGraph, SliceFeatures, SliceOrder, StrategySelector,
    TrainingSample, execute_ordered,
};
use serde_json::json;

// ─────────────────────────────────────────────────────────────────────────────
// Test Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn scenario() -> DynamicGraph<u32, i64> {
    let mut g = DynamicGraph::new();
    g.add_edge(1, 2, 1, 4, Attributes::new()).unwrap();
    g.add_edge(1, 2, 2, 6, Attributes::new()).unwrap();
    g.add_edge(1, 3, 6, 9, Attributes::new()).unwrap();
    g.add_edge(2, 3, 2, 5, Attributes::new()).unwrap();
    g
}

fn tuples<N: NodeId>(edges: &[Edge<N, i64>]) -> Vec<(N, N, i64, i64)> {
    edges.iter().map(Edge::as_tuple).collect()
}

/// A ring with twenty short edges per link plus one long chord per node.
fn build_mixed_graph(nodes: u32) -> DynamicGraph<u32, i64> {
    let mut g = DynamicGraph::new();
    for u in 0..nodes {
        let v = (u + 1) % nodes;
        for k in 0..20_i64 {
            g.add_edge(u, v, k * 50, k * 50 + 30, Attributes::new()).unwrap();
        }
        g.add_edge(u, (u * 3 + 7) % nodes, 0, 1_000, Attributes::new()).unwrap();
    }
    g
}

struct Always(SliceOrder);

impl StrategySelector for Always {
    fn name(&self) -> &str {
        "always"
    }

    fn is_trained(&self) -> bool {
        true
    }

    fn predict_detailed(&self, _features: &SliceFeatures) -> Prediction {
        Prediction::predicted(self.0)
    }

    fn train(&mut self, _samples: &[TrainingSample]) -> Result<(), SelectorError> {
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Scenario
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_scenario_counts() {
    let g = scenario();
    assert_eq!(g.number_of_nodes(), 3);
    assert_eq!(g.number_of_edges(), 4);
    assert_eq!(g.interval(), Some((1, 9)));
}

#[test]
fn test_scenario_begin_only() {
    let g = scenario();
    let got = g.edges(&EdgeQuery::all().begin(5)).unwrap();
    let mut as_set = tuples(&got);
    as_set.sort();
    assert_eq!(as_set, vec![(1, 2, 2, 6), (1, 3, 6, 9)]);
}

#[test]
fn test_scenario_pair_only() {
    let g = scenario();
    let got = g.edges(&EdgeQuery::all().between(1, 2)).unwrap();
    assert_eq!(tuples(&got), vec![(1, 2, 1, 4), (1, 2, 2, 6)]);
}

#[test]
fn test_unconstrained_is_canonical() {
    let g = scenario();
    let got = g.edges(&EdgeQuery::all()).unwrap();
    assert_eq!(
        tuples(&got),
        vec![(1, 2, 1, 4), (1, 2, 2, 6), (1, 3, 6, 9), (2, 3, 2, 5)]
    );
    assert_eq!(got, g.all_edges());
}

#[test]
fn test_half_open_boundary() {
    let mut g: DynamicGraph<u32, i64> = DynamicGraph::new();
    g.add_edge(1, 2, 1, 4, Attributes::new()).unwrap();
    assert!(!g.has_edge(1, 2, Some(4), None, false).unwrap());
    assert!(g.has_edge(1, 2, Some(3), Some(4), false).unwrap());
    assert!(!g.has_edge(1, 2, None, Some(1), false).unwrap());
}

// ─────────────────────────────────────────────────────────────────────────────
// Mutation semantics
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_idempotent_insertion() {
    let mut g = scenario();
    let before = g.fingerprint().unwrap();
    assert!(!g.add_edge(2, 1, 1, 4, Attributes::new()).unwrap());
    assert_eq!(g.number_of_edges(), 4);
    assert_eq!(g.fingerprint().unwrap(), before);
}

#[test]
fn test_removal_exactness() {
    let mut g = scenario();
    let before = g.fingerprint().unwrap();

    assert!(!g.remove_edge(1, 2, Some(1), Some(5), true).unwrap());
    assert!(matches!(
        g.remove_edge(1, 2, Some(1), None, true),
        Err(GraphError::Query(QueryError::ExactMatchNeedsBounds))
    ));
    assert!(matches!(
        g.has_edge(1, 2, None, Some(4), true),
        Err(GraphError::Query(QueryError::ExactMatchNeedsBounds))
    ));
    assert_eq!(g.fingerprint().unwrap(), before);

    assert!(g.remove_edge(1, 2, Some(1), Some(4), true).unwrap());
    assert!(!g.has_edge(1, 2, Some(1), Some(4), true).unwrap());
    assert_eq!(g.number_of_edges(), 3);
}

#[test]
fn test_ambiguous_removal_takes_earliest() {
    let mut g = scenario();
    assert!(g.remove_edge(2, 1, Some(2), Some(4), false).unwrap());
    let left = g.edges(&EdgeQuery::all().between(1, 2)).unwrap();
    assert_eq!(tuples(&left), vec![(1, 2, 2, 6)]);
}

#[test]
fn test_invalid_interval_rejected() {
    let mut g: DynamicGraph<u32, i64> = DynamicGraph::new();
    for (b, e) in [(5, 5), (6, 2)] {
        let err = g.add_edge(1, 2, b, e, Attributes::new()).unwrap_err();
        assert!(matches!(err, GraphError::Interval(IntervalError::InvalidInterval { .. })));
    }
    assert_eq!(g.number_of_edges(), 0);
    assert_eq!(g.number_of_nodes(), 0);
}

#[test]
fn test_float_time_rejects_nan() {
    let mut g: DynamicGraph<&str, FloatTime> = DynamicGraph::new();
    assert!(g
        .add_edge("a", "b", FloatTime(0.5), FloatTime(1.5), Attributes::new())
        .unwrap());
    let err = g
        .add_edge("a", "b", FloatTime(f64::NAN), FloatTime(1.0), Attributes::new())
        .unwrap_err();
    assert!(matches!(err, GraphError::Interval(IntervalError::Incomparable(_))));
    assert!(g.has_edge("b", "a", Some(FloatTime(1.0)), None, false).unwrap());
}

#[test]
fn test_absent_nodes_yield_empty() {
    let g = scenario();
    assert!(g.edges(&EdgeQuery::all().node(99)).unwrap().is_empty());
    assert!(g.edges(&EdgeQuery::all().between(1, 99).during(0, 10)).unwrap().is_empty());
    assert_eq!(g.degree(&99, None, None).unwrap(), 0);
}

#[test]
fn test_attributes_round_trip_verbatim() {
    let mut g: DynamicGraph<String, i64> = DynamicGraph::new();
    let mut attrs = Attributes::new();
    attrs.insert("label".into(), json!({"nested": [1, 2, 3]}));
    g.add_edge("x".into(), "y".into(), 0, 10, attrs.clone()).unwrap();

    let edges = g.edges(&EdgeQuery::all().node("y".to_string())).unwrap();
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].attrs, attrs);

    let encoded = serde_json::to_string(&edges[0]).unwrap();
    let decoded: Edge<String, i64> = serde_json::from_str(&encoded).unwrap();
    assert_eq!(decoded, edges[0]);
}

#[test]
fn test_graph_of_graphs() {
    let mut g: DynamicGraph<Vec<(u32, u32)>, i64> = DynamicGraph::new();
    g.add_edge(vec![(1, 2)], vec![(2, 3), (3, 4)], 0, 5, Attributes::new())
        .unwrap();
    assert_eq!(g.number_of_nodes(), 2);
    assert!(g.has_node(&vec![(1, 2)]));
}

// ─────────────────────────────────────────────────────────────────────────────
// Planner determinism
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_orderings_agree_on_mixed_graph() {
    let g = build_mixed_graph(30);
    let queries = [
        EdgeQuery::all().incident_to([0, 5, 17]).during(100, 400),
        EdgeQuery::all().incident_to(0..15).begin(900),
        EdgeQuery::all().between(3, 4).end(120),
        EdgeQuery::all().between(3, 4).during(100, 130).exact(true),
        EdgeQuery::all().incident_to([2]).during(0, 1_000).exact(true),
    ];
    for query in &queries {
        let node_first = execute_ordered(g.store(), query, SliceOrder::NodeFirst);
        let interval_first = execute_ordered(g.store(), query, SliceOrder::IntervalFirst);
        assert_eq!(node_first, interval_first, "query {query:?}");
        assert_eq!(g.edges(query).unwrap(), node_first);
    }
}

#[test]
fn test_repeated_queries_identical() {
    let g = build_mixed_graph(20);
    let query = EdgeQuery::all().incident_to([1, 2, 3]).during(250, 600);
    let first = g.edges(&query).unwrap();
    for _ in 0..5 {
        assert_eq!(g.edges(&query).unwrap(), first);
    }
}

#[test]
fn test_forced_orders_match() {
    let g = build_mixed_graph(25);
    let query = EdgeQuery::all().incident_to([4, 9]).during(300, 700);

    let mut forced_node = g.clone();
    forced_node.attach_selector(share(Always(SliceOrder::NodeFirst)));
    let mut forced_interval = g.clone();
    forced_interval.attach_selector(share(Always(SliceOrder::IntervalFirst)));

    assert_eq!(
        forced_interval.explain(&query).unwrap().order,
        Some(SliceOrder::IntervalFirst)
    );
    assert_eq!(
        forced_node.edges(&query).unwrap(),
        forced_interval.edges(&query).unwrap()
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Selector
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_untrained_selector_falls_back() {
    let mut g = scenario();
    g.attach_selector(share(LinearCostSelector::default()));
    let plan = g.explain(&EdgeQuery::all().node(1).during(0, 5)).unwrap();
    assert_eq!(plan.order, Some(SliceOrder::NodeFirst));
    assert_eq!(plan.source, DecisionSource::Fallback(FallbackReason::Untrained));
}

#[test]
fn test_fallback_uses_configured_default() {
    let config = PlannerConfig::new(SliceOrder::IntervalFirst, 16, true);
    let mut g: DynamicGraph<u32, i64> = DynamicGraph::with_config(config, SelectorConfig::default());
    g.add_edge(1, 2, 0, 5, Attributes::new()).unwrap();
    g.attach_selector(share(LinearCostSelector::default()));
    let plan = g.explain(&EdgeQuery::all().node(1).end(3)).unwrap();
    assert_eq!(plan.order, Some(SliceOrder::IntervalFirst));
}

#[test]
fn test_training_then_out_of_envelope() {
    let mut g = build_mixed_graph(40);
    let report = g.train_selector(40).unwrap();
    assert_eq!(report.samples, 40);
    assert!(report.node_first_wins <= report.samples);

    // Training draws at most half the nodes; naming all of them is far outside.
    let everything = EdgeQuery::all().incident_to(0..40).during(0, 1_000);
    let plan = g.explain(&everything).unwrap();
    assert_eq!(plan.source, DecisionSource::Fallback(FallbackReason::OutOfEnvelope));
    assert_eq!(plan.order, Some(SliceOrder::NodeFirst));
}

#[test]
fn test_training_empty_graph_fails() {
    let mut g: DynamicGraph<u32, i64> = DynamicGraph::new();
    let err = g.train_selector(10).unwrap_err();
    assert!(matches!(err, GraphError::Selector(SelectorError::EmptyGraph)));
    assert!(g.selector().is_none());
}

#[test]
fn test_shared_selector_across_graphs() {
    let selector = share(LinearCostSelector::default());
    let mut a = build_mixed_graph(30);
    let mut b = build_mixed_graph(30);
    a.attach_selector(selector.clone());
    b.attach_selector(selector.clone());

    a.train_selector(20).unwrap();
    assert!(b.selector().is_some_and(|s| s.read().is_trained()));
}

#[test]
fn test_shared_graph_handle() {
    let shared = SharedGraph::from(scenario());
    let reader = shared.clone();
    shared.add_edge(3, 4, 7, 8, Attributes::new()).unwrap();
    assert_eq!(reader.edges(&EdgeQuery::all().node(4)).unwrap().len(), 1);
    assert!(shared.remove_edge(4, 3, Some(7), Some(8), true).unwrap());
    assert_eq!(reader.read().number_of_edges(), 4);
}
