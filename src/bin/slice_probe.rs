//! Slice Probe Binary
//!
//! Builds a random interval graph, trains the strategy selector on it and
//! runs a batch of compound slices, logging which ordering the planner chose
//! and how long each took.
//!
//! ## Configuration
//!
//! Environment variables:
//! - `PROBE_NODES`: Number of nodes (default: 500)
//! - `PROBE_EDGES`: Number of edges (default: 20000)
//! - `PROBE_SAMPLES`: Selector training samples (default: 200)
//! - `PROBE_QUERIES`: Compound slices to run after training (default: 50)
//! - `PROBE_SEED`: RNG seed for graph and queries (default: 42)
//! - `RUST_LOG`: Log level filter (default: info)
//! - `LOG_FORMAT`: "json" for structured logs, "pretty" for development (default: json)
//!
//! ## Usage
//!
//! ```bash
//! PROBE_EDGES=100000 LOG_FORMAT=pretty cargo run --release --bin slice_probe
//! ```

use std::str::FromStr;
use std::time::Instant;

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{info, info_span, warn};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use dyngraph_kernel::{Attributes, DecisionSource, DynamicGraph, EdgeQuery, SliceOrder};

/// Time axis length of the generated graph.
const HORIZON: i64 = 100_000;

/// Initialize the tracing subscriber with JSON or pretty format
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "slice_probe=info,dyngraph_kernel=info".into());

    if log_format == "pretty" {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_span_events(FmtSpan::CLOSE)
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_current_span(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .flatten_event(true)
            )
            .init();
    }
}

/// Read `name` from the environment, falling back to `default`.
fn env_or<V: FromStr>(name: &str, default: V) -> V {
    match std::env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(variable = name, value = %raw, "Unparseable value, using default");
            default
        }),
        Err(_) => default,
    }
}

#[derive(Debug, Clone, Copy)]
struct ProbeConfig {
    nodes: u32,
    edges: usize,
    samples: usize,
    queries: usize,
    seed: u64,
}

impl ProbeConfig {
    fn from_env() -> Self {
        Self {
            nodes: env_or("PROBE_NODES", 500_u32).max(2),
            edges: env_or("PROBE_EDGES", 20_000),
            samples: env_or("PROBE_SAMPLES", 200),
            queries: env_or("PROBE_QUERIES", 50),
            seed: env_or("PROBE_SEED", 42),
        }
    }
}

fn build_graph(config: &ProbeConfig, rng: &mut ChaCha8Rng) -> dyngraph_kernel::Result<DynamicGraph<u32, i64>> {
    let mut graph = DynamicGraph::new();
    let mut added = 0;
    for _ in 0..config.edges.saturating_mul(2) {
        if added == config.edges {
            break;
        }
        let u = rng.gen_range(0..config.nodes);
        let v = rng.gen_range(0..config.nodes);
        let begin = rng.gen_range(0..HORIZON - 1);
        let end = rng.gen_range(begin + 1..=(begin + HORIZON / 20).min(HORIZON));
        if graph.add_edge(u, v, begin, end, Attributes::new())? {
            added += 1;
        }
    }
    Ok(graph)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let version = env!("CARGO_PKG_VERSION");
    let config = ProbeConfig::from_env();
    info!(version = version, config = ?config, "Starting slice probe");

    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);

    let build_start = Instant::now();
    let mut graph = build_graph(&config, &mut rng)?;
    info!(
        nodes = graph.number_of_nodes(),
        edges = graph.number_of_edges(),
        span = ?graph.interval(),
        latency_ms = build_start.elapsed().as_millis() as u64,
        fingerprint = %graph.fingerprint()?,
        "Graph built"
    );

    let report = graph.train_selector(config.samples)?;
    info!(
        samples = report.samples,
        node_first_wins = report.node_first_wins,
        trained_at = %report.trained_at,
        "Selector ready"
    );

    let nodes = graph.nodes();
    let mut predicted = 0usize;
    let mut fallbacks = 0usize;
    let mut interval_first = 0usize;
    let probe_start = Instant::now();

    for i in 0..config.queries {
        let span = info_span!("probe_query", index = i);
        let _guard = span.enter();

        let picks = rng.gen_range(1..=(nodes.len() / 4).max(1));
        let picked: Vec<u32> = nodes.choose_multiple(&mut rng, picks).copied().collect();
        let width = rng.gen_range(1..=HORIZON / 2);
        let begin = rng.gen_range(0..=HORIZON - width);
        let query = EdgeQuery::all().incident_to(picked).during(begin, begin + width);

        let plan = graph.explain(&query)?;
        match plan.source {
            DecisionSource::Selector => predicted += 1,
            DecisionSource::Fallback(_) => fallbacks += 1,
            DecisionSource::SingleFilter | DecisionSource::Fixed => {}
        }
        if plan.order == Some(SliceOrder::IntervalFirst) {
            interval_first += 1;
        }

        let started = Instant::now();
        let edges = graph.edges(&query)?;
        info!(
            nodes = picks,
            width = width,
            order = ?plan.order,
            source = ?plan.source,
            results = edges.len(),
            latency_us = started.elapsed().as_micros() as u64,
            "Slice executed"
        );
    }

    info!(
        queries = config.queries,
        predicted = predicted,
        fallbacks = fallbacks,
        interval_first = interval_first,
        latency_ms = probe_start.elapsed().as_millis() as u64,
        "Probe complete"
    );
    Ok(())
}
