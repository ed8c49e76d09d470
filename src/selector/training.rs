//! Synthetic training-sample collection.
//!
//! Each sample draws a random node subset and a random window inside the
//! graph span, then times both compound orderings on the resulting query.

use std::hint::black_box;
use std::time::Instant;

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::planner::execute_ordered;
use crate::policy::SelectorConfig;
use crate::store::EdgeSource;
use crate::types::{EdgeQuery, NodeId, SliceOrder, TimePoint};

use super::{SelectorError, SliceFeatures, TrainingSample};

/// Draws attempted per requested sample before giving up.
const ATTEMPTS_PER_SAMPLE: usize = 4;
const MIN_FRACTION: f64 = 0.01;

/// Summary of one training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    /// Samples requested.
    pub requested: usize,
    /// Samples collected and fitted.
    pub samples: usize,
    /// Samples where node-first was faster or tied.
    pub node_first_wins: usize,
    /// Mean node-first cost.
    pub mean_node_first_nanos: f64,
    /// Mean interval-first cost.
    pub mean_interval_first_nanos: f64,
    /// When the selector finished training.
    pub trained_at: DateTime<Utc>,
}

impl TrainingReport {
    /// Summarize `samples`.
    pub fn summarize(requested: usize, samples: &[TrainingSample]) -> Self {
        let n = samples.len().max(1) as f64;
        Self {
            requested,
            samples: samples.len(),
            node_first_wins: samples
                .iter()
                .filter(|s| s.winner() == SliceOrder::NodeFirst)
                .count(),
            mean_node_first_nanos: samples.iter().map(|s| s.node_first_nanos as f64).sum::<f64>() / n,
            mean_interval_first_nanos: samples.iter().map(|s| s.interval_first_nanos as f64).sum::<f64>() / n,
            trained_at: Utc::now(),
        }
    }
}

/// Time both orderings on `sample_count` synthetic compound queries.
///
/// Reads `source` only. Deterministic in the queries it issues for a given
/// `config.seed`; the measured costs are wall-clock and vary between runs.
pub fn collect_samples<N, T, S>(
    source: &S,
    config: &SelectorConfig,
    sample_count: usize,
) -> Result<Vec<TrainingSample>, SelectorError>
where
    N: NodeId,
    T: TimePoint,
    S: EdgeSource<N, T> + ?Sized,
{
    let index = source.interval_index();
    let Some((first, last)) = index.span() else {
        return Err(SelectorError::EmptyGraph);
    };
    let (lo, hi) = (first.as_f64(), last.as_f64());
    let width = hi - lo;
    if !(width.is_finite() && width > 0.0) {
        return Err(SelectorError::DegenerateSpan(format!("[{first:?}, {last:?})")));
    }

    let nodes = source.node_ids();
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let mut samples = Vec::with_capacity(sample_count);
    let mut skipped = 0usize;

    for attempt in 0..sample_count.saturating_mul(ATTEMPTS_PER_SAMPLE) {
        if samples.len() == sample_count {
            break;
        }

        let node_share = rng.gen_range(MIN_FRACTION..=config.max_node_fraction.max(MIN_FRACTION));
        let picks = ((node_share * nodes.len() as f64).round() as usize).clamp(1, nodes.len());
        let picked: Vec<N> = nodes.choose_multiple(&mut rng, picks).cloned().collect();

        let window_share = rng.gen_range(MIN_FRACTION..=config.max_interval_fraction.max(MIN_FRACTION));
        let window = window_share * width;
        let start = rng.gen_range(lo..=(hi - window).max(lo));
        let (begin, end) = (T::from_f64(start), T::from_f64(start + window));
        if begin >= end {
            skipped += 1;
            continue;
        }

        let query = EdgeQuery::all().incident_to(picked).during(begin, end);
        let features = SliceFeatures::observe(source, &query);

        // Alternate which ordering runs first so neither always sees warm caches.
        let (node_first_nanos, interval_first_nanos) = if attempt % 2 == 0 {
            let n = time_order(source, &query, SliceOrder::NodeFirst);
            let i = time_order(source, &query, SliceOrder::IntervalFirst);
            (n, i)
        } else {
            let i = time_order(source, &query, SliceOrder::IntervalFirst);
            let n = time_order(source, &query, SliceOrder::NodeFirst);
            (n, i)
        };
        debug_assert_eq!(
            execute_ordered(source, &query, SliceOrder::NodeFirst),
            execute_ordered(source, &query, SliceOrder::IntervalFirst),
        );

        samples.push(TrainingSample {
            features,
            node_first_nanos,
            interval_first_nanos,
        });
    }

    if samples.len() < sample_count {
        tracing::warn!(
            requested = sample_count,
            collected = samples.len(),
            skipped,
            "Selector training collected fewer samples than requested"
        );
    }
    if samples.is_empty() {
        return Err(SelectorError::NoSamples);
    }
    Ok(samples)
}

fn time_order<N, T, S>(source: &S, query: &EdgeQuery<N, T>, order: SliceOrder) -> u64
where
    N: NodeId,
    T: TimePoint,
    S: EdgeSource<N, T> + ?Sized,
{
    let started = Instant::now();
    black_box(execute_ordered(source, black_box(query), order));
    started.elapsed().as_nanos().min(u128::from(u64::MAX)) as u64
}
