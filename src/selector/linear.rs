//! Least-squares cost regression per ordering.
//!
//! For each ordering the selector fits
//!
//! ```text
//! cost ≈ w0 + w1 · node_fraction + w2 · interval_fraction
//! ```
//!
//! by ridge-regularized normal equations, then predicts the ordering with
//! the smaller estimated cost.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::policy::SelectorConfig;
use crate::types::SliceOrder;

use super::{FallbackReason, Prediction, SelectorError, SliceFeatures, StrategySelector, TrainingSample};

const FEATURE_DIM: usize = 3;
const PIVOT_EPSILON: f64 = 1e-12;

/// Feature ranges seen in training.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Smallest and largest node fraction.
    pub node_fraction: (f64, f64),
    /// Smallest and largest interval fraction.
    pub interval_fraction: (f64, f64),
    /// Edge count at training time.
    pub edge_count: usize,
}

impl Envelope {
    fn of(samples: &[TrainingSample]) -> Self {
        let mut envelope = Self {
            node_fraction: (f64::INFINITY, f64::NEG_INFINITY),
            interval_fraction: (f64::INFINITY, f64::NEG_INFINITY),
            edge_count: 0,
        };
        for sample in samples {
            let f = &sample.features;
            envelope.node_fraction.0 = envelope.node_fraction.0.min(f.node_fraction);
            envelope.node_fraction.1 = envelope.node_fraction.1.max(f.node_fraction);
            envelope.interval_fraction.0 = envelope.interval_fraction.0.min(f.interval_fraction);
            envelope.interval_fraction.1 = envelope.interval_fraction.1.max(f.interval_fraction);
            envelope.edge_count = envelope.edge_count.max(f.edge_count);
        }
        envelope
    }

    /// Whether `features` lie within the envelope widened by the config tolerances.
    pub fn admits(&self, features: &SliceFeatures, config: &SelectorConfig) -> bool {
        let within = |(lo, hi): (f64, f64), x: f64| {
            x >= lo - config.envelope_margin && x <= hi + config.envelope_margin
        };
        let trained = self.edge_count as f64;
        let edges = features.edge_count as f64;
        within(self.node_fraction, features.node_fraction)
            && within(self.interval_fraction, features.interval_fraction)
            && edges >= trained / config.edge_count_ratio
            && edges <= trained * config.edge_count_ratio
    }
}

/// A fitted model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostModel {
    /// Weights of the node-first cost line.
    pub node_first: [f64; FEATURE_DIM],
    /// Weights of the interval-first cost line.
    pub interval_first: [f64; FEATURE_DIM],
    /// Training envelope.
    pub envelope: Envelope,
    /// Samples the model was fitted to.
    pub sample_count: usize,
    /// When the model was fitted.
    pub trained_at: DateTime<Utc>,
}

impl CostModel {
    /// Estimated cost of `order` in nanoseconds.
    pub fn estimate(&self, order: SliceOrder, features: &SliceFeatures) -> f64 {
        let weights = match order {
            SliceOrder::NodeFirst => &self.node_first,
            SliceOrder::IntervalFirst => &self.interval_first,
        };
        dot(weights, &design_row(features))
    }
}

/// Linear cost-regression selector.
#[derive(Debug, Clone, Default)]
pub struct LinearCostSelector {
    config: SelectorConfig,
    model: Option<CostModel>,
}

impl LinearCostSelector {
    /// Create an untrained selector.
    pub fn new(config: SelectorConfig) -> Self {
        Self { config, model: None }
    }

    /// Selector settings.
    pub fn config(&self) -> &SelectorConfig {
        &self.config
    }

    /// The fitted model, if trained.
    pub fn model(&self) -> Option<&CostModel> {
        self.model.as_ref()
    }
}

impl StrategySelector for LinearCostSelector {
    fn name(&self) -> &str {
        "linear_cost"
    }

    fn is_trained(&self) -> bool {
        self.model.is_some()
    }

    fn predict_detailed(&self, features: &SliceFeatures) -> Prediction {
        let Some(model) = &self.model else {
            return Prediction::fallback(FallbackReason::Untrained);
        };
        if !model.envelope.admits(features, &self.config) {
            return Prediction::fallback(FallbackReason::OutOfEnvelope);
        }
        let node_first = model.estimate(SliceOrder::NodeFirst, features);
        let interval_first = model.estimate(SliceOrder::IntervalFirst, features);
        if interval_first < node_first {
            Prediction::predicted(SliceOrder::IntervalFirst)
        } else {
            Prediction::predicted(SliceOrder::NodeFirst)
        }
    }

    fn train(&mut self, samples: &[TrainingSample]) -> Result<(), SelectorError> {
        if samples.is_empty() {
            return Err(SelectorError::NoSamples);
        }
        let node_first = fit(samples, self.config.ridge, SliceOrder::NodeFirst)?;
        let interval_first = fit(samples, self.config.ridge, SliceOrder::IntervalFirst)?;
        self.model = Some(CostModel {
            node_first,
            interval_first,
            envelope: Envelope::of(samples),
            sample_count: samples.len(),
            trained_at: Utc::now(),
        });
        Ok(())
    }
}

fn design_row(features: &SliceFeatures) -> [f64; FEATURE_DIM] {
    [1.0, features.node_fraction, features.interval_fraction]
}

fn dot(a: &[f64; FEATURE_DIM], b: &[f64; FEATURE_DIM]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Solve `(XᵀX + ridge·D) w = Xᵀy`, with `D` leaving the intercept unpenalized.
fn fit(samples: &[TrainingSample], ridge: f64, order: SliceOrder) -> Result<[f64; FEATURE_DIM], SelectorError> {
    let mut gram = [[0.0; FEATURE_DIM]; FEATURE_DIM];
    let mut rhs = [0.0; FEATURE_DIM];
    for sample in samples {
        let row = design_row(&sample.features);
        let cost = match order {
            SliceOrder::NodeFirst => sample.node_first_nanos,
            SliceOrder::IntervalFirst => sample.interval_first_nanos,
        } as f64;
        for i in 0..FEATURE_DIM {
            rhs[i] += row[i] * cost;
            for j in 0..FEATURE_DIM {
                gram[i][j] += row[i] * row[j];
            }
        }
    }
    for (i, gram_row) in gram.iter_mut().enumerate().skip(1) {
        gram_row[i] += ridge;
    }
    solve(gram, rhs).ok_or(SelectorError::Singular(order))
}

/// Gaussian elimination with partial pivoting.
fn solve(
    mut a: [[f64; FEATURE_DIM]; FEATURE_DIM],
    mut b: [f64; FEATURE_DIM],
) -> Option<[f64; FEATURE_DIM]> {
    for col in 0..FEATURE_DIM {
        let pivot = (col..FEATURE_DIM).max_by(|&x, &y| a[x][col].abs().total_cmp(&a[y][col].abs()))?;
        if a[pivot][col].abs() < PIVOT_EPSILON {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);
        for row in col + 1..FEATURE_DIM {
            let factor = a[row][col] / a[col][col];
            for k in col..FEATURE_DIM {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }
    let mut x = [0.0; FEATURE_DIM];
    for row in (0..FEATURE_DIM).rev() {
        let tail: f64 = (row + 1..FEATURE_DIM).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    x.iter().all(|w| w.is_finite()).then_some(x)
}
