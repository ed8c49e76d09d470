//! Strategy selector policy.
//!
//! Floats are quantized to integers before hashing, matching the planner
//! policy, so identical settings always produce the same `params_hash`.

use serde::{Deserialize, Serialize};

use crate::canonical::canonical_hash_hex;

use super::quantize_float;

/// Selector training and prediction settings.
///
/// ## Parameters
///
/// - `envelope_margin`: how far (in fraction units) a query's node or
///   interval fraction may fall outside the range seen during training
///   before the selector refuses to extrapolate
/// - `edge_count_ratio`: the graph may grow or shrink by this factor
///   relative to its size at training time before predictions are refused
/// - `ridge`: L2 penalty on the non-intercept regression weights
/// - `seed`: RNG seed for synthetic training queries
/// - `max_node_fraction`, `max_interval_fraction`: upper limits of the
///   synthetic query shapes drawn during training
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectorConfig {
    /// Tolerance around the trained feature range.
    pub envelope_margin: f64,
    /// Allowed edge-count drift factor (>= 1).
    pub edge_count_ratio: f64,
    /// Ridge penalty.
    pub ridge: f64,
    /// Seed for synthetic query generation.
    pub seed: u64,
    /// Largest node fraction sampled (0, 1].
    pub max_node_fraction: f64,
    /// Largest interval-width fraction sampled (0, 1].
    pub max_interval_fraction: f64,
}

#[derive(Serialize)]
struct QuantizedSelectorParams {
    envelope_margin: i64,
    edge_count_ratio: i64,
    ridge: i64,
    seed: u64,
    max_node_fraction: i64,
    max_interval_fraction: i64,
}

impl SelectorConfig {
    /// Create a config, clamping every parameter into its valid range.
    pub fn new(
        envelope_margin: f64,
        edge_count_ratio: f64,
        ridge: f64,
        seed: u64,
        max_node_fraction: f64,
        max_interval_fraction: f64,
    ) -> Self {
        Self {
            envelope_margin: envelope_margin.clamp(0.0, 1.0),
            edge_count_ratio: edge_count_ratio.max(1.0),
            ridge: ridge.max(0.0),
            seed,
            max_node_fraction: max_node_fraction.clamp(0.01, 1.0),
            max_interval_fraction: max_interval_fraction.clamp(0.01, 1.0),
        }
    }

    /// Same settings with another seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Hash of the quantized parameters.
    pub fn params_hash(&self) -> Result<String, serde_json::Error> {
        canonical_hash_hex(&QuantizedSelectorParams {
            envelope_margin: quantize_float(self.envelope_margin),
            edge_count_ratio: quantize_float(self.edge_count_ratio),
            ridge: quantize_float(self.ridge),
            seed: self.seed,
            max_node_fraction: quantize_float(self.max_node_fraction),
            max_interval_fraction: quantize_float(self.max_interval_fraction),
        })
    }
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self::new(0.1, 4.0, 1e-6, 0x5eed_d15c, 0.5, 0.5)
    }
}
