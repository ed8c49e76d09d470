//! Planner and selector policies.

pub mod planner;
pub mod selector;

pub use planner::PlannerConfig;
pub use selector::SelectorConfig;

/// Quantization factor for float normalization.
/// Floats are multiplied by this value and rounded to i64 before hashing.
const FLOAT_QUANTIZATION_FACTOR: f64 = 1_000_000.0;

/// Quantize a float to an i64 for deterministic hashing.
pub(crate) fn quantize_float(value: f64) -> i64 {
    (value * FLOAT_QUANTIZATION_FACTOR).round() as i64
}
