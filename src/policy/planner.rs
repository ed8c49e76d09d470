//! Compound-slice planner policy.

use serde::{Deserialize, Serialize};

use crate::canonical::canonical_hash_hex;
use crate::index::DEFAULT_BUCKET_SCAN_LIMIT;
use crate::types::SliceOrder;
use crate::DEFAULT_PLANNER_VERSION;

/// Planner configuration.
///
/// ## Parameters
///
/// - `default_order`: ordering for compound slices when no selector is
///   attached, the selector is disabled, or the selector falls back
/// - `bucket_scan_limit`: per-pair bucket size above which the pair gets its
///   own interval tree
/// - `use_selector`: consult an attached selector for compound slices
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Policy version identifier.
    pub version: String,
    /// Ordering used whenever no prediction is available.
    pub default_order: SliceOrder,
    /// Maximum intervals per pair scanned linearly.
    pub bucket_scan_limit: usize,
    /// Whether an attached selector is consulted.
    pub use_selector: bool,
}

impl PlannerConfig {
    /// Create a config with custom parameters. `bucket_scan_limit` is at least 1.
    pub fn new(default_order: SliceOrder, bucket_scan_limit: usize, use_selector: bool) -> Self {
        Self {
            version: DEFAULT_PLANNER_VERSION.to_string(),
            default_order,
            bucket_scan_limit: bucket_scan_limit.max(1),
            use_selector,
        }
    }

    /// Always run compound slices with `order`, ignoring any selector.
    pub fn fixed(order: SliceOrder) -> Self {
        Self::new(order, DEFAULT_BUCKET_SCAN_LIMIT, false)
    }

    /// Get the policy ID.
    pub fn policy_id(&self) -> &str {
        &self.version
    }

    /// Hash of the configuration.
    pub fn params_hash(&self) -> Result<String, serde_json::Error> {
        canonical_hash_hex(self)
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self::new(SliceOrder::NodeFirst, DEFAULT_BUCKET_SCAN_LIMIT, true)
    }
}
