//! Interval index over node pairs.
//!
//! Two views of the same set of `(pair, interval)` entries:
//!
//! ```text
//!  global:  IntervalTree<T, BTreeSet<pair>>   interval-first lookups
//!  buckets: BTreeMap<pair, PairBucket<T>>     node-first lookups
//! ```
//!
//! Both are updated on every mutation, so a query issued right after
//! `insert`/`remove` returns sees the new state.

pub mod tree;
mod bucket;

use std::collections::{BTreeMap, BTreeSet};

use crate::types::{Interval, TimeBounds, TimePoint};

use bucket::PairBucket;
pub use tree::IntervalTree;

/// Default number of intervals a pair bucket holds before it becomes a tree.
pub const DEFAULT_BUCKET_SCAN_LIMIT: usize = 16;

/// Interval index keyed by pair key `K`.
#[derive(Debug, Clone)]
pub struct IntervalIndex<K, T> {
    global: IntervalTree<T, BTreeSet<K>>,
    buckets: BTreeMap<K, PairBucket<T>>,
    len: usize,
    span_total: f64,
    bucket_scan_limit: usize,
}

impl<K: Ord + Clone, T: TimePoint> Default for IntervalIndex<K, T> {
    fn default() -> Self {
        Self::with_scan_limit(DEFAULT_BUCKET_SCAN_LIMIT)
    }
}

impl<K: Ord + Clone, T: TimePoint> IntervalIndex<K, T> {
    /// Create an empty index with the default scan limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty index whose pair buckets switch to trees above `limit` entries.
    pub fn with_scan_limit(limit: usize) -> Self {
        Self {
            global: IntervalTree::new(),
            buckets: BTreeMap::new(),
            len: 0,
            span_total: 0.0,
            bucket_scan_limit: limit.max(1),
        }
    }

    /// Total `(pair, interval)` entries.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of pairs with at least one interval.
    pub fn pair_count(&self) -> usize {
        self.buckets.len()
    }

    /// The configured scan limit.
    pub fn bucket_scan_limit(&self) -> usize {
        self.bucket_scan_limit
    }

    /// Insert an entry. Returns false if it already existed.
    pub fn insert(&mut self, key: K, interval: Interval<T>) -> bool {
        let limit = self.bucket_scan_limit;
        if !self.buckets.entry(key.clone()).or_default().insert(interval, limit) {
            return false;
        }
        match self.global.get_mut(&interval) {
            Some(keys) => {
                keys.insert(key);
            }
            None => {
                self.global.insert(interval, BTreeSet::from([key]));
            }
        }
        self.len += 1;
        self.span_total += interval.span();
        true
    }

    /// Remove an entry by exact interval. Returns false if it was absent.
    pub fn remove(&mut self, key: &K, interval: &Interval<T>) -> bool {
        let limit = self.bucket_scan_limit;
        let Some(bucket) = self.buckets.get_mut(key) else {
            return false;
        };
        if !bucket.remove(interval, limit) {
            return false;
        }
        if bucket.is_empty() {
            self.buckets.remove(key);
        }
        let now_empty = match self.global.get_mut(interval) {
            Some(keys) => {
                keys.remove(key);
                keys.is_empty()
            }
            None => false,
        };
        if now_empty {
            self.global.remove(interval);
        }
        self.len -= 1;
        self.span_total -= interval.span();
        if self.len == 0 {
            self.span_total = 0.0;
        }
        true
    }

    /// Whether `(key, interval)` is stored.
    pub fn contains(&self, key: &K, interval: &Interval<T>) -> bool {
        self.buckets.get(key).is_some_and(|bucket| bucket.contains(interval))
    }

    /// Entries overlapping `bounds`, for one pair or for all pairs.
    ///
    /// A single pair yields its intervals in order. The global form yields
    /// entries ordered by interval, then key.
    pub fn query_overlap(&self, key: Option<&K>, bounds: &TimeBounds<T>) -> Vec<(K, Interval<T>)> {
        match key {
            Some(key) => self
                .buckets
                .get(key)
                .map(|bucket| {
                    bucket
                        .overlapping(bounds)
                        .into_iter()
                        .map(|interval| (key.clone(), interval))
                        .collect()
                })
                .unwrap_or_default(),
            None => {
                let mut out = Vec::new();
                self.global.for_each_overlapping(bounds, |interval, keys| {
                    out.extend(keys.iter().map(|key| (key.clone(), *interval)));
                });
                out
            }
        }
    }

    /// Entries whose interval equals `interval`, for one pair or for all pairs.
    pub fn exact(&self, key: Option<&K>, interval: &Interval<T>) -> Vec<(K, Interval<T>)> {
        match key {
            Some(key) if self.contains(key, interval) => vec![(key.clone(), *interval)],
            Some(_) => Vec::new(),
            None => self
                .global
                .get(interval)
                .map(|keys| keys.iter().map(|key| (key.clone(), *interval)).collect())
                .unwrap_or_default(),
        }
    }

    /// Earliest interval of `key` overlapping `bounds`.
    pub fn first_overlapping(&self, key: &K, bounds: &TimeBounds<T>) -> Option<Interval<T>> {
        self.buckets.get(key)?.first_overlapping(bounds)
    }

    /// All intervals of `key`, sorted.
    pub fn intervals_of(&self, key: &K) -> Vec<Interval<T>> {
        self.buckets.get(key).map(|bucket| bucket.intervals()).unwrap_or_default()
    }

    /// `(min begin, max end)` across every stored interval.
    pub fn span(&self) -> Option<(T, T)> {
        self.global.span()
    }

    /// Mean interval length on the `f64` axis, 0 when empty.
    pub fn mean_interval_span(&self) -> f64 {
        if self.len == 0 {
            0.0
        } else {
            self.span_total / self.len as f64
        }
    }

    /// Every pair key with at least one interval.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.buckets.keys()
    }
}
