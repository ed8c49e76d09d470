//! Per-pair interval buckets.
//!
//! Most node pairs carry a handful of intervals, so a bucket starts as a
//! sorted `Vec` scanned linearly. Once it grows past the scan limit it is
//! promoted to its own [`IntervalTree`]; it is demoted again when it shrinks
//! below half the limit. Linear scans are therefore bounded by the limit.

use crate::types::{Interval, TimeBounds, TimePoint};

use super::tree::IntervalTree;

#[derive(Debug, Clone)]
pub(crate) enum PairBucket<T> {
    Scan(Vec<Interval<T>>),
    Tree(IntervalTree<T, ()>),
}

impl<T> Default for PairBucket<T> {
    fn default() -> Self {
        Self::Scan(Vec::new())
    }
}

impl<T: TimePoint> PairBucket<T> {
    pub(crate) fn len(&self) -> usize {
        match self {
            Self::Scan(intervals) => intervals.len(),
            Self::Tree(tree) => tree.len(),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[cfg(test)]
    pub(crate) fn is_tree(&self) -> bool {
        matches!(self, Self::Tree(_))
    }

    pub(crate) fn contains(&self, interval: &Interval<T>) -> bool {
        match self {
            Self::Scan(intervals) => intervals.binary_search(interval).is_ok(),
            Self::Tree(tree) => tree.get(interval).is_some(),
        }
    }

    /// Returns false if the interval was already present.
    pub(crate) fn insert(&mut self, interval: Interval<T>, scan_limit: usize) -> bool {
        match self {
            Self::Scan(intervals) => {
                let Err(position) = intervals.binary_search(&interval) else {
                    return false;
                };
                intervals.insert(position, interval);
                if intervals.len() > scan_limit {
                    let mut tree = IntervalTree::new();
                    for interval in intervals.drain(..) {
                        tree.insert(interval, ());
                    }
                    tracing::debug!(intervals = tree.len(), "promoted pair bucket to interval tree");
                    *self = Self::Tree(tree);
                }
                true
            }
            Self::Tree(tree) => tree.insert(interval, ()).is_none(),
        }
    }

    /// Returns false if the interval was not present.
    pub(crate) fn remove(&mut self, interval: &Interval<T>, scan_limit: usize) -> bool {
        match self {
            Self::Scan(intervals) => match intervals.binary_search(interval) {
                Ok(position) => {
                    intervals.remove(position);
                    true
                }
                Err(_) => false,
            },
            Self::Tree(tree) => {
                if tree.remove(interval).is_none() {
                    return false;
                }
                if tree.len() < scan_limit / 2 {
                    let intervals: Vec<_> = tree.iter().map(|(interval, _)| *interval).collect();
                    *self = Self::Scan(intervals);
                }
                true
            }
        }
    }

    /// Intervals overlapping `bounds`, sorted.
    pub(crate) fn overlapping(&self, bounds: &TimeBounds<T>) -> Vec<Interval<T>> {
        match self {
            Self::Scan(intervals) => intervals
                .iter()
                .take_while(|interval| bounds.end.map_or(true, |end| interval.begin() < end))
                .filter(|interval| bounds.admits(interval))
                .copied()
                .collect(),
            Self::Tree(tree) => tree
                .overlapping(bounds)
                .into_iter()
                .map(|(interval, _)| *interval)
                .collect(),
        }
    }

    /// The earliest interval overlapping `bounds`.
    pub(crate) fn first_overlapping(&self, bounds: &TimeBounds<T>) -> Option<Interval<T>> {
        match self {
            Self::Scan(intervals) => intervals
                .iter()
                .take_while(|interval| bounds.end.map_or(true, |end| interval.begin() < end))
                .find(|interval| bounds.admits(interval))
                .copied(),
            Self::Tree(tree) => {
                let mut first = None;
                tree.for_each_overlapping(bounds, |interval, _| {
                    if first.is_none() {
                        first = Some(*interval);
                    }
                });
                first
            }
        }
    }

    /// All intervals, sorted.
    pub(crate) fn intervals(&self) -> Vec<Interval<T>> {
        match self {
            Self::Scan(intervals) => intervals.clone(),
            Self::Tree(tree) => tree.iter().map(|(interval, _)| *interval).collect(),
        }
    }
}
