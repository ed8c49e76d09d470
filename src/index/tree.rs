//! AVL interval tree.
//!
//! Nodes are keyed by [`Interval`] (begin, then end) and augmented with the
//! maximum `end` in their subtree. Overlap queries prune any subtree whose
//! `max_end <= begin` and any right subtree whose keys start at or after
//! `end`, giving `O(log n + k)`.
//!
//! Each key carries one value `V`. The global index stores the set of node
//! pairs sharing an interval; per-pair trees store `()`.

use std::cmp::Ordering;
use std::mem;

use crate::types::{Interval, TimeBounds, TimePoint};

type Link<T, V> = Option<Box<TreeNode<T, V>>>;

#[derive(Debug, Clone)]
struct TreeNode<T, V> {
    interval: Interval<T>,
    value: V,
    max_end: T,
    height: u32,
    left: Link<T, V>,
    right: Link<T, V>,
}

impl<T: TimePoint, V> TreeNode<T, V> {
    fn new(interval: Interval<T>, value: V) -> Box<Self> {
        Box::new(Self {
            max_end: interval.end(),
            interval,
            value,
            height: 1,
            left: None,
            right: None,
        })
    }

    fn update(&mut self) {
        self.height = 1 + height(&self.left).max(height(&self.right));
        let mut max_end = self.interval.end();
        if let Some(left) = &self.left {
            max_end = max_end.max(left.max_end);
        }
        if let Some(right) = &self.right {
            max_end = max_end.max(right.max_end);
        }
        self.max_end = max_end;
    }

    fn balance(&self) -> i64 {
        i64::from(height(&self.left)) - i64::from(height(&self.right))
    }
}

fn height<T, V>(link: &Link<T, V>) -> u32 {
    link.as_ref().map_or(0, |node| node.height)
}

fn rotate_right<T: TimePoint, V>(mut node: Box<TreeNode<T, V>>) -> Box<TreeNode<T, V>> {
    let Some(mut pivot) = node.left.take() else {
        return node;
    };
    node.left = pivot.right.take();
    node.update();
    pivot.right = Some(node);
    pivot.update();
    pivot
}

fn rotate_left<T: TimePoint, V>(mut node: Box<TreeNode<T, V>>) -> Box<TreeNode<T, V>> {
    let Some(mut pivot) = node.right.take() else {
        return node;
    };
    node.right = pivot.left.take();
    node.update();
    pivot.left = Some(node);
    pivot.update();
    pivot
}

fn rebalance<T: TimePoint, V>(mut node: Box<TreeNode<T, V>>) -> Box<TreeNode<T, V>> {
    node.update();
    let balance = node.balance();
    if balance > 1 {
        if let Some(left) = node.left.take() {
            node.left = Some(if left.balance() < 0 { rotate_left(left) } else { left });
        }
        return rotate_right(node);
    }
    if balance < -1 {
        if let Some(right) = node.right.take() {
            node.right = Some(if right.balance() > 0 { rotate_right(right) } else { right });
        }
        return rotate_left(node);
    }
    node
}

fn insert_at<T: TimePoint, V>(
    link: Link<T, V>,
    interval: Interval<T>,
    value: V,
) -> (Box<TreeNode<T, V>>, Option<V>) {
    let Some(mut node) = link else {
        return (TreeNode::new(interval, value), None);
    };
    match interval.cmp(&node.interval) {
        Ordering::Less => {
            let (child, previous) = insert_at(node.left.take(), interval, value);
            node.left = Some(child);
            (rebalance(node), previous)
        }
        Ordering::Greater => {
            let (child, previous) = insert_at(node.right.take(), interval, value);
            node.right = Some(child);
            (rebalance(node), previous)
        }
        Ordering::Equal => {
            let previous = mem::replace(&mut node.value, value);
            (node, Some(previous))
        }
    }
}

fn take_min<T: TimePoint, V>(mut node: Box<TreeNode<T, V>>) -> (Link<T, V>, Box<TreeNode<T, V>>) {
    match node.left.take() {
        None => {
            let rest = node.right.take();
            (rest, node)
        }
        Some(left) => {
            let (rest, min) = take_min(left);
            node.left = rest;
            (Some(rebalance(node)), min)
        }
    }
}

fn remove_at<T: TimePoint, V>(link: Link<T, V>, interval: &Interval<T>) -> (Link<T, V>, Option<V>) {
    let Some(mut node) = link else {
        return (None, None);
    };
    match interval.cmp(&node.interval) {
        Ordering::Less => {
            let (child, removed) = remove_at(node.left.take(), interval);
            node.left = child;
            (Some(rebalance(node)), removed)
        }
        Ordering::Greater => {
            let (child, removed) = remove_at(node.right.take(), interval);
            node.right = child;
            (Some(rebalance(node)), removed)
        }
        Ordering::Equal => {
            let TreeNode { left, right, value, .. } = *node;
            let replacement = match (left, right) {
                (None, None) => None,
                (Some(child), None) | (None, Some(child)) => Some(child),
                (Some(left), Some(right)) => {
                    let (rest, mut successor) = take_min(right);
                    successor.left = Some(left);
                    successor.right = rest;
                    Some(rebalance(successor))
                }
            };
            (replacement, Some(value))
        }
    }
}

fn visit_overlapping<'a, T: TimePoint, V, F>(link: &'a Link<T, V>, bounds: &TimeBounds<T>, visit: &mut F)
where
    F: FnMut(&'a Interval<T>, &'a V),
{
    let Some(node) = link else {
        return;
    };
    if bounds.begin.is_some_and(|begin| node.max_end <= begin) {
        return;
    }
    visit_overlapping(&node.left, bounds, visit);
    if bounds.admits(&node.interval) {
        visit(&node.interval, &node.value);
    }
    // Right-subtree keys start at or after this node's begin.
    if bounds.end.is_some_and(|end| node.interval.begin() >= end) {
        return;
    }
    visit_overlapping(&node.right, bounds, visit);
}

/// Balanced interval tree mapping each distinct interval to a value.
#[derive(Debug, Clone)]
pub struct IntervalTree<T, V> {
    root: Link<T, V>,
    len: usize,
}

impl<T, V> Default for IntervalTree<T, V> {
    fn default() -> Self {
        Self { root: None, len: 0 }
    }
}

impl<T: TimePoint, V> IntervalTree<T, V> {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct intervals.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the tree is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Insert or replace; returns the previous value for this interval.
    pub fn insert(&mut self, interval: Interval<T>, value: V) -> Option<V> {
        let (root, previous) = insert_at(self.root.take(), interval, value);
        self.root = Some(root);
        if previous.is_none() {
            self.len += 1;
        }
        previous
    }

    /// Remove by exact interval.
    pub fn remove(&mut self, interval: &Interval<T>) -> Option<V> {
        let (root, removed) = remove_at(self.root.take(), interval);
        self.root = root;
        if removed.is_some() {
            self.len -= 1;
        }
        removed
    }

    /// Exact lookup.
    pub fn get(&self, interval: &Interval<T>) -> Option<&V> {
        let mut cursor = &self.root;
        while let Some(node) = cursor {
            match interval.cmp(&node.interval) {
                Ordering::Less => cursor = &node.left,
                Ordering::Greater => cursor = &node.right,
                Ordering::Equal => return Some(&node.value),
            }
        }
        None
    }

    /// Exact mutable lookup.
    pub fn get_mut(&mut self, interval: &Interval<T>) -> Option<&mut V> {
        let mut cursor = &mut self.root;
        while let Some(node) = cursor {
            match interval.cmp(&node.interval) {
                Ordering::Less => cursor = &mut node.left,
                Ordering::Greater => cursor = &mut node.right,
                Ordering::Equal => return Some(&mut node.value),
            }
        }
        None
    }

    /// Call `visit` for every interval overlapping `bounds`, in key order.
    pub fn for_each_overlapping<'a, F>(&'a self, bounds: &TimeBounds<T>, mut visit: F)
    where
        F: FnMut(&'a Interval<T>, &'a V),
    {
        visit_overlapping(&self.root, bounds, &mut visit);
    }

    /// Intervals overlapping `bounds`, in key order.
    pub fn overlapping(&self, bounds: &TimeBounds<T>) -> Vec<(&Interval<T>, &V)> {
        let mut out = Vec::new();
        self.for_each_overlapping(bounds, |interval, value| out.push((interval, value)));
        out
    }

    /// `(min begin, max end)` over all intervals.
    pub fn span(&self) -> Option<(T, T)> {
        let root = self.root.as_ref()?;
        let mut leftmost = root;
        while let Some(left) = &leftmost.left {
            leftmost = left;
        }
        Some((leftmost.interval.begin(), root.max_end))
    }

    /// In-order iterator.
    pub fn iter(&self) -> Iter<'_, T, V> {
        let mut iter = Iter { stack: Vec::new() };
        iter.push_left(&self.root);
        iter
    }

    #[cfg(test)]
    fn check_invariants(&self) -> bool {
        fn check<T: TimePoint, V>(link: &Link<T, V>) -> Option<(u32, Option<T>)> {
            let Some(node) = link else {
                return Some((0, None));
            };
            let (lh, lmax) = check(&node.left)?;
            let (rh, rmax) = check(&node.right)?;
            if lh.abs_diff(rh) > 1 || node.height != 1 + lh.max(rh) {
                return None;
            }
            if node.left.as_ref().is_some_and(|l| l.interval >= node.interval)
                || node.right.as_ref().is_some_and(|r| r.interval <= node.interval)
            {
                return None;
            }
            let expected = [Some(node.interval.end()), lmax, rmax].into_iter().flatten().max();
            if expected != Some(node.max_end) {
                return None;
            }
            Some((node.height, Some(node.max_end)))
        }
        check(&self.root).is_some()
    }
}

/// In-order iterator over an [`IntervalTree`].
pub struct Iter<'a, T, V> {
    stack: Vec<&'a TreeNode<T, V>>,
}

impl<'a, T, V> Iter<'a, T, V> {
    fn push_left(&mut self, mut link: &'a Link<T, V>) {
        while let Some(node) = link {
            self.stack.push(node);
            link = &node.left;
        }
    }
}

impl<'a, T, V> Iterator for Iter<'a, T, V> {
    type Item = (&'a Interval<T>, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.push_left(&node.right);
        Some((&node.interval, &node.value))
    }
}
