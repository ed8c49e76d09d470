//! Thread-shareable graph handle.

use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::graph::DynamicGraph;
use crate::selector::TrainingReport;
use crate::types::{Attributes, Edge, EdgeQuery, NodeId, TimePoint};
use crate::Result;

/// A [`DynamicGraph`] behind `Arc<RwLock<_>>`.
///
/// Readers proceed concurrently; a mutation waits for them and blocks new
/// readers until it returns. Clones share the same graph.
#[derive(Debug)]
pub struct SharedGraph<N, T> {
    inner: Arc<RwLock<DynamicGraph<N, T>>>,
}

impl<N, T> Clone for SharedGraph<N, T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<N: NodeId, T: TimePoint> Default for SharedGraph<N, T> {
    fn default() -> Self {
        Self::new(DynamicGraph::new())
    }
}

impl<N: NodeId, T: TimePoint> From<DynamicGraph<N, T>> for SharedGraph<N, T> {
    fn from(graph: DynamicGraph<N, T>) -> Self {
        Self::new(graph)
    }
}

impl<N: NodeId, T: TimePoint> SharedGraph<N, T> {
    /// Share `graph`.
    pub fn new(graph: DynamicGraph<N, T>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(graph)),
        }
    }

    /// Shared read access.
    pub fn read(&self) -> RwLockReadGuard<'_, DynamicGraph<N, T>> {
        self.inner.read()
    }

    /// Exclusive write access.
    pub fn write(&self) -> RwLockWriteGuard<'_, DynamicGraph<N, T>> {
        self.inner.write()
    }

    /// See [`DynamicGraph::add_edge`].
    pub fn add_edge(&self, u: N, v: N, begin: T, end: T, attrs: Attributes) -> Result<bool> {
        self.inner.write().add_edge(u, v, begin, end, attrs)
    }

    /// See [`DynamicGraph::remove_edge`].
    pub fn remove_edge(&self, u: N, v: N, begin: Option<T>, end: Option<T>, exact_match: bool) -> Result<bool> {
        self.inner.write().remove_edge(u, v, begin, end, exact_match)
    }

    /// See [`DynamicGraph::edges`].
    pub fn edges(&self, query: &EdgeQuery<N, T>) -> Result<Vec<Edge<N, T>>> {
        self.inner.read().edges(query)
    }

    /// See [`DynamicGraph::train_selector`]. Holds the write lock while timing.
    pub fn train_selector(&self, sample_count: usize) -> Result<TrainingReport> {
        self.inner.write().train_selector(sample_count)
    }
}
