//! # Collection
//!
//! A set of node handles indexed by geometry kind.
//!
//! Each kind bucket keeps insertion order until `sort_by_time` is called;
//! layers sort after every pass so that sequential generators see their
//! inputs in time order. Structural operations here carry no merge
//! semantics, which live in the layer's reconciliation.

use crate::generator::Generator;
use crate::geometry::Geometry;
use crate::node::NodeMap;
use crate::types::{GeometryKind, NodeId};
use std::collections::BTreeMap;

/// Node handles bucketed by `GeometryKind`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Collection {
    buckets: BTreeMap<GeometryKind, Vec<NodeId>>,
}

impl Collection {
    /// Create a new empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a handle under `kind`. Adding a handle twice is a no-op.
    pub fn add(&mut self, kind: GeometryKind, id: NodeId) {
        let bucket = self.buckets.entry(kind).or_default();
        if !bucket.contains(&id) {
            bucket.push(id);
        }
    }

    /// Remove a handle. Returns whether it was present.
    pub fn remove(&mut self, id: NodeId) -> bool {
        for bucket in self.buckets.values_mut() {
            if let Some(position) = bucket.iter().position(|n| *n == id) {
                bucket.remove(position);
                return true;
            }
        }
        false
    }

    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.buckets.values().any(|bucket| bucket.contains(&id))
    }

    /// Add every handle of `other`, keeping its kind.
    pub fn merge_with(&mut self, other: &Collection) {
        for (kind, bucket) in &other.buckets {
            for id in bucket {
                self.add(*kind, *id);
            }
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.values().all(Vec::is_empty)
    }

    /// Handles of one kind, in bucket order.
    #[must_use]
    pub fn of_kind(&self, kind: GeometryKind) -> &[NodeId] {
        self.buckets.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All handles, kind by kind.
    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.buckets.values().flat_map(|bucket| bucket.iter().copied())
    }

    /// Stable sort of every bucket by node time. Stale handles sort last.
    pub fn sort_by_time(&mut self, nodes: &NodeMap) {
        for bucket in self.buckets.values_mut() {
            bucket.sort_by(|a, b| {
                let ta = nodes.get(a).map_or(f64::INFINITY, |n| n.time());
                let tb = nodes.get(b).map_or(f64::INFINITY, |n| n.time());
                ta.total_cmp(&tb)
            });
        }
    }

    /// First node of the same kind within `tolerance` of `candidate`.
    #[must_use]
    pub fn find_similar(
        &self,
        nodes: &NodeMap,
        candidate: &Geometry,
        tolerance: f64,
    ) -> Option<NodeId> {
        self.of_kind(candidate.kind()).iter().copied().find(|id| {
            nodes
                .get(id)
                .and_then(|node| node.geometry().distance_to(candidate))
                .is_some_and(|distance| distance <= tolerance)
        })
    }

    /// The inputs `generator` may draw from this collection: inheritable
    /// nodes of a kind one of its methods consumes that pass its input
    /// predicate. Order is preserved.
    #[must_use]
    pub fn get_selection(&self, nodes: &NodeMap, generator: &Generator) -> Collection {
        let predicate = &generator.settings().input_predicate;
        let mut selection = Collection::new();
        for (kind, bucket) in &self.buckets {
            if !generator.consumes(*kind) {
                continue;
            }
            for id in bucket {
                let Some(node) = nodes.get(id) else {
                    continue;
                };
                if node.is_inheritable() && predicate.check(node, generator.id()) {
                    selection.add(*kind, *id);
                }
            }
        }
        selection
    }
}

// =============================================================================
// TESTS
// =============================================================================
