//! # Node
//!
//! The unit of the derived-object graph and the operations that walk its
//! provenance links.
//!
//! Nodes live in the pipeline's arena (`BTreeMap<NodeId, Node>`). Parent and
//! child links are handles into that arena, so disposal is a local removal:
//! a handle whose node is gone simply stops resolving.

use crate::geometry::Geometry;
use crate::pipeline::Pipeline;
use crate::primitives::EPSILON;
use crate::types::{GeneratorId, GeometryKind, NodeId, Origin, TemporalPositioning};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// The node arena type.
pub type NodeMap = BTreeMap<NodeId, Node>;

// =============================================================================
// NODE
// =============================================================================

/// A primitive or derived geometric candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) geometry: Geometry,
    pub(crate) time: f64,
    pub(crate) relevancy: f64,
    pub(crate) is_selected: bool,
    pub(crate) is_locked: bool,
    pub(crate) is_inheritable: bool,
    pub(crate) do_not_dispose: bool,
    pub(crate) auto_propagate: bool,
    pub(crate) parents: BTreeSet<NodeId>,
    pub(crate) children: BTreeSet<NodeId>,
    pub(crate) layer: Option<usize>,
    pub(crate) origin: Origin,
}

impl Node {
    pub(crate) fn new(id: NodeId, geometry: Geometry, time: f64, relevancy: f64, origin: Origin) -> Self {
        Self {
            id,
            geometry,
            time,
            relevancy,
            is_selected: false,
            is_locked: false,
            is_inheritable: true,
            do_not_dispose: false,
            auto_propagate: true,
            parents: BTreeSet::new(),
            children: BTreeSet::new(),
            layer: None,
            origin,
        }
    }

    /// The locked copy of `self` under a fresh handle.
    ///
    /// Only geometry, time, selection, inheritability and auto-propagation
    /// carry over. Everything else starts from the locked defaults.
    pub(crate) fn locked_copy(&self, id: NodeId) -> Self {
        Self {
            id,
            geometry: self.geometry,
            time: self.time,
            relevancy: 1.0,
            is_selected: self.is_selected,
            is_locked: true,
            is_inheritable: self.is_inheritable,
            do_not_dispose: false,
            auto_propagate: self.auto_propagate,
            parents: BTreeSet::new(),
            children: BTreeSet::new(),
            layer: None,
            origin: Origin::Manual,
        }
    }

    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    #[must_use]
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    #[must_use]
    pub fn kind(&self) -> GeometryKind {
        self.geometry.kind()
    }

    #[must_use]
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Effective relevancy: 1 while selected, the stored value otherwise.
    #[must_use]
    pub fn relevancy(&self) -> f64 {
        if self.is_selected { 1.0 } else { self.relevancy }
    }

    /// Stored relevancy, ignoring selection.
    #[must_use]
    pub fn stored_relevancy(&self) -> f64 {
        self.relevancy
    }

    #[must_use]
    pub fn is_selected(&self) -> bool {
        self.is_selected
    }

    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.is_locked
    }

    #[must_use]
    pub fn is_inheritable(&self) -> bool {
        self.is_inheritable
    }

    /// Whether the node was confirmed during the current reconciliation pass.
    #[must_use]
    pub fn do_not_dispose(&self) -> bool {
        self.do_not_dispose
    }

    #[must_use]
    pub fn auto_propagate(&self) -> bool {
        self.auto_propagate
    }

    #[must_use]
    pub fn parents(&self) -> &BTreeSet<NodeId> {
        &self.parents
    }

    #[must_use]
    pub fn children(&self) -> &BTreeSet<NodeId> {
        &self.children
    }

    /// Index of the owning layer, `None` for detached nodes.
    #[must_use]
    pub fn layer(&self) -> Option<usize> {
        self.layer
    }

    #[must_use]
    pub fn origin(&self) -> Origin {
        self.origin
    }

    #[must_use]
    pub fn generator(&self) -> Option<GeneratorId> {
        self.origin.generator()
    }

    /// A node without parents keeps its externally assigned values.
    #[must_use]
    pub fn is_primitive(&self) -> bool {
        self.parents.is_empty()
    }
}

/// Time of a derived node under `positioning`. `None` for `Custom` or when
/// there are no parent times.
pub(crate) fn temporal_position(positioning: TemporalPositioning, times: &[f64]) -> Option<f64> {
    if times.is_empty() {
        return None;
    }
    match positioning {
        TemporalPositioning::Average => Some(times.iter().sum::<f64>() / times.len() as f64),
        TemporalPositioning::Before => times.iter().copied().reduce(f64::min),
        TemporalPositioning::After => times.iter().copied().reduce(f64::max),
        TemporalPositioning::Custom => None,
    }
}

// =============================================================================
// NODE OPERATIONS
// =============================================================================

impl Pipeline {
    /// Look up a live node.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// A handle that no longer resolves belongs to a disposed node.
    #[must_use]
    pub fn is_disposed(&self, id: NodeId) -> bool {
        !self.nodes.contains_key(&id)
    }

    pub(crate) fn allocate_id(&mut self) -> NodeId {
        let id = NodeId(self.next_node_id);
        self.next_node_id = self.next_node_id.saturating_add(1);
        id
    }

    /// Insert a fresh node into the arena and link it below its live parents.
    pub(crate) fn spawn(
        &mut self,
        geometry: Geometry,
        time: f64,
        relevancy: f64,
        origin: Origin,
        parents: &[NodeId],
    ) -> NodeId {
        let id = self.allocate_id();
        let mut node = Node::new(id, geometry, time, relevancy, origin);
        for parent in parents {
            if let Some(parent_node) = self.nodes.get_mut(parent) {
                parent_node.children.insert(id);
                node.parents.insert(*parent);
            }
        }
        self.nodes.insert(id, node);
        id
    }

    /// Dispose a node and, recursively, every descendant reachable only
    /// through it.
    ///
    /// Idempotent: returns `false` when the node was already gone. A child
    /// with another live parent stays; it loses the link and has its
    /// relevancy and time recomputed from the parents it has left.
    pub fn dispose(&mut self, id: NodeId) -> bool {
        let Some(node) = self.nodes.remove(&id) else {
            return false;
        };

        if let Some(layer) = node.layer.and_then(|level| self.layers.get_mut(level)) {
            layer.collection.remove(id);
        }
        for parent in &node.parents {
            if let Some(parent_node) = self.nodes.get_mut(parent) {
                parent_node.children.remove(&id);
            }
        }
        tracing::trace!(node = id.0, children = node.children.len(), "dispose");

        for child in node.children {
            let Some(child_node) = self.nodes.get_mut(&child) else {
                continue;
            };
            child_node.parents.remove(&id);
            let remaining: Vec<NodeId> = child_node.parents.iter().copied().collect();

            if remaining.iter().any(|p| self.nodes.contains_key(p)) {
                self.reparent(child);
            } else {
                self.dispose(child);
            }
        }
        true
    }

    /// Refresh a node that lost one of its parents.
    fn reparent(&mut self, id: NodeId) {
        if self.update_relevancy(id) {
            self.cascade_relevancy(id);
        }
        if self.update_time(id) {
            let mut touched = self.cascade_time(id);
            touched.extend(self.nodes.get(&id).and_then(Node::layer));
            for level in touched {
                self.sort_layer(level);
            }
        }
    }

    /// Merge `other` into `this`.
    ///
    /// No-op when `this` is locked. Relevancy and parents are merged only if
    /// `this` was not yet confirmed in the current pass or `other` brings a
    /// parent `this` does not have. Children are always merged. `other` is
    /// left alive; disposing it is the caller's job.
    pub fn consume(&mut self, this: NodeId, other: NodeId) -> bool {
        if this == other {
            return false;
        }
        let Some(other_node) = self.nodes.get(&other) else {
            return false;
        };
        let other_relevancy = other_node.relevancy();
        let other_parents = other_node.parents.clone();
        let other_children = other_node.children.clone();

        let Some(this_node) = self.nodes.get(&this) else {
            return false;
        };
        if this_node.is_locked {
            return false;
        }
        let merge = !this_node.do_not_dispose || !this_node.parents.is_superset(&other_parents);

        let new_parents: Vec<NodeId> = if merge {
            other_parents
                .iter()
                .copied()
                .filter(|p| *p != this && self.nodes.contains_key(p))
                .collect()
        } else {
            Vec::new()
        };
        let new_children: Vec<NodeId> = other_children
            .iter()
            .copied()
            .filter(|c| *c != this && self.nodes.contains_key(c))
            .collect();

        for parent in &new_parents {
            if let Some(parent_node) = self.nodes.get_mut(parent) {
                parent_node.children.insert(this);
            }
        }
        for child in &new_children {
            if let Some(child_node) = self.nodes.get_mut(child) {
                child_node.parents.insert(this);
            }
        }
        if let Some(this_node) = self.nodes.get_mut(&this) {
            if merge {
                this_node.relevancy += other_relevancy;
                this_node.parents.extend(new_parents);
            }
            this_node.children.extend(new_children);
        }
        true
    }

    /// Recompute stored relevancy as `ratio * mean(parent relevancy)`.
    ///
    /// Primitive nodes are left alone. Returns whether the value changed.
    pub fn update_relevancy(&mut self, id: NodeId) -> bool {
        let Some(node) = self.nodes.get(&id) else {
            return false;
        };
        let values: Vec<f64> = node
            .parents
            .iter()
            .filter_map(|p| self.nodes.get(p))
            .map(Node::relevancy)
            .collect();
        if values.is_empty() {
            return false;
        }
        let ratio = node
            .generator()
            .and_then(|g| self.registry.get(g))
            .map_or(1.0, |g| g.settings().relevancy_ratio);
        let value = ratio * values.iter().sum::<f64>() / values.len() as f64;

        match self.nodes.get_mut(&id) {
            Some(node) if (node.relevancy - value).abs() > EPSILON => {
                node.relevancy = value;
                true
            }
            _ => false,
        }
    }

    /// Recompute time from the parents' times under the producing generator's
    /// temporal positioning.
    ///
    /// Primitive nodes and `Custom` positioning are left alone. Returns
    /// whether the value changed.
    pub fn update_time(&mut self, id: NodeId) -> bool {
        let Some(node) = self.nodes.get(&id) else {
            return false;
        };
        let times: Vec<f64> = node
            .parents
            .iter()
            .filter_map(|p| self.nodes.get(p))
            .map(Node::time)
            .collect();
        let positioning = node
            .generator()
            .and_then(|g| self.registry.get(g))
            .map(|g| g.settings().temporal_positioning)
            .unwrap_or_default();
        let Some(value) = temporal_position(positioning, &times) else {
            return false;
        };

        match self.nodes.get_mut(&id) {
            Some(node) if (node.time - value).abs() > EPSILON => {
                node.time = value;
                true
            }
            _ => false,
        }
    }

    /// Ancestors of `id` up to `depth` hops, including `id` itself.
    /// Locked nodes are not expanded.
    #[must_use]
    pub fn parentage(&self, id: NodeId, depth: usize) -> BTreeSet<NodeId> {
        self.closure(id, depth, |node| {
            if node.is_locked { None } else { Some(&node.parents) }
        })
    }

    /// Descendants of `id` up to `depth` hops, including `id` itself.
    #[must_use]
    pub fn descendants(&self, id: NodeId, depth: usize) -> BTreeSet<NodeId> {
        self.closure(id, depth, |node| Some(&node.children))
    }

    fn closure<F>(&self, id: NodeId, depth: usize, links: F) -> BTreeSet<NodeId>
    where
        F: Fn(&Node) -> Option<&BTreeSet<NodeId>>,
    {
        let mut visited = BTreeSet::new();
        if !self.nodes.contains_key(&id) {
            return visited;
        }
        let mut queue = VecDeque::new();
        visited.insert(id);
        queue.push_back((id, 0usize));

        while let Some((current, current_depth)) = queue.pop_front() {
            if current_depth >= depth {
                continue;
            }
            let Some(next) = self.nodes.get(&current).and_then(&links) else {
                continue;
            };
            for linked in next {
                if self.nodes.contains_key(linked) && visited.insert(*linked) {
                    queue.push_back((*linked, current_depth.saturating_add(1)));
                }
            }
        }
        visited
    }

    /// Produce a locked, unlinked copy of a node under a fresh handle.
    ///
    /// The copy is not inserted anywhere; hand it to `Pipeline::adopt` to
    /// place it in a layer.
    pub fn detach(&mut self, id: NodeId) -> Option<Node> {
        let source = self.nodes.get(&id)?.clone();
        let copy_id = self.allocate_id();
        Some(source.locked_copy(copy_id))
    }

    /// Descendants of `id` (excluding `id`), ordered so that every node comes
    /// after all of its ancestors.
    pub(crate) fn downstream_order(&self, id: NodeId) -> Vec<NodeId> {
        let mut order: Vec<NodeId> = self
            .descendants(id, crate::primitives::UNBOUNDED_DEPTH)
            .into_iter()
            .filter(|d| *d != id)
            .collect();
        order.sort_by_key(|d| (self.nodes.get(d).and_then(Node::layer), *d));
        order
    }

    /// Recompute relevancy of everything downstream of `id`.
    pub(crate) fn cascade_relevancy(&mut self, id: NodeId) {
        for descendant in self.downstream_order(id) {
            self.update_relevancy(descendant);
        }
    }

    /// Recompute time of everything downstream of `id` and return the layers
    /// whose order may have changed.
    pub(crate) fn cascade_time(&mut self, id: NodeId) -> BTreeSet<usize> {
        let mut touched = BTreeSet::new();
        for descendant in self.downstream_order(id) {
            if self.update_time(descendant) {
                if let Some(level) = self.nodes.get(&descendant).and_then(Node::layer) {
                    touched.insert(level);
                }
            }
        }
        touched
    }
}

// =============================================================================
// TESTS
// =============================================================================
