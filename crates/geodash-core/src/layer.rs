//! # Layer
//!
//! One stage ("inception level") of the pipeline. A layer owns a collection
//! and reconciles freshly generated candidates against everything upstream
//! and everything it already holds.
//!
//! ## Reconciliation Rules
//!
//! 1. Over budget: the candidate is rejected
//! 2. Similar to anything upstream: rejected, never merged backwards
//! 3. Similar to a node in this layer: merged into that node
//! 4. Otherwise: added as new
//!
//! A regeneration pass stages candidates first and only reconciles if the
//! whole batch fits the budget. Staging stops at the first candidate that
//! would not fit. Derived nodes that were not reconfirmed by the pass are
//! swept afterwards.

use crate::collection::Collection;
use crate::combiner::ParameterCombiner;
use crate::generator::{Operand, Product};
use crate::node::{Node, temporal_position};
use crate::pipeline::Pipeline;
use crate::primitives::EPSILON;
use crate::types::{GeneratorId, NodeId, Origin, TemporalPositioning};
use serde::Serialize;
use std::collections::BTreeMap;

// =============================================================================
// LAYER
// =============================================================================

/// One stage of the pipeline.
#[derive(Debug, Clone, Default)]
pub struct Layer {
    pub(crate) level: usize,
    pub(crate) collection: Collection,
}

impl Layer {
    pub(crate) fn new(level: usize) -> Self {
        Self {
            level,
            collection: Collection::new(),
        }
    }

    /// Index of this layer; 0 is the input layer.
    #[must_use]
    pub fn level(&self) -> usize {
        self.level
    }

    #[must_use]
    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.collection.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.collection.is_empty()
    }
}

// =============================================================================
// OUTCOMES
// =============================================================================

/// What `Pipeline::add` did with a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome", content = "node")]
pub enum AddOutcome {
    /// The layer is full.
    OverBudget,
    /// An upstream node already covers the candidate.
    DuplicateUpstream(NodeId),
    /// The candidate was merged into this existing node.
    Merged(NodeId),
    /// The candidate now lives in the layer.
    Added(NodeId),
    /// The layer does not exist or the candidate is gone.
    Ignored,
}

/// Summary of one `generate_new_objects` pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PassReport {
    pub level: usize,
    pub generated: usize,
    pub added: usize,
    pub merged: usize,
    pub rejected: usize,
    pub swept: usize,
    pub over_budget: bool,
}

/// A generator result waiting for reconciliation.
struct Staged {
    generator: GeneratorId,
    parents: Vec<NodeId>,
    product: Product,
}

// =============================================================================
// RECONCILIATION
// =============================================================================

impl Pipeline {
    /// The union of every layer before `level`.
    #[must_use]
    pub fn all_previous(&self, level: usize) -> Collection {
        let mut union = Collection::new();
        for layer in self.layers.iter().take(level) {
            union.merge_with(&layer.collection);
        }
        union
    }

    /// Reconcile the candidate `id` into layer `level`.
    ///
    /// `dispose` controls whether a rejected or merged candidate is disposed;
    /// `propagate` asks the next layer to regenerate after a new node lands.
    pub fn add(
        &mut self,
        level: usize,
        id: NodeId,
        propagate: bool,
        dispose: bool,
        all_previous: &Collection,
    ) -> AddOutcome {
        let Some(layer) = self.layers.get(level) else {
            return AddOutcome::Ignored;
        };
        let Some(candidate) = self.nodes.get(&id) else {
            return AddOutcome::Ignored;
        };
        let geometry = *candidate.geometry();
        let kind = candidate.kind();
        let tolerance = self.config.acceptable_difference;

        let outcome = if layer.collection.len() >= self.config.max_objects {
            AddOutcome::OverBudget
        } else if let Some(upstream) = all_previous.find_similar(&self.nodes, &geometry, tolerance)
        {
            AddOutcome::DuplicateUpstream(upstream)
        } else if let Some(existing) = layer.collection.find_similar(&self.nodes, &geometry, tolerance)
        {
            AddOutcome::Merged(existing)
        } else {
            AddOutcome::Added(id)
        };

        match outcome {
            AddOutcome::OverBudget | AddOutcome::DuplicateUpstream(_) => {
                if dispose {
                    self.dispose(id);
                }
            }
            AddOutcome::Merged(existing) => {
                self.consume(existing, id);
                if dispose {
                    self.dispose(id);
                }
                if let Some(node) = self.nodes.get_mut(&existing) {
                    node.do_not_dispose = true;
                }
            }
            AddOutcome::Added(_) => {
                if let Some(node) = self.nodes.get_mut(&id) {
                    node.do_not_dispose = true;
                    node.layer = Some(level);
                }
                if let Some(layer) = self.layers.get_mut(level) {
                    layer.collection.add(kind, id);
                }
                if propagate {
                    self.generate_new_objects(level + 1, false);
                }
            }
            AddOutcome::Ignored => {}
        }
        outcome
    }

    /// Run every active generator for layer `level` and reconcile the
    /// results.
    ///
    /// Returns `None` for the input layer and for levels past the end.
    pub fn generate_new_objects(&mut self, level: usize, force_propagate: bool) -> Option<PassReport> {
        if level == 0 || level >= self.layers.len() {
            return None;
        }
        let mut report = PassReport {
            level,
            ..PassReport::default()
        };

        let all_previous = self.all_previous(level);
        let held = self.layers[level].collection.len();
        let room = self.config.max_objects.saturating_sub(held);
        let staged = self.stage_candidates(level, &all_previous, room);
        report.generated = staged.len();

        if staged.len() > room {
            report.over_budget = true;
            tracing::debug!(
                level,
                staged = staged.len(),
                held,
                max_objects = self.config.max_objects,
                "budget exceeded, keeping previous layer state"
            );
            return Some(report);
        }

        // Open the pass: nothing is confirmed yet, and derived relevancy and
        // provenance are rebuilt from the candidates that reconfirm them.
        let held_ids: Vec<NodeId> = self.layers[level].collection.iter().collect();
        let mut previous_relevancy = BTreeMap::new();
        let mut unlinked = Vec::new();
        for id in &held_ids {
            if let Some(node) = self.nodes.get_mut(id) {
                // Hand-placed nodes are never swept and only absorb candidates
                // that bring new parents.
                node.do_not_dispose = node.generator().is_none();
                if node.generator().is_some() {
                    previous_relevancy.insert(*id, node.relevancy);
                    node.relevancy = 0.0;
                    unlinked.push((*id, std::mem::take(&mut node.parents)));
                }
            }
        }
        for (id, parents) in unlinked {
            for parent in parents {
                if let Some(parent_node) = self.nodes.get_mut(&parent) {
                    parent_node.children.remove(&id);
                }
            }
        }

        for candidate in staged {
            let id = self.materialize(candidate);
            match self.add(level, id, false, true, &all_previous) {
                AddOutcome::Added(_) => report.added += 1,
                AddOutcome::Merged(_) => report.merged += 1,
                AddOutcome::OverBudget | AddOutcome::DuplicateUpstream(_) => report.rejected += 1,
                AddOutcome::Ignored => {}
            }
        }

        // Sweep derived nodes the pass did not reconfirm.
        for id in &held_ids {
            let stale = self
                .nodes
                .get(id)
                .is_some_and(|node| node.generator().is_some() && !node.do_not_dispose);
            if stale && self.dispose(*id) {
                report.swept += 1;
            }
        }
        for (id, before) in previous_relevancy {
            let changed = self
                .nodes
                .get(&id)
                .is_some_and(|node| (node.relevancy - before).abs() > EPSILON);
            if changed {
                self.cascade_relevancy(id);
            }
        }
        self.sort_layer(level);

        tracing::debug!(
            level,
            generated = report.generated,
            added = report.added,
            merged = report.merged,
            rejected = report.rejected,
            swept = report.swept,
            "regeneration pass"
        );

        if report.added > 0 || report.swept > 0 || force_propagate {
            self.generate_new_objects(level + 1, force_propagate);
        }
        Some(report)
    }

    /// Invoke every active generator on its input tuples without touching the
    /// graph.
    ///
    /// Stops as soon as more than `room` candidates are staged; a result
    /// longer than `room` means the pass cannot fit the layer.
    fn stage_candidates(&self, level: usize, all_previous: &Collection, room: usize) -> Vec<Staged> {
        let previous = &self.layers[level - 1].collection;
        let mut staged = Vec::new();

        for generator in self.registry.active() {
            let settings = generator.settings();
            let source = if settings.is_deep { all_previous } else { previous };
            let selection = source.get_selection(&self.nodes, generator);

            for method in generator.methods() {
                for tuple in ParameterCombiner::combine_typed(
                    &selection,
                    method.inputs(),
                    settings.is_sequential,
                ) {
                    let operands: Vec<Operand<'_>> = tuple
                        .iter()
                        .filter_map(|id| self.nodes.get(id))
                        .map(Operand::of)
                        .collect();
                    for product in method.invoke(&operands) {
                        staged.push(Staged {
                            generator: generator.id(),
                            parents: tuple.clone(),
                            product,
                        });
                        if staged.len() > room {
                            return staged;
                        }
                    }
                }
            }
        }
        staged
    }

    /// Turn a staged result into an arena node.
    ///
    /// Provenance and generator are attached first; inheritability, time and
    /// relevancy are derived from them afterwards.
    fn materialize(&mut self, staged: Staged) -> NodeId {
        let Staged {
            generator,
            parents,
            product,
        } = staged;
        let id = self.spawn(product.geometry, 0.0, 0.0, Origin::Generated(generator), &parents);

        let (inheritable, positioning) = self
            .registry
            .get(generator)
            .map(|g| (g.settings().generates_inheritable, g.settings().temporal_positioning))
            .unwrap_or((true, TemporalPositioning::Average));
        let parent_times: Vec<f64> = parents
            .iter()
            .filter_map(|p| self.nodes.get(p))
            .map(Node::time)
            .collect();
        let time = match (positioning, product.time) {
            (TemporalPositioning::Custom, Some(time)) => Some(time),
            (TemporalPositioning::Custom, None) => {
                temporal_position(TemporalPositioning::Average, &parent_times)
            }
            _ => temporal_position(positioning, &parent_times),
        };

        if let Some(node) = self.nodes.get_mut(&id) {
            node.is_inheritable = inheritable;
            node.time = time.or(product.time).unwrap_or(0.0);
            // Generators without inputs manufacture primitives.
            if node.parents.is_empty() {
                node.relevancy = 1.0;
            }
        }
        self.update_relevancy(id);
        id
    }

    pub(crate) fn sort_layer(&mut self, level: usize) {
        if let Some(layer) = self.layers.get_mut(level) {
            layer.collection.sort_by_time(&self.nodes);
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
