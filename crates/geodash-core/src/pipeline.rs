//! # Pipeline
//!
//! An ordered list of layers wired so each layer's output feeds the next,
//! plus the node arena they share and the global configuration.
//!
//! Layer 0 holds the primitives supplied from outside. Every later layer is
//! produced by the registered generators. Regeneration flows forward through
//! the layers inside a single call; nothing here blocks or suspends.

use crate::config::PipelineConfig;
use crate::generator::{Generator, GeneratorRegistry, GeneratorSettings};
use crate::ingest::InputSource;
use crate::layer::{AddOutcome, Layer, PassReport};
use crate::node::{Node, NodeMap};
use crate::primitives::EPSILON;
use crate::types::{GeneratorId, GeodashError, NodeId, NodeSeed, Origin};

/// The derived-object graph.
#[derive(Debug)]
pub struct Pipeline {
    pub(crate) config: PipelineConfig,
    pub(crate) registry: GeneratorRegistry,
    pub(crate) nodes: NodeMap,
    pub(crate) layers: Vec<Layer>,
    pub(crate) next_node_id: u64,
}

impl Pipeline {
    /// Create an empty pipeline with `config.inception_levels` generated
    /// layers after the input layer.
    pub fn new(config: PipelineConfig) -> Result<Self, GeodashError> {
        config.validate()?;
        Ok(Self {
            config,
            registry: GeneratorRegistry::new(),
            nodes: NodeMap::new(),
            layers: (0..config.layer_count()).map(Layer::new).collect(),
            next_node_id: 0,
        })
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    #[must_use]
    pub fn registry(&self) -> &GeneratorRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut GeneratorRegistry {
        &mut self.registry
    }

    /// Register a generator. It takes part from the next regeneration on.
    pub fn register(&mut self, generator: Generator) -> Result<GeneratorId, GeodashError> {
        self.registry.register(generator)
    }

    #[must_use]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    #[must_use]
    pub fn layer(&self, level: usize) -> Option<&Layer> {
        self.layers.get(level)
    }

    /// The last generated layer (the input layer when there is none).
    #[must_use]
    pub fn last_layer(&self) -> Option<&Layer> {
        self.layers.last()
    }

    /// Number of live nodes in the arena.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Live nodes in handle order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    // =========================================================================
    // INPUTS
    // =========================================================================

    /// Replace the primitives of layer 0 with `seeds`.
    ///
    /// Inputs are reconciled by identity, not by proximity: a seed whose
    /// geometry and time equal a held node keeps that node (and everything
    /// derived from it), new seeds are added, and inputs no longer supplied
    /// are disposed. Distinct map elements at the same place stay distinct.
    pub fn update_inputs(&mut self, seeds: Vec<NodeSeed>) -> PassReport {
        let mut report = PassReport {
            level: 0,
            generated: seeds.len(),
            ..PassReport::default()
        };
        let Some(input_layer) = self.layers.first() else {
            return report;
        };
        let held: Vec<NodeId> = input_layer.collection.iter().collect();
        for id in &held {
            if let Some(node) = self.nodes.get_mut(id) {
                node.do_not_dispose = false;
            }
        }

        let mut changed = false;
        let mut fresh = Vec::new();
        for seed in seeds {
            if !seed.geometry.is_finite() || !seed.time.is_finite() || !seed.relevancy.is_finite() {
                report.rejected += 1;
                continue;
            }
            let existing = held.iter().copied().find(|id| {
                self.nodes.get(id).is_some_and(|node| {
                    !node.do_not_dispose && node.geometry == seed.geometry && node.time == seed.time
                })
            });
            let Some(id) = existing else {
                fresh.push(seed);
                continue;
            };
            report.merged += 1;
            let mut relevancy_changed = false;
            if let Some(node) = self.nodes.get_mut(&id) {
                node.do_not_dispose = true;
                if node.origin == Origin::Input && (node.relevancy - seed.relevancy).abs() > EPSILON {
                    node.relevancy = seed.relevancy;
                    relevancy_changed = true;
                }
            }
            if relevancy_changed {
                self.cascade_relevancy(id);
                changed = true;
            }
        }

        for id in &held {
            let stale = self
                .nodes
                .get(id)
                .is_some_and(|node| node.origin == Origin::Input && !node.do_not_dispose);
            if stale && self.dispose(*id) {
                report.swept += 1;
            }
        }

        for seed in fresh {
            if self.layers[0].collection.len() >= self.config.max_objects {
                report.rejected += 1;
                continue;
            }
            let kind = seed.geometry.kind();
            let id = self.spawn(seed.geometry, seed.time, seed.relevancy, Origin::Input, &[]);
            if let Some(node) = self.nodes.get_mut(&id) {
                node.do_not_dispose = true;
                node.layer = Some(0);
            }
            self.layers[0].collection.add(kind, id);
            report.added += 1;
        }
        self.sort_layer(0);

        tracing::debug!(
            supplied = report.generated,
            added = report.added,
            kept = report.merged,
            removed = report.swept,
            rejected = report.rejected,
            "inputs updated"
        );

        if changed || report.added > 0 || report.swept > 0 {
            self.generate_new_objects(1, true);
        }
        report
    }

    /// Pull primitives from an input source and update layer 0.
    pub fn ingest<S: InputSource + ?Sized>(&mut self, source: &S) -> Result<PassReport, GeodashError> {
        let seeds = source.primitives()?;
        Ok(self.update_inputs(seeds))
    }

    /// Regenerate every generated layer.
    pub fn regenerate(&mut self) -> Option<PassReport> {
        self.generate_new_objects(1, true)
    }

    /// Hand-insert a primitive into `level`, reconciled like any candidate.
    pub fn insert(&mut self, level: usize, seed: NodeSeed, propagate: bool) -> AddOutcome {
        if level >= self.layers.len() || !seed.geometry.is_finite() {
            return AddOutcome::Ignored;
        }
        let id = self.spawn(seed.geometry, seed.time, seed.relevancy, Origin::Manual, &[]);
        let all_previous = self.all_previous(level);
        self.add(level, id, propagate, true, &all_previous)
    }

    /// Place a detached node into `level`, reconciled like any candidate.
    pub fn adopt(&mut self, level: usize, mut node: Node, propagate: bool) -> AddOutcome {
        if level >= self.layers.len() || self.nodes.contains_key(&node.id) {
            return AddOutcome::Ignored;
        }
        let id = node.id;
        node.parents.clear();
        node.children.clear();
        node.layer = None;
        node.do_not_dispose = false;
        self.next_node_id = self.next_node_id.max(id.0.saturating_add(1));
        self.nodes.insert(id, node);

        let all_previous = self.all_previous(level);
        self.add(level, id, propagate, true, &all_previous)
    }

    /// Dispose every node in every layer.
    pub fn clear(&mut self) {
        let ids: Vec<NodeId> = self.nodes.keys().copied().collect();
        for id in ids {
            self.dispose(id);
        }
        tracing::debug!("pipeline cleared");
    }

    // =========================================================================
    // RUNTIME CONFIGURATION
    // =========================================================================

    /// Change the per-layer budget, trimming layers that no longer fit.
    pub fn set_max_objects(&mut self, max_objects: usize) -> Result<(), GeodashError> {
        let config = PipelineConfig {
            max_objects,
            ..self.config
        };
        config
            .validate()
            .inspect_err(|e| tracing::warn!("rejected configuration change: {}", e))?;
        self.config = config;
        self.enforce_budget();
        self.regenerate();
        Ok(())
    }

    /// Change the merge tolerance and regenerate.
    pub fn set_acceptable_difference(&mut self, tolerance: f64) -> Result<(), GeodashError> {
        let config = PipelineConfig {
            acceptable_difference: tolerance,
            ..self.config
        };
        config
            .validate()
            .inspect_err(|e| tracing::warn!("rejected configuration change: {}", e))?;
        self.config = config;
        self.regenerate();
        Ok(())
    }

    /// Grow or shrink the number of generated layers.
    pub fn set_inception_levels(&mut self, levels: usize) -> Result<(), GeodashError> {
        let config = PipelineConfig {
            inception_levels: levels,
            ..self.config
        };
        config
            .validate()
            .inspect_err(|e| tracing::warn!("rejected configuration change: {}", e))?;
        self.config = config;

        let target = config.layer_count();
        while self.layers.len() > target {
            let Some(layer) = self.layers.last() else {
                break;
            };
            let ids: Vec<NodeId> = layer.collection.iter().collect();
            for id in ids {
                self.dispose(id);
            }
            self.layers.pop();
        }
        while self.layers.len() < target {
            let level = self.layers.len();
            self.layers.push(Layer::new(level));
        }
        self.regenerate();
        Ok(())
    }

    /// Switch a generator on or off and regenerate. Returns whether the
    /// generator exists.
    pub fn set_generator_active(&mut self, id: GeneratorId, active: bool) -> bool {
        let Some(generator) = self.registry.get_mut(id) else {
            return false;
        };
        generator.is_active = active;
        self.regenerate();
        true
    }

    /// Replace a generator's settings and regenerate.
    pub fn set_generator_settings(
        &mut self,
        id: GeneratorId,
        settings: GeneratorSettings,
    ) -> Result<(), GeodashError> {
        settings.validate()?;
        let Some(generator) = self.registry.get_mut(id) else {
            return Err(GeodashError::UnknownGenerator(format!("#{}", id.0)));
        };
        generator.settings = settings;
        self.regenerate();
        Ok(())
    }

    /// Dispose the least relevant nodes of every layer over budget.
    fn enforce_budget(&mut self) {
        for level in 0..self.layers.len() {
            let mut ids: Vec<NodeId> = self.layers[level].collection.iter().collect();
            if ids.len() <= self.config.max_objects {
                continue;
            }
            ids.sort_by(|a, b| {
                let ra = self.nodes.get(a).map_or(0.0, Node::relevancy);
                let rb = self.nodes.get(b).map_or(0.0, Node::relevancy);
                ra.total_cmp(&rb).then(b.cmp(a))
            });
            let excess = ids.len() - self.config.max_objects;
            for id in ids.into_iter().take(excess) {
                self.dispose(id);
            }
            tracing::debug!(level, trimmed = excess, "layer trimmed to budget");
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
