//! # Snapshots
//!
//! A serializable, read-only picture of the pipeline for consumers that
//! render or export it. Capturing never mutates the pipeline.

use crate::config::PipelineConfig;
use crate::geometry::Geometry;
use crate::node::Node;
use crate::pipeline::Pipeline;
use crate::types::{GeometryKind, NodeId, Origin};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Which layers a consumer sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    /// Only the deepest layer.
    #[default]
    LastLayer,
    /// Every layer, inputs included.
    AllLayers,
}

impl ViewMode {
    /// Layer indices visible in a pipeline with `layer_count` layers.
    #[must_use]
    pub fn levels(self, layer_count: usize) -> Range<usize> {
        match self {
            ViewMode::LastLayer => layer_count.saturating_sub(1)..layer_count,
            ViewMode::AllLayers => 0..layer_count,
        }
    }
}

/// One node as seen from outside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub kind: GeometryKind,
    pub geometry: Geometry,
    pub time: f64,
    /// Effective relevancy (1 while selected).
    pub relevancy: f64,
    pub is_selected: bool,
    pub is_locked: bool,
    pub is_inheritable: bool,
    pub origin: Origin,
    pub parents: Vec<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSnapshot {
    pub level: usize,
    pub nodes: Vec<NodeSnapshot>,
}

/// The visible layers of a pipeline at one moment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSnapshot {
    pub config: PipelineConfig,
    pub view: ViewMode,
    pub layers: Vec<LayerSnapshot>,
}

impl PipelineSnapshot {
    /// Capture the layers visible under `view`, nodes in collection order.
    #[must_use]
    pub fn capture(pipeline: &Pipeline, view: ViewMode) -> Self {
        let layers = view
            .levels(pipeline.layers().len())
            .filter_map(|level| pipeline.layer(level))
            .map(|layer| LayerSnapshot {
                level: layer.level(),
                nodes: layer
                    .collection()
                    .iter()
                    .filter_map(|id| pipeline.node(id))
                    .map(|node| Self::describe(pipeline, node))
                    .collect(),
            })
            .collect();

        Self {
            config: *pipeline.config(),
            view,
            layers,
        }
    }

    fn describe(pipeline: &Pipeline, node: &Node) -> NodeSnapshot {
        NodeSnapshot {
            id: node.id(),
            kind: node.kind(),
            geometry: *node.geometry(),
            time: node.time(),
            relevancy: node.relevancy(),
            is_selected: node.is_selected(),
            is_locked: node.is_locked(),
            is_inheritable: node.is_inheritable(),
            origin: node.origin(),
            parents: node.parents().iter().copied().collect(),
            generator: node
                .generator()
                .and_then(|id| pipeline.registry().get(id))
                .map(|generator| generator.name().to_string()),
        }
    }

    /// Total nodes across the captured layers.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.layers.iter().map(|layer| layer.nodes.len()).sum()
    }
}
