//! # Commands
//!
//! Every mutation a consumer makes to a node goes through `Pipeline::apply`.
//! A command changes one field of one node and then performs the follow-up
//! work that field needs (relevancy cascades, re-sorting, regeneration of the
//! next layer) in the same call.

use crate::layer::AddOutcome;
use crate::pipeline::Pipeline;
use crate::types::NodeId;
use serde::{Deserialize, Serialize};

/// A single mutation of a node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    SelectNode { node: NodeId, selected: bool },
    LockNode { node: NodeId, locked: bool },
    SetInheritable { node: NodeId, inheritable: bool },
    SetTime { node: NodeId, time: f64 },
    SetRelevancy { node: NodeId, relevancy: f64 },
    SetAutoPropagate { node: NodeId, auto_propagate: bool },
    Dispose { node: NodeId },
}

impl Command {
    /// The node the command is addressed to.
    #[must_use]
    pub fn target(&self) -> NodeId {
        match *self {
            Command::SelectNode { node, .. }
            | Command::LockNode { node, .. }
            | Command::SetInheritable { node, .. }
            | Command::SetTime { node, .. }
            | Command::SetRelevancy { node, .. }
            | Command::SetAutoPropagate { node, .. }
            | Command::Dispose { node } => node,
        }
    }
}

impl Pipeline {
    /// Apply a command.
    ///
    /// Returns the handle that now stands for the target: the target itself,
    /// or its locked copy after `LockNode { locked: true }`. Returns `None`
    /// when the target is disposed or the command carries a non-finite value.
    pub fn apply(&mut self, command: Command) -> Option<NodeId> {
        let target = command.target();
        let level = self.nodes.get(&target)?.layer;
        tracing::debug!(?command, "apply");

        match command {
            Command::SelectNode { selected, .. } => {
                let node = self.nodes.get_mut(&target)?;
                node.is_selected = selected;
                let propagate = node.auto_propagate;
                self.cascade_relevancy(target);
                if propagate {
                    self.regenerate_after(level);
                }
                Some(target)
            }
            Command::LockNode { locked: true, .. } => self.lock(target, level),
            Command::LockNode { locked: false, .. } => {
                let node = self.nodes.get_mut(&target)?;
                if node.is_locked {
                    node.is_locked = false;
                    self.regenerate_after(level);
                }
                Some(target)
            }
            Command::SetInheritable { inheritable, .. } => {
                let node = self.nodes.get_mut(&target)?;
                node.is_inheritable = inheritable;
                if !inheritable {
                    let children: Vec<NodeId> = node.children.iter().copied().collect();
                    for child in children {
                        self.dispose(child);
                    }
                }
                self.regenerate_after(level);
                Some(target)
            }
            Command::SetTime { time, .. } => {
                if !time.is_finite() {
                    return None;
                }
                self.nodes.get_mut(&target)?.time = time;
                let mut touched = self.cascade_time(target);
                touched.extend(level);
                for level in touched {
                    self.sort_layer(level);
                }
                Some(target)
            }
            Command::SetRelevancy { relevancy, .. } => {
                if !relevancy.is_finite() {
                    return None;
                }
                self.nodes.get_mut(&target)?.relevancy = relevancy;
                self.cascade_relevancy(target);
                Some(target)
            }
            Command::SetAutoPropagate { auto_propagate, .. } => {
                self.nodes.get_mut(&target)?.auto_propagate = auto_propagate;
                Some(target)
            }
            Command::Dispose { .. } => {
                self.dispose(target);
                self.regenerate_after(level);
                Some(target)
            }
        }
    }

    /// Swap `target` for its locked copy in the same layer.
    fn lock(&mut self, target: NodeId, level: Option<usize>) -> Option<NodeId> {
        if self.nodes.get(&target)?.is_locked {
            return Some(target);
        }
        let copy = self.detach(target)?;
        let Some(level) = level else {
            // A detached node has no layer to return to; lock it in place.
            self.nodes.get_mut(&target)?.is_locked = true;
            return Some(target);
        };

        self.dispose(target);
        let outcome = self.adopt(level, copy, false);
        self.regenerate_after(Some(level));
        match outcome {
            AddOutcome::Added(id) | AddOutcome::Merged(id) => Some(id),
            AddOutcome::OverBudget | AddOutcome::DuplicateUpstream(_) | AddOutcome::Ignored => {
                None
            }
        }
    }

    fn regenerate_after(&mut self, level: Option<usize>) {
        if let Some(level) = level {
            self.generate_new_objects(level.saturating_add(1), true);
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::generator::{Generator, GeneratorCategory, Product};
    use crate::geometry::Geometry;
    use crate::types::{GeometryKind, NodeSeed, Origin};
    use approx::assert_abs_diff_eq;

    fn midpoint() -> Generator {
        Generator::new("midpoint", GeneratorCategory::Basic).method(
            vec![GeometryKind::Point, GeometryKind::Point],
            |ops| match (ops[0].geometry, ops[1].geometry) {
                (Geometry::Point(a), Geometry::Point(b)) => {
                    vec![Product::from(Geometry::Point((*a + *b) / 2.0))]
                }
                _ => Vec::new(),
            },
        )
    }

    /// Two inputs and their midpoint in layer 1.
    fn scene() -> (Pipeline, NodeId, NodeId, NodeId) {
        let mut p = Pipeline::new(PipelineConfig {
            max_objects: 100,
            acceptable_difference: 0.5,
            inception_levels: 2,
        })
        .expect("pipeline");
        p.register(midpoint()).expect("register");
        p.update_inputs(vec![
            NodeSeed::new(Geometry::point(0.0, 0.0), 100.0),
            NodeSeed::new(Geometry::point(10.0, 0.0), 300.0),
        ]);
        let inputs: Vec<NodeId> = p.layer(0).expect("layer").collection().iter().collect();
        let middle = p.layer(1).expect("layer").collection().iter().next().expect("midpoint");
        (p, inputs[0], inputs[1], middle)
    }

    #[test]
    fn commands_on_disposed_nodes_are_ignored() {
        let (mut p, a, _, _) = scene();
        p.dispose(a);
        assert_eq!(p.apply(Command::SelectNode { node: a, selected: true }), None);
        assert_eq!(p.apply(Command::Dispose { node: a }), None);
    }

    #[test]
    fn selecting_forces_relevancy_downstream() {
        let (mut p, a, _, middle) = scene();
        p.apply(Command::SetRelevancy { node: a, relevancy: 0.0 });
        assert_abs_diff_eq!(p.node(middle).expect("middle").relevancy(), 0.5);

        assert_eq!(p.apply(Command::SelectNode { node: a, selected: true }), Some(a));
        assert_eq!(p.node(a).expect("a").relevancy(), 1.0);
        assert_abs_diff_eq!(p.node(middle).expect("middle").relevancy(), 1.0);
    }

    #[test]
    fn set_time_cascades_and_resorts() {
        let (mut p, a, b, middle) = scene();
        p.apply(Command::SetTime { node: a, time: 500.0 });

        assert_abs_diff_eq!(p.node(middle).expect("middle").time(), 400.0);
        let order: Vec<NodeId> = p.layer(0).expect("layer").collection().iter().collect();
        assert_eq!(order, vec![b, a]);
        assert_eq!(p.apply(Command::SetTime { node: a, time: f64::NAN }), None);
    }

    #[test]
    fn lock_replaces_node_with_locked_copy() {
        let (mut p, _, _, middle) = scene();
        let copy = p.apply(Command::LockNode { node: middle, locked: true }).expect("copy");

        assert_ne!(copy, middle);
        assert!(p.is_disposed(middle));
        let node = p.node(copy).expect("copy");
        assert!(node.is_locked());
        assert_eq!(node.origin(), Origin::Manual);
        assert_eq!(node.layer(), Some(1));
        assert!(node.parents().is_empty());
        assert_eq!(p.layer(1).expect("layer").len(), 1);

        // Regeneration keeps the locked copy and does not recreate the original.
        p.regenerate();
        assert!(!p.is_disposed(copy));
        assert_eq!(p.layer(1).expect("layer").len(), 1);
        assert_abs_diff_eq!(p.node(copy).expect("copy").relevancy(), 1.0);
    }

    #[test]
    fn locked_copy_survives_input_removal() {
        let (mut p, a, _, middle) = scene();
        let copy = p.apply(Command::LockNode { node: middle, locked: true }).expect("copy");

        p.apply(Command::Dispose { node: a });
        assert!(!p.is_disposed(copy));
    }

    #[test]
    fn unlock_clears_flag() {
        let (mut p, _, _, middle) = scene();
        let copy = p.apply(Command::LockNode { node: middle, locked: true }).expect("copy");
        assert_eq!(p.apply(Command::LockNode { node: copy, locked: true }), Some(copy));

        assert_eq!(p.apply(Command::LockNode { node: copy, locked: false }), Some(copy));
        assert!(!p.node(copy).expect("copy").is_locked());
    }

    #[test]
    fn revoking_inheritance_disposes_children() {
        let (mut p, a, _, middle) = scene();
        p.apply(Command::SetInheritable { node: a, inheritable: false });

        assert!(p.is_disposed(middle));
        assert!(p.layer(1).expect("layer").is_empty());
        assert!(!p.node(a).expect("a").is_inheritable());
    }

    #[test]
    fn dispose_command_cascades() {
        let (mut p, _, b, middle) = scene();
        assert_eq!(p.apply(Command::Dispose { node: b }), Some(b));
        assert!(p.is_disposed(b) && p.is_disposed(middle));
    }

    #[test]
    fn auto_propagate_flag_is_stored() {
        let (mut p, a, _, _) = scene();
        p.apply(Command::SetAutoPropagate { node: a, auto_propagate: false });
        assert!(!p.node(a).expect("a").auto_propagate());
    }

    #[test]
    fn commands_deserialize_from_tagged_json() {
        let command: Command =
            serde_json::from_str(r#"{"command":"lock_node","node":7,"locked":true}"#).expect("parse");
        assert_eq!(command, Command::LockNode { node: NodeId(7), locked: true });
        assert_eq!(command.target(), NodeId(7));
    }
}
