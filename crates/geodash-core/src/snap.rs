//! # Snapping
//!
//! Finds the point on the visible derived geometry closest to a cursor
//! position, the query an editor runs while the user drags an object.

use crate::pipeline::Pipeline;
use crate::primitives::EPSILON;
use crate::snapshot::ViewMode;
use crate::types::NodeId;
use glam::DVec2;
use serde::Serialize;

/// Where a position snaps to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SnapTarget {
    pub node: NodeId,
    pub point: DVec2,
    pub distance: f64,
    pub relevancy: f64,
}

/// Nearest point within `max_distance` of `position` on any node visible
/// under `view`.
///
/// Among targets at the same distance the more relevant node wins; remaining
/// ties go to the earlier node in layer order.
#[must_use]
pub fn snap(
    pipeline: &Pipeline,
    position: DVec2,
    view: ViewMode,
    max_distance: f64,
) -> Option<SnapTarget> {
    let mut best: Option<SnapTarget> = None;

    for level in view.levels(pipeline.layers().len()) {
        let Some(layer) = pipeline.layer(level) else {
            continue;
        };
        for node in layer.collection().iter().filter_map(|id| pipeline.node(id)) {
            let point = node.geometry().nearest_point(position);
            let distance = point.distance(position);
            if distance.is_nan() || distance > max_distance {
                continue;
            }
            let candidate = SnapTarget {
                node: node.id(),
                point,
                distance,
                relevancy: node.relevancy(),
            };
            best = match best {
                None => Some(candidate),
                Some(current) if candidate.distance < current.distance - EPSILON => Some(candidate),
                Some(current)
                    if (candidate.distance - current.distance).abs() <= EPSILON
                        && candidate.relevancy > current.relevancy =>
                {
                    Some(candidate)
                }
                keep => keep,
            };
        }
    }
    best
}
