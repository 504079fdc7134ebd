//! # Validation Tier Tests (T0-T3)
//!
//! If ANY tier fails, the engine is INVALID.
//!
//! ## Tiers
//! - T0: Input Integrity
//! - T1: Deduplication
//! - T2: Provenance
//! - T3: Regeneration

use approx::assert_abs_diff_eq;
use geodash_core::{
    Command, DVec2, Generator, GeneratorSettings, Geometry, MapElement, NodeId, NodeSeed,
    Pipeline, PipelineConfig, generators,
};

fn pipeline(tolerance: f64, levels: usize, generators: Vec<Generator>) -> Pipeline {
    let mut pipeline = Pipeline::new(PipelineConfig {
        max_objects: 1000,
        acceptable_difference: tolerance,
        inception_levels: levels,
    })
    .expect("pipeline");
    for generator in generators {
        pipeline.register(generator).expect("register");
    }
    pipeline
}

fn deep_midpoint() -> Generator {
    generators::midpoint().with_settings(GeneratorSettings {
        is_deep: true,
        ..GeneratorSettings::default()
    })
}

fn two_points(x: f64) -> Vec<NodeSeed> {
    vec![
        NodeSeed::new(Geometry::point(0.0, 0.0), 0.0),
        NodeSeed::new(Geometry::point(x, 0.0), 100.0),
    ]
}

fn ids(pipeline: &Pipeline, level: usize) -> Vec<NodeId> {
    pipeline
        .layer(level)
        .expect("layer")
        .collection()
        .iter()
        .collect()
}

// =============================================================================
// TIER T0: INPUT INTEGRITY
// =============================================================================

mod t0_input_integrity {
    use super::*;

    /// T0.1: Map elements reduce to timed points in layer 0.
    #[test]
    fn elements_become_inputs() {
        let mut p = pipeline(0.5, 1, Vec::new());
        let elements = vec![
            MapElement::circle(0.0, DVec2::new(10.0, 10.0)),
            MapElement::slider(100.0, DVec2::new(20.0, 10.0), 300.0, DVec2::new(80.0, 10.0)),
        ];

        p.ingest(&elements).expect("ingest");
        let times: Vec<f64> = ids(&p, 0)
            .into_iter()
            .filter_map(|id| p.node(id))
            .map(|node| node.time())
            .collect();
        assert_eq!(times, vec![0.0, 100.0, 300.0]);
    }

    /// T0.2: Re-supplying the same inputs changes nothing.
    #[test]
    fn identical_inputs_are_kept() {
        let mut p = pipeline(0.5, 2, vec![generators::midpoint()]);
        p.update_inputs(two_points(10.0));
        let before: Vec<Vec<NodeId>> = (0..3).map(|level| ids(&p, level)).collect();

        p.update_inputs(two_points(10.0));
        let after: Vec<Vec<NodeId>> = (0..3).map(|level| ids(&p, level)).collect();
        assert_eq!(before, after);
    }

    /// T0.3: Invalid elements are rejected before touching the pipeline.
    #[test]
    fn invalid_elements_rejected() {
        let mut p = pipeline(0.5, 1, Vec::new());
        let elements = vec![MapElement::circle(f64::NAN, DVec2::ZERO)];

        assert!(p.ingest(&elements).is_err());
        assert!(p.is_empty());
    }
}

// =============================================================================
// TIER T1: DEDUPLICATION
// =============================================================================

mod t1_deduplication {
    use super::*;

    /// T1.1: A midpoint that coincides with an input never enters layer 1.
    #[test]
    fn wide_tolerance_swallows_near_inputs() {
        let mut p = pipeline(20.0, 2, vec![generators::midpoint()]);
        p.update_inputs(two_points(10.0));

        assert!(p.layer(1).expect("layer").is_empty());
        p.regenerate();
        assert!(p.layer(1).expect("layer").is_empty());
        assert_eq!(p.len(), 2);
    }

    /// T1.2: Recomputed duplicates in layer 2 are swallowed by the upstream
    /// check, on every pass.
    #[test]
    fn recomputed_duplicates_swallowed_upstream() {
        let mut p = pipeline(20.0, 2, vec![deep_midpoint()]);
        p.update_inputs(two_points(60.0));
        assert_eq!(ids(&p, 1).len(), 1);

        for _ in 0..2 {
            let report = p.generate_new_objects(2, false).expect("report");
            assert_eq!(report.generated, 3);
            assert_eq!(report.rejected, 3);
            assert_eq!(report.added, 0);
            assert!(p.layer(2).expect("layer").is_empty());
        }
    }

    /// T1.3: Candidates within tolerance of each other merge inside a layer.
    #[test]
    fn near_candidates_merge_within_layer() {
        let mut p = pipeline(1.0, 1, vec![generators::midpoint()]);
        // The diagonals' midpoints (5.2,25) and (5,25) lie 0.2 apart.
        p.update_inputs(vec![
            NodeSeed::new(Geometry::point(0.0, 0.0), 0.0),
            NodeSeed::new(Geometry::point(10.0, 0.0), 1.0),
            NodeSeed::new(Geometry::point(0.0, 50.0), 2.0),
            NodeSeed::new(Geometry::point(10.4, 50.0), 3.0),
        ]);

        assert_eq!(ids(&p, 1).len(), 5);
        for id in ids(&p, 1) {
            for other in ids(&p, 1) {
                if id == other {
                    continue;
                }
                let a = p.node(id).expect("a").geometry();
                let b = p.node(other).expect("b").geometry();
                assert!(a.distance_to(b).expect("same kind") > 1.0);
            }
        }
    }
}

// =============================================================================
// TIER T2: PROVENANCE
// =============================================================================

mod t2_provenance {
    use super::*;

    /// T2.1: Two inputs yield exactly one midpoint carrying both parents.
    #[test]
    fn midpoint_scenario() {
        let mut p = pipeline(0.5, 1, vec![generators::midpoint()]);
        p.update_inputs(vec![
            NodeSeed::new(Geometry::point(0.0, 0.0), 0.0).with_relevancy(0.4),
            NodeSeed::new(Geometry::point(10.0, 0.0), 100.0).with_relevancy(0.8),
        ]);

        let layer = ids(&p, 1);
        assert_eq!(layer.len(), 1);
        let midpoint = p.node(layer[0]).expect("midpoint");
        assert_eq!(*midpoint.geometry(), Geometry::point(5.0, 0.0));
        assert_eq!(midpoint.parents().iter().copied().collect::<Vec<_>>(), ids(&p, 0));
        assert_abs_diff_eq!(midpoint.relevancy(), 0.6, epsilon = 1e-12);
    }

    /// T2.2: Regenerating after disposing an input removes the midpoint it
    /// supported.
    #[test]
    fn dispose_input_scenario() {
        let mut p = pipeline(0.5, 1, vec![generators::midpoint()]);
        p.update_inputs(two_points(10.0));
        let midpoint = ids(&p, 1)[0];

        let inputs = ids(&p, 0);
        assert!(p.dispose(inputs[0]));
        let parents = p.node(midpoint).expect("midpoint").parents().clone();
        assert_eq!(parents.into_iter().collect::<Vec<_>>(), vec![inputs[1]]);

        p.regenerate();
        assert!(p.is_disposed(midpoint));
        assert!(p.layer(1).expect("layer").is_empty());
    }

    /// T2.3: Disposal is idempotent.
    #[test]
    fn dispose_twice() {
        let mut p = pipeline(0.5, 2, vec![generators::midpoint()]);
        p.update_inputs(vec![
            NodeSeed::new(Geometry::point(0.0, 0.0), 0.0),
            NodeSeed::new(Geometry::point(40.0, 0.0), 1.0),
            NodeSeed::new(Geometry::point(0.0, 40.0), 2.0),
        ]);
        let target = ids(&p, 1)[0];

        assert!(p.dispose(target));
        let remaining = p.len();
        assert!(!p.dispose(target));
        assert_eq!(p.len(), remaining);
    }

    /// T2.4: Disposal leaves unrelated nodes alone.
    #[test]
    fn disposal_spares_unrelated_nodes() {
        let mut p = pipeline(0.5, 1, vec![generators::midpoint()]);
        p.update_inputs(vec![
            NodeSeed::new(Geometry::point(0.0, 0.0), 0.0),
            NodeSeed::new(Geometry::point(40.0, 0.0), 1.0),
            NodeSeed::new(Geometry::point(0.0, 40.0), 2.0),
        ]);
        let inputs = ids(&p, 0);

        p.dispose(inputs[0]);
        p.regenerate();
        let survivors = ids(&p, 1);
        assert_eq!(survivors.len(), 1);
        let parents = p.node(survivors[0]).expect("survivor").parents().clone();
        assert!(parents.contains(&inputs[1]) && parents.contains(&inputs[2]));
    }

    /// T2.5: A node confirmed by two tuples outlives the loss of one of them.
    #[test]
    fn shared_centre_survives_corner_disposal() {
        let mut p = pipeline(0.5, 1, vec![generators::midpoint()]);
        p.update_inputs(vec![
            NodeSeed::new(Geometry::point(0.0, 0.0), 0.0).with_relevancy(0.2),
            NodeSeed::new(Geometry::point(10.0, 0.0), 1.0),
            NodeSeed::new(Geometry::point(10.0, 10.0), 2.0),
            NodeSeed::new(Geometry::point(0.0, 10.0), 3.0),
        ]);
        let corners = ids(&p, 0);
        let centre = ids(&p, 1)
            .into_iter()
            .find(|id| *p.node(*id).expect("node").geometry() == Geometry::point(5.0, 5.0))
            .expect("centre");
        assert_eq!(p.node(centre).expect("centre").parents().len(), 4);

        assert!(p.dispose(corners[0]));
        let node = p.node(centre).expect("centre survives");
        assert!(!node.parents().contains(&corners[0]));
        assert_eq!(node.parents().len(), 3);
        assert_abs_diff_eq!(node.relevancy(), 1.0, epsilon = 1e-12);

        p.regenerate();
        assert!(!p.is_disposed(centre));
        let parents = p.node(centre).expect("centre").parents().clone();
        assert_eq!(parents.into_iter().collect::<Vec<_>>(), vec![corners[1], corners[3]]);
    }

    /// T2.6: A locked copy keeps its place after its ancestry is gone.
    #[test]
    fn locked_copy_outlives_parents() {
        let mut p = pipeline(0.5, 1, vec![generators::midpoint()]);
        p.update_inputs(two_points(10.0));
        let midpoint = ids(&p, 1)[0];

        let copy = p
            .apply(Command::LockNode {
                node: midpoint,
                locked: true,
            })
            .expect("copy");
        p.update_inputs(Vec::new());

        assert!(p.layer(0).expect("layer").is_empty());
        assert_eq!(ids(&p, 1), vec![copy]);
    }
}

// =============================================================================
// TIER T3: REGENERATION
// =============================================================================

mod t3_regeneration {
    use super::*;

    fn triangle() -> Vec<NodeSeed> {
        vec![
            NodeSeed::new(Geometry::point(0.0, 0.0), 0.0),
            NodeSeed::new(Geometry::point(90.0, 0.0), 100.0),
            NodeSeed::new(Geometry::point(0.0, 70.0), 200.0),
        ]
    }

    /// T3.1: Regenerating without changes is a no-op on every layer.
    #[test]
    fn regeneration_is_stable() {
        let mut p = pipeline(0.5, 3, generators::builtin());
        p.update_inputs(triangle());
        let before: Vec<Vec<NodeId>> = (0..4).map(|level| ids(&p, level)).collect();

        let report = p.regenerate().expect("report");
        assert_eq!(report.added, 0);
        assert_eq!(report.swept, 0);
        let after: Vec<Vec<NodeId>> = (0..4).map(|level| ids(&p, level)).collect();
        assert_eq!(before, after);
    }

    /// T3.2: Relevancy is rebuilt, not accumulated, across passes.
    #[test]
    fn relevancy_is_stable_across_passes() {
        let mut p = pipeline(0.5, 2, vec![generators::midpoint()]);
        // A square: both diagonals share the centre point.
        p.update_inputs(vec![
            NodeSeed::new(Geometry::point(0.0, 0.0), 0.0),
            NodeSeed::new(Geometry::point(10.0, 0.0), 1.0),
            NodeSeed::new(Geometry::point(10.0, 10.0), 2.0),
            NodeSeed::new(Geometry::point(0.0, 10.0), 3.0),
        ]);
        let snapshot = |p: &Pipeline| -> Vec<f64> {
            ids(p, 1)
                .into_iter()
                .filter_map(|id| p.node(id))
                .map(|node| node.relevancy())
                .collect()
        };

        let before = snapshot(&p);
        p.regenerate();
        p.regenerate();
        assert_eq!(before, snapshot(&p));
        assert!(before.iter().any(|relevancy| *relevancy > 1.5));
    }

    /// T3.3: Selection forces full relevancy and restores the stored value.
    #[test]
    fn selection_forces_full_relevancy() {
        let mut p = pipeline(0.5, 1, vec![generators::midpoint()]);
        p.update_inputs(vec![
            NodeSeed::new(Geometry::point(0.0, 0.0), 0.0).with_relevancy(0.2),
            NodeSeed::new(Geometry::point(10.0, 0.0), 100.0),
        ]);
        let input = ids(&p, 0)[0];

        p.apply(Command::SelectNode {
            node: input,
            selected: true,
        });
        assert_eq!(p.node(input).expect("input").relevancy(), 1.0);

        p.apply(Command::SelectNode {
            node: input,
            selected: false,
        });
        assert_abs_diff_eq!(p.node(input).expect("input").relevancy(), 0.2);
    }

    /// T3.4: A layer that would overflow keeps its previous state.
    #[test]
    fn budget_backoff_preserves_state() {
        let mut p = Pipeline::new(PipelineConfig {
            max_objects: 5,
            acceptable_difference: 0.5,
            inception_levels: 1,
        })
        .expect("pipeline");
        p.register(generators::midpoint()).expect("register");
        p.update_inputs(triangle());
        let before = ids(&p, 1);
        assert_eq!(before.len(), 3);

        // Three held plus three staged exceed the budget of five.
        let report = p.regenerate().expect("report");
        assert!(report.over_budget);
        assert_eq!(ids(&p, 1), before);
    }

    /// T3.5: Changing tolerance re-derives every layer.
    #[test]
    fn tolerance_change_regenerates() {
        let mut p = pipeline(0.5, 1, vec![generators::midpoint()]);
        p.update_inputs(two_points(10.0));
        assert_eq!(ids(&p, 1).len(), 1);

        p.set_acceptable_difference(20.0).expect("tolerance");
        assert!(p.layer(1).expect("layer").is_empty());
    }
}
