//! # Input Boundary
//!
//! Everything that supplies primitives to layer 0 implements `InputSource`.
//!
//! The reference source is a list of map elements: hit circles contribute
//! their position, sliders their start and end, spinners nothing. Elements
//! are validated before any seed is produced, so a malformed list never
//! reaches the pipeline half-applied.

use crate::geometry::Geometry;
use crate::primitives::MAX_INPUT_ELEMENTS;
use crate::types::{GeodashError, NodeSeed};
use glam::DVec2;
use serde::{Deserialize, Serialize};

/// A supplier of layer 0 primitives.
pub trait InputSource {
    /// The primitives this source currently describes.
    fn primitives(&self) -> Result<Vec<NodeSeed>, GeodashError>;
}

impl InputSource for [NodeSeed] {
    fn primitives(&self) -> Result<Vec<NodeSeed>, GeodashError> {
        Ok(self.to_vec())
    }
}

// =============================================================================
// MAP ELEMENTS
// =============================================================================

/// Kind of a map element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    Circle,
    Slider,
    Spinner,
}

/// One timed object of a map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapElement {
    pub kind: ElementKind,
    /// Start time in milliseconds.
    pub time: f64,
    pub position: DVec2,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_position: Option<DVec2>,
}

impl MapElement {
    #[must_use]
    pub fn circle(time: f64, position: DVec2) -> Self {
        Self {
            kind: ElementKind::Circle,
            time,
            position,
            end_time: None,
            end_position: None,
        }
    }

    #[must_use]
    pub fn slider(time: f64, position: DVec2, end_time: f64, end_position: DVec2) -> Self {
        Self {
            kind: ElementKind::Slider,
            time,
            position,
            end_time: Some(end_time),
            end_position: Some(end_position),
        }
    }

    #[must_use]
    pub fn spinner(time: f64, end_time: f64) -> Self {
        Self {
            kind: ElementKind::Spinner,
            time,
            position: DVec2::ZERO,
            end_time: Some(end_time),
            end_position: None,
        }
    }
}

/// Validates map elements and reduces them to primitives.
pub struct Ingestor;

impl Ingestor {
    /// Validate one element.
    ///
    /// Times and positions must be finite; a slider needs an end position
    /// and an end time no earlier than its start.
    pub fn validate(element: &MapElement) -> Result<(), GeodashError> {
        if !element.time.is_finite() {
            return Err(GeodashError::InvalidElement(format!(
                "{:?} at non-finite time",
                element.kind
            )));
        }
        if element.kind != ElementKind::Spinner && !element.position.is_finite() {
            return Err(GeodashError::InvalidElement(format!(
                "{:?} at {} has a non-finite position",
                element.kind, element.time
            )));
        }
        if let Some(end_time) = element.end_time {
            if !end_time.is_finite() || end_time < element.time {
                return Err(GeodashError::InvalidElement(format!(
                    "{:?} at {} ends at {}",
                    element.kind, element.time, end_time
                )));
            }
        }
        if element.kind == ElementKind::Slider {
            let Some(end) = element.end_position else {
                return Err(GeodashError::InvalidElement(format!(
                    "slider at {} has no end position",
                    element.time
                )));
            };
            if !end.is_finite() {
                return Err(GeodashError::InvalidElement(format!(
                    "slider at {} has a non-finite end position",
                    element.time
                )));
            }
        }
        Ok(())
    }

    /// Primitives of a list of elements, in element order.
    ///
    /// # Errors
    /// Returns `GeodashError::InvalidElement` if the list is longer than
    /// `MAX_INPUT_ELEMENTS` or any element is invalid.
    pub fn primitives(elements: &[MapElement]) -> Result<Vec<NodeSeed>, GeodashError> {
        if elements.len() > MAX_INPUT_ELEMENTS {
            return Err(GeodashError::InvalidElement(format!(
                "{} elements exceed the limit of {}",
                elements.len(),
                MAX_INPUT_ELEMENTS
            )));
        }

        let mut seeds = Vec::with_capacity(elements.len());
        for element in elements {
            Self::validate(element)?;
            match element.kind {
                ElementKind::Circle => {
                    seeds.push(NodeSeed::new(Geometry::Point(element.position), element.time));
                }
                ElementKind::Slider => {
                    seeds.push(NodeSeed::new(Geometry::Point(element.position), element.time));
                    if let (Some(end_time), Some(end)) = (element.end_time, element.end_position) {
                        seeds.push(NodeSeed::new(Geometry::Point(end), end_time));
                    }
                }
                ElementKind::Spinner => {}
            }
        }
        tracing::trace!(elements = elements.len(), seeds = seeds.len(), "elements reduced");
        Ok(seeds)
    }
}

impl InputSource for [MapElement] {
    fn primitives(&self) -> Result<Vec<NodeSeed>, GeodashError> {
        Ingestor::primitives(self)
    }
}

impl InputSource for Vec<MapElement> {
    fn primitives(&self) -> Result<Vec<NodeSeed>, GeodashError> {
        Ingestor::primitives(self)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::pipeline::Pipeline;

    #[test]
    fn circles_and_sliders_become_points() {
        let elements = vec![
            MapElement::circle(100.0, DVec2::new(10.0, 20.0)),
            MapElement::slider(200.0, DVec2::new(0.0, 0.0), 450.0, DVec2::new(80.0, 0.0)),
            MapElement::spinner(500.0, 1500.0),
        ];

        let seeds = Ingestor::primitives(&elements).expect("primitives");
        assert_eq!(
            seeds,
            vec![
                NodeSeed::new(Geometry::point(10.0, 20.0), 100.0),
                NodeSeed::new(Geometry::point(0.0, 0.0), 200.0),
                NodeSeed::new(Geometry::point(80.0, 0.0), 450.0),
            ]
        );
    }

    #[test]
    fn validate_rejects_malformed_elements() {
        let mut slider = MapElement::slider(200.0, DVec2::ZERO, 100.0, DVec2::ONE);
        assert!(Ingestor::validate(&slider).is_err());

        slider.end_time = Some(300.0);
        slider.end_position = None;
        assert!(Ingestor::validate(&slider).is_err());

        let circle = MapElement::circle(f64::NAN, DVec2::ZERO);
        assert!(matches!(
            Ingestor::validate(&circle),
            Err(GeodashError::InvalidElement(_))
        ));

        let circle = MapElement::circle(0.0, DVec2::new(f64::INFINITY, 0.0));
        assert!(Ingestor::validate(&circle).is_err());
    }

    #[test]
    fn one_bad_element_rejects_the_list() {
        let elements = vec![
            MapElement::circle(0.0, DVec2::ZERO),
            MapElement::circle(f64::NAN, DVec2::ZERO),
        ];
        assert!(Ingestor::primitives(&elements).is_err());
    }

    #[test]
    fn elements_deserialize_from_json_shape() {
        let element: MapElement = serde_json::from_str(
            r#"{"kind":"slider","time":10,"position":[1,2],"end_time":20,"end_position":[3,4]}"#,
        )
        .expect("parse");
        assert_eq!(element, MapElement::slider(10.0, DVec2::new(1.0, 2.0), 20.0, DVec2::new(3.0, 4.0)));
    }

    #[test]
    fn pipeline_ingests_sources() {
        let mut pipeline = Pipeline::new(PipelineConfig::default()).expect("pipeline");
        let elements = vec![
            MapElement::circle(0.0, DVec2::ZERO),
            MapElement::circle(100.0, DVec2::new(50.0, 0.0)),
        ];

        let report = pipeline.ingest(&elements).expect("ingest");
        assert_eq!(report.added, 2);
        assert_eq!(pipeline.layer(0).map(|layer| layer.len()), Some(2));
    }
}
