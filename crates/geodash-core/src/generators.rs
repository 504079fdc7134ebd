//! # Reference Generators
//!
//! Plain-geometry generators that cover every kind combination the engine
//! supports. Applications register them through `builtin()` or pick the
//! ones they need individually.

use crate::generator::{Generator, GeneratorCategory, GeneratorSettings, Operand, Product};
use crate::geometry::{Circle, Geometry, Line};
use crate::types::GeometryKind::{Circle as C, Line as L, Point as P};
use glam::DVec2;

fn as_point(operand: &Operand<'_>) -> Option<DVec2> {
    match operand.geometry {
        Geometry::Point(p) => Some(*p),
        _ => None,
    }
}

fn as_line(operand: &Operand<'_>) -> Option<Line> {
    match operand.geometry {
        Geometry::Line(line) => Some(*line),
        _ => None,
    }
}

fn as_circle(operand: &Operand<'_>) -> Option<Circle> {
    match operand.geometry {
        Geometry::Circle(circle) => Some(*circle),
        _ => None,
    }
}

fn points(found: impl IntoIterator<Item = DVec2>) -> Vec<Product> {
    found
        .into_iter()
        .map(|p| Product::from(Geometry::Point(p)))
        .collect()
}

/// Midpoint of every pair of points.
#[must_use]
pub fn midpoint() -> Generator {
    Generator::new("midpoint", GeneratorCategory::Basic).method(vec![P, P], |ops| {
        points(as_point(&ops[0]).zip(as_point(&ops[1])).map(|(a, b)| (a + b) / 2.0))
    })
}

/// Midpoint of every pair of points adjacent in time.
#[must_use]
pub fn sequential_midpoint() -> Generator {
    Generator::new("sequential_midpoint", GeneratorCategory::Sequential)
        .method(vec![P, P], |ops| {
            points(as_point(&ops[0]).zip(as_point(&ops[1])).map(|(a, b)| (a + b) / 2.0))
        })
        .with_settings(GeneratorSettings {
            is_sequential: true,
            ..GeneratorSettings::default()
        })
}

/// Line through every pair of distinct points.
#[must_use]
pub fn line_through_points() -> Generator {
    Generator::new("line_through_points", GeneratorCategory::Basic).method(vec![P, P], |ops| {
        as_point(&ops[0])
            .zip(as_point(&ops[1]))
            .and_then(|(a, b)| Line::through(a, b))
            .map(|line| vec![Product::from(Geometry::Line(line))])
            .unwrap_or_default()
    })
}

/// Crossing point of every pair of non-parallel lines.
#[must_use]
pub fn line_intersection() -> Generator {
    Generator::new("line_intersection", GeneratorCategory::Basic).method(vec![L, L], |ops| {
        points(
            as_line(&ops[0])
                .zip(as_line(&ops[1]))
                .and_then(|(a, b)| a.intersection(&b)),
        )
    })
}

/// Centre of every circle.
#[must_use]
pub fn circle_centre() -> Generator {
    Generator::new("circle_centre", GeneratorCategory::Basic)
        .method(vec![C], |ops| points(as_circle(&ops[0]).map(|c| c.centre)))
}

/// Circle through every triple of non-collinear points.
#[must_use]
pub fn circumcircle() -> Generator {
    Generator::new("circumcircle", GeneratorCategory::Advanced).method(vec![P, P, P], |ops| {
        let (Some(a), Some(b), Some(c)) = (as_point(&ops[0]), as_point(&ops[1]), as_point(&ops[2]))
        else {
            return Vec::new();
        };
        Circle::through(a, b, c)
            .map(|circle| vec![Product::from(Geometry::Circle(circle))])
            .unwrap_or_default()
    })
}

/// Points where a line meets a circle.
#[must_use]
pub fn line_circle_intersection() -> Generator {
    Generator::new("line_circle_intersection", GeneratorCategory::Advanced).method(
        vec![L, C],
        |ops| match (as_line(&ops[0]), as_circle(&ops[1])) {
            (Some(line), Some(circle)) => points(circle.intersect_line(&line)),
            _ => Vec::new(),
        },
    )
}

/// Every reference generator, in registration order.
#[must_use]
pub fn builtin() -> Vec<Generator> {
    vec![
        midpoint(),
        sequential_midpoint(),
        line_through_points(),
        line_intersection(),
        circle_centre(),
        circumcircle(),
        line_circle_intersection(),
    ]
}

// =============================================================================
// TESTS
// =============================================================================
