//! # Geometry
//!
//! The geometric payload of a node and the similarity metric the engine uses
//! to decide whether two candidates are "the same".
//!
//! The engine only relies on three capabilities:
//! - `kind()` to index collections and type generator inputs
//! - `distance_to()` to merge near-identical candidates
//! - `nearest_point()` for consumers that snap to candidates

use crate::primitives::{EPSILON, LINE_ANGLE_WEIGHT};
use crate::types::GeometryKind;
use glam::DVec2;
use serde::{Deserialize, Serialize};

// =============================================================================
// LINE
// =============================================================================

/// An infinite line through `anchor` with unit `direction`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub anchor: DVec2,
    pub direction: DVec2,
}

impl Line {
    /// Line through two distinct points. `None` when the points coincide.
    #[must_use]
    pub fn through(a: DVec2, b: DVec2) -> Option<Self> {
        let delta = b - a;
        if delta.length() < EPSILON {
            return None;
        }
        Some(Self {
            anchor: a,
            direction: delta.normalize(),
        })
    }

    /// Unit normal (direction rotated a quarter turn).
    #[must_use]
    pub fn normal(&self) -> DVec2 {
        self.direction.perp()
    }

    /// Signed distance of the line from the origin along `normal()`.
    #[must_use]
    pub fn offset(&self) -> f64 {
        self.normal().dot(self.anchor)
    }

    /// Orthogonal projection of `point` onto the line.
    #[must_use]
    pub fn project(&self, point: DVec2) -> DVec2 {
        self.anchor + self.direction * self.direction.dot(point - self.anchor)
    }

    /// Intersection point of two lines. `None` for (near) parallel lines.
    #[must_use]
    pub fn intersection(&self, other: &Line) -> Option<DVec2> {
        let cross = self.direction.perp_dot(other.direction);
        if cross.abs() < EPSILON {
            return None;
        }
        let t = (other.anchor - self.anchor).perp_dot(other.direction) / cross;
        Some(self.anchor + self.direction * t)
    }

    /// Coincidence metric: offset difference plus weighted angle between the
    /// lines, after aligning their normals.
    #[must_use]
    pub fn distance_to_line(&self, other: &Line) -> f64 {
        let n1 = self.normal();
        let c1 = self.offset();
        let (mut n2, mut c2) = (other.normal(), other.offset());
        if n1.dot(n2) < 0.0 {
            n2 = -n2;
            c2 = -c2;
        }
        let angle = n1.dot(n2).clamp(-1.0, 1.0).acos();
        (c1 - c2).abs() + LINE_ANGLE_WEIGHT * angle
    }
}

// =============================================================================
// CIRCLE
// =============================================================================

/// A circle given by centre and radius.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub centre: DVec2,
    pub radius: f64,
}

impl Circle {
    #[must_use]
    pub fn new(centre: DVec2, radius: f64) -> Self {
        Self { centre, radius }
    }

    /// The circle through three points. `None` when they are collinear.
    #[must_use]
    pub fn through(a: DVec2, b: DVec2, c: DVec2) -> Option<Self> {
        let d = 2.0 * (a.x * (b.y - c.y) + b.x * (c.y - a.y) + c.x * (a.y - b.y));
        if d.abs() < EPSILON {
            return None;
        }
        let (a2, b2, c2) = (a.length_squared(), b.length_squared(), c.length_squared());
        let centre = DVec2::new(
            (a2 * (b.y - c.y) + b2 * (c.y - a.y) + c2 * (a.y - b.y)) / d,
            (a2 * (c.x - b.x) + b2 * (a.x - c.x) + c2 * (b.x - a.x)) / d,
        );
        Some(Self {
            centre,
            radius: centre.distance(a),
        })
    }

    /// Closest point on the circumference to `point`.
    #[must_use]
    pub fn nearest_point(&self, point: DVec2) -> DVec2 {
        let delta = point - self.centre;
        if delta.length() < EPSILON {
            return self.centre + DVec2::new(self.radius, 0.0);
        }
        self.centre + delta.normalize() * self.radius
    }

    /// Intersections with a line: zero, one (tangent) or two points.
    #[must_use]
    pub fn intersect_line(&self, line: &Line) -> Vec<DVec2> {
        let foot = line.project(self.centre);
        let h = foot.distance(self.centre);
        if h > self.radius + EPSILON {
            return Vec::new();
        }
        if (h - self.radius).abs() <= EPSILON {
            return vec![foot];
        }
        let half_chord = (self.radius * self.radius - h * h).sqrt();
        vec![
            foot - line.direction * half_chord,
            foot + line.direction * half_chord,
        ]
    }
}

// =============================================================================
// GEOMETRY
// =============================================================================

/// The geometric payload of a node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Geometry {
    Point(DVec2),
    Line(Line),
    Circle(Circle),
}

impl Geometry {
    /// Convenience constructor for a point.
    #[must_use]
    pub fn point(x: f64, y: f64) -> Self {
        Geometry::Point(DVec2::new(x, y))
    }

    #[must_use]
    pub fn kind(&self) -> GeometryKind {
        match self {
            Geometry::Point(_) => GeometryKind::Point,
            Geometry::Line(_) => GeometryKind::Line,
            Geometry::Circle(_) => GeometryKind::Circle,
        }
    }

    /// Similarity metric between two geometries of the same kind.
    ///
    /// Returns `None` for different kinds, which are never similar.
    #[must_use]
    pub fn distance_to(&self, other: &Geometry) -> Option<f64> {
        match (self, other) {
            (Geometry::Point(a), Geometry::Point(b)) => Some(a.distance(*b)),
            (Geometry::Line(a), Geometry::Line(b)) => Some(a.distance_to_line(b)),
            (Geometry::Circle(a), Geometry::Circle(b)) => {
                Some(a.centre.distance(b.centre) + (a.radius - b.radius).abs())
            }
            _ => None,
        }
    }

    /// Closest point of this geometry to `point`.
    #[must_use]
    pub fn nearest_point(&self, point: DVec2) -> DVec2 {
        match self {
            Geometry::Point(p) => *p,
            Geometry::Line(line) => line.project(point),
            Geometry::Circle(circle) => circle.nearest_point(point),
        }
    }

    /// All coordinates are finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        match self {
            Geometry::Point(p) => p.is_finite(),
            Geometry::Line(line) => line.anchor.is_finite() && line.direction.is_finite(),
            Geometry::Circle(circle) => circle.centre.is_finite() && circle.radius.is_finite(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
