//! Collision seam consumed by the movement function.
//!
//! The engine's sweep-and-slide and grounded ray queries live behind the
//! [`Collision`] trait. [`PlaneWorld`] is a reference implementation built from
//! infinite planes, enough for a floor and arena walls.

use crate::math::{Rotator, Vec3};
use serde::{Deserialize, Serialize};

/// Tolerance for treating a point as resting on a plane.
const CONTACT_EPSILON: f32 = 1e-4;

/// Result of a single sweep-and-slide move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sweep {
    /// Displacement actually applied, including the slide along the hit surface.
    pub displacement: Vec3,
    /// Normal of the blocking surface, zero when nothing was hit.
    pub normal: Vec3,
    pub hit: bool,
}

impl Sweep {
    pub fn clear(displacement: Vec3) -> Self {
        Self {
            displacement,
            normal: Vec3::ZERO,
            hit: false,
        }
    }
}

/// Movement queries the shared movement function depends on.
///
/// Implementations must be pure functions of their inputs, since the client
/// and server each run them independently and expect identical answers.
pub trait Collision {
    /// Moves from `from` by `displacement`, stopping at the first blocking
    /// surface and sliding the remainder along it. One iteration only.
    fn sweep_and_slide(&self, from: Vec3, displacement: Vec3, facing: Rotator) -> Sweep;

    /// Short downward ray from the pawn's vertical centre.
    fn is_grounded(&self, location: Vec3) -> bool;
}

/// Infinite plane: points with `normal . p - offset >= 0` are outside.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Plane {
    pub normal: Vec3,
    pub offset: f32,
}

impl Plane {
    pub fn new(normal: Vec3, point_on_plane: Vec3) -> Self {
        let normal = normal.normalize();
        Self {
            normal,
            offset: normal.dot(&point_on_plane),
        }
    }

    pub fn signed_distance(&self, point: Vec3) -> f32 {
        self.normal.dot(&point) - self.offset
    }
}

/// Collision world made of solid half-spaces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaneWorld {
    planes: Vec<Plane>,
    ground_probe: f32,
}

impl PlaneWorld {
    pub fn new(ground_probe: f32) -> Self {
        Self {
            planes: Vec::new(),
            ground_probe,
        }
    }

    /// A single horizontal floor at height `floor_z`.
    pub fn flat(floor_z: f32, ground_probe: f32) -> Self {
        Self::new(ground_probe).with_plane(Plane::new(Vec3::UP, Vec3::new(0.0, 0.0, floor_z)))
    }

    /// Floor at z = 0 enclosed by four walls `half_extent` from the origin.
    pub fn arena(half_extent: f32, ground_probe: f32) -> Self {
        Self::flat(0.0, ground_probe)
            .with_plane(Plane::new(
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(-half_extent, 0.0, 0.0),
            ))
            .with_plane(Plane::new(
                Vec3::new(-1.0, 0.0, 0.0),
                Vec3::new(half_extent, 0.0, 0.0),
            ))
            .with_plane(Plane::new(
                Vec3::new(0.0, 1.0, 0.0),
                Vec3::new(0.0, -half_extent, 0.0),
            ))
            .with_plane(Plane::new(
                Vec3::new(0.0, -1.0, 0.0),
                Vec3::new(0.0, half_extent, 0.0),
            ))
    }

    pub fn with_plane(mut self, plane: Plane) -> Self {
        self.planes.push(plane);
        self
    }

    pub fn planes(&self) -> &[Plane] {
        &self.planes
    }
}

impl Collision for PlaneWorld {
    fn sweep_and_slide(&self, from: Vec3, displacement: Vec3, _facing: Rotator) -> Sweep {
        let mut earliest: Option<(f32, Plane)> = None;

        for plane in &self.planes {
            let approach = plane.normal.dot(&displacement);
            if approach >= 0.0 {
                continue;
            }

            let start = plane.signed_distance(from);
            let end = plane.signed_distance(from + displacement);
            if start < -CONTACT_EPSILON || end >= 0.0 {
                continue;
            }

            let time = (start / -approach).clamp(0.0, 1.0);
            if earliest.map_or(true, |(t, _)| time < t) {
                earliest = Some((time, *plane));
            }
        }

        let Some((time, plane)) = earliest else {
            return Sweep::clear(displacement);
        };

        let contact = displacement * time;
        let remainder = displacement * (1.0 - time);
        let slide = remainder - plane.normal * remainder.dot(&plane.normal);

        Sweep {
            displacement: contact + slide,
            normal: plane.normal,
            hit: true,
        }
    }

    fn is_grounded(&self, location: Vec3) -> bool {
        let start = location + Vec3::UP * self.ground_probe;
        let end = location - Vec3::UP * self.ground_probe;

        self.planes.iter().any(|plane| {
            plane.signed_distance(start) >= -CONTACT_EPSILON && plane.signed_distance(end) <= 0.0
        })
    }
}
