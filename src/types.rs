//! # Core Type Definitions
//!
//! Fundamental value types shared by the object manager and the spatial
//! index: object identifiers, the object category tag, and the small vector
//! math surface the queries are built on.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Index, IndexMut, Sub};

/// Default world limit in world units, applied per axis.
///
/// Objects registered with any coordinate beyond this range are rejected;
/// the map generator never places terrain past it, so an object out there is
/// a caller bug.
pub const WORLD_LIMIT: f32 = 31_000.0;

/// Compact identifier for an active object.
///
/// Ids are 16-bit and allocated densely from a free pool. The zero id is
/// reserved as "none": a freshly created object carries [`ObjectId::NONE`]
/// until the manager assigns it a real id during registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub u16);

impl ObjectId {
    /// The reserved "no object" id.
    pub const NONE: ObjectId = ObjectId(0);

    /// Returns true for the reserved zero id.
    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Category tag carried by every active object.
///
/// Only [`ActiveObjectType::Player`] changes query behavior: the
/// added-objects-around-player scan admits players by the player radius
/// rather than the general one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActiveObjectType {
    /// A connected player's avatar.
    Player,
    /// A scripted creature.
    Mob,
    /// A dropped item entity.
    Item,
    /// Anything else the server tracks.
    Generic,
}

/// A 3D position or displacement in world units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    /// The origin.
    pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };

    /// Creates a new vector with the specified components.
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance to `other`.
    pub fn distance(self, other: Vec3) -> f32 {
        self.distance_squared(other).sqrt()
    }

    /// Squared Euclidean distance to `other`.
    ///
    /// Prefer this over [`Vec3::distance`] in hot filters and compare
    /// against a squared radius; it skips the square root.
    pub fn distance_squared(self, other: Vec3) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dx * dx + dy * dy + dz * dz
    }
}

impl Add for Vec3 {
    type Output = Vec3;

    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Vec3;

    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Index<usize> for Vec3 {
    type Output = f32;

    fn index(&self, axis: usize) -> &f32 {
        match axis {
            0 => &self.x,
            1 => &self.y,
            2 => &self.z,
            _ => panic!("vector axis out of range: {axis}"),
        }
    }
}

impl IndexMut<usize> for Vec3 {
    fn index_mut(&mut self, axis: usize) -> &mut f32 {
        match axis {
            0 => &mut self.x,
            1 => &mut self.y,
            2 => &mut self.z,
            _ => panic!("vector axis out of range: {axis}"),
        }
    }
}

/// An axis-aligned box in world space.
///
/// Containment is half-open: a point on the minimum face is inside, a point
/// on the maximum face is not. Queries rely on this so that tiling boxes
/// partition space without double-counting objects on shared faces.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb3 {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb3 {
    /// Creates a box from its corners.
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// The cube of half-extent `half_extent` centered on `center`; the
    /// bounding box of a sphere when `half_extent` is its radius.
    pub fn around(center: Vec3, half_extent: f32) -> Self {
        let offset = Vec3::new(half_extent, half_extent, half_extent);
        Self { min: center - offset, max: center + offset }
    }

    /// Half-open containment test: `min <= p < max` on every axis.
    pub fn contains(&self, p: Vec3) -> bool {
        p.x >= self.min.x
            && p.x < self.max.x
            && p.y >= self.min.y
            && p.y < self.max.y
            && p.z >= self.min.z
            && p.z < self.max.z
    }

    /// Returns the box grown by `by` units on every face.
    pub fn expanded(&self, by: f32) -> Self {
        let offset = Vec3::new(by, by, by);
        Self { min: self.min - offset, max: self.max + offset }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_id_none() {
        assert!(ObjectId::NONE.is_none());
        assert!(!ObjectId(1).is_none());
        assert_eq!(format!("{}", ObjectId(42)), "42");
    }

    #[test]
    fn distance_squared_matches_distance() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(-2.0, 4.0, 3.5);
        let d = a.distance(b);
        assert!((d * d - a.distance_squared(b)).abs() < 1e-4);
    }

    #[test]
    fn vector_axis_indexing() {
        let mut v = Vec3::new(1.0, 2.0, 3.0);
        assert_eq!(v[0], 1.0);
        assert_eq!(v[2], 3.0);
        v[1] = 9.0;
        assert_eq!(v.y, 9.0);
    }

    #[test]
    fn aabb_containment_is_half_open() {
        let b = Aabb3::new(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(5.0, 1.0, 1.0));
        assert!(b.contains(Vec3::new(-1.0, 0.0, 0.0)));
        assert!(b.contains(Vec3::new(4.9, 0.0, 0.0)));
        assert!(!b.contains(Vec3::new(5.0, 0.0, 0.0)));
        assert!(!b.contains(Vec3::new(0.0, 1.0, 0.0)));
    }

    #[test]
    fn aabb_around_and_expanded() {
        let b = Aabb3::around(Vec3::new(10.0, 0.0, 0.0), 5.0);
        assert_eq!(b.min, Vec3::new(5.0, -5.0, -5.0));
        assert_eq!(b.max, Vec3::new(15.0, 5.0, 5.0));

        let grown = b.expanded(1.0);
        assert_eq!(grown.min, Vec3::new(4.0, -6.0, -6.0));
        assert_eq!(grown.max, Vec3::new(16.0, 6.0, 6.0));
    }

    #[test]
    fn core_types_serialize() {
        let id: ObjectId = serde_json::from_str("7").unwrap();
        assert_eq!(id, ObjectId(7));

        let v = Vec3::new(1.5, -2.0, 0.25);
        let round_tripped: Vec3 = serde_json::from_str(&serde_json::to_string(&v).unwrap()).unwrap();
        assert_eq!(round_tripped, v);
    }
}
