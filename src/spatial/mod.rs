//! Spatial indexing for the active object population
//!
//! This module buckets object ids into 16-unit cubic cells and answers the
//! candidate-set queries behind radius and box lookups. Results are cell
//! resolution; callers apply the exact geometric filter.

mod key;
mod map;

pub use key::{SpatialKey, CELL_SIZE};
pub use map::{Containment, SpatialMap, SpatialMapStats};
