//! Error types for the active object system

use crate::types::{ObjectId, Vec3};
use thiserror::Error;

/// Reasons an object registration can be refused.
///
/// Registration is the only fallible operation on the manager; everything
/// else is total and degrades to a logged no-op.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum RegisterError {
    /// The 16-bit id space is fully occupied.
    #[error("no free object id available")]
    IdSpaceExhausted,

    /// The caller supplied an id that is already bound to a live object.
    #[error("object id {0} is already in use")]
    IdNotFree(ObjectId),

    /// The object's position lies outside the addressable world.
    #[error("object position {0:?} is outside the world limit")]
    PositionOutOfBounds(Vec3),
}
