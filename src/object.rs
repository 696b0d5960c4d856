//! # Active Object Trait
//!
//! The contract an entity must satisfy to live in the manager. The manager
//! never inspects behavior; it needs an identity, a position, a category tag
//! and the gone flag that visibility scans consult.

use crate::types::{ActiveObjectType, ObjectId, Vec3};
use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A server-side runtime entity with a world position.
///
/// Implementations own their game state; the manager only reads the fields
/// below and assigns the id once during registration. Position is
/// authoritative between manager-mediated updates: code that moves an object
/// directly must follow up with
/// [`ActiveObjectManager::update_object_position`](crate::ActiveObjectManager::update_object_position)
/// so the spatial index stays coherent.
pub trait ActiveObject: fmt::Debug + Any {
    /// The object's id, or [`ObjectId::NONE`] before registration.
    fn id(&self) -> ObjectId;

    /// Called once by the manager when it assigns a fresh id.
    fn set_id(&mut self, id: ObjectId);

    /// The category tag consulted by visibility scans.
    fn object_type(&self) -> ActiveObjectType;

    /// Current world position.
    fn position(&self) -> Vec3;

    /// Moves the object. Callers outside the manager must also notify the
    /// manager of the change.
    fn set_position(&mut self, pos: Vec3);

    /// Logically destroyed, awaiting physical removal. Gone objects stay
    /// queryable but are skipped by the added-objects-around-player scan.
    fn is_gone(&self) -> bool {
        false
    }

    /// Upcast for downcasting to the concrete type.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for downcasting to the concrete type.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Shared handle to an active object.
///
/// The subsystem is single-threaded by contract, so objects are shared with
/// `Rc<RefCell<…>>` rather than atomics. Query callbacks receive these
/// handles and may re-enter the manager, but must not hold a `borrow()` of
/// an object across such a re-entrant call.
pub type ObjectRef = Rc<RefCell<dyn ActiveObject>>;
