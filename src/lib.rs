//! # Active Object System
//!
//! The server-side registry and spatial index for the live population of a
//! voxel game world: players, mobs and dropped items. The subsystem answers
//! the two questions the server tick asks tens of thousands of times per
//! second: "which objects are near this point?" and "which objects sit
//! inside this box?".
//!
//! ## Architecture
//!
//! Two tightly coupled layers:
//!
//! - [`ActiveObjectManager`] owns the objects. It allocates compact 16-bit
//!   ids, drives per-tick iteration, and keeps the spatial index coherent on
//!   every registration, removal and position change.
//! - [`SpatialMap`] buckets object ids by 16-unit cubic cell and supplies the
//!   candidate sets behind radius and axis-aligned-box queries.
//!
//! Query callbacks are allowed to mutate the manager while a query is still
//! iterating. The spatial map absorbs this with a reentrant traversal counter
//! and pending-mutation queues that flush when the outermost traversal
//! finishes, so callers never observe a half-updated index.
//!
//! ## Threading
//!
//! The subsystem is single-threaded by contract and belongs to the server
//! tick. Objects are shared as [`ObjectRef`] (`Rc<RefCell<…>>`); nothing here
//! is `Send` or `Sync`.
//!
//! ## Quick Start Example
//!
//! ```rust
//! use active_object_system::{ActiveObjectManager, ObjectRef, Vec3};
//! # use active_object_system::{ActiveObject, ActiveObjectType, ObjectId};
//! # use std::{any::Any, cell::RefCell, rc::Rc};
//! # #[derive(Debug)]
//! # struct Mob { id: ObjectId, pos: Vec3 }
//! # impl ActiveObject for Mob {
//! #     fn id(&self) -> ObjectId { self.id }
//! #     fn set_id(&mut self, id: ObjectId) { self.id = id; }
//! #     fn object_type(&self) -> ActiveObjectType { ActiveObjectType::Mob }
//! #     fn position(&self) -> Vec3 { self.pos }
//! #     fn set_position(&mut self, pos: Vec3) { self.pos = pos; }
//! #     fn as_any(&self) -> &dyn Any { self }
//! #     fn as_any_mut(&mut self) -> &mut dyn Any { self }
//! # }
//!
//! let manager = ActiveObjectManager::new();
//! let mob: ObjectRef = Rc::new(RefCell::new(Mob {
//!     id: ObjectId::NONE,
//!     pos: Vec3::new(10.0, 0.0, -4.0),
//! }));
//! let id = manager.register(mob).expect("fresh manager has free ids");
//!
//! let mut nearby = Vec::new();
//! manager.get_objects_inside_radius(Vec3::new(0.0, 0.0, 0.0), 32.0, &mut nearby, |_| true);
//! assert_eq!(nearby.len(), 1);
//!
//! manager.remove(id);
//! ```

pub mod error;
pub mod manager;
pub mod metrics;
pub mod object;
pub mod spatial;
pub mod types;

// ============================================================================
// Public API re-exports
// ============================================================================

pub use error::RegisterError;
pub use manager::{ActiveObjectManager, ObjectStore};
pub use metrics::{AverageTracker, MetricsSink, NullMetrics};
pub use object::{ActiveObject, ObjectRef};
pub use spatial::{Containment, SpatialKey, SpatialMap, SpatialMapStats};
pub use types::{Aabb3, ActiveObjectType, ObjectId, Vec3, WORLD_LIMIT};
