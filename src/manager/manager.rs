//! The public façade over the object store and the spatial index.

use crate::error::RegisterError;
use crate::metrics::{MetricsSink, NullMetrics};
use crate::object::ObjectRef;
use crate::spatial::{Containment, SpatialMap, SpatialMapStats};
use crate::types::{Aabb3, ActiveObjectType, ObjectId, Vec3, WORLD_LIMIT};
use super::store::ObjectStore;
use std::collections::HashSet;
use std::rc::Rc;
use tracing::{debug, error, info, warn};

/// Metric series fed with the live object count once per tick.
const OBJECT_COUNT_METRIC: &str = "ActiveObjectManager: object count [#]";

/// Authoritative registry of the world's active objects.
///
/// Owns the id-to-object table and mirrors every position-affecting event
/// into the spatial index, so the two structures agree whenever no query is
/// in flight. All methods take `&self`; query callbacks may re-enter the
/// manager (register, remove, move, nested queries) and the index absorbs
/// the mutations when the outermost query returns.
///
/// Callbacks must not hold a `borrow()` of an object across a re-entrant
/// manager call.
pub struct ActiveObjectManager {
    store: ObjectStore,
    spatial: SpatialMap,
    world_limit: f32,
    metrics: Rc<dyn MetricsSink>,
}

impl Default for ActiveObjectManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ActiveObjectManager {
    /// A manager with the default world limit and no metrics sink.
    pub fn new() -> Self {
        Self::with_metrics(Rc::new(NullMetrics))
    }

    /// A manager reporting per-tick object counts to `metrics`.
    pub fn with_metrics(metrics: Rc<dyn MetricsSink>) -> Self {
        Self {
            store: ObjectStore::new(),
            spatial: SpatialMap::new(),
            world_limit: WORLD_LIMIT,
            metrics,
        }
    }

    /// Overrides the per-axis world limit used to reject registrations.
    pub fn with_world_limit(mut self, limit: f32) -> Self {
        self.world_limit = limit;
        self
    }

    /// Live object count.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Shared handle to a live object.
    pub fn get(&self, id: ObjectId) -> Option<ObjectRef> {
        self.store.get(id)
    }

    /// Counters of the underlying spatial index.
    pub fn spatial_stats(&self) -> SpatialMapStats {
        self.spatial.stats()
    }

    /// Takes ownership of `obj` and indexes it.
    ///
    /// An object carrying [`ObjectId::NONE`] gets a freshly allocated id,
    /// written back through [`set_id`](crate::ActiveObject::set_id); an
    /// object carrying a nonzero id keeps it if it is free. Registration is
    /// refused when the id space is exhausted, the supplied id is taken, or
    /// the position lies outside the world limit.
    pub fn register(&self, obj: ObjectRef) -> Result<ObjectId, RegisterError> {
        let (supplied, pos) = {
            let obj = obj.borrow();
            (obj.id(), obj.position())
        };
        let id = if supplied.is_none() {
            let fresh = self.store.next_free_id();
            if fresh.is_none() {
                error!("register: no free object id available");
                return Err(RegisterError::IdSpaceExhausted);
            }
            obj.borrow_mut().set_id(fresh);
            fresh
        } else {
            debug!(id = %supplied, "register: caller supplied an id");
            supplied
        };

        if !self.store.is_free(id) {
            error!(%id, "register: id is already in use");
            return Err(RegisterError::IdNotFree(id));
        }
        if self.position_over_limit(pos) {
            warn!(%id, ?pos, limit = self.world_limit, "register: position outside world limit");
            return Err(RegisterError::PositionOutOfBounds(pos));
        }

        self.spatial.insert(id, pos);
        self.store.put(id, obj);
        debug!(%id, count = self.store.len(), "register: object added");
        Ok(id)
    }

    /// Destroys the object with `id` and drops its spatial entry. Unknown
    /// ids are a logged no-op.
    pub fn remove(&self, id: ObjectId) {
        match self.store.get(id) {
            Some(obj) => {
                let pos = obj.borrow().position();
                self.spatial.remove(id, pos);
                self.store.remove(id);
                debug!(%id, "removed object");
            }
            None => info!(%id, "remove: id not found"),
        }
    }

    /// Re-buckets `id` in the spatial index after a position change.
    ///
    /// The caller performs the actual position mutation on the object; this
    /// entry point only keeps the index coherent.
    pub fn update_object_position(&self, id: ObjectId, last_pos: Vec3, new_pos: Vec3) {
        self.spatial.update_position(id, last_pos, new_pos);
    }

    /// Visits every live object once and reports the population to the
    /// metrics sink. Removals made by `f` take effect immediately in the
    /// store; the walk skips objects removed before their turn.
    pub fn step<F>(&self, _dtime: f32, mut f: F)
    where
        F: FnMut(&ObjectRef),
    {
        let mut count: usize = 0;
        self.store.for_each(|_, obj| {
            count += 1;
            f(obj);
        });
        self.metrics.avg(OBJECT_COUNT_METRIC, count as f64);
    }

    /// Removes every object for which `predicate` returns true. Removal
    /// goes through [`ActiveObjectManager::remove`], so the spatial index
    /// stays coherent.
    pub fn clear_if<F>(&self, mut predicate: F)
    where
        F: FnMut(&ObjectRef, ObjectId) -> bool,
    {
        self.store.for_each(|id, obj| {
            if predicate(obj, id) {
                self.remove(id);
            }
        });
    }

    /// Removes every object and resets the spatial index.
    pub fn clear(&self) {
        self.store.clear();
        self.spatial.remove_all();
    }

    /// Appends to `result` every live object within `radius` of `center`
    /// that passes `include`.
    ///
    /// Candidates from cells fully inside the sphere skip the per-object
    /// distance check. `include` may re-enter the manager.
    pub fn get_objects_inside_radius<F>(
        &self,
        center: Vec3,
        radius: f32,
        result: &mut Vec<ObjectRef>,
        mut include: F,
    ) where
        F: FnMut(&ObjectRef) -> bool,
    {
        let radius_sq = radius * radius;
        self.spatial.get_object_ids_in_radius(center, radius, |id, containment| {
            let Some(obj) = self.store.get(id) else {
                self.heal_stale_entry(id);
                return;
            };
            if containment == Containment::Partial
                && obj.borrow().position().distance_squared(center) > radius_sq
            {
                return;
            }
            if include(&obj) {
                result.push(obj);
            }
        });
    }

    /// Appends to `result` every live object inside `bounds` (half-open)
    /// that passes `include`. `include` may re-enter the manager.
    pub fn get_objects_in_area<F>(
        &self,
        bounds: &Aabb3,
        result: &mut Vec<ObjectRef>,
        mut include: F,
    ) where
        F: FnMut(&ObjectRef) -> bool,
    {
        self.spatial.get_relevant_object_ids(bounds, |id| {
            let Some(obj) = self.store.get(id) else {
                self.heal_stale_entry(id);
                return;
            };
            if !bounds.contains(obj.borrow().position()) {
                return;
            }
            if include(&obj) {
                result.push(obj);
            }
        });
    }

    /// Collects the ids of objects near `player_pos` that the client does
    /// not know about yet.
    ///
    /// Gone objects and ids in `current_objects` are skipped. Players are
    /// admitted within `player_radius` (zero disables the player limit);
    /// everything else is admitted within `radius`.
    pub fn get_added_objects_around(
        &self,
        player_pos: Vec3,
        radius: f32,
        player_radius: f32,
        current_objects: &HashSet<ObjectId>,
        added: &mut Vec<ObjectId>,
    ) {
        let offset = radius.max(player_radius);
        let bounds = Aabb3::around(player_pos, offset);
        self.spatial.get_relevant_object_ids(&bounds, |id| {
            let Some(obj) = self.store.get(id) else {
                self.heal_stale_entry(id);
                return;
            };
            let obj = obj.borrow();
            if obj.is_gone() {
                return;
            }
            let distance = obj.position().distance(player_pos);
            if obj.object_type() == ActiveObjectType::Player {
                if distance > player_radius && player_radius != 0.0 {
                    return;
                }
            } else if distance > radius {
                return;
            }
            if current_objects.contains(&id) {
                return;
            }
            added.push(id);
        });
    }

    /// A spatial entry whose id is gone from the store means a removal
    /// bypassed the manager. Queue the entry's removal (a traversal is
    /// active when this fires) and move on.
    fn heal_stale_entry(&self, id: ObjectId) {
        debug!(%id, "healing stale spatial entry");
        self.spatial.remove_by_id(id);
    }

    fn position_over_limit(&self, pos: Vec3) -> bool {
        pos.x.abs() > self.world_limit
            || pos.y.abs() > self.world_limit
            || pos.z.abs() > self.world_limit
    }
}

impl Drop for ActiveObjectManager {
    fn drop(&mut self) {
        if !self.store.is_empty() {
            warn!(count = self.store.len(), "dropping a non-empty object manager");
            self.clear();
        }
    }
}
