//! Id-to-object table with stable iteration and the id allocator.

use crate::object::ObjectRef;
use crate::types::ObjectId;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

/// Owns the live objects, keyed by id.
///
/// Iteration walks a snapshot of the key set and re-resolves each id, so a
/// callback may remove any object mid-walk: removed entries simply resolve
/// to nothing and are skipped. Objects inserted during a walk are not
/// visited by it; callers must not rely on either outcome.
#[derive(Debug, Default)]
pub struct ObjectStore {
    objects: RefCell<HashMap<ObjectId, ObjectRef>>,
    last_used_id: Cell<u16>,
}

impl ObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.objects.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.borrow().is_empty()
    }

    /// Inserts an object under `id`. The id must be free.
    pub fn put(&self, id: ObjectId, obj: ObjectRef) {
        debug_assert!(self.is_free(id), "object id {id} is not free");
        self.objects.borrow_mut().insert(id, obj);
    }

    /// Shared handle to the object with `id`, if it is live.
    pub fn get(&self, id: ObjectId) -> Option<ObjectRef> {
        self.objects.borrow().get(&id).cloned()
    }

    /// Destroys the entry for `id`. Returns false when the id is unknown.
    pub fn remove(&self, id: ObjectId) -> bool {
        self.objects.borrow_mut().remove(&id).is_some()
    }

    /// Drops every object.
    pub fn clear(&self) {
        self.objects.borrow_mut().clear();
    }

    /// Visits every live object once. Tolerates removals made by `f`.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(ObjectId, &ObjectRef),
    {
        let ids: Vec<ObjectId> = self.objects.borrow().keys().copied().collect();
        for id in ids {
            if let Some(obj) = self.get(id) {
                f(id, &obj);
            }
        }
    }

    /// Whether `id` can be assigned to a new object. The reserved zero id is
    /// never free.
    pub fn is_free(&self, id: ObjectId) -> bool {
        !id.is_none() && !self.objects.borrow().contains_key(&id)
    }

    /// The next free id, reusing released ids as late as possible.
    /// Returns [`ObjectId::NONE`] when the entire id space is occupied.
    pub fn next_free_id(&self) -> ObjectId {
        let start = self.last_used_id.get();
        loop {
            let candidate = self.last_used_id.get().wrapping_add(1);
            self.last_used_id.set(candidate);
            if self.is_free(ObjectId(candidate)) {
                return ObjectId(candidate);
            }
            if candidate == start {
                return ObjectId::NONE;
            }
        }
    }
}
