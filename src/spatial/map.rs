//! The cell-to-id multimap behind every spatial query.
//!
//! ## Deferred mutations
//!
//! Query callbacks are allowed to insert, move and remove objects while the
//! map is being traversed. Every traversal bumps a reentrant depth counter;
//! while it is nonzero, mutations land in pending queues instead of touching
//! the live index, and they flush in FIFO order (deletes first, then
//! inserts) when the outermost traversal returns. A callback therefore
//! observes the index exactly as it was when its traversal started.
//!
//! ## Adaptive traversal
//!
//! A query region spanning few cells is answered by walking those cells; a
//! region spanning more cells than the map has entries is answered by a
//! linear scan that emits every id and lets the caller's exact geometric
//! filter discard the rest. Radius queries additionally clip their walk per
//! x-column and classify dense cells against the sphere so callers can skip
//! per-object distance checks for cells that are fully inside.

use crate::spatial::key::{axis_span, cell_range, SpatialKey};
use crate::types::{Aabb3, ObjectId, Vec3};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use tracing::{debug, info};

/// Radius above which the walk is clipped column by column. Roughly four
/// cells; below that the whole walk is small enough not to bother.
const COLUMN_CLIP_RADIUS: f32 = 60.0;

/// Buckets with more entries than this are distance-classified against the
/// query sphere before their ids are emitted.
const CLASSIFY_MIN_BUCKET: usize = 3;

/// Extra cell-volume slack granted to radius queries before they fall back
/// to a full scan. Radius walks do more per-cell work than box walks and
/// amortize differently; box queries get no slack.
const RADIUS_SCAN_SLACK: u64 = 100;

type Bucket = SmallVec<[ObjectId; 4]>;
type PendingQueue = SmallVec<[(SpatialKey, ObjectId); 8]>;

/// How a cell relates to the query sphere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Containment {
    /// The cell may straddle the sphere's surface; the caller must apply the
    /// exact distance test to each candidate.
    Partial,
    /// The cell lies entirely inside the sphere; every object in it passes
    /// without a distance check.
    Full,
}

/// Counters describing the map's current shape and traffic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpatialMapStats {
    /// Live (cell, id) entries.
    pub entries: usize,
    /// Occupied cells.
    pub cells: usize,
    /// Queued insertions awaiting the end of the current traversal.
    pub pending_inserts: usize,
    /// Queued deletions awaiting the end of the current traversal.
    pub pending_deletes: usize,
    /// Nesting depth of active traversals.
    pub iter_depth: u32,
    /// Queries answered since construction.
    pub queries: u64,
    /// Queries that fell back to a linear scan of all entries.
    pub full_scans: u64,
}

/// Coarse spatial hash mapping 16-unit cells to the object ids inside them.
///
/// Methods take `&self`: the map is re-entered from query callbacks through
/// the manager, so all state lives behind `Cell`/`RefCell`. The type is
/// deliberately not `Sync`; it belongs to the server tick.
#[derive(Debug, Default)]
pub struct SpatialMap {
    cached: RefCell<HashMap<SpatialKey, Bucket>>,
    entries: Cell<usize>,
    pending_inserts: RefCell<PendingQueue>,
    pending_deletes: RefCell<PendingQueue>,
    pending_clear: Cell<bool>,
    iter_depth: Cell<u32>,
    queries: Cell<u64>,
    full_scans: Cell<u64>,
}

impl SpatialMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live (cell, id) entry count. Pending mutations are not included.
    pub fn len(&self) -> usize {
        self.entries.get()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.get() == 0
    }

    /// Snapshot of the map's counters.
    pub fn stats(&self) -> SpatialMapStats {
        SpatialMapStats {
            entries: self.entries.get(),
            cells: self.cached.borrow().len(),
            pending_inserts: self.pending_inserts.borrow().len(),
            pending_deletes: self.pending_deletes.borrow().len(),
            iter_depth: self.iter_depth.get(),
            queries: self.queries.get(),
            full_scans: self.full_scans.get(),
        }
    }

    /// Adds an entry for `id` in the cell containing `pos`.
    pub fn insert(&self, id: ObjectId, pos: Vec3) {
        let key = SpatialKey::from_world(pos);
        if self.iter_depth.get() > 0 {
            self.pending_inserts.borrow_mut().push((key, id));
        } else {
            self.insert_raw(key, id);
        }
    }

    /// Removes the entry for `id` from the cell containing `pos`. When the
    /// cell lookup misses, falls through to the by-id linear scan; that path
    /// means the caller's position went stale, so it logs when it fires.
    pub fn remove(&self, id: ObjectId, pos: Vec3) {
        let key = SpatialKey::from_world(pos);
        if self.iter_depth.get() > 0 {
            self.pending_deletes.borrow_mut().push((key, id));
        } else {
            self.remove_raw(key, id);
        }
    }

    /// Removes the entry for `id` wherever it lives, by linear scan.
    pub fn remove_by_id(&self, id: ObjectId) {
        if self.iter_depth.get() > 0 {
            self.pending_deletes.borrow_mut().push((SpatialKey::ZERO, id));
        } else if !self.scan_remove(id) {
            info!(%id, "spatial remove: id not present in index");
        }
    }

    /// Drops the entire index.
    pub fn remove_all(&self) {
        if self.iter_depth.get() > 0 {
            self.pending_clear.set(true);
        } else {
            self.cached.borrow_mut().clear();
            self.entries.set(0);
        }
    }

    /// Re-buckets `id` after a position change. A no-op when both positions
    /// share a cell and the entry is already present there.
    pub fn update_position(&self, id: ObjectId, last_pos: Vec3, new_pos: Vec3) {
        let last_key = SpatialKey::from_world(last_pos);
        let new_key = SpatialKey::from_world(new_pos);
        if last_key == new_key {
            let in_place = self
                .cached
                .borrow()
                .get(&new_key)
                .is_some_and(|bucket| bucket.contains(&id));
            if in_place {
                return;
            }
        }
        self.remove(id, last_pos);
        self.insert(id, new_pos);
    }

    /// Invokes `callback` once per id whose cell is relevant to `bounds`.
    ///
    /// Candidates are a superset of the objects inside the box; the caller
    /// applies the exact containment test. `callback` may mutate this map
    /// through any of the methods above; the mutations apply after the
    /// outermost traversal returns.
    pub fn get_relevant_object_ids<F>(&self, bounds: &Aabb3, mut callback: F)
    where
        F: FnMut(ObjectId),
    {
        self.begin_iteration();
        {
            let cached = self.cached.borrow();
            if !cached.is_empty() {
                let (x_lo, x_hi) = cell_range(bounds.min.x, bounds.max.x);
                let (y_lo, y_hi) = cell_range(bounds.min.y, bounds.max.y);
                let (z_lo, z_hi) = cell_range(bounds.min.z, bounds.max.z);
                if walk_volume(x_lo, x_hi, y_lo, y_hi, z_lo, z_hi) <= self.entries.get() as u64 {
                    for x in x_lo..=x_hi {
                        for y in y_lo..=y_hi {
                            for z in z_lo..=z_hi {
                                if let Some(bucket) = cached.get(&SpatialKey::from_raw(x, y, z)) {
                                    for &id in bucket {
                                        callback(id);
                                    }
                                }
                            }
                        }
                    }
                } else {
                    // the box covers more cells than the map has entries;
                    // emitting everything is cheaper than walking the range
                    self.full_scans.set(self.full_scans.get() + 1);
                    for bucket in cached.values() {
                        for &id in bucket {
                            callback(id);
                        }
                    }
                }
            }
        }
        self.end_iteration();
    }

    /// Invokes `callback` once per id whose cell is relevant to the sphere,
    /// tagged with whether the id's whole cell lies inside it.
    ///
    /// Ids tagged [`Containment::Full`] need no per-object distance check
    /// downstream. Mutation rules are the same as for
    /// [`SpatialMap::get_relevant_object_ids`].
    pub fn get_object_ids_in_radius<F>(&self, center: Vec3, radius: f32, mut callback: F)
    where
        F: FnMut(ObjectId, Containment),
    {
        self.begin_iteration();
        {
            let cached = self.cached.borrow();
            if !cached.is_empty() {
                let radius_sq = radius * radius;
                let (x_lo, x_hi) = cell_range(center.x - radius, center.x + radius);
                let (y_lo, y_hi) = cell_range(center.y - radius, center.y + radius);
                let (z_lo, z_hi) = cell_range(center.z - radius, center.z + radius);
                let volume = walk_volume(x_lo, x_hi, y_lo, y_hi, z_lo, z_hi);
                if volume <= self.entries.get() as u64 + RADIUS_SCAN_SLACK {
                    for x in x_lo..=x_hi {
                        let mut y_walk = (y_lo, y_hi);
                        let mut z_walk = (z_lo, z_hi);
                        if radius > COLUMN_CLIP_RADIUS {
                            // project the sphere onto this x-column and skip
                            // the cells the projection cannot reach
                            let (span_lo, span_hi) = axis_span(x);
                            let dx = (span_lo - center.x).max(center.x - span_hi).max(0.0);
                            if dx > radius {
                                continue;
                            }
                            // dx can exceed the radius by a rounding ulp;
                            // clamp so the sqrt cannot go NaN
                            let reach = (radius_sq - dx * dx).max(0.0).sqrt();
                            let (cy_lo, cy_hi) = cell_range(center.y - reach, center.y + reach);
                            y_walk = (y_walk.0.max(cy_lo), y_walk.1.min(cy_hi));
                            let (cz_lo, cz_hi) = cell_range(center.z - reach, center.z + reach);
                            z_walk = (z_walk.0.max(cz_lo), z_walk.1.min(cz_hi));
                        }
                        for y in y_walk.0..=y_walk.1 {
                            for z in z_walk.0..=z_walk.1 {
                                let key = SpatialKey::from_raw(x, y, z);
                                let Some(bucket) = cached.get(&key) else {
                                    continue;
                                };
                                if bucket.len() > CLASSIFY_MIN_BUCKET {
                                    let (min_sq, max_sq) = key.distance_sq_range(center);
                                    if min_sq > radius_sq {
                                        continue;
                                    }
                                    let containment = if max_sq <= radius_sq {
                                        Containment::Full
                                    } else {
                                        Containment::Partial
                                    };
                                    for &id in bucket {
                                        callback(id, containment);
                                    }
                                } else {
                                    for &id in bucket {
                                        callback(id, Containment::Partial);
                                    }
                                }
                            }
                        }
                    }
                } else {
                    self.full_scans.set(self.full_scans.get() + 1);
                    for bucket in cached.values() {
                        for &id in bucket {
                            callback(id, Containment::Partial);
                        }
                    }
                }
            }
        }
        self.end_iteration();
    }

    fn begin_iteration(&self) {
        self.iter_depth.set(self.iter_depth.get() + 1);
        self.queries.set(self.queries.get() + 1);
    }

    fn end_iteration(&self) {
        let depth = self.iter_depth.get() - 1;
        self.iter_depth.set(depth);
        if depth == 0 {
            self.handle_deferred();
        }
    }

    /// Applies every mutation queued during the traversal that just ended.
    /// A queued clear wins outright; otherwise deletes apply before inserts
    /// so a remove-then-reinsert of the same id lands in its new cell.
    fn handle_deferred(&self) {
        if self.pending_clear.replace(false) {
            self.cached.borrow_mut().clear();
            self.entries.set(0);
            self.pending_deletes.borrow_mut().clear();
            self.pending_inserts.borrow_mut().clear();
            return;
        }
        let deletes = std::mem::take(&mut *self.pending_deletes.borrow_mut());
        for (key, id) in deletes {
            if key == SpatialKey::ZERO {
                if !self.scan_remove(id) {
                    debug!(%id, "deferred remove: id not present in index");
                }
            } else {
                self.remove_raw(key, id);
            }
        }
        let inserts = std::mem::take(&mut *self.pending_inserts.borrow_mut());
        for (key, id) in inserts {
            self.insert_raw(key, id);
        }
    }

    fn insert_raw(&self, key: SpatialKey, id: ObjectId) {
        self.cached.borrow_mut().entry(key).or_default().push(id);
        self.entries.set(self.entries.get() + 1);
    }

    fn remove_raw(&self, key: SpatialKey, id: ObjectId) {
        {
            let mut cached = self.cached.borrow_mut();
            if let Some(bucket) = cached.get_mut(&key) {
                if let Some(index) = bucket.iter().position(|&entry| entry == id) {
                    bucket.remove(index);
                    if bucket.is_empty() {
                        cached.remove(&key);
                    }
                    self.entries.set(self.entries.get() - 1);
                    return;
                }
            }
        }
        // the targeted cell does not hold the id; the caller's position was
        // stale, so fall back to scanning every bucket
        if self.scan_remove(id) {
            info!(%id, "spatial remove fell back to a full scan");
        } else {
            info!(%id, "spatial remove: id not present in index");
        }
    }

    /// Linear scan across every bucket; removes the first entry for `id`.
    fn scan_remove(&self, id: ObjectId) -> bool {
        let mut cached = self.cached.borrow_mut();
        let mut hit = None;
        for (&key, bucket) in cached.iter_mut() {
            if let Some(index) = bucket.iter().position(|&entry| entry == id) {
                bucket.remove(index);
                hit = Some((key, bucket.is_empty()));
                break;
            }
        }
        match hit {
            Some((key, emptied)) => {
                if emptied {
                    cached.remove(&key);
                }
                self.entries.set(self.entries.get() - 1);
                true
            }
            None => false,
        }
    }
}

fn walk_volume(x_lo: i16, x_hi: i16, y_lo: i16, y_hi: i16, z_lo: i16, z_hi: i16) -> u64 {
    let span = |lo: i16, hi: i16| (hi as i64 - lo as i64 + 1).max(0) as u64;
    span(x_lo, x_hi) * span(y_lo, y_hi) * span(z_lo, z_hi)
}
