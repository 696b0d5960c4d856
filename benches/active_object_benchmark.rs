// Benchmarks for the active object manager's query paths
//
// Run with: cargo bench --bench active_object_benchmark
//
// Covers the two hot query shapes (radius and area) at several population
// sizes, plus a churn workload that mutates the manager from inside query
// callbacks the way mob AI does.

use active_object_system::{
    ActiveObject, ActiveObjectManager, ActiveObjectType, Aabb3, ObjectId, ObjectRef, Vec3,
};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

const POS_RANGE: f32 = 2001.0;

#[derive(Debug)]
struct BenchObject {
    id: ObjectId,
    pos: Vec3,
}

impl BenchObject {
    fn at(pos: Vec3) -> ObjectRef {
        Rc::new(RefCell::new(BenchObject {
            id: ObjectId::NONE,
            pos,
        }))
    }
}

impl ActiveObject for BenchObject {
    fn id(&self) -> ObjectId {
        self.id
    }
    fn set_id(&mut self, id: ObjectId) {
        self.id = id;
    }
    fn object_type(&self) -> ActiveObjectType {
        ActiveObjectType::Generic
    }
    fn position(&self) -> Vec3 {
        self.pos
    }
    fn set_position(&mut self, pos: Vec3) {
        self.pos = pos;
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

fn randpos(rng: &mut StdRng) -> Vec3 {
    Vec3::new(
        rng.gen_range(-POS_RANGE..=POS_RANGE),
        rng.gen_range(-20.0..=60.0),
        rng.gen_range(-POS_RANGE..=POS_RANGE),
    )
}

fn fill(manager: &ActiveObjectManager, rng: &mut StdRng, n: usize) {
    for _ in 0..n {
        manager
            .register(BenchObject::at(randpos(rng)))
            .expect("bench population fits the id space");
    }
}

fn bench_inside_radius(c: &mut Criterion) {
    let mut group = c.benchmark_group("inside_radius");
    for &count in &[200usize, 1_450, 10_000] {
        group.bench_function(format!("{count}"), |b| {
            // keep the population identical between runs for comparable numbers
            let mut rng = StdRng::seed_from_u64(2010112);
            let manager = ActiveObjectManager::new();
            fill(&manager, &mut rng, count);
            let mut result = Vec::new();

            b.iter(|| {
                result.clear();
                manager.get_objects_inside_radius(
                    black_box(randpos(&mut rng)),
                    black_box(30.0),
                    &mut result,
                    |_| false,
                );
                result.len()
            });
            manager.clear();
        });
    }
    group.finish();
}

fn bench_in_area(c: &mut Criterion) {
    let mut group = c.benchmark_group("in_area");
    for &count in &[200usize, 1_450, 10_000] {
        group.bench_function(format!("{count}"), |b| {
            let mut rng = StdRng::seed_from_u64(2010112);
            let manager = ActiveObjectManager::new();
            fill(&manager, &mut rng, count);
            let mut result = Vec::new();

            b.iter(|| {
                result.clear();
                let pos = randpos(&mut rng);
                let mut extent = Vec3::new(50.0, 50.0, 50.0);
                extent[rng.gen_range(0..3)] = 10.0;
                let bounds = Aabb3::new(pos, pos + extent);
                manager.get_objects_in_area(black_box(&bounds), &mut result, |_| false);
                result.len()
            });
            manager.clear();
        });
    }
    group.finish();
}

/// The messy case: queries whose callbacks remove neighbors, spawn objects
/// and teleport survivors, interleaved at random.
fn bench_pseudorandom_churn(c: &mut Criterion) {
    c.bench_function("pseudorandom_churn", |b| {
        b.iter(|| {
            let mut rng = StdRng::seed_from_u64(2010112);
            let manager = ActiveObjectManager::new();
            fill(&manager, &mut rng, 1_000);

            let seen = RefCell::new(Vec::new());
            for _ in 0..200 {
                match rng.gen_range(0..3u32) {
                    0 => {
                        // teleport everything the last query touched
                        let new_positions: Vec<(ObjectId, Vec3)> = seen
                            .borrow()
                            .iter()
                            .map(|&id| (id, randpos(&mut rng)))
                            .collect();
                        for (id, to) in new_positions {
                            if let Some(obj) = manager.get(id) {
                                let from = obj.borrow().position();
                                obj.borrow_mut().set_position(to);
                                manager.update_object_position(id, from, to);
                            }
                        }
                    }
                    1 => {
                        let pos = randpos(&mut rng);
                        let bounds = Aabb3::new(pos, pos + Vec3::new(200.0, 50.0, 200.0));
                        seen.borrow_mut().clear();
                        let mut result = Vec::new();
                        manager.get_objects_in_area(&bounds, &mut result, |obj| {
                            churn(&manager, obj, &seen);
                            false
                        });
                    }
                    _ => {
                        seen.borrow_mut().clear();
                        let mut result = Vec::new();
                        manager.get_objects_inside_radius(
                            randpos(&mut rng),
                            300.0,
                            &mut result,
                            |obj| {
                                churn(&manager, obj, &seen);
                                false
                            },
                        );
                    }
                }
            }

            let count = manager.len();
            manager.clear();
            black_box(count)
        });
    });
}

/// Occasionally removes a neighbor or spawns a fresh object, then records
/// the visited id. Mirrors what per-object AI callbacks do on a live server.
fn churn(manager: &ActiveObjectManager, obj: &ObjectRef, seen: &RefCell<Vec<ObjectId>>) {
    let id = obj.borrow().id();
    match id.0 % 80 {
        1 => {
            let neighbor = ObjectId(id.0.wrapping_sub(2));
            if manager.get(neighbor).is_some() {
                manager.remove(neighbor);
            }
        }
        2 => {
            let _ = manager.register(BenchObject::at(Vec3::ZERO));
        }
        _ => {}
    }
    seen.borrow_mut().push(id);
}

criterion_group!(
    benches,
    bench_inside_radius,
    bench_in_area,
    bench_pseudorandom_churn
);
criterion_main!(benches);
