//! Basic benchmarks for the `recycle_pool` crate.
#![allow(
    missing_docs,
    reason = "No need for API documentation in benchmark code"
)]

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use recycle_pool::{
    ArrayAllocator, ArrayHooks, GrowthPolicy, ObjectPool, PoolHooks, Queue, QueueAllocator,
    QueueSlots, SharedPool, SlotHooks, Stack, StackAllocator, StackSlots,
};

criterion_group!(benches, entrypoint);
criterion_main!(benches);

struct Plain;

impl PoolHooks for Plain {
    type Item = u64;
    type Args = u64;

    fn init(&self, args: u64) -> u64 {
        args
    }

    fn copy(&self, original: &u64) -> u64 {
        *original
    }
}

impl ArrayHooks for Plain {
    type Header = ();
    type Elt = u64;

    fn init_header(&self) {}

    fn init_elt(&self, _index: usize) -> u64 {
        0
    }

    fn copy_header(&self, _original: &()) {}

    fn copy_elt(&self, _index: usize, original: &u64) -> u64 {
        *original
    }
}

impl SlotHooks for Plain {
    type Item = u64;

    fn init(&self, _index: usize) -> u64 {
        0
    }

    fn copy(&self, _index: usize, original: &u64) -> u64 {
        *original
    }
}

const TEST_VALUE: u64 = 1024;

fn entrypoint(c: &mut Criterion) {
    let mut group = c.benchmark_group("recycle_basic");

    group.bench_function("pool_allocate_release", |b| {
        let mut pool = ObjectPool::new(Plain);

        b.iter(|| {
            let key = pool.allocate(black_box(TEST_VALUE));
            pool.release(black_box(key));
        });
    });

    group.bench_function("shared_allocate_release", |b| {
        let pool = SharedPool::new(Plain);

        b.iter(|| {
            let object = pool.allocate(black_box(TEST_VALUE));
            black_box(object.retain()).release();
            object.release();
        });
    });

    group.bench_function("array_create_recycled", |b| {
        let allocator = ArrayAllocator::builder()
            .policy(GrowthPolicy::Log2)
            .build(Plain);

        b.iter(|| drop(black_box(allocator.create(black_box(100)))));
    });

    group.bench_function("array_grow_to_1024", |b| {
        let allocator = ArrayAllocator::builder()
            .policy(GrowthPolicy::Log2)
            .build(Plain);

        b.iter(|| {
            let mut array = allocator.create(1);

            while array.len() < 1024 {
                let len = array.len() * 2;
                array = array.resize(len);
            }

            black_box(array)
        });
    });

    group.bench_function("queue_round_trip_100", |b| {
        let allocator = QueueAllocator::new(QueueSlots::new(Plain));
        let mut queue = Queue::new(&allocator);

        b.iter(|| {
            for value in 0..100 {
                queue.enqueue(black_box(value));
            }

            while !queue.is_empty() {
                _ = black_box(queue.dequeue());
            }
        });
    });

    group.bench_function("stack_round_trip_100", |b| {
        let allocator = StackAllocator::new(StackSlots::new(Plain));
        let mut stack = Stack::new(&allocator);

        b.iter(|| {
            for value in 0..100 {
                stack.push(black_box(value));
            }

            while !stack.is_empty() {
                _ = black_box(stack.pop());
            }
        });
    });

    group.finish();
}
