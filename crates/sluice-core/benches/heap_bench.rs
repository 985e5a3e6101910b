//! Benchmarks for the heap and queue primitives.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};

use sluice_core::cursor::{Cursor, IterCursor};
use sluice_core::heap::ArrayHeap;
use sluice_core::queue::{Queue, ResizableArrayQueue};
use sluice_core::sort::ReplacementSelection;

fn bench_heap_enqueue_dequeue(c: &mut Criterion) {
    c.bench_function("heap_enqueue_dequeue_1000", |b| {
        b.iter(|| {
            let mut heap = ArrayHeap::with_capacity(1000, i32::cmp);
            for i in 0..1000 {
                heap.enqueue((i * 7919) % 1000).unwrap();
            }
            while let Ok(min) = heap.dequeue() {
                black_box(min);
            }
        });
    });
}

fn bench_heap_init(c: &mut Criterion) {
    let items: Vec<i32> = (0..10_000).map(|i| (i * 7919) % 10_000).collect();
    c.bench_function("heap_init_10000", |b| {
        b.iter(|| {
            let heap = ArrayHeap::from_vec(items.clone(), i32::cmp).unwrap();
            black_box(heap.len())
        });
    });
}

fn bench_heap_replace(c: &mut Criterion) {
    c.bench_function("heap_replace_10000", |b| {
        let base: Vec<i32> = (0..1000).collect();
        b.iter(|| {
            let mut heap = ArrayHeap::from_vec(base.clone(), i32::cmp).unwrap();
            for i in 1000..11_000 {
                let min = heap.replace(i).unwrap();
                black_box(min);
            }
        });
    });
}

fn bench_replacement_selection(c: &mut Criterion) {
    let items: Vec<i32> = (0..10_000).map(|i| (i * 104_729) % 10_000).collect();
    c.bench_function("replacement_selection_10000", |b| {
        b.iter(|| {
            let mut generator = ReplacementSelection::new(
                IterCursor::new(items.clone().into_iter()),
                256,
                i32::cmp,
            )
            .unwrap();
            let mut count = 0usize;
            while generator.has_next() {
                black_box(generator.next().unwrap());
                count += 1;
            }
            black_box(count)
        });
    });
}

fn bench_resizable_queue(c: &mut Criterion) {
    c.bench_function("resizable_queue_cycle_10000", |b| {
        b.iter(|| {
            let mut queue = ResizableArrayQueue::new();
            for i in 0..10_000 {
                queue.enqueue(i);
            }
            while let Some(item) = queue.dequeue() {
                black_box(item);
            }
        });
    });
}

criterion_group!(
    benches,
    bench_heap_enqueue_dequeue,
    bench_heap_init,
    bench_heap_replace,
    bench_replacement_selection,
    bench_resizable_queue
);
criterion_main!(benches);
