// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::ops::ControlFlow;

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use understory_scan::{Aabb2D, BoxScanner, TouchTree};

fn gen_grid_rects(n: usize, cell: f64, scale: f64) -> Vec<Aabb2D<f64>> {
    let mut out = Vec::with_capacity(n * n);
    for y in 0..n {
        for x in 0..n {
            let x0 = x as f64 * cell;
            let y0 = y as f64 * cell;
            out.push(Aabb2D::<f64>::from_xywh(x0, y0, cell * scale, cell * scale));
        }
    }
    out
}

#[derive(Clone)]
struct Rng(u64);

impl Rng {
    fn new(seed: u64) -> Self {
        Self(seed)
    }
    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }
    fn next_f64(&mut self) -> f64 {
        let v = self.next_u64() >> 11;
        (v as f64) / ((1u64 << 53) as f64)
    }
}

fn gen_random_rects(count: usize, extent: f64, size: f64) -> Vec<Aabb2D<f64>> {
    let mut rng = Rng::new(0xCAFE_F00D_DEAD_BEEF);
    (0..count)
        .map(|_| {
            let x0 = rng.next_f64() * extent;
            let y0 = rng.next_f64() * extent;
            Aabb2D::<f64>::from_xywh(x0, y0, size, size)
        })
        .collect()
}

fn count_pairs(rects: &[Aabb2D<f64>]) -> usize {
    let mut scanner = BoxScanner::with_capacity(rects.len());
    for (i, r) in rects.iter().enumerate() {
        scanner.insert(*r, i);
    }
    let mut n = 0;
    let _ = scanner.process(|_, _| {
        n += 1;
        ControlFlow::Continue(())
    });
    n
}

fn bench_scanner(c: &mut Criterion) {
    let mut group = c.benchmark_group("box_scanner");
    for &n in &[32_usize, 128] {
        let rects = gen_grid_rects(n, 10.0, 1.0);
        group.throughput(Throughput::Elements((n * n) as u64));
        group.bench_function(format!("abutting_grid_n{}", n), |b| {
            b.iter(|| black_box(count_pairs(&rects)));
        });
    }
    let rects = gen_grid_rects(128, 10.0, 0.5);
    group.bench_function("sparse_grid_n128", |b| {
        b.iter(|| black_box(count_pairs(&rects)));
    });
    let rects = gen_random_rects(20_000, 2_000.0, 8.0);
    group.bench_function("random_20k", |b| {
        b.iter(|| black_box(count_pairs(&rects)));
    });
    group.finish();
}

fn bench_touch_tree(c: &mut Criterion) {
    let mut group = c.benchmark_group("touch_tree");
    let rects = gen_grid_rects(256, 10.0, 0.8);
    group.throughput(Throughput::Elements(rects.len() as u64));
    group.bench_function("build_n256", |b| {
        b.iter_batched(
            || rects.iter().copied().zip(0_u32..).collect::<Vec<_>>(),
            |entries| black_box(TouchTree::build(entries)),
            BatchSize::LargeInput,
        );
    });
    let tree = TouchTree::build(rects.iter().copied().zip(0_u32..));
    let queries = gen_random_rects(1_000, 2_560.0, 25.0);
    group.bench_function("query_1k_regions", |b| {
        b.iter(|| {
            let mut hits = 0;
            for q in &queries {
                hits += tree.touching(*q).count();
            }
            black_box(hits)
        });
    });
    group.finish();
}

criterion_group!(benches, bench_scanner, bench_touch_tree);
criterion_main!(benches);
