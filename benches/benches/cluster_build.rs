// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use kurbo::{Affine, Line, Point, Rect, Vec2};
use understory_cell_tree::{CellId, CellInstArray, LayerId, Layout, ShapeKinds};
use understory_clusters::{Connectivity, HierClusters};
use understory_edge_bool::{EdgeBoolOp, edge_boolean};

const METAL: LayerId = LayerId(1);
const VIA: LayerId = LayerId(2);

fn relation() -> Connectivity {
    let mut conn = Connectivity::new();
    conn.connect_self(METAL).connect(METAL, VIA);
    conn
}

/// A flat cell of `n` horizontal wires with a via ladder tying every other pair.
fn flat_wires(n: usize) -> (Layout, CellId) {
    let mut layout = Layout::new();
    let top = layout.add_cell("TOP");
    for i in 0..n {
        let y = i as f64 * 4.0;
        layout
            .insert_shape(top, METAL, Rect::new(0.0, y, 1_000.0, y + 2.0))
            .unwrap();
        if i % 2 == 1 {
            layout
                .insert_shape(top, VIA, Rect::new(10.0, y - 2.0, 12.0, y))
                .unwrap();
        }
    }
    (layout, top)
}

/// A `side` x `side` array of abutting bit cells, each holding a wire and a via.
fn bit_array(side: u32) -> (Layout, CellId) {
    let mut layout = Layout::new();
    let top = layout.add_cell("TOP");
    let bit = layout.add_cell("BIT");
    layout.insert_shape(bit, METAL, Rect::new(0.0, 0.0, 10.0, 2.0)).unwrap();
    layout.insert_shape(bit, VIA, Rect::new(4.0, 2.0, 6.0, 4.0)).unwrap();
    let array = CellInstArray::array(
        bit,
        Affine::IDENTITY,
        Vec2::new(10.0, 0.0),
        side,
        Vec2::new(0.0, 8.0),
        side,
    );
    layout.insert_instance(top, array).unwrap();
    (layout, top)
}

fn bench_flat(c: &mut Criterion) {
    let mut group = c.benchmark_group("hier_clusters_flat");
    let conn = relation();
    for &n in &[256_usize, 2_048] {
        let (layout, top) = flat_wires(n);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_function(format!("wires_n{}", n), |b| {
            b.iter(|| {
                let mut hc = HierClusters::new();
                hc.build(&layout, top, ShapeKinds::default(), &conn).unwrap();
                black_box(hc)
            });
        });
    }
    group.finish();
}

fn bench_array(c: &mut Criterion) {
    let mut group = c.benchmark_group("hier_clusters_array");
    let conn = relation();
    for &side in &[16_u32, 64] {
        let (layout, top) = bit_array(side);
        group.throughput(Throughput::Elements(u64::from(side) * u64::from(side)));
        group.bench_function(format!("abutting_bits_{}x{}", side, side), |b| {
            b.iter(|| {
                let mut hc = HierClusters::new();
                hc.build(&layout, top, ShapeKinds::default(), &conn).unwrap();
                black_box(hc)
            });
        });
    }
    group.finish();
}

fn bench_edges(c: &mut Criterion) {
    let mut group = c.benchmark_group("edge_boolean");
    let a: Vec<Line> = (0..2_000)
        .map(|i| {
            let x = f64::from(i) * 3.0;
            Line::new(Point::new(x, 0.0), Point::new(x + 2.0, 0.0))
        })
        .collect();
    let b: Vec<Line> = (0..2_000)
        .map(|i| {
            let x = f64::from(i) * 3.0 + 1.0;
            Line::new(Point::new(x, 0.0), Point::new(x + 2.0, 0.0))
        })
        .collect();
    group.throughput(Throughput::Elements((a.len() + b.len()) as u64));
    for op in [EdgeBoolOp::Or, EdgeBoolOp::And, EdgeBoolOp::Xor] {
        group.bench_function(format!("{op:?}_collinear_4k"), |bench| {
            bench.iter(|| black_box(edge_boolean(&a, &b, op)));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_flat, bench_array, bench_edges);
criterion_main!(benches);
