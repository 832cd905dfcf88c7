// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Large arrays next to a neighbour.
//!
//! A 1000 x 1000 array of bit cells sits beside a single strap cell. Only the
//! elements along the shared border are visited, so the build stays quick even
//! though the array holds a million placements. The edge boolean at the end
//! merges the strap's outline with the array's left border.
//!
//! Run:
//! - `cargo run -p understory_demos --example array_neighbors`

use std::error::Error;

use kurbo::{Affine, Line, Point, Rect, Vec2};
use tracing_subscriber::EnvFilter;
use understory_cell_tree::{CellInstArray, LayerId, Layout, ShapeKinds};
use understory_clusters::{Connectivity, HierClusters};
use understory_edge_bool::{EdgeBoolOp, edge_boolean};

const METAL: LayerId = LayerId(1);

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut layout = Layout::new();
    let top = layout.add_cell("TOP");
    let bit = layout.add_cell("BIT");
    let strap = layout.add_cell("STRAP");

    // Bits are smaller than their pitch, so elements never touch each other.
    layout.insert_shape(bit, METAL, Rect::new(0.0, 0.0, 8.0, 8.0))?;
    layout.insert_shape(strap, METAL, Rect::new(0.0, 0.0, 2.0, 10_000.0))?;

    let n = 1_000;
    let array = CellInstArray::array(
        bit,
        Affine::IDENTITY,
        Vec2::new(10.0, 0.0),
        n,
        Vec2::new(0.0, 10.0),
        n,
    );
    layout.insert_instance(top, array)?;
    layout.insert_instance(
        top,
        CellInstArray::single(strap, Affine::translate(Vec2::new(-2.0, 0.0))),
    )?;

    let mut conn = Connectivity::new();
    conn.connect_self(METAL);

    let mut hc = HierClusters::new();
    hc.build(&layout, top, ShapeKinds::default(), &conn)?;

    let graph = hc
        .clusters_per_cell(top)
        .ok_or("top cell was not built")?;
    println!("array elements: {}", u64::from(n) * u64::from(n));
    println!("connectors in TOP: {}", graph.connector_count());
    for id in graph.cluster_ids() {
        println!(
            "  connector {id} joins {} placements",
            graph.connections_for_cluster(id).len()
        );
    }

    // Strap right edge against the array's left border, both running upward.
    let strap_edge = [Line::new(Point::new(0.0, 0.0), Point::new(0.0, 10_000.0))];
    let border: Vec<Line> = (0..n)
        .map(|j| {
            let y = f64::from(j) * 10.0;
            Line::new(Point::new(0.0, y), Point::new(0.0, y + 8.0))
        })
        .collect();
    for op in [EdgeBoolOp::And, EdgeBoolOp::Not] {
        let pieces = edge_boolean(&strap_edge, &border, op);
        println!("strap edge {op:?} border: {} piece(s)", pieces.len());
    }
    Ok(())
}
