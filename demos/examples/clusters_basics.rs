// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Hierarchical clusters basics.
//!
//! Build a two-level layout, extract the connected clusters, and print each
//! cell's clusters together with the child clusters they reach.
//!
//! Set `RUST_LOG=understory_clusters=debug` to watch the per-cell build log.
//!
//! Run:
//! - `cargo run -p understory_demos --example clusters_basics`

use std::error::Error;

use kurbo::{Affine, Point, Rect, Vec2};
use tracing_subscriber::EnvFilter;
use understory_cell_tree::{CellId, CellInstArray, LayerId, Layout, Polygon, ShapeKinds};
use understory_clusters::{Connectivity, HierClusters};

const METAL: LayerId = LayerId(1);
const VIA: LayerId = LayerId(2);
const POLY: LayerId = LayerId(3);

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut layout = Layout::new();
    let top = layout.add_cell("TOP");
    let gate = layout.add_cell("GATE");

    // A gate: poly finger plus a via landing on it.
    layout.insert_shape(gate, POLY, Rect::new(0.0, 0.0, 2.0, 10.0))?;
    layout.insert_shape(gate, VIA, Rect::new(0.5, 8.0, 1.5, 9.0))?;

    // Two gates side by side, both tied to one metal strap in TOP.
    layout.insert_instance(top, CellInstArray::single(gate, Affine::IDENTITY))?;
    layout.insert_instance(
        top,
        CellInstArray::single(gate, Affine::translate(Vec2::new(6.0, 0.0))),
    )?;
    layout.insert_shape(top, METAL, Rect::new(0.0, 8.0, 8.0, 9.0))?;
    // An L-shaped metal island that touches nothing.
    layout.insert_shape(
        top,
        METAL,
        Polygon::new([
            Point::new(20.0, 0.0),
            Point::new(24.0, 0.0),
            Point::new(24.0, 1.0),
            Point::new(21.0, 1.0),
            Point::new(21.0, 4.0),
            Point::new(20.0, 4.0),
        ]),
    )?;

    let mut conn = Connectivity::new();
    conn.connect_self(METAL)
        .connect_self(POLY)
        .connect(METAL, VIA)
        .connect(VIA, POLY);

    let mut hc = HierClusters::new();
    hc.build(&layout, top, ShapeKinds::default(), &conn)?;

    for cell in hc.cells() {
        print_cell(&layout, &hc, cell);
    }
    Ok(())
}

fn print_cell(layout: &Layout, hc: &HierClusters, cell: CellId) {
    let Some(graph) = hc.clusters_per_cell(cell) else {
        return;
    };
    let name = layout.cell(cell).map_or("?", |c| c.name());
    println!("{name} ({cell}): {} connector(s)", graph.connector_count());
    for id in graph.cluster_ids() {
        let kind = if graph.is_connector(id) {
            "connector"
        } else {
            "cluster"
        };
        let shapes = if graph.is_connector(id) {
            0
        } else {
            graph.cluster_by_id(id).shape_count()
        };
        println!("  {kind} {id}: {shapes} shape(s)");
        for key in graph.connections_for_cluster(id) {
            let child = layout.cell(key.inst.cell).map_or("?", |c| c.name());
            println!(
                "    -> {child} cluster {} via {:?} element {:?}",
                key.id, key.inst.inst, key.inst.index
            );
        }
    }
}
