// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Hierarchical nets against a flattened layout.
//!
//! Random three-level layouts (TOP, MID, LEAF) with small arrays and
//! quarter-turn placements are clustered hierarchically. Each flattened shape
//! is then followed upward through the connection maps until no parent claims
//! its cluster; the cell occurrence and cluster reached name its net. Those
//! nets must match the connected components of the flattened shapes.

use std::collections::BTreeMap;
use std::f64::consts::FRAC_PI_2;

use kurbo::{Affine, Rect, Vec2};
use proptest::prelude::*;
use understory_cell_tree::{ArrayIndex, CellId, CellInstArray, LayerId, Layout, ShapeKinds};
use understory_clusters::{ClusterId, ClusterInstance, Connectivity, HierClusters, InstElement};

const M1: LayerId = LayerId(1);

type IRect = [i64; 4];

/// One array placement: a quarter-turn count, an offset and a grid.
#[derive(Copy, Clone, Debug)]
struct Place {
    turns: u8,
    tx: i64,
    ty: i64,
    na: u32,
    nb: u32,
    pa: i64,
    pb: i64,
}

impl Place {
    fn array(&self, cell: CellId) -> CellInstArray {
        #[allow(clippy::cast_precision_loss, reason = "Test coordinates are small integers.")]
        let (tx, ty, pa, pb) = (self.tx as f64, self.ty as f64, self.pa as f64, self.pb as f64);
        let trans = Affine::translate(Vec2::new(tx, ty))
            * Affine::rotate(f64::from(self.turns) * FRAC_PI_2);
        CellInstArray::array(
            cell,
            trans,
            Vec2::new(pa, 0.0),
            self.na,
            Vec2::new(0.0, pb),
            self.nb,
        )
    }

    fn elements(&self) -> impl Iterator<Item = (ArrayIndex, u8, i64, i64)> + '_ {
        (0..self.na).flat_map(move |i| {
            (0..self.nb).map(move |j| {
                let dx = self.tx + i64::from(i) * self.pa;
                let dy = self.ty + i64::from(j) * self.pb;
                (ArrayIndex::new(i, j), self.turns, dx, dy)
            })
        })
    }
}

#[derive(Clone, Debug)]
struct Scene {
    leaf: Vec<IRect>,
    mid: Vec<IRect>,
    mid_places: Vec<Place>,
    top: Vec<IRect>,
    /// `true` places MID, `false` places LEAF.
    top_places: Vec<(bool, Place)>,
}

fn boxes(span: i64, n: std::ops::Range<usize>) -> impl Strategy<Value = Vec<IRect>> {
    prop::collection::vec(
        (0..span, 0..span, 1i64..4, 1i64..4).prop_map(|(x, y, w, h)| [x, y, x + w, y + h]),
        n,
    )
}

fn place(reach: i64) -> impl Strategy<Value = Place> {
    (0u8..4, -reach..reach, -reach..reach, 1u32..3, 1u32..3, 2i64..7, 2i64..7).prop_map(
        |(turns, tx, ty, na, nb, pa, pb)| Place {
            turns,
            tx,
            ty,
            na,
            nb,
            pa,
            pb,
        },
    )
}

fn scene() -> impl Strategy<Value = Scene> {
    (
        boxes(5, 1..4),
        boxes(12, 0..3),
        prop::collection::vec(place(10), 1..4),
        boxes(24, 0..4),
        prop::collection::vec((any::<bool>(), place(16)), 1..4),
    )
        .prop_map(|(leaf, mid, mid_places, top, top_places)| Scene {
            leaf,
            mid,
            mid_places,
            top,
            top_places,
        })
}

fn to_rect(r: IRect) -> Rect {
    #[allow(clippy::cast_precision_loss, reason = "Test coordinates are small integers.")]
    Rect::new(r[0] as f64, r[1] as f64, r[2] as f64, r[3] as f64)
}

/// `r` turned by `turns` quarter turns about the origin, then moved by `(dx, dy)`.
fn moved(r: IRect, turns: u8, dx: i64, dy: i64) -> IRect {
    let turn = |(x, y): (i64, i64)| match turns % 4 {
        0 => (x, y),
        1 => (-y, x),
        2 => (-x, -y),
        _ => (y, -x),
    };
    let (ax, ay) = turn((r[0], r[1]));
    let (bx, by) = turn((r[2], r[3]));
    [ax.min(bx) + dx, ay.min(by) + dy, ax.max(bx) + dx, ay.max(by) + dy]
}

fn touches(a: IRect, b: IRect) -> bool {
    a[0] <= b[2] && b[0] <= a[2] && a[1] <= b[3] && b[1] <= a[3]
}

/// A shape of the flattened layout, with the cell occurrence that owns it.
struct Flat {
    rect: IRect,
    path: Vec<InstElement>,
    local: IRect,
}

struct Built {
    layout: Layout,
    top: CellId,
    flat: Vec<Flat>,
}

fn build_scene(scene: &Scene) -> Built {
    let mut layout = Layout::new();
    let top = layout.add_cell("TOP");
    let mid = layout.add_cell("MID");
    let leaf = layout.add_cell("LEAF");
    for &r in &scene.leaf {
        layout.insert_shape(leaf, M1, to_rect(r)).unwrap();
    }
    for &r in &scene.mid {
        layout.insert_shape(mid, M1, to_rect(r)).unwrap();
    }
    for &r in &scene.top {
        layout.insert_shape(top, M1, to_rect(r)).unwrap();
    }

    // MID content in MID's own frame, with paths relative to MID.
    let mut mid_flat: Vec<Flat> = scene
        .mid
        .iter()
        .map(|&r| Flat {
            rect: r,
            path: Vec::new(),
            local: r,
        })
        .collect();
    for p in &scene.mid_places {
        let inst = layout.insert_instance(mid, p.array(leaf)).unwrap();
        for (index, turns, dx, dy) in p.elements() {
            for &r in &scene.leaf {
                mid_flat.push(Flat {
                    rect: moved(r, turns, dx, dy),
                    path: vec![InstElement::new(inst, leaf, index)],
                    local: r,
                });
            }
        }
    }

    let mut flat: Vec<Flat> = scene
        .top
        .iter()
        .map(|&r| Flat {
            rect: r,
            path: Vec::new(),
            local: r,
        })
        .collect();
    for &(is_mid, p) in &scene.top_places {
        let child = if is_mid { mid } else { leaf };
        let inst = layout.insert_instance(top, p.array(child)).unwrap();
        for (index, turns, dx, dy) in p.elements() {
            let elem = InstElement::new(inst, child, index);
            if is_mid {
                for f in &mid_flat {
                    let mut path = vec![elem];
                    path.extend_from_slice(&f.path);
                    flat.push(Flat {
                        rect: moved(f.rect, turns, dx, dy),
                        path,
                        local: f.local,
                    });
                }
            } else {
                for &r in &scene.leaf {
                    flat.push(Flat {
                        rect: moved(r, turns, dx, dy),
                        path: vec![elem],
                        local: r,
                    });
                }
            }
        }
    }
    Built { layout, top, flat }
}

/// Follow a shape's cluster upward until no parent claims it.
fn net_of(hc: &HierClusters, top: CellId, f: &Flat) -> (Vec<InstElement>, ClusterId) {
    let owner = f.path.last().map_or(top, |e| e.cell);
    let local = to_rect(f.local);
    let mut id = hc
        .clusters_per_cell(owner)
        .unwrap()
        .iter()
        .find(|c| c.shapes(M1).iter().any(|s| s.bbox() == local))
        .unwrap()
        .id();
    let mut depth = f.path.len();
    while depth > 0 {
        let parent = if depth == 1 { top } else { f.path[depth - 2].cell };
        let key = ClusterInstance::new(id, f.path[depth - 1]);
        match hc
            .clusters_per_cell(parent)
            .unwrap()
            .find_cluster_with_connection(&key)
        {
            Some(up) => {
                id = up;
                depth -= 1;
            }
            None => break,
        }
    }
    (f.path[..depth].to_vec(), id)
}

fn partition<K: Ord>(keys: impl Iterator<Item = K>) -> Vec<Vec<usize>> {
    let mut groups: BTreeMap<K, Vec<usize>> = BTreeMap::new();
    for (i, k) in keys.enumerate() {
        groups.entry(k).or_default().push(i);
    }
    let mut out: Vec<_> = groups.into_values().collect();
    out.sort();
    out
}

fn hierarchical(built: &Built) -> Vec<Vec<usize>> {
    let mut conn = Connectivity::new();
    conn.connect_self(M1);
    let mut hc = HierClusters::new();
    hc.build(&built.layout, built.top, ShapeKinds::default(), &conn)
        .unwrap();
    partition(built.flat.iter().map(|f| net_of(&hc, built.top, f)))
}

fn flattened(built: &Built) -> Vec<Vec<usize>> {
    let n = built.flat.len();
    let mut parent: Vec<usize> = (0..n).collect();
    fn find(parent: &mut [usize], mut x: usize) -> usize {
        while parent[x] != x {
            parent[x] = parent[parent[x]];
            x = parent[x];
        }
        x
    }
    for i in 0..n {
        for j in i + 1..n {
            if touches(built.flat[i].rect, built.flat[j].rect) {
                let (ri, rj) = (find(&mut parent, i), find(&mut parent, j));
                parent[ri] = rj;
            }
        }
    }
    partition((0..n).map(|i| find(&mut parent, i)))
}

#[test]
fn quarter_turns_match_the_float_transform() {
    let r = [1, 2, 4, 3];
    for turns in 0..4u8 {
        let p = Place {
            turns,
            tx: 5,
            ty: -3,
            na: 1,
            nb: 1,
            pa: 2,
            pb: 2,
        };
        let got = understory_cell_tree::transform_rect_bbox(p.array(Layout::new().add_cell("C")).trans, to_rect(r));
        let want = to_rect(moved(r, turns, 5, -3));
        assert!(
            (got.x0 - want.x0).abs() < 1e-9
                && (got.y0 - want.y0).abs() < 1e-9
                && (got.x1 - want.x1).abs() < 1e-9
                && (got.y1 - want.y1).abs() < 1e-9,
            "turns {turns}: {got:?} vs {want:?}"
        );
    }
}

#[test]
fn deep_placements_on_both_sides_join_one_net() {
    // Two MID placements whose LEAF shapes abut across the boundary, plus a
    // TOP shape that lands on a LEAF inside the second MID.
    let scene = Scene {
        leaf: vec![[0, 0, 2, 1]],
        mid: Vec::new(),
        mid_places: vec![Place {
            turns: 0,
            tx: 3,
            ty: 0,
            na: 1,
            nb: 1,
            pa: 2,
            pb: 2,
        }],
        top: vec![[6, 0, 8, 1], [40, 0, 41, 1]],
        top_places: vec![
            (
                true,
                Place {
                    turns: 0,
                    tx: 0,
                    ty: 0,
                    na: 1,
                    nb: 1,
                    pa: 2,
                    pb: 2,
                },
            ),
            (
                true,
                Place {
                    turns: 2,
                    tx: 10,
                    ty: 1,
                    na: 1,
                    nb: 1,
                    pa: 2,
                    pb: 2,
                },
            ),
        ],
    };
    let built = build_scene(&scene);
    // First LEAF spans x 3..5, the half-turned one 5..7, and the TOP box at
    // x 6 overlaps the latter. The box at x 40 stays alone.
    let nets = hierarchical(&built);
    assert_eq!(nets, flattened(&built));
    assert_eq!(nets.len(), 2);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn hierarchical_nets_match_flat_components(scene in scene()) {
        let built = build_scene(&scene);
        prop_assert_eq!(hierarchical(&built), flattened(&built));
    }
}
