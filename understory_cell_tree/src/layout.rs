// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The cell graph: cell definitions with layered shapes and child instances.

use std::collections::{BTreeMap, BTreeSet};

use crate::array::CellInstArray;
use crate::shape::Shape;
use crate::types::{CellId, InstanceId, LayerId};

/// Errors reported by [`Layout`] mutators.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    /// The referenced cell does not exist in this layout.
    #[error("unknown cell {0}")]
    UnknownCell(CellId),
    /// Placing `child` inside `parent` would make a cell contain itself.
    #[error("placing {child} inside {parent} would make the hierarchy recursive")]
    RecursiveInstance {
        /// The cell receiving the instance.
        parent: CellId,
        /// The cell being placed.
        child: CellId,
    },
    /// An array placement with zero elements along one of its axes.
    #[error("array of {child} inside {parent} has no elements ({na} x {nb})")]
    EmptyArray {
        /// The cell receiving the instance.
        parent: CellId,
        /// The cell being placed.
        child: CellId,
        /// Elements along the first lattice vector.
        na: u32,
        /// Elements along the second lattice vector.
        nb: u32,
    },
}

/// Result alias for layout mutators.
pub type Result<T> = core::result::Result<T, LayoutError>;

/// One cell definition.
#[derive(Clone, Debug, Default)]
pub struct Cell {
    name: String,
    shapes: BTreeMap<LayerId, Vec<Shape>>,
    instances: Vec<CellInstArray>,
}

impl Cell {
    /// The cell's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shapes on `layer`, in insertion order.
    pub fn shapes(&self, layer: LayerId) -> &[Shape] {
        self.shapes.get(&layer).map_or(&[], Vec::as_slice)
    }

    /// Layers holding at least one shape, ascending.
    pub fn layers(&self) -> impl Iterator<Item = LayerId> + '_ {
        self.shapes.keys().copied()
    }

    /// Child instances with their ids, in insertion order.
    pub fn instances(&self) -> impl ExactSizeIterator<Item = (InstanceId, &CellInstArray)> + '_ {
        self.instances.iter().enumerate().map(|(i, inst)| {
            #[allow(
                clippy::cast_possible_truncation,
                reason = "InstanceId uses 32-bit indices by design."
            )]
            (InstanceId(i as u32), inst)
        })
    }

    /// The instance with the given id.
    pub fn instance(&self, id: InstanceId) -> Option<&CellInstArray> {
        self.instances.get(id.idx())
    }

    /// True if the cell has neither shapes nor instances.
    pub fn is_empty(&self) -> bool {
        self.shapes.values().all(Vec::is_empty) && self.instances.is_empty()
    }
}

/// A hierarchy of cells.
///
/// Cells are only ever added, and instances can only point at existing cells
/// without closing a cycle, so the instance graph is always a DAG.
#[derive(Clone, Debug, Default)]
pub struct Layout {
    cells: Vec<Cell>,
}

impl Layout {
    /// Create an empty layout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a new, empty cell.
    pub fn add_cell(&mut self, name: impl Into<String>) -> CellId {
        self.cells.push(Cell {
            name: name.into(),
            ..Cell::default()
        });
        #[allow(
            clippy::cast_possible_truncation,
            reason = "CellId uses 32-bit indices by design."
        )]
        CellId((self.cells.len() - 1) as u32)
    }

    /// The cell with the given id.
    pub fn cell(&self, id: CellId) -> Option<&Cell> {
        self.cells.get(id.idx())
    }

    /// Whether `id` names a cell of this layout.
    pub fn contains(&self, id: CellId) -> bool {
        id.idx() < self.cells.len()
    }

    /// Number of cells.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// All cells with their ids.
    pub fn cells(&self) -> impl ExactSizeIterator<Item = (CellId, &Cell)> + '_ {
        self.cells.iter().enumerate().map(|(i, c)| {
            #[allow(
                clippy::cast_possible_truncation,
                reason = "CellId uses 32-bit indices by design."
            )]
            (CellId(i as u32), c)
        })
    }

    fn cell_mut(&mut self, id: CellId) -> Result<&mut Cell> {
        self.cells
            .get_mut(id.idx())
            .ok_or(LayoutError::UnknownCell(id))
    }

    /// Add a shape to `cell` on `layer`.
    pub fn insert_shape(
        &mut self,
        cell: CellId,
        layer: LayerId,
        shape: impl Into<Shape>,
    ) -> Result<()> {
        self.cell_mut(cell)?
            .shapes
            .entry(layer)
            .or_default()
            .push(shape.into());
        Ok(())
    }

    /// Place `array` inside `parent`.
    ///
    /// Fails if either cell is unknown, if the array has a zero count along
    /// either axis, or if `parent` is reachable from the placed cell
    /// (including placing a cell inside itself).
    pub fn insert_instance(&mut self, parent: CellId, array: CellInstArray) -> Result<InstanceId> {
        let child = array.cell;
        if !self.contains(child) {
            return Err(LayoutError::UnknownCell(child));
        }
        if !self.contains(parent) {
            return Err(LayoutError::UnknownCell(parent));
        }
        if array.element_count() == 0 {
            let (na, nb) = array.dims();
            return Err(LayoutError::EmptyArray {
                parent,
                child,
                na,
                nb,
            });
        }
        if self.reaches(child, parent) {
            return Err(LayoutError::RecursiveInstance { parent, child });
        }
        let cell = self.cell_mut(parent)?;
        cell.instances.push(array);
        #[allow(
            clippy::cast_possible_truncation,
            reason = "InstanceId uses 32-bit indices by design."
        )]
        Ok(InstanceId((cell.instances.len() - 1) as u32))
    }

    /// Whether `to` is `from` or one of its descendants.
    fn reaches(&self, from: CellId, to: CellId) -> bool {
        let mut seen = BTreeSet::new();
        let mut stack = vec![from];
        while let Some(c) = stack.pop() {
            if c == to {
                return true;
            }
            if !seen.insert(c) {
                continue;
            }
            if let Some(cell) = self.cell(c) {
                stack.extend(cell.instances.iter().map(|i| i.cell));
            }
        }
        false
    }

    /// Distinct cells placed directly inside `cell`, ascending.
    pub fn child_cells(&self, cell: CellId) -> Vec<CellId> {
        let Some(c) = self.cell(cell) else {
            return Vec::new();
        };
        c.instances
            .iter()
            .map(|i| i.cell)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Cells that are not placed inside any other cell, ascending.
    pub fn top_cells(&self) -> Vec<CellId> {
        let placed: BTreeSet<CellId> = self
            .cells
            .iter()
            .flat_map(|c| c.instances.iter().map(|i| i.cell))
            .collect();
        self.cells()
            .map(|(id, _)| id)
            .filter(|id| !placed.contains(id))
            .collect()
    }
}
