//! Fleet-wide fine-resolution heat map with a bounded history per cell.

use std::collections::{BTreeMap, VecDeque};

use serde::Serialize;

use scout_navigation::{GridCell, World};

/// Fine-cell offsets stamped by one reading: the 3x3 block plus the four
/// cells two steps out along the axes.
const FOOTPRINT: [(i32, i32); 13] = [
    (-1, -1), (-1, 0), (-1, 1),
    (0, -1), (0, 0), (0, 1),
    (1, -1), (1, 0), (1, 1),
    (0, -2), (0, 2), (-2, 0), (2, 0),
];

/// Latest value of every recorded fine cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatSnapshot {
    /// Fine-grid rows.
    pub rows: usize,
    /// Fine-grid columns.
    pub cols: usize,
    pub cells: Vec<HeatCell>,
}

/// One fine cell and its most recent temperature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HeatCell {
    pub row: i32,
    pub col: i32,
    pub temperature_c: f64,
}

/// Temperature history per fine cell, shared by every agent.
#[derive(Debug, Clone)]
pub struct HeatAggregate {
    subdiv: usize,
    rows: usize,
    cols: usize,
    history: usize,
    cells: BTreeMap<GridCell, VecDeque<f64>>,
}

impl HeatAggregate {
    /// Empty aggregate over `world` split into `subdiv` fine cells per raster cell.
    pub fn new(world: &World, subdiv: usize, history: usize) -> Self {
        Self {
            subdiv,
            rows: world.rows() * subdiv,
            cols: world.cols() * subdiv,
            history: history.max(1),
            cells: BTreeMap::new(),
        }
    }

    /// Fine-grid shape as `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Stamps `temp_c` onto the traversable fine cells around `(x, y)`.
    pub fn record(&mut self, world: &World, x: f64, y: f64, temp_c: f64) {
        let center = world.world_to_fine_cell(x, y, self.subdiv);
        for (dr, dc) in FOOTPRINT {
            let cell = GridCell::new(center.row + dr, center.col + dc);
            if !world.fine_cell_traversable(cell, self.subdiv) {
                continue;
            }
            let readings = self.cells.entry(cell).or_default();
            if readings.len() == self.history {
                readings.pop_front();
            }
            readings.push_back(temp_c);
        }
    }

    /// Readings held for a cell, oldest first.
    pub fn readings(&self, cell: GridCell) -> Option<&VecDeque<f64>> {
        self.cells.get(&cell)
    }

    /// Most recent reading for a cell.
    pub fn latest(&self, cell: GridCell) -> Option<f64> {
        self.cells.get(&cell).and_then(|r| r.back().copied())
    }

    /// Number of cells with at least one reading.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Latest value of every recorded cell, in row-major order.
    pub fn snapshot(&self) -> HeatSnapshot {
        let cells = self
            .cells
            .iter()
            .filter_map(|(cell, r)| {
                r.back().map(|&t| HeatCell { row: cell.row, col: cell.col, temperature_c: t })
            })
            .collect();
        HeatSnapshot { rows: self.rows, cols: self.cols, cells }
    }
}
