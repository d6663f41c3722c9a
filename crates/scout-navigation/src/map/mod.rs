//! Map-related functionality for navigation.
//!
//! This module provides the two occupancy grid variants and the raster
//! utilities they share:
//!
//! - [`ExplorationGrid`]: ternary free/occupied/unknown grid used by the
//!   simulated fleet for exploration and avoidance.
//! - [`LogOddsGrid`]: probabilistic grid fed by hardware ranging frames.
//!
//! Both implement [`OccupancyMap`], the read-side contract consumed by the
//! scheduler, the bridge and the transport layer.

pub mod exploration;
pub mod log_odds;
pub mod point_types;
pub mod raster;

pub use exploration::{ExplorationGrid, Occupancy};
pub use log_odds::{DirectionHint, LogOddsConfig, LogOddsGrid, logit, probability};
pub use point_types::{GridCell, MapBounds, WorldPoint};
pub use raster::bresenham;

/// Read-side contract shared by both occupancy grid variants.
///
/// Cells outside the declared bounds always read as occupied.
pub trait OccupancyMap {
    /// Grid size as `(rows, cols)`.
    fn dims(&self) -> (usize, usize);

    /// Edge length of one cell in meters.
    fn resolution(&self) -> f64;

    /// World coordinates of cell `(0, 0)`'s lower corner.
    fn origin(&self) -> WorldPoint;

    /// Occupancy belief in `[0, 1]`; `1.0` for out-of-bounds cells.
    fn occupancy(&self, cell: GridCell) -> f64;

    /// True when no observation has touched the cell yet.
    fn is_unknown(&self, cell: GridCell) -> bool;

    /// True when the cell should be treated as an obstacle.
    fn is_occupied(&self, cell: GridCell) -> bool;

    /// Returns true if `cell` lies inside the grid.
    fn contains(&self, cell: GridCell) -> bool {
        let (rows, cols) = self.dims();
        cell.row >= 0 && cell.col >= 0 && (cell.row as usize) < rows && (cell.col as usize) < cols
    }

    /// Converts world coordinates to a (possibly out-of-bounds) cell.
    fn world_to_cell(&self, x: f64, y: f64) -> GridCell {
        let origin = self.origin();
        let res = self.resolution();
        GridCell::new(
            ((y - origin.y) / res).floor() as i32,
            ((x - origin.x) / res).floor() as i32,
        )
    }

    /// World coordinates of a cell center.
    fn cell_center(&self, cell: GridCell) -> WorldPoint {
        let origin = self.origin();
        let res = self.resolution();
        WorldPoint::new(
            origin.x + (cell.col as f64 + 0.5) * res,
            origin.y + (cell.row as f64 + 0.5) * res,
        )
    }

    /// World extent covered by the grid.
    fn bounds(&self) -> MapBounds {
        let (rows, cols) = self.dims();
        let origin = self.origin();
        let res = self.resolution();
        MapBounds {
            x_min: origin.x,
            x_max: origin.x + cols as f64 * res,
            y_min: origin.y,
            y_max: origin.y + rows as f64 * res,
        }
    }

    /// Sparse view of every observed cell with its occupancy belief.
    fn explored_cells(&self) -> Vec<(GridCell, f64)> {
        let (rows, cols) = self.dims();
        let mut out = Vec::new();
        for row in 0..rows as i32 {
            for col in 0..cols as i32 {
                let cell = GridCell::new(row, col);
                if !self.is_unknown(cell) {
                    out.push((cell, self.occupancy(cell)));
                }
            }
        }
        out
    }

    /// Centers of all in-bounds cells currently believed occupied.
    fn obstacle_points(&self) -> Vec<WorldPoint> {
        let (rows, cols) = self.dims();
        let mut out = Vec::new();
        for row in 0..rows as i32 {
            for col in 0..cols as i32 {
                let cell = GridCell::new(row, col);
                if self.is_occupied(cell) {
                    out.push(self.cell_center(cell));
                }
            }
        }
        out
    }

    /// Dense `rows x cols` occupancy grid, row-major.
    fn dense_occupancy(&self) -> Vec<Vec<f64>> {
        let (rows, cols) = self.dims();
        (0..rows as i32)
            .map(|row| {
                (0..cols as i32)
                    .map(|col| self.occupancy(GridCell::new(row, col)))
                    .collect()
            })
            .collect()
    }
}
