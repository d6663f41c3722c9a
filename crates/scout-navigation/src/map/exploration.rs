//! Ternary occupancy grid used by simulated agents.
//!
//! The grid covers the world raster's bounding box at `subdiv` fine cells per
//! world cell. Every cell starts [`Occupancy::Unknown`]; single range rays carve
//! free space and mark their terminal cell occupied. The query side only walks
//! short rays with early exit, so each query costs at most
//! `look_distance / step` cell reads.

#![warn(missing_docs)]

use scout_kinematics::Pose;

use super::OccupancyMap;
use super::point_types::{GridCell, WorldPoint};
use super::raster::bresenham;
use crate::error::NavigationError;

/// Angular offset of the two side rays used by [`ExplorationGrid::clear_steer`].
const CLEAR_SIDE_OFFSET: f64 = 0.45;
/// Steer returned when exactly one side is clear.
const CLEAR_ONE_SIDE: f64 = 0.75;
/// Steer returned when both sides are blocked.
const CLEAR_BLOCKED: f64 = -0.5;
/// Fan of relative angles probed by [`ExplorationGrid::exploration_steer`],
/// ordered so that ties resolve toward straight ahead.
const EXPLORE_OFFSETS: [f64; 5] = [0.0, -0.35, 0.35, -0.7, 0.7];
/// Steer magnitude toward the most unknown side.
const EXPLORE_STEER: f64 = 0.6;
/// Obstacle walks step at 0.8 cells, unknown-counting walks at 1.2 cells.
const OCCUPIED_STEP: f64 = 0.8;
const UNKNOWN_STEP: f64 = 1.2;

/// Belief held by one cell of the ternary grid.
#[repr(u8)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Occupancy {
    /// Observed traversable space.
    Free = 0,
    /// Observed obstacle.
    Occupied = 1,
    /// Not yet observed.
    Unknown = 2,
}

impl Occupancy {
    /// Occupancy as a probability-like value: 0.0 free, 1.0 occupied, 0.5 unknown.
    pub fn as_f64(&self) -> f64 {
        match self {
            Occupancy::Free => 0.0,
            Occupancy::Occupied => 1.0,
            Occupancy::Unknown => 0.5,
        }
    }
}

impl std::fmt::Display for Occupancy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Occupancy::Free => write!(f, "Free"),
            Occupancy::Occupied => write!(f, "Occupied"),
            Occupancy::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Fine-resolution ternary occupancy grid anchored at the world origin.
#[derive(Clone, Debug)]
pub struct ExplorationGrid {
    rows: usize,
    cols: usize,
    subdiv: usize,
    /// Edge length of a fine cell (m).
    resolution: f64,
    /// Row-major: index = row * cols + col
    cells: Vec<Occupancy>,
}

impl ExplorationGrid {
    /// Creates an all-unknown grid covering `world_rows x world_cols` world
    /// cells of `cell_size` meters, each split into `subdiv x subdiv` fine cells.
    pub fn new(
        world_rows: usize,
        world_cols: usize,
        cell_size: f64,
        subdiv: usize,
    ) -> Result<Self, NavigationError> {
        if world_rows == 0 || world_cols == 0 || subdiv == 0 {
            return Err(NavigationError::InvalidDimensions(
                "rows, cols and subdivision must be non-zero",
            ));
        }
        if cell_size <= 0.0 {
            return Err(NavigationError::InvalidResolution("cell size must be positive"));
        }
        let rows = world_rows * subdiv;
        let cols = world_cols * subdiv;
        Ok(Self {
            rows,
            cols,
            subdiv,
            resolution: cell_size / subdiv as f64,
            cells: vec![Occupancy::Unknown; rows * cols],
        })
    }

    /// Fine cells per world cell along each axis.
    pub fn subdiv(&self) -> usize {
        self.subdiv
    }

    fn index(&self, cell: GridCell) -> Option<usize> {
        if self.contains(cell) {
            Some(cell.row as usize * self.cols + cell.col as usize)
        } else {
            None
        }
    }

    /// Belief at `cell`; out-of-bounds cells read as occupied.
    pub fn get(&self, cell: GridCell) -> Occupancy {
        self.index(cell)
            .map_or(Occupancy::Occupied, |idx| self.cells[idx])
    }

    /// Overwrites a cell. Returns false (and does nothing) when out of bounds.
    pub fn set(&mut self, cell: GridCell, value: Occupancy) -> bool {
        match self.index(cell) {
            Some(idx) => {
                self.cells[idx] = value;
                true
            }
            None => false,
        }
    }

    /// Integrates one range ray cast from `pose` along its heading.
    ///
    /// Every rasterized cell but the last becomes free, the terminal cell
    /// becomes occupied; cells outside the grid are skipped.
    pub fn update_ray(&mut self, pose: &Pose, range_m: f64) {
        let start = self.world_to_cell(pose.x, pose.y);
        let (end_x, end_y) = pose.project(0.0, range_m.max(0.0));
        let end = self.world_to_cell(end_x, end_y);

        let cells = bresenham(start, end);
        let last = cells.len() - 1;
        for (i, cell) in cells.into_iter().enumerate() {
            let value = if i < last { Occupancy::Free } else { Occupancy::Occupied };
            self.set(cell, value);
        }
    }

    /// Early-exit walk: true if an occupied cell lies within `max_dist` along `theta`.
    fn ray_hits_occupied(&self, x: f64, y: f64, theta: f64, max_dist: f64) -> bool {
        let step = self.resolution * OCCUPIED_STEP;
        let (dx, dy) = (theta.cos() * step, theta.sin() * step);
        let (mut px, mut py, mut dist) = (x, y, 0.0);
        while dist < max_dist {
            if self.get(self.world_to_cell(px, py)) == Occupancy::Occupied {
                return true;
            }
            px += dx;
            py += dy;
            dist += step;
        }
        false
    }

    /// Counts unknown cells along `theta` until an occupied cell or the grid edge.
    fn ray_unknown_count(&self, x: f64, y: f64, theta: f64, max_dist: f64) -> usize {
        let step = self.resolution * UNKNOWN_STEP;
        let (dx, dy) = (theta.cos() * step, theta.sin() * step);
        let (mut px, mut py, mut dist) = (x, y, 0.0);
        let mut count = 0;
        while dist < max_dist {
            let cell = self.world_to_cell(px, py);
            if !self.contains(cell) {
                break;
            }
            match self.get(cell) {
                Occupancy::Unknown => count += 1,
                Occupancy::Occupied => break,
                Occupancy::Free => {}
            }
            px += dx;
            py += dy;
            dist += step;
        }
        count
    }

    /// True if an occupied cell lies within `distance` on any of three rays:
    /// straight ahead and `± cone_half_angle`.
    pub fn is_obstacle_ahead(&self, pose: &Pose, distance: f64, cone_half_angle: f64) -> bool {
        [-1.0, 0.0, 1.0].iter().any(|k| {
            self.ray_hits_occupied(pose.x, pose.y, pose.theta + k * cone_half_angle, distance)
        })
    }

    /// Signed steer toward whichever side is obstacle-free (positive turns
    /// counter-clockwise).
    pub fn clear_steer(&self, pose: &Pose, look_distance: f64) -> f64 {
        let left_clear =
            !self.ray_hits_occupied(pose.x, pose.y, pose.theta + CLEAR_SIDE_OFFSET, look_distance);
        let right_clear =
            !self.ray_hits_occupied(pose.x, pose.y, pose.theta - CLEAR_SIDE_OFFSET, look_distance);
        match (left_clear, right_clear) {
            (true, false) => CLEAR_ONE_SIDE,
            (false, true) => -CLEAR_ONE_SIDE,
            (true, true) => 0.0,
            (false, false) => CLEAR_BLOCKED,
        }
    }

    /// Signed steer toward the fan direction that crosses the most unknown
    /// cells before its first obstacle; ties prefer straight ahead.
    pub fn exploration_steer(&self, pose: &Pose, look_distance: f64) -> f64 {
        let mut best_offset = 0.0;
        let mut best_count = None;
        for offset in EXPLORE_OFFSETS {
            let n = self.ray_unknown_count(pose.x, pose.y, pose.theta + offset, look_distance);
            if best_count.is_none_or(|best| n > best) {
                best_count = Some(n);
                best_offset = offset;
            }
        }
        if best_offset > 0.0 {
            EXPLORE_STEER
        } else if best_offset < 0.0 {
            -EXPLORE_STEER
        } else {
            0.0
        }
    }

    /// Number of cells that are no longer unknown.
    pub fn explored_count(&self) -> usize {
        self.cells.iter().filter(|c| **c != Occupancy::Unknown).count()
    }
}

impl OccupancyMap for ExplorationGrid {
    fn dims(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    fn resolution(&self) -> f64 {
        self.resolution
    }

    fn origin(&self) -> WorldPoint {
        WorldPoint::new(0.0, 0.0)
    }

    fn occupancy(&self, cell: GridCell) -> f64 {
        self.get(cell).as_f64()
    }

    fn is_unknown(&self, cell: GridCell) -> bool {
        self.get(cell) == Occupancy::Unknown
    }

    fn is_occupied(&self, cell: GridCell) -> bool {
        self.get(cell) == Occupancy::Occupied
    }
}
