//! Static world model: traversability raster, named spaces and obstacle cells.
//!
//! Row indices grow with world `y`, column indices with world `x`; cell
//! `(0, 0)` has its lower corner at the world origin. Everything outside the
//! raster is a wall.

use std::collections::BTreeSet;

use crate::error::NavigationError;
use crate::map::{GridCell, WorldPoint};

/// Raster value of a wall cell.
pub const WALL: u8 = 0;
/// Raster value of open floor in the default floor plan.
pub const FLOOR: u8 = 1;

/// Step used by [`World::raycast`] (m).
const RAYCAST_STEP: f64 = 0.05;

/// A named region identified by raster values, with its ambient ranges.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Space {
    pub id: String,
    pub name: String,
    /// Raster values that belong to this space.
    pub cell_values: Vec<u8>,
    /// Air temperature range (°C).
    pub temp_range: (f64, f64),
    /// Relative humidity range (%).
    pub humidity_range: (f64, f64),
}

/// What a ray stopped on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitKind {
    /// A static obstacle standing on traversable floor.
    Obstacle,
    /// A wall or the raster edge.
    Wall,
}

/// First blocking cell along a ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub distance: f64,
    pub kind: HitKind,
}

/// Read-only floor model shared by every agent.
#[derive(Debug, Clone)]
pub struct World {
    rows: usize,
    cols: usize,
    cell_size: f64,
    /// Row-major raster
    cells: Vec<u8>,
    spaces: Vec<Space>,
    obstacles: BTreeSet<GridCell>,
}

impl World {
    /// Builds a world from a row-major raster.
    ///
    /// # Errors
    /// * `InvalidDimensions` if the raster is empty or ragged.
    /// * `InvalidResolution` if `cell_size` is not positive.
    pub fn new(
        raster: Vec<Vec<u8>>,
        cell_size: f64,
        spaces: Vec<Space>,
        obstacles: impl IntoIterator<Item = GridCell>,
    ) -> Result<Self, NavigationError> {
        let rows = raster.len();
        let cols = raster.first().map_or(0, Vec::len);
        if rows == 0 || cols == 0 {
            return Err(NavigationError::InvalidDimensions("raster must not be empty"));
        }
        if raster.iter().any(|row| row.len() != cols) {
            return Err(NavigationError::InvalidDimensions("raster rows must have equal length"));
        }
        if cell_size <= 0.0 {
            return Err(NavigationError::InvalidResolution("cell size must be positive"));
        }
        Ok(Self {
            rows,
            cols,
            cell_size,
            cells: raster.into_iter().flatten().collect(),
            spaces,
            obstacles: obstacles.into_iter().collect(),
        })
    }

    /// The 28 x 10 m open-plan floor with five furniture obstacles.
    pub fn default_floor() -> Self {
        let (rows, cols) = (10, 28);
        let raster: Vec<Vec<u8>> = (0..rows)
            .map(|row| {
                (0..cols)
                    .map(|col| {
                        if (2..=7).contains(&row) && (2..=25).contains(&col) { FLOOR } else { WALL }
                    })
                    .collect()
            })
            .collect();
        let spaces = vec![Space {
            id: "floor_8".to_string(),
            name: "Floor 8".to_string(),
            cell_values: vec![FLOOR],
            temp_range: (18.0, 22.5),
            humidity_range: (42.0, 56.0),
        }];
        let obstacles = [(3, 8), (4, 14), (5, 20), (6, 10), (6, 18)]
            .into_iter()
            .map(|(r, c)| GridCell::new(r, c));

        Self {
            rows,
            cols,
            cell_size: 1.0,
            cells: raster.into_iter().flatten().collect(),
            spaces,
            obstacles: obstacles.collect(),
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Edge length of a raster cell (m).
    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    pub fn spaces(&self) -> &[Space] {
        &self.spaces
    }

    /// Static obstacle cells.
    pub fn obstacles(&self) -> impl Iterator<Item = GridCell> + '_ {
        self.obstacles.iter().copied()
    }

    /// Raster as nested rows.
    pub fn raster(&self) -> Vec<Vec<u8>> {
        self.cells.chunks(self.cols).map(<[u8]>::to_vec).collect()
    }

    /// Raster value at a cell; out of bounds reads as [`WALL`].
    pub fn cell(&self, cell: GridCell) -> u8 {
        if cell.row < 0 || cell.col < 0 {
            return WALL;
        }
        let (row, col) = (cell.row as usize, cell.col as usize);
        if row >= self.rows || col >= self.cols {
            return WALL;
        }
        self.cells[row * self.cols + col]
    }

    pub fn is_traversable(&self, cell: GridCell) -> bool {
        self.cell(cell) != WALL
    }

    pub fn is_obstacle(&self, cell: GridCell) -> bool {
        self.obstacles.contains(&cell)
    }

    pub fn world_to_cell(&self, x: f64, y: f64) -> GridCell {
        GridCell::new((y / self.cell_size).floor() as i32, (x / self.cell_size).floor() as i32)
    }

    /// Centre of a raster cell.
    pub fn cell_to_world(&self, cell: GridCell) -> WorldPoint {
        WorldPoint::new(
            (cell.col as f64 + 0.5) * self.cell_size,
            (cell.row as f64 + 0.5) * self.cell_size,
        )
    }

    /// Space containing a world point, if any.
    pub fn space_at(&self, x: f64, y: f64) -> Option<&Space> {
        let value = self.cell(self.world_to_cell(x, y));
        if value == WALL {
            return None;
        }
        self.spaces.iter().find(|s| s.cell_values.contains(&value))
    }

    /// Looks up a space by id.
    pub fn space(&self, id: &str) -> Option<&Space> {
        self.spaces.iter().find(|s| s.id == id)
    }

    /// Fine cell (`subdiv` per raster cell) containing a world point.
    pub fn world_to_fine_cell(&self, x: f64, y: f64, subdiv: usize) -> GridCell {
        let scale = subdiv as f64 / self.cell_size;
        GridCell::new((y * scale).floor() as i32, (x * scale).floor() as i32)
    }

    /// True if the raster cell under a fine cell is traversable.
    pub fn fine_cell_traversable(&self, fine: GridCell, subdiv: usize) -> bool {
        let s = subdiv.max(1) as i32;
        self.is_traversable(GridCell::new(fine.row.div_euclid(s), fine.col.div_euclid(s)))
    }

    /// Marches a ray in 5 cm steps and reports the first obstacle or wall
    /// within `max_range`.
    pub fn raycast_hit(&self, x: f64, y: f64, theta: f64, max_range: f64) -> Option<RayHit> {
        let (dy, dx) = theta.sin_cos();
        let mut dist = 0.0;
        while dist < max_range {
            dist += RAYCAST_STEP;
            let cell = self.world_to_cell(x + dx * dist, y + dy * dist);
            if self.is_obstacle(cell) {
                return Some(RayHit { distance: dist, kind: HitKind::Obstacle });
            }
            if !self.is_traversable(cell) {
                return Some(RayHit { distance: dist, kind: HitKind::Wall });
            }
        }
        None
    }

    /// Distance to the first blocking cell, or `None` when the ray stays clear.
    pub fn raycast(&self, x: f64, y: f64, theta: f64, max_range: f64) -> Option<f64> {
        self.raycast_hit(x, y, theta, max_range).map(|hit| hit.distance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    const EPSILON: f64 = 1e-9;

    #[test]
    fn test_default_floor_layout() {
        let w = World::default_floor();
        assert_eq!((w.rows(), w.cols()), (10, 28));
        assert!(w.is_traversable(GridCell::new(2, 2)));
        assert!(w.is_traversable(GridCell::new(7, 25)));
        assert!(!w.is_traversable(GridCell::new(1, 5)));
        assert!(!w.is_traversable(GridCell::new(5, 26)));
        assert!(!w.is_traversable(GridCell::new(-1, 5)));
        assert!(w.is_obstacle(GridCell::new(4, 14)));
        assert_eq!(w.obstacles().count(), 5);
        assert_eq!(w.raster().len(), 10);
    }

    #[test]
    fn test_rejects_bad_raster() {
        assert!(matches!(
            World::new(vec![], 1.0, vec![], []),
            Err(NavigationError::InvalidDimensions(_))
        ));
        assert!(matches!(
            World::new(vec![vec![1, 1], vec![1]], 1.0, vec![], []),
            Err(NavigationError::InvalidDimensions(_))
        ));
        assert!(matches!(
            World::new(vec![vec![1]], 0.0, vec![], []),
            Err(NavigationError::InvalidResolution(_))
        ));
    }

    #[test]
    fn test_coordinate_conversions() {
        let w = World::default_floor();
        assert_eq!(w.world_to_cell(14.5, 5.0), GridCell::new(5, 14));
        assert_eq!(w.world_to_cell(-0.2, 5.0), GridCell::new(5, -1));
        assert_eq!(w.cell_to_world(GridCell::new(5, 14)), WorldPoint::new(14.5, 5.5));
        assert_eq!(w.world_to_fine_cell(14.5, 5.0, 4), GridCell::new(20, 58));
        assert!(w.fine_cell_traversable(GridCell::new(8, 8), 4));
        assert!(!w.fine_cell_traversable(GridCell::new(7, 8), 4));
        assert!(!w.fine_cell_traversable(GridCell::new(-1, 8), 4));
    }

    #[test]
    fn test_space_lookup() {
        let w = World::default_floor();
        assert_eq!(w.space_at(14.5, 5.0).map(|s| s.id.as_str()), Some("floor_8"));
        assert!(w.space_at(0.5, 0.5).is_none());
        assert_eq!(w.space("floor_8").map(|s| s.temp_range), Some((18.0, 22.5)));
    }

    #[test]
    fn test_raycast_hits_wall_and_obstacle() {
        let w = World::default_floor();
        // From (3.5, 2.5) straight down (-y) the wall row 1 starts at y = 2.0.
        let hit = w.raycast_hit(3.5, 2.5, -PI / 2.0, 4.0).unwrap();
        assert_eq!(hit.kind, HitKind::Wall);
        assert!((hit.distance - 0.55).abs() < 0.051);

        // From (12.5, 4.5) along +x the obstacle cell (4, 14) starts at x = 14.
        let hit = w.raycast_hit(12.5, 4.5, 0.0, 4.0).unwrap();
        assert_eq!(hit.kind, HitKind::Obstacle);
        assert!((hit.distance - 1.5).abs() < 0.051);

        // Short ray in open floor.
        assert!(w.raycast(12.5, 3.5, 0.0, 0.5).is_none());
        let d = w.raycast(12.5, 3.5, PI, 20.0).unwrap();
        assert!((d - 10.5).abs() < 0.051 + EPSILON);
    }
}
