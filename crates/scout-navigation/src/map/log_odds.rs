//! Probabilistic occupancy grid fed by hardware ranging frames.
//!
//! Cells hold log-odds `L = ln(p / (1 - p))` clamped to `[-10, 10]`; the grid is
//! centred on the world origin so the robot's start pose sits in the middle.

#![warn(missing_docs)]

use super::OccupancyMap;
use super::point_types::{GridCell, MapBounds, WorldPoint};
use super::raster::bresenham;
use crate::control::MotorCommand;
use crate::error::NavigationError;

/// Log-odds saturation bound.
pub const LOG_ODDS_LIMIT: f64 = 10.0;

/// Probe offsets (degrees) tried when the way ahead is blocked.
const PROBE_OFFSETS_DEG: [f64; 6] = [45.0, -45.0, 90.0, -90.0, 135.0, -135.0];

/// Converts a probability to log-odds, clamping `p` into `[1e-6, 1 - 1e-6]`.
pub fn logit(p: f64) -> f64 {
    let p = p.clamp(1e-6, 1.0 - 1e-6);
    (p / (1.0 - p)).ln()
}

/// Converts log-odds back to a probability.
pub fn probability(log_odds: f64) -> f64 {
    1.0 / (1.0 + (-log_odds).exp())
}

/// Construction parameters for [`LogOddsGrid`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LogOddsConfig {
    /// World width covered by the grid (m).
    pub width_m: f64,
    /// World height covered by the grid (m).
    pub height_m: f64,
    /// Cell edge length (m).
    pub resolution: f64,
    /// Probability applied to the terminal cell of a ray.
    pub p_hit: f64,
    /// Probability applied to every traversed cell of a ray.
    pub p_miss: f64,
    /// Initial probability of every cell.
    pub p_prior: f64,
    /// Below this probability a cell is free.
    pub free_threshold: f64,
    /// Above this probability a cell is occupied.
    pub occupied_threshold: f64,
}

impl Default for LogOddsConfig {
    fn default() -> Self {
        Self {
            width_m: 10.0,
            height_m: 10.0,
            resolution: 0.05,
            p_hit: 0.7,
            p_miss: 0.4,
            p_prior: 0.5,
            free_threshold: 0.4,
            occupied_threshold: 0.6,
        }
    }
}

/// Steering suggestion derived from the grid: a motor command plus the
/// relative turn in degrees (positive = clockwise/right).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DirectionHint {
    /// Command letter to send.
    pub command: MotorCommand,
    /// Relative turn in degrees.
    pub turn_deg: f64,
}

impl DirectionHint {
    /// Keep driving straight.
    pub const FORWARD: Self = Self { command: MotorCommand::Forward, turn_deg: 0.0 };
    /// No clear direction.
    pub const STOP: Self = Self { command: MotorCommand::Stop, turn_deg: 0.0 };
}

/// Log-odds occupancy grid.
#[derive(Debug, Clone)]
pub struct LogOddsGrid {
    config: LogOddsConfig,
    rows: usize,
    cols: usize,
    origin: WorldPoint,
    l_hit: f64,
    l_miss: f64,
    l_prior: f64,
    /// Row-major log-odds
    cells: Vec<f64>,
}

impl LogOddsGrid {
    /// Creates a grid filled with `logit(p_prior)`.
    ///
    /// # Errors
    /// * `InvalidResolution` if the resolution is not positive.
    /// * `InvalidDimensions` if the extent yields no cells.
    /// * `InvalidProbability` if a probability or threshold lies outside `(0, 1)`.
    pub fn new(config: LogOddsConfig) -> Result<Self, NavigationError> {
        if config.resolution <= 0.0 {
            return Err(NavigationError::InvalidResolution("resolution must be positive"));
        }
        let cols = (config.width_m / config.resolution + 1e-9).floor();
        let rows = (config.height_m / config.resolution + 1e-9).floor();
        if !(cols >= 1.0 && rows >= 1.0) {
            return Err(NavigationError::InvalidDimensions(
                "grid extent must cover at least one cell",
            ));
        }
        let probs = [
            config.p_hit,
            config.p_miss,
            config.p_prior,
            config.free_threshold,
            config.occupied_threshold,
        ];
        if probs.iter().any(|p| !(*p > 0.0 && *p < 1.0)) {
            return Err(NavigationError::InvalidProbability(
                "probabilities must lie strictly between 0 and 1",
            ));
        }

        let (rows, cols) = (rows as usize, cols as usize);
        let l_prior = logit(config.p_prior);
        Ok(Self {
            config,
            rows,
            cols,
            origin: WorldPoint::new(-config.width_m / 2.0, -config.height_m / 2.0),
            l_hit: logit(config.p_hit),
            l_miss: logit(config.p_miss),
            l_prior,
            cells: vec![l_prior; rows * cols],
        })
    }

    /// The parameters this grid was built with.
    pub fn config(&self) -> &LogOddsConfig {
        &self.config
    }

    /// Restores every cell to the prior.
    pub fn clear(&mut self) {
        self.cells.fill(self.l_prior);
    }

    fn index(&self, cell: GridCell) -> Option<usize> {
        self.contains(cell)
            .then(|| cell.row as usize * self.cols + cell.col as usize)
    }

    /// Raw log-odds of an in-bounds cell.
    pub fn log_odds(&self, cell: GridCell) -> Option<f64> {
        self.index(cell).map(|idx| self.cells[idx])
    }

    fn add(&mut self, cell: GridCell, delta: f64) {
        if let Some(idx) = self.index(cell) {
            self.cells[idx] = (self.cells[idx] + delta).clamp(-LOG_ODDS_LIMIT, LOG_ODDS_LIMIT);
        }
    }

    /// Integrates one ray from `origin` to `hit` (world metres).
    ///
    /// An out-of-bounds endpoint collapses onto the other one; if both are out
    /// the update is dropped.
    pub fn update_ray(&mut self, origin: WorldPoint, hit: WorldPoint) {
        let start = self.world_to_cell(origin.x, origin.y);
        let end = self.world_to_cell(hit.x, hit.y);
        let (start, end) = match (self.contains(start), self.contains(end)) {
            (false, false) => return,
            (false, true) => (end, end),
            (true, false) => (start, start),
            (true, true) => (start, end),
        };

        let cells = bresenham(start, end);
        let (last, traversed) = match cells.split_last() {
            Some(split) => split,
            None => return,
        };
        for cell in traversed {
            self.add(*cell, self.l_miss);
        }
        self.add(*last, self.l_hit);
    }

    /// True if the cell is in bounds and its probability is below the free threshold.
    pub fn is_cell_free(&self, cell: GridCell) -> bool {
        self.log_odds(cell)
            .is_some_and(|l| probability(l) < self.config.free_threshold)
    }

    /// True if the cell is out of bounds or above the occupied threshold.
    pub fn is_cell_occupied(&self, cell: GridCell) -> bool {
        self.log_odds(cell)
            .is_none_or(|l| probability(l) > self.config.occupied_threshold)
    }

    /// True when none of the first `look_ahead` in-bounds cells along
    /// `heading_deg` (0 = +Y, clockwise) is occupied.
    fn path_clear(&self, x: f64, y: f64, heading_deg: f64, look_ahead: usize) -> bool {
        let a = heading_deg.to_radians();
        let (sin_a, cos_a) = a.sin_cos();
        (1..=look_ahead).all(|step| {
            let d = step as f64 * self.config.resolution;
            let cell = self.world_to_cell(x + d * sin_a, y + d * cos_a);
            // Probes outside the grid are skipped.
            !self.contains(cell) || !self.is_cell_occupied(cell)
        })
    }

    /// Suggests a motor command from the grid around `(x, y)`.
    ///
    /// Forward if the way ahead is clear, otherwise the first clear probe
    /// (`R` for positive offsets, `L` for negative), otherwise stop. A robot
    /// outside the grid keeps driving forward.
    pub fn best_direction(&self, x: f64, y: f64, heading_deg: f64, look_ahead: usize) -> DirectionHint {
        if !self.contains(self.world_to_cell(x, y)) {
            return DirectionHint::FORWARD;
        }
        if self.path_clear(x, y, heading_deg, look_ahead) {
            return DirectionHint::FORWARD;
        }
        PROBE_OFFSETS_DEG
            .iter()
            .find(|offset| self.path_clear(x, y, heading_deg + **offset, look_ahead))
            .map_or(DirectionHint::STOP, |offset| DirectionHint {
                command: if *offset < 0.0 { MotorCommand::Left } else { MotorCommand::Right },
                turn_deg: *offset,
            })
    }

    /// Dense `rows x cols` probability grid.
    pub fn probability_grid(&self) -> Vec<Vec<f64>> {
        self.cells
            .chunks(self.cols)
            .map(|row| row.iter().map(|l| probability(*l)).collect())
            .collect()
    }
}

impl OccupancyMap for LogOddsGrid {
    fn dims(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    fn resolution(&self) -> f64 {
        self.config.resolution
    }

    fn origin(&self) -> WorldPoint {
        self.origin
    }

    fn occupancy(&self, cell: GridCell) -> f64 {
        self.log_odds(cell).map_or(1.0, probability)
    }

    fn is_unknown(&self, cell: GridCell) -> bool {
        self.log_odds(cell).is_some_and(|l| l == self.l_prior)
    }

    fn is_occupied(&self, cell: GridCell) -> bool {
        self.is_cell_occupied(cell)
    }

    fn bounds(&self) -> MapBounds {
        MapBounds {
            x_min: self.origin.x,
            x_max: self.origin.x + self.config.width_m,
            y_min: self.origin.y,
            y_max: self.origin.y + self.config.height_m,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    fn grid() -> LogOddsGrid {
        LogOddsGrid::new(LogOddsConfig::default()).unwrap()
    }

    #[test]
    fn test_dimensions_and_bounds() {
        let g = grid();
        assert_eq!(g.dims(), (200, 200));
        assert_eq!(
            g.bounds(),
            MapBounds { x_min: -5.0, x_max: 5.0, y_min: -5.0, y_max: 5.0 }
        );
        assert_eq!(g.world_to_cell(0.0, 0.0), GridCell::new(100, 100));
    }

    #[test]
    fn test_invalid_config() {
        let bad_res = LogOddsConfig { resolution: 0.0, ..Default::default() };
        assert!(matches!(LogOddsGrid::new(bad_res), Err(NavigationError::InvalidResolution(_))));
        let bad_p = LogOddsConfig { p_hit: 1.0, ..Default::default() };
        assert!(matches!(LogOddsGrid::new(bad_p), Err(NavigationError::InvalidProbability(_))));
        let tiny = LogOddsConfig { width_m: 0.01, ..Default::default() };
        assert!(matches!(LogOddsGrid::new(tiny), Err(NavigationError::InvalidDimensions(_))));
    }

    #[test]
    fn test_prior_is_half() {
        let g = grid();
        assert!(logit(0.5).abs() < EPSILON);
        assert!((g.occupancy(GridCell::new(3, 4)) - 0.5).abs() < EPSILON);
        assert!(g.is_unknown(GridCell::new(3, 4)));
    }

    #[test]
    fn test_logit_clamps_extremes() {
        assert!(logit(0.0).is_finite());
        assert!(logit(1.0).is_finite());
        assert!((logit(0.0) - logit(1e-6)).abs() < EPSILON);
        assert!(logit(1.0) > 13.0);
    }

    #[test]
    fn test_probability_round_trip() {
        for p in [0.01, 0.2, 0.4, 0.5, 0.7, 0.93] {
            assert!((probability(logit(p)) - p).abs() < 1e-12);
        }
    }

    #[test]
    fn test_probability_is_monotonic() {
        let mut prev = 0.0;
        let mut l = -LOG_ODDS_LIMIT;
        while l <= LOG_ODDS_LIMIT {
            let p = probability(l);
            assert!(p > prev);
            assert!((0.0..=1.0).contains(&p));
            prev = p;
            l += 0.25;
        }
    }

    #[test]
    fn test_repeated_hits_saturate() {
        let mut g = grid();
        let origin = WorldPoint::new(0.0, 0.0);
        let hit = WorldPoint::new(0.0, 1.0);
        for _ in 0..100 {
            g.update_ray(origin, hit);
        }
        let hit_cell = g.world_to_cell(hit.x, hit.y);
        let start_cell = g.world_to_cell(origin.x, origin.y);
        assert!((g.log_odds(hit_cell).unwrap() - LOG_ODDS_LIMIT).abs() < EPSILON);
        assert!((g.log_odds(start_cell).unwrap() + LOG_ODDS_LIMIT).abs() < EPSILON);
        assert!(g.is_cell_occupied(hit_cell));
        assert!(g.is_cell_free(start_cell));
    }

    #[test]
    fn test_single_ray_update() {
        let mut g = grid();
        g.update_ray(WorldPoint::new(0.0, 0.0), WorldPoint::new(0.5, 0.0));
        let row = 100;
        for col in 100..110 {
            let l = g.log_odds(GridCell::new(row, col)).unwrap();
            assert!((l - logit(0.4)).abs() < EPSILON);
        }
        let l_hit = g.log_odds(GridCell::new(row, 110)).unwrap();
        assert!((l_hit - logit(0.7)).abs() < EPSILON);
    }

    #[test]
    fn test_out_of_bounds_endpoint_collapses() {
        let mut g = grid();
        g.update_ray(WorldPoint::new(0.0, 0.0), WorldPoint::new(20.0, 0.0));
        let origin_cell = g.world_to_cell(0.0, 0.0);
        assert!((g.log_odds(origin_cell).unwrap() - logit(0.7)).abs() < EPSILON);
        assert_eq!(g.explored_cells().len(), 1);

        let mut g = grid();
        g.update_ray(WorldPoint::new(20.0, 0.0), WorldPoint::new(-20.0, 3.0));
        assert!(g.explored_cells().is_empty());
    }

    #[test]
    fn test_out_of_bounds_cells() {
        let g = grid();
        let outside = GridCell::new(-1, 5);
        assert!(g.is_cell_occupied(outside));
        assert!(!g.is_cell_free(outside));
        assert_eq!(g.occupancy(outside), 1.0);
    }

    fn block(g: &mut LogOddsGrid, x: f64, y: f64) {
        let cell = g.world_to_cell(x, y);
        for _ in 0..5 {
            g.update_ray(WorldPoint::new(x, y), WorldPoint::new(x, y));
        }
        assert!(g.is_cell_occupied(cell));
    }

    #[test]
    fn test_best_direction_forward_when_clear() {
        let g = grid();
        assert_eq!(g.best_direction(0.01, 0.01, 0.0, 3), DirectionHint::FORWARD);
    }

    #[test]
    fn test_best_direction_turns_right_first() {
        let mut g = grid();
        // Heading 0 looks along +Y.
        block(&mut g, 0.01, 0.11);
        let hint = g.best_direction(0.01, 0.01, 0.0, 3);
        assert_eq!(hint.command, MotorCommand::Right);
        assert!((hint.turn_deg - 45.0).abs() < EPSILON);
    }

    #[test]
    fn test_best_direction_turns_left_when_right_blocked() {
        let mut g = grid();
        block(&mut g, 0.01, 0.11);
        // 45 deg clockwise from +Y points toward +X/+Y.
        block(&mut g, 0.06, 0.06);
        let hint = g.best_direction(0.01, 0.01, 0.0, 3);
        assert_eq!(hint.command, MotorCommand::Left);
        assert!((hint.turn_deg + 45.0).abs() < EPSILON);
    }

    #[test]
    fn test_best_direction_stops_when_boxed_in() {
        let mut g = grid();
        for dr in -1..=1 {
            for dc in -1..=1 {
                if dr != 0 || dc != 0 {
                    block(&mut g, 0.01 + dc as f64 * 0.05, 0.01 + dr as f64 * 0.05);
                }
            }
        }
        assert_eq!(g.best_direction(0.01, 0.01, 0.0, 3), DirectionHint::STOP);
    }

    #[test]
    fn test_best_direction_outside_grid() {
        let mut g = grid();
        block(&mut g, 0.01, 0.11);
        assert_eq!(g.best_direction(50.0, 50.0, 0.0, 3), DirectionHint::FORWARD);
    }

    #[test]
    fn test_probability_grid_shape() {
        let g = LogOddsGrid::new(LogOddsConfig { width_m: 1.0, height_m: 0.5, resolution: 0.1, ..Default::default() }).unwrap();
        let dense = g.probability_grid();
        assert_eq!(dense.len(), 5);
        assert!(dense.iter().all(|row| row.len() == 10));
        assert_eq!(dense, g.dense_occupancy());
    }
}
