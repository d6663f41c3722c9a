/// A cell index in a grid, signed so that rays may leave the grid.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GridCell {
    /// The row index (grows with world y).
    pub row: i32,
    /// The column index (grows with world x).
    pub col: i32,
}

impl GridCell {
    /// Creates a new `GridCell`.
    #[must_use]
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }
}

/// Represents a point in world coordinates (meters).
#[derive(Debug, Default, Clone, Copy, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WorldPoint {
    /// The x-coordinate in meters.
    pub x: f64,
    /// The y-coordinate in meters.
    pub y: f64,
}

impl WorldPoint {
    /// Creates a new `WorldPoint`.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned world bounds of a map, in meters.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MapBounds {
    /// Minimum x (m).
    pub x_min: f64,
    /// Maximum x (m).
    pub x_max: f64,
    /// Minimum y (m).
    pub y_min: f64,
    /// Maximum y (m).
    pub y_max: f64,
}
