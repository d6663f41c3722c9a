//! Integer line rasterization shared by both occupancy grids.

use super::point_types::GridCell;

/// Enumerates the cells on the segment `from -> to` with Bresenham's algorithm.
///
/// The returned sequence starts at `from`, ends at `to`, is 8-connected (each
/// step changes row and/or column by at most one) and always holds
/// `max(|Δrow|, |Δcol|) + 1` cells, whichever direction the segment is walked.
pub fn bresenham(from: GridCell, to: GridCell) -> Vec<GridCell> {
    let d_row = (to.row - from.row).abs();
    let d_col = -(to.col - from.col).abs();
    let s_row = if from.row < to.row { 1 } else { -1 };
    let s_col = if from.col < to.col { 1 } else { -1 };

    let mut cells = Vec::with_capacity(d_row.max(-d_col) as usize + 1);
    let mut err = d_row + d_col;
    let (mut row, mut col) = (from.row, from.col);

    loop {
        cells.push(GridCell::new(row, col));
        if row == to.row && col == to.col {
            break;
        }
        let e2 = 2 * err;
        if e2 >= d_col {
            err += d_col;
            row += s_row;
        }
        if e2 <= d_row {
            err += d_row;
            col += s_col;
        }
    }
    cells
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_cell() {
        let c = GridCell::new(3, -2);
        assert_eq!(bresenham(c, c), vec![c]);
    }

    #[test]
    fn test_horizontal_and_diagonal() {
        let line = bresenham(GridCell::new(0, 0), GridCell::new(0, 3));
        assert_eq!(line.len(), 4);
        assert!(line.iter().all(|c| c.row == 0));

        let diag = bresenham(GridCell::new(0, 0), GridCell::new(-3, -3));
        assert_eq!(
            diag,
            vec![
                GridCell::new(0, 0),
                GridCell::new(-1, -1),
                GridCell::new(-2, -2),
                GridCell::new(-3, -3)
            ]
        );
    }

    #[test]
    fn test_connected_endpoints_and_symmetric_length() {
        for r0 in -6..=6 {
            for c0 in -6..=6 {
                for (r1, c1) in [(5, -4), (-6, 2), (0, 6), (3, 3), (-1, 0), (6, 1)] {
                    let a = GridCell::new(r0, c0);
                    let b = GridCell::new(r1, c1);
                    let forward = bresenham(a, b);
                    let backward = bresenham(b, a);

                    assert_eq!(forward.first(), Some(&a));
                    assert_eq!(forward.last(), Some(&b));
                    assert_eq!(forward.len(), backward.len());
                    assert_eq!(
                        forward.len(),
                        ((r1 - r0).abs().max((c1 - c0).abs()) + 1) as usize
                    );
                    for pair in forward.windows(2) {
                        assert!((pair[0].row - pair[1].row).abs() <= 1);
                        assert!((pair[0].col - pair[1].col).abs() <= 1);
                    }
                }
            }
        }
    }
}
