use scout_navigation::map::{LogOddsConfig, LogOddsGrid, OccupancyMap, WorldPoint};

fn main() {
    // 2 x 2 m grid at 10 cm, robot at the centre facing +Y.
    let config = LogOddsConfig { width_m: 2.0, height_m: 2.0, resolution: 0.1, ..Default::default() };
    let mut grid = match LogOddsGrid::new(config) {
        Ok(grid) => grid,
        Err(e) => {
            eprintln!("Failed to build grid: {}", e);
            return;
        }
    };

    // A wall 60 cm ahead, seen three times across a small fan.
    let origin = WorldPoint::new(0.0, 0.0);
    for _ in 0..3 {
        for x in [-0.2, -0.1, 0.0, 0.1, 0.2] {
            grid.update_ray(origin, WorldPoint::new(x, 0.6));
        }
    }

    println!("Occupancy (rows top to bottom, '#' occupied, '.' free, '?' unknown):");
    let (rows, cols) = grid.dims();
    for row in (0..rows as i32).rev() {
        let line: String = (0..cols as i32)
            .map(|col| {
                let cell = scout_navigation::GridCell::new(row, col);
                if grid.is_cell_occupied(cell) {
                    '#'
                } else if grid.is_cell_free(cell) {
                    '.'
                } else {
                    '?'
                }
            })
            .collect();
        println!("{}", line);
    }

    let hint = grid.best_direction(0.0, 0.0, 0.0, 8);
    println!("\nSuggested command: {} (turn {:+.0} deg)", hint.command, hint.turn_deg);

    let b = grid.bounds();
    println!("Bounds: x [{:.1}, {:.1}] y [{:.1}, {:.1}]", b.x_min, b.x_max, b.y_min, b.y_max);
}
