//! Synthetic air temperature and humidity fields.

use scout_navigation::{Space, World};

use crate::sim::noise::Noise;

/// Temperature range outside any named space (°C).
const CORRIDOR_TEMP: (f64, f64) = (17.2, 18.8);
/// Humidity range outside any named space (%).
const CORRIDOR_HUMIDITY: (f64, f64) = (48.0, 55.0);
/// Above this temperature humidity rises with it.
const HUMID_ABOVE_C: f64 = 22.0;
const HUMIDITY_PER_DEGREE: f64 = 1.5;
const HUMIDITY_CAP: f64 = 65.0;

/// Offsets (m) and weights of the sampling footprint around the sensor.
const FOOTPRINT: [(f64, f64, f64); 13] = [
    (0.0, 0.0, 1.0),
    (0.5, 0.0, 0.6),
    (-0.5, 0.0, 0.6),
    (0.0, 0.5, 0.6),
    (0.0, -0.5, 0.6),
    (0.5, 0.5, 0.4),
    (0.5, -0.5, 0.4),
    (-0.5, 0.5, 0.4),
    (-0.5, -0.5, 0.4),
    (1.0, 0.0, 0.25),
    (-1.0, 0.0, 0.25),
    (0.0, 1.0, 0.25),
    (0.0, -1.0, 0.25),
];

#[derive(Debug, Clone)]
pub struct AmbientModel {
    noise: Noise,
    temp_noise_c: f64,
    humidity_noise_pct: f64,
}

impl AmbientModel {
    pub fn new(noise: Noise, temp_noise_c: f64, humidity_noise_pct: f64) -> Self {
        Self { noise, temp_noise_c, humidity_noise_pct }
    }

    /// Footprint-weighted air temperature at `(x, y)` for simulation time `t`.
    ///
    /// Only traversable sample points contribute; if none do, the single
    /// point value is used.
    pub fn temperature(&mut self, world: &World, x: f64, y: f64, t: f64) -> f64 {
        let mut total = 0.0;
        let mut weight = 0.0;
        for (dx, dy, w) in FOOTPRINT {
            let (sx, sy) = (x + dx, y + dy);
            if !world.is_traversable(world.world_to_cell(sx, sy)) {
                continue;
            }
            let space = world.space_at(sx, sy);
            total += w * self.point_temperature(world, sx, sy, space, t);
            weight += w;
        }
        if weight < 1e-6 {
            return self.point_temperature(world, x, y, world.space_at(x, y), t);
        }
        total / weight
    }

    /// Temperature at a single point.
    pub fn point_temperature(&mut self, world: &World, x: f64, y: f64, space: Option<&Space>, t: f64) -> f64 {
        let base = match space {
            Some(space) => {
                let (lo, hi) = space.temp_range;
                let cell = world.world_to_cell(x, y);
                let row_frac = cell.row as f64 / world.rows() as f64;
                let radiator = 0.5 * (1.0 - row_frac) + 0.2 * (cell.col as f64 * 0.2).sin();
                self.noise.uniform(lo, hi) + radiator
            }
            None => self.noise.uniform(CORRIDOR_TEMP.0, CORRIDOR_TEMP.1),
        };
        base + subcell_variation(x, y) + self.time_drift(t) + self.noise.gauss(self.temp_noise_c)
    }

    /// Relative humidity in `space` given the local temperature.
    pub fn humidity(&mut self, space: Option<&Space>, temp_c: f64) -> f64 {
        let (lo, hi) = space.map_or(CORRIDOR_HUMIDITY, |s| s.humidity_range);
        let mut base = self.noise.uniform(lo, hi);
        if temp_c > HUMID_ABOVE_C {
            base = (base + (temp_c - HUMID_ABOVE_C) * HUMIDITY_PER_DEGREE).min(HUMIDITY_CAP);
        }
        base + self.noise.gauss(self.humidity_noise_pct)
    }

    fn time_drift(&mut self, t: f64) -> f64 {
        let mut drift = 0.15 * (0.02 * t).sin() + 0.1 * (0.07 * t + 1.0).sin();
        // Periodic warm spell.
        let phase = t.rem_euclid(200.0);
        if phase > 20.0 && phase < 70.0 {
            drift += self.noise.uniform(0.3, 1.2);
        }
        drift
    }
}

/// Deterministic small-scale structure so neighbouring fine cells differ.
fn subcell_variation(x: f64, y: f64) -> f64 {
    0.35 * (0.8 * x).sin() * (0.6 * y).cos()
        + 0.25 * (1.8 * x + 0.5).sin() * (1.2 * y).cos()
        + 0.2 * ((1.2 * (x + y)).sin() + 0.2)
}
