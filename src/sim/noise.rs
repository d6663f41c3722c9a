//! Seeded noise source shared by the simulated sensors.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

#[derive(Debug, Clone)]
pub struct Noise {
    rng: StdRng,
}

impl Noise {
    /// Deterministic when `seed` is given, OS-seeded otherwise.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self { rng }
    }

    /// Zero-mean Gaussian sample; a non-positive `std_dev` yields 0.
    pub fn gauss(&mut self, std_dev: f64) -> f64 {
        if std_dev <= 0.0 {
            return 0.0;
        }
        match Normal::new(0.0, std_dev) {
            Ok(normal) => normal.sample(&mut self.rng),
            Err(_) => 0.0,
        }
    }

    /// Uniform sample in `[lo, hi)`; an empty range yields `lo`.
    pub fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        if hi > lo { self.rng.random_range(lo..hi) } else { lo }
    }

    /// Independent stream for another component.
    pub fn fork(&mut self) -> Self {
        Self { rng: StdRng::seed_from_u64(self.rng.random()) }
    }
}
