//! Simulated forward range sensor and lidar-style point cloud.

use std::f64::consts::TAU;

use scout_kinematics::Pose;
use scout_navigation::{HitKind, World};

use crate::config::SensorSettings;
use crate::sim::noise::Noise;
use crate::sim::obstacles::MovingObstacle;

/// Height of the simulated scan plane (m).
const SCAN_HEIGHT: f64 = 0.02;
/// Closest a cloud point can be to the sensor (m).
const MIN_CLOUD_DISTANCE: f64 = 0.05;

#[derive(Debug, Clone)]
pub struct RangeSensor {
    settings: SensorSettings,
    noise: Noise,
}

impl RangeSensor {
    pub fn new(settings: SensorSettings, noise: Noise) -> Self {
        Self { settings, noise }
    }

    pub fn settings(&self) -> &SensorSettings {
        &self.settings
    }

    /// Range (cm) along the heading of `pose`.
    ///
    /// Static hits carry noise and are clamped per hit kind; a moving obstacle
    /// closer than the static result wins with its exact distance.
    pub fn ultrasonic(&mut self, world: &World, pose: &Pose, obstacles: &[MovingObstacle]) -> f64 {
        let max_cm = self.settings.max_range_cm;
        let mut range_m = match world.raycast_hit(pose.x, pose.y, pose.theta, max_cm / 100.0) {
            Some(hit) => {
                let (noise, min_cm) = match hit.kind {
                    HitKind::Obstacle => (self.settings.obstacle_noise_cm, self.settings.min_obstacle_cm),
                    HitKind::Wall => (self.settings.wall_noise_cm, self.settings.min_wall_cm),
                };
                let cm = hit.distance * 100.0 + self.noise.gauss(noise);
                cm.clamp(min_cm, max_cm) / 100.0
            }
            None => max_cm / 100.0,
        };

        for obstacle in obstacles {
            if let Some(d) = obstacle.ray_distance(pose) {
                if d > 0.0 && d < range_m {
                    range_m = d;
                }
            }
        }
        range_m * 100.0
    }

    /// Range (cm) to the side of `pose`, `+1` for left and `-1` for right.
    pub fn side_range(
        &mut self,
        world: &World,
        pose: &Pose,
        obstacles: &[MovingObstacle],
        side_sign: f64,
    ) -> f64 {
        let side = Pose::new(pose.x, pose.y, pose.theta + side_sign * std::f64::consts::FRAC_PI_2);
        self.ultrasonic(world, &side, obstacles)
    }

    /// Noisy 360° scan as `[x, height, y]` points; rays that hit nothing are skipped.
    pub fn point_cloud(&mut self, world: &World, pose: &Pose) -> Vec<[f64; 3]> {
        let rays = self.settings.cloud_rays;
        let mut points = Vec::with_capacity(rays);
        for i in 0..rays {
            let angle = TAU * i as f64 / rays as f64 + self.noise.gauss(self.settings.cloud_angle_noise_rad);
            let ray = pose.theta + angle;
            let Some(dist) = world.raycast(pose.x, pose.y, ray, self.settings.cloud_max_range_m) else {
                continue;
            };
            let dist = (dist + self.noise.gauss(self.settings.cloud_distance_noise_m)).max(MIN_CLOUD_DISTANCE);
            let (s, c) = ray.sin_cos();
            points.push([
                pose.x + c * dist,
                SCAN_HEIGHT + self.noise.gauss(self.settings.cloud_height_noise_m),
                pose.y + s * dist,
            ]);
        }
        points
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MovingObstacleSettings;
    use std::f64::consts::PI;

    const EPSILON: f64 = 1e-9;

    fn quiet() -> SensorSettings {
        SensorSettings {
            obstacle_noise_cm: 0.0,
            wall_noise_cm: 0.0,
            cloud_distance_noise_m: 0.0,
            cloud_angle_noise_rad: 0.0,
            cloud_height_noise_m: 0.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_ultrasonic_static_hits() {
        let world = World::default_floor();
        let mut sensor = RangeSensor::new(quiet(), Noise::new(Some(1)));
        // Obstacle cell (4, 14) starts 1.5 m ahead.
        let cm = sensor.ultrasonic(&world, &Pose::new(12.5, 4.5, 0.0), &[]);
        assert!((cm - 150.0).abs() < 5.1);
        // Open corridor toward +x from (20.5, 2.5): wall at x = 26.
        let cm = sensor.ultrasonic(&world, &Pose::new(20.5, 2.5, 0.0), &[]);
        assert!((cm - 400.0).abs() < EPSILON);
    }

    #[test]
    fn test_ultrasonic_clamps_close_hits() {
        let world = World::default_floor();
        let mut sensor = RangeSensor::new(quiet(), Noise::new(Some(1)));
        // 1 cm from the bottom wall: first 5 cm step is already inside it.
        let cm = sensor.ultrasonic(&world, &Pose::new(5.5, 2.01, -PI / 2.0), &[]);
        assert!((cm - 5.0).abs() < 0.1);
        let cm = sensor.ultrasonic(&world, &Pose::new(13.99, 4.5, 0.0), &[]);
        assert!((cm - 8.0).abs() < EPSILON);
    }

    #[test]
    fn test_moving_obstacle_shortens_range() {
        let world = World::default_floor();
        let mut sensor = RangeSensor::new(quiet(), Noise::new(Some(1)));
        let obstacle = MovingObstacle::new(&MovingObstacleSettings {
            center_x: 19.0,
            center_y: 2.5,
            path_radius: 0.0,
            radius: 0.5,
            speed: 0.0,
        });
        let cm = sensor.ultrasonic(&world, &Pose::new(17.0, 2.5, 0.0), &[obstacle]);
        assert!((cm - 150.0).abs() < 1e-6);
    }

    #[test]
    fn test_point_cloud_stays_in_range() {
        let world = World::default_floor();
        let mut sensor = RangeSensor::new(SensorSettings::default(), Noise::new(Some(3)));
        let pose = Pose::new(14.5, 5.0, 0.3);
        let cloud = sensor.point_cloud(&world, &pose);
        assert!(!cloud.is_empty() && cloud.len() <= 72);
        for [x, h, y] in cloud {
            assert!(pose.distance_to(x, y) <= 8.5);
            assert!((h - SCAN_HEIGHT).abs() < 0.1);
        }
    }
}
