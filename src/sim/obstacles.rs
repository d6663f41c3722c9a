//! Obstacles that circle a fixed centre, seen by the range sensor only.

use scout_kinematics::Pose;

use crate::config::MovingObstacleSettings;

#[derive(Debug, Clone, PartialEq)]
pub struct MovingObstacle {
    pub center_x: f64,
    pub center_y: f64,
    pub path_radius: f64,
    pub radius: f64,
    /// rad/s
    pub speed: f64,
    pub x: f64,
    pub y: f64,
}

impl MovingObstacle {
    pub fn new(settings: &MovingObstacleSettings) -> Self {
        let mut obstacle = Self {
            center_x: settings.center_x,
            center_y: settings.center_y,
            path_radius: settings.path_radius,
            radius: settings.radius,
            speed: settings.speed,
            x: settings.center_x,
            y: settings.center_y,
        };
        obstacle.step(0.0);
        obstacle
    }

    /// Places the obstacle on its path for simulation time `t` (s).
    pub fn step(&mut self, t: f64) {
        let (s, c) = (t * self.speed).sin_cos();
        self.x = self.center_x + self.path_radius * c;
        self.y = self.center_y + self.path_radius * s;
    }

    /// Distance along the heading of `pose` to the first intersection with the
    /// obstacle disc, if the ray hits it in front of the robot.
    pub fn ray_distance(&self, pose: &Pose) -> Option<f64> {
        let (dy, dx) = pose.theta.sin_cos();
        let (fx, fy) = (pose.x - self.x, pose.y - self.y);
        let b = 2.0 * (fx * dx + fy * dy);
        let c = fx * fx + fy * fy - self.radius * self.radius;
        let disc = b * b - 4.0 * c;
        if disc < 0.0 {
            return None;
        }
        let sq = disc.sqrt();
        [(-b - sq) / 2.0, (-b + sq) / 2.0].into_iter().find(|t| *t > 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    const EPSILON: f64 = 1e-9;

    fn obstacle() -> MovingObstacle {
        MovingObstacle::new(&MovingObstacleSettings {
            center_x: 10.0,
            center_y: 5.0,
            path_radius: 2.0,
            radius: 0.5,
            speed: 0.5,
        })
    }

    #[test]
    fn test_follows_circular_path() {
        let mut o = obstacle();
        assert!((o.x - 12.0).abs() < EPSILON && (o.y - 5.0).abs() < EPSILON);
        o.step(PI);
        assert!((o.x - 10.0).abs() < EPSILON);
        assert!((o.y - 7.0).abs() < EPSILON);
    }

    #[test]
    fn test_ray_hits_front_of_disc() {
        let o = obstacle();
        let d = o.ray_distance(&Pose::new(10.0, 5.0, 0.0)).unwrap();
        assert!((d - 1.5).abs() < EPSILON);
        assert!(o.ray_distance(&Pose::new(10.0, 5.0, PI)).is_none());
        assert!(o.ray_distance(&Pose::new(10.0, 6.0, 0.0)).is_none());
    }

    #[test]
    fn test_ray_from_inside_disc() {
        let o = obstacle();
        let d = o.ray_distance(&Pose::new(12.0, 5.0, 0.0)).unwrap();
        assert!((d - 0.5).abs() < EPSILON);
    }
}
