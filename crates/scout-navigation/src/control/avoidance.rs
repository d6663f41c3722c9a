use scout_kinematics::{ChassisSpeeds, DifferentialDrive, Pose, WheelSpeeds};
use tracing::debug;

use crate::error::NavigationError;
use crate::map::ExplorationGrid;

/// Tuning for [`Avoidance`]. Times are in seconds of the caller's clock.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AvoidanceParams {
    /// Obstacle look-ahead (m).
    pub check_distance: f64,
    /// Half-angle of the obstacle cone (rad).
    pub cone_half_angle: f64,
    /// How long a detection keeps the agent avoiding (s).
    pub commit_window: f64,
    /// Look distance for the side-clearance rays (m).
    pub clear_look: f64,
    /// Look distance for the unknown-counting fan (m).
    pub explore_look: f64,
    /// Clear steer magnitudes above this take priority over exploration.
    pub clear_dominance: f64,
    /// Forward speed while avoiding (m/s).
    pub forward_speed: f64,
    /// Turn rate per unit of steer (rad/s).
    pub steer_gain: f64,
    /// Continuous avoidance after which the waypoint is skipped (s).
    pub stuck_interval: f64,
    /// Wheel separation (m).
    pub wheel_base: f64,
}

impl Default for AvoidanceParams {
    fn default() -> Self {
        Self {
            check_distance: 0.55,
            cone_half_angle: 0.3,
            commit_window: 0.7,
            clear_look: 0.5,
            explore_look: 0.7,
            clear_dominance: 0.5,
            forward_speed: 0.28,
            steer_gain: 1.0,
            stuck_interval: 2.0,
            wheel_base: 0.2,
        }
    }
}

/// Per-agent navigation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NavMode {
    #[default]
    Patrolling,
    Avoiding,
}

/// Result of one avoidance evaluation while the commitment window is open.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AvoidanceStep {
    pub wheels: WheelSpeeds,
    /// Blended steer, positive counter-clockwise.
    pub steer: f64,
    /// The agent has been avoiding for too long; skip the current waypoint.
    /// The commitment window is already closed when this is set.
    pub force_advance: bool,
}

/// Avoidance commitment: a detection opens (or re-arms) a window during which
/// the agent steers by grid clearance instead of following its patrol.
#[derive(Debug, Clone)]
pub struct Avoidance {
    params: AvoidanceParams,
    drive: DifferentialDrive,
    until: f64,
    since: f64,
}

impl Avoidance {
    /// # Errors
    /// `InvalidKinematics` if the wheel base is not positive.
    pub fn new(params: AvoidanceParams) -> Result<Self, NavigationError> {
        let drive = DifferentialDrive::new(params.wheel_base)?;
        Ok(Self { params, drive, until: 0.0, since: 0.0 })
    }

    /// Records an obstacle check at time `now`.
    pub fn observe(&mut self, now: f64, detected: bool) {
        if detected {
            if self.until <= now {
                self.since = now;
            }
            self.until = now + self.params.commit_window;
        }
    }

    pub fn mode(&self, now: f64) -> NavMode {
        if now < self.until { NavMode::Avoiding } else { NavMode::Patrolling }
    }

    /// Start of the current avoidance episode.
    pub fn since(&self) -> f64 {
        self.since
    }

    /// True once an open episode has lasted at least the stuck interval.
    pub fn should_force_advance(&self, now: f64) -> bool {
        self.mode(now) == NavMode::Avoiding && now - self.since >= self.params.stuck_interval
    }

    /// Closes the commitment window.
    pub fn cancel(&mut self) {
        self.until = 0.0;
    }

    /// Clearance steer wins when it is decisive, otherwise explore.
    pub fn blend(&self, clear: f64, explore: f64) -> f64 {
        if clear.abs() > self.params.clear_dominance { clear } else { explore }
    }

    /// Wheel command for a steer value.
    pub fn wheels_for(&self, steer: f64) -> WheelSpeeds {
        self.drive.inverse_kinematics(ChassisSpeeds::new(
            self.params.forward_speed,
            steer * self.params.steer_gain,
        ))
    }

    /// Runs the obstacle check for `pose` at `now` and, if the agent is
    /// committed to avoiding, returns the avoidance command.
    pub fn evaluate(&mut self, grid: &ExplorationGrid, pose: &Pose, now: f64) -> Option<AvoidanceStep> {
        let detected = grid.is_obstacle_ahead(pose, self.params.check_distance, self.params.cone_half_angle);
        self.observe(now, detected);
        if self.mode(now) == NavMode::Patrolling {
            return None;
        }

        let explore = grid.exploration_steer(pose, self.params.explore_look);
        let clear = grid.clear_steer(pose, self.params.clear_look);
        let steer = self.blend(clear, explore);

        let force_advance = self.should_force_advance(now);
        if force_advance {
            debug!(since = self.since, now, "avoiding too long, skipping waypoint");
            self.cancel();
        }
        Some(AvoidanceStep { wheels: self.wheels_for(steer), steer, force_advance })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::{Occupancy, OccupancyMap};

    const EPSILON: f64 = 1e-9;

    fn avoidance() -> Avoidance {
        Avoidance::new(AvoidanceParams::default()).unwrap()
    }

    #[test]
    fn test_commitment_window() {
        let mut a = avoidance();
        assert_eq!(a.mode(0.0), NavMode::Patrolling);

        a.observe(1.0, true);
        assert_eq!(a.mode(1.0), NavMode::Avoiding);
        assert_eq!(a.mode(1.69), NavMode::Avoiding);
        // No re-detection: window lapses after 0.7 s.
        a.observe(1.5, false);
        assert_eq!(a.mode(1.7), NavMode::Patrolling);
    }

    #[test]
    fn test_redetection_rearms_without_resetting_since() {
        let mut a = avoidance();
        a.observe(1.0, true);
        a.observe(1.5, true);
        assert!((a.since() - 1.0).abs() < EPSILON);
        assert_eq!(a.mode(2.1), NavMode::Avoiding);
        assert_eq!(a.mode(2.2), NavMode::Patrolling);

        // A fresh episode after the window lapsed restarts the clock.
        a.observe(3.0, true);
        assert!((a.since() - 3.0).abs() < EPSILON);
    }

    #[test]
    fn test_force_advance_after_stuck_interval() {
        let mut a = avoidance();
        let mut t = 0.0;
        while t < 2.0 {
            a.observe(t, true);
            assert!(!a.should_force_advance(t));
            t += 0.05;
        }
        a.observe(2.0, true);
        assert!(a.should_force_advance(2.0));
        a.cancel();
        assert_eq!(a.mode(2.0), NavMode::Patrolling);
        assert!(!a.should_force_advance(2.0));
    }

    #[test]
    fn test_blend_prefers_decisive_clear_steer() {
        let a = avoidance();
        assert_eq!(a.blend(0.75, 0.6), 0.75);
        assert_eq!(a.blend(-0.75, 0.6), -0.75);
        assert_eq!(a.blend(-0.5, 0.6), 0.6);
        assert_eq!(a.blend(0.0, -0.6), -0.6);
    }

    #[test]
    fn test_wheels_for_steer() {
        let a = avoidance();
        let w = a.wheels_for(1.0);
        assert!((w.v_left - 0.18).abs() < EPSILON);
        assert!((w.v_right - 0.38).abs() < EPSILON);
    }

    #[test]
    fn test_evaluate_follows_grid() {
        let mut grid = ExplorationGrid::new(20, 20, 1.0, 4).unwrap();
        let mut a = avoidance();
        let pose = Pose::new(10.1, 10.1, 0.0);
        assert!(a.evaluate(&grid, &pose, 0.0).is_none());

        grid.set(grid.world_to_cell(10.5, 10.1), Occupancy::Occupied);
        let step = a.evaluate(&grid, &pose, 0.05).unwrap();
        assert!(!step.force_advance);
        assert_eq!(a.mode(0.05), NavMode::Avoiding);

        // Obstacle removed: still committed until the window closes.
        grid.set(grid.world_to_cell(10.5, 10.1), Occupancy::Free);
        assert!(a.evaluate(&grid, &pose, 0.5).is_some());
        assert!(a.evaluate(&grid, &pose, 0.8).is_none());
    }
}
