use scout_kinematics::{ChassisSpeeds, DifferentialDrive, Pose, WheelSpeeds, wrap_error};

use crate::error::NavigationError;
use crate::map::WorldPoint;

/// Below this distance the target is treated as reached-in-place.
const MIN_TARGET_DISTANCE: f64 = 0.01;

/// Tuning for [`WaypointController`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct WaypointParams {
    /// Distance at which a waypoint counts as reached (m).
    pub arrival_distance: f64,
    /// Forward speed (m/s).
    pub base_speed: f64,
    /// Proportional gain on heading error.
    pub steer_gain: f64,
    /// Turn-rate saturation (rad/s).
    pub max_turn_rate: f64,
    /// Wheel separation (m).
    pub wheel_base: f64,
}

impl Default for WaypointParams {
    fn default() -> Self {
        Self {
            arrival_distance: 0.4,
            base_speed: 0.35,
            steer_gain: 2.0,
            max_turn_rate: 1.2,
            wheel_base: 0.2,
        }
    }
}

/// Proportional heading controller over a cyclic list of waypoints.
#[derive(Debug, Clone)]
pub struct WaypointController {
    waypoints: Vec<WorldPoint>,
    cursor: usize,
    params: WaypointParams,
    drive: DifferentialDrive,
}

impl WaypointController {
    /// Creates a controller targeting the first waypoint.
    ///
    /// # Errors
    /// * `EmptyWaypoints` if `waypoints` is empty.
    /// * `InvalidKinematics` if the wheel base is not positive.
    pub fn new(waypoints: Vec<WorldPoint>, params: WaypointParams) -> Result<Self, NavigationError> {
        if waypoints.is_empty() {
            return Err(NavigationError::EmptyWaypoints("at least one waypoint is required"));
        }
        let drive = DifferentialDrive::new(params.wheel_base)?;
        Ok(Self { waypoints, cursor: 0, params, drive })
    }

    /// Index of the current target.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// The current target.
    pub fn target(&self) -> WorldPoint {
        self.waypoints[self.cursor]
    }

    /// The full patrol route.
    pub fn waypoints(&self) -> &[WorldPoint] {
        &self.waypoints
    }

    /// Skips to the next waypoint, wrapping at the end of the route.
    pub fn advance(&mut self) {
        self.cursor = (self.cursor + 1) % self.waypoints.len();
    }

    /// Wheel command steering `pose` toward the current waypoint.
    ///
    /// Reaching the target advances the cursor once and steers toward the new
    /// target within the same call.
    pub fn compute(&mut self, pose: &Pose) -> WheelSpeeds {
        let mut target = self.target();
        let mut dist = pose.distance_to(target.x, target.y);
        if dist < self.params.arrival_distance {
            self.advance();
            target = self.target();
            dist = pose.distance_to(target.x, target.y);
        }

        if dist < MIN_TARGET_DISTANCE {
            let half = 0.5 * self.params.base_speed;
            return WheelSpeeds::new(half, half);
        }

        let error = wrap_error(pose.bearing_to(target.x, target.y) - pose.theta);
        let omega = (self.params.steer_gain * error)
            .clamp(-self.params.max_turn_rate, self.params.max_turn_rate);
        self.drive
            .inverse_kinematics(ChassisSpeeds::new(self.params.base_speed, omega))
    }
}
