use scout_kinematics::{ChassisSpeeds, DifferentialDrive, WheelSpeeds};

use crate::error::NavigationError;

/// Ranges below this (cm) trigger a hard turn away from the wall.
const VERY_CLOSE_CM: f64 = 15.0;
const CLOSE_CM: f64 = 25.0;
/// Ranges above this (cm) mean the wall was lost.
const FAR_CM: f64 = 50.0;
const VERY_CLOSE_TURN: f64 = 1.5;
const CLOSE_TURN: f64 = 0.8;
const FAR_TURN: f64 = 0.4;
const INTEGRAL_LIMIT: f64 = 10.0;

/// Which side of the robot the followed wall is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum WallSide {
    /// Wall on the left; positive turn rate turns toward it.
    #[default]
    Left,
    /// Wall on the right.
    Right,
}

impl WallSide {
    /// `+1` for left, `-1` for right.
    pub fn sign(&self) -> f64 {
        match self {
            WallSide::Left => 1.0,
            WallSide::Right => -1.0,
        }
    }
}

/// Tuning for [`WallFollower`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct WallFollowParams {
    /// Desired side range (cm).
    pub target_cm: f64,
    /// Proportional gain.
    pub kp: f64,
    /// Integral gain.
    pub ki: f64,
    /// Derivative gain.
    pub kd: f64,
    /// Forward speed (m/s).
    pub base_speed: f64,
    /// Turn-rate saturation (rad/s).
    pub max_turn_rate: f64,
    /// Wheel separation (m).
    pub wheel_base: f64,
    /// Side of the followed wall.
    pub side: WallSide,
}

impl Default for WallFollowParams {
    fn default() -> Self {
        Self {
            target_cm: 30.0,
            kp: 0.5,
            ki: 0.01,
            kd: 0.1,
            base_speed: 0.25,
            max_turn_rate: 1.5,
            wheel_base: 0.2,
            side: WallSide::Left,
        }
    }
}

/// PID wall-following law with fixed override bands close to and far from the wall.
#[derive(Debug, Clone)]
pub struct WallFollower {
    params: WallFollowParams,
    drive: DifferentialDrive,
    integral: f64,
    prev_error: f64,
}

impl WallFollower {
    /// # Errors
    /// `InvalidKinematics` if the wheel base is not positive.
    pub fn new(params: WallFollowParams) -> Result<Self, NavigationError> {
        let drive = DifferentialDrive::new(params.wheel_base)?;
        Ok(Self { params, drive, integral: 0.0, prev_error: 0.0 })
    }

    /// Accumulated integral term.
    pub fn integral(&self) -> f64 {
        self.integral
    }

    /// Clears the PID memory.
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.prev_error = 0.0;
    }

    /// Turn rate (rad/s, positive = counter-clockwise) for a side range.
    pub fn turn_rate(&mut self, distance_cm: f64, dt: f64) -> f64 {
        let side = self.params.side.sign();
        let error = self.params.target_cm - distance_cm;

        let omega = if distance_cm < VERY_CLOSE_CM {
            -side * VERY_CLOSE_TURN
        } else if distance_cm < CLOSE_CM {
            -side * CLOSE_TURN
        } else if distance_cm > FAR_CM {
            side * FAR_TURN
        } else {
            self.integral = (self.integral + error * dt).clamp(-INTEGRAL_LIMIT, INTEGRAL_LIMIT);
            let derivative = if dt > 0.0 { (error - self.prev_error) / dt } else { 0.0 };
            self.prev_error = error;
            let pid = self.params.kp * error + self.params.ki * self.integral + self.params.kd * derivative;
            -side * pid
        };

        omega.clamp(-self.params.max_turn_rate, self.params.max_turn_rate)
    }

    /// Wheel command for a side range sampled `dt` seconds after the previous one.
    pub fn compute(&mut self, distance_cm: f64, dt: f64) -> WheelSpeeds {
        let omega = self.turn_rate(distance_cm, dt);
        self.drive
            .inverse_kinematics(ChassisSpeeds::new(self.params.base_speed, omega))
    }
}
