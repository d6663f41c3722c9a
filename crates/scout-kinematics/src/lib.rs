#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![doc = "A `no_std` library for 2D differential-drive scout kinematics."]
#![doc = ""]
#![doc = "This crate provides the pose type shared by every navigation component, the"]
#![doc = "angle wrapping helpers, and the integrator that turns left/right wheel"]
#![doc = "velocities into a new pose."]

use core::f64::consts::PI;
use core::fmt;
use libm::{atan2, cos, fmod, sin, sqrt};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub mod error;
pub use error::KinematicsError;

const TWO_PI: f64 = 2.0 * PI;

/// Normalize an angle to be within `[-PI, PI)`.
///
/// Angles at `PI` will be normalized to `-PI`. The function is idempotent.
pub fn normalize_angle(angle: f64) -> f64 {
    let mut a = fmod(angle, TWO_PI);
    if a >= PI {
        a -= TWO_PI;
    } else if a < -PI {
        a += TWO_PI;
    }
    // Rounding at the boundary can land exactly on PI.
    if a >= PI { -PI } else { a }
}

/// Wrap a heading error into `(-PI, PI]`.
///
/// Used by controllers so that an error of exactly half a turn keeps its
/// positive sign (turn left) instead of flipping to the right.
pub fn wrap_error(angle: f64) -> f64 {
    let a = normalize_angle(angle);
    if a <= -PI { PI } else { a }
}

/// Normalize a compass heading in degrees to `[0, 360)`.
pub fn normalize_degrees(heading_deg: f64) -> f64 {
    let mut h = fmod(heading_deg, 360.0);
    if h < 0.0 {
        h += 360.0;
    }
    if h >= 360.0 { 0.0 } else { h }
}

/// A 2‑D pose `(x, y, θ)` in meters and radians (θ measured counter‑clockwise
/// from the x‑axis in the world frame).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pose {
    /// World‑frame x position (m).
    pub x: f64,
    /// World‑frame y position (m).
    pub y: f64,
    /// Heading (rad), normalized to `[-PI, PI)`.
    pub theta: f64,
}

impl Pose {
    /// Construct a new pose. The heading is normalized.
    pub fn new(x: f64, y: f64, theta: f64) -> Self {
        Pose {
            x,
            y,
            theta: normalize_angle(theta),
        }
    }

    /// Euclidean distance from this pose to a world point.
    pub fn distance_to(&self, x: f64, y: f64) -> f64 {
        let dx = x - self.x;
        let dy = y - self.y;
        sqrt(dx * dx + dy * dy)
    }

    /// Absolute bearing (rad) from this pose to a world point.
    pub fn bearing_to(&self, x: f64, y: f64) -> f64 {
        atan2(y - self.y, x - self.x)
    }

    /// Point `distance` meters away along `self.theta + offset`.
    pub fn project(&self, offset: f64, distance: f64) -> (f64, f64) {
        let a = self.theta + offset;
        (self.x + cos(a) * distance, self.y + sin(a) * distance)
    }
}

impl fmt::Display for Pose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(x: {:.2}, y: {:.2}, θ: {:.2} rad)", self.x, self.y, self.theta)
    }
}

/// Left and right wheel ground velocities.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WheelSpeeds {
    /// Left wheel linear velocity (m/s).
    pub v_left: f64,
    /// Right wheel linear velocity (m/s).
    pub v_right: f64,
}

impl WheelSpeeds {
    /// Construct wheel speeds.
    pub const fn new(v_left: f64, v_right: f64) -> Self {
        WheelSpeeds { v_left, v_right }
    }
}

impl fmt::Display for WheelSpeeds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(vL: {:.2} m/s, vR: {:.2} m/s)", self.v_left, self.v_right)
    }
}

/// Linear and angular chassis velocities.
/// These represent the overall motion of the robot's chassis.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ChassisSpeeds {
    /// Linear speed of the chassis center (m/s).
    pub v: f64,
    /// Angular speed of the chassis (rad/s).
    pub omega: f64,
}

impl ChassisSpeeds {
    /// Construct chassis speeds.
    ///
    /// # Arguments
    ///
    /// * `v`: Linear speed of the chassis center (m/s).
    /// * `omega`: Angular speed of the chassis (rad/s).
    pub const fn new(v: f64, omega: f64) -> Self {
        ChassisSpeeds { v, omega }
    }
}

impl fmt::Display for ChassisSpeeds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(v: {:.2} m/s, ω: {:.2} rad/s)", self.v, self.omega)
    }
}

/// Differential‑drive kinematics helper.
///
/// This struct encapsulates the wheel base of a differential-drive scout and
/// provides the forward/inverse kinematics and the pose integrator.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DifferentialDrive {
    /// Distance between the two drive wheels (m).
    wheel_base: f64,
}

impl DifferentialDrive {
    /// Construct a new differential‑drive kinematics helper.
    ///
    /// # Arguments
    ///
    /// * `wheel_base`: The distance between the centers of the two drive wheels in meters.
    ///
    /// # Errors
    ///
    /// Returns `Err(KinematicsError::InvalidWheelBase)` if `wheel_base` is not positive.
    pub const fn new(wheel_base: f64) -> Result<Self, KinematicsError> {
        if wheel_base <= 0.0 {
            return Err(KinematicsError::InvalidWheelBase("must be positive"));
        }
        Ok(DifferentialDrive { wheel_base })
    }

    /// Returns the wheel base.
    pub fn wheel_base(&self) -> f64 {
        self.wheel_base
    }

    /// Calculates the chassis speeds from the wheel speeds (forward kinematics).
    pub fn forward_kinematics(&self, wheel_speeds: WheelSpeeds) -> ChassisSpeeds {
        let v = (wheel_speeds.v_left + wheel_speeds.v_right) / 2.0;
        let omega = (wheel_speeds.v_right - wheel_speeds.v_left) / self.wheel_base;
        ChassisSpeeds::new(v, omega)
    }

    /// Calculates the wheel speeds needed for the given chassis speeds
    /// (inverse kinematics). Controllers use this to turn a forward speed and a
    /// turn rate into a wheel command.
    pub fn inverse_kinematics(&self, chassis_speeds: ChassisSpeeds) -> WheelSpeeds {
        let half = 0.5 * self.wheel_base * chassis_speeds.omega;
        WheelSpeeds::new(chassis_speeds.v - half, chassis_speeds.v + half)
    }

    /// Updates the pose given chassis speeds and a time delta.
    ///
    /// Integrates with a forward Euler step using the heading at the start of
    /// the interval. The final heading is normalized to `[-PI, PI)`.
    ///
    /// # Errors
    ///
    /// Returns `Err(KinematicsError::NegativeTimeDelta)` if `dt` is negative.
    pub fn update_pose(
        &self,
        current_pose: Pose,
        chassis_speeds: ChassisSpeeds,
        dt: f64,
    ) -> Result<Pose, KinematicsError> {
        if dt < 0.0 {
            return Err(KinematicsError::NegativeTimeDelta("must be non-negative"));
        }

        let delta_x = chassis_speeds.v * cos(current_pose.theta) * dt;
        let delta_y = chassis_speeds.v * sin(current_pose.theta) * dt;
        let delta_theta = chassis_speeds.omega * dt;

        Ok(Pose {
            x: current_pose.x + delta_x,
            y: current_pose.y + delta_y,
            theta: normalize_angle(current_pose.theta + delta_theta),
        })
    }

    /// Convenience function to update pose directly from wheel speeds and dt.
    ///
    /// # Errors
    ///
    /// Returns `Err(KinematicsError::NegativeTimeDelta)` if `dt` is negative.
    pub fn update_pose_from_wheel_speeds(
        &self,
        current_pose: Pose,
        wheel_speeds: WheelSpeeds,
        dt: f64,
    ) -> Result<Pose, KinematicsError> {
        let chassis_speeds = self.forward_kinematics(wheel_speeds);
        self.update_pose(current_pose, chassis_speeds, dt)
    }
}

impl fmt::Display for DifferentialDrive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DifferentialDrive (b: {:.2} m)", self.wheel_base)
    }
}
