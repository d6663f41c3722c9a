//! This module defines the error types used by the `scout-navigation` crate.

#![warn(missing_docs)]

/// Error type for navigation operations.
///
/// This enum encapsulates all possible errors that can occur while building
/// maps and controllers, such as invalid grid parameters or an empty patrol.
#[derive(Debug, PartialEq)]
pub enum NavigationError {
    /// Error for invalid map resolution.
    /// This variant is returned when a map resolution or cell size is not positive.
    InvalidResolution(&'static str),
    /// Error for invalid map dimensions.
    /// This variant is returned when map width or height is zero or rows are ragged.
    InvalidDimensions(&'static str),
    /// Error for a probability outside the open interval `(0, 1)`.
    InvalidProbability(&'static str),
    /// Error for a patrol route without any waypoint.
    EmptyWaypoints(&'static str),
    /// Error for invalid kinematic parameters (wheel base).
    InvalidKinematics(&'static str),
}

impl core::fmt::Display for NavigationError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            NavigationError::InvalidResolution(msg) => write!(f, "Invalid map resolution: {}", msg),
            NavigationError::InvalidDimensions(msg) => write!(f, "Invalid map dimensions: {}", msg),
            NavigationError::InvalidProbability(msg) => write!(f, "Invalid probability: {}", msg),
            NavigationError::EmptyWaypoints(msg) => write!(f, "Invalid waypoint list: {}", msg),
            NavigationError::InvalidKinematics(msg) => {
                write!(f, "Invalid kinematic parameters: {}", msg)
            }
        }
    }
}

impl core::error::Error for NavigationError {}

impl From<scout_kinematics::KinematicsError> for NavigationError {
    fn from(err: scout_kinematics::KinematicsError) -> Self {
        match err {
            scout_kinematics::KinematicsError::InvalidWheelBase(msg)
            | scout_kinematics::KinematicsError::NegativeTimeDelta(msg) => {
                NavigationError::InvalidKinematics(msg)
            }
        }
    }
}
