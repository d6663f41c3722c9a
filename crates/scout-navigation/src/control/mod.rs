//! Motion controllers and decision policies.
//!
//! - [`WaypointController`]: cyclic patrol law used by simulated agents.
//! - [`WallFollower`]: PID wall-following law on a side range.
//! - [`LayeredPlanner`]: stuck/avoid/wall/forward decision policy used on the
//!   hardware path.
//! - [`Avoidance`]: commitment hysteresis wrapped around the ternary grid queries.

pub mod avoidance;
pub mod layered;
pub mod wall_follow;
pub mod waypoint;

pub use avoidance::{Avoidance, AvoidanceParams, AvoidanceStep, NavMode};
pub use layered::{
    Action, Decision, LayeredPlanner, PlannerParams, SWEEP_SECTORS, SensorReading,
    sweep_best_direction,
};
pub use wall_follow::{WallFollowParams, WallFollower, WallSide};
pub use waypoint::{WaypointController, WaypointParams};

/// Single-letter command understood by the robot firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MotorCommand {
    /// `F`
    Forward,
    /// `B`
    Back,
    /// `L`
    Left,
    /// `R`
    Right,
    /// `S`
    Stop,
}

impl MotorCommand {
    /// ASCII letter sent on the wire.
    pub fn as_char(&self) -> char {
        match self {
            MotorCommand::Forward => 'F',
            MotorCommand::Back => 'B',
            MotorCommand::Left => 'L',
            MotorCommand::Right => 'R',
            MotorCommand::Stop => 'S',
        }
    }

    /// Parses a wire letter.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'F' => Some(MotorCommand::Forward),
            'B' => Some(MotorCommand::Back),
            'L' => Some(MotorCommand::Left),
            'R' => Some(MotorCommand::Right),
            'S' => Some(MotorCommand::Stop),
            _ => None,
        }
    }

    /// Maps a planner decision to the command the firmware should run.
    ///
    /// Stop/idle first, then straight driving, then the labelled side, then
    /// the sign of the turn (negative = left).
    pub fn from_decision(action: Action, turn_deg: f64) -> Self {
        match action {
            Action::Stop | Action::Idle => MotorCommand::Stop,
            Action::Forward => MotorCommand::Forward,
            a if a.is_left() => MotorCommand::Left,
            a if a.is_right() => MotorCommand::Right,
            _ if turn_deg < 0.0 => MotorCommand::Left,
            _ if turn_deg > 0.0 => MotorCommand::Right,
            _ => MotorCommand::Forward,
        }
    }
}

impl core::fmt::Display for MotorCommand {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_motor_command_mapping() {
        assert_eq!(MotorCommand::from_decision(Action::Stop, 30.0), MotorCommand::Stop);
        assert_eq!(MotorCommand::from_decision(Action::Idle, 0.0), MotorCommand::Stop);
        assert_eq!(MotorCommand::from_decision(Action::Forward, 0.0), MotorCommand::Forward);
        assert_eq!(MotorCommand::from_decision(Action::AvoidTurnLeft, -45.0), MotorCommand::Left);
        assert_eq!(MotorCommand::from_decision(Action::WallCorrectRight, 15.0), MotorCommand::Right);
        assert_eq!(MotorCommand::from_decision(Action::OccupancyTurnLeft, -90.0), MotorCommand::Left);
        assert_eq!(MotorCommand::from_decision(Action::SweepTurn, -120.0), MotorCommand::Left);
        assert_eq!(MotorCommand::from_decision(Action::SweepTurn, 60.0), MotorCommand::Right);
        assert_eq!(MotorCommand::from_decision(Action::SweepTurn, 0.0), MotorCommand::Forward);
    }

    #[test]
    fn test_char_round_trip() {
        for cmd in [
            MotorCommand::Forward,
            MotorCommand::Back,
            MotorCommand::Left,
            MotorCommand::Right,
            MotorCommand::Stop,
        ] {
            assert_eq!(MotorCommand::from_char(cmd.as_char()), Some(cmd));
        }
        assert_eq!(MotorCommand::from_char('x'), None);
    }
}
