//! Layered decision policy for a robot with a forward ranger and a 360° sweep.
//!
//! Layers are evaluated in priority order:
//! 1. sweep turn after repeated stuck samples,
//! 2. obstacle avoidance,
//! 3. left-wall keeping,
//! 4. straight driving, optionally overridden by an occupancy-grid hint.
//!
//! Turn angles are in degrees, positive to the right.

use tracing::debug;

use super::MotorCommand;
use crate::map::DirectionHint;

/// Number of 30° sectors in a sweep.
pub const SWEEP_SECTORS: usize = 12;
const SECTOR_DEG: f64 = 30.0;
/// Sectors count clockwise from forward, like servo angles and turns.
const RIGHT_SECTOR: usize = 3;
const REAR_SECTOR: usize = 6;
const LEFT_SECTOR: usize = 9;

/// One snapshot of ranging and ambient data.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SensorReading {
    /// Range straight ahead (cm).
    pub forward_cm: f64,
    /// Ranges per 30° sector, index 0 forward, clockwise (3 right, 9 left).
    pub sweep_cm: [f64; SWEEP_SECTORS],
    /// Air temperature (°C).
    pub temperature_c: f64,
    /// Relative humidity (%).
    pub humidity_pct: f64,
    /// Milliseconds since the robot started.
    pub timestamp_ms: u64,
}

impl SensorReading {
    /// Range 90° to the left.
    pub fn left_cm(&self) -> f64 {
        self.sweep_cm[LEFT_SECTOR]
    }

    /// Range directly behind.
    pub fn rear_cm(&self) -> f64 {
        self.sweep_cm[REAR_SECTOR]
    }

    /// Range 90° to the right.
    pub fn right_cm(&self) -> f64 {
        self.sweep_cm[RIGHT_SECTOR]
    }
}

/// Action label reported with every decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum Action {
    #[default]
    Idle,
    Forward,
    Stop,
    SweepTurn,
    AvoidTurnLeft,
    AvoidTurnRight,
    WallCorrectLeft,
    WallCorrectRight,
    OccupancyTurnLeft,
    OccupancyTurnRight,
    /// Simulated agent following its patrol law.
    Patrol,
    /// Simulated agent inside its avoidance commitment window.
    Avoid,
}

impl Action {
    /// Upper-case label as shown to operators.
    pub fn label(&self) -> &'static str {
        match self {
            Action::Idle => "IDLE",
            Action::Forward => "FORWARD",
            Action::Stop => "STOP",
            Action::SweepTurn => "SWEEP_TURN",
            Action::AvoidTurnLeft => "AVOID_TURN_LEFT",
            Action::AvoidTurnRight => "AVOID_TURN_RIGHT",
            Action::WallCorrectLeft => "WALL_CORRECT_LEFT",
            Action::WallCorrectRight => "WALL_CORRECT_RIGHT",
            Action::OccupancyTurnLeft => "OCCUPANCY_TURN_LEFT",
            Action::OccupancyTurnRight => "OCCUPANCY_TURN_RIGHT",
            Action::Patrol => "PATROL",
            Action::Avoid => "AVOID",
        }
    }

    /// True for actions that name the left side.
    pub fn is_left(&self) -> bool {
        matches!(self, Action::AvoidTurnLeft | Action::WallCorrectLeft | Action::OccupancyTurnLeft)
    }

    /// True for actions that name the right side.
    pub fn is_right(&self) -> bool {
        matches!(self, Action::AvoidTurnRight | Action::WallCorrectRight | Action::OccupancyTurnRight)
    }
}

impl core::fmt::Display for Action {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

/// Output of [`LayeredPlanner::decide`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Decision {
    pub action: Action,
    /// Normalized speed in `[0, 1]`.
    pub speed: f64,
    /// Relative turn (degrees, positive = right).
    pub turn_deg: f64,
}

impl Decision {
    /// Firmware command for this decision.
    pub fn motor_command(&self) -> MotorCommand {
        MotorCommand::from_decision(self.action, self.turn_deg)
    }
}

/// Thresholds for [`LayeredPlanner`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PlannerParams {
    pub stuck_cm: f64,
    pub obstacle_cm: f64,
    pub wall_target_cm: f64,
    pub wall_tolerance_cm: f64,
    pub speed_normal: f64,
    pub speed_turning: f64,
    /// Consecutive stuck samples before a sweep turn.
    pub stuck_samples: u32,
    pub avoid_turn_deg: f64,
    pub wall_correct_deg: f64,
}

impl Default for PlannerParams {
    fn default() -> Self {
        Self {
            stuck_cm: 15.0,
            obstacle_cm: 25.0,
            wall_target_cm: 30.0,
            wall_tolerance_cm: 8.0,
            speed_normal: 1.0,
            speed_turning: 0.6,
            stuck_samples: 3,
            avoid_turn_deg: 45.0,
            wall_correct_deg: 15.0,
        }
    }
}

/// Stateful layered planner.
#[derive(Debug, Clone, Default)]
pub struct LayeredPlanner {
    params: PlannerParams,
    consecutive_stuck: u32,
    last_action: Action,
}

impl LayeredPlanner {
    pub fn new(params: PlannerParams) -> Self {
        Self { params, consecutive_stuck: 0, last_action: Action::Idle }
    }

    pub fn params(&self) -> &PlannerParams {
        &self.params
    }

    /// Stuck samples seen in a row so far.
    pub fn consecutive_stuck(&self) -> u32 {
        self.consecutive_stuck
    }

    pub fn last_action(&self) -> Action {
        self.last_action
    }

    /// Picks the next action for `reading`.
    ///
    /// `hint` is the occupancy grid's suggestion; it only replaces a plain
    /// `FORWARD` decision.
    pub fn decide(&mut self, reading: &SensorReading, hint: Option<DirectionHint>) -> Decision {
        let decision = self.layers(reading);
        let decision = match (decision.action, hint) {
            (Action::Forward, Some(hint)) => self.apply_hint(decision, hint),
            _ => decision,
        };
        debug!(
            action = %decision.action,
            turn_deg = decision.turn_deg,
            forward_cm = reading.forward_cm,
            "planner decision"
        );
        self.last_action = decision.action;
        decision
    }

    fn layers(&mut self, reading: &SensorReading) -> Decision {
        let p = self.params;

        if reading.forward_cm < p.stuck_cm {
            self.consecutive_stuck += 1;
            if self.consecutive_stuck >= p.stuck_samples {
                self.consecutive_stuck = 0;
                return Decision {
                    action: Action::SweepTurn,
                    speed: p.speed_turning,
                    turn_deg: sweep_best_direction(&reading.sweep_cm),
                };
            }
        } else {
            self.consecutive_stuck = 0;
        }

        if reading.forward_cm < p.obstacle_cm {
            return if reading.left_cm() > reading.right_cm() {
                Decision { action: Action::AvoidTurnLeft, speed: p.speed_turning, turn_deg: -p.avoid_turn_deg }
            } else {
                Decision { action: Action::AvoidTurnRight, speed: p.speed_turning, turn_deg: p.avoid_turn_deg }
            };
        }

        // Positive error: drifted away from the left wall.
        let error = reading.left_cm() - p.wall_target_cm;
        if error.abs() > p.wall_tolerance_cm {
            return if error > 0.0 {
                Decision { action: Action::WallCorrectLeft, speed: p.speed_normal, turn_deg: -p.wall_correct_deg }
            } else {
                Decision { action: Action::WallCorrectRight, speed: p.speed_normal, turn_deg: p.wall_correct_deg }
            };
        }

        Decision { action: Action::Forward, speed: p.speed_normal, turn_deg: 0.0 }
    }

    fn apply_hint(&self, forward: Decision, hint: DirectionHint) -> Decision {
        match hint.command {
            MotorCommand::Stop => Decision { action: Action::Stop, speed: 0.0, turn_deg: 0.0 },
            MotorCommand::Left => Decision {
                action: Action::OccupancyTurnLeft,
                speed: self.params.speed_turning,
                turn_deg: hint.turn_deg,
            },
            MotorCommand::Right => Decision {
                action: Action::OccupancyTurnRight,
                speed: self.params.speed_turning,
                turn_deg: hint.turn_deg,
            },
            MotorCommand::Forward | MotorCommand::Back => forward,
        }
    }
}

/// Relative turn (degrees) toward the most open sweep sector, in `(-180, 180]`.
///
/// Sector `i` sits at `i * 30°` clockwise, so the turn is positive (right)
/// for sectors 1 to 6.
///
/// Ties go to the lowest sector index.
pub fn sweep_best_direction(sweep_cm: &[f64; SWEEP_SECTORS]) -> f64 {
    let mut best = 0;
    for (i, d) in sweep_cm.iter().enumerate() {
        if *d > sweep_cm[best] {
            best = i;
        }
    }
    let angle = best as f64 * SECTOR_DEG;
    if angle > 180.0 { angle - 360.0 } else { angle }
}
