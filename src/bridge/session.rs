//! Hardware session: turns ranging frames into pose, map and motor decisions.

use std::collections::VecDeque;

use anyhow::Context;
use serde::Serialize;
use tracing::debug;

use scout_kinematics::normalize_degrees;
use scout_navigation::control::layered::SWEEP_SECTORS;
use scout_navigation::{
    Action, HeadingEstimator, LayeredPlanner, LogOddsGrid, MapBounds, MotorCommand,
    OccupancyMap, PlannerParams, SensorReading, WorldPoint,
};

use crate::bridge::frame::RangingFrame;
use crate::config::{GridSettings, HardwareSettings};

/// Servo span of one sweep sector (degrees).
const SECTOR_DEG: f64 = 360.0 / SWEEP_SECTORS as f64;
/// Sector value before any sample landed in it (cm).
const EMPTY_SECTOR_CM: f64 = 150.0;
/// Weight of the new sweep against the previous one.
const SWEEP_BLEND: f64 = 0.5;
const MAX_RANGE_CM: f64 = 400.0;
const MIN_RANGE_CM: f64 = 1.0;
/// dt used for the first frame or a non-increasing timestamp (s).
const DEFAULT_DT: f64 = 0.5;
const MIN_DT: f64 = 0.01;
const MAX_DT: f64 = 2.0;
const DEFAULT_AIR_TEMP_C: f64 = 20.0;
const DEFAULT_HUMIDITY_PCT: f64 = 50.0;

/// Dead-reckoned scout pose; heading in degrees, 0 = +y, clockwise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ScoutPose {
    pub x: f64,
    pub y: f64,
    pub heading_deg: f64,
}

/// Everything the transport layer needs after one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoutUpdate {
    pub timestamp_ms: u64,
    pub pose: ScoutPose,
    pub action: Action,
    pub speed: f64,
    pub turn_deg: f64,
    pub motor: MotorCommand,
    pub sweep_cm: [f64; SWEEP_SECTORS],
    /// Most recent measured points as `[x, height, y]`.
    pub points: Vec<[f64; 3]>,
    pub air_temp_c: Option<f64>,
    pub humidity_pct: Option<f64>,
    pub surface_temp_c: Option<f64>,
    pub gyro_z: Option<f64>,
    pub dt: f64,
    pub bounds: MapBounds,
    pub occupancy: Vec<Vec<f64>>,
}

pub struct HardwareSession {
    pose: ScoutPose,
    heading: HeadingEstimator,
    planner: LayeredPlanner,
    grid: LogOddsGrid,
    look_ahead: usize,
    sweep: [f64; SWEEP_SECTORS],
    points: VecDeque<[f64; 3]>,
    point_ring: usize,
    display_points: usize,
    last_timestamp: Option<u64>,
    air_temp_c: Option<f64>,
    humidity_pct: Option<f64>,
    surface_temp_c: Option<f64>,
    stationary: bool,
    step_size: f64,
}

impl HardwareSession {
    pub fn new(hardware: &HardwareSettings, grid: &GridSettings, planner: PlannerParams) -> anyhow::Result<Self> {
        let log_odds = LogOddsGrid::new(grid.log_odds).context("hardware session grid")?;
        Ok(Self {
            pose: ScoutPose::default(),
            heading: HeadingEstimator::new(hardware.heading),
            planner: LayeredPlanner::new(planner),
            grid: log_odds,
            look_ahead: grid.look_ahead_cells,
            sweep: [EMPTY_SECTOR_CM; SWEEP_SECTORS],
            points: VecDeque::with_capacity(hardware.point_ring),
            point_ring: hardware.point_ring.max(1),
            display_points: hardware.display_points,
            last_timestamp: None,
            air_temp_c: None,
            humidity_pct: None,
            surface_temp_c: None,
            stationary: hardware.cart_stationary,
            step_size: hardware.step_size_m,
        })
    }

    pub fn pose(&self) -> ScoutPose {
        self.pose
    }

    pub fn grid(&self) -> &LogOddsGrid {
        &self.grid
    }

    pub fn sweep(&self) -> &[f64; SWEEP_SECTORS] {
        &self.sweep
    }

    /// Points held in the measurement ring.
    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    /// Consumes one frame: heading, sweep, map, decision, then motion.
    pub fn process(&mut self, frame: &RangingFrame) -> ScoutUpdate {
        let dt = self.frame_dt(frame.timestamp_ms);

        let gyro_z = frame.gyro_z();
        if let Some(rate) = gyro_z {
            if !self.stationary {
                self.pose.heading_deg = self.heading.update(rate, Some(dt));
            }
        }

        self.bin_sweep(frame);
        self.integrate_points(frame);

        if frame.air_temp_c.is_some() {
            self.air_temp_c = frame.air_temp_c;
        }
        if frame.humidity_pct.is_some() {
            self.humidity_pct = frame.humidity_pct;
        }
        if frame.surface_temp_c.is_some() {
            self.surface_temp_c = frame.surface_temp_c;
        }

        let reading = SensorReading {
            forward_cm: self.sweep[0],
            sweep_cm: self.sweep,
            temperature_c: self.air_temp_c.unwrap_or(DEFAULT_AIR_TEMP_C),
            humidity_pct: self.humidity_pct.unwrap_or(DEFAULT_HUMIDITY_PCT),
            timestamp_ms: frame.timestamp_ms,
        };
        let hint = self.grid.best_direction(self.pose.x, self.pose.y, self.pose.heading_deg, self.look_ahead);
        let decision = self.planner.decide(&reading, Some(hint));

        if !self.stationary {
            self.pose.heading_deg = normalize_degrees(self.pose.heading_deg + decision.turn_deg);
            let step = self.step_size * decision.speed;
            let (s, c) = self.pose.heading_deg.to_radians().sin_cos();
            self.pose.x += step * s;
            self.pose.y += step * c;
        }
        debug!(x = self.pose.x, y = self.pose.y, heading = self.pose.heading_deg, action = %decision.action, "session step");

        let skip = self.points.len().saturating_sub(self.display_points);
        ScoutUpdate {
            timestamp_ms: frame.timestamp_ms,
            pose: self.pose,
            action: decision.action,
            speed: decision.speed,
            turn_deg: decision.turn_deg,
            motor: decision.motor_command(),
            sweep_cm: self.sweep,
            points: self.points.iter().skip(skip).copied().collect(),
            air_temp_c: self.air_temp_c,
            humidity_pct: self.humidity_pct,
            surface_temp_c: self.surface_temp_c,
            gyro_z,
            dt,
            bounds: self.grid.bounds(),
            occupancy: self.grid.probability_grid(),
        }
    }

    fn frame_dt(&mut self, timestamp: u64) -> f64 {
        let dt = match self.last_timestamp {
            Some(last) if timestamp > last => ((timestamp - last) as f64 / 1000.0).clamp(MIN_DT, MAX_DT),
            _ => DEFAULT_DT,
        };
        self.last_timestamp = Some(timestamp);
        dt
    }

    /// Bins samples by servo angle; sector `i` covers `i * 30°` clockwise from
    /// forward, so sector 3 is the right side and sector 9 the left.
    fn bin_sweep(&mut self, frame: &RangingFrame) {
        if frame.readings.is_empty() {
            return;
        }
        let mut bins: [Vec<f64>; SWEEP_SECTORS] = Default::default();
        for sample in &frame.readings {
            let d = sanitize_range(sample.distance);
            let idx = (normalize_degrees(sample.angle) / SECTOR_DEG).round() as usize % SWEEP_SECTORS;
            bins[idx].push(d);
        }
        for (slot, bin) in self.sweep.iter_mut().zip(bins.iter()) {
            let fresh = if bin.is_empty() {
                EMPTY_SECTOR_CM
            } else {
                bin.iter().sum::<f64>() / bin.len() as f64
            };
            *slot = SWEEP_BLEND * fresh + (1.0 - SWEEP_BLEND) * *slot;
        }
    }

    /// Updates the occupancy grid and point ring from every sample.
    fn integrate_points(&mut self, frame: &RangingFrame) {
        let origin = WorldPoint::new(self.pose.x, self.pose.y);
        for sample in &frame.readings {
            let measured = sample.distance.is_finite() && sample.distance > 0.0 && sample.distance < MAX_RANGE_CM;
            let d = sanitize_range(sample.distance).max(MIN_RANGE_CM);
            let hit = self.project(sample.angle, d);
            self.grid.update_ray(origin, hit);

            if measured {
                if self.points.len() == self.point_ring {
                    self.points.pop_front();
                }
                self.points.push_back([hit.x, 0.0, hit.y]);
            }
        }
    }

    /// World point `distance_cm` away along servo `angle_deg` relative to the heading.
    fn project(&self, angle_deg: f64, distance_cm: f64) -> WorldPoint {
        let d = distance_cm / 100.0;
        let (s, c) = (self.pose.heading_deg + angle_deg).to_radians().sin_cos();
        WorldPoint::new(self.pose.x + d * s, self.pose.y + d * c)
    }
}

/// Valid ranges pass through; zero, negative, non-finite or too-far readings
/// become the maximum range.
fn sanitize_range(distance_cm: f64) -> f64 {
    if distance_cm.is_finite() && distance_cm > 0.0 && distance_cm <= MAX_RANGE_CM {
        distance_cm
    } else {
        MAX_RANGE_CM
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::frame::Sample;
    use scout_navigation::GridCell;

    const EPSILON: f64 = 1e-9;

    fn session(stationary: bool) -> HardwareSession {
        let hardware = HardwareSettings { cart_stationary: stationary, ..Default::default() };
        HardwareSession::new(&hardware, &GridSettings::default(), PlannerParams::default()).unwrap()
    }

    fn sample(angle: f64, distance: f64) -> Sample {
        Sample { angle, distance, gyro_z: None }
    }

    fn frame(timestamp: u64, readings: Vec<Sample>) -> RangingFrame {
        RangingFrame { readings, timestamp_ms: timestamp, air_temp_c: None, humidity_pct: None, surface_temp_c: None }
    }

    /// Full sweep with `forward` ahead and 30 cm everywhere else.
    fn sweep_frame(timestamp: u64, forward: f64) -> RangingFrame {
        let mut readings = vec![sample(0.0, forward)];
        readings.extend((1..12).map(|i| sample(i as f64 * 30.0, 30.0)));
        frame(timestamp, readings)
    }

    #[test]
    fn test_dt_from_timestamps() {
        let mut s = session(true);
        assert!((s.process(&frame(1000, vec![])).dt - 0.5).abs() < EPSILON);
        assert!((s.process(&frame(1250, vec![])).dt - 0.25).abs() < EPSILON);
        assert!((s.process(&frame(1251, vec![])).dt - 0.01).abs() < EPSILON);
        assert!((s.process(&frame(9000, vec![])).dt - 2.0).abs() < EPSILON);
        // Clock went backwards.
        assert!((s.process(&frame(10, vec![])).dt - 0.5).abs() < EPSILON);
    }

    #[test]
    fn test_sweep_binning_and_blend() {
        let mut s = session(true);
        let f = frame(0, vec![sample(0.0, 100.0), sample(-10.0, 120.0), sample(95.0, 0.0), sample(44.0, 80.0)]);
        s.process(&f);
        let sweep = *s.sweep();
        // Sector 0: mean(100, 120) = 110, blended with 150.
        assert!((sweep[0] - 130.0).abs() < EPSILON);
        // Zero distance counts as max range.
        assert!((sweep[3] - 275.0).abs() < EPSILON);
        assert!((sweep[1] - 115.0).abs() < EPSILON);
        assert!((sweep[6] - 150.0).abs() < EPSILON);

        s.process(&f);
        assert!((s.sweep()[0] - 120.0).abs() < EPSILON);
    }

    #[test]
    fn test_points_only_for_measured_ranges() {
        let mut s = session(true);
        let update = s.process(&frame(0, vec![sample(0.0, 100.0), sample(90.0, 400.0), sample(180.0, -3.0)]));
        assert_eq!(s.point_count(), 1);
        let [x, h, y] = update.points[0];
        assert!(x.abs() < EPSILON && h == 0.0 && (y - 1.0).abs() < EPSILON);
        // Every ray still updates the grid.
        let hit = s.grid().world_to_cell(0.0, 1.0);
        assert!(s.grid().is_cell_occupied(hit));
        let behind = s.grid().world_to_cell(0.0, -2.0);
        assert!(s.grid().log_odds(behind).unwrap() < 0.0);
        assert!(s.grid().log_odds(GridCell::new(hit.row - 5, hit.col)).unwrap() < 0.0);
        // Three rays start at the origin cell.
        let origin = s.grid().world_to_cell(0.0, 0.0);
        assert!(s.grid().is_cell_free(origin));
    }

    #[test]
    fn test_display_window_and_ring() {
        let hardware = HardwareSettings { cart_stationary: true, point_ring: 5, display_points: 3, ..Default::default() };
        let mut s = HardwareSession::new(&hardware, &GridSettings::default(), PlannerParams::default()).unwrap();
        let readings = (0..4).map(|i| sample(i as f64 * 30.0, 50.0 + i as f64)).collect();
        s.process(&frame(0, readings));
        let readings = (0..4).map(|i| sample(i as f64 * 30.0, 60.0 + i as f64)).collect();
        let update = s.process(&frame(100, readings));
        assert_eq!(s.point_count(), 5);
        assert_eq!(update.points.len(), 3);
    }

    #[test]
    fn test_stationary_cart_keeps_pose() {
        let mut s = session(true);
        let mut f = sweep_frame(0, 200.0);
        f.readings[0].gyro_z = Some(30.0);
        let update = s.process(&f);
        assert_eq!(update.pose, ScoutPose::default());
        assert_eq!(update.gyro_z, Some(30.0));
    }

    #[test]
    fn test_moving_cart_integrates_gyro_and_steps() {
        let mut s = session(false);
        let mut f = sweep_frame(0, 200.0);
        f.readings[0].gyro_z = Some(10.0);
        f.air_temp_c = Some(23.0);
        let update = s.process(&f);
        // First frame: dt 0.5 s -> 5 degrees; the left sector reads 30 cm
        // but blends to 90, so the wall correction turns -15 degrees.
        assert_eq!(update.action, Action::WallCorrectLeft);
        assert_eq!(update.motor, MotorCommand::Left);
        assert!((update.pose.heading_deg - 350.0).abs() < EPSILON);
        let step = 0.05 * update.speed;
        assert!((update.pose.x - step * 350f64.to_radians().sin()).abs() < EPSILON);
        assert!((update.pose.y - step * 350f64.to_radians().cos()).abs() < EPSILON);
        assert_eq!(update.air_temp_c, Some(23.0));

        // Ambient values persist across frames that omit them.
        let update = s.process(&sweep_frame(500, 200.0));
        assert_eq!(update.air_temp_c, Some(23.0));
    }

    #[test]
    fn test_close_obstacle_turns() {
        let mut s = session(true);
        // Forward blends toward 10 cm; sides stay equal so the turn goes right.
        for t in 0..4 {
            s.process(&sweep_frame(t * 100, 10.0));
        }
        let update = s.process(&sweep_frame(400, 10.0));
        assert!(update.sweep_cm[0] < 25.0);
        assert_ne!(update.action, Action::Forward);
        assert_ne!(update.motor, MotorCommand::Forward);
    }

    #[test]
    fn test_avoid_turns_toward_open_side() {
        // Servo 90° is clockwise, so it projects onto the robot's right.
        let s = session(true);
        let p = s.project(90.0, 100.0);
        assert!((p.x - 1.0).abs() < EPSILON && p.y.abs() < EPSILON);

        let mut s = session(true);
        let open_right = |t: u64| {
            let mut f = sweep_frame(t, 10.0);
            f.readings[3].distance = 300.0;
            f
        };
        let mut update = s.process(&open_right(0));
        for t in 1..4 {
            update = s.process(&open_right(t * 100));
        }
        // Forward blends to 18.75 cm: past the obstacle threshold, not stuck.
        assert!((update.sweep_cm[0] - 18.75).abs() < EPSILON);
        assert!(update.sweep_cm[3] > update.sweep_cm[9]);
        assert_eq!(update.action, Action::AvoidTurnRight);
        assert!(update.turn_deg > 0.0);
        assert_eq!(update.motor, MotorCommand::Right);
        assert_eq!(update.motor.as_char(), 'R');

        // Mirror image: the open side is counter-clockwise.
        let mut s = session(true);
        let open_left = |t: u64| {
            let mut f = sweep_frame(t, 10.0);
            f.readings[9].distance = 300.0;
            f
        };
        let mut update = s.process(&open_left(0));
        for t in 1..4 {
            update = s.process(&open_left(t * 100));
        }
        assert_eq!(update.action, Action::AvoidTurnLeft);
        assert!(update.turn_deg < 0.0);
        assert_eq!(update.motor.as_char(), 'L');
    }
}
