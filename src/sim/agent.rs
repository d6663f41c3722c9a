//! One simulated scout: pose, private exploration grid and motion laws.

use std::collections::VecDeque;

use anyhow::Context;
use serde::Serialize;
use tracing::debug;

use scout_kinematics::{DifferentialDrive, Pose, WheelSpeeds};
use scout_navigation::{
    Action, Avoidance, AvoidanceParams, ExplorationGrid, MapBounds, NavMode, OccupancyMap,
    WallFollowParams, WallFollower, WallSide, WaypointController, WaypointParams, World,
    WorldPoint,
};

use crate::config::{AgentSettings, DriveLaw, Settings};
use crate::sim::ambient::AmbientModel;
use crate::sim::heatmap::HeatAggregate;
use crate::sim::obstacles::MovingObstacle;
use crate::sim::sensor::RangeSensor;

/// Motion law used while not avoiding.
#[derive(Debug, Clone)]
enum Law {
    Patrol(WaypointController),
    WallFollow { follower: WallFollower, side: WallSide },
}

/// Per-tick telemetry for one agent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentSnapshot {
    pub id: usize,
    pub name: String,
    pub pose: Pose,
    pub wheels: WheelSpeeds,
    pub action: Action,
    pub mode: NavMode,
    pub range_cm: f64,
    pub temperature_c: f64,
    pub humidity_pct: f64,
    pub room_id: Option<String>,
    pub distance_travelled_m: f64,
    /// Patrol cursor; `None` for wall-following agents.
    pub waypoint: Option<usize>,
}

/// Map layers of one agent, published less often than telemetry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentMap {
    pub id: usize,
    pub bounds: MapBounds,
    pub explored: Vec<(i32, i32, f64)>,
    pub obstacle_points: Vec<WorldPoint>,
    pub trail: Vec<WorldPoint>,
    pub point_cloud: Vec<[f64; 3]>,
}

#[derive(Debug, Clone)]
pub struct Agent {
    id: usize,
    name: String,
    pose: Pose,
    wheels: WheelSpeeds,
    action: Action,
    mode: NavMode,
    law: Law,
    avoidance: Avoidance,
    drive: DifferentialDrive,
    grid: ExplorationGrid,
    trail: VecDeque<WorldPoint>,
    trail_capacity: usize,
    distance_travelled: f64,
    range_cm: f64,
    temperature_c: f64,
    humidity_pct: f64,
    room_id: Option<String>,
    terrain_nudge: f64,
    fallback_temp_c: f64,
    fallback_humidity_pct: f64,
}

/// Shared simulation inputs for one tick.
pub struct TickContext<'a> {
    pub world: &'a World,
    pub obstacles: &'a [MovingObstacle],
    pub sensor: &'a mut RangeSensor,
    pub ambient: &'a mut AmbientModel,
    pub heat: &'a mut HeatAggregate,
    pub dt: f64,
    pub now: f64,
}

impl Agent {
    pub fn new(id: usize, agent: &AgentSettings, settings: &Settings, world: &World) -> anyhow::Result<Self> {
        let wheel_base = settings.robot.wheel_base;
        let law = match agent.law {
            DriveLaw::Patrol => {
                let params = settings.waypoints.law;
                let controller = WaypointController::new(
                    settings.waypoints.points(),
                    WaypointParams { wheel_base, ..params },
                )
                .with_context(|| format!("agent {}: waypoint controller", agent.name))?;
                Law::Patrol(controller)
            }
            DriveLaw::WallFollow => {
                let params = WallFollowParams {
                    wheel_base,
                    side: agent.wall_side,
                    ..settings.wall_follow
                };
                let follower = WallFollower::new(params)
                    .with_context(|| format!("agent {}: wall follower", agent.name))?;
                Law::WallFollow { follower, side: agent.wall_side }
            }
        };
        let avoidance = Avoidance::new(AvoidanceParams { wheel_base, ..settings.avoidance })
            .with_context(|| format!("agent {}: avoidance", agent.name))?;
        let drive = DifferentialDrive::new(wheel_base)
            .with_context(|| format!("agent {}: drive", agent.name))?;
        let grid = ExplorationGrid::new(world.rows(), world.cols(), world.cell_size(), settings.grid.subdiv)
            .with_context(|| format!("agent {}: exploration grid", agent.name))?;

        Ok(Self {
            id,
            name: agent.name.clone(),
            pose: Pose::new(agent.x, agent.y, agent.theta),
            wheels: WheelSpeeds::default(),
            action: Action::Idle,
            mode: NavMode::Patrolling,
            law,
            avoidance,
            drive,
            grid,
            trail: VecDeque::with_capacity(settings.simulation.trail_capacity),
            trail_capacity: settings.simulation.trail_capacity.max(1),
            distance_travelled: 0.0,
            range_cm: settings.sensor.max_range_cm,
            temperature_c: settings.robot.fallback_temp_c,
            humidity_pct: settings.robot.fallback_humidity_pct,
            room_id: None,
            terrain_nudge: settings.robot.terrain_nudge_m,
            fallback_temp_c: settings.robot.fallback_temp_c,
            fallback_humidity_pct: settings.robot.fallback_humidity_pct,
        })
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    pub fn mode(&self) -> NavMode {
        self.mode
    }

    pub fn grid(&self) -> &ExplorationGrid {
        &self.grid
    }

    pub fn trail(&self) -> impl Iterator<Item = &WorldPoint> {
        self.trail.iter()
    }

    pub fn distance_travelled(&self) -> f64 {
        self.distance_travelled
    }

    /// Advances the agent by one tick: sense, map, decide, move, sample.
    pub fn step(&mut self, ctx: &mut TickContext<'_>) -> anyhow::Result<()> {
        self.range_cm = ctx.sensor.ultrasonic(ctx.world, &self.pose, ctx.obstacles);
        self.grid.update_ray(&self.pose, self.range_cm / 100.0);

        self.wheels = match self.avoidance.evaluate(&self.grid, &self.pose, ctx.now) {
            Some(step) => {
                if step.force_advance {
                    self.give_up_target();
                }
                self.mode = NavMode::Avoiding;
                self.action = Action::Avoid;
                step.wheels
            }
            None => {
                self.mode = NavMode::Patrolling;
                self.action = Action::Patrol;
                self.follow_law(ctx)
            }
        };

        let previous = self.pose;
        self.pose = self
            .drive
            .update_pose_from_wheel_speeds(self.pose, self.wheels, ctx.dt)
            .with_context(|| format!("agent {}: pose update", self.name))?;
        self.distance_travelled += previous.distance_to(self.pose.x, self.pose.y);

        // Terrain check uses the pose before any correction.
        let (x, y) = (self.pose.x, self.pose.y);
        let on_floor = ctx.world.is_traversable(ctx.world.world_to_cell(x, y));
        if on_floor {
            let space = ctx.world.space_at(x, y);
            self.room_id = space.map(|s| s.id.clone());
            self.temperature_c = ctx.ambient.temperature(ctx.world, x, y, ctx.now);
            self.humidity_pct = ctx.ambient.humidity(space, self.temperature_c);
        } else {
            debug!(agent = %self.name, x, y, "left the floor, nudging back");
            self.pose.x -= self.terrain_nudge;
            self.room_id = None;
            self.temperature_c = self.fallback_temp_c;
            self.humidity_pct = self.fallback_humidity_pct;
        }

        if self.trail.len() == self.trail_capacity {
            self.trail.pop_front();
        }
        self.trail.push_back(WorldPoint::new(self.pose.x, self.pose.y));

        if on_floor {
            ctx.heat.record(ctx.world, x, y, self.temperature_c);
        }
        Ok(())
    }

    fn follow_law(&mut self, ctx: &mut TickContext<'_>) -> WheelSpeeds {
        match &mut self.law {
            Law::Patrol(controller) => controller.compute(&self.pose),
            Law::WallFollow { follower, side } => {
                let side_cm = ctx.sensor.side_range(ctx.world, &self.pose, ctx.obstacles, side.sign());
                follower.compute(side_cm, ctx.dt)
            }
        }
    }

    fn give_up_target(&mut self) {
        match &mut self.law {
            Law::Patrol(controller) => controller.advance(),
            Law::WallFollow { follower, .. } => follower.reset(),
        }
    }

    pub fn snapshot(&self) -> AgentSnapshot {
        AgentSnapshot {
            id: self.id,
            name: self.name.clone(),
            pose: self.pose,
            wheels: self.wheels,
            action: self.action,
            mode: self.mode,
            range_cm: self.range_cm,
            temperature_c: self.temperature_c,
            humidity_pct: self.humidity_pct,
            room_id: self.room_id.clone(),
            distance_travelled_m: self.distance_travelled,
            waypoint: match &self.law {
                Law::Patrol(controller) => Some(controller.cursor()),
                Law::WallFollow { .. } => None,
            },
        }
    }

    pub fn map(&self, point_cloud: Vec<[f64; 3]>) -> AgentMap {
        AgentMap {
            id: self.id,
            bounds: self.grid.bounds(),
            explored: self
                .grid
                .explored_cells()
                .into_iter()
                .map(|(cell, occ)| (cell.row, cell.col, occ))
                .collect(),
            obstacle_points: self.grid.obstacle_points(),
            trail: self.trail.iter().copied().collect(),
            point_cloud,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SensorSettings;
    use crate::sim::noise::Noise;

    fn context_parts(world: &World) -> (RangeSensor, AmbientModel, HeatAggregate) {
        (
            RangeSensor::new(SensorSettings::default(), Noise::new(Some(9))),
            AmbientModel::new(Noise::new(Some(10)), 0.15, 2.5),
            HeatAggregate::new(world, 4, 15),
        )
    }

    #[test]
    fn test_patrol_agent_moves_and_samples() {
        let world = World::default_floor();
        let settings = Settings::default();
        let mut agent = Agent::new(0, &settings.agents[0], &settings, &world).unwrap();
        let (mut sensor, mut ambient, mut heat) = context_parts(&world);

        for tick in 1..=40 {
            let mut ctx = TickContext {
                world: &world,
                obstacles: &[],
                sensor: &mut sensor,
                ambient: &mut ambient,
                heat: &mut heat,
                dt: 0.05,
                now: tick as f64 * 0.05,
            };
            agent.step(&mut ctx).unwrap();
        }

        let snap = agent.snapshot();
        assert!(snap.distance_travelled_m > 0.2);
        assert_eq!(snap.room_id.as_deref(), Some("floor_8"));
        assert!(snap.temperature_c > 15.0 && snap.temperature_c < 27.0);
        assert_eq!(agent.trail().count(), 40);
        assert!(agent.grid().explored_count() > 0);
        assert!(!heat.is_empty());
    }

    #[test]
    fn test_off_floor_agent_is_nudged() {
        let world = World::default_floor();
        let settings = Settings::default();
        let agent_settings = AgentSettings { x: 26.5, y: 5.0, ..AgentSettings::default() };
        let mut agent = Agent::new(0, &agent_settings, &settings, &world).unwrap();
        let (mut sensor, mut ambient, mut heat) = context_parts(&world);

        let mut ctx = TickContext {
            world: &world,
            obstacles: &[],
            sensor: &mut sensor,
            ambient: &mut ambient,
            heat: &mut heat,
            dt: 0.05,
            now: 0.05,
        };
        let before = agent.pose();
        agent.step(&mut ctx).unwrap();

        let snap = agent.snapshot();
        assert!(snap.room_id.is_none());
        assert_eq!(snap.temperature_c, 18.0);
        assert_eq!(snap.humidity_pct, 50.0);
        assert!(snap.pose.x < before.x);
        assert!(heat.is_empty());
    }

    #[test]
    fn test_trail_is_bounded() {
        let world = World::default_floor();
        let mut settings = Settings::default();
        settings.simulation.trail_capacity = 5;
        let mut agent = Agent::new(0, &settings.agents[0], &settings, &world).unwrap();
        let (mut sensor, mut ambient, mut heat) = context_parts(&world);
        for tick in 1..=12 {
            let mut ctx = TickContext {
                world: &world,
                obstacles: &[],
                sensor: &mut sensor,
                ambient: &mut ambient,
                heat: &mut heat,
                dt: 0.05,
                now: tick as f64 * 0.05,
            };
            agent.step(&mut ctx).unwrap();
        }
        assert_eq!(agent.trail().count(), 5);
        let last = agent.trail().last().unwrap();
        assert_eq!(*last, WorldPoint::new(agent.pose().x, agent.pose().y));
    }

    #[test]
    fn test_wall_follower_snapshot_has_no_waypoint() {
        let world = World::default_floor();
        let settings = Settings::default();
        let agent_settings = AgentSettings { law: DriveLaw::WallFollow, x: 3.0, y: 2.6, ..AgentSettings::default() };
        let agent = Agent::new(1, &agent_settings, &settings, &world).unwrap();
        assert!(agent.snapshot().waypoint.is_none());
        assert_eq!(agent.map(vec![]).explored.len(), 0);
    }
}
