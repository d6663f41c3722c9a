//! Fixed-rate fleet scheduler.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info};

use scout_navigation::World;

use crate::blackboard::{Blackboard, touch_tick};
use crate::bus::Topic;
use crate::config::Settings;
use crate::sim::agent::{Agent, AgentMap, AgentSnapshot, TickContext};
use crate::sim::ambient::AmbientModel;
use crate::sim::heatmap::{HeatAggregate, HeatSnapshot};
use crate::sim::noise::Noise;
use crate::sim::obstacles::MovingObstacle;
use crate::sim::sensor::RangeSensor;

/// Telemetry published every tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FleetSnapshot {
    pub tick: u64,
    /// Simulation time (s).
    pub time: f64,
    pub agents: Vec<AgentSnapshot>,
    /// Current positions of the moving obstacles as `[x, y]`.
    pub obstacles: Vec<[f64; 2]>,
}

/// Map layers published every few ticks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapSnapshot {
    pub tick: u64,
    pub agents: Vec<AgentMap>,
    pub heat: HeatSnapshot,
}

pub struct Fleet {
    world: Arc<World>,
    agents: Vec<Agent>,
    obstacles: Vec<MovingObstacle>,
    sensor: RangeSensor,
    ambient: AmbientModel,
    heat: HeatAggregate,
    dt: f64,
    tick: u64,
}

impl Fleet {
    pub fn new(world: Arc<World>, settings: &Settings) -> anyhow::Result<Self> {
        let mut noise = Noise::new(settings.simulation.seed);
        let agents = settings
            .agents
            .iter()
            .enumerate()
            .map(|(id, agent)| Agent::new(id, agent, settings, &world))
            .collect::<anyhow::Result<Vec<_>>>()?;
        let obstacles = settings.simulation.moving_obstacles.iter().map(MovingObstacle::new).collect();
        let sensor = RangeSensor::new(settings.sensor.clone(), noise.fork());
        let ambient = AmbientModel::new(
            noise.fork(),
            settings.sensor.temp_noise_c,
            settings.sensor.humidity_noise_pct,
        );
        let heat = HeatAggregate::new(&world, settings.grid.subdiv, settings.simulation.heat_history);

        Ok(Self {
            world,
            agents,
            obstacles,
            sensor,
            ambient,
            heat,
            dt: settings.simulation.dt(),
            tick: 0,
        })
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Simulation time of the last completed tick (s).
    pub fn time(&self) -> f64 {
        self.tick as f64 * self.dt
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn heat(&self) -> &HeatAggregate {
        &self.heat
    }

    /// Moves the obstacles, then steps every agent in id order.
    pub fn tick(&mut self) -> anyhow::Result<()> {
        self.tick += 1;
        let now = self.time();
        for obstacle in &mut self.obstacles {
            obstacle.step(now);
        }

        let mut ctx = TickContext {
            world: &self.world,
            obstacles: &self.obstacles,
            sensor: &mut self.sensor,
            ambient: &mut self.ambient,
            heat: &mut self.heat,
            dt: self.dt,
            now,
        };
        for agent in &mut self.agents {
            agent.step(&mut ctx)?;
        }
        Ok(())
    }

    pub fn snapshot(&self) -> FleetSnapshot {
        FleetSnapshot {
            tick: self.tick,
            time: self.time(),
            agents: self.agents.iter().map(Agent::snapshot).collect(),
            obstacles: self.obstacles.iter().map(|o| [o.x, o.y]).collect(),
        }
    }

    pub fn map_snapshot(&mut self) -> MapSnapshot {
        let mut agents = Vec::with_capacity(self.agents.len());
        for agent in &self.agents {
            let cloud = self.sensor.point_cloud(&self.world, &agent.pose());
            agents.push(agent.map(cloud));
        }
        MapSnapshot { tick: self.tick, agents, heat: self.heat.snapshot() }
    }
}

/// Ticks `fleet` at the configured period until `shutdown` flips.
///
/// A tick that overruns the period is followed immediately by the next one.
pub async fn run_fleet(
    mut fleet: Fleet,
    settings: Settings,
    bb: Blackboard,
    fleet_topic: Topic<FleetSnapshot>,
    map_topic: Topic<MapSnapshot>,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let period = settings.simulation.period();
    let map_every = settings.publish.map_snapshot_ticks.max(1);
    info!(agents = fleet.agents().len(), ?period, "Fleet scheduler started.");

    loop {
        let started = Instant::now();
        fleet.tick()?;
        touch_tick(&bb);
        fleet_topic.publish(fleet.snapshot());
        if fleet.tick_count() % map_every == 0 {
            map_topic.publish(fleet.map_snapshot());
        }

        let elapsed = started.elapsed();
        if elapsed > period {
            debug!(?elapsed, ?period, "tick overran its period");
        }
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = tokio::time::sleep(period.saturating_sub(elapsed)) => {}
        }
    }

    info!(ticks = fleet.tick_count(), "Fleet scheduler stopped.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    fn seeded() -> Settings {
        let mut settings = Settings::default();
        settings.simulation.seed = Some(42);
        settings
    }

    #[test]
    fn test_tick_advances_time_and_agents() {
        let settings = seeded();
        let mut fleet = Fleet::new(Arc::new(World::default_floor()), &settings).unwrap();
        assert_eq!(fleet.tick_count(), 0);
        for _ in 0..20 {
            fleet.tick().unwrap();
        }
        let snap = fleet.snapshot();
        assert_eq!(snap.tick, 20);
        assert!((snap.time - 1.0).abs() < EPSILON);
        assert_eq!(snap.agents.len(), 1);
        assert_eq!(snap.obstacles.len(), 2);
        assert!(snap.agents[0].distance_travelled_m > 0.0);
    }

    #[test]
    fn test_seeded_fleets_are_deterministic() {
        let settings = seeded();
        let mut a = Fleet::new(Arc::new(World::default_floor()), &settings).unwrap();
        let mut b = Fleet::new(Arc::new(World::default_floor()), &settings).unwrap();
        for _ in 0..30 {
            a.tick().unwrap();
            b.tick().unwrap();
        }
        assert_eq!(a.snapshot(), b.snapshot());
    }

    #[test]
    fn test_map_snapshot_layers() {
        let settings = seeded();
        let mut fleet = Fleet::new(Arc::new(World::default_floor()), &settings).unwrap();
        for _ in 0..10 {
            fleet.tick().unwrap();
        }
        let map = fleet.map_snapshot();
        assert_eq!(map.tick, 10);
        assert_eq!(map.agents.len(), 1);
        assert_eq!(map.agents[0].trail.len(), 10);
        assert!(!map.agents[0].explored.is_empty());
        assert!(!map.agents[0].point_cloud.is_empty());
        assert_eq!((map.heat.rows, map.heat.cols), (40, 112));
        assert!(!map.heat.cells.is_empty());
    }

    #[tokio::test]
    async fn test_run_fleet_stops_on_shutdown() {
        let mut settings = seeded();
        settings.simulation.period_ms = 5;
        settings.publish.map_snapshot_ticks = 2;
        let fleet = Fleet::new(Arc::new(World::default_floor()), &settings).unwrap();
        let bb: Blackboard = Arc::default();
        let fleet_topic = Topic::new(4);
        let map_topic = Topic::new(4);
        let mut latest = fleet_topic.latest();
        let mut maps = map_topic.latest();
        let (tx, rx) = watch::channel(false);

        let task = tokio::spawn(run_fleet(fleet, settings, bb.clone(), fleet_topic.clone(), map_topic.clone(), rx));
        tokio::time::sleep(std::time::Duration::from_millis(60)).await;
        tx.send(true).unwrap();
        task.await.unwrap().unwrap();

        let snap = latest.get().unwrap();
        assert!(snap.tick >= 2);
        assert_eq!(crate::blackboard::snapshot(&bb).ticks, snap.tick);
        assert_eq!(maps.get().unwrap().tick % 2, 0);
    }
}
