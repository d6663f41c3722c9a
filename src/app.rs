//! Process-wide context: topics, health state and the running tasks.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use scout_navigation::World;

use crate::blackboard::{Blackboard, snapshot};
use crate::bridge::{Bridge, Connector, FrameIngress, ScoutUpdate, SerialPortConnector};
use crate::bus::Topic;
use crate::config::Settings;
use crate::sim::{Fleet, FleetSnapshot, MapSnapshot, run_fleet};
use crate::watchdog::watchdog;

pub struct AppContext {
    pub bb: Blackboard,
    pub fleet_topic: Topic<FleetSnapshot>,
    pub map_topic: Topic<MapSnapshot>,
    pub scout_topic: Topic<ScoutUpdate>,
    shutdown: watch::Sender<bool>,
    fleet: JoinHandle<anyhow::Result<()>>,
    watchdog: JoinHandle<anyhow::Result<()>>,
    status: Option<JoinHandle<()>>,
    bridge: Bridge,
}

impl AppContext {
    /// Starts everything, opening the configured serial port when hardware is enabled.
    pub fn start(settings: Settings) -> anyhow::Result<Self> {
        let connector: Option<Box<dyn Connector>> = if settings.hardware.enabled {
            Some(Box::new(SerialPortConnector::new(&settings.hardware)))
        } else {
            info!("Hardware bridge disabled; frames are accepted through ingestion only.");
            None
        };
        Self::start_with(settings, connector)
    }

    /// Starts the fleet scheduler, watchdog, status log and bridge, in that order.
    pub fn start_with(settings: Settings, connector: Option<Box<dyn Connector>>) -> anyhow::Result<Self> {
        let bb: Blackboard = Arc::default();
        let capacity = settings.publish.topic_capacity;
        let fleet_topic: Topic<FleetSnapshot> = Topic::new(capacity);
        let map_topic: Topic<MapSnapshot> = Topic::new(capacity);
        let scout_topic: Topic<ScoutUpdate> = Topic::new(capacity);
        let (shutdown, shutdown_rx) = watch::channel(false);

        let world = Arc::new(World::default_floor());
        let fleet = Fleet::new(world, &settings)?;
        info!(agents = settings.agents.len(), "Spawning fleet scheduler...");
        let fleet = tokio::spawn(run_fleet(
            fleet,
            settings.clone(),
            Arc::clone(&bb),
            fleet_topic.clone(),
            map_topic.clone(),
            shutdown_rx.clone(),
        ));

        let watchdog = tokio::spawn(watchdog(
            Arc::clone(&bb),
            settings.simulation.period(),
            settings.simulation.stall_periods,
            shutdown_rx.clone(),
        ));

        let status = (settings.publish.status_log_secs > 0).then(|| {
            tokio::spawn(status_log(
                Duration::from_secs(settings.publish.status_log_secs),
                fleet_topic.clone(),
                Arc::clone(&bb),
                shutdown_rx,
            ))
        });

        let bridge = Bridge::start(&settings, Arc::clone(&bb), scout_topic.clone(), connector)?;

        Ok(Self { bb, fleet_topic, map_topic, scout_topic, shutdown, fleet, watchdog, status, bridge })
    }

    pub fn ingress(&self) -> FrameIngress {
        self.bridge.ingress()
    }

    /// Stops components in reverse start order.
    pub async fn shutdown(self) -> anyhow::Result<()> {
        info!("Shutting down...");
        self.bridge.shutdown().await;
        let _ = self.shutdown.send(true);
        if let Some(status) = self.status {
            status.await?;
        }
        self.watchdog.await??;
        self.fleet.await??;
        info!("Shutdown complete.");
        Ok(())
    }
}

async fn status_log(
    every: Duration,
    fleet_topic: Topic<FleetSnapshot>,
    bb: Blackboard,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut latest = fleet_topic.latest();
    let mut tick = tokio::time::interval(every);
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = tick.tick() => {}
        }
        let health = snapshot(&bb);
        if let Some(fleet) = latest.get() {
            for agent in &fleet.agents {
                info!(
                    agent = %agent.name,
                    x = agent.pose.x,
                    y = agent.pose.y,
                    mode = ?agent.mode,
                    temp_c = agent.temperature_c,
                    "status"
                );
            }
        }
        if !health.faults.is_empty() {
            warn!(faults = ?health.faults, link = ?health.link, "active faults");
        }
    }
}
