use std::time::Duration;

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use tracing::{error, info};

use scout_navigation::{
    AvoidanceParams, HeadingParams, LogOddsConfig, PlannerParams, WallFollowParams, WallSide,
    WaypointParams, WorldPoint,
};

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
/// Names an extra TOML file layered over the defaults.
const CONFIG_ENV_VAR: &str = "SCOUT_CONFIG";
const ENV_PREFIX: &str = "SCOUT";

/// Loads `config/default.toml`, the optional `SCOUT_CONFIG` file and
/// `SCOUT_<SECTION>__<KEY>` environment overrides, in that order.
pub fn load_settings() -> Result<Settings, ConfigError> {
    info!("Attempting to load configuration from {}", DEFAULT_CONFIG_PATH);

    let mut builder = Config::builder()
        .add_source(File::new(DEFAULT_CONFIG_PATH, FileFormat::Toml).required(true));
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        info!(%path, "Layering override configuration");
        builder = builder.add_source(File::new(&path, FileFormat::Toml).required(true));
    }
    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let settings = builder.build().and_then(|c| c.try_deserialize::<Settings>());
    match settings {
        Ok(settings) => {
            info!(
                agents = settings.agents.len(),
                period_ms = settings.simulation.period_ms,
                hardware = settings.hardware.enabled,
                "Successfully loaded configuration"
            );
            settings.validate()?;
            Ok(settings)
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            Err(e)
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub simulation: SimulationSettings,
    pub robot: RobotSettings,
    pub waypoints: WaypointSettings,
    pub avoidance: AvoidanceParams,
    pub wall_follow: WallFollowParams,
    pub planner: PlannerParams,
    pub grid: GridSettings,
    pub sensor: SensorSettings,
    pub agents: Vec<AgentSettings>,
    pub hardware: HardwareSettings,
    pub publish: PublishSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            simulation: SimulationSettings::default(),
            robot: RobotSettings::default(),
            waypoints: WaypointSettings::default(),
            avoidance: AvoidanceParams::default(),
            wall_follow: WallFollowParams::default(),
            planner: PlannerParams::default(),
            grid: GridSettings::default(),
            sensor: SensorSettings::default(),
            agents: vec![AgentSettings::default()],
            hardware: HardwareSettings::default(),
            publish: PublishSettings::default(),
        }
    }
}

impl Settings {
    /// Parses settings from a TOML document, without file or environment layers.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let settings: Settings = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Rejects values the runtime cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Message(msg.to_string()));
        if self.simulation.period_ms == 0 {
            return invalid("simulation.period_ms must be positive");
        }
        if self.grid.subdiv == 0 {
            return invalid("grid.subdiv must be positive");
        }
        if self.robot.wheel_base <= 0.0 {
            return invalid("robot.wheel_base must be positive");
        }
        if self.waypoints.route.is_empty()
            && self.agents.iter().any(|a| a.law == DriveLaw::Patrol)
        {
            return invalid("patrolling agents need at least one waypoint");
        }
        if self.hardware.frame_queue == 0 || self.publish.topic_capacity == 0 {
            return invalid("queue capacities must be positive");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    /// Scheduler tick period; also the integration step.
    pub period_ms: u64,
    /// Fixed seed for reproducible noise; `None` seeds from the OS.
    pub seed: Option<u64>,
    /// Watchdog fires after this many missed periods.
    pub stall_periods: u32,
    pub trail_capacity: usize,
    /// Readings kept per heat cell.
    pub heat_history: usize,
    pub moving_obstacles: Vec<MovingObstacleSettings>,
}

impl SimulationSettings {
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }

    /// Integration step in seconds.
    pub fn dt(&self) -> f64 {
        self.period_ms as f64 / 1000.0
    }
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            period_ms: 50,
            seed: None,
            stall_periods: 4,
            trail_capacity: 500,
            heat_history: 15,
            moving_obstacles: vec![
                MovingObstacleSettings { center_x: 11.5, center_y: 5.0, speed: 0.25, ..Default::default() },
                MovingObstacleSettings { center_x: 16.5, center_y: 6.5, speed: 0.2, ..Default::default() },
            ],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MovingObstacleSettings {
    pub center_x: f64,
    pub center_y: f64,
    /// Radius of the circular path (m).
    pub path_radius: f64,
    /// Radius of the obstacle itself (m).
    pub radius: f64,
    /// Angular speed along the path (rad/s).
    pub speed: f64,
}

impl Default for MovingObstacleSettings {
    fn default() -> Self {
        Self { center_x: 0.0, center_y: 0.0, path_radius: 2.5, radius: 0.35, speed: 0.4 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RobotSettings {
    pub wheel_base: f64,
    /// Distance an agent is pushed back along -x when it leaves the floor (m).
    pub terrain_nudge_m: f64,
    pub fallback_temp_c: f64,
    pub fallback_humidity_pct: f64,
}

impl Default for RobotSettings {
    fn default() -> Self {
        Self { wheel_base: 0.2, terrain_nudge_m: 0.1, fallback_temp_c: 18.0, fallback_humidity_pct: 50.0 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WaypointSettings {
    /// Patrol route as `[x, y]` pairs (m).
    pub route: Vec<[f64; 2]>,
    pub law: WaypointParams,
}

impl WaypointSettings {
    pub fn points(&self) -> Vec<WorldPoint> {
        self.route.iter().map(|[x, y]| WorldPoint::new(*x, *y)).collect()
    }
}

impl Default for WaypointSettings {
    fn default() -> Self {
        // Lawn-mower coverage of the default floor.
        let route = vec![
            [14.5, 5.0], [8.5, 2.5], [2.5, 2.5], [2.5, 4.5], [8.5, 4.5], [14.5, 4.5],
            [20.5, 4.5], [25.5, 2.5], [25.5, 4.5], [25.5, 6.5], [20.5, 6.5], [14.5, 6.5],
            [8.5, 6.5], [2.5, 6.5], [2.5, 5.5], [8.5, 5.5], [14.5, 5.5], [20.5, 5.5],
            [20.5, 3.5], [14.5, 3.5], [8.5, 3.5], [14.5, 5.0],
        ];
        Self { route, law: WaypointParams::default() }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GridSettings {
    /// Fine cells per world cell for the exploration grid and heat map.
    pub subdiv: usize,
    /// Hardware-path log-odds grid.
    pub log_odds: LogOddsConfig,
    /// Cells probed by the occupancy direction hint.
    pub look_ahead_cells: usize,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            subdiv: 4,
            log_odds: LogOddsConfig { resolution: 0.1, ..Default::default() },
            look_ahead_cells: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SensorSettings {
    pub max_range_cm: f64,
    pub obstacle_noise_cm: f64,
    pub wall_noise_cm: f64,
    pub min_obstacle_cm: f64,
    pub min_wall_cm: f64,
    pub temp_noise_c: f64,
    pub humidity_noise_pct: f64,
    pub cloud_rays: usize,
    pub cloud_max_range_m: f64,
    pub cloud_distance_noise_m: f64,
    pub cloud_angle_noise_rad: f64,
    pub cloud_height_noise_m: f64,
}

impl Default for SensorSettings {
    fn default() -> Self {
        Self {
            max_range_cm: 400.0,
            obstacle_noise_cm: 1.5,
            wall_noise_cm: 1.0,
            min_obstacle_cm: 8.0,
            min_wall_cm: 2.0,
            temp_noise_c: 0.15,
            humidity_noise_pct: 2.5,
            cloud_rays: 72,
            cloud_max_range_m: 8.0,
            cloud_distance_noise_m: 0.03,
            cloud_angle_noise_rad: 0.008,
            cloud_height_noise_m: 0.01,
        }
    }
}

/// Motion law an agent follows outside avoidance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriveLaw {
    #[default]
    Patrol,
    WallFollow,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub theta: f64,
    pub law: DriveLaw,
    /// Only used by wall-following agents.
    pub wall_side: WallSide,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            name: "scout-1".to_string(),
            x: 14.5,
            y: 5.0,
            theta: 0.0,
            law: DriveLaw::Patrol,
            wall_side: WallSide::Left,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HardwareSettings {
    /// Starts the serial worker; the ingestion channel runs regardless.
    pub enabled: bool,
    pub port: String,
    pub baud_rate: u32,
    pub read_timeout_ms: u64,
    /// Worker pause when the port had nothing to read.
    pub idle_sleep_us: u64,
    pub reconnect_backoff_ms: u64,
    pub max_attempts: u32,
    pub join_timeout_ms: u64,
    pub frame_queue: usize,
    /// Keeps pose and heading fixed; gyro readings are only reported.
    pub cart_stationary: bool,
    /// Dead-reckoned distance per decision at full speed (m).
    pub step_size_m: f64,
    pub point_ring: usize,
    pub display_points: usize,
    pub heading: HeadingParams,
}

impl HardwareSettings {
    pub fn reconnect_backoff(&self) -> Duration {
        Duration::from_millis(self.reconnect_backoff_ms)
    }

    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }
}

impl Default for HardwareSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            port: "/dev/ttyACM0".to_string(),
            baud_rate: 115_200,
            read_timeout_ms: 100,
            idle_sleep_us: 1_000,
            reconnect_backoff_ms: 1_000,
            max_attempts: 5,
            join_timeout_ms: 2_000,
            frame_queue: 64,
            cart_stationary: false,
            step_size_m: 0.05,
            point_ring: 2_000,
            display_points: 24,
            heading: HeadingParams { default_dt: 0.5, ..Default::default() },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PublishSettings {
    pub topic_capacity: usize,
    /// Map snapshots are published every this many ticks.
    pub map_snapshot_ticks: u64,
    /// Period of the fleet status log line; 0 disables it.
    pub status_log_secs: u64,
}

impl Default for PublishSettings {
    fn default() -> Self {
        Self { topic_capacity: 16, map_snapshot_ticks: 10, status_log_secs: 5 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-12;

    #[test]
    fn test_default_file_matches_defaults() {
        let from_file = Settings::from_toml_str(include_str!("../config/default.toml")).unwrap();
        let defaults = Settings::default();
        assert_eq!(from_file.simulation.period_ms, defaults.simulation.period_ms);
        assert_eq!(from_file.waypoints.route, defaults.waypoints.route);
        assert_eq!(from_file.avoidance, defaults.avoidance);
        assert_eq!(from_file.planner, defaults.planner);
        assert_eq!(from_file.wall_follow, defaults.wall_follow);
        assert_eq!(from_file.grid.log_odds, defaults.grid.log_odds);
        assert_eq!(from_file.hardware.max_attempts, 5);
        assert_eq!(from_file.agents.len(), 2);
        assert_eq!(from_file.agents[1].law, DriveLaw::WallFollow);
        assert_eq!(from_file.simulation.moving_obstacles.len(), 2);
    }

    #[test]
    fn test_partial_document_keeps_defaults() {
        let s = Settings::from_toml_str(
            r#"
            [simulation]
            period_ms = 20
            seed = 7

            [avoidance]
            commit_window = 1.5

            [[agents]]
            name = "left-hugger"
            law = "wall_follow"
            wall_side = "right"
            "#,
        )
        .unwrap();
        assert_eq!(s.simulation.period_ms, 20);
        assert_eq!(s.simulation.seed, Some(7));
        assert!((s.simulation.dt() - 0.02).abs() < EPSILON);
        assert!((s.avoidance.commit_window - 1.5).abs() < EPSILON);
        assert!((s.avoidance.check_distance - 0.55).abs() < EPSILON);
        assert_eq!(s.agents[0].wall_side, WallSide::Right);
        assert!((s.agents[0].x - 14.5).abs() < EPSILON);
        assert_eq!(s.waypoints.route.len(), 22);
    }

    #[test]
    fn test_validation_rejects_zero_period() {
        let err = Settings::from_toml_str("[simulation]\nperiod_ms = 0\n").unwrap_err();
        assert!(err.to_string().contains("period_ms"));
    }

    #[test]
    fn test_patrol_needs_route() {
        let toml = "[waypoints]\nroute = []\n\n[[agents]]\nname = \"a\"\n";
        assert!(Settings::from_toml_str(toml).is_err());
    }
}
