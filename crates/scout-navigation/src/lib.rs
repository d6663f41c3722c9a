#![doc = "Mapping, control and decision logic for thermal scout robots."]
#![doc = ""]
#![doc = "The crate is shared by the simulated fleet and the hardware bridge: the"]
#![doc = "static world model, both occupancy grid variants, the patrol, wall-follow"]
#![doc = "and layered controllers, and the gyro heading estimator."]

pub mod control;
pub mod error;
pub mod heading;
pub mod map;
pub mod world;

pub use control::{
    Action, Avoidance, AvoidanceParams, AvoidanceStep, Decision, LayeredPlanner, MotorCommand,
    NavMode, PlannerParams, SensorReading, WallFollowParams, WallFollower, WallSide,
    WaypointController, WaypointParams,
};
pub use error::NavigationError;
pub use heading::{HeadingEstimator, HeadingParams};
pub use map::{
    DirectionHint, ExplorationGrid, GridCell, LogOddsConfig, LogOddsGrid, MapBounds, Occupancy,
    OccupancyMap, WorldPoint,
};
pub use world::{HitKind, RayHit, Space, World};
