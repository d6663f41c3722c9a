//! Simulated scout fleet on a static floor plan.

pub mod agent;
pub mod ambient;
pub mod heatmap;
pub mod noise;
pub mod obstacles;
pub mod scheduler;
pub mod sensor;

pub use agent::{Agent, AgentMap, AgentSnapshot};
pub use heatmap::{HeatAggregate, HeatSnapshot};
pub use scheduler::{Fleet, FleetSnapshot, MapSnapshot, run_fleet};
