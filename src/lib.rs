//! Thermal scout runtime: a simulated heat-mapping fleet and a bridge to
//! physical scouts over a serial link.

pub mod app;
pub mod blackboard;
pub mod bridge;
pub mod bus;
pub mod config;
pub mod sim;
pub mod watchdog;

pub use app::AppContext;
pub use config::{Settings, load_settings};
