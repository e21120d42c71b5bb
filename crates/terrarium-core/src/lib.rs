//! World aggregate and tick pipeline for the Terrarium simulation.
//!
//! This crate ties the environment, producers, agents, and institutions
//! together into a [`World`] and advances it one tick at a time through an
//! explicit, ordered pipeline of phases.
//!
//! # Modules
//!
//! - [`config`] -- YAML configuration, validation, and presets.
//! - [`clock`] -- Tick counter and derived years.
//! - [`metrics`] -- Rolling cooperation window and yearly records.
//! - [`world`] -- The world aggregate and scenario setup calls.
//! - [`tick`] -- The phase pipeline behind [`World::step`].
//! - [`snapshot`] -- Detached read-only copies of the world.

pub mod clock;
pub mod config;
pub mod metrics;
pub mod snapshot;
pub mod tick;
pub mod world;

// Re-export primary types at crate root for convenience.
pub use clock::{ClockError, WorldClock};
pub use config::{ConfigError, SimulationConfig};
pub use metrics::MetricsRecorder;
pub use tick::{PIPELINE, Phase, TickSummary};
pub use world::World;
