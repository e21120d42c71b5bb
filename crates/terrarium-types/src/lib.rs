//! Shared type definitions for the Terrarium simulation.
//!
//! This crate is the single source of truth for identifiers and the
//! read-only records that flow out of the simulation core to renderers,
//! dashboards, and tests.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe `u64` wrappers for agents and institutions
//! - [`enums`] -- Agent kinds and annal events
//! - [`structs`] -- Snapshot, pool readings, and yearly metrics records

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{AgentKind, AnnalEvent};
pub use ids::{AgentId, IdSequence, InstitutionId};
pub use structs::{
    AgentView, FieldView, InstitutionView, PlantView, PoolReadings, Population,
    UNAFFILIATED_COLOR, WorldSnapshot, YearlyMetrics, institution_color,
};
