//! Physical substrate of the Terrarium simulation.
//!
//! This crate models everything that is not an agent: the torus the world
//! lives on, the global environment pools, the resource grid that
//! herbivores graze and social actors harvest, and the primary producers
//! that photosynthesise into the shared pools.
//!
//! # Modules
//!
//! - [`torus`] -- Wrapping geometry and shortest-path distances.
//! - [`environment`] -- Water, nutrient, gas, and temperature pools plus
//!   the day-night light cycle. Every update clamps silently.
//! - [`resource_field`] -- Double-buffered biomass grid with growth,
//!   diffusion, gas exchange, and harvesting.
//! - [`producer`] -- Plant patches and the moss pool.
//! - [`drought`] -- Periodic regional collapses of the resource field.
//! - [`sampling`] -- Random-sampling helpers over an injected generator.
//! - [`error`] -- Construction-time geometry errors.

pub mod drought;
pub mod environment;
pub mod error;
pub mod producer;
pub mod resource_field;
pub mod sampling;
pub mod torus;

// Re-export primary types at crate root.
pub use drought::{ActiveDrought, DroughtParams, DroughtState};
pub use environment::{Environment, EnvironmentParams, PoolBounds};
pub use error::WorldError;
pub use producer::{
    BedReport, MossParams, MossPool, PlantBed, PlantParams, PlantPatch, Producer, ProducerRates,
};
pub use resource_field::{FieldParams, GrowthModel, ResourceField};
pub use torus::Torus;
