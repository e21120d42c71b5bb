//! Read-only records handed to renderers, dashboards, and tests.
//!
//! Nothing in this module mutates simulation state. A [`WorldSnapshot`] is
//! a detached copy; holding one never borrows the world.

use serde::{Deserialize, Serialize};

use crate::enums::AgentKind;
use crate::ids::{AgentId, InstitutionId};

/// RGB colour used for unaffiliated agents.
pub const UNAFFILIATED_COLOR: [u8; 3] = [128, 128, 128];

/// Deterministic render colour for an institution.
///
/// Each channel is `(k * id) mod 255` with `k` = 37, 73, 19.
pub fn institution_color(id: InstitutionId) -> [u8; 3] {
    let channel = |k: u64| -> u8 {
        let value = id.into_inner().wrapping_mul(k).wrapping_rem(255);
        u8::try_from(value).unwrap_or(u8::MAX)
    };
    [channel(37), channel(73), channel(19)]
}

// ---------------------------------------------------------------------------
// Pools
// ---------------------------------------------------------------------------

/// Scalar environment pools at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoolReadings {
    /// Current illumination in `[0, 1]`.
    pub light: f64,
    /// Water pool.
    pub water: f64,
    /// Dissolved nutrient / detritus pool.
    pub nutrients: f64,
    /// Oxygen fraction.
    pub o2: f64,
    /// Carbon dioxide fraction.
    pub co2: f64,
    /// Temperature in degrees Celsius.
    pub temperature: f64,
}

impl core::fmt::Display for PoolReadings {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "Light {:.2}  O2 {:.3}  CO2 {:.4}  Nutr {:.2}  Water {:.2}  Temp {:.1}",
            self.light, self.o2, self.co2, self.nutrients, self.water, self.temperature
        )
    }
}

// ---------------------------------------------------------------------------
// Snapshot parts
// ---------------------------------------------------------------------------

/// The resource field as a row-major heatmap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldView {
    /// Number of rows.
    pub rows: usize,
    /// Number of columns.
    pub cols: usize,
    /// Side length of one cell in world units.
    pub cell_size: f64,
    /// Row-major cell values, each in `[0, 1]`.
    pub cells: Vec<f64>,
}

/// One agent as seen by a renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentView {
    /// Agent identifier.
    pub id: AgentId,
    /// Agent kind.
    pub kind: AgentKind,
    /// Horizontal position in `[0, width)`.
    pub x: f64,
    /// Vertical position in `[0, height)`.
    pub y: f64,
    /// Render radius.
    pub size: f64,
    /// Stored energy.
    pub energy: f64,
    /// Institution membership (social actors only).
    pub institution: Option<InstitutionId>,
    /// Render colour derived from the institution.
    pub color: [u8; 3],
}

/// One institution as seen by a dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstitutionView {
    /// Institution identifier.
    pub id: InstitutionId,
    /// Tax rate.
    pub tax_rate: f64,
    /// Fine levied on sanctioned exploiters.
    pub sanction: f64,
    /// Cooperation bonus between members.
    pub in_group_bonus: f64,
    /// Current budget.
    pub budget: f64,
    /// Number of members.
    pub members: usize,
    /// Consecutive years below both dissolve floors.
    pub broke_years: u32,
    /// Render colour.
    pub color: [u8; 3],
}

/// One plant patch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlantView {
    /// Horizontal position.
    pub x: f64,
    /// Vertical position.
    pub y: f64,
    /// Biomass in `[0, 1]`.
    pub biomass: f64,
}

/// Per-kind live population counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Population {
    /// Live herbivores.
    pub herbivores: usize,
    /// Live predators.
    pub predators: usize,
    /// Live social actors.
    pub social: usize,
}

impl Population {
    /// Total live agents across all kinds.
    pub const fn total(&self) -> usize {
        self.herbivores
            .saturating_add(self.predators)
            .saturating_add(self.social)
    }

    /// Count for a single kind.
    pub const fn of(&self, kind: AgentKind) -> usize {
        match kind {
            AgentKind::Herbivore => self.herbivores,
            AgentKind::Predator => self.predators,
            AgentKind::Social => self.social,
        }
    }
}

/// A detached, read-only copy of the world state for rendering and tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    /// Ticks executed so far.
    pub tick: u64,
    /// Completed years.
    pub year: u64,
    /// Environment pools.
    pub pools: PoolReadings,
    /// Resource field heatmap.
    pub field: FieldView,
    /// Live agents.
    pub agents: Vec<AgentView>,
    /// Live institutions ordered by id.
    pub institutions: Vec<InstitutionView>,
    /// Plant patches.
    pub plants: Vec<PlantView>,
    /// Biomass of the moss pool.
    pub moss_biomass: f64,
    /// Live population per kind.
    pub population: Population,
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// One yearly dashboard record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YearlyMetrics {
    /// Tick at which the record was taken.
    pub tick: u64,
    /// Year index.
    pub year: u64,
    /// Share of cooperative outcomes in the rolling interaction window.
    pub cooperation_rate: f64,
    /// Institutions with at least one member.
    pub institutions: usize,
    /// Mean energy over all live agents (0 when none are alive).
    pub average_energy: f64,
    /// Live population per kind.
    pub population: Population,
}
