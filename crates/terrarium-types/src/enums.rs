//! Enumeration types for the Terrarium simulation.

use serde::{Deserialize, Serialize};

use crate::ids::InstitutionId;

// ---------------------------------------------------------------------------
// Agent kinds
// ---------------------------------------------------------------------------

/// The closed set of mobile agent kinds.
///
/// Herbivores and predators live in the terrarium food web; social actors
/// belong to the persistent-society variant and carry reputations and
/// institution membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    /// Grazes on the resource field.
    Herbivore,
    /// Hunts herbivores.
    Predator,
    /// Harvests, cooperates or defects, and joins institutions.
    Social,
}

impl AgentKind {
    /// All kinds in a fixed order, used for per-kind bookkeeping.
    pub const ALL: [Self; 3] = [Self::Herbivore, Self::Predator, Self::Social];

    /// Return a short lowercase label (used in logs and the HUD).
    pub const fn label(self) -> &'static str {
        match self {
            Self::Herbivore => "herbivore",
            Self::Predator => "predator",
            Self::Social => "social",
        }
    }
}

impl core::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Annals
// ---------------------------------------------------------------------------

/// A notable world event, appended to the world's annals as it happens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AnnalEvent {
    /// A regional drought began.
    Drought {
        /// Tick at which the drought started.
        tick: u64,
        /// Year at which the drought started.
        year: u64,
        /// Top-left row of the affected region.
        row: usize,
        /// Top-left column of the affected region.
        col: usize,
    },
    /// A new institution was founded from a cluster of unaffiliated agents.
    InstitutionFounded {
        /// Year of founding.
        year: u64,
        /// The new institution.
        id: InstitutionId,
        /// Number of members recruited at founding.
        members: usize,
    },
    /// An institution was dissolved after too many broke years.
    InstitutionDissolved {
        /// Year of dissolution.
        year: u64,
        /// The dissolved institution.
        id: InstitutionId,
    },
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn agent_kind_serializes_snake_case() {
        let json = serde_json::to_string(&AgentKind::Herbivore).unwrap();
        assert_eq!(json, "\"herbivore\"");
    }

    #[test]
    fn annal_event_is_tagged() {
        let event = AnnalEvent::InstitutionDissolved {
            year: 40,
            id: InstitutionId(3),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["event"], "institution_dissolved");
        assert_eq!(value["id"], 3);
    }
}
