//! Tunable parameters for agent behaviour and social policy.
//!
//! These structs correspond to the `agents` section (with its
//! `herbivore`, `predator` and `social` entries) and to the `ecology`,
//! `interaction` and `governance` sections of `terrarium-config.yaml`.
//! Every section deserialises with `#[serde(default)]`, so a document only
//! has to name the values it overrides.

use serde::Deserialize;
use terrarium_types::AgentKind;

// ---------------------------------------------------------------------------
// Per-kind parameters
// ---------------------------------------------------------------------------

/// Parameters shared by every agent of one kind.
#[derive(Debug, Clone, PartialEq)]
pub struct KindConfig {
    /// Agents created at world init.
    pub initial: usize,
    /// Hard population cap.
    pub cap: usize,
    /// Movement speed in world units per unit time.
    pub speed: f64,
    /// Sensing radius.
    pub sense: f64,
    /// Render and capture radius.
    pub size: f64,
    /// Energy at creation.
    pub start_energy: f64,
    /// Energy ceiling.
    pub max_energy: f64,
    /// Energy both parents need to reproduce.
    pub reproduce_threshold: f64,
    /// Energy of a newborn.
    pub child_energy: f64,
    /// Factor applied to each parent's energy after reproducing.
    pub parent_factor: f64,
    /// Parents must be strictly closer than this.
    pub mate_distance: f64,
    /// Lower bound of the sampled lifespan.
    pub max_age_min: f64,
    /// Upper bound of the sampled lifespan.
    pub max_age_max: f64,
    /// Base metabolic burn per unit time.
    pub metabolism: f64,
    /// Additional burn per unit of stored energy per unit time.
    pub metabolism_per_energy: f64,
}

impl KindConfig {
    /// Defaults for a kind.
    pub fn for_kind(kind: AgentKind) -> Self {
        match kind {
            AgentKind::Herbivore => Self::herbivore(),
            AgentKind::Predator => Self::predator(),
            AgentKind::Social => Self::social(),
        }
    }

    /// Grazers of the resource field.
    pub const fn herbivore() -> Self {
        Self {
            initial: 25,
            cap: 100,
            speed: 35.0,
            sense: 40.0,
            size: 2.0,
            start_energy: 1.0,
            max_energy: 3.0,
            reproduce_threshold: 1.1,
            child_energy: 0.7,
            parent_factor: 0.65,
            mate_distance: 12.0,
            max_age_min: 900.0,
            max_age_max: 2000.0,
            metabolism: 0.02,
            metabolism_per_energy: 0.0,
        }
    }

    /// Hunters of herbivores.
    pub const fn predator() -> Self {
        Self {
            initial: 0,
            cap: 30,
            speed: 45.0,
            sense: 60.0,
            size: 3.0,
            start_energy: 1.2,
            max_energy: 4.0,
            reproduce_threshold: 1.6,
            child_energy: 0.7,
            parent_factor: 0.65,
            mate_distance: 12.0,
            max_age_min: 900.0,
            max_age_max: 2200.0,
            metabolism: 0.03,
            metabolism_per_energy: 0.0,
        }
    }

    /// Members of the persistent society.
    pub const fn social() -> Self {
        Self {
            initial: 0,
            cap: 300,
            speed: 0.0,
            sense: 0.0,
            size: 1.0,
            start_energy: 5.0,
            max_energy: 20.0,
            reproduce_threshold: f64::MAX,
            child_energy: 0.0,
            parent_factor: 1.0,
            mate_distance: 0.0,
            max_age_min: 1e9,
            max_age_max: 1e9,
            metabolism: 0.6,
            metabolism_per_energy: 0.015,
        }
    }
}

/// Generates the optional mirror of [`KindConfig`] used while parsing, so
/// that a partial section falls back to the defaults of its own kind.
macro_rules! kind_overrides {
    ($($field:ident: $ty:ty),* $(,)?) => {
        #[derive(Debug, Default, Deserialize)]
        #[serde(default, deny_unknown_fields)]
        struct KindOverrides {
            $($field: Option<$ty>,)*
        }

        impl KindOverrides {
            fn over(self, mut base: KindConfig) -> KindConfig {
                $(if let Some(value) = self.$field {
                    base.$field = value;
                })*
                base
            }
        }
    };
}

kind_overrides! {
    initial: usize,
    cap: usize,
    speed: f64,
    sense: f64,
    size: f64,
    start_energy: f64,
    max_energy: f64,
    reproduce_threshold: f64,
    child_energy: f64,
    parent_factor: f64,
    mate_distance: f64,
    max_age_min: f64,
    max_age_max: f64,
    metabolism: f64,
    metabolism_per_energy: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawKinds {
    herbivore: KindOverrides,
    predator: KindOverrides,
    social: KindOverrides,
}

impl From<RawKinds> for KindsConfig {
    fn from(raw: RawKinds) -> Self {
        Self {
            herbivore: raw.herbivore.over(KindConfig::herbivore()),
            predator: raw.predator.over(KindConfig::predator()),
            social: raw.social.over(KindConfig::social()),
        }
    }
}

/// Per-kind parameters for all three kinds.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawKinds")]
pub struct KindsConfig {
    /// Herbivore parameters.
    pub herbivore: KindConfig,
    /// Predator parameters.
    pub predator: KindConfig,
    /// Social actor parameters.
    pub social: KindConfig,
}

impl Default for KindsConfig {
    fn default() -> Self {
        Self {
            herbivore: KindConfig::herbivore(),
            predator: KindConfig::predator(),
            social: KindConfig::social(),
        }
    }
}

impl KindsConfig {
    /// Parameters of one kind.
    pub const fn get(&self, kind: AgentKind) -> &KindConfig {
        match kind {
            AgentKind::Herbivore => &self.herbivore,
            AgentKind::Predator => &self.predator,
            AgentKind::Social => &self.social,
        }
    }
}

// ---------------------------------------------------------------------------
// Ecology (animals)
// ---------------------------------------------------------------------------

/// Steering, feeding, and respiration constants for animals.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EcologyConfig {
    /// Weight of the previous velocity.
    pub inertia: f64,
    /// Weight of the random jitter vector.
    pub jitter: f64,
    /// Weight of the forage or hunt bias.
    pub bias: f64,
    /// Chance per move of a random reorientation.
    pub twitch_chance: f64,
    /// Maximum reorientation angle in degrees.
    pub twitch_degrees: f64,
    /// Random directions probed by the forage bias.
    pub forage_probes: usize,
    /// Field biomass a herbivore tries to eat per unit time.
    pub graze_rate: f64,
    /// Energy gained per unit of eaten biomass.
    pub graze_yield: f64,
    /// Energy a predator gains from a capture.
    pub hunt_gain: f64,
    /// Slack added to the sum of sizes when testing a capture.
    pub capture_margin: f64,
    /// Oxygen consumed per animal per unit time.
    pub respire_o2: f64,
    /// Carbon dioxide released per animal per unit time.
    pub respire_co2: f64,
    /// Nutrients returned by each dead animal.
    pub death_recycle: f64,
}

impl Default for EcologyConfig {
    fn default() -> Self {
        Self {
            inertia: 0.6,
            jitter: 0.8,
            bias: 0.5,
            twitch_chance: 0.05,
            twitch_degrees: 45.0,
            forage_probes: 5,
            graze_rate: 0.2,
            graze_yield: 2.0,
            hunt_gain: 0.6,
            capture_margin: 2.0,
            respire_o2: 0.000_1,
            respire_co2: 0.000_08,
            death_recycle: 0.01,
        }
    }
}

// ---------------------------------------------------------------------------
// Interaction (social actors)
// ---------------------------------------------------------------------------

/// Harvest and pairwise interaction constants for social actors.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    /// Share of the cell's resource taken by a lone harvester.
    pub harvest_alpha: f64,
    /// Crowding penalty per extra occupant of the cell.
    pub crowding: f64,
    /// Share of energy exchanged in an interaction.
    pub coop_share: f64,
    /// Reputation step after an interaction.
    pub reputation_step: f64,
    /// Reputation lost by both sides of a mutual defection.
    pub defection_penalty: f64,
    /// Partners remembered before the oldest is decayed.
    pub memory: usize,
    /// Factor applied to the reputation of a forgotten partner.
    pub memory_decay: f64,
    /// Cooperation bias nudge per interaction.
    pub learning_step: f64,
    /// Steepness of the cooperation sigmoid.
    pub coop_steepness: f64,
    /// Partner-score bonus for sharing an institution.
    pub in_group_halo: f64,
    /// Half-width of the uniform partner-score noise.
    pub partner_noise: f64,
    /// Half-width of the uniform initial cooperation bias.
    pub initial_bias: f64,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            harvest_alpha: 0.45,
            crowding: 0.35,
            coop_share: 0.18,
            reputation_step: 0.2,
            defection_penalty: 0.05,
            memory: 10,
            memory_decay: 0.9,
            learning_step: 0.02,
            coop_steepness: 3.0,
            in_group_halo: 0.05,
            partner_noise: 0.05,
            initial_bias: 0.2,
        }
    }
}

// ---------------------------------------------------------------------------
// Governance
// ---------------------------------------------------------------------------

/// Fiscal, electoral, and churn rules of institutions.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GovernanceConfig {
    /// Found one institution at world init.
    pub initial_institution: bool,
    /// Tax rate, sanction, and bonus of the initial institution.
    pub initial_policy: f64,
    /// Chance that an initial social actor joins it.
    pub initial_join_chance: f64,
    /// Energy above which members are taxed.
    pub tax_baseline: f64,
    /// Energy below which members receive a stipend.
    pub distress_threshold: f64,
    /// Largest stipend per member per year.
    pub stipend: f64,
    /// Fraction of budget lost to administration each year.
    pub admin_leak: f64,
    /// Monitoring cost per member in the sanction probability.
    pub monitor_base: f64,
    /// Cooperation bias lost by a sanctioned exploiter.
    pub sanction_bias_penalty: f64,
    /// Years between votes.
    pub vote_every_years: u64,
    /// Half-width of the slate perturbation.
    pub slate_spread: f64,
    /// Upper bound of every policy parameter.
    pub policy_cap: f64,
    /// Budget floor for broke tracking.
    pub dissolve_min_budget: f64,
    /// Membership floor for broke tracking.
    pub dissolve_min_members: usize,
    /// Consecutive broke years before dissolution.
    pub dissolve_grace_years: u32,
    /// Years between cluster scans.
    pub scan_every_years: u64,
    /// Half-width in cells of the scan window.
    pub scan_radius: usize,
    /// Unaffiliated actors needed to found an institution.
    pub min_cluster: usize,
    /// Budget of a new institution.
    pub found_budget: f64,
    /// Central policy value of a new institution.
    pub found_policy: f64,
    /// Lower offset of a new institution's policy.
    pub found_policy_lo: f64,
    /// Upper offset of a new institution's policy.
    pub found_policy_hi: f64,
    /// Chance that a nearby unaffiliated actor joins a new institution.
    pub recruit_chance: f64,
    /// Fraction of stored energy lost each year.
    pub spoilage: f64,
    /// Members below this share of start energy may leave.
    pub leave_below: f64,
    /// Chance that a struggling member leaves.
    pub leave_chance: f64,
    /// Chance that an unaffiliated actor joins the richest institution.
    pub join_chance: f64,
    /// Budget brought by a joining actor.
    pub join_fee: f64,
    /// Chance that a replacement actor joins a random institution.
    pub newcomer_join_chance: f64,
    /// Budget brought by a joining replacement actor.
    pub newcomer_fee: f64,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            initial_institution: true,
            initial_policy: 0.12,
            initial_join_chance: 0.4,
            tax_baseline: 5.0,
            distress_threshold: 1.8,
            stipend: 0.4,
            admin_leak: 0.02,
            monitor_base: 0.02,
            sanction_bias_penalty: 0.03,
            vote_every_years: 50,
            slate_spread: 0.07,
            policy_cap: 0.35,
            dissolve_min_budget: 0.1,
            dissolve_min_members: 3,
            dissolve_grace_years: 20,
            scan_every_years: 5,
            scan_radius: 2,
            min_cluster: 10,
            found_budget: 1.0,
            found_policy: 0.1,
            found_policy_lo: -0.05,
            found_policy_hi: 0.1,
            recruit_chance: 0.7,
            spoilage: 0.05,
            leave_below: 0.4,
            leave_chance: 0.3,
            join_chance: 0.15,
            join_fee: 0.05,
            newcomer_join_chance: 0.25,
            newcomer_fee: 0.03,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn kind_defaults_match_their_roles() {
        let h = KindConfig::for_kind(AgentKind::Herbivore);
        let p = KindConfig::for_kind(AgentKind::Predator);
        assert_eq!(h.speed, 35.0);
        assert_eq!(p.sense, 60.0);
        assert!(p.reproduce_threshold > h.reproduce_threshold);
        assert_eq!(KindConfig::social().max_energy, 20.0);
    }

    #[test]
    fn partial_yaml_keeps_other_defaults() {
        let yaml = "herbivore:\n  cap: 40\n  speed: 20.0\npredator:\n  initial: 4\n";
        let kinds: KindsConfig = serde_yml::from_str(yaml).unwrap();
        assert_eq!(kinds.herbivore.cap, 40);
        assert_eq!(kinds.herbivore.speed, 20.0);
        assert_eq!(kinds.herbivore.sense, 40.0);
        assert_eq!(kinds.predator.initial, 4);
        assert_eq!(kinds.predator.speed, 45.0);
        assert_eq!(kinds.get(AgentKind::Social), &KindConfig::social());
    }

    #[test]
    fn governance_yaml_overrides() {
        let gov: GovernanceConfig = serde_yml::from_str("dissolve_grace_years: 3\n").unwrap();
        assert_eq!(gov.dissolve_grace_years, 3);
        assert_eq!(gov.tax_baseline, 5.0);
    }
}
