//! Configuration loading and typed config structures for the Terrarium
//! simulation.
//!
//! The canonical configuration lives in `terrarium-config.yaml` at the
//! project root. This module defines strongly-typed structs that mirror the
//! YAML structure, a loader, and [`SimulationConfig::validate`], which every
//! world runs before it is built.
//!
//! Two presets cover the two models the engine hosts:
//! [`SimulationConfig::terrarium`] (the sealed-bottle ecosystem, also the
//! [`Default`]) and [`SimulationConfig::society`] (the persistent society on
//! an abstract logistic resource).

use std::path::Path;

use serde::Deserialize;
use terrarium_agents::{EcologyConfig, GovernanceConfig, InteractionConfig, KindConfig, KindsConfig};
use terrarium_types::AgentKind;
use terrarium_world::{
    DroughtParams, EnvironmentParams, FieldParams, GrowthModel, MossParams, PlantParams, WorldError,
};

use crate::clock::ClockError;

/// Errors that can occur when loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value is outside its admissible range.
    #[error("invalid config value `{field}`: {reason}")]
    Invalid {
        /// Dotted path of the offending key.
        field: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The world geometry could not be built.
    #[error("invalid world geometry: {source}")]
    Geometry {
        /// The underlying world error.
        #[from]
        source: WorldError,
    },

    /// The clock rejected the time settings.
    #[error("invalid time settings: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: ClockError,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field: field.to_owned(),
        reason: reason.into(),
    }
}

/// Top-level simulation configuration.
///
/// Mirrors the structure of `terrarium-config.yaml`. Every section is
/// optional; missing sections and keys take the terrarium defaults.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// World name, seed, and dimensions.
    #[serde(default)]
    pub world: WorldConfig,

    /// Time step, run length, and year length.
    #[serde(default)]
    pub time: TimeConfig,

    /// Initial environment pools and day length.
    #[serde(default)]
    pub environment: EnvironmentParams,

    /// Resource field grid and growth law.
    #[serde(default)]
    pub field: FieldParams,

    /// Plant patches.
    #[serde(default)]
    pub plants: PlantParams,

    /// Moss pool.
    #[serde(default)]
    pub moss: MossParams,

    /// Regional drought shocks.
    #[serde(default)]
    pub drought: DroughtParams,

    /// Per-kind agent parameters (`herbivore`, `predator`, `social`).
    #[serde(default)]
    pub agents: KindsConfig,

    /// Animal steering, feeding, and respiration.
    #[serde(default)]
    pub ecology: EcologyConfig,

    /// Social harvest and pairwise interaction.
    #[serde(default)]
    pub interaction: InteractionConfig,

    /// Institutions.
    #[serde(default)]
    pub governance: GovernanceConfig,

    /// Metrics collection.
    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_yml::from_str(&contents)?;
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yml::from_str(yaml)?;
        Ok(config)
    }

    /// The sealed-bottle ecosystem: algae field, plant patches, moss, and
    /// grazing herbivores under a day-night cycle.
    pub fn terrarium() -> Self {
        Self::default()
    }

    /// The persistent society: social actors on a 40x40 logistic resource
    /// grid with institutions, one tick per time unit.
    pub fn society() -> Self {
        let mut agents = KindsConfig::default();
        agents.herbivore.initial = 0;
        agents.social.initial = 300;
        Self {
            world: WorldConfig {
                name: "Persistent Society".to_owned(),
                width: 40.0,
                height: 40.0,
                ..WorldConfig::default()
            },
            time: TimeConfig {
                dt: 1.0,
                ticks: 20_000,
                year_ticks: default_year_ticks(),
            },
            field: FieldParams {
                cell_size: 1.0,
                growth_model: GrowthModel::Logistic,
                r_max: 0.12,
                diffusion: 0.0,
                init_level: 0.5,
                init_jitter: 0.0,
                ..FieldParams::default()
            },
            plants: PlantParams {
                initial: 0,
                ..PlantParams::default()
            },
            moss: MossParams {
                enabled: false,
                ..MossParams::default()
            },
            agents,
            ..Self::default()
        }
    }

    /// Check every value the world relies on.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_geometry()?;
        self.validate_environment()?;
        self.validate_producers()?;
        for kind in AgentKind::ALL {
            validate_kind(kind, self.agents.get(kind))?;
        }
        self.validate_rates()?;
        if self.metrics.window == 0 {
            return Err(invalid("metrics.window", "must be at least 1"));
        }
        Ok(())
    }

    fn validate_geometry(&self) -> Result<(), ConfigError> {
        positive("world.width", self.world.width)?;
        positive("world.height", self.world.height)?;
        positive("field.cell_size", self.field.cell_size)?;
        if self.field.cell_size > self.world.width.min(self.world.height) {
            return Err(invalid(
                "field.cell_size",
                "larger than the world; the grid would have no cells",
            ));
        }
        if self.time.year_ticks == 0 {
            return Err(invalid("time.year_ticks", "must be at least 1"));
        }
        if !self.time.dt.is_finite() || self.time.dt < 0.0 {
            return Err(invalid("time.dt", "must be finite and non-negative"));
        }
        Ok(())
    }

    fn validate_environment(&self) -> Result<(), ConfigError> {
        let env = &self.environment;
        positive("environment.day_length", env.day_length)?;
        finite("environment.water", env.water)?;
        finite("environment.nutrients", env.nutrients)?;
        finite("environment.o2", env.o2)?;
        finite("environment.co2", env.co2)?;
        finite("environment.temperature", env.temperature)?;
        finite("environment.light_phase", env.light_phase)
    }

    fn validate_producers(&self) -> Result<(), ConfigError> {
        let field = &self.field;
        for (key, value) in [
            ("field.r_max", field.r_max),
            ("field.dark_respiration", field.dark_respiration),
            ("field.diffusion", field.diffusion),
            ("field.init_jitter", field.init_jitter),
            ("field.spore_boost", field.spore_boost),
            ("field.resource_scale", field.resource_scale),
        ] {
            non_negative(key, value)?;
        }
        probability("field.init_level", field.init_level)?;
        probability("field.spore_rate", field.spore_rate)?;

        let plants = &self.plants;
        if plants.initial > plants.cap {
            return Err(invalid("plants.initial", "exceeds plants.cap"));
        }
        probability("plants.init_min", plants.init_min)?;
        probability("plants.init_max", plants.init_max)?;
        if plants.init_min > plants.init_max {
            return Err(invalid("plants.init_min", "exceeds plants.init_max"));
        }
        probability("plants.reproduce_rate", plants.reproduce_rate)?;
        probability("plants.parent_factor", plants.parent_factor)?;
        non_negative("plants.spread", plants.spread)?;
        probability("moss.biomass", self.moss.biomass)
    }

    fn validate_rates(&self) -> Result<(), ConfigError> {
        let eco = &self.ecology;
        probability("ecology.twitch_chance", eco.twitch_chance)?;
        for (key, value) in [
            ("ecology.inertia", eco.inertia),
            ("ecology.jitter", eco.jitter),
            ("ecology.bias", eco.bias),
            ("ecology.twitch_degrees", eco.twitch_degrees),
            ("ecology.graze_rate", eco.graze_rate),
            ("ecology.graze_yield", eco.graze_yield),
            ("ecology.hunt_gain", eco.hunt_gain),
            ("ecology.capture_margin", eco.capture_margin),
            ("ecology.respire_o2", eco.respire_o2),
            ("ecology.respire_co2", eco.respire_co2),
            ("ecology.death_recycle", eco.death_recycle),
        ] {
            non_negative(key, value)?;
        }

        let int = &self.interaction;
        probability("interaction.harvest_alpha", int.harvest_alpha)?;
        probability("interaction.coop_share", int.coop_share)?;
        probability("interaction.memory_decay", int.memory_decay)?;
        for (key, value) in [
            ("interaction.crowding", int.crowding),
            ("interaction.reputation_step", int.reputation_step),
            ("interaction.defection_penalty", int.defection_penalty),
            ("interaction.learning_step", int.learning_step),
            ("interaction.coop_steepness", int.coop_steepness),
            ("interaction.in_group_halo", int.in_group_halo),
            ("interaction.partner_noise", int.partner_noise),
            ("interaction.initial_bias", int.initial_bias),
        ] {
            non_negative(key, value)?;
        }

        let gov = &self.governance;
        for (key, value) in [
            ("governance.initial_join_chance", gov.initial_join_chance),
            ("governance.admin_leak", gov.admin_leak),
            ("governance.recruit_chance", gov.recruit_chance),
            ("governance.spoilage", gov.spoilage),
            ("governance.leave_chance", gov.leave_chance),
            ("governance.join_chance", gov.join_chance),
            ("governance.newcomer_join_chance", gov.newcomer_join_chance),
        ] {
            probability(key, value)?;
        }
        for (key, value) in [
            ("governance.initial_policy", gov.initial_policy),
            ("governance.tax_baseline", gov.tax_baseline),
            ("governance.distress_threshold", gov.distress_threshold),
            ("governance.stipend", gov.stipend),
            ("governance.monitor_base", gov.monitor_base),
            ("governance.sanction_bias_penalty", gov.sanction_bias_penalty),
            ("governance.slate_spread", gov.slate_spread),
            ("governance.policy_cap", gov.policy_cap),
            ("governance.dissolve_min_budget", gov.dissolve_min_budget),
            ("governance.found_budget", gov.found_budget),
            ("governance.leave_below", gov.leave_below),
            ("governance.join_fee", gov.join_fee),
            ("governance.newcomer_fee", gov.newcomer_fee),
        ] {
            non_negative(key, value)?;
        }
        finite("governance.found_policy", gov.found_policy)?;
        finite("governance.found_policy_lo", gov.found_policy_lo)?;
        finite("governance.found_policy_hi", gov.found_policy_hi)?;
        if gov.found_policy_lo > gov.found_policy_hi {
            return Err(invalid(
                "governance.found_policy_lo",
                "exceeds governance.found_policy_hi",
            ));
        }
        if gov.initial_policy > gov.policy_cap {
            return Err(invalid(
                "governance.initial_policy",
                "exceeds governance.policy_cap",
            ));
        }
        if gov.min_cluster == 0 {
            return Err(invalid("governance.min_cluster", "must be at least 1"));
        }
        Ok(())
    }
}

fn validate_kind(kind: AgentKind, params: &KindConfig) -> Result<(), ConfigError> {
    let key = |name: &str| format!("agents.{}.{name}", kind.label());
    if params.initial > params.cap {
        return Err(invalid(&key("initial"), "exceeds the population cap"));
    }
    for (name, value) in [
        ("speed", params.speed),
        ("sense", params.sense),
        ("size", params.size),
        ("child_energy", params.child_energy),
        ("parent_factor", params.parent_factor),
        ("mate_distance", params.mate_distance),
        ("metabolism", params.metabolism),
        ("metabolism_per_energy", params.metabolism_per_energy),
    ] {
        non_negative(&key(name), value)?;
    }
    positive(&key("start_energy"), params.start_energy)?;
    positive(&key("max_energy"), params.max_energy)?;
    positive(&key("max_age_min"), params.max_age_min)?;
    finite(&key("max_age_max"), params.max_age_max)?;
    finite(&key("reproduce_threshold"), params.reproduce_threshold)?;
    if params.max_age_min > params.max_age_max {
        return Err(invalid(&key("max_age_min"), "exceeds max_age_max"));
    }
    Ok(())
}

fn finite(field: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(invalid(field, format!("must be finite, got {value}")))
    }
}

fn non_negative(field: &str, value: f64) -> Result<(), ConfigError> {
    finite(field, value)?;
    if value < 0.0 {
        return Err(invalid(field, format!("must not be negative, got {value}")));
    }
    Ok(())
}

fn positive(field: &str, value: f64) -> Result<(), ConfigError> {
    finite(field, value)?;
    if value <= 0.0 {
        return Err(invalid(field, format!("must be positive, got {value}")));
    }
    Ok(())
}

fn probability(field: &str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(invalid(field, format!("must lie in [0, 1], got {value}")))
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// World-level configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WorldConfig {
    /// Human-readable simulation name.
    #[serde(default = "default_world_name")]
    pub name: String,

    /// Random seed for reproducibility.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Torus width in world units.
    #[serde(default = "default_width")]
    pub width: f64,

    /// Torus height in world units.
    #[serde(default = "default_height")]
    pub height: f64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            name: default_world_name(),
            seed: default_seed(),
            width: default_width(),
            height: default_height(),
        }
    }
}

/// Time configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TimeConfig {
    /// Time units advanced by one tick.
    #[serde(default = "default_dt")]
    pub dt: f64,

    /// Ticks the headless runner executes.
    #[serde(default = "default_ticks")]
    pub ticks: u64,

    /// Ticks per simulated year.
    #[serde(default = "default_year_ticks")]
    pub year_ticks: u64,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            dt: default_dt(),
            ticks: default_ticks(),
            year_ticks: default_year_ticks(),
        }
    }
}

/// Metrics configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MetricsConfig {
    /// Interaction outcomes kept in the rolling cooperation window.
    #[serde(default = "default_window")]
    pub window: usize,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            window: default_window(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

fn default_world_name() -> String {
    "Terrarium".to_owned()
}

const fn default_seed() -> u64 {
    42
}

const fn default_width() -> f64 {
    900.0
}

const fn default_height() -> f64 {
    700.0
}

const fn default_dt() -> f64 {
    0.05
}

const fn default_ticks() -> u64 {
    20_000
}

const fn default_year_ticks() -> u64 {
    10
}

const fn default_window() -> usize {
    2000
}

fn default_log_level() -> String {
    "info".to_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = SimulationConfig::default();
        assert_eq!(config.world.seed, 42);
        assert_eq!(config.world.width, 900.0);
        assert_eq!(config.time.year_ticks, 10);
        assert_eq!(config.agents.herbivore.initial, 25);
        assert_eq!(config.metrics.window, 2000);
        config.validate().unwrap();
    }

    #[test]
    fn society_preset_is_valid() {
        let config = SimulationConfig::society();
        config.validate().unwrap();
        assert_eq!(config.field.growth_model, GrowthModel::Logistic);
        assert_eq!(config.agents.social.initial, 300);
        assert_eq!(config.agents.herbivore.initial, 0);
        assert!(!config.moss.enabled);
    }

    #[test]
    fn parse_partial_yaml() {
        let yaml = r"
world:
  seed: 7
  width: 200.0
time:
  dt: 0.1
agents:
  predator:
    initial: 3
governance:
  dissolve_grace_years: 4
logging:
  level: debug
";
        let config = SimulationConfig::parse(yaml).unwrap();
        assert_eq!(config.world.seed, 7);
        assert_eq!(config.world.width, 200.0);
        assert_eq!(config.world.height, 700.0);
        assert_eq!(config.time.dt, 0.1);
        assert_eq!(config.time.year_ticks, 10);
        assert_eq!(config.agents.predator.initial, 3);
        assert_eq!(config.agents.predator.speed, 45.0);
        assert_eq!(config.governance.dissolve_grace_years, 4);
        assert_eq!(config.logging.level, "debug");
        config.validate().unwrap();
    }

    #[test]
    fn parse_empty_yaml_gives_defaults() {
        let config = SimulationConfig::parse("{}").unwrap();
        assert_eq!(config, SimulationConfig::default());
    }

    #[test]
    fn parse_rejects_garbage() {
        let err = SimulationConfig::parse("world: [1, 2").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml { .. }));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = SimulationConfig::from_file(Path::new("/nonexistent/terrarium.yaml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    fn rejected(config: &SimulationConfig) -> String {
        match config.validate() {
            Err(ConfigError::Invalid { field, .. }) => field,
            _ => String::new(),
        }
    }

    #[test]
    fn validate_rejects_bad_geometry() {
        let mut config = SimulationConfig::default();
        config.world.width = 0.0;
        assert_eq!(rejected(&config), "world.width");

        let mut config = SimulationConfig::default();
        config.field.cell_size = 1000.0;
        assert_eq!(rejected(&config), "field.cell_size");

        let mut config = SimulationConfig::default();
        config.time.year_ticks = 0;
        assert_eq!(rejected(&config), "time.year_ticks");

        let mut config = SimulationConfig::default();
        config.environment.day_length = 0.0;
        assert_eq!(rejected(&config), "environment.day_length");
    }

    #[test]
    fn validate_rejects_counts_above_caps() {
        let mut config = SimulationConfig::default();
        config.agents.herbivore.initial = 101;
        assert_eq!(rejected(&config), "agents.herbivore.initial");

        let mut config = SimulationConfig::default();
        config.plants.initial = 21;
        assert_eq!(rejected(&config), "plants.initial");
    }

    #[test]
    fn validate_rejects_bad_probabilities_and_non_finite_values() {
        let mut config = SimulationConfig::default();
        config.governance.join_chance = 1.5;
        assert_eq!(rejected(&config), "governance.join_chance");

        let mut config = SimulationConfig::default();
        config.ecology.twitch_chance = -0.1;
        assert_eq!(rejected(&config), "ecology.twitch_chance");

        let mut config = SimulationConfig::default();
        config.environment.o2 = f64::NAN;
        assert_eq!(rejected(&config), "environment.o2");

        let mut config = SimulationConfig::default();
        config.agents.social.metabolism = f64::INFINITY;
        assert_eq!(rejected(&config), "agents.social.metabolism");
    }

    #[test]
    fn validate_rejects_initial_policy_above_cap() {
        let mut config = SimulationConfig::society();
        config.governance.initial_policy = 0.9;
        assert_eq!(rejected(&config), "governance.initial_policy");

        config.governance.policy_cap = 0.9;
        assert!(config.validate().is_ok());
    }
}
