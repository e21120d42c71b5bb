//! Headless runner for the terrarium simulation.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `terrarium-config.yaml` (or the path in
//!    `TERRARIUM_CONFIG`), falling back to a built-in preset when absent
//! 2. Initialize structured logging (tracing)
//! 3. Build the world from the configuration
//! 4. Run `time.ticks` steps of `time.dt`, logging each closed year
//! 5. Print a JSON summary of the final state on stdout

mod error;

use std::io::Write as _;
use std::path::PathBuf;

use serde::Serialize;
use terrarium_core::{SimulationConfig, World};
use terrarium_types::{AnnalEvent, PoolReadings, Population, YearlyMetrics};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;

/// Default configuration file, relative to the working directory.
const CONFIG_FILE: &str = "terrarium-config.yaml";

/// Environment variable overriding [`CONFIG_FILE`].
const CONFIG_ENV: &str = "TERRARIUM_CONFIG";

/// Environment variable choosing the built-in preset when no file exists.
const PRESET_ENV: &str = "TERRARIUM_PRESET";

/// Final report written to stdout.
#[derive(Debug, Serialize)]
struct RunSummary<'a> {
    name: &'a str,
    seed: u64,
    ticks: u64,
    years: u64,
    pools: PoolReadings,
    population: Population,
    institutions: usize,
    moss_biomass: f64,
    plants: usize,
    latest: Option<&'a YearlyMetrics>,
    annals: &'a [AnnalEvent],
}

fn main() -> Result<(), EngineError> {
    // 1. Load configuration.
    let (config, source) = load_config()?;

    // 2. Initialize structured logging.
    init_logging(&config);
    info!("terrarium-engine starting");
    info!(
        source = %source,
        world_name = config.world.name,
        seed = config.world.seed,
        width = config.world.width,
        height = config.world.height,
        dt = config.time.dt,
        ticks = config.time.ticks,
        "Configuration loaded"
    );

    // 3. Build the world.
    let ticks = config.time.ticks;
    let dt = config.time.dt;
    let mut world = World::new(config)?;
    let population = world.population();
    info!(
        herbivores = population.herbivores,
        predators = population.predators,
        social = population.social,
        institutions = world.institutions().len(),
        "World created"
    );

    // 4. Run.
    for _ in 0..ticks {
        let summary = world.advance(dt);
        if summary.year_closed {
            if let Some(record) = world.metrics().latest() {
                info!(
                    tick = record.tick,
                    year = record.year,
                    cooperation_rate = record.cooperation_rate,
                    institutions = record.institutions,
                    average_energy = record.average_energy,
                    herbivores = record.population.herbivores,
                    predators = record.population.predators,
                    social = record.population.social,
                    "Year closed"
                );
            }
        }
    }
    info!(tick = world.tick(), pools = %world.pools(), "Run complete");

    // 5. Report.
    report(&world)?;
    info!("terrarium-engine shutdown complete");
    Ok(())
}

/// Install the tracing subscriber.
///
/// `RUST_LOG` wins over `logging.level`.
fn init_logging(config: &SimulationConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);
    if config.logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Load and validate the simulation configuration.
///
/// Returns the configuration together with a description of where it came
/// from. A missing file means the preset named by `TERRARIUM_PRESET`
/// (`terrarium` or `society`, default `terrarium`); an unreadable or invalid
/// file is an error.
fn load_config() -> Result<(SimulationConfig, String), EngineError> {
    let path = std::env::var_os(CONFIG_ENV)
        .map_or_else(|| PathBuf::from(CONFIG_FILE), PathBuf::from);
    if path.exists() {
        let config = SimulationConfig::from_file(&path)?;
        config.validate()?;
        Ok((config, path.display().to_string()))
    } else {
        let preset = std::env::var(PRESET_ENV).unwrap_or_default();
        match preset.as_str() {
            "society" => Ok((SimulationConfig::society(), "preset society".to_owned())),
            _ => Ok((SimulationConfig::terrarium(), "preset terrarium".to_owned())),
        }
    }
}

fn summarize(world: &World) -> RunSummary<'_> {
    let config = world.config();
    RunSummary {
        name: &config.world.name,
        seed: config.world.seed,
        ticks: world.tick(),
        years: world.year(),
        pools: world.pools(),
        population: world.population(),
        institutions: world.institutions().len(),
        moss_biomass: world.moss_biomass(),
        plants: world.plants().len(),
        latest: world.metrics().latest(),
        annals: world.annals(),
    }
}

fn report(world: &World) -> Result<(), EngineError> {
    let summary = summarize(world);
    let mut out = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, &summary)?;
    writeln!(out)?;
    Ok(())
}
