//! Primary producers: plant patches and the moss pool.
//!
//! Both producer kinds share the same scalar growth law, driven by
//! [`ProducerRates`]:
//!
//! ```text
//! growth      = g * light * nutrients * b * (1 - b) * dt
//! respiration = respiration * (1 - light) * b * dt
//! nutrients  -= uptake * light * dt * max(uptake_floor, b)
//! o2         += o2_gain * light * b * dt - o2_dark_loss * (1 - light) * dt
//! co2        += -co2_uptake * light * b * dt + co2_dark_gain * (1 - light) * dt
//! ```
//!
//! Plant patches live in a [`PlantBed`], which also handles reproduction
//! into nearby patches and senescence. The [`MossPool`] is a single
//! location-less biomass that is never removed.

use glam::DVec2;
use rand::Rng;
use serde::Deserialize;
use terrarium_types::PlantView;

use crate::environment::Environment;
use crate::sampling;
use crate::torus::Torus;

/// Rate constants of a producer's growth law.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ProducerRates {
    /// Growth coefficient `g`.
    pub growth: f64,
    /// Dark respiration coefficient.
    pub respiration: f64,
    /// Nutrient uptake per unit light and time.
    pub uptake: f64,
    /// Minimum biomass factor applied to nutrient uptake.
    pub uptake_floor: f64,
    /// Oxygen released per unit lit biomass.
    pub o2_gain: f64,
    /// Oxygen consumed per unit time in the dark.
    pub o2_dark_loss: f64,
    /// Carbon dioxide fixed per unit lit biomass.
    pub co2_uptake: f64,
    /// Carbon dioxide released per unit time in the dark.
    pub co2_dark_gain: f64,
}

impl ProducerRates {
    /// Rates of a single plant patch.
    pub const PATCH: Self = Self {
        growth: 0.12,
        respiration: 0.01,
        uptake: 0.02,
        uptake_floor: 0.2,
        o2_gain: 0.010,
        o2_dark_loss: 0.004,
        co2_uptake: 0.008,
        co2_dark_gain: 0.003,
    };

    /// Rates of the moss pool.
    pub const MOSS: Self = Self {
        growth: 0.15,
        respiration: 0.01,
        uptake: 0.02,
        uptake_floor: 1.0,
        o2_gain: 0.015,
        o2_dark_loss: 0.006,
        co2_uptake: 0.012,
        co2_dark_gain: 0.003,
    };

    /// Apply one growth step to `biomass` and the environment, returning the
    /// new biomass clamped to `[0, 1]`.
    pub fn apply(&self, biomass: f64, env: &mut Environment, dt: f64) -> f64 {
        let light = env.light();
        let b = biomass;
        let growth = self.growth * light * env.nutrients() * b * (1.0 - b) * dt;
        let resp = self.respiration * (1.0 - light) * b * dt;
        let next = Environment::clamp_pool(b + growth - resp, 0.0, 1.0);

        env.add_nutrients(-(self.uptake * light * dt * self.uptake_floor.max(next)));
        env.add_o2(self.o2_gain * light * next * dt - self.o2_dark_loss * (1.0 - light) * dt);
        env.add_co2(-self.co2_uptake * light * next * dt + self.co2_dark_gain * (1.0 - light) * dt);
        next
    }
}

/// Anything that photosynthesises into the shared environment.
pub trait Producer {
    /// Current biomass in `[0, 1]`.
    fn biomass(&self) -> f64;

    /// Grow or shrink for `dt`, exchanging gases and nutrients with `env`.
    fn update(&mut self, env: &mut Environment, dt: f64);
}

// ---------------------------------------------------------------------------
// Plant patches
// ---------------------------------------------------------------------------

/// A point producer at a fixed torus position.
#[derive(Debug, Clone, PartialEq)]
pub struct PlantPatch {
    pos: DVec2,
    biomass: f64,
    rates: ProducerRates,
}

impl PlantPatch {
    /// Create a patch. Biomass is clamped to `[0, 1]`.
    pub fn new(pos: DVec2, biomass: f64, rates: ProducerRates) -> Self {
        Self {
            pos,
            biomass: Environment::clamp_pool(biomass, 0.0, 1.0),
            rates,
        }
    }

    /// Position on the torus.
    pub const fn pos(&self) -> DVec2 {
        self.pos
    }

    /// Render record.
    pub const fn view(&self) -> PlantView {
        PlantView {
            x: self.pos.x,
            y: self.pos.y,
            biomass: self.biomass,
        }
    }
}

impl Producer for PlantPatch {
    fn biomass(&self) -> f64 {
        self.biomass
    }

    fn update(&mut self, env: &mut Environment, dt: f64) {
        self.biomass = self.rates.apply(self.biomass, env, dt);
    }
}

/// Configuration of the plant bed.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PlantParams {
    /// Patches created at world init.
    pub initial: usize,
    /// Hard cap on live patches.
    pub cap: usize,
    /// Lower bound of initial patch biomass.
    pub init_min: f64,
    /// Upper bound of initial patch biomass.
    pub init_max: f64,
    /// Growth law of every patch.
    pub rates: ProducerRates,
    /// Biomass a patch must exceed to reproduce.
    pub reproduce_above: f64,
    /// Reproduction probability per unit time.
    pub reproduce_rate: f64,
    /// Maximum offset of a child along each axis.
    pub spread: f64,
    /// Biomass of a new patch.
    pub seed_biomass: f64,
    /// Factor applied to the parent's biomass after reproducing.
    pub parent_factor: f64,
    /// Patches at or below this biomass die.
    pub senescence: f64,
    /// Nutrients returned by a dying patch.
    pub recycle: f64,
}

impl Default for PlantParams {
    fn default() -> Self {
        Self {
            initial: 3,
            cap: 20,
            init_min: 0.25,
            init_max: 0.45,
            rates: ProducerRates::PATCH,
            reproduce_above: 0.6,
            reproduce_rate: 0.02,
            spread: 30.0,
            seed_biomass: 0.2,
            parent_factor: 0.85,
            senescence: 0.02,
            recycle: 0.05,
        }
    }
}

/// Births and deaths of one plant bed update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BedReport {
    /// New patches spawned.
    pub births: usize,
    /// Patches removed by senescence.
    pub deaths: usize,
}

/// The collection of plant patches.
#[derive(Debug, Clone, PartialEq)]
pub struct PlantBed {
    patches: Vec<PlantPatch>,
    params: PlantParams,
}

impl PlantBed {
    /// Scatter `params.initial` patches uniformly over the torus.
    pub fn seeded<R: Rng + ?Sized>(torus: &Torus, params: &PlantParams, rng: &mut R) -> Self {
        let count = params.initial.min(params.cap);
        let patches = (0..count)
            .map(|_| {
                let pos = torus.random_point(rng);
                let biomass = sampling::uniform(rng, params.init_min, params.init_max);
                PlantPatch::new(pos, biomass, params.rates)
            })
            .collect();
        Self {
            patches,
            params: params.clone(),
        }
    }

    /// An empty bed.
    pub fn empty(params: &PlantParams) -> Self {
        Self {
            patches: Vec::new(),
            params: params.clone(),
        }
    }

    /// Live patches.
    pub fn patches(&self) -> &[PlantPatch] {
        &self.patches
    }

    /// Number of live patches.
    pub fn len(&self) -> usize {
        self.patches.len()
    }

    /// Whether no patch is alive.
    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    /// Summed biomass of all patches.
    pub fn total_biomass(&self) -> f64 {
        self.patches.iter().map(Producer::biomass).sum()
    }

    /// Add a patch if the cap allows. Returns whether it was added.
    pub fn plant(&mut self, pos: DVec2, biomass: f64) -> bool {
        if self.patches.len() >= self.params.cap {
            return false;
        }
        self.patches.push(PlantPatch::new(pos, biomass, self.params.rates));
        true
    }

    /// Grow every patch, then let large patches reproduce and tiny ones die.
    ///
    /// Patches spawned during this call are not updated until the next one.
    pub fn update<R: Rng + ?Sized>(
        &mut self,
        env: &mut Environment,
        torus: &Torus,
        dt: f64,
        rng: &mut R,
    ) -> BedReport {
        let params = &self.params;
        let mut live = self.patches.len();
        let mut newborn = Vec::new();
        let mut report = BedReport::default();

        self.patches.retain_mut(|patch| {
            patch.update(env, dt);
            if patch.biomass > params.reproduce_above
                && live < params.cap
                && sampling::chance(rng, params.reproduce_rate * dt)
            {
                let offset = DVec2::new(
                    sampling::uniform(rng, -params.spread, params.spread),
                    sampling::uniform(rng, -params.spread, params.spread),
                );
                let pos = torus.wrap(patch.pos + offset);
                newborn.push(PlantPatch::new(pos, params.seed_biomass, params.rates));
                patch.biomass *= params.parent_factor;
                live += 1;
                report.births += 1;
            }
            if patch.biomass <= params.senescence {
                env.add_nutrients(params.recycle);
                live = live.saturating_sub(1);
                report.deaths += 1;
                return false;
            }
            true
        });

        self.patches.extend(newborn);
        report
    }

    /// Render records of all patches.
    pub fn views(&self) -> Vec<PlantView> {
        self.patches.iter().map(PlantPatch::view).collect()
    }
}

// ---------------------------------------------------------------------------
// Moss pool
// ---------------------------------------------------------------------------

/// Configuration of the moss pool.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MossParams {
    /// Whether the pool exists at all.
    pub enabled: bool,
    /// Initial biomass.
    pub biomass: f64,
    /// Growth law.
    pub rates: ProducerRates,
}

impl Default for MossParams {
    fn default() -> Self {
        Self {
            enabled: true,
            biomass: 0.3,
            rates: ProducerRates::MOSS,
        }
    }
}

/// A single scalar producer with no location.
#[derive(Debug, Clone, PartialEq)]
pub struct MossPool {
    biomass: f64,
    rates: ProducerRates,
}

impl MossPool {
    /// Create the pool from its configuration.
    pub fn new(params: &MossParams) -> Self {
        Self {
            biomass: Environment::clamp_pool(params.biomass, 0.0, 1.0),
            rates: params.rates,
        }
    }
}

impl Producer for MossPool {
    fn biomass(&self) -> f64 {
        self.biomass
    }

    fn update(&mut self, env: &mut Environment, dt: f64) {
        self.biomass = self.rates.apply(self.biomass, env, dt);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;
    use crate::environment::EnvironmentParams;

    fn lit_env() -> Environment {
        let mut env = Environment::new(&EnvironmentParams::default());
        env.set_light_phase(0.25);
        env
    }

    #[test]
    fn patch_grows_in_light() {
        let mut env = lit_env();
        let mut patch = PlantPatch::new(DVec2::ZERO, 0.3, ProducerRates::PATCH);
        patch.update(&mut env, 1.0);
        // 0.12 * 1 * 0.4 * 0.3 * 0.7
        assert!((patch.biomass() - (0.3 + 0.010_08)).abs() < 1e-12);
        assert!(env.o2() > 0.21);
        assert!(env.nutrients() < 0.4);
    }

    #[test]
    fn moss_respires_in_the_dark() {
        let mut env = lit_env();
        env.set_light_phase(0.75);
        let mut moss = MossPool::new(&MossParams::default());
        moss.update(&mut env, 1.0);
        assert!((moss.biomass() - 0.297).abs() < 1e-12);
        assert!(env.o2() < 0.21);
        assert!(env.co2() > 0.0006);
        // No uptake without light.
        assert_eq!(env.nutrients(), 0.4);
    }

    #[test]
    fn senescent_patch_recycles_nutrients() {
        let mut rng = SmallRng::seed_from_u64(1);
        let torus = Torus::new(100.0, 100.0).unwrap();
        let mut env = lit_env();
        env.set_light_phase(0.75);
        let mut bed = PlantBed::empty(&PlantParams::default());
        assert!(bed.plant(DVec2::new(10.0, 10.0), 0.01));
        let before = env.nutrients();
        let report = bed.update(&mut env, &torus, 1.0, &mut rng);
        assert_eq!(report.deaths, 1);
        assert!(bed.is_empty());
        assert!((env.nutrients() - (before + 0.05)).abs() < 1e-12);
    }

    #[test]
    fn large_patch_reproduces_nearby() {
        let mut rng = SmallRng::seed_from_u64(2);
        let torus = Torus::new(100.0, 100.0).unwrap();
        let mut env = lit_env();
        let params = PlantParams {
            reproduce_rate: 100.0,
            ..PlantParams::default()
        };
        let mut bed = PlantBed::empty(&params);
        assert!(bed.plant(DVec2::new(1.0, 1.0), 0.9));
        let report = bed.update(&mut env, &torus, 1.0, &mut rng);
        assert_eq!(report.births, 1);
        assert_eq!(bed.len(), 2);
        let parent = &bed.patches()[0];
        let child = &bed.patches()[1];
        assert!(parent.biomass() < 0.9 * 0.85 + 0.01);
        assert_eq!(child.biomass(), 0.2);
        assert!(torus.contains(child.pos()));
        assert!(torus.distance(parent.pos(), child.pos()) <= 30.0 * 2.0_f64.sqrt() + 1e-9);
    }

    #[test]
    fn bed_respects_cap() {
        let mut rng = SmallRng::seed_from_u64(3);
        let torus = Torus::new(100.0, 100.0).unwrap();
        let mut env = lit_env();
        let params = PlantParams {
            cap: 4,
            reproduce_rate: 100.0,
            ..PlantParams::default()
        };
        let mut bed = PlantBed::empty(&params);
        for i in 0..4 {
            assert!(bed.plant(DVec2::new(f64::from(i), 0.0), 0.95));
        }
        assert!(!bed.plant(DVec2::ZERO, 0.5));
        for _ in 0..20 {
            let _ = bed.update(&mut env, &torus, 1.0, &mut rng);
            assert!(bed.len() <= 4);
        }
    }
}
