//! Global scalar pools of the sealed world.
//!
//! The [`Environment`] holds water, nutrients, oxygen, carbon dioxide,
//! temperature, and a cyclic light phase. Producers and consumers mutate
//! the pools through the `add_*` methods, which clamp every result to the
//! pool's closed interval.
//!
//! # Clamping
//!
//! Overshoot is never reported. The model is an approximate toy, so a pool
//! that would leave its interval simply sits at the bound.
//!
//! | Pool        | Lower   | Upper |
//! |-------------|---------|-------|
//! | water       | 0.2     | 1.0   |
//! | nutrients   | 0.0     | 1.0   |
//! | o2          | 0.05    | 0.35  |
//! | co2         | 0.0002  | 0.01  |
//! | temperature | -10.0   | 50.0  |
//!
//! # Light
//!
//! Illumination is the non-negative half of a sine wave over the phase:
//! `light = max(0, sin(2 pi phase))`. Noon sits at phase 0.25 and the whole
//! second half of the cycle is dark.

use serde::Deserialize;
use terrarium_types::PoolReadings;

/// Closed interval a pool is clamped to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoolBounds {
    /// Lower bound.
    pub lo: f64,
    /// Upper bound.
    pub hi: f64,
}

impl PoolBounds {
    /// Clamp a value into this interval.
    pub fn clamp(self, value: f64) -> f64 {
        Environment::clamp_pool(value, self.lo, self.hi)
    }

    /// Whether `value` lies inside the interval.
    pub fn contains(self, value: f64) -> bool {
        value >= self.lo && value <= self.hi
    }
}

/// Bounds of the water pool.
pub const WATER_BOUNDS: PoolBounds = PoolBounds { lo: 0.2, hi: 1.0 };
/// Bounds of the nutrient pool.
pub const NUTRIENT_BOUNDS: PoolBounds = PoolBounds { lo: 0.0, hi: 1.0 };
/// Bounds of the oxygen pool.
pub const O2_BOUNDS: PoolBounds = PoolBounds { lo: 0.05, hi: 0.35 };
/// Bounds of the carbon dioxide pool.
pub const CO2_BOUNDS: PoolBounds = PoolBounds { lo: 0.0002, hi: 0.01 };
/// Bounds of the temperature.
pub const TEMPERATURE_BOUNDS: PoolBounds = PoolBounds { lo: -10.0, hi: 50.0 };

/// Mean temperature of the daily wave.
const BASE_TEMPERATURE: f64 = 21.0;
/// Amplitude of the daily temperature wave.
const TEMPERATURE_SWING: f64 = 1.5;
/// Evaporation loss per unit time.
const WATER_LOSS: f64 = 0.000_01;
/// Condensation gain per unit time.
const WATER_GAIN: f64 = 0.000_005;

/// Initial pool levels, as read from configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EnvironmentParams {
    /// Initial water.
    pub water: f64,
    /// Initial nutrients.
    pub nutrients: f64,
    /// Initial oxygen.
    pub o2: f64,
    /// Initial carbon dioxide.
    pub co2: f64,
    /// Initial temperature.
    pub temperature: f64,
    /// Initial light phase in `[0, 1)`.
    pub light_phase: f64,
    /// Time units per full day-night cycle.
    pub day_length: f64,
}

impl Default for EnvironmentParams {
    fn default() -> Self {
        Self {
            water: 0.85,
            nutrients: 0.4,
            o2: 0.21,
            co2: 0.0006,
            temperature: 22.0,
            light_phase: 0.0,
            day_length: 120.0,
        }
    }
}

/// The global scalar pools, owned exclusively by the world.
#[derive(Debug, Clone, PartialEq)]
pub struct Environment {
    water: f64,
    nutrients: f64,
    o2: f64,
    co2: f64,
    temperature: f64,
    light_phase: f64,
    day_length: f64,
}

impl Environment {
    /// Build an environment from validated parameters.
    ///
    /// Initial levels outside their bounds are clamped like any update.
    pub fn new(params: &EnvironmentParams) -> Self {
        Self {
            water: WATER_BOUNDS.clamp(params.water),
            nutrients: NUTRIENT_BOUNDS.clamp(params.nutrients),
            o2: O2_BOUNDS.clamp(params.o2),
            co2: CO2_BOUNDS.clamp(params.co2),
            temperature: TEMPERATURE_BOUNDS.clamp(params.temperature),
            light_phase: wrap_phase(params.light_phase),
            day_length: params.day_length,
        }
    }

    /// Clamp `value` into `[lo, hi]`. NaN collapses to `lo`.
    pub fn clamp_pool(value: f64, lo: f64, hi: f64) -> f64 {
        if value.is_nan() { lo } else { value.clamp(lo, hi) }
    }

    /// Advance the light phase by `dt / day_length` and return the new
    /// illumination.
    pub fn advance_light(&mut self, dt: f64) -> f64 {
        if self.day_length > 0.0 {
            self.light_phase = wrap_phase(self.light_phase + dt / self.day_length);
        }
        self.light()
    }

    /// Current illumination in `[0, 1]`, without advancing the phase.
    pub fn light(&self) -> f64 {
        (std::f64::consts::TAU * self.light_phase).sin().max(0.0)
    }

    /// Current light phase in `[0, 1)`.
    pub const fn light_phase(&self) -> f64 {
        self.light_phase
    }

    /// Force the light phase (wrapped into `[0, 1)`).
    pub fn set_light_phase(&mut self, phase: f64) {
        self.light_phase = wrap_phase(phase);
    }

    /// Water pool.
    pub const fn water(&self) -> f64 {
        self.water
    }

    /// Nutrient pool.
    pub const fn nutrients(&self) -> f64 {
        self.nutrients
    }

    /// Oxygen pool.
    pub const fn o2(&self) -> f64 {
        self.o2
    }

    /// Carbon dioxide pool.
    pub const fn co2(&self) -> f64 {
        self.co2
    }

    /// Temperature in degrees Celsius.
    pub const fn temperature(&self) -> f64 {
        self.temperature
    }

    /// Add (or with a negative delta, remove) water.
    pub fn add_water(&mut self, delta: f64) {
        self.water = WATER_BOUNDS.clamp(self.water + delta);
    }

    /// Add or remove nutrients.
    pub fn add_nutrients(&mut self, delta: f64) {
        self.nutrients = NUTRIENT_BOUNDS.clamp(self.nutrients + delta);
    }

    /// Add or remove oxygen.
    pub fn add_o2(&mut self, delta: f64) {
        self.o2 = O2_BOUNDS.clamp(self.o2 + delta);
    }

    /// Add or remove carbon dioxide.
    pub fn add_co2(&mut self, delta: f64) {
        self.co2 = CO2_BOUNDS.clamp(self.co2 + delta);
    }

    /// Apply the sealed bottle's slow net water loss.
    pub fn leak_water(&mut self, dt: f64) {
        self.add_water((WATER_GAIN - WATER_LOSS) * dt);
    }

    /// Follow the daily temperature wave.
    pub fn update_temperature(&mut self) {
        let wave = (std::f64::consts::TAU * self.light_phase).sin();
        self.temperature = TEMPERATURE_BOUNDS.clamp(BASE_TEMPERATURE + TEMPERATURE_SWING * wave);
    }

    /// Respiration of one animal over `dt`.
    pub fn respire(&mut self, o2_use: f64, co2_release: f64, dt: f64) {
        self.add_o2(-o2_use * dt);
        self.add_co2(co2_release * dt);
    }

    /// Whether every pool lies within its declared interval.
    pub fn within_bounds(&self) -> bool {
        WATER_BOUNDS.contains(self.water)
            && NUTRIENT_BOUNDS.contains(self.nutrients)
            && O2_BOUNDS.contains(self.o2)
            && CO2_BOUNDS.contains(self.co2)
            && TEMPERATURE_BOUNDS.contains(self.temperature)
            && (0.0..1.0).contains(&self.light_phase)
    }

    /// Read-only copy of the pools for the HUD.
    pub fn readings(&self) -> PoolReadings {
        PoolReadings {
            light: self.light(),
            water: self.water,
            nutrients: self.nutrients,
            o2: self.o2,
            co2: self.co2,
            temperature: self.temperature,
        }
    }
}

fn wrap_phase(phase: f64) -> f64 {
    if !phase.is_finite() {
        return 0.0;
    }
    let wrapped = phase.rem_euclid(1.0);
    if wrapped >= 1.0 { 0.0 } else { wrapped }
}
