//! Feeding, respiration, and metabolism.

use glam::DVec2;
use terrarium_world::{Environment, ResourceField, Torus};

use crate::agent::Agent;
use crate::config::{EcologyConfig, InteractionConfig, KindConfig};

/// Herbivore grazing: eat up to `graze_rate * dt` from the cell underfoot
/// and convert it to energy. Returns the biomass actually eaten.
pub fn graze(
    agent: &mut Agent,
    field: &mut ResourceField,
    params: &KindConfig,
    cfg: &EcologyConfig,
    dt: f64,
) -> f64 {
    let taken = field.eat(agent.pos, cfg.graze_rate * dt);
    agent.gain(taken * cfg.graze_yield, params.max_energy);
    taken
}

/// Whether a hunter of `hunter_size` at `hunter_pos` is close enough to
/// seize prey of `prey_size` at `prey_pos`.
pub fn within_capture(
    torus: &Torus,
    hunter_pos: DVec2,
    hunter_size: f64,
    prey_pos: DVec2,
    prey_size: f64,
    cfg: &EcologyConfig,
) -> bool {
    torus.distance(hunter_pos, prey_pos) < hunter_size + prey_size + cfg.capture_margin
}

/// Kill `prey` and credit the hunter. The prey's energy is set to `-1` so
/// it fails the alive invariant until the world culls it.
pub fn devour(hunter: &mut Agent, prey: &mut Agent, params: &KindConfig, cfg: &EcologyConfig) {
    hunter.gain(cfg.hunt_gain, params.max_energy);
    prey.energy = -1.0;
}

/// Gas exchange of one breathing animal.
pub fn respire(env: &mut Environment, cfg: &EcologyConfig, dt: f64) {
    env.respire(cfg.respire_o2, cfg.respire_co2, dt);
}

/// Burn `(metabolism + metabolism_per_energy * energy) * dt` and age by `dt`.
pub fn metabolize(agent: &mut Agent, params: &KindConfig, dt: f64) {
    let burn = (params.metabolism + params.metabolism_per_energy * agent.energy) * dt;
    agent.energy -= burn;
    agent.age += dt;
}

/// Social harvest: take `alpha * x / (1 + crowding * max(0, crowd - 1))`
/// energy units from the actor's cell, where `x` is the cell's content in
/// energy units (`value * resource_scale`). Never takes more than the cell
/// holds. Returns the energy harvested.
pub fn harvest(
    agent: &mut Agent,
    field: &mut ResourceField,
    crowd: usize,
    resource_scale: f64,
    params: &KindConfig,
    cfg: &InteractionConfig,
) -> f64 {
    if resource_scale <= 0.0 {
        return 0.0;
    }
    let available = field.sample(agent.pos) * resource_scale;
    let extra = crowd_penalty(crowd);
    let want = (cfg.harvest_alpha * available / (1.0 + cfg.crowding * extra)).min(available);
    let taken = field.eat(agent.pos, want / resource_scale) * resource_scale;
    agent.gain(taken, params.max_energy);
    taken
}

#[allow(clippy::cast_precision_loss)]
fn crowd_penalty(crowd: usize) -> f64 {
    crowd.saturating_sub(1) as f64
}
