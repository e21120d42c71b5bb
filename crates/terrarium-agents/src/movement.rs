//! Steering for animals and hill climbing for social actors.
//!
//! Animals perform a biased random walk: the new velocity blends the old
//! heading, a random jitter, and a bias vector (toward food for herbivores,
//! toward prey for predators), with an occasional random twitch. Social
//! actors step to the richest neighbouring cell of the resource field.

use glam::DVec2;
use rand::Rng;
use terrarium_world::{ResourceField, Torus, sampling};

use crate::agent::Agent;
use crate::config::EcologyConfig;

/// Canonical direction used when a steering vector degenerates to zero.
pub const CANONICAL_DIRECTION: DVec2 = DVec2::X;

/// Move an animal one step along its blended heading.
///
/// The resulting velocity has length `speed` (or points along
/// [`CANONICAL_DIRECTION`] if the blend cancelled out). The position wraps.
pub fn steer<R: Rng + ?Sized>(
    agent: &mut Agent,
    bias: DVec2,
    speed: f64,
    dt: f64,
    torus: &Torus,
    cfg: &EcologyConfig,
    rng: &mut R,
) {
    let mut v = agent.vel * cfg.inertia + sampling::jitter(rng) * cfg.jitter + bias * cfg.bias;
    if sampling::chance(rng, cfg.twitch_chance) {
        let degrees = sampling::uniform(rng, -cfg.twitch_degrees, cfg.twitch_degrees);
        v = DVec2::from_angle(degrees.to_radians()).rotate(v);
    }
    let heading = v.try_normalize().unwrap_or(CANONICAL_DIRECTION);
    let v = heading * speed;
    agent.pos = torus.wrap(agent.pos + v * dt);
    agent.vel = v;
}

/// Probe `probes` random directions at distance `sense` and return the one
/// over the richest cell. The first direction found wins ties; a field with
/// nothing better than `-1` everywhere is impossible, so some direction is
/// always returned when `probes > 0`.
pub fn forage_bias<R: Rng + ?Sized>(
    pos: DVec2,
    sense: f64,
    probes: usize,
    field: &ResourceField,
    rng: &mut R,
) -> DVec2 {
    let mut best_dir = DVec2::ZERO;
    let mut best = -1.0;
    for _ in 0..probes {
        let d = sampling::unit_direction(rng);
        let value = field.sample(pos + d * sense);
        if value > best {
            best = value;
            best_dir = d;
        }
    }
    best_dir
}

/// Nearest prey strictly within `sense`, as an index into `prey` and a unit
/// direction toward it along the shortest torus path.
///
/// Ties keep the first prey found.
pub fn hunt_bias<I>(pos: DVec2, sense: f64, prey: I, torus: &Torus) -> Option<(usize, DVec2)>
where
    I: IntoIterator<Item = (usize, DVec2)>,
{
    let mut best_d2 = sense * sense;
    let mut target = None;
    for (idx, prey_pos) in prey {
        let d2 = torus.distance_squared(pos, prey_pos);
        if d2 < best_d2 {
            best_d2 = d2;
            target = Some((idx, prey_pos));
        }
    }
    target.map(|(idx, prey_pos)| {
        let dir = torus.delta(pos, prey_pos).try_normalize().unwrap_or(DVec2::ZERO);
        (idx, dir)
    })
}

/// The cell a social actor at `(row, col)` moves to: the richest of its
/// eight neighbours if strictly richer than the current cell, otherwise
/// the current cell.
pub fn hill_climb(field: &ResourceField, row: usize, col: usize) -> (usize, usize) {
    let mut best = (row, col);
    let mut best_value = field.get(row, col);
    for (r, c) in field.neighbors8(row, col) {
        let value = field.get(r, c);
        if value > best_value {
            best = (r, c);
            best_value = value;
        }
    }
    best
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use terrarium_types::AgentId;

    use super::*;
    use crate::agent::Behavior;
    use crate::config::KindConfig;

    fn animal(rng: &mut SmallRng) -> Agent {
        Agent::new(
            AgentId(1),
            DVec2::new(1.0, 1.0),
            Behavior::Herbivore,
            &KindConfig::herbivore(),
            rng,
        )
    }

    #[test]
    fn steer_moves_at_speed_and_wraps() {
        let mut rng = SmallRng::seed_from_u64(3);
        let torus = Torus::new(50.0, 50.0).unwrap();
        let cfg = EcologyConfig::default();
        let mut a = animal(&mut rng);
        for _ in 0..500 {
            steer(&mut a, DVec2::ZERO, 35.0, 0.5, &torus, &cfg, &mut rng);
            assert!((a.vel.length() - 35.0).abs() < 1e-9);
            assert!(torus.contains(a.pos));
        }
    }

    #[test]
    fn zero_blend_uses_canonical_direction() {
        let mut rng = SmallRng::seed_from_u64(3);
        let torus = Torus::new(50.0, 50.0).unwrap();
        let cfg = EcologyConfig {
            inertia: 0.0,
            jitter: 0.0,
            bias: 0.0,
            ..EcologyConfig::default()
        };
        let mut a = animal(&mut rng);
        steer(&mut a, DVec2::ZERO, 2.0, 1.0, &torus, &cfg, &mut rng);
        assert_eq!(a.vel, DVec2::new(2.0, 0.0));
        assert_eq!(a.pos, DVec2::new(3.0, 1.0));
    }

    #[test]
    fn forage_bias_points_at_food() {
        let mut rng = SmallRng::seed_from_u64(8);
        let mut field = ResourceField::new(10, 10, 10.0).unwrap();
        // Food only in the cell to the right of (55, 55), at distance 40.
        field.set(5, 9, 1.0);
        let mut hits = 0;
        for _ in 0..200 {
            let d = forage_bias(DVec2::new(55.0, 55.0), 40.0, 5, &field, &mut rng);
            assert!((d.length() - 1.0).abs() < 1e-9);
            if field.sample(DVec2::new(55.0, 55.0) + d * 40.0) > 0.0 {
                hits += 1;
            }
        }
        assert!(hits > 0);
    }

    #[test]
    fn hunt_picks_nearest_within_sense() {
        let torus = Torus::new(100.0, 100.0).unwrap();
        let prey = vec![
            (0, DVec2::new(50.0, 70.0)),
            (1, DVec2::new(98.0, 10.0)),
            (2, DVec2::new(30.0, 10.0)),
        ];
        let (idx, dir) = hunt_bias(DVec2::new(5.0, 10.0), 60.0, prey, &torus).unwrap();
        assert_eq!(idx, 1);
        assert!((dir - DVec2::new(-1.0, 0.0)).length() < 1e-9);
    }

    #[test]
    fn hunt_ignores_prey_at_exactly_sense() {
        let torus = Torus::new(100.0, 100.0).unwrap();
        let prey = vec![(0, DVec2::new(40.0, 0.0))];
        assert!(hunt_bias(DVec2::ZERO, 40.0, prey, &torus).is_none());
    }

    #[test]
    fn hill_climb_prefers_strictly_richer() {
        let mut field = ResourceField::new(5, 5, 1.0).unwrap();
        field.fill(0.5);
        assert_eq!(hill_climb(&field, 2, 2), (2, 2));
        field.set(1, 3, 0.9);
        field.set(3, 1, 0.9);
        // Column 1 is probed before column 3.
        assert_eq!(hill_climb(&field, 2, 2), (3, 1));
    }

    #[test]
    fn hill_climb_wraps() {
        let mut field = ResourceField::new(4, 4, 1.0).unwrap();
        field.set(3, 3, 1.0);
        assert_eq!(hill_climb(&field, 0, 0), (3, 3));
    }
}
