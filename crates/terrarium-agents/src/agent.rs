//! The agent record shared by every kind.
//!
//! An [`Agent`] is a base record (position, velocity, energy, age) plus a
//! closed [`Behavior`] variant. Herbivores and predators carry no extra
//! state; social actors carry a [`SocialState`].
//!
//! # Alive invariant
//!
//! `alive <=> energy > 0 && age < max_age`. Agents that fail it are culled
//! by the world during reconciliation; until then they are inert.

use glam::DVec2;
use rand::Rng;
use terrarium_types::{
    AgentId, AgentKind, AgentView, InstitutionId, UNAFFILIATED_COLOR, institution_color,
};
use terrarium_world::sampling;

use crate::config::{InteractionConfig, KindConfig};
use crate::social::SocialState;

/// Kind-specific state of an agent.
#[derive(Debug, Clone, PartialEq)]
pub enum Behavior {
    /// Grazes the resource field.
    Herbivore,
    /// Hunts herbivores.
    Predator,
    /// Harvests, interacts, and joins institutions.
    Social(SocialState),
}

impl Behavior {
    /// Fresh behaviour for a new agent of `kind`. Social actors draw their
    /// initial cooperation bias uniformly from `[-b, b)`.
    pub fn for_kind<R: Rng + ?Sized>(
        kind: AgentKind,
        interaction: &InteractionConfig,
        rng: &mut R,
    ) -> Self {
        match kind {
            AgentKind::Herbivore => Self::Herbivore,
            AgentKind::Predator => Self::Predator,
            AgentKind::Social => {
                let b = interaction.initial_bias;
                Self::Social(SocialState::new(sampling::uniform(rng, -b, b)))
            }
        }
    }

    /// The discriminant as an [`AgentKind`].
    pub const fn kind(&self) -> AgentKind {
        match self {
            Self::Herbivore => AgentKind::Herbivore,
            Self::Predator => AgentKind::Predator,
            Self::Social(_) => AgentKind::Social,
        }
    }
}

/// A mobile entity living on the torus.
#[derive(Debug, Clone, PartialEq)]
pub struct Agent {
    /// Unique, never reused identifier.
    pub id: AgentId,
    /// Position in `[0, width) x [0, height)`.
    pub pos: DVec2,
    /// Velocity of the last move.
    pub vel: DVec2,
    /// Stored energy.
    pub energy: f64,
    /// Age in time units.
    pub age: f64,
    /// Age at which the agent dies.
    pub max_age: f64,
    /// Kind-specific state.
    pub behavior: Behavior,
}

impl Agent {
    /// Create an agent with its kind's starting energy, a random initial
    /// velocity, and a lifespan drawn from `[max_age_min, max_age_max)`.
    pub fn new<R: Rng + ?Sized>(
        id: AgentId,
        pos: DVec2,
        behavior: Behavior,
        params: &KindConfig,
        rng: &mut R,
    ) -> Self {
        Self {
            id,
            pos,
            vel: sampling::jitter(rng),
            energy: params.start_energy,
            age: 0.0,
            max_age: sampling::uniform(rng, params.max_age_min, params.max_age_max),
            behavior,
        }
    }

    /// The agent's kind.
    pub const fn kind(&self) -> AgentKind {
        self.behavior.kind()
    }

    /// Whether the agent satisfies the alive invariant.
    pub fn is_alive(&self) -> bool {
        self.energy > 0.0 && self.age < self.max_age
    }

    /// Add energy, never exceeding `cap`.
    pub fn gain(&mut self, amount: f64, cap: f64) {
        self.energy = (self.energy + amount).min(cap);
    }

    /// Social state, if this is a social actor.
    pub const fn social(&self) -> Option<&SocialState> {
        match &self.behavior {
            Behavior::Social(state) => Some(state),
            _ => None,
        }
    }

    /// Mutable social state, if this is a social actor.
    pub const fn social_mut(&mut self) -> Option<&mut SocialState> {
        match &mut self.behavior {
            Behavior::Social(state) => Some(state),
            _ => None,
        }
    }

    /// Institution membership (always `None` for animals).
    pub fn institution(&self) -> Option<InstitutionId> {
        self.social().and_then(|s| s.institution)
    }

    /// Render record.
    pub fn view(&self, size: f64) -> AgentView {
        let institution = self.institution();
        AgentView {
            id: self.id,
            kind: self.kind(),
            x: self.pos.x,
            y: self.pos.y,
            size,
            energy: self.energy,
            institution,
            color: institution.map_or(UNAFFILIATED_COLOR, institution_color),
        }
    }
}

/// Borrow two distinct elements of a slice mutably.
///
/// Returns `None` if `i == j` or either index is out of range.
pub fn pair_mut<T>(items: &mut [T], i: usize, j: usize) -> Option<(&mut T, &mut T)> {
    if i == j {
        return None;
    }
    let (lo, hi, swapped) = if i < j { (i, j, false) } else { (j, i, true) };
    if hi >= items.len() {
        return None;
    }
    let (head, tail) = items.split_at_mut(hi);
    let first = head.get_mut(lo)?;
    let second = tail.first_mut()?;
    Some(if swapped { (second, first) } else { (first, second) })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    fn herbivore(energy: f64) -> Agent {
        let mut rng = SmallRng::seed_from_u64(1);
        let mut a = Agent::new(
            AgentId(1),
            DVec2::new(5.0, 5.0),
            Behavior::Herbivore,
            &KindConfig::herbivore(),
            &mut rng,
        );
        a.energy = energy;
        a
    }

    #[test]
    fn new_agent_uses_kind_defaults() {
        let a = herbivore(1.0);
        assert_eq!(a.kind(), AgentKind::Herbivore);
        assert_eq!(a.energy, 1.0);
        assert!((900.0..2000.0).contains(&a.max_age));
        assert!(a.is_alive());
    }

    #[test]
    fn alive_requires_energy_and_youth() {
        let mut a = herbivore(0.0);
        assert!(!a.is_alive());
        a.energy = 0.5;
        a.age = a.max_age;
        assert!(!a.is_alive());
    }

    #[test]
    fn gain_is_capped() {
        let mut a = herbivore(2.5);
        a.gain(1.0, 3.0);
        assert_eq!(a.energy, 3.0);
    }

    #[test]
    fn social_behavior_has_bounded_bias() {
        let mut rng = SmallRng::seed_from_u64(4);
        let cfg = InteractionConfig::default();
        for _ in 0..50 {
            let b = Behavior::for_kind(AgentKind::Social, &cfg, &mut rng);
            let Behavior::Social(state) = b else {
                panic!("expected social behavior");
            };
            assert!(state.coop_bias.abs() <= 0.2);
            assert!(state.institution.is_none());
        }
    }

    #[test]
    fn unaffiliated_view_is_grey() {
        let view = herbivore(1.0).view(2.0);
        assert_eq!(view.color, UNAFFILIATED_COLOR);
        assert!(view.institution.is_none());
    }

    #[test]
    fn pair_mut_returns_requested_order() {
        let mut v = vec![1, 2, 3, 4];
        let (a, b) = pair_mut(&mut v, 3, 1).unwrap();
        assert_eq!((*a, *b), (4, 2));
        *a = 40;
        assert_eq!(v, vec![1, 2, 3, 40]);
        assert!(pair_mut(&mut v, 2, 2).is_none());
        assert!(pair_mut(&mut v, 0, 9).is_none());
    }
}
