//! Reputation, partner choice, and cooperate/defect interactions between
//! social actors.
//!
//! # Interaction
//!
//! Every social actor in an occupied cell picks the co-located partner it
//! scores highest (reputation, plus a halo for sharing an institution, plus
//! a little noise). Both then decide independently whether to cooperate,
//! with probability `sigmoid(steepness * (bias + reputation + bonus))`.
//!
//! | A \ B     | cooperate                   | defect                        |
//! |-----------|-----------------------------|-------------------------------|
//! | cooperate | both gain `share * min(E)`  | B takes `share * E_a` from A  |
//! | defect    | A takes `share * E_b` from B| both lose a little reputation |
//!
//! Afterwards each side nudges its cooperation bias toward whatever it did
//! if it paid off, and away from it otherwise.

use std::collections::{BTreeMap, VecDeque};

use rand::Rng;
use terrarium_types::{AgentId, InstitutionId};
use terrarium_world::sampling;

use crate::config::InteractionConfig;

/// Per-actor social memory and disposition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SocialState {
    /// Propensity to cooperate, in `[-1, 1]`.
    pub coop_bias: f64,
    /// Opinion of known partners, each in `[-1, 1]`. Unknown partners
    /// count as zero.
    pub reputations: BTreeMap<AgentId, f64>,
    /// Recently met partners, oldest first.
    pub memory: VecDeque<AgentId>,
    /// Institution membership.
    pub institution: Option<InstitutionId>,
}

impl SocialState {
    /// Fresh state with the given bias (clamped) and no memories.
    pub fn new(coop_bias: f64) -> Self {
        Self {
            coop_bias: coop_bias.clamp(-1.0, 1.0),
            ..Self::default()
        }
    }

    /// Opinion of `partner` (zero if never met).
    pub fn reputation(&self, partner: AgentId) -> f64 {
        self.reputations.get(&partner).copied().unwrap_or(0.0)
    }

    /// Shift the opinion of `partner` and remember the meeting.
    ///
    /// When the memory grows past `cfg.memory` entries the oldest meeting
    /// is forgotten and that partner's reputation decays by
    /// `cfg.memory_decay`.
    pub fn update_reputation(&mut self, partner: AgentId, delta: f64, cfg: &InteractionConfig) {
        let value = (self.reputation(partner) + delta).clamp(-1.0, 1.0);
        self.reputations.insert(partner, value);
        self.memory.push_back(partner);
        if self.memory.len() > cfg.memory {
            if let Some(rep) = self
                .memory
                .pop_front()
                .and_then(|oldest| self.reputations.get_mut(&oldest))
            {
                *rep *= cfg.memory_decay;
            }
        }
    }

    /// Nudge the cooperation bias after an interaction with `payoff`
    /// (change in own energy).
    pub fn learn(&mut self, payoff: f64, cooperated: bool, step: f64) {
        let reinforce = if payoff > 0.0 { step } else { -step };
        let delta = if cooperated { reinforce } else { -reinforce };
        self.coop_bias = (self.coop_bias + delta).clamp(-1.0, 1.0);
    }

    /// Probability of cooperating with `partner`, given the in-group bonus
    /// that applies (zero unless both share an institution).
    pub fn cooperation_probability(
        &self,
        partner: AgentId,
        in_group_bonus: f64,
        steepness: f64,
    ) -> f64 {
        let base = self.coop_bias + self.reputation(partner) + in_group_bonus;
        sigmoid(steepness * base)
    }
}

/// Logistic function.
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// A co-located candidate partner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    /// Candidate id.
    pub id: AgentId,
    /// Candidate's institution.
    pub institution: Option<InstitutionId>,
}

/// Pick the best-scoring partner among `here`, excluding `me`.
///
/// Ties keep the first candidate in order. Returns `None` when nobody else
/// is in the cell.
pub fn choose_partner<R: Rng + ?Sized>(
    me: AgentId,
    state: &SocialState,
    here: &[Candidate],
    cfg: &InteractionConfig,
    rng: &mut R,
) -> Option<AgentId> {
    let mut best: Option<(AgentId, f64)> = None;
    for candidate in here.iter().filter(|c| c.id != me) {
        let halo = match state.institution {
            Some(mine) if candidate.institution == Some(mine) => cfg.in_group_halo,
            _ => 0.0,
        };
        let noise = sampling::uniform(rng, -cfg.partner_noise, cfg.partner_noise);
        let score = state.reputation(candidate.id) + halo + noise;
        if best.is_none_or(|(_, s)| score > s) {
            best = Some((candidate.id, score));
        }
    }
    best.map(|(id, _)| id)
}

/// How an interaction ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Both cooperated.
    Mutual,
    /// The initiator cooperated and was exploited by the partner.
    InitiatorExploited,
    /// The partner cooperated and was exploited by the initiator.
    PartnerExploited,
    /// Both defected.
    Standoff,
}

impl Outcome {
    /// Whether the outcome counts as cooperation in the rolling window.
    pub const fn is_cooperative(self) -> bool {
        matches!(self, Self::Mutual)
    }
}

/// Energy and reputation changes produced by one interaction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Exchange {
    /// Outcome class.
    pub outcome: Outcome,
    /// Energy change of the initiator (before capping).
    pub energy_initiator: f64,
    /// Energy change of the partner (before capping).
    pub energy_partner: f64,
    /// Reputation change the initiator records for the partner.
    pub rep_initiator: f64,
    /// Reputation change the partner records for the initiator.
    pub rep_partner: f64,
}

/// Resolve an interaction given both decisions and current energies.
pub fn resolve(
    energy_initiator: f64,
    energy_partner: f64,
    coop_initiator: bool,
    coop_partner: bool,
    cfg: &InteractionConfig,
) -> Exchange {
    let step = cfg.reputation_step;
    match (coop_initiator, coop_partner) {
        (true, true) => {
            let share = cfg.coop_share * energy_initiator.min(energy_partner);
            Exchange {
                outcome: Outcome::Mutual,
                energy_initiator: share,
                energy_partner: share,
                rep_initiator: step,
                rep_partner: step,
            }
        }
        (true, false) => {
            let steal = (cfg.coop_share * energy_initiator).min(energy_initiator).max(0.0);
            Exchange {
                outcome: Outcome::InitiatorExploited,
                energy_initiator: -steal,
                energy_partner: steal,
                rep_initiator: -step,
                rep_partner: step * 0.5,
            }
        }
        (false, true) => {
            let steal = (cfg.coop_share * energy_partner).min(energy_partner).max(0.0);
            Exchange {
                outcome: Outcome::PartnerExploited,
                energy_initiator: steal,
                energy_partner: -steal,
                rep_initiator: step * 0.5,
                rep_partner: -step,
            }
        }
        (false, false) => Exchange {
            outcome: Outcome::Standoff,
            energy_initiator: 0.0,
            energy_partner: 0.0,
            rep_initiator: -cfg.defection_penalty,
            rep_partner: -cfg.defection_penalty,
        },
    }
}
