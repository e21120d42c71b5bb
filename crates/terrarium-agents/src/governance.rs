//! Institutions of the persistent society.
//!
//! An [`Institution`] holds a [`Policy`] (tax rate, sanction size, in-group
//! bonus), a budget, and a set of member ids. The [`InstitutionRegistry`]
//! owns every live institution and issues their ids.
//!
//! # Fiscal year
//!
//! Once per year each member above the tax baseline pays
//! `min(E, tau * max(0, E - baseline))`; each member below the distress
//! threshold receives a stipend capped by the remaining budget. Budgets
//! then leak an administrative share, and institutions below both the
//! budget and membership floors accumulate broke years.
//!
//! # Sanctions
//!
//! When a member exploits a fellow member, the institution fines the
//! exploiter with probability `min(1, budget / (members * monitor_base))`.
//!
//! # Votes
//!
//! Two slates are proposed by perturbing the current policy. Members whose
//! perceived energy is above the tax baseline back the slate with the lower
//! tax rate; the rest back the slate with the higher one. Majority wins and
//! every tie goes to the first slate.
//!
//! # Churn
//!
//! Institutions broke for the grace period dissolve and release their
//! members. New institutions are founded around dense clusters of
//! unaffiliated actors found by a strided scan of the grid.

use std::collections::{BTreeMap, BTreeSet};

use rand::Rng;
use terrarium_types::{AgentId, IdSequence, InstitutionId, InstitutionView, institution_color};
use terrarium_world::sampling;
use tracing::debug;

use crate::config::GovernanceConfig;
use crate::error::AgentError;

/// Guards the sanction probability against an empty membership.
const MONITOR_EPSILON: f64 = 1e-6;

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// The three policy parameters of an institution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Policy {
    /// Share of surplus energy collected as tax.
    pub tax_rate: f64,
    /// Fine levied on a sanctioned exploiter.
    pub sanction: f64,
    /// Cooperation bonus between members.
    pub in_group_bonus: f64,
}

impl Policy {
    /// A policy with all three parameters equal to `value`.
    pub const fn uniform(value: f64) -> Self {
        Self {
            tax_rate: value,
            sanction: value,
            in_group_bonus: value,
        }
    }

    /// Clamp every parameter to `[0, cap]`.
    pub fn clamped(self, cap: f64) -> Self {
        let cap = cap.max(0.0);
        Self {
            tax_rate: self.tax_rate.clamp(0.0, cap),
            sanction: self.sanction.clamp(0.0, cap),
            in_group_bonus: self.in_group_bonus.clamp(0.0, cap),
        }
    }

    /// Perturb each parameter by `U(-spread, spread)` and clamp to `[0, cap]`.
    pub fn perturbed<R: Rng + ?Sized>(self, spread: f64, cap: f64, rng: &mut R) -> Self {
        Self {
            tax_rate: self.tax_rate + sampling::uniform(rng, -spread, spread),
            sanction: self.sanction + sampling::uniform(rng, -spread, spread),
            in_group_bonus: self.in_group_bonus + sampling::uniform(rng, -spread, spread),
        }
        .clamped(cap)
    }

    /// Policy of a freshly founded institution: each parameter is
    /// `base + U(lo, hi)`, clamped to `[0, cap]`.
    pub fn founding<R: Rng + ?Sized>(cfg: &GovernanceConfig, rng: &mut R) -> Self {
        let mut draw = || {
            let offset = sampling::uniform(rng, cfg.found_policy_lo, cfg.found_policy_hi);
            cfg.found_policy + offset
        };
        Self {
            tax_rate: draw(),
            sanction: draw(),
            in_group_bonus: draw(),
        }
        .clamped(cfg.policy_cap)
    }
}

/// Tax owed on `energy`: `min(energy, rate * max(0, energy - baseline))`.
pub fn tax_due(energy: f64, rate: f64, baseline: f64) -> f64 {
    (rate * (energy - baseline).max(0.0)).min(energy).max(0.0)
}

// ---------------------------------------------------------------------------
// Institution
// ---------------------------------------------------------------------------

/// A taxation, sanction, and membership policy actor.
#[derive(Debug, Clone, PartialEq)]
pub struct Institution {
    /// Identifier.
    pub id: InstitutionId,
    /// Current policy.
    pub policy: Policy,
    /// Budget, never negative.
    pub budget: f64,
    /// Member agent ids.
    pub members: BTreeSet<AgentId>,
    /// Consecutive years below both dissolve floors.
    pub broke_years: u32,
}

impl Institution {
    /// A new institution without members.
    pub fn new(id: InstitutionId, policy: Policy, budget: f64) -> Self {
        Self {
            id,
            policy,
            budget: budget.max(0.0),
            members: BTreeSet::new(),
            broke_years: 0,
        }
    }

    /// Add to the budget, never going below zero.
    pub fn deposit(&mut self, amount: f64) {
        self.budget = (self.budget + amount).max(0.0);
    }

    /// Pay out up to `max` from the budget and return what was paid.
    pub fn withdraw(&mut self, max: f64) -> f64 {
        let paid = max.min(self.budget).max(0.0);
        self.budget -= paid;
        paid
    }

    /// Probability that an exploitation between members is fined.
    #[allow(clippy::cast_precision_loss)]
    pub fn sanction_probability(&self, monitor_base: f64) -> f64 {
        let denom = self.members.len() as f64 * monitor_base + MONITOR_EPSILON;
        (self.budget / denom).min(1.0)
    }

    /// Lose `rate` of the budget to administration.
    pub fn leak(&mut self, rate: f64) {
        self.budget = (self.budget * (1.0 - rate)).max(0.0);
    }

    /// Update the broke-year counter: increment when below both floors,
    /// reset otherwise. Returns the new count.
    pub fn track_solvency(&mut self, min_budget: f64, min_members: usize) -> u32 {
        if self.budget < min_budget && self.members.len() < min_members {
            self.broke_years = self.broke_years.saturating_add(1);
        } else {
            self.broke_years = 0;
        }
        self.broke_years
    }

    /// Dashboard record.
    pub fn view(&self) -> InstitutionView {
        InstitutionView {
            id: self.id,
            tax_rate: self.policy.tax_rate,
            sanction: self.policy.sanction,
            in_group_bonus: self.policy.in_group_bonus,
            budget: self.budget,
            members: self.members.len(),
            broke_years: self.broke_years,
            color: institution_color(self.id),
        }
    }
}

/// Tally a vote between two slates.
///
/// `perceived` holds each voter's perceived energy. Returns `0` or `1`, the
/// index of the winning slate.
pub fn tally_vote<I>(perceived: I, slates: &[Policy; 2], baseline: f64) -> usize
where
    I: IntoIterator<Item = f64>,
{
    let [first, second] = slates;
    let lower_tax = usize::from(second.tax_rate < first.tax_rate);
    let higher_tax = usize::from(second.tax_rate > first.tax_rate);
    let mut votes = [0_usize; 2];
    for energy in perceived {
        let pick = if energy > baseline { lower_tax } else { higher_tax };
        if let Some(count) = votes.get_mut(pick) {
            *count = count.saturating_add(1);
        }
    }
    let [a, b] = votes;
    usize::from(b > a)
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Owner of every live institution, ordered by id.
#[derive(Debug, Clone, PartialEq)]
pub struct InstitutionRegistry {
    institutions: BTreeMap<InstitutionId, Institution>,
    ids: IdSequence,
}

impl Default for InstitutionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InstitutionRegistry {
    /// An empty registry whose first id is 1.
    pub const fn new() -> Self {
        Self {
            institutions: BTreeMap::new(),
            ids: IdSequence::new(),
        }
    }

    /// Found a new institution and return its id.
    pub fn found(&mut self, policy: Policy, budget: f64) -> InstitutionId {
        let id: InstitutionId = self.ids.issue();
        debug!(%id, tax_rate = policy.tax_rate, budget, "institution founded");
        self.institutions.insert(id, Institution::new(id, policy, budget));
        id
    }

    /// Remove an institution, returning it with its final membership.
    pub fn dissolve(&mut self, id: InstitutionId) -> Option<Institution> {
        let inst = self.institutions.remove(&id)?;
        debug!(
            %id,
            members = inst.members.len(),
            broke_years = inst.broke_years,
            "institution dissolved"
        );
        Some(inst)
    }

    /// Look up an institution.
    pub fn get(&self, id: InstitutionId) -> Option<&Institution> {
        self.institutions.get(&id)
    }

    /// Look up an institution mutably.
    pub fn get_mut(&mut self, id: InstitutionId) -> Option<&mut Institution> {
        self.institutions.get_mut(&id)
    }

    /// Whether `id` names a live institution.
    pub fn contains(&self, id: InstitutionId) -> bool {
        self.institutions.contains_key(&id)
    }

    /// Institutions in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Institution> {
        self.institutions.values()
    }

    /// Institutions in id order, mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Institution> {
        self.institutions.values_mut()
    }

    /// Number of live institutions.
    pub fn len(&self) -> usize {
        self.institutions.len()
    }

    /// Whether there are no institutions.
    pub fn is_empty(&self) -> bool {
        self.institutions.is_empty()
    }

    /// Institutions with at least one member.
    pub fn active_count(&self) -> usize {
        self.institutions.values().filter(|i| !i.members.is_empty()).count()
    }

    /// The institution with the largest budget (lowest id on ties).
    pub fn richest(&self) -> Option<InstitutionId> {
        let mut best: Option<&Institution> = None;
        for inst in self.institutions.values() {
            if best.is_none_or(|b| inst.budget > b.budget) {
                best = Some(inst);
            }
        }
        best.map(|i| i.id)
    }

    /// A uniformly random institution.
    pub fn random<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<InstitutionId> {
        let idx = sampling::index(rng, self.institutions.len())?;
        self.institutions.keys().nth(idx).copied()
    }

    /// Record `agent` as a member of `id`.
    pub fn add_member(&mut self, id: InstitutionId, agent: AgentId) -> Result<(), AgentError> {
        let inst = self
            .institutions
            .get_mut(&id)
            .ok_or(AgentError::InstitutionNotFound(id))?;
        inst.members.insert(agent);
        Ok(())
    }

    /// Drop `agent` from the member set of `id`, if both exist.
    pub fn remove_member(&mut self, id: InstitutionId, agent: AgentId) {
        if let Some(inst) = self.institutions.get_mut(&id) {
            inst.members.remove(&agent);
        }
    }

    /// Dashboard records in id order.
    pub fn views(&self) -> Vec<InstitutionView> {
        self.institutions.values().map(Institution::view).collect()
    }
}

// ---------------------------------------------------------------------------
// Cluster scan
// ---------------------------------------------------------------------------

/// Scan window centres, column-major with stride `radius + 1`.
pub fn scan_centres(rows: usize, cols: usize, radius: usize) -> Vec<(usize, usize)> {
    let stride = radius.saturating_add(1);
    (0..cols)
        .step_by(stride)
        .flat_map(|col| (0..rows).step_by(stride).map(move |row| (row, col)))
        .collect()
}

/// Per-cell counts of unaffiliated social actors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterIndex {
    counts: BTreeMap<(usize, usize), usize>,
}

impl ClusterIndex {
    /// Count one actor in `cell`.
    pub fn insert(&mut self, cell: (usize, usize)) {
        let n = self.counts.entry(cell).or_insert(0);
        *n = n.saturating_add(1);
    }

    /// Uncount one actor in `cell`.
    pub fn remove(&mut self, cell: (usize, usize)) {
        if let Some(n) = self.counts.get_mut(&cell) {
            *n = n.saturating_sub(1);
        }
    }

    /// Actors in the `(2r + 1)^2` toroidal window around `centre`. Each
    /// window offset is counted separately, so on grids narrower than the
    /// window a cell may contribute more than once.
    pub fn window(&self, centre: (usize, usize), radius: usize, rows: usize, cols: usize) -> usize {
        if rows == 0 || cols == 0 {
            return 0;
        }
        let mut total = 0_usize;
        for dc in 0..=radius.saturating_mul(2) {
            for dr in 0..=radius.saturating_mul(2) {
                let cell = (
                    wrap_offset(centre.0, dr, radius, rows),
                    wrap_offset(centre.1, dc, radius, cols),
                );
                total = total.saturating_add(self.counts.get(&cell).copied().unwrap_or(0));
            }
        }
        total
    }
}

/// `(base + offset - radius) mod n` without leaving `usize`.
// n > 0 (checked by `window`); each term is reduced below n first.
#[allow(clippy::arithmetic_side_effects)]
fn wrap_offset(base: usize, offset: usize, radius: usize, n: usize) -> usize {
    let shift = radius % n;
    (base % n + offset % n + n - shift) % n
}

/// Per-axis toroidal cell distance.
pub fn cell_distance(a: usize, b: usize, n: usize) -> usize {
    if n == 0 {
        return 0;
    }
    #[allow(clippy::arithmetic_side_effects)]
    let d = a.abs_diff(b) % n;
    d.min(n.saturating_sub(d))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    #[test]
    fn tax_only_touches_surplus() {
        assert_eq!(tax_due(4.0, 0.2, 5.0), 0.0);
        assert!((tax_due(10.0, 0.2, 5.0) - 1.0).abs() < 1e-12);
        assert_eq!(tax_due(10.0, 5.0, 5.0), 10.0);
    }

    #[test]
    fn withdraw_is_capped_by_budget() {
        let mut inst = Institution::new(InstitutionId(1), Policy::uniform(0.1), 0.3);
        assert!((inst.withdraw(0.4) - 0.3).abs() < 1e-12);
        assert_eq!(inst.budget, 0.0);
        assert_eq!(inst.withdraw(0.4), 0.0);
    }

    #[test]
    fn sanction_probability_favours_small_rich_institutions() {
        let mut inst = Institution::new(InstitutionId(1), Policy::uniform(0.1), 0.01);
        for i in 1..=10 {
            inst.members.insert(AgentId(i));
        }
        assert!((inst.sanction_probability(0.02) - 0.01 / (0.2 + 1e-6)).abs() < 1e-12);
        inst.budget = 5.0;
        assert_eq!(inst.sanction_probability(0.02), 1.0);
    }

    #[test]
    fn solvency_counter_resets() {
        let mut inst = Institution::new(InstitutionId(1), Policy::uniform(0.1), 0.0);
        inst.members.insert(AgentId(1));
        assert_eq!(inst.track_solvency(0.1, 3), 1);
        assert_eq!(inst.track_solvency(0.1, 3), 2);
        inst.budget = 1.0;
        assert_eq!(inst.track_solvency(0.1, 3), 0);
    }

    #[test]
    fn leak_shrinks_budget() {
        let mut inst = Institution::new(InstitutionId(1), Policy::uniform(0.1), 10.0);
        inst.leak(0.02);
        assert!((inst.budget - 9.8).abs() < 1e-12);
    }

    #[test]
    fn perturbed_policy_stays_in_bounds() {
        let mut rng = SmallRng::seed_from_u64(5);
        let mut p = Policy::uniform(0.01);
        for _ in 0..200 {
            p = p.perturbed(0.07, 0.35, &mut rng);
            for v in [p.tax_rate, p.sanction, p.in_group_bonus] {
                assert!((0.0..=0.35).contains(&v));
            }
        }
    }

    #[test]
    fn founding_policy_range() {
        let mut rng = SmallRng::seed_from_u64(5);
        let cfg = GovernanceConfig::default();
        for _ in 0..100 {
            let p = Policy::founding(&cfg, &mut rng);
            assert!((0.05..0.2).contains(&p.tax_rate));
        }
    }

    #[test]
    fn founding_policy_respects_cap_and_floor() {
        let mut rng = SmallRng::seed_from_u64(9);
        let cfg = GovernanceConfig {
            found_policy: 0.0,
            found_policy_lo: -0.5,
            found_policy_hi: 0.9,
            policy_cap: 0.35,
            ..GovernanceConfig::default()
        };
        let (mut saw_floor, mut saw_cap) = (false, false);
        for _ in 0..200 {
            let p = Policy::founding(&cfg, &mut rng);
            for v in [p.tax_rate, p.sanction, p.in_group_bonus] {
                assert!((0.0..=0.35).contains(&v), "{v} escaped [0, 0.35]");
                saw_floor |= v == 0.0;
                saw_cap |= v == 0.35;
            }
        }
        assert!(saw_floor && saw_cap);
    }

    #[test]
    fn rich_voters_pick_lower_tax() {
        let low = Policy { tax_rate: 0.05, ..Policy::uniform(0.1) };
        let high = Policy { tax_rate: 0.2, ..Policy::uniform(0.1) };
        assert_eq!(tally_vote([9.0, 9.0, 2.0], &[high, low], 5.0), 1);
        assert_eq!(tally_vote([9.0, 2.0, 2.0], &[high, low], 5.0), 0);
        assert_eq!(tally_vote([9.0, 2.0, 2.0], &[low, high], 5.0), 1);
    }

    #[test]
    fn vote_ties_favour_first_slate() {
        let low = Policy { tax_rate: 0.05, ..Policy::uniform(0.1) };
        let high = Policy { tax_rate: 0.2, ..Policy::uniform(0.1) };
        assert_eq!(tally_vote([9.0, 2.0], &[low, high], 5.0), 0);
        assert_eq!(tally_vote([9.0, 2.0], &[high, low], 5.0), 0);
        let same = [low, low];
        assert_eq!(tally_vote([9.0, 2.0, 1.0], &same, 5.0), 0);
        assert_eq!(tally_vote(std::iter::empty(), &[high, low], 5.0), 0);
    }

    #[test]
    fn registry_issues_monotonic_ids() {
        let mut reg = InstitutionRegistry::new();
        let a = reg.found(Policy::uniform(0.1), 1.0);
        let b = reg.found(Policy::uniform(0.1), 2.0);
        assert_eq!(a, InstitutionId(1));
        assert_eq!(b, InstitutionId(2));
        assert!(reg.dissolve(a).is_some());
        let c = reg.found(Policy::uniform(0.1), 0.5);
        assert_eq!(c, InstitutionId(3));
        assert_eq!(reg.richest(), Some(b));
    }

    #[test]
    fn richest_prefers_lowest_id_on_ties() {
        let mut reg = InstitutionRegistry::new();
        let a = reg.found(Policy::uniform(0.1), 1.0);
        let _ = reg.found(Policy::uniform(0.1), 1.0);
        assert_eq!(reg.richest(), Some(a));
    }

    #[test]
    fn membership_requires_live_institution() {
        let mut reg = InstitutionRegistry::new();
        let a = reg.found(Policy::uniform(0.1), 1.0);
        reg.add_member(a, AgentId(7)).unwrap();
        assert_eq!(reg.active_count(), 1);
        assert_eq!(
            reg.add_member(InstitutionId(99), AgentId(7)),
            Err(AgentError::InstitutionNotFound(InstitutionId(99)))
        );
        reg.remove_member(a, AgentId(7));
        assert_eq!(reg.active_count(), 0);
    }

    #[test]
    fn scan_centres_follow_stride() {
        let centres = scan_centres(7, 7, 2);
        assert_eq!(centres.first(), Some(&(0, 0)));
        assert_eq!(centres.get(1), Some(&(3, 0)));
        assert_eq!(centres.len(), 9);
    }

    #[test]
    fn window_counts_wrap() {
        let mut idx = ClusterIndex::default();
        idx.insert((0, 0));
        idx.insert((9, 9));
        idx.insert((9, 9));
        idx.insert((5, 5));
        assert_eq!(idx.window((0, 0), 1, 10, 10), 3);
        idx.remove((9, 9));
        assert_eq!(idx.window((0, 0), 1, 10, 10), 2);
        assert_eq!(idx.window((5, 5), 2, 10, 10), 1);
    }

    #[test]
    fn cell_distance_wraps() {
        assert_eq!(cell_distance(0, 9, 10), 1);
        assert_eq!(cell_distance(2, 5, 10), 3);
    }
}
