//! Tick cycle: the ordered pipeline that advances the world by one step.
//!
//! Each tick runs these phases in order:
//!
//! 1. **Light** -- advance the clock and the day-night phase.
//!
//! 2. **Producers** -- hold any drought block at zero, grow and diffuse the
//!    resource field (with its gas exchange), update plant patches and the
//!    moss pool.
//!
//! 3. **Agents** -- animals steer, graze, hunt, and breathe; social actors
//!    hill-climb, harvest, and interact pairwise within their cells; every
//!    agent then pays its metabolism.
//!
//! 4. **Yearly** -- only on year boundaries: taxes and stipends, budget
//!    leak, broke tracking, votes, spoilage, the drought trigger, and
//!    institution churn.
//!
//! 5. **Reconcile** -- cull the dead (recycling animal nutrients), breed
//!    animals, let social actors join or leave institutions, and replace
//!    dead social actors.
//!
//! 6. **Ambient** -- water leak, temperature wave, and nutrient decay when
//!    no producer biomass remains.
//!
//! 7. **Metrics** -- on year boundaries append a [`YearlyMetrics`] record.
//!
//! The cycle is deterministic given the same initial state and generator.
//!
//! [`YearlyMetrics`]: terrarium_types::YearlyMetrics

use std::collections::BTreeMap;

use glam::DVec2;
use rand::Rng;
use terrarium_agents::governance::{Institution, cell_distance, scan_centres};
use terrarium_agents::movement::{forage_bias, hill_climb, hunt_bias, steer};
use terrarium_agents::social::{choose_partner, resolve};
use terrarium_agents::{
    Agent, Candidate, ClusterIndex, GovernanceConfig, InstitutionRegistry, Outcome, Policy,
    energetics, pair_and_breed, pair_mut, tally_vote, tax_due,
};
use terrarium_types::{AgentId, AgentKind, AnnalEvent, InstitutionId};
use terrarium_world::{Producer, sampling};
use tracing::{debug, info, warn};

use crate::world::World;

/// Producer biomass below which the bottle counts as barren.
const BARREN_BIOMASS: f64 = 1e-4;

/// Nutrient decay per unit time in a barren bottle.
const BARREN_NUTRIENT_DECAY: f64 = 0.002;

/// One stage of the tick pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Clock and day-night phase.
    Light,
    /// Resource field, plant patches, moss pool.
    Producers,
    /// Movement, feeding, interaction, metabolism.
    Agents,
    /// Fiscal year and institution churn.
    Yearly,
    /// Deaths, births, and membership changes.
    Reconcile,
    /// Water, temperature, and barren decay.
    Ambient,
    /// Yearly records.
    Metrics,
}

/// The phases of one tick, in execution order.
pub const PIPELINE: [Phase; 7] = [
    Phase::Light,
    Phase::Producers,
    Phase::Agents,
    Phase::Yearly,
    Phase::Reconcile,
    Phase::Ambient,
    Phase::Metrics,
];

/// Summary of a completed tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickSummary {
    /// The tick number that was executed.
    pub tick: u64,
    /// Time step actually applied.
    pub dt: f64,
    /// Field biomass eaten by herbivores.
    pub grazed: f64,
    /// Energy harvested by social actors.
    pub harvested: f64,
    /// Herbivores killed by predators.
    pub kills: usize,
    /// Social interactions resolved.
    pub interactions: usize,
    /// Interactions that ended in mutual cooperation.
    pub cooperative: usize,
    /// Exploiters fined by their institution.
    pub sanctions: usize,
    /// Animals born.
    pub births: usize,
    /// Agents culled.
    pub deaths: usize,
    /// Plant patches spawned.
    pub plant_births: usize,
    /// Plant patches lost to senescence.
    pub plant_deaths: usize,
    /// Whether this tick closed a year.
    pub year_closed: bool,
}

/// Non-finite or negative steps are treated as zero.
fn sanitize_dt(dt: f64) -> f64 {
    if dt.is_finite() && dt >= 0.0 {
        dt
    } else {
        warn!(dt, "Non-finite or negative dt treated as 0");
        0.0
    }
}

impl<R: Rng> World<R> {
    /// Advance the world by one tick of `dt` and return the new tick number.
    pub fn step(&mut self, dt: f64) -> u64 {
        self.advance(dt).tick
    }

    /// Advance the world by one tick of `dt` and report what happened.
    pub fn advance(&mut self, dt: f64) -> TickSummary {
        let mut summary = TickSummary {
            dt: sanitize_dt(dt),
            ..TickSummary::default()
        };
        for phase in PIPELINE {
            self.run_phase(phase, &mut summary);
        }
        debug!(
            tick = summary.tick,
            agents = self.agents.len(),
            institutions = self.institutions.len(),
            interactions = summary.interactions,
            births = summary.births,
            deaths = summary.deaths,
            "Tick complete"
        );
        summary
    }

    fn run_phase(&mut self, phase: Phase, summary: &mut TickSummary) {
        match phase {
            Phase::Light => self.phase_light(summary),
            Phase::Producers => self.phase_producers(summary),
            Phase::Agents => self.phase_agents(summary),
            Phase::Yearly => self.phase_yearly(summary),
            Phase::Reconcile => self.phase_reconcile(summary),
            Phase::Ambient => self.phase_ambient(summary.dt),
            Phase::Metrics => self.phase_metrics(summary),
        }
    }

    // -----------------------------------------------------------------------
    // Phase 1: Light
    // -----------------------------------------------------------------------

    fn phase_light(&mut self, summary: &mut TickSummary) {
        summary.tick = match self.clock.advance() {
            Ok(tick) => tick,
            Err(err) => {
                warn!(%err, "Clock could not advance");
                self.clock.tick()
            }
        };
        summary.year_closed = self.clock.is_year_boundary();
        self.env.advance_light(summary.dt);
    }

    // -----------------------------------------------------------------------
    // Phase 2: Producers
    // -----------------------------------------------------------------------

    fn phase_producers(&mut self, summary: &mut TickSummary) {
        let dt = summary.dt;
        self.drought
            .apply(&mut self.field, &self.config.drought, summary.tick);
        self.field
            .grow(&mut self.env, &self.config.field, dt, &mut self.rng);
        let report = self
            .plants
            .update(&mut self.env, &self.torus, dt, &mut self.rng);
        summary.plant_births = report.births;
        summary.plant_deaths = report.deaths;
        if let Some(moss) = self.moss.as_mut() {
            moss.update(&mut self.env, dt);
        }
    }

    // -----------------------------------------------------------------------
    // Phase 3: Agents
    // -----------------------------------------------------------------------

    fn phase_agents(&mut self, summary: &mut TickSummary) {
        for index in 0..self.agents.len() {
            let Some(agent) = self.agents.get(index) else {
                continue;
            };
            if !agent.is_alive() {
                continue;
            }
            match agent.kind() {
                AgentKind::Herbivore => self.herbivore_turn(index, summary),
                AgentKind::Predator => self.predator_turn(index, summary),
                AgentKind::Social => {}
            }
        }
        self.social_round(summary);

        let dt = summary.dt;
        for agent in self.agents.iter_mut().filter(|a| a.is_alive()) {
            let params = self.config.agents.get(agent.kind());
            energetics::metabolize(agent, params, dt);
        }
    }

    fn herbivore_turn(&mut self, index: usize, summary: &mut TickSummary) {
        let dt = summary.dt;
        let params = &self.config.agents.herbivore;
        let ecology = &self.config.ecology;
        let Some(agent) = self.agents.get_mut(index) else {
            return;
        };
        let bias = forage_bias(
            agent.pos,
            params.sense,
            ecology.forage_probes,
            &self.field,
            &mut self.rng,
        );
        steer(agent, bias, params.speed, dt, &self.torus, ecology, &mut self.rng);
        summary.grazed += energetics::graze(agent, &mut self.field, params, ecology, dt);
        energetics::respire(&mut self.env, ecology, dt);
    }

    fn predator_turn(&mut self, index: usize, summary: &mut TickSummary) {
        let dt = summary.dt;
        let params = &self.config.agents.predator;
        let prey_size = self.config.agents.herbivore.size;
        let ecology = &self.config.ecology;
        let Some(hunter_pos) = self.agents.get(index).map(|a| a.pos) else {
            return;
        };
        let prey = self
            .agents
            .iter()
            .enumerate()
            .filter(|(_, a)| a.kind() == AgentKind::Herbivore && a.is_alive())
            .map(|(i, a)| (i, a.pos));
        let target = hunt_bias(hunter_pos, params.sense, prey, &self.torus);

        let bias = target.map_or(DVec2::ZERO, |(_, dir)| dir);
        if let Some(agent) = self.agents.get_mut(index) {
            steer(agent, bias, params.speed, dt, &self.torus, ecology, &mut self.rng);
        }
        let pair = match target {
            Some((j, _)) => pair_mut(&mut self.agents, index, j),
            None => None,
        };
        if let Some((hunter, prey)) = pair {
            if prey.is_alive()
                && energetics::within_capture(
                    &self.torus,
                    hunter.pos,
                    params.size,
                    prey.pos,
                    prey_size,
                    ecology,
                )
            {
                energetics::devour(hunter, prey, params, ecology);
                summary.kills = summary.kills.saturating_add(1);
            }
        }
        energetics::respire(&mut self.env, ecology, dt);
    }

    /// Hill climb, harvest, then pairwise interaction in every occupied cell.
    fn social_round(&mut self, summary: &mut TickSummary) {
        let actors: Vec<usize> = self
            .agents
            .iter()
            .enumerate()
            .filter(|(_, a)| a.kind() == AgentKind::Social && a.is_alive())
            .map(|(i, _)| i)
            .collect();
        if actors.is_empty() {
            return;
        }

        for &i in &actors {
            if let Some(agent) = self.agents.get_mut(i) {
                let (row, col) = self.field.cell_of(agent.pos);
                let (row, col) = hill_climb(&self.field, row, col);
                agent.pos = self.field.cell_center(row, col);
            }
        }

        let mut cells: BTreeMap<(usize, usize), Vec<usize>> = BTreeMap::new();
        for &i in &actors {
            if let Some(agent) = self.agents.get(i) {
                cells.entry(self.field.cell_of(agent.pos)).or_default().push(i);
            }
        }

        for &i in &actors {
            let Some(agent) = self.agents.get_mut(i) else {
                continue;
            };
            let crowd = cells
                .get(&self.field.cell_of(agent.pos))
                .map_or(1, Vec::len);
            summary.harvested += energetics::harvest(
                agent,
                &mut self.field,
                crowd,
                self.config.field.resource_scale,
                &self.config.agents.social,
                &self.config.interaction,
            );
        }

        for occupants in cells.values().filter(|o| o.len() > 1) {
            let candidates: Vec<Candidate> = occupants
                .iter()
                .filter_map(|&i| self.agents.get(i))
                .map(|a| Candidate {
                    id: a.id,
                    institution: a.institution(),
                })
                .collect();
            for &i in occupants {
                self.interact(i, occupants, &candidates, summary);
            }
        }
    }

    /// One interaction initiated by the actor at `index`.
    fn interact(
        &mut self,
        index: usize,
        occupants: &[usize],
        candidates: &[Candidate],
        summary: &mut TickSummary,
    ) {
        let cfg = &self.config.interaction;
        let gov = &self.config.governance;
        let cap = self.config.agents.social.max_energy;

        let Some(initiator) = self.agents.get(index).filter(|a| a.is_alive()) else {
            return;
        };
        let Some(state) = initiator.social() else {
            return;
        };
        let Some(partner) = choose_partner(initiator.id, state, candidates, cfg, &mut self.rng)
        else {
            return;
        };
        let Some(partner_index) = candidates
            .iter()
            .zip(occupants)
            .find(|(c, _)| c.id == partner)
            .map(|(_, &j)| j)
        else {
            return;
        };
        let Some((a, b)) = pair_mut(&mut self.agents, index, partner_index) else {
            return;
        };
        if !b.is_alive() {
            return;
        }

        let shared = match (a.institution(), b.institution()) {
            (Some(x), Some(y)) if x == y => Some(x),
            _ => None,
        };
        let bonus = shared
            .and_then(|id| self.institutions.get(id))
            .map_or(0.0, |inst| inst.policy.in_group_bonus);
        let (Some(sa), Some(sb)) = (a.social(), b.social()) else {
            return;
        };
        let p_a = sa.cooperation_probability(b.id, bonus, cfg.coop_steepness);
        let p_b = sb.cooperation_probability(a.id, bonus, cfg.coop_steepness);
        let coop_a = sampling::chance(&mut self.rng, p_a);
        let coop_b = sampling::chance(&mut self.rng, p_b);

        let (before_a, before_b) = (a.energy, b.energy);
        let exchange = resolve(a.energy, b.energy, coop_a, coop_b, cfg);
        a.gain(exchange.energy_initiator, cap);
        b.gain(exchange.energy_partner, cap);
        let (id_a, id_b) = (a.id, b.id);
        if let Some(s) = a.social_mut() {
            s.update_reputation(id_b, exchange.rep_initiator, cfg);
        }
        if let Some(s) = b.social_mut() {
            s.update_reputation(id_a, exchange.rep_partner, cfg);
        }

        let exploiter = match exchange.outcome {
            Outcome::InitiatorExploited => Some(&mut *b),
            Outcome::PartnerExploited => Some(&mut *a),
            Outcome::Mutual | Outcome::Standoff => None,
        };
        if let (Some(exploiter), Some(id)) = (exploiter, shared) {
            if let Some(inst) = self.institutions.get_mut(id) {
                if sanction(inst, exploiter, gov, &mut self.rng) {
                    summary.sanctions = summary.sanctions.saturating_add(1);
                }
            }
        }

        let payoff_a = a.energy - before_a;
        if let Some(s) = a.social_mut() {
            s.learn(payoff_a, coop_a, cfg.learning_step);
        }
        let payoff_b = b.energy - before_b;
        if let Some(s) = b.social_mut() {
            s.learn(payoff_b, coop_b, cfg.learning_step);
        }

        let cooperative = exchange.outcome.is_cooperative();
        self.metrics.record_outcome(cooperative);
        summary.interactions = summary.interactions.saturating_add(1);
        if cooperative {
            summary.cooperative = summary.cooperative.saturating_add(1);
        }
    }

    // -----------------------------------------------------------------------
    // Phase 4: Yearly
    // -----------------------------------------------------------------------

    fn phase_yearly(&mut self, summary: &TickSummary) {
        if !summary.year_closed {
            return;
        }
        let year = self.clock.year();
        self.collect_taxes();

        let gov = &self.config.governance;
        for inst in self.institutions.iter_mut() {
            inst.leak(gov.admin_leak);
            inst.track_solvency(gov.dissolve_min_budget, gov.dissolve_min_members);
        }
        if is_every(year, gov.vote_every_years) {
            self.hold_votes(year);
        }

        let keep = 1.0 - self.config.governance.spoilage;
        for agent in self
            .agents
            .iter_mut()
            .filter(|a| a.kind() == AgentKind::Social)
        {
            agent.energy *= keep;
        }

        if self
            .drought
            .is_due(&self.config.drought, year, summary.tick)
        {
            let drought =
                self.drought
                    .start(&self.field, &self.config.drought, summary.tick, &mut self.rng);
            self.annals.push(AnnalEvent::Drought {
                tick: summary.tick,
                year,
                row: drought.row,
                col: drought.col,
            });
        }

        self.dissolve_broke(year);
        if is_every(year, self.config.governance.scan_every_years) {
            self.found_from_clusters(year);
        }
    }

    fn collect_taxes(&mut self) {
        let gov = &self.config.governance;
        let cap = self.config.agents.social.max_energy;
        for agent in self.agents.iter_mut().filter(|a| a.is_alive()) {
            let Some(id) = agent.institution() else {
                continue;
            };
            let Some(inst) = self.institutions.get_mut(id) else {
                continue;
            };
            if agent.energy > gov.tax_baseline {
                let tax = tax_due(agent.energy, inst.policy.tax_rate, gov.tax_baseline);
                agent.energy -= tax;
                inst.deposit(tax);
            }
            if agent.energy < gov.distress_threshold {
                let paid = inst.withdraw(gov.stipend);
                agent.gain(paid, cap);
            }
        }
    }

    fn hold_votes(&mut self, year: u64) {
        let gov = &self.config.governance;
        let energies: BTreeMap<AgentId, f64> = self
            .agents
            .iter()
            .filter(|a| a.is_alive())
            .map(|a| (a.id, a.energy))
            .collect();
        for inst in self.institutions.iter_mut() {
            if inst.members.is_empty() {
                continue;
            }
            let slates = [
                inst.policy
                    .perturbed(gov.slate_spread, gov.policy_cap, &mut self.rng),
                inst.policy
                    .perturbed(gov.slate_spread, gov.policy_cap, &mut self.rng),
            ];
            let mut perceived = Vec::with_capacity(inst.members.len());
            for member in &inst.members {
                if let Some(energy) = energies.get(member) {
                    perceived.push(energy + sampling::uniform(&mut self.rng, -1.0, 1.0));
                }
            }
            let winner = tally_vote(perceived, &slates, gov.tax_baseline);
            if let Some(policy) = slates.get(winner) {
                inst.policy = *policy;
            }
            debug!(
                institution = %inst.id,
                year,
                tax_rate = inst.policy.tax_rate,
                sanction = inst.policy.sanction,
                in_group_bonus = inst.policy.in_group_bonus,
                "Vote held"
            );
        }
    }

    fn dissolve_broke(&mut self, year: u64) {
        let grace = self.config.governance.dissolve_grace_years;
        let doomed: Vec<InstitutionId> = self
            .institutions
            .iter()
            .filter(|inst| inst.broke_years >= grace)
            .map(|inst| inst.id)
            .collect();
        for id in doomed {
            let Some(inst) = self.institutions.dissolve(id) else {
                continue;
            };
            for agent in &mut self.agents {
                if let Some(state) = agent.social_mut() {
                    if state.institution == Some(id) {
                        state.institution = None;
                    }
                }
            }
            info!(institution = %id, year, released = inst.members.len(), "Institution dissolved");
            self.annals
                .push(AnnalEvent::InstitutionDissolved { year, id });
        }
    }

    /// Strided scan for dense clusters of unaffiliated actors; each dense
    /// window founds an institution and recruits around its centre.
    fn found_from_clusters(&mut self, year: u64) {
        let gov = &self.config.governance;
        let (rows, cols) = (self.field.rows(), self.field.cols());
        let radius = gov.scan_radius;

        let mut index = ClusterIndex::default();
        for agent in self.agents.iter().filter(|a| a.is_alive()) {
            if agent.social().is_some_and(|s| s.institution.is_none()) {
                index.insert(self.field.cell_of(agent.pos));
            }
        }

        for centre in scan_centres(rows, cols, radius) {
            if index.window(centre, radius, rows, cols) < gov.min_cluster {
                continue;
            }
            let id = self
                .institutions
                .found(Policy::founding(gov, &mut self.rng), gov.found_budget);
            let mut recruited = 0_usize;
            for agent in self.agents.iter_mut().filter(|a| a.is_alive()) {
                let agent_id = agent.id;
                let cell = self.field.cell_of(agent.pos);
                let Some(state) = agent.social_mut() else {
                    continue;
                };
                if state.institution.is_some()
                    || cell_distance(cell.0, centre.0, rows) > radius
                    || cell_distance(cell.1, centre.1, cols) > radius
                    || !sampling::chance(&mut self.rng, gov.recruit_chance)
                {
                    continue;
                }
                if self.institutions.add_member(id, agent_id).is_ok() {
                    state.institution = Some(id);
                    index.remove(cell);
                    recruited = recruited.saturating_add(1);
                }
            }
            info!(institution = %id, year, members = recruited, "Institution founded");
            self.annals.push(AnnalEvent::InstitutionFounded {
                year,
                id,
                members: recruited,
            });
        }
    }

    // -----------------------------------------------------------------------
    // Phase 5: Reconcile
    // -----------------------------------------------------------------------

    fn phase_reconcile(&mut self, summary: &mut TickSummary) {
        let dead_social = self.cull(summary);
        for kind in [AgentKind::Herbivore, AgentKind::Predator] {
            self.breed(kind, summary);
        }
        self.join_or_leave();
        self.replace_social(dead_social);
    }

    /// Remove agents failing the alive invariant; returns dead social actors.
    fn cull(&mut self, summary: &mut TickSummary) -> usize {
        let mut dead_social = 0_usize;
        for agent in self.agents.iter().filter(|a| !a.is_alive()) {
            match agent.kind() {
                AgentKind::Social => {
                    dead_social = dead_social.saturating_add(1);
                    if let Some(id) = agent.institution() {
                        self.institutions.remove_member(id, agent.id);
                    }
                }
                AgentKind::Herbivore | AgentKind::Predator => {
                    self.env.add_nutrients(self.config.ecology.death_recycle);
                }
            }
        }
        let before = self.agents.len();
        self.agents.retain(Agent::is_alive);
        summary.deaths = before.saturating_sub(self.agents.len());
        dead_social
    }

    fn breed(&mut self, kind: AgentKind, summary: &mut TickSummary) {
        let births = pair_and_breed(
            &mut self.agents,
            kind,
            self.config.agents.get(kind),
            &self.torus,
            &mut self.rng,
        );
        for birth in births {
            let index = self.insert_agent(kind, birth.pos);
            if let Some(child) = self.agents.get_mut(index) {
                child.energy = birth.energy;
            }
            summary.births = summary.births.saturating_add(1);
        }
    }

    fn join_or_leave(&mut self) {
        let gov = &self.config.governance;
        let leave_below = gov.leave_below * self.config.agents.social.start_energy;
        for agent in &mut self.agents {
            let (agent_id, energy) = (agent.id, agent.energy);
            let Some(state) = agent.social_mut() else {
                continue;
            };
            match state.institution {
                Some(current) => {
                    if energy < leave_below && sampling::chance(&mut self.rng, gov.leave_chance) {
                        state.institution = None;
                        self.institutions.remove_member(current, agent_id);
                    }
                }
                None => {
                    if self.institutions.is_empty()
                        || !sampling::chance(&mut self.rng, gov.join_chance)
                    {
                        continue;
                    }
                    if let Some(target) = self.institutions.richest() {
                        if admit(&mut self.institutions, target, agent_id, gov.join_fee) {
                            state.institution = Some(target);
                        }
                    }
                }
            }
        }
    }

    /// Fresh actors take the places of the dead while below the cap.
    fn replace_social(&mut self, dead: usize) {
        for _ in 0..dead {
            if self.population().social >= self.config.agents.social.cap {
                break;
            }
            let pos = self.random_position(AgentKind::Social);
            let index = self.insert_agent(AgentKind::Social, pos);
            let gov = &self.config.governance;
            if self.institutions.is_empty()
                || !sampling::chance(&mut self.rng, gov.newcomer_join_chance)
            {
                continue;
            }
            let Some(target) = self.institutions.random(&mut self.rng) else {
                continue;
            };
            let Some(agent) = self.agents.get_mut(index) else {
                continue;
            };
            let agent_id = agent.id;
            if let Some(state) = agent.social_mut() {
                if admit(&mut self.institutions, target, agent_id, gov.newcomer_fee) {
                    state.institution = Some(target);
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Phase 6: Ambient
    // -----------------------------------------------------------------------

    fn phase_ambient(&mut self, dt: f64) {
        self.env.leak_water(dt);
        self.env.update_temperature();
        let biomass =
            self.field.mean_biomass() + self.plants.total_biomass() + self.moss_biomass();
        if biomass < BARREN_BIOMASS {
            self.env.add_nutrients(-BARREN_NUTRIENT_DECAY * dt);
        }
    }

    // -----------------------------------------------------------------------
    // Phase 7: Metrics
    // -----------------------------------------------------------------------

    fn phase_metrics(&mut self, summary: &TickSummary) {
        if !summary.year_closed {
            return;
        }
        let population = self.population();
        let average_energy = self.average_energy();
        let record = self.metrics.close_year(
            summary.tick,
            self.clock.year(),
            self.institutions.active_count(),
            average_energy,
            population,
        );
        debug!(
            year = record.year,
            cooperation_rate = record.cooperation_rate,
            institutions = record.institutions,
            average_energy = record.average_energy,
            population = population.total(),
            "Year closed"
        );
    }
}

/// Whether `year` is a positive multiple of `every` (never when `every` is 0).
fn is_every(year: u64, every: u64) -> bool {
    year > 0 && year.checked_rem(every) == Some(0)
}

/// Fine an exploiter on behalf of `inst`. Returns whether the fine landed.
fn sanction<R: Rng + ?Sized>(
    inst: &mut Institution,
    exploiter: &mut Agent,
    gov: &GovernanceConfig,
    rng: &mut R,
) -> bool {
    if !sampling::chance(rng, inst.sanction_probability(gov.monitor_base)) {
        return false;
    }
    let fine = inst.policy.sanction;
    exploiter.energy -= fine;
    inst.deposit(fine);
    if let Some(state) = exploiter.social_mut() {
        state.coop_bias = (state.coop_bias - gov.sanction_bias_penalty).clamp(-1.0, 1.0);
    }
    true
}

/// Add `agent` to `target` and pay its fee. The caller records the
/// membership on the agent when this returns `true`.
fn admit(
    registry: &mut InstitutionRegistry,
    target: InstitutionId,
    agent: AgentId,
    fee: f64,
) -> bool {
    if registry.add_member(target, agent).is_err() {
        return false;
    }
    if let Some(inst) = registry.get_mut(target) {
        inst.deposit(fee);
    }
    true
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;

    #[test]
    fn pipeline_runs_every_phase_once_in_order() {
        assert_eq!(PIPELINE.len(), 7);
        assert_eq!(PIPELINE.first(), Some(&Phase::Light));
        assert_eq!(PIPELINE.last(), Some(&Phase::Metrics));
        let yearly = PIPELINE.iter().position(|p| *p == Phase::Yearly).unwrap();
        let reconcile = PIPELINE.iter().position(|p| *p == Phase::Reconcile).unwrap();
        assert!(yearly < reconcile);
    }

    #[test]
    fn bad_dt_is_treated_as_zero() {
        assert_eq!(sanitize_dt(f64::NAN), 0.0);
        assert_eq!(sanitize_dt(-1.0), 0.0);
        assert_eq!(sanitize_dt(f64::INFINITY), 0.0);
        assert_eq!(sanitize_dt(0.5), 0.5);

        let mut world = World::new(SimulationConfig::default()).unwrap();
        let before = world.environment().light_phase();
        let summary = world.advance(f64::NAN);
        assert_eq!(summary.tick, 1);
        assert_eq!(summary.dt, 0.0);
        assert_eq!(world.environment().light_phase(), before);
    }

    #[test]
    fn every_is_positive_multiples_only() {
        assert!(!is_every(0, 5));
        assert!(is_every(5, 5));
        assert!(!is_every(7, 5));
        assert!(!is_every(10, 0));
    }

    #[test]
    fn years_produce_metrics_records() {
        let mut world = World::new(SimulationConfig::society()).unwrap();
        for _ in 0..30 {
            world.step(1.0);
        }
        assert_eq!(world.year(), 3);
        let years: Vec<u64> = world.metrics().records().iter().map(|r| r.year).collect();
        assert_eq!(years, vec![1, 2, 3]);
        assert!(world.metrics().window_len() > 0);
        let rate = world.metrics().latest().unwrap().cooperation_rate;
        assert!((0.0..=1.0).contains(&rate));
    }

    #[test]
    fn predators_eat_nearby_herbivores() {
        let mut config = SimulationConfig::default();
        config.agents.herbivore.initial = 0;
        config.agents.herbivore.metabolism = 0.0;
        config.agents.herbivore.speed = 0.0;
        config.agents.predator.speed = 0.0;
        config.agents.predator.metabolism = 0.0;
        let mut world = World::new(config).unwrap();
        world.spawn(AgentKind::Herbivore, DVec2::new(100.0, 100.0)).unwrap();
        let hunter = world.spawn(AgentKind::Predator, DVec2::new(104.0, 100.0)).unwrap();
        let summary = world.advance(0.05);
        assert_eq!(summary.kills, 1);
        assert_eq!(world.population().herbivores, 0);
        assert!((world.agent(hunter).unwrap().energy - 1.8).abs() < 1e-12);
    }

    #[test]
    fn lone_social_actor_climbs_to_richer_cell() {
        let mut config = SimulationConfig::society();
        config.agents.social.initial = 0;
        config.field.init_level = 0.0;
        let mut world = World::new(config).unwrap();
        world.field_mut().set(10, 11, 0.8);
        let id = world.spawn(AgentKind::Social, DVec2::new(10.5, 10.5)).unwrap();
        world.step(1.0);
        let agent = world.agent(id).unwrap();
        assert_eq!(world.field().cell_of(agent.pos), (10, 11));
        assert!(agent.energy > 5.0 - 0.6 - 0.015 * 5.0);
    }
}
