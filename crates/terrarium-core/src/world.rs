//! The world aggregate.
//!
//! A [`World`] exclusively owns the environment, the resource field, the
//! producers, every agent, and every institution, together with the clock,
//! the metrics recorder, the annals, and the random source. Nothing outside
//! it holds a reference into its state; renderers and dashboards read
//! [`World::snapshot`] instead.
//!
//! The generator is a type parameter so tests and embedders can inject any
//! [`Rng`]. [`World::new`] seeds a [`StdRng`] from `world.seed`, which makes
//! two worlds built from the same configuration evolve identically.

use glam::DVec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use terrarium_agents::governance::Institution;
use terrarium_agents::{Agent, AgentError, Behavior, InstitutionRegistry, Policy};
use terrarium_types::{AgentId, AgentKind, AnnalEvent, IdSequence, InstitutionId, Population};
use terrarium_world::{
    DroughtState, Environment, MossPool, PlantBed, Producer, ResourceField, Torus, sampling,
};
use tracing::{info, warn};

use crate::clock::WorldClock;
use crate::config::{ConfigError, SimulationConfig};
use crate::metrics::MetricsRecorder;

/// The whole simulated world.
#[derive(Debug, Clone)]
pub struct World<R = StdRng> {
    pub(crate) config: SimulationConfig,
    pub(crate) torus: Torus,
    pub(crate) env: Environment,
    pub(crate) field: ResourceField,
    pub(crate) plants: PlantBed,
    pub(crate) moss: Option<MossPool>,
    pub(crate) drought: DroughtState,
    pub(crate) agents: Vec<Agent>,
    pub(crate) agent_ids: IdSequence,
    pub(crate) institutions: InstitutionRegistry,
    pub(crate) clock: WorldClock,
    pub(crate) metrics: MetricsRecorder,
    pub(crate) annals: Vec<AnnalEvent>,
    pub(crate) rng: R,
}

impl World<StdRng> {
    /// Build a world seeded from `config.world.seed`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration fails validation.
    pub fn new(config: SimulationConfig) -> Result<Self, ConfigError> {
        let rng = StdRng::seed_from_u64(config.world.seed);
        Self::with_rng(config, rng)
    }
}

impl<R: Rng> World<R> {
    /// Build a world that draws from `rng`.
    ///
    /// Initial agents of every kind are scattered at random; social actors
    /// start on cell centres. When `governance.initial_institution` is set
    /// and the world starts with social actors, one institution is founded
    /// with a uniform policy and each social actor joins it with
    /// `governance.initial_join_chance`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration fails validation.
    pub fn with_rng(config: SimulationConfig, mut rng: R) -> Result<Self, ConfigError> {
        config.validate()?;
        let torus = Torus::new(config.world.width, config.world.height)?;
        let clock = WorldClock::new(config.time.year_ticks)?;
        let env = Environment::new(&config.environment);
        let field = ResourceField::seeded(&torus, &config.field, &mut rng)?;
        let plants = PlantBed::seeded(&torus, &config.plants, &mut rng);
        let moss = config.moss.enabled.then(|| MossPool::new(&config.moss));
        let metrics = MetricsRecorder::new(config.metrics.window);

        let mut world = Self {
            config,
            torus,
            env,
            field,
            plants,
            moss,
            drought: DroughtState::default(),
            agents: Vec::new(),
            agent_ids: IdSequence::new(),
            institutions: InstitutionRegistry::new(),
            clock,
            metrics,
            annals: Vec::new(),
            rng,
        };
        world.populate();

        info!(
            name = %world.config.world.name,
            seed = world.config.world.seed,
            rows = world.field.rows(),
            cols = world.field.cols(),
            agents = world.agents.len(),
            institutions = world.institutions.len(),
            "World created"
        );
        Ok(world)
    }

    fn populate(&mut self) {
        for kind in AgentKind::ALL {
            for _ in 0..self.config.agents.get(kind).initial {
                let pos = self.random_position(kind);
                self.insert_agent(kind, pos);
            }
        }

        let gov = &self.config.governance;
        if !gov.initial_institution || self.config.agents.social.initial == 0 {
            return;
        }
        let id = self
            .institutions
            .found(Policy::uniform(gov.initial_policy).clamped(gov.policy_cap), 0.0);
        for agent in &mut self.agents {
            let agent_id = agent.id;
            let Some(state) = agent.social_mut() else {
                continue;
            };
            if sampling::chance(&mut self.rng, gov.initial_join_chance)
                && self.institutions.add_member(id, agent_id).is_ok()
            {
                state.institution = Some(id);
            }
        }
    }

    /// A random legal position for a new agent of `kind`.
    pub(crate) fn random_position(&mut self, kind: AgentKind) -> DVec2 {
        match kind {
            AgentKind::Social => {
                let row = sampling::index(&mut self.rng, self.field.rows()).unwrap_or(0);
                let col = sampling::index(&mut self.rng, self.field.cols()).unwrap_or(0);
                self.field.cell_center(row, col)
            }
            AgentKind::Herbivore | AgentKind::Predator => self.torus.random_point(&mut self.rng),
        }
    }

    /// Create an agent of `kind` at `pos` and return its index.
    pub(crate) fn insert_agent(&mut self, kind: AgentKind, pos: DVec2) -> usize {
        let id: AgentId = self.agent_ids.issue();
        let behavior = Behavior::for_kind(kind, &self.config.interaction, &mut self.rng);
        let agent = Agent::new(id, pos, behavior, self.config.agents.get(kind), &mut self.rng);
        let index = self.agents.len();
        self.agents.push(agent);
        index
    }

    // -----------------------------------------------------------------------
    // Scenario setup
    // -----------------------------------------------------------------------

    /// Add an agent of `kind` at `pos`, as a user would with a spawn button.
    ///
    /// The position wraps onto the torus; social actors snap to the centre
    /// of their cell. Returns `None` when the kind is at its population cap
    /// or the position is not finite.
    pub fn spawn(&mut self, kind: AgentKind, pos: DVec2) -> Option<AgentId> {
        if !pos.is_finite() {
            warn!(x = pos.x, y = pos.y, %kind, "Ignoring spawn at a non-finite position");
            return None;
        }
        if self.population().of(kind) >= self.config.agents.get(kind).cap {
            return None;
        }
        let pos = match kind {
            AgentKind::Social => {
                let (row, col) = self.field.cell_of(pos);
                self.field.cell_center(row, col)
            }
            AgentKind::Herbivore | AgentKind::Predator => self.torus.wrap(pos),
        };
        let index = self.insert_agent(kind, pos);
        self.agents.get(index).map(|a| a.id)
    }

    /// Found an institution with the given policy, clamped to the policy
    /// cap, and budget.
    pub fn found_institution(&mut self, policy: Policy, budget: f64) -> InstitutionId {
        let policy = policy.clamped(self.config.governance.policy_cap);
        let id = self.institutions.found(policy, budget);
        info!(institution = %id, budget, "Institution founded by setup");
        id
    }

    /// Make the social actor `agent` a member of `institution`, leaving any
    /// institution it belonged to before.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] if either id is unknown or the agent is not a
    /// social actor.
    pub fn enroll(&mut self, agent: AgentId, institution: InstitutionId) -> Result<(), AgentError> {
        if !self.institutions.contains(institution) {
            return Err(AgentError::InstitutionNotFound(institution));
        }
        let member = self
            .agents
            .iter_mut()
            .find(|a| a.id == agent)
            .ok_or(AgentError::AgentNotFound(agent))?;
        let state = member.social_mut().ok_or(AgentError::NotSocial { id: agent })?;
        if let Some(previous) = state.institution.replace(institution) {
            self.institutions.remove_member(previous, agent);
        }
        self.institutions.add_member(institution, agent)
    }

    /// Set the day-night phase (wrapped into `[0, 1)`).
    pub fn set_light_phase(&mut self, phase: f64) {
        self.env.set_light_phase(phase);
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// The configuration the world was built from.
    pub const fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Ticks executed so far.
    pub const fn tick(&self) -> u64 {
        self.clock.tick()
    }

    /// Completed years.
    pub const fn year(&self) -> u64 {
        self.clock.year()
    }

    /// Torus geometry.
    pub const fn torus(&self) -> &Torus {
        &self.torus
    }

    /// Environment pools.
    pub const fn environment(&self) -> &Environment {
        &self.env
    }

    /// Resource field.
    pub const fn field(&self) -> &ResourceField {
        &self.field
    }

    /// Resource field, for scenario setup.
    pub const fn field_mut(&mut self) -> &mut ResourceField {
        &mut self.field
    }

    /// Plant patches.
    pub const fn plants(&self) -> &PlantBed {
        &self.plants
    }

    /// Biomass of the moss pool (zero when disabled).
    pub fn moss_biomass(&self) -> f64 {
        self.moss.as_ref().map_or(0.0, Producer::biomass)
    }

    /// Every agent currently in the world.
    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    /// Look up an agent by id.
    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents.iter().find(|a| a.id == id)
    }

    /// Look up an agent by id, for scenario setup.
    pub fn agent_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        self.agents.iter_mut().find(|a| a.id == id)
    }

    /// Live institutions.
    pub const fn institutions(&self) -> &InstitutionRegistry {
        &self.institutions
    }

    /// Look up an institution by id.
    pub fn institution(&self, id: InstitutionId) -> Option<&Institution> {
        self.institutions.get(id)
    }

    /// Notable events in the order they happened.
    pub fn annals(&self) -> &[AnnalEvent] {
        &self.annals
    }

    /// Rolling cooperation window and yearly records.
    pub const fn metrics(&self) -> &MetricsRecorder {
        &self.metrics
    }

    /// Live agents per kind.
    pub fn population(&self) -> Population {
        let mut population = Population::default();
        for agent in self.agents.iter().filter(|a| a.is_alive()) {
            let count = match agent.kind() {
                AgentKind::Herbivore => &mut population.herbivores,
                AgentKind::Predator => &mut population.predators,
                AgentKind::Social => &mut population.social,
            };
            *count = count.saturating_add(1);
        }
        population
    }

    /// Mean energy of live agents (zero when none are alive).
    #[allow(clippy::cast_precision_loss)]
    pub fn average_energy(&self) -> f64 {
        let (total, count) = self
            .agents
            .iter()
            .filter(|a| a.is_alive())
            .fold((0.0, 0_usize), |(sum, n), a| (sum + a.energy, n.saturating_add(1)));
        if count == 0 { 0.0 } else { total / count as f64 }
    }

    /// Whether agent and institution membership agree in both directions.
    ///
    /// Every affiliated agent must name a live institution that lists it,
    /// and every listed member must be an agent that names that institution.
    pub fn membership_is_consistent(&self) -> bool {
        let agents_agree = self.agents.iter().all(|agent| {
            agent.institution().is_none_or(|id| {
                self.institutions
                    .get(id)
                    .is_some_and(|inst| inst.members.contains(&agent.id))
            })
        });
        let members_agree = self.institutions.iter().all(|inst| {
            inst.members.iter().all(|member| {
                self.agent(*member)
                    .is_none_or(|agent| agent.institution() == Some(inst.id))
            })
        });
        agents_agree && members_agree
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use rand::rngs::SmallRng;

    use super::*;

    fn quiet() -> SimulationConfig {
        let mut config = SimulationConfig::society();
        config.agents.social.initial = 0;
        config
    }

    #[test]
    fn default_world_has_herbivores_and_plants() {
        let world = World::new(SimulationConfig::default()).unwrap();
        assert_eq!(world.population().herbivores, 25);
        assert_eq!(world.population().social, 0);
        assert_eq!(world.plants().len(), 3);
        assert!(world.institutions().is_empty());
        assert!(world.moss_biomass() > 0.0);
    }

    #[test]
    fn society_world_founds_the_initial_institution() {
        let world = World::new(SimulationConfig::society()).unwrap();
        assert_eq!(world.population().social, 300);
        assert_eq!(world.institutions().len(), 1);
        let members = world.institutions().iter().next().unwrap().members.len();
        assert!(members > 0 && members < 300);
        assert!(world.membership_is_consistent());
        for agent in world.agents() {
            let (row, col) = world.field().cell_of(agent.pos);
            assert_eq!(agent.pos, world.field().cell_center(row, col));
        }
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = SimulationConfig::default();
        config.world.height = -1.0;
        assert!(matches!(
            World::new(config),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn injected_rng_is_used() {
        let a = World::with_rng(SimulationConfig::default(), SmallRng::seed_from_u64(5)).unwrap();
        let b = World::with_rng(SimulationConfig::default(), SmallRng::seed_from_u64(5)).unwrap();
        assert_eq!(a.agents(), b.agents());
    }

    #[test]
    fn spawn_respects_caps_and_wraps() {
        let mut config = SimulationConfig::default();
        config.agents.herbivore.initial = 0;
        config.agents.herbivore.cap = 2;
        let mut world = World::new(config).unwrap();
        let first = world.spawn(AgentKind::Herbivore, DVec2::new(950.0, -10.0)).unwrap();
        let pos = world.agent(first).unwrap().pos;
        assert!(world.torus().contains(pos));
        assert!((pos.x - 50.0).abs() < 1e-9);
        assert!(world.spawn(AgentKind::Herbivore, DVec2::new(1.0, 1.0)).is_some());
        assert!(world.spawn(AgentKind::Herbivore, DVec2::new(1.0, 1.0)).is_none());
        assert!(world.spawn(AgentKind::Predator, DVec2::new(f64::NAN, 1.0)).is_none());
    }

    #[test]
    fn spawned_ids_are_never_reused() {
        let mut world = World::new(quiet()).unwrap();
        let a = world.spawn(AgentKind::Social, DVec2::new(3.2, 4.7)).unwrap();
        let b = world.spawn(AgentKind::Social, DVec2::new(3.2, 4.7)).unwrap();
        assert!(b > a);
        assert_eq!(world.agent(a).unwrap().pos, DVec2::new(3.5, 4.5));
    }

    #[test]
    fn enroll_moves_membership() {
        let mut world = World::new(quiet()).unwrap();
        let agent = world.spawn(AgentKind::Social, DVec2::new(1.0, 1.0)).unwrap();
        let first = world.found_institution(Policy::uniform(0.1), 0.0);
        let second = world.found_institution(Policy::uniform(0.2), 1.0);
        world.enroll(agent, first).unwrap();
        world.enroll(agent, second).unwrap();
        assert_eq!(world.agent(agent).unwrap().institution(), Some(second));
        assert!(world.institution(first).unwrap().members.is_empty());
        assert!(world.institution(second).unwrap().members.contains(&agent));
        assert!(world.membership_is_consistent());
    }

    #[test]
    fn enroll_reports_bad_ids() {
        let mut world = World::new(SimulationConfig::default()).unwrap();
        let herbivore = world.agents().first().unwrap().id;
        let inst = world.found_institution(Policy::uniform(0.1), 0.0);
        assert_eq!(
            world.enroll(herbivore, inst),
            Err(AgentError::NotSocial { id: herbivore })
        );
        assert_eq!(
            world.enroll(AgentId(9999), inst),
            Err(AgentError::AgentNotFound(AgentId(9999)))
        );
        assert_eq!(
            world.enroll(herbivore, InstitutionId(77)),
            Err(AgentError::InstitutionNotFound(InstitutionId(77)))
        );
    }
}
