//! Detached read-only views of the world for renderers and tests.

use rand::Rng;
use terrarium_types::{PoolReadings, WorldSnapshot};

use crate::world::World;

impl<R: Rng> World<R> {
    /// Copy the observable state of the world.
    ///
    /// The snapshot owns all of its data; holding one never borrows the
    /// world, and it serialises to JSON with `serde`.
    pub fn snapshot(&self) -> WorldSnapshot {
        let agents = self
            .agents
            .iter()
            .map(|a| a.view(self.config.agents.get(a.kind()).size))
            .collect();
        WorldSnapshot {
            tick: self.clock.tick(),
            year: self.clock.year(),
            pools: self.pools(),
            field: self.field.view(),
            agents,
            institutions: self.institutions.views(),
            plants: self.plants.views(),
            moss_biomass: self.moss_biomass(),
            population: self.population(),
        }
    }

    /// Current environment pools, for the HUD line.
    pub fn pools(&self) -> PoolReadings {
        self.env.readings()
    }

    /// Whether every pool and every field cell lies within its bounds.
    pub fn within_bounds(&self) -> bool {
        self.env.within_bounds() && self.field.within_bounds()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use glam::DVec2;
    use terrarium_agents::Policy;
    use terrarium_types::{AgentKind, UNAFFILIATED_COLOR, institution_color};

    use crate::config::SimulationConfig;
    use crate::world::World;

    #[test]
    fn snapshot_mirrors_the_world() {
        let world = World::new(SimulationConfig::default()).unwrap();
        let snap = world.snapshot();
        assert_eq!(snap.tick, 0);
        assert_eq!(snap.agents.len(), world.agents().len());
        assert_eq!(snap.population, world.population());
        assert_eq!(snap.field.rows * snap.field.cols, snap.field.cells.len());
        assert_eq!(snap.plants.len(), 3);
        assert_eq!(snap.pools, world.pools());
        assert!(snap.agents.iter().all(|a| a.size == 2.0));
    }

    #[test]
    fn snapshot_colours_follow_membership() {
        let mut config = SimulationConfig::society();
        config.agents.social.initial = 0;
        let mut world = World::new(config).unwrap();
        let member = world.spawn(AgentKind::Social, DVec2::new(2.0, 2.0)).unwrap();
        let loner = world.spawn(AgentKind::Social, DVec2::new(9.0, 9.0)).unwrap();
        let inst = world.found_institution(Policy::uniform(0.1), 2.0);
        world.enroll(member, inst).unwrap();

        let snap = world.snapshot();
        let view = |id| snap.agents.iter().find(|a| a.id == id).unwrap();
        assert_eq!(view(member).color, institution_color(inst));
        assert_eq!(view(loner).color, UNAFFILIATED_COLOR);
        assert_eq!(snap.institutions.len(), 1);
        assert_eq!(snap.institutions.first().unwrap().members, 1);
    }

    #[test]
    fn snapshot_serialises_to_json() {
        let mut world = World::new(SimulationConfig::default()).unwrap();
        world.step(0.05);
        let json = serde_json::to_string(&world.snapshot()).unwrap();
        let back: terrarium_types::WorldSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.tick, 1);
        assert_eq!(back.agents.len(), world.agents().len());
    }
}
