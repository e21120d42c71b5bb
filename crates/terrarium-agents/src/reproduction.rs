//! Pairwise reproduction of animals.
//!
//! Live agents of one kind are shuffled and paired off as (0, 1), (2, 3),
//! and so on. A pair reproduces when both partners hold at least the
//! threshold energy and stand strictly closer than the mate distance. The
//! child appears at the torus midpoint of its parents; each parent's energy
//! is multiplied by the parent factor. The population cap is hard: once the
//! kind reaches it, remaining pairs are skipped.

use glam::DVec2;
use rand::Rng;
use rand::seq::SliceRandom;
use terrarium_types::AgentKind;
use terrarium_world::Torus;

use crate::agent::{Agent, pair_mut};
use crate::config::KindConfig;

/// Planned birth produced by [`pair_and_breed`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Birth {
    /// Where the child appears.
    pub pos: DVec2,
    /// Energy of the child.
    pub energy: f64,
}

/// Whether `agent` has enough energy to mate.
pub fn can_reproduce(agent: &Agent, params: &KindConfig) -> bool {
    agent.is_alive() && agent.energy >= params.reproduce_threshold
}

/// Pair up live agents of `kind`, charge parents, and return the births.
///
/// The caller turns each [`Birth`] into a new agent. No birth is returned
/// that would take the kind past `params.cap`.
pub fn pair_and_breed<R: Rng + ?Sized>(
    agents: &mut [Agent],
    kind: AgentKind,
    params: &KindConfig,
    torus: &Torus,
    rng: &mut R,
) -> Vec<Birth> {
    let mut order: Vec<usize> = agents
        .iter()
        .enumerate()
        .filter(|(_, a)| a.kind() == kind && a.is_alive())
        .map(|(i, _)| i)
        .collect();
    let mut population = order.len();
    let mut births = Vec::new();
    if population >= params.cap {
        return births;
    }

    order.shuffle(rng);
    for pair in order.chunks_exact(2) {
        let [i, j] = pair else {
            continue;
        };
        let Some((a, b)) = pair_mut(agents, *i, *j) else {
            continue;
        };
        if !(can_reproduce(a, params) && can_reproduce(b, params)) {
            continue;
        }
        if torus.distance(a.pos, b.pos) >= params.mate_distance {
            continue;
        }
        births.push(Birth {
            pos: torus.midpoint(a.pos, b.pos),
            energy: params.child_energy,
        });
        a.energy *= params.parent_factor;
        b.energy *= params.parent_factor;
        population = population.saturating_add(1);
        if population >= params.cap {
            break;
        }
    }
    births
}
