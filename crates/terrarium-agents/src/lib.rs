//! Agent behaviour, social interaction, and institutions for the Terrarium
//! simulation.
//!
//! This crate holds the per-agent and per-institution logic. It never owns
//! the world: every function receives exactly the pieces of state it reads
//! or writes, and the `terrarium-core` tick pipeline decides the order.
//!
//! # Modules
//!
//! - [`agent`] -- Base record plus the closed [`Behavior`] variant.
//! - [`config`] -- Per-kind, ecology, interaction, and governance parameters.
//! - [`movement`] -- Biased random walk, forage and hunt bias, hill climbing.
//! - [`energetics`] -- Grazing, capture, respiration, metabolism, harvest.
//! - [`reproduction`] -- Shuffled pairing with a hard population cap.
//! - [`social`] -- Reputation memory, partner choice, and payoffs.
//! - [`governance`] -- Institutions, taxation, votes, and cluster scans.
//! - [`error`] -- Errors for scenario setup calls ([`AgentError`]).

pub mod agent;
pub mod config;
pub mod energetics;
pub mod error;
pub mod governance;
pub mod movement;
pub mod reproduction;
pub mod social;

// Re-export primary types at crate root for convenience.
pub use agent::{Agent, Behavior, pair_mut};
pub use config::{EcologyConfig, GovernanceConfig, InteractionConfig, KindConfig, KindsConfig};
pub use error::AgentError;
pub use governance::{ClusterIndex, Institution, InstitutionRegistry, Policy, tally_vote, tax_due};
pub use reproduction::{Birth, pair_and_breed};
pub use social::{Candidate, Exchange, Outcome, SocialState};
