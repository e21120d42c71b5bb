//! Error types for the terrarium-agents crate.
//!
//! Behaviour never fails: shortfalls and overshoots are clamped. Errors are
//! reserved for scenario setup calls that name agents or institutions that
//! do not exist.

use terrarium_types::{AgentId, InstitutionId};

/// Errors that can occur while wiring agents to institutions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AgentError {
    /// No live agent has this id.
    #[error("agent not found: {0}")]
    AgentNotFound(AgentId),

    /// No live institution has this id.
    #[error("institution not found: {0}")]
    InstitutionNotFound(InstitutionId),

    /// Only social actors can belong to institutions.
    #[error("agent {id} is not a social actor")]
    NotSocial {
        /// The offending agent.
        id: AgentId,
    },
}
