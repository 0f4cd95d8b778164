//! Error taxonomy.
//!
//! - [`ConfigError`]: fatal, surfaces before any period runs.
//! - [`SolverError`]: structural failure of the closed-form derivation, also
//!   fatal (a broken utility specification, not a per-agent condition).
//! - [`NoSolution`]: recoverable per-agent numeric condition; logged to the
//!   error log while the run continues with the agent's prior decision state.

use thiserror::Error;

use crate::types::AgentId;

/// Fatal configuration problems, rejected before any period runs.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("population size must be at least 1")]
    EmptyPopulation,

    #[error("{name} interval is inverted (lower bound exceeds upper bound)")]
    InvertedInterval { name: &'static str },

    #[error("{name} must be positive")]
    NonPositive { name: &'static str },

    #[error("invalid {name} distribution: {reason}")]
    Distribution { name: &'static str, reason: String },

    #[error("friend count upper bound {hi} exceeds population minus one ({max})")]
    FriendIntervalTooLarge { hi: usize, max: usize },

    #[error("social mode requires at least one friend per agent, but the friend interval starts at 0")]
    ZeroFriendLowerBound,

    #[error("price hike interval must be at least 1")]
    ZeroHikeInterval,

    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// The first-order-condition system admits no closed-form optimum for the
/// requested utility structure.
#[derive(Debug, Error)]
pub enum SolverError {
    #[error("first-order conditions admit no closed-form optimum (residual {residual:.3e})")]
    NoClosedForm { residual: f64 },
}

/// No positive optimum exists for one agent/period substitution. Recoverable:
/// the engine logs it and carries the agent's prior decision forward.
#[derive(Debug, Error)]
#[error("no solution found for agent {agent} in period {period}")]
pub struct NoSolution {
    pub agent: AgentId,
    pub period: usize,
}

/// Umbrella error for a full simulation run.
#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Solver(#[from] SolverError),
}
