//! Agent-based simulation of green vs normal delivery adoption.
//!
//! A population of consumers maximises a logarithmic consumption/savings
//! utility with an eco-guilt penalty, subject to a linear budget constraint,
//! and each period subscribes to whichever delivery plan yields the higher
//! optimal utility. Three modes: a no-plan benchmark, independent choice,
//! and socially influenced choice where friends' previous-period decisions
//! feed a conformity term.
//!
//! The constrained optimisation is solved in closed form once per utility
//! specification per run ([`solver`]); agents instantiate the resulting
//! evaluators numerically per period ([`agent`]); the [`engine`] owns the
//! population and drives the period loop.

pub mod agent;
pub mod config;
pub mod engine;
pub mod errlog;
pub mod error;
pub mod population;
pub mod solver;
pub mod types;

pub use agent::Agent;
pub use config::SimConfig;
pub use engine::{Engine, Mode};
pub use errlog::ErrorLog;
pub use error::{ConfigError, NoSolution, SimError, SolverError};
pub use solver::{Allocation, ClosedForm, Solver, UtilityParams};
pub use types::{AgentId, PeriodRecord, Plan, PlanQuotes, Price, Quantity, Utility};
