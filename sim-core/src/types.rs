// Core type aliases and shared records

use serde::{Deserialize, Serialize};

// === TYPE ALIASES ===

pub type AgentId = u32;
pub type Price = f64;
pub type Quantity = f64;
pub type Utility = f64;

// === PLAN ===

/// Delivery option an agent holds in a given period.
///
/// `None` is reachable only in benchmark mode, when even the normal plan
/// yields non-positive utility and the agent opts out of delivery entirely.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Plan {
    Green,
    Normal,
    None,
}

impl Plan {
    pub fn label(self) -> &'static str {
        match self {
            Plan::Green => "Green",
            Plan::Normal => "Normal",
            Plan::None => "None",
        }
    }
}

// === PERIOD RECORD ===

/// One period of an agent's history.
///
/// Written exactly once per processed period and never mutated afterwards;
/// later periods read prior-period peer state from these records.
#[derive(Clone, Debug)]
pub struct PeriodRecord {
    pub plan: Plan,
    pub quantity: Quantity,
    pub savings: f64,
    /// Budget snapshot at decision time, before savings accrual.
    pub budget: f64,
    pub utility_green: Utility,
    pub utility_normal: Utility,
    /// `utility_green - utility_normal`; sign convention fixed regardless of
    /// which plan was chosen.
    pub utility_disparity: Utility,
    pub emissions: f64,
}

// === PLAN QUOTES ===

/// Per-period plan costs and emission rates as quoted by the engine.
///
/// Costs drift upward at hike intervals; emission rates stay fixed.
#[derive(Clone, Copy, Debug)]
pub struct PlanQuotes {
    pub cost_green: f64,
    pub cost_normal: f64,
    pub emission_green: f64,
    pub emission_normal: f64,
}
