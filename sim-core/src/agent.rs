//! Agents and their per-period decision procedures.
//!
//! Each period an agent evaluates the closed-form optimal utility of both
//! delivery plans with its own parameters and picks the higher one, recording
//! the full outcome in append-only history. An agent's state is mutated only
//! by its own decision and budget-update calls; the only cross-agent reads
//! are of friends' previous-period plans, which are immutable by then.

use crate::error::NoSolution;
use crate::solver::{Allocation, ClosedForm, UtilityParams};
use crate::types::{AgentId, PeriodRecord, Plan, PlanQuotes};

// === AGENT ===

/// One consumer choosing between green and normal delivery each period.
#[derive(Clone, Debug)]
pub struct Agent {
    pub id: AgentId,
    /// Consumption weight, drawn from a Beta distribution.
    pub a: f64,
    /// Savings weight, `1 - a`.
    pub b: f64,
    /// Eco-consciousness: scales the emissions disutility.
    pub mu: f64,
    /// Affinity to peer opinion; only read in social rounds.
    pub delta: f64,
    /// Per-unit price of the average good; inflated by the engine.
    pub price: f64,
    /// Disposable income, fed by the savings-accrual rule.
    pub budget: f64,
    pub current_plan: Plan,
    pub current_utility: f64,
    /// Ids of agents whose opinion this one values. Fixed at generation time
    /// and never contains `id` itself.
    pub friends: Vec<AgentId>,
    history: Vec<PeriodRecord>,
}

impl Agent {
    pub fn new(id: AgentId, a: f64, mu: f64, budget: f64, price: f64, delta: f64) -> Self {
        Self {
            id,
            a,
            b: 1.0 - a,
            mu,
            delta,
            price,
            budget,
            current_plan: Plan::Normal,
            current_utility: 0.0,
            friends: Vec::new(),
            history: Vec::new(),
        }
    }

    // === HISTORY ===

    pub fn history(&self) -> &[PeriodRecord] {
        &self.history
    }

    pub fn record(&self, period: usize) -> Option<&PeriodRecord> {
        self.history.get(period)
    }

    /// Append the record for `period`. Panics if the period has already been
    /// written or an earlier period was skipped: history holds exactly one
    /// entry per processed period and entries are never overwritten.
    fn push_record(&mut self, period: usize, record: PeriodRecord) {
        assert_eq!(
            period,
            self.history.len(),
            "agent {} history must be written in period order, exactly once",
            self.id
        );
        self.history.push(record);
    }

    // === DECISION PROCEDURES ===

    /// Decide between green and normal for `period`.
    ///
    /// `prev_plans` is `Some` only in social rounds: a snapshot of every
    /// agent's previous-period plan, indexed by agent id. Each side's utility
    /// uses its own plan's peer fraction. A side with no positive optimum is
    /// treated as unaffordable (NaN utility) and the other side is chosen;
    /// if neither side solves, the no-solution condition is returned and no
    /// state is touched.
    pub fn decide_period(
        &mut self,
        period: usize,
        quotes: &PlanQuotes,
        form: &ClosedForm,
        prev_plans: Option<&[Plan]>,
    ) -> Result<(), NoSolution> {
        let (green_share, normal_share) = match prev_plans {
            Some(plans) => self.peer_shares(plans),
            None => (0.0, 0.0),
        };

        let green = form.evaluate(&self.params(quotes.emission_green, quotes.cost_green, green_share));
        let normal =
            form.evaluate(&self.params(quotes.emission_normal, quotes.cost_normal, normal_share));

        match (green, normal) {
            (None, None) => Err(NoSolution {
                agent: self.id,
                period,
            }),
            (Some(g), None) => {
                self.assign(period, Plan::Green, &g, quotes.emission_green, g.utility, f64::NAN);
                Ok(())
            }
            (None, Some(n)) => {
                self.assign(period, Plan::Normal, &n, quotes.emission_normal, f64::NAN, n.utility);
                Ok(())
            }
            (Some(g), Some(n)) => {
                // Green only on strictly higher utility; ties resolve to normal.
                if g.utility > n.utility {
                    self.assign(period, Plan::Green, &g, quotes.emission_green, g.utility, n.utility);
                } else {
                    self.assign(period, Plan::Normal, &n, quotes.emission_normal, g.utility, n.utility);
                }
                Ok(())
            }
        }
    }

    /// Benchmark round: no green alternative exists. The agent subscribes to
    /// normal delivery only if it yields strictly positive utility, otherwise
    /// it opts out, consumes nothing and banks the whole budget.
    pub fn decide_benchmark_period(
        &mut self,
        period: usize,
        cost_normal: f64,
        emission_normal: f64,
        form: &ClosedForm,
    ) {
        match form.evaluate(&self.params(emission_normal, cost_normal, 0.0)) {
            Some(n) if n.utility > 0.0 => {
                self.assign(period, Plan::Normal, &n, emission_normal, 0.0, n.utility);
            }
            Some(n) => self.opt_out(period, n.utility),
            None => self.opt_out(period, f64::NAN),
        }
    }

    /// Repeat the previous period's outcome when no optimum exists (the
    /// no-solution condition): decision state stays unchanged and history
    /// stays dense. At period 0 there is nothing to repeat, so the agent
    /// opts out.
    pub fn carry_forward(&mut self, period: usize) {
        match self.history.last().cloned() {
            Some(prev) => {
                let budget = self.budget;
                self.push_record(period, PeriodRecord { budget, ..prev });
            }
            None => self.opt_out(period, f64::NAN),
        }
    }

    /// Accrue `yield_rate` of the period's recorded savings back into the
    /// budget. Must run once per period, after the decision and before the
    /// next period's decision.
    pub fn apply_period_savings(&mut self, period: usize, yield_rate: f64) {
        if let Some(rec) = self.history.get(period) {
            self.budget += yield_rate * rec.savings;
        }
    }

    // === INTERNALS ===

    fn params(&self, emission: f64, cost: f64, peer_fraction: f64) -> UtilityParams {
        UtilityParams {
            a: self.a,
            b: self.b,
            mu: self.mu,
            budget: self.budget,
            price: self.price,
            emission,
            cost,
            delta: self.delta,
            peer_fraction,
        }
    }

    /// Fractions of this agent's friends on each plan in the previous period.
    ///
    /// With no friends both shares are zero, which collapses the social
    /// conformity term to the base utility rather than dividing by zero.
    fn peer_shares(&self, prev_plans: &[Plan]) -> (f64, f64) {
        if self.friends.is_empty() {
            return (0.0, 0.0);
        }
        let mut green = 0usize;
        let mut normal = 0usize;
        for &friend in &self.friends {
            match prev_plans[friend as usize] {
                Plan::Green => green += 1,
                Plan::Normal => normal += 1,
                Plan::None => {}
            }
        }
        let count = self.friends.len() as f64;
        (green as f64 / count, normal as f64 / count)
    }

    fn assign(
        &mut self,
        period: usize,
        plan: Plan,
        alloc: &Allocation,
        emission_rate: f64,
        utility_green: f64,
        utility_normal: f64,
    ) {
        self.current_plan = plan;
        self.current_utility = alloc.utility;
        self.push_record(
            period,
            PeriodRecord {
                plan,
                quantity: alloc.quantity,
                savings: alloc.savings,
                budget: self.budget,
                utility_green,
                utility_normal,
                utility_disparity: utility_green - utility_normal,
                emissions: alloc.quantity * emission_rate,
            },
        );
    }

    fn opt_out(&mut self, period: usize, utility_normal: f64) {
        self.current_plan = Plan::None;
        self.current_utility = 0.0;
        self.push_record(
            period,
            PeriodRecord {
                plan: Plan::None,
                quantity: 0.0,
                savings: self.budget,
                budget: self.budget,
                utility_green: 0.0,
                utility_normal,
                utility_disparity: 0.0 - utility_normal,
                emissions: 0.0,
            },
        );
    }
}
