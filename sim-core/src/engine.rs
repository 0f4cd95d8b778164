//! The simulation engine: owns the population and the solver, drives the
//! period loops for the three modes, and evolves the price path.
//!
//! Scheduling is a single-threaded sequential sweep: every agent finishes
//! period `t` before period `t+1` starts, so social rounds only ever read
//! prior-period peer state that is immutable by the time it is read.

use rand::Rng;

use crate::agent::Agent;
use crate::config::SimConfig;
use crate::errlog::ErrorLog;
use crate::error::{ConfigError, SimError};
use crate::population;
use crate::solver::Solver;
use crate::types::{Plan, PlanQuotes};

const PERIODS_PER_YEAR: i32 = 12;

// === MODE ===

/// The three mutually exclusive simulation modes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// No green alternative exists; agents may opt out of delivery entirely.
    Benchmark,
    /// Agents choose between plans without any peer influence.
    Independent,
    /// From period 1 on, friends' previous-period plans feed a conformity
    /// term in the utility.
    Social,
}

// === ENGINE ===

pub struct Engine {
    config: SimConfig,
    pub agents: Vec<Agent>,
    /// Live plan quotes; costs drift upward at hike intervals.
    quotes: PlanQuotes,
    solver: Solver,
    pub error_log: ErrorLog,
    periods_run: usize,
}

impl Engine {
    /// Validate the configuration and generate the population.
    pub fn new<R: Rng + ?Sized>(config: SimConfig, rng: &mut R) -> Result<Self, ConfigError> {
        config.validate()?;
        let agents = population::generate_agents(&config, rng)?;
        tracing::info!(num_agents = agents.len() as u64, "engine initialised");
        Ok(Self {
            quotes: PlanQuotes {
                cost_green: config.cost_green,
                cost_normal: config.cost_normal,
                emission_green: config.emission_green,
                emission_normal: config.emission_normal,
            },
            agents,
            solver: Solver::new(),
            error_log: ErrorLog::new(),
            config,
            periods_run: 0,
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn quotes(&self) -> PlanQuotes {
        self.quotes
    }

    pub fn periods_run(&self) -> usize {
        self.periods_run
    }

    /// Green vs normal adopter counts after the last processed period.
    pub fn delivery_share(&self) -> (usize, usize) {
        let green = self
            .agents
            .iter()
            .filter(|a| a.current_plan == Plan::Green)
            .count();
        let normal = self
            .agents
            .iter()
            .filter(|a| a.current_plan == Plan::Normal)
            .count();
        (green, normal)
    }

    pub fn run(&mut self, mode: Mode, periods: usize) -> Result<(), SimError> {
        match mode {
            Mode::Benchmark => self.run_benchmark(periods),
            Mode::Independent => self.run_independent(periods),
            Mode::Social => self.run_social(periods),
        }
    }

    // === BENCHMARK MODE ===

    /// Only the normal plan exists; agents with non-positive utility opt out.
    pub fn run_benchmark(&mut self, periods: usize) -> Result<(), SimError> {
        tracing::info!(periods = periods as u64, "running benchmark mode");
        let form = self.solver.solve_base()?;

        for period in 0..periods {
            for agent in &mut self.agents {
                agent.decide_benchmark_period(
                    period,
                    self.quotes.cost_normal,
                    self.quotes.emission_normal,
                    &form,
                );
                agent.apply_period_savings(period, self.config.savings_yield);
            }
            self.inflate_prices(period);
        }

        self.periods_run = periods;
        Ok(())
    }

    // === INDEPENDENT MODE ===

    /// Agents decide without peer influence. Savings accrual and inflation
    /// apply only when the config models income growth.
    pub fn run_independent(&mut self, periods: usize) -> Result<(), SimError> {
        tracing::info!(periods = periods as u64, "running independent mode");
        let form = self.solver.solve_base()?;

        for period in 0..periods {
            for agent in &mut self.agents {
                if let Err(err) = agent.decide_period(period, &self.quotes, &form, None) {
                    self.error_log.no_solution(&err);
                    agent.carry_forward(period);
                }
                if self.config.income_growth {
                    agent.apply_period_savings(period, self.config.savings_yield);
                }
            }
            if self.config.income_growth {
                self.inflate_prices(period);
            }
        }

        self.periods_run = periods;
        Ok(())
    }

    // === SOCIAL MODE ===

    /// Period 0 is decided with the base form (no peer history exists yet);
    /// the social form takes over from period 1 onward, reading friends'
    /// period-`t-1` plans.
    pub fn run_social(&mut self, periods: usize) -> Result<(), SimError> {
        tracing::info!(periods = periods as u64, "running social mode");
        self.config.validate_social()?;
        let base = self.solver.solve_base()?;
        if periods == 0 {
            self.periods_run = 0;
            return Ok(());
        }

        for agent in &mut self.agents {
            if let Err(err) = agent.decide_period(0, &self.quotes, &base, None) {
                self.error_log.no_solution(&err);
                agent.carry_forward(0);
            }
            agent.apply_period_savings(0, self.config.savings_yield);
        }
        self.inflate_prices(0);

        let social = self.solver.solve_social()?;
        for period in 1..periods {
            // Frozen before the sweep: agents only read prior-period state.
            let prev_plans: Vec<Plan> = self
                .agents
                .iter()
                .map(|a| a.record(period - 1).map_or(Plan::None, |r| r.plan))
                .collect();

            for agent in &mut self.agents {
                if let Err(err) =
                    agent.decide_period(period, &self.quotes, &social, Some(&prev_plans))
                {
                    self.error_log.no_solution(&err);
                    agent.carry_forward(period);
                }
                agent.apply_period_savings(period, self.config.savings_yield);
            }
            self.inflate_prices(period);
        }

        self.periods_run = periods;
        Ok(())
    }

    // === PRICE INFLATION ===

    /// Per-period compounding factor derived from the annual rate, so that
    /// twelve periods of inflation reproduce one year's worth.
    fn monthly_inflation(&self) -> f64 {
        (1.0 + self.config.inflation_rate).powf(1.0 / f64::from(PERIODS_PER_YEAR)) - 1.0
    }

    /// Background inflation moves the average-good price every period; plan
    /// costs are hiked by the compounded multiplier only at nonzero multiples
    /// of the hike interval, modelling discrete subscription price increases.
    fn inflate_prices(&mut self, period: usize) {
        let monthly = self.monthly_inflation();
        for agent in &mut self.agents {
            agent.price *= 1.0 + monthly;
        }

        let interval = self.config.price_hike_interval;
        if period != 0 && period % interval == 0 {
            let hike = (1.0 + monthly).powi(interval as i32);
            self.quotes.cost_green *= hike;
            self.quotes.cost_normal *= hike;
            tracing::debug!(
                period = period as u64,
                cost_green = self.quotes.cost_green,
                cost_normal = self.quotes.cost_normal,
                "plan costs hiked"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn small_config() -> SimConfig {
        SimConfig {
            num_agents: 10,
            friend_interval: (1, 3),
            ..SimConfig::default()
        }
    }

    #[test]
    fn benchmark_history_is_dense() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut engine = Engine::new(small_config(), &mut rng).unwrap();
        engine.run(Mode::Benchmark, 5).unwrap();

        assert_eq!(engine.periods_run(), 5);
        for agent in &engine.agents {
            assert_eq!(agent.history().len(), 5);
            assert_eq!(agent.record(4).unwrap().plan, agent.current_plan);
        }
    }

    #[test]
    fn social_mode_rejects_zero_friend_lower_bound() {
        let config = SimConfig {
            friend_interval: (0, 3),
            ..small_config()
        };
        let mut rng = StdRng::seed_from_u64(2);
        let mut engine = Engine::new(config, &mut rng).unwrap();
        assert!(matches!(
            engine.run(Mode::Social, 3),
            Err(SimError::Config(ConfigError::ZeroFriendLowerBound))
        ));
        // Fails configuration validation up front: no partial output.
        assert!(engine.agents.iter().all(|a| a.history().is_empty()));
    }

    #[test]
    fn social_mode_produces_full_history() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut engine = Engine::new(small_config(), &mut rng).unwrap();
        engine.run(Mode::Social, 6).unwrap();
        for agent in &engine.agents {
            assert_eq!(agent.history().len(), 6);
        }
    }

    #[test]
    fn independent_mode_holds_prices_without_income_growth() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut engine = Engine::new(small_config(), &mut rng).unwrap();
        let price_before = engine.agents[0].price;
        let budget_before = engine.agents[0].budget;
        engine.run(Mode::Independent, 4).unwrap();
        assert_eq!(engine.agents[0].price, price_before);
        assert_eq!(engine.agents[0].budget, budget_before);
    }

    #[test]
    fn income_growth_flag_enables_accrual_and_inflation() {
        let config = SimConfig {
            income_growth: true,
            ..small_config()
        };
        let mut rng = StdRng::seed_from_u64(5);
        let mut engine = Engine::new(config, &mut rng).unwrap();
        let price_before = engine.agents[0].price;
        engine.run(Mode::Independent, 4).unwrap();
        assert!(engine.agents[0].price > price_before);
    }
}
