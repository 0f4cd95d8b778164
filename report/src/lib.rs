//! Aggregation and CSV persistence for completed simulations.
//!
//! Consumes the full agent population and the period count of a finished run
//! and produces two tables: one row per (simulation run, period) with
//! population aggregates, and a sampled per-agent per-period table. Repeated
//! runs append to the simulation CSV, continuing the `SimulationIndex`
//! sequence found in the existing file.

use std::fs::File;
use std::path::Path;

use polars::prelude::*;
use rand::Rng;
use rand::seq::index;
use sim_core::{Agent, Plan};

// === PERIOD AGGREGATES ===

/// Aggregates over the whole population for one period.
#[derive(Clone, Debug, Default)]
pub struct PeriodAggregates {
    pub period: usize,
    pub average_income: f64,
    pub green_users: u32,
    pub normal_users: u32,
    /// Emissions from agents on the green plan this period.
    pub green_emissions: f64,
    pub normal_emissions: f64,
    /// Sum of each agent's chosen-side utility.
    pub total_utility: f64,
    pub quantity_green: f64,
    pub quantity_normal: f64,
}

impl PeriodAggregates {
    pub fn total_emissions(&self) -> f64 {
        self.green_emissions + self.normal_emissions
    }

    pub fn total_quantity(&self) -> f64 {
        self.quantity_green + self.quantity_normal
    }
}

/// Aggregate one period across all agents. Agents without a record for the
/// period (never produced by a completed run) are skipped.
pub fn aggregate_period(agents: &[Agent], period: usize) -> PeriodAggregates {
    let mut agg = PeriodAggregates {
        period,
        ..PeriodAggregates::default()
    };
    let mut incomes = 0.0;
    let mut counted = 0usize;

    for agent in agents {
        let Some(rec) = agent.record(period) else {
            continue;
        };
        incomes += rec.budget;
        counted += 1;
        match rec.plan {
            Plan::Green => {
                agg.green_users += 1;
                agg.green_emissions += rec.emissions;
                agg.total_utility += rec.utility_green;
                agg.quantity_green += rec.quantity;
            }
            Plan::Normal => {
                agg.normal_users += 1;
                agg.normal_emissions += rec.emissions;
                agg.total_utility += rec.utility_normal;
                agg.quantity_normal += rec.quantity;
            }
            Plan::None => {}
        }
    }

    if counted > 0 {
        agg.average_income = incomes / counted as f64;
    }
    agg
}

pub fn aggregate_all(agents: &[Agent], periods: usize) -> Vec<PeriodAggregates> {
    (0..periods).map(|p| aggregate_period(agents, p)).collect()
}

// === SIMULATION TABLE ===

/// One row per period for a single run. `SimulationIndex` starts at 0 and is
/// renumbered on append.
pub fn simulation_frame(
    aggs: &[PeriodAggregates],
    cost_green: f64,
    cost_normal: f64,
) -> PolarsResult<DataFrame> {
    let n = aggs.len();
    df!(
        "SimulationIndex" => vec![0i64; n],
        "PriceOfGreenDelivery" => vec![cost_green; n],
        "PriceOfNormalDelivery" => vec![cost_normal; n],
        "Period" => aggs.iter().map(|a| a.period as i64).collect::<Vec<_>>(),
        "AverageIncome" => aggs.iter().map(|a| a.average_income).collect::<Vec<_>>(),
        "GreenUsers" => aggs.iter().map(|a| i64::from(a.green_users)).collect::<Vec<_>>(),
        "NormalUsers" => aggs.iter().map(|a| i64::from(a.normal_users)).collect::<Vec<_>>(),
        "TotalEmission" => aggs.iter().map(PeriodAggregates::total_emissions).collect::<Vec<_>>(),
        "TotalUtility" => aggs.iter().map(|a| a.total_utility).collect::<Vec<_>>(),
        "QwithGreen" => aggs.iter().map(|a| a.quantity_green).collect::<Vec<_>>(),
        "QwithNormal" => aggs.iter().map(|a| a.quantity_normal).collect::<Vec<_>>(),
        "TotalQ" => aggs.iter().map(PeriodAggregates::total_quantity).collect::<Vec<_>>(),
    )
}

/// Append a run to `path`, continuing the `SimulationIndex` sequence of any
/// existing file; a fresh file starts at index 0.
pub fn append_simulation_csv(path: &Path, frame: &DataFrame) -> PolarsResult<()> {
    let mut combined = if path.exists() {
        let existing = CsvReadOptions::default()
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()?;
        let next = existing
            .column("SimulationIndex")?
            .as_materialized_series()
            .i64()?
            .max()
            .unwrap_or(-1)
            + 1;
        let mut renumbered = frame.clone();
        renumbered.with_column(
            Int64Chunked::full("SimulationIndex".into(), next, frame.height()).into_series(),
        )?;
        existing.vstack(&renumbered)?
    } else {
        frame.clone()
    };
    write_csv(path, &mut combined)
}

// === AGENT SAMPLE TABLE ===

/// Sampled per-agent per-period table: agent id plus the full decision
/// record and eco-consciousness, sorted by agent id.
pub fn agent_sample_frame<R: Rng + ?Sized>(
    agents: &[Agent],
    sample_size: usize,
    periods: usize,
    rng: &mut R,
) -> PolarsResult<DataFrame> {
    let take = sample_size.min(agents.len());
    let mut picked: Vec<&Agent> = index::sample(rng, agents.len(), take)
        .into_iter()
        .map(|i| &agents[i])
        .collect();
    picked.sort_by_key(|a| a.id);

    let rows = take * periods;
    let mut period_col = Vec::with_capacity(rows);
    let mut id_col = Vec::with_capacity(rows);
    let mut budget_col = Vec::with_capacity(rows);
    let mut plan_col = Vec::with_capacity(rows);
    let mut util_green_col = Vec::with_capacity(rows);
    let mut util_normal_col = Vec::with_capacity(rows);
    let mut disparity_col = Vec::with_capacity(rows);
    let mut emissions_col = Vec::with_capacity(rows);
    let mut quantity_col = Vec::with_capacity(rows);
    let mut savings_col = Vec::with_capacity(rows);
    let mut eco_col = Vec::with_capacity(rows);

    for agent in picked {
        for period in 0..periods {
            let Some(rec) = agent.record(period) else {
                continue;
            };
            period_col.push(period as i64);
            id_col.push(i64::from(agent.id));
            budget_col.push(rec.budget);
            plan_col.push(rec.plan.label());
            util_green_col.push(rec.utility_green);
            util_normal_col.push(rec.utility_normal);
            disparity_col.push(rec.utility_disparity);
            emissions_col.push(rec.emissions);
            quantity_col.push(rec.quantity);
            savings_col.push(rec.savings);
            eco_col.push(agent.mu);
        }
    }

    df!(
        "Period" => period_col,
        "AgentId" => id_col,
        "Budget" => budget_col,
        "SelectedDeliveryPlan" => plan_col,
        "UtilityIfGreen" => util_green_col,
        "UtilityIfNormal" => util_normal_col,
        "UtilityDisparity" => disparity_col,
        "Emissions" => emissions_col,
        "Quantity" => quantity_col,
        "Savings" => savings_col,
        "EcoCon" => eco_col,
    )
}

/// Overwrite `path` with the sampled agent table.
pub fn write_agent_sample_csv(path: &Path, frame: &DataFrame) -> PolarsResult<()> {
    let mut frame = frame.clone();
    write_csv(path, &mut frame)
}

// === CONSOLE REPORT ===

/// Print the per-period aggregate table to the terminal.
pub fn print_period_table(aggs: &[PeriodAggregates]) -> PolarsResult<()> {
    let table = df!(
        "Period" => aggs.iter().map(|a| a.period as i64).collect::<Vec<_>>(),
        "TotalEmission" => aggs.iter().map(PeriodAggregates::total_emissions).collect::<Vec<_>>(),
        "TotalUtility" => aggs.iter().map(|a| a.total_utility).collect::<Vec<_>>(),
        "GreenUsers" => aggs.iter().map(|a| i64::from(a.green_users)).collect::<Vec<_>>(),
        "NormalUsers" => aggs.iter().map(|a| i64::from(a.normal_users)).collect::<Vec<_>>(),
    )?;
    println!("{table}");
    Ok(())
}

fn write_csv(path: &Path, frame: &mut DataFrame) -> PolarsResult<()> {
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file).include_header(true).finish(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use sim_core::{PlanQuotes, Solver};

    fn quotes() -> PlanQuotes {
        PlanQuotes {
            cost_green: 20.0,
            cost_normal: 20.0,
            emission_green: 0.01,
            emission_normal: 0.03,
        }
    }

    /// Two green-leaning agents and one too poor for either plan.
    fn decided_population() -> Vec<Agent> {
        let form = Solver::new().solve_base().unwrap();
        let mut agents = vec![
            Agent::new(0, 0.2, 0.07, 1800.0, 65.0, 0.05),
            Agent::new(1, 0.3, 0.09, 2400.0, 65.0, 0.05),
            Agent::new(2, 0.2, 0.07, 3000.0, 65.0, 0.05),
        ];
        for agent in &mut agents[..2] {
            agent.decide_period(0, &quotes(), &form, None).unwrap();
        }
        agents[2].decide_benchmark_period(0, 4000.0, 0.03, &form);
        agents
    }

    #[test]
    fn aggregates_group_by_chosen_plan() {
        let agents = decided_population();
        let agg = aggregate_period(&agents, 0);

        assert_eq!(agg.green_users + agg.normal_users, 2);
        let expected_emissions: f64 = agents
            .iter()
            .filter_map(|a| a.record(0))
            .map(|r| r.emissions)
            .sum();
        assert!((agg.total_emissions() - expected_emissions).abs() < 1e-9);

        let expected_income: f64 = agents
            .iter()
            .filter_map(|a| a.record(0))
            .map(|r| r.budget)
            .sum::<f64>()
            / 3.0;
        assert!((agg.average_income - expected_income).abs() < 1e-9);
    }

    #[test]
    fn opted_out_agents_contribute_no_emissions_or_utility() {
        let agents = decided_population();
        let agg = aggregate_period(&agents, 0);
        // Agent 2 opted out; only the two subscribers count.
        let subscribed: f64 = agents
            .iter()
            .filter_map(|a| a.record(0))
            .filter(|r| r.plan != Plan::None)
            .map(|r| r.quantity)
            .sum();
        assert!((agg.total_quantity() - subscribed).abs() < 1e-9);
    }

    #[test]
    fn simulation_csv_append_continues_the_index() {
        let agents = decided_population();
        let aggs = aggregate_all(&agents, 1);
        let frame = simulation_frame(&aggs, 20.0, 8.0).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("normal_simulation.csv");

        append_simulation_csv(&path, &frame).unwrap();
        append_simulation_csv(&path, &frame).unwrap();
        append_simulation_csv(&path, &frame).unwrap();

        let stored = CsvReadOptions::default()
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(path.clone()))
            .unwrap()
            .finish()
            .unwrap();
        assert_eq!(stored.height(), 3);
        let indexes: Vec<i64> = stored
            .column("SimulationIndex")
            .unwrap()
            .as_materialized_series()
            .i64()
            .unwrap()
            .into_no_null_iter()
            .collect();
        assert_eq!(indexes, vec![0, 1, 2]);
    }

    #[test]
    fn agent_sample_is_sorted_and_complete() {
        let agents = decided_population();
        let mut rng = StdRng::seed_from_u64(9);
        let frame = agent_sample_frame(&agents, 2, 1, &mut rng).unwrap();

        assert_eq!(frame.height(), 2);
        let ids: Vec<i64> = frame
            .column("AgentId")
            .unwrap()
            .as_materialized_series()
            .i64()
            .unwrap()
            .into_no_null_iter()
            .collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(ids, sorted);
        assert!(frame.column("Quantity").is_ok());
        assert!(frame.column("Savings").is_ok());
        assert!(frame.column("EcoCon").is_ok());
    }
}
