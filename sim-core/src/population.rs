//! Population generation: parameter draws and the friendship graph.
//!
//! Each agent's consumption weight `a` comes from a Beta distribution (shape
//! parameters derived from a target mean/stdev), income from a log-normal,
//! eco-consciousness and peer affinity from uniform intervals. Friend sets
//! are sampled without replacement from all other agent ids and are fixed for
//! the lifetime of the population.

use rand::Rng;
use rand::seq::index;
use rand_distr::{Beta, Distribution, LogNormal};

use crate::agent::Agent;
use crate::config::SimConfig;
use crate::error::ConfigError;
use crate::types::AgentId;

// === DISTRIBUTION SHAPES ===

/// Beta shape parameters from a target mean and standard deviation.
pub fn beta_shape_from_mean_stdev(mean: f64, stdev: f64) -> Result<(f64, f64), ConfigError> {
    if !(0.0 < mean && mean < 1.0) || stdev <= 0.0 {
        return Err(ConfigError::Distribution {
            name: "beta",
            reason: format!("need 0 < mean < 1 and stdev > 0, got mean={mean}, stdev={stdev}"),
        });
    }
    let variance = stdev * stdev;
    let summa = ((1.0 - mean) * mean) / variance - 1.0;
    if summa <= 0.0 {
        return Err(ConfigError::Distribution {
            name: "beta",
            reason: format!("stdev {stdev} is too large for mean {mean}"),
        });
    }
    Ok((mean * summa, (1.0 - mean) * summa))
}

/// Beta shape parameters from the mode and a concentration (thickness).
pub fn beta_shape_from_mode_concentration(
    mode: f64,
    concentration: f64,
) -> Result<(f64, f64), ConfigError> {
    if !(0.0 < mode && mode < 1.0) || concentration <= 2.0 {
        return Err(ConfigError::Distribution {
            name: "beta",
            reason: format!(
                "need 0 < mode < 1 and concentration > 2, got mode={mode}, concentration={concentration}"
            ),
        });
    }
    let a = mode * (concentration - 2.0) + 1.0;
    let b = (1.0 - mode) * (concentration - 2.0) + 1.0;
    Ok((a, b))
}

// === GENERATION ===

/// Draw a full population from the configured distributions and wire up the
/// friendship graph.
pub fn generate_agents<R: Rng + ?Sized>(
    config: &SimConfig,
    rng: &mut R,
) -> Result<Vec<Agent>, ConfigError> {
    config.validate()?;

    let (shape_a, shape_b) = beta_shape_from_mean_stdev(config.alpha_mean, config.alpha_stdev)?;
    let alpha = Beta::new(shape_a, shape_b).map_err(|e| ConfigError::Distribution {
        name: "alpha",
        reason: e.to_string(),
    })?;
    let income = LogNormal::new(config.log_income_mean, config.log_income_stdev).map_err(|e| {
        ConfigError::Distribution {
            name: "income",
            reason: e.to_string(),
        }
    })?;

    let mut agents = Vec::with_capacity(config.num_agents);
    for id in 0..config.num_agents {
        let a = alpha.sample(rng);
        let mu = rng.random_range(config.mu_interval.0..=config.mu_interval.1);
        let budget = income.sample(rng);
        let delta = rng.random_range(config.delta_interval.0..=config.delta_interval.1);
        agents.push(Agent::new(id as AgentId, a, mu, budget, config.price, delta));
    }

    assign_friends(&mut agents, config.friend_interval, rng);
    tracing::debug!(num_agents = agents.len() as u64, "population generated");
    Ok(agents)
}

/// Sample each agent's friend set from all other ids, without replacement.
/// The agent itself is excluded from its own candidate pool only.
fn assign_friends<R: Rng + ?Sized>(
    agents: &mut [Agent],
    (lo, hi): (usize, usize),
    rng: &mut R,
) {
    let n = agents.len();
    if n < 2 {
        return;
    }
    for i in 0..n {
        let count = rng.random_range(lo..=hi);
        // Indices into the n-1 other agents, shifted past the agent's own id.
        let friends = index::sample(rng, n - 1, count)
            .into_iter()
            .map(|j| if j < i { j as AgentId } else { (j + 1) as AgentId })
            .collect();
        agents[i].friends = friends;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn small_config() -> SimConfig {
        SimConfig {
            num_agents: 50,
            friend_interval: (1, 5),
            ..SimConfig::default()
        }
    }

    #[test]
    fn beta_shapes_recover_mean_and_stdev() {
        let (a, b) = beta_shape_from_mean_stdev(0.2, 0.04).unwrap();
        let mean = a / (a + b);
        let variance = a * b / ((a + b) * (a + b) * (a + b + 1.0));
        assert!((mean - 0.2).abs() < 1e-9);
        assert!((variance.sqrt() - 0.04).abs() < 1e-9);
    }

    #[test]
    fn beta_shapes_from_mode_and_concentration() {
        let (a, b) = beta_shape_from_mode_concentration(0.25, 10.0).unwrap();
        let mode = (a - 1.0) / (a + b - 2.0);
        assert!((mode - 0.25).abs() < 1e-9);
        assert!((a + b - 10.0).abs() < 1e-9);
    }

    #[test]
    fn degenerate_beta_inputs_are_rejected() {
        assert!(beta_shape_from_mean_stdev(0.0, 0.1).is_err());
        assert!(beta_shape_from_mean_stdev(0.5, 0.0).is_err());
        // stdev too large: variance exceeds mean(1-mean)
        assert!(beta_shape_from_mean_stdev(0.5, 0.6).is_err());
        assert!(beta_shape_from_mode_concentration(0.5, 2.0).is_err());
    }

    #[test]
    fn draws_respect_configured_bounds() {
        let config = small_config();
        let mut rng = StdRng::seed_from_u64(7);
        let agents = generate_agents(&config, &mut rng).unwrap();

        assert_eq!(agents.len(), 50);
        for agent in &agents {
            assert!(0.0 < agent.a && agent.a < 1.0);
            assert!((agent.a + agent.b - 1.0).abs() < 1e-12);
            assert!(agent.mu >= config.mu_interval.0 && agent.mu <= config.mu_interval.1);
            assert!(agent.delta >= config.delta_interval.0 && agent.delta <= config.delta_interval.1);
            assert!(agent.budget > 0.0);
            assert!((agent.price - config.price).abs() < 1e-12);
        }
    }

    #[test]
    fn friends_exclude_self_and_respect_count_bounds() {
        let config = small_config();
        let mut rng = StdRng::seed_from_u64(11);
        let agents = generate_agents(&config, &mut rng).unwrap();

        for agent in &agents {
            assert!(!agent.friends.is_empty() && agent.friends.len() <= 5);
            assert!(!agent.friends.contains(&agent.id), "agent befriended itself");
            let mut seen = agent.friends.clone();
            seen.sort_unstable();
            seen.dedup();
            assert_eq!(seen.len(), agent.friends.len(), "duplicate friend ids");
            for &f in &agent.friends {
                assert!((f as usize) < agents.len());
            }
        }
    }

    #[test]
    fn generation_is_reproducible_under_a_fixed_seed() {
        let config = small_config();
        let a = generate_agents(&config, &mut StdRng::seed_from_u64(3)).unwrap();
        let b = generate_agents(&config, &mut StdRng::seed_from_u64(3)).unwrap();
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.a.to_bits(), y.a.to_bits());
            assert_eq!(x.budget.to_bits(), y.budget.to_bits());
            assert_eq!(x.friends, y.friends);
        }
    }
}
