//! The simulation configuration surface.
//!
//! Immutable for the duration of one run. A sweep (e.g. over the green
//! delivery cost) clones the whole config and perturbs one field; it never
//! mutates a running simulation.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Configuration for one simulation run.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimConfig {
    pub num_agents: usize,
    /// Average unit price of the consumption good.
    pub price: f64,
    /// Target mean of the Beta-distributed consumption weight `a`.
    pub alpha_mean: f64,
    pub alpha_stdev: f64,
    /// Inclusive bounds for the uniform eco-consciousness draw.
    pub mu_interval: (f64, f64),
    /// Mean of log income; income itself is log-normally distributed.
    pub log_income_mean: f64,
    pub log_income_stdev: f64,
    /// Per-period cost of the green delivery plan.
    pub cost_green: f64,
    /// Per-period cost of the normal delivery plan.
    pub cost_normal: f64,
    /// Emissions per unit consumed under the green plan.
    pub emission_green: f64,
    /// Emissions per unit consumed under the normal plan.
    pub emission_normal: f64,
    /// Annual inflation rate; the engine compounds it monthly.
    pub inflation_rate: f64,
    /// Plan costs are hiked every this many periods.
    pub price_hike_interval: usize,
    /// Inclusive bounds for the per-agent friend count.
    pub friend_interval: (usize, usize),
    /// Inclusive bounds for the uniform peer-affinity draw.
    pub delta_interval: (f64, f64),
    /// Fraction of recorded savings credited back to the budget each period.
    pub savings_yield: f64,
    /// Apply savings accrual and inflation in independent mode too (the
    /// income-scaling variant, folded in as a flag).
    pub income_growth: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            num_agents: 1000,
            price: 65.0,
            alpha_mean: 0.2,
            alpha_stdev: 0.04,
            mu_interval: (0.04, 0.10),
            // Median monthly income; in a normal the mean equals the median.
            log_income_mean: (22_100.0f64 / 12.0).ln(),
            log_income_stdev: 0.4219793,
            cost_green: 20.0,
            cost_normal: 8.0,
            emission_green: 0.9,
            emission_normal: 1.0,
            inflation_rate: 0.017,
            price_hike_interval: 6,
            friend_interval: (1, 10),
            delta_interval: (0.01, 0.10),
            savings_yield: 0.01,
            income_growth: false,
        }
    }
}

impl SimConfig {
    /// Mode-independent validation, run before any period.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_agents == 0 {
            return Err(ConfigError::EmptyPopulation);
        }
        for (name, value) in [
            ("price", self.price),
            ("alpha_stdev", self.alpha_stdev),
            ("emission_green", self.emission_green),
            ("emission_normal", self.emission_normal),
        ] {
            if value <= 0.0 {
                return Err(ConfigError::NonPositive { name });
            }
        }
        if !(0.0 < self.alpha_mean && self.alpha_mean < 1.0) {
            return Err(ConfigError::Distribution {
                name: "alpha",
                reason: format!("mean {} must lie strictly inside (0, 1)", self.alpha_mean),
            });
        }
        for (name, (lo, hi)) in [
            ("mu", self.mu_interval),
            ("delta", self.delta_interval),
        ] {
            if lo > hi {
                return Err(ConfigError::InvertedInterval { name });
            }
        }
        if self.friend_interval.0 > self.friend_interval.1 {
            return Err(ConfigError::InvertedInterval { name: "friend" });
        }
        if self.friend_interval.1 > self.num_agents - 1 {
            return Err(ConfigError::FriendIntervalTooLarge {
                hi: self.friend_interval.1,
                max: self.num_agents - 1,
            });
        }
        if self.price_hike_interval == 0 {
            return Err(ConfigError::ZeroHikeInterval);
        }
        Ok(())
    }

    /// Extra validation for social runs: every agent needs at least one
    /// friend or its peer fractions are undefined.
    pub fn validate_social(&self) -> Result<(), ConfigError> {
        if self.friend_interval.0 == 0 {
            return Err(ConfigError::ZeroFriendLowerBound);
        }
        Ok(())
    }

    /// Load a configuration from a JSON file.
    pub fn from_json_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = SimConfig::default();
        config.validate().unwrap();
        config.validate_social().unwrap();
    }

    #[test]
    fn empty_population_is_rejected() {
        let config = SimConfig {
            num_agents: 0,
            ..SimConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::EmptyPopulation)));
    }

    #[test]
    fn oversized_friend_interval_is_rejected() {
        let config = SimConfig {
            num_agents: 5,
            friend_interval: (1, 10),
            ..SimConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::FriendIntervalTooLarge { hi: 10, max: 4 })
        ));
    }

    #[test]
    fn zero_friend_lower_bound_fails_social_validation() {
        let config = SimConfig {
            friend_interval: (0, 5),
            ..SimConfig::default()
        };
        config.validate().unwrap();
        assert!(matches!(
            config.validate_social(),
            Err(ConfigError::ZeroFriendLowerBound)
        ));
    }

    #[test]
    fn json_round_trip() {
        let config = SimConfig {
            num_agents: 42,
            cost_green: 17.5,
            ..SimConfig::default()
        };
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", serde_json::to_string(&config).unwrap()).unwrap();

        let loaded = SimConfig::from_json_path(file.path()).unwrap();
        assert_eq!(loaded.num_agents, 42);
        assert!((loaded.cost_green - 17.5).abs() < 1e-12);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{\"num_agents\": 7}}").unwrap();
        let loaded = SimConfig::from_json_path(file.path()).unwrap();
        assert_eq!(loaded.num_agents, 7);
        assert!((loaded.price - 65.0).abs() < 1e-12);
    }
}
