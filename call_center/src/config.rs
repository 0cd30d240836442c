//! Scenario parameters and experiment files
//!
//! A [`CallCenterConfig`] fully describes one run. An [`ExperimentFile`] is the TOML
//! form used by the binary: shared `[simulation]` settings plus a list of
//! `[[scenarios]]` that vary the agent count and arrival rate.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CallCenterError, Result};

/// Simulated minutes per run
pub const SIM_TIME: f64 = 120.0;
/// Mean handling time in minutes
pub const SERVICE_TIME: f64 = 5.0;
/// Minutes a caller stays in the queue before hanging up
pub const WAIT_THRESHOLD: f64 = 5.0;
pub const RANDOM_SEED: u64 = 42;

/// Shape of the inter-arrival or service-time distribution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistributionKind {
    /// Exponential around the configured mean
    #[default]
    Exponential,
    /// Always exactly the configured mean
    Fixed,
}

/// Parameters of a single simulation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallCenterConfig {
    pub sim_time: f64,
    pub service_time: f64,
    pub wait_threshold: f64,
    pub agent_count: usize,
    /// Calls per minute
    pub arrival_rate: f64,
    #[serde(default)]
    pub random_seed: Option<u64>,
    #[serde(default)]
    pub arrival_distribution: DistributionKind,
    #[serde(default)]
    pub service_distribution: DistributionKind,
}

impl CallCenterConfig {
    /// Three agents taking 0.3 calls per minute for two hours
    pub fn baseline() -> Self {
        CallCenterConfig {
            sim_time: SIM_TIME,
            service_time: SERVICE_TIME,
            wait_threshold: WAIT_THRESHOLD,
            agent_count: 3,
            arrival_rate: 0.3,
            random_seed: Some(RANDOM_SEED),
            arrival_distribution: DistributionKind::Exponential,
            service_distribution: DistributionKind::Exponential,
        }
    }

    pub fn with_agents(mut self, agent_count: usize) -> Self {
        self.agent_count = agent_count;
        self
    }

    pub fn with_arrival_rate(mut self, arrival_rate: f64) -> Self {
        self.arrival_rate = arrival_rate;
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.random_seed = seed;
        self
    }

    /// Reject parameters that would make the run meaningless
    pub fn validate(&self) -> Result<()> {
        if !(self.sim_time.is_finite() && self.sim_time > 0.0) {
            return Err(CallCenterError::invalid_config(format!(
                "sim_time must be positive, got {}",
                self.sim_time
            )));
        }
        if !(self.service_time.is_finite() && self.service_time > 0.0) {
            return Err(CallCenterError::invalid_config(format!(
                "service_time must be positive, got {}",
                self.service_time
            )));
        }
        if !(self.wait_threshold.is_finite() && self.wait_threshold >= 0.0) {
            return Err(CallCenterError::invalid_config(format!(
                "wait_threshold must be non-negative, got {}",
                self.wait_threshold
            )));
        }
        if self.agent_count == 0 {
            return Err(CallCenterError::invalid_config(
                "agent_count must be at least 1",
            ));
        }
        if !(self.arrival_rate.is_finite() && self.arrival_rate > 0.0) {
            return Err(CallCenterError::invalid_config(format!(
                "arrival_rate must be positive, got {}",
                self.arrival_rate
            )));
        }
        Ok(())
    }
}

impl Default for CallCenterConfig {
    fn default() -> Self {
        Self::baseline()
    }
}

/// Settings shared by every scenario of an experiment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    pub sim_time: f64,
    pub service_time: f64,
    pub wait_threshold: f64,
    pub random_seed: Option<u64>,
    /// Independent runs per scenario; more than one reports a replication summary
    pub replications: usize,
    pub arrival_distribution: DistributionKind,
    pub service_distribution: DistributionKind,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        SimulationSettings {
            sim_time: SIM_TIME,
            service_time: SERVICE_TIME,
            wait_threshold: WAIT_THRESHOLD,
            random_seed: Some(RANDOM_SEED),
            replications: 1,
            arrival_distribution: DistributionKind::Exponential,
            service_distribution: DistributionKind::Exponential,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSpec {
    pub label: String,
    pub agents: usize,
    pub arrival_rate: f64,
}

impl ScenarioSpec {
    pub fn new(label: impl Into<String>, agents: usize, arrival_rate: f64) -> Self {
        ScenarioSpec {
            label: label.into(),
            agents,
            arrival_rate,
        }
    }
}

fn default_scenarios() -> Vec<ScenarioSpec> {
    vec![
        ScenarioSpec::new("Base", 3, 0.3),
        ScenarioSpec::new("More Agents", 5, 0.3),
        ScenarioSpec::new("Busy", 3, 0.5),
    ]
}

/// TOML experiment description
///
/// ```toml
/// [simulation]
/// sim_time = 120.0
/// wait_threshold = 5.0
/// random_seed = 42
///
/// [[scenarios]]
/// label = "Base"
/// agents = 3
/// arrival_rate = 0.3
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentFile {
    #[serde(default)]
    pub simulation: SimulationSettings,
    #[serde(default = "default_scenarios")]
    pub scenarios: Vec<ScenarioSpec>,
}

impl Default for ExperimentFile {
    fn default() -> Self {
        ExperimentFile {
            simulation: SimulationSettings::default(),
            scenarios: default_scenarios(),
        }
    }
}

impl ExperimentFile {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        toml::from_str(source).map_err(|e| CallCenterError::invalid_config(e.to_string()))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let source = fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Run configuration for one scenario, validated
    pub fn config_for(&self, scenario: &ScenarioSpec) -> Result<CallCenterConfig> {
        let settings = &self.simulation;
        let config = CallCenterConfig {
            sim_time: settings.sim_time,
            service_time: settings.service_time,
            wait_threshold: settings.wait_threshold,
            agent_count: scenario.agents,
            arrival_rate: scenario.arrival_rate,
            random_seed: settings.random_seed,
            arrival_distribution: settings.arrival_distribution,
            service_distribution: settings.service_distribution,
        };
        config.validate()?;
        Ok(config)
    }

    /// Every scenario paired with its validated configuration
    ///
    /// Fails on the first invalid scenario so nothing runs on a bad file.
    pub fn scenario_configs(&self) -> Result<Vec<(&ScenarioSpec, CallCenterConfig)>> {
        if self.scenarios.is_empty() {
            return Err(CallCenterError::invalid_config(
                "experiment defines no scenarios",
            ));
        }
        if self.simulation.replications == 0 {
            return Err(CallCenterError::invalid_config(
                "replications must be at least 1",
            ));
        }
        self.scenarios
            .iter()
            .map(|scenario| Ok((scenario, self.config_for(scenario)?)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_is_valid() {
        assert!(CallCenterConfig::baseline().validate().is_ok());
    }

    #[test]
    fn rejects_non_positive_sim_time() {
        let mut config = CallCenterConfig::baseline();
        config.sim_time = 0.0;
        assert!(matches!(
            config.validate(),
            Err(CallCenterError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn rejects_zero_agents() {
        let config = CallCenterConfig::baseline().with_agents(0);
        assert!(matches!(
            config.validate(),
            Err(CallCenterError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn rejects_negative_wait_threshold() {
        let mut config = CallCenterConfig::baseline();
        config.wait_threshold = -1.0;
        assert!(config.validate().is_err());

        // Zero patience is allowed
        config.wait_threshold = 0.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_non_finite_rates() {
        assert!(
            CallCenterConfig::baseline()
                .with_arrival_rate(f64::NAN)
                .validate()
                .is_err()
        );
        assert!(
            CallCenterConfig::baseline()
                .with_arrival_rate(0.0)
                .validate()
                .is_err()
        );
        let mut config = CallCenterConfig::baseline();
        config.service_time = f64::INFINITY;
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_toml_gives_default_experiment() {
        let experiment = ExperimentFile::from_toml_str("").unwrap();
        assert_eq!(experiment, ExperimentFile::default());
        assert_eq!(experiment.scenarios.len(), 3);
        assert_eq!(experiment.simulation.random_seed, Some(42));
    }

    #[test]
    fn parses_scenarios_and_overrides() {
        let source = r#"
            [simulation]
            sim_time = 480.0
            wait_threshold = 2.5
            replications = 10
            service_distribution = "fixed"

            [[scenarios]]
            label = "Night shift"
            agents = 2
            arrival_rate = 0.1
        "#;
        let experiment = ExperimentFile::from_toml_str(source).unwrap();

        assert_eq!(experiment.simulation.sim_time, 480.0);
        assert_eq!(experiment.simulation.service_time, SERVICE_TIME);
        assert_eq!(experiment.simulation.replications, 10);
        assert_eq!(
            experiment.simulation.service_distribution,
            DistributionKind::Fixed
        );

        let configs = experiment.scenario_configs().unwrap();
        assert_eq!(configs.len(), 1);
        let (scenario, config) = &configs[0];
        assert_eq!(scenario.label, "Night shift");
        assert_eq!(config.agent_count, 2);
        assert_eq!(config.wait_threshold, 2.5);
        assert_eq!(config.arrival_distribution, DistributionKind::Exponential);
    }

    #[test]
    fn malformed_toml_is_a_configuration_error() {
        let err = ExperimentFile::from_toml_str("[[scenarios]]\nagents = -3").unwrap_err();
        assert!(matches!(err, CallCenterError::InvalidConfiguration { .. }));
    }

    #[test]
    fn invalid_scenario_rejects_whole_experiment() {
        let mut experiment = ExperimentFile::default();
        experiment.scenarios.push(ScenarioSpec::new("Empty", 0, 0.3));
        assert!(experiment.scenario_configs().is_err());

        experiment.scenarios.clear();
        assert!(experiment.scenario_configs().is_err());
    }
}
