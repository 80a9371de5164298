//! Top-level run configuration and validation.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{
    AcceptanceConfig, AcceptanceRule, CoolingSchedule, ExecutionConfig, OperatorConfig,
    RateMode, ReportingConfig, ScalingConfig, SelectionMethod, TerminationCondition,
    TerminationConfig,
};

/// Algorithm family label selecting the gene representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlgorithmFamily {
    /// Binary genes (simple genetic algorithm).
    Sga,
    /// Real-valued genes evolved by differential evolution.
    Sgde,
    /// Permutation genes.
    Sgperm,
    /// Grammatical evolution (integer codons).
    Sge,
    /// Grammatical evolution with real-valued codons.
    Sgede,
    /// Grammar-based genetic programming (derivation trees).
    Sgp,
}

impl AlgorithmFamily {
    /// All known family labels.
    pub const ALL: [AlgorithmFamily; 6] = [
        AlgorithmFamily::Sga,
        AlgorithmFamily::Sgde,
        AlgorithmFamily::Sgperm,
        AlgorithmFamily::Sge,
        AlgorithmFamily::Sgede,
        AlgorithmFamily::Sgp,
    ];

    /// The configuration label of this family.
    pub fn label(&self) -> &'static str {
        match self {
            AlgorithmFamily::Sga => "sga",
            AlgorithmFamily::Sgde => "sgde",
            AlgorithmFamily::Sgperm => "sgperm",
            AlgorithmFamily::Sge => "sge",
            AlgorithmFamily::Sgede => "sgede",
            AlgorithmFamily::Sgp => "sgp",
        }
    }
}

impl fmt::Display for AlgorithmFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AlgorithmFamily {
    type Err = ConfigError;

    fn from_str(label: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|family| family.label() == label)
            .ok_or_else(|| ConfigError::UnknownAlgorithm(label.to_string()))
    }
}

/// How the local configuration context is shared with operators and workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ContextSharing {
    /// Immutable snapshot; updates produce a new snapshot.
    #[default]
    ByValue,
    /// Single shared context; updates are visible to every holder.
    ByReference,
}

/// Complete configuration of one evolutionary run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Algorithm family label (`sga`, `sgde`, `sgperm`, `sge`, `sgede`, `sgp`).
    #[serde(default = "default_algorithm")]
    pub algorithm: String,
    /// Population size, generation count, rates and seed.
    #[serde(default)]
    pub basic: BasicConfig,
    /// Genetic operator and selection method choices.
    #[serde(default)]
    pub operators: OperatorConfig,
    /// Adaptive fitness scaling.
    #[serde(default)]
    pub scaling: ScalingConfig,
    /// Acceptance rule and cooling schedule.
    #[serde(default)]
    pub acceptance: AcceptanceConfig,
    /// Early termination.
    #[serde(default)]
    pub termination: TerminationConfig,
    /// Fitness evaluation execution model.
    #[serde(default)]
    pub execution: ExecutionConfig,
    /// Logging, profiling and batch output.
    #[serde(default)]
    pub reporting: ReportingConfig,
    /// Local context sharing discipline.
    #[serde(default)]
    pub context: ContextSharing,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            algorithm: default_algorithm(),
            basic: BasicConfig::default(),
            operators: OperatorConfig::default(),
            scaling: ScalingConfig::default(),
            acceptance: AcceptanceConfig::default(),
            termination: TerminationConfig::default(),
            execution: ExecutionConfig::default(),
            reporting: ReportingConfig::default(),
            context: ContextSharing::default(),
        }
    }
}

fn default_algorithm() -> String {
    "sga".to_string()
}

/// Basic run parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasicConfig {
    /// Number of genes in the population.
    #[serde(default = "default_popsize")]
    pub popsize: usize,
    /// Number of generations after the initial one.
    #[serde(default = "default_generations")]
    pub generations: usize,
    /// Crossover probability (0.0-1.0).
    #[serde(default = "default_crossrate")]
    pub crossrate: f64,
    /// Mutation probability (0.0-1.0).
    #[serde(default = "default_mutrate")]
    pub mutrate: f64,
    /// Copy the best gene of each generation into the next one.
    #[serde(default = "default_true")]
    pub elitist: bool,
    /// Maximize the objective (`false` minimizes).
    #[serde(default = "default_true")]
    pub max: bool,
    /// Seed for the run RNG. A fresh seed is drawn when absent.
    #[serde(default)]
    pub replay: Option<u64>,
    /// Fitness assigned to genes whose evaluation fails.
    /// Expressed in the internal, always maximized orientation.
    #[serde(default = "default_worst_fitness")]
    pub worst_fitness: f64,
}

impl Default for BasicConfig {
    fn default() -> Self {
        Self {
            popsize: default_popsize(),
            generations: default_generations(),
            crossrate: default_crossrate(),
            mutrate: default_mutrate(),
            elitist: true,
            max: true,
            replay: None,
            worst_fitness: default_worst_fitness(),
        }
    }
}

fn default_popsize() -> usize {
    32
}
fn default_generations() -> usize {
    100
}
fn default_crossrate() -> f64 {
    0.2
}
fn default_mutrate() -> f64 {
    1.0
}
fn default_true() -> bool {
    true
}
fn default_worst_fitness() -> f64 {
    -1.0e31
}

/// Configuration errors. Always fatal and raised before any evaluation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Unknown algorithm family: {0}")]
    UnknownAlgorithm(String),
    #[error("Unknown {slot} method '{method}' for algorithm family {family}")]
    UnknownMethod {
        family: AlgorithmFamily,
        slot: String,
        method: String,
    },
    #[error("No {slot} operator registered for algorithm family {family}")]
    MissingOperator { family: AlgorithmFamily, slot: String },
    #[error("Replication '{replication}' has no acceptance step; acceptance rule {rule:?} needs one")]
    AcceptanceNotSupported {
        replication: String,
        rule: AcceptanceRule,
    },
    #[error("Termination condition {0:?} needs a known global optimum")]
    MissingOptimum(TerminationCondition),
    #[error("Population size must be at least 2, got {0}")]
    PopulationTooSmall(usize),
    #[error("Invalid rate {name}: {value} is outside [0, 1]")]
    InvalidRate { name: &'static str, value: f64 },
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("Failed to read config: {0}")]
    Read(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

impl RunConfig {
    /// Parse the algorithm family label.
    pub fn family(&self) -> Result<AlgorithmFamily, ConfigError> {
        self.algorithm.parse()
    }

    /// Load a configuration from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: RunConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Validate run configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.family()?;

        let basic = &self.basic;
        if basic.popsize < 2 {
            return Err(ConfigError::PopulationTooSmall(basic.popsize));
        }
        if !basic.worst_fitness.is_finite() {
            return Err(ConfigError::InvalidParameter(format!(
                "worst_fitness must be finite, got {}",
                basic.worst_fitness
            )));
        }

        let check_rate = |name: &'static str, value: f64| {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(ConfigError::InvalidRate { name, value })
            }
        };

        check_rate("crossrate", basic.crossrate)?;
        check_rate("mutrate", basic.mutrate)?;
        check_rate("bit_mutation_rate", self.operators.bit_mutation_rate)?;
        check_rate("uniform_swap", self.operators.uniform_swap)?;
        if let RateMode::Individual { rate2, .. } = self.operators.crossover_rate {
            check_rate("crossover rate2", rate2)?;
        }
        if let RateMode::Individual { rate2, .. } = self.operators.mutation_rate {
            check_rate("mutation rate2", rate2)?;
        }

        for method in [&self.operators.selection, &self.operators.mate_selection] {
            match method {
                SelectionMethod::Tournament { size } if *size == 0 => {
                    return Err(ConfigError::InvalidParameter(
                        "tournament size must be at least 1".to_string(),
                    ));
                }
                SelectionMethod::LinearRank { pressure } if !(1.0..=2.0).contains(pressure) => {
                    return Err(ConfigError::InvalidParameter(format!(
                        "linear rank pressure {pressure} is outside [1, 2]"
                    )));
                }
                _ => {}
            }
        }
        if self.operators.scale_factor < 0.0 || self.operators.mutation_sigma < 0.0 {
            return Err(ConfigError::InvalidParameter(
                "scale_factor and mutation_sigma must be non-negative".to_string(),
            ));
        }

        let scaling = &self.scaling;
        if scaling.scaling_exp < 0.0 || scaling.scaling_exp2 < 0.0 || scaling.rdm_weight < 0.0 {
            return Err(ConfigError::InvalidParameter(
                "scaling exponents and rdm_weight must be non-negative".to_string(),
            ));
        }
        if scaling.threshold < 0.0 {
            return Err(ConfigError::InvalidParameter(format!(
                "scaling threshold {} must be non-negative",
                scaling.threshold
            )));
        }
        if scaling.delay == 0 {
            return Err(ConfigError::InvalidParameter(
                "scaling delay must be at least 1".to_string(),
            ));
        }
        if scaling.dr_min <= 0.0 || scaling.dr_min > scaling.dr_max {
            return Err(ConfigError::InvalidParameter(format!(
                "dispersion ratio bounds [{}, {}] are invalid",
                scaling.dr_min, scaling.dr_max
            )));
        }

        let acceptance = &self.acceptance;
        if acceptance.beta < 0.0 {
            return Err(ConfigError::InvalidParameter(format!(
                "beta {} must be non-negative",
                acceptance.beta
            )));
        }
        if acceptance.temp0 <= 0.0 || acceptance.temp_n < 0.0 || acceptance.temp_n > acceptance.temp0
        {
            return Err(ConfigError::InvalidParameter(format!(
                "temperatures must satisfy 0 <= temp_n ({}) <= temp0 ({}) and temp0 > 0",
                acceptance.temp_n, acceptance.temp0
            )));
        }
        let alpha_ok = match acceptance.cooling {
            CoolingSchedule::ExponentialMultiplicative => {
                acceptance.alpha > 0.0 && acceptance.alpha <= 1.0
            }
            _ => acceptance.alpha >= 0.0,
        };
        if !alpha_ok {
            return Err(ConfigError::InvalidParameter(format!(
                "cooling alpha {} is invalid for {:?}",
                acceptance.alpha, acceptance.cooling
            )));
        }
        if acceptance.cooling_power < 0.0 {
            return Err(ConfigError::InvalidParameter(format!(
                "cooling power {} must be non-negative",
                acceptance.cooling_power
            )));
        }
        if acceptance.cooling == CoolingSchedule::PowerAdditive
            && acceptance.cooling_power <= 0.0
        {
            return Err(ConfigError::InvalidParameter(format!(
                "cooling power {} must be positive for PowerAdditive",
                acceptance.cooling_power
            )));
        }

        let termination = &self.termination;
        if termination.eps < 0.0 {
            return Err(ConfigError::InvalidParameter(format!(
                "termination eps {} must be non-negative",
                termination.eps
            )));
        }
        if !(termination.pac_delta > 0.0 && termination.pac_delta < 1.0) {
            return Err(ConfigError::InvalidParameter(format!(
                "pac_delta {} is outside (0, 1)",
                termination.pac_delta
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = RunConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.family().unwrap(), AlgorithmFamily::Sga);
    }

    #[test]
    fn test_unknown_algorithm_named() {
        let config = RunConfig {
            algorithm: "sgx".to_string(),
            ..Default::default()
        };
        match config.validate() {
            Err(ConfigError::UnknownAlgorithm(label)) => assert_eq!(label, "sgx"),
            other => panic!("expected unknown algorithm error, got {other:?}"),
        }
        let message = config.family().unwrap_err().to_string();
        assert!(message.contains("sgx"));
    }

    #[test]
    fn test_family_labels_roundtrip() {
        for family in AlgorithmFamily::ALL {
            assert_eq!(family.label().parse::<AlgorithmFamily>().unwrap(), family);
        }
    }

    #[test]
    fn test_population_too_small() {
        let mut config = RunConfig::default();
        config.basic.popsize = 1;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::PopulationTooSmall(1))
        ));
    }

    #[test]
    fn test_invalid_rate() {
        let mut config = RunConfig::default();
        config.basic.crossrate = 1.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidRate {
                name: "crossrate",
                ..
            })
        ));
    }

    #[test]
    fn test_invalid_temperatures() {
        let mut config = RunConfig::default();
        config.acceptance.temp_n = config.acceptance.temp0 + 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_power_additive_needs_positive_power() {
        let mut config = RunConfig::default();
        config.acceptance.cooling = CoolingSchedule::PowerAdditive;
        config.acceptance.cooling_power = 0.0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidParameter(_))));

        config.acceptance.cooling = CoolingSchedule::ExponentialAdditive;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "algorithm": "sgde", "basic": { "popsize": 10, "max": false } }"#;
        let config: RunConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.family().unwrap(), AlgorithmFamily::Sgde);
        assert_eq!(config.basic.popsize, 10);
        assert!(!config.basic.max);
        assert_eq!(config.basic.generations, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_serialization() {
        let config = RunConfig::default();
        let json = config.to_json().unwrap();
        let parsed: RunConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.basic.popsize, config.basic.popsize);
        assert_eq!(parsed.algorithm, config.algorithm);
    }
}
