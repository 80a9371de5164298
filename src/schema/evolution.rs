//! Strategy configuration groups for an evolutionary run.
//!
//! Each group selects a policy by label (a serde enum) and carries the
//! constants that policy reads. Operator methods that depend on the gene
//! representation are plain strings resolved by the engine registry.

use serde::{Deserialize, Serialize};

/// Operator method selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatorConfig {
    /// Gene initialization method (family default when absent).
    #[serde(default)]
    pub init: Option<String>,
    /// Gene decoding method.
    #[serde(default)]
    pub decode: Option<String>,
    /// Gene map method used by the decoder.
    #[serde(default)]
    pub gene_map: Option<String>,
    /// Crossover method.
    #[serde(default)]
    pub crossover: Option<String>,
    /// Mutation method.
    #[serde(default)]
    pub mutation: Option<String>,
    /// Replication method.
    #[serde(default)]
    pub replication: Option<String>,
    /// Selection of the first parent. Differential evolution draws its
    /// target vector through this selector, so the default SUS biases targets
    /// toward fitter genes. `UniformP` with selection continuation visits every
    /// target once per generation, as classic DE does.
    #[serde(default)]
    pub selection: SelectionMethod,
    /// Selection of the mate (second parent).
    #[serde(default)]
    pub mate_selection: SelectionMethod,
    /// Draw all selection indices once per generation.
    #[serde(default = "default_continuation")]
    pub selection_continuation: bool,
    /// Crossover rate mode.
    #[serde(default)]
    pub crossover_rate: RateMode,
    /// Mutation rate mode.
    #[serde(default)]
    pub mutation_rate: RateMode,
    /// Per-bit flip probability for binary mutation.
    #[serde(default = "default_bit_mutation_rate")]
    pub bit_mutation_rate: f64,
    /// Differential evolution scale factor.
    #[serde(default = "default_scale_factor")]
    pub scale_factor: f64,
    /// Gaussian mutation strength as a fraction of each parameter's range.
    #[serde(default = "default_mutation_sigma")]
    pub mutation_sigma: f64,
    /// Per-position swap probability for uniform crossover.
    #[serde(default = "default_uniform_swap")]
    pub uniform_swap: f64,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            init: None,
            decode: None,
            gene_map: None,
            crossover: None,
            mutation: None,
            replication: None,
            selection: SelectionMethod::default(),
            mate_selection: SelectionMethod::default(),
            selection_continuation: default_continuation(),
            crossover_rate: RateMode::default(),
            mutation_rate: RateMode::default(),
            bit_mutation_rate: default_bit_mutation_rate(),
            scale_factor: default_scale_factor(),
            mutation_sigma: default_mutation_sigma(),
            uniform_swap: default_uniform_swap(),
        }
    }
}

fn default_continuation() -> bool {
    true
}
fn default_bit_mutation_rate() -> f64 {
    0.01
}
fn default_scale_factor() -> f64 {
    0.9
}
fn default_mutation_sigma() -> f64 {
    0.05
}
fn default_uniform_swap() -> f64 {
    0.5
}

/// Selection method for parents and mates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method")]
pub enum SelectionMethod {
    /// Uniform random index.
    Uniform,
    /// Uniform random permutation (each gene exactly once per generation
    /// when selection continuation is enabled).
    UniformP,
    /// Fitness proportionate (roulette wheel).
    Proportional,
    /// Tournament selection with configurable size.
    Tournament {
        #[serde(default = "default_tournament_size")]
        size: usize,
    },
    /// Binary tournament.
    Duel,
    /// Stochastic universal sampling.
    Sus,
    /// Linear rank selection with selection pressure in [1, 2].
    LinearRank {
        #[serde(default = "default_rank_pressure")]
        pressure: f64,
    },
}

impl Default for SelectionMethod {
    fn default() -> Self {
        Self::Sus
    }
}

fn default_tournament_size() -> usize {
    2
}
fn default_rank_pressure() -> f64 {
    1.5
}

/// Constant or individually variable operator rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "mode")]
pub enum RateMode {
    /// Every gene uses the base rate.
    #[default]
    Constant,
    /// Genes fitter than `cutoff_fit * best` use the base rate, the rest `rate2`.
    Individual { rate2: f64, cutoff_fit: f64 },
}

/// Fitness scaling policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ScalingMethod {
    /// Identity.
    #[default]
    NoScaling,
    /// Raise fitness to `scaling_exp`.
    ConstantScaling,
    /// Switch between `scaling_exp`, 1 and `scaling_exp2` by dispersion ratio.
    ThresholdScaling,
    /// Exponent `RDM * rdm_weight`.
    ContinuousScaling,
}

/// Dispersion measure driving the dispersion ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DispersionMeasure {
    #[default]
    Variance,
    StdDev,
    Mad,
    CoefficientOfVariation,
    Range,
    Iqr,
}

/// Adaptive scaling configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalingConfig {
    /// Scaling policy.
    #[serde(default)]
    pub method: ScalingMethod,
    /// Exponent for constant scaling and for growing dispersion.
    #[serde(default = "default_one")]
    pub scaling_exp: f64,
    /// Exponent for shrinking dispersion.
    #[serde(default = "default_one")]
    pub scaling_exp2: f64,
    /// Width of the no-scaling band around a ratio of 1.
    #[serde(default)]
    pub threshold: f64,
    /// Weight of the dispersion ratio for continuous scaling.
    #[serde(default = "default_one")]
    pub rdm_weight: f64,
    /// Generations between the compared statistics rows.
    #[serde(default = "default_delay")]
    pub delay: usize,
    /// Dispersion measure.
    #[serde(default)]
    pub dispersion: DispersionMeasure,
    /// Lower clamp of the dispersion ratio.
    #[serde(default = "default_dr_min")]
    pub dr_min: f64,
    /// Upper clamp of the dispersion ratio.
    #[serde(default = "default_dr_max")]
    pub dr_max: f64,
}

impl Default for ScalingConfig {
    fn default() -> Self {
        Self {
            method: ScalingMethod::default(),
            scaling_exp: default_one(),
            scaling_exp2: default_one(),
            threshold: 0.0,
            rdm_weight: default_one(),
            delay: default_delay(),
            dispersion: DispersionMeasure::default(),
            dr_min: default_dr_min(),
            dr_max: default_dr_max(),
        }
    }
}

fn default_one() -> f64 {
    1.0
}
fn default_delay() -> usize {
    1
}
fn default_dr_min() -> f64 {
    0.5
}
fn default_dr_max() -> f64 {
    2.0
}

/// Acceptance rule applied after replication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AcceptanceRule {
    /// Offspring always replaces the parent.
    #[default]
    All,
    /// The fitter of parent and offspring survives.
    Best,
    /// Simulated annealing acceptance.
    Metropolis,
    /// Metropolis with a temperature raised by the gap to the best fitness.
    IVMetropolis,
}

/// Temperature schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum CoolingSchedule {
    #[default]
    ExponentialMultiplicative,
    LogarithmicMultiplicative,
    PowerMultiplicative,
    PowerAdditive,
    ExponentialAdditive,
    TrigonometricAdditive,
}

/// Acceptance and cooling configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceptanceConfig {
    /// Acceptance rule.
    #[serde(default)]
    pub rule: AcceptanceRule,
    /// Metropolis beta constant.
    #[serde(default = "default_beta")]
    pub beta: f64,
    /// Cooling schedule.
    #[serde(default)]
    pub cooling: CoolingSchedule,
    /// Multiplicative cooling constant.
    #[serde(default = "default_alpha")]
    pub alpha: f64,
    /// Exponent of power cooling schedules.
    #[serde(default = "default_one")]
    pub cooling_power: f64,
    /// Start temperature.
    #[serde(default = "default_temp0")]
    pub temp0: f64,
    /// Final temperature of additive schedules.
    #[serde(default = "default_temp_n")]
    pub temp_n: f64,
}

impl Default for AcceptanceConfig {
    fn default() -> Self {
        Self {
            rule: AcceptanceRule::default(),
            beta: default_beta(),
            cooling: CoolingSchedule::default(),
            alpha: default_alpha(),
            cooling_power: default_one(),
            temp0: default_temp0(),
            temp_n: default_temp_n(),
        }
    }
}

fn default_beta() -> f64 {
    2.0
}
fn default_alpha() -> f64 {
    0.99
}
fn default_temp0() -> f64 {
    40.0
}
fn default_temp_n() -> f64 {
    0.01
}

/// Early termination condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TerminationCondition {
    #[default]
    NoTermination,
    AbsoluteError,
    RelativeError,
    RelativeErrorZero,
    #[serde(rename = "PAC")]
    Pac,
    #[serde(rename = "GEQ")]
    Geq,
    #[serde(rename = "LEQ")]
    Leq,
}

impl TerminationCondition {
    /// Whether the condition compares against the problem's global optimum.
    pub fn needs_optimum(&self) -> bool {
        matches!(
            self,
            Self::AbsoluteError | Self::RelativeError | Self::RelativeErrorZero
        )
    }
}

/// Termination configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminationConfig {
    /// Termination condition.
    #[serde(default)]
    pub condition: TerminationCondition,
    /// Width of the termination window.
    #[serde(default = "default_eps")]
    pub eps: f64,
    /// Threshold for `GEQ` and `LEQ`.
    #[serde(default)]
    pub threshold: f64,
    /// Confidence parameter of the PAC bound.
    #[serde(default = "default_pac_delta")]
    pub pac_delta: f64,
    /// Let the problem's own termination predicate take precedence.
    #[serde(default)]
    pub early_termination: bool,
}

impl Default for TerminationConfig {
    fn default() -> Self {
        Self {
            condition: TerminationCondition::default(),
            eps: default_eps(),
            threshold: 0.0,
            pac_delta: default_pac_delta(),
            early_termination: false,
        }
    }
}

fn default_eps() -> f64 {
    0.01
}
fn default_pac_delta() -> f64 {
    0.01
}

/// Fitness evaluation execution model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ExecutionModel {
    /// One gene after another on the orchestrating thread.
    #[default]
    Sequential,
    /// Rayon, statically chunked.
    MultiCore,
    /// Rayon, per-gene work stealing for uneven evaluation cost.
    MultiCoreUnbalanced,
    /// Dedicated worker pool, static partitioning.
    Cluster,
    /// Dedicated worker pool, per-gene load balancing.
    ClusterBalanced,
    /// Caller-provided strategy.
    UserSupplied,
}

impl ExecutionModel {
    /// Whether a run using this model can be replayed exactly.
    pub fn is_reproducible(&self) -> bool {
        matches!(
            self,
            Self::Sequential | Self::MultiCore | Self::MultiCoreUnbalanced
        )
    }
}

/// Execution configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ExecutionConfig {
    /// Execution model.
    #[serde(default)]
    pub model: ExecutionModel,
    /// Threads for multi-core models (0 = rayon default).
    #[serde(default)]
    pub cores: usize,
    /// Workers for cluster models (0 = available parallelism).
    #[serde(default)]
    pub workers: usize,
}

/// Reporting, profiling and batch output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportingConfig {
    /// 0 = silent, 1 = one line per generation, 2 = detail.
    #[serde(default = "default_verbose")]
    pub verbose: u8,
    /// Record per-phase timers (total time is always recorded).
    #[serde(default)]
    pub profile: bool,
    /// Write the run result to a uniquely named JSON file.
    #[serde(default)]
    pub batch: bool,
    /// Output directory for batch results (current directory when absent).
    #[serde(default)]
    pub output_dir: Option<String>,
    /// File name prefix for batch results.
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Keep the final fitness vector in the result.
    #[serde(default)]
    pub keep_final_fitness: bool,
    /// Report every equally-best gene, not just the first.
    #[serde(default)]
    pub all_solutions: bool,
    /// Log every failed evaluation.
    #[serde(default)]
    pub log_failures: bool,
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            verbose: default_verbose(),
            profile: false,
            batch: false,
            output_dir: None,
            prefix: default_prefix(),
            keep_final_fitness: false,
            all_solutions: false,
            log_failures: false,
        }
    }
}

fn default_verbose() -> u8 {
    1
}
fn default_prefix() -> String {
    "evorun-".to_string()
}
