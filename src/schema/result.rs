//! Result types of an evolutionary run: statistics, solution, timers.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::RunConfig;
use crate::representation::{Gene, Phenotype};

/// Summary statistics of one generation's fitness vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct PopulationStatistics {
    pub mean: f64,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    pub variance: f64,
    /// Median absolute deviation.
    pub mad: f64,
}

impl PopulationStatistics {
    /// Column names in row order.
    pub const COLUMNS: [&'static str; 8] =
        ["mean", "min", "q1", "median", "q3", "max", "variance", "mad"];

    /// Values in `COLUMNS` order.
    pub fn to_row(&self) -> [f64; 8] {
        [
            self.mean,
            self.min,
            self.q1,
            self.median,
            self.q3,
            self.max,
            self.variance,
            self.mad,
        ]
    }
}

/// Statistics accumulated row-wise, one row per completed generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct StatisticsHistory {
    rows: Vec<PopulationStatistics>,
}

impl StatisticsHistory {
    /// Append a row.
    pub fn push(&mut self, row: PopulationStatistics) {
        self.rows.push(row);
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether no generation has been observed.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All rows, oldest first.
    pub fn rows(&self) -> &[PopulationStatistics] {
        &self.rows
    }

    /// Most recent row.
    pub fn last(&self) -> Option<&PopulationStatistics> {
        self.rows.last()
    }

    /// Row `index` (0 is the initial population).
    pub fn get(&self, index: usize) -> Option<&PopulationStatistics> {
        self.rows.get(index)
    }

    /// Best fitness per generation.
    pub fn best(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.max).collect()
    }

    /// History as a matrix in `PopulationStatistics::COLUMNS` order.
    pub fn to_matrix(&self) -> Vec<[f64; 8]> {
        self.rows.iter().map(PopulationStatistics::to_row).collect()
    }
}

/// One of several equally-best genes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestGene {
    pub gene: Gene,
    pub phenotype: Option<Phenotype>,
    pub value: f64,
}

/// Best gene(s) found by a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    /// Internal (maximized) fitness.
    pub fitness: f64,
    /// Objective value in the problem's orientation.
    pub value: f64,
    /// Raw gene.
    pub gene: Gene,
    /// Decoded gene, absent when decoding failed.
    pub phenotype: Option<Phenotype>,
    /// Number of genes sharing the best fitness.
    pub ties: usize,
    /// Every distinct equally-best gene (when requested).
    #[serde(default)]
    pub equally_best: Vec<BestGene>,
}

/// Progress update after each observed generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationProgress {
    /// Generation number (0 is the initial population).
    pub generation: usize,
    /// Total generations planned.
    pub total_generations: usize,
    /// Statistics of this generation.
    pub statistics: PopulationStatistics,
    /// Best objective value of this generation.
    pub best_value: f64,
    /// Current temperature.
    pub temperature: f64,
    /// Dispersion ratio used for scaling.
    pub dispersion_ratio: f64,
    /// Failed evaluations so far.
    pub failures: usize,
}

/// Reason a run stopped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum StopReason {
    /// Reached the configured number of generations.
    MaxGenerations,
    /// The configured termination condition fired.
    Terminated,
    /// The problem's own termination predicate fired.
    ProblemTerminated,
    /// Cancelled through the engine's cancel handle.
    Cancelled,
    /// An evaluation step returned the wrong number of genes.
    PopulationShrunk { expected: usize, found: usize },
}

/// Elapsed time and call count of one phase.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct PhaseMetric {
    pub count: u64,
    pub seconds: f64,
}

/// Per-phase timers and counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Timings {
    pub total: PhaseMetric,
    pub init: PhaseMetric,
    pub eval: PhaseMetric,
    pub observe: PhaseMetric,
    pub next_generation: PhaseMetric,
    pub termination: PhaseMetric,
    pub summary: PhaseMetric,
    /// Number of objective evaluations.
    pub evaluations: u64,
}

/// Final result of an evolutionary run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    /// Problem name.
    pub problem: String,
    /// Statistics history (initial population plus one row per generation).
    pub statistics: StatisticsHistory,
    /// Fitness vector of the final population (when requested).
    pub final_fitness: Option<Vec<f64>>,
    /// Best solution.
    pub solution: Solution,
    /// Number of failed evaluations.
    pub failures: usize,
    /// Resolved configuration with the replay seed filled in.
    pub config: RunConfig,
    /// Seed of the run RNG.
    pub seed: u64,
    /// Generations completed after the initial one.
    pub generations: usize,
    /// Reason for stopping.
    pub stop_reason: StopReason,
    /// Timers and counters.
    pub timings: Timings,
    /// File the result was written to in batch mode.
    #[serde(skip)]
    pub output_path: Option<PathBuf>,
}

impl RunResult {
    /// Configuration that replays this run.
    pub fn replay_config(&self) -> RunConfig {
        let mut config = self.config.clone();
        config.basic.replay = Some(self.seed);
        config.reporting.batch = false;
        config
    }

    /// Replay configuration as pretty JSON, suitable for the CLI.
    pub fn replay_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.replay_config())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_matrix_columns() {
        let mut history = StatisticsHistory::default();
        history.push(PopulationStatistics {
            mean: 1.0,
            min: 0.0,
            q1: 0.5,
            median: 1.0,
            q3: 1.5,
            max: 2.0,
            variance: 0.5,
            mad: 0.7,
        });
        let matrix = history.to_matrix();
        assert_eq!(matrix.len(), 1);
        assert_eq!(matrix[0][0], 1.0);
        assert_eq!(matrix[0][5], 2.0);
        assert_eq!(PopulationStatistics::COLUMNS[5], "max");
        assert_eq!(history.best(), vec![2.0]);
    }
}
