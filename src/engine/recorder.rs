//! Run recording: phase timers, solution extraction and replay.

use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{EngineError, Evaluation, EvolutionEngine, LocalContext};
use crate::problem::Problem;
use crate::representation::Gene;
use crate::schema::{BestGene, PhaseMetric, RunResult, Solution, Timings};

/// Lifecycle phase measured by the recorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    Eval,
    Observe,
    NextGeneration,
    Termination,
    Summary,
}

/// Per-phase timers and counters. Call counts are always kept; elapsed time
/// per phase only when profiling.
#[derive(Debug)]
pub struct RunRecorder {
    profile: bool,
    started: Instant,
    timings: Timings,
}

impl RunRecorder {
    pub fn new(profile: bool) -> Self {
        Self {
            profile,
            started: Instant::now(),
            timings: Timings::default(),
        }
    }

    /// Restart the total timer.
    pub fn start(&mut self) {
        self.started = Instant::now();
        self.timings = Timings::default();
    }

    pub fn record(&mut self, phase: Phase, elapsed: Duration) {
        let metric = match phase {
            Phase::Init => &mut self.timings.init,
            Phase::Eval => &mut self.timings.eval,
            Phase::Observe => &mut self.timings.observe,
            Phase::NextGeneration => &mut self.timings.next_generation,
            Phase::Termination => &mut self.timings.termination,
            Phase::Summary => &mut self.timings.summary,
        };
        metric.count += 1;
        if self.profile {
            metric.seconds += elapsed.as_secs_f64();
        }
    }

    /// Timings so far, with the total and the evaluation count filled in.
    pub fn finish(&self, evaluations: u64) -> Timings {
        let mut timings = self.timings.clone();
        timings.total = PhaseMetric {
            count: 1,
            seconds: self.started.elapsed().as_secs_f64(),
        };
        timings.evaluations = evaluations;
        timings
    }
}

/// Index of the best evaluation, first one on ties.
pub fn best_index(evaluations: &[Evaluation]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, evaluation) in evaluations.iter().enumerate() {
        match best {
            Some(b) if evaluations[b].fitness >= evaluation.fitness => {}
            _ => best = Some(i),
        }
    }
    best
}

/// Best solution of a population. With `all`, every distinct gene sharing
/// the best fitness is decoded and listed.
pub fn best_solution(
    population: &[Gene],
    evaluations: &[Evaluation],
    ctx: &LocalContext,
    all: bool,
) -> Option<Solution> {
    let index = best_index(evaluations)?;
    let best = evaluations[index];
    let tied: Vec<usize> = evaluations
        .iter()
        .enumerate()
        .filter(|(_, e)| e.fitness == best.fitness)
        .map(|(i, _)| i)
        .collect();

    let mut equally_best: Vec<BestGene> = Vec::new();
    if all {
        for &i in &tied {
            let gene = &population[i];
            if equally_best.iter().any(|b| &b.gene == gene) {
                continue;
            }
            equally_best.push(BestGene {
                gene: gene.clone(),
                phenotype: ctx.genes.decode.decode(gene, ctx).ok(),
                value: evaluations[i].value,
            });
        }
    }

    let gene = population[index].clone();
    Some(Solution {
        fitness: best.fitness,
        value: best.value,
        phenotype: ctx.genes.decode.decode(&gene, ctx).ok(),
        gene,
        ties: tied.len(),
        equally_best,
    })
}

/// Re-execute a previous run from its recorded configuration and seed.
/// Runs whose execution model cannot be replayed exactly are returned unchanged.
pub fn rerun(problem: Arc<dyn Problem>, previous: &RunResult) -> Result<RunResult, EngineError> {
    let model = previous.config.execution.model;
    if !model.is_reproducible() {
        log::warn!(
            "Run with execution model {model:?} cannot be replayed exactly; returning the original result"
        );
        return Ok(previous.clone());
    }
    EvolutionEngine::new(problem, previous.replay_config())?.run()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_best_index_first_on_ties() {
        let evaluations = [
            Evaluation::from_value(1.0, true),
            Evaluation::from_value(3.0, true),
            Evaluation::from_value(3.0, true),
        ];
        assert_eq!(best_index(&evaluations), Some(1));
        assert_eq!(best_index(&[]), None);
    }

    #[test]
    fn test_counts_without_profile() {
        let mut recorder = RunRecorder::new(false);
        recorder.record(Phase::Eval, Duration::from_millis(5));
        recorder.record(Phase::Eval, Duration::from_millis(5));
        let timings = recorder.finish(12);
        assert_eq!(timings.eval.count, 2);
        assert_eq!(timings.eval.seconds, 0.0);
        assert_eq!(timings.evaluations, 12);
        assert_eq!(timings.total.count, 1);
    }

    #[test]
    fn test_profile_accumulates_time() {
        let mut recorder = RunRecorder::new(true);
        recorder.record(Phase::Observe, Duration::from_millis(250));
        assert!((recorder.finish(0).observe.seconds - 0.25).abs() < 1e-9);
    }
}
