//! Population lifecycle: the generational loop.
//!
//! `Init → Eval0 → Observe → Terminate? → (ScaleSelectReplicate → Eval →
//! Observe → Cool → Terminate?)* → Finalize`. The loop itself is sequential;
//! only evaluation is handed to the execution strategy.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use super::adaptive;
use super::persistence::BatchWriter;
use super::recorder::{Phase, RunRecorder, best_index, best_solution};
use super::registry::Registry;
use super::selection::{ParentSource, selection_fitness};
use super::statistics;
use super::{
    Choice, ContextHandle, EngineError, Evaluation, ExecutionStrategy, GeneEvaluator, LocalContext,
    RunRng,
};
use crate::problem::Problem;
use crate::representation::{Candidate, Gene, ReplicationInput};
use crate::schema::{
    ConfigError, ExecutionModel, GenerationProgress, RunConfig, RunResult, StatisticsHistory,
    StopReason,
};

/// Evolutionary run engine.
pub struct EvolutionEngine {
    context: ContextHandle,
    seed: u64,
    rng: RunRng,
    evaluator: GeneEvaluator,
    recorder: RunRecorder,
    population: Vec<Gene>,
    evaluations: Vec<Evaluation>,
    history: StatisticsHistory,
    generation: usize,
    user_execution: bool,
    cancelled: Arc<AtomicBool>,
}

impl EvolutionEngine {
    /// Create an engine using the built-in operator registry.
    pub fn new(problem: Arc<dyn Problem>, config: RunConfig) -> Result<Self, ConfigError> {
        Self::with_registry(problem, config, &Registry::builtin())
    }

    /// Create an engine resolving operators from `registry`.
    pub fn with_registry(
        problem: Arc<dyn Problem>,
        mut config: RunConfig,
        registry: &Registry,
    ) -> Result<Self, ConfigError> {
        let seed = config.basic.replay.unwrap_or_else(rand::random);
        config.basic.replay = Some(seed);
        let sharing = config.context;
        let evaluator = GeneEvaluator::new(&config);
        let recorder = RunRecorder::new(config.reporting.profile);
        let ctx = LocalContext::build(problem, config, registry)?;

        Ok(Self {
            context: ContextHandle::new(ctx, sharing),
            seed,
            rng: RunRng::new(seed),
            evaluator,
            recorder,
            population: Vec::new(),
            evaluations: Vec::new(),
            history: StatisticsHistory::default(),
            generation: 0,
            user_execution: false,
            cancelled: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Evaluate with a caller-provided strategy instead of the built-ins.
    pub fn with_execution(mut self, strategy: Arc<dyn ExecutionStrategy>) -> Self {
        self.context.modify(|ctx| {
            ctx.policies.execution = strategy;
            ctx.config.execution.model = ExecutionModel::UserSupplied;
        });
        self.user_execution = true;
        self
    }

    /// Get cancellation handle. Checked between generations.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    /// Seed of the run RNG.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn context(&self) -> &ContextHandle {
        &self.context
    }

    pub fn population(&self) -> &[Gene] {
        &self.population
    }

    pub fn history(&self) -> &StatisticsHistory {
        &self.history
    }

    /// Run to completion.
    pub fn run(&mut self) -> Result<RunResult, EngineError> {
        self.run_with_callback(|_| {})
    }

    /// Run to completion, reporting progress after every observed generation.
    pub fn run_with_callback<F>(&mut self, mut callback: F) -> Result<RunResult, EngineError>
    where
        F: FnMut(&GenerationProgress),
    {
        let (popsize, generations) = {
            let ctx = self.context.read();
            if ctx.config.execution.model == ExecutionModel::UserSupplied && !self.user_execution {
                return Err(ConfigError::InvalidParameter(
                    "UserSupplied execution needs a strategy passed to with_execution".to_string(),
                )
                .into());
            }
            self.evaluator = GeneEvaluator::new(&ctx.config);
            (ctx.config.basic.popsize, ctx.config.basic.generations)
        };
        self.rng = RunRng::new(self.seed);
        self.recorder.start();
        self.history = StatisticsHistory::default();
        self.generation = 0;
        self.context.update(|a| a.generation = 0);
        self.cool();

        self.initialize();
        let initial = std::mem::take(&mut self.population)
            .into_iter()
            .map(Candidate::unevaluated)
            .collect();
        match self.evaluate(initial, 0) {
            Ok((genes, evaluations)) => {
                self.population = genes;
                self.evaluations = evaluations;
            }
            Err(found) => {
                log::error!("Initial evaluation returned {found} results for {popsize} genes");
                return Err(EngineError::PopulationIntegrity {
                    expected: popsize,
                    found,
                });
            }
        }
        self.observe();
        callback(&self.progress());

        let stop_reason = loop {
            if let Some(reason) = self.should_stop(generations) {
                break reason;
            }

            let candidates = self.next_generation();
            match self.evaluate(candidates, self.generation + 1) {
                Ok((genes, evaluations)) => {
                    self.population = genes;
                    self.evaluations = evaluations;
                }
                Err(found) => {
                    log::error!(
                        "Generation {} evaluated {found} of {popsize} genes, aborting",
                        self.generation + 1
                    );
                    break StopReason::PopulationShrunk {
                        expected: popsize,
                        found,
                    };
                }
            }
            self.generation += 1;
            self.observe();
            self.cool();
            callback(&self.progress());
        };

        self.finalize(stop_reason)
    }

    /// Create the initial population.
    fn initialize(&mut self) {
        let start = Instant::now();
        let guard = self.context.read();
        let ctx: &LocalContext = &guard;
        let rng = &mut self.rng;
        self.population = (0..ctx.config.basic.popsize)
            .map(|_| ctx.genes.init.init(ctx, rng))
            .collect();
        drop(guard);
        self.recorder.record(Phase::Init, start.elapsed());
    }

    /// Evaluate every candidate without a cached evaluation, then let the
    /// acceptance rule settle each offspring against its parent in population
    /// order. On a result count mismatch returns the number of genes that
    /// came back.
    fn evaluate(
        &mut self,
        candidates: Vec<Candidate>,
        generation: usize,
    ) -> Result<(Vec<Gene>, Vec<Evaluation>), usize> {
        let start = Instant::now();
        let guard = self.context.read();
        let ctx: &LocalContext = &guard;
        let popsize = ctx.config.basic.popsize;
        self.evaluator.set_generation(generation);

        let mut genes = Vec::with_capacity(candidates.len());
        let mut cached = Vec::with_capacity(candidates.len());
        let mut rivals = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            genes.push(candidate.gene);
            cached.push(candidate.evaluation);
            rivals.push(candidate.rival);
        }

        let pending: Vec<usize> = cached
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_none())
            .map(|(i, _)| i)
            .collect();
        let evaluator = &self.evaluator;
        let evaluate = |gene: &Gene| evaluator.evaluate(gene, ctx);
        let results = if pending.is_empty() {
            Vec::new()
        } else if pending.len() == genes.len() {
            ctx.policies.execution.apply(&genes, &evaluate)
        } else {
            let subset: Vec<Gene> = pending.iter().map(|&i| genes[i].clone()).collect();
            ctx.policies.execution.apply(&subset, &evaluate)
        };
        if ctx.config.reporting.verbose >= 2 {
            log::debug!(
                "Generation {generation}: evaluated {} genes, {} cached",
                results.len(),
                genes.len() - pending.len()
            );
        }

        let found = genes.len() - pending.len() + results.len();
        let merged = if genes.len() == popsize && results.len() == pending.len() {
            let mut fresh = results.into_iter();
            cached
                .into_iter()
                .map(|c| c.or_else(|| fresh.next()))
                .collect::<Option<Vec<_>>>()
        } else {
            None
        };
        let Some(mut evaluations) = merged else {
            drop(guard);
            self.recorder.record(Phase::Eval, start.elapsed());
            return Err(found);
        };

        let acceptor = &ctx.policies.acceptance;
        let mut kept = 0;
        for (i, rival) in rivals.iter().enumerate() {
            let Some(parent) = *rival else { continue };
            let choice = acceptor.choose(
                self.evaluations[parent].fitness,
                evaluations[i].fitness,
                ctx,
                &mut self.rng,
            );
            if choice == Choice::Parent {
                genes[i] = self.population[parent].clone();
                evaluations[i] = self.evaluations[parent];
                kept += 1;
            }
        }
        if kept > 0 && ctx.config.reporting.verbose >= 2 {
            log::debug!("Generation {generation}: {kept} parents kept over their offspring");
        }
        drop(guard);

        self.recorder.record(Phase::Eval, start.elapsed());
        Ok((genes, evaluations))
    }

    /// Append a statistics row and refresh the adaptive state.
    fn observe(&mut self) {
        let start = Instant::now();
        let fitness: Vec<f64> = self.evaluations.iter().map(|e| e.fitness).collect();
        let row = statistics::observe(&fitness);
        self.history.push(row);

        let (ratio, verbose) = {
            let ctx = self.context.read();
            (
                adaptive::dispersion_ratio(&self.history, &ctx.config.scaling),
                ctx.config.reporting.verbose,
            )
        };
        let generation = self.generation;
        self.context.update(|a| {
            a.generation = generation;
            a.best_fitness = row.max;
            a.mean_fitness = row.mean;
            a.variance_fitness = row.variance;
            a.dispersion_ratio = ratio;
        });

        if verbose >= 1 {
            let best_value = best_index(&self.evaluations)
                .map(|i| self.evaluations[i].value)
                .unwrap_or(f64::NAN);
            log::info!(
                "Generation {generation}: best {best_value:.6}, mean fitness {:.6}, failures {}",
                row.mean,
                self.evaluator.failures()
            );
        }
        if verbose >= 2 {
            log::debug!(
                "Generation {generation}: q1 {:.6} median {:.6} q3 {:.6} variance {:.6} ratio {ratio:.4}",
                row.q1,
                row.median,
                row.q3,
                row.variance
            );
        }
        self.recorder.record(Phase::Observe, start.elapsed());
    }

    /// Set the temperature for the current generation.
    fn cool(&mut self) {
        let temperature = self
            .context
            .read()
            .policies
            .cooling
            .temperature(self.generation);
        self.context.update(|a| a.temperature = temperature);
    }

    /// Scale, select and replicate the next population.
    fn next_generation(&mut self) -> Vec<Candidate> {
        let start = Instant::now();
        let guard = self.context.read();
        let ctx: &LocalContext = &guard;
        let popsize = ctx.config.basic.popsize;

        let fitness = selection_fitness(&self.evaluations);
        let scaled = ctx.policies.scaling.scale(&fitness, ctx.adaptive.dispersion_ratio);
        let mut parents = ParentSource::new(
            scaled,
            Arc::clone(&ctx.policies.selection),
            Arc::clone(&ctx.policies.mate_selection),
            ctx.config.operators.selection_continuation,
            popsize,
            &mut self.rng,
        );

        let mut next: Vec<Candidate> = Vec::with_capacity(popsize);
        let mut input = ReplicationInput {
            population: &self.population,
            evaluations: &self.evaluations,
            parents: &mut parents,
            ctx,
        };
        while next.len() < popsize {
            let batch = ctx.genes.replication.replicate(&mut input, &mut self.rng);
            if batch.is_empty() {
                log::error!("Replication produced no genes");
                break;
            }
            next.extend(batch);
        }
        next.truncate(popsize);

        if ctx.config.basic.elitist
            && !next.is_empty()
            && let Some(best) = best_index(&self.evaluations)
        {
            next[0] = Candidate::evaluated(self.population[best].clone(), self.evaluations[best]);
        }
        drop(guard);

        self.recorder.record(Phase::NextGeneration, start.elapsed());
        next
    }

    /// Check if the run should stop.
    fn should_stop(&mut self, generations: usize) -> Option<StopReason> {
        if self.cancelled.load(Ordering::Relaxed) {
            return Some(StopReason::Cancelled);
        }

        let start = Instant::now();
        let reason = {
            let guard = self.context.read();
            let ctx: &LocalContext = &guard;
            best_solution(&self.population, &self.evaluations, ctx, false).and_then(|best| {
                let supplied = if ctx.config.termination.early_termination {
                    ctx.problem.terminate(&best)
                } else {
                    None
                };
                match supplied {
                    Some(true) => Some(StopReason::ProblemTerminated),
                    Some(false) => None,
                    None => ctx
                        .policies
                        .termination
                        .should_stop(&best, &self.history)
                        .then_some(StopReason::Terminated),
                }
            })
        };
        self.recorder.record(Phase::Termination, start.elapsed());

        reason.or_else(|| (self.generation >= generations).then_some(StopReason::MaxGenerations))
    }

    /// Current progress.
    pub fn progress(&self) -> GenerationProgress {
        let adaptive = self.context.adaptive();
        GenerationProgress {
            generation: self.generation,
            total_generations: self.context.read().config.basic.generations,
            statistics: self.history.last().copied().unwrap_or_default(),
            best_value: best_index(&self.evaluations)
                .map(|i| self.evaluations[i].value)
                .unwrap_or(f64::NAN),
            temperature: adaptive.temperature,
            dispersion_ratio: adaptive.dispersion_ratio,
            failures: self.evaluator.failures(),
        }
    }

    fn finalize(&mut self, stop_reason: StopReason) -> Result<RunResult, EngineError> {
        let start = Instant::now();
        let guard = self.context.read();
        let ctx: &LocalContext = &guard;
        let reporting = &ctx.config.reporting;
        let solution = best_solution(
            &self.population,
            &self.evaluations,
            ctx,
            reporting.all_solutions,
        )
        .ok_or(EngineError::PopulationIntegrity {
            expected: ctx.config.basic.popsize,
            found: 0,
        })?;
        let final_fitness = reporting
            .keep_final_fitness
            .then(|| self.evaluations.iter().map(|e| e.fitness).collect());
        let problem = ctx.problem.name();
        let config = ctx.config.clone();
        drop(guard);
        self.recorder.record(Phase::Summary, start.elapsed());

        let mut result = RunResult {
            problem,
            statistics: self.history.clone(),
            final_fitness,
            solution,
            failures: self.evaluator.failures(),
            config,
            seed: self.seed,
            generations: self.generation,
            stop_reason,
            timings: self.recorder.finish(self.evaluator.evaluations()),
            output_path: None,
        };

        if result.config.reporting.verbose >= 1 {
            log::info!(
                "Finished {} after {} generations ({:?}): best value {:.6}, {} failures",
                result.problem,
                result.generations,
                result.stop_reason,
                result.solution.value,
                result.failures
            );
        }
        if result.config.reporting.batch {
            let path = BatchWriter::from_config(&result.config.reporting).write(&result)?;
            result.output_path = Some(path);
        }
        Ok(result)
    }
}

/// Run `problem` with `config` using the built-in registry.
pub fn run(problem: Arc<dyn Problem>, config: RunConfig) -> Result<RunResult, EngineError> {
    EvolutionEngine::new(problem, config)?.run()
}
