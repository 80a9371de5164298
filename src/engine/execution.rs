//! Execution strategies for fitness evaluation.
//!
//! Evaluation is the only parallel step of a run. A strategy receives the
//! genes of one generation and an evaluation function and must return one
//! [`Evaluation`] per gene, in order.

use std::sync::Arc;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use super::Evaluation;
use crate::representation::Gene;
use crate::schema::{ExecutionConfig, ExecutionModel};

/// Per-gene evaluation function handed to a strategy.
pub type EvaluateFn<'a> = dyn Fn(&Gene) -> Evaluation + Sync + 'a;

/// Maps a population through the evaluation function.
pub trait ExecutionStrategy: Send + Sync {
    fn name(&self) -> &str;

    fn apply(&self, population: &[Gene], evaluate: &EvaluateFn<'_>) -> Vec<Evaluation>;
}

/// One gene after another on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sequential;

impl ExecutionStrategy for Sequential {
    fn name(&self) -> &str {
        "Sequential"
    }

    fn apply(&self, population: &[Gene], evaluate: &EvaluateFn<'_>) -> Vec<Evaluation> {
        population.iter().map(evaluate).collect()
    }
}

fn static_chunks(
    population: &[Gene],
    threads: usize,
    evaluate: &EvaluateFn<'_>,
) -> Vec<Evaluation> {
    let chunk = population.len().div_ceil(threads.max(1)).max(1);
    population
        .par_chunks(chunk)
        .map(|genes| genes.iter().map(evaluate).collect::<Vec<_>>())
        .collect::<Vec<_>>()
        .into_iter()
        .flatten()
        .collect()
}

fn per_gene(population: &[Gene], evaluate: &EvaluateFn<'_>) -> Vec<Evaluation> {
    population
        .par_iter()
        .with_max_len(1)
        .map(evaluate)
        .collect()
}

fn build_pool(threads: usize, label: &str) -> Option<ThreadPool> {
    match ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name({
            let label = label.to_string();
            move |i| format!("{label}-{i}")
        })
        .build()
    {
        Ok(pool) => Some(pool),
        Err(e) => {
            log::warn!("Failed to build {threads}-thread pool, using the global pool: {e}");
            None
        }
    }
}

/// Rayon evaluation, on the global pool or a pool of `cores` threads.
pub struct MultiCore {
    pool: Option<ThreadPool>,
    balanced: bool,
}

impl MultiCore {
    /// Statically chunked scheduling for homogeneous evaluation cost.
    pub fn new(cores: usize) -> Self {
        Self {
            pool: (cores > 0).then(|| build_pool(cores, "evorun-core")).flatten(),
            balanced: false,
        }
    }

    /// Per-gene work stealing for heterogeneous evaluation cost.
    pub fn unbalanced(cores: usize) -> Self {
        Self {
            balanced: true,
            ..Self::new(cores)
        }
    }

    fn threads(&self) -> usize {
        self.pool
            .as_ref()
            .map(ThreadPool::current_num_threads)
            .unwrap_or_else(rayon::current_num_threads)
    }
}

impl ExecutionStrategy for MultiCore {
    fn name(&self) -> &str {
        if self.balanced {
            "MultiCoreUnbalanced"
        } else {
            "MultiCore"
        }
    }

    fn apply(&self, population: &[Gene], evaluate: &EvaluateFn<'_>) -> Vec<Evaluation> {
        let threads = self.threads();
        let run = || {
            if self.balanced {
                per_gene(population, evaluate)
            } else {
                static_chunks(population, threads, evaluate)
            }
        };
        match &self.pool {
            Some(pool) => pool.install(run),
            None => run(),
        }
    }
}

/// A dedicated worker pool held for the whole run.
pub struct WorkerPool {
    pool: Option<ThreadPool>,
    workers: usize,
    balanced: bool,
}

impl WorkerPool {
    /// `workers` threads (0 = available parallelism), static block partitioning.
    pub fn new(workers: usize) -> Self {
        let workers = if workers == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        } else {
            workers
        };
        Self {
            pool: build_pool(workers, "evorun-worker"),
            workers,
            balanced: false,
        }
    }

    /// Same pool, per-gene load balancing.
    pub fn balanced(workers: usize) -> Self {
        Self {
            balanced: true,
            ..Self::new(workers)
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }
}

impl ExecutionStrategy for WorkerPool {
    fn name(&self) -> &str {
        if self.balanced {
            "ClusterBalanced"
        } else {
            "Cluster"
        }
    }

    fn apply(&self, population: &[Gene], evaluate: &EvaluateFn<'_>) -> Vec<Evaluation> {
        let run = || {
            if self.balanced {
                per_gene(population, evaluate)
            } else {
                static_chunks(population, self.workers, evaluate)
            }
        };
        match &self.pool {
            Some(pool) => pool.install(run),
            None => run(),
        }
    }
}

/// Built-in strategy for the configured model. `UserSupplied` has no built-in
/// strategy and must be installed with `EvolutionEngine::with_execution`.
pub fn strategy_for(config: &ExecutionConfig) -> Option<Arc<dyn ExecutionStrategy>> {
    let strategy: Arc<dyn ExecutionStrategy> = match config.model {
        ExecutionModel::Sequential => Arc::new(Sequential),
        ExecutionModel::MultiCore => Arc::new(MultiCore::new(config.cores)),
        ExecutionModel::MultiCoreUnbalanced => Arc::new(MultiCore::unbalanced(config.cores)),
        ExecutionModel::Cluster => Arc::new(WorkerPool::new(config.workers)),
        ExecutionModel::ClusterBalanced => Arc::new(WorkerPool::balanced(config.workers)),
        ExecutionModel::UserSupplied => return None,
    };
    Some(strategy)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn population() -> Vec<Gene> {
        (0..37).map(|i| Gene::real(vec![i as f64])).collect()
    }

    fn evaluate(gene: &Gene) -> Evaluation {
        let value = match &gene.genotype {
            crate::representation::Genotype::Real(v) => v[0],
            _ => f64::NAN,
        };
        Evaluation::from_value(value * value, true)
    }

    fn expected() -> Vec<Evaluation> {
        population().iter().map(evaluate).collect()
    }

    #[test]
    fn test_strategies_preserve_order() {
        let genes = population();
        let strategies: Vec<Arc<dyn ExecutionStrategy>> = vec![
            Arc::new(Sequential),
            Arc::new(MultiCore::new(0)),
            Arc::new(MultiCore::unbalanced(3)),
            Arc::new(WorkerPool::new(2)),
            Arc::new(WorkerPool::balanced(4)),
        ];
        for strategy in strategies {
            assert_eq!(strategy.apply(&genes, &evaluate), expected(), "{}", strategy.name());
        }
    }

    #[test]
    fn test_user_supplied_needs_strategy() {
        let config = ExecutionConfig {
            model: ExecutionModel::UserSupplied,
            ..Default::default()
        };
        assert!(strategy_for(&config).is_none());
    }

    #[test]
    fn test_empty_population() {
        assert!(MultiCore::new(2).apply(&[], &evaluate).is_empty());
    }
}
