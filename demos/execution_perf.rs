//! Quick execution model performance test

use std::sync::Arc;
use std::time::{Duration, Instant};

use evorun::{
    EngineError, EvaluationError, Problem,
    engine::{EvolutionEngine, LocalContext},
    representation::{Gene, Phenotype},
    schema::{ExecutionModel, RunConfig},
};

/// Sphere function that spins for a fixed time per evaluation.
struct SlowSphere {
    dims: usize,
    cost: Duration,
}

impl Problem for SlowSphere {
    fn name(&self) -> String {
        format!("SlowSphere{}D", self.dims)
    }

    fn f(&self, phenotype: &Phenotype, _gene: &Gene, _ctx: &LocalContext) -> Result<f64, EvaluationError> {
        let start = Instant::now();
        while start.elapsed() < self.cost {
            std::hint::spin_loop();
        }
        let x = phenotype
            .as_real()
            .ok_or_else(|| EvaluationError::Failed("expected real parameters".to_string()))?;
        Ok(x.iter().map(|v| v * v).sum())
    }

    fn bits(&self) -> Vec<usize> {
        vec![20; self.dims]
    }

    fn lower(&self) -> Vec<f64> {
        vec![-1.0; self.dims]
    }

    fn upper(&self) -> Vec<f64> {
        vec![1.0; self.dims]
    }
}

fn main() {
    println!("=== Execution Model Performance Test ===\n");

    let models = [
        ExecutionModel::Sequential,
        ExecutionModel::MultiCore,
        ExecutionModel::MultiCoreUnbalanced,
        ExecutionModel::Cluster,
        ExecutionModel::ClusterBalanced,
    ];

    for micros in [0, 200, 1000] {
        println!("Evaluation cost: {}us", micros);

        for model in models {
            let mut config = RunConfig::default();
            config.basic.popsize = 64;
            config.basic.generations = 10;
            config.basic.max = false;
            config.basic.replay = Some(42);
            config.execution.model = model;

            let problem = Arc::new(SlowSphere {
                dims: 4,
                cost: Duration::from_micros(micros),
            });

            let start = Instant::now();
            let outcome = EvolutionEngine::new(problem, config)
                .map_err(EngineError::from)
                .and_then(|mut engine| engine.run());
            let result = match outcome {
                Ok(result) => result,
                Err(e) => {
                    eprintln!("  {:?}: {}", model, e);
                    continue;
                }
            };
            let elapsed = start.elapsed();

            let evals = result.timings.evaluations;
            println!(
                "  {:<22} {:>6} evals  {:>7.3}s  {:>9.1} evals/s  best={:.6}",
                format!("{:?}", model),
                evals,
                elapsed.as_secs_f64(),
                evals as f64 / elapsed.as_secs_f64(),
                result.solution.value
            );
        }
        println!();
    }
}
