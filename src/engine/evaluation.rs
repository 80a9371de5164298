//! Per-gene evaluation with failure capture.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};

use super::LocalContext;
use crate::problem::EvaluationError;
use crate::representation::{Gene, Phenotype};
use crate::schema::RunConfig;

/// Evaluation of one gene.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Internal, always maximized score.
    pub fitness: f64,
    /// Objective value in the problem's orientation.
    pub value: f64,
    /// The objective or decoder failed and `fitness` is the worst fitness.
    pub failed: bool,
}

impl Evaluation {
    pub fn from_value(value: f64, maximize: bool) -> Self {
        Self {
            fitness: if maximize { value } else { -value },
            value,
            failed: false,
        }
    }

    /// Evaluation of a failed gene. `worst_fitness` is in the internal orientation.
    pub fn failure(worst_fitness: f64, maximize: bool) -> Self {
        Self {
            fitness: worst_fitness,
            value: if maximize { worst_fitness } else { -worst_fitness },
            failed: true,
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Decodes and evaluates genes, counting evaluations and failures.
/// Safe to share across evaluation workers.
#[derive(Debug)]
pub struct GeneEvaluator {
    worst_fitness: f64,
    maximize: bool,
    log_failures: bool,
    generation: AtomicUsize,
    evaluations: AtomicU64,
    failures: AtomicUsize,
}

impl GeneEvaluator {
    pub fn new(config: &RunConfig) -> Self {
        Self {
            worst_fitness: config.basic.worst_fitness,
            maximize: config.basic.max,
            log_failures: config.reporting.log_failures,
            generation: AtomicUsize::new(0),
            evaluations: AtomicU64::new(0),
            failures: AtomicUsize::new(0),
        }
    }

    /// Generation reported in failure logs.
    pub fn set_generation(&self, generation: usize) {
        self.generation.store(generation, Ordering::Relaxed);
    }

    pub fn evaluations(&self) -> u64 {
        self.evaluations.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> usize {
        self.failures.load(Ordering::Relaxed)
    }

    /// Decode, run the objective, and map any failure to the worst fitness.
    pub fn evaluate(&self, gene: &Gene, ctx: &LocalContext) -> Evaluation {
        self.evaluations.fetch_add(1, Ordering::Relaxed);
        let mut phenotype: Option<Phenotype> = None;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let decoded = ctx.genes.decode.decode(gene, ctx)?;
            let value = ctx.problem.f(&decoded, gene, ctx);
            phenotype = Some(decoded);
            match value? {
                v if v.is_finite() => Ok(v),
                v => Err(EvaluationError::NonFinite(v)),
            }
        }));
        let result = match outcome {
            Ok(result) => result,
            Err(payload) => Err(EvaluationError::Panicked(panic_message(payload))),
        };
        match result {
            Ok(value) => Evaluation::from_value(value, self.maximize),
            Err(error) => self.fail(&error, phenotype.as_ref()),
        }
    }

    fn fail(&self, error: &EvaluationError, phenotype: Option<&Phenotype>) -> Evaluation {
        self.failures.fetch_add(1, Ordering::Relaxed);
        if self.log_failures {
            log::warn!(
                "Evaluation failed in generation {}: {} (fitness {}, phenotype {:?})",
                self.generation.load(Ordering::Relaxed),
                error,
                self.worst_fitness,
                phenotype
            );
        }
        Evaluation::failure(self.worst_fitness, self.maximize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orientation() {
        let max = Evaluation::from_value(2.0, true);
        assert_eq!((max.fitness, max.value), (2.0, 2.0));
        let min = Evaluation::from_value(2.0, false);
        assert_eq!((min.fitness, min.value), (-2.0, 2.0));
    }

    #[test]
    fn test_failure_is_worst_in_both_orientations() {
        let max = Evaluation::failure(-1e31, true);
        assert_eq!(max.fitness, -1e31);
        assert_eq!(max.value, -1e31);
        let min = Evaluation::failure(-1e31, false);
        assert_eq!(min.fitness, -1e31);
        assert_eq!(min.value, 1e31);
        assert!(min.failed);
    }

    #[test]
    fn test_panic_message() {
        assert_eq!(panic_message(Box::new("boom")), "boom");
        assert_eq!(panic_message(Box::new(String::from("bang"))), "bang");
        assert_eq!(panic_message(Box::new(3_u8)), "unknown panic payload");
    }
}
