//! Problem environments: the objective the engine optimizes.
//!
//! A problem supplies the objective `f` plus whatever geometry its gene
//! representation needs (bit lengths for binary genes, bounds for real-valued
//! genes, a length for permutations). It may also supply a known optimum and
//! its own termination predicate.

use std::sync::Arc;

use crate::engine::LocalContext;
use crate::representation::{Gene, Phenotype};
use crate::schema::Solution;

/// Per-gene evaluation failure. Never fatal to a run.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvaluationError {
    #[error("Objective failed: {0}")]
    Failed(String),
    #[error("Objective returned a non-finite value: {0}")]
    NonFinite(f64),
    #[error("Gene could not be decoded: {0}")]
    Decode(String),
    #[error("Objective panicked: {0}")]
    Panicked(String),
}

/// A problem environment.
pub trait Problem: Send + Sync {
    /// Problem name, recorded in the run result.
    fn name(&self) -> String;

    /// The objective.
    fn f(&self, phenotype: &Phenotype, gene: &Gene, ctx: &LocalContext)
    -> Result<f64, EvaluationError>;

    /// Bits per parameter (binary representations).
    fn bits(&self) -> Vec<usize> {
        Vec::new()
    }

    /// Lower parameter bounds.
    fn lower(&self) -> Vec<f64> {
        Vec::new()
    }

    /// Upper parameter bounds.
    fn upper(&self) -> Vec<f64> {
        Vec::new()
    }

    /// Gene length.
    fn gene_length(&self) -> usize {
        let bits = self.bits();
        if bits.is_empty() {
            self.lower().len()
        } else {
            bits.iter().sum()
        }
    }

    /// Objective value of the global optimum, if known.
    fn global_optimum(&self) -> Option<f64> {
        None
    }

    /// Problem-specific early termination. `None` means not supplied.
    fn terminate(&self, _best: &Solution) -> Option<bool> {
        None
    }
}

fn real_parameters(phenotype: &Phenotype) -> Result<&[f64], EvaluationError> {
    phenotype
        .as_real()
        .ok_or_else(|| EvaluationError::Failed("expected a real-valued phenotype".to_string()))
}

/// Sum of squares on a box, minimum 0 at the origin.
#[derive(Debug, Clone)]
pub struct Parabola {
    lower: Vec<f64>,
    upper: Vec<f64>,
    bits: usize,
}

impl Parabola {
    /// `dims`-dimensional parabola on `[-1, 1]^dims`, 20 bits per parameter.
    pub fn new(dims: usize) -> Self {
        Self::with_bounds(dims, -1.0, 1.0)
    }

    /// Parabola on `[lower, upper]^dims`.
    pub fn with_bounds(dims: usize, lower: f64, upper: f64) -> Self {
        Self {
            lower: vec![lower; dims],
            upper: vec![upper; dims],
            bits: 20,
        }
    }
}

impl Problem for Parabola {
    fn name(&self) -> String {
        format!("Parabola{}D", self.lower.len())
    }

    fn f(&self, phenotype: &Phenotype, _gene: &Gene, _ctx: &LocalContext) -> Result<f64, EvaluationError> {
        let x = real_parameters(phenotype)?;
        Ok(x.iter().map(|v| v * v).sum())
    }

    fn bits(&self) -> Vec<usize> {
        vec![self.bits; self.lower.len()]
    }

    fn lower(&self) -> Vec<f64> {
        self.lower.clone()
    }

    fn upper(&self) -> Vec<f64> {
        self.upper.clone()
    }

    fn global_optimum(&self) -> Option<f64> {
        Some(0.0)
    }
}

/// Rastrigin function on `[-5.12, 5.12]^dims`, minimum 0 at the origin.
#[derive(Debug, Clone)]
pub struct Rastrigin {
    dims: usize,
}

impl Rastrigin {
    pub fn new(dims: usize) -> Self {
        Self { dims }
    }
}

impl Problem for Rastrigin {
    fn name(&self) -> String {
        format!("Rastrigin{}D", self.dims)
    }

    fn f(&self, phenotype: &Phenotype, _gene: &Gene, _ctx: &LocalContext) -> Result<f64, EvaluationError> {
        let x = real_parameters(phenotype)?;
        let a = 10.0;
        Ok(a * x.len() as f64
            + x.iter()
                .map(|v| v * v - a * (2.0 * std::f64::consts::PI * v).cos())
                .sum::<f64>())
    }

    fn bits(&self) -> Vec<usize> {
        vec![24; self.dims]
    }

    fn lower(&self) -> Vec<f64> {
        vec![-5.12; self.dims]
    }

    fn upper(&self) -> Vec<f64> {
        vec![5.12; self.dims]
    }

    fn global_optimum(&self) -> Option<f64> {
        Some(0.0)
    }
}

/// Number of inversions of a permutation, minimum 0 for the identity.
#[derive(Debug, Clone)]
pub struct Inversions {
    n: usize,
}

impl Inversions {
    pub fn new(n: usize) -> Self {
        Self { n }
    }
}

impl Problem for Inversions {
    fn name(&self) -> String {
        format!("Inversions{}", self.n)
    }

    fn f(&self, phenotype: &Phenotype, _gene: &Gene, _ctx: &LocalContext) -> Result<f64, EvaluationError> {
        let order = phenotype.as_permutation().ok_or_else(|| {
            EvaluationError::Failed("expected a permutation phenotype".to_string())
        })?;
        let mut count = 0usize;
        for i in 0..order.len() {
            for j in (i + 1)..order.len() {
                if order[i] > order[j] {
                    count += 1;
                }
            }
        }
        Ok(count as f64)
    }

    fn gene_length(&self) -> usize {
        self.n
    }

    fn global_optimum(&self) -> Option<f64> {
        Some(0.0)
    }
}

/// Look up a built-in problem by name.
pub fn builtin_problem(name: &str, dims: usize) -> Option<Arc<dyn Problem>> {
    match name.to_ascii_lowercase().as_str() {
        "parabola" => Some(Arc::new(Parabola::new(dims))),
        "rastrigin" => Some(Arc::new(Rastrigin::new(dims))),
        "inversions" => Some(Arc::new(Inversions::new(dims))),
        _ => None,
    }
}
