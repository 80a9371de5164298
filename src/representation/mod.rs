//! Gene representations and the gene-level operator plugins.
//!
//! A [`Gene`] is opaque to the engine: only the operators registered for an
//! algorithm family know what its [`Genotype`] means. Each operator slot is a
//! trait so callers can register their own implementations alongside the
//! built-in binary, real-valued and permutation families.

mod binary;
mod permutation;
mod real;
mod replicate;
mod vector;

pub use binary::{Bin2Dec, BinaryDecode, BinaryInit, BitFlipMutation, GrayMap};
pub use permutation::{
    InversionMutation, OrderCrossover, PermutationDecode, PermutationInit, SwapMutation,
};
pub use real::{GaussianMutation, IdentityMap, IdentityMutation, RealDecode, RealInit};
pub use replicate::{DifferentialReplication, KidOne, KidTwo};
pub use vector::{OnePointCrossover, UniformCrossover};

use serde::{Deserialize, Serialize};

use crate::engine::{Evaluation, LocalContext, ParentSource, RunRng};
use crate::problem::EvaluationError;

/// Encoded gene contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Genotype {
    Binary(Vec<bool>),
    Real(Vec<f64>),
    Permutation(Vec<usize>),
    /// Integer codons (grammatical evolution).
    Codons(Vec<u32>),
    /// Anything a user-registered family needs.
    Custom(serde_json::Value),
}

/// A member of the population.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gene {
    pub genotype: Genotype,
}

impl Gene {
    pub fn new(genotype: Genotype) -> Self {
        Self { genotype }
    }

    pub fn binary(bits: Vec<bool>) -> Self {
        Self::new(Genotype::Binary(bits))
    }

    pub fn real(values: Vec<f64>) -> Self {
        Self::new(Genotype::Real(values))
    }

    pub fn permutation(order: Vec<usize>) -> Self {
        Self::new(Genotype::Permutation(order))
    }

    /// Number of positions in the genotype (0 for custom genotypes).
    pub fn len(&self) -> usize {
        match &self.genotype {
            Genotype::Binary(v) => v.len(),
            Genotype::Real(v) => v.len(),
            Genotype::Permutation(v) => v.len(),
            Genotype::Codons(v) => v.len(),
            Genotype::Custom(_) => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Decoded gene, the input of the objective.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Phenotype {
    Real(Vec<f64>),
    Permutation(Vec<usize>),
    Custom(serde_json::Value),
}

impl Phenotype {
    pub fn as_real(&self) -> Option<&[f64]> {
        match self {
            Phenotype::Real(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_permutation(&self) -> Option<&[usize]> {
        match self {
            Phenotype::Permutation(order) => Some(order),
            _ => None,
        }
    }
}

/// One encoded parameter handed to a gene map.
#[derive(Debug, Clone, Copy)]
pub enum Segment<'a> {
    Bits(&'a [bool]),
    Real(f64),
}

/// Result of a crossover.
#[derive(Debug, Clone, PartialEq)]
pub enum Offspring {
    One(Gene),
    Two(Gene, Gene),
}

impl Offspring {
    /// First kid.
    pub fn into_first(self) -> Gene {
        match self {
            Offspring::One(kid) | Offspring::Two(kid, _) => kid,
        }
    }

    /// Both kids; a single kid is returned alongside a copy of `fallback`.
    pub fn into_pair(self, fallback: &Gene) -> (Gene, Gene) {
        match self {
            Offspring::One(kid) => (kid, fallback.clone()),
            Offspring::Two(a, b) => (a, b),
        }
    }
}

/// A gene produced by replication. Carries its evaluation when it is a
/// surviving member of the current population, and the index of the parent
/// it must beat when the acceptance rule compares the two after evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub gene: Gene,
    pub evaluation: Option<Evaluation>,
    pub rival: Option<usize>,
}

impl Candidate {
    pub fn unevaluated(gene: Gene) -> Self {
        Self {
            gene,
            evaluation: None,
            rival: None,
        }
    }

    pub fn evaluated(gene: Gene, evaluation: Evaluation) -> Self {
        Self {
            gene,
            evaluation: Some(evaluation),
            rival: None,
        }
    }

    /// Offspring judged against the parent at `rival` once evaluated.
    pub fn challenging(gene: Gene, rival: usize) -> Self {
        Self {
            gene,
            evaluation: None,
            rival: Some(rival),
        }
    }
}

/// Creates a random gene.
pub trait InitGene: Send + Sync {
    fn init(&self, ctx: &LocalContext, rng: &mut RunRng) -> Gene;
}

/// Decodes a gene into the phenotype passed to the objective.
pub trait DecodeGene: Send + Sync {
    fn decode(&self, gene: &Gene, ctx: &LocalContext) -> Result<Phenotype, EvaluationError>;
}

/// Maps one encoded parameter into `[lower, upper]`.
pub trait GeneMap: Send + Sync {
    fn map(&self, segment: Segment<'_>, lower: f64, upper: f64) -> f64;
}

/// Recombines two parents.
pub trait CrossoverGene: Send + Sync {
    fn crossover(&self, a: &Gene, b: &Gene, ctx: &LocalContext, rng: &mut RunRng) -> Offspring;
}

/// Perturbs a gene.
pub trait MutateGene: Send + Sync {
    fn mutate(&self, gene: &Gene, ctx: &LocalContext, rng: &mut RunRng) -> Gene;
}

/// Everything a replication step may read.
pub struct ReplicationInput<'a> {
    /// Current population.
    pub population: &'a [Gene],
    /// Evaluations aligned with `population`.
    pub evaluations: &'a [Evaluation],
    /// Parent and mate indices for this generation.
    pub parents: &'a mut ParentSource,
    pub ctx: &'a LocalContext,
}

/// Produces one or more genes of the next generation.
pub trait ReplicateGene: Send + Sync {
    /// Whether offspring of this method are paired with a parent for the
    /// acceptance rule. Methods without one only support `AcceptanceRule::All`.
    fn embeds_acceptance(&self) -> bool;

    fn replicate(&self, input: &mut ReplicationInput<'_>, rng: &mut RunRng) -> Vec<Candidate>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gene_len() {
        assert_eq!(Gene::binary(vec![true, false, true]).len(), 3);
        assert_eq!(Gene::real(vec![]).len(), 0);
        assert!(Gene::new(Genotype::Custom(serde_json::json!({"tree": []}))).is_empty());
    }

    #[test]
    fn test_offspring_pair() {
        let a = Gene::real(vec![1.0]);
        let b = Gene::real(vec![2.0]);
        let (x, y) = Offspring::One(a.clone()).into_pair(&b);
        assert_eq!(x, a);
        assert_eq!(y, b);
        assert_eq!(Offspring::Two(b.clone(), a.clone()).into_first(), b);
    }

    #[test]
    fn test_gene_serialization() {
        let gene = Gene::permutation(vec![2, 0, 1]);
        let json = serde_json::to_string(&gene).unwrap();
        let parsed: Gene = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, gene);
    }
}
