//! Permutation genes.

use rand::Rng;
use rand::seq::SliceRandom;

use super::{CrossoverGene, DecodeGene, Gene, Genotype, InitGene, MutateGene, Offspring, Phenotype};
use crate::engine::{LocalContext, RunRng};
use crate::problem::EvaluationError;

/// Random permutation of `0..problem.gene_length()`.
#[derive(Debug, Clone, Copy)]
pub struct PermutationInit;

impl InitGene for PermutationInit {
    fn init(&self, ctx: &LocalContext, rng: &mut RunRng) -> Gene {
        let mut order: Vec<usize> = (0..ctx.problem.gene_length()).collect();
        order.shuffle(rng);
        Gene::permutation(order)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PermutationDecode;

impl DecodeGene for PermutationDecode {
    fn decode(&self, gene: &Gene, _ctx: &LocalContext) -> Result<Phenotype, EvaluationError> {
        match &gene.genotype {
            Genotype::Permutation(order) => Ok(Phenotype::Permutation(order.clone())),
            _ => Err(EvaluationError::Decode("expected a permutation gene".to_string())),
        }
    }
}

/// Order crossover (OX1): the kid keeps a slice of one parent and fills the
/// remaining positions in the other parent's order.
#[derive(Debug, Clone, Copy)]
pub struct OrderCrossover {
    pub two_kids: bool,
}

fn order_cross(keep: &[usize], fill: &[usize], start: usize, end: usize) -> Vec<usize> {
    let n = keep.len();
    let mut kid = vec![usize::MAX; n];
    let mut used = vec![false; n];
    for i in start..=end {
        kid[i] = keep[i];
        used[keep[i]] = true;
    }
    let mut position = (end + 1) % n;
    for offset in 0..n {
        let value = fill[(end + 1 + offset) % n];
        if !used[value] {
            kid[position] = value;
            used[value] = true;
            position = (position + 1) % n;
        }
    }
    kid
}

fn is_permutation(order: &[usize]) -> bool {
    let mut seen = vec![false; order.len()];
    order.iter().all(|&v| v < seen.len() && !std::mem::replace(&mut seen[v], true))
}

impl CrossoverGene for OrderCrossover {
    fn crossover(&self, a: &Gene, b: &Gene, _ctx: &LocalContext, rng: &mut RunRng) -> Offspring {
        let (Genotype::Permutation(x), Genotype::Permutation(y)) = (&a.genotype, &b.genotype) else {
            return Offspring::Two(a.clone(), b.clone());
        };
        if x.len() != y.len() || x.len() < 2 || !is_permutation(x) || !is_permutation(y) {
            return Offspring::Two(a.clone(), b.clone());
        }
        let i = rng.gen_range(0..x.len());
        let j = rng.gen_range(0..x.len());
        let (start, end) = (i.min(j), i.max(j));
        let first = Gene::permutation(order_cross(x, y, start, end));
        if self.two_kids {
            Offspring::Two(first, Gene::permutation(order_cross(y, x, start, end)))
        } else {
            Offspring::One(first)
        }
    }
}

/// Swaps two random positions.
#[derive(Debug, Clone, Copy)]
pub struct SwapMutation;

impl MutateGene for SwapMutation {
    fn mutate(&self, gene: &Gene, _ctx: &LocalContext, rng: &mut RunRng) -> Gene {
        let Genotype::Permutation(order) = &gene.genotype else {
            return gene.clone();
        };
        let mut order = order.clone();
        if order.len() >= 2 {
            let i = rng.gen_range(0..order.len());
            let j = rng.gen_range(0..order.len());
            order.swap(i, j);
        }
        Gene::permutation(order)
    }
}

/// Reverses a random segment.
#[derive(Debug, Clone, Copy)]
pub struct InversionMutation;

impl MutateGene for InversionMutation {
    fn mutate(&self, gene: &Gene, _ctx: &LocalContext, rng: &mut RunRng) -> Gene {
        let Genotype::Permutation(order) = &gene.genotype else {
            return gene.clone();
        };
        let mut order = order.clone();
        if order.len() >= 2 {
            let i = rng.gen_range(0..order.len());
            let j = rng.gen_range(0..order.len());
            order[i.min(j)..=i.max(j)].reverse();
        }
        Gene::permutation(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_cross_keeps_slice() {
        let x = [0, 1, 2, 3, 4, 5, 6, 7];
        let y = [7, 6, 5, 4, 3, 2, 1, 0];
        let kid = order_cross(&x, &y, 2, 4);
        assert_eq!(&kid[2..=4], &[2, 3, 4]);
        assert!(is_permutation(&kid));
        // Filled from y starting after the slice: 1, 0, 7, 6, 5.
        assert_eq!(kid, vec![6, 5, 2, 3, 4, 1, 0, 7]);
    }

    #[test]
    fn test_order_cross_full_slice_copies_parent() {
        let x = [2, 0, 1];
        let y = [0, 1, 2];
        assert_eq!(order_cross(&x, &y, 0, 2), vec![2, 0, 1]);
    }

    #[test]
    fn test_is_permutation() {
        assert!(is_permutation(&[1, 0, 2]));
        assert!(!is_permutation(&[1, 1, 2]));
        assert!(!is_permutation(&[0, 3]));
    }
}
