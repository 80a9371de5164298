//! Position-wise crossover shared by the vector-shaped genotypes.

use rand::Rng;

use super::{CrossoverGene, Gene, Genotype, Offspring};
use crate::engine::{LocalContext, RunRng};

#[derive(Debug, Clone, Copy)]
enum Positional {
    OnePoint,
    Uniform(f64),
}

fn cross_slices<T: Clone>(op: Positional, x: &[T], y: &[T], rng: &mut RunRng) -> (Vec<T>, Vec<T>) {
    if x.len() != y.len() || x.len() < 2 {
        return (x.to_vec(), y.to_vec());
    }
    match op {
        Positional::OnePoint => {
            let point = rng.gen_range(1..x.len());
            let mut a = x[..point].to_vec();
            a.extend_from_slice(&y[point..]);
            let mut b = y[..point].to_vec();
            b.extend_from_slice(&x[point..]);
            (a, b)
        }
        Positional::Uniform(swap) => {
            let mut a = x.to_vec();
            let mut b = y.to_vec();
            for i in 0..x.len() {
                if rng.r#gen::<f64>() < swap {
                    std::mem::swap(&mut a[i], &mut b[i]);
                }
            }
            (a, b)
        }
    }
}

fn cross(op: Positional, a: &Gene, b: &Gene, rng: &mut RunRng) -> (Gene, Gene) {
    let (x, y) = match (&a.genotype, &b.genotype) {
        (Genotype::Binary(x), Genotype::Binary(y)) => {
            let (x, y) = cross_slices(op, x, y, rng);
            (Genotype::Binary(x), Genotype::Binary(y))
        }
        (Genotype::Real(x), Genotype::Real(y)) => {
            let (x, y) = cross_slices(op, x, y, rng);
            (Genotype::Real(x), Genotype::Real(y))
        }
        (Genotype::Codons(x), Genotype::Codons(y)) => {
            let (x, y) = cross_slices(op, x, y, rng);
            (Genotype::Codons(x), Genotype::Codons(y))
        }
        _ => (a.genotype.clone(), b.genotype.clone()),
    };
    (Gene::new(x), Gene::new(y))
}

/// One-point crossover. Produces one kid, or both when `two_kids` is set.
#[derive(Debug, Clone, Copy)]
pub struct OnePointCrossover {
    pub two_kids: bool,
}

impl CrossoverGene for OnePointCrossover {
    fn crossover(&self, a: &Gene, b: &Gene, _ctx: &LocalContext, rng: &mut RunRng) -> Offspring {
        let (x, y) = cross(Positional::OnePoint, a, b, rng);
        if self.two_kids {
            Offspring::Two(x, y)
        } else {
            Offspring::One(x)
        }
    }
}

/// Uniform crossover swapping each position with probability
/// `operators.uniform_swap`.
#[derive(Debug, Clone, Copy)]
pub struct UniformCrossover;

impl CrossoverGene for UniformCrossover {
    fn crossover(&self, a: &Gene, b: &Gene, ctx: &LocalContext, rng: &mut RunRng) -> Offspring {
        let swap = ctx.config.operators.uniform_swap;
        let (x, y) = cross(Positional::Uniform(swap), a, b, rng);
        Offspring::Two(x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_point_preserves_positions() {
        let mut rng = RunRng::new(3);
        let a = Gene::binary(vec![true; 8]);
        let b = Gene::binary(vec![false; 8]);
        let (x, y) = cross(Positional::OnePoint, &a, &b, &mut rng);
        let (Genotype::Binary(x), Genotype::Binary(y)) = (x.genotype, y.genotype) else {
            panic!("expected binary kids");
        };
        assert!(x[0] && !y[0]);
        assert!(!x[7] && y[7]);
        for i in 0..8 {
            assert_ne!(x[i], y[i]);
        }
    }

    #[test]
    fn test_uniform_full_swap() {
        let mut rng = RunRng::new(1);
        let a = Gene::real(vec![1.0, 2.0, 3.0]);
        let b = Gene::real(vec![4.0, 5.0, 6.0]);
        let (x, y) = cross(Positional::Uniform(1.0), &a, &b, &mut rng);
        assert_eq!(x, b);
        assert_eq!(y, a);
    }

    #[test]
    fn test_mismatched_genotypes_unchanged() {
        let mut rng = RunRng::new(1);
        let a = Gene::real(vec![1.0, 2.0]);
        let b = Gene::binary(vec![true, false]);
        let (x, y) = cross(Positional::OnePoint, &a, &b, &mut rng);
        assert_eq!(x, a);
        assert_eq!(y, b);
    }
}
