//! Real-valued genes for differential evolution.

use rand::Rng;
use rand_distr::StandardNormal;

use super::binary::Bin2Dec;
use super::{DecodeGene, Gene, GeneMap, Genotype, InitGene, MutateGene, Phenotype, Segment};
use crate::engine::{LocalContext, RunRng};
use crate::problem::EvaluationError;

/// Uniform sample from the problem's box.
#[derive(Debug, Clone, Copy)]
pub struct RealInit;

impl InitGene for RealInit {
    fn init(&self, ctx: &LocalContext, rng: &mut RunRng) -> Gene {
        let lower = ctx.problem.lower();
        let upper = ctx.problem.upper();
        Gene::real(
            lower
                .iter()
                .zip(&upper)
                .map(|(&lo, &hi)| {
                    if hi > lo {
                        rng.gen_range(lo..=hi)
                    } else {
                        lo
                    }
                })
                .collect(),
        )
    }
}

/// Passes every parameter through the configured gene map.
#[derive(Debug, Clone, Copy)]
pub struct RealDecode;

impl DecodeGene for RealDecode {
    fn decode(&self, gene: &Gene, ctx: &LocalContext) -> Result<Phenotype, EvaluationError> {
        let Genotype::Real(values) = &gene.genotype else {
            return Err(EvaluationError::Decode("expected a real-valued gene".to_string()));
        };
        let lower = ctx.problem.lower();
        let upper = ctx.problem.upper();
        if lower.len() != values.len() || upper.len() != values.len() {
            return Err(EvaluationError::Decode(format!(
                "gene of {} values does not match {} bounds",
                values.len(),
                lower.len()
            )));
        }
        Ok(Phenotype::Real(
            values
                .iter()
                .enumerate()
                .map(|(i, &v)| ctx.genes.gene_map.map(Segment::Real(v), lower[i], upper[i]))
                .collect(),
        ))
    }
}

/// Clamps real parameters into bounds.
#[derive(Debug, Clone, Copy)]
pub struct IdentityMap;

impl GeneMap for IdentityMap {
    fn map(&self, segment: Segment<'_>, lower: f64, upper: f64) -> f64 {
        Bin2Dec.map(segment, lower, upper)
    }
}

/// Adds `N(0, sigma * (upper - lower))` noise to each parameter, clamped to bounds.
#[derive(Debug, Clone, Copy)]
pub struct GaussianMutation;

impl MutateGene for GaussianMutation {
    fn mutate(&self, gene: &Gene, ctx: &LocalContext, rng: &mut RunRng) -> Gene {
        let Genotype::Real(values) = &gene.genotype else {
            return gene.clone();
        };
        let lower = ctx.problem.lower();
        let upper = ctx.problem.upper();
        let sigma = ctx.config.operators.mutation_sigma;
        Gene::real(
            values
                .iter()
                .enumerate()
                .map(|(i, &v)| match (lower.get(i), upper.get(i)) {
                    (Some(&lo), Some(&hi)) => {
                        let noise: f64 = rng.sample(StandardNormal);
                        (v + noise * sigma * (hi - lo)).clamp(lo.min(hi), hi.max(lo))
                    }
                    _ => v,
                })
                .collect(),
        )
    }
}

/// Leaves the gene unchanged.
#[derive(Debug, Clone, Copy)]
pub struct IdentityMutation;

impl MutateGene for IdentityMutation {
    fn mutate(&self, gene: &Gene, _ctx: &LocalContext, _rng: &mut RunRng) -> Gene {
        gene.clone()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::engine::Registry;
    use crate::problem::Parabola;
    use crate::schema::RunConfig;

    fn context() -> LocalContext {
        let config = RunConfig {
            algorithm: "sgde".to_string(),
            ..Default::default()
        };
        LocalContext::build(Arc::new(Parabola::with_bounds(3, -2.0, 2.0)), config, &Registry::builtin())
            .unwrap()
    }

    #[test]
    fn test_init_within_bounds() {
        let ctx = context();
        let mut rng = RunRng::new(9);
        for _ in 0..20 {
            let gene = RealInit.init(&ctx, &mut rng);
            let Genotype::Real(values) = gene.genotype else {
                panic!("expected real gene");
            };
            assert_eq!(values.len(), 3);
            assert!(values.iter().all(|v| (-2.0..=2.0).contains(v)));
        }
    }

    #[test]
    fn test_decode_clamps() {
        let ctx = context();
        let phenotype = RealDecode.decode(&Gene::real(vec![5.0, -5.0, 0.5]), &ctx).unwrap();
        assert_eq!(phenotype, Phenotype::Real(vec![2.0, -2.0, 0.5]));
    }

    #[test]
    fn test_decode_rejects_wrong_length() {
        let ctx = context();
        assert!(RealDecode.decode(&Gene::real(vec![0.0]), &ctx).is_err());
        assert!(RealDecode.decode(&Gene::binary(vec![true]), &ctx).is_err());
    }

    #[test]
    fn test_gaussian_stays_in_bounds() {
        let mut ctx = context();
        ctx.config.operators.mutation_sigma = 10.0;
        let mut rng = RunRng::new(4);
        let gene = Gene::real(vec![1.9, -1.9, 0.0]);
        for _ in 0..20 {
            let Genotype::Real(values) = GaussianMutation.mutate(&gene, &ctx, &mut rng).genotype else {
                panic!("expected real gene");
            };
            assert!(values.iter().all(|v| (-2.0..=2.0).contains(v)));
        }
    }
}
