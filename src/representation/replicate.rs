//! Replication: building genes of the next generation from selected parents.

use rand::Rng;

use super::{Candidate, Gene, Genotype, ReplicateGene, ReplicationInput};
use crate::engine::{LocalContext, RunRng};

/// Crossover with probability `crossover_rate`, then mutation with
/// probability `mutation_rate`, both read for the parent's fitness.
fn breed(
    parent: &Gene,
    fitness: f64,
    input: &mut ReplicationInput<'_>,
    rng: &mut RunRng,
) -> Gene {
    let ctx = input.ctx;
    let population = input.population;
    let mut kid = parent.clone();
    if rng.r#gen::<f64>() < ctx.crossover_rate(fitness) {
        let mate = input.parents.next_mate(rng);
        kid = ctx
            .genes
            .crossover
            .crossover(&kid, &population[mate], ctx, rng)
            .into_first();
    }
    if rng.r#gen::<f64>() < ctx.mutation_rate(fitness) {
        kid = ctx.genes.mutation.mutate(&kid, ctx, rng);
    }
    kid
}

/// Offspring of the parent at `parent`. Paired with it when the acceptance
/// rule compares the two; the comparison runs after the generation is evaluated.
fn contest(parent: usize, kid: Gene, ctx: &LocalContext) -> Candidate {
    if ctx.policies.acceptance.evaluates_offspring() {
        Candidate::challenging(kid, parent)
    } else {
        Candidate::unevaluated(kid)
    }
}

/// One kid per parent, judged by the acceptance rule.
#[derive(Debug, Clone, Copy)]
pub struct KidOne;

impl ReplicateGene for KidOne {
    fn embeds_acceptance(&self) -> bool {
        true
    }

    fn replicate(&self, input: &mut ReplicationInput<'_>, rng: &mut RunRng) -> Vec<Candidate> {
        let population = input.population;
        let index = input.parents.next_parent(rng);
        let parent = &population[index];
        let evaluation = input.evaluations[index];
        let kid = breed(parent, evaluation.fitness, input, rng);
        vec![contest(index, kid, input.ctx)]
    }
}

/// Two kids per crossover. Has no acceptance step.
#[derive(Debug, Clone, Copy)]
pub struct KidTwo;

impl ReplicateGene for KidTwo {
    fn embeds_acceptance(&self) -> bool {
        false
    }

    fn replicate(&self, input: &mut ReplicationInput<'_>, rng: &mut RunRng) -> Vec<Candidate> {
        let ctx = input.ctx;
        let population = input.population;
        let first = input.parents.next_parent(rng);
        let second = input.parents.next_mate(rng);
        let a = &population[first];
        let b = &population[second];
        let fitness_a = input.evaluations[first].fitness;
        let fitness_b = input.evaluations[second].fitness;

        let (mut x, mut y) = if rng.r#gen::<f64>() < ctx.crossover_rate(fitness_a) {
            ctx.genes.crossover.crossover(a, b, ctx, rng).into_pair(b)
        } else {
            (a.clone(), b.clone())
        };
        if rng.r#gen::<f64>() < ctx.mutation_rate(fitness_a) {
            x = ctx.genes.mutation.mutate(&x, ctx, rng);
        }
        if rng.r#gen::<f64>() < ctx.mutation_rate(fitness_b) {
            y = ctx.genes.mutation.mutate(&y, ctx, rng);
        }
        vec![Candidate::unevaluated(x), Candidate::unevaluated(y)]
    }
}

/// Differential evolution: the trial vector `base + F * (a - b)` from three
/// uniformly drawn distinct donors is crossed with the target and judged
/// against it by the acceptance rule. Targets come from the first-parent
/// selector; configure `UniformP` for one trial per target.
#[derive(Debug, Clone, Copy)]
pub struct DifferentialReplication;

fn distinct_donors(n: usize, target: usize, rng: &mut RunRng) -> [usize; 3] {
    let mut picked = [target; 3];
    let mut count = 0;
    let exclude_target = n >= 4;
    let mut attempts = 0;
    while count < 3 {
        let candidate = rng.gen_range(0..n);
        attempts += 1;
        let clash = picked[..count].contains(&candidate) || (exclude_target && candidate == target);
        // Tiny populations cannot supply three distinct donors.
        if !clash || attempts > 64 {
            picked[count] = candidate;
            count += 1;
        }
    }
    picked
}

impl ReplicateGene for DifferentialReplication {
    fn embeds_acceptance(&self) -> bool {
        true
    }

    fn replicate(&self, input: &mut ReplicationInput<'_>, rng: &mut RunRng) -> Vec<Candidate> {
        let ctx = input.ctx;
        let population = input.population;
        let target_index = input.parents.next_parent(rng);
        let target = &population[target_index];
        let target_evaluation = input.evaluations[target_index];

        let [base, a, b] = distinct_donors(population.len(), target_index, rng);
        let mutant = match (
            &population[base].genotype,
            &population[a].genotype,
            &population[b].genotype,
        ) {
            (Genotype::Real(base), Genotype::Real(a), Genotype::Real(b))
                if base.len() == a.len() && a.len() == b.len() =>
            {
                let factor = ctx.config.operators.scale_factor;
                let lower = ctx.problem.lower();
                let upper = ctx.problem.upper();
                Gene::real(
                    (0..base.len())
                        .map(|i| {
                            let v = base[i] + factor * (a[i] - b[i]);
                            match (lower.get(i), upper.get(i)) {
                                (Some(&lo), Some(&hi)) => v.clamp(lo.min(hi), hi.max(lo)),
                                _ => v,
                            }
                        })
                        .collect(),
                )
            }
            _ => population[base].clone(),
        };

        let mut trial = if rng.r#gen::<f64>() < ctx.crossover_rate(target_evaluation.fitness) {
            ctx.genes
                .crossover
                .crossover(target, &mutant, ctx, rng)
                .into_first()
        } else {
            mutant
        };
        if rng.r#gen::<f64>() < ctx.mutation_rate(target_evaluation.fitness) {
            trial = ctx.genes.mutation.mutate(&trial, ctx, rng);
        }
        vec![contest(target_index, trial, ctx)]
    }
}
