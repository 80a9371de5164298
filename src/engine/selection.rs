//! Parent and mate selection.
//!
//! Selectors return indices into the population for a (scaled) fitness
//! vector. With selection continuation the indices for a whole generation are
//! drawn once and handed out in order by [`ParentSource`]. Failed genes enter
//! selection with fitness `f64::NEG_INFINITY` and get no share of the wheel.

use std::sync::Arc;

use rand::Rng;
use rand::seq::SliceRandom;

use super::{Evaluation, RunRng};
use crate::schema::SelectionMethod;

/// Selection method.
pub trait Selector: Send + Sync {
    /// Draw `n` indices into `fitness`. `fitness` is non-empty.
    fn select(&self, fitness: &[f64], n: usize, rng: &mut RunRng) -> Vec<usize>;
}

/// Fitness seen by scaling and selection. Failed genes map to
/// `f64::NEG_INFINITY` so they never set the shift of the live genes.
pub fn selection_fitness(evaluations: &[Evaluation]) -> Vec<f64> {
    evaluations
        .iter()
        .map(|e| if e.failed { f64::NEG_INFINITY } else { e.fitness })
        .collect()
}

/// Minimum over finite values.
pub(crate) fn live_min(fitness: &[f64]) -> Option<f64> {
    fitness
        .iter()
        .copied()
        .filter(|f| f.is_finite())
        .reduce(f64::min)
}

/// Non-negative selection weights: finite fitness shifted so the live
/// minimum is 0, non-finite fitness weight 0. Uniform weights when no gene
/// has a positive weight.
fn shifted_weights(fitness: &[f64]) -> Vec<f64> {
    let Some(min) = live_min(fitness) else {
        return vec![1.0; fitness.len()];
    };
    let weights: Vec<f64> = fitness
        .iter()
        .map(|&f| if f.is_finite() { (f - min).max(0.0) } else { 0.0 })
        .collect();
    let total: f64 = weights.iter().sum();
    if total > 0.0 && total.is_finite() {
        weights
    } else {
        vec![1.0; fitness.len()]
    }
}

fn cumulative(weights: &[f64]) -> Vec<f64> {
    weights
        .iter()
        .scan(0.0, |acc, w| {
            *acc += w;
            Some(*acc)
        })
        .collect()
}

/// First index whose cumulative weight exceeds `point`.
fn locate(cumulative: &[f64], point: f64) -> usize {
    cumulative
        .partition_point(|&c| c <= point)
        .min(cumulative.len() - 1)
}

fn roulette(weights: &[f64], n: usize, rng: &mut RunRng) -> Vec<usize> {
    let cumulative = cumulative(weights);
    let total = cumulative[cumulative.len() - 1];
    (0..n)
        .map(|_| locate(&cumulative, rng.r#gen::<f64>() * total))
        .collect()
}

/// Uniform random index.
#[derive(Debug, Clone, Copy)]
pub struct UniformSelection;

impl Selector for UniformSelection {
    fn select(&self, fitness: &[f64], n: usize, rng: &mut RunRng) -> Vec<usize> {
        (0..n).map(|_| rng.gen_range(0..fitness.len())).collect()
    }
}

/// Concatenated random permutations: every index once per `len` draws.
#[derive(Debug, Clone, Copy)]
pub struct UniformPermutation;

impl Selector for UniformPermutation {
    fn select(&self, fitness: &[f64], n: usize, rng: &mut RunRng) -> Vec<usize> {
        let mut indices = Vec::with_capacity(n);
        while indices.len() < n {
            let mut block: Vec<usize> = (0..fitness.len()).collect();
            block.shuffle(rng);
            indices.extend(block);
        }
        indices.truncate(n);
        indices
    }
}

/// Roulette wheel.
#[derive(Debug, Clone, Copy)]
pub struct ProportionalSelection;

impl Selector for ProportionalSelection {
    fn select(&self, fitness: &[f64], n: usize, rng: &mut RunRng) -> Vec<usize> {
        roulette(&shifted_weights(fitness), n, rng)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TournamentSelection {
    pub size: usize,
}

impl Selector for TournamentSelection {
    fn select(&self, fitness: &[f64], n: usize, rng: &mut RunRng) -> Vec<usize> {
        (0..n)
            .map(|_| {
                let mut winner = rng.gen_range(0..fitness.len());
                for _ in 1..self.size.max(1) {
                    let challenger = rng.gen_range(0..fitness.len());
                    if fitness[challenger] > fitness[winner] {
                        winner = challenger;
                    }
                }
                winner
            })
            .collect()
    }
}

/// Stochastic universal sampling: `n` equally spaced pointers on the wheel.
#[derive(Debug, Clone, Copy)]
pub struct StochasticUniversalSampling;

impl Selector for StochasticUniversalSampling {
    fn select(&self, fitness: &[f64], n: usize, rng: &mut RunRng) -> Vec<usize> {
        if n == 0 {
            return Vec::new();
        }
        let cumulative = cumulative(&shifted_weights(fitness));
        let total = cumulative[cumulative.len() - 1];
        let step = total / n as f64;
        let start = rng.r#gen::<f64>() * step;
        let mut indices: Vec<usize> = (0..n)
            .map(|k| locate(&cumulative, start + k as f64 * step))
            .collect();
        indices.shuffle(rng);
        indices
    }
}

/// Linear ranking with selection pressure `s` in [1, 2]: the worst gene gets
/// weight `2 - s`, the best `s`.
#[derive(Debug, Clone, Copy)]
pub struct LinearRankSelection {
    pub pressure: f64,
}

impl Selector for LinearRankSelection {
    fn select(&self, fitness: &[f64], n: usize, rng: &mut RunRng) -> Vec<usize> {
        let len = fitness.len();
        if len == 1 {
            return vec![0; n];
        }
        let mut order: Vec<usize> = (0..len).collect();
        order.sort_by(|&a, &b| fitness[a].total_cmp(&fitness[b]));
        let s = self.pressure;
        let mut weights = vec![0.0; len];
        for (rank, &index) in order.iter().enumerate() {
            weights[index] = 2.0 - s + 2.0 * (s - 1.0) * rank as f64 / (len - 1) as f64;
        }
        if weights.iter().sum::<f64>() <= 0.0 {
            weights = vec![1.0; len];
        }
        roulette(&weights, n, rng)
    }
}

pub fn selector_for(method: &SelectionMethod) -> Arc<dyn Selector> {
    match method {
        SelectionMethod::Uniform => Arc::new(UniformSelection),
        SelectionMethod::UniformP => Arc::new(UniformPermutation),
        SelectionMethod::Proportional => Arc::new(ProportionalSelection),
        SelectionMethod::Tournament { size } => Arc::new(TournamentSelection { size: *size }),
        SelectionMethod::Duel => Arc::new(TournamentSelection { size: 2 }),
        SelectionMethod::Sus => Arc::new(StochasticUniversalSampling),
        SelectionMethod::LinearRank { pressure } => Arc::new(LinearRankSelection {
            pressure: *pressure,
        }),
    }
}

/// Pre-drawn index plan consumed front to back, wrapping around.
struct Plan {
    indices: Vec<usize>,
    cursor: usize,
}

impl Plan {
    fn next(&mut self) -> usize {
        let index = self.indices[self.cursor % self.indices.len()];
        self.cursor += 1;
        index
    }
}

/// Hands out parent and mate indices for one generation.
pub struct ParentSource {
    scaled: Vec<f64>,
    parent: Arc<dyn Selector>,
    mate: Arc<dyn Selector>,
    plans: Option<(Plan, Plan)>,
}

impl ParentSource {
    /// Build a source over `scaled` fitness. With `continuation`, `plan_len`
    /// parent and mate indices are drawn up front.
    pub fn new(
        scaled: Vec<f64>,
        parent: Arc<dyn Selector>,
        mate: Arc<dyn Selector>,
        continuation: bool,
        plan_len: usize,
        rng: &mut RunRng,
    ) -> Self {
        let plans = if continuation && plan_len > 0 && !scaled.is_empty() {
            let parents = parent.select(&scaled, plan_len, rng);
            let mates = mate.select(&scaled, plan_len, rng);
            Some((
                Plan {
                    indices: parents,
                    cursor: 0,
                },
                Plan {
                    indices: mates,
                    cursor: 0,
                },
            ))
        } else {
            None
        };
        Self {
            scaled,
            parent,
            mate,
            plans,
        }
    }

    pub fn next_parent(&mut self, rng: &mut RunRng) -> usize {
        match &mut self.plans {
            Some((parents, _)) => parents.next(),
            None => self.parent.select(&self.scaled, 1, rng)[0],
        }
    }

    pub fn next_mate(&mut self, rng: &mut RunRng) -> usize {
        match &mut self.plans {
            Some((_, mates)) => mates.next(),
            None => self.mate.select(&self.scaled, 1, rng)[0],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_permutation_covers_all() {
        let mut rng = RunRng::new(5);
        let mut indices = UniformPermutation.select(&[0.0; 7], 7, &mut rng);
        indices.sort();
        assert_eq!(indices, (0..7).collect::<Vec<_>>());
    }

    #[test]
    fn test_tournament_prefers_fitter() {
        let mut rng = RunRng::new(11);
        let fitness = [0.0, 0.0, 0.0, 10.0];
        let picks = TournamentSelection { size: 8 }.select(&fitness, 50, &mut rng);
        let best = picks.iter().filter(|&&i| i == 3).count();
        assert!(best > 40);
    }

    #[test]
    fn test_proportional_skips_worst() {
        let mut rng = RunRng::new(3);
        // After shifting, gene 0 has weight 0.
        let picks = ProportionalSelection.select(&[-5.0, 1.0, 2.0], 100, &mut rng);
        assert!(picks.iter().all(|&i| i != 0));
    }

    #[test]
    fn test_sus_proportional_counts() {
        let mut rng = RunRng::new(8);
        let picks = StochasticUniversalSampling.select(&[0.0, 1.0, 3.0], 4, &mut rng);
        assert_eq!(picks.iter().filter(|&&i| i == 2).count(), 3);
        assert_eq!(picks.iter().filter(|&&i| i == 1).count(), 1);
    }

    #[test]
    fn test_equal_fitness_uniform_weights() {
        assert_eq!(shifted_weights(&[2.0, 2.0]), vec![1.0, 1.0]);
        assert_eq!(shifted_weights(&[f64::NEG_INFINITY; 3]), vec![1.0; 3]);
    }

    fn with_failure() -> Vec<f64> {
        let evaluations: Vec<Evaluation> = [-1e31, 0.0, -0.5, -1.0, -1.5, -2.0]
            .iter()
            .enumerate()
            .map(|(i, &f)| {
                if i == 0 {
                    Evaluation::failure(f, true)
                } else {
                    Evaluation::from_value(f, true)
                }
            })
            .collect();
        selection_fitness(&evaluations)
    }

    #[test]
    fn test_failed_gene_keeps_selection_pressure() {
        let fitness = with_failure();
        assert_eq!(fitness[0], f64::NEG_INFINITY);
        assert_eq!(shifted_weights(&fitness), vec![0.0, 2.0, 1.5, 1.0, 0.5, 0.0]);

        let mut rng = RunRng::new(4);
        let picks = ProportionalSelection.select(&fitness, 6000, &mut rng);
        let counts: Vec<usize> = (0..6)
            .map(|i| picks.iter().filter(|&&p| p == i).count())
            .collect();
        assert_eq!(counts[0], 0);
        assert_eq!(counts[5], 0);
        assert!(counts[1] > counts[3] && counts[3] > counts[4], "{counts:?}");

        let picks = StochasticUniversalSampling.select(&fitness, 10, &mut rng);
        assert_eq!(picks.iter().filter(|&&p| p == 1).count(), 4);
        assert!(picks.iter().all(|&p| p != 0 && p != 5));
    }

    #[test]
    fn test_parent_source_plan_wraps() {
        let mut rng = RunRng::new(1);
        let mut source = ParentSource::new(
            vec![1.0, 2.0, 3.0],
            Arc::new(UniformPermutation),
            Arc::new(UniformSelection),
            true,
            3,
            &mut rng,
        );
        let mut first: Vec<usize> = (0..3).map(|_| source.next_parent(&mut rng)).collect();
        let again: Vec<usize> = (0..3).map(|_| source.next_parent(&mut rng)).collect();
        assert_eq!(first, again);
        first.sort();
        assert_eq!(first, vec![0, 1, 2]);
    }

    #[test]
    fn test_linear_rank_pressure_two_never_picks_worst() {
        let mut rng = RunRng::new(21);
        let picks = LinearRankSelection { pressure: 2.0 }.select(&[5.0, 1.0, 3.0], 60, &mut rng);
        assert!(picks.iter().all(|&i| i != 1));
    }
}
