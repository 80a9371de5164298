//! Early termination criteria.

use std::sync::Arc;

use crate::problem::Problem;
use crate::schema::{
    ConfigError, PopulationStatistics, Solution, StatisticsHistory, TerminationCondition,
    TerminationConfig,
};

/// Early termination criterion, consulted after every observed generation.
pub trait Terminator: Send + Sync {
    fn should_stop(&self, best: &Solution, history: &StatisticsHistory) -> bool;
}

/// Standard normal quantile, Acklam's rational approximation
/// (relative error below 1.2e-9).
pub fn normal_quantile(p: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969683028665376e+01,
        2.209460984245205e+02,
        -2.759285104469687e+02,
        1.383577518672690e+02,
        -3.066479806614716e+01,
        2.506628277459239e+00,
    ];
    const B: [f64; 5] = [
        -5.447609879822406e+01,
        1.615858368580409e+02,
        -1.556989798598866e+02,
        6.680131188771972e+01,
        -1.328068155288572e+01,
    ];
    const C: [f64; 6] = [
        -7.784894002430293e-03,
        -3.223964580411365e-01,
        -2.400758277161838e+00,
        -2.549732539343734e+00,
        4.374664141464968e+00,
        2.938163982698783e+00,
    ];
    const D: [f64; 4] = [
        7.784695709041462e-03,
        3.224671290700398e-01,
        2.445134137142996e+00,
        3.754408661907416e+00,
    ];
    const P_LOW: f64 = 0.02425;

    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }

    let tail = |q: f64| {
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    };

    if p < P_LOW {
        tail((-2.0 * p.ln()).sqrt())
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        -tail((-2.0 * (1.0 - p).ln()).sqrt())
    }
}

/// Upper confidence bound `mean + z_{1-delta} * sd` of the initial population.
pub fn pac_bound(initial: &PopulationStatistics, delta: f64) -> f64 {
    initial.mean + normal_quantile(1.0 - delta) * initial.variance.sqrt()
}

/// The configured termination condition.
#[derive(Debug, Clone, Copy)]
pub struct Criterion {
    pub condition: TerminationCondition,
    pub eps: f64,
    pub threshold: f64,
    pub pac_delta: f64,
    pub optimum: Option<f64>,
}

impl Criterion {
    pub fn new(config: &TerminationConfig, optimum: Option<f64>) -> Result<Self, ConfigError> {
        if config.condition.needs_optimum() && optimum.is_none() {
            return Err(ConfigError::MissingOptimum(config.condition));
        }
        Ok(Self {
            condition: config.condition,
            eps: config.eps,
            threshold: config.threshold,
            pac_delta: config.pac_delta,
            optimum,
        })
    }
}

impl Terminator for Criterion {
    fn should_stop(&self, best: &Solution, history: &StatisticsHistory) -> bool {
        let error = |opt: f64| (best.value - opt).abs();
        match (self.condition, self.optimum) {
            (TerminationCondition::NoTermination, _) => false,
            (TerminationCondition::AbsoluteError, Some(opt)) => error(opt) <= self.eps,
            (TerminationCondition::RelativeError, Some(opt)) => error(opt) <= self.eps * opt.abs(),
            (TerminationCondition::RelativeErrorZero, Some(opt)) => {
                if opt == 0.0 {
                    error(opt) <= self.eps
                } else {
                    error(opt) <= self.eps * opt.abs()
                }
            }
            (TerminationCondition::Pac, _) => match history.get(0) {
                Some(initial) => {
                    let bound = pac_bound(initial, self.pac_delta);
                    best.fitness >= bound - self.eps * bound.abs()
                }
                None => false,
            },
            (TerminationCondition::Geq, _) => best.value >= self.threshold,
            (TerminationCondition::Leq, _) => best.value <= self.threshold,
            (_, None) => false,
        }
    }
}

pub fn terminator_for(
    config: &TerminationConfig,
    problem: &dyn Problem,
) -> Result<Arc<dyn Terminator>, ConfigError> {
    Ok(Arc::new(Criterion::new(config, problem.global_optimum())?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::representation::Gene;

    fn solution(value: f64, fitness: f64) -> Solution {
        Solution {
            fitness,
            value,
            gene: Gene::binary(vec![]),
            phenotype: None,
            ties: 1,
            equally_best: Vec::new(),
        }
    }

    fn criterion(condition: TerminationCondition, optimum: Option<f64>) -> Criterion {
        Criterion {
            condition,
            eps: 0.01,
            threshold: 5.0,
            pac_delta: 0.01,
            optimum,
        }
    }

    #[test]
    fn test_normal_quantile() {
        assert!(normal_quantile(0.5).abs() < 1e-9);
        assert!((normal_quantile(0.975) - 1.959963985).abs() < 1e-6);
        assert!((normal_quantile(0.01) + 2.326347874).abs() < 1e-6);
        assert!((normal_quantile(0.999) - 3.090232306).abs() < 1e-6);
    }

    #[test]
    fn test_absolute_and_relative_error() {
        let history = StatisticsHistory::default();
        let absolute = criterion(TerminationCondition::AbsoluteError, Some(1.0));
        assert!(absolute.should_stop(&solution(1.005, 0.0), &history));
        assert!(!absolute.should_stop(&solution(1.05, 0.0), &history));

        let relative = criterion(TerminationCondition::RelativeError, Some(100.0));
        assert!(relative.should_stop(&solution(100.5, 0.0), &history));
        assert!(!relative.should_stop(&solution(102.0, 0.0), &history));

        let zero = criterion(TerminationCondition::RelativeErrorZero, Some(0.0));
        assert!(zero.should_stop(&solution(0.005, 0.0), &history));
    }

    #[test]
    fn test_pac_identical_fitness_stops() {
        let mut history = StatisticsHistory::default();
        history.push(PopulationStatistics {
            mean: 3.0,
            min: 3.0,
            q1: 3.0,
            median: 3.0,
            q3: 3.0,
            max: 3.0,
            variance: 0.0,
            mad: 0.0,
        });
        let pac = criterion(TerminationCondition::Pac, None);
        assert_eq!(pac_bound(&history.rows()[0], 0.01), 3.0);
        assert!(pac.should_stop(&solution(3.0, 3.0), &history));
    }

    #[test]
    fn test_threshold_conditions() {
        let history = StatisticsHistory::default();
        assert!(criterion(TerminationCondition::Geq, None).should_stop(&solution(5.0, 5.0), &history));
        assert!(!criterion(TerminationCondition::Leq, None).should_stop(&solution(5.5, -5.5), &history));
    }

    #[test]
    fn test_missing_optimum() {
        let config = TerminationConfig {
            condition: TerminationCondition::AbsoluteError,
            ..Default::default()
        };
        assert!(matches!(
            Criterion::new(&config, None),
            Err(ConfigError::MissingOptimum(TerminationCondition::AbsoluteError))
        ));
    }
}
