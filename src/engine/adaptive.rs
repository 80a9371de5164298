//! Adaptive fitness scaling driven by population dispersion, and
//! individually variable operator rates.

use std::sync::Arc;

use super::selection::live_min;
use crate::schema::{
    DispersionMeasure, PopulationStatistics, RateMode, ScalingConfig, ScalingMethod,
    StatisticsHistory,
};

/// Fitness scaling policy. Scaled fitness is used only for selection.
pub trait Scaling: Send + Sync {
    /// Exponent applied for the given dispersion ratio.
    fn exponent(&self, dispersion_ratio: f64) -> f64;

    fn scale(&self, fitness: &[f64], dispersion_ratio: f64) -> Vec<f64> {
        power_scale(fitness, self.exponent(dispersion_ratio))
    }
}

/// Raise fitness to `exponent`. Vectors with a negative live minimum are
/// first shifted so that minimum is 0. Non-finite fitness (failed genes)
/// stays `f64::NEG_INFINITY`. An exponent of 1 is the identity.
pub fn power_scale(fitness: &[f64], exponent: f64) -> Vec<f64> {
    if exponent == 1.0 {
        return fitness.to_vec();
    }
    let shift = match live_min(fitness) {
        Some(min) if min < 0.0 => -min,
        _ => 0.0,
    };
    fitness
        .iter()
        .map(|&f| {
            if f.is_finite() {
                (f + shift).max(0.0).powf(exponent)
            } else {
                f64::NEG_INFINITY
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy)]
pub struct NoScaling;

impl Scaling for NoScaling {
    fn exponent(&self, _dispersion_ratio: f64) -> f64 {
        1.0
    }

    fn scale(&self, fitness: &[f64], _dispersion_ratio: f64) -> Vec<f64> {
        fitness.to_vec()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ConstantScaling {
    pub exponent: f64,
}

impl Scaling for ConstantScaling {
    fn exponent(&self, _dispersion_ratio: f64) -> f64 {
        self.exponent
    }
}

/// `scaling_exp` while dispersion grows past `1 + threshold`, `scaling_exp2`
/// while it shrinks below `1 - threshold`, identity in between.
#[derive(Debug, Clone, Copy)]
pub struct ThresholdScaling {
    pub growing: f64,
    pub shrinking: f64,
    pub threshold: f64,
}

impl Scaling for ThresholdScaling {
    fn exponent(&self, dispersion_ratio: f64) -> f64 {
        if dispersion_ratio > 1.0 + self.threshold {
            self.growing
        } else if dispersion_ratio < 1.0 - self.threshold {
            self.shrinking
        } else {
            1.0
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ContinuousScaling {
    pub weight: f64,
}

impl Scaling for ContinuousScaling {
    fn exponent(&self, dispersion_ratio: f64) -> f64 {
        dispersion_ratio * self.weight
    }
}

pub fn scaling_for(config: &ScalingConfig) -> Arc<dyn Scaling> {
    match config.method {
        ScalingMethod::NoScaling => Arc::new(NoScaling),
        ScalingMethod::ConstantScaling => Arc::new(ConstantScaling {
            exponent: config.scaling_exp,
        }),
        ScalingMethod::ThresholdScaling => Arc::new(ThresholdScaling {
            growing: config.scaling_exp,
            shrinking: config.scaling_exp2,
            threshold: config.threshold,
        }),
        ScalingMethod::ContinuousScaling => Arc::new(ContinuousScaling {
            weight: config.rdm_weight,
        }),
    }
}

/// Dispersion of one statistics row.
pub fn dispersion(measure: DispersionMeasure, row: &PopulationStatistics) -> f64 {
    match measure {
        DispersionMeasure::Variance => row.variance,
        DispersionMeasure::StdDev => row.variance.sqrt(),
        DispersionMeasure::Mad => row.mad,
        DispersionMeasure::CoefficientOfVariation => {
            if row.mean == 0.0 {
                0.0
            } else {
                row.variance.sqrt() / row.mean.abs()
            }
        }
        DispersionMeasure::Range => row.max - row.min,
        DispersionMeasure::Iqr => row.q3 - row.q1,
    }
}

/// Ratio of the latest dispersion to the one `delay` generations earlier,
/// clamped to `[dr_min, dr_max]`.
pub fn dispersion_ratio(history: &StatisticsHistory, config: &ScalingConfig) -> f64 {
    let rows = history.rows();
    if rows.len() < config.delay + 1 {
        return 1.0;
    }
    let current = dispersion(config.dispersion, &rows[rows.len() - 1]);
    let previous = dispersion(config.dispersion, &rows[rows.len() - 1 - config.delay]);
    let ratio = if previous == 0.0 {
        if current == 0.0 { 1.0 } else { config.dr_max }
    } else {
        current / previous
    };
    ratio.clamp(config.dr_min, config.dr_max)
}

/// Operator rate for a gene of the given fitness.
pub fn individual_rate(base: f64, mode: RateMode, fitness: f64, best_fitness: f64) -> f64 {
    match mode {
        RateMode::Constant => base,
        RateMode::Individual { rate2, cutoff_fit } => {
            if fitness > cutoff_fit * best_fitness {
                base
            } else {
                rate2
            }
        }
    }
}
