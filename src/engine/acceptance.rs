//! Acceptance rules and cooling schedules.

use std::f64::consts::PI;
use std::sync::Arc;

use rand::Rng;

use super::{LocalContext, RunRng};
use crate::schema::{AcceptanceConfig, AcceptanceRule, CoolingSchedule};

/// Which of parent and offspring survives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    Parent,
    Offspring,
}

/// Acceptance rule deciding between an evaluated offspring and its parent.
pub trait Acceptor: Send + Sync {
    /// Whether the offspring must be evaluated before `choose`.
    fn evaluates_offspring(&self) -> bool {
        true
    }

    fn choose(&self, parent: f64, offspring: f64, ctx: &LocalContext, rng: &mut RunRng) -> Choice;
}

/// Offspring always replaces the parent.
#[derive(Debug, Clone, Copy)]
pub struct AcceptAll;

impl Acceptor for AcceptAll {
    fn evaluates_offspring(&self) -> bool {
        false
    }

    fn choose(&self, _parent: f64, _offspring: f64, _ctx: &LocalContext, _rng: &mut RunRng) -> Choice {
        Choice::Offspring
    }
}

/// Fitter survives, ties go to the offspring.
#[derive(Debug, Clone, Copy)]
pub struct AcceptBest;

impl Acceptor for AcceptBest {
    fn choose(&self, parent: f64, offspring: f64, _ctx: &LocalContext, _rng: &mut RunRng) -> Choice {
        if offspring >= parent {
            Choice::Offspring
        } else {
            Choice::Parent
        }
    }
}

/// Probability of accepting a worse offspring, `exp(-beta * delta / T)`.
/// Zero for non-positive temperatures.
pub fn metropolis_probability(delta: f64, beta: f64, temperature: f64) -> f64 {
    if temperature <= 0.0 {
        return 0.0;
    }
    (-beta * delta / temperature).exp()
}

fn metropolis_choice(parent: f64, offspring: f64, beta: f64, temperature: f64, rng: &mut RunRng) -> Choice {
    if offspring >= parent {
        return Choice::Offspring;
    }
    let probability = metropolis_probability(parent - offspring, beta, temperature);
    if rng.r#gen::<f64>() < probability {
        Choice::Offspring
    } else {
        Choice::Parent
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Metropolis {
    pub beta: f64,
}

impl Acceptor for Metropolis {
    fn choose(&self, parent: f64, offspring: f64, ctx: &LocalContext, rng: &mut RunRng) -> Choice {
        metropolis_choice(parent, offspring, self.beta, ctx.adaptive.temperature, rng)
    }
}

/// Metropolis with the temperature raised by the offspring's gap to the
/// population best.
#[derive(Debug, Clone, Copy)]
pub struct IndividualMetropolis {
    pub beta: f64,
}

impl Acceptor for IndividualMetropolis {
    fn choose(&self, parent: f64, offspring: f64, ctx: &LocalContext, rng: &mut RunRng) -> Choice {
        let gap = (ctx.adaptive.best_fitness - offspring).max(0.0);
        let temperature = ctx.adaptive.temperature + gap;
        metropolis_choice(parent, offspring, self.beta, temperature, rng)
    }
}

pub fn acceptor_for(config: &AcceptanceConfig) -> Arc<dyn Acceptor> {
    match config.rule {
        AcceptanceRule::All => Arc::new(AcceptAll),
        AcceptanceRule::Best => Arc::new(AcceptBest),
        AcceptanceRule::Metropolis => Arc::new(Metropolis { beta: config.beta }),
        AcceptanceRule::IVMetropolis => Arc::new(IndividualMetropolis { beta: config.beta }),
    }
}

/// Temperature schedule.
pub trait Cooling: Send + Sync {
    /// Temperature at generation `generation`.
    fn temperature(&self, generation: usize) -> f64;
}

/// The standard cooling schedules.
#[derive(Debug, Clone, Copy)]
pub struct StandardCooling {
    pub schedule: CoolingSchedule,
    pub temp0: f64,
    pub temp_n: f64,
    pub alpha: f64,
    pub power: f64,
    /// Total generations `N` of additive schedules.
    pub generations: usize,
}

impl StandardCooling {
    pub fn new(config: &AcceptanceConfig, generations: usize) -> Self {
        Self {
            schedule: config.cooling,
            temp0: config.temp0,
            temp_n: config.temp_n,
            alpha: config.alpha,
            power: config.cooling_power,
            generations,
        }
    }

    /// Remaining fraction `(N - i) / N` for additive schedules.
    fn remaining(&self, generation: usize) -> f64 {
        let n = self.generations as f64;
        (n - generation.min(self.generations) as f64) / n
    }
}

impl Cooling for StandardCooling {
    fn temperature(&self, generation: usize) -> f64 {
        let i = generation as f64;
        let span = self.temp0 - self.temp_n;
        match self.schedule {
            CoolingSchedule::ExponentialMultiplicative => self.temp0 * self.alpha.powf(i),
            CoolingSchedule::LogarithmicMultiplicative => {
                self.temp0 / (1.0 + self.alpha * (1.0 + i).ln())
            }
            CoolingSchedule::PowerMultiplicative => {
                if generation == 0 {
                    self.temp0
                } else {
                    self.temp0 / (1.0 + self.alpha * i.powf(self.power))
                }
            }
            _ if self.generations == 0 => self.temp_n,
            CoolingSchedule::PowerAdditive => {
                let r = self.remaining(generation);
                if r <= 0.0 {
                    self.temp_n
                } else {
                    self.temp_n + span * r.powf(self.power)
                }
            }
            CoolingSchedule::ExponentialAdditive => {
                let r = self.remaining(generation);
                let c = self.power;
                let shape = if c.abs() < 1e-12 {
                    r
                } else {
                    (c * r).exp_m1() / c.exp_m1()
                };
                self.temp_n + span * shape
            }
            CoolingSchedule::TrigonometricAdditive => {
                let fraction = 1.0 - self.remaining(generation);
                self.temp_n + span * (1.0 + (fraction * PI).cos()) / 2.0
            }
        }
    }
}

pub fn cooling_for(config: &AcceptanceConfig, generations: usize) -> Arc<dyn Cooling> {
    Arc::new(StandardCooling::new(config, generations))
}
