//! Local configuration context: the resolved configuration, bound strategies,
//! problem environment and per-generation adaptive state of one run.

use std::ops::Deref;
use std::sync::{Arc, RwLock, RwLockReadGuard};

use serde::{Deserialize, Serialize};

use super::acceptance::{Acceptor, Cooling, acceptor_for, cooling_for};
use super::adaptive::{Scaling, individual_rate, scaling_for};
use super::execution::{ExecutionStrategy, Sequential, strategy_for};
use super::registry::{GeneOperators, Registry};
use super::selection::{Selector, selector_for};
use super::termination::{Terminator, terminator_for};
use crate::problem::Problem;
use crate::schema::{ConfigError, ContextSharing, DispersionMeasure, RunConfig};

/// Family-independent policies.
#[derive(Clone)]
pub struct Policies {
    pub scaling: Arc<dyn Scaling>,
    pub selection: Arc<dyn Selector>,
    pub mate_selection: Arc<dyn Selector>,
    pub acceptance: Arc<dyn Acceptor>,
    pub cooling: Arc<dyn Cooling>,
    pub termination: Arc<dyn Terminator>,
    pub dispersion: DispersionMeasure,
    pub execution: Arc<dyn ExecutionStrategy>,
}

impl Policies {
    pub fn from_config(config: &RunConfig, problem: &dyn Problem) -> Result<Self, ConfigError> {
        Ok(Self {
            scaling: scaling_for(&config.scaling),
            selection: selector_for(&config.operators.selection),
            mate_selection: selector_for(&config.operators.mate_selection),
            acceptance: acceptor_for(&config.acceptance),
            cooling: cooling_for(&config.acceptance, config.basic.generations),
            termination: terminator_for(&config.termination, problem)?,
            dispersion: config.scaling.dispersion,
            // Placeholder until a user strategy is installed.
            execution: strategy_for(&config.execution).unwrap_or_else(|| Arc::new(Sequential)),
        })
    }
}

/// Values refreshed once per generation by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AdaptiveState {
    pub generation: usize,
    pub temperature: f64,
    pub best_fitness: f64,
    pub mean_fitness: f64,
    pub variance_fitness: f64,
    pub dispersion_ratio: f64,
}

#[derive(Clone)]
pub struct LocalContext {
    pub config: RunConfig,
    pub problem: Arc<dyn Problem>,
    pub genes: GeneOperators,
    pub policies: Policies,
    pub adaptive: AdaptiveState,
}

impl LocalContext {
    /// Validate `config` and resolve every strategy it names.
    pub fn build(
        problem: Arc<dyn Problem>,
        mut config: RunConfig,
        registry: &Registry,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let genes = registry.resolve(&config)?;
        genes.record_into(&mut config.operators);
        let policies = Policies::from_config(&config, problem.as_ref())?;
        let adaptive = AdaptiveState {
            temperature: policies.cooling.temperature(0),
            dispersion_ratio: 1.0,
            ..Default::default()
        };
        Ok(Self {
            config,
            problem,
            genes,
            policies,
            adaptive,
        })
    }

    pub fn maximize(&self) -> bool {
        self.config.basic.max
    }

    /// Crossover rate for a gene of the given fitness.
    pub fn crossover_rate(&self, fitness: f64) -> f64 {
        individual_rate(
            self.config.basic.crossrate,
            self.config.operators.crossover_rate,
            fitness,
            self.adaptive.best_fitness,
        )
    }

    /// Mutation rate for a gene of the given fitness.
    pub fn mutation_rate(&self, fitness: f64) -> f64 {
        individual_rate(
            self.config.basic.mutrate,
            self.config.operators.mutation_rate,
            fitness,
            self.adaptive.best_fitness,
        )
    }
}

/// Shared access to a [`LocalContext`] under one of the two sharing disciplines.
#[derive(Clone)]
pub enum ContextHandle {
    /// Immutable snapshot. Updates replace the snapshot; earlier clones of the
    /// handle keep the old one.
    Value(Arc<LocalContext>),
    /// One context behind a lock. Updates are visible to every clone.
    Shared(Arc<RwLock<LocalContext>>),
}

/// Read access returned by [`ContextHandle::read`].
pub enum ContextRef<'a> {
    Value(&'a LocalContext),
    Shared(RwLockReadGuard<'a, LocalContext>),
}

impl Deref for ContextRef<'_> {
    type Target = LocalContext;

    fn deref(&self) -> &LocalContext {
        match self {
            ContextRef::Value(ctx) => ctx,
            ContextRef::Shared(guard) => guard,
        }
    }
}

impl ContextHandle {
    pub fn new(ctx: LocalContext, sharing: ContextSharing) -> Self {
        match sharing {
            ContextSharing::ByValue => ContextHandle::Value(Arc::new(ctx)),
            ContextSharing::ByReference => ContextHandle::Shared(Arc::new(RwLock::new(ctx))),
        }
    }

    pub fn sharing(&self) -> ContextSharing {
        match self {
            ContextHandle::Value(_) => ContextSharing::ByValue,
            ContextHandle::Shared(_) => ContextSharing::ByReference,
        }
    }

    pub fn read(&self) -> ContextRef<'_> {
        match self {
            ContextHandle::Value(ctx) => ContextRef::Value(ctx),
            ContextHandle::Shared(lock) => {
                ContextRef::Shared(lock.read().unwrap_or_else(|e| e.into_inner()))
            }
        }
    }

    /// Apply `f` to the context.
    pub fn modify(&mut self, f: impl FnOnce(&mut LocalContext)) {
        match self {
            ContextHandle::Value(ctx) => f(Arc::make_mut(ctx)),
            ContextHandle::Shared(lock) => {
                let mut guard = lock.write().unwrap_or_else(|e| e.into_inner());
                f(&mut guard)
            }
        }
    }

    /// Apply `f` to the adaptive state.
    pub fn update(&mut self, f: impl FnOnce(&mut AdaptiveState)) {
        self.modify(|ctx| f(&mut ctx.adaptive));
    }

    pub fn adaptive(&self) -> AdaptiveState {
        self.read().adaptive
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::Parabola;

    fn context() -> LocalContext {
        LocalContext::build(
            Arc::new(Parabola::new(2)),
            RunConfig::default(),
            &Registry::builtin(),
        )
        .unwrap()
    }

    #[test]
    fn test_build_records_resolved_methods() {
        let ctx = context();
        assert_eq!(ctx.config.operators.gene_map.as_deref(), Some("Bin2Dec"));
        assert_eq!(ctx.config.operators.replication.as_deref(), Some("Kid1"));
        assert_eq!(ctx.adaptive.temperature, ctx.config.acceptance.temp0);
    }

    #[test]
    fn test_value_context_snapshot_isolated() {
        let mut handle = ContextHandle::new(context(), ContextSharing::ByValue);
        let snapshot = handle.clone();
        handle.update(|a| a.temperature = 1.5);
        assert_eq!(handle.adaptive().temperature, 1.5);
        assert_ne!(snapshot.adaptive().temperature, 1.5);
    }

    #[test]
    fn test_shared_context_updates_visible() {
        let mut handle = ContextHandle::new(context(), ContextSharing::ByReference);
        let other = handle.clone();
        handle.update(|a| a.generation = 7);
        assert_eq!(other.adaptive().generation, 7);
        assert_eq!(other.sharing(), ContextSharing::ByReference);
    }

    #[test]
    fn test_individual_rates_read_adaptive_best() {
        let mut ctx = context();
        ctx.config.operators.mutation_rate = crate::schema::RateMode::Individual {
            rate2: 0.25,
            cutoff_fit: 0.5,
        };
        ctx.adaptive.best_fitness = 10.0;
        assert_eq!(ctx.mutation_rate(9.0), ctx.config.basic.mutrate);
        assert_eq!(ctx.mutation_rate(1.0), 0.25);
    }
}
