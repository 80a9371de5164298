//! Evolution engine: orchestration of a population through generations.
//!
//! # Overview
//!
//! A run is driven by [`EvolutionEngine`] and consists of:
//!
//! - **Registry** (`registry`): representation-dependent operators per algorithm family
//! - **Context** (`context`): resolved configuration, bound policies and adaptive state
//! - **Policies**: scaling (`adaptive`), selection (`selection`), acceptance and
//!   cooling (`acceptance`), termination (`termination`)
//! - **Execution** (`execution`): sequential, multi-core and worker-pool evaluation
//! - **Recording** (`statistics`, `recorder`, `persistence`): per-generation
//!   statistics, timings, solutions and batch output
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use evorun::engine::EvolutionEngine;
//! use evorun::problem::Parabola;
//! use evorun::schema::RunConfig;
//!
//! let mut config = RunConfig::default();
//! config.basic.max = false;
//!
//! let mut engine = EvolutionEngine::new(Arc::new(Parabola::new(2)), config).unwrap();
//! let result = engine
//!     .run_with_callback(|progress| {
//!         println!("Generation {}: best = {:.6}", progress.generation, progress.best_value);
//!     })
//!     .unwrap();
//!
//! println!("Best value {:.6} (seed {})", result.solution.value, result.seed);
//! ```

mod acceptance;
mod adaptive;
mod context;
mod error;
mod evaluation;
mod execution;
mod lifecycle;
mod persistence;
mod recorder;
mod registry;
mod rng;
mod selection;
mod statistics;
mod termination;

pub use acceptance::{
    AcceptAll, AcceptBest, Acceptor, Choice, Cooling, IndividualMetropolis, Metropolis,
    StandardCooling, acceptor_for, cooling_for, metropolis_probability,
};
pub use adaptive::{
    ConstantScaling, ContinuousScaling, NoScaling, Scaling, ThresholdScaling, dispersion,
    dispersion_ratio, individual_rate, power_scale, scaling_for,
};
pub use context::{AdaptiveState, ContextHandle, ContextRef, LocalContext, Policies};
pub use error::EngineError;
pub use evaluation::{Evaluation, GeneEvaluator};
pub use execution::{EvaluateFn, ExecutionStrategy, MultiCore, Sequential, WorkerPool, strategy_for};
pub use lifecycle::{EvolutionEngine, run};
pub use persistence::{BatchWriter, PersistenceError, load_result};
pub use recorder::{best_index, best_solution, rerun};
pub use registry::{GeneOperators, OperatorNames, Registry, Slot, Strategy};
pub use rng::RunRng;
pub use selection::{
    LinearRankSelection, ParentSource, ProportionalSelection, Selector,
    StochasticUniversalSampling, TournamentSelection, UniformPermutation, UniformSelection,
    selection_fitness, selector_for,
};
pub use statistics::{MAD_SCALE, observe, quantile};
pub use termination::{Criterion, Terminator, normal_quantile, pac_bound, terminator_for};
