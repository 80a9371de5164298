//! Evorun - Representation-agnostic evolutionary algorithm orchestration.
//!
//! This crate drives a population of genes through generations of
//! evaluation, adaptive fitness scaling, parent selection, replication
//! (crossover and mutation), acceptance and termination checks. The gene
//! representation is pluggable: binary, real-valued and permutation genes
//! ship built in, other families register their own operators.
//!
//! # Architecture
//!
//! The crate is split into four modules:
//!
//! - `schema`: Run configuration, statistics and result types
//! - `engine`: The generational loop, its policies and execution strategies
//! - `representation`: Gene types and representation-dependent operators
//! - `problem`: The problem environment trait and sample objectives
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use evorun::{engine, problem::Parabola, schema::RunConfig};
//!
//! let mut config = RunConfig::default();
//! config.basic.popsize = 20;
//! config.basic.generations = 10;
//! config.basic.max = false;
//!
//! let result = engine::run(Arc::new(Parabola::new(2)), config).unwrap();
//!
//! println!("Best value: {:.6}", result.solution.value);
//! println!("Replay seed: {}", result.seed);
//! ```

pub mod engine;
pub mod problem;
pub mod representation;
pub mod schema;

// Re-export commonly used types
pub use engine::{EngineError, EvolutionEngine, Registry, rerun, run};
pub use problem::{EvaluationError, Problem};
pub use representation::{Gene, Genotype, Phenotype};
pub use schema::{RunConfig, RunResult, StopReason};
