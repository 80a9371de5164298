//! Schema module - Configuration and result types for evolutionary runs.

mod config;
mod evolution;
mod result;

pub use config::*;
pub use evolution::*;
pub use result::*;
