use super::persistence::PersistenceError;
use crate::schema::ConfigError;

/// Errors surfaced by a run.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    /// The initial evaluation came back short, so there is no intact
    /// population to report.
    #[error("Initial evaluation returned {found} results for {expected} genes")]
    PopulationIntegrity { expected: usize, found: usize },
}
