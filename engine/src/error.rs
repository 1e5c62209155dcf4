use thiserror::Error;

use crate::Stage;

pub type Result<T> = std::result::Result<T, EngineError>;

/// Failures surfaced by an invocation.
///
/// `Connectivity` and `InvalidConfig` abort the invocation before any stage
/// runs. `Statement` is confined to the stage that raised it and ends up in
/// the pass report instead of being returned.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),

    #[error("cannot reach record store {target}: {error:#}")]
    Connectivity {
        target: String,
        error: anyhow::Error,
    },

    #[error("{stage} stage failed: {error:#}")]
    Statement { stage: Stage, error: anyhow::Error },
}
