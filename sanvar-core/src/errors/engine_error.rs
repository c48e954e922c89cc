//! Top-level error aggregation.

use super::error_code::ErrorCode;
use super::{ConfigError, GraphError, ResolveError};

/// Any error the engine can surface.
/// Aggregates subsystem errors via `From` conversions.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Resolution error: {0}")]
    Resolve(#[from] ResolveError),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),
}

impl ErrorCode for EngineError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Config(e) => e.error_code(),
            Self::Resolve(e) => e.error_code(),
            Self::Graph(e) => e.error_code(),
        }
    }
}
