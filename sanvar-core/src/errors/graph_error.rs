//! Module-graph construction and propagation errors.

use super::error_code::{self, ErrorCode};

/// Errors raised while building the module graph or rewriting it into
/// sanitized variants.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("Duplicate module: {0}")]
    DuplicateModule(String),

    #[error("Module {module} depends on {dependency}, which is not in the graph")]
    MissingDependency { module: String, dependency: String },

    #[error("Module {module} requires sanitizer runtime {runtime}, which is not in the graph")]
    MissingRuntime { module: String, runtime: String },
}

impl ErrorCode for GraphError {
    fn error_code(&self) -> &'static str {
        error_code::GRAPH_ERROR
    }
}
