//! Error handling for Sanvar.
//! One error enum per subsystem, `thiserror` only, zero `anyhow`.

pub mod config_error;
pub mod engine_error;
pub mod error_code;
pub mod graph_error;
pub mod resolve_error;

pub use config_error::ConfigError;
pub use engine_error::EngineError;
pub use error_code::ErrorCode;
pub use graph_error::GraphError;
pub use resolve_error::ResolveError;
