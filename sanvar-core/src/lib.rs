//! Core types, errors, and policy configuration for the Sanvar
//! sanitizer-variant engine.
//!
//! The engine itself lives in `sanvar-engine`; this crate holds everything
//! both sides of the API need to agree on: sanitizer kinds and sets, the
//! module/link taxonomy, the error enums, and the immutable policy
//! configuration loaded once per build.

pub mod errors;
pub mod policy;
pub mod types;

pub use errors::{ConfigError, EngineError, ErrorCode, GraphError, ResolveError};
pub use policy::{PathDecision, PathPrefixSet, PolicyConfig};
pub use types::{LinkKind, MemtagLevel, ModuleKind, SanitizerKind, SanitizerSet};
