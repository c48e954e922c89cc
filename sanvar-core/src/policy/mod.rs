//! Immutable policy configuration: device-wide sanitizer lists and
//! path-prefix default rules.
//!
//! Loaded once at build-configuration start and passed by reference into
//! the decision and propagation engines; never mutated afterwards.

pub mod config;
pub mod paths;

pub use config::PolicyConfig;
pub use paths::{PathDecision, PathPrefixSet, PrefixMatcher};
