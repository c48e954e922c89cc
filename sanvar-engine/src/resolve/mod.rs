//! Variant decision engine: per-module, per-kind sanitizer state.

pub mod engine;
pub mod memtag;

pub use engine::{Resolution, SanitizerResolver};
