//! Graph propagation engine — petgraph module graph, two-phase variant
//! materialization, runtime-library injection, install dependencies.

pub mod propagate;
pub mod runtime;
pub mod types;
pub mod variants;

pub use propagate::PropagationEngine;
pub use runtime::{UBSAN_MINIMAL_RUNTIME, UBSAN_STANDALONE_RUNTIME};
pub use types::ModuleGraph;
pub use variants::{ResolvedGraph, Variant, VariantId, VariantKey, VariantStore};
