//! Sanitizer variant resolution engine.
//!
//! Turns module declarations plus a device-wide policy into a rewritten
//! dependency graph of immutable, sanitizer-specialized variants, with
//! runtime-library injection and per-variant flag emission:
//!
//! 1. [`resolve`] decides, per module and sanitizer kind, the effective
//!    enabled/diagnostic state (policy tables + precedence rules).
//! 2. [`graph`] propagates those decisions over the dependency graph in
//!    two phases: a fixed-point pass computing the required
//!    (module, kind-set) keys, then materialization of exactly one
//!    variant per key with rewritten edges.
//! 3. [`flags`] derives compiler flags, linker flags, and the
//!    memory-tagging ELF note from each resolved variant.

pub mod flags;
pub mod graph;
pub mod module;
pub mod resolve;

pub use flags::VariantFlags;
pub use graph::{ModuleGraph, PropagationEngine, ResolvedGraph, Variant, VariantId, VariantKey};
pub use module::{DiagDecl, ModuleDecl, SanitizeDecl};
pub use resolve::{Resolution, SanitizerResolver};

use sanvar_core::errors::EngineError;
use sanvar_core::policy::PolicyConfig;

/// Resolve a full module graph against a policy: build the graph, run the
/// decision engine and propagation, and return the materialized variants.
pub fn resolve_graph(
    modules: Vec<ModuleDecl>,
    policy: &PolicyConfig,
) -> Result<ResolvedGraph, EngineError> {
    let graph = ModuleGraph::build(modules)?;
    let resolver = SanitizerResolver::new(policy);
    PropagationEngine::new(&graph, &resolver).run()
}
