//! Variant-resolution errors.

use super::error_code::{self, ErrorCode};
use crate::types::SanitizerKind;

/// Errors raised while resolving a module's sanitizer state.
///
/// These are configuration conflicts, never swallowed: a silently
/// mis-resolved sanitizer produces an uninstrumented binary that is
/// believed to be instrumented.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error(
        "Module {module} declares {}: false but path rule {policy_source:?} force-enables it",
        kind.name()
    )]
    ConflictingDeclaration {
        module: String,
        kind: SanitizerKind,
        policy_source: String,
    },
}

impl ErrorCode for ResolveError {
    fn error_code(&self) -> &'static str {
        error_code::RESOLVE_ERROR
    }
}
