//! Memory-tagging strength resolution.
//!
//! Three-valued outcome per device executable: None, Sync, or Async.
//! Precedence, in order: explicit `memtag_heap: false` kills tagging;
//! enablement comes from an explicit `true`, the test-module default, or
//! (for unset, non-excluded paths) the sync/async include lists and the
//! device-wide list; strength comes from the explicit diagnostic
//! sub-request, else from the test default, the device-wide diagnostic
//! list, or the sync include list.
//!
//! Known oddity, kept on purpose: an unset `memtag_heap` with
//! `diag.memtag_heap: true` does not by itself enable tagging, so a module
//! with no default source (or on an excluded path) resolves to None even
//! though its diagnostic sub-request says Sync. Pinned in the test suite
//! as documented behavior.

use sanvar_core::policy::PolicyConfig;
use sanvar_core::types::{MemtagLevel, SanitizerKind};

use crate::module::ModuleDecl;

pub(crate) fn resolve_memtag(module: &ModuleDecl, policy: &PolicyConfig) -> MemtagLevel {
    // Memory tagging only applies to device executables.
    if !module.device || !module.kind.is_executable() {
        return MemtagLevel::None;
    }
    if module.sanitize.memtag_heap == Some(false) {
        return MemtagLevel::None;
    }

    let is_test = module.kind == sanvar_core::types::ModuleKind::Test;
    let excluded = policy.memtag_excluded(&module.path);
    let sync_path = policy.memtag_sync_path(&module.path);
    let async_path = policy.memtag_async_path(&module.path);

    // Defaulting is what the exclude list suppresses; explicit requests and
    // the test default go through regardless.
    let defaulted = !excluded
        && (sync_path || async_path || policy.device_requested(SanitizerKind::MemtagHeap));
    let enabled = module.sanitize.memtag_heap == Some(true) || is_test || defaulted;
    if !enabled {
        return MemtagLevel::None;
    }

    match module.sanitize.diag.memtag_heap {
        Some(true) => MemtagLevel::Sync,
        Some(false) => MemtagLevel::Async,
        None => {
            // The sync include list is also defaulting, so exclusion beats
            // it; the device-wide diagnostic list is not path-gated.
            if is_test
                || policy.device_diag(SanitizerKind::MemtagHeap)
                || (sync_path && !excluded)
            {
                MemtagLevel::Sync
            } else {
                MemtagLevel::Async
            }
        }
    }
}
