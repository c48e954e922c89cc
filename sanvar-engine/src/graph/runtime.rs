//! Sanitizer runtime libraries and where they attach.

use sanvar_core::types::{LinkKind, SanitizerKind};

/// Minimal UBSan runtime, attached as a static input at final links when
/// undefined-behavior checks are active without diagnostics.
pub const UBSAN_MINIMAL_RUNTIME: &str = "libclang_rt.ubsan_minimal";

/// Full UBSan runtime, used instead of the minimal one when diagnostics
/// are requested anywhere in the static closure.
pub const UBSAN_STANDALONE_RUNTIME: &str = "libclang_rt.ubsan_standalone";

/// A runtime library a sanitizer kind pulls into final links.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeDep {
    pub library: &'static str,
    pub link: LinkKind,
    /// Restricted to executables (binaries and tests); shared libraries
    /// defer to the final link.
    pub executables_only: bool,
}

/// The runtime a kind unconditionally requires at final links, if any.
///
/// UBSan runtimes are not in this table: which one attaches depends on
/// diagnostics and on the whole static closure, not on one kind bit.
pub fn runtime_for(kind: SanitizerKind) -> Option<RuntimeDep> {
    match kind {
        SanitizerKind::Address => Some(RuntimeDep {
            library: "libclang_rt.asan",
            link: LinkKind::Shared,
            executables_only: false,
        }),
        SanitizerKind::Thread => Some(RuntimeDep {
            library: "libclang_rt.tsan",
            link: LinkKind::Shared,
            executables_only: false,
        }),
        SanitizerKind::Fuzzer => Some(RuntimeDep {
            library: "libclang_rt.fuzzer",
            link: LinkKind::Static,
            executables_only: true,
        }),
        SanitizerKind::Undefined
        | SanitizerKind::MiscUndefined
        | SanitizerKind::MemtagHeap => None,
    }
}
