//! Flag emission for materialized variants.
//!
//! Flags are scoped strictly to the variant's own sources; nothing here
//! reaches into dependencies. The propagation engine already decided what
//! is active where, so emission is a pure function of one [`Variant`].

use serde::Serialize;

use sanvar_core::types::{MemtagLevel, SanitizerKind};

use crate::graph::{Variant, UBSAN_MINIMAL_RUNTIME};

/// Compiler and linker flags for one variant, plus the memory-tagging
/// note strength.
#[derive(Debug, Clone, Default, Serialize)]
pub struct VariantFlags {
    pub cflags: Vec<String>,
    pub ldflags: Vec<String>,
    /// Memory-tagging ELF note strength. `None` emits nothing.
    pub memtag_note: MemtagLevel,
}

impl VariantFlags {
    pub fn has_cflag(&self, flag: &str) -> bool {
        self.cflags.iter().any(|f| f == flag)
    }

    pub fn has_ldflag(&self, flag: &str) -> bool {
        self.ldflags.iter().any(|f| f == flag)
    }
}

/// Derive the flags for one variant.
pub fn emit(variant: &Variant) -> VariantFlags {
    let mut flags = VariantFlags::default();
    let active = variant.active();

    if active.contains(SanitizerKind::Address) {
        flags.cflags.push("-fsanitize=address".to_string());
    }
    if active.contains(SanitizerKind::Thread) {
        flags.cflags.push("-fsanitize=thread".to_string());
    }
    if active.contains(SanitizerKind::Undefined) {
        flags.cflags.push("-fsanitize=undefined".to_string());
    }
    if active.contains(SanitizerKind::MiscUndefined) && !variant.misc_subsets.is_empty() {
        flags
            .cflags
            .push(format!("-fsanitize={}", variant.misc_subsets.join(",")));
    }
    if active.contains(SanitizerKind::Fuzzer) {
        flags.cflags.push("-fsanitize=fuzzer-no-link".to_string());
    }

    if variant.minimal_runtime {
        flags.cflags.push("-fsanitize-minimal-runtime".to_string());
        flags
            .ldflags
            .push(format!("-Wl,--exclude-libs={UBSAN_MINIMAL_RUNTIME}.a"));
    }

    match variant.memtag {
        MemtagLevel::Sync => {
            flags.ldflags.push("-fsanitize-memtag-mode=sync".to_string());
        }
        MemtagLevel::Async => {
            flags.ldflags.push("-fsanitize-memtag-mode=async".to_string());
        }
        MemtagLevel::None => {}
    }

    flags.memtag_note = variant.memtag;
    flags
}
