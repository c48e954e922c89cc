//! Sanitizer kinds, kind sets, and memory-tagging strength.

use serde::{Deserialize, Serialize};

/// A sanitizer instrumentation mode.
///
/// Each kind carries its own propagation semantics: some kinds follow
/// dependency edges into library variants, others color only the module
/// that requested them.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SanitizerKind {
    /// AddressSanitizer.
    Address,
    /// ThreadSanitizer.
    Thread,
    /// UndefinedBehaviorSanitizer, full set.
    Undefined,
    /// UndefinedBehaviorSanitizer, named subsets (e.g. "integer").
    MiscUndefined,
    /// Fuzzer instrumentation (libFuzzer harness).
    Fuzzer,
    /// Heap memory tagging (MTE). Strength is tracked separately as
    /// [`MemtagLevel`].
    MemtagHeap,
}

impl SanitizerKind {
    /// All kinds, in canonical order. Set iteration and variant-name
    /// suffixes follow this order.
    pub fn all() -> &'static [SanitizerKind] {
        &[
            Self::Address,
            Self::Thread,
            Self::Undefined,
            Self::MiscUndefined,
            Self::Fuzzer,
            Self::MemtagHeap,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Address => "address",
            Self::Thread => "thread",
            Self::Undefined => "undefined",
            Self::MiscUndefined => "misc_undefined",
            Self::Fuzzer => "fuzzer",
            Self::MemtagHeap => "memtag_heap",
        }
    }

    /// Parse a kind from its declaration name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::all().iter().copied().find(|k| k.name() == name)
    }

    /// Suffix appended to a module name when a variant for this kind is
    /// materialized.
    pub fn variant_suffix(&self) -> &'static str {
        match self {
            Self::Address => "_asan",
            Self::Thread => "_tsan",
            Self::Undefined | Self::MiscUndefined => "_ubsan",
            Self::Fuzzer => "_fuzzer",
            Self::MemtagHeap => "_memtag",
        }
    }

    /// Whether activation flows downward through `shared_libs` edges.
    ///
    /// Only fuzzer instrumentation does: a fuzzing binary needs every
    /// shared library in its link rebuilt with the fuzzer hooks. ASan and
    /// TSan interoperate with uninstrumented shared libraries, so a
    /// sanitized consumer links the dependency's own variant.
    pub fn propagates_shared(&self) -> bool {
        matches!(self, Self::Fuzzer)
    }

    /// Whether activation flows downward through `static_libs` edges.
    ///
    /// Static inputs become part of the consumer's address space and data
    /// layout, so address/thread/fuzzer instrumentation must cover them.
    pub fn propagates_static(&self) -> bool {
        matches!(self, Self::Address | Self::Thread | Self::Fuzzer)
    }

    /// Module-local kinds never force variants onto ordinary dependency
    /// edges; they reach dependencies only through whole-static inclusion.
    pub fn module_local(&self) -> bool {
        matches!(self, Self::Undefined | Self::MiscUndefined | Self::MemtagHeap)
    }

    /// Whether the global device-wide sanitizer list may enable this kind
    /// on modules that leave it unset. Subset UBSan and fuzzer
    /// instrumentation are only ever explicit; memory tagging has its own
    /// defaulting rules.
    pub fn device_default_eligible(&self) -> bool {
        matches!(self, Self::Address | Self::Thread | Self::Undefined)
    }

    fn bit(&self) -> u8 {
        match self {
            Self::Address => 1 << 0,
            Self::Thread => 1 << 1,
            Self::Undefined => 1 << 2,
            Self::MiscUndefined => 1 << 3,
            Self::Fuzzer => 1 << 4,
            Self::MemtagHeap => 1 << 5,
        }
    }
}

/// A set of sanitizer kinds, stored as a bit-set.
///
/// Iteration is in canonical kind order regardless of insertion order, so
/// derived variant names are deterministic.
#[derive(
    Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct SanitizerSet(u8);

impl SanitizerSet {
    pub const EMPTY: SanitizerSet = SanitizerSet(0);

    pub fn insert(&mut self, kind: SanitizerKind) {
        self.0 |= kind.bit();
    }

    pub fn remove(&mut self, kind: SanitizerKind) {
        self.0 &= !kind.bit();
    }

    pub fn contains(&self, kind: SanitizerKind) -> bool {
        self.0 & kind.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn union(&self, other: SanitizerSet) -> SanitizerSet {
        SanitizerSet(self.0 | other.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = SanitizerKind> + '_ {
        SanitizerKind::all().iter().copied().filter(|k| self.contains(*k))
    }

    /// Variant-name suffix for this set, e.g. `"_asan_fuzzer"`. Duplicate
    /// suffixes (full and subset UBSan) collapse to one.
    pub fn suffix(&self) -> String {
        let mut out = String::new();
        for kind in self.iter() {
            let s = kind.variant_suffix();
            if !out.ends_with(s) {
                out.push_str(s);
            }
        }
        out
    }
}

impl FromIterator<SanitizerKind> for SanitizerSet {
    fn from_iter<I: IntoIterator<Item = SanitizerKind>>(iter: I) -> Self {
        let mut set = SanitizerSet::EMPTY;
        for kind in iter {
            set.insert(kind);
        }
        set
    }
}

impl std::fmt::Debug for SanitizerSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.iter().map(|k| k.name())).finish()
    }
}

/// Memory-tagging strength for a resolved module.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum MemtagLevel {
    /// Tagging disabled; no ELF note is emitted.
    #[default]
    None,
    /// Synchronous tag checking (precise diagnostics).
    Sync,
    /// Asynchronous tag checking (lower overhead).
    Async,
}

impl MemtagLevel {
    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Sync => "sync",
            Self::Async => "async",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_iteration_is_canonical_order() {
        let mut set = SanitizerSet::EMPTY;
        set.insert(SanitizerKind::Fuzzer);
        set.insert(SanitizerKind::Address);

        let kinds: Vec<_> = set.iter().collect();
        assert_eq!(kinds, vec![SanitizerKind::Address, SanitizerKind::Fuzzer]);
        assert_eq!(set.suffix(), "_asan_fuzzer");
    }

    #[test]
    fn set_ops() {
        let mut set = SanitizerSet::EMPTY;
        assert!(set.is_empty());
        set.insert(SanitizerKind::Thread);
        assert!(set.contains(SanitizerKind::Thread));
        assert_eq!(set.len(), 1);
        set.remove(SanitizerKind::Thread);
        assert!(set.is_empty());
    }

    #[test]
    fn ubsan_suffixes_collapse() {
        let set: SanitizerSet =
            [SanitizerKind::Undefined, SanitizerKind::MiscUndefined].into_iter().collect();
        assert_eq!(set.suffix(), "_ubsan");
    }

    #[test]
    fn kind_round_trips_through_name() {
        for kind in SanitizerKind::all() {
            assert_eq!(SanitizerKind::from_name(kind.name()), Some(*kind));
        }
        assert_eq!(SanitizerKind::from_name("hwaddress"), None);
    }
}
