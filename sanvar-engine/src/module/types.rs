//! Module declaration records.
//!
//! Sanitizer requests are tri-state: `None` (unset) is distinct from
//! `Some(false)` and participates in default resolution, while an explicit
//! `false` also opts the module out of consumer-driven propagation.

use serde::{Deserialize, Serialize};

use sanvar_core::types::{ModuleKind, SanitizerKind};

/// A buildable unit: binary, shared/static library, or test.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleDecl {
    /// Unique module name.
    pub name: String,
    pub kind: ModuleKind,
    /// Source package path, `/`-separated, relative to the tree root.
    pub path: String,
    /// Device module (as opposed to host). Device-wide policy and memory
    /// tagging only apply here.
    pub device: bool,
    pub sanitize: SanitizeDecl,
    pub shared_libs: Vec<String>,
    pub static_libs: Vec<String>,
    pub whole_static_libs: Vec<String>,
}

/// Per-module sanitizer requests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SanitizeDecl {
    pub address: Option<bool>,
    pub thread: Option<bool>,
    pub undefined: Option<bool>,
    /// Named UBSan subsets, e.g. `["integer"]`. Non-empty means requested.
    pub misc_undefined: Vec<String>,
    pub fuzzer: Option<bool>,
    pub memtag_heap: Option<bool>,
    pub diag: DiagDecl,
}

/// Diagnostic-mode sub-requests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagDecl {
    pub memtag_heap: Option<bool>,
    pub undefined: Option<bool>,
}

impl ModuleDecl {
    pub fn new(name: impl Into<String>, kind: ModuleKind) -> Self {
        Self {
            name: name.into(),
            kind,
            path: String::new(),
            device: true,
            sanitize: SanitizeDecl::default(),
            shared_libs: Vec::new(),
            static_libs: Vec::new(),
            whole_static_libs: Vec::new(),
        }
    }

    pub fn binary(name: impl Into<String>) -> Self {
        Self::new(name, ModuleKind::Binary)
    }

    pub fn shared_library(name: impl Into<String>) -> Self {
        Self::new(name, ModuleKind::SharedLibrary)
    }

    pub fn static_library(name: impl Into<String>) -> Self {
        Self::new(name, ModuleKind::StaticLibrary)
    }

    pub fn test(name: impl Into<String>) -> Self {
        Self::new(name, ModuleKind::Test)
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn host(mut self) -> Self {
        self.device = false;
        self
    }

    pub fn with_shared_libs(mut self, libs: &[&str]) -> Self {
        self.shared_libs = libs.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_static_libs(mut self, libs: &[&str]) -> Self {
        self.static_libs = libs.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_whole_static_libs(mut self, libs: &[&str]) -> Self {
        self.whole_static_libs = libs.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_sanitize(mut self, sanitize: SanitizeDecl) -> Self {
        self.sanitize = sanitize;
        self
    }

    /// The module's own tri-state declaration for a kind. Subset UBSan has
    /// no `false` spelling: a non-empty subset list reads as `Some(true)`,
    /// an empty one as unset.
    pub fn explicit(&self, kind: SanitizerKind) -> Option<bool> {
        match kind {
            SanitizerKind::Address => self.sanitize.address,
            SanitizerKind::Thread => self.sanitize.thread,
            SanitizerKind::Undefined => self.sanitize.undefined,
            SanitizerKind::MiscUndefined => {
                if self.sanitize.misc_undefined.is_empty() {
                    None
                } else {
                    Some(true)
                }
            }
            SanitizerKind::Fuzzer => self.sanitize.fuzzer,
            SanitizerKind::MemtagHeap => self.sanitize.memtag_heap,
        }
    }

    /// An explicit `false` opts the module out of consumer-driven
    /// propagation for that kind.
    pub fn explicitly_disabled(&self, kind: SanitizerKind) -> bool {
        self.explicit(kind) == Some(false)
    }
}

impl SanitizeDecl {
    pub fn address(enabled: bool) -> Self {
        Self { address: Some(enabled), ..Default::default() }
    }

    pub fn thread(enabled: bool) -> Self {
        Self { thread: Some(enabled), ..Default::default() }
    }

    pub fn undefined(enabled: bool) -> Self {
        Self { undefined: Some(enabled), ..Default::default() }
    }

    pub fn misc_undefined(subsets: &[&str]) -> Self {
        Self {
            misc_undefined: subsets.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn fuzzer(enabled: bool) -> Self {
        Self { fuzzer: Some(enabled), ..Default::default() }
    }

    pub fn memtag_heap(enabled: bool) -> Self {
        Self { memtag_heap: Some(enabled), ..Default::default() }
    }

    pub fn with_diag_memtag(mut self, enabled: bool) -> Self {
        self.diag.memtag_heap = Some(enabled);
        self
    }

    pub fn with_diag_undefined(mut self, enabled: bool) -> Self {
        self.diag.undefined = Some(enabled);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tri_state_is_preserved() {
        let unset = ModuleDecl::binary("a");
        let off = ModuleDecl::binary("b").with_sanitize(SanitizeDecl::address(false));
        let on = ModuleDecl::binary("c").with_sanitize(SanitizeDecl::address(true));

        assert_eq!(unset.explicit(SanitizerKind::Address), None);
        assert_eq!(off.explicit(SanitizerKind::Address), Some(false));
        assert_eq!(on.explicit(SanitizerKind::Address), Some(true));
        assert!(off.explicitly_disabled(SanitizerKind::Address));
        assert!(!unset.explicitly_disabled(SanitizerKind::Address));
    }

    #[test]
    fn misc_undefined_reads_as_requested_when_non_empty() {
        let m = ModuleDecl::static_library("lib")
            .with_sanitize(SanitizeDecl::misc_undefined(&["integer"]));
        assert_eq!(m.explicit(SanitizerKind::MiscUndefined), Some(true));
    }
}
