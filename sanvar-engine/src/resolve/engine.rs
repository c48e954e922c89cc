//! Per-module sanitizer resolution with policy precedence.
//!
//! Precedence, highest first: explicit module declaration, path-prefix
//! rules, the device-wide sanitizer list, kind defaults. Results are
//! memoized per (module, kind); the memo table uses insert-if-absent
//! semantics so concurrent lookups agree on one resolution.

use std::sync::RwLock;

use sanvar_core::errors::ResolveError;
use sanvar_core::policy::{PathDecision, PolicyConfig};
use sanvar_core::types::collections::FxHashMap;
use sanvar_core::types::{MemtagLevel, SanitizerKind, SanitizerSet};

use crate::module::ModuleDecl;

use super::memtag;

/// Effective state of one sanitizer kind on one module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub enabled: bool,
    /// Diagnostic mode (full runtime / precise reporting) requested.
    pub diag: bool,
}

impl Resolution {
    const OFF: Resolution = Resolution { enabled: false, diag: false };

    fn on(diag: bool) -> Self {
        Self { enabled: true, diag }
    }
}

/// The variant decision engine.
///
/// Pure with respect to its inputs: a resolution depends only on the
/// module's own declarations and the immutable policy, so the memo table
/// is a cache, never a source of truth.
pub struct SanitizerResolver<'a> {
    policy: &'a PolicyConfig,
    cache: RwLock<FxHashMap<(String, SanitizerKind), Resolution>>,
    memtag_cache: RwLock<FxHashMap<String, MemtagLevel>>,
}

impl<'a> SanitizerResolver<'a> {
    pub fn new(policy: &'a PolicyConfig) -> Self {
        Self {
            policy,
            cache: RwLock::new(FxHashMap::default()),
            memtag_cache: RwLock::new(FxHashMap::default()),
        }
    }

    pub fn policy(&self) -> &PolicyConfig {
        self.policy
    }

    /// Resolve the effective state of `kind` on `module`.
    pub fn resolve(
        &self,
        module: &ModuleDecl,
        kind: SanitizerKind,
    ) -> Result<Resolution, ResolveError> {
        let key = (module.name.clone(), kind);
        if let Ok(cache) = self.cache.read() {
            if let Some(resolution) = cache.get(&key) {
                return Ok(*resolution);
            }
        }

        let computed = self.compute(module, kind)?;
        let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
        // First writer wins; a racing insert computed the same value.
        Ok(*cache.entry(key).or_insert(computed))
    }

    /// Memory-tagging strength for a module. `None` for host modules and
    /// libraries.
    pub fn memtag_level(&self, module: &ModuleDecl) -> MemtagLevel {
        if let Ok(cache) = self.memtag_cache.read() {
            if let Some(level) = cache.get(&module.name) {
                return *level;
            }
        }

        let computed = memtag::resolve_memtag(module, self.policy);
        let mut cache = self.memtag_cache.write().unwrap_or_else(|e| e.into_inner());
        *cache.entry(module.name.clone()).or_insert(computed)
    }

    /// The kinds that form this module's own variant key: variant-forming
    /// kinds resolved enabled.
    pub fn base_set(&self, module: &ModuleDecl) -> Result<SanitizerSet, ResolveError> {
        let mut set = SanitizerSet::EMPTY;
        for kind in SanitizerKind::all() {
            if kind.module_local() {
                continue;
            }
            if self.resolve(module, *kind)?.enabled {
                set.insert(*kind);
            }
        }
        Ok(set)
    }

    /// The module-local kinds resolved enabled (full/subset UBSan). These
    /// color the module's own compilation and whole-static inclusions but
    /// never ordinary dependency edges. Memory tagging is tracked as a
    /// strength, not a set member.
    pub fn local_set(&self, module: &ModuleDecl) -> Result<SanitizerSet, ResolveError> {
        let mut set = SanitizerSet::EMPTY;
        for kind in [SanitizerKind::Undefined, SanitizerKind::MiscUndefined] {
            if self.resolve(module, kind)?.enabled {
                set.insert(kind);
            }
        }
        Ok(set)
    }

    fn compute(
        &self,
        module: &ModuleDecl,
        kind: SanitizerKind,
    ) -> Result<Resolution, ResolveError> {
        if kind == SanitizerKind::MemtagHeap {
            let level = self.memtag_level(module);
            return Ok(Resolution {
                enabled: level != MemtagLevel::None,
                diag: level == MemtagLevel::Sync,
            });
        }

        let rule = self.policy.path_rule(kind, &module.path);

        match module.explicit(kind) {
            Some(false) => {
                if let Some((prefix, PathDecision::ForceEnabledRecursive)) = rule {
                    return Err(ResolveError::ConflictingDeclaration {
                        module: module.name.clone(),
                        kind,
                        policy_source: prefix.to_string(),
                    });
                }
                return Ok(Resolution::OFF);
            }
            Some(true) => {
                return Ok(Resolution::on(self.diag_requested(module, kind)));
            }
            None => {}
        }

        match rule.map(|(_, d)| d) {
            Some(PathDecision::ForceEnabledRecursive) | Some(PathDecision::DefaultEnabled) => {
                return Ok(Resolution::on(self.diag_requested(module, kind)));
            }
            Some(PathDecision::ForceDisabled) | Some(PathDecision::DefaultDisabled) => {
                return Ok(Resolution::OFF);
            }
            Some(PathDecision::Unspecified) | None => {}
        }

        if module.device
            && kind.device_default_eligible()
            && self.policy.device_requested(kind)
        {
            tracing::debug!(module = %module.name, kind = kind.name(), "device-wide default");
            return Ok(Resolution::on(self.policy.device_diag(kind)));
        }

        Ok(Resolution::OFF)
    }

    fn diag_requested(&self, module: &ModuleDecl, kind: SanitizerKind) -> bool {
        match kind {
            SanitizerKind::Undefined => module
                .sanitize
                .diag
                .undefined
                .unwrap_or_else(|| self.policy.device_diag(kind)),
            _ => self.policy.device_diag(kind),
        }
    }
}
