//! The immutable policy configuration value.

use serde::Deserialize;

use crate::errors::ConfigError;
use crate::types::collections::FxHashMap;
use crate::types::{SanitizerKind, SanitizerSet};

use super::paths::{PathDecision, PathPrefixSet, PrefixMatcher};

/// Device-wide sanitizer policy, resolved once per build configuration.
///
/// Covers the global enable/diagnostic lists, per-kind path-prefix rules,
/// and the memory-tagging include/exclude path sets. Read-only after load.
#[derive(Debug, Clone, Default)]
pub struct PolicyConfig {
    device_sanitizers: SanitizerSet,
    device_diag: SanitizerSet,
    path_rules: FxHashMap<SanitizerKind, PathPrefixSet>,
    memtag_exclude: PrefixMatcher,
    memtag_sync: PrefixMatcher,
    memtag_async: PrefixMatcher,
}

/// Raw TOML shape. Kept separate from [`PolicyConfig`] so every entry goes
/// through validation on the way in.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawPolicy {
    device_sanitizers: Vec<String>,
    device_diag: Vec<String>,
    path_rule: Vec<RawPathRule>,
    memtag_heap: RawMemtagPaths,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPathRule {
    sanitizer: String,
    prefix: String,
    decision: PathDecision,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawMemtagPaths {
    exclude_paths: Vec<String>,
    sync_paths: Vec<String>,
    async_paths: Vec<String>,
}

impl PolicyConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a policy from TOML. Every path entry is validated; malformed
    /// prefixes and unknown sanitizer names are fatal here, not later.
    pub fn from_toml(input: &str) -> Result<Self, ConfigError> {
        let raw: RawPolicy =
            toml::from_str(input).map_err(|e| ConfigError::Parse(e.to_string()))?;

        let mut config = Self::new();
        for name in &raw.device_sanitizers {
            config.enable_on_device(parse_kind(name)?);
        }
        for name in &raw.device_diag {
            config.enable_diag_on_device(parse_kind(name)?);
        }
        for rule in &raw.path_rule {
            config.insert_path_rule(parse_kind(&rule.sanitizer)?, &rule.prefix, rule.decision)?;
        }
        for p in &raw.memtag_heap.exclude_paths {
            config.insert_memtag_exclude(p)?;
        }
        for p in &raw.memtag_heap.sync_paths {
            config.insert_memtag_sync(p)?;
        }
        for p in &raw.memtag_heap.async_paths {
            config.insert_memtag_async(p)?;
        }
        tracing::debug!(
            device = config.device_sanitizers.len(),
            path_rules = raw.path_rule.len(),
            "loaded sanitizer policy"
        );
        Ok(config)
    }

    pub fn enable_on_device(&mut self, kind: SanitizerKind) -> &mut Self {
        self.device_sanitizers.insert(kind);
        self
    }

    pub fn enable_diag_on_device(&mut self, kind: SanitizerKind) -> &mut Self {
        self.device_diag.insert(kind);
        self
    }

    pub fn insert_path_rule(
        &mut self,
        kind: SanitizerKind,
        prefix: &str,
        decision: PathDecision,
    ) -> Result<&mut Self, ConfigError> {
        self.path_rules.entry(kind).or_default().insert(prefix, decision)?;
        Ok(self)
    }

    pub fn insert_memtag_exclude(&mut self, prefix: &str) -> Result<&mut Self, ConfigError> {
        self.memtag_exclude.insert(prefix)?;
        Ok(self)
    }

    pub fn insert_memtag_sync(&mut self, prefix: &str) -> Result<&mut Self, ConfigError> {
        self.memtag_sync.insert(prefix)?;
        Ok(self)
    }

    pub fn insert_memtag_async(&mut self, prefix: &str) -> Result<&mut Self, ConfigError> {
        self.memtag_async.insert(prefix)?;
        Ok(self)
    }

    /// Whether the device-wide sanitizer list requests this kind.
    pub fn device_requested(&self, kind: SanitizerKind) -> bool {
        self.device_sanitizers.contains(kind)
    }

    /// Whether the device-wide diagnostic list requests this kind.
    pub fn device_diag(&self, kind: SanitizerKind) -> bool {
        self.device_diag.contains(kind)
    }

    /// Path-policy decision for a module path, with the matched prefix.
    pub fn path_rule(&self, kind: SanitizerKind, path: &str) -> Option<(&str, PathDecision)> {
        self.path_rules.get(&kind).and_then(|set| set.lookup_rule(path))
    }

    pub fn path_decision(&self, kind: SanitizerKind, path: &str) -> PathDecision {
        self.path_rule(kind, path)
            .map(|(_, d)| d)
            .unwrap_or(PathDecision::Unspecified)
    }

    pub fn memtag_excluded(&self, path: &str) -> bool {
        self.memtag_exclude.matches(path)
    }

    pub fn memtag_sync_path(&self, path: &str) -> bool {
        self.memtag_sync.matches(path)
    }

    pub fn memtag_async_path(&self, path: &str) -> bool {
        self.memtag_async.matches(path)
    }
}

fn parse_kind(name: &str) -> Result<SanitizerKind, ConfigError> {
    SanitizerKind::from_name(name).ok_or_else(|| ConfigError::UnknownSanitizer(name.to_string()))
}
