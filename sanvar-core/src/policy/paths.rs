//! Path-prefix rule matching.
//!
//! Prefixes are `/`-separated package paths matched segment-wise: the rule
//! `system/core` covers `system/core` and `system/core/liblog` but not
//! `system/corefoo`. The longest configured prefix wins; on a tie, a
//! disable rule beats an enable rule.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::errors::ConfigError;

/// Outcome of a path-policy lookup for one sanitizer kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathDecision {
    /// Enabled for the directory and all descendants; an explicit module
    /// `false` underneath is a configuration conflict.
    ForceEnabledRecursive,
    /// Disabled regardless of weaker enable rules.
    ForceDisabled,
    /// Enabled unless the module says otherwise.
    DefaultEnabled,
    /// Disabled unless the module says otherwise.
    DefaultDisabled,
    /// No rule matched.
    Unspecified,
}

impl PathDecision {
    pub fn is_disable(&self) -> bool {
        matches!(self, Self::ForceDisabled | Self::DefaultDisabled)
    }

    /// Tie-break rank among rules matching with equal prefix length:
    /// disable beats enable, force beats default.
    fn rank(&self) -> u8 {
        match self {
            Self::ForceDisabled => 4,
            Self::DefaultDisabled => 3,
            Self::ForceEnabledRecursive => 2,
            Self::DefaultEnabled => 1,
            Self::Unspecified => 0,
        }
    }
}

type Segments = SmallVec<[String; 4]>;

/// Split and validate a configured prefix. Malformed entries are fatal at
/// configuration-load time, not per-module.
fn parse_prefix(prefix: &str) -> Result<Segments, ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidPathPrefix {
        entry: prefix.to_string(),
        reason: reason.to_string(),
    };

    if prefix.is_empty() {
        return Err(invalid("empty prefix"));
    }
    if prefix.starts_with('/') {
        return Err(invalid("must be relative"));
    }
    if prefix.ends_with('/') {
        return Err(invalid("trailing slash"));
    }

    let mut segments = Segments::new();
    for segment in prefix.split('/') {
        match segment {
            "" => return Err(invalid("empty segment")),
            "." | ".." => return Err(invalid("relative segment")),
            _ => segments.push(segment.to_string()),
        }
    }
    Ok(segments)
}

fn segment_prefix_matches(prefix: &[String], path: &str) -> bool {
    let mut segments = path.split('/');
    prefix.iter().all(|want| segments.next() == Some(want.as_str()))
}

#[derive(Debug, Clone)]
struct PrefixRule {
    prefix: String,
    segments: Segments,
    decision: PathDecision,
}

/// A set of prefix rules for one sanitizer kind.
#[derive(Debug, Clone, Default)]
pub struct PathPrefixSet {
    rules: Vec<PrefixRule>,
}

impl PathPrefixSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, prefix: &str, decision: PathDecision) -> Result<(), ConfigError> {
        let segments = parse_prefix(prefix)?;
        self.rules.push(PrefixRule {
            prefix: prefix.to_string(),
            segments,
            decision,
        });
        Ok(())
    }

    /// Look up the decision for a module path, returning the matched rule's
    /// prefix alongside it (used in conflict diagnostics).
    pub fn lookup_rule(&self, path: &str) -> Option<(&str, PathDecision)> {
        let mut best: Option<&PrefixRule> = None;
        for rule in &self.rules {
            if !segment_prefix_matches(&rule.segments, path) {
                continue;
            }
            let better = match best {
                None => true,
                Some(b) => {
                    let key = (rule.segments.len(), rule.decision.rank());
                    key > (b.segments.len(), b.decision.rank())
                }
            };
            if better {
                best = Some(rule);
            }
        }
        best.map(|r| (r.prefix.as_str(), r.decision))
    }

    pub fn lookup(&self, path: &str) -> PathDecision {
        self.lookup_rule(path)
            .map(|(_, d)| d)
            .unwrap_or(PathDecision::Unspecified)
    }
}

/// A plain membership matcher over path prefixes, for the memory-tagging
/// include/exclude lists where there is no per-rule decision.
#[derive(Debug, Clone, Default)]
pub struct PrefixMatcher {
    prefixes: Vec<Segments>,
}

impl PrefixMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, prefix: &str) -> Result<(), ConfigError> {
        self.prefixes.push(parse_prefix(prefix)?);
        Ok(())
    }

    pub fn matches(&self, path: &str) -> bool {
        self.prefixes.iter().any(|p| segment_prefix_matches(p, path))
    }
}
