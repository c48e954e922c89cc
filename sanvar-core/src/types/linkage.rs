//! Module and dependency-edge taxonomy.

use serde::{Deserialize, Serialize};

/// What a module builds into.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ModuleKind {
    Binary,
    SharedLibrary,
    StaticLibrary,
    Test,
}

impl ModuleKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Binary => "binary",
            Self::SharedLibrary => "shared_library",
            Self::StaticLibrary => "static_library",
            Self::Test => "test",
        }
    }

    /// Final-link artifacts get runtime libraries injected; intermediate
    /// static archives never do.
    pub fn is_final_link(&self) -> bool {
        matches!(self, Self::Binary | Self::Test | Self::SharedLibrary)
    }

    /// Executables (binaries and tests) are where memory-tagging notes and
    /// fuzzer harnesses attach.
    pub fn is_executable(&self) -> bool {
        matches!(self, Self::Binary | Self::Test)
    }
}

/// How a dependency is linked into its consumer.
///
/// Install (order-only) dependencies are a computed output of propagation,
/// not an input edge kind.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    /// Linked as a separate shared object.
    Shared,
    /// Linked as a static archive.
    Static,
    /// Static archive merged wholesale into the consumer.
    WholeStatic,
}

impl LinkKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Shared => "shared",
            Self::Static => "static",
            Self::WholeStatic => "whole_static",
        }
    }
}
