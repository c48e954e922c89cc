//! Shared type definitions: sanitizer kinds and sets, module/link taxonomy.

pub mod collections;
pub mod linkage;
pub mod sanitizer;

pub use linkage::{LinkKind, ModuleKind};
pub use sanitizer::{MemtagLevel, SanitizerKind, SanitizerSet};
