//! Per-variant compiler/linker flag derivation.

pub mod emit;

pub use emit::{emit, VariantFlags};
