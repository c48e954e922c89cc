//! Collection aliases used on hot paths.

pub use rustc_hash::{FxHashMap, FxHashSet};
