//! Module declarations as consumed from the build-graph collaborator.

pub mod types;

pub use types::{DiagDecl, ModuleDecl, SanitizeDecl};
