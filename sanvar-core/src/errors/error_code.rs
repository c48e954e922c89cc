//! Stable error codes for diagnostics and log correlation.

/// Maps an error to a stable machine-readable code.
pub trait ErrorCode {
    fn error_code(&self) -> &'static str;
}

pub const CONFIG_ERROR: &str = "SV-CONFIG";
pub const RESOLVE_ERROR: &str = "SV-RESOLVE";
pub const GRAPH_ERROR: &str = "SV-GRAPH";
