//! Policy configuration errors. All are fatal at configuration-load time.

use super::error_code::{self, ErrorCode};

/// Errors raised while loading or validating a [`PolicyConfig`].
///
/// [`PolicyConfig`]: crate::policy::PolicyConfig
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid path prefix {entry:?}: {reason}")]
    InvalidPathPrefix { entry: String, reason: String },

    #[error("Unknown sanitizer: {0}")]
    UnknownSanitizer(String),

    #[error("Policy parse error: {0}")]
    Parse(String),
}

impl ErrorCode for ConfigError {
    fn error_code(&self) -> &'static str {
        error_code::CONFIG_ERROR
    }
}
