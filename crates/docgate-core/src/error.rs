//! Error metadata shared by the library error types.
//!
//! Each crate owns its own `thiserror` enum; this module only defines how an
//! error describes itself to the surface that reports it (CLI, UI bridge).

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected outcomes like a missing lookup
    Debug,
    /// Warning level - for recoverable issues like a flaky remote
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error reporting - defines how an error should be presented.
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "AUTH_EXPIRED")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried as-is)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the user
    fn suggested_action(&self) -> Option<&'static str>;

    /// User-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;

    /// Emit the error through `tracing` at its configured level.
    fn log(&self) {
        let code = self.error_code();
        let message = self.client_message();
        match self.log_level() {
            LogLevel::Debug => tracing::debug!(error_code = code, "{}", message),
            LogLevel::Warn => tracing::warn!(error_code = code, "{}", message),
            LogLevel::Error => tracing::error!(error_code = code, "{}", message),
        }
    }
}
