//! Remote store error types.

use docgate_core::{ErrorMetadata, LogLevel};
use thiserror::Error;

/// Remote store operation errors
#[derive(Debug, Error)]
pub enum DriveError {
    #[error("Remote store is not connected")]
    NotConnected,

    #[error("Authorization expired after token refresh")]
    AuthExpired,

    #[error("No refresh token available")]
    NoRefreshToken,

    #[error("Token refresh rejected ({status}): {body}")]
    RefreshRejected { status: u16, body: String },

    #[error("Remote store unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("Upload failed ({status}): {body}")]
    UploadFailed { status: u16, body: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Remote store request failed ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Invalid response from remote store: {0}")]
    InvalidResponse(String),
}

/// Result type for remote store operations
pub type DriveResult<T> = Result<T, DriveError>;

impl DriveError {
    /// True when the session is dead and the user has to reconnect.
    pub fn requires_reconnect(&self) -> bool {
        matches!(
            self,
            DriveError::NotConnected
                | DriveError::AuthExpired
                | DriveError::NoRefreshToken
                | DriveError::RefreshRejected { .. }
        )
    }
}

impl From<reqwest::Error> for DriveError {
    fn from(err: reqwest::Error) -> Self {
        DriveError::RemoteUnavailable(err.to_string())
    }
}

impl ErrorMetadata for DriveError {
    fn error_code(&self) -> &'static str {
        match self {
            DriveError::NotConnected => "NOT_CONNECTED",
            DriveError::AuthExpired => "AUTH_EXPIRED",
            DriveError::NoRefreshToken => "NO_REFRESH_TOKEN",
            DriveError::RefreshRejected { .. } => "REFRESH_REJECTED",
            DriveError::RemoteUnavailable(_) => "REMOTE_UNAVAILABLE",
            DriveError::UploadFailed { .. } => "UPLOAD_FAILED",
            DriveError::NotFound(_) => "NOT_FOUND",
            DriveError::Api { .. } => "REMOTE_API_ERROR",
            DriveError::InvalidResponse(_) => "INVALID_RESPONSE",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(self, DriveError::RemoteUnavailable(_))
    }

    fn suggested_action(&self) -> Option<&'static str> {
        if self.requires_reconnect() {
            return Some("Reconnect the document store");
        }
        match self {
            DriveError::RemoteUnavailable(_) => Some("Retry in a moment"),
            DriveError::UploadFailed { .. } => Some("Check the file and try uploading again"),
            _ => None,
        }
    }

    fn client_message(&self) -> String {
        if self.requires_reconnect() {
            return "Reconnect required: the document store session has expired".to_string();
        }
        self.to_string()
    }

    fn log_level(&self) -> LogLevel {
        match self {
            DriveError::NotFound(_) => LogLevel::Debug,
            DriveError::RemoteUnavailable(_)
            | DriveError::NotConnected
            | DriveError::AuthExpired
            | DriveError::NoRefreshToken
            | DriveError::RefreshRejected { .. } => LogLevel::Warn,
            _ => LogLevel::Error,
        }
    }
}
