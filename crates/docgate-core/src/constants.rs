//! Constants shared across crates.

/// Mime type the remote store uses to mark a node as a folder.
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Default mime type for uploads whose type could not be determined.
pub const DEFAULT_FILE_MIME_TYPE: &str = "application/octet-stream";

/// Default REST base of the remote store.
pub const DEFAULT_DRIVE_API_URL: &str = "https://www.googleapis.com/drive/v3";

/// Default base for multipart uploads.
pub const DEFAULT_DRIVE_UPLOAD_URL: &str = "https://www.googleapis.com/upload/drive/v3";

/// Name of the root folder created when none is configured.
pub const DEFAULT_ROOT_FOLDER_NAME: &str = "Docgate";

/// Seconds before the recorded expiry at which an access token is treated as expired.
pub const TOKEN_EXPIRY_SKEW_SECS: i64 = 60;
