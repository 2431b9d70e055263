//! Docgate Drive Library
//!
//! Client for the external object store that holds candidate documents.
//! Every request goes through [`RemoteObjectClient`], which attaches the
//! current bearer token from the shared [`TokenSession`] and, on a 401,
//! refreshes once and retries once.
//!
//! The store has no create-if-absent primitive, so the folder and file
//! registries resolve by search before creating. Concurrent callers can still
//! create duplicates; the registries converge on one folder per entity across
//! repeated calls rather than guaranteeing uniqueness.

pub mod client;
pub mod error;
pub mod files;
pub mod folders;
pub mod query;
pub mod refresh;
pub mod session;
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;
pub mod transport;

// Re-export commonly used types
pub use client::{DriveObject, RemoteObjectClient};
pub use error::{DriveError, DriveResult};
pub use files::{download_url, guess_mime_type, view_url, RemoteFileRegistry};
pub use folders::{sanitize_folder_name, FolderSpec, RemoteFolderRegistry};
pub use query::DriveQuery;
pub use refresh::{HttpTokenRefresher, UnconfiguredRefresher};
pub use session::{RefreshedToken, TokenRefresher, TokenSession, TokenState};
pub use transport::{CreateMetadata, DriveRequest, DriveResponse, DriveTransport, ReqwestTransport};
