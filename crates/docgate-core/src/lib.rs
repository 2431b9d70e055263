//! Docgate Core Library
//!
//! This crate provides the domain models, error metadata, and configuration
//! shared by the remote store client, the stage pipeline, and the CLI.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use config::{DocgateConfig, DriveConnection};
pub use error::{ErrorMetadata, LogLevel};
pub use models::{
    Attachment, Candidate, DocumentCategory, Process, RemoteFile, RemoteFolder, Stage,
    StageHistoryEntry,
};
