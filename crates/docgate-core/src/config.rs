//! Configuration module
//!
//! Reads the remote store endpoints and the persisted drive connection from the
//! environment (after loading `.env`). The connection seeds the token session
//! and the root folder id at session start.

use std::env;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_DRIVE_API_URL, DEFAULT_DRIVE_UPLOAD_URL, DEFAULT_ROOT_FOLDER_NAME};

const HTTP_TIMEOUT_SECS: u64 = 60;

/// Persisted connection state written by the authorization flow.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveConnection {
    #[serde(default)]
    pub connected: bool,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub root_folder_id: Option<String>,
    #[serde(default)]
    pub root_folder_name: Option<String>,
}

impl DriveConnection {
    /// Access token to seed a session with, if the connection is usable.
    pub fn usable_access_token(&self) -> Option<&str> {
        if !self.connected {
            return None;
        }
        self.access_token.as_deref().filter(|t| !t.is_empty())
    }
}

/// Application configuration
#[derive(Clone, Debug)]
pub struct DocgateConfig {
    pub drive_api_url: String,
    pub drive_upload_url: String,
    /// Refresh endpoint owned by the authorization flow.
    pub drive_token_url: Option<String>,
    pub http_timeout_secs: u64,
    pub root_folder_name: String,
    pub connection: DriveConnection,
}

impl DocgateConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let http_timeout_secs = env::var("DRIVE_HTTP_TIMEOUT_SECS")
            .unwrap_or_else(|_| HTTP_TIMEOUT_SECS.to_string())
            .parse()
            .map_err(|_| anyhow::anyhow!("DRIVE_HTTP_TIMEOUT_SECS must be a valid number"))?;

        let connected = env::var("DRIVE_CONNECTED")
            .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let connection = DriveConnection {
            connected,
            access_token: non_empty_var("DRIVE_ACCESS_TOKEN"),
            refresh_token: non_empty_var("DRIVE_REFRESH_TOKEN"),
            root_folder_id: non_empty_var("DRIVE_ROOT_FOLDER_ID"),
            root_folder_name: non_empty_var("DRIVE_ROOT_FOLDER_NAME"),
        };

        let root_folder_name = connection
            .root_folder_name
            .clone()
            .unwrap_or_else(|| DEFAULT_ROOT_FOLDER_NAME.to_string());

        let config = DocgateConfig {
            drive_api_url: env::var("DRIVE_API_URL")
                .unwrap_or_else(|_| DEFAULT_DRIVE_API_URL.to_string()),
            drive_upload_url: env::var("DRIVE_UPLOAD_URL")
                .unwrap_or_else(|_| DEFAULT_DRIVE_UPLOAD_URL.to_string()),
            drive_token_url: non_empty_var("DRIVE_TOKEN_URL"),
            http_timeout_secs,
            root_folder_name,
            connection,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), anyhow::Error> {
        if self.http_timeout_secs == 0 {
            anyhow::bail!("DRIVE_HTTP_TIMEOUT_SECS must be greater than zero");
        }
        if self.connection.connected && self.connection.access_token.is_none() {
            anyhow::bail!("DRIVE_CONNECTED is set but DRIVE_ACCESS_TOKEN is missing");
        }
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.connection.usable_access_token().is_some()
    }

    pub fn root_folder_id(&self) -> Option<&str> {
        self.connection.root_folder_id.as_deref()
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}
