//! Shared plumbing for the `docgate` binary: tracing, board files and the
//! remote store wiring.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use docgate_core::DocgateConfig;
use docgate_drive::{
    DriveTransport, HttpTokenRefresher, RemoteFileRegistry, RemoteFolderRegistry,
    RemoteObjectClient, ReqwestTransport, TokenRefresher, TokenSession, UnconfiguredRefresher,
};
use docgate_pipeline::BoardSnapshot;

/// Initialize tracing for CLI binaries.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Read a board file (processes, candidates, history).
pub fn load_board(path: &Path) -> Result<BoardSnapshot> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read board file: {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse board file: {}", path.display()))
}

/// Write a board file, replacing it atomically.
pub fn save_board(path: &Path, board: &BoardSnapshot) -> Result<()> {
    let json = serde_json::to_string_pretty(board).context("Serialize board")?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json)
        .with_context(|| format!("Failed to write board file: {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("Failed to replace board file: {}", path.display()))?;
    tracing::debug!(
        path = %path.display(),
        candidates = board.candidates.len(),
        history = board.history.len(),
        "Board file saved"
    );
    Ok(())
}

/// Remote store handles built from configuration.
pub struct DriveContext {
    pub folders: Arc<RemoteFolderRegistry>,
    pub files: Arc<RemoteFileRegistry>,
    session: Arc<TokenSession>,
    initial_refresh_token: Option<String>,
}

impl DriveContext {
    pub fn from_config(config: &DocgateConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.http_timeout_secs);

        let refresher: Arc<dyn TokenRefresher> = match &config.drive_token_url {
            Some(url) => Arc::new(
                HttpTokenRefresher::new(url.as_str(), timeout)
                    .context("Failed to create token refresher")?,
            ),
            None => Arc::new(UnconfiguredRefresher),
        };
        let session = Arc::new(TokenSession::from_connection(&config.connection, refresher));

        let transport = Arc::new(
            ReqwestTransport::new(&config.drive_api_url, &config.drive_upload_url, timeout)
                .context("Failed to create HTTP client")?,
        );

        Ok(Self::from_parts(
            transport,
            session,
            config.connection.refresh_token.clone(),
        ))
    }

    pub fn from_parts(
        transport: Arc<dyn DriveTransport>,
        session: Arc<TokenSession>,
        initial_refresh_token: Option<String>,
    ) -> Self {
        let client = Arc::new(RemoteObjectClient::new(transport, session.clone()));
        Self {
            folders: Arc::new(RemoteFolderRegistry::new(client.clone())),
            files: Arc::new(RemoteFileRegistry::new(client)),
            session,
            initial_refresh_token,
        }
    }

    /// Refresh token issued by the endpoint during this run, if it differs
    /// from the configured one. It has to be saved or the next run fails.
    pub async fn rotated_refresh_token(&self) -> Option<String> {
        let current = self.session.snapshot().await?.refresh_token?;
        (self.initial_refresh_token.as_deref() != Some(current.as_str())).then_some(current)
    }
}
