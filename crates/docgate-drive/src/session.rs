//! Bearer token lifecycle.
//!
//! The session is the single shared cell holding the access token. Requests
//! read it at dispatch time, never earlier, so a refresh performed by one
//! request is picked up by every request issued after the swap.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use docgate_core::constants::TOKEN_EXPIRY_SKEW_SECS;
use docgate_core::DriveConnection;
use tokio::sync::{Mutex, RwLock};

use crate::error::{DriveError, DriveResult};

/// Tokens currently held by the session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenState {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expiry: Option<DateTime<Utc>>,
}

impl TokenState {
    pub fn new(access_token: impl Into<String>, refresh_token: Option<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            expiry: None,
        }
    }

    pub fn with_expiry(mut self, expiry: DateTime<Utc>) -> Self {
        self.expiry = Some(expiry);
        self
    }

    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiry
            .is_some_and(|expiry| expiry - Duration::seconds(TOKEN_EXPIRY_SKEW_SECS) <= now)
    }
}

/// Tokens issued by the refresh endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RefreshedToken {
    pub access_token: String,
    /// Set only when the endpoint rotates the refresh token.
    pub refresh_token: Option<String>,
    pub expires_in_secs: Option<i64>,
}

/// Exchanges a refresh token for a new access token.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> DriveResult<RefreshedToken>;
}

pub struct TokenSession {
    state: RwLock<Option<TokenState>>,
    refresh_lock: Mutex<()>,
    refresher: Arc<dyn TokenRefresher>,
}

impl TokenSession {
    pub fn new(state: TokenState, refresher: Arc<dyn TokenRefresher>) -> Self {
        Self {
            state: RwLock::new(Some(state)),
            refresh_lock: Mutex::new(()),
            refresher,
        }
    }

    /// A session with no tokens; every call fails with `NotConnected`.
    pub fn disconnected(refresher: Arc<dyn TokenRefresher>) -> Self {
        Self {
            state: RwLock::new(None),
            refresh_lock: Mutex::new(()),
            refresher,
        }
    }

    /// Seed a session from the persisted connection.
    pub fn from_connection(connection: &DriveConnection, refresher: Arc<dyn TokenRefresher>) -> Self {
        match connection.usable_access_token() {
            Some(token) => Self::new(
                TokenState::new(token, connection.refresh_token.clone()),
                refresher,
            ),
            None => Self::disconnected(refresher),
        }
    }

    pub async fn is_connected(&self) -> bool {
        self.state.read().await.is_some()
    }

    /// Current tokens, for persisting back after a refresh.
    pub async fn snapshot(&self) -> Option<TokenState> {
        self.state.read().await.clone()
    }

    /// Access token to attach to a request about to be dispatched.
    ///
    /// An expired token is refreshed first when a refresh token is held.
    pub async fn access_token(&self) -> DriveResult<String> {
        let (token, needs_refresh) = {
            let guard = self.state.read().await;
            let state = guard.as_ref().ok_or(DriveError::NotConnected)?;
            (
                state.access_token.clone(),
                state.refresh_token.is_some() && state.is_expired(Utc::now()),
            )
        };

        if !needs_refresh {
            return Ok(token);
        }

        tracing::debug!("Access token expired, refreshing before dispatch");
        self.refresh_after_rejection(&token).await?;
        self.current_token().await
    }

    /// Refresh unconditionally.
    pub async fn refresh(&self) -> DriveResult<()> {
        let _guard = self.refresh_lock.lock().await;
        self.refresh_locked().await
    }

    /// Refresh after the store rejected `rejected_token`.
    ///
    /// If another request already swapped the token in the meantime, no new
    /// refresh is issued and the caller simply retries with the current one.
    pub async fn refresh_after_rejection(&self, rejected_token: &str) -> DriveResult<()> {
        let _guard = self.refresh_lock.lock().await;
        {
            let guard = self.state.read().await;
            if let Some(state) = guard.as_ref() {
                if state.access_token != rejected_token {
                    tracing::debug!("Token already refreshed by a concurrent request");
                    return Ok(());
                }
            }
        }
        self.refresh_locked().await
    }

    /// Drop all tokens; the user has to go through authorization again.
    pub async fn disconnect(&self) {
        *self.state.write().await = None;
        tracing::info!("Remote store session disconnected");
    }

    async fn current_token(&self) -> DriveResult<String> {
        self.state
            .read()
            .await
            .as_ref()
            .map(|s| s.access_token.clone())
            .ok_or(DriveError::NotConnected)
    }

    // Caller holds `refresh_lock`.
    async fn refresh_locked(&self) -> DriveResult<()> {
        let refresh_token = {
            let guard = self.state.read().await;
            guard.as_ref().and_then(|s| s.refresh_token.clone())
        };

        let Some(refresh_token) = refresh_token else {
            tracing::warn!("Token refresh requested without a refresh token");
            self.disconnect().await;
            return Err(DriveError::NoRefreshToken);
        };

        let start = std::time::Instant::now();
        match self.refresher.refresh(&refresh_token).await {
            Ok(refreshed) => {
                // A lifetime inside the skew window would read as expired on
                // every dispatch; such tokens are only refreshed on a 401.
                let expiry = refreshed
                    .expires_in_secs
                    .filter(|secs| *secs > TOKEN_EXPIRY_SKEW_SECS)
                    .map(|secs| Utc::now() + Duration::seconds(secs));
                let mut guard = self.state.write().await;
                *guard = Some(TokenState {
                    access_token: refreshed.access_token,
                    refresh_token: refreshed.refresh_token.or(Some(refresh_token)),
                    expiry,
                });
                tracing::info!(
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Access token refreshed"
                );
                Ok(())
            }
            Err(err @ (DriveError::RefreshRejected { .. } | DriveError::NoRefreshToken)) => {
                tracing::warn!(error = %err, "Token refresh failed, clearing session");
                self.disconnect().await;
                Err(err)
            }
            Err(err) => {
                tracing::warn!(error = %err, "Token refresh could not reach the endpoint");
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedRefresher;

    fn refreshed(token: &str) -> RefreshedToken {
        RefreshedToken {
            access_token: token.to_string(),
            refresh_token: None,
            expires_in_secs: Some(3600),
        }
    }

    #[tokio::test]
    async fn refresh_swaps_access_token_and_keeps_refresh_token() {
        let refresher = Arc::new(ScriptedRefresher::new(vec![Ok(refreshed("new"))]));
        let session = TokenSession::new(
            TokenState::new("old", Some("rt".to_string())),
            refresher.clone(),
        );

        session.refresh().await.unwrap();

        let state = session.snapshot().await.unwrap();
        assert_eq!(state.access_token, "new");
        assert_eq!(state.refresh_token.as_deref(), Some("rt"));
        assert!(state.expiry.is_some());
        assert_eq!(refresher.calls(), 1);
    }

    #[tokio::test]
    async fn refresh_without_refresh_token_clears_session() {
        let refresher = Arc::new(ScriptedRefresher::new(vec![]));
        let session = TokenSession::new(TokenState::new("old", None), refresher.clone());

        let err = session.refresh().await.unwrap_err();

        assert!(matches!(err, DriveError::NoRefreshToken));
        assert!(!session.is_connected().await);
        assert_eq!(refresher.calls(), 0);
        assert!(matches!(
            session.access_token().await,
            Err(DriveError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn rejected_refresh_clears_session() {
        let refresher = Arc::new(ScriptedRefresher::new(vec![Err(
            DriveError::RefreshRejected {
                status: 400,
                body: "invalid_grant".to_string(),
            },
        )]));
        let session = TokenSession::new(TokenState::new("old", Some("rt".to_string())), refresher);

        let err = session.refresh().await.unwrap_err();

        assert!(matches!(err, DriveError::RefreshRejected { status: 400, .. }));
        assert!(!session.is_connected().await);
    }

    #[tokio::test]
    async fn unreachable_refresh_endpoint_keeps_session() {
        let refresher = Arc::new(ScriptedRefresher::new(vec![Err(
            DriveError::RemoteUnavailable("connection reset".to_string()),
        )]));
        let session = TokenSession::new(TokenState::new("old", Some("rt".to_string())), refresher);

        assert!(session.refresh().await.is_err());
        assert_eq!(session.access_token().await.unwrap(), "old");
    }

    #[tokio::test]
    async fn stale_rejection_does_not_refresh_twice() {
        let refresher = Arc::new(ScriptedRefresher::new(vec![Ok(refreshed("new"))]));
        let session = TokenSession::new(
            TokenState::new("old", Some("rt".to_string())),
            refresher.clone(),
        );

        session.refresh_after_rejection("old").await.unwrap();
        session.refresh_after_rejection("old").await.unwrap();

        assert_eq!(refresher.calls(), 1);
        assert_eq!(session.access_token().await.unwrap(), "new");
    }

    #[tokio::test]
    async fn expired_token_is_refreshed_before_dispatch() {
        let refresher = Arc::new(ScriptedRefresher::new(vec![Ok(refreshed("fresh"))]));
        let session = TokenSession::new(
            TokenState::new("stale", Some("rt".to_string()))
                .with_expiry(Utc::now() - Duration::minutes(5)),
            refresher.clone(),
        );

        assert_eq!(session.access_token().await.unwrap(), "fresh");
        assert_eq!(refresher.calls(), 1);
    }

    #[tokio::test]
    async fn short_lived_token_is_not_refreshed_on_every_dispatch() {
        let refresher = Arc::new(ScriptedRefresher::new(vec![
            Ok(RefreshedToken {
                access_token: "brief".to_string(),
                refresh_token: None,
                expires_in_secs: Some(30),
            }),
            Ok(refreshed("unexpected")),
        ]));
        let session = TokenSession::new(
            TokenState::new("old", Some("rt".to_string())),
            refresher.clone(),
        );

        session.refresh().await.unwrap();
        for _ in 0..3 {
            assert_eq!(session.access_token().await.unwrap(), "brief");
        }

        assert_eq!(refresher.calls(), 1);
        assert!(session.snapshot().await.unwrap().expiry.is_none());
    }

    #[tokio::test]
    async fn from_connection_respects_connected_flag() {
        let refresher: Arc<dyn TokenRefresher> = Arc::new(ScriptedRefresher::new(vec![]));
        let connection = DriveConnection {
            connected: true,
            access_token: Some("tok".to_string()),
            refresh_token: Some("rt".to_string()),
            ..Default::default()
        };
        let session = TokenSession::from_connection(&connection, refresher.clone());
        assert_eq!(session.access_token().await.unwrap(), "tok");

        let offline = DriveConnection {
            connected: false,
            ..connection
        };
        let session = TokenSession::from_connection(&offline, refresher);
        assert!(!session.is_connected().await);
    }
}
