//! Refresh endpoint client.
//!
//! The endpoint belongs to the authorization flow; this side only posts the
//! refresh token and reads back the new access token.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{DriveError, DriveResult};
use crate::session::{RefreshedToken, TokenRefresher};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// `POST {token_url} {refreshToken} -> {accessToken, refreshToken?, expiresIn?}`
#[derive(Clone, Debug)]
pub struct HttpTokenRefresher {
    client: Client,
    token_url: String,
}

impl HttpTokenRefresher {
    pub fn new(token_url: impl Into<String>, timeout: Duration) -> DriveResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            token_url: token_url.into(),
        })
    }
}

#[async_trait]
impl TokenRefresher for HttpTokenRefresher {
    async fn refresh(&self, refresh_token: &str) -> DriveResult<RefreshedToken> {
        let response = self
            .client
            .post(&self.token_url)
            .json(&RefreshRequest { refresh_token })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            if status.is_server_error() {
                return Err(DriveError::RemoteUnavailable(format!(
                    "token endpoint returned {}: {}",
                    status, body
                )));
            }
            return Err(DriveError::RefreshRejected {
                status: status.as_u16(),
                body,
            });
        }

        let body: RefreshResponse = response
            .json()
            .await
            .map_err(|e| DriveError::InvalidResponse(format!("refresh response: {}", e)))?;

        if body.access_token.is_empty() {
            return Err(DriveError::RefreshRejected {
                status: status.as_u16(),
                body: "empty access token".to_string(),
            });
        }

        Ok(RefreshedToken {
            access_token: body.access_token,
            refresh_token: body.refresh_token.filter(|t| !t.is_empty()),
            expires_in_secs: body.expires_in,
        })
    }
}

/// Refresher used when no token endpoint is configured.
#[derive(Clone, Debug, Default)]
pub struct UnconfiguredRefresher;

#[async_trait]
impl TokenRefresher for UnconfiguredRefresher {
    async fn refresh(&self, _refresh_token: &str) -> DriveResult<RefreshedToken> {
        Err(DriveError::RefreshRejected {
            status: 0,
            body: "no token endpoint configured (set DRIVE_TOKEN_URL)".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[tokio::test]
    async fn refresh_posts_token_and_reads_rotation() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/refresh")
            .match_body(Matcher::Json(serde_json::json!({"refreshToken": "rt-1"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"accessToken":"at-2","refreshToken":"rt-2","expiresIn":3599}"#)
            .create_async()
            .await;

        let refresher =
            HttpTokenRefresher::new(format!("{}/refresh", server.url()), Duration::from_secs(5))
                .unwrap();
        let token = refresher.refresh("rt-1").await.unwrap();

        mock.assert_async().await;
        assert_eq!(token.access_token, "at-2");
        assert_eq!(token.refresh_token.as_deref(), Some("rt-2"));
        assert_eq!(token.expires_in_secs, Some(3599));
    }

    #[tokio::test]
    async fn client_error_is_a_rejection() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/refresh")
            .with_status(400)
            .with_body("invalid_grant")
            .create_async()
            .await;

        let refresher =
            HttpTokenRefresher::new(format!("{}/refresh", server.url()), Duration::from_secs(5))
                .unwrap();
        let err = refresher.refresh("revoked").await.unwrap_err();

        match err {
            DriveError::RefreshRejected { status, body } => {
                assert_eq!(status, 400);
                assert_eq!(body, "invalid_grant");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn server_error_is_unavailable() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/refresh")
            .with_status(503)
            .create_async()
            .await;

        let refresher =
            HttpTokenRefresher::new(format!("{}/refresh", server.url()), Duration::from_secs(5))
                .unwrap();
        assert!(matches!(
            refresher.refresh("rt").await,
            Err(DriveError::RemoteUnavailable(_))
        ));
    }
}
