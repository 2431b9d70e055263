//! HTTP transport for the remote store's REST surface.
//!
//! The transport sends exactly one request with the token it is handed.
//! Retry and refresh policy lives in [`crate::client::RemoteObjectClient`].

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{DriveError, DriveResult};
use crate::query::DriveQuery;

/// Metadata part of a create call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMetadata {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<String>,
}

/// One call against the store.
#[derive(Clone, Debug)]
pub enum DriveRequest {
    List {
        query: DriveQuery,
        fields: &'static str,
        order_by: Option<&'static str>,
    },
    Get {
        id: String,
        fields: &'static str,
    },
    /// Metadata-only create (folders) when `content` is `None`, multipart otherwise.
    Create {
        metadata: CreateMetadata,
        content: Option<Bytes>,
        fields: &'static str,
    },
    Delete {
        id: String,
    },
}

impl DriveRequest {
    pub fn kind(&self) -> &'static str {
        match self {
            DriveRequest::List { .. } => "list",
            DriveRequest::Get { .. } => "get",
            DriveRequest::Create { content: None, .. } => "create",
            DriveRequest::Create { .. } => "upload",
            DriveRequest::Delete { .. } => "delete",
        }
    }
}

/// Raw response: status plus body bytes.
#[derive(Clone, Debug)]
pub struct DriveResponse {
    pub status: u16,
    pub body: Bytes,
}

impl DriveResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> DriveResult<T> {
        serde_json::from_slice(&self.body)
            .map_err(|e| DriveError::InvalidResponse(format!("{}: {}", e, self.text())))
    }
}

/// Sends a single request with the given bearer token.
#[async_trait]
pub trait DriveTransport: Send + Sync {
    async fn send(&self, request: &DriveRequest, access_token: &str) -> DriveResult<DriveResponse>;
}

/// reqwest-backed transport.
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: Client,
    api_url: String,
    upload_url: String,
}

impl ReqwestTransport {
    pub fn new(api_url: &str, upload_url: &str, timeout: Duration) -> DriveResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            upload_url: upload_url.trim_end_matches('/').to_string(),
        })
    }

    fn file_url(&self, id: &str) -> String {
        format!("{}/files/{}", self.api_url, urlencoding::encode(id))
    }

    fn build(&self, request: &DriveRequest) -> DriveResult<RequestBuilder> {
        let builder = match request {
            DriveRequest::List {
                query,
                fields,
                order_by,
            } => {
                let mut params = vec![
                    ("q", query.to_query_string()),
                    ("fields", fields.to_string()),
                    ("spaces", "drive".to_string()),
                ];
                if let Some(order) = order_by {
                    params.push(("orderBy", order.to_string()));
                }
                self.client
                    .get(format!("{}/files", self.api_url))
                    .query(&params)
            }
            DriveRequest::Get { id, fields } => self
                .client
                .get(self.file_url(id))
                .query(&[("fields", *fields)]),
            DriveRequest::Create {
                metadata,
                content: None,
                fields,
            } => self
                .client
                .post(format!("{}/files", self.api_url))
                .query(&[("fields", *fields)])
                .json(metadata),
            DriveRequest::Create {
                metadata,
                content: Some(content),
                fields,
            } => {
                let metadata_json = serde_json::to_string(metadata)
                    .map_err(|e| DriveError::InvalidResponse(e.to_string()))?;
                let metadata_part = reqwest::multipart::Part::text(metadata_json)
                    .mime_str("application/json")
                    .map_err(|e| DriveError::UploadFailed {
                        status: 0,
                        body: e.to_string(),
                    })?;
                let mime = metadata
                    .mime_type
                    .as_deref()
                    .unwrap_or(docgate_core::constants::DEFAULT_FILE_MIME_TYPE);
                let file_part = reqwest::multipart::Part::bytes(content.to_vec())
                    .file_name(metadata.name.clone())
                    .mime_str(mime)
                    .map_err(|e| DriveError::UploadFailed {
                        status: 0,
                        body: e.to_string(),
                    })?;
                let form = reqwest::multipart::Form::new()
                    .part("metadata", metadata_part)
                    .part("file", file_part);
                self.client
                    .post(format!("{}/files", self.upload_url))
                    .query(&[("uploadType", "multipart"), ("fields", *fields)])
                    .multipart(form)
            }
            DriveRequest::Delete { id } => self.client.delete(self.file_url(id)),
        };
        Ok(builder)
    }
}

#[async_trait]
impl DriveTransport for ReqwestTransport {
    async fn send(&self, request: &DriveRequest, access_token: &str) -> DriveResult<DriveResponse> {
        let start = std::time::Instant::now();
        let response = self
            .build(request)?
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.bytes().await?;

        tracing::debug!(
            kind = request.kind(),
            status,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Remote store request completed"
        );

        Ok(DriveResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn transport(server: &mockito::Server) -> ReqwestTransport {
        ReqwestTransport::new(
            &server.url(),
            &format!("{}/upload", server.url()),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn list_sends_bearer_and_query() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/files")
            .match_header("authorization", "Bearer tok-1")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded(
                    "q".into(),
                    "name = 'CVs' and 'root' in parents and \
                     mimeType = 'application/vnd.google-apps.folder' and trashed = false"
                        .into(),
                ),
                Matcher::UrlEncoded("fields".into(), "files(id,name)".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"files":[]}"#)
            .create_async()
            .await;

        let request = DriveRequest::List {
            query: DriveQuery::folders().name("CVs").in_parent("root"),
            fields: "files(id,name)",
            order_by: None,
        };
        let response = transport(&server).send(&request, "tok-1").await.unwrap();

        mock.assert_async().await;
        assert!(response.is_success());
        assert_eq!(response.text(), r#"{"files":[]}"#);
    }

    #[tokio::test]
    async fn unauthorized_status_is_returned_not_raised() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/files/abc")
            .match_query(Matcher::Any)
            .with_status(401)
            .with_body("expired")
            .create_async()
            .await;

        let request = DriveRequest::Get {
            id: "abc".to_string(),
            fields: "id",
        };
        let response = transport(&server).send(&request, "stale").await.unwrap();

        assert!(response.is_unauthorized());
    }

    #[tokio::test]
    async fn upload_goes_to_multipart_endpoint() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/upload/files")
            .match_query(Matcher::UrlEncoded("uploadType".into(), "multipart".into()))
            .match_header(
                "content-type",
                Matcher::Regex("^multipart/form-data".to_string()),
            )
            .with_status(200)
            .with_body(r#"{"id":"f1","name":"cv.pdf"}"#)
            .create_async()
            .await;

        let request = DriveRequest::Create {
            metadata: CreateMetadata {
                name: "cv.pdf".to_string(),
                mime_type: Some("application/pdf".to_string()),
                parents: vec!["folder-1".to_string()],
            },
            content: Some(Bytes::from_static(b"%PDF-1.4")),
            fields: "id,name",
        };
        let response = transport(&server).send(&request, "tok").await.unwrap();

        mock.assert_async().await;
        assert!(response.is_success());
    }

    #[tokio::test]
    async fn delete_targets_file_id() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("DELETE", "/files/file-42")
            .match_header("authorization", "Bearer tok")
            .with_status(204)
            .create_async()
            .await;

        let request = DriveRequest::Delete {
            id: "file-42".to_string(),
        };
        let response = transport(&server).send(&request, "tok").await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.status, 204);
    }
}
