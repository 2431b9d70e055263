//! Authenticated client over the store's REST surface.

use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use docgate_core::constants::FOLDER_MIME_TYPE;
use docgate_core::{RemoteFile, RemoteFolder};
use serde::{Deserialize, Serialize};

use crate::error::{DriveError, DriveResult};
use crate::query::DriveQuery;
use crate::session::TokenSession;
use crate::transport::{CreateMetadata, DriveRequest, DriveResponse, DriveTransport};

/// Refresh-and-retry budget for a rejected token.
const MAX_AUTH_RETRIES: usize = 1;

pub(crate) const OBJECT_FIELDS: &str = "id,name,mimeType,parents,trashed,modifiedTime,size";
pub(crate) const LIST_FIELDS: &str = "files(id,name,mimeType,parents,trashed,modifiedTime,size)";

/// A node as returned by the store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveObject {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub parents: Vec<String>,
    #[serde(default)]
    pub trashed: bool,
    #[serde(default)]
    pub modified_time: Option<DateTime<Utc>>,
    /// The store reports sizes as decimal strings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
}

impl DriveObject {
    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME_TYPE
    }

    pub fn has_parent(&self, parent_id: &str) -> bool {
        self.parents.iter().any(|p| p == parent_id)
    }

    pub fn into_folder(self) -> RemoteFolder {
        RemoteFolder {
            parent_id: self.parents.into_iter().next(),
            id: self.id,
            name: self.name,
        }
    }

    /// `fallback_parent` is used when the response omitted `parents`.
    pub fn into_file(self, fallback_parent: &str) -> RemoteFile {
        let size = self.size.as_deref().and_then(|s| s.parse().ok());
        RemoteFile {
            parent_id: self
                .parents
                .into_iter()
                .next()
                .unwrap_or_else(|| fallback_parent.to_string()),
            id: self.id,
            name: self.name,
            mime_type: self.mime_type,
            modified_at: self.modified_time.unwrap_or(DateTime::<Utc>::MIN_UTC),
            size,
        }
    }
}

#[derive(Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveObject>,
}

/// Client that attaches the session token to every call.
///
/// A 401 triggers one refresh and one retry; a second 401 is terminal
/// (`AuthExpired`).
pub struct RemoteObjectClient {
    transport: Arc<dyn DriveTransport>,
    session: Arc<TokenSession>,
}

impl RemoteObjectClient {
    pub fn new(transport: Arc<dyn DriveTransport>, session: Arc<TokenSession>) -> Self {
        Self { transport, session }
    }

    pub fn session(&self) -> &Arc<TokenSession> {
        &self.session
    }

    /// Send `request`, refreshing and retrying at most once on 401.
    pub async fn call(&self, request: &DriveRequest) -> DriveResult<DriveResponse> {
        let mut retries = 0;
        loop {
            // Read at dispatch so a refresh by another request is picked up.
            let token = self.session.access_token().await?;
            let response = self.transport.send(request, &token).await?;

            if !response.is_unauthorized() {
                return Ok(response);
            }

            if retries >= MAX_AUTH_RETRIES {
                tracing::warn!(
                    kind = request.kind(),
                    "Request rejected again after token refresh"
                );
                return Err(DriveError::AuthExpired);
            }

            tracing::info!(kind = request.kind(), "Access token rejected, refreshing");
            self.session.refresh_after_rejection(&token).await?;
            retries += 1;
        }
    }

    /// List nodes matching `query`, in the order the store returns them.
    pub async fn list(&self, query: &DriveQuery) -> DriveResult<Vec<DriveObject>> {
        self.list_ordered(query, None).await
    }

    pub async fn list_ordered(
        &self,
        query: &DriveQuery,
        order_by: Option<&'static str>,
    ) -> DriveResult<Vec<DriveObject>> {
        let request = DriveRequest::List {
            query: query.clone(),
            fields: LIST_FIELDS,
            order_by,
        };
        let response = check(self.call(&request).await?, "list")?;
        Ok(response.json::<FileList>()?.files)
    }

    pub async fn get(&self, id: &str) -> DriveResult<DriveObject> {
        let request = DriveRequest::Get {
            id: id.to_string(),
            fields: OBJECT_FIELDS,
        };
        let response = check(self.call(&request).await?, id)?;
        response.json()
    }

    /// Blind insert of a folder; the store never deduplicates.
    pub async fn create_folder(&self, name: &str, parent_id: Option<&str>) -> DriveResult<DriveObject> {
        let request = DriveRequest::Create {
            metadata: CreateMetadata {
                name: name.to_string(),
                mime_type: Some(FOLDER_MIME_TYPE.to_string()),
                parents: parent_id.map(|p| vec![p.to_string()]).unwrap_or_default(),
            },
            content: None,
            fields: OBJECT_FIELDS,
        };
        let response = check(self.call(&request).await?, name)?;
        response.json()
    }

    /// Multipart create of a file. Any non-2xx is `UploadFailed`.
    pub async fn create_file(
        &self,
        name: &str,
        parent_id: &str,
        mime_type: &str,
        content: Bytes,
    ) -> DriveResult<DriveObject> {
        let request = DriveRequest::Create {
            metadata: CreateMetadata {
                name: name.to_string(),
                mime_type: Some(mime_type.to_string()),
                parents: vec![parent_id.to_string()],
            },
            content: Some(content),
            fields: OBJECT_FIELDS,
        };
        let response = self.call(&request).await?;
        if !response.is_success() {
            return Err(DriveError::UploadFailed {
                status: response.status,
                body: response.text(),
            });
        }
        response.json()
    }

    pub async fn delete(&self, id: &str) -> DriveResult<()> {
        let request = DriveRequest::Delete { id: id.to_string() };
        check(self.call(&request).await?, id)?;
        Ok(())
    }
}

fn check(response: DriveResponse, subject: &str) -> DriveResult<DriveResponse> {
    match response.status {
        200..=299 => Ok(response),
        404 => Err(DriveError::NotFound(subject.to_string())),
        500..=599 => Err(DriveError::RemoteUnavailable(format!(
            "{} returned {}: {}",
            subject,
            response.status,
            response.text()
        ))),
        status => Err(DriveError::Api {
            status,
            body: response.text(),
        }),
    }
}
