//! File uploads, duplicate-by-name lookup and URL synthesis.
//!
//! Uploads are strict (any failure propagates) while lookups are lenient (any
//! failure reads as "no existing file"), so a flaky search leads to a
//! duplicate upload rather than a lost one.

use std::sync::Arc;

use bytes::Bytes;
use docgate_core::constants::DEFAULT_FILE_MIME_TYPE;
use docgate_core::RemoteFile;

use crate::client::RemoteObjectClient;
use crate::error::DriveResult;
use crate::query::DriveQuery;

/// Browser URL for viewing a stored file.
pub fn view_url(id: &str) -> String {
    format!(
        "https://drive.google.com/file/d/{}/view",
        urlencoding::encode(id)
    )
}

/// Direct download URL for a stored file.
pub fn download_url(id: &str) -> String {
    format!(
        "https://drive.google.com/uc?export=download&id={}",
        urlencoding::encode(id)
    )
}

/// Mime type from the file extension, defaulting to octet-stream.
pub fn guess_mime_type(name: &str) -> &'static str {
    let ext = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "odt" => "application/vnd.oasis.opendocument.text",
        "txt" => "text/plain",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        _ => DEFAULT_FILE_MIME_TYPE,
    }
}

pub struct RemoteFileRegistry {
    client: Arc<RemoteObjectClient>,
}

impl RemoteFileRegistry {
    pub fn new(client: Arc<RemoteObjectClient>) -> Self {
        Self { client }
    }

    /// Single-shot multipart create under `parent_id`.
    pub async fn upload(
        &self,
        content: Bytes,
        parent_id: &str,
        name: &str,
        mime_type: Option<&str>,
    ) -> DriveResult<RemoteFile> {
        let mime = mime_type.unwrap_or_else(|| guess_mime_type(name));
        let size = content.len();
        let start = std::time::Instant::now();

        let created = self.client.create_file(name, parent_id, mime, content).await?;
        let mut file = created.into_file(parent_id);
        if file.size.is_none() {
            file.size = Some(size as u64);
        }

        tracing::info!(
            file_id = %file.id,
            parent_id = %parent_id,
            name = %name,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Uploaded file to remote store"
        );

        Ok(file)
    }

    /// Most recently modified non-trashed file named `name` under `parent_id`.
    ///
    /// Never fails: lookup errors are logged and reported as `None`.
    pub async fn find_by_name(&self, name: &str, parent_id: &str) -> Option<RemoteFile> {
        let query = DriveQuery::files().name(name).in_parent(parent_id);
        match self
            .client
            .list_ordered(&query, Some("modifiedTime desc"))
            .await
        {
            Ok(objects) => objects
                .into_iter()
                .map(|o| o.into_file(parent_id))
                .max_by_key(|f| f.modified_at),
            Err(err) => {
                tracing::warn!(
                    name = %name,
                    parent_id = %parent_id,
                    error = %err,
                    "File lookup failed, treating as absent"
                );
                None
            }
        }
    }

    /// Reuse an existing file with the same name, else upload. The flag is
    /// `true` when a new file was created.
    pub async fn upload_if_absent(
        &self,
        content: Bytes,
        parent_id: &str,
        name: &str,
        mime_type: Option<&str>,
    ) -> DriveResult<(RemoteFile, bool)> {
        if let Some(existing) = self.find_by_name(name, parent_id).await {
            tracing::debug!(file_id = %existing.id, name = %name, "File already present");
            return Ok((existing, false));
        }
        let file = self.upload(content, parent_id, name, mime_type).await?;
        Ok((file, true))
    }

    /// Files (not folders) directly under `parent_id`.
    pub async fn list_in_folder(&self, parent_id: &str) -> DriveResult<Vec<RemoteFile>> {
        let objects = self
            .client
            .list(&DriveQuery::files().in_parent(parent_id))
            .await?;
        Ok(objects.into_iter().map(|o| o.into_file(parent_id)).collect())
    }

    pub async fn delete(&self, id: &str) -> DriveResult<()> {
        self.client.delete(id).await?;
        tracing::info!(file_id = %id, "Deleted remote file");
        Ok(())
    }
}
