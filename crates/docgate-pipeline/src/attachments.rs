//! Upload a document for a candidate and record it as an attachment.

use std::sync::Arc;

use bytes::Bytes;
use docgate_core::Attachment;
use docgate_drive::{view_url, RemoteFileRegistry, RemoteFolderRegistry};

use crate::error::{PipelineError, PipelineResult};
use crate::store::CandidateStore;

pub struct AttachmentService {
    store: Arc<dyn CandidateStore>,
    folders: Arc<RemoteFolderRegistry>,
    files: Arc<RemoteFileRegistry>,
    root_folder_name: String,
    root_folder_id: Option<String>,
}

impl AttachmentService {
    pub fn new(
        store: Arc<dyn CandidateStore>,
        folders: Arc<RemoteFolderRegistry>,
        files: Arc<RemoteFileRegistry>,
        root_folder_name: impl Into<String>,
        root_folder_id: Option<String>,
    ) -> Self {
        Self {
            store,
            folders,
            files,
            root_folder_name: root_folder_name.into(),
            root_folder_id,
        }
    }

    /// Upload `content` into the candidate's folder and attach it.
    ///
    /// The folder chain is root / process / candidate; resolved ids are
    /// written back so later uploads converge on the same folders.
    pub async fn attach(
        &self,
        candidate_id: &str,
        content: Bytes,
        file_name: &str,
        category: Option<String>,
    ) -> PipelineResult<Attachment> {
        let candidate = self
            .store
            .get_candidate(candidate_id)
            .await?
            .ok_or_else(|| PipelineError::CandidateNotFound(candidate_id.to_string()))?;
        let process = self
            .store
            .get_process(&candidate.process_id)
            .await?
            .ok_or_else(|| PipelineError::ProcessNotFound(candidate.process_id.clone()))?;

        if let Some(category_id) = category.as_deref() {
            if process.category(category_id).is_none() {
                return Err(PipelineError::UnknownCategory {
                    process_id: process.id.clone(),
                    category_id: category_id.to_string(),
                });
            }
        }

        let path = self
            .folders
            .resolve_entity_path(
                &self.root_folder_name,
                self.root_folder_id.as_deref(),
                &process.name,
                process.folder_id.as_deref(),
                &candidate.name,
                candidate.folder_id.as_deref(),
            )
            .await?;

        if process.folder_id.as_deref() != Some(path.section.id.as_str()) {
            self.store
                .set_process_folder(&process.id, &path.section.id)
                .await?;
        }
        if candidate.folder_id.as_deref() != Some(path.entity.id.as_str()) {
            self.store
                .set_candidate_folder(&candidate.id, &path.entity.id)
                .await?;
        }

        let size = content.len() as u64;
        let file = self
            .files
            .upload(content, &path.entity.id, file_name, None)
            .await?;

        let attachment = Attachment::from_remote(&file, view_url(&file.id), category, size);
        self.store
            .add_attachment(&candidate.id, attachment.clone())
            .await?;

        tracing::info!(
            candidate_id = %candidate.id,
            file_id = %file.id,
            folder_id = %path.entity.id,
            category = attachment.category.as_deref().unwrap_or("-"),
            "Attached document to candidate"
        );

        Ok(attachment)
    }
}
