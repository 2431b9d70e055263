#![allow(dead_code)]

pub mod fixtures;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use docgate_core::{Attachment, Candidate, Process};
use docgate_pipeline::{
    AttachmentSource, BoardSnapshot, CandidateStore, MemoryCandidateStore, PipelineError,
    PipelineResult, StoreAttachmentSource, TransitionCoordinator,
};
use tokio::sync::Notify;

/// Coordinator wired to an in-memory store seeded with `snapshot`.
pub fn coordinator(snapshot: BoardSnapshot) -> (Arc<TransitionCoordinator>, Arc<MemoryCandidateStore>) {
    let store = Arc::new(MemoryCandidateStore::new(snapshot));
    let source = Arc::new(StoreAttachmentSource::new(store.clone()));
    let coordinator = Arc::new(TransitionCoordinator::new(store.clone(), source, store.clone()));
    (coordinator, store)
}

/// Attachment source that fails for one candidate and reads the store otherwise.
pub struct FailingFor {
    pub candidate_id: String,
    pub inner: StoreAttachmentSource,
}

#[async_trait]
impl AttachmentSource for FailingFor {
    async fn attachments(&self, candidate_id: &str) -> PipelineResult<Vec<Attachment>> {
        if candidate_id == self.candidate_id {
            return Err(PipelineError::Store("connection reset".to_string()));
        }
        self.inner.attachments(candidate_id).await
    }
}

/// Attachment source that parks every fetch until released.
pub struct Gated {
    pub entered: Notify,
    pub release: Notify,
    pub inner: StoreAttachmentSource,
}

#[async_trait]
impl AttachmentSource for Gated {
    async fn attachments(&self, candidate_id: &str) -> PipelineResult<Vec<Attachment>> {
        self.entered.notify_one();
        self.release.notified().await;
        self.inner.attachments(candidate_id).await
    }
}

/// Candidate store that parks every stage write until released.
pub struct CommitGated {
    pub entered: Notify,
    pub release: Notify,
    pub inner: Arc<MemoryCandidateStore>,
}

#[async_trait]
impl CandidateStore for CommitGated {
    async fn get_candidate(&self, candidate_id: &str) -> PipelineResult<Option<Candidate>> {
        self.inner.get_candidate(candidate_id).await
    }

    async fn get_process(&self, process_id: &str) -> PipelineResult<Option<Process>> {
        self.inner.get_process(process_id).await
    }

    async fn list_candidates(&self, process_id: &str) -> PipelineResult<Vec<Candidate>> {
        self.inner.list_candidates(process_id).await
    }

    async fn update_stage(
        &self,
        candidate_id: &str,
        stage_id: &str,
        acting_user: &str,
        at: DateTime<Utc>,
    ) -> PipelineResult<Candidate> {
        self.entered.notify_one();
        self.release.notified().await;
        self.inner
            .update_stage(candidate_id, stage_id, acting_user, at)
            .await
    }

    async fn add_attachment(
        &self,
        candidate_id: &str,
        attachment: Attachment,
    ) -> PipelineResult<Candidate> {
        self.inner.add_attachment(candidate_id, attachment).await
    }

    async fn set_candidate_folder(&self, candidate_id: &str, folder_id: &str) -> PipelineResult<()> {
        self.inner.set_candidate_folder(candidate_id, folder_id).await
    }

    async fn set_process_folder(&self, process_id: &str, folder_id: &str) -> PipelineResult<()> {
        self.inner.set_process_folder(process_id, folder_id).await
    }
}
