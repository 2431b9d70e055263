//! Seams to the backing record store and the audit log, plus an in-memory
//! implementation used by the CLI board file and by tests.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use docgate_core::{Attachment, Candidate, Process, StageHistoryEntry};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{PipelineError, PipelineResult};

/// Source of truth for processes and candidates.
#[async_trait]
pub trait CandidateStore: Send + Sync {
    async fn get_candidate(&self, candidate_id: &str) -> PipelineResult<Option<Candidate>>;

    async fn get_process(&self, process_id: &str) -> PipelineResult<Option<Process>>;

    async fn list_candidates(&self, process_id: &str) -> PipelineResult<Vec<Candidate>>;

    /// Read-modify-write of one candidate's stage, stamping who and when.
    async fn update_stage(
        &self,
        candidate_id: &str,
        stage_id: &str,
        acting_user: &str,
        at: DateTime<Utc>,
    ) -> PipelineResult<Candidate>;

    async fn add_attachment(
        &self,
        candidate_id: &str,
        attachment: Attachment,
    ) -> PipelineResult<Candidate>;

    async fn set_candidate_folder(&self, candidate_id: &str, folder_id: &str) -> PipelineResult<()>;

    async fn set_process_folder(&self, process_id: &str, folder_id: &str) -> PipelineResult<()>;
}

/// Audit trail of stage changes.
#[async_trait]
pub trait HistoryLog: Send + Sync {
    async fn record(&self, entry: StageHistoryEntry) -> PipelineResult<()>;
}

/// Where the gate gets a candidate's authoritative attachment list.
#[async_trait]
pub trait AttachmentSource: Send + Sync {
    async fn attachments(&self, candidate_id: &str) -> PipelineResult<Vec<Attachment>>;
}

/// Re-reads the candidate record on every call instead of trusting a cache.
pub struct StoreAttachmentSource {
    store: Arc<dyn CandidateStore>,
}

impl StoreAttachmentSource {
    pub fn new(store: Arc<dyn CandidateStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl AttachmentSource for StoreAttachmentSource {
    async fn attachments(&self, candidate_id: &str) -> PipelineResult<Vec<Attachment>> {
        self.store
            .get_candidate(candidate_id)
            .await?
            .map(|c| c.attachments)
            .ok_or_else(|| PipelineError::CandidateNotFound(candidate_id.to_string()))
    }
}

/// Serializable board contents: the CLI's JSON file format.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardSnapshot {
    #[serde(default)]
    pub processes: Vec<Process>,
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub history: Vec<StageHistoryEntry>,
}

#[derive(Default)]
pub struct MemoryCandidateStore {
    state: RwLock<BoardSnapshot>,
}

impl MemoryCandidateStore {
    pub fn new(snapshot: BoardSnapshot) -> Self {
        Self {
            state: RwLock::new(snapshot),
        }
    }

    pub async fn snapshot(&self) -> BoardSnapshot {
        self.state.read().await.clone()
    }

    pub async fn history(&self) -> Vec<StageHistoryEntry> {
        self.state.read().await.history.clone()
    }

    async fn modify_candidate<F>(&self, candidate_id: &str, f: F) -> PipelineResult<Candidate>
    where
        F: FnOnce(&mut Candidate, &[Process]) -> PipelineResult<()> + Send,
    {
        let mut state = self.state.write().await;
        let BoardSnapshot {
            processes,
            candidates,
            ..
        } = &mut *state;
        let candidate = candidates
            .iter_mut()
            .find(|c| c.id == candidate_id)
            .ok_or_else(|| PipelineError::CandidateNotFound(candidate_id.to_string()))?;
        f(candidate, processes)?;
        Ok(candidate.clone())
    }
}

#[async_trait]
impl CandidateStore for MemoryCandidateStore {
    async fn get_candidate(&self, candidate_id: &str) -> PipelineResult<Option<Candidate>> {
        let state = self.state.read().await;
        Ok(state.candidates.iter().find(|c| c.id == candidate_id).cloned())
    }

    async fn get_process(&self, process_id: &str) -> PipelineResult<Option<Process>> {
        let state = self.state.read().await;
        Ok(state.processes.iter().find(|p| p.id == process_id).cloned())
    }

    async fn list_candidates(&self, process_id: &str) -> PipelineResult<Vec<Candidate>> {
        let state = self.state.read().await;
        Ok(state
            .candidates
            .iter()
            .filter(|c| c.process_id == process_id)
            .cloned()
            .collect())
    }

    async fn update_stage(
        &self,
        candidate_id: &str,
        stage_id: &str,
        acting_user: &str,
        at: DateTime<Utc>,
    ) -> PipelineResult<Candidate> {
        self.modify_candidate(candidate_id, |candidate, processes| {
            let process = processes
                .iter()
                .find(|p| p.id == candidate.process_id)
                .ok_or_else(|| PipelineError::ProcessNotFound(candidate.process_id.clone()))?;
            if !process.has_stage(stage_id) {
                return Err(PipelineError::StageNotInProcess {
                    process_id: process.id.clone(),
                    stage_id: stage_id.to_string(),
                });
            }
            candidate.stage_id = stage_id.to_string();
            candidate.updated_at = Some(at);
            candidate.updated_by = Some(acting_user.to_string());
            Ok(())
        })
        .await
    }

    async fn add_attachment(
        &self,
        candidate_id: &str,
        attachment: Attachment,
    ) -> PipelineResult<Candidate> {
        self.modify_candidate(candidate_id, |candidate, _| {
            candidate.attachments.push(attachment);
            candidate.updated_at = Some(Utc::now());
            Ok(())
        })
        .await
    }

    async fn set_candidate_folder(&self, candidate_id: &str, folder_id: &str) -> PipelineResult<()> {
        self.modify_candidate(candidate_id, |candidate, _| {
            candidate.folder_id = Some(folder_id.to_string());
            Ok(())
        })
        .await
        .map(|_| ())
    }

    async fn set_process_folder(&self, process_id: &str, folder_id: &str) -> PipelineResult<()> {
        let mut state = self.state.write().await;
        let process = state
            .processes
            .iter_mut()
            .find(|p| p.id == process_id)
            .ok_or_else(|| PipelineError::ProcessNotFound(process_id.to_string()))?;
        process.folder_id = Some(folder_id.to_string());
        Ok(())
    }
}

#[async_trait]
impl HistoryLog for MemoryCandidateStore {
    async fn record(&self, entry: StageHistoryEntry) -> PipelineResult<()> {
        self.state.write().await.history.push(entry);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docgate_core::Stage;

    fn snapshot() -> BoardSnapshot {
        BoardSnapshot {
            processes: vec![Process {
                id: "eng".to_string(),
                name: "Engineering".to_string(),
                stages: vec![
                    Stage {
                        id: "applied".to_string(),
                        name: "Applied".to_string(),
                        required_documents: None,
                        is_critical: None,
                    },
                    Stage {
                        id: "interview".to_string(),
                        name: "Interview".to_string(),
                        required_documents: None,
                        is_critical: None,
                    },
                ],
                document_categories: vec![],
                folder_id: None,
            }],
            candidates: vec![Candidate {
                id: "c1".to_string(),
                name: "Jane Doe".to_string(),
                process_id: "eng".to_string(),
                stage_id: "applied".to_string(),
                attachments: vec![],
                folder_id: None,
                updated_at: None,
                updated_by: None,
            }],
            history: vec![],
        }
    }

    #[tokio::test]
    async fn update_stage_stamps_actor() {
        let store = MemoryCandidateStore::new(snapshot());
        let at = Utc::now();

        let updated = store.update_stage("c1", "interview", "recruiter@example.com", at).await.unwrap();

        assert_eq!(updated.stage_id, "interview");
        assert_eq!(updated.updated_by.as_deref(), Some("recruiter@example.com"));
        assert_eq!(updated.updated_at, Some(at));
    }

    #[tokio::test]
    async fn update_stage_rejects_foreign_stage() {
        let store = MemoryCandidateStore::new(snapshot());

        let err = store.update_stage("c1", "hired", "me", Utc::now()).await.unwrap_err();

        assert!(matches!(err, PipelineError::StageNotInProcess { .. }));
        let candidate = store.get_candidate("c1").await.unwrap().unwrap();
        assert_eq!(candidate.stage_id, "applied");
    }

    #[tokio::test]
    async fn attachment_source_reads_latest_record() {
        let store = Arc::new(MemoryCandidateStore::new(snapshot()));
        let source = StoreAttachmentSource::new(store.clone());
        assert!(source.attachments("c1").await.unwrap().is_empty());

        store
            .add_attachment(
                "c1",
                Attachment {
                    id: "f1".to_string(),
                    name: "cv.pdf".to_string(),
                    url: "https://example.test/f1".to_string(),
                    category: Some("cv".to_string()),
                    mime_type: "application/pdf".to_string(),
                    size: 10,
                    uploaded_at: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(source.attachments("c1").await.unwrap().len(), 1);
        assert!(matches!(
            source.attachments("nobody").await,
            Err(PipelineError::CandidateNotFound(_))
        ));
    }
}
