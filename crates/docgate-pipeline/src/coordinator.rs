//! Single and bulk stage moves.
//!
//! A move attempt runs `Idle -> Validating -> Committing -> Idle`:
//!
//! - **Validating**: every candidate in the move set is gate-checked against
//!   the target stage concurrently, each with a fresh attachment fetch.
//! - **Committing**: movable candidates are persisted one at a time in
//!   selection order. Each write is a read-modify-write of a shared record.
//! - Afterwards the affected processes' candidates are re-read from the store.
//!
//! Blocked candidates never stop the movable ones from committing. A second
//! attempt arriving while one is in flight is refused, not queued.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use docgate_core::{Candidate, StageHistoryEntry};
use futures::future::join_all;
use serde::Serialize;
use uuid::Uuid;

use crate::categories::DocumentCategoryModel;
use crate::error::{PipelineError, PipelineResult};
use crate::gate::StageGate;
use crate::store::{AttachmentSource, CandidateStore, HistoryLog};

/// Where the coordinator is in its current attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MovePhase {
    Idle,
    Validating { transaction: Uuid },
    Committing { transaction: Uuid },
}

/// One drop event: move `candidate_ids` into `target_stage_id`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MoveRequest {
    pub transaction_id: Uuid,
    pub candidate_ids: Vec<String>,
    pub target_stage_id: String,
    pub acting_user: String,
}

impl MoveRequest {
    pub fn new(
        candidate_ids: Vec<String>,
        target_stage_id: impl Into<String>,
        acting_user: impl Into<String>,
    ) -> Self {
        Self {
            transaction_id: Uuid::new_v4(),
            candidate_ids,
            target_stage_id: target_stage_id.into(),
            acting_user: acting_user.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "detail")]
pub enum BlockReason {
    MissingDocuments,
    CandidateNotFound,
    StageNotInProcess,
    ValidationError(String),
    CommitFailed(String),
}

/// A candidate that did not move, and why.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockedCandidate {
    pub candidate_id: String,
    pub candidate_name: Option<String>,
    pub reason: BlockReason,
    /// Category ids that failed the gate.
    pub missing_category_ids: Vec<String>,
    /// Display labels for `missing_category_ids`.
    pub missing_categories: Vec<String>,
}

impl BlockedCandidate {
    fn new(candidate_id: &str, candidate_name: Option<&str>, reason: BlockReason) -> Self {
        Self {
            candidate_id: candidate_id.to_string(),
            candidate_name: candidate_name.map(String::from),
            reason,
            missing_category_ids: Vec::new(),
            missing_categories: Vec::new(),
        }
    }

    fn display_name(&self) -> &str {
        self.candidate_name.as_deref().unwrap_or(&self.candidate_id)
    }
}

/// Result of one move attempt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveReport {
    pub transaction_id: Uuid,
    pub target_stage_id: String,
    /// Candidates whose stage changed, in commit order.
    pub moved: Vec<String>,
    /// Candidates already in the target stage.
    pub unchanged: Vec<String>,
    pub blocked: Vec<BlockedCandidate>,
    /// Candidates of the affected processes as re-read after commit.
    pub candidates: Vec<Candidate>,
    /// False when the post-commit re-read failed and `candidates` is empty.
    pub resynced: bool,
}

impl MoveReport {
    pub fn is_complete(&self) -> bool {
        self.blocked.is_empty()
    }

    /// Union of missing category labels across blocked candidates, first seen first.
    pub fn missing_categories(&self) -> Vec<String> {
        let mut union: Vec<String> = Vec::new();
        for blocked in &self.blocked {
            for label in &blocked.missing_categories {
                if !union.contains(label) {
                    union.push(label.clone());
                }
            }
        }
        union
    }

    /// One consolidated message for every blocked candidate, `None` if none.
    pub fn summary(&self) -> Option<String> {
        if self.blocked.is_empty() {
            return None;
        }

        let names: Vec<String> = self
            .blocked
            .iter()
            .map(|b| match &b.reason {
                BlockReason::MissingDocuments => b.display_name().to_string(),
                BlockReason::CandidateNotFound => format!("{} (not found)", b.display_name()),
                BlockReason::StageNotInProcess => {
                    format!("{} (stage not in process)", b.display_name())
                }
                BlockReason::ValidationError(e) => {
                    format!("{} (validation error: {})", b.display_name(), e)
                }
                BlockReason::CommitFailed(e) => format!("{} (save failed: {})", b.display_name(), e),
            })
            .collect();

        let mut message = format!(
            "{} candidate(s) could not be moved: {}",
            self.blocked.len(),
            names.join(", ")
        );
        let missing = self.missing_categories();
        if !missing.is_empty() {
            message.push_str(&format!(". Missing documents: {}", missing.join(", ")));
        }
        Some(message)
    }
}

enum Verdict {
    Movable { candidate: Candidate },
    AlreadyThere { candidate: Candidate },
    Blocked(BlockedCandidate),
}

pub struct TransitionCoordinator {
    store: Arc<dyn CandidateStore>,
    attachments: Arc<dyn AttachmentSource>,
    history: Arc<dyn HistoryLog>,
    phase: Mutex<MovePhase>,
}

/// Resets the coordinator to `Idle` when the attempt ends, however it ends.
struct FlightGuard<'a> {
    phase: &'a Mutex<MovePhase>,
}

impl FlightGuard<'_> {
    fn set(&self, next: MovePhase) {
        *self.phase.lock().unwrap_or_else(|e| e.into_inner()) = next;
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.set(MovePhase::Idle);
    }
}

impl TransitionCoordinator {
    pub fn new(
        store: Arc<dyn CandidateStore>,
        attachments: Arc<dyn AttachmentSource>,
        history: Arc<dyn HistoryLog>,
    ) -> Self {
        Self {
            store,
            attachments,
            history,
            phase: Mutex::new(MovePhase::Idle),
        }
    }

    pub fn phase(&self) -> MovePhase {
        *self.phase.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn begin(&self, transaction: Uuid) -> PipelineResult<FlightGuard<'_>> {
        let mut phase = self.phase.lock().unwrap_or_else(|e| e.into_inner());
        match *phase {
            MovePhase::Idle => {
                *phase = MovePhase::Validating { transaction };
                Ok(FlightGuard { phase: &self.phase })
            }
            MovePhase::Validating { transaction: active }
            | MovePhase::Committing { transaction: active } => {
                Err(PipelineError::MoveInProgress(active))
            }
        }
    }

    /// Validate, partition and commit one move request.
    ///
    /// Fails only with `MoveInProgress` when another attempt is in flight;
    /// per-candidate problems are reported in the returned `blocked` list.
    pub async fn attempt_move(&self, request: &MoveRequest) -> PipelineResult<MoveReport> {
        let guard = match self.begin(request.transaction_id) {
            Ok(guard) => guard,
            Err(err) => {
                tracing::debug!(
                    transaction_id = %request.transaction_id,
                    error = %err,
                    "Ignoring overlapping move"
                );
                return Err(err);
            }
        };

        let mut seen = BTreeSet::new();
        let candidate_ids: Vec<&str> = request
            .candidate_ids
            .iter()
            .map(String::as_str)
            .filter(|id| seen.insert(*id))
            .collect();

        tracing::info!(
            transaction_id = %request.transaction_id,
            target_stage = %request.target_stage_id,
            candidates = candidate_ids.len(),
            "Validating stage move"
        );

        let verdicts = join_all(
            candidate_ids
                .iter()
                .map(|id| self.validate(id, &request.target_stage_id)),
        )
        .await;

        let mut movable = Vec::new();
        let mut unchanged = Vec::new();
        let mut blocked = Vec::new();
        let mut process_ids = BTreeSet::new();
        for verdict in verdicts {
            match verdict {
                Verdict::Movable { candidate } => {
                    process_ids.insert(candidate.process_id.clone());
                    movable.push(candidate);
                }
                Verdict::AlreadyThere { candidate } => {
                    process_ids.insert(candidate.process_id.clone());
                    unchanged.push(candidate.id);
                }
                Verdict::Blocked(b) => {
                    tracing::warn!(
                        transaction_id = %request.transaction_id,
                        candidate_id = %b.candidate_id,
                        reason = ?b.reason,
                        missing = ?b.missing_category_ids,
                        "Candidate blocked from stage"
                    );
                    blocked.push(b);
                }
            }
        }

        guard.set(MovePhase::Committing {
            transaction: request.transaction_id,
        });

        let mut moved = Vec::new();
        for candidate in movable {
            match self.commit(&candidate, request).await {
                Ok(()) => moved.push(candidate.id),
                Err(err) => {
                    tracing::error!(
                        transaction_id = %request.transaction_id,
                        candidate_id = %candidate.id,
                        error = %err,
                        "Failed to persist stage move"
                    );
                    blocked.push(BlockedCandidate::new(
                        &candidate.id,
                        Some(candidate.name.as_str()),
                        BlockReason::CommitFailed(err.to_string()),
                    ));
                }
            }
        }

        let (candidates, resynced) = self.resync(&process_ids).await;

        tracing::info!(
            transaction_id = %request.transaction_id,
            moved = moved.len(),
            unchanged = unchanged.len(),
            blocked = blocked.len(),
            "Stage move finished"
        );

        drop(guard);
        Ok(MoveReport {
            transaction_id: request.transaction_id,
            target_stage_id: request.target_stage_id.clone(),
            moved,
            unchanged,
            blocked,
            candidates,
            resynced,
        })
    }

    async fn validate(&self, candidate_id: &str, target_stage_id: &str) -> Verdict {
        match self.try_validate(candidate_id, target_stage_id).await {
            Ok(verdict) => verdict,
            Err(PipelineError::CandidateNotFound(_)) => Verdict::Blocked(BlockedCandidate::new(
                candidate_id,
                None,
                BlockReason::CandidateNotFound,
            )),
            Err(err) => Verdict::Blocked(BlockedCandidate::new(
                candidate_id,
                None,
                BlockReason::ValidationError(err.to_string()),
            )),
        }
    }

    async fn try_validate(
        &self,
        candidate_id: &str,
        target_stage_id: &str,
    ) -> PipelineResult<Verdict> {
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

        let Some(stage) = process.stage(target_stage_id) else {
            return Ok(Verdict::Blocked(BlockedCandidate::new(
                &candidate.id,
                Some(candidate.name.as_str()),
                BlockReason::StageNotInProcess,
            )));
        };

        if candidate.stage_id == target_stage_id {
            return Ok(Verdict::AlreadyThere { candidate });
        }

        let attachments = match self.attachments.attachments(candidate_id).await {
            Ok(attachments) => attachments,
            Err(err) => {
                return Ok(Verdict::Blocked(BlockedCandidate::new(
                    &candidate.id,
                    Some(candidate.name.as_str()),
                    BlockReason::ValidationError(err.to_string()),
                )))
            }
        };

        let result = StageGate::evaluate(&attachments, stage.required_documents.as_deref());
        if result.satisfied {
            return Ok(Verdict::Movable { candidate });
        }

        let model = DocumentCategoryModel::from_process(&process);
        let mut blocked = BlockedCandidate::new(
            &candidate.id,
            Some(candidate.name.as_str()),
            BlockReason::MissingDocuments,
        );
        blocked.missing_categories = model.labels(&result.missing);
        blocked.missing_category_ids = result.missing;
        Ok(Verdict::Blocked(blocked))
    }

    async fn commit(&self, candidate: &Candidate, request: &MoveRequest) -> PipelineResult<()> {
        let at = Utc::now();
        let updated = self
            .store
            .update_stage(
                &candidate.id,
                &request.target_stage_id,
                &request.acting_user,
                at,
            )
            .await?;

        tracing::info!(
            transaction_id = %request.transaction_id,
            candidate_id = %candidate.id,
            from_stage = %candidate.stage_id,
            to_stage = %updated.stage_id,
            acting_user = %request.acting_user,
            "Candidate moved"
        );

        let entry = StageHistoryEntry {
            candidate_id: candidate.id.clone(),
            from_stage: candidate.stage_id.clone(),
            to_stage: request.target_stage_id.clone(),
            acting_user: request.acting_user.clone(),
            at,
        };
        if let Err(err) = self.history.record(entry).await {
            tracing::warn!(
                candidate_id = %candidate.id,
                error = %err,
                "Failed to record stage history"
            );
        }
        Ok(())
    }

    async fn resync(&self, process_ids: &BTreeSet<String>) -> (Vec<Candidate>, bool) {
        let mut candidates = Vec::new();
        for process_id in process_ids {
            match self.store.list_candidates(process_id).await {
                Ok(mut list) => candidates.append(&mut list),
                Err(err) => {
                    tracing::warn!(
                        process_id = %process_id,
                        error = %err,
                        "Failed to resync candidates after move"
                    );
                    return (Vec::new(), false);
                }
            }
        }
        (candidates, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blocked(name: &str, labels: &[&str]) -> BlockedCandidate {
        BlockedCandidate {
            candidate_id: name.to_lowercase(),
            candidate_name: Some(name.to_string()),
            reason: BlockReason::MissingDocuments,
            missing_category_ids: labels.iter().map(|l| l.to_lowercase()).collect(),
            missing_categories: labels.iter().map(|l| l.to_string()).collect(),
        }
    }

    fn report(blocked: Vec<BlockedCandidate>) -> MoveReport {
        MoveReport {
            transaction_id: Uuid::nil(),
            target_stage_id: "offer".to_string(),
            moved: vec![],
            unchanged: vec![],
            blocked,
            candidates: vec![],
            resynced: true,
        }
    }

    #[test]
    fn summary_lists_everyone_and_unions_categories() {
        let report = report(vec![
            blocked("Bob", &["Signed Contract", "ID"]),
            blocked("Carol", &["ID", "References"]),
        ]);

        assert_eq!(
            report.missing_categories(),
            vec!["Signed Contract", "ID", "References"]
        );
        assert_eq!(
            report.summary().unwrap(),
            "2 candidate(s) could not be moved: Bob, Carol. \
             Missing documents: Signed Contract, ID, References"
        );
    }

    #[test]
    fn summary_is_none_when_nothing_blocked() {
        assert!(report(vec![]).summary().is_none());
        assert!(report(vec![]).is_complete());
    }

    #[test]
    fn overlapping_attempt_is_refused() {
        struct Unused;
        #[async_trait::async_trait]
        impl AttachmentSource for Unused {
            async fn attachments(&self, _: &str) -> PipelineResult<Vec<docgate_core::Attachment>> {
                Ok(vec![])
            }
        }
        let store = Arc::new(crate::store::MemoryCandidateStore::default());
        let coordinator = TransitionCoordinator::new(store.clone(), Arc::new(Unused), store);

        let transaction = Uuid::new_v4();
        let guard = coordinator.begin(transaction).unwrap();
        assert_eq!(coordinator.phase(), MovePhase::Validating { transaction });
        assert!(matches!(
            coordinator.begin(Uuid::new_v4()),
            Err(PipelineError::MoveInProgress(t)) if t == transaction
        ));

        drop(guard);
        assert_eq!(coordinator.phase(), MovePhase::Idle);
    }
}
