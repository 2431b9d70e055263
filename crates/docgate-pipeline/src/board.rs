//! Drag-and-drop surface state: the multi-select set and drop handling.

use std::sync::{Arc, Mutex};

use crate::coordinator::{MoveReport, MoveRequest, TransitionCoordinator};
use crate::error::PipelineResult;

pub struct BoardSession {
    coordinator: Arc<TransitionCoordinator>,
    selection: Mutex<Vec<String>>,
}

impl BoardSession {
    pub fn new(coordinator: Arc<TransitionCoordinator>) -> Self {
        Self {
            coordinator,
            selection: Mutex::new(Vec::new()),
        }
    }

    fn selection_mut(&self) -> std::sync::MutexGuard<'_, Vec<String>> {
        self.selection.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn selection(&self) -> Vec<String> {
        self.selection_mut().clone()
    }

    /// Add to or remove from the selection; selection order is kept.
    pub fn toggle(&self, candidate_id: &str) {
        let mut selection = self.selection_mut();
        if let Some(pos) = selection.iter().position(|id| id == candidate_id) {
            selection.remove(pos);
        } else {
            selection.push(candidate_id.to_string());
        }
    }

    pub fn clear_selection(&self) {
        self.selection_mut().clear();
    }

    /// The whole selection if `dropped_id` is part of it, else just `dropped_id`.
    pub fn move_set(&self, dropped_id: &str) -> Vec<String> {
        let selection = self.selection_mut();
        if selection.iter().any(|id| id == dropped_id) {
            selection.clone()
        } else {
            vec![dropped_id.to_string()]
        }
    }

    /// Handle a drop of `dropped_id` onto `target_stage_id`.
    ///
    /// A bulk move clears the selection once it completes, even partially.
    /// An overlapping drop fails with `MoveInProgress` and leaves it intact.
    pub async fn drop_candidate(
        &self,
        dropped_id: &str,
        target_stage_id: &str,
        acting_user: &str,
    ) -> PipelineResult<MoveReport> {
        let candidate_ids = self.move_set(dropped_id);
        let bulk = self.selection_mut().iter().any(|id| id == dropped_id);

        let request = MoveRequest::new(candidate_ids, target_stage_id, acting_user);
        let report = self.coordinator.attempt_move(&request).await?;

        if bulk {
            self.clear_selection();
        }
        Ok(report)
    }
}
