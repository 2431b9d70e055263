use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Audit record written for every committed stage change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageHistoryEntry {
    pub candidate_id: String,
    pub from_stage: String,
    pub to_stage: String,
    pub acting_user: String,
    pub at: DateTime<Utc>,
}
