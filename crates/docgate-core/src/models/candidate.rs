use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::RemoteFile;

/// A document attached to a candidate (or a process).
///
/// Untagged attachments (`category == None`) never satisfy a required category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub category: Option<String>,
    pub mime_type: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub uploaded_at: Option<DateTime<Utc>>,
}

impl Attachment {
    /// Build an attachment record pointing at a file in the remote store.
    pub fn from_remote(
        file: &RemoteFile,
        url: String,
        category: Option<String>,
        size: u64,
    ) -> Self {
        Attachment {
            id: file.id.clone(),
            name: file.name.clone(),
            url,
            category,
            mime_type: file.mime_type.clone(),
            size: file.size.unwrap_or(size),
            uploaded_at: Some(file.modified_at),
        }
    }

    pub fn is_tagged(&self) -> bool {
        self.category.as_deref().is_some_and(|c| !c.is_empty())
    }
}

/// A candidate moving through a process pipeline.
///
/// `stage_id` always references a stage of the owning process; only a stage
/// transition changes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub id: String,
    pub name: String,
    pub process_id: String,
    pub stage_id: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    /// Remote entity folder last resolved for this candidate.
    #[serde(default)]
    pub folder_id: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_by: Option<String>,
}
