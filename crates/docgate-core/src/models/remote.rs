use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A folder node in the remote store's tree.
///
/// Names are not unique within a parent; callers must tolerate duplicates
/// they did not create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFolder {
    pub id: String,
    pub name: String,
    pub parent_id: Option<String>,
}

/// A file stored in the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFile {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    pub parent_id: String,
    pub modified_at: DateTime<Utc>,
    #[serde(default)]
    pub size: Option<u64>,
}
