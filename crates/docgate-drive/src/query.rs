//! Search filters for the store's list endpoint.

use docgate_core::constants::FOLDER_MIME_TYPE;

/// Conjunction of list filters, rendered into the store's query language.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DriveQuery {
    pub name: Option<String>,
    pub parent: Option<String>,
    pub mime_type: Option<String>,
    pub exclude_mime_type: Option<String>,
    pub include_trashed: bool,
}

impl DriveQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Non-trashed folders.
    pub fn folders() -> Self {
        Self::new().mime_type(FOLDER_MIME_TYPE)
    }

    /// Non-trashed nodes that are not folders.
    pub fn files() -> Self {
        Self {
            exclude_mime_type: Some(FOLDER_MIME_TYPE.to_string()),
            ..Self::default()
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn in_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent = Some(parent_id.into());
        self
    }

    pub fn mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn to_query_string(&self) -> String {
        let mut clauses = Vec::new();
        if let Some(name) = &self.name {
            clauses.push(format!("name = '{}'", escape(name)));
        }
        if let Some(parent) = &self.parent {
            clauses.push(format!("'{}' in parents", escape(parent)));
        }
        if let Some(mime) = &self.mime_type {
            clauses.push(format!("mimeType = '{}'", escape(mime)));
        }
        if let Some(mime) = &self.exclude_mime_type {
            clauses.push(format!("mimeType != '{}'", escape(mime)));
        }
        if !self.include_trashed {
            clauses.push("trashed = false".to_string());
        }
        clauses.join(" and ")
    }
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}
