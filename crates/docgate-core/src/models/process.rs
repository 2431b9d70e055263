use serde::{Deserialize, Serialize};

/// A named document category configured on a process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentCategory {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
}

/// A pipeline stage. `required_documents` lists category ids that gate entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stage {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub required_documents: Option<Vec<String>>,
    #[serde(default)]
    pub is_critical: Option<bool>,
}

impl Stage {
    pub fn required_category_ids(&self) -> &[String] {
        self.required_documents.as_deref().unwrap_or(&[])
    }
}

/// A hiring process: ordered stages plus the document categories they reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Process {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub stages: Vec<Stage>,
    #[serde(default)]
    pub document_categories: Vec<DocumentCategory>,
    /// Remote section folder last resolved for this process.
    #[serde(default)]
    pub folder_id: Option<String>,
}

impl Process {
    pub fn stage(&self, stage_id: &str) -> Option<&Stage> {
        self.stages.iter().find(|s| s.id == stage_id)
    }

    pub fn has_stage(&self, stage_id: &str) -> bool {
        self.stage(stage_id).is_some()
    }

    pub fn category(&self, category_id: &str) -> Option<&DocumentCategory> {
        self.document_categories.iter().find(|c| c.id == category_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_without_requirements_has_empty_list() {
        let stage = Stage {
            id: "s1".to_string(),
            name: "Screening".to_string(),
            required_documents: None,
            is_critical: None,
        };
        assert!(stage.required_category_ids().is_empty());
    }

    #[test]
    fn process_deserializes_from_camel_case() {
        let json = r#"{
            "id": "p1",
            "name": "Engineering",
            "stages": [{"id": "offer", "name": "Offer", "requiredDocuments": ["contract"]}],
            "documentCategories": [{"id": "contract", "name": "Signed Contract", "required": true}]
        }"#;
        let process: Process = serde_json::from_str(json).unwrap();
        assert!(process.has_stage("offer"));
        assert!(!process.has_stage("hired"));
        assert_eq!(process.stage("offer").unwrap().required_category_ids(), ["contract"]);
        assert_eq!(process.category("contract").unwrap().name, "Signed Contract");
        assert!(process.folder_id.is_none());
    }
}
