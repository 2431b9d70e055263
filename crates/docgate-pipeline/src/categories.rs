//! Document categories configured on a process and the stages they gate.

use std::collections::HashMap;

use docgate_core::{DocumentCategory, Process};

/// Snapshot of a process's category configuration, taken per evaluation.
#[derive(Clone, Debug, Default)]
pub struct DocumentCategoryModel {
    categories: Vec<DocumentCategory>,
    stage_requirements: HashMap<String, Vec<String>>,
}

impl DocumentCategoryModel {
    pub fn from_process(process: &Process) -> Self {
        let stage_requirements = process
            .stages
            .iter()
            .map(|s| (s.id.clone(), s.required_category_ids().to_vec()))
            .collect();
        Self {
            categories: process.document_categories.clone(),
            stage_requirements,
        }
    }

    pub fn categories(&self) -> &[DocumentCategory] {
        &self.categories
    }

    /// Categories flagged as required for the process overall.
    pub fn required_categories(&self) -> impl Iterator<Item = &DocumentCategory> {
        self.categories.iter().filter(|c| c.required)
    }

    pub fn category(&self, id: &str) -> Option<&DocumentCategory> {
        self.categories.iter().find(|c| c.id == id)
    }

    /// Category ids gating entry into `stage_id`; may reference deleted categories.
    pub fn requirements_for(&self, stage_id: &str) -> &[String] {
        self.stage_requirements
            .get(stage_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Display label for a category id, with a fallback for deleted categories.
    pub fn label(&self, id: &str) -> String {
        match self.category(id) {
            Some(category) => category.name.clone(),
            None => format!("Unknown category ({})", id),
        }
    }

    pub fn labels(&self, ids: &[String]) -> Vec<String> {
        ids.iter().map(|id| self.label(id)).collect()
    }
}
