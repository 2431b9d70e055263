use docgate_core::{Attachment, Candidate, DocumentCategory, Process, Stage};
use docgate_pipeline::BoardSnapshot;

pub const PROCESS_ID: &str = "engineering";
pub const CONTRACT: &str = "signed-contract";
pub const CV: &str = "cv";

pub fn stage(id: &str, name: &str, required: Option<&[&str]>) -> Stage {
    Stage {
        id: id.to_string(),
        name: name.to_string(),
        required_documents: required.map(|r| r.iter().map(|s| s.to_string()).collect()),
        is_critical: None,
    }
}

/// Engineering: applied -> interview (needs CV) -> offer (needs signed contract)
/// -> hired (needs a category that was deleted).
pub fn engineering() -> Process {
    Process {
        id: PROCESS_ID.to_string(),
        name: "Engineering".to_string(),
        stages: vec![
            stage("applied", "Applied", None),
            stage("interview", "Interview", Some(&[CV][..])),
            stage("offer", "Offer", Some(&[CONTRACT][..])),
            stage("hired", "Hired", Some(&[CONTRACT, "deleted-category"][..])),
        ],
        document_categories: vec![
            DocumentCategory {
                id: CONTRACT.to_string(),
                name: "Signed Contract".to_string(),
                description: Some("Countersigned offer letter".to_string()),
                required: true,
            },
            DocumentCategory {
                id: CV.to_string(),
                name: "CV".to_string(),
                description: None,
                required: false,
            },
        ],
        folder_id: None,
    }
}

pub fn attachment(id: &str, category: Option<&str>) -> Attachment {
    Attachment {
        id: id.to_string(),
        name: format!("{}.pdf", id),
        url: format!("https://drive.google.com/file/d/{}/view", id),
        category: category.map(String::from),
        mime_type: "application/pdf".to_string(),
        size: 1024,
        uploaded_at: None,
    }
}

pub fn candidate(id: &str, stage_id: &str, attachments: Vec<Attachment>) -> Candidate {
    Candidate {
        id: id.to_string(),
        name: format!("Candidate {}", id),
        process_id: PROCESS_ID.to_string(),
        stage_id: stage_id.to_string(),
        attachments,
        folder_id: None,
        updated_at: None,
        updated_by: None,
    }
}

pub fn board(candidates: Vec<Candidate>) -> BoardSnapshot {
    BoardSnapshot {
        processes: vec![engineering()],
        candidates,
        history: vec![],
    }
}
