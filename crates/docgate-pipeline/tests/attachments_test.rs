mod helpers;

use std::sync::Arc;

use bytes::Bytes;
use docgate_drive::testing::{FakeDrive, ScriptedRefresher};
use docgate_drive::{
    RemoteFileRegistry, RemoteFolderRegistry, RemoteObjectClient, TokenSession, TokenState,
};
use docgate_pipeline::{
    AttachmentService, CandidateStore, MemoryCandidateStore, MoveRequest, PipelineError,
    StoreAttachmentSource, TransitionCoordinator,
};
use helpers::fixtures::{board, candidate, CONTRACT};

struct Harness {
    drive: Arc<FakeDrive>,
    store: Arc<MemoryCandidateStore>,
    service: AttachmentService,
    files: Arc<RemoteFileRegistry>,
}

fn harness() -> Harness {
    let drive = Arc::new(FakeDrive::new("tok"));
    let session = Arc::new(TokenSession::new(
        TokenState::new("tok", None),
        Arc::new(ScriptedRefresher::new(vec![])),
    ));
    let client = Arc::new(RemoteObjectClient::new(drive.clone(), session));
    let folders = Arc::new(RemoteFolderRegistry::new(client.clone()));
    let files = Arc::new(RemoteFileRegistry::new(client));
    let store = Arc::new(MemoryCandidateStore::new(board(vec![
        candidate("A", "interview", vec![]),
        candidate("B", "interview", vec![]),
    ])));
    let service = AttachmentService::new(store.clone(), folders, files.clone(), "Hiring", None);
    Harness {
        drive,
        store,
        service,
        files,
    }
}

#[tokio::test]
async fn upload_records_tagged_attachment_in_entity_folder() {
    let h = harness();

    let attachment = h
        .service
        .attach(
            "A",
            Bytes::from_static(b"%PDF-1.7 contract"),
            "contract.pdf",
            Some(CONTRACT.to_string()),
        )
        .await
        .unwrap();

    let a = h.store.get_candidate("A").await.unwrap().unwrap();
    assert_eq!(a.attachments, vec![attachment.clone()]);
    assert_eq!(attachment.category.as_deref(), Some(CONTRACT));
    assert_eq!(attachment.mime_type, "application/pdf");
    assert_eq!(
        attachment.url,
        format!("https://drive.google.com/file/d/{}/view", attachment.id)
    );

    let folder_id = a.folder_id.expect("entity folder recorded");
    let folder = h.drive.object(&folder_id).unwrap();
    assert_eq!(folder.name, "Candidate A");
    let found = h.files.find_by_name("contract.pdf", &folder_id).await.unwrap();
    assert_eq!(found.id, attachment.id);

    let process = h.store.get_process("engineering").await.unwrap().unwrap();
    assert_eq!(folder.parents, vec![process.folder_id.unwrap()]);
}

#[tokio::test]
async fn repeated_uploads_reuse_folders() {
    let h = harness();

    h.service
        .attach("A", Bytes::from_static(b"cv"), "cv.pdf", None)
        .await
        .unwrap();
    h.service
        .attach("A", Bytes::from_static(b"contract"), "contract.pdf", None)
        .await
        .unwrap();
    h.service
        .attach("B", Bytes::from_static(b"cv"), "cv.pdf", None)
        .await
        .unwrap();

    let process = h.store.get_process("engineering").await.unwrap().unwrap();
    let section = process.folder_id.unwrap();
    let root = h.drive.object(&section).unwrap().parents[0].clone();
    assert_eq!(h.drive.folders_named("Engineering", &root), 1);
    assert_eq!(h.drive.folders_named("Candidate A", &section), 1);
    assert_eq!(h.drive.folders_named("Candidate B", &section), 1);
    assert_eq!(h.drive.folders_named("Hiring", "root"), 1);
}

#[tokio::test]
async fn unknown_category_is_rejected_before_upload() {
    let h = harness();

    let err = h
        .service
        .attach("A", Bytes::from_static(b"x"), "x.pdf", Some("bogus".to_string()))
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::UnknownCategory { .. }));
    assert_eq!(h.drive.request_count(), 0);
}

#[tokio::test]
async fn uploaded_contract_unblocks_offer() {
    let h = harness();
    let coordinator = TransitionCoordinator::new(
        h.store.clone(),
        Arc::new(StoreAttachmentSource::new(h.store.clone())),
        h.store.clone(),
    );
    let request = || MoveRequest::new(vec!["A".to_string()], "offer", "lead");

    let report = coordinator.attempt_move(&request()).await.unwrap();
    assert_eq!(report.blocked.len(), 1);

    h.service
        .attach(
            "A",
            Bytes::from_static(b"signed"),
            "contract.pdf",
            Some(CONTRACT.to_string()),
        )
        .await
        .unwrap();

    let report = coordinator.attempt_move(&request()).await.unwrap();
    assert_eq!(report.moved, vec!["A".to_string()]);
}
