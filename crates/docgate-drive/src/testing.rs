//! In-memory stand-ins for the remote store and the refresh endpoint.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use docgate_core::constants::FOLDER_MIME_TYPE;

use crate::client::DriveObject;
use crate::error::{DriveError, DriveResult};
use crate::query::DriveQuery;
use crate::session::{RefreshedToken, TokenRefresher};
use crate::transport::{DriveRequest, DriveResponse, DriveTransport};

/// Parent id the fake uses for the store root.
pub const FAKE_ROOT_ID: &str = "root";

struct FakeState {
    objects: Vec<DriveObject>,
    next_id: u64,
    accepted_token: String,
    tokens_seen: Vec<String>,
    requests: Vec<&'static str>,
    injected: VecDeque<u16>,
    clock: DateTime<Utc>,
}

/// Store that keeps nodes in insertion order and only accepts one token.
pub struct FakeDrive {
    state: Mutex<FakeState>,
}

impl FakeDrive {
    pub fn new(accepted_token: &str) -> Self {
        Self {
            state: Mutex::new(FakeState {
                objects: Vec::new(),
                next_id: 1,
                accepted_token: accepted_token.to_string(),
                tokens_seen: Vec::new(),
                requests: Vec::new(),
                injected: VecDeque::new(),
                clock: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn accept_token(&self, token: &str) {
        self.lock().accepted_token = token.to_string();
    }

    /// Answer the next request with `status` regardless of its token.
    pub fn fail_next(&self, status: u16) {
        self.lock().injected.push_back(status);
    }

    pub fn insert_folder(&self, name: &str, parent_id: &str) -> String {
        let mut state = self.lock();
        let object = state.new_object(name, FOLDER_MIME_TYPE, vec![parent_id.to_string()], None);
        let id = object.id.clone();
        state.objects.push(object);
        id
    }

    pub fn insert_file(&self, name: &str, parent_id: &str, modified_at: DateTime<Utc>) -> String {
        let mut state = self.lock();
        let mut object =
            state.new_object(name, "application/pdf", vec![parent_id.to_string()], Some(0));
        object.modified_time = Some(modified_at);
        let id = object.id.clone();
        state.objects.push(object);
        id
    }

    pub fn trash(&self, id: &str) {
        if let Some(object) = self.lock().objects.iter_mut().find(|o| o.id == id) {
            object.trashed = true;
        }
    }

    /// Move a node under a different parent.
    pub fn reparent(&self, id: &str, parent_id: &str) {
        if let Some(object) = self.lock().objects.iter_mut().find(|o| o.id == id) {
            object.parents = vec![parent_id.to_string()];
        }
    }

    pub fn object(&self, id: &str) -> Option<DriveObject> {
        self.lock().objects.iter().find(|o| o.id == id).cloned()
    }

    /// Non-trashed folders named `name` under `parent_id`.
    pub fn folders_named(&self, name: &str, parent_id: &str) -> usize {
        self.lock()
            .objects
            .iter()
            .filter(|o| o.is_folder() && !o.trashed && o.name == name && o.has_parent(parent_id))
            .count()
    }

    pub fn request_count(&self) -> usize {
        self.lock().requests.len()
    }

    /// Request kinds in dispatch order (`list`, `get`, `create`, `upload`, `delete`).
    pub fn requests(&self) -> Vec<&'static str> {
        self.lock().requests.clone()
    }

    pub fn tokens_seen(&self) -> Vec<String> {
        self.lock().tokens_seen.clone()
    }
}

impl FakeState {
    fn new_object(
        &mut self,
        name: &str,
        mime_type: &str,
        parents: Vec<String>,
        size: Option<usize>,
    ) -> DriveObject {
        let id = format!("obj-{}", self.next_id);
        self.next_id += 1;
        self.clock += Duration::seconds(1);
        DriveObject {
            id,
            name: name.to_string(),
            mime_type: mime_type.to_string(),
            parents,
            trashed: false,
            modified_time: Some(self.clock),
            size: size.map(|s| s.to_string()),
        }
    }

    fn handle(&mut self, request: &DriveRequest) -> DriveResponse {
        match request {
            DriveRequest::List { query, .. } => {
                let files: Vec<&DriveObject> =
                    self.objects.iter().filter(|o| matches(query, o)).collect();
                json_response(200, &serde_json::json!({ "files": files }))
            }
            DriveRequest::Get { id, .. } => match self.objects.iter().find(|o| &o.id == id) {
                Some(object) => json_response(200, object),
                None => DriveResponse::new(404, "File not found"),
            },
            DriveRequest::Create {
                metadata, content, ..
            } => {
                let parents = if metadata.parents.is_empty() {
                    vec![FAKE_ROOT_ID.to_string()]
                } else {
                    metadata.parents.clone()
                };
                let mime = metadata
                    .mime_type
                    .clone()
                    .unwrap_or_else(|| "application/octet-stream".to_string());
                let object = self.new_object(
                    &metadata.name,
                    &mime,
                    parents,
                    content.as_ref().map(|c| c.len()),
                );
                self.objects.push(object.clone());
                json_response(200, &object)
            }
            DriveRequest::Delete { id } => {
                let before = self.objects.len();
                self.objects.retain(|o| &o.id != id);
                if self.objects.len() < before {
                    DriveResponse::new(204, "")
                } else {
                    DriveResponse::new(404, "File not found")
                }
            }
        }
    }
}

fn matches(query: &DriveQuery, object: &DriveObject) -> bool {
    if !query.include_trashed && object.trashed {
        return false;
    }
    if query.name.as_ref().is_some_and(|n| n != &object.name) {
        return false;
    }
    if query.parent.as_ref().is_some_and(|p| !object.has_parent(p)) {
        return false;
    }
    if query.mime_type.as_ref().is_some_and(|m| m != &object.mime_type) {
        return false;
    }
    if query
        .exclude_mime_type
        .as_ref()
        .is_some_and(|m| m == &object.mime_type)
    {
        return false;
    }
    true
}

fn json_response<T: serde::Serialize + ?Sized>(status: u16, value: &T) -> DriveResponse {
    DriveResponse::new(status, serde_json::to_vec(value).unwrap_or_default())
}

#[async_trait]
impl DriveTransport for FakeDrive {
    async fn send(&self, request: &DriveRequest, access_token: &str) -> DriveResult<DriveResponse> {
        let mut state = self.lock();
        state.requests.push(request.kind());
        state.tokens_seen.push(access_token.to_string());

        if let Some(status) = state.injected.pop_front() {
            return Ok(DriveResponse::new(status, format!("injected {}", status)));
        }
        if access_token != state.accepted_token {
            return Ok(DriveResponse::new(401, "Invalid Credentials"));
        }
        Ok(state.handle(request))
    }
}

/// Refresher that replays a fixed list of outcomes.
pub struct ScriptedRefresher {
    outcomes: Mutex<VecDeque<DriveResult<RefreshedToken>>>,
    calls: AtomicUsize,
}

impl ScriptedRefresher {
    pub fn new(outcomes: Vec<DriveResult<RefreshedToken>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenRefresher for ScriptedRefresher {
    async fn refresh(&self, _refresh_token: &str) -> DriveResult<RefreshedToken> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(DriveError::RefreshRejected {
                    status: 400,
                    body: "no scripted outcome".to_string(),
                })
            })
    }
}
