//! Get-or-create resolution for root, section and entity folders.
//!
//! Every resolve is search-then-create against a store with no upsert, so two
//! actors resolving the same name at once can both create a folder. That race
//! is tolerated: lookups take the first match and later calls converge on it.
//! Duplicates the registry did not create are never merged or deleted.

use std::sync::{Arc, OnceLock};

use docgate_core::RemoteFolder;
use regex::Regex;

use crate::client::{DriveObject, RemoteObjectClient};
use crate::error::{DriveError, DriveResult};
use crate::query::DriveQuery;

/// Parent alias the store uses for its root.
pub const STORE_ROOT: &str = "root";

/// Which folder to resolve.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FolderSpec {
    Root {
        name: String,
    },
    Section {
        name: String,
        parent_id: String,
    },
    Entity {
        name: String,
        parent_id: String,
        known_id: Option<String>,
    },
}

/// Replace everything outside `[A-Za-z0-9_- ]` with `_`.
pub fn sanitize_folder_name(name: &str) -> String {
    static UNSAFE: OnceLock<Regex> = OnceLock::new();
    let re = UNSAFE.get_or_init(|| Regex::new(r"[^A-Za-z0-9_\- ]").expect("static regex"));
    re.replace_all(name, "_").into_owned()
}

pub struct RemoteFolderRegistry {
    client: Arc<RemoteObjectClient>,
}

impl RemoteFolderRegistry {
    pub fn new(client: Arc<RemoteObjectClient>) -> Self {
        Self { client }
    }

    pub async fn resolve(&self, spec: &FolderSpec) -> DriveResult<RemoteFolder> {
        match spec {
            FolderSpec::Root { name } => self.get_or_create_root_folder(name).await,
            FolderSpec::Section { name, parent_id } => {
                self.get_or_create_section_folder(name, parent_id).await
            }
            FolderSpec::Entity {
                name,
                parent_id,
                known_id,
            } => {
                self.get_or_create_entity_folder(name, parent_id, known_id.as_deref())
                    .await
            }
        }
    }

    /// First non-trashed folder named `name` at the store root, else a new one.
    pub async fn get_or_create_root_folder(&self, name: &str) -> DriveResult<RemoteFolder> {
        self.find_or_create(name, STORE_ROOT, None).await
    }

    /// First non-trashed folder named `name` under `parent_id`, else a new one.
    pub async fn get_or_create_section_folder(
        &self,
        name: &str,
        parent_id: &str,
    ) -> DriveResult<RemoteFolder> {
        self.find_or_create(name, parent_id, Some(parent_id)).await
    }

    /// Resolve the folder for one entity under `parent_id`.
    ///
    /// 1. `known_id`, if it still exists, is not trashed and sits under `parent_id`.
    /// 2. A search by sanitized name under `parent_id`; among several matches the
    ///    one whose id equals `known_id` wins, otherwise the first returned.
    /// 3. A new folder with the sanitized name.
    pub async fn get_or_create_entity_folder(
        &self,
        entity_name: &str,
        parent_id: &str,
        known_id: Option<&str>,
    ) -> DriveResult<RemoteFolder> {
        if let Some(id) = known_id {
            if let Some(folder) = self.verify_folder(id, Some(parent_id)).await? {
                tracing::debug!(folder_id = %folder.id, "Reusing known entity folder");
                return Ok(folder);
            }
            tracing::info!(
                folder_id = %id,
                parent_id = %parent_id,
                "Known entity folder is gone or moved, resolving by name"
            );
        }

        let name = sanitize_folder_name(entity_name);
        let matches = self
            .client
            .list(&DriveQuery::folders().name(&name).in_parent(parent_id))
            .await?;

        if matches.len() > 1 {
            tracing::warn!(
                name = %name,
                parent_id = %parent_id,
                count = matches.len(),
                "Multiple entity folders share a name"
            );
        }

        let preferred = known_id
            .and_then(|id| matches.iter().position(|m| m.id == id))
            .unwrap_or(0);
        if let Some(found) = matches.into_iter().nth(preferred) {
            return Ok(with_parent(found, parent_id));
        }

        self.create(&name, Some(parent_id)).await
    }

    /// Fetch `id` and return it if it is a live folder (under `parent_id`, when given).
    ///
    /// A missing or otherwise unreadable id is `None`; session errors propagate.
    pub async fn verify_folder(
        &self,
        id: &str,
        parent_id: Option<&str>,
    ) -> DriveResult<Option<RemoteFolder>> {
        let object = match self.client.get(id).await {
            Ok(object) => object,
            Err(err) if err.requires_reconnect() => return Err(err),
            Err(DriveError::NotFound(_)) => return Ok(None),
            Err(err) => {
                tracing::warn!(folder_id = %id, error = %err, "Folder lookup failed");
                return Ok(None);
            }
        };

        if object.trashed || !object.is_folder() {
            return Ok(None);
        }
        if let Some(parent) = parent_id {
            if !object.has_parent(parent) {
                return Ok(None);
            }
        }
        Ok(Some(object.into_folder()))
    }

    /// Resolve root, section and entity folders in one chain.
    ///
    /// `known_root_id` (the configured root) and `known_section_id` are reused
    /// when they still point at live folders.
    pub async fn resolve_entity_path(
        &self,
        root_name: &str,
        known_root_id: Option<&str>,
        section_name: &str,
        known_section_id: Option<&str>,
        entity_name: &str,
        known_entity_id: Option<&str>,
    ) -> DriveResult<EntityPath> {
        let root = match known_root_id {
            Some(id) => match self.verify_folder(id, None).await? {
                Some(folder) => folder,
                None => self.get_or_create_root_folder(root_name).await?,
            },
            None => self.get_or_create_root_folder(root_name).await?,
        };

        let section = match known_section_id {
            Some(id) => match self.verify_folder(id, Some(&root.id)).await? {
                Some(folder) => folder,
                None => self.get_or_create_section_folder(section_name, &root.id).await?,
            },
            None => self.get_or_create_section_folder(section_name, &root.id).await?,
        };

        let entity = self
            .get_or_create_entity_folder(entity_name, &section.id, known_entity_id)
            .await?;

        Ok(EntityPath {
            root,
            section,
            entity,
        })
    }

    async fn find_or_create(
        &self,
        name: &str,
        search_parent: &str,
        create_parent: Option<&str>,
    ) -> DriveResult<RemoteFolder> {
        let matches = self
            .client
            .list(&DriveQuery::folders().name(name).in_parent(search_parent))
            .await?;

        if let Some(found) = matches.into_iter().next() {
            return Ok(with_parent(found, search_parent));
        }

        self.create(name, create_parent).await
    }

    async fn create(&self, name: &str, parent_id: Option<&str>) -> DriveResult<RemoteFolder> {
        let created = self.client.create_folder(name, parent_id).await?;
        tracing::info!(
            folder_id = %created.id,
            name = %name,
            parent_id = parent_id.unwrap_or(STORE_ROOT),
            "Created remote folder"
        );
        let parent = parent_id.unwrap_or(STORE_ROOT);
        Ok(with_parent(created, parent))
    }
}

/// Folders resolved for one entity, outermost first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityPath {
    pub root: RemoteFolder,
    pub section: RemoteFolder,
    pub entity: RemoteFolder,
}

// Responses may omit `parents`; the folder was searched or created there.
fn with_parent(object: DriveObject, parent_id: &str) -> RemoteFolder {
    let mut folder = object.into_folder();
    if folder.parent_id.is_none() {
        folder.parent_id = Some(parent_id.to_string());
    }
    folder
}
