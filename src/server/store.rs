//! In-memory entry repository
//!
//! Holds users, entries and shareable links loaded from a JSON snapshot.
//! Every lookup hands out entries with their users and tags already
//! attached, so filtering and permission steps never load anything lazily.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::drive::hash::{encode_hash, id_or_hash};
use crate::drive::{
    DriveEntry, DriveEntryPermissions, DriveEntryUser, DriveFolder, EntryPermissions,
    ShareableLink, Tag, FOLDER_TYPE,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub email: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// A user's attachment to an entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    pub user_id: u64,
    #[serde(default)]
    pub owner: bool,
    #[serde(default)]
    pub permissions: DriveEntryPermissions,
}

/// Entry row as persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEntry {
    pub id: u64,
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub parent_id: Option<u64>,
    #[serde(default)]
    pub workspace_id: Option<u64>,
    #[serde(default)]
    pub file_size: u64,
    #[serde(default)]
    pub mime: Option<String>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub grants: Vec<Grant>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub deleted_at: Option<String>,
}

/// Everything the store persists
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub entries: Vec<StoredEntry>,
    #[serde(default)]
    pub links: Vec<ShareableLink>,
}

/// Read-only entry repository
pub struct MemoryStore {
    users: HashMap<u64, User>,
    entries: HashMap<u64, StoredEntry>,
    links: Vec<ShareableLink>,
}

impl MemoryStore {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            users: snapshot.users.into_iter().map(|u| (u.id, u)).collect(),
            entries: snapshot.entries.into_iter().map(|e| (e.id, e)).collect(),
            links: snapshot.links,
        }
    }

    /// Load a store from a JSON snapshot file
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read(path)
            .with_context(|| format!("Failed to read snapshot: {:?}", path))?;
        let snapshot: Snapshot = serde_json::from_slice(&raw)
            .with_context(|| format!("Failed to parse snapshot: {:?}", path))?;

        info!(
            path = %path.display(),
            users = snapshot.users.len(),
            entries = snapshot.entries.len(),
            links = snapshot.links.len(),
            "Loaded drive snapshot"
        );
        Ok(Self::new(snapshot))
    }

    /// Write the store to `path` atomically
    pub fn persist(&self, path: &Path) -> Result<()> {
        let parent = path.parent().unwrap_or(Path::new("."));
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create snapshot directory: {:?}", parent))?;

        let json = serde_json::to_vec_pretty(&self.snapshot()).context("Failed to encode snapshot")?;

        let mut tmp = tempfile::NamedTempFile::new_in(parent)
            .context("Failed to create temp file for snapshot")?;
        tmp.write_all(&json).context("Failed to write snapshot")?;
        tmp.persist(path)
            .with_context(|| format!("Failed to persist snapshot: {:?}", path))?;

        debug!(path = %path.display(), size = json.len(), "Stored drive snapshot");
        Ok(())
    }

    /// Current contents, ordered by id
    pub fn snapshot(&self) -> Snapshot {
        let mut users: Vec<User> = self.users.values().cloned().collect();
        users.sort_by_key(|u| u.id);
        let mut entries: Vec<StoredEntry> = self.entries.values().cloned().collect();
        entries.sort_by_key(|e| e.id);
        Snapshot {
            users,
            entries,
            links: self.links.clone(),
        }
    }

    /// Find an entry by numeric id or hash
    pub fn find_entry(&self, id_or_hash_value: &str) -> Option<DriveEntry> {
        self.find_entry_by_id(id_or_hash(id_or_hash_value)?)
    }

    pub fn find_entry_by_id(&self, id: u64) -> Option<DriveEntry> {
        self.entries.get(&id).map(|e| self.hydrate(e))
    }

    /// Find a folder by numeric id or hash
    pub fn find_folder(&self, id_or_hash_value: &str) -> Option<DriveFolder> {
        self.find_entry(id_or_hash_value).filter(|e| e.is_folder())
    }

    /// Find a shareable link by its token, falling back to its numeric id
    pub fn find_link(&self, token: &str) -> Option<ShareableLink> {
        self.links
            .iter()
            .find(|l| l.hash == token)
            .or_else(|| {
                let id: u64 = token.parse().ok()?;
                self.links.iter().find(|l| l.id == id)
            })
            .cloned()
    }

    /// Strict ancestors of `entry`, root first
    pub fn all_parents(&self, entry: &DriveEntry) -> Vec<DriveFolder> {
        entry
            .path_ids()
            .filter(|id| *id != entry.id)
            .filter_map(|id| self.find_entry_by_id(id))
            .filter(|e| e.is_folder())
            .collect()
    }

    /// Every entry, ordered by id
    pub fn entries(&self) -> Vec<DriveEntry> {
        let mut all: Vec<DriveEntry> = self.entries.values().map(|e| self.hydrate(e)).collect();
        all.sort_by_key(|e| e.id);
        all
    }

    /// Attach users and tags; permissions stay empty until annotated
    fn hydrate(&self, stored: &StoredEntry) -> DriveEntry {
        let users = stored
            .grants
            .iter()
            .filter_map(|grant| {
                let user = self.users.get(&grant.user_id)?;
                Some(DriveEntryUser {
                    id: user.id,
                    email: user.email.clone(),
                    name: user.name.clone(),
                    image: user.image.clone(),
                    owns_entry: grant.owner,
                    entry_permissions: if grant.owner {
                        DriveEntryPermissions::FULL
                    } else {
                        grant.permissions
                    },
                })
            })
            .collect();

        DriveEntry {
            id: stored.id,
            name: stored.name.clone(),
            hash: encode_hash(stored.id),
            path: stored.path.clone(),
            kind: stored.kind.clone(),
            parent_id: stored.parent_id,
            workspace_id: stored.workspace_id,
            file_size: stored.file_size,
            mime: stored.mime.clone(),
            users,
            tags: stored.tags.clone(),
            permissions: EntryPermissions::NONE,
            created_at: stored.created_at.clone(),
            updated_at: stored.updated_at.clone(),
            deleted_at: stored.deleted_at.clone(),
        }
    }

    /// Small drive used by `seed` and the tests
    ///
    /// ```text
    /// 1 Documents/            alice (owner), bob (view)
    /// 2   Projects/           link "prjLink1" (download allowed)
    /// 3     Rust/
    /// 4       notes.txt
    /// 5 Photos/               bob (edit)
    /// 6   cat.jpg             starred
    /// 7 old.txt               deleted
    /// ```
    pub fn demo() -> Self {
        let folder = |id: u64, name: &str, path: &str, parent: Option<u64>| StoredEntry {
            id,
            name: name.to_string(),
            path: path.to_string(),
            kind: FOLDER_TYPE.to_string(),
            parent_id: parent,
            workspace_id: None,
            file_size: 0,
            mime: None,
            tags: vec![],
            grants: vec![owner(1)],
            created_at: Some(format!("2024-01-0{}T10:00:00Z", id)),
            updated_at: Some(format!("2024-02-0{}T10:00:00Z", id)),
            deleted_at: None,
        };
        let file = |id: u64, name: &str, path: &str, parent: Option<u64>, kind: &str, size: u64| {
            StoredEntry {
                kind: kind.to_string(),
                file_size: size,
                ..folder(id, name, path, parent)
            }
        };

        let mut documents = folder(1, "Documents", "1", None);
        documents.grants.push(Grant {
            user_id: 2,
            owner: false,
            permissions: DriveEntryPermissions {
                edit: None,
                view: Some(true),
                download: Some(false),
            },
        });
        let mut photos = folder(5, "Photos", "5", None);
        photos.grants.push(Grant {
            user_id: 2,
            owner: false,
            permissions: DriveEntryPermissions {
                edit: Some(true),
                view: Some(true),
                download: Some(true),
            },
        });
        let mut cat = file(6, "cat.jpg", "5/6", Some(5), "image", 2048);
        cat.mime = Some("image/jpeg".to_string());
        cat.tags.push(Tag {
            id: 1,
            name: "starred".to_string(),
        });
        let mut old = file(7, "old.txt", "7", None, "text", 12);
        old.deleted_at = Some("2024-03-01T00:00:00Z".to_string());

        Self::new(Snapshot {
            users: vec![
                User {
                    id: 1,
                    email: "alice@example.com".to_string(),
                    name: "Alice".to_string(),
                    image: None,
                },
                User {
                    id: 2,
                    email: "bob@example.com".to_string(),
                    name: "Bob".to_string(),
                    image: None,
                },
            ],
            entries: vec![
                documents,
                folder(2, "Projects", "1/2", Some(1)),
                folder(3, "Rust", "1/2/3", Some(2)),
                file(4, "notes.txt", "1/2/3/4", Some(3), "text", 512),
                photos,
                cat,
                old,
            ],
            links: vec![ShareableLink {
                id: 1,
                hash: "prjLink1".to_string(),
                entry_id: 2,
                user_id: Some(1),
                allow_download: true,
                allow_edit: false,
                expires_at: None,
            }],
        })
    }
}

fn owner(user_id: u64) -> Grant {
    Grant {
        user_id,
        owner: true,
        permissions: DriveEntryPermissions::FULL,
    }
}
