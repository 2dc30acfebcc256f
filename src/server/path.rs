//! Folder path resolution
//!
//! Produces the root-first chain of folders leading to a folder, for
//! breadcrumbs. Under a shareable link the chain starts at the linked entry.

use std::sync::Arc;

use tracing::debug;

use super::permissions::SetPermissions;
use super::policy::{now_secs, within_link_scope, FolderPolicy};
use super::store::MemoryStore;
use crate::drive::{DriveError, DriveFolder};

pub struct FolderPathResolver {
    store: Arc<MemoryStore>,
}

impl FolderPathResolver {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }

    /// Resolve the path of the folder addressed by `hash` (or numeric id)
    ///
    /// # Errors
    /// * `NotFound` when the folder or the link does not exist
    /// * `Forbidden` when the viewer or link may not see the folder
    pub fn resolve(
        &self,
        hash: &str,
        link_token: Option<&str>,
        viewer: Option<u64>,
    ) -> Result<Vec<DriveFolder>, DriveError> {
        let folder = self
            .store
            .find_folder(hash)
            .ok_or_else(|| DriveError::NotFound(format!("Folder {} not found", hash)))?;

        let link = match link_token {
            Some(token) => Some(
                self.store
                    .find_link(token)
                    .ok_or_else(|| DriveError::NotFound(format!("Shareable link {} not found", token)))?,
            ),
            None => None,
        };

        FolderPolicy::show(viewer, &folder, link.as_ref(), now_secs())?;

        let mut path = self.store.all_parents(&folder);
        path.push(folder);

        let path: Vec<DriveFolder> = path
            .into_iter()
            // only the part of the path the link is for
            .filter(|f| link.as_ref().map_or(true, |l| within_link_scope(&f.path, l)))
            .map(|f| SetPermissions::execute(f, viewer, link.as_ref()))
            .collect();

        debug!(folder = %hash, link = ?link_token, depth = path.len(), "Resolved folder path");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drive::hash::encode_hash;
    use crate::drive::{DriveEntryPermissions, EntryPermissions, ShareableLink};
    use crate::server::store::{Grant, Snapshot, StoredEntry, User};

    fn resolver() -> FolderPathResolver {
        FolderPathResolver::new(Arc::new(MemoryStore::demo()))
    }

    fn ids(path: &[DriveFolder]) -> Vec<u64> {
        path.iter().map(|f| f.id).collect()
    }

    #[test]
    fn test_path_is_root_first_and_ends_with_folder() {
        let path = resolver().resolve(&encode_hash(3), None, Some(1)).unwrap();
        assert_eq!(ids(&path), vec![1, 2, 3]);
        assert!(path.iter().all(|f| f.permissions == EntryPermissions::ALL));
        assert!(path.iter().all(|f| !f.users.is_empty()), "users are attached");
    }

    #[test]
    fn test_root_folder_path_is_itself() {
        let path = resolver().resolve("1", None, Some(1)).unwrap();
        assert_eq!(ids(&path), vec![1]);
    }

    #[test]
    fn test_link_drops_ancestors_above_scope() {
        let path = resolver()
            .resolve(&encode_hash(3), Some("prjLink1"), None)
            .unwrap();
        assert_eq!(ids(&path), vec![2, 3]);
        for folder in &path {
            assert!(folder.path.contains('2'));
            assert!(folder.permissions.download);
            assert!(!folder.permissions.update);
        }
    }

    #[test]
    fn test_missing_folder_is_not_found() {
        let err = resolver().resolve(&encode_hash(404), None, Some(1)).unwrap_err();
        assert!(matches!(err, DriveError::NotFound(_)));

        // files are not folders
        let err = resolver().resolve("4", None, Some(1)).unwrap_err();
        assert!(matches!(err, DriveError::NotFound(_)));
    }

    #[test]
    fn test_missing_link_is_not_found() {
        let err = resolver()
            .resolve(&encode_hash(3), Some("nope"), Some(1))
            .unwrap_err();
        assert!(matches!(err, DriveError::NotFound(_)));
    }

    #[test]
    fn test_link_not_covering_folder_is_forbidden() {
        let err = resolver()
            .resolve(&encode_hash(5), Some("prjLink1"), None)
            .unwrap_err();
        assert!(matches!(err, DriveError::Forbidden(_)));
    }

    #[test]
    fn test_owner_with_link_not_covering_folder_is_forbidden() {
        let err = resolver()
            .resolve(&encode_hash(5), Some("prjLink1"), Some(1))
            .unwrap_err();
        assert!(matches!(err, DriveError::Forbidden(_)));
    }

    #[test]
    fn test_stranger_is_forbidden() {
        let err = resolver().resolve(&encode_hash(3), None, Some(2)).unwrap_err();
        assert!(matches!(err, DriveError::Forbidden(_)));
    }

    #[test]
    fn test_permissions_follow_the_viewer() {
        let mut snapshot = MemoryStore::demo().snapshot();
        for entry in snapshot.entries.iter_mut().filter(|e| e.id <= 3) {
            entry.grants.retain(|g| g.user_id != 2);
            entry.grants.push(Grant {
                user_id: 2,
                owner: false,
                permissions: DriveEntryPermissions {
                    edit: None,
                    view: Some(true),
                    download: Some(true),
                },
            });
        }
        let resolver = FolderPathResolver::new(Arc::new(MemoryStore::new(snapshot)));

        let as_owner = resolver.resolve("3", None, Some(1)).unwrap();
        let as_bob = resolver.resolve("3", None, Some(2)).unwrap();
        assert_eq!(ids(&as_owner), ids(&as_bob));
        assert!(as_owner.iter().all(|f| f.permissions.update));
        assert!(as_bob.iter().all(|f| !f.permissions.update && f.permissions.download));
    }

    #[test]
    fn test_order_preserved_when_filtering() {
        let snapshot = Snapshot {
            users: vec![User {
                id: 1,
                email: "a@example.com".to_string(),
                name: "A".to_string(),
                image: None,
            }],
            entries: (10..=14)
                .map(|id| StoredEntry {
                    id,
                    name: format!("f{}", id),
                    path: (10..=id).map(|i| i.to_string()).collect::<Vec<_>>().join("/"),
                    kind: "folder".to_string(),
                    parent_id: (id > 10).then(|| id - 1),
                    workspace_id: None,
                    file_size: 0,
                    mime: None,
                    tags: vec![],
                    grants: vec![],
                    created_at: None,
                    updated_at: None,
                    deleted_at: None,
                })
                .collect(),
            links: vec![ShareableLink {
                id: 1,
                hash: "mid".to_string(),
                entry_id: 12,
                user_id: None,
                allow_download: false,
                allow_edit: false,
                expires_at: None,
            }],
        };
        let resolver = FolderPathResolver::new(Arc::new(MemoryStore::new(snapshot)));
        let path = resolver.resolve("14", Some("mid"), None).unwrap();
        assert_eq!(ids(&path), vec![12, 13, 14]);
    }
}
