//! Entry authorization
//!
//! Decides whether a viewer may see an entry, either directly through their
//! attachment to it or through a shareable link.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::drive::{DriveEntry, DriveError, ShareableLink};

/// Current time as unix seconds
pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Whether `path` lies within the link's scope.
///
/// Matches the link's entry id as a substring of the stored path.
pub fn within_link_scope(path: &str, link: &ShareableLink) -> bool {
    path.contains(&link.entry_id.to_string())
}

/// Authorization for viewing entries
pub struct FolderPolicy;

impl FolderPolicy {
    /// With a link, allow only when the link covers the entry. Without one,
    /// allow when the viewer is attached to it with any grant.
    pub fn show(
        viewer: Option<u64>,
        entry: &DriveEntry,
        link: Option<&ShareableLink>,
        now: u64,
    ) -> Result<(), DriveError> {
        if let Some(link) = link {
            if link.is_expired(now) {
                return Err(DriveError::Forbidden("Shareable link has expired".to_string()));
            }
            if entry.id == link.entry_id || within_link_scope(&entry.path, link) {
                return Ok(());
            }
            return Err(DriveError::Forbidden(format!(
                "Shareable link does not cover entry {}",
                entry.hash
            )));
        }

        let attached = viewer
            .and_then(|id| entry.user(id))
            .is_some_and(|u| u.owns_entry || u.entry_permissions.can_view());
        if attached {
            return Ok(());
        }

        Err(DriveError::Forbidden(format!(
            "Not allowed to view entry {}",
            entry.hash
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::store::MemoryStore;

    fn link(entry_id: u64, expires_at: Option<u64>) -> ShareableLink {
        ShareableLink {
            id: 9,
            hash: "tok".to_string(),
            entry_id,
            user_id: Some(1),
            allow_download: false,
            allow_edit: false,
            expires_at,
        }
    }

    #[test]
    fn test_attached_users_can_view() {
        let store = MemoryStore::demo();
        let documents = store.find_entry_by_id(1).unwrap();

        assert!(FolderPolicy::show(Some(1), &documents, None, 0).is_ok());
        assert!(FolderPolicy::show(Some(2), &documents, None, 0).is_ok());
        assert!(FolderPolicy::show(Some(3), &documents, None, 0).is_err());
        assert!(FolderPolicy::show(None, &documents, None, 0).is_err());
    }

    #[test]
    fn test_link_covers_descendants_only() {
        let store = MemoryStore::demo();
        let projects_link = link(2, None);

        let rust = store.find_entry_by_id(3).unwrap();
        assert!(FolderPolicy::show(None, &rust, Some(&projects_link), 0).is_ok());

        let photos = store.find_entry_by_id(5).unwrap();
        assert!(matches!(
            FolderPolicy::show(None, &photos, Some(&projects_link), 0),
            Err(DriveError::Forbidden(_))
        ));
    }

    #[test]
    fn test_link_outside_scope_ignores_viewer_access() {
        let store = MemoryStore::demo();
        let photos = store.find_entry_by_id(5).unwrap();
        assert!(FolderPolicy::show(Some(1), &photos, None, 0).is_ok());
        assert!(matches!(
            FolderPolicy::show(Some(1), &photos, Some(&link(2, None)), 0),
            Err(DriveError::Forbidden(_))
        ));
    }

    #[test]
    fn test_expired_link_is_forbidden() {
        let store = MemoryStore::demo();
        let rust = store.find_entry_by_id(3).unwrap();
        let expired = link(2, Some(100));
        assert!(FolderPolicy::show(None, &rust, Some(&expired), 100).is_err());
        assert!(FolderPolicy::show(None, &rust, Some(&expired), 99).is_ok());
    }

    #[test]
    fn test_scope_is_substring_match() {
        // id 2 also appears inside "12"
        assert!(within_link_scope("12/13", &link(2, None)));
        assert!(within_link_scope("1/2/3", &link(2, None)));
        assert!(!within_link_scope("1/3", &link(2, None)));
    }
}
