//! Drive API types
//!
//! Wire types shared by the drive client and the drive server.

use serde::{Deserialize, Deserializer, Serialize};

/// Deserialize a number that might be encoded as a string or null.
/// The drive API returns some numeric columns (sizes, totals) as strings
/// and may return null for folders.
fn deserialize_flexible_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de;

    struct FlexibleU64Visitor;

    impl<'de> de::Visitor<'de> for FlexibleU64Visitor {
        type Value = u64;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a u64, a string containing a u64, or null")
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<u64, E> {
            Ok(value)
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<u64, E> {
            u64::try_from(value).map_err(|_| de::Error::custom("negative value for u64"))
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<u64, E> {
            value.parse::<u64>().map_err(de::Error::custom)
        }

        fn visit_none<E: de::Error>(self) -> Result<u64, E> {
            Ok(0)
        }

        fn visit_unit<E: de::Error>(self) -> Result<u64, E> {
            Ok(0)
        }
    }

    deserializer.deserialize_any(FlexibleU64Visitor)
}

/// Entry type string used for folders
pub const FOLDER_TYPE: &str = "folder";

/// Viewer-specific permissions attached to every entry the API returns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryPermissions {
    #[serde(rename = "files.create", default)]
    pub create: bool,
    #[serde(rename = "files.update", default)]
    pub update: bool,
    #[serde(rename = "files.delete", default)]
    pub delete: bool,
    #[serde(rename = "files.download", default)]
    pub download: bool,
}

impl EntryPermissions {
    pub const NONE: Self = Self {
        create: false,
        update: false,
        delete: false,
        download: false,
    };

    pub const ALL: Self = Self {
        create: true,
        update: true,
        delete: true,
        download: true,
    };
}

/// Per-user grant on an entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveEntryPermissions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edit: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download: Option<bool>,
}

impl DriveEntryPermissions {
    pub const FULL: Self = Self {
        edit: Some(true),
        view: Some(true),
        download: Some(true),
    };

    pub fn can_edit(&self) -> bool {
        self.edit.unwrap_or(false)
    }

    pub fn can_view(&self) -> bool {
        self.view.unwrap_or(false) || self.can_edit() || self.can_download()
    }

    pub fn can_download(&self) -> bool {
        self.download.unwrap_or(false) || self.can_edit()
    }
}

/// A user attached to an entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveEntryUser {
    pub id: u64,
    pub email: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub owns_entry: bool,
    #[serde(default)]
    pub entry_permissions: DriveEntryPermissions,
}

/// Tag attached to an entry ("starred" is the one the drive cares about)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: u64,
    pub name: String,
}

/// A file or folder record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriveEntry {
    pub id: u64,
    pub name: String,
    pub hash: String,
    /// Ids from the root down to this entry, joined by `/`
    pub path: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub parent_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_id: Option<u64>,
    #[serde(default, deserialize_with = "deserialize_flexible_u64")]
    pub file_size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime: Option<String>,
    #[serde(default)]
    pub users: Vec<DriveEntryUser>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub permissions: EntryPermissions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<String>,
}

/// A drive entry whose type is `folder`
pub type DriveFolder = DriveEntry;

impl DriveEntry {
    /// Check if this entry represents a folder
    pub fn is_folder(&self) -> bool {
        self.kind == FOLDER_TYPE
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn is_starred(&self) -> bool {
        self.tags.iter().any(|t| t.name == "starred")
    }

    /// Ids along the stored path, root first
    pub fn path_ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.path
            .split('/')
            .filter(|s| !s.is_empty())
            .filter_map(|s| s.parse().ok())
    }

    /// The attached user that owns this entry
    pub fn owner(&self) -> Option<&DriveEntryUser> {
        self.users.iter().find(|u| u.owns_entry)
    }

    pub fn user(&self, user_id: u64) -> Option<&DriveEntryUser> {
        self.users.iter().find(|u| u.id == user_id)
    }
}

/// A token-addressable reference to one entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareableLink {
    pub id: u64,
    pub hash: String,
    pub entry_id: u64,
    #[serde(default)]
    pub user_id: Option<u64>,
    #[serde(default)]
    pub allow_download: bool,
    #[serde(default)]
    pub allow_edit: bool,
    /// Expiry as unix seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<u64>,
}

impl ShareableLink {
    pub fn is_expired(&self, now: u64) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// One page of entries from `GET /drive/file-entries`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntriesPaginationResponse {
    pub data: Vec<DriveEntry>,
    #[serde(deserialize_with = "deserialize_flexible_u64")]
    pub current_page: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_page: Option<u64>,
    #[serde(default, deserialize_with = "deserialize_flexible_u64")]
    pub per_page: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<DriveFolder>,
}

impl EntriesPaginationResponse {
    /// Whether the listing has more results after this page
    pub fn has_next_page(&self) -> bool {
        self.next_page.is_some() || self.last_page.is_some_and(|last| last > self.current_page)
    }
}

/// Body of `GET /drive/folders/{hash}/path`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderPathResponse {
    pub path: Vec<DriveFolder>,
}

/// Body of `GET /drive/file-entries/{id}/model`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryModelResponse {
    pub file_entry: DriveEntry,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_folder_entry() {
        let json = r#"{
            "id": 5,
            "name": "Photos",
            "hash": "NXxwYWRkaW5ncA",
            "path": "1/5",
            "type": "folder",
            "parent_id": 1,
            "file_size": null,
            "users": [{
                "id": 1,
                "email": "owner@example.com",
                "name": "Owner",
                "owns_entry": true,
                "entry_permissions": {"edit": true, "view": true, "download": true}
            }],
            "tags": [{"id": 1, "name": "starred"}],
            "permissions": {
                "files.create": true,
                "files.update": true,
                "files.delete": false,
                "files.download": true
            }
        }"#;
        let entry: DriveEntry = serde_json::from_str(json).unwrap();
        assert!(entry.is_folder());
        assert!(entry.is_starred());
        assert_eq!(entry.file_size, 0);
        assert_eq!(entry.path_ids().collect::<Vec<_>>(), vec![1, 5]);
        assert_eq!(entry.owner().map(|u| u.id), Some(1));
        assert!(entry.permissions.create);
        assert!(!entry.permissions.delete);
    }

    #[test]
    fn test_permissions_serialize_dotted_names() {
        let json = serde_json::to_string(&EntryPermissions::ALL).unwrap();
        assert!(json.contains("\"files.create\":true"));
        assert!(json.contains("\"files.download\":true"));
    }

    #[test]
    fn test_deserialize_page_with_string_numbers() {
        let json = r#"{
            "data": [],
            "current_page": "2",
            "last_page": 3,
            "per_page": "50",
            "total": 120
        }"#;
        let page: EntriesPaginationResponse = serde_json::from_str(json).unwrap();
        assert_eq!(page.current_page, 2);
        assert_eq!(page.per_page, 50);
        assert!(page.has_next_page());
        assert!(page.folder.is_none());
    }

    #[test]
    fn test_has_next_page() {
        let mut page = EntriesPaginationResponse {
            data: vec![],
            current_page: 3,
            last_page: Some(3),
            per_page: 50,
            total: Some(150),
            from: None,
            to: None,
            next_page: None,
            folder: None,
        };
        assert!(!page.has_next_page());

        page.next_page = Some(4);
        assert!(page.has_next_page());

        page.next_page = None;
        page.last_page = None;
        assert!(!page.has_next_page());
    }

    #[test]
    fn test_entry_user_grants() {
        let edit_only = DriveEntryPermissions {
            edit: Some(true),
            view: None,
            download: None,
        };
        assert!(edit_only.can_view());
        assert!(edit_only.can_download());

        let view_only = DriveEntryPermissions {
            edit: None,
            view: Some(true),
            download: Some(false),
        };
        assert!(view_only.can_view());
        assert!(!view_only.can_download());
        assert!(!view_only.can_edit());
    }

    #[test]
    fn test_link_expiry() {
        let link = ShareableLink {
            id: 1,
            hash: "abc".to_string(),
            entry_id: 5,
            user_id: Some(1),
            allow_download: true,
            allow_edit: false,
            expires_at: Some(100),
        };
        assert!(!link.is_expired(99));
        assert!(link.is_expired(100));
    }
}
