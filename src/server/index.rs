//! Entry listing
//!
//! Serves `GET /drive/file-entries`: filters the entries the viewer can see,
//! orders them folders-first and cuts out the requested page.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use tracing::debug;

use super::permissions::SetPermissions;
use super::policy::{now_secs, FolderPolicy};
use super::store::MemoryStore;
use crate::drive::{DriveEntry, DriveError, DriveFolder, EntriesPaginationResponse};
use crate::state::page::ROOT_FOLDER_ID;
use crate::state::{SortColumn, SortDirection};

/// Page size when the request names none
pub const DEFAULT_PER_PAGE: u64 = 50;

const MAX_PER_PAGE: u64 = 1000;

/// One condition from the base64-encoded `filters` parameter
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EntryFilter {
    pub key: String,
    pub value: serde_json::Value,
    #[serde(default = "default_operator")]
    pub operator: String,
}

fn default_operator() -> String {
    "=".to_string()
}

impl EntryFilter {
    fn matches(&self, entry: &DriveEntry) -> Result<bool, DriveError> {
        let equal = match self.key.as_str() {
            "type" => self.value.as_str() == Some(entry.kind.as_str()),
            "owner_id" => entry.owner().map(|u| u.id) == self.value.as_u64(),
            other => {
                return Err(DriveError::BadRequest(format!("Unknown filter: {}", other)));
            }
        };
        match self.operator.as_str() {
            "=" => Ok(equal),
            "!=" => Ok(!equal),
            other => Err(DriveError::BadRequest(format!("Unknown filter operator: {}", other))),
        }
    }
}

/// Parsed listing request
#[derive(Debug, Clone, PartialEq)]
pub struct IndexQuery {
    pub folder_id: Option<String>,
    pub query: Option<String>,
    pub filters: Vec<EntryFilter>,
    pub deleted_only: bool,
    pub starred_only: bool,
    pub shared_only: bool,
    pub recent_only: bool,
    pub workspace_id: Option<u64>,
    pub order_by: SortColumn,
    pub order_dir: SortDirection,
    pub per_page: u64,
    pub page: u64,
}

impl IndexQuery {
    pub fn parse(params: &BTreeMap<String, String>) -> Result<Self, DriveError> {
        let text = |name: &str| {
            params
                .get(name)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(String::from)
        };
        let flag = |name: &str| matches!(params.get(name).map(String::as_str), Some("true" | "1"));
        let number = |name: &str| -> Result<Option<u64>, DriveError> {
            text(name)
                .map(|v| {
                    v.parse::<u64>()
                        .map_err(|_| DriveError::BadRequest(format!("{} must be a number", name)))
                })
                .transpose()
        };

        let order_by = match text("orderBy") {
            Some(v) => SortColumn::parse(&v)
                .ok_or_else(|| DriveError::BadRequest(format!("Cannot order by {}", v)))?,
            None => SortColumn::default(),
        };
        let order_dir = match text("orderDir") {
            Some(v) => SortDirection::parse(&v)
                .ok_or_else(|| DriveError::BadRequest(format!("Invalid order direction {}", v)))?,
            None => SortDirection::default(),
        };

        let page = number("page")?.unwrap_or(1);
        if page == 0 {
            return Err(DriveError::BadRequest("page starts at 1".to_string()));
        }

        Ok(Self {
            folder_id: text("folderId"),
            query: text("query"),
            filters: text("filters").map(|f| decode_filters(&f)).transpose()?.unwrap_or_default(),
            deleted_only: flag("deletedOnly"),
            starred_only: flag("starredOnly"),
            shared_only: flag("sharedOnly"),
            recent_only: flag("recentOnly"),
            workspace_id: number("workspaceId")?,
            order_by,
            order_dir,
            per_page: number("perPage")?
                .unwrap_or(DEFAULT_PER_PAGE)
                .clamp(1, MAX_PER_PAGE),
            page,
        })
    }

    /// Whether this lists the children of one folder, the root when no
    /// `folderId` is given
    fn is_folder_listing(&self) -> bool {
        self.query.is_none()
            && self.filters.is_empty()
            && !(self.deleted_only || self.starred_only || self.shared_only || self.recent_only)
    }
}

fn decode_filters(raw: &str) -> Result<Vec<EntryFilter>, DriveError> {
    let json = STANDARD
        .decode(raw)
        .map_err(|e| DriveError::BadRequest(format!("filters are not base64: {}", e)))?;
    serde_json::from_slice(&json)
        .map_err(|e| DriveError::BadRequest(format!("filters are not valid: {}", e)))
}

pub struct EntryIndex {
    store: Arc<MemoryStore>,
}

impl EntryIndex {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }

    /// List one page of the entries `viewer` can see
    pub fn list(
        &self,
        params: &BTreeMap<String, String>,
        viewer: Option<u64>,
    ) -> Result<EntriesPaginationResponse, DriveError> {
        let query = IndexQuery::parse(params)?;

        let (parent_id, folder) = if query.is_folder_listing() {
            self.resolve_folder(query.folder_id.as_deref().unwrap_or(ROOT_FOLDER_ID), viewer)?
        } else {
            (None, None)
        };

        let mut matched = Vec::new();
        for entry in self.store.entries() {
            if !visible_to(&entry, viewer) || !self.matches(&query, &entry, parent_id)? {
                continue;
            }
            matched.push(entry);
        }

        matched.sort_by(|a, b| compare(a, b, query.order_by, query.order_dir));

        let total = matched.len() as u64;
        let last_page = total.div_ceil(query.per_page).max(1);
        let skip = (query.page - 1)
            .checked_mul(query.per_page)
            .ok_or_else(|| DriveError::BadRequest(format!("page {} is out of range", query.page)))?;
        let data: Vec<DriveEntry> = matched
            .into_iter()
            .skip(skip as usize)
            .take(query.per_page as usize)
            .map(|e| SetPermissions::execute(e, viewer, None))
            .collect();

        debug!(
            total = total,
            page = query.page,
            returned = data.len(),
            folder = ?folder.as_ref().map(|f| f.id),
            "Listed entries"
        );

        let (from, to) = if data.is_empty() {
            (None, None)
        } else {
            (Some(skip + 1), Some(skip + data.len() as u64))
        };

        Ok(EntriesPaginationResponse {
            data,
            current_page: query.page,
            last_page: Some(last_page),
            per_page: query.per_page,
            total: Some(total),
            from,
            to,
            next_page: (query.page < last_page).then_some(query.page + 1),
            folder,
        })
    }

    /// Parent id to list under, and the folder to embed
    fn resolve_folder(
        &self,
        folder_id: &str,
        viewer: Option<u64>,
    ) -> Result<(Option<u64>, Option<DriveFolder>), DriveError> {
        if folder_id == ROOT_FOLDER_ID {
            return Ok((None, None));
        }
        let folder = self
            .store
            .find_folder(folder_id)
            .ok_or_else(|| DriveError::NotFound(format!("Folder {} not found", folder_id)))?;
        FolderPolicy::show(viewer, &folder, None, now_secs())?;
        let folder = SetPermissions::execute(folder, viewer, None);
        Ok((Some(folder.id), Some(folder)))
    }

    fn matches(
        &self,
        query: &IndexQuery,
        entry: &DriveEntry,
        parent_id: Option<u64>,
    ) -> Result<bool, DriveError> {
        if entry.workspace_id != query.workspace_id {
            return Ok(false);
        }
        if entry.is_deleted() != query.deleted_only {
            return Ok(false);
        }
        if query.is_folder_listing() && entry.parent_id != parent_id {
            return Ok(false);
        }
        if query.starred_only && !entry.is_starred() {
            return Ok(false);
        }
        if query.shared_only && entry.users.len() < 2 {
            return Ok(false);
        }
        if query.recent_only && entry.is_folder() {
            return Ok(false);
        }
        if let Some(term) = &query.query {
            if !entry.name.to_lowercase().contains(&term.to_lowercase()) {
                return Ok(false);
            }
        }
        for filter in &query.filters {
            if !filter.matches(entry)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

fn visible_to(entry: &DriveEntry, viewer: Option<u64>) -> bool {
    viewer
        .and_then(|id| entry.user(id))
        .is_some_and(|u| u.owns_entry || u.entry_permissions.can_view())
}

/// Folders first, then the requested column, then id
fn compare(a: &DriveEntry, b: &DriveEntry, order_by: SortColumn, dir: SortDirection) -> Ordering {
    let folders_first = b.is_folder().cmp(&a.is_folder());
    let by_column = match order_by {
        SortColumn::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        SortColumn::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        SortColumn::CreatedAt => a.created_at.cmp(&b.created_at),
        SortColumn::FileSize => a.file_size.cmp(&b.file_size),
        SortColumn::Type => a.kind.cmp(&b.kind),
    };
    let by_column = match dir {
        SortDirection::Asc => by_column,
        SortDirection::Desc => by_column.reverse(),
    };
    folders_first.then(by_column).then(a.id.cmp(&b.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drive::hash::encode_hash;
    use crate::drive::EntryPermissions;

    fn index() -> EntryIndex {
        EntryIndex::new(Arc::new(MemoryStore::demo()))
    }

    fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn ids(page: &EntriesPaginationResponse) -> Vec<u64> {
        page.data.iter().map(|e| e.id).collect()
    }

    #[test]
    fn test_root_listing_folders_first() {
        let page = index()
            .list(&params(&[("folderId", "0"), ("orderBy", "name"), ("orderDir", "asc")]), Some(1))
            .unwrap();
        // Documents, Photos; old.txt is in the trash
        assert_eq!(ids(&page), vec![1, 5]);
        assert!(page.folder.is_none());
        assert!(page.data.iter().all(|e| e.permissions == EntryPermissions::ALL));
    }

    #[test]
    fn test_missing_folder_id_lists_root() {
        let index = index();
        let implicit = index.list(&BTreeMap::new(), Some(1)).unwrap();
        let explicit = index.list(&params(&[("folderId", "0")]), Some(1)).unwrap();
        assert_eq!(ids(&implicit), ids(&explicit));
        assert!(ids(&implicit).iter().all(|id| [1, 5].contains(id)));
    }

    #[test]
    fn test_folder_listing_embeds_folder() {
        let hash = encode_hash(2);
        let page = index().list(&params(&[("folderId", &hash)]), Some(1)).unwrap();
        assert_eq!(ids(&page), vec![3]);
        let folder = page.folder.unwrap();
        assert_eq!(folder.hash, hash);
        assert_eq!(folder.permissions, EntryPermissions::ALL);
    }

    #[test]
    fn test_folder_listing_errors() {
        let err = index().list(&params(&[("folderId", "999")]), Some(1)).unwrap_err();
        assert!(matches!(err, DriveError::NotFound(_)));

        let err = index().list(&params(&[("folderId", "2")]), Some(2)).unwrap_err();
        assert!(matches!(err, DriveError::Forbidden(_)));
    }

    #[test]
    fn test_section_flags() {
        let index = index();
        let trash = index.list(&params(&[("deletedOnly", "true")]), Some(1)).unwrap();
        assert_eq!(ids(&trash), vec![7]);

        let starred = index.list(&params(&[("starredOnly", "true")]), Some(1)).unwrap();
        assert_eq!(ids(&starred), vec![6]);

        let shared = index.list(&params(&[("sharedOnly", "true")]), Some(1)).unwrap();
        assert_eq!(ids(&shared), vec![5, 1]);

        let recent = index
            .list(&params(&[("recentOnly", "true"), ("orderBy", "updated_at")]), Some(1))
            .unwrap();
        assert_eq!(ids(&recent), vec![6, 4]);
    }

    #[test]
    fn test_search_and_filters() {
        let index = index();
        let found = index.list(&params(&[("query", "NOTES")]), Some(1)).unwrap();
        assert_eq!(ids(&found), vec![4]);

        let filters = STANDARD.encode(r#"[{"key":"type","value":"image"}]"#);
        let images = index.list(&params(&[("filters", &filters)]), Some(1)).unwrap();
        assert_eq!(ids(&images), vec![6]);

        let bad = STANDARD.encode(r#"[{"key":"colour","value":"red"}]"#);
        assert!(matches!(
            index.list(&params(&[("filters", &bad)]), Some(1)),
            Err(DriveError::BadRequest(_))
        ));
    }

    #[test]
    fn test_viewer_only_sees_attached_entries() {
        let page = index().list(&params(&[("folderId", "0")]), Some(2)).unwrap();
        assert_eq!(ids(&page).len(), 2);
        // bob may view Documents but not download from it
        let documents = page.data.iter().find(|e| e.id == 1).unwrap();
        assert!(!documents.permissions.download);

        let guest = index().list(&params(&[("folderId", "0")]), None).unwrap();
        assert!(guest.data.is_empty());
        assert_eq!(guest.last_page, Some(1));
    }

    #[test]
    fn test_pagination_metadata() {
        let index = index();
        let first = index
            .list(&params(&[("query", "o"), ("perPage", "2"), ("orderBy", "name"), ("orderDir", "asc")]), Some(1))
            .unwrap();
        // Documents, Photos, Projects, notes.txt
        assert_eq!(first.total, Some(4));
        assert_eq!(first.last_page, Some(2));
        assert_eq!(first.next_page, Some(2));
        assert_eq!((first.from, first.to), (Some(1), Some(2)));
        assert!(first.has_next_page());

        let second = index
            .list(&params(&[("query", "o"), ("perPage", "2"), ("page", "2"), ("orderBy", "name"), ("orderDir", "asc")]), Some(1))
            .unwrap();
        assert_eq!(ids(&second), vec![2, 4]);
        assert!(!second.has_next_page());
    }

    #[test]
    fn test_invalid_params() {
        let index = index();
        let max_page = u64::MAX.to_string();
        for bad in [
            ("page", "0"),
            ("page", "x"),
            ("page", max_page.as_str()),
            ("orderBy", "size"),
            ("orderDir", "up"),
        ] {
            assert!(matches!(
                index.list(&params(&[bad]), Some(1)),
                Err(DriveError::BadRequest(_))
            ));
        }
    }
}
