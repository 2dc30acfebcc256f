//! Listing parameters
//!
//! Assembles the query parameters for `GET /drive/file-entries` from the
//! active page, URL search parameters, workspace and sort order.

use std::collections::BTreeMap;

use crate::cache::{DriveQueryKeys, QueryKey};
use crate::state::{DrivePage, SortDescriptor};

/// Canonical parameter set of one listing context
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexParams {
    values: BTreeMap<String, String>,
}

impl IndexParams {
    /// Merge the listing inputs; later sources override earlier ones:
    /// section, page params, URL search params, folder, workspace, sort.
    pub fn assemble(
        page: Option<&DrivePage>,
        search_params: &BTreeMap<String, String>,
        workspace_id: Option<u64>,
        sort: SortDescriptor,
    ) -> Self {
        let mut values = BTreeMap::new();

        if let Some(page) = page {
            values.insert("section".to_string(), page.name.clone());
            values.extend(page.query_params.clone());
        }
        values.extend(search_params.clone());

        match page {
            Some(page) if page.is_folder_page => {
                values.insert("folderId".to_string(), page.unique_id.clone());
            }
            _ => {
                values.remove("folderId");
            }
        }

        match workspace_id {
            Some(id) => {
                values.insert("workspaceId".to_string(), id.to_string());
            }
            None => {
                values.remove("workspaceId");
            }
        }

        values.insert("orderBy".to_string(), sort.order_by.as_str().to_string());
        values.insert("orderDir".to_string(), sort.order_dir.as_str().to_string());

        Self { values }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Non-empty value of `name`
    fn present(&self, name: &str) -> Option<&str> {
        self.get(name).filter(|v| !v.trim().is_empty())
    }

    pub fn query(&self) -> Option<&str> {
        self.present("query")
    }

    pub fn filters(&self) -> Option<&str> {
        self.present("filters")
    }

    /// Request parameters for one page of this listing
    pub fn for_page(&self, page: u64) -> BTreeMap<String, String> {
        let mut values = self.values.clone();
        values.insert("page".to_string(), page.to_string());
        values
    }

    /// Cache identity of this listing
    pub fn query_key(&self) -> QueryKey {
        DriveQueryKeys::fetch_entries(&self.values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{SortColumn, SortDirection};

    fn search(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_folder_page_params() {
        let page = DrivePage::folder_hash("abc");
        let params = IndexParams::assemble(Some(&page), &BTreeMap::new(), Some(3), SortDescriptor::default());

        assert_eq!(params.get("section"), Some("folder"));
        assert_eq!(params.get("folderId"), Some("abc"));
        assert_eq!(params.get("workspaceId"), Some("3"));
        assert_eq!(params.get("orderBy"), Some("updated_at"));
        assert_eq!(params.get("orderDir"), Some("desc"));
    }

    #[test]
    fn test_later_sources_override() {
        let page = DrivePage::trash();
        let sort = SortDescriptor {
            order_by: SortColumn::Name,
            order_dir: SortDirection::Asc,
        };
        // URL params cannot smuggle in a folder or override the sort
        let url = search(&[("folderId", "9"), ("orderBy", "type"), ("deletedOnly", "false")]);
        let params = IndexParams::assemble(Some(&page), &url, None, sort);

        assert_eq!(params.get("folderId"), None);
        assert_eq!(params.get("orderBy"), Some("name"));
        assert_eq!(params.get("deletedOnly"), Some("false"));
        assert_eq!(params.get("workspaceId"), None);
    }

    #[test]
    fn test_equal_inputs_give_equal_keys() {
        let page = DrivePage::search();
        let a = IndexParams::assemble(
            Some(&page),
            &search(&[("query", "cat"), ("filters", "x")]),
            Some(1),
            SortDescriptor::default(),
        );
        let b = IndexParams::assemble(
            Some(&page),
            &search(&[("filters", "x"), ("query", "cat")]),
            Some(1),
            SortDescriptor::default(),
        );
        assert_eq!(a.query_key(), b.query_key());
    }

    #[test]
    fn test_for_page_does_not_change_key() {
        let params = IndexParams::assemble(
            Some(&DrivePage::recent()),
            &BTreeMap::new(),
            None,
            SortDescriptor::default(),
        );
        let request = params.for_page(2);
        assert_eq!(request.get("page").map(String::as_str), Some("2"));
        assert!(params.get("page").is_none());
    }

    #[test]
    fn test_blank_query_is_absent() {
        let params = IndexParams::assemble(
            Some(&DrivePage::search()),
            &search(&[("query", "  ")]),
            None,
            SortDescriptor::default(),
        );
        assert_eq!(params.query(), None);
        assert_eq!(params.filters(), None);
    }
}
