//! Drive pages
//!
//! A page is the listing context the drive is currently showing: a folder,
//! the search results, or one of the filtered sections.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::drive::DriveFolder;

/// Unique id of the root folder page
pub const ROOT_FOLDER_ID: &str = "0";

pub const SEARCH_PAGE_NAME: &str = "search";
pub const FOLDER_PAGE_NAME: &str = "folder";

/// The listing context backing the current view
#[derive(Debug, Clone, PartialEq)]
pub struct DrivePage {
    /// Section name sent as `section`
    pub name: String,
    /// Stable identity; the folder hash for folder pages
    pub unique_id: String,
    pub is_folder_page: bool,
    /// Extra listing parameters this page always sends
    pub query_params: BTreeMap<String, String>,
    /// Last known folder metadata for folder pages
    pub folder: Option<DriveFolder>,
}

impl DrivePage {
    fn section(name: &str, flag: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            unique_id: name.to_string(),
            is_folder_page: false,
            query_params: flag
                .map(|f| BTreeMap::from([(f.to_string(), "true".to_string())]))
                .unwrap_or_default(),
            folder: None,
        }
    }

    pub fn search() -> Self {
        Self::section(SEARCH_PAGE_NAME, None)
    }

    pub fn recent() -> Self {
        Self::section("recent", Some("recentOnly"))
    }

    pub fn shared() -> Self {
        Self::section("shared", Some("sharedOnly"))
    }

    pub fn starred() -> Self {
        Self::section("starred", Some("starredOnly"))
    }

    pub fn trash() -> Self {
        Self::section("trash", Some("deletedOnly"))
    }

    /// Root of the viewer's drive; its folder arrives with the first listing
    pub fn root_folder() -> Self {
        Self {
            name: FOLDER_PAGE_NAME.to_string(),
            unique_id: ROOT_FOLDER_ID.to_string(),
            is_folder_page: true,
            query_params: BTreeMap::new(),
            folder: None,
        }
    }

    /// Page for a folder whose hash is known but whose metadata is not loaded yet
    pub fn folder_hash(hash: &str) -> Self {
        Self {
            name: FOLDER_PAGE_NAME.to_string(),
            unique_id: hash.to_string(),
            is_folder_page: true,
            query_params: BTreeMap::new(),
            folder: None,
        }
    }

    pub fn is_search(&self) -> bool {
        !self.is_folder_page && self.name == SEARCH_PAGE_NAME
    }

    /// Resolve a section name or folder hash given on the command line
    pub fn from_name(name: &str) -> Self {
        match name {
            SEARCH_PAGE_NAME => Self::search(),
            "recent" => Self::recent(),
            "shared" => Self::shared(),
            "starred" => Self::starred(),
            "trash" => Self::trash(),
            "" | "root" | ROOT_FOLDER_ID => Self::root_folder(),
            hash => Self::folder_hash(hash),
        }
    }
}

/// Build the page for a loaded folder
pub fn make_folder_page(folder: DriveFolder) -> DrivePage {
    DrivePage {
        name: FOLDER_PAGE_NAME.to_string(),
        unique_id: folder.hash.clone(),
        is_folder_page: true,
        query_params: BTreeMap::new(),
        folder: Some(folder),
    }
}

/// Columns a listing can be ordered by
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortColumn {
    #[default]
    UpdatedAt,
    CreatedAt,
    Name,
    FileSize,
    Type,
}

impl SortColumn {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortColumn::UpdatedAt => "updated_at",
            SortColumn::CreatedAt => "created_at",
            SortColumn::Name => "name",
            SortColumn::FileSize => "file_size",
            SortColumn::Type => "type",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "updated_at" => Some(SortColumn::UpdatedAt),
            "created_at" => Some(SortColumn::CreatedAt),
            "name" => Some(SortColumn::Name),
            "file_size" => Some(SortColumn::FileSize),
            "type" => Some(SortColumn::Type),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "asc" => Some(SortDirection::Asc),
            "desc" => Some(SortDirection::Desc),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SortDescriptor {
    pub order_by: SortColumn,
    pub order_dir: SortDirection,
}
