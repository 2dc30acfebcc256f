//! Query keys
//!
//! A query key identifies one cached listing. Parameters are held in a
//! sorted map, so the order they were assembled in never changes the key.

use std::collections::BTreeMap;
use std::fmt;

/// Root segment for paginated entry listings
pub const ENTRIES_ROOT: &str = "drive-entries";

/// Root segment for single entry models
pub const FILE_ENTRY_ROOT: &str = "file-entry";

/// Canonical identifier of a cached query
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey {
    root: &'static str,
    params: Option<BTreeMap<String, String>>,
}

impl QueryKey {
    /// Key covering every query under `root`
    pub fn root(root: &'static str) -> Self {
        Self { root, params: None }
    }

    pub fn new<I, K, V>(root: &'static str, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            root,
            params: Some(
                params
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    pub fn params(&self) -> Option<&BTreeMap<String, String>> {
        self.params.as_ref()
    }

    /// Partial match: `filter` matches when its root is equal and every
    /// parameter it names is present here with the same value.
    pub fn matches(&self, filter: &QueryKey) -> bool {
        if self.root != filter.root {
            return false;
        }
        match (&filter.params, &self.params) {
            (None, _) => true,
            (Some(wanted), Some(have)) => wanted.iter().all(|(k, v)| have.get(k) == Some(v)),
            (Some(wanted), None) => wanted.is_empty(),
        }
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.root)?;
        if let Some(params) = &self.params {
            let mut sep = '?';
            for (k, v) in params {
                write!(f, "{}{}={}", sep, k, v)?;
                sep = '&';
            }
        }
        Ok(())
    }
}

/// Key constructors for drive queries
pub struct DriveQueryKeys;

impl DriveQueryKeys {
    /// Key for one listing context
    pub fn fetch_entries(params: &BTreeMap<String, String>) -> QueryKey {
        QueryKey::new(ENTRIES_ROOT, params.clone())
    }

    /// Prefix matching every listing context
    pub fn fetch_entries_root() -> QueryKey {
        QueryKey::root(ENTRIES_ROOT)
    }

    pub fn fetch_file_entry(id: u64) -> QueryKey {
        QueryKey::new(FILE_ENTRY_ROOT, [("id", id.to_string())])
    }
}
