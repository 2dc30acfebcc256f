//! Shared drive view state
//!
//! Holds the active page and sort descriptor. The active page is handed out
//! as an `Arc` so consumers can tell by pointer whether it was replaced.

use std::sync::{Arc, RwLock};

use tracing::debug;

use super::page::{DrivePage, SortDescriptor};

#[derive(Debug, Default)]
struct Inner {
    active_page: Option<Arc<DrivePage>>,
    sort_descriptor: SortDescriptor,
}

/// Client view state shared by the listing components
#[derive(Debug, Default)]
pub struct DriveState {
    inner: RwLock<Inner>,
}

impl DriveState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_page(&self) -> Option<Arc<DrivePage>> {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .active_page
            .clone()
    }

    /// Replace the active page and return the new reference
    pub fn set_active_page(&self, page: DrivePage) -> Arc<DrivePage> {
        let page = Arc::new(page);
        debug!(page = %page.name, unique_id = %page.unique_id, "Active page replaced");
        self.inner
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .active_page = Some(Arc::clone(&page));
        page
    }

    /// Replace the active page with whatever `update` derives from it, in
    /// one step so a page set in the meantime is never overwritten.
    /// `update` returns None to keep the current page.
    pub fn replace_active_page_if<F>(&self, update: F) -> Option<Arc<DrivePage>>
    where
        F: FnOnce(&DrivePage) -> Option<DrivePage>,
    {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let next = Arc::new(update(inner.active_page.as_deref()?)?);
        debug!(page = %next.name, unique_id = %next.unique_id, "Active page replaced");
        inner.active_page = Some(Arc::clone(&next));
        Some(next)
    }

    pub fn sort_descriptor(&self) -> SortDescriptor {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .sort_descriptor
    }

    pub fn set_sort_descriptor(&self, sort: SortDescriptor) {
        self.inner
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .sort_descriptor = sort;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::page::{SortColumn, SortDirection};

    #[test]
    fn test_active_page_reference_changes_on_set() {
        let state = DriveState::new();
        assert!(state.active_page().is_none());

        let first = state.set_active_page(DrivePage::recent());
        let read = state.active_page().unwrap();
        assert!(Arc::ptr_eq(&first, &read));

        state.set_active_page(DrivePage::recent());
        assert!(!Arc::ptr_eq(&first, &state.active_page().unwrap()));
    }

    #[test]
    fn test_replace_active_page_if() {
        let state = DriveState::new();
        assert!(state.replace_active_page_if(|_| Some(DrivePage::trash())).is_none());

        let recent = state.set_active_page(DrivePage::recent());
        assert!(state.replace_active_page_if(|_| None).is_none());
        assert!(Arc::ptr_eq(&recent, &state.active_page().unwrap()));

        let replaced = state
            .replace_active_page_if(|page| (page.name == "recent").then(DrivePage::starred))
            .unwrap();
        assert_eq!(replaced.name, "starred");
        assert!(Arc::ptr_eq(&replaced, &state.active_page().unwrap()));
    }

    #[test]
    fn test_sort_descriptor() {
        let state = DriveState::new();
        let sort = SortDescriptor {
            order_by: SortColumn::Name,
            order_dir: SortDirection::Asc,
        };
        state.set_sort_descriptor(sort);
        assert_eq!(state.sort_descriptor(), sort);
    }
}
