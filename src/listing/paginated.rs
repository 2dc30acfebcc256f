//! Paginated entry listings
//!
//! Fetches pages of entries for the active listing context, caches them by
//! query key and keeps the active folder page in step with the folder
//! metadata the server sends along with the first page.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use tracing::{debug, info};

use super::params::IndexParams;
use crate::cache::{DriveQueryKeys, EntryCache, InfiniteEntries, QueryKey};
use crate::drive::{DriveClient, DriveEntry, DriveError, EntriesPaginationResponse};
use crate::state::{make_folder_page, DriveState};

/// Where pages and entry models come from
pub trait EntrySource: Send + Sync {
    fn load_page(
        &self,
        params: &BTreeMap<String, String>,
    ) -> impl Future<Output = Result<EntriesPaginationResponse, DriveError>> + Send;

    fn load_entry_model(&self, id: u64) -> impl Future<Output = Result<DriveEntry, DriveError>> + Send;
}

impl EntrySource for DriveClient {
    fn load_page(
        &self,
        params: &BTreeMap<String, String>,
    ) -> impl Future<Output = Result<EntriesPaginationResponse, DriveError>> + Send {
        self.fetch_entries(params)
    }

    fn load_entry_model(&self, id: u64) -> impl Future<Output = Result<DriveEntry, DriveError>> + Send {
        self.fetch_entry_model(id)
    }
}

/// Inputs that come from outside the drive state
#[derive(Debug, Clone, Default)]
pub struct ListingContext {
    /// URL search parameters
    pub search_params: BTreeMap<String, String>,
    pub workspace_id: Option<u64>,
}

/// Result of asking for the current listing
#[derive(Debug, Clone)]
pub enum Listing {
    /// Nothing to fetch: no active page, or a search without a query or filter
    Disabled,
    Ready(Arc<InfiniteEntries>),
}

impl Listing {
    pub fn entries(&self) -> Vec<&DriveEntry> {
        match self {
            Listing::Disabled => Vec::new(),
            Listing::Ready(listing) => listing.entries().collect(),
        }
    }
}

/// Result of asking for the next page
#[derive(Debug, Clone)]
pub enum NextPage {
    Fetched(Arc<InfiniteEntries>),
    EndOfStream,
}

/// Paginated listing of the active drive page
pub struct PaginatedEntries<S> {
    source: S,
    cache: Arc<EntryCache>,
    state: Arc<DriveState>,
}

impl<S: EntrySource> PaginatedEntries<S> {
    pub fn new(source: S, cache: Arc<EntryCache>, state: Arc<DriveState>) -> Self {
        Self { source, cache, state }
    }

    /// Parameters of the current listing, or None when fetching is disabled
    pub fn params(&self, ctx: &ListingContext) -> Option<IndexParams> {
        let page = self.state.active_page()?;
        let params = IndexParams::assemble(
            Some(&page),
            &ctx.search_params,
            ctx.workspace_id,
            self.state.sort_descriptor(),
        );

        // no point asking the server for an empty search
        if page.is_search() && params.query().is_none() && params.filters().is_none() {
            debug!("Search has no query or filters, not fetching");
            return None;
        }
        Some(params)
    }

    /// The current listing, fetching its first page on a cache miss
    pub async fn fetch(&self, ctx: &ListingContext) -> Result<Listing, DriveError> {
        let Some(params) = self.params(ctx) else {
            return Ok(Listing::Disabled);
        };
        let key = params.query_key();

        if let Some(cached) = self.cache.get(&key) {
            self.sync_if_current(ctx, &key, &cached);
            return Ok(Listing::Ready(cached));
        }

        let listing = self.fetch_first_page(ctx, &params, &key).await?;
        Ok(Listing::Ready(listing))
    }

    /// Fetch the page after the last cached one
    pub async fn fetch_next_page(&self, ctx: &ListingContext) -> Result<NextPage, DriveError> {
        let Some(params) = self.params(ctx) else {
            return Ok(NextPage::EndOfStream);
        };
        let key = params.query_key();

        let Some(current) = self.cache.peek(&key) else {
            let listing = self.fetch_first_page(ctx, &params, &key).await?;
            return Ok(NextPage::Fetched(listing));
        };

        let Some(last) = current.last_page() else {
            return Ok(NextPage::EndOfStream);
        };
        if !last.has_next_page() {
            debug!(key = %key, page = last.current_page, "No more pages");
            return Ok(NextPage::EndOfStream);
        }

        let next = last.current_page + 1;
        debug!(key = %key, page = next, "Fetching next page");
        let page = self.source.load_page(&params.for_page(next)).await?;

        // the listing was refetched while this page was in flight
        if let Some(latest) = self.cache.peek(&key) {
            if !Arc::ptr_eq(&latest, &current) {
                debug!(key = %key, page = next, "Listing changed during fetch, dropping page");
                return Ok(NextPage::Fetched(latest));
            }
        }

        let listing = self.cache.insert(key.clone(), current.with_page(page, next));
        self.sync_if_current(ctx, &key, &listing);
        Ok(NextPage::Fetched(listing))
    }

    /// Drop the cached listing and fetch its first page again
    pub async fn refetch(&self, ctx: &ListingContext) -> Result<Listing, DriveError> {
        let Some(params) = self.params(ctx) else {
            return Ok(Listing::Disabled);
        };
        let key = params.query_key();
        self.cache.invalidate(&key);
        let listing = self.fetch_first_page(ctx, &params, &key).await?;
        Ok(Listing::Ready(listing))
    }

    async fn fetch_first_page(
        &self,
        ctx: &ListingContext,
        params: &IndexParams,
        key: &QueryKey,
    ) -> Result<Arc<InfiniteEntries>, DriveError> {
        let page = self.source.load_page(&params.for_page(1)).await?;
        info!(
            key = %key,
            entries = page.data.len(),
            has_next = page.has_next_page(),
            "Fetched first page"
        );
        let listing = self.cache.insert(key.clone(), InfiniteEntries::first(page, 1));
        self.sync_if_current(ctx, key, &listing);
        Ok(listing)
    }

    /// Sync the active page, unless the listing context moved on while fetching
    fn sync_if_current(&self, ctx: &ListingContext, key: &QueryKey, listing: &InfiniteEntries) {
        let current_key = self.params(ctx).map(|p| p.query_key());
        if current_key.as_ref() != Some(key) {
            debug!(key = %key, "Listing is no longer active, skipping page sync");
            return;
        }
        self.sync_active_folder(listing);
    }

    /// Replace the active page with the listed folder's metadata when it
    /// belongs to that page and either no folder was known yet or the
    /// permissions changed. Returns whether the page was replaced.
    pub fn sync_active_folder(&self, listing: &InfiniteEntries) -> bool {
        let Some(folder) = listing.pages.first().and_then(|p| p.folder.as_ref()) else {
            return false;
        };
        let replaced = self.state.replace_active_page_if(|current| {
            if current.unique_id != folder.hash {
                return None;
            }
            let changed = match &current.folder {
                None => true,
                Some(known) => known.permissions != folder.permissions,
            };
            changed.then(|| make_folder_page(folder.clone()))
        });
        if replaced.is_some() {
            debug!(folder = %folder.hash, "Updated active folder page");
        }
        replaced.is_some()
    }

    /// Every entry of every cached listing, listing by listing
    pub fn get_all_entries(&self) -> Vec<DriveEntry> {
        self.cache
            .queries_data(&DriveQueryKeys::fetch_entries_root())
            .iter()
            .flat_map(|(_, listing)| listing.entries().cloned().collect::<Vec<_>>())
            .collect()
    }
}
