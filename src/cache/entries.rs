//! Entry Listing Cache
//!
//! Cache of paginated entry listings using Moka, keyed by query key.
//! Pages of one listing are appended in fetch order and never reordered.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::sync::Cache;
use tracing::{debug, trace};

use super::query_key::QueryKey;
use crate::drive::{DriveEntry, EntriesPaginationResponse};

/// All fetched pages of one listing
#[derive(Clone, Debug)]
pub struct InfiniteEntries {
    /// Pages in fetch order
    pub pages: Vec<EntriesPaginationResponse>,
    /// Page number each page was requested with
    pub page_params: Vec<u64>,
    /// When the last page was stored
    pub updated_at: Instant,
}

impl InfiniteEntries {
    pub fn first(page: EntriesPaginationResponse, page_param: u64) -> Self {
        Self {
            pages: vec![page],
            page_params: vec![page_param],
            updated_at: Instant::now(),
        }
    }

    /// Copy of this listing with `page` appended
    pub fn with_page(&self, page: EntriesPaginationResponse, page_param: u64) -> Self {
        let mut next = self.clone();
        next.pages.push(page);
        next.page_params.push(page_param);
        next.updated_at = Instant::now();
        next
    }

    pub fn last_page(&self) -> Option<&EntriesPaginationResponse> {
        self.pages.last()
    }

    /// Entries of every page, in page order
    pub fn entries(&self) -> impl Iterator<Item = &DriveEntry> {
        self.pages.iter().flat_map(|p| p.data.iter())
    }
}

/// Listing cache with idle-based retention
pub struct EntryCache {
    listings: Cache<QueryKey, Arc<InfiniteEntries>>,
    /// Cache hit counter
    hits: AtomicU64,
    /// Cache miss counter
    misses: AtomicU64,
}

impl EntryCache {
    /// Create a cache that drops listings idle for 5 minutes
    pub fn new() -> Self {
        Self::with_idle(Duration::from_secs(300))
    }

    /// Create a cache with a custom idle retention
    pub fn with_idle(idle: Duration) -> Self {
        let listings = Cache::builder()
            .time_to_idle(idle)
            .name("drive_entries_cache")
            .build();

        Self {
            listings,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Get a cached listing, updating hit/miss counters
    pub fn get(&self, key: &QueryKey) -> Option<Arc<InfiniteEntries>> {
        match self.listings.get(key) {
            Some(cached) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                trace!(key = %key, pages = cached.pages.len(), "Cache HIT for listing");
                Some(cached)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                trace!(key = %key, "Cache MISS for listing");
                None
            }
        }
    }

    /// Look at a cached listing without touching the counters
    pub fn peek(&self, key: &QueryKey) -> Option<Arc<InfiniteEntries>> {
        self.listings.get(key)
    }

    pub fn insert(&self, key: QueryKey, listing: InfiniteEntries) -> Arc<InfiniteEntries> {
        let pages = listing.pages.len();
        let listing = Arc::new(listing);
        debug!(key = %key, pages = pages, "Cached listing");
        self.listings.insert(key, Arc::clone(&listing));
        listing
    }

    pub fn invalidate(&self, key: &QueryKey) {
        self.listings.invalidate(key);
        debug!(key = %key, "Invalidated listing");
    }

    /// Every cached listing whose key matches `filter`, ordered by key
    pub fn queries_data(&self, filter: &QueryKey) -> Vec<(QueryKey, Arc<InfiniteEntries>)> {
        let mut found: Vec<(QueryKey, Arc<InfiniteEntries>)> = self
            .listings
            .iter()
            .filter(|(key, _)| key.matches(filter))
            .map(|(key, listing)| (key.as_ref().clone(), listing))
            .collect();
        found.sort_by(|a, b| a.0.cmp(&b.0));
        found
    }

    /// Get cache statistics
    ///
    /// Returns (hits, misses, hit_rate)
    pub fn stats(&self) -> (u64, u64, f64) {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        (hits, misses, hit_rate)
    }

    /// Log current cache metrics
    pub fn log_metrics(&self) {
        let (hits, misses, hit_rate) = self.stats();

        debug!(
            hits = hits,
            misses = misses,
            hit_rate = format!("{:.1}%", hit_rate),
            listings = self.listings.entry_count(),
            "Cache metrics"
        );
    }
}

impl Default for EntryCache {
    fn default() -> Self {
        Self::new()
    }
}
