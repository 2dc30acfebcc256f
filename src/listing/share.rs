//! Share dialog entry refresh
//!
//! The share dialog opens with the entry as the listing knows it and then
//! swaps in the full record from the server, which carries every attached
//! user and their grants.

use std::time::Duration;

use moka::sync::Cache;
use tracing::debug;

use super::paginated::EntrySource;
use crate::cache::{DriveQueryKeys, QueryKey};
use crate::drive::{DriveEntry, DriveError};

/// Cached full entry records, keyed by `DriveQueryKeys::fetch_file_entry`
pub struct EntryModels<S> {
    source: S,
    models: Cache<QueryKey, DriveEntry>,
}

impl<S: EntrySource> EntryModels<S> {
    pub fn with_idle(source: S, idle: Duration) -> Self {
        let models = Cache::builder()
            .time_to_idle(idle)
            .name("drive_entry_models")
            .build();
        Self { source, models }
    }

    /// Seed with `initial`, then replace it with the server's record
    pub async fn load(&self, initial: &DriveEntry) -> Result<DriveEntry, DriveError> {
        let key = DriveQueryKeys::fetch_file_entry(initial.id);
        if !self.models.contains_key(&key) {
            self.models.insert(key.clone(), initial.clone());
        }

        let fresh = self.source.load_entry_model(initial.id).await?;
        debug!(entry = fresh.id, users = fresh.users.len(), "Refreshed entry model");
        self.models.insert(key, fresh.clone());
        Ok(fresh)
    }

    /// Cached record for `id`, loading it when nothing is cached yet.
    /// A seeded entry counts as cached.
    pub async fn get_or_fetch(&self, id: u64) -> Result<DriveEntry, DriveError> {
        let key = DriveQueryKeys::fetch_file_entry(id);
        if let Some(model) = self.models.get(&key) {
            return Ok(model);
        }
        let fresh = self.source.load_entry_model(id).await?;
        self.models.insert(key, fresh.clone());
        Ok(fresh)
    }
}
