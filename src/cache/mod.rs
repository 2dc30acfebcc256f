//! Client-side query cache
//!
//! Holds fetched entry listings keyed by canonical query keys using Moka.

pub mod entries;
pub mod query_key;

pub use entries::{EntryCache, InfiniteEntries};
pub use query_key::{DriveQueryKeys, QueryKey};
