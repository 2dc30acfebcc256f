//! Paginated entry listings and their synchronization with the drive state

pub mod paginated;
pub mod params;
pub mod share;

pub use paginated::{Listing, ListingContext, NextPage, PaginatedEntries};
pub use share::EntryModels;
