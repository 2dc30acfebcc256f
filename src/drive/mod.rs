//! Drive API client and wire types

pub mod client;
pub mod errors;
pub mod hash;
pub mod types;

pub use client::DriveClient;
pub use errors::DriveError;
pub use types::*;
