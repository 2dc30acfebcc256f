//! Drive API server: repository, authorization and HTTP routes

pub mod index;
pub mod path;
pub mod permissions;
pub mod policy;
pub mod routes;
pub mod store;

pub use routes::DriveServer;
pub use store::MemoryStore;
