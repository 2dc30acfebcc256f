//! Client view state: drive pages and the active page store

pub mod page;
pub mod store;

pub use page::{make_folder_page, DrivePage, SortColumn, SortDescriptor, SortDirection};
pub use store::DriveState;
