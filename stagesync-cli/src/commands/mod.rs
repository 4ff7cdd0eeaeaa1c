pub mod clone;
pub mod list;
pub mod sync_back;
