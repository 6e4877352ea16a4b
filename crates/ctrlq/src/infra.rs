//! External boundaries: the folder-backed file store and config persistence.

pub mod config_store;
pub mod file_store;
