//! Pure domain types and synchronous state transitions.

pub mod config;
pub mod file;
pub mod open_file_set;
