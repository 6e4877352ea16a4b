//! Application layer: the edit session controller and the services it
//! coordinates.

mod service;
pub mod session;
mod worker;

pub use session::{EditError, EditFuture, EditSession};
