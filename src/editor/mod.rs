// Editor module - filesystem-backed CRUD over local collections, used for
// curation before a CDN sync
mod core;
mod error;
pub mod handlers;
mod types;

pub use core::EditorStore;
pub use error::EditorError;
pub use types::*;
