// Manifest module - the JSON document the public gallery page consumes
mod store;
mod types;

pub use store::ManifestError;
pub use types::*;
