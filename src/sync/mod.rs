// Sync module - reconciles local collection directories with the CDN and
// the gallery manifest
mod cache;
mod cdn;
mod core;
mod env_file;
mod error;
mod hash;

pub use cache::{UploadCache, UploadRecord};
pub use cdn::{CdnProvider, DynCdnProvider, HttpCdnProvider, NullCdnProvider, UploadResult};
pub use core::{SyncFailure, SyncRunner, SyncSummary};
pub use env_file::{load_env_file, resolve_api_key};
pub use error::SyncError;
pub use hash::sha256_of_file;

pub const DEFAULT_API_BASE: &str = "https://cdn.hackclub.com/api/v4";
