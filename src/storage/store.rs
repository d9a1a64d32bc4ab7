//! Zarr stores.

mod filesystem;
mod memory;

#[cfg(feature = "http")]
mod http;

pub use filesystem::{FilesystemStore, FilesystemStoreCreateError};
pub use memory::MemoryStore;

#[cfg(feature = "http")]
pub use http::{HTTPStore, HTTPStoreCreateError};
