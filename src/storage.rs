//! Zarr storage ([stores](store)).
//!
//! A store is a system that tide datasets can be retrieved from, addressed by [`StoreKey`].
//! This crate only reads: the store contract is [`AsyncReadableStorageTraits`], a single
//! `get` operation that distinguishes a missing key ([`None`]) from a transport failure
//! ([`StorageError`]).

pub mod store;
mod store_key;

use std::sync::Arc;

use thiserror::Error;

use crate::{array::ChunkKeySeparator, node::NodePath};

pub use store_key::{StoreKey, StoreKeyError};

/// The raw bytes of a store value.
pub type Bytes = bytes::Bytes;

/// The value of a [`StoreKey`], [`None`] if the key is not found.
pub type MaybeBytes = Option<Bytes>;

/// [`Arc`] wrapped asynchronous readable storage.
pub type AsyncReadableStorage = Arc<dyn AsyncReadableStorageTraits>;

/// Async readable storage traits.
#[async_trait::async_trait]
pub trait AsyncReadableStorageTraits: Send + Sync {
    /// Retrieve the value (bytes) associated with a given [`StoreKey`].
    ///
    /// Returns [`None`] if the key is not found.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if there is an error with the underlying store.
    async fn get(&self, key: &StoreKey) -> Result<MaybeBytes, StorageError>;
}

/// A storage error.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An IO error.
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    /// An invalid store key.
    #[error("invalid store key {0}")]
    InvalidStoreKey(#[from] StoreKeyError),
    /// Any other error.
    #[error("{0}")]
    Other(String),
}

impl From<&str> for StorageError {
    fn from(err: &str) -> Self {
        Self::Other(err.to_string())
    }
}

impl From<String> for StorageError {
    fn from(err: String) -> Self {
        Self::Other(err)
    }
}

/// Return the Zarr V3 metadata key (zarr.json) given a node path.
#[must_use]
pub fn meta_key(path: &NodePath) -> StoreKey {
    let path = path.as_str();
    if path.eq("/") {
        unsafe { StoreKey::new_unchecked("zarr.json".to_string()) }
    } else {
        let path = path.strip_prefix('/').unwrap_or(path);
        unsafe { StoreKey::new_unchecked(format!("{path}/zarr.json")) }
    }
}

/// Return the data key of the chunk at `coordinate` for the array at `path`,
/// following the `default` chunk key encoding.
#[must_use]
pub fn data_key(path: &NodePath, coordinate: u64, separator: ChunkKeySeparator) -> StoreKey {
    let path = path.as_str();
    let path = path.strip_prefix('/').unwrap_or(path);
    let key = if path.is_empty() {
        format!("c{separator}{coordinate}")
    } else {
        format!("{path}/c{separator}{coordinate}")
    };
    unsafe { StoreKey::new_unchecked(key) }
}
