//! A filesystem store.
//!
//! Store keys map to files beneath a base directory, matching the layout
//! written by the dataset converter (`locations.json`, `<shard>/<name>/...`).

use crate::storage::{AsyncReadableStorageTraits, MaybeBytes, StorageError, StoreKey};

use thiserror::Error;

use std::path::{Path, PathBuf};

/// A filesystem store.
///
/// Reads block the calling thread; keys resolve to small metadata and chunk
/// files, so reads are dispatched inline rather than through a blocking pool.
#[derive(Debug)]
pub struct FilesystemStore {
    base_directory: PathBuf,
}

impl FilesystemStore {
    /// Create a new filesystem store at a given `base_directory`.
    ///
    /// # Errors
    ///
    /// Returns a [`FilesystemStoreCreateError`] if `base_directory` is not an
    /// existing directory.
    pub fn new<P: AsRef<Path>>(
        base_directory: P,
    ) -> Result<FilesystemStore, FilesystemStoreCreateError> {
        let base_directory = base_directory.as_ref().to_path_buf();
        if !base_directory.is_dir() {
            return Err(FilesystemStoreCreateError::InvalidBaseDirectory(
                base_directory,
            ));
        }
        Ok(FilesystemStore { base_directory })
    }

    /// Maps a [`StoreKey`] to a filesystem [`PathBuf`].
    #[must_use]
    pub fn key_to_fspath(&self, key: &StoreKey) -> PathBuf {
        self.base_directory.join(key.as_str())
    }
}

#[async_trait::async_trait]
impl AsyncReadableStorageTraits for FilesystemStore {
    async fn get(&self, key: &StoreKey) -> Result<MaybeBytes, StorageError> {
        // Keys with relative components could resolve outside the base directory.
        if key.as_str().split('/').any(|component| component == "..") {
            return Err(StorageError::from(format!(
                "store key {key} escapes the base directory"
            )));
        }
        match std::fs::read(self.key_to_fspath(key)) {
            Ok(bytes) => Ok(Some(bytes.into())),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

/// A filesystem store creation error.
#[derive(Debug, Error)]
pub enum FilesystemStoreCreateError {
    /// An IO error.
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    /// The base directory is not valid.
    #[error("base directory {0} is not an existing directory")]
    InvalidBaseDirectory(PathBuf),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[tokio::test]
    async fn filesystem_get() -> Result<(), Box<dyn Error>> {
        let path = tempfile::TempDir::new()?;
        std::fs::create_dir_all(path.path().join("n/NEWPORT"))?;
        std::fs::write(path.path().join("locations.json"), b"{}")?;
        std::fs::write(path.path().join("n/NEWPORT/zarr.json"), b"meta")?;

        let store = FilesystemStore::new(path.path())?;
        assert_eq!(
            store.get(&"locations.json".try_into()?).await?.as_deref(),
            Some(b"{}".as_slice())
        );
        assert_eq!(
            store
                .get(&"n/NEWPORT/zarr.json".try_into()?)
                .await?
                .as_deref(),
            Some(b"meta".as_slice())
        );
        assert!(store.get(&"n/NEWPORT/c/0".try_into()?).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn filesystem_rejects_escape() -> Result<(), Box<dyn Error>> {
        let path = tempfile::TempDir::new()?;
        let store = FilesystemStore::new(path.path())?;
        assert!(store.get(&"../secret".try_into()?).await.is_err());
        Ok(())
    }

    #[test]
    fn filesystem_invalid_base_directory() -> Result<(), Box<dyn Error>> {
        let path = tempfile::TempDir::new()?;
        assert!(FilesystemStore::new(path.path().join("missing")).is_err());
        Ok(())
    }
}
